//! Simple Path Extractor
//!
//! 単純と分類されたグリッドから、単一のテーブルを抽出するモジュール。
//! 最初の非空行をヘッダーとして扱い、以降の行を最後の非空行まで
//! データとして取り込みます。

use tracing::debug;

use crate::error::SheetsonError;
use crate::extract::{cell_to_json, coerce_headers, Record, RegionExtract, SheetExtractor, TableRegion};
use crate::grid::Grid;
use crate::types::CellCoord;

/// 単純パス抽出器
///
/// 分類器が単純と判定したシート専用です。外接矩形全体を1つの
/// `TableRegion`として扱います。
#[derive(Debug, Clone, Default)]
pub struct SimpleExtractor;

impl SimpleExtractor {
    /// 新しい抽出器を生成
    pub fn new() -> Self {
        Self
    }
}

impl SheetExtractor for SimpleExtractor {
    fn extract(&self, grid: &Grid) -> Result<Vec<RegionExtract>, SheetsonError> {
        // 非空行が存在しないシートは抽出不能
        let bbox = grid.bounding_box().ok_or_else(|| SheetsonError::EmptySheet {
            sheet: grid.sheet_name().to_string(),
        })?;

        let header_row = bbox.start.row;

        // 1. ヘッダー行のセル値を文字列へ強制し、列名を確定する
        let raw_headers: Vec<String> = (bbox.start.col..=bbox.end.col)
            .map(|col| {
                grid.effective_value(CellCoord::new(header_row, col))
                    .as_display_string()
            })
            .collect();
        let headers = coerce_headers(&raw_headers);

        // 2. ヘッダー行の次から最後の非空行までをデータとして取り込む
        let mut records = Vec::new();
        for row in header_row + 1..=bbox.end.row {
            let mut record = Record::new();
            for (i, col) in (bbox.start.col..=bbox.end.col).enumerate() {
                let value = grid.effective_value(CellCoord::new(row, col));
                record.insert(headers[i].clone(), cell_to_json(value));
            }
            records.push(record);
        }

        let data_rows = if header_row < bbox.end.row {
            Some((header_row + 1, bbox.end.row))
        } else {
            None
        };

        debug!(
            sheet = grid.sheet_name(),
            records = records.len(),
            "simple path extracted one region"
        );

        Ok(vec![RegionExtract {
            region: TableRegion {
                bounds: bbox,
                header_rows: Some((header_row, header_row)),
                data_rows,
            },
            records,
        }])
    }
}
