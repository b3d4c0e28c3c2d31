//! Complex Path Extractor
//!
//! 複雑と分類されたグリッドを1つ以上の論理テーブル領域へ分割し、
//! 領域ごとにレコード列を抽出するモジュール。セグメンテーション、
//! マージ解決、複数行ヘッダー検出、非表形式領域のフォールバックを
//! 実装します。

use tracing::debug;

use crate::error::SheetsonError;
use crate::extract::{
    cell_to_json, coerce_headers, Record, RegionExtract, SheetExtractor, TableRegion,
};
use crate::freetext::FreeTextExtractor;
use crate::grid::Grid;
use crate::types::{CellCoord, CellRange, CellValue};

/// 複雑パス抽出器
///
/// しきい値は構築時に明示的に渡されます。非表形式領域を処理する
/// `FreeTextExtractor`はオプションです: 未構成のまま非表形式領域に
/// 遭遇した場合は`FreeTextUnavailable`で失敗し、Dispatcherがリモート
/// 委譲へ切り替えます。
pub struct ComplexExtractor<'a> {
    /// 区切りとみなす空行・空列の最小連続数
    gap_rows: usize,

    /// ヘッダー行の埋まり方のしきい値（領域内平均に対する割合）
    header_fill_threshold: f64,

    /// 領域として保持するために必要な最小非空セル数（未満はノイズとして破棄）
    min_region_cells: usize,

    /// レイアウト解析の外部コラボレーター（オプション）
    free_text: Option<&'a dyn FreeTextExtractor>,
}

impl<'a> ComplexExtractor<'a> {
    /// 新しい抽出器を生成
    pub fn new(gap_rows: usize, header_fill_threshold: f64, min_region_cells: usize) -> Self {
        Self {
            gap_rows,
            header_fill_threshold,
            min_region_cells,
            free_text: None,
        }
    }

    /// フリーテキスト抽出のコラボレーターを設定
    pub fn with_free_text(mut self, free_text: &'a dyn FreeTextExtractor) -> Self {
        self.free_text = Some(free_text);
        self
    }

    /// 外接矩形を空帯区切りで候補領域へ分割
    ///
    /// 行方向・列方向の空帯を交互に適用し、分割が安定するまで再帰します。
    /// 列方向の切り詰めによって新たな行ギャップが露出するケースも
    /// 再帰によって処理されます。返される領域は互いに重なりません。
    fn segment(&self, grid: &Grid, rect: CellRange, out: &mut Vec<CellRange>) {
        // 1. 行方向の非空帯を走査
        let row_bands = grid.row_bands(rect, self.gap_rows);
        match row_bands.len() {
            0 => {} // 完全に空の矩形
            1 => {
                let (r0, r1) = row_bands[0];
                let trimmed_rows = CellRange::new(
                    CellCoord::new(r0, rect.start.col),
                    CellCoord::new(r1, rect.end.col),
                );

                // 2. 列方向の非空帯を走査
                let col_bands = grid.col_bands(trimmed_rows, self.gap_rows);
                match col_bands.len() {
                    0 => {}
                    1 => {
                        let (c0, c1) = col_bands[0];
                        let trimmed = CellRange::new(
                            CellCoord::new(r0, c0),
                            CellCoord::new(r1, c1),
                        );
                        if trimmed == rect {
                            // 両方向とも分割・切り詰めの余地がない: 確定
                            out.push(trimmed);
                        } else {
                            // 切り詰めにより新たなギャップが現れる可能性がある
                            self.segment(grid, trimmed, out);
                        }
                    }
                    _ => {
                        for (c0, c1) in col_bands {
                            let sub = CellRange::new(
                                CellCoord::new(r0, c0),
                                CellCoord::new(r1, c1),
                            );
                            self.segment(grid, sub, out);
                        }
                    }
                }
            }
            _ => {
                for (r0, r1) in row_bands {
                    let sub = CellRange::new(
                        CellCoord::new(r0, rect.start.col),
                        CellCoord::new(r1, rect.end.col),
                    );
                    self.segment(grid, sub, out);
                }
            }
        }
    }

    /// 領域内の非空セル数を数える（マージ解決あり）
    fn region_fill(&self, grid: &Grid, rect: CellRange) -> usize {
        (rect.start.row..=rect.end.row)
            .map(|row| grid.row_fill_count(row, rect.start.col, rect.end.col))
            .sum()
    }

    /// 1領域を抽出する
    fn extract_region(
        &self,
        grid: &Grid,
        rect: CellRange,
    ) -> Result<RegionExtract, SheetsonError> {
        // マージ解決済みビューを実体化する（元のグリッドは変更しない）
        let resolved = grid.resolve_rect(rect);
        let width = rect.size().1 as usize;

        // 行ごとの非空セル数と、非空行の平均埋まり数
        let fills: Vec<usize> = resolved
            .iter()
            .map(|row| row.iter().filter(|v| !v.is_empty()).count())
            .collect();
        let populated: Vec<usize> = fills.iter().copied().filter(|&f| f > 0).collect();
        let average = populated.iter().sum::<usize>() as f64 / populated.len().max(1) as f64;
        let threshold = self.header_fill_threshold * average;

        // ヘッダーブロックの末尾 = しきい値に達する最初の行。
        // 先行するしきい値未満の行はヘッダーブロックに含まれる
        // （バナーや分割ヘッダーが複数行ヘッダーとして連結される）。
        let header_end = fills.iter().position(|&f| f as f64 >= threshold);

        // 列構造が1列しかない領域、またはどの行もしきい値に達しない領域は
        // 表として解決できない: フリーテキストへフォールバックする
        let header_end = match (width >= 2, header_end) {
            (true, Some(end)) => end,
            _ => return self.extract_free_text_region(grid, rect, &resolved),
        };

        // 1. 複数行ヘッダーを列ごとに上から連結（空セルはスキップ）
        let raw_headers: Vec<String> = (0..width)
            .map(|col| {
                let parts: Vec<String> = resolved[..=header_end]
                    .iter()
                    .map(|row| row[col].as_display_string())
                    .filter(|s| !s.trim().is_empty())
                    .map(|s| s.trim().to_string())
                    .collect();
                parts.join(" ")
            })
            .collect();
        let headers = coerce_headers(&raw_headers);

        // 2. ヘッダーブロック以降の行をレコードへ変換（空セルはnull）
        let mut records = Vec::new();
        for row in &resolved[header_end + 1..] {
            let mut record = Record::new();
            for (col, value) in row.iter().enumerate() {
                record.insert(headers[col].clone(), cell_to_json(value));
            }
            records.push(record);
        }

        let header_rows = (
            rect.start.row,
            rect.start.row + header_end as u32,
        );
        let data_rows = if header_rows.1 < rect.end.row {
            Some((header_rows.1 + 1, rect.end.row))
        } else {
            None
        };

        Ok(RegionExtract {
            region: TableRegion {
                bounds: rect,
                header_rows: Some(header_rows),
                data_rows,
            },
            records,
        })
    }

    /// 非表形式領域のフォールバック抽出
    ///
    /// 領域をプレーンテキストへ描画して外部コラボレーターに渡し、
    /// その出力を単一の`text`フィールドとして格納します。
    fn extract_free_text_region(
        &self,
        grid: &Grid,
        rect: CellRange,
        resolved: &[Vec<CellValue>],
    ) -> Result<RegionExtract, SheetsonError> {
        let free_text = self.free_text.ok_or_else(|| SheetsonError::FreeTextUnavailable {
            sheet: grid.sheet_name().to_string(),
        })?;

        let text = free_text.extract_free_text(&render_region_text(resolved))?;

        let mut record = Record::new();
        record.insert("text".to_string(), serde_json::Value::from(text));

        Ok(RegionExtract {
            region: TableRegion {
                bounds: rect,
                header_rows: None,
                data_rows: None,
            },
            records: vec![record],
        })
    }
}

/// マージ解決済みビューをプレーンテキストのバイト列へ描画
///
/// 行ごとに非空セルの表示文字列を空白で連結し、改行で区切ります。
fn render_region_text(resolved: &[Vec<CellValue>]) -> Vec<u8> {
    let lines: Vec<String> = resolved
        .iter()
        .map(|row| {
            row.iter()
                .filter(|v| !v.is_empty())
                .map(|v| v.as_display_string())
                .collect::<Vec<_>>()
                .join(" ")
        })
        .filter(|line| !line.is_empty())
        .collect();
    lines.join("\n").into_bytes()
}

impl SheetExtractor for ComplexExtractor<'_> {
    fn extract(&self, grid: &Grid) -> Result<Vec<RegionExtract>, SheetsonError> {
        // 1. セグメンテーション: 外接矩形を候補領域へ分割
        let mut candidates = Vec::new();
        if let Some(bbox) = grid.bounding_box() {
            self.segment(grid, bbox, &mut candidates);
        }

        // 2. ノイズフィルター: 非空セル数が下限未満の候補を破棄
        let mut discarded = 0usize;
        let mut regions: Vec<CellRange> = Vec::new();
        for rect in candidates {
            if self.region_fill(grid, rect) < self.min_region_cells {
                discarded += 1;
            } else {
                regions.push(rect);
            }
        }

        if regions.is_empty() {
            return Err(SheetsonError::NoRegionsFound {
                sheet: grid.sheet_name().to_string(),
            });
        }

        // 3. 左上座標の行優先順で出力順を確定
        regions.sort_by_key(|r| (r.start.row, r.start.col));

        debug!(
            sheet = grid.sheet_name(),
            regions = regions.len(),
            discarded,
            "complex path segmented sheet"
        );

        // 4. 各領域を抽出（全か無か: 1領域でも失敗すれば全体が失敗）
        regions
            .into_iter()
            .map(|rect| self.extract_region(grid, rect))
            .collect()
    }
}
