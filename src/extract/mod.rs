//! Extraction Module
//!
//! 分類結果に応じて選択される2つの抽出パスの実装を提供するモジュール。
//! 単純パス（`SimpleExtractor`）と複雑パス（`ComplexExtractor`）は共通の
//! `SheetExtractor`能力インターフェースを実装し、判定ロジックと抽出
//! ロジックを独立にテストできるようにします。

mod complex;
mod simple;

pub use complex::ComplexExtractor;
pub use simple::SimpleExtractor;

use crate::error::SheetsonError;
use crate::grid::Grid;
use crate::types::{CellRange, CellValue};

/// 1レコード: 列ヘッダー文字列からセル値へのマッピング
///
/// `serde_json`の`preserve_order`フィーチャーにより、挿入順（＝出現した
/// 列順）が保存されます。空セルはnull値としてマップされます（省略すると
/// ラウンドトリップ時の列整合が壊れるため、省略はしません）。
pub type Record = serde_json::Map<String, serde_json::Value>;

/// 1つの論理テーブルとして識別された矩形の部分グリッド
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TableRegion {
    /// 領域全体の外接矩形（region_idのA1範囲の由来）
    pub bounds: CellRange,

    /// ヘッダー行の範囲（絶対行、両端含む）
    ///
    /// フリーテキストへフォールバックした領域ではNoneです。
    pub header_rows: Option<(u32, u32)>,

    /// データ行の範囲（絶対行、両端含む）
    ///
    /// ヘッダーのみの領域、およびフリーテキスト領域ではNoneです。
    pub data_rows: Option<(u32, u32)>,
}

/// 1領域分の抽出結果: 領域情報とレコード列
#[derive(Debug, Clone, PartialEq)]
pub struct RegionExtract {
    /// 領域情報
    pub region: TableRegion,

    /// 抽出されたレコード列（データ行の出現順）
    pub records: Vec<Record>,
}

/// シート抽出の能力インターフェース
///
/// 分類器の判定に応じて、Dispatcherが2つの実装のいずれかを選択します。
pub trait SheetExtractor {
    /// グリッドから1つ以上の領域とレコード列を抽出
    ///
    /// 抽出は全か無かです: 一部の領域だけ成功した状態で結果を返す
    /// ことはありません。
    fn extract(&self, grid: &Grid) -> Result<Vec<RegionExtract>, SheetsonError>;
}

/// セル値をJSON値へ変換
///
/// 空セルはnullになります。整数値の数値はJSON整数として出力します。
pub(crate) fn cell_to_json(value: &CellValue) -> serde_json::Value {
    use serde_json::Value;

    match value {
        CellValue::Number(n) => {
            if n.fract() == 0.0 && n.abs() < 1e15 {
                Value::from(*n as i64)
            } else {
                Value::from(*n)
            }
        }
        CellValue::String(s) => Value::from(s.clone()),
        CellValue::Bool(b) => Value::from(*b),
        CellValue::DateTime(dt) => Value::from(crate::types::format_datetime(dt)),
        CellValue::Error(e) => Value::from(e.clone()),
        CellValue::Empty => Value::Null,
    }
}

/// ヘッダーセルの値を列名の列へ変換
///
/// - 空のヘッダーには位置プレースホルダー `column_<index>` を割り当てる
/// - 重複するヘッダーには位置サフィックス `_<index>` を付けて一意化する
///   （インデックスは領域内の0始まりの列位置）
pub(crate) fn coerce_headers(raw_headers: &[String]) -> Vec<String> {
    let mut seen = std::collections::HashSet::new();
    let mut headers = Vec::with_capacity(raw_headers.len());

    for (index, raw) in raw_headers.iter().enumerate() {
        let mut header = if raw.trim().is_empty() {
            format!("column_{}", index)
        } else {
            raw.trim().to_string()
        };

        if !seen.insert(header.clone()) {
            header = format!("{}_{}", header, index);
            seen.insert(header.clone());
        }

        headers.push(header);
    }

    headers
}
