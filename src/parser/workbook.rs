//! Workbook Loader Module
//!
//! calamineを使用したスプレッドシート読み込みの基礎実装。
//! XLS/XLSXの両コンテナを自動判別し、シートを`Grid`へ変換します。

use calamine::{open_workbook_auto_from_rs, Data, Reader, Sheets};
use chrono::{Duration, NaiveDate, NaiveDateTime};
use std::io::Cursor;
use tracing::debug;

use crate::api::SheetSelector;
use crate::error::SheetsonError;
use crate::grid::Grid;
use crate::parser::metadata::ContainerScanner;
use crate::security::SecurityConfig;
use crate::types::{CellCoord, CellValue};

/// ワークブックローダー
///
/// calamineのラッパーとして、ワークブックレベルの操作を提供します。
/// XLSXコンテナの場合は`ContainerScanner`を併用し、セル結合範囲と
/// 描画オブジェクトのメタデータも取得します。レガシーな`.xls`は
/// calamine経由のセルデータのみで、構造メタデータは空になります。
pub(crate) struct WorkbookLoader {
    /// calamineのワークブック（コンテナ形式は自動判別）
    workbook: Sheets<Cursor<Vec<u8>>>,

    /// XLSXコンテナスキャナー（XLSX以外はNone）
    scanner: Option<ContainerScanner>,
}

impl WorkbookLoader {
    /// ワークブックをバイト列から開く
    ///
    /// # 引数
    ///
    /// * `bytes` - スプレッドシートファイルのバイト列
    ///
    /// # 戻り値
    ///
    /// * `Ok(WorkbookLoader)` - 読み込みに成功した場合
    /// * `Err(SheetsonError::Load)` - パース可能なスプレッドシートでない場合
    pub fn open(bytes: Vec<u8>) -> Result<Self, SheetsonError> {
        // セキュリティチェック: 入力ファイルサイズの上限
        SecurityConfig::default().check_input_size(bytes.len())?;

        let workbook = open_workbook_auto_from_rs(Cursor::new(bytes.clone()))?;

        // メタデータ走査はZIPコンテナ（XLSX）のみ有効。
        // `.xls`はZIPではないため、失敗した場合はメタデータなしで続行する。
        let scanner = ContainerScanner::new(Cursor::new(bytes)).ok();
        if scanner.is_none() {
            debug!("container is not a ZIP archive; merge/drawing metadata unavailable");
        }

        Ok(Self { workbook, scanner })
    }

    /// すべてのシート名を取得
    pub fn sheet_names(&self) -> Vec<String> {
        self.workbook.sheet_names().to_vec()
    }

    /// シート選択方式に基づいてシートを選択
    ///
    /// # 戻り値
    ///
    /// * `Ok(Vec<String>)` - 選択されたシート名のリスト（ブック内の定義順）
    /// * `Err(SheetsonError::Config)` - シートが見つからない、またはインデックスが範囲外の場合
    pub fn select_sheets(&self, selector: &SheetSelector) -> Result<Vec<String>, SheetsonError> {
        let all_sheet_names = self.sheet_names();

        match selector {
            SheetSelector::All => Ok(all_sheet_names),

            SheetSelector::Index(index) => {
                if *index >= all_sheet_names.len() {
                    return Err(SheetsonError::Config(format!(
                        "Sheet index {} is out of range (total: {})",
                        index,
                        all_sheet_names.len()
                    )));
                }
                Ok(vec![all_sheet_names[*index].clone()])
            }

            SheetSelector::Name(name) => {
                if !all_sheet_names.contains(name) {
                    return Err(SheetsonError::Config(format!("Sheet '{}' not found", name)));
                }
                Ok(vec![name.clone()])
            }
        }
    }

    /// 指定シートを`Grid`として読み込む
    ///
    /// calamineの使用範囲は先頭の使用セルに固定されているため、
    /// 範囲の開始オフセットを加えて絶対座標へ戻します。書式だけを持つ
    /// 空白セルは空値として取り込まれます（欠落扱いにはしません）。
    ///
    /// # 戻り値
    ///
    /// * `Ok(Grid)` - 読み込みに成功した場合
    /// * `Err(SheetsonError::Load)` - シートが存在しない場合
    pub fn load_grid(&mut self, sheet_name: &str) -> Result<Grid, SheetsonError> {
        // 1. セルデータの取得
        let range = self.workbook.worksheet_range(sheet_name)?;

        // 2. 構造メタデータの取得（XLSXのみ）
        let (structure, is_1904) = match &self.scanner {
            Some(scanner) => (scanner.sheet_structure(sheet_name), scanner.is_1904()),
            None => (Default::default(), false),
        };

        // 3. セルの抽出（相対座標 -> 絶対座標）
        let (start_row, start_col) = range.start().unwrap_or((0, 0));
        let mut cells = Vec::new();
        for (rel_row, rel_col, data) in range.used_cells() {
            let coord = CellCoord::new(start_row + rel_row as u32, start_col + rel_col as u32);
            let value = convert_cell(data, is_1904);
            if !value.is_empty() {
                cells.push((coord, value));
            }
        }

        debug!(
            sheet = sheet_name,
            cells = cells.len(),
            merges = structure.merges.len(),
            drawings = structure.drawing_count,
            "loaded sheet grid"
        );

        Ok(Grid::build(
            sheet_name.to_string(),
            cells,
            structure.merges,
            structure.drawing_count,
        ))
    }
}

/// calamineのセルデータを`CellValue`へ変換
fn convert_cell(data: &Data, is_1904: bool) -> CellValue {
    match data {
        Data::Int(i) => CellValue::Number(*i as f64),
        Data::Float(f) => CellValue::Number(*f),
        Data::String(s) => CellValue::String(s.clone()),
        Data::Bool(b) => CellValue::Bool(*b),
        Data::DateTime(dt) => match serial_to_datetime(dt.as_f64(), is_1904) {
            Some(datetime) => CellValue::DateTime(datetime),
            // シリアル値が日時として解釈できない場合は数値のまま保持する
            None => CellValue::Number(dt.as_f64()),
        },
        Data::DateTimeIso(s) => match parse_iso_datetime(s) {
            Some(datetime) => CellValue::DateTime(datetime),
            None => CellValue::String(s.clone()),
        },
        Data::DurationIso(s) => CellValue::String(s.clone()),
        Data::Error(e) => CellValue::Error(format!("{:?}", e)),
        Data::Empty => CellValue::Empty,
    }
}

/// Excelのシリアル日付値を日時へ変換
///
/// # エポックシステム
///
/// - 1900年システム（デフォルト）: 1899年12月30日起算
///   - Excelの1900年うるう年バグにより、エポックは1899-12-31ではなく
///     1899-12-30になる（シリアル値60が存在しない1900-02-29を指すため）
/// - 1904年システム: 1904年1月1日起算（Mac版Excelで使用される）
///
/// 小数部分は1日を86400秒として時刻へ変換します。
fn serial_to_datetime(serial: f64, is_1904: bool) -> Option<NaiveDateTime> {
    if !serial.is_finite() || serial < 0.0 {
        return None;
    }

    let epoch = if is_1904 {
        NaiveDate::from_ymd_opt(1904, 1, 1)?
    } else {
        NaiveDate::from_ymd_opt(1899, 12, 30)?
    };

    let days = serial.floor() as i64;
    let secs = ((serial - serial.floor()) * 86_400.0).round() as i64;

    let date = epoch.checked_add_signed(Duration::days(days))?;
    let midnight = date.and_hms_opt(0, 0, 0)?;
    midnight.checked_add_signed(Duration::seconds(secs))
}

/// ISO 8601形式の日時文字列をパース
fn parse_iso_datetime(s: &str) -> Option<NaiveDateTime> {
    if let Ok(dt) = NaiveDateTime::parse_from_str(s, "%Y-%m-%dT%H:%M:%S%.f") {
        return Some(dt);
    }
    if let Ok(date) = NaiveDate::parse_from_str(s, "%Y-%m-%d") {
        return date.and_hms_opt(0, 0, 0);
    }
    None
}
