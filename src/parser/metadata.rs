//! XML Metadata Scanner Module
//!
//! XLSX内部のXMLファイルから、calamineで取得できない構造情報を抽出するモジュール。
//! セル結合範囲、描画オブジェクトのアンカー、シート名とワークシート
//! ファイルの対応関係を提供します。

use std::collections::HashMap;
use std::io::{Read, Seek};
use zip::ZipArchive;

use crate::error::SheetsonError;
use crate::security::SecurityConfig;
use crate::types::{CellCoord, CellRange, MergedRegion};

/// 1シート分の構造メタデータ
#[derive(Debug, Clone, Default)]
pub(crate) struct SheetStructure {
    /// セル結合範囲のリスト
    pub merges: Vec<MergedRegion>,

    /// シート内にアンカーされた描画オブジェクト参照の数
    /// （画像・図形・グラフ。オブジェクト自体はデコードしない）
    pub drawing_count: usize,
}

/// XLSXコンテナスキャナー
///
/// XLSXファイル（ZIPアーカイブ）のXMLを直接解析し、シート名ごとの
/// 構造メタデータを構築します。レガシーな`.xls`コンテナはZIPでは
/// ないため、スキャナーの構築に失敗します。呼び出し側（Grid Loader）
/// はその場合メタデータなしとして処理を続行します。
pub(crate) struct ContainerScanner {
    /// シート名 -> 構造メタデータ
    structures: HashMap<String, SheetStructure>,

    /// 1904年エポックを使用するかどうか（ワークブック全体の設定）
    is_1904: bool,
}

impl ContainerScanner {
    /// XLSXコンテナからメタデータを走査
    ///
    /// # 引数
    ///
    /// * `reader` - XLSXファイルを読み込むためのリーダー（Read + Seekトレイトを実装）
    ///
    /// # 戻り値
    ///
    /// * `Ok(ContainerScanner)` - 走査に成功した場合
    /// * `Err(SheetsonError)` - ZIPとして開けない、または解析エラーが発生した場合
    pub fn new<R: Read + Seek>(reader: R) -> Result<Self, SheetsonError> {
        let mut archive =
            ZipArchive::new(reader).map_err(|e| SheetsonError::Zip(format!("{}", e)))?;

        // セキュリティチェック: ファイル数・パス・サイズの制限
        SecurityConfig::default().check_archive(&mut archive)?;

        // 1. xl/workbook.xml からシート名とリレーションシップIDの対応、
        //    および1904年エポックフラグを取得
        let (sheet_rel_ids, is_1904) = Self::parse_workbook(&mut archive)?;

        // 2. xl/_rels/workbook.xml.rels からリレーションシップIDとパスの対応を取得
        let rel_targets = Self::parse_workbook_relationships(&mut archive)?;

        // 3. 各シートのワークシートXMLを解析
        let mut structures = HashMap::new();
        for (sheet_name, rel_id) in sheet_rel_ids {
            let target = match rel_targets.get(&rel_id) {
                Some(target) => Self::normalize_target(target),
                None => continue,
            };

            let mut file = match archive.by_name(&target) {
                Ok(file) => file,
                Err(_) => continue,
            };
            let structure = Self::parse_worksheet_xml(&mut file)?;
            structures.insert(sheet_name, structure);
        }

        Ok(Self {
            structures,
            is_1904,
        })
    }

    /// 指定シートの構造メタデータを取得
    ///
    /// シートが見つからない場合は空のメタデータを返します。
    pub fn sheet_structure(&self, sheet_name: &str) -> SheetStructure {
        self.structures.get(sheet_name).cloned().unwrap_or_default()
    }

    /// 1904年エポックを使用するかどうかを取得
    pub fn is_1904(&self) -> bool {
        self.is_1904
    }

    /// リレーションシップのターゲットパスをアーカイブパスへ正規化
    ///
    /// 例: "worksheets/sheet1.xml" -> "xl/worksheets/sheet1.xml"、
    /// "/xl/worksheets/sheet1.xml" -> "xl/worksheets/sheet1.xml"
    fn normalize_target(target: &str) -> String {
        if let Some(stripped) = target.strip_prefix('/') {
            stripped.to_string()
        } else {
            format!("xl/{}", target)
        }
    }

    /// xl/workbook.xml の解析（プライベート）
    ///
    /// `<sheet name="..." r:id="..."/>` 要素から、ブック内の定義順で
    /// シート名とリレーションシップIDのペアを抽出します。あわせて
    /// `<workbookPr date1904="true"/>` から1904年エポックフラグを取得します。
    #[allow(clippy::type_complexity)]
    fn parse_workbook<R: Read + Seek>(
        archive: &mut ZipArchive<R>,
    ) -> Result<(Vec<(String, String)>, bool), SheetsonError> {
        let mut sheets = Vec::new();
        let mut is_1904 = false;

        let mut workbook_file = match archive.by_name("xl/workbook.xml") {
            Ok(file) => file,
            Err(_) => {
                // workbook.xmlが存在しない場合は空の結果を返す
                return Ok((sheets, is_1904));
            }
        };

        let mut xml_content = Vec::new();
        workbook_file.read_to_end(&mut xml_content)?;

        use quick_xml::events::Event;
        use quick_xml::Reader;

        let mut reader = Reader::from_reader(xml_content.as_slice());
        reader.trim_text(true);

        let mut buf = Vec::new();
        loop {
            match reader.read_event_into(&mut buf) {
                Ok(Event::Start(e)) | Ok(Event::Empty(e)) => match e.name().as_ref() {
                    b"sheet" => {
                        let mut name = None;
                        let mut rel_id = None;

                        for attr in e.attributes() {
                            let attr = attr.map_err(|e| {
                                SheetsonError::Config(format!("XML attribute error: {}", e))
                            })?;
                            match attr.key.as_ref() {
                                b"name" => {
                                    name = Some(std::str::from_utf8(&attr.value)?.to_string());
                                }
                                b"r:id" => {
                                    rel_id = Some(std::str::from_utf8(&attr.value)?.to_string());
                                }
                                _ => {}
                            }
                        }

                        if let (Some(name), Some(rel_id)) = (name, rel_id) {
                            sheets.push((name, rel_id));
                        }
                    }
                    b"workbookPr" => {
                        // <workbookPr date1904="true"/>
                        for attr in e.attributes() {
                            let attr = attr.map_err(|e| {
                                SheetsonError::Config(format!("XML attribute error: {}", e))
                            })?;
                            if attr.key.as_ref() == b"date1904" {
                                let value_str = std::str::from_utf8(&attr.value)?;
                                is_1904 = value_str == "1" || value_str == "true";
                            }
                        }
                    }
                    _ => {}
                },
                Ok(Event::Eof) => break,
                Err(e) => return Err(SheetsonError::Config(format!("XML parse error: {}", e))),
                _ => {}
            }
        }

        Ok((sheets, is_1904))
    }

    /// xl/_rels/workbook.xml.rels の解析（プライベート）
    ///
    /// `<Relationship Id="..." Target="..."/>` 要素から、リレーションシップ
    /// IDとターゲットパスのマッピングを構築します。
    fn parse_workbook_relationships<R: Read + Seek>(
        archive: &mut ZipArchive<R>,
    ) -> Result<HashMap<String, String>, SheetsonError> {
        let mut relationships = HashMap::new();

        let mut rels_file = match archive.by_name("xl/_rels/workbook.xml.rels") {
            Ok(file) => file,
            Err(_) => return Ok(relationships),
        };

        let mut xml_content = Vec::new();
        rels_file.read_to_end(&mut xml_content)?;

        use quick_xml::events::Event;
        use quick_xml::Reader;

        let mut reader = Reader::from_reader(xml_content.as_slice());
        reader.trim_text(true);

        let mut buf = Vec::new();
        loop {
            match reader.read_event_into(&mut buf) {
                Ok(Event::Start(e)) | Ok(Event::Empty(e)) => {
                    // Event::Emptyは自己終了タグの場合に発生
                    if e.name().as_ref() == b"Relationship" {
                        let mut id = None;
                        let mut target = None;

                        for attr in e.attributes() {
                            let attr = attr.map_err(|e| {
                                SheetsonError::Config(format!("XML attribute error: {}", e))
                            })?;
                            match attr.key.as_ref() {
                                b"Id" => {
                                    id = Some(std::str::from_utf8(&attr.value)?.to_string());
                                }
                                b"Target" => {
                                    target = Some(std::str::from_utf8(&attr.value)?.to_string());
                                }
                                _ => {}
                            }
                        }

                        if let (Some(id), Some(target)) = (id, target) {
                            relationships.insert(id, target);
                        }
                    }
                }
                Ok(Event::Eof) => break,
                Err(e) => return Err(SheetsonError::Config(format!("XML parse error: {}", e))),
                _ => {}
            }
        }

        Ok(relationships)
    }

    /// ワークシートXMLから構造メタデータを解析（プライベート）
    ///
    /// `<mergeCell ref="A1:C2"/>` と `<drawing r:id="..."/>` /
    /// `<legacyDrawing r:id="..."/>` を抽出します。
    fn parse_worksheet_xml(
        reader: &mut zip::read::ZipFile<'_>,
    ) -> Result<SheetStructure, SheetsonError> {
        use quick_xml::events::Event;
        use quick_xml::Reader;

        let mut xml_content = Vec::new();
        reader.read_to_end(&mut xml_content)?;

        let mut xml_reader = Reader::from_reader(xml_content.as_slice());
        xml_reader.trim_text(true);

        let mut buf = Vec::new();
        let mut merges = Vec::new();
        let mut drawing_count = 0usize;

        loop {
            match xml_reader.read_event_into(&mut buf) {
                Ok(Event::Start(e)) | Ok(Event::Empty(e)) => {
                    match e.name().as_ref() {
                        b"mergeCell" => {
                            // <mergeCell ref="A1:C2"/>
                            for attr in e.attributes() {
                                let attr = attr.map_err(|e| {
                                    SheetsonError::Config(format!("XML attribute error: {}", e))
                                })?;
                                if attr.key.as_ref() == b"ref" {
                                    let ref_str = std::str::from_utf8(&attr.value)?;
                                    if let Some(range) = parse_range_ref(ref_str) {
                                        merges.push(MergedRegion::new(range));
                                    }
                                }
                            }
                        }
                        b"drawing" | b"legacyDrawing" => {
                            // 描画オブジェクトへの参照（メタデータのみ、デコードしない）
                            drawing_count += 1;
                        }
                        _ => {}
                    }
                }
                Ok(Event::Eof) => break,
                Err(e) => return Err(SheetsonError::Config(format!("XML parse error: {}", e))),
                _ => {}
            }
        }

        Ok(SheetStructure {
            merges,
            drawing_count,
        })
    }
}

/// セル参照文字列を座標に変換（例: "A1" -> (0, 0)）
pub(crate) fn parse_cell_ref(ref_str: &str) -> Option<CellCoord> {
    let mut col_str = String::new();
    let mut row_str = String::new();

    for ch in ref_str.chars() {
        if ch.is_ascii_alphabetic() {
            col_str.push(ch.to_ascii_uppercase());
        } else if ch.is_ascii_digit() {
            row_str.push(ch);
        }
    }

    if col_str.is_empty() || row_str.is_empty() {
        return None;
    }

    // 列を数値に変換（A=0, B=1, ..., Z=25, AA=26, ...）
    let col = col_str
        .chars()
        .rev()
        .enumerate()
        .map(|(i, ch)| {
            let val = (ch as u32) - ('A' as u32) + 1;
            val * 26_u32.pow(i as u32)
        })
        .sum::<u32>()
        - 1;

    // 行を数値に変換（1始まりなので0始まりに変換）
    let row = row_str.parse::<u32>().ok()? - 1;

    Some(CellCoord::new(row, col))
}

/// セル範囲参照文字列を範囲に変換（例: "A1:C2"）
///
/// 単一セル参照（例: "B3"）は1セルの範囲として解釈します。
pub(crate) fn parse_range_ref(ref_str: &str) -> Option<CellRange> {
    match ref_str.split_once(':') {
        Some((start, end)) => {
            let start = parse_cell_ref(start)?;
            let end = parse_cell_ref(end)?;
            Some(CellRange::new(start, end))
        }
        None => {
            let coord = parse_cell_ref(ref_str)?;
            Some(CellRange::new(coord, coord))
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_cell_ref() {
        assert_eq!(parse_cell_ref("A1"), Some(CellCoord::new(0, 0)));
        assert_eq!(parse_cell_ref("Z1"), Some(CellCoord::new(0, 25)));
        assert_eq!(parse_cell_ref("AA10"), Some(CellCoord::new(9, 26)));
        assert_eq!(parse_cell_ref("C7"), Some(CellCoord::new(6, 2)));
        assert_eq!(parse_cell_ref(""), None);
        assert_eq!(parse_cell_ref("123"), None);
        assert_eq!(parse_cell_ref("ABC"), None);
    }

    #[test]
    fn test_parse_range_ref() {
        let range = parse_range_ref("A1:C2").unwrap();
        assert_eq!(range.start, CellCoord::new(0, 0));
        assert_eq!(range.end, CellCoord::new(1, 2));

        // 単一セル参照
        let single = parse_range_ref("B3").unwrap();
        assert_eq!(single.start, CellCoord::new(2, 1));
        assert_eq!(single.end, CellCoord::new(2, 1));

        assert!(parse_range_ref(":").is_none());
    }

    #[test]
    fn test_normalize_target() {
        assert_eq!(
            ContainerScanner::normalize_target("worksheets/sheet1.xml"),
            "xl/worksheets/sheet1.xml"
        );
        assert_eq!(
            ContainerScanner::normalize_target("/xl/worksheets/sheet1.xml"),
            "xl/worksheets/sheet1.xml"
        );
    }

    #[test]
    fn test_scanner_rejects_non_zip_input() {
        let bytes = b"this is not a zip archive";
        let result = ContainerScanner::new(std::io::Cursor::new(bytes.as_slice()));
        assert!(matches!(result, Err(SheetsonError::Zip(_))));
    }

    #[test]
    fn test_sheet_structure_default_for_unknown_sheet() {
        // 空ZIP（有効なZIPだがXLSXではない）から構築し、未知シートを引く
        let mut cursor = std::io::Cursor::new(Vec::new());
        {
            let mut zip_writer = zip::ZipWriter::new(&mut cursor);
            zip_writer.finish().unwrap();
        }
        cursor.set_position(0);
        let scanner = ContainerScanner::new(cursor).unwrap();
        let structure = scanner.sheet_structure("NoSuchSheet");
        assert!(structure.merges.is_empty());
        assert_eq!(structure.drawing_count, 0);
    }
}
