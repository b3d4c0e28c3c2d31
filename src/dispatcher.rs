//! Dispatcher Module
//!
//! パイプライン全体のオーケストレーションを担うモジュール。
//! 読み込み → 分類 → 抽出（単純 / 複雑） → シリアライズ → 永続化を
//! 1本の同期パイプラインとして実行します。複雑パスがローカルで処理
//! できない場合は、ファイル全体をリモートエンドポイントへワンショットで
//! 委譲し、その応答をそのままアーティファクトとして採用します。

use tracing::{info, instrument, warn};

use crate::builder::{DispatcherBuilder, PipelineConfig};
use crate::classifier::Classifier;
use crate::delegate::RemoteDelegate;
use crate::error::SheetsonError;
use crate::extract::{ComplexExtractor, SheetExtractor, SimpleExtractor};
use crate::freetext::FreeTextExtractor;
use crate::output::{self, ParseResult};
use crate::parser::WorkbookLoader;
use crate::storage::{ObjectRef, ObjectStore};

/// パイプライン処理のファサード
///
/// `DispatcherBuilder`で構築された設定とコラボレーターに基づいて、
/// 1ファイルの処理を実行します。1回の呼び出しはシングルスレッドかつ
/// 同期的で、共有可変状態を持ちません。複数ファイルの並行処理は
/// 独立した呼び出し同士で行えます。
pub struct Dispatcher {
    /// パイプライン設定
    config: PipelineConfig,

    /// オブジェクトストア
    store: Box<dyn ObjectStore>,

    /// フリーテキスト抽出のコラボレーター（オプション）
    free_text: Option<Box<dyn FreeTextExtractor>>,

    /// リモート委譲の実装（オプション）
    delegate: Option<Box<dyn RemoteDelegate>>,
}

impl Dispatcher {
    pub(crate) fn new(
        config: PipelineConfig,
        store: Box<dyn ObjectStore>,
        free_text: Option<Box<dyn FreeTextExtractor>>,
        delegate: Option<Box<dyn RemoteDelegate>>,
    ) -> Self {
        Self {
            config,
            store,
            free_text,
            delegate,
        }
    }

    /// ビルダーを取得
    pub fn builder() -> DispatcherBuilder {
        DispatcherBuilder::new()
    }

    /// 1ファイルを処理し、アーティファクトを永続化する
    ///
    /// # 処理フロー
    ///
    /// 1. オブジェクトストアから入力ファイルを読み込む
    /// 2. シートごとに 読み込み → 分類 → 抽出 を実行する
    /// 3. 複雑パスが`FreeTextUnavailable`で失敗した場合、ファイル全体を
    ///    リモートへ委譲し、応答をそのまま採用する
    /// 4. アーティファクトをJSONへシリアライズし、`<stem>.json`へ書き込む
    ///
    /// エラーが発生した場合、アーティファクトは書き込まれません。
    /// 委譲の失敗が単純パスへ降格されることもありません。
    #[instrument(skip(self), fields(reference = %reference))]
    pub fn process(&self, reference: &ObjectRef) -> Result<Vec<ParseResult>, SheetsonError> {
        let bytes = self.store.get(reference)?;

        let results = match self.convert(bytes, Some(reference)) {
            Ok(results) => results,
            Err(SheetsonError::FreeTextUnavailable { sheet }) => match &self.delegate {
                Some(delegate) => {
                    info!(
                        sheet = %sheet,
                        "local environment lacks the layout-aware extractor; delegating whole file"
                    );
                    delegate.delegate(reference)?
                }
                None => return Err(SheetsonError::FreeTextUnavailable { sheet }),
            },
            Err(e) => return Err(e),
        };

        let artifact = output::to_json_bytes(&results)?;
        let artifact_ref = reference.artifact_ref();
        self.store.put(&artifact_ref, &artifact)?;
        info!(artifact = %artifact_ref, sheets = results.len(), "artifact written");

        Ok(results)
    }

    /// ワークブックのバイト列を変換する（永続化なし）
    ///
    /// 選択された各シートについて、分類器の判定に応じた抽出パスを
    /// `SheetExtractor`インターフェース越しに選択します。
    ///
    /// 複数シートを処理する場合、データ行のない個々のシートは警告の上
    /// スキップされます。すべてのシートが空の場合のみ`EmptySheet`で
    /// 失敗します（単一シート選択時はそのまま表面化します）。
    pub fn convert(
        &self,
        bytes: Vec<u8>,
        source: Option<&ObjectRef>,
    ) -> Result<Vec<ParseResult>, SheetsonError> {
        let mut loader = WorkbookLoader::open(bytes)?;
        let sheet_names = loader.select_sheets(&self.config.sheet_selector)?;
        let classifier = Classifier::new(
            self.config.gap_rows,
            self.config.sparsity_threshold,
            self.config.header_fill_threshold,
        );

        let mut results = Vec::new();
        for sheet_name in &sheet_names {
            let grid = loader.load_grid(sheet_name)?;
            let verdict = classifier.classify(&grid);

            let simple = SimpleExtractor::new();
            let mut complex = ComplexExtractor::new(
                self.config.gap_rows,
                self.config.header_fill_threshold,
                self.config.min_region_cells,
            );
            if let Some(free_text) = self.free_text.as_deref() {
                complex = complex.with_free_text(free_text);
            }

            // 判定に応じて抽出パスを選択する
            let extractor: &dyn SheetExtractor = if verdict.is_complex() {
                &complex
            } else {
                &simple
            };

            let extracts = match extractor.extract(&grid) {
                Ok(extracts) => extracts,
                Err(SheetsonError::EmptySheet { sheet }) if sheet_names.len() > 1 => {
                    warn!(sheet = %sheet, "sheet has no data rows; skipping");
                    continue;
                }
                Err(e) => return Err(e),
            };

            results.push(ParseResult::new(
                sheet_name.clone(),
                source.map(|r| r.to_string()),
                &verdict,
                extracts,
            ));
        }

        if results.is_empty() {
            return Err(SheetsonError::EmptySheet {
                sheet: sheet_names.first().cloned().unwrap_or_default(),
            });
        }

        Ok(results)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::builder::DispatcherBuilder;
    use std::collections::HashMap;
    use std::sync::{Arc, Mutex};

    /// テスト用のインメモリストア
    #[derive(Clone, Default)]
    struct MemoryStore {
        objects: Arc<Mutex<HashMap<String, Vec<u8>>>>,
    }

    impl MemoryStore {
        fn insert(&self, reference: &ObjectRef, bytes: Vec<u8>) {
            self.objects
                .lock()
                .unwrap()
                .insert(reference.to_string(), bytes);
        }

        fn read(&self, reference: &ObjectRef) -> Option<Vec<u8>> {
            self.objects.lock().unwrap().get(&reference.to_string()).cloned()
        }
    }

    impl ObjectStore for MemoryStore {
        fn get(&self, reference: &ObjectRef) -> Result<Vec<u8>, SheetsonError> {
            self.read(reference).ok_or_else(|| {
                SheetsonError::Storage(format!("object '{}' not found", reference))
            })
        }

        fn put(&self, reference: &ObjectRef, bytes: &[u8]) -> Result<(), SheetsonError> {
            self.insert(reference, bytes.to_vec());
            Ok(())
        }
    }

    /// 常に固定応答を返す委譲モック
    struct FixedDelegate {
        results: Vec<ParseResult>,
    }

    impl RemoteDelegate for FixedDelegate {
        fn delegate(&self, _reference: &ObjectRef) -> Result<Vec<ParseResult>, SheetsonError> {
            Ok(self.results.clone())
        }
    }

    /// 常に失敗する委譲モック
    struct FailingDelegate;

    impl RemoteDelegate for FailingDelegate {
        fn delegate(&self, _reference: &ObjectRef) -> Result<Vec<ParseResult>, SheetsonError> {
            Err(SheetsonError::Delegation("request timed out".to_string()))
        }
    }

    fn simple_workbook() -> Vec<u8> {
        use rust_xlsxwriter::Workbook;
        let mut workbook = Workbook::new();
        let worksheet = workbook.add_worksheet();
        worksheet.write_string(0, 0, "Name").unwrap();
        worksheet.write_string(0, 1, "Age").unwrap();
        worksheet.write_string(1, 0, "Alice").unwrap();
        worksheet.write_number(1, 1, 30.0).unwrap();
        worksheet.write_string(2, 0, "Bob").unwrap();
        worksheet.write_number(2, 1, 25.0).unwrap();
        workbook.save_to_buffer().unwrap()
    }

    /// 表 + 3空行 + 1列のフリーテキストブロックを持つワークブック
    fn workbook_with_free_text_block() -> Vec<u8> {
        use rust_xlsxwriter::Workbook;
        let mut workbook = Workbook::new();
        let worksheet = workbook.add_worksheet();
        worksheet.write_string(0, 0, "Item").unwrap();
        worksheet.write_string(0, 1, "Count").unwrap();
        worksheet.write_string(1, 0, "apples").unwrap();
        worksheet.write_number(1, 1, 4.0).unwrap();
        // 行2〜4は空（ギャップ）
        worksheet.write_string(5, 0, "Notes from the field:").unwrap();
        worksheet.write_string(6, 0, "all samples stored at 4C").unwrap();
        worksheet.write_string(7, 0, "second batch delayed").unwrap();
        worksheet.write_string(8, 0, "no anomalies observed").unwrap();
        workbook.save_to_buffer().unwrap()
    }

    fn empty_workbook() -> Vec<u8> {
        use rust_xlsxwriter::Workbook;
        let mut workbook = Workbook::new();
        let _ = workbook.add_worksheet();
        workbook.save_to_buffer().unwrap()
    }

    fn dispatcher_with(store: MemoryStore) -> Dispatcher {
        DispatcherBuilder::new().with_store(store).build().unwrap()
    }

    #[test]
    fn test_process_simple_workbook_writes_artifact() {
        let store = MemoryStore::default();
        let reference = ObjectRef::new("uploads", "people.xlsx");
        store.insert(&reference, simple_workbook());

        let dispatcher = dispatcher_with(store.clone());
        let results = dispatcher.process(&reference).unwrap();

        assert_eq!(results.len(), 1);
        assert!(!results[0].complexity.is_complex);
        assert_eq!(results[0].regions.len(), 1);
        assert_eq!(results[0].regions[0].records.len(), 2);
        assert_eq!(
            results[0].source.as_deref(),
            Some("uploads/people.xlsx")
        );

        // アーティファクトは<stem>.jsonへ書き込まれる
        let artifact = store.read(&ObjectRef::new("uploads", "people.json")).unwrap();
        let restored = output::from_json_bytes(&artifact).unwrap();
        assert_eq!(restored, results);
    }

    #[test]
    fn test_free_text_block_delegates_when_no_local_extractor() {
        let store = MemoryStore::default();
        let reference = ObjectRef::new("uploads", "field-notes.xlsx");
        store.insert(&reference, workbook_with_free_text_block());

        let remote_results = vec![ParseResult {
            sheet_name: "Sheet1".to_string(),
            source: None,
            complexity: crate::output::ComplexityOutput {
                is_complex: true,
                signals: vec!["multi_table".to_string()],
            },
            regions: vec![],
        }];

        let dispatcher = DispatcherBuilder::new()
            .with_store(store.clone())
            .with_delegate(FixedDelegate {
                results: remote_results.clone(),
            })
            .build()
            .unwrap();

        let results = dispatcher.process(&reference).unwrap();

        // リモート応答がそのまま採用され、永続化される
        assert_eq!(results, remote_results);
        let artifact = store
            .read(&ObjectRef::new("uploads", "field-notes.json"))
            .unwrap();
        assert_eq!(output::from_json_bytes(&artifact).unwrap(), remote_results);
    }

    #[test]
    fn test_free_text_block_without_delegate_surfaces_error() {
        let store = MemoryStore::default();
        let reference = ObjectRef::new("uploads", "field-notes.xlsx");
        store.insert(&reference, workbook_with_free_text_block());

        let dispatcher = dispatcher_with(store.clone());
        let result = dispatcher.process(&reference);

        assert!(matches!(
            result,
            Err(SheetsonError::FreeTextUnavailable { .. })
        ));
        // アーティファクトは書き込まれない
        assert!(store
            .read(&ObjectRef::new("uploads", "field-notes.json"))
            .is_none());
    }

    #[test]
    fn test_delegation_failure_is_fatal_and_writes_nothing() {
        let store = MemoryStore::default();
        let reference = ObjectRef::new("uploads", "field-notes.xlsx");
        store.insert(&reference, workbook_with_free_text_block());

        let dispatcher = DispatcherBuilder::new()
            .with_store(store.clone())
            .with_delegate(FailingDelegate)
            .build()
            .unwrap();

        let result = dispatcher.process(&reference);
        assert!(matches!(result, Err(SheetsonError::Delegation(_))));
        assert!(store
            .read(&ObjectRef::new("uploads", "field-notes.json"))
            .is_none());
    }

    #[test]
    fn test_local_free_text_extractor_avoids_delegation() {
        struct Joiner;
        impl FreeTextExtractor for Joiner {
            fn extract_free_text(&self, region_bytes: &[u8]) -> Result<String, SheetsonError> {
                Ok(String::from_utf8_lossy(region_bytes).replace('\n', " / "))
            }
        }

        let store = MemoryStore::default();
        let reference = ObjectRef::new("uploads", "field-notes.xlsx");
        store.insert(&reference, workbook_with_free_text_block());

        let dispatcher = DispatcherBuilder::new()
            .with_store(store.clone())
            .with_free_text_extractor(Joiner)
            .build()
            .unwrap();

        let results = dispatcher.process(&reference).unwrap();
        assert_eq!(results.len(), 1);
        assert!(results[0].complexity.is_complex);
        assert_eq!(results[0].regions.len(), 2);

        // 2番目の領域はフリーテキストフィールドを1つだけ持つ
        let text_region = &results[0].regions[1];
        let text = text_region.records[0]["text"].as_str().unwrap();
        assert!(text.contains("second batch delayed"));
    }

    #[test]
    fn test_empty_workbook_fails_with_empty_sheet() {
        let store = MemoryStore::default();
        let reference = ObjectRef::new("uploads", "empty.xlsx");
        store.insert(&reference, empty_workbook());

        let dispatcher = dispatcher_with(store.clone());
        let result = dispatcher.process(&reference);

        assert!(matches!(result, Err(SheetsonError::EmptySheet { .. })));
        assert!(store.read(&ObjectRef::new("uploads", "empty.json")).is_none());
    }

    #[test]
    fn test_multi_sheet_skips_empty_sheets() {
        use rust_xlsxwriter::Workbook;
        let mut workbook = Workbook::new();
        let sheet1 = workbook.add_worksheet();
        sheet1.write_string(0, 0, "Header").unwrap();
        sheet1.write_string(1, 0, "value").unwrap();
        let _empty = workbook.add_worksheet();
        let bytes = workbook.save_to_buffer().unwrap();

        let store = MemoryStore::default();
        let reference = ObjectRef::new("uploads", "mixed.xlsx");
        store.insert(&reference, bytes);

        let dispatcher = dispatcher_with(store.clone());
        let results = dispatcher.process(&reference).unwrap();

        // 空のシートはスキップされ、データのあるシートだけが残る
        assert_eq!(results.len(), 1);
        assert_eq!(results[0].sheet_name, "Sheet1");
    }

    #[test]
    fn test_missing_object_surfaces_storage_error() {
        let dispatcher = dispatcher_with(MemoryStore::default());
        let result = dispatcher.process(&ObjectRef::new("uploads", "missing.xlsx"));
        assert!(matches!(result, Err(SheetsonError::Storage(_))));
    }
}
