//! Builder Module
//!
//! Fluent Builder APIを提供し、`Dispatcher`インスタンスを段階的に構築する。
//! しきい値やリモートエンドポイントはすべてここで明示的に渡され、
//! 分類器・抽出器が周囲のグローバル状態に依存しないようにします。

use std::time::Duration;

use crate::api::SheetSelector;
use crate::delegate::{HttpDelegate, RemoteDelegate};
use crate::dispatcher::Dispatcher;
use crate::error::SheetsonError;
use crate::freetext::FreeTextExtractor;
use crate::storage::ObjectStore;

/// パイプライン処理の設定を保持する内部構造体
#[derive(Debug, Clone)]
pub(crate) struct PipelineConfig {
    /// シート選択方式
    pub sheet_selector: SheetSelector,

    /// 区切りとみなす空行・空列の最小連続数
    pub gap_rows: usize,

    /// 疎判定のしきい値（外接矩形に対する空セル割合）
    pub sparsity_threshold: f64,

    /// ヘッダー行の埋まり方のしきい値（データ行平均に対する割合）
    pub header_fill_threshold: f64,

    /// 領域として保持するために必要な最小非空セル数（未満はノイズとして破棄）
    pub min_region_cells: usize,

    /// リモート委譲先エンドポイント（未設定の場合は委譲不可）
    pub remote_endpoint: Option<String>,

    /// リモート委譲のタイムアウト
    pub remote_timeout: Duration,
}

impl Default for PipelineConfig {
    fn default() -> Self {
        Self {
            sheet_selector: SheetSelector::All,
            gap_rows: 2,
            sparsity_threshold: 0.6,
            header_fill_threshold: 0.5,
            min_region_cells: 4,
            remote_endpoint: None,
            remote_timeout: Duration::from_secs(300),
        }
    }
}

/// Fluent Builder APIを提供する構造体
///
/// `Dispatcher`インスタンスを段階的に構築するためのビルダーです。
/// しきい値にはデフォルト値が設定されており、必要な設定のみを
/// オーバーライドできます。オブジェクトストアだけは必須です。
///
/// # 使用例
///
/// ```rust,no_run
/// use sheetson::{DispatcherBuilder, LocalStore, SheetSelector};
///
/// # fn main() -> Result<(), sheetson::SheetsonError> {
/// let dispatcher = DispatcherBuilder::new()
///     .with_store(LocalStore::new("/data"))
///     .with_sheet_selector(SheetSelector::Index(0))
///     .with_gap_rows(3)
///     .with_remote_endpoint("https://extractor.example.com/parse")
///     .build()?;
/// # Ok(())
/// # }
/// ```
pub struct DispatcherBuilder {
    /// 内部設定（構築中）
    config: PipelineConfig,

    /// オブジェクトストア（必須）
    store: Option<Box<dyn ObjectStore>>,

    /// フリーテキスト抽出のコラボレーター（オプション）
    free_text: Option<Box<dyn FreeTextExtractor>>,

    /// リモート委譲の実装（テスト注入用。通常はエンドポイントから構築）
    delegate: Option<Box<dyn RemoteDelegate>>,
}

impl Default for DispatcherBuilder {
    fn default() -> Self {
        Self::new()
    }
}

impl DispatcherBuilder {
    /// デフォルト設定を持つビルダーインスタンスを生成する
    ///
    /// # デフォルト設定
    ///
    /// - シート選択: すべてのシート
    /// - ギャップ行数: 2
    /// - 疎判定しきい値: 0.6
    /// - ヘッダー埋まりしきい値: 0.5
    /// - 最小領域セル数: 4
    /// - リモートタイムアウト: 300秒
    pub fn new() -> Self {
        Self {
            config: PipelineConfig::default(),
            store: None,
            free_text: None,
            delegate: None,
        }
    }

    /// 処理対象のシートを選択する
    pub fn with_sheet_selector(mut self, selector: SheetSelector) -> Self {
        self.config.sheet_selector = selector;
        self
    }

    /// 区切りとみなす空行・空列の最小連続数を指定する
    pub fn with_gap_rows(mut self, gap_rows: usize) -> Self {
        self.config.gap_rows = gap_rows;
        self
    }

    /// 疎判定のしきい値を指定する
    ///
    /// 外接矩形に対する空セル割合がこの値を超えると`sparse_region`
    /// シグナルが発火します。
    pub fn with_sparsity_threshold(mut self, threshold: f64) -> Self {
        self.config.sparsity_threshold = threshold;
        self
    }

    /// ヘッダー行の埋まり方のしきい値を指定する
    pub fn with_header_fill_threshold(mut self, threshold: f64) -> Self {
        self.config.header_fill_threshold = threshold;
        self
    }

    /// ノイズとして破棄する領域の最小セル数を指定する
    pub fn with_min_region_cells(mut self, cells: usize) -> Self {
        self.config.min_region_cells = cells;
        self
    }

    /// リモート委譲先エンドポイントを指定する
    ///
    /// URLの検証は`build()`時に行われます。
    pub fn with_remote_endpoint(mut self, endpoint: impl Into<String>) -> Self {
        self.config.remote_endpoint = Some(endpoint.into());
        self
    }

    /// リモート委譲のタイムアウトを指定する
    pub fn with_remote_timeout(mut self, timeout: Duration) -> Self {
        self.config.remote_timeout = timeout;
        self
    }

    /// オブジェクトストアを設定する（必須）
    pub fn with_store(mut self, store: impl ObjectStore + 'static) -> Self {
        self.store = Some(Box::new(store));
        self
    }

    /// フリーテキスト抽出のコラボレーターを設定する
    ///
    /// 未設定の場合、非表形式領域を含むファイルはリモート委譲の
    /// 対象になります。
    pub fn with_free_text_extractor(mut self, extractor: impl FreeTextExtractor + 'static) -> Self {
        self.free_text = Some(Box::new(extractor));
        self
    }

    /// リモート委譲の実装を直接設定する
    ///
    /// 主にテストでの注入に使用します。設定された場合、
    /// `with_remote_endpoint`よりも優先されます。
    pub fn with_delegate(mut self, delegate: impl RemoteDelegate + 'static) -> Self {
        self.delegate = Some(Box::new(delegate));
        self
    }

    /// 設定を検証し、`Dispatcher`インスタンスを生成する
    ///
    /// # 発生し得るエラー
    ///
    /// * `SheetsonError::Config`: 設定の検証に失敗した場合
    ///   * しきい値が(0, 1]の範囲外
    ///   * ギャップ行数または最小領域セル数が0
    ///   * オブジェクトストアが未設定
    ///   * リモートエンドポイントのURLが不正
    pub fn build(self) -> Result<Dispatcher, SheetsonError> {
        // 1. しきい値の検証
        if self.config.gap_rows == 0 {
            return Err(SheetsonError::Config(
                "gap_rows must be at least 1".to_string(),
            ));
        }
        if !(0.0..=1.0).contains(&self.config.sparsity_threshold)
            || self.config.sparsity_threshold == 0.0
        {
            return Err(SheetsonError::Config(format!(
                "sparsity_threshold must be in (0, 1], got {}",
                self.config.sparsity_threshold
            )));
        }
        if !(0.0..=1.0).contains(&self.config.header_fill_threshold)
            || self.config.header_fill_threshold == 0.0
        {
            return Err(SheetsonError::Config(format!(
                "header_fill_threshold must be in (0, 1], got {}",
                self.config.header_fill_threshold
            )));
        }
        if self.config.min_region_cells == 0 {
            return Err(SheetsonError::Config(
                "min_region_cells must be at least 1".to_string(),
            ));
        }

        // 2. オブジェクトストアの検証
        let store = self.store.ok_or_else(|| {
            SheetsonError::Config("an object store is required".to_string())
        })?;

        // 3. リモート委譲の構築（注入があれば優先）
        let delegate = match (self.delegate, &self.config.remote_endpoint) {
            (Some(delegate), _) => Some(delegate),
            (None, Some(endpoint)) => {
                let url = reqwest::Url::parse(endpoint).map_err(|e| {
                    SheetsonError::Config(format!(
                        "invalid remote endpoint '{}': {}",
                        endpoint, e
                    ))
                })?;
                Some(Box::new(HttpDelegate::new(url, self.config.remote_timeout)?)
                    as Box<dyn RemoteDelegate>)
            }
            (None, None) => None,
        };

        Ok(Dispatcher::new(self.config, store, self.free_text, delegate))
    }
}
