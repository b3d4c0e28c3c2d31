//! Object Storage Interface
//!
//! 入力ファイルの読み込みと出力アーティファクトの書き込みを担う
//! 外部コラボレーターの能力インターフェースを定義するモジュール。
//! ファイルシステムを使用する`LocalStore`実装を同梱します。クラウド
//! バックエンドはこのトレイトの背後に差し込みます。

use std::fmt;
use std::path::PathBuf;

use serde::{Deserialize, Serialize};

use crate::error::SheetsonError;

/// オブジェクトストア内のファイル参照
///
/// リモート委譲のペイロードとしてもそのままシリアライズされます。
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ObjectRef {
    /// バケット（またはコンテナ）名
    pub bucket: String,

    /// オブジェクト名（バケット内のパス）
    pub object_name: String,
}

impl ObjectRef {
    /// 新しい参照を生成
    pub fn new(bucket: impl Into<String>, object_name: impl Into<String>) -> Self {
        Self {
            bucket: bucket.into(),
            object_name: object_name.into(),
        }
    }

    /// 出力アーティファクトの参照を導出
    ///
    /// 入力オブジェクト名の拡張子を`.json`へ置き換えます
    /// （例: "uploads/report.xlsx" -> "uploads/report.json"）。
    /// 既知の拡張子がない場合は`.json`を付加します。
    pub fn artifact_ref(&self) -> ObjectRef {
        let stem = self
            .object_name
            .strip_suffix(".xlsx")
            .or_else(|| self.object_name.strip_suffix(".xls"))
            .unwrap_or(&self.object_name);

        ObjectRef {
            bucket: self.bucket.clone(),
            object_name: format!("{}.json", stem),
        }
    }
}

impl fmt::Display for ObjectRef {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}/{}", self.bucket, self.object_name)
    }
}

/// オブジェクトストレージの能力インターフェース
///
/// コアが必要とする操作は読み込みと書き込みの2つだけです。
pub trait ObjectStore {
    /// オブジェクトのバイト列を読み込む
    fn get(&self, reference: &ObjectRef) -> Result<Vec<u8>, SheetsonError>;

    /// オブジェクトへバイト列を書き込む（既存の内容は上書き）
    fn put(&self, reference: &ObjectRef, bytes: &[u8]) -> Result<(), SheetsonError>;
}

/// ファイルシステムを使用するオブジェクトストア実装
///
/// `<root>/<bucket>/<object_name>`のレイアウトで格納します。
/// ローカル実行とテストで使用します。
#[derive(Debug, Clone)]
pub struct LocalStore {
    /// バケットディレクトリを配置するルートディレクトリ
    root: PathBuf,
}

impl LocalStore {
    /// 新しいローカルストアを生成
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    /// 参照をファイルパスへ解決（内部ヘルパー）
    fn resolve(&self, reference: &ObjectRef) -> PathBuf {
        self.root.join(&reference.bucket).join(&reference.object_name)
    }
}

impl ObjectStore for LocalStore {
    fn get(&self, reference: &ObjectRef) -> Result<Vec<u8>, SheetsonError> {
        let path = self.resolve(reference);
        std::fs::read(&path).map_err(|e| {
            SheetsonError::Storage(format!("failed to read object '{}': {}", reference, e))
        })
    }

    fn put(&self, reference: &ObjectRef, bytes: &[u8]) -> Result<(), SheetsonError> {
        let path = self.resolve(reference);
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent).map_err(|e| {
                SheetsonError::Storage(format!(
                    "failed to create directory for '{}': {}",
                    reference, e
                ))
            })?;
        }
        std::fs::write(&path, bytes).map_err(|e| {
            SheetsonError::Storage(format!("failed to write object '{}': {}", reference, e))
        })
    }
}
