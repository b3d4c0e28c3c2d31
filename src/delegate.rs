//! Remote Delegation Module
//!
//! 複雑パスがローカルで処理できないファイルを、リモートの高機能な
//! 抽出エンドポイントへ委譲するモジュール。委譲はワンショットであり、
//! ローカルでのリトライは行いません。応答はアーティファクト形式として
//! 検証した上で、そのまま採用されます。

use std::time::Duration;

use tracing::{info, warn};

use crate::error::SheetsonError;
use crate::output::{self, ParseResult};
use crate::storage::ObjectRef;

/// リモート委譲の能力インターフェース
///
/// テストではこのトレイトをモックし、HTTPなしで委譲経路を検証できます。
pub trait RemoteDelegate {
    /// ファイル全体の処理をリモートエンドポイントへ委譲
    ///
    /// # 戻り値
    ///
    /// * `Ok(Vec<ParseResult>)` - リモートの応答（アーティファクト形式）
    /// * `Err(SheetsonError::Delegation)` - 到達不能、非成功応答、
    ///   タイムアウト、応答形式不正のいずれか
    fn delegate(&self, reference: &ObjectRef) -> Result<Vec<ParseResult>, SheetsonError>;
}

/// HTTP POSTによるリモート委譲の実装
///
/// `{"bucket": ..., "object_name": ...}`をJSONボディとして送信し、
/// アーティファクト形式のJSON応答を期待します。タイムアウトは
/// クライアントレベルで強制され、超過は`Delegation`エラーになります。
pub struct HttpDelegate {
    /// 委譲先エンドポイント
    endpoint: reqwest::Url,

    /// HTTPクライアント（タイムアウト設定済み）
    client: reqwest::blocking::Client,
}

impl HttpDelegate {
    /// 新しい委譲クライアントを生成
    ///
    /// # 引数
    ///
    /// * `endpoint` - 委譲先エンドポイントのURL
    /// * `timeout` - リクエスト全体の待ち時間上限
    pub fn new(endpoint: reqwest::Url, timeout: Duration) -> Result<Self, SheetsonError> {
        let client = reqwest::blocking::Client::builder()
            .timeout(timeout)
            .build()
            .map_err(|e| SheetsonError::Config(format!("failed to build HTTP client: {}", e)))?;

        Ok(Self { endpoint, client })
    }
}

impl RemoteDelegate for HttpDelegate {
    fn delegate(&self, reference: &ObjectRef) -> Result<Vec<ParseResult>, SheetsonError> {
        info!(%reference, endpoint = %self.endpoint, "delegating file to remote extractor");

        let response = self
            .client
            .post(self.endpoint.clone())
            .json(reference)
            .send()
            .map_err(|e| {
                warn!(%reference, "delegation request failed: {}", e);
                SheetsonError::Delegation(format!(
                    "request to {} failed: {}",
                    self.endpoint, e
                ))
            })?;

        let status = response.status();
        if !status.is_success() {
            return Err(SheetsonError::Delegation(format!(
                "endpoint {} returned status {}",
                self.endpoint, status
            )));
        }

        let body = response.bytes().map_err(|e| {
            SheetsonError::Delegation(format!("failed to read response body: {}", e))
        })?;

        // 応答はアーティファクト形式でなければならない
        output::from_json_bytes(&body)
            .map_err(|e| SheetsonError::Delegation(format!("malformed response body: {}", e)))
    }
}
