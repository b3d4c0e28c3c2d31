//! Output Artifact Module
//!
//! 抽出結果をJSONアーティファクトへシリアライズするモジュール。
//! アーティファクトはシートごとの`ParseResult`を順序付きで並べた
//! JSON配列です。`serde_json`の`preserve_order`により、レコードの
//! 列順はラウンドトリップで保存されます。

use serde::{Deserialize, Serialize};

use crate::classifier::ComplexityVerdict;
use crate::error::SheetsonError;
use crate::extract::{Record, RegionExtract};

/// 1シート分の最終アーティファクト
///
/// シートごとに1回構築され、JSONへシリアライズされた後は破棄されます。
/// 外部リソースは保持しません。
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ParseResult {
    /// シート名
    pub sheet_name: String,

    /// 入力ファイルの参照（"bucket/object"）。不明な場合は省略
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub source: Option<String>,

    /// 複雑度の判定結果
    pub complexity: ComplexityOutput,

    /// 領域ごとの抽出結果（左上座標の行優先順）
    pub regions: Vec<RegionOutput>,
}

/// 複雑度判定の出力形式
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ComplexityOutput {
    /// シートが複雑と判定されたか
    pub is_complex: bool,

    /// 発火したシグナル名のリスト
    pub signals: Vec<String>,
}

/// 1領域分の出力形式
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RegionOutput {
    /// 領域識別子（外接矩形のA1範囲、例: "A1:C5"）
    pub region_id: String,

    /// 抽出されたレコード列
    pub records: Vec<Record>,
}

impl ParseResult {
    /// 抽出結果から`ParseResult`を構築
    pub fn new(
        sheet_name: String,
        source: Option<String>,
        verdict: &ComplexityVerdict,
        extracts: Vec<RegionExtract>,
    ) -> Self {
        let regions = extracts
            .into_iter()
            .map(|extract| RegionOutput {
                region_id: extract.region.bounds.to_a1_range(),
                records: extract.records,
            })
            .collect();

        Self {
            sheet_name,
            source,
            complexity: ComplexityOutput {
                is_complex: verdict.is_complex(),
                signals: verdict.signal_names(),
            },
            regions,
        }
    }
}

/// アーティファクト（シートごとの結果の配列）をJSONバイト列へシリアライズ
pub fn to_json_bytes(results: &[ParseResult]) -> Result<Vec<u8>, SheetsonError> {
    serde_json::to_vec_pretty(results)
        .map_err(|e| SheetsonError::Config(format!("JSON serialization error: {}", e)))
}

/// JSONバイト列からアーティファクトをデシリアライズ
///
/// リモート委譲の応答検証にも使用されます。
pub fn from_json_bytes(bytes: &[u8]) -> Result<Vec<ParseResult>, SheetsonError> {
    serde_json::from_slice(bytes)
        .map_err(|e| SheetsonError::Config(format!("JSON deserialization error: {}", e)))
}
