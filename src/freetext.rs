//! Free Text Extractor Interface
//!
//! 非表形式の領域を処理する外部コラボレーター（レイアウト解析エンジン）
//! の能力インターフェースを定義するモジュール。本体の実装はこのクレートの
//! 範囲外であり、セグメンテーションや分類のテストはこの重い依存なしで
//! 実行できます。

use crate::error::SheetsonError;

/// レイアウト解析によるフリーテキスト抽出の能力インターフェース
///
/// 複雑パスのセグメンテーションが表構造に解決できなかった領域は、
/// プレーンテキストへ描画されたバイト列としてこのインターフェースに
/// 渡されます。戻り値の文字列は、その領域のレコード集合内の単一の
/// フリーテキストフィールドとして格納されます。
pub trait FreeTextExtractor {
    /// 領域のバイト列からフリーテキストを抽出
    ///
    /// # 引数
    ///
    /// * `region_bytes` - 領域をプレーンテキストへ描画したバイト列
    ///
    /// # 戻り値
    ///
    /// * `Ok(String)` - 抽出されたテキスト
    /// * `Err(SheetsonError)` - 抽出に失敗した場合
    fn extract_free_text(&self, region_bytes: &[u8]) -> Result<String, SheetsonError>;
}
