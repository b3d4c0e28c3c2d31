//! Error Types Module
//!
//! クレート全体で使用する構造化エラー型を定義するモジュール。
//! `thiserror`を使用して、エラーの自動変換とメッセージフォーマットを実現する。

use thiserror::Error;

/// sheetsonクレート全体で使用するエラー型
///
/// このエラー型は、スプレッドシートの読み込み、分類、抽出、
/// アーティファクト出力までのすべての失敗を統一的に扱うために使用されます。
///
/// # エラーの種類
///
/// - `Io` / `Load` / `Zip`: 入力コンテナの読み込みに失敗した場合
/// - `EmptySheet` / `NoRegionsFound`: 抽出パスがデータを見つけられなかった場合
/// - `FreeTextUnavailable`: レイアウト解析の外部コラボレーターが
///   ローカルに構成されていない場合（Dispatcherの委譲トリガー）
/// - `Delegation`: リモート委譲の失敗（到達不能、非成功応答、タイムアウト）
/// - `Config` / `Storage` / `SecurityViolation`: 設定・ストレージ・ZIP制限の違反
///
/// 分類と抽出は常に「成功」か「型付きの失敗」で完結します。エラーを
/// 握りつぶして別パスへ降格することはありません。
#[derive(Error, Debug)]
pub enum SheetsonError {
    /// I/O操作中に発生したエラー
    ///
    /// `#[from]`属性により、`std::io::Error`から自動的に変換されます。
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// スプレッドシートコンテナの読み込みに失敗したエラー
    ///
    /// バイト列がパース可能なXLS/XLSXでない、または指定されたシートが
    /// 存在しない場合に発生します。calamine由来のエラーは自動変換されます。
    #[error("failed to load spreadsheet: {0}")]
    Load(#[from] calamine::Error),

    /// ZIPアーカイブの解析エラー
    ///
    /// XLSXファイル（ZIPアーカイブ）のメタデータ走査中に発生したエラーです。
    #[error("ZIP archive error: {0}")]
    Zip(String),

    /// UTF-8文字列の変換エラー
    ///
    /// XML解析時にUTF-8文字列への変換に失敗した場合に発生します。
    #[error("UTF-8 conversion error: {0}")]
    Utf8(#[from] std::str::Utf8Error),

    /// 数値の解析エラー
    ///
    /// XML属性の文字列から数値への変換に失敗した場合に発生します。
    #[error("Number parse error: {0}")]
    ParseInt(#[from] std::num::ParseIntError),

    /// 設定の検証に失敗したエラー
    ///
    /// `DispatcherBuilder::build()`時に設定を検証し、無効な設定が検出された
    /// 場合に発生します。例えば、しきい値が(0, 1]の範囲外の場合や、
    /// リモートエンドポイントのURLが不正な場合などです。
    #[error("Configuration error: {0}")]
    Config(String),

    /// オブジェクトストレージの読み書きに失敗したエラー
    #[error("Storage error: {0}")]
    Storage(String),

    /// 単純パスがデータ行を見つけられなかったエラー
    ///
    /// 非空行がひとつも存在しないシートに対して単純パス抽出を
    /// 実行した場合に発生します。
    #[error("no data rows found in sheet '{sheet}'")]
    EmptySheet {
        /// 対象のシート名
        sheet: String,
    },

    /// 複雑パスが有効な領域を見つけられなかったエラー
    ///
    /// セグメンテーションの結果、すべての候補領域がノイズとして
    /// 破棄された場合に発生します。
    #[error("no usable table regions found in sheet '{sheet}'")]
    NoRegionsFound {
        /// 対象のシート名
        sheet: String,
    },

    /// レイアウト解析の外部コラボレーターが利用できないエラー
    ///
    /// 非表形式の領域がフリーテキスト抽出を必要とするにもかかわらず、
    /// ローカルに`FreeTextExtractor`が構成されていない場合に発生します。
    /// Dispatcherはこのエラーを検出すると、ファイル全体をリモート
    /// エンドポイントへ委譲します。
    #[error("sheet '{sheet}' requires the layout-aware text extractor, which is not available locally")]
    FreeTextUnavailable {
        /// 対象のシート名
        sheet: String,
    },

    /// リモート委譲の失敗
    ///
    /// エンドポイント到達不能、非成功ステータス、タイムアウト、
    /// 応答ボディの形式不正のいずれかです。委譲はワンショットであり、
    /// このエラーが単純パスへ降格されることはありません。
    #[error("delegation failed: {0}")]
    Delegation(String),

    /// セキュリティ制限に違反したエラー
    ///
    /// ZIP bomb攻撃、パストラバーサル攻撃、ファイルサイズ制限などの
    /// セキュリティ制限に違反した場合に発生します。
    #[error("Security violation: {0}")]
    SecurityViolation(String),
}
