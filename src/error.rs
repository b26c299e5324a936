use aura_common::session::GENERIC_FAILURE_MESSAGE;
use thiserror::Error;

/// レスポンスが空だった場合の表示
pub const NO_RESPONSE_MESSAGE: &str = "No response from Aura.";
/// レスポンスを解釈できなかった場合の表示
pub const PROCESSING_MESSAGE: &str = "Aura had trouble processing that information.";

#[derive(Error, Debug)]
pub enum AuraError {
    #[error("設定エラー: {0}")]
    Config(String),

    #[error("ファイルが見つかりません: {0}")]
    FileNotFound(String),

    /// 通信失敗またはAPIのエラー応答（メッセージはそのまま表示する）
    #[error("{0}")]
    ApiCall(String),

    #[error("{}", NO_RESPONSE_MESSAGE)]
    NoResponse,

    /// モデル出力のパース・スキーマ検証に失敗
    #[error("{}", PROCESSING_MESSAGE)]
    Processing,

    #[error("JSON解析エラー: {0}")]
    JsonParse(#[from] serde_json::Error),

    #[error("IOエラー: {0}")]
    Io(#[from] std::io::Error),

    #[error("入力エラー: {0}")]
    Prompt(#[from] dialoguer::Error),
}

impl AuraError {
    /// セッションのエラービューに載せるメッセージ
    pub fn user_message(&self) -> String {
        let message = self.to_string();
        if message.trim().is_empty() {
            GENERIC_FAILURE_MESSAGE.to_string()
        } else {
            message
        }
    }
}

pub type Result<T> = std::result::Result<T, AuraError>;
