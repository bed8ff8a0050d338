use thiserror::Error;

/// ライブチャット取得で発生するエラー
///
/// エラーストリームとstart()の戻り値の両方へ同じ値を流すため`Clone`を実装する。
/// そのためreqwest/serde_jsonのエラーはメッセージ文字列として保持する。
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum LiveChatError {
    #[error("Required channelId or liveId or handle.")]
    IdentifierMissing,

    #[error("Live Stream was not found")]
    LiveNotFound,

    #[error("{live_id} is finished live")]
    ReplayFinished { live_id: String },

    #[error("API Key was not found")]
    ApiKeyMissing,

    #[error("Client Version was not found")]
    ClientVersionMissing,

    #[error("Continuation was not found")]
    ContinuationMissing,

    #[error("Network error: {0}")]
    Network(String),

    #[error("Unexpected HTTP status: {status}")]
    HttpStatus { status: u16 },

    #[error("Failed to decode response: {0}")]
    Decode(String),

    #[error("Live chat poller is already running")]
    AlreadyRunning,

    #[error("Not found options")]
    OptionsNotFound,
}

impl From<reqwest::Error> for LiveChatError {
    fn from(err: reqwest::Error) -> Self {
        // ボディのデコード失敗はreqwest経由でも来るため区別する
        if err.is_decode() {
            LiveChatError::Decode(err.to_string())
        } else {
            LiveChatError::Network(err.to_string())
        }
    }
}

impl From<serde_json::Error> for LiveChatError {
    fn from(err: serde_json::Error) -> Self {
        LiveChatError::Decode(err.to_string())
    }
}

impl From<LiveChatError> for String {
    fn from(err: LiveChatError) -> String {
        err.to_string()
    }
}
