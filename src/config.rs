// =============================================================================
// 共通設定・定数モジュール
// =============================================================================
// ライブチャット取得で使用する設定値・定数を定義
// =============================================================================

use serde::Deserialize;
use std::time::Duration;

/// HTTPリクエストのデフォルトタイムアウト（秒）
///
/// ライブページ取得・get_live_chat の両方で使用。
/// stop()は実行中のリクエスト完了を待つため、この値が停止待ちの上限にもなる。
pub const HTTP_TIMEOUT_SECS: u64 = 10;

/// ポーリング間隔のデフォルト（ミリ秒）
pub const DEFAULT_INTERVAL_MS: u64 = 1000;

/// YouTubeのベースURL
pub const YOUTUBE_BASE_URL: &str = "https://www.youtube.com";

/// デスクトップブラウザのUser-Agent（未知のクライアントはget_live_chatで拒否される）
pub const USER_AGENT: &str = "Mozilla/5.0 (Windows NT 10.0; Win64; x64) AppleWebKit/537.36 (KHTML, like Gecko) Chrome/120.0.0.0 Safari/537.36";

/// チャットイベントのバッファ数
pub const CHAT_CHANNEL_CAPACITY: usize = 100;

/// エラーイベントのバッファ数
pub const ERROR_CHANNEL_CAPACITY: usize = 10;

/// HTTPリクエストのデフォルトタイムアウト（Duration）
///
/// HTTPクライアント構築時に直接使用可能
pub fn http_timeout() -> Duration {
    Duration::from_secs(HTTP_TIMEOUT_SECS)
}

/// ライブチャット取得の設定
///
/// 設定ファイル等から読み込めるよう`Deserialize`を実装する。省略した項目はデフォルト値。
#[derive(Debug, Clone, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct LiveChatConfig {
    /// ポーリング間隔（ミリ秒）。0はデフォルト扱い
    pub interval_ms: u64,
    pub base_url: String,
    pub user_agent: String,
    pub http_timeout_secs: u64,
    pub chat_capacity: usize,
    pub error_capacity: usize,
}

impl Default for LiveChatConfig {
    fn default() -> Self {
        Self {
            interval_ms: DEFAULT_INTERVAL_MS,
            base_url: YOUTUBE_BASE_URL.to_string(),
            user_agent: USER_AGENT.to_string(),
            http_timeout_secs: HTTP_TIMEOUT_SECS,
            chat_capacity: CHAT_CHANNEL_CAPACITY,
            error_capacity: ERROR_CHANNEL_CAPACITY,
        }
    }
}

impl LiveChatConfig {
    pub fn with_interval_ms(mut self, interval_ms: u64) -> Self {
        self.interval_ms = interval_ms;
        self
    }

    pub fn with_base_url(mut self, base_url: impl Into<String>) -> Self {
        self.base_url = base_url.into();
        self
    }

    /// 実効的なポーリング間隔
    pub fn interval(&self) -> Duration {
        if self.interval_ms == 0 {
            Duration::from_millis(DEFAULT_INTERVAL_MS)
        } else {
            Duration::from_millis(self.interval_ms)
        }
    }

    pub fn http_timeout(&self) -> Duration {
        if self.http_timeout_secs == 0 {
            http_timeout()
        } else {
            Duration::from_secs(self.http_timeout_secs)
        }
    }
}
