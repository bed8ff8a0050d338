//! YouTubeライブチャット取得モジュール
//!
//! - `innertube`: ライブページ解決・get_live_chat呼び出し・レスポンス正規化
//! - `poller`: 一定間隔で取得してイベントチャネルへ流す
//! - `source`: ポーラーとHTTPクライアントの境界

pub mod errors;
pub mod innertube;
pub mod poller;
pub mod source;
pub mod types;

pub use errors::LiveChatError;
pub use innertube::InnerTubeClient;
pub use poller::{LiveChatPoller, PollerEvents};
pub use source::LiveChatSource;
pub use types::{
    Author, Badge, ChatItem, EmojiItem, FetchOptions, ImageItem, MessageItem, SuperChat,
    YoutubeId,
};
