//! YouTubeライブチャットの取得・正規化ライブラリ
//!
//! 配信ページからセッション情報を解決し、InnerTube APIを定期的に呼び出して
//! チャット・スーパーチャット・スーパーステッカー・メンバーシップを
//! 共通の [`ChatItem`] に正規化して配信する。
//!
//! ```no_run
//! use youtube_live_chat::{LiveChatConfig, LiveChatPoller, YoutubeId};
//!
//! # async fn run() -> Result<(), youtube_live_chat::LiveChatError> {
//! let id: YoutubeId = "@example".parse()?;
//! let (poller, mut events) = LiveChatPoller::new(id, &LiveChatConfig::default())?;
//! poller.start().await?;
//!
//! while let Some(item) = events.chat.recv().await {
//!     println!("{}: {}", item.author.name, item.plain_text());
//! }
//! # Ok(())
//! # }
//! ```

pub mod config;
pub mod util; // doctestのためpubにする
pub mod youtube;

pub use config::LiveChatConfig;
pub use youtube::{
    ChatItem, FetchOptions, InnerTubeClient, LiveChatError, LiveChatPoller, LiveChatSource,
    PollerEvents, YoutubeId,
};
