use chrono::{DateTime, Utc};
use once_cell::sync::Lazy;
use regex::Regex;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

use super::errors::LiveChatError;

/// URL中の動画ID（watch?v= / youtu.be / live / shorts）
static URL_LIVE_ID_REGEX: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"(?:[?&]v=|youtu\.be/|/live/|/shorts/)([A-Za-z0-9_-]{11})")
        .expect("Failed to compile live id regex")
});

/// URL中のチャンネルID（/channel/UCxxxx）
static URL_CHANNEL_ID_REGEX: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"/channel/(UC[A-Za-z0-9_-]{22})").expect("Failed to compile channel id regex")
});

/// YouTubeのURLかどうか（スキームまたはホスト名で始まるもののみ）
static URL_PREFIX_REGEX: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"^(?:https?://)?(?:(?:www|m)\.)?(?:youtube\.com|youtu\.be)(?:/|$)")
        .expect("Failed to compile url prefix regex")
});

/// URL中のハンドル（/@xxxx）
static URL_HANDLE_REGEX: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"/(@[^/?#&]+)").expect("Failed to compile handle regex"));

/// 配信の指定方法
///
/// チャンネルID・動画ID・ハンドルのいずれか1つで配信を特定する。
/// 空の値では構築できない。
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", content = "value", rename_all = "camelCase")]
pub enum YoutubeId {
    /// チャンネルID（`/channel/{id}/live` を解決する）
    Channel(String),
    /// 動画ID
    Live(String),
    /// ハンドル（`@`の有無は問わない）
    Handle(String),
}

impl YoutubeId {
    pub fn channel(id: impl Into<String>) -> Result<Self, LiveChatError> {
        non_empty(id.into()).map(YoutubeId::Channel)
    }

    pub fn live(id: impl Into<String>) -> Result<Self, LiveChatError> {
        non_empty(id.into()).map(YoutubeId::Live)
    }

    pub fn handle(handle: impl Into<String>) -> Result<Self, LiveChatError> {
        non_empty(handle.into()).map(YoutubeId::Handle)
    }

    /// 3つの候補から最初に値が入っているものを採用する
    ///
    /// 優先順位: channel > live > handle
    pub fn from_parts(
        channel_id: Option<&str>,
        live_id: Option<&str>,
        handle: Option<&str>,
    ) -> Result<Self, LiveChatError> {
        fn pick(v: Option<&str>) -> Option<&str> {
            v.map(str::trim).filter(|s| !s.is_empty())
        }

        if let Some(id) = pick(channel_id) {
            return Ok(YoutubeId::Channel(id.to_string()));
        }
        if let Some(id) = pick(live_id) {
            return Ok(YoutubeId::Live(id.to_string()));
        }
        if let Some(h) = pick(handle) {
            return Ok(YoutubeId::Handle(h.to_string()));
        }
        Err(LiveChatError::IdentifierMissing)
    }

    /// 指定値そのもの
    pub fn as_str(&self) -> &str {
        match self {
            YoutubeId::Channel(v) | YoutubeId::Live(v) | YoutubeId::Handle(v) => v,
        }
    }

    /// 動画IDで指定されている場合はそれを返す
    pub fn live_id(&self) -> Option<&str> {
        match self {
            YoutubeId::Live(id) => Some(id),
            _ => None,
        }
    }
}

fn non_empty(value: String) -> Result<String, LiveChatError> {
    let trimmed = value.trim();
    if trimmed.is_empty() {
        Err(LiveChatError::IdentifierMissing)
    } else {
        Ok(trimmed.to_string())
    }
}

fn is_channel_id(s: &str) -> bool {
    s.len() == 24
        && s.starts_with("UC")
        && s.chars().all(|c| c.is_ascii_alphanumeric() || c == '_' || c == '-')
}

fn is_video_id(s: &str) -> bool {
    s.len() == 11 && s.chars().all(|c| c.is_ascii_alphanumeric() || c == '_' || c == '-')
}

/// 自由入力（URL / @ハンドル / 生のID）から配信指定を判定する
///
/// - `@xxx` → ハンドル
/// - YouTube URL → 動画ID > チャンネルID > ハンドルの順で抽出
/// - `UC`で始まる24文字 → チャンネルID
/// - 11文字の英数字 → 動画ID
/// - それ以外 → ハンドル
impl FromStr for YoutubeId {
    type Err = LiveChatError;

    fn from_str(input: &str) -> Result<Self, Self::Err> {
        let input = input.trim();
        if input.is_empty() {
            return Err(LiveChatError::IdentifierMissing);
        }

        if input.starts_with('@') {
            return YoutubeId::handle(input);
        }

        if URL_PREFIX_REGEX.is_match(input) {
            if let Some(caps) = URL_LIVE_ID_REGEX.captures(input) {
                return YoutubeId::live(&caps[1]);
            }
            if let Some(caps) = URL_CHANNEL_ID_REGEX.captures(input) {
                return YoutubeId::channel(&caps[1]);
            }
            if let Some(caps) = URL_HANDLE_REGEX.captures(input) {
                return YoutubeId::handle(&caps[1]);
            }
            return Err(LiveChatError::IdentifierMissing);
        }

        if is_channel_id(input) {
            return YoutubeId::channel(input);
        }
        if is_video_id(input) {
            return YoutubeId::live(input);
        }
        YoutubeId::handle(input)
    }
}

impl fmt::Display for YoutubeId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            YoutubeId::Channel(id) => write!(f, "channel:{}", id),
            YoutubeId::Live(id) => write!(f, "live:{}", id),
            YoutubeId::Handle(h) => write!(f, "handle:{}", h),
        }
    }
}

/// ライブページから抽出したセッション情報
///
/// `continuation`のみポーリングタスクが更新する。
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct FetchOptions {
    pub live_id: String,
    pub api_key: String,
    pub client_version: String,
    pub continuation: String,
}

/// 画像
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ImageItem {
    pub url: String,
    pub alt: String,
}

/// 絵文字
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct EmojiItem {
    pub image: ImageItem,
    /// カスタム絵文字はショートカット（`:xxx:`）、それ以外は絵文字そのもの
    pub emoji_text: String,
    pub is_custom_emoji: bool,
}

/// メッセージの構成要素（テキストまたは絵文字）
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "camelCase")]
pub enum MessageItem {
    #[serde(rename = "text")]
    Text { text: String },
    #[serde(rename = "emoji")]
    Emoji { emoji: EmojiItem },
}

/// メンバーシップバッジ
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Badge {
    pub thumbnail: ImageItem,
    pub label: String,
}

/// 投稿者
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Author {
    pub name: String,
    pub thumbnail: Option<ImageItem>,
    pub channel_id: String,
    pub badge: Option<Badge>,
}

/// スーパーチャット / スーパーステッカー
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SuperChat {
    /// 表示用の金額テキスト（例: "¥1,000"）
    pub amount: String,
    /// `#RRGGBB`
    pub color: String,
    pub sticker: Option<ImageItem>,
}

/// 正規化済みのチャットアイテム
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ChatItem {
    pub id: String,
    pub author: Author,
    pub message: Vec<MessageItem>,
    pub super_chat: Option<SuperChat>,
    pub is_membership: bool,
    pub is_verified: bool,
    pub is_owner: bool,
    pub is_moderator: bool,
    pub timestamp: DateTime<Utc>,
}

impl ChatItem {
    /// メッセージをプレーンテキストに変換（絵文字は絵文字テキストで置換）
    pub fn plain_text(&self) -> String {
        self.message
            .iter()
            .map(|item| match item {
                MessageItem::Text { text } => text.as_str(),
                MessageItem::Emoji { emoji } => emoji.emoji_text.as_str(),
            })
            .collect()
    }
}
