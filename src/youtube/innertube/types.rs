//! InnerTube API 固有の型定義
//!
//! `get_live_chat` のレスポンスのうち、正規化に必要な部分だけをデシリアライズする。
//! 未知のフィールドは無視されるため、YouTube側でフィールドが増えても壊れない。
//! 欠落・nullのフィールドはデフォルト値で補い、壊れたアクションはそのアクションだけを捨てる。

use serde::de::DeserializeOwned;
use serde::{Deserialize, Deserializer};

/// nullをデフォルト値として扱う
fn null_as_default<'de, D, T>(deserializer: D) -> Result<T, D::Error>
where
    D: Deserializer<'de>,
    T: Default + Deserialize<'de>,
{
    Ok(Option::<T>::deserialize(deserializer)?.unwrap_or_default())
}

/// 配列を要素ごとにデシリアライズし、壊れた要素だけを捨てる（null・欠落は空配列）
fn skip_invalid<'de, D, T>(deserializer: D) -> Result<Vec<T>, D::Error>
where
    D: Deserializer<'de>,
    T: DeserializeOwned,
{
    let values = Option::<Vec<serde_json::Value>>::deserialize(deserializer)?.unwrap_or_default();

    Ok(values
        .into_iter()
        .filter_map(|value| match serde_json::from_value(value) {
            Ok(item) => Some(item),
            Err(e) => {
                log::debug!("Skipping malformed entry: {}", e);
                None
            }
        })
        .collect())
}

/// InnerTube APIレスポンス（ライブチャット取得）
#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct GetLiveChatResponse {
    pub continuation_contents: Option<ContinuationContents>,
}

#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ContinuationContents {
    pub live_chat_continuation: Option<LiveChatContinuation>,
}

#[derive(Debug, Default, Deserialize)]
pub struct LiveChatContinuation {
    #[serde(default, deserialize_with = "skip_invalid")]
    pub continuations: Vec<Continuation>,
    #[serde(default, deserialize_with = "skip_invalid")]
    pub actions: Vec<Action>,
}

/// Continuation（次回取得用トークン）
///
/// 実際にはどちらか一方のみが入っている。判定は [`Continuation::into_data`] で行う。
#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Continuation {
    pub invalidation_continuation_data: Option<InvalidationContinuationData>,
    pub timed_continuation_data: Option<TimedContinuationData>,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct InvalidationContinuationData {
    #[serde(default, deserialize_with = "null_as_default")]
    pub continuation: String,
    pub timeout_ms: Option<u64>,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TimedContinuationData {
    #[serde(default, deserialize_with = "null_as_default")]
    pub continuation: String,
    pub timeout_ms: Option<u64>,
}

/// Continuation種別
#[derive(Debug, Clone)]
pub enum ContinuationData {
    /// invalidationContinuationData
    Invalidation(InvalidationContinuationData),
    /// timedContinuationData
    Timed(TimedContinuationData),
}

impl ContinuationData {
    pub fn continuation(&self) -> &str {
        match self {
            ContinuationData::Invalidation(data) => &data.continuation,
            ContinuationData::Timed(data) => &data.continuation,
        }
    }
}

impl Continuation {
    /// 優先順位: invalidation > timed
    pub fn into_data(self) -> Option<ContinuationData> {
        if let Some(data) = self.invalidation_continuation_data {
            return Some(ContinuationData::Invalidation(data));
        }
        self.timed_continuation_data.map(ContinuationData::Timed)
    }
}

/// チャットアクション
///
/// `addChatItemAction` 以外（ティッカー等）はすべて `None` になる。
#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Action {
    pub add_chat_item_action: Option<AddChatItemAction>,
}

#[derive(Debug, Default, Deserialize)]
pub struct AddChatItemAction {
    #[serde(default)]
    pub item: ActionItem,
}

/// チャットアイテム（各種メッセージレンダラーを含む）
#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ActionItem {
    pub live_chat_text_message_renderer: Option<LiveChatTextMessageRenderer>,
    pub live_chat_paid_message_renderer: Option<LiveChatPaidMessageRenderer>,
    pub live_chat_paid_sticker_renderer: Option<LiveChatPaidStickerRenderer>,
    pub live_chat_membership_item_renderer: Option<LiveChatMembershipItemRenderer>,
}

/// 判定済みのレンダラー
#[derive(Debug)]
pub enum Renderer {
    Text(LiveChatTextMessageRenderer),
    PaidMessage(LiveChatPaidMessageRenderer),
    PaidSticker(LiveChatPaidStickerRenderer),
    Membership(LiveChatMembershipItemRenderer),
}

impl ActionItem {
    /// 対応しているレンダラーを1つ選ぶ。未対応の種別（視聴者エンゲージメント等）は `None`
    pub fn into_renderer(self) -> Option<Renderer> {
        if let Some(r) = self.live_chat_text_message_renderer {
            return Some(Renderer::Text(r));
        }
        if let Some(r) = self.live_chat_paid_message_renderer {
            return Some(Renderer::PaidMessage(r));
        }
        if let Some(r) = self.live_chat_paid_sticker_renderer {
            return Some(Renderer::PaidSticker(r));
        }
        self.live_chat_membership_item_renderer
            .map(Renderer::Membership)
    }
}

impl Renderer {
    pub fn base(&self) -> &RendererBase {
        match self {
            Renderer::Text(r) => &r.base,
            Renderer::PaidMessage(r) => &r.base,
            Renderer::PaidSticker(r) => &r.base,
            Renderer::Membership(r) => &r.base,
        }
    }
}

/// 全レンダラー共通のフィールド
#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RendererBase {
    #[serde(default, deserialize_with = "null_as_default")]
    pub id: String,
    pub author_name: Option<SimpleText>,
    pub author_photo: Option<ThumbnailContainer>,
    #[serde(default, deserialize_with = "skip_invalid")]
    pub author_badges: Vec<AuthorBadge>,
    pub author_external_channel_id: Option<String>,
    pub timestamp_usec: Option<String>,
}

/// テキストメッセージレンダラー
#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct LiveChatTextMessageRenderer {
    #[serde(flatten)]
    pub base: RendererBase,
    pub message: Option<MessageContent>,
}

/// スーパーチャットレンダラー
#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct LiveChatPaidMessageRenderer {
    #[serde(flatten)]
    pub base: RendererBase,
    pub message: Option<MessageContent>,
    pub purchase_amount_text: Option<SimpleText>,
    pub body_background_color: Option<i64>,
}

/// スーパーステッカーレンダラー
#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct LiveChatPaidStickerRenderer {
    #[serde(flatten)]
    pub base: RendererBase,
    pub purchase_amount_text: Option<SimpleText>,
    pub sticker: Option<AccessibleImage>,
    pub background_color: Option<i64>,
}

/// メンバーシップレンダラー
#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct LiveChatMembershipItemRenderer {
    #[serde(flatten)]
    pub base: RendererBase,
    #[serde(rename = "headerSubtext")]
    pub header_subtext: Option<MessageContent>,
}

/// メッセージ内容（runs配列を含む）
#[derive(Debug, Default, Deserialize)]
pub struct MessageContent {
    #[serde(default, deserialize_with = "skip_invalid")]
    pub runs: Vec<RunItem>,
}

/// runs配列の要素（テキストまたは絵文字）
#[derive(Debug, Default, Deserialize)]
pub struct RunItem {
    pub text: Option<String>,
    pub emoji: Option<InnerTubeEmoji>,
}

/// InnerTube絵文字情報
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct InnerTubeEmoji {
    #[serde(default, deserialize_with = "null_as_default")]
    pub emoji_id: String,
    #[serde(default, deserialize_with = "null_as_default")]
    pub shortcuts: Vec<String>,
    #[serde(default, deserialize_with = "null_as_default")]
    pub image: ThumbnailContainer,
    #[serde(default, deserialize_with = "null_as_default")]
    pub is_custom_emoji: bool,
}

/// サムネイルコンテナ
#[derive(Debug, Clone, Default, Deserialize)]
pub struct ThumbnailContainer {
    #[serde(default, deserialize_with = "null_as_default")]
    pub thumbnails: Vec<Thumbnail>,
}

/// サムネイル
#[derive(Debug, Clone, Default, Deserialize)]
pub struct Thumbnail {
    #[serde(default, deserialize_with = "null_as_default")]
    pub url: String,
}

/// アクセシビリティラベル付きの画像（ステッカー）
#[derive(Debug, Clone, Default, Deserialize)]
pub struct AccessibleImage {
    #[serde(default, deserialize_with = "null_as_default")]
    pub thumbnails: Vec<Thumbnail>,
    pub accessibility: Option<Accessibility>,
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Accessibility {
    pub accessibility_data: Option<AccessibilityData>,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct AccessibilityData {
    #[serde(default, deserialize_with = "null_as_default")]
    pub label: String,
}

impl AccessibleImage {
    pub fn label(&self) -> &str {
        self.accessibility
            .as_ref()
            .and_then(|a| a.accessibility_data.as_ref())
            .map(|d| d.label.as_str())
            .unwrap_or_default()
    }
}

/// シンプルテキスト
#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SimpleText {
    pub simple_text: Option<String>,
    pub runs: Option<Vec<RunItem>>,
}

impl SimpleText {
    /// テキスト内容を取得
    pub fn get_text(&self) -> String {
        if let Some(text) = &self.simple_text {
            return text.clone();
        }
        if let Some(runs) = &self.runs {
            return runs
                .iter()
                .filter_map(|r| r.text.as_deref())
                .collect();
        }
        String::new()
    }
}

/// 投稿者バッジ
#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AuthorBadge {
    pub live_chat_author_badge_renderer: Option<BadgeRenderer>,
}

/// バッジレンダラー
#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct BadgeRenderer {
    pub custom_thumbnail: Option<ThumbnailContainer>,
    pub icon: Option<BadgeIcon>,
    #[serde(default, deserialize_with = "null_as_default")]
    pub tooltip: String,
}

/// バッジアイコン
#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct BadgeIcon {
    #[serde(default, deserialize_with = "null_as_default")]
    pub icon_type: String,
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_continuation_invalidation() {
        let cont: Continuation = serde_json::from_value(json!({
            "invalidationContinuationData": {
                "invalidationId": { "objectSource": 1056, "topic": "chat~abc" },
                "timeoutMs": 10000,
                "continuation": "inv-token"
            }
        }))
        .unwrap();
        match cont.into_data() {
            Some(ContinuationData::Invalidation(data)) => {
                assert_eq!(data.continuation, "inv-token");
                assert_eq!(data.timeout_ms, Some(10000));
            }
            other => panic!("Expected invalidation, got {:?}", other),
        }
    }

    #[test]
    fn test_continuation_timed() {
        let cont: Continuation = serde_json::from_value(json!({
            "timedContinuationData": { "timeoutMs": 5000, "continuation": "timed-token" }
        }))
        .unwrap();
        let data = cont.into_data().unwrap();
        assert!(matches!(data, ContinuationData::Timed(_)));
        assert_eq!(data.continuation(), "timed-token");
    }

    #[test]
    fn test_continuation_unknown_shape() {
        // リプレイ用など未対応の形はNone
        let cont: Continuation = serde_json::from_value(json!({
            "liveChatReplayContinuationData": { "continuation": "replay" }
        }))
        .unwrap();
        assert!(cont.into_data().is_none());
    }

    #[test]
    fn test_into_renderer_classification() {
        let item: ActionItem = serde_json::from_value(json!({
            "liveChatMembershipItemRenderer": {
                "id": "member-id",
                "headerSubtext": { "runs": [{ "text": "Welcome" }] }
            }
        }))
        .unwrap();
        let renderer = item.into_renderer().unwrap();
        assert!(matches!(renderer, Renderer::Membership(_)));
        assert_eq!(renderer.base().id, "member-id");
    }

    #[test]
    fn test_into_renderer_unknown() {
        let item: ActionItem = serde_json::from_value(json!({
            "liveChatViewerEngagementMessageRenderer": { "id": "banner" }
        }))
        .unwrap();
        assert!(item.into_renderer().is_none());
    }

    #[test]
    fn test_null_and_missing_fields_use_defaults() {
        let response: GetLiveChatResponse = serde_json::from_value(json!({
            "continuationContents": {
                "liveChatContinuation": {
                    "continuations": null,
                    "actions": [{
                        "addChatItemAction": {
                            "item": {
                                "liveChatTextMessageRenderer": {
                                    "id": null,
                                    "message": { "runs": null },
                                    "authorPhoto": { "thumbnails": [{ "width": 32 }] },
                                    "authorBadges": [{
                                        "liveChatAuthorBadgeRenderer": { "icon": {}, "tooltip": null }
                                    }]
                                }
                            }
                        }
                    }]
                }
            }
        }))
        .unwrap();

        let continuation = response
            .continuation_contents
            .and_then(|c| c.live_chat_continuation)
            .unwrap();
        assert!(continuation.continuations.is_empty());
        assert_eq!(continuation.actions.len(), 1);
    }

    #[test]
    fn test_malformed_action_is_skipped() {
        let continuation: LiveChatContinuation = serde_json::from_value(json!({
            "actions": [
                { "addChatItemAction": { "item": { "liveChatTextMessageRenderer": { "id": 1 } } } },
                { "addChatItemAction": { "item": { "liveChatTextMessageRenderer": { "id": "ok" } } } },
                { "addChatItemAction": {} }
            ]
        }))
        .unwrap();

        // 1件目は型が合わないため捨てられ、itemの無いアクションは空のまま残る
        assert_eq!(continuation.actions.len(), 2);
        let renderer = continuation
            .actions
            .into_iter()
            .next()
            .and_then(|a| a.add_chat_item_action)
            .and_then(|a| a.item.into_renderer())
            .unwrap();
        assert_eq!(renderer.base().id, "ok");
    }

    #[test]
    fn test_simple_text_runs_fallback() {
        let text: SimpleText = serde_json::from_value(json!({
            "runs": [{ "text": "foo" }, { "text": "bar" }]
        }))
        .unwrap();
        assert_eq!(text.get_text(), "foobar");
    }
}
