//! InnerTube レスポンスパーサー
//!
//! `get_live_chat` のアクション配列を [`ChatItem`] 列に正規化する。I/Oは行わない。

use chrono::{DateTime, TimeZone, Utc};

use super::types::*;
use crate::youtube::types::{Author, Badge, ChatItem, EmojiItem, ImageItem, MessageItem, SuperChat};

/// InnerTubeレスポンスをChatItemリストと次回のcontinuationに変換
///
/// continuationが含まれていない場合は空文字列を返す。
pub fn parse_chat_data(response: GetLiveChatResponse) -> (Vec<ChatItem>, String) {
    let Some(continuation) = response
        .continuation_contents
        .and_then(|c| c.live_chat_continuation)
    else {
        return (vec![], String::new());
    };

    let items = continuation
        .actions
        .into_iter()
        .filter_map(parse_action_to_chat_item)
        .collect();

    let next = continuation
        .continuations
        .into_iter()
        .next()
        .and_then(Continuation::into_data)
        .map(|data| data.continuation().to_string())
        .unwrap_or_default();

    (items, next)
}

/// 単一のアクションをパース（対応外のアクションはNone）
fn parse_action_to_chat_item(action: Action) -> Option<ChatItem> {
    let renderer = action.add_chat_item_action?.item.into_renderer()?;
    Some(parse_renderer(renderer))
}

fn parse_renderer(renderer: Renderer) -> ChatItem {
    let base = renderer.base();

    let author_name = base
        .author_name
        .as_ref()
        .map(|n| n.get_text())
        .unwrap_or_default();

    let mut item = ChatItem {
        id: base.id.clone(),
        author: Author {
            thumbnail: base
                .author_photo
                .as_ref()
                .and_then(|p| last_thumbnail(&p.thumbnails, &author_name)),
            name: author_name,
            channel_id: base.author_external_channel_id.clone().unwrap_or_default(),
            badge: None,
        },
        message: vec![],
        super_chat: None,
        is_membership: false,
        is_verified: false,
        is_owner: false,
        is_moderator: false,
        timestamp: parse_timestamp(base.timestamp_usec.as_deref()),
    };

    apply_author_badges(&mut item, &base.author_badges);

    match renderer {
        Renderer::Text(r) => {
            item.message = parse_messages(r.message.as_ref());
        }
        Renderer::PaidMessage(r) => {
            item.message = parse_messages(r.message.as_ref());
            item.super_chat = Some(SuperChat {
                amount: amount_text(r.purchase_amount_text.as_ref()),
                color: convert_color_to_hex6(r.body_background_color.unwrap_or_default()),
                sticker: None,
            });
        }
        Renderer::PaidSticker(r) => {
            item.super_chat = Some(SuperChat {
                amount: amount_text(r.purchase_amount_text.as_ref()),
                color: convert_color_to_hex6(r.background_color.unwrap_or_default()),
                sticker: r
                    .sticker
                    .as_ref()
                    .and_then(|s| last_thumbnail(&s.thumbnails, s.label())),
            });
        }
        Renderer::Membership(r) => {
            // メンバーシップは message ではなく headerSubtext に本文がある
            item.message = parse_messages(r.header_subtext.as_ref());
        }
    }

    item
}

fn amount_text(text: Option<&SimpleText>) -> String {
    text.map(|t| t.get_text()).unwrap_or_default()
}

/// サムネイル列から最大解像度（末尾）の画像を取得
fn last_thumbnail(thumbnails: &[Thumbnail], alt: &str) -> Option<ImageItem> {
    thumbnails.last().map(|t| ImageItem {
        url: t.url.clone(),
        alt: alt.to_string(),
    })
}

/// runs配列をMessageItemリストに変換
///
/// 絵文字のサムネイルは先頭を使う（投稿者アイコンとは逆）。
fn parse_messages(content: Option<&MessageContent>) -> Vec<MessageItem> {
    let Some(content) = content else {
        return vec![];
    };

    content
        .runs
        .iter()
        .filter_map(|run| {
            if let Some(text) = run.text.as_ref().filter(|t| !t.is_empty()) {
                return Some(MessageItem::Text { text: text.clone() });
            }
            run.emoji.as_ref().map(|emoji| MessageItem::Emoji {
                emoji: parse_emoji(emoji),
            })
        })
        .collect()
}

fn parse_emoji(emoji: &InnerTubeEmoji) -> EmojiItem {
    let shortcut = emoji.shortcuts.first().cloned().unwrap_or_default();
    let url = emoji
        .image
        .thumbnails
        .first()
        .map(|t| t.url.clone())
        .unwrap_or_default();

    // カスタム絵文字はショートカット、通常の絵文字はemoji_id（肌色付きなら合成済みの文字列）
    let emoji_text = if emoji.is_custom_emoji {
        shortcut.clone()
    } else {
        emoji.emoji_id.clone()
    };

    EmojiItem {
        image: ImageItem { url, alt: shortcut },
        emoji_text,
        is_custom_emoji: emoji.is_custom_emoji,
    }
}

/// 投稿者バッジからフラグとメンバーシップバッジを設定
///
/// フラグは立てるだけで、後続のバッジで下ろすことはない。
fn apply_author_badges(item: &mut ChatItem, badges: &[AuthorBadge]) {
    for renderer in badges
        .iter()
        .filter_map(|b| b.live_chat_author_badge_renderer.as_ref())
    {
        if let Some(custom) = &renderer.custom_thumbnail {
            item.author.badge = Some(Badge {
                thumbnail: last_thumbnail(&custom.thumbnails, &renderer.tooltip)
                    .unwrap_or_default(),
                label: renderer.tooltip.clone(),
            });
            item.is_membership = true;
            continue;
        }

        if let Some(icon) = &renderer.icon {
            match icon.icon_type.as_str() {
                "OWNER" => item.is_owner = true,
                "VERIFIED" => item.is_verified = true,
                "MODERATOR" => item.is_moderator = true,
                other => log::debug!("Ignoring unknown badge icon type: {}", other),
            }
        }
    }
}

/// ARGBの整数色を `#RRGGBB` に変換（アルファは捨てる）
pub fn convert_color_to_hex6(color: i64) -> String {
    let hex = format!("{:08X}", color as u32);
    format!("#{}", &hex[2..])
}

/// タイムスタンプをパース（マイクロ秒 -> DateTime<Utc>）
/// 頻繁に呼ばれるため、パース失敗時のログはdebugレベル
fn parse_timestamp(timestamp_usec: Option<&str>) -> DateTime<Utc> {
    let Some(ts) = timestamp_usec else {
        return Utc::now();
    };

    match ts.parse::<i64>() {
        Ok(usec) => {
            let secs = usec.div_euclid(1_000_000);
            let nanos = (usec.rem_euclid(1_000_000) * 1_000) as u32;
            Utc.timestamp_opt(secs, nanos).single().unwrap_or_else(|| {
                log::debug!("Invalid timestamp microseconds: {}", usec);
                Utc::now()
            })
        }
        Err(e) => {
            log::debug!("Failed to parse timestamp '{}': {}", ts, e);
            Utc::now()
        }
    }
}
