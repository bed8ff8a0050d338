//! InnerTube API クライアントモジュール
//!
//! YouTubeのWebクライアントと同じ内部APIでライブチャットを取得する。
//! APIキーとクライアントバージョンはライブページのHTMLから抽出するため、
//! Data API v3のようなクォータ制限はない。
//!
//! ## 注意事項
//! - 非公式APIのため、仕様変更のリスクあり
//! - レスポンスの未知フィールドは無視し、欠落フィールドはデフォルト値で補う

pub mod client;
pub mod parser;
pub mod types;

pub use client::{generate_live_url, get_options_from_live_page, InnerTubeClient};
pub use parser::{convert_color_to_hex6, parse_chat_data};
pub use types::GetLiveChatResponse;
