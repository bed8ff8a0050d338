//! InnerTube API クライアント実装
//!
//! - ライブページのHTMLからセッション情報（動画ID / APIキー / クライアントバージョン / continuation）を抽出
//! - `get_live_chat` を1回呼び出してチャットを取得
//!
//! どちらもリトライは行わない。再試行はポーラー側の次のtickで行われる。

use regex::Regex;
use reqwest::Client;
use serde_json::json;
use std::sync::OnceLock;

use super::parser::parse_chat_data;
use super::types::GetLiveChatResponse;
use crate::config::LiveChatConfig;
use crate::util::{abbreviate_token, mask_api_key};
use crate::youtube::errors::LiveChatError;
use crate::youtube::types::{ChatItem, FetchOptions, YoutubeId};

const GET_LIVE_CHAT_PATH: &str = "/youtubei/v1/live_chat/get_live_chat";
const CLIENT_NAME: &str = "WEB";

// 正規表現のシングルトン（OnceLockで初回のみコンパイル）
static CANONICAL_RE: OnceLock<Regex> = OnceLock::new();
static IS_REPLAY_RE: OnceLock<Regex> = OnceLock::new();
static API_KEY_RE: OnceLock<Regex> = OnceLock::new();
static CLIENT_VERSION_RE: OnceLock<Regex> = OnceLock::new();
static CONTINUATION_RE: OnceLock<Regex> = OnceLock::new();

fn get_canonical_regex() -> &'static Regex {
    CANONICAL_RE.get_or_init(|| {
        Regex::new(r#"<link rel="canonical" href="[^"]*/watch\?v=([^"]+?)">"#)
            .expect("Failed to compile canonical regex")
    })
}

fn get_is_replay_regex() -> &'static Regex {
    IS_REPLAY_RE.get_or_init(|| {
        Regex::new(r#"['"]isReplay['"]:\s*(true)"#).expect("Failed to compile isReplay regex")
    })
}

fn get_api_key_regex() -> &'static Regex {
    API_KEY_RE.get_or_init(|| {
        Regex::new(r#"['"]INNERTUBE_API_KEY['"]:\s*['"](.+?)['"]"#)
            .expect("Failed to compile API key regex")
    })
}

fn get_client_version_regex() -> &'static Regex {
    CLIENT_VERSION_RE.get_or_init(|| {
        Regex::new(r#"['"]clientVersion['"]:\s*['"]([\d.]+?)['"]"#)
            .expect("Failed to compile client version regex")
    })
}

fn get_continuation_regex() -> &'static Regex {
    CONTINUATION_RE.get_or_init(|| {
        Regex::new(r#"['"]continuation['"]:\s*['"](.+?)['"]"#)
            .expect("Failed to compile continuation regex")
    })
}

fn capture(re: &Regex, html: &str) -> Option<String> {
    re.captures(html)
        .and_then(|caps| caps.get(1))
        .map(|m| m.as_str().to_string())
}

/// ライブページのHTMLからセッション情報を抽出
///
/// チェック順: canonical → リプレイ判定 → APIキー → クライアントバージョン → continuation
pub fn get_options_from_live_page(html: &str) -> Result<FetchOptions, LiveChatError> {
    let live_id = capture(get_canonical_regex(), html).ok_or(LiveChatError::LiveNotFound)?;

    // アーカイブは他の値が取れても終了扱い
    if get_is_replay_regex().is_match(html) {
        return Err(LiveChatError::ReplayFinished { live_id });
    }

    let api_key = capture(get_api_key_regex(), html).ok_or(LiveChatError::ApiKeyMissing)?;
    let client_version =
        capture(get_client_version_regex(), html).ok_or(LiveChatError::ClientVersionMissing)?;
    let continuation =
        capture(get_continuation_regex(), html).ok_or(LiveChatError::ContinuationMissing)?;

    Ok(FetchOptions {
        live_id,
        api_key,
        client_version,
        continuation,
    })
}

/// 配信指定からライブページのURLを生成
pub fn generate_live_url(base_url: &str, id: &YoutubeId) -> String {
    match id {
        YoutubeId::Channel(channel_id) => format!("{}/channel/{}/live", base_url, channel_id),
        YoutubeId::Live(live_id) => format!("{}/watch?v={}", base_url, live_id),
        YoutubeId::Handle(handle) => {
            if handle.starts_with('@') {
                format!("{}/{}/live", base_url, handle)
            } else {
                format!("{}/@{}/live", base_url, handle)
            }
        }
    }
}

/// InnerTube APIクライアント
#[derive(Clone)]
pub struct InnerTubeClient {
    client: Client,
    base_url: String,
}

impl InnerTubeClient {
    /// 新しいクライアントを作成
    ///
    /// # Errors
    /// HTTPクライアントのビルドに失敗した場合にエラーを返す
    pub fn new(config: &LiveChatConfig) -> Result<Self, LiveChatError> {
        let client = Client::builder()
            .user_agent(config.user_agent.as_str())
            .timeout(config.http_timeout())
            .build()
            .map_err(|e| LiveChatError::Network(format!("Failed to build HTTP client: {}", e)))?;

        Ok(Self {
            client,
            base_url: config.base_url.trim_end_matches('/').to_string(),
        })
    }

    /// ライブページを取得してセッション情報を抽出
    pub async fn fetch_live_page(&self, id: &YoutubeId) -> Result<FetchOptions, LiveChatError> {
        let url = generate_live_url(&self.base_url, id);
        log::info!("Fetching live page: {}", url);

        let response = self.client.get(&url).send().await?;

        let status = response.status();
        if !status.is_success() {
            log::warn!("Failed to fetch live page: {}", status);
            return Err(LiveChatError::HttpStatus {
                status: status.as_u16(),
            });
        }

        let body = response.text().await?;
        let options = get_options_from_live_page(&body)?;

        log::info!(
            "Live page resolved: live_id={}, api_key={}, client_version={}, continuation={}",
            options.live_id,
            mask_api_key(&options.api_key),
            options.client_version,
            abbreviate_token(&options.continuation)
        );
        Ok(options)
    }

    /// リクエストボディを構築
    fn build_request_body(options: &FetchOptions) -> serde_json::Value {
        json!({
            "context": {
                "client": {
                    "clientVersion": options.client_version,
                    "clientName": CLIENT_NAME
                }
            },
            "continuation": options.continuation
        })
    }

    /// チャットを1回取得
    ///
    /// # Returns
    /// `(チャットアイテム, 次回のcontinuation)`。continuationが無い場合は空文字列
    pub async fn fetch_chat(
        &self,
        options: &FetchOptions,
    ) -> Result<(Vec<ChatItem>, String), LiveChatError> {
        let url = format!("{}{}", self.base_url, GET_LIVE_CHAT_PATH);

        log::debug!(
            "Fetching chat messages (continuation={})",
            abbreviate_token(&options.continuation)
        );

        let response = self
            .client
            .post(&url)
            .query(&[("key", options.api_key.as_str())])
            .json(&Self::build_request_body(options))
            .send()
            .await?;

        let status = response.status();
        if !status.is_success() {
            log::warn!("get_live_chat returned {}", status);
            return Err(LiveChatError::HttpStatus {
                status: status.as_u16(),
            });
        }

        let body = response.text().await?;
        let parsed: GetLiveChatResponse = serde_json::from_str(&body)?;
        let (items, continuation) = parse_chat_data(parsed);

        log::debug!("get_live_chat: {} items", items.len());
        Ok((items, continuation))
    }
}

impl std::fmt::Debug for InnerTubeClient {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("InnerTubeClient")
            .field("base_url", &self.base_url)
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::USER_AGENT;
    use mockito::Matcher;

    const LIVE_PAGE: &str = r#"<html><head>
<link rel="canonical" href="https://www.youtube.com/watch?v=liveId">
</head><body>
<script>ytcfg.set({"INNERTUBE_API_KEY":"apiKey","INNERTUBE_CONTEXT":{"client":{"clientName":"WEB","clientVersion":"2.20240101.00.00"}}});</script>
<script>var ytInitialData = {"contents":{"liveChatRenderer":{"continuations":[{"reloadContinuationData":{"continuation":"initial-continuation"}}]}}};</script>
</body></html>"#;

    fn client_for(server: &mockito::ServerGuard) -> InnerTubeClient {
        InnerTubeClient::new(&LiveChatConfig::default().with_base_url(server.url())).unwrap()
    }

    fn live_options() -> FetchOptions {
        FetchOptions {
            live_id: "liveId".to_string(),
            api_key: "apiKey".to_string(),
            client_version: "clientVersion".to_string(),
            continuation: "continuation".to_string(),
        }
    }

    #[test]
    fn test_get_options_from_live_page() {
        let options = get_options_from_live_page(LIVE_PAGE).unwrap();
        assert_eq!(
            options,
            FetchOptions {
                live_id: "liveId".to_string(),
                api_key: "apiKey".to_string(),
                client_version: "2.20240101.00.00".to_string(),
                continuation: "initial-continuation".to_string(),
            }
        );
    }

    #[test]
    fn test_live_not_found() {
        let html = LIVE_PAGE.replace(r#"<link rel="canonical" href="https://www.youtube.com/watch?v=liveId">"#, "");
        assert_eq!(
            get_options_from_live_page(&html),
            Err(LiveChatError::LiveNotFound)
        );
    }

    #[test]
    fn test_replay_short_circuits() {
        // 他の値が揃っていてもリプレイ判定が優先
        let html = format!(r#"{}<script>{{"isReplay": true}}</script>"#, LIVE_PAGE);
        assert_eq!(
            get_options_from_live_page(&html),
            Err(LiveChatError::ReplayFinished {
                live_id: "liveId".to_string()
            })
        );

        // APIキー等が無くても同じ
        let html = r#"<link rel="canonical" href="https://www.youtube.com/watch?v=ended">'isReplay':true"#;
        assert_eq!(
            get_options_from_live_page(html),
            Err(LiveChatError::ReplayFinished {
                live_id: "ended".to_string()
            })
        );
    }

    #[test]
    fn test_missing_fields_in_order() {
        let canonical = r#"<link rel="canonical" href="https://www.youtube.com/watch?v=liveId">"#;
        assert_eq!(
            get_options_from_live_page(canonical),
            Err(LiveChatError::ApiKeyMissing)
        );

        let with_key = format!(r#"{}"INNERTUBE_API_KEY":"apiKey""#, canonical);
        assert_eq!(
            get_options_from_live_page(&with_key),
            Err(LiveChatError::ClientVersionMissing)
        );

        let with_version = format!(r#"{}"clientVersion":"2.2024""#, with_key);
        assert_eq!(
            get_options_from_live_page(&with_version),
            Err(LiveChatError::ContinuationMissing)
        );
    }

    #[test]
    fn test_generate_live_url() {
        let base = "https://www.youtube.com";
        assert_eq!(
            generate_live_url(base, &YoutubeId::Channel("channelId".to_string())),
            "https://www.youtube.com/channel/channelId/live"
        );
        assert_eq!(
            generate_live_url(base, &YoutubeId::Live("liveId".to_string())),
            "https://www.youtube.com/watch?v=liveId"
        );
        assert_eq!(
            generate_live_url(base, &YoutubeId::Handle("handle".to_string())),
            "https://www.youtube.com/@handle/live"
        );
        assert_eq!(
            generate_live_url(base, &YoutubeId::Handle("@handle".to_string())),
            "https://www.youtube.com/@handle/live"
        );
    }

    #[tokio::test]
    async fn test_fetch_live_page() {
        let mut server = mockito::Server::new_async().await;
        let mock = server
            .mock("GET", "/@handle/live")
            .match_header("user-agent", USER_AGENT)
            .with_status(200)
            .with_header("content-type", "text/html; charset=utf-8")
            .with_body(LIVE_PAGE)
            .create_async()
            .await;

        let client = client_for(&server);
        let options = client
            .fetch_live_page(&YoutubeId::Handle("handle".to_string()))
            .await
            .unwrap();

        mock.assert_async().await;
        assert_eq!(options.live_id, "liveId");
        assert_eq!(options.continuation, "initial-continuation");
    }

    #[tokio::test]
    async fn test_fetch_live_page_http_error() {
        let mut server = mockito::Server::new_async().await;
        let _mock = server
            .mock("GET", "/channel/missing/live")
            .with_status(404)
            .create_async()
            .await;

        let client = client_for(&server);
        let result = client
            .fetch_live_page(&YoutubeId::Channel("missing".to_string()))
            .await;
        assert_eq!(result, Err(LiveChatError::HttpStatus { status: 404 }));
    }

    #[tokio::test]
    async fn test_fetch_chat_request() {
        let mut server = mockito::Server::new_async().await;
        let mock = server
            .mock("POST", GET_LIVE_CHAT_PATH)
            .match_query(Matcher::UrlEncoded("key".into(), "apiKey".into()))
            .match_body(Matcher::Json(json!({
                "context": {
                    "client": { "clientVersion": "clientVersion", "clientName": "WEB" }
                },
                "continuation": "continuation"
            })))
            .with_status(200)
            .with_header("content-type", "application/json")
            .with_body(
                r#"{"continuationContents": {"liveChatContinuation": {"actions": [], "continuations": []}}}"#,
            )
            .create_async()
            .await;

        let client = client_for(&server);
        let (items, continuation) = client.fetch_chat(&live_options()).await.unwrap();

        mock.assert_async().await;
        assert!(items.is_empty());
        assert_eq!(continuation, "");
    }

    #[tokio::test]
    async fn test_fetch_chat_parses_items() {
        let mut server = mockito::Server::new_async().await;
        let body = json!({
            "continuationContents": {
                "liveChatContinuation": {
                    "continuations": [{
                        "timedContinuationData": { "timeoutMs": 5000, "continuation": "next" }
                    }],
                    "actions": [{
                        "addChatItemAction": {
                            "item": {
                                "liveChatTextMessageRenderer": {
                                    "id": "id",
                                    "message": { "runs": [{ "text": "Hello, World!" }] },
                                    "authorName": { "simpleText": "authorName" },
                                    "timestampUsec": "1609459200000000"
                                }
                            }
                        }
                    }]
                }
            }
        });
        let _mock = server
            .mock("POST", GET_LIVE_CHAT_PATH)
            .match_query(Matcher::Any)
            .with_status(200)
            .with_body(body.to_string())
            .create_async()
            .await;

        let client = client_for(&server);
        let (items, continuation) = client.fetch_chat(&live_options()).await.unwrap();

        assert_eq!(continuation, "next");
        assert_eq!(items.len(), 1);
        assert_eq!(items[0].plain_text(), "Hello, World!");
    }

    #[tokio::test]
    async fn test_fetch_chat_http_error() {
        let mut server = mockito::Server::new_async().await;
        let _mock = server
            .mock("POST", GET_LIVE_CHAT_PATH)
            .match_query(Matcher::Any)
            .with_status(500)
            .create_async()
            .await;

        let client = client_for(&server);
        let result = client.fetch_chat(&live_options()).await;
        assert_eq!(result, Err(LiveChatError::HttpStatus { status: 500 }));
    }

    #[tokio::test]
    async fn test_fetch_chat_decode_error() {
        let mut server = mockito::Server::new_async().await;
        let _mock = server
            .mock("POST", GET_LIVE_CHAT_PATH)
            .match_query(Matcher::Any)
            .with_status(200)
            .with_body("<html>not json</html>")
            .create_async()
            .await;

        let client = client_for(&server);
        let result = client.fetch_chat(&live_options()).await;
        assert!(matches!(result, Err(LiveChatError::Decode(_))));
    }

    #[tokio::test]
    async fn test_fetch_chat_network_error() {
        // 接続できないポート
        let config = LiveChatConfig::default().with_base_url("http://127.0.0.1:1");
        let client = InnerTubeClient::new(&config).unwrap();
        let result = client.fetch_chat(&live_options()).await;
        assert!(matches!(result, Err(LiveChatError::Network(_))));
    }
}
