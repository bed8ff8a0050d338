//! ポーラーが利用するデータ取得元
//!
//! 本番では [`InnerTubeClient`] を使う。テストではメモリ上の実装に差し替える。

use futures::future::BoxFuture;

use super::errors::LiveChatError;
use super::innertube::InnerTubeClient;
use super::types::{ChatItem, FetchOptions, YoutubeId};

pub trait LiveChatSource: Send + Sync + 'static {
    /// 配信指定を解決してセッション情報を取得
    fn fetch_live_page<'a>(
        &'a self,
        id: &'a YoutubeId,
    ) -> BoxFuture<'a, Result<FetchOptions, LiveChatError>>;

    /// チャットを1回取得し、次回のcontinuationと共に返す
    fn fetch_chat<'a>(
        &'a self,
        options: &'a FetchOptions,
    ) -> BoxFuture<'a, Result<(Vec<ChatItem>, String), LiveChatError>>;
}

impl LiveChatSource for InnerTubeClient {
    fn fetch_live_page<'a>(
        &'a self,
        id: &'a YoutubeId,
    ) -> BoxFuture<'a, Result<FetchOptions, LiveChatError>> {
        Box::pin(InnerTubeClient::fetch_live_page(self, id))
    }

    fn fetch_chat<'a>(
        &'a self,
        options: &'a FetchOptions,
    ) -> BoxFuture<'a, Result<(Vec<ChatItem>, String), LiveChatError>> {
        Box::pin(InnerTubeClient::fetch_chat(self, options))
    }
}
