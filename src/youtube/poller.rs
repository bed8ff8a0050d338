//! ライブチャットポーラー
//!
//! `start()` でライブページを解決し、以降は一定間隔で `get_live_chat` を呼び出す。
//! 取得結果は4本のイベントチャネル（チャット / エラー / 開始 / 終了）へ流す。
//!
//! ## 状態遷移
//! - Idle → Running: `start()` がセッション解決に成功したとき
//! - Running → Idle: `stop()`、またはワーカーがセッション情報を失ったとき
//!
//! ## 配信ポリシー
//! イベントチャネルはすべて有界で、満杯のときはイベントを捨てる（タイマーを止めない）。
//! 取得に失敗してもcontinuationは更新せず、次のtickで同じトークンを再試行する。

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;
use tokio::sync::{mpsc, watch};
use tokio::task::JoinHandle;
use tokio::time::{interval_at, Instant, MissedTickBehavior};

use super::errors::LiveChatError;
use super::innertube::InnerTubeClient;
use super::source::LiveChatSource;
use super::types::{ChatItem, FetchOptions, YoutubeId};
use crate::config::LiveChatConfig;
use crate::util::abbreviate_token;

/// 開始・終了イベントのバッファ数（単発イベントのため1件で足りる）
const LIFECYCLE_CHANNEL_CAPACITY: usize = 1;

/// 利用側が受け取るイベントチャネル
#[derive(Debug)]
pub struct PollerEvents {
    /// 正規化済みチャット
    pub chat: mpsc::Receiver<ChatItem>,
    /// セッション解決・取得時のエラー
    pub errors: mpsc::Receiver<LiveChatError>,
    /// 開始（解決済みの動画ID）
    pub start: mpsc::Receiver<String>,
    /// 終了（停止理由）
    pub end: mpsc::Receiver<String>,
}

/// イベント送信側。送信はすべてノンブロッキング
#[derive(Clone)]
struct EventSenders {
    chat: mpsc::Sender<ChatItem>,
    errors: mpsc::Sender<LiveChatError>,
    start: mpsc::Sender<String>,
    end: mpsc::Sender<String>,
}

impl EventSenders {
    fn channel(config: &LiveChatConfig) -> (Self, PollerEvents) {
        let (chat_tx, chat_rx) = mpsc::channel(config.chat_capacity.max(1));
        let (error_tx, error_rx) = mpsc::channel(config.error_capacity.max(1));
        let (start_tx, start_rx) = mpsc::channel(LIFECYCLE_CHANNEL_CAPACITY);
        let (end_tx, end_rx) = mpsc::channel(LIFECYCLE_CHANNEL_CAPACITY);

        (
            Self {
                chat: chat_tx,
                errors: error_tx,
                start: start_tx,
                end: end_tx,
            },
            PollerEvents {
                chat: chat_rx,
                errors: error_rx,
                start: start_rx,
                end: end_rx,
            },
        )
    }

    fn emit_chat(&self, item: ChatItem) {
        if let Err(e) = self.chat.try_send(item) {
            log::debug!("Dropping chat item: {}", e);
        }
    }

    fn emit_error(&self, err: LiveChatError) {
        if let Err(e) = self.errors.try_send(err) {
            log::debug!("Dropping error event: {}", e);
        }
    }

    fn emit_start(&self, live_id: String) {
        if let Err(e) = self.start.try_send(live_id) {
            log::debug!("Dropping start event: {}", e);
        }
    }

    fn emit_end(&self, reason: String) {
        if let Err(e) = self.end.try_send(reason) {
            log::debug!("Dropping end event: {}", e);
        }
    }
}

/// 実行中ワーカーの制御用ハンドル
#[derive(Default)]
struct WorkerHandle {
    stop_tx: Option<watch::Sender<bool>>,
    task_handle: Option<JoinHandle<()>>,
}

/// YouTubeライブチャットポーラー
///
/// 状態はインスタンスごとに保持するため、複数の配信を同一プロセスで並行して監視できる。
/// ポーラーを破棄するとワーカーも停止する。
pub struct LiveChatPoller<S: LiveChatSource = InnerTubeClient> {
    id: YoutubeId,
    interval: Duration,
    source: Arc<S>,
    /// 実行中フラグ
    running: Arc<AtomicBool>,
    /// セッション情報（continuationはワーカーのみが更新）
    options: Arc<Mutex<Option<FetchOptions>>>,
    /// start/stopの直列化とワーカー制御
    worker: tokio::sync::Mutex<WorkerHandle>,
    events: EventSenders,
}

impl LiveChatPoller<InnerTubeClient> {
    /// InnerTubeクライアントを使うポーラーを作成
    ///
    /// # Errors
    /// - 配信指定が空の場合 `IdentifierMissing`
    /// - HTTPクライアントのビルドに失敗した場合 `Network`
    pub fn new(
        id: YoutubeId,
        config: &LiveChatConfig,
    ) -> Result<(Self, PollerEvents), LiveChatError> {
        let client = InnerTubeClient::new(config)?;
        Self::with_source(id, config, client)
    }
}

impl<S: LiveChatSource> LiveChatPoller<S> {
    /// 任意の取得元でポーラーを作成
    pub fn with_source(
        id: YoutubeId,
        config: &LiveChatConfig,
        source: S,
    ) -> Result<(Self, PollerEvents), LiveChatError> {
        if id.as_str().trim().is_empty() {
            return Err(LiveChatError::IdentifierMissing);
        }

        let (events, receivers) = EventSenders::channel(config);

        let poller = Self {
            id,
            interval: config.interval(),
            source: Arc::new(source),
            running: Arc::new(AtomicBool::new(false)),
            options: Arc::new(Mutex::new(None)),
            worker: tokio::sync::Mutex::new(WorkerHandle::default()),
            events,
        };
        Ok((poller, receivers))
    }

    /// ポーリング中かどうか
    pub fn is_running(&self) -> bool {
        self.running.load(Ordering::SeqCst)
    }

    pub fn interval(&self) -> Duration {
        self.interval
    }

    /// 動画ID（解決前は動画IDで指定された場合のみ）
    pub fn live_id(&self) -> Option<String> {
        self.options()
            .map(|o| o.live_id)
            .or_else(|| self.id.live_id().map(str::to_string))
    }

    /// 現在のセッション情報のスナップショット
    pub fn options(&self) -> Option<FetchOptions> {
        self.options.lock().ok().and_then(|o| o.clone())
    }

    /// ポーリングを開始
    ///
    /// ライブページの解決が終わるまで待機する。解決に失敗した場合は
    /// エラーチャネルにも同じエラーを流し、状態は変えない。
    ///
    /// # Errors
    /// - 既に実行中の場合 `AlreadyRunning`（ワーカーは増えない）
    /// - セッション解決に失敗した場合はそのエラー
    pub async fn start(&self) -> Result<(), LiveChatError> {
        let mut worker = self.worker.lock().await;

        if self.running.load(Ordering::SeqCst) {
            log::debug!("Live chat poller is already running: {}", self.id);
            return Err(LiveChatError::AlreadyRunning);
        }

        // 自分で停止したワーカーの後始末
        worker.stop_tx = None;
        if let Some(handle) = worker.task_handle.take() {
            if let Err(e) = handle.await {
                log::warn!("Previous polling task ended abnormally: {}", e);
            }
        }

        let options = match self.source.fetch_live_page(&self.id).await {
            Ok(options) => options,
            Err(e) => {
                log::error!("Failed to resolve live chat for {}: {}", self.id, e);
                self.events.emit_error(e.clone());
                return Err(e);
            }
        };

        let live_id = options.live_id.clone();
        match self.options.lock() {
            Ok(mut guard) => *guard = Some(options),
            Err(e) => log::error!("Failed to acquire options lock: {}", e),
        }

        self.running.store(true, Ordering::SeqCst);
        self.events.emit_start(live_id.clone());

        let (stop_tx, stop_rx) = watch::channel(false);
        let context = PollingContext {
            source: Arc::clone(&self.source),
            options: Arc::clone(&self.options),
            running: Arc::clone(&self.running),
            events: self.events.clone(),
            stop_rx,
        };
        let handle = tokio::spawn(polling_loop(context, self.interval));

        worker.stop_tx = Some(stop_tx);
        worker.task_handle = Some(handle);

        log::info!(
            "Live chat polling started: live_id={}, interval={:?}",
            live_id,
            self.interval
        );
        Ok(())
    }

    /// ポーリングを停止
    ///
    /// この関数は冪等であり、停止済みなら何もしない。
    /// 取得中のリクエストは中断せず完了を待つが、その結果は配信しない。
    pub async fn stop(&self, reason: impl Into<String>) {
        let reason = reason.into();
        let mut worker = self.worker.lock().await;

        if !self.running.swap(false, Ordering::SeqCst) {
            log::debug!("Live chat poller already stopped");
            return;
        }

        if let Some(stop_tx) = worker.stop_tx.take() {
            let _ = stop_tx.send(true);
        }
        if let Some(handle) = worker.task_handle.take() {
            if let Err(e) = handle.await {
                log::warn!("Polling task ended abnormally: {}", e);
            }
        }

        log::info!("Live chat polling stopped: {}", reason);
        self.events.emit_end(reason);
    }
}

/// ワーカーが保持する共有状態
struct PollingContext<S> {
    source: Arc<S>,
    options: Arc<Mutex<Option<FetchOptions>>>,
    running: Arc<AtomicBool>,
    events: EventSenders,
    stop_rx: watch::Receiver<bool>,
}

/// ポーリングループ（tickと停止要求を待ち合わせる）
async fn polling_loop<S: LiveChatSource>(mut context: PollingContext<S>, period: Duration) {
    // 初回は1間隔後（start()で既に1往復しているため）
    let mut ticker = interval_at(Instant::now() + period, period);
    ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);

    loop {
        tokio::select! {
            biased;

            changed = context.stop_rx.changed() => {
                // 送信側の破棄（ポーラーのdrop）も停止として扱う
                if changed.is_err() || *context.stop_rx.borrow() {
                    break;
                }
            }
            _ = ticker.tick() => {
                if !context.execute().await {
                    break;
                }
            }
        }
    }

    log::info!("Polling loop ended");
}

impl<S: LiveChatSource> PollingContext<S> {
    /// 1サイクル分の取得を実行。ループを続ける場合はtrue
    async fn execute(&mut self) -> bool {
        let Some(options) = self.options.lock().ok().and_then(|o| o.clone()) else {
            let err = LiveChatError::OptionsNotFound;
            log::error!("Polling without session options: {}", err);
            self.events.emit_error(err.clone());
            if self
                .running
                .compare_exchange(true, false, Ordering::SeqCst, Ordering::SeqCst)
                .is_ok()
            {
                self.events.emit_end(err.to_string());
            }
            return false;
        };

        let result = self.source.fetch_chat(&options).await;

        if self.stop_requested() {
            log::debug!("Stop requested during fetch; discarding result");
            return false;
        }

        match result {
            Ok((items, continuation)) => {
                if !items.is_empty() {
                    log::debug!("Live chat: {} new items", items.len());
                }
                for item in items {
                    self.events.emit_chat(item);
                }
                self.update_continuation(continuation);
            }
            Err(e) => {
                // continuationは据え置き。次のtickで同じトークンを再試行する
                log::warn!("Live chat fetch error: {}", e);
                self.events.emit_error(e);
            }
        }

        true
    }

    fn stop_requested(&self) -> bool {
        !self.running.load(Ordering::SeqCst)
            || self.stop_rx.has_changed().is_err()
            || *self.stop_rx.borrow()
    }

    fn update_continuation(&self, continuation: String) {
        if continuation.is_empty() {
            log::debug!("No continuation in response; keeping current token");
            return;
        }

        match self.options.lock() {
            Ok(mut guard) => {
                if let Some(options) = guard.as_mut() {
                    log::debug!("Next continuation: {}", abbreviate_token(&continuation));
                    options.continuation = continuation;
                }
            }
            Err(e) => log::error!("Failed to acquire options lock for update: {}", e),
        }
    }
}
