//! Best-effort live results. The cache here is advisory: it may be replaced
//! or emptied at any time, and nothing in a voting session reads it.

use std::sync::Arc;
use std::time::Duration;

use tokio::{
    sync::{watch, Notify},
    task::JoinHandle,
    time::MissedTickBehavior,
};

use crate::boundary::{BoundaryResult, ElectionSource, ResultsChannel, ResultsStream};
use crate::config::Config;
use crate::model::{
    election::ElectionId,
    results::{ElectionResults, ResultsMessage},
};
use crate::retry::{describe, RetryPolicy};

/// Latest known results for one election, observable by any number of views.
#[derive(Debug)]
pub struct ResultsCache {
    sender: watch::Sender<Option<ElectionResults>>,
}

impl ResultsCache {
    pub fn new() -> Self {
        let (sender, _) = watch::channel(None);
        Self { sender }
    }

    pub fn current(&self) -> Option<ElectionResults> {
        self.sender.borrow().clone()
    }

    /// Last write wins; there is no ordering between producers.
    pub fn replace(&self, results: ElectionResults) {
        self.sender.send_replace(Some(results));
    }

    pub fn evict(&self) {
        self.sender.send_replace(None);
    }

    /// Watch for changes.
    pub fn subscribe(&self) -> watch::Receiver<Option<ElectionResults>> {
        self.sender.subscribe()
    }
}

impl Default for ResultsCache {
    fn default() -> Self {
        Self::new()
    }
}

/// Why a re-fetch was triggered.
#[derive(Debug, Copy, Clone, PartialEq, Eq)]
pub enum RefreshReason {
    Initial,
    TimerTick,
    Requested,
    ChannelSignal,
    HandshakeTimeout,
    HandshakeFailed,
    ChannelError,
    ChannelClosed,
}

/// Keeps a [`ResultsCache`] fresh from two producers, a polling timer and an
/// optional push channel, both feeding the same re-fetch path.
pub struct ResultsListener<S: ?Sized, C: ?Sized> {
    source: Arc<S>,
    channel: Option<Arc<C>>,
    cache: Arc<ResultsCache>,
    handshake_timeout: Duration,
    poll_interval: Duration,
    retry: RetryPolicy,
}

impl<S, C> ResultsListener<S, C>
where
    S: ElectionSource + ?Sized + 'static,
    C: ResultsChannel + ?Sized + 'static,
{
    pub fn new(source: Arc<S>, channel: Option<Arc<C>>, cache: Arc<ResultsCache>, config: &Config) -> Self {
        Self {
            source,
            channel,
            cache,
            handshake_timeout: config.results_handshake_timeout(),
            poll_interval: config.results_poll_interval(),
            retry: config.read_retry(),
        }
    }

    /// Start listening for `election_id` on a background task.
    pub fn spawn(self, election_id: ElectionId) -> ListenerHandle {
        let trigger = Arc::new(Notify::new());
        let task_trigger = trigger.clone();
        let task = tokio::spawn(async move { self.run(election_id, task_trigger).await });
        ListenerHandle { task, trigger }
    }

    /// Re-fetch from the source. A failed fetch leaves the cache as it was.
    pub async fn refresh(&self, election_id: &ElectionId, reason: RefreshReason) {
        debug!("refreshing results for election {election_id}: {reason:?}");
        match self
            .retry
            .run("results fetch", || self.source.get_results(election_id))
            .await
        {
            Ok(results) => self.cache.replace(results),
            Err(err) => warn!(
                "could not refresh results for election {election_id}: {}",
                describe(&err)
            ),
        }
    }

    /// Open the push channel, giving up after the handshake timeout.
    async fn open_channel(&self, election_id: &ElectionId) -> Option<ResultsStream> {
        let channel = self.channel.as_ref()?;
        match tokio::time::timeout(self.handshake_timeout, channel.open(election_id)).await {
            Ok(Ok(stream)) => {
                info!("live results channel open for election {election_id}");
                Some(stream)
            }
            Ok(Err(err)) => {
                warn!("live results channel unavailable, polling only: {err}");
                self.refresh(election_id, RefreshReason::HandshakeFailed)
                    .await;
                None
            }
            Err(_) => {
                warn!(
                    "live results handshake took over {}ms, polling only",
                    self.handshake_timeout.as_millis()
                );
                self.refresh(election_id, RefreshReason::HandshakeTimeout)
                    .await;
                None
            }
        }
    }

    async fn run(self, election_id: ElectionId, trigger: Arc<Notify>) {
        self.refresh(&election_id, RefreshReason::Initial).await;
        let mut stream = self.open_channel(&election_id).await;

        let mut ticker = tokio::time::interval(self.poll_interval);
        ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);
        // The first tick completes immediately.
        ticker.tick().await;

        loop {
            tokio::select! {
                _ = ticker.tick() => {
                    self.refresh(&election_id, RefreshReason::TimerTick).await;
                }
                _ = trigger.notified() => {
                    self.refresh(&election_id, RefreshReason::Requested).await;
                }
                message = next_message(&mut stream) => match message {
                    Some(Ok(ResultsMessage::FullUpdate { results })) => {
                        if results.election_id == election_id {
                            self.cache.replace(results);
                        } else {
                            warn!(
                                "ignoring results for election {} on channel for {election_id}",
                                results.election_id
                            );
                        }
                    }
                    Some(Ok(ResultsMessage::Refresh)) => {
                        self.refresh(&election_id, RefreshReason::ChannelSignal).await;
                    }
                    Some(Err(err)) => {
                        warn!("live results channel error, polling only: {err}");
                        stream = None;
                        self.refresh(&election_id, RefreshReason::ChannelError).await;
                    }
                    None => {
                        info!("live results channel closed, polling only");
                        stream = None;
                        self.refresh(&election_id, RefreshReason::ChannelClosed).await;
                    }
                },
            }
        }
    }
}

/// Next message from the channel; never resolves when there is no channel.
async fn next_message(stream: &mut Option<ResultsStream>) -> Option<BoundaryResult<ResultsMessage>> {
    match stream {
        Some(stream) => stream.recv().await,
        None => std::future::pending().await,
    }
}

/// Control over a running listener. Dropping it stops the listener.
pub struct ListenerHandle {
    task: JoinHandle<()>,
    trigger: Arc<Notify>,
}

impl ListenerHandle {
    /// Ask for an immediate re-fetch, e.g. from a manual refresh button.
    pub fn refresh_now(&self) {
        self.trigger.notify_one();
    }

    /// Stop listening. The cache keeps whatever it last held.
    pub fn stop(self) {
        drop(self);
    }
}

impl Drop for ListenerHandle {
    fn drop(&mut self) {
        self.task.abort();
    }
}
