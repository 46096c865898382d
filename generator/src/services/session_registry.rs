//! Process-wide map from session id to its live output channel

use std::collections::{HashMap, VecDeque};
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use std::time::{Duration, Instant};

use futures_util::stream::{self, BoxStream, StreamExt};
use shared::{session_debug, session_info, session_warn, SessionEvent, SessionId};
use tokio::sync::broadcast::{self, error::RecvError};
use tokio::sync::{Mutex, RwLock, RwLockReadGuard};
use tokio_util::sync::CancellationToken;

use crate::config::SessionConfig;

/// Stream of events handed to a session subscriber
pub type EventStream = BoxStream<'static, SessionEvent>;

struct ActiveRun {
    run_id: u64,
    token: CancellationToken,
}

/// One session's channel: broadcast for attached subscribers, backlog otherwise
pub struct SessionChannel {
    session_id: SessionId,
    sender: broadcast::Sender<SessionEvent>,
    backlog: Mutex<VecDeque<SessionEvent>>,
    backlog_capacity: usize,
    last_activity: Mutex<Instant>,
    active_run: Mutex<Option<ActiveRun>>,
}

impl SessionChannel {
    fn new(session_id: SessionId, config: &SessionConfig) -> Self {
        let (sender, _) = broadcast::channel(config.broadcast_capacity.max(1));
        Self {
            session_id,
            sender,
            backlog: Mutex::new(VecDeque::new()),
            backlog_capacity: config.backlog_capacity.max(1),
            last_activity: Mutex::new(Instant::now()),
            active_run: Mutex::new(None),
        }
    }

    pub fn session_id(&self) -> &SessionId {
        &self.session_id
    }

    pub fn subscriber_count(&self) -> usize {
        self.sender.receiver_count()
    }

    pub async fn backlog_len(&self) -> usize {
        self.backlog.lock().await.len()
    }

    pub async fn has_active_run(&self) -> bool {
        self.active_run.lock().await.is_some()
    }

    async fn touch(&self) {
        *self.last_activity.lock().await = Instant::now();
    }

    async fn idle_for(&self) -> Duration {
        self.last_activity.lock().await.elapsed()
    }

    async fn is_idle(&self, ttl: Duration) -> bool {
        self.subscriber_count() == 0 && !self.has_active_run().await && self.idle_for().await >= ttl
    }

    async fn publish(&self, event: SessionEvent) {
        let mut backlog = self.backlog.lock().await;

        let undelivered = if self.sender.receiver_count() == 0 {
            Some(event)
        } else {
            // every receiver may have gone away since the check
            self.sender.send(event).err().map(|e| e.0)
        };

        if let Some(event) = undelivered {
            if backlog.len() >= self.backlog_capacity {
                backlog.pop_front();
                session_warn!(
                    self.session_id,
                    capacity = self.backlog_capacity,
                    "Session backlog full, dropping oldest event"
                );
            }
            backlog.push_back(event);
        }
        drop(backlog);

        self.touch().await;
    }

    async fn subscribe(&self) -> EventStream {
        let (receiver, replay) = {
            let mut backlog = self.backlog.lock().await;
            let receiver = self.sender.subscribe();
            let replay: Vec<SessionEvent> = backlog.drain(..).collect();
            (receiver, replay)
        };
        self.touch().await;

        if !replay.is_empty() {
            session_debug!(self.session_id, replayed = replay.len(), "Replaying backlog to subscriber");
        }

        let session_id = self.session_id.clone();
        let live = stream::unfold(receiver, move |mut receiver| {
            let session_id = session_id.clone();
            async move {
                loop {
                    match receiver.recv().await {
                        Ok(event) => return Some((event, receiver)),
                        Err(RecvError::Lagged(skipped)) => {
                            session_warn!(session_id, skipped, "Subscriber lagged, events skipped");
                        }
                        Err(RecvError::Closed) => return None,
                    }
                }
            }
        });

        stream::iter(replay).chain(live).boxed()
    }
}

type ChannelMap = HashMap<SessionId, Arc<SessionChannel>>;

/// Registry of session channels, shared by producers and consumers
pub struct SessionRegistry {
    channels: RwLock<ChannelMap>,
    config: SessionConfig,
    next_run_id: AtomicU64,
}

impl Default for SessionRegistry {
    fn default() -> Self {
        Self::new(SessionConfig::default())
    }
}

impl SessionRegistry {
    pub fn new(config: SessionConfig) -> Self {
        Self {
            channels: RwLock::new(HashMap::new()),
            config,
            next_run_id: AtomicU64::new(1),
        }
    }

    pub fn config(&self) -> &SessionConfig {
        &self.config
    }

    /// Get or create the channel for `session_id`
    pub async fn ensure(&self, session_id: &SessionId) -> Arc<SessionChannel> {
        let (_map, channel) = self.pinned(session_id).await;
        channel.touch().await;
        channel
    }

    /// Get or create the channel and keep the map read-locked, so eviction
    /// cannot remove it while the caller works on it
    async fn pinned(&self, session_id: &SessionId) -> (RwLockReadGuard<'_, ChannelMap>, Arc<SessionChannel>) {
        let channels = self.channels.read().await;
        let existing = channels.get(session_id).cloned();
        if let Some(channel) = existing {
            return (channels, channel);
        }
        drop(channels);

        let mut channels = self.channels.write().await;
        let channel = channels
            .entry(session_id.clone())
            .or_insert_with(|| {
                session_debug!(session_id, "Creating session channel");
                Arc::new(SessionChannel::new(session_id.clone(), &self.config))
            })
            .clone();
        (channels.downgrade(), channel)
    }

    pub async fn get(&self, session_id: &SessionId) -> Option<Arc<SessionChannel>> {
        self.channels.read().await.get(session_id).cloned()
    }

    pub async fn publish(&self, session_id: &SessionId, event: SessionEvent) {
        let (_map, channel) = self.pinned(session_id).await;
        channel.publish(event).await;
    }

    /// Attach a subscriber; backlog events come first, then live ones
    pub async fn subscribe(&self, session_id: &SessionId) -> EventStream {
        let (_map, channel) = self.pinned(session_id).await;
        channel.subscribe().await
    }

    /// Record `token` as the session's active run, cancelling any previous one
    pub async fn register_run(&self, session_id: &SessionId, token: CancellationToken) -> u64 {
        let (_map, channel) = self.pinned(session_id).await;
        let run_id = self.next_run_id.fetch_add(1, Ordering::Relaxed);

        let previous = channel
            .active_run
            .lock()
            .await
            .replace(ActiveRun { run_id, token });
        if let Some(previous) = previous {
            session_warn!(session_id, previous_run = previous.run_id, "Replacing active run, cancelling the previous one");
            previous.token.cancel();
        }
        channel.touch().await;
        run_id
    }

    /// Clear the active run if it is still `run_id`
    pub async fn finish_run(&self, session_id: &SessionId, run_id: u64) {
        if let Some(channel) = self.get(session_id).await {
            let mut active = channel.active_run.lock().await;
            if active.as_ref().is_some_and(|run| run.run_id == run_id) {
                *active = None;
            }
            drop(active);
            channel.touch().await;
        }
    }

    /// Cancel the session's active run; false when none is running
    pub async fn cancel(&self, session_id: &SessionId) -> bool {
        let Some(channel) = self.get(session_id).await else {
            return false;
        };
        let active = channel.active_run.lock().await;
        match active.as_ref() {
            Some(run) if !run.token.is_cancelled() => {
                run.token.cancel();
                session_info!(session_id, run = run.run_id, "Run cancelled on request");
                true
            }
            _ => false,
        }
    }

    /// Drop sessions idle longer than `ttl` with no subscriber and no active run
    pub async fn evict_idle(&self, ttl: Duration) -> usize {
        let candidates = self.idle_candidates(ttl).await;
        if candidates.is_empty() {
            return 0;
        }
        self.remove_idle(candidates, ttl).await
    }

    async fn idle_candidates(&self, ttl: Duration) -> Vec<SessionId> {
        let snapshot: Vec<(SessionId, Arc<SessionChannel>)> = self
            .channels
            .read()
            .await
            .iter()
            .map(|(id, channel)| (id.clone(), Arc::clone(channel)))
            .collect();

        let mut candidates = Vec::new();
        for (id, channel) in snapshot {
            if channel.is_idle(ttl).await {
                candidates.push(id);
            }
        }
        candidates
    }

    async fn remove_idle(&self, candidates: Vec<SessionId>, ttl: Duration) -> usize {
        let mut channels = self.channels.write().await;
        let mut evicted = 0;
        for id in candidates {
            // the session may have been used since the snapshot
            let Some(channel) = channels.get(&id).cloned() else {
                continue;
            };
            if channel.is_idle(ttl).await {
                channels.remove(&id);
                session_debug!(id, "Evicted idle session");
                evicted += 1;
            }
        }
        evicted
    }

    pub async fn len(&self) -> usize {
        self.channels.read().await.len()
    }

    pub async fn is_empty(&self) -> bool {
        self.channels.read().await.is_empty()
    }
}
