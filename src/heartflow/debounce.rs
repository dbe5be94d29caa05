use super::energy::ChatEnergyTracker;
use super::judge::JudgeResult;
use crate::config::DebounceConfig;
use crate::transport::{CompositeUnit, InboundMessage, ReplyPipeline};
use std::collections::HashMap;
use std::collections::hash_map::Entry;
use std::sync::Arc;
use std::sync::Mutex;
use std::sync::atomic::{AtomicU64, Ordering};
use std::time::Duration;
use tokio::task::JoinHandle;
use tokio::time::Instant;

type WaitKey = (String, String);

struct PendingMessage {
    received_at: Instant,
    message: InboundMessage,
}

/// One sender's burst in progress. The entry exists only while a timer is
/// armed and always holds at least one message.
struct UserWaitState {
    accumulated: Vec<PendingMessage>,
    waiting_since: Instant,
    /// Identifies the timer currently allowed to commit this entry.
    generation: u64,
    timer: Option<JoinHandle<()>>,
}

struct Inner {
    quiet: Duration,
    slack: Duration,
    waits: Mutex<HashMap<WaitKey, UserWaitState>>,
    next_generation: AtomicU64,
    energy: Arc<ChatEnergyTracker>,
    pipeline: Arc<dyn ReplyPipeline>,
}

/// Coalesces a sender's admitted messages and hands one composite unit
/// downstream once they have been quiet for the configured window.
///
/// Keys are `(chat_id, sender_id)`; different senders never merge.
#[derive(Clone)]
pub struct DebounceCoordinator {
    inner: Arc<Inner>,
}

impl DebounceCoordinator {
    pub fn new(
        config: DebounceConfig,
        energy: Arc<ChatEnergyTracker>,
        pipeline: Arc<dyn ReplyPipeline>,
    ) -> Self {
        Self {
            inner: Arc::new(Inner {
                quiet: Duration::from_secs(config.quiet_secs),
                slack: Duration::from_millis(config.slack_ms),
                waits: Mutex::new(HashMap::new()),
                next_generation: AtomicU64::new(0),
                energy,
                pipeline,
            }),
        }
    }

    pub fn quiet_duration(&self) -> Duration {
        self.inner.quiet
    }

    /// Arm or re-arm the sender's quiet timer with `message` appended.
    ///
    /// Must be called from within a Tokio runtime.
    pub fn on_admitted_message(&self, message: InboundMessage, result: &JudgeResult) {
        let key = (message.chat_id.clone(), message.sender_id.clone());
        let generation = self.inner.next_generation.fetch_add(1, Ordering::Relaxed) + 1;
        let now = Instant::now();
        let pending = PendingMessage {
            received_at: now,
            message,
        };

        let mut waits = self
            .inner
            .waits
            .lock()
            .unwrap_or_else(std::sync::PoisonError::into_inner);

        let timer = self.spawn_timer(key.clone(), generation);
        match waits.entry(key) {
            Entry::Occupied(mut occupied) => {
                let state = occupied.get_mut();
                if let Some(previous) = state.timer.take() {
                    previous.abort();
                }
                state.accumulated.push(pending);
                state.waiting_since = now;
                state.generation = generation;
                state.timer = Some(timer);
                tracing::info!(
                    chat = occupied.key().0.as_str(),
                    sender = occupied.key().1.as_str(),
                    pending = occupied.get().accumulated.len(),
                    score = result.overall_score,
                    "debounce timer re-armed"
                );
            }
            Entry::Vacant(vacant) => {
                tracing::info!(
                    chat = vacant.key().0.as_str(),
                    sender = vacant.key().1.as_str(),
                    score = result.overall_score,
                    quiet_secs = self.inner.quiet.as_secs(),
                    "debounce timer armed"
                );
                vacant.insert(UserWaitState {
                    accumulated: vec![pending],
                    waiting_since: now,
                    generation,
                    timer: Some(timer),
                });
            }
        }
    }

    fn spawn_timer(&self, key: WaitKey, generation: u64) -> JoinHandle<()> {
        let inner = Arc::clone(&self.inner);
        tokio::spawn(async move { inner.expire(key, generation).await })
    }

    pub fn is_waiting(&self, chat_id: &str, sender_id: &str) -> bool {
        self.pending_count(chat_id, sender_id) > 0
    }

    /// Messages accumulated for the sender's open burst.
    pub fn pending_count(&self, chat_id: &str, sender_id: &str) -> usize {
        self.inner
            .waits
            .lock()
            .unwrap_or_else(std::sync::PoisonError::into_inner)
            .get(&(chat_id.to_string(), sender_id.to_string()))
            .map_or(0, |state| state.accumulated.len())
    }

    /// Number of senders currently inside a quiet window.
    pub fn waiting_senders(&self) -> usize {
        self.inner
            .waits
            .lock()
            .unwrap_or_else(std::sync::PoisonError::into_inner)
            .len()
    }

    /// Abort every armed timer and drop the pending bursts without merging.
    pub fn cancel_all(&self) -> usize {
        let mut waits = self
            .inner
            .waits
            .lock()
            .unwrap_or_else(std::sync::PoisonError::into_inner);
        let count = waits.len();
        for (_, state) in waits.drain() {
            if let Some(timer) = state.timer {
                timer.abort();
            }
        }
        count
    }
}

impl Inner {
    async fn expire(self: Arc<Self>, key: WaitKey, generation: u64) {
        tokio::time::sleep(self.quiet).await;

        let Some(unit) = self.take_if_due(&key, generation) else {
            return;
        };

        self.energy.record_active_reply(&unit.chat_id);
        tracing::info!(
            chat = unit.chat_id.as_str(),
            sender = unit.sender_id.as_str(),
            messages = unit.message_count,
            "quiet window closed; handing merged unit to reply pipeline"
        );

        if let Err(error) = self.pipeline.deliver(unit).await {
            tracing::error!(%error, "reply pipeline handoff failed");
        }
    }

    /// Commit the burst if `generation` still owns the entry and the quiet
    /// window has really elapsed. The entry is removed here, so a message
    /// arriving during the handoff opens a fresh burst.
    fn take_if_due(&self, key: &WaitKey, generation: u64) -> Option<CompositeUnit> {
        let mut waits = self
            .waits
            .lock()
            .unwrap_or_else(std::sync::PoisonError::into_inner);

        let state = waits.get(key)?;
        if state.generation != generation
            || state.waiting_since.elapsed() + self.slack < self.quiet
        {
            tracing::debug!(
                chat = key.0.as_str(),
                sender = key.1.as_str(),
                generation,
                "stale debounce timer ignored"
            );
            return None;
        }

        let state = waits.remove(key)?;
        if let Some(first) = state.accumulated.first() {
            tracing::debug!(
                chat = key.0.as_str(),
                sender = key.1.as_str(),
                burst_ms = u64::try_from(first.received_at.elapsed().as_millis()).unwrap_or(u64::MAX),
                "committing debounced burst"
            );
        }
        let messages: Vec<InboundMessage> = state
            .accumulated
            .into_iter()
            .map(|pending| pending.message)
            .collect();
        CompositeUnit::merge(&messages)
    }
}
