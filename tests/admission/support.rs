use heartflow::config::Config;
use heartflow::conversation::InMemoryConversations;
use heartflow::llm::{Provider, ProviderMessage, ProviderRegistry};
use heartflow::transport::{CompositeUnit, InboundMessage, QueuePipeline};
use heartflow::Heartflow;
use std::collections::VecDeque;
use std::future::Future;
use std::pin::Pin;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, LazyLock, Mutex, MutexGuard, PoisonError};
use tokio::sync::mpsc;

const OVERRIDE_VARS: [&str; 4] = [
    "HEARTFLOW_JUDGE_PROVIDER",
    "HEARTFLOW_JUDGE_MODEL",
    "HEARTFLOW_API_KEY",
    "HEARTFLOW_REPLY_THRESHOLD",
];

static ENV_LOCK: LazyLock<Mutex<()>> = LazyLock::new(|| Mutex::new(()));

/// Clears every `HEARTFLOW_*` override while held and restores the
/// developer's values on drop.
pub struct CleanEnv {
    saved: Vec<(&'static str, Option<String>)>,
    _lock: MutexGuard<'static, ()>,
}

impl CleanEnv {
    pub fn acquire() -> Self {
        let lock = ENV_LOCK.lock().unwrap_or_else(PoisonError::into_inner);
        let saved = OVERRIDE_VARS
            .iter()
            .map(|key| (*key, std::env::var(key).ok()))
            .collect();
        for key in OVERRIDE_VARS {
            // SAFETY: ENV_LOCK serializes every env mutation in this binary.
            unsafe { std::env::remove_var(key) };
        }
        Self { saved, _lock: lock }
    }

    pub fn set(self, key: &'static str, value: &str) -> Self {
        // SAFETY: ENV_LOCK is held for the lifetime of `self`.
        unsafe { std::env::set_var(key, value) };
        self
    }
}

impl Drop for CleanEnv {
    fn drop(&mut self) {
        for (key, previous) in &self.saved {
            // SAFETY: the lock field is released only after this body runs.
            unsafe {
                match previous {
                    Some(value) => std::env::set_var(key, value),
                    None => std::env::remove_var(key),
                }
            }
        }
    }
}

pub const HIGH: &str =
    r#"{"relevance": 9, "willingness": 9, "social": 8, "timing": 8, "continuity": 7}"#;
pub const LOW: &str =
    r#"{"relevance": 1, "willingness": 2, "social": 1, "timing": 1, "continuity": 0}"#;

/// Answers judge prompts from a queue, keyed by nothing but call order.
pub struct QueuedJudge {
    replies: Mutex<VecDeque<String>>,
    calls: AtomicUsize,
}

impl QueuedJudge {
    pub fn new(replies: &[&str]) -> Arc<Self> {
        Arc::new(Self {
            replies: Mutex::new(replies.iter().map(|r| (*r).to_string()).collect()),
            calls: AtomicUsize::new(0),
        })
    }

    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }
}

impl Provider for QueuedJudge {
    fn name(&self) -> &str {
        "queued"
    }

    fn chat_with_history<'a>(
        &'a self,
        _prompt: &'a str,
        _history: &'a [ProviderMessage],
        _model: &'a str,
        _temperature: f64,
    ) -> Pin<Box<dyn Future<Output = anyhow::Result<String>> + Send + 'a>> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        let next = self.replies.lock().unwrap().pop_front();
        Box::pin(async move { next.ok_or_else(|| anyhow::anyhow!("judge queue empty")) })
    }
}

pub fn enabled_config() -> Config {
    let mut config = Config {
        enabled: true,
        ..Config::default()
    };
    config.judge.provider = Some("tiny".into());
    config
}

pub fn heartflow_with(
    config: Config,
    judge: Arc<QueuedJudge>,
) -> (Heartflow, mpsc::Receiver<CompositeUnit>) {
    let mut registry = ProviderRegistry::new();
    registry.insert("tiny", judge);
    let (pipeline, rx) = QueuePipeline::channel(16);
    let heartflow = Heartflow::new(
        config,
        registry,
        Arc::new(InMemoryConversations::new()),
        Arc::new(pipeline),
    );
    (heartflow, rx)
}

pub fn message(chat: &str, sender: &str, text: &str) -> InboundMessage {
    InboundMessage {
        id: format!("{chat}:{sender}:{text}"),
        chat_id: chat.into(),
        sender_id: sender.into(),
        sender_name: sender.to_uppercase(),
        self_id: "bot".into(),
        text: text.into(),
        timestamp: 1_760_000_000,
        is_addressed: false,
    }
}
