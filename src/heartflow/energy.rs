use crate::config::EnergyConfig;
use chrono::{Local, NaiveDate, Utc};
use std::collections::HashMap;
use std::sync::Mutex;

pub const ENERGY_FLOOR: f64 = 0.1;
pub const ENERGY_CEILING: f64 = 1.0;

/// Reported when the bot has never replied in a chat.
pub const NEVER_REPLIED_MINUTES: u64 = 999;

/// Per-chat bookkeeping fed into the judge prompt.
#[derive(Debug, Clone, PartialEq)]
pub struct ChatState {
    pub energy: f64,
    /// Epoch seconds of the last proactive reply; 0 means never.
    pub last_reply_time: i64,
    pub last_reset_date: Option<NaiveDate>,
    pub total_messages: u64,
    pub total_replies: u64,
}

impl Default for ChatState {
    fn default() -> Self {
        Self {
            energy: ENERGY_CEILING,
            last_reply_time: 0,
            last_reset_date: None,
            total_messages: 0,
            total_replies: 0,
        }
    }
}

impl ChatState {
    /// Replies as a percentage of observed messages.
    pub fn reply_rate_percent(&self) -> f64 {
        #[allow(clippy::cast_precision_loss)]
        let rate = self.total_replies as f64 / self.total_messages.max(1) as f64;
        rate * 100.0
    }

    pub fn minutes_since_last_reply(&self, now_epoch_secs: i64) -> u64 {
        if self.last_reply_time == 0 {
            return NEVER_REPLIED_MINUTES;
        }
        u64::try_from((now_epoch_secs - self.last_reply_time).max(0) / 60).unwrap_or_default()
    }
}

/// Owns every chat's [`ChatState`]. Entries are created lazily and live for
/// the process unless an administrator resets them.
pub struct ChatEnergyTracker {
    config: EnergyConfig,
    states: Mutex<HashMap<String, ChatState>>,
}

impl ChatEnergyTracker {
    pub fn new(config: EnergyConfig) -> Self {
        Self {
            config,
            states: Mutex::new(HashMap::new()),
        }
    }

    fn with_state<T>(
        &self,
        chat_id: &str,
        today: NaiveDate,
        f: impl FnOnce(&mut ChatState) -> T,
    ) -> T {
        let mut states = self
            .states
            .lock()
            .unwrap_or_else(std::sync::PoisonError::into_inner);
        let state = states.entry(chat_id.to_string()).or_default();
        if state.last_reset_date != Some(today) {
            state.last_reset_date = Some(today);
            state.energy = (state.energy + self.config.daily_bonus).min(ENERGY_CEILING);
            tracing::debug!(chat = chat_id, energy = state.energy, "daily energy reset");
        }
        f(state)
    }

    /// Snapshot of the chat's state, applying the daily bonus once per
    /// calendar day.
    pub fn get_state(&self, chat_id: &str) -> ChatState {
        self.get_state_on(chat_id, Local::now().date_naive())
    }

    pub fn get_state_on(&self, chat_id: &str, today: NaiveDate) -> ChatState {
        self.with_state(chat_id, today, |state| state.clone())
    }

    pub fn record_active_reply(&self, chat_id: &str) {
        self.record_active_reply_at(chat_id, Local::now().date_naive(), Utc::now().timestamp());
    }

    pub fn record_active_reply_at(&self, chat_id: &str, today: NaiveDate, now_epoch_secs: i64) {
        let decay = self.config.decay_rate;
        let energy = self.with_state(chat_id, today, |state| {
            state.last_reply_time = now_epoch_secs;
            state.total_replies += 1;
            state.total_messages += 1;
            state.energy = (state.energy - decay).max(ENERGY_FLOOR);
            state.energy
        });
        tracing::debug!(chat = chat_id, energy, "recorded active reply");
    }

    pub fn record_passive_message(&self, chat_id: &str) {
        self.record_passive_message_on(chat_id, Local::now().date_naive());
    }

    pub fn record_passive_message_on(&self, chat_id: &str, today: NaiveDate) {
        let recovery = self.config.recovery_rate;
        let energy = self.with_state(chat_id, today, |state| {
            state.total_messages += 1;
            state.energy = (state.energy + recovery).min(ENERGY_CEILING);
            state.energy
        });
        tracing::debug!(chat = chat_id, energy, "recorded passive message");
    }

    /// Drop the chat's state; the next access starts fresh.
    pub fn reset(&self, chat_id: &str) -> bool {
        self.states
            .lock()
            .unwrap_or_else(std::sync::PoisonError::into_inner)
            .remove(chat_id)
            .is_some()
    }

    pub fn len(&self) -> usize {
        self.states
            .lock()
            .unwrap_or_else(std::sync::PoisonError::into_inner)
            .len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}
