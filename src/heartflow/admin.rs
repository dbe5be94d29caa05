//! Administrative views over the engine's state. Nothing here makes a
//! decision; it only reads or clears the energy map and the persona cache.

use super::engine::Heartflow;
use super::energy::NEVER_REPLIED_MINUTES;
use super::prompt_cache::PromptCacheEntry;
use super::weights::ScoreWeights;
use chrono::Utc;
use serde::Serialize;
use std::fmt;

const PREVIEW_CHARS: usize = 100;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum EnergyBand {
    High,
    Medium,
    Low,
}

impl EnergyBand {
    pub fn of(energy: f64) -> Self {
        if energy > 0.7 {
            Self::High
        } else if energy > 0.3 {
            Self::Medium
        } else {
            Self::Low
        }
    }
}

impl fmt::Display for EnergyBand {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Self::High => "high",
            Self::Medium => "medium",
            Self::Low => "low",
        })
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct StatusReport {
    pub chat_id: String,
    pub energy: f64,
    pub energy_band: EnergyBand,
    pub minutes_since_last_reply: u64,
    pub total_messages: u64,
    pub total_replies: u64,
    pub reply_rate_percent: f64,
    pub reply_threshold: f64,
    pub judge_provider: Option<String>,
    pub max_retries: u32,
    pub whitelist_enabled: bool,
    pub whitelist_size: usize,
    pub cache_entries: usize,
    pub weights: ScoreWeights,
    pub enabled: bool,
}

impl fmt::Display for StatusReport {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(f, "Heartflow status for {}", self.chat_id)?;
        writeln!(f)?;
        writeln!(f, "State")?;
        writeln!(f, "  energy:            {:.2}/1.0 ({})", self.energy, self.energy_band)?;
        if self.minutes_since_last_reply == NEVER_REPLIED_MINUTES {
            writeln!(f, "  last reply:        never")?;
        } else {
            writeln!(f, "  last reply:        {} min ago", self.minutes_since_last_reply)?;
        }
        writeln!(f)?;
        writeln!(f, "History")?;
        writeln!(f, "  messages:          {}", self.total_messages)?;
        writeln!(f, "  replies:           {}", self.total_replies)?;
        writeln!(f, "  reply rate:        {:.1}%", self.reply_rate_percent)?;
        writeln!(f)?;
        writeln!(f, "Settings")?;
        writeln!(f, "  reply threshold:   {}", self.reply_threshold)?;
        writeln!(
            f,
            "  judge provider:    {}",
            self.judge_provider.as_deref().unwrap_or("(unset)")
        )?;
        writeln!(f, "  max retries:       {}", self.max_retries)?;
        writeln!(
            f,
            "  whitelist:         {} ({} chats)",
            if self.whitelist_enabled { "on" } else { "off" },
            self.whitelist_size
        )?;
        writeln!(f, "  persona cache:     {} entries", self.cache_entries)?;
        writeln!(f)?;
        writeln!(f, "Weights")?;
        for (name, weight) in [
            ("relevance", self.weights.relevance()),
            ("willingness", self.weights.willingness()),
            ("social", self.weights.social()),
            ("timing", self.weights.timing()),
            ("continuity", self.weights.continuity()),
        ] {
            writeln!(f, "  {name:<18} {:.0}%", weight * 100.0)?;
        }
        writeln!(f)?;
        write!(f, "Enabled: {}", if self.enabled { "yes" } else { "no" })
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct CacheReportEntry {
    pub key: String,
    pub persona_id: String,
    pub original_chars: usize,
    pub summary_chars: usize,
    /// Share of the original removed by summarization.
    pub compression_percent: f64,
    pub preview: String,
}

impl From<&PromptCacheEntry> for CacheReportEntry {
    fn from(entry: &PromptCacheEntry) -> Self {
        let preview: String = entry.summary.chars().take(PREVIEW_CHARS).collect();
        Self {
            key: format!("{}_{}", entry.conversation_id, entry.persona_id),
            persona_id: entry.persona_id.clone(),
            original_chars: entry.original.chars().count(),
            summary_chars: entry.summary.chars().count(),
            compression_percent: (1.0 - entry.compression_ratio()) * 100.0,
            preview,
        }
    }
}

#[derive(Debug, Clone, Default, Serialize)]
pub struct CacheReport {
    pub entries: Vec<CacheReportEntry>,
}

impl fmt::Display for CacheReport {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.entries.is_empty() {
            return write!(f, "Persona cache is empty");
        }
        writeln!(f, "Persona cache: {} entries", self.entries.len())?;
        for entry in &self.entries {
            writeln!(f)?;
            writeln!(f, "  key:         {}", entry.key)?;
            writeln!(f, "  persona:     {}", entry.persona_id)?;
            writeln!(
                f,
                "  compression: {} -> {} chars ({:.1}% smaller)",
                entry.original_chars, entry.summary_chars, entry.compression_percent
            )?;
            writeln!(f, "  summary:     {}...", entry.preview)?;
        }
        Ok(())
    }
}

/// Operator command issued against a running engine.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum AdminCommand {
    Status { chat_id: String },
    Reset { chat_id: String },
    Cache,
    CacheClear,
}

impl AdminCommand {
    /// Parse `/status <chat>`, `/reset <chat>`, `/cache` or `/cache_clear`.
    pub fn parse(line: &str) -> Option<Self> {
        let mut words = line.split_whitespace();
        let command = words.next()?;
        let argument = words.next();
        if words.next().is_some() {
            return None;
        }
        match (command, argument) {
            ("/status", Some(chat)) => Some(Self::Status {
                chat_id: chat.to_string(),
            }),
            ("/reset", Some(chat)) => Some(Self::Reset {
                chat_id: chat.to_string(),
            }),
            ("/cache", None) => Some(Self::Cache),
            ("/cache_clear", None) => Some(Self::CacheClear),
            _ => None,
        }
    }
}

impl Heartflow {
    /// Run `command` against live state and render the operator reply.
    pub fn execute_admin(&self, command: &AdminCommand) -> String {
        match command {
            AdminCommand::Status { chat_id } => self.status_report(chat_id).to_string(),
            AdminCommand::Reset { chat_id } => {
                if self.reset_chat(chat_id) {
                    format!("Reset state for {chat_id}")
                } else {
                    format!("No state recorded for {chat_id}")
                }
            }
            AdminCommand::Cache => self.cache_report().to_string(),
            AdminCommand::CacheClear => {
                format!("Cleared {} persona cache entries", self.clear_cache())
            }
        }
    }

    pub fn status_report(&self, chat_id: &str) -> StatusReport {
        let state = self.energy().get_state(chat_id);
        let config = self.config();
        StatusReport {
            chat_id: chat_id.to_string(),
            energy: state.energy,
            energy_band: EnergyBand::of(state.energy),
            minutes_since_last_reply: state.minutes_since_last_reply(Utc::now().timestamp()),
            total_messages: state.total_messages,
            total_replies: state.total_replies,
            reply_rate_percent: state.reply_rate_percent(),
            reply_threshold: config.judge.reply_threshold,
            judge_provider: self.judge().model().provider_id().map(str::to_string),
            max_retries: self.judge().max_retries(),
            whitelist_enabled: config.whitelist.enabled,
            whitelist_size: if config.whitelist.enabled {
                config.whitelist.chats.len()
            } else {
                0
            },
            cache_entries: self.prompt_cache().len(),
            weights: *self.judge().weights(),
            enabled: config.enabled,
        }
    }

    /// Forget the chat's energy and counters.
    pub fn reset_chat(&self, chat_id: &str) -> bool {
        let removed = self.energy().reset(chat_id);
        tracing::info!(chat = chat_id, removed, "chat state reset");
        removed
    }

    pub fn cache_report(&self) -> CacheReport {
        CacheReport {
            entries: self
                .prompt_cache()
                .entries()
                .iter()
                .map(CacheReportEntry::from)
                .collect(),
        }
    }

    pub fn clear_cache(&self) -> usize {
        let removed = self.prompt_cache().clear();
        tracing::info!(removed, "persona cache cleared");
        removed
    }
}
