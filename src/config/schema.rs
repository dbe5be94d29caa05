use crate::error::ConfigError;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::path::PathBuf;

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Config {
    /// Path to config.toml - computed from home, not serialized
    #[serde(skip)]
    pub config_path: PathBuf,

    /// Master switch. Nothing is judged while this is off.
    #[serde(default)]
    pub enabled: bool,

    #[serde(default)]
    pub judge: JudgeConfig,

    #[serde(default)]
    pub energy: EnergyConfig,

    #[serde(default)]
    pub debounce: DebounceConfig,

    #[serde(default)]
    pub whitelist: WhitelistConfig,

    #[serde(default)]
    pub prompt_cache: PromptCacheConfig,

    /// OpenAI-compatible endpoints the judge can be pointed at, keyed by id.
    #[serde(default)]
    pub providers: BTreeMap<String, ProviderEndpointConfig>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct JudgeConfig {
    /// Identifier of the small judge model's provider. Unset disables judging.
    #[serde(default)]
    pub provider: Option<String>,
    /// Model name passed to the provider; empty means the endpoint default.
    #[serde(default)]
    pub model: String,
    #[serde(default = "default_judge_temperature")]
    pub temperature: f64,
    #[serde(default = "default_max_retries")]
    pub max_retries: u32,
    #[serde(default = "default_true")]
    pub include_reasoning: bool,
    #[serde(default = "default_context_messages")]
    pub context_messages: usize,
    #[serde(default = "default_reply_threshold")]
    pub reply_threshold: f64,
    #[serde(default)]
    pub weights: WeightsConfig,
}

fn default_judge_temperature() -> f64 {
    0.3
}

fn default_max_retries() -> u32 {
    3
}

fn default_true() -> bool {
    true
}

fn default_context_messages() -> usize {
    5
}

fn default_reply_threshold() -> f64 {
    0.6
}

impl Default for JudgeConfig {
    fn default() -> Self {
        Self {
            provider: None,
            model: String::new(),
            temperature: default_judge_temperature(),
            max_retries: default_max_retries(),
            include_reasoning: true,
            context_messages: default_context_messages(),
            reply_threshold: default_reply_threshold(),
            weights: WeightsConfig::default(),
        }
    }
}

impl JudgeConfig {
    /// The configured provider id, treating a blank string as unset.
    pub fn provider_id(&self) -> Option<&str> {
        self.provider
            .as_deref()
            .map(str::trim)
            .filter(|id| !id.is_empty())
    }
}

/// Raw dimension weights as written by the user. They are renormalized
/// by [`crate::heartflow::ScoreWeights`] and need not sum to one here.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct WeightsConfig {
    #[serde(default = "default_relevance")]
    pub relevance: f64,
    #[serde(default = "default_willingness")]
    pub willingness: f64,
    #[serde(default = "default_social")]
    pub social: f64,
    #[serde(default = "default_timing")]
    pub timing: f64,
    #[serde(default = "default_continuity")]
    pub continuity: f64,
}

fn default_relevance() -> f64 {
    0.25
}

fn default_willingness() -> f64 {
    0.2
}

fn default_social() -> f64 {
    0.2
}

fn default_timing() -> f64 {
    0.15
}

fn default_continuity() -> f64 {
    0.2
}

impl Default for WeightsConfig {
    fn default() -> Self {
        Self {
            relevance: default_relevance(),
            willingness: default_willingness(),
            social: default_social(),
            timing: default_timing(),
            continuity: default_continuity(),
        }
    }
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize)]
pub struct EnergyConfig {
    #[serde(default = "default_decay_rate")]
    pub decay_rate: f64,
    #[serde(default = "default_recovery_rate")]
    pub recovery_rate: f64,
    #[serde(default = "default_daily_bonus")]
    pub daily_bonus: f64,
}

fn default_decay_rate() -> f64 {
    0.1
}

fn default_recovery_rate() -> f64 {
    0.02
}

fn default_daily_bonus() -> f64 {
    0.2
}

impl Default for EnergyConfig {
    fn default() -> Self {
        Self {
            decay_rate: default_decay_rate(),
            recovery_rate: default_recovery_rate(),
            daily_bonus: default_daily_bonus(),
        }
    }
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize)]
pub struct DebounceConfig {
    #[serde(default = "default_quiet_secs")]
    pub quiet_secs: u64,
    /// Tolerance when a firing timer checks whether it was superseded.
    #[serde(default = "default_slack_ms")]
    pub slack_ms: u64,
}

fn default_quiet_secs() -> u64 {
    6
}

fn default_slack_ms() -> u64 {
    100
}

impl Default for DebounceConfig {
    fn default() -> Self {
        Self {
            quiet_secs: default_quiet_secs(),
            slack_ms: default_slack_ms(),
        }
    }
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct WhitelistConfig {
    #[serde(default)]
    pub enabled: bool,
    #[serde(default)]
    pub chats: Vec<String>,
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize)]
pub struct PromptCacheConfig {
    /// Persona prompts shorter than this are used as-is.
    #[serde(default = "default_min_persona_chars")]
    pub min_persona_chars: usize,
    /// Summaries at or below this length are rejected as implausible.
    #[serde(default = "default_min_summary_chars")]
    pub min_summary_chars: usize,
}

fn default_min_persona_chars() -> usize {
    50
}

fn default_min_summary_chars() -> usize {
    10
}

impl Default for PromptCacheConfig {
    fn default() -> Self {
        Self {
            min_persona_chars: default_min_persona_chars(),
            min_summary_chars: default_min_summary_chars(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ProviderEndpointConfig {
    pub base_url: String,
    #[serde(default)]
    pub api_key: Option<String>,
    /// Model used when the judge config leaves `model` empty.
    #[serde(default)]
    pub model: String,
    #[serde(default = "default_timeout_secs")]
    pub timeout_secs: u64,
}

fn default_timeout_secs() -> u64 {
    30
}

impl Default for Config {
    fn default() -> Self {
        Self {
            config_path: PathBuf::new(),
            enabled: false,
            judge: JudgeConfig::default(),
            energy: EnergyConfig::default(),
            debounce: DebounceConfig::default(),
            whitelist: WhitelistConfig::default(),
            prompt_cache: PromptCacheConfig::default(),
            providers: BTreeMap::new(),
        }
    }
}

fn unit_interval(name: &str, value: f64) -> Result<(), ConfigError> {
    if (0.0..=1.0).contains(&value) {
        Ok(())
    } else {
        Err(ConfigError::Validation(format!(
            "{name} must be within [0, 1], got {value}"
        )))
    }
}

impl Config {
    pub fn validate(&self) -> Result<(), ConfigError> {
        unit_interval("judge.reply_threshold", self.judge.reply_threshold)?;
        unit_interval("energy.decay_rate", self.energy.decay_rate)?;
        unit_interval("energy.recovery_rate", self.energy.recovery_rate)?;
        unit_interval("energy.daily_bonus", self.energy.daily_bonus)?;

        let w = &self.judge.weights;
        for (name, value) in [
            ("relevance", w.relevance),
            ("willingness", w.willingness),
            ("social", w.social),
            ("timing", w.timing),
            ("continuity", w.continuity),
        ] {
            if !value.is_finite() || value < 0.0 {
                return Err(ConfigError::Validation(format!(
                    "judge.weights.{name} must be a non-negative number, got {value}"
                )));
            }
        }

        if self.debounce.quiet_secs == 0 {
            return Err(ConfigError::Validation(
                "debounce.quiet_secs must be at least 1".into(),
            ));
        }
        if self.debounce.slack_ms >= self.debounce.quiet_secs.saturating_mul(1000) {
            return Err(ConfigError::Validation(
                "debounce.slack_ms must be smaller than the quiet window".into(),
            ));
        }

        Ok(())
    }

    /// Whether the given chat passes the whitelist. An enabled but empty
    /// whitelist admits nothing.
    pub fn chat_allowed(&self, chat_id: &str) -> bool {
        if !self.whitelist.enabled {
            return true;
        }
        self.whitelist.chats.iter().any(|c| c == chat_id)
    }
}
