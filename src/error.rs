use thiserror::Error;

// ─── Top-level error hierarchy ───────────────────────────────────────────────

/// Structured error hierarchy for Heartflow.
///
/// Each subsystem defines its own error variant. Library callers can match on
/// these to decide recovery strategy; internal code continues to use
/// `anyhow::Result` for ad-hoc context chains.
#[derive(Debug, Error)]
pub enum HeartflowError {
    // ── Config ───────────────────────────────────────────────────────────
    #[error("config: {0}")]
    Config(#[from] ConfigError),

    // ── LLM / Provider ──────────────────────────────────────────────────
    #[error("llm: {0}")]
    Llm(#[from] LlmError),

    // ── Judgment ────────────────────────────────────────────────────────
    #[error("judge: {0}")]
    Judge(#[from] JudgeError),

    // ── Transport / Downstream ──────────────────────────────────────────
    #[error("transport: {0}")]
    Transport(#[from] TransportError),

    // ── Generic fallthrough (wraps anyhow for interop) ──────────────────
    #[error(transparent)]
    Other(#[from] anyhow::Error),
}

// ─── Config errors ───────────────────────────────────────────────────────────

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("failed to load config: {0}")]
    Load(String),

    #[error("validation failed: {0}")]
    Validation(String),

    #[error("io: {0}")]
    Io(#[from] std::io::Error),
}

// ─── LLM / Provider errors ──────────────────────────────────────────────────

#[derive(Debug, Error)]
pub enum LlmError {
    #[error("provider {provider} request failed: {message}")]
    Request { provider: String, message: String },

    #[error("provider {provider} returned an empty completion")]
    EmptyCompletion { provider: String },

    #[error("provider {provider} is not configured with a base url")]
    MissingBaseUrl { provider: String },
}

// ─── Judgment errors ────────────────────────────────────────────────────────

/// Failure modes of a single judgment. None of these escape the judgment
/// path: each one degrades to a "do not reply" decision carrying the
/// Display text as its reasoning.
#[derive(Debug, Error)]
pub enum JudgeError {
    #[error("judge provider is not configured")]
    ProviderNotConfigured,

    #[error("judge provider not found: {name}")]
    ProviderNotFound { name: String },

    #[error("judge returned invalid JSON after {attempts} attempt(s): {message}")]
    MalformedResponse { attempts: u32, message: String },

    #[error("judge call failed: {0}")]
    Transport(String),
}

impl JudgeError {
    /// Configuration problems are fatal for the evaluation and never retried.
    pub fn is_configuration(&self) -> bool {
        matches!(
            self,
            Self::ProviderNotConfigured | Self::ProviderNotFound { .. }
        )
    }
}

// ─── Transport errors ───────────────────────────────────────────────────────

#[derive(Debug, Error)]
pub enum TransportError {
    #[error("reply pipeline closed; dropped unit for {chat_id}/{sender_id}")]
    PipelineClosed { chat_id: String, sender_id: String },

    #[error("malformed inbound line: {0}")]
    MalformedInbound(String),
}

// ─── Convenience re-exports ─────────────────────────────────────────────────

/// Shorthand result type for the crate.
pub type Result<T> = std::result::Result<T, HeartflowError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn config_error_displays_correctly() {
        let err = HeartflowError::Config(ConfigError::Validation("bad threshold".into()));
        assert!(err.to_string().contains("validation failed"));
    }

    #[test]
    fn malformed_response_mentions_attempts() {
        let err = JudgeError::MalformedResponse {
            attempts: 3,
            message: "expected value".into(),
        };
        assert!(err.to_string().contains("3 attempt(s)"));
        assert!(!err.is_configuration());
    }

    #[test]
    fn provider_errors_are_configuration() {
        assert!(JudgeError::ProviderNotConfigured.is_configuration());
        assert!(
            JudgeError::ProviderNotFound {
                name: "tiny".into()
            }
            .is_configuration()
        );
        assert!(!JudgeError::Transport("timeout".into()).is_configuration());
    }

    #[test]
    fn anyhow_interop() {
        let anyhow_err = anyhow::anyhow!("something went wrong");
        let err: HeartflowError = anyhow_err.into();
        assert!(err.to_string().contains("something went wrong"));
    }

    #[test]
    fn pipeline_closed_names_key() {
        let err = HeartflowError::Transport(TransportError::PipelineClosed {
            chat_id: "group:1".into(),
            sender_id: "alice".into(),
        });
        assert!(err.to_string().contains("group:1/alice"));
    }
}
