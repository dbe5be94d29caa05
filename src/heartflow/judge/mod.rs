pub mod parse;
pub mod request;

pub use parse::{ParsedJudgment, SUMMARY_FIELD, parse_judgment, parse_summary, strip_code_fences};
pub use request::{JudgmentRequest, activity_summary};

use super::weights::{DimensionScores, ScoreWeights};
use crate::config::JudgeConfig;
use crate::error::JudgeError;
use crate::llm::{Provider, ProviderMessage, ProviderRegistry, filter_plain_turns};
use serde::Serialize;
use std::sync::Arc;

/// Handle to the configured judge model, shared by scoring and persona
/// summarization.
#[derive(Clone)]
pub struct JudgeModel {
    provider_id: Option<String>,
    registry: ProviderRegistry,
    model: String,
    temperature: f64,
}

impl JudgeModel {
    pub fn new(config: &JudgeConfig, registry: ProviderRegistry) -> Self {
        Self {
            provider_id: config.provider_id().map(str::to_string),
            registry,
            model: config.model.clone(),
            temperature: config.temperature,
        }
    }

    pub fn provider_id(&self) -> Option<&str> {
        self.provider_id.as_deref()
    }

    pub fn model(&self) -> &str {
        &self.model
    }

    pub fn temperature(&self) -> f64 {
        self.temperature
    }

    /// Look the provider up. Both failure modes are configuration errors.
    pub fn resolve(&self) -> Result<Arc<dyn Provider>, JudgeError> {
        let id = self
            .provider_id
            .as_deref()
            .ok_or(JudgeError::ProviderNotConfigured)?;
        self.registry
            .get(id)
            .ok_or_else(|| JudgeError::ProviderNotFound {
                name: id.to_string(),
            })
    }
}

/// Outcome of one evaluation. Never persisted.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct JudgeResult {
    pub scores: DimensionScores,
    pub reasoning: Option<String>,
    /// `Σ score·weight / 10`, in `[0, 1]`.
    pub overall_score: f64,
    pub should_reply: bool,
    pub confidence: f64,
}

impl JudgeResult {
    pub fn from_scores(
        scores: DimensionScores,
        reasoning: Option<String>,
        weights: &ScoreWeights,
        threshold: f64,
    ) -> Self {
        let overall_score = weights.overall(&scores);
        Self {
            scores,
            reasoning,
            overall_score,
            should_reply: overall_score >= threshold,
            confidence: overall_score,
        }
    }

    /// A non-admission carrying the failure description.
    pub fn rejected(reason: impl Into<String>) -> Self {
        Self {
            scores: DimensionScores::default(),
            reasoning: Some(reason.into()),
            overall_score: 0.0,
            should_reply: false,
            confidence: 0.0,
        }
    }
}

/// Scores candidate messages with the judge model and turns the result
/// into an admission decision.
pub struct JudgmentEngine {
    model: JudgeModel,
    weights: ScoreWeights,
    max_retries: u32,
    include_reasoning: bool,
    context_messages: usize,
}

impl JudgmentEngine {
    pub fn new(config: &JudgeConfig, model: JudgeModel) -> Self {
        Self {
            model,
            weights: ScoreWeights::from_raw(&config.weights),
            max_retries: config.max_retries,
            include_reasoning: config.include_reasoning,
            context_messages: config.context_messages,
        }
    }

    pub fn weights(&self) -> &ScoreWeights {
        &self.weights
    }

    pub fn model(&self) -> &JudgeModel {
        &self.model
    }

    pub fn max_retries(&self) -> u32 {
        self.max_retries
    }

    /// Evaluate `request`. Every failure degrades to `should_reply = false`
    /// with the error text as reasoning.
    pub async fn evaluate(
        &self,
        request: &JudgmentRequest,
        history: &[ProviderMessage],
    ) -> JudgeResult {
        match self.try_evaluate(request, history).await {
            Ok(result) => result,
            Err(error) => {
                if error.is_configuration() {
                    tracing::warn!(chat = request.chat_id.as_str(), %error, "judge not usable");
                } else {
                    tracing::warn!(chat = request.chat_id.as_str(), %error, "judgment failed");
                }
                JudgeResult::rejected(error.to_string())
            }
        }
    }

    /// Like [`Self::evaluate`] but surfaces the failure kind.
    ///
    /// Makes `max_retries + 1` attempts. Only malformed output is retried;
    /// a failing call returns immediately.
    pub async fn try_evaluate(
        &self,
        request: &JudgmentRequest,
        history: &[ProviderMessage],
    ) -> Result<JudgeResult, JudgeError> {
        let provider = self.model.resolve()?;
        let turns = filter_plain_turns(history, self.context_messages);
        let attempts = self.max_retries.saturating_add(1);
        let mut last_error = String::new();

        for attempt in 1..=attempts {
            let prompt = request.render(self.include_reasoning, attempt);
            let raw = provider
                .chat_with_history(
                    &prompt,
                    &turns,
                    self.model.model(),
                    self.model.temperature(),
                )
                .await
                .map_err(|e| JudgeError::Transport(format!("{e:#}")))?;

            match parse_judgment(&raw) {
                Ok(parsed) => {
                    let reasoning = if self.include_reasoning {
                        parsed.reasoning
                    } else {
                        None
                    };
                    let result = JudgeResult::from_scores(
                        parsed.scores,
                        reasoning,
                        &self.weights,
                        request.threshold,
                    );
                    tracing::debug!(
                        chat = request.chat_id.as_str(),
                        sender = request.sender_id.as_str(),
                        attempt,
                        score = result.overall_score,
                        should_reply = result.should_reply,
                        "judge scored message"
                    );
                    return Ok(result);
                }
                Err(message) => {
                    tracing::warn!(
                        chat = request.chat_id.as_str(),
                        attempt,
                        attempts,
                        error = message.as_str(),
                        "judge returned malformed output"
                    );
                    last_error = message;
                }
            }
        }

        Err(JudgeError::MalformedResponse {
            attempts,
            message: last_error,
        })
    }
}
