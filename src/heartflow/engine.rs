use super::debounce::DebounceCoordinator;
use super::energy::ChatEnergyTracker;
use super::gate::{self, GateDecision};
use super::judge::{JudgeModel, JudgmentEngine, JudgmentRequest, activity_summary};
use super::prompt_cache::PromptSummaryCache;
use crate::config::Config;
use crate::conversation::{
    ConversationContext, ConversationSource, last_bot_reply, load_context, recent_messages_text,
};
use crate::llm::ProviderRegistry;
use crate::transport::{InboundMessage, ReplyPipeline};
use chrono::{Local, Utc};
use std::sync::Arc;

/// What happened to one inbound group message.
#[derive(Debug, Clone, PartialEq)]
pub enum MessageOutcome {
    /// Rejected by the gate before any judge call.
    Skipped(GateDecision),
    /// Admitted; a merged reply will follow once the sender goes quiet.
    Deferred { score: f64 },
    /// Judged and declined (including judge failures).
    Declined {
        score: f64,
        reason: Option<String>,
    },
}

/// Proactive-reply engine for group chats.
///
/// Owns the per-chat energy map, the per-sender debounce map and the
/// persona summary cache for the life of the process.
pub struct Heartflow {
    config: Config,
    judge: JudgmentEngine,
    energy: Arc<ChatEnergyTracker>,
    debounce: DebounceCoordinator,
    prompt_cache: PromptSummaryCache,
    conversations: Arc<dyn ConversationSource>,
}

impl Heartflow {
    pub fn new(
        config: Config,
        registry: ProviderRegistry,
        conversations: Arc<dyn ConversationSource>,
        pipeline: Arc<dyn ReplyPipeline>,
    ) -> Self {
        let model = JudgeModel::new(&config.judge, registry);
        let energy = Arc::new(ChatEnergyTracker::new(config.energy));
        let debounce = DebounceCoordinator::new(config.debounce, Arc::clone(&energy), pipeline);
        let prompt_cache = PromptSummaryCache::new(model.clone(), config.prompt_cache);
        let judge = JudgmentEngine::new(&config.judge, model);

        if judge.model().provider_id().is_none() {
            tracing::warn!("no judge provider configured; every message will be declined");
        }

        Self {
            config,
            judge,
            energy,
            debounce,
            prompt_cache,
            conversations,
        }
    }

    /// Build with one OpenAI-compatible provider per `[providers]` entry.
    pub fn from_config(
        config: Config,
        conversations: Arc<dyn ConversationSource>,
        pipeline: Arc<dyn ReplyPipeline>,
    ) -> Self {
        let registry = ProviderRegistry::from_config(&config);
        Self::new(config, registry, conversations, pipeline)
    }

    pub fn config(&self) -> &Config {
        &self.config
    }

    pub fn judge(&self) -> &JudgmentEngine {
        &self.judge
    }

    pub fn energy(&self) -> &ChatEnergyTracker {
        &self.energy
    }

    pub fn debounce(&self) -> &DebounceCoordinator {
        &self.debounce
    }

    pub fn prompt_cache(&self) -> &PromptSummaryCache {
        &self.prompt_cache
    }

    /// Resolve the judge provider and open its connection pool.
    pub async fn warmup(&self) -> crate::Result<()> {
        let provider = self.judge.model().resolve()?;
        provider.warmup().await?;
        tracing::debug!(provider = provider.name(), "judge provider warmed up");
        Ok(())
    }

    async fn persona_summary(&self, context: &ConversationContext) -> Option<String> {
        let prompt = context.persona.prompt.trim();
        if prompt.is_empty() {
            return None;
        }
        let Some(conversation_id) = context.conversation_id.as_deref() else {
            return Some(prompt.to_string());
        };
        let summary = self
            .prompt_cache
            .get_summarized(conversation_id, &context.persona.persona_id, prompt)
            .await;
        Some(summary)
    }

    /// Assemble the judge's view of `message` from chat state and stored
    /// conversation context.
    pub async fn build_request(
        &self,
        message: &InboundMessage,
        context: &ConversationContext,
    ) -> JudgmentRequest {
        let state = self.energy.get_state(&message.chat_id);
        JudgmentRequest {
            sender_id: message.sender_id.clone(),
            sender_name: message.sender_name.clone(),
            chat_id: message.chat_id.clone(),
            text: message.text.clone(),
            timestamp: message.timestamp,
            recent_messages: recent_messages_text(
                &context.history,
                self.config.judge.context_messages,
            ),
            last_bot_reply: last_bot_reply(&context.history),
            energy: state.energy,
            minutes_since_last_reply: state.minutes_since_last_reply(Utc::now().timestamp()),
            activity_summary: activity_summary(&state, Local::now()),
            persona_summary: self.persona_summary(context).await,
            threshold: self.config.judge.reply_threshold,
        }
    }

    /// Gate, judge, then either arm the sender's debounce timer or record
    /// the message as passively observed.
    pub async fn on_group_message(&self, message: InboundMessage) -> MessageOutcome {
        let decision = gate::check(&self.config, &message);
        if !decision.is_admit() {
            tracing::debug!(
                chat = message.chat_id.as_str(),
                sender = message.sender_id.as_str(),
                reason = %decision,
                "message skipped by gate"
            );
            return MessageOutcome::Skipped(decision);
        }

        let context = load_context(self.conversations.as_ref(), &message.chat_id).await;
        let request = self.build_request(&message, &context).await;
        let result = self.judge.evaluate(&request, &context.history).await;

        if result.should_reply {
            tracing::info!(
                chat = message.chat_id.as_str(),
                sender = message.sender_id.as_str(),
                score = result.overall_score,
                threshold = request.threshold,
                "proactive reply admitted"
            );
            let score = result.overall_score;
            self.debounce.on_admitted_message(message, &result);
            MessageOutcome::Deferred { score }
        } else {
            self.energy.record_passive_message(&message.chat_id);
            tracing::debug!(
                chat = message.chat_id.as_str(),
                sender = message.sender_id.as_str(),
                score = result.overall_score,
                reason = result.reasoning.as_deref().unwrap_or(""),
                "proactive reply declined"
            );
            MessageOutcome::Declined {
                score: result.overall_score,
                reason: result.reasoning,
            }
        }
    }
}
