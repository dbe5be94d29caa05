use super::judge::{JudgeModel, SUMMARY_FIELD, parse_summary};
use crate::config::PromptCacheConfig;
use std::collections::HashMap;
use std::sync::Mutex;

/// A condensed persona, valid only while `original` still matches the
/// persona's current text.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PromptCacheEntry {
    pub conversation_id: String,
    pub persona_id: String,
    pub original: String,
    pub summary: String,
}

impl PromptCacheEntry {
    /// Summary length relative to the original, in characters.
    pub fn compression_ratio(&self) -> f64 {
        let original = self.original.chars().count().max(1);
        #[allow(clippy::cast_precision_loss)]
        let ratio = self.summary.chars().count() as f64 / original as f64;
        ratio
    }
}

type CacheKey = (String, String);

/// Memoizes persona summaries per (conversation, persona).
pub struct PromptSummaryCache {
    model: JudgeModel,
    config: PromptCacheConfig,
    entries: Mutex<HashMap<CacheKey, PromptCacheEntry>>,
}

fn summarization_prompt(original: &str) -> String {
    format!(
        "Condense the persona description below into a short summary that keeps its \
         personality, tone and interests. Respond with a single JSON object and nothing else:\n\
         {{\"{SUMMARY_FIELD}\": \"<summary>\"}}\n\n\
         Persona description:\n{original}"
    )
}

impl PromptSummaryCache {
    pub fn new(model: JudgeModel, config: PromptCacheConfig) -> Self {
        Self {
            model,
            config,
            entries: Mutex::new(HashMap::new()),
        }
    }

    fn lookup(&self, key: &CacheKey, original: &str) -> Option<String> {
        let entries = self
            .entries
            .lock()
            .unwrap_or_else(std::sync::PoisonError::into_inner);
        entries
            .get(key)
            .filter(|entry| entry.original == original)
            .map(|entry| entry.summary.clone())
    }

    /// Condensed form of `original`. Falls back to `original` itself when it
    /// is already short or summarization fails in any way.
    pub async fn get_summarized(
        &self,
        conversation_id: &str,
        persona_id: &str,
        original: &str,
    ) -> String {
        if original.chars().count() < self.config.min_persona_chars {
            return original.to_string();
        }

        let key = (conversation_id.to_string(), persona_id.to_string());
        if let Some(summary) = self.lookup(&key, original) {
            tracing::debug!(
                conversation = conversation_id,
                persona = persona_id,
                "persona summary cache hit"
            );
            return summary;
        }

        let provider = match self.model.resolve() {
            Ok(provider) => provider,
            Err(error) => {
                tracing::debug!(%error, "skipping persona summarization");
                return original.to_string();
            }
        };

        let prompt = summarization_prompt(original);
        let raw = match provider
            .chat(&prompt, self.model.model(), self.model.temperature())
            .await
        {
            Ok(raw) => raw,
            Err(error) => {
                tracing::warn!(persona = persona_id, error = %format!("{error:#}"), "persona summarization failed");
                return original.to_string();
            }
        };

        let Some(summary) = parse_summary(&raw)
            .filter(|s| s.chars().count() > self.config.min_summary_chars)
        else {
            tracing::warn!(persona = persona_id, "persona summary unusable; using original text");
            return original.to_string();
        };

        tracing::info!(
            conversation = conversation_id,
            persona = persona_id,
            original_chars = original.chars().count(),
            summary_chars = summary.chars().count(),
            "cached persona summary"
        );
        self.entries
            .lock()
            .unwrap_or_else(std::sync::PoisonError::into_inner)
            .insert(
                key,
                PromptCacheEntry {
                    conversation_id: conversation_id.to_string(),
                    persona_id: persona_id.to_string(),
                    original: original.to_string(),
                    summary: summary.clone(),
                },
            );
        summary
    }

    /// Snapshot of all entries, ordered by key.
    pub fn entries(&self) -> Vec<PromptCacheEntry> {
        let mut entries: Vec<PromptCacheEntry> = self
            .entries
            .lock()
            .unwrap_or_else(std::sync::PoisonError::into_inner)
            .values()
            .cloned()
            .collect();
        entries.sort_by(|a, b| {
            (&a.conversation_id, &a.persona_id).cmp(&(&b.conversation_id, &b.persona_id))
        });
        entries
    }

    /// Drop every entry and return how many there were.
    pub fn clear(&self) -> usize {
        let mut entries = self
            .entries
            .lock()
            .unwrap_or_else(std::sync::PoisonError::into_inner);
        let count = entries.len();
        entries.clear();
        count
    }

    pub fn len(&self) -> usize {
        self.entries
            .lock()
            .unwrap_or_else(std::sync::PoisonError::into_inner)
            .len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}
