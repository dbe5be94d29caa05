use super::types::{MessageRole, ProviderMessage};
use std::future::Future;
use std::pin::Pin;

/// Keep the last `window` turns of `history` and drop everything a small
/// judge model cannot be assumed to understand: non user/assistant roles,
/// turns carrying tool calls or tool results, and blank text.
pub fn filter_plain_turns(history: &[ProviderMessage], window: usize) -> Vec<ProviderMessage> {
    let start = history.len().saturating_sub(window);
    history[start..]
        .iter()
        .filter(|msg| msg.is_conversational())
        .filter_map(|msg| {
            let text = msg.plain_text()?;
            if text.trim().is_empty() {
                return None;
            }
            Some(match msg.role {
                MessageRole::Assistant => ProviderMessage::assistant(text),
                _ => ProviderMessage::user(text),
            })
        })
        .collect()
}

/// A completion backend the judge can talk to.
pub trait Provider: Send + Sync {
    /// Provider identifier (e.g. "tiny", "local-qwen").
    fn name(&self) -> &str;

    /// Send `prompt` as the final user turn after the given plain-text
    /// `history`, returning the raw completion text.
    fn chat_with_history<'a>(
        &'a self,
        prompt: &'a str,
        history: &'a [ProviderMessage],
        model: &'a str,
        temperature: f64,
    ) -> Pin<Box<dyn Future<Output = anyhow::Result<String>> + Send + 'a>>;

    fn chat<'a>(
        &'a self,
        prompt: &'a str,
        model: &'a str,
        temperature: f64,
    ) -> Pin<Box<dyn Future<Output = anyhow::Result<String>> + Send + 'a>> {
        Box::pin(async move {
            self.chat_with_history(prompt, &[], model, temperature)
                .await
        })
    }

    /// Warm up the HTTP connection pool.
    fn warmup(&self) -> Pin<Box<dyn Future<Output = anyhow::Result<()>> + Send + '_>> {
        Box::pin(async move { Ok(()) })
    }
}
