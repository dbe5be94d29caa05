use crate::llm::ProviderMessage;
use std::future::Future;
use std::pin::Pin;

/// A stored conversation as seen by the judge: its persona and history.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ConversationSnapshot {
    pub persona_id: Option<String>,
    /// Oldest first.
    pub history: Vec<ProviderMessage>,
}

pub type BoxFuture<'a, T> = Pin<Box<dyn Future<Output = anyhow::Result<T>> + Send + 'a>>;

/// Read-only access to the host's conversation store and persona catalogue.
pub trait ConversationSource: Send + Sync {
    /// Conversation currently active in `chat_id`, if any.
    fn current_conversation_id<'a>(&'a self, chat_id: &'a str) -> BoxFuture<'a, Option<String>>;

    fn conversation<'a>(
        &'a self,
        chat_id: &'a str,
        conversation_id: &'a str,
    ) -> BoxFuture<'a, Option<ConversationSnapshot>>;

    /// Prompt text of the named persona.
    fn persona_prompt<'a>(&'a self, persona_id: &'a str) -> BoxFuture<'a, Option<String>>;

    /// Name of the persona used when a conversation does not pick one.
    fn default_persona(&self) -> BoxFuture<'_, Option<String>>;
}
