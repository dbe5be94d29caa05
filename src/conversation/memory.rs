use super::traits::{ConversationSnapshot, ConversationSource};
use crate::llm::ProviderMessage;
use std::collections::HashMap;
use std::future::Future;
use std::pin::Pin;
use std::sync::Mutex;

#[derive(Default)]
struct ChatRecord {
    current: Option<String>,
    conversations: HashMap<String, ConversationSnapshot>,
}

#[derive(Default)]
struct Inner {
    chats: HashMap<String, ChatRecord>,
    personas: HashMap<String, String>,
    default_persona: Option<String>,
}

/// Process-local conversation store. Used by the CLI and by tests; real
/// hosts implement [`ConversationSource`] over their own storage.
#[derive(Default)]
pub struct InMemoryConversations {
    inner: Mutex<Inner>,
}

impl InMemoryConversations {
    pub fn new() -> Self {
        Self::default()
    }

    fn with_inner<T>(&self, f: impl FnOnce(&mut Inner) -> T) -> T {
        let mut inner = self
            .inner
            .lock()
            .unwrap_or_else(std::sync::PoisonError::into_inner);
        f(&mut inner)
    }

    pub fn add_persona(&self, persona_id: impl Into<String>, prompt: impl Into<String>) {
        let (id, prompt) = (persona_id.into(), prompt.into());
        self.with_inner(|inner| {
            inner.personas.insert(id, prompt);
        });
    }

    pub fn set_default_persona(&self, persona_id: impl Into<String>) {
        let id = persona_id.into();
        self.with_inner(|inner| inner.default_persona = Some(id));
    }

    /// Create (or replace) a conversation and make it current for the chat.
    pub fn start_conversation(&self, chat_id: &str, conversation_id: &str, persona: Option<&str>) {
        self.with_inner(|inner| {
            let record = inner.chats.entry(chat_id.to_string()).or_default();
            record.conversations.insert(
                conversation_id.to_string(),
                ConversationSnapshot {
                    persona_id: persona.map(str::to_string),
                    history: Vec::new(),
                },
            );
            record.current = Some(conversation_id.to_string());
        });
    }

    pub fn set_persona(&self, chat_id: &str, persona: Option<&str>) {
        self.with_inner(|inner| {
            if let Some(record) = inner.chats.get_mut(chat_id)
                && let Some(current) = record.current.clone()
                && let Some(snapshot) = record.conversations.get_mut(&current)
            {
                snapshot.persona_id = persona.map(str::to_string);
            }
        });
    }

    /// Append to the current conversation, creating one if the chat has
    /// none yet.
    pub fn push_history(&self, chat_id: &str, message: ProviderMessage) {
        self.with_inner(|inner| {
            let record = inner.chats.entry(chat_id.to_string()).or_default();
            let current = record
                .current
                .get_or_insert_with(|| format!("{chat_id}:default"))
                .clone();
            record
                .conversations
                .entry(current)
                .or_default()
                .history
                .push(message);
        });
    }
}

impl ConversationSource for InMemoryConversations {
    fn current_conversation_id<'a>(
        &'a self,
        chat_id: &'a str,
    ) -> Pin<Box<dyn Future<Output = anyhow::Result<Option<String>>> + Send + 'a>> {
        let current = self.with_inner(|inner| {
            inner
                .chats
                .get(chat_id)
                .and_then(|record| record.current.clone())
        });
        Box::pin(async move { Ok(current) })
    }

    fn conversation<'a>(
        &'a self,
        chat_id: &'a str,
        conversation_id: &'a str,
    ) -> Pin<Box<dyn Future<Output = anyhow::Result<Option<ConversationSnapshot>>> + Send + 'a>>
    {
        let snapshot = self.with_inner(|inner| {
            inner
                .chats
                .get(chat_id)
                .and_then(|record| record.conversations.get(conversation_id).cloned())
        });
        Box::pin(async move { Ok(snapshot) })
    }

    fn persona_prompt<'a>(
        &'a self,
        persona_id: &'a str,
    ) -> Pin<Box<dyn Future<Output = anyhow::Result<Option<String>>> + Send + 'a>> {
        let prompt = self.with_inner(|inner| inner.personas.get(persona_id).cloned());
        Box::pin(async move { Ok(prompt) })
    }

    fn default_persona(
        &self,
    ) -> Pin<Box<dyn Future<Output = anyhow::Result<Option<String>>> + Send + '_>> {
        let default = self.with_inner(|inner| inner.default_persona.clone());
        Box::pin(async move { Ok(default) })
    }
}
