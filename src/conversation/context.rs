use super::traits::{ConversationSource, ConversationSnapshot};
use crate::llm::{MessageRole, ProviderMessage};

/// Persona id a user sets to explicitly run without any persona.
pub const NO_PERSONA_SENTINEL: &str = "[%None]";

/// Persona id recorded for chats that have no conversation yet.
pub const DEFAULT_PERSONA_KEY: &str = "default";

pub const NO_HISTORY_MARKER: &str = "(no conversation history)";

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct PersonaSelection {
    pub persona_id: String,
    /// Empty when the persona is unknown or explicitly disabled.
    pub prompt: String,
}

/// Everything the judge reads from the conversation store for one message.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ConversationContext {
    pub conversation_id: Option<String>,
    pub persona: PersonaSelection,
    pub history: Vec<ProviderMessage>,
}

/// Load the judge's view of `chat_id`. Store failures degrade to an empty
/// context; they never block a judgment.
pub async fn load_context(source: &dyn ConversationSource, chat_id: &str) -> ConversationContext {
    let conversation_id = match source.current_conversation_id(chat_id).await {
        Ok(id) => id,
        Err(error) => {
            tracing::debug!(chat = chat_id, %error, "conversation id lookup failed");
            None
        }
    };

    let snapshot = match &conversation_id {
        Some(id) => match source.conversation(chat_id, id).await {
            Ok(snapshot) => snapshot,
            Err(error) => {
                tracing::debug!(chat = chat_id, %error, "conversation lookup failed");
                None
            }
        },
        None => None,
    };

    let persona = resolve_persona(source, snapshot.as_ref()).await;
    let history = snapshot.map(|s| s.history).unwrap_or_default();

    ConversationContext {
        conversation_id,
        persona,
        history,
    }
}

async fn resolve_persona(
    source: &dyn ConversationSource,
    snapshot: Option<&ConversationSnapshot>,
) -> PersonaSelection {
    let chosen = snapshot
        .and_then(|s| s.persona_id.as_deref())
        .filter(|id| !id.is_empty());

    if chosen == Some(NO_PERSONA_SENTINEL) {
        return PersonaSelection {
            persona_id: NO_PERSONA_SENTINEL.to_string(),
            prompt: String::new(),
        };
    }

    let persona_id = match chosen {
        Some(id) => Some(id.to_string()),
        None => source.default_persona().await.unwrap_or_else(|error| {
            tracing::debug!(%error, "default persona lookup failed");
            None
        }),
    };

    let Some(persona_id) = persona_id else {
        return PersonaSelection {
            persona_id: DEFAULT_PERSONA_KEY.to_string(),
            prompt: String::new(),
        };
    };

    let prompt = match source.persona_prompt(&persona_id).await {
        Ok(Some(prompt)) => prompt,
        Ok(None) => {
            tracing::debug!(persona = persona_id.as_str(), "persona not found");
            String::new()
        }
        Err(error) => {
            tracing::debug!(persona = persona_id.as_str(), %error, "persona lookup failed");
            String::new()
        }
    };

    PersonaSelection { persona_id, prompt }
}

/// The last `window` user/assistant texts, oldest first, separated by
/// `\n---\n`.
pub fn recent_messages_text(history: &[ProviderMessage], window: usize) -> String {
    let start = history.len().saturating_sub(window);
    let texts: Vec<String> = history[start..]
        .iter()
        .filter(|msg| msg.is_conversational())
        .filter_map(ProviderMessage::plain_text)
        .collect();

    if texts.is_empty() {
        NO_HISTORY_MARKER.to_string()
    } else {
        texts.join("\n---\n")
    }
}

/// Most recent non-blank assistant text.
pub fn last_bot_reply(history: &[ProviderMessage]) -> Option<String> {
    history
        .iter()
        .rev()
        .filter(|msg| msg.role == MessageRole::Assistant)
        .filter_map(ProviderMessage::plain_text)
        .find(|text| !text.trim().is_empty())
}
