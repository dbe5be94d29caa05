use serde::{Deserialize, Serialize};

/// A group-chat message as delivered by the host platform.
///
/// `chat_id` identifies the group conversation, `sender_id` the user who
/// wrote the message and `self_id` the bot's own account on that platform.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct InboundMessage {
    pub id: String,
    pub chat_id: String,
    pub sender_id: String,
    pub sender_name: String,
    pub self_id: String,
    pub text: String,
    /// Epoch seconds.
    pub timestamp: u64,
    /// Already addressed to the bot (mention or wake word); proactive
    /// judgment is skipped for these.
    pub is_addressed: bool,
}

impl InboundMessage {
    pub fn is_from_self(&self) -> bool {
        self.sender_id == self.self_id
    }
}

/// The single unit of work handed to the reply pipeline once a sender's
/// quiet window closes.
///
/// Built fresh from the accumulated messages; the carrier is a copy of the
/// earliest message, never a mutated original.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CompositeUnit {
    pub chat_id: String,
    pub sender_id: String,
    pub sender_name: String,
    /// Accumulated texts in arrival order, newline separated.
    pub text: String,
    pub message_count: usize,
    pub carrier: InboundMessage,
    /// Always true: the pipeline treats the unit as a direct invocation.
    pub addressed: bool,
}

pub const MERGE_SEPARATOR: &str = "\n";

impl CompositeUnit {
    /// Merge `messages` (arrival order) into one unit. Returns `None` for an
    /// empty slice.
    pub fn merge(messages: &[InboundMessage]) -> Option<Self> {
        let first = messages.first()?;
        let text = messages
            .iter()
            .map(|m| m.text.as_str())
            .collect::<Vec<_>>()
            .join(MERGE_SEPARATOR);

        Some(Self {
            chat_id: first.chat_id.clone(),
            sender_id: first.sender_id.clone(),
            sender_name: first.sender_name.clone(),
            text,
            message_count: messages.len(),
            carrier: first.clone(),
            addressed: true,
        })
    }
}

#[cfg(test)]
pub(crate) fn test_message(chat: &str, sender: &str, text: &str) -> InboundMessage {
    InboundMessage {
        id: format!("{chat}-{sender}-{text}"),
        chat_id: chat.into(),
        sender_id: sender.into(),
        sender_name: format!("{sender}-name"),
        self_id: "bot".into(),
        text: text.into(),
        timestamp: 1_700_000_000,
        is_addressed: false,
    }
}
