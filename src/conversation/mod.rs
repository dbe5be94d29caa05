pub mod context;
pub mod memory;
pub mod traits;

pub use context::{
    ConversationContext, DEFAULT_PERSONA_KEY, NO_HISTORY_MARKER, NO_PERSONA_SENTINEL,
    PersonaSelection, last_bot_reply, load_context, recent_messages_text,
};
pub use memory::InMemoryConversations;
pub use traits::{ConversationSnapshot, ConversationSource};
