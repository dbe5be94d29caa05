use crate::config::Config;
use crate::transport::InboundMessage;
use std::fmt;

/// Outcome of the cheap checks run before any judge call.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum GateDecision {
    Admit,
    Disabled,
    /// The host already routes this message to the bot.
    AlreadyAddressed,
    NotWhitelisted,
    FromSelf,
    EmptyText,
}

impl GateDecision {
    pub fn is_admit(self) -> bool {
        self == Self::Admit
    }

    pub fn as_str(self) -> &'static str {
        match self {
            Self::Admit => "admit",
            Self::Disabled => "disabled",
            Self::AlreadyAddressed => "already_addressed",
            Self::NotWhitelisted => "not_whitelisted",
            Self::FromSelf => "from_self",
            Self::EmptyText => "empty_text",
        }
    }
}

impl fmt::Display for GateDecision {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// First failing check, in order: enabled, addressed, whitelist, self, blank.
pub fn check(config: &Config, message: &InboundMessage) -> GateDecision {
    if !config.enabled {
        return GateDecision::Disabled;
    }
    if message.is_addressed {
        return GateDecision::AlreadyAddressed;
    }
    if !config.chat_allowed(&message.chat_id) {
        return GateDecision::NotWhitelisted;
    }
    if message.is_from_self() {
        return GateDecision::FromSelf;
    }
    if message.text.trim().is_empty() {
        return GateDecision::EmptyText;
    }
    GateDecision::Admit
}
