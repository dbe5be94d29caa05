use super::message::InboundMessage;
use crate::error::TransportError;
use crate::heartflow::AdminCommand;
use tokio::io::{self, AsyncBufReadExt, BufReader};
use tokio::sync::mpsc;
use uuid::Uuid;

/// Parse one `chat|sender|text` line. A text mentioning `@<self_id>` is
/// marked as already addressed to the bot.
pub fn parse_line(line: &str, self_id: &str) -> Result<InboundMessage, TransportError> {
    let mut parts = line.splitn(3, '|');
    let (Some(chat), Some(sender), Some(text)) = (parts.next(), parts.next(), parts.next()) else {
        return Err(TransportError::MalformedInbound(line.to_string()));
    };
    let chat = chat.trim();
    let sender = sender.trim();
    if chat.is_empty() || sender.is_empty() {
        return Err(TransportError::MalformedInbound(line.to_string()));
    }

    let text = text.trim().to_string();
    let is_addressed = text.contains(&format!("@{self_id}"));

    Ok(InboundMessage {
        id: Uuid::new_v4().to_string(),
        chat_id: chat.to_string(),
        sender_id: sender.to_string(),
        sender_name: sender.to_string(),
        self_id: self_id.to_string(),
        text,
        timestamp: chrono::Utc::now().timestamp().try_into().unwrap_or_default(),
        is_addressed,
    })
}

/// One stdin line: a chat message or an operator command.
#[derive(Debug, Clone, PartialEq)]
pub enum CliInput {
    Message(InboundMessage),
    Admin(AdminCommand),
}

/// Lines starting with `/` are operator commands; everything else is a
/// `chat|sender|text` message.
pub fn parse_input(line: &str, self_id: &str) -> Result<CliInput, TransportError> {
    if line.trim_start().starts_with('/') {
        return AdminCommand::parse(line)
            .map(CliInput::Admin)
            .ok_or_else(|| TransportError::MalformedInbound(line.to_string()));
    }
    parse_line(line, self_id).map(CliInput::Message)
}

/// Stdin ingress for local experiments: one message per line until EOF or
/// `/quit`.
pub struct CliIngress {
    self_id: String,
}

impl CliIngress {
    pub fn new(self_id: impl Into<String>) -> Self {
        Self {
            self_id: self_id.into(),
        }
    }

    pub async fn listen(&self, tx: mpsc::Sender<CliInput>) -> anyhow::Result<()> {
        let reader = BufReader::new(io::stdin());
        let mut lines = reader.lines();

        while let Some(line) = lines.next_line().await? {
            let line = line.trim();
            if line.is_empty() {
                continue;
            }
            if line == "/quit" || line == "/exit" {
                break;
            }

            match parse_input(line, &self.self_id) {
                Ok(input) => {
                    if tx.send(input).await.is_err() {
                        break;
                    }
                }
                Err(error) => tracing::warn!(%error, "skipping stdin line"),
            }
        }
        Ok(())
    }
}
