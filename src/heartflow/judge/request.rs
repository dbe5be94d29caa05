use crate::heartflow::energy::ChatState;
use chrono::{DateTime, Local, Utc};
use std::fmt::Write as _;

const NONE_MARKER: &str = "(none)";

/// Everything the judge is told about one candidate message. Built per
/// evaluation and discarded afterwards.
#[derive(Debug, Clone, PartialEq)]
pub struct JudgmentRequest {
    pub sender_id: String,
    pub sender_name: String,
    pub chat_id: String,
    pub text: String,
    /// Epoch seconds.
    pub timestamp: u64,
    /// Recent context, oldest first, already joined.
    pub recent_messages: String,
    pub last_bot_reply: Option<String>,
    pub energy: f64,
    pub minutes_since_last_reply: u64,
    pub activity_summary: String,
    pub persona_summary: Option<String>,
    pub threshold: f64,
}

/// One-line description of how busy the chat is and how often the bot
/// already replies there.
pub fn activity_summary(state: &ChatState, now: DateTime<Local>) -> String {
    let level = match state.total_messages {
        n if n > 100 => "high",
        n if n > 20 => "medium",
        _ => "low",
    };
    format!(
        "activity {level}, {} messages seen, reply rate {:.1}%, local time {}",
        state.total_messages,
        state.reply_rate_percent(),
        now.format("%H:%M")
    )
}

fn format_timestamp(secs: u64) -> String {
    i64::try_from(secs)
        .ok()
        .and_then(|secs| DateTime::<Utc>::from_timestamp(secs, 0))
        .map_or_else(|| secs.to_string(), |dt| dt.format("%Y-%m-%d %H:%M:%S UTC").to_string())
}

impl JudgmentRequest {
    /// Render the scoring instruction. `attempt` is 1-based; later attempts
    /// carry a reminder about the output format.
    pub fn render(&self, include_reasoning: bool, attempt: u32) -> String {
        let mut out = String::with_capacity(2048);

        out.push_str(
            "You are the reply-decision module of a group chat assistant. \
             Decide whether the assistant should proactively join the conversation \
             in response to the incoming message.\n\n",
        );

        out.push_str("## Persona\n");
        out.push_str(
            self.persona_summary
                .as_deref()
                .filter(|p| !p.trim().is_empty())
                .unwrap_or(NONE_MARKER),
        );
        out.push_str("\n\n");

        let _ = writeln!(out, "## Current state");
        let _ = writeln!(
            out,
            "- Energy: {:.2} (0.1 means exhausted, 1.0 means fully rested)",
            self.energy
        );
        let _ = writeln!(
            out,
            "- Minutes since the assistant last replied: {}",
            self.minutes_since_last_reply
        );
        let _ = writeln!(out, "- Chat: {}", self.activity_summary);
        out.push('\n');

        out.push_str("## Recent messages (oldest first)\n");
        out.push_str(&self.recent_messages);
        out.push_str("\n\n");

        out.push_str("## Assistant's last reply\n");
        out.push_str(self.last_bot_reply.as_deref().unwrap_or(NONE_MARKER));
        out.push_str("\n\n");

        let _ = writeln!(out, "## Incoming message");
        let _ = writeln!(out, "Chat: {}", self.chat_id);
        let _ = writeln!(out, "From: {} ({})", self.sender_name, self.sender_id);
        let _ = writeln!(out, "Sent: {}", format_timestamp(self.timestamp));
        let _ = writeln!(out, "Text: {}", self.text);
        out.push('\n');

        out.push_str(
            "## Task\n\
             Score each dimension from 0 to 10:\n\
             - relevance: how much the message relates to the assistant's interests or the ongoing topic\n\
             - willingness: how much the assistant would want to speak, given its energy\n\
             - social: whether joining in fits the group's mood and etiquette\n\
             - timing: whether now is a good moment, given the time since the last reply\n\
             - continuity: how well a reply would continue the assistant's previous turn\n",
        );
        let _ = writeln!(
            out,
            "The assistant replies when the weighted score reaches {:.2} of the maximum.\n",
            self.threshold
        );

        out.push_str(
            "Respond with a single JSON object and nothing else. \
             Do not greet, apologise or explain outside the JSON.\n",
        );
        if include_reasoning {
            out.push_str(
                "{\"relevance\": 0, \"willingness\": 0, \"social\": 0, \"timing\": 0, \
                 \"continuity\": 0, \"reasoning\": \"one short sentence\"}\n",
            );
        } else {
            out.push_str(
                "{\"relevance\": 0, \"willingness\": 0, \"social\": 0, \"timing\": 0, \
                 \"continuity\": 0}\n",
            );
        }

        if attempt > 1 {
            let _ = write!(
                out,
                "\nReminder (attempt {attempt}): the previous answer could not be parsed. \
                 Output only the raw JSON object, with numeric values and no extra text."
            );
        }

        out
    }
}
