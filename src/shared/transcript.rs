use super::models::{ChatMessage, Sender};
use serde::Serialize;

/// Text of the placeholder message returned for a blank transcript
pub const NO_MESSAGES_TEXT: &str = "No messages found in this conversation.";

/// Body used when a line carries only a prefix or timestamp
pub const EMPTY_BODY_TEXT: &str = "(empty)";

const TIMESTAMP_MARKER: &str = ", timestamp:";
const BOT_PREFIX: &str = "bot:";
const USER_PREFIX: &str = "user:";

/// Parse a stored WhatsApp transcript into chat messages.
///
/// Transcripts are newline separated lines such as
/// `bot: Hi there, timestamp: 2026-01-26 09:23:03+00`. Lines without a known
/// prefix become system messages. Never returns an empty vector.
pub fn parse_transcript(content: Option<&str>) -> Vec<ChatMessage> {
    let content = match content {
        Some(c) if !c.trim().is_empty() => c,
        _ => return vec![empty_conversation()],
    };

    content
        .split('\n')
        .map(str::trim)
        .filter(|line| !line.is_empty())
        .enumerate()
        .map(|(index, line)| parse_line(index, line))
        .collect()
}

fn empty_conversation() -> ChatMessage {
    ChatMessage {
        id: "empty".to_string(),
        sender: Sender::System,
        text: NO_MESSAGES_TEXT.to_string(),
        timestamp: None,
    }
}

fn parse_line(index: usize, line: &str) -> ChatMessage {
    let (sender, body) = if let Some(rest) = strip_prefix_ignore_case(line, BOT_PREFIX) {
        (Sender::Bot, rest.trim())
    } else if let Some(rest) = strip_prefix_ignore_case(line, USER_PREFIX) {
        (Sender::User, rest.trim())
    } else {
        (Sender::System, line)
    };

    let (text, timestamp) = split_timestamp(body);
    let text = if text.is_empty() { EMPTY_BODY_TEXT } else { text };

    ChatMessage {
        id: index.to_string(),
        sender,
        text: text.to_string(),
        timestamp: timestamp.map(str::to_string),
    }
}

fn strip_prefix_ignore_case<'a>(line: &'a str, prefix: &str) -> Option<&'a str> {
    let head = line.get(..prefix.len())?;
    if head.eq_ignore_ascii_case(prefix) {
        Some(&line[prefix.len()..])
    } else {
        None
    }
}

/// Split `body` at the last timestamp marker. Bodies may contain commas or the
/// word "timestamp" themselves, only the final marker counts.
fn split_timestamp(body: &str) -> (&str, Option<&str>) {
    // ASCII lowering keeps byte offsets aligned with `body`
    let lowered = body.to_ascii_lowercase();
    match lowered.rfind(TIMESTAMP_MARKER) {
        Some(idx) => {
            let text = body[..idx].trim();
            let stamp = body[idx + TIMESTAMP_MARKER.len()..].trim();
            (text, (!stamp.is_empty()).then_some(stamp))
        }
        None => (body, None),
    }
}

/// Per-conversation counts shown alongside a transcript
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct TranscriptSummary {
    pub bot_messages: usize,
    pub user_messages: usize,
    pub system_messages: usize,
    pub first_timestamp: Option<String>,
    pub last_timestamp: Option<String>,
}

impl TranscriptSummary {
    pub fn from_messages(messages: &[ChatMessage]) -> Self {
        let mut summary = Self::default();

        for message in messages {
            match message.sender {
                Sender::Bot => summary.bot_messages += 1,
                Sender::User => summary.user_messages += 1,
                Sender::System => summary.system_messages += 1,
            }

            if let Some(ts) = &message.timestamp {
                if summary.first_timestamp.is_none() {
                    summary.first_timestamp = Some(ts.clone());
                }
                summary.last_timestamp = Some(ts.clone());
            }
        }

        summary
    }

    pub fn total(&self) -> usize {
        self.bot_messages + self.user_messages + self.system_messages
    }
}
