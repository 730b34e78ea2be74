use chrono::{Local, SecondsFormat, Utc};
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Sender {
    User,
    Bot,
}

impl Sender {
    pub fn class_name(self) -> &'static str {
        match self {
            Sender::User => "user-message",
            Sender::Bot => "bot-message",
        }
    }

    pub fn label(self) -> &'static str {
        match self {
            Sender::User => "You",
            Sender::Bot => "Bot",
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Message {
    pub text: String,
    pub sender: Sender,
    pub timestamp: String,
}

impl Message {
    pub fn new(text: impl Into<String>, sender: Sender) -> Self {
        Self {
            text: text.into(),
            sender,
            timestamp: display_timestamp(),
        }
    }

    pub fn user(text: impl Into<String>) -> Self {
        Self::new(text, Sender::User)
    }

    pub fn bot(text: impl Into<String>) -> Self {
        Self::new(text, Sender::Bot)
    }
}

/// Body of a single chat turn. The two shapes never mix: the direct backend
/// only ever sees `{ message }`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(untagged)]
pub enum ChatRequest {
    Direct {
        message: String,
    },
    Relay {
        conversation_hash: String,
        message: String,
        request_timestamp: String,
    },
}

impl ChatRequest {
    pub fn direct(message: impl Into<String>) -> Self {
        ChatRequest::Direct {
            message: message.into(),
        }
    }

    pub fn relay(conversation_hash: impl Into<String>, message: impl Into<String>) -> Self {
        ChatRequest::Relay {
            conversation_hash: conversation_hash.into(),
            message: message.into(),
            request_timestamp: request_timestamp(),
        }
    }

    pub fn message(&self) -> &str {
        match self {
            ChatRequest::Direct { message } | ChatRequest::Relay { message, .. } => message,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct ChatReply {
    pub response: String,
}

/// Wall-clock `HH:MM` in local time.
pub fn display_timestamp() -> String {
    Local::now().format("%H:%M").to_string()
}

/// UTC timestamp with millisecond precision and a `Z` suffix.
pub fn request_timestamp() -> String {
    Utc::now().to_rfc3339_opts(SecondsFormat::Millis, true)
}
