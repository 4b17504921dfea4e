use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

use crate::errors::BookbotError;

/// Who authored a turn
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    User,
    Assistant,
}

impl Role {
    pub fn as_str(&self) -> &'static str {
        match self {
            Role::User => "user",
            Role::Assistant => "assistant",
        }
    }
}

impl fmt::Display for Role {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// One message in a conversation
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Turn {
    pub role: Role,
    pub content: String,
    /// Assigned by the conversation store; unique and strictly increasing
    #[serde(default)]
    pub ordinal: u64,
    /// For assistant replies, the ordinal of the user turn being answered
    #[serde(default, rename = "inReplyTo", skip_serializing_if = "Option::is_none")]
    pub in_reply_to: Option<u64>,
}

/// Snapshot of a conversation taken when the user starts a new chat
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ArchiveEntry {
    /// RFC 3339 timestamp of the moment the conversation was archived
    pub date: String,
    pub messages: Vec<Turn>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Theme {
    #[default]
    Dark,
    Light,
}

impl Theme {
    pub fn toggled(self) -> Self {
        match self {
            Theme::Dark => Theme::Light,
            Theme::Light => Theme::Dark,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Theme::Dark => "dark",
            Theme::Light => "light",
        }
    }

    /// Anything other than `"light"` is treated as the dark default
    pub fn from_stored(value: &str) -> Self {
        if value == "light" {
            Theme::Light
        } else {
            Theme::Dark
        }
    }
}

/// Reading mood; only affects styling and the context forwarded to the backend
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Mood {
    #[default]
    Default,
    Adventurous,
    Romantic,
    Mysterious,
    Thoughtful,
    Technical,
}

impl Mood {
    pub const ALL: [Mood; 6] = [
        Mood::Default,
        Mood::Adventurous,
        Mood::Romantic,
        Mood::Mysterious,
        Mood::Thoughtful,
        Mood::Technical,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            Mood::Default => "default",
            Mood::Adventurous => "adventurous",
            Mood::Romantic => "romantic",
            Mood::Mysterious => "mysterious",
            Mood::Thoughtful => "thoughtful",
            Mood::Technical => "technical",
        }
    }
}

impl fmt::Display for Mood {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Mood {
    type Err = BookbotError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let wanted = s.trim().to_lowercase();
        Mood::ALL
            .into_iter()
            .find(|mood| mood.as_str() == wanted)
            .ok_or_else(|| BookbotError::ConfigError(format!("Unknown mood: {}", s)))
    }
}

/// Display preferences, independent of the conversation
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UiPreferences {
    pub theme: Theme,
    pub mood: Mood,
    pub language: String,
}

impl Default for UiPreferences {
    fn default() -> Self {
        Self {
            theme: Theme::Dark,
            mood: Mood::Default,
            language: "en".to_string(),
        }
    }
}

/// The book of the day, split into display fields
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DailyBook {
    pub title: String,
    pub author: String,
    pub genre: String,
    pub description: String,
}

/// `{role, content}` pair as sent to the chat endpoint
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct HistoryMessage {
    pub role: Role,
    pub content: String,
}

impl From<&Turn> for HistoryMessage {
    fn from(turn: &Turn) -> Self {
        Self {
            role: turn.role,
            content: turn.content.clone(),
        }
    }
}

/// Body of `POST /api/chat`
#[derive(Debug, Clone, Serialize)]
pub struct ChatRequest {
    pub message: String,
    pub history: Vec<HistoryMessage>,
    pub mood: Mood,
    pub language: String,
}

/// Body returned by `POST /api/chat`
#[derive(Debug, Clone, Deserialize)]
pub struct ChatResponse {
    pub response: Option<String>,
    pub error: Option<String>,
    pub details: Option<String>,
}

/// Body returned by `GET /api/daily_book`
#[derive(Debug, Clone, Deserialize)]
pub struct DailyBookResponse {
    pub book: Option<String>,
    pub error: Option<String>,
}

/// Body of `POST /api/feedback`
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct FeedbackRequest {
    pub message_id: u64,
    pub is_positive: bool,
}
