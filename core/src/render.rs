//! Turn -> view-model transform.
//!
//! Nothing here touches the terminal; hosts print the `TurnView`s.

use std::sync::OnceLock;

use chrono::{DateTime, TimeZone};
use regex::Regex;

use crate::types::{Role, Turn};

/// Assistant content longer than this many characters is collapsed
pub const DISCLOSURE_THRESHOLD: usize = 300;

/// Best-effort `"Title" by Author` matcher, author ends at a comma or period
const BOOK_MENTION_PATTERN: &str = r#""([^"]+)" by ([^.,]+)"#;

fn book_mention_regex() -> Option<&'static Regex> {
    static RE: OnceLock<Option<Regex>> = OnceLock::new();
    RE.get_or_init(|| Regex::new(BOOK_MENTION_PATTERN).ok()).as_ref()
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Segment {
    Text(String),
    BookMention { title: String, author: String },
}

/// Collapsed tail of a long assistant message. `preview` and `remainder` hold
/// the raw content; escaping happens when they are shown.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Disclosure {
    pub preview: String,
    pub remainder: String,
    pub expanded: bool,
}

impl Disclosure {
    pub fn toggle(&mut self) {
        self.expanded = !self.expanded;
    }

    pub fn label(&self) -> &'static str {
        if self.expanded {
            "Show less"
        } else {
            "Show more"
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TurnView {
    pub role: Role,
    /// `None` for notices that are not stored turns
    pub ordinal: Option<u64>,
    pub in_reply_to: Option<u64>,
    /// Wall-clock time at render, `HH:MM`
    pub time: String,
    /// Escaped content
    pub content: String,
    pub segments: Vec<Segment>,
    pub disclosure: Option<Disclosure>,
}

impl TurnView {
    /// Text to show for the current disclosure state
    pub fn visible_segments(&self) -> Vec<Segment> {
        match &self.disclosure {
            Some(disclosure) if !disclosure.expanded => {
                vec![Segment::Text(format!("{}...", escape(&disclosure.preview)))]
            }
            _ => self.segments.clone(),
        }
    }
}

pub fn render_turn<Tz: TimeZone>(turn: &Turn, now: &DateTime<Tz>) -> TurnView
where
    Tz::Offset: std::fmt::Display,
{
    let mut view = build_view(turn.role, &turn.content, now);
    view.ordinal = Some(turn.ordinal);
    view.in_reply_to = turn.in_reply_to;
    view
}

/// Assistant-styled message with no backing turn (greeting, apology)
pub fn render_notice<Tz: TimeZone>(text: &str, now: &DateTime<Tz>) -> TurnView
where
    Tz::Offset: std::fmt::Display,
{
    build_view(Role::Assistant, text, now)
}

fn build_view<Tz: TimeZone>(role: Role, raw: &str, now: &DateTime<Tz>) -> TurnView
where
    Tz::Offset: std::fmt::Display,
{
    let content = escape(raw);
    let (segments, disclosure) = match role {
        Role::User => (vec![Segment::Text(content.clone())], None),
        Role::Assistant => (highlight_books(&content), disclose(raw)),
    };
    TurnView {
        role,
        ordinal: None,
        in_reply_to: None,
        time: now.format("%H:%M").to_string(),
        content,
        segments,
        disclosure,
    }
}

/// Replaces control characters that could drive the terminal (ESC, C1 and
/// the rest of C0); line breaks, carriage returns and tabs pass through
pub fn escape(raw: &str) -> String {
    raw.chars()
        .map(|c| {
            if c.is_control() && !matches!(c, '\n' | '\r' | '\t') {
                char::REPLACEMENT_CHARACTER
            } else {
                c
            }
        })
        .collect()
}

/// Splits text into plain runs and `"Title" by Author` mentions
pub fn highlight_books(text: &str) -> Vec<Segment> {
    let Some(re) = book_mention_regex() else {
        return vec![Segment::Text(text.to_string())];
    };

    let mut segments = Vec::new();
    let mut last = 0;
    for caps in re.captures_iter(text) {
        let (Some(whole), Some(title), Some(author)) = (caps.get(0), caps.get(1), caps.get(2))
        else {
            continue;
        };
        if whole.start() > last {
            segments.push(Segment::Text(text[last..whole.start()].to_string()));
        }
        segments.push(Segment::BookMention {
            title: title.as_str().to_string(),
            author: author.as_str().to_string(),
        });
        last = whole.end();
    }
    if last < text.len() || segments.is_empty() {
        segments.push(Segment::Text(text[last..].to_string()));
    }
    segments
}

/// Splits content past the threshold, counting characters rather than bytes
pub fn disclose(content: &str) -> Option<Disclosure> {
    let (split, _) = content.char_indices().nth(DISCLOSURE_THRESHOLD)?;
    Some(Disclosure {
        preview: content[..split].to_string(),
        remainder: content[split..].to_string(),
        expanded: false,
    })
}
