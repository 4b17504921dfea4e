use chrono::Utc;
use tracing::{debug, warn};

use crate::storage::ChatStorage;
use crate::types::{ArchiveEntry, HistoryMessage, Role, Turn};

/// Ordered log of turns; the in-memory source of truth for rendering and persistence
#[derive(Debug)]
pub struct ConversationStore {
    turns: Vec<Turn>,
    next_ordinal: u64,
    storage: ChatStorage,
}

impl ConversationStore {
    pub fn new(storage: ChatStorage) -> Self {
        Self {
            turns: Vec::new(),
            next_ordinal: 0,
            storage,
        }
    }

    /// Appends a turn with the next ordinal.
    ///
    /// Role alternation is not checked. Appending an assistant turn writes the
    /// whole sequence to storage; a failed write is only logged.
    pub fn append(&mut self, role: Role, content: impl Into<String>, in_reply_to: Option<u64>) -> &Turn {
        let turn = Turn {
            role,
            content: content.into(),
            ordinal: self.next_ordinal,
            in_reply_to,
        };
        self.next_ordinal += 1;
        debug!("Appended {} turn #{}", turn.role, turn.ordinal);
        self.turns.push(turn);

        if role == Role::Assistant {
            if let Err(e) = self.storage.save_conversation(&self.turns) {
                warn!("Failed to persist conversation: {}", e);
            }
        }

        &self.turns[self.turns.len() - 1]
    }

    /// Archives a non-empty conversation, then clears it. Returns the archive entry, if any.
    pub fn reset(&mut self) -> Option<ArchiveEntry> {
        let entry = if self.turns.is_empty() {
            None
        } else {
            let entry = ArchiveEntry {
                date: Utc::now().to_rfc3339(),
                messages: self.turns.clone(),
            };
            if let Err(e) = self.storage.append_archive(entry.clone()) {
                warn!("Failed to archive conversation: {}", e);
            }
            Some(entry)
        };

        if let Err(e) = self.storage.clear_conversation() {
            warn!("Failed to clear saved conversation: {}", e);
        }
        self.turns.clear();
        self.next_ordinal = 0;
        entry
    }

    /// Replaces the in-memory log with the persisted one. Returns the number of turns restored.
    pub fn restore(&mut self) -> usize {
        let turns = match self.storage.load_conversation() {
            Ok(Some(turns)) => turns,
            Ok(None) => return 0,
            Err(e) => {
                warn!("Failed to load saved conversation: {}", e);
                return 0;
            }
        };

        self.turns = turns;
        let increasing = self
            .turns
            .windows(2)
            .all(|pair| pair[0].ordinal < pair[1].ordinal);
        if !increasing {
            debug!("Saved ordinals are not increasing, renumbering");
            for (i, turn) in self.turns.iter_mut().enumerate() {
                turn.ordinal = i as u64;
            }
        }
        self.next_ordinal = self.turns.last().map_or(0, |turn| turn.ordinal + 1);
        self.turns.len()
    }

    pub fn all(&self) -> &[Turn] {
        &self.turns
    }

    pub fn len(&self) -> usize {
        self.turns.len()
    }

    pub fn is_empty(&self) -> bool {
        self.turns.is_empty()
    }

    pub fn last_assistant(&self) -> Option<&Turn> {
        self.turns.iter().rev().find(|turn| turn.role == Role::Assistant)
    }

    /// `{role, content}` pairs in order, as sent to the chat endpoint
    pub fn history(&self) -> Vec<HistoryMessage> {
        self.turns.iter().map(HistoryMessage::from).collect()
    }

    pub fn storage(&self) -> &ChatStorage {
        &self.storage
    }
}
