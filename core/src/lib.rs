// Core of the BookBot chat client:
// - Conversation store and its persistence
// - Turn rendering into view models
// - HTTP transport for the book-chat backend
// - Voice input session
// - Session controller driving a host UI

pub mod client;
pub use client::*;

pub mod config;
pub use config::*;

pub mod conversation;
pub use conversation::ConversationStore;

pub mod errors;
pub use errors::*;

pub mod render;

pub mod session;
pub use session::{SessionController, SessionHost, SubmitOutcome};

pub mod storage;
pub use storage::{ChatStorage, FileStore, KeyValueStore, MemoryStore};

pub mod types;
pub use types::*;

pub mod voice;
