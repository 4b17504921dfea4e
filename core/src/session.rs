//! Session orchestration: startup, message submission, feedback and new-chat reset.

use chrono::{Local, Timelike};
use tracing::{debug, error, info, warn};

use crate::client::{ChatTransport, OUT_OF_SCOPE_APOLOGY};
use crate::conversation::ConversationStore;
use crate::render::{render_notice, render_turn, TurnView};
use crate::storage::ChatStorage;
use crate::types::{ArchiveEntry, ChatRequest, DailyBook, Mood, Role, Theme, UiPreferences};
use crate::voice::{VoiceOutcome, VoiceSession};

pub const NEW_CHAT_PROMPT: &str =
    "Are you sure you want to start a new chat? Your current conversation will be saved.";

/// The UI surface a session draws on
pub trait SessionHost {
    fn show_turn(&mut self, view: &TurnView);

    fn show_daily_book(&mut self, book: &DailyBook);

    /// Typing indicator
    fn set_busy(&mut self, busy: bool);

    /// Blocking yes/no question
    fn confirm(&mut self, prompt: &str) -> bool;

    /// Blocking notification
    fn alert(&mut self, message: &str);

    fn set_feedback_enabled(&mut self, enabled: bool);

    fn apply_theme(&mut self, theme: Theme);
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SubmitOutcome {
    /// Blank input, nothing sent
    Ignored,
    /// Reply stored under this ordinal
    Replied(u64),
    /// Apology shown, nothing stored for the reply
    Failed,
}

pub fn greeting_for_hour(hour: u32) -> String {
    let greeting = if hour < 12 {
        "Good morning"
    } else if hour < 18 {
        "Good afternoon"
    } else {
        "Good evening"
    };
    format!(
        "{}! I'm your Book Recommender chatbot. How can I assist you with your reading needs today?",
        greeting
    )
}

pub struct SessionController<T: ChatTransport, H: SessionHost> {
    transport: T,
    host: H,
    store: ConversationStore,
    preferences: UiPreferences,
    voice: VoiceSession,
    feedback_target: Option<u64>,
    last_collapsible: Option<TurnView>,
}

impl<T: ChatTransport, H: SessionHost> SessionController<T, H> {
    pub fn new(transport: T, host: H, storage: ChatStorage, preferences: UiPreferences) -> Self {
        Self {
            transport,
            host,
            store: ConversationStore::new(storage),
            preferences,
            voice: VoiceSession::unavailable(),
            feedback_target: None,
            last_collapsible: None,
        }
    }

    pub fn with_voice(mut self, voice: VoiceSession) -> Self {
        self.voice = voice;
        self
    }

    /// Restore, theme, daily book, then a greeting when nothing was restored
    pub async fn startup(&mut self) {
        self.start(false).await;
    }

    /// Startup that archives a restored conversation instead of showing it
    pub async fn startup_new_chat(&mut self) {
        self.start(true).await;
    }

    async fn start(&mut self, fresh: bool) {
        let restored = self.store.restore();
        info!("Restored {} turns", restored);
        if fresh {
            if let Some(entry) = self.store.reset() {
                info!("Archived conversation of {} turns", entry.messages.len());
            }
        } else {
            let views: Vec<TurnView> = self
                .store
                .all()
                .iter()
                .map(|turn| render_turn(turn, &Local::now()))
                .collect();
            for view in views {
                self.show(view);
            }
        }

        self.preferences.theme = self.store.storage().load_theme();
        self.host.apply_theme(self.preferences.theme);

        let book = self.transport.fetch_daily_book().await;
        self.host.show_daily_book(&book);

        if self.store.is_empty() {
            self.greet();
        }
    }

    pub fn greet(&mut self) {
        let now = Local::now();
        let view = render_notice(&greeting_for_hour(now.hour()), &now);
        self.show(view);
    }

    pub async fn submit(&mut self, text: &str) -> SubmitOutcome {
        let message = text.trim();
        if message.is_empty() {
            return SubmitOutcome::Ignored;
        }

        let user_ordinal = {
            let turn = self.store.append(Role::User, message, None);
            let view = render_turn(turn, &Local::now());
            let ordinal = turn.ordinal;
            self.show(view);
            ordinal
        };

        self.host.set_busy(true);
        let request = ChatRequest {
            message: message.to_string(),
            history: self.store.history(),
            mood: self.preferences.mood,
            language: self.preferences.language.clone(),
        };
        let result = self.transport.send_message(request).await;
        self.host.set_busy(false);

        match result {
            Ok(reply) => {
                let turn = self.store.append(Role::Assistant, reply, Some(user_ordinal));
                let ordinal = turn.ordinal;
                let view = render_turn(turn, &Local::now());
                self.show(view);
                // Last reply to arrive owns the feedback slot
                self.feedback_target = Some(ordinal);
                self.host.set_feedback_enabled(true);
                SubmitOutcome::Replied(ordinal)
            }
            Err(e) => {
                error!("Chat request failed: {}", e);
                let mut view = render_notice(OUT_OF_SCOPE_APOLOGY, &Local::now());
                view.in_reply_to = Some(user_ordinal);
                self.show(view);
                SubmitOutcome::Failed
            }
        }
    }

    /// Sends feedback for the most recent reply; failures are only logged
    pub async fn feedback(&mut self, is_positive: bool) -> bool {
        let Some(target) = self.feedback_target else {
            debug!("No reply to give feedback on");
            return false;
        };
        if let Err(e) = self.transport.send_feedback(target, is_positive).await {
            warn!("Error sending feedback: {}", e);
        }
        true
    }

    /// Archives and clears the conversation after confirmation
    pub fn new_chat(&mut self) -> bool {
        if !self.host.confirm(NEW_CHAT_PROMPT) {
            return false;
        }
        if let Some(entry) = self.store.reset() {
            info!("Archived conversation of {} turns", entry.messages.len());
        }
        self.feedback_target = None;
        self.last_collapsible = None;
        self.host.set_feedback_enabled(false);
        self.greet();
        true
    }

    pub fn toggle_theme(&mut self) -> Theme {
        let theme = self.preferences.theme.toggled();
        self.preferences.theme = theme;
        if let Err(e) = self.store.storage().save_theme(theme) {
            warn!("Failed to save theme preference: {}", e);
        }
        self.host.apply_theme(theme);
        theme
    }

    pub fn set_mood(&mut self, mood: Mood) {
        self.preferences.mood = mood;
    }

    pub fn set_language(&mut self, language: impl Into<String>) {
        self.preferences.language = language.into();
        info!("Language changed to: {}", self.preferences.language);
    }

    /// Flips the most recent collapsed reply and redraws it
    pub fn expand_last(&mut self) -> bool {
        let Some(view) = self.last_collapsible.as_mut() else {
            return false;
        };
        if let Some(disclosure) = view.disclosure.as_mut() {
            disclosure.toggle();
        }
        self.host.show_turn(view);
        true
    }

    pub fn voice_available(&self) -> bool {
        self.voice.is_available()
    }

    pub fn voice_active(&self) -> bool {
        self.voice.is_active()
    }

    /// Returns whether the session is listening afterwards
    pub fn toggle_voice(&mut self) -> bool {
        if let Err(e) = self.voice.toggle() {
            self.host.alert(&format!("Voice recognition error: {}", e));
        }
        self.voice.is_active()
    }

    /// Next recognized text, if any. Errors end the session and are alerted.
    pub fn poll_voice(&mut self) -> Option<VoiceOutcome> {
        let outcome = self.voice.poll()?;
        if let VoiceOutcome::Failed(e) = &outcome {
            self.host.alert(&format!("Voice recognition error: {}", e));
        }
        Some(outcome)
    }

    pub fn stop_voice(&mut self) {
        self.voice.stop();
    }

    pub fn archive(&self) -> Vec<ArchiveEntry> {
        match self.store.storage().load_archive() {
            Ok(entries) => entries,
            Err(e) => {
                warn!("Failed to load conversation archive: {}", e);
                Vec::new()
            }
        }
    }

    pub fn conversation(&self) -> &ConversationStore {
        &self.store
    }

    pub fn preferences(&self) -> &UiPreferences {
        &self.preferences
    }

    pub fn feedback_target(&self) -> Option<u64> {
        self.feedback_target
    }

    pub fn host(&self) -> &H {
        &self.host
    }

    pub fn host_mut(&mut self) -> &mut H {
        &mut self.host
    }

    fn show(&mut self, view: TurnView) {
        self.host.show_turn(&view);
        if view.disclosure.is_some() {
            self.last_collapsible = Some(view);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::client::fallback_daily_book;
    use crate::errors::{BookbotError, BookbotResult};
    use crate::render::Segment;
    use crate::voice::{RecognitionEvent, Recognizer};
    use async_trait::async_trait;
    use std::collections::VecDeque;
    use std::sync::{Arc, Mutex};

    #[derive(Default)]
    struct FakeTransport {
        replies: Mutex<VecDeque<BookbotResult<String>>>,
        requests: Mutex<Vec<ChatRequest>>,
        feedback: Mutex<Vec<(u64, bool)>>,
        feedback_fails: bool,
    }

    impl FakeTransport {
        fn replying(replies: Vec<BookbotResult<String>>) -> Self {
            Self {
                replies: Mutex::new(replies.into()),
                ..Self::default()
            }
        }
    }

    #[async_trait]
    impl ChatTransport for FakeTransport {
        async fn fetch_daily_book(&self) -> DailyBook {
            fallback_daily_book()
        }

        async fn send_message(&self, request: ChatRequest) -> BookbotResult<String> {
            self.requests.lock().unwrap().push(request);
            self.replies
                .lock()
                .unwrap()
                .pop_front()
                .unwrap_or_else(|| Err(BookbotError::RequestError("no reply".to_string())))
        }

        async fn send_feedback(&self, message_id: u64, is_positive: bool) -> BookbotResult<()> {
            self.feedback.lock().unwrap().push((message_id, is_positive));
            if self.feedback_fails {
                return Err(BookbotError::RequestError("offline".to_string()));
            }
            Ok(())
        }

        async fn health(&self) -> BookbotResult<bool> {
            Ok(true)
        }
    }

    #[derive(Default)]
    struct RecordingHost {
        views: Vec<TurnView>,
        books: Vec<DailyBook>,
        busy: Vec<bool>,
        alerts: Vec<String>,
        feedback_enabled: bool,
        themes: Vec<Theme>,
        confirm_answer: bool,
    }

    impl SessionHost for RecordingHost {
        fn show_turn(&mut self, view: &TurnView) {
            self.views.push(view.clone());
        }

        fn show_daily_book(&mut self, book: &DailyBook) {
            self.books.push(book.clone());
        }

        fn set_busy(&mut self, busy: bool) {
            self.busy.push(busy);
        }

        fn confirm(&mut self, _prompt: &str) -> bool {
            self.confirm_answer
        }

        fn alert(&mut self, message: &str) {
            self.alerts.push(message.to_string());
        }

        fn set_feedback_enabled(&mut self, enabled: bool) {
            self.feedback_enabled = enabled;
        }

        fn apply_theme(&mut self, theme: Theme) {
            self.themes.push(theme);
        }
    }

    fn controller(
        replies: Vec<BookbotResult<String>>,
        storage: ChatStorage,
    ) -> SessionController<FakeTransport, RecordingHost> {
        SessionController::new(
            FakeTransport::replying(replies),
            RecordingHost {
                confirm_answer: true,
                ..RecordingHost::default()
            },
            storage,
            UiPreferences::default(),
        )
    }

    #[test]
    fn test_greeting_by_hour() {
        assert!(greeting_for_hour(0).starts_with("Good morning!"));
        assert!(greeting_for_hour(11).starts_with("Good morning!"));
        assert!(greeting_for_hour(12).starts_with("Good afternoon!"));
        assert!(greeting_for_hour(17).starts_with("Good afternoon!"));
        assert!(greeting_for_hour(18).starts_with("Good evening!"));
    }

    #[tokio::test]
    async fn test_startup_greets_empty_session() {
        let mut session = controller(vec![], ChatStorage::in_memory());
        session.startup().await;

        let host = session.host();
        assert_eq!(host.books, vec![fallback_daily_book()]);
        assert_eq!(host.themes, vec![Theme::Dark]);
        assert_eq!(host.views.len(), 1);
        assert!(host.views[0].content.contains("Book Recommender"));
        assert!(session.conversation().is_empty());
    }

    #[tokio::test]
    async fn test_startup_restores_without_greeting() {
        let storage = ChatStorage::in_memory();
        storage.save_theme(Theme::Light).unwrap();
        {
            let mut first = controller(vec![Ok("Read \"Emma\" by Jane Austen.".to_string())], storage.clone());
            first.submit("a classic please").await;
        }

        let mut second = controller(vec![], storage);
        second.startup().await;
        let host = second.host();
        assert_eq!(host.views.len(), 2);
        assert_eq!(host.views[0].role, Role::User);
        assert_eq!(host.views[1].role, Role::Assistant);
        assert_eq!(host.themes, vec![Theme::Light]);
        assert_eq!(second.preferences().theme, Theme::Light);
    }

    #[tokio::test]
    async fn test_startup_new_chat_archives_restored_conversation() {
        let storage = ChatStorage::in_memory();
        {
            let mut first = controller(vec![Ok("Try \"Emma\".".to_string())], storage.clone());
            first.submit("a classic please").await;
        }

        let mut second = controller(vec![], storage.clone());
        second.startup_new_chat().await;
        let host = second.host();
        assert_eq!(host.views.len(), 1);
        assert!(host.views[0].content.contains("Book Recommender"));
        assert!(second.conversation().is_empty());
        assert_eq!(second.archive().len(), 1);
        assert_eq!(storage.load_conversation().unwrap(), None);
    }

    #[tokio::test]
    async fn test_startup_new_chat_on_empty_storage_greets_once() {
        let mut session = controller(vec![], ChatStorage::in_memory());
        session.startup_new_chat().await;
        assert_eq!(session.host().views.len(), 1);
        assert!(session.archive().is_empty());
    }

    #[tokio::test]
    async fn test_submit_success_stores_reply_and_targets_feedback() {
        let mut session = controller(
            vec![Ok("Try \"Dune\" by Frank Herbert.".to_string())],
            ChatStorage::in_memory(),
        );
        session.set_mood(Mood::Adventurous);

        let outcome = session.submit("  something epic  ").await;
        let turns = session.conversation().all();
        assert_eq!(turns.len(), 2);
        assert_eq!(turns[0].content, "something epic");
        assert_eq!(turns[1].in_reply_to, Some(turns[0].ordinal));
        assert_eq!(outcome, SubmitOutcome::Replied(turns[1].ordinal));
        assert_eq!(session.feedback_target(), Some(turns[1].ordinal));

        let host = session.host();
        assert_eq!(host.busy, vec![true, false]);
        assert!(host.feedback_enabled);
        assert!(host.views[1]
            .segments
            .iter()
            .any(|s| matches!(s, Segment::BookMention { title, .. } if title == "Dune")));

        let requests = session.transport.requests.lock().unwrap();
        assert_eq!(requests[0].mood, Mood::Adventurous);
        // The message just typed is already part of the history
        assert_eq!(requests[0].history.len(), 1);
    }

    #[tokio::test]
    async fn test_http_500_shows_apology_and_stores_nothing() {
        let storage = ChatStorage::in_memory();
        let mut session = controller(
            vec![Err(BookbotError::HttpError {
                status_code: 500,
                message: "Model processing error".to_string(),
            })],
            storage.clone(),
        );

        let outcome = session.submit("books on sailing").await;
        assert_eq!(outcome, SubmitOutcome::Failed);

        let turns = session.conversation().all();
        assert_eq!(turns.len(), 1);
        assert_eq!(turns[0].role, Role::User);
        assert_eq!(session.feedback_target(), None);

        let last = session.host().views.last().unwrap();
        assert_eq!(last.content, OUT_OF_SCOPE_APOLOGY);
        assert_eq!(last.ordinal, None);
        assert!(!session.host().feedback_enabled);
        assert_eq!(session.host().busy, vec![true, false]);
        // Nothing persisted without an assistant turn
        assert_eq!(storage.load_conversation().unwrap(), None);
    }

    #[tokio::test]
    async fn test_backend_error_uses_same_apology() {
        let mut session = controller(
            vec![Err(BookbotError::BackendError {
                error: "Empty message".to_string(),
                details: None,
            })],
            ChatStorage::in_memory(),
        );
        session.submit("hello").await;
        assert_eq!(
            session.host().views.last().unwrap().content,
            OUT_OF_SCOPE_APOLOGY
        );
    }

    #[tokio::test]
    async fn test_blank_submit_is_ignored() {
        let mut session = controller(vec![], ChatStorage::in_memory());
        assert_eq!(session.submit("   ").await, SubmitOutcome::Ignored);
        assert!(session.conversation().is_empty());
        assert!(session.host().busy.is_empty());
    }

    #[tokio::test]
    async fn test_feedback_targets_latest_reply() {
        let mut session = controller(
            vec![Ok("one".to_string()), Ok("two".to_string())],
            ChatStorage::in_memory(),
        );
        assert!(!session.feedback(true).await);

        session.submit("first").await;
        session.submit("second").await;
        assert!(session.feedback(false).await);

        let feedback = session.transport.feedback.lock().unwrap().clone();
        assert_eq!(feedback, vec![(3, false)]);
    }

    #[tokio::test]
    async fn test_feedback_failure_is_swallowed() {
        let mut session = SessionController::new(
            FakeTransport {
                replies: Mutex::new(vec![Ok("reply".to_string())].into()),
                feedback_fails: true,
                ..FakeTransport::default()
            },
            RecordingHost::default(),
            ChatStorage::in_memory(),
            UiPreferences::default(),
        );
        session.submit("q").await;
        assert!(session.feedback(true).await);
        assert!(session.host().alerts.is_empty());
    }

    #[tokio::test]
    async fn test_new_chat_archives_and_regreets() {
        let storage = ChatStorage::in_memory();
        let mut session = controller(vec![Ok("reply".to_string())], storage.clone());
        session.submit("question").await;
        let before = session.conversation().all().to_vec();

        assert!(session.new_chat());
        assert!(session.conversation().is_empty());
        assert_eq!(session.feedback_target(), None);
        assert!(!session.host().feedback_enabled);
        assert!(session
            .host()
            .views
            .last()
            .unwrap()
            .content
            .contains("Book Recommender"));

        let archive = session.archive();
        assert_eq!(archive.len(), 1);
        assert_eq!(archive[0].messages, before);
    }

    #[tokio::test]
    async fn test_new_chat_declined_keeps_conversation() {
        let mut session = controller(vec![Ok("reply".to_string())], ChatStorage::in_memory());
        session.host_mut().confirm_answer = false;
        session.submit("question").await;

        assert!(!session.new_chat());
        assert_eq!(session.conversation().len(), 2);
        assert!(session.archive().is_empty());
    }

    #[test]
    fn test_toggle_theme_persists() {
        let storage = ChatStorage::in_memory();
        let mut session = controller(vec![], storage.clone());
        assert_eq!(session.toggle_theme(), Theme::Light);
        assert_eq!(storage.load_theme(), Theme::Light);
        assert_eq!(session.toggle_theme(), Theme::Dark);
        assert_eq!(session.host().themes, vec![Theme::Light, Theme::Dark]);
    }

    #[tokio::test]
    async fn test_expand_last_toggles_long_reply() {
        let long_reply = "word ".repeat(80);
        let mut session = controller(vec![Ok(long_reply.clone())], ChatStorage::in_memory());
        assert!(!session.expand_last());

        session.submit("tell me everything").await;
        assert!(session.expand_last());
        let redrawn = session.host().views.last().unwrap();
        assert!(redrawn.disclosure.as_ref().unwrap().expanded);
        assert_eq!(redrawn.content, long_reply);
    }

    #[derive(Debug)]
    struct OneShotRecognizer {
        events: Arc<Mutex<VecDeque<RecognitionEvent>>>,
    }

    impl Recognizer for OneShotRecognizer {
        fn start(&mut self) -> BookbotResult<()> {
            Ok(())
        }

        fn stop(&mut self) {}

        fn poll(&mut self) -> Option<RecognitionEvent> {
            self.events.lock().unwrap().pop_front()
        }
    }

    #[test]
    fn test_voice_error_alerts_and_stops() {
        let events = Arc::new(Mutex::new(VecDeque::from(vec![RecognitionEvent::Error(
            "audio-capture".to_string(),
        )])));
        let mut session = controller(vec![], ChatStorage::in_memory()).with_voice(
            VoiceSession::new(Some(Box::new(OneShotRecognizer { events }))),
        );

        assert!(session.voice_available());
        assert!(session.toggle_voice());
        assert_eq!(
            session.poll_voice(),
            Some(VoiceOutcome::Failed("audio-capture".to_string()))
        );
        assert!(!session.voice_active());
        assert_eq!(
            session.host().alerts,
            vec!["Voice recognition error: audio-capture".to_string()]
        );
    }

    #[test]
    fn test_voice_unavailable_alerts() {
        let mut session = controller(vec![], ChatStorage::in_memory());
        assert!(!session.voice_available());
        assert!(!session.toggle_voice());
        assert_eq!(session.host().alerts.len(), 1);
    }
}
