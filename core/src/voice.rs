//! Speech-to-text input.
//!
//! `VoiceSession` owns the listening flag; a `Recognizer` does the actual
//! capture. One recognition session at a time.

use std::collections::VecDeque;
use std::fmt::Debug;
use std::io::{self, Read};
use std::process::{Child, Command, ExitStatus, Stdio};
use std::thread::{self, JoinHandle};

use tracing::{debug, error, info};

use crate::errors::{BookbotError, BookbotResult};

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RecognitionEvent {
    Result(String),
    Error(String),
    /// Natural end of speech
    End,
}

/// Speech recognizer backend
pub trait Recognizer: Send + Debug {
    fn start(&mut self) -> BookbotResult<()>;

    fn stop(&mut self);

    /// Next pending event, if any
    fn poll(&mut self) -> Option<RecognitionEvent>;
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum VoiceOutcome {
    Transcript(String),
    /// End of speech while still listening; recognition started again
    Restarted,
    /// End of speech after stop
    Ended,
    /// Session stopped because of a recognition error
    Failed(String),
}

#[derive(Debug)]
pub struct VoiceSession {
    recognizer: Option<Box<dyn Recognizer>>,
    listening: bool,
}

impl VoiceSession {
    /// `None` means the host has no speech capability
    pub fn new(recognizer: Option<Box<dyn Recognizer>>) -> Self {
        if recognizer.is_none() {
            info!("Speech recognition not available");
        }
        Self {
            recognizer,
            listening: false,
        }
    }

    pub fn unavailable() -> Self {
        Self::new(None)
    }

    pub fn is_available(&self) -> bool {
        self.recognizer.is_some()
    }

    pub fn is_active(&self) -> bool {
        self.listening
    }

    /// Starts listening. Returns `false` when a session was already active.
    pub fn start(&mut self) -> BookbotResult<bool> {
        if self.listening {
            debug!("Voice session already active");
            return Ok(false);
        }
        let recognizer = self.recognizer.as_mut().ok_or_else(|| {
            BookbotError::VoiceError("Speech recognition not supported".to_string())
        })?;
        recognizer.start()?;
        self.listening = true;
        Ok(true)
    }

    pub fn stop(&mut self) {
        if let Some(recognizer) = self.recognizer.as_mut() {
            recognizer.stop();
        }
        self.listening = false;
    }

    pub fn toggle(&mut self) -> BookbotResult<bool> {
        if self.listening {
            self.stop();
            Ok(false)
        } else {
            self.start()
        }
    }

    pub fn poll(&mut self) -> Option<VoiceOutcome> {
        let event = self.recognizer.as_mut()?.poll()?;
        Some(self.handle_event(event))
    }

    pub fn handle_event(&mut self, event: RecognitionEvent) -> VoiceOutcome {
        match event {
            RecognitionEvent::Result(text) => VoiceOutcome::Transcript(text),
            RecognitionEvent::Error(e) => {
                error!("Voice recognition error: {}", e);
                self.stop();
                VoiceOutcome::Failed(e)
            }
            RecognitionEvent::End if self.listening => {
                let restarted = match self.recognizer.as_mut() {
                    Some(recognizer) => recognizer.start(),
                    None => Err(BookbotError::VoiceError("recognizer missing".to_string())),
                };
                match restarted {
                    Ok(()) => VoiceOutcome::Restarted,
                    Err(e) => {
                        self.listening = false;
                        VoiceOutcome::Failed(e.to_string())
                    }
                }
            }
            RecognitionEvent::End => VoiceOutcome::Ended,
        }
    }
}

/// Runs an external speech-to-text command; its stdout is one transcript
#[derive(Debug)]
pub struct CommandRecognizer {
    command: String,
    child: Option<Child>,
    /// Drains stdout while the command runs so a long transcript cannot fill the pipe
    reader: Option<JoinHandle<io::Result<Vec<u8>>>>,
    pending: VecDeque<RecognitionEvent>,
}

impl CommandRecognizer {
    pub fn new(command: impl Into<String>) -> Self {
        Self {
            command: command.into(),
            child: None,
            reader: None,
            pending: VecDeque::new(),
        }
    }

    fn collect(&mut self, status: ExitStatus) {
        let stdout = match self.reader.take().map(JoinHandle::join) {
            Some(Ok(Ok(stdout))) => stdout,
            Some(Ok(Err(e))) => {
                self.pending.push_back(RecognitionEvent::Error(e.to_string()));
                return;
            }
            Some(Err(_)) => {
                self.pending.push_back(RecognitionEvent::Error(
                    "speech output reader panicked".to_string(),
                ));
                return;
            }
            None => Vec::new(),
        };
        if !status.success() {
            self.pending.push_back(RecognitionEvent::Error(format!(
                "speech command exited with {}",
                status
            )));
            return;
        }

        let transcript = String::from_utf8_lossy(&stdout);
        let transcript = transcript.trim();
        if !transcript.is_empty() {
            self.pending
                .push_back(RecognitionEvent::Result(transcript.to_string()));
        }
        self.pending.push_back(RecognitionEvent::End);
    }
}

impl Recognizer for CommandRecognizer {
    fn start(&mut self) -> BookbotResult<()> {
        if self.child.is_some() {
            return Ok(());
        }
        debug!("Starting speech command: {}", self.command);
        let mut child = Command::new("sh")
            .arg("-c")
            .arg(&self.command)
            .stdin(Stdio::null())
            .stdout(Stdio::piped())
            .stderr(Stdio::null())
            .spawn()
            .map_err(|e| {
                BookbotError::VoiceError(format!("Failed to start speech command: {}", e))
            })?;
        self.reader = child.stdout.take().map(|mut stdout| {
            thread::spawn(move || {
                let mut buf = Vec::new();
                stdout.read_to_end(&mut buf).map(|_| buf)
            })
        });
        self.child = Some(child);
        Ok(())
    }

    fn stop(&mut self) {
        if let Some(mut child) = self.child.take() {
            let _ = child.kill();
            let _ = child.wait();
        }
        // Detached; it ends when the last writer of the pipe exits
        self.reader = None;
        self.pending.clear();
    }

    fn poll(&mut self) -> Option<RecognitionEvent> {
        if let Some(event) = self.pending.pop_front() {
            return Some(event);
        }
        let status = match self.child.as_mut()?.try_wait() {
            Ok(Some(status)) => status,
            Ok(None) => return None,
            Err(e) => {
                self.child = None;
                self.reader = None;
                return Some(RecognitionEvent::Error(e.to_string()));
            }
        };
        self.child = None;
        self.collect(status);
        self.pending.pop_front()
    }
}
