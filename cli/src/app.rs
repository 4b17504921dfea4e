use anyhow::{Context, Result};
use bookbot_core::voice::VoiceOutcome;
use bookbot_core::{ChatTransport, Mood, SessionController, SubmitOutcome};
use colored::*;
use std::io::{self, Write};
use std::time::Duration;
use tracing::{debug, info};

use crate::output::{print_archive, print_interactive_help, print_suggestions, TerminalHost};

pub type Session<T> = SessionController<T, TerminalHost>;

/// Consecutive silent restarts before dictation gives up
const MAX_SILENT_RESTARTS: usize = 3;

/// Sends one message and prints the reply
pub async fn run_single_query<T: ChatTransport>(prompt: String, session: &mut Session<T>) -> Result<()> {
    info!("Running single query: {}", prompt);
    session.submit(&prompt).await;
    Ok(())
}

/// What the interactive loop should do with one line of input
#[derive(Debug, PartialEq, Eq)]
pub enum Command {
    Exit,
    Help,
    NewChat,
    Feedback(bool),
    More,
    Theme,
    Mood(String),
    Language(String),
    Voice,
    History,
    Suggest(Option<usize>),
    Unknown(String),
    Message(String),
}

pub fn parse_command(input: &str) -> Command {
    let input = input.trim();
    if input.eq_ignore_ascii_case("exit") || input.eq_ignore_ascii_case("quit") {
        return Command::Exit;
    }
    let Some(rest) = input.strip_prefix('/') else {
        return Command::Message(input.to_string());
    };

    let (name, arg) = match rest.split_once(char::is_whitespace) {
        Some((name, arg)) => (name, arg.trim()),
        None => (rest, ""),
    };
    match name.to_lowercase().as_str() {
        "help" => Command::Help,
        "new" => Command::NewChat,
        "like" => Command::Feedback(true),
        "dislike" => Command::Feedback(false),
        "more" | "less" => Command::More,
        "theme" => Command::Theme,
        "mood" => Command::Mood(arg.to_string()),
        "lang" | "language" => Command::Language(arg.to_string()),
        "voice" => Command::Voice,
        "history" => Command::History,
        "suggest" => Command::Suggest(arg.parse().ok()),
        _ => Command::Unknown(name.to_string()),
    }
}

/// Runs an interactive chat session
pub async fn run_interactive_chat<T: ChatTransport>(
    session: &mut Session<T>,
    suggestions: &[String],
) -> Result<()> {
    println!("Type /help for commands, 'exit' or 'quit' to leave.");
    println!();

    loop {
        print!("{}: ", "You".green().bold());
        io::stdout().flush().context("Failed to flush stdout")?;

        let mut input = String::new();
        let read = io::stdin()
            .read_line(&mut input)
            .context("Failed to read input")?;
        if read == 0 {
            break; // EOF
        }
        if input.trim().is_empty() {
            continue;
        }

        match parse_command(&input) {
            Command::Exit => {
                println!("Goodbye, happy reading!");
                break;
            }
            Command::Help => print_interactive_help(session.voice_available()),
            Command::NewChat => {
                session.new_chat();
            }
            Command::Feedback(is_positive) => {
                if session.feedback(is_positive).await {
                    println!("{}", "Thanks for your feedback!".dimmed());
                } else {
                    println!("Nothing to rate yet.");
                }
            }
            Command::More => {
                if !session.expand_last() {
                    println!("No long reply to expand.");
                }
            }
            Command::Theme => {
                let theme = session.toggle_theme();
                println!("Theme: {}", theme.as_str());
            }
            Command::Mood(name) => match name.parse::<Mood>() {
                Ok(mood) => {
                    session.set_mood(mood);
                    session.host_mut().set_mood(mood);
                    println!("Mood: {}", mood);
                }
                Err(e) => println!("{}", e),
            },
            Command::Language(code) if !code.is_empty() => {
                session.set_language(code.clone());
                println!("Language: {}", code);
            }
            Command::Language(_) => println!("Usage: /lang <code>"),
            Command::Voice if session.voice_available() => dictate(session).await,
            Command::History => print_archive(&session.archive()),
            Command::Suggest(Some(n)) if n >= 1 && n <= suggestions.len() => {
                session.submit(&suggestions[n - 1]).await;
            }
            Command::Suggest(_) => print_suggestions(suggestions),
            Command::Voice | Command::Unknown(_) => {
                println!("Unknown command. Type /help for the list.");
            }
            Command::Message(text) => {
                session.submit(&text).await;
            }
        }
    }

    session.stop_voice();
    Ok(())
}

/// Listens until a transcript arrives, then submits it like typed input
async fn dictate<T: ChatTransport>(session: &mut Session<T>) {
    if !session.toggle_voice() {
        return;
    }
    println!("{}", "Listening...".cyan());

    let mut silent_restarts = 0;
    loop {
        match session.poll_voice() {
            Some(VoiceOutcome::Transcript(text)) => {
                session.stop_voice();
                println!("{} {}", "Heard:".dimmed(), text);
                if session.submit(&text).await == SubmitOutcome::Failed {
                    debug!("Dictated message was not answered");
                }
                return;
            }
            Some(VoiceOutcome::Restarted) => {
                silent_restarts += 1;
                if silent_restarts >= MAX_SILENT_RESTARTS {
                    session.stop_voice();
                    println!("No speech detected.");
                    return;
                }
            }
            Some(VoiceOutcome::Ended) | Some(VoiceOutcome::Failed(_)) => return,
            None => tokio::time::sleep(Duration::from_millis(100)).await,
        }
    }
}
