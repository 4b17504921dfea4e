use std::io::{self, Write};
use std::time::Duration;

use bookbot_core::render::{Segment, TurnView};
use bookbot_core::{ArchiveEntry, DailyBook, Mood, Role, SessionHost, Theme};
use colored::*;
use dialoguer::Confirm;
use indicatif::{ProgressBar, ProgressStyle};
use tracing::warn;

/// Draws the chat on stdout
pub struct TerminalHost {
    theme: Theme,
    mood: Mood,
    spinner: Option<ProgressBar>,
    feedback_enabled: bool,
}

impl TerminalHost {
    pub fn new(mood: Mood) -> Self {
        Self {
            theme: Theme::Dark,
            mood,
            spinner: None,
            feedback_enabled: false,
        }
    }

    pub fn set_mood(&mut self, mood: Mood) {
        self.mood = mood;
    }

    pub fn feedback_enabled(&self) -> bool {
        self.feedback_enabled
    }

    fn accent(&self, text: &str) -> ColoredString {
        match self.mood {
            Mood::Default => match self.theme {
                Theme::Dark => text.bright_blue(),
                Theme::Light => text.blue(),
            },
            Mood::Adventurous => text.yellow(),
            Mood::Romantic => text.magenta(),
            Mood::Mysterious => text.purple(),
            Mood::Thoughtful => text.cyan(),
            Mood::Technical => text.green(),
        }
    }

    fn dim(&self, text: &str) -> ColoredString {
        match self.theme {
            Theme::Dark => text.dimmed(),
            Theme::Light => text.black(),
        }
    }
}

/// Flattens segments into colored terminal text
pub fn format_segments(segments: &[Segment]) -> String {
    segments
        .iter()
        .map(|segment| match segment {
            Segment::Text(text) => text.clone(),
            Segment::BookMention { title, author } => {
                format!("{} by {}", title.bold().italic(), author.underline())
            }
        })
        .collect()
}

impl SessionHost for TerminalHost {
    fn show_turn(&mut self, view: &TurnView) {
        let label = match view.role {
            Role::User => "You".green().bold(),
            Role::Assistant => self.accent("BookBot").bold(),
        };
        println!("{} {}", label, self.dim(&view.time));
        println!("{}", format_segments(&view.visible_segments()));
        if let Some(disclosure) = &view.disclosure {
            println!("{}", self.dim(&format!("[{} - type /more]", disclosure.label())));
        }
        println!();
    }

    fn show_daily_book(&mut self, book: &DailyBook) {
        println!("{}", self.accent("Book of the day").bold());
        println!("  {} by {}", book.title.bold().italic(), book.author.underline());
        println!("  {}", book.description);
        println!("  {}", self.dim(&format!("Genre: {}", book.genre)));
        println!();
    }

    fn set_busy(&mut self, busy: bool) {
        if busy {
            let spinner = ProgressBar::new_spinner();
            if let Ok(style) = ProgressStyle::default_spinner()
                .tick_chars("⠋⠙⠹⠸⠼⠴⠦⠧⠇⠏")
                .template("{spinner} {msg}")
            {
                spinner.set_style(style);
            }
            spinner.set_message("BookBot is typing...");
            spinner.enable_steady_tick(Duration::from_millis(120));
            self.spinner = Some(spinner);
        } else if let Some(spinner) = self.spinner.take() {
            spinner.finish_and_clear();
        }
    }

    fn confirm(&mut self, prompt: &str) -> bool {
        match Confirm::new().with_prompt(prompt).default(false).interact() {
            Ok(answer) => answer,
            Err(e) => {
                warn!("Confirmation prompt failed: {}", e);
                false
            }
        }
    }

    fn alert(&mut self, message: &str) {
        eprintln!("{} {}", "[!]".red().bold(), message);
        eprint!("{}", "Press Enter to continue...".dimmed());
        io::stderr().flush().ok();
        let mut discard = String::new();
        io::stdin().read_line(&mut discard).ok();
    }

    fn set_feedback_enabled(&mut self, enabled: bool) {
        if enabled && !self.feedback_enabled {
            println!("{}", self.dim("Was this helpful? /like or /dislike"));
        }
        self.feedback_enabled = enabled;
    }

    fn apply_theme(&mut self, theme: Theme) {
        self.theme = theme;
    }
}

pub fn print_archive(entries: &[ArchiveEntry]) {
    if entries.is_empty() {
        println!("No archived conversations.");
        return;
    }
    for (i, entry) in entries.iter().enumerate() {
        let first_question = entry
            .messages
            .iter()
            .find(|turn| turn.role == Role::User)
            .map(|turn| turn.content.as_str())
            .unwrap_or("");
        println!(
            "  {}. {} ({} messages) {}",
            i + 1,
            entry.date.blue(),
            entry.messages.len(),
            first_question.dimmed()
        );
    }
}

pub fn print_suggestions(suggestions: &[String]) {
    println!("{}", "Quick suggestions:".cyan());
    for (i, suggestion) in suggestions.iter().enumerate() {
        println!("  {}. {}", i + 1, suggestion);
    }
    println!("Type /suggest <number> to send one.");
}

/// Show usage instructions when no prompt or action is provided
pub fn print_usage_instructions() {
    println!("{}", "Usage:".yellow().bold());
    println!("  {}", "bookbot \"your question about books\"".green().bold());
    println!("    Send a single message to BookBot");
    println!();
    println!("  {}", "bookbot -i".green().bold());
    println!("    Start an interactive chat session");
    println!();
    println!("{}", "Options:".cyan());
    println!("  --api-base <URL>   BookBot backend base URL");
    println!("  --mood <MOOD>      default, adventurous, romantic, mysterious, thoughtful, technical");
    println!("  --history          List archived conversations");
    println!("  --check            Check that the backend is reachable");
    println!("  --help             Show this help message");
    println!();
}

pub fn print_interactive_help(voice_available: bool) {
    println!("{}", "Commands:".cyan());
    println!("  /new              Start a new chat (current one is archived)");
    println!("  /like, /dislike   Rate the latest reply");
    println!("  /more             Expand or collapse the latest long reply");
    println!("  /theme            Switch between dark and light");
    println!("  /mood <mood>      Change reading mood");
    println!("  /lang <code>      Change language");
    if voice_available {
        println!("  /voice            Dictate a message");
    }
    println!("  /history          List archived conversations");
    println!("  /suggest [n]      Show or send a quick suggestion");
    println!("  exit, quit        Leave");
    println!();
}
