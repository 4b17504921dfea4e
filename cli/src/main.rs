use anyhow::Context;
use bookbot_core::voice::{CommandRecognizer, Recognizer, VoiceSession};
use bookbot_core::{
    BookbotConfig, ChatStorage, ChatTransport, FileStore, HttpTransport, KeyValueStore,
    MemoryStore, Mood, SessionController, UiPreferences,
};
use clap::Parser;
use colored::*;
use std::sync::Arc;
use tracing_subscriber::EnvFilter;

mod app;
mod cli;
mod output;

use crate::cli::Args;
use crate::output::{TerminalHost, print_archive, print_usage_instructions};

/// Applies command-line flags on top of the loaded configuration
fn apply_args(config: BookbotConfig, args: &Args) -> BookbotConfig {
    config.merge(&BookbotConfig {
        api_base: args.api_base.clone(),
        mood: args.mood.clone(),
        language: args.language.clone(),
        storage_dir: args.storage_dir.clone(),
        log_level: args.verbose.then(|| "debug".to_string()),
        ..BookbotConfig::default()
    })
}

/// Builds the filter from the merged config, so `-v` beats `BOOKBOT_LOG`
fn log_filter(config: &BookbotConfig) -> EnvFilter {
    let level = config.log_level.as_deref().unwrap_or("warn");
    EnvFilter::try_new(level).unwrap_or_else(|_| EnvFilter::new("warn"))
}

fn init_logging(config: &BookbotConfig) {
    let filter = log_filter(config);
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .init();
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let args = Args::parse();
    let config = apply_args(
        BookbotConfig::load().context("Failed to load configuration")?,
        &args,
    );
    init_logging(&config);

    let store: Arc<dyn KeyValueStore> = if args.ephemeral {
        Arc::new(MemoryStore::new())
    } else {
        let dir = config.storage_dir()?;
        Arc::new(FileStore::open(&dir).context("Failed to open local storage")?)
    };
    let storage = ChatStorage::new(store);

    if args.history {
        print_archive(&storage.load_archive()?);
        return Ok(());
    }

    let transport = HttpTransport::new(config.api_base());

    if args.check {
        match transport.health().await {
            Ok(true) => println!("{} {}", "Backend is reachable at".green(), transport.base_url()),
            Ok(false) => println!("{} {}", "Backend answered with an error at".yellow(), transport.base_url()),
            Err(e) => eprintln!("{}", format!("Could not reach backend: {}", e).red()),
        }
        return Ok(());
    }

    if !args.interactive && args.prompt.is_none() && !args.new_chat {
        print_usage_instructions();
        return Ok(());
    }

    let mood = match config.mood.as_deref() {
        Some(name) => name.parse::<Mood>()?,
        None => Mood::Default,
    };
    let preferences = UiPreferences {
        mood,
        language: config.language.clone().unwrap_or_else(|| "en".to_string()),
        ..UiPreferences::default()
    };
    let recognizer = config
        .voice_command
        .clone()
        .map(|command| Box::new(CommandRecognizer::new(command)) as Box<dyn Recognizer>);

    let mut session = SessionController::new(transport, TerminalHost::new(mood), storage, preferences)
        .with_voice(VoiceSession::new(recognizer));
    if args.new_chat {
        session.startup_new_chat().await;
    } else {
        session.startup().await;
    }

    if args.interactive {
        let suggestions = config.suggestions.clone().unwrap_or_default();
        if let Err(e) = crate::app::run_interactive_chat(&mut session, &suggestions).await {
            eprintln!("{}", format!("Interactive chat failed: {}", e).red());
        }
    } else if let Some(prompt) = args.prompt {
        crate::app::run_single_query(prompt, &mut session).await?;
    }

    Ok(())
}
