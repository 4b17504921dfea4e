use clap::Parser;
use std::path::PathBuf;

/// Terminal client for the BookBot book-recommendation service
#[derive(Parser, Debug)]
#[command(author, version, about, long_about = None)]
pub struct Args {
    /// The message to send to BookBot
    #[arg(index = 1)] // Positional argument
    pub prompt: Option<String>,

    /// Enter interactive chat mode
    #[arg(short, long, default_value_t = false)]
    pub interactive: bool,

    /// Base URL of the BookBot backend
    #[arg(long, env = "BOOKBOT_API_BASE")]
    pub api_base: Option<String>,

    /// Reading mood (default, adventurous, romantic, mysterious, thoughtful, technical)
    #[arg(long)]
    pub mood: Option<String>,

    /// Language code forwarded to the backend
    #[arg(long)]
    pub language: Option<String>,

    /// Archive the saved conversation and start a new one
    #[arg(long, default_value_t = false)]
    pub new_chat: bool,

    /// List archived conversations and exit
    #[arg(long, default_value_t = false)]
    pub history: bool,

    /// Check that the backend is reachable and exit
    #[arg(long, default_value_t = false)]
    pub check: bool,

    /// Keep everything in memory; nothing is saved
    #[arg(long, default_value_t = false)]
    pub ephemeral: bool,

    /// Directory for saved conversations and preferences
    #[arg(long)]
    pub storage_dir: Option<PathBuf>,

    /// Enable verbose output
    #[arg(short, long, default_value_t = false)]
    pub verbose: bool,
}
