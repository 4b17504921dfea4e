use crate::errors::{BookbotError, BookbotResult};
use serde::{Deserialize, Serialize};
use std::env;
use std::fs;
use std::path::{Path, PathBuf};

pub const DEFAULT_API_BASE: &str = "http://localhost:5000";

/// Configuration for the BookBot client
#[derive(Debug, Serialize, Deserialize, Clone, Default)]
pub struct BookbotConfig {
    pub api_base: Option<String>,
    pub mood: Option<String>,
    pub language: Option<String>,
    pub storage_dir: Option<PathBuf>,
    pub voice_command: Option<String>,
    pub log_level: Option<String>,
    pub suggestions: Option<Vec<String>>,
}

impl BookbotConfig {
    /// Built-in values used when neither the config file nor the environment set a field
    pub fn builtin() -> Self {
        Self {
            api_base: Some(DEFAULT_API_BASE.to_string()),
            mood: Some("default".to_string()),
            language: Some("en".to_string()),
            storage_dir: None,
            voice_command: None,
            log_level: Some("warn".to_string()),
            suggestions: Some(vec![
                "Recommend a classic novel for a long weekend".to_string(),
                "What should I read after The Hobbit?".to_string(),
                "Suggest an introductory book on machine learning".to_string(),
                "Give me a short mystery novel to read tonight".to_string(),
            ]),
        }
    }

    /// Loads configuration from a file if it exists, otherwise returns an empty config
    pub fn load_from_file(path: &Path) -> BookbotResult<Self> {
        if !path.exists() {
            return Ok(Self::default());
        }

        let content = fs::read_to_string(path).map_err(|e| {
            BookbotError::ConfigError(format!("Failed to read config file: {}", e))
        })?;

        toml::from_str(&content)
            .map_err(|e| BookbotError::ConfigError(format!("Failed to parse config file: {}", e)))
    }

    /// Saves configuration to a file
    pub fn save_to_file(&self, path: &Path) -> BookbotResult<()> {
        let content = toml::to_string(self).map_err(|e| {
            BookbotError::ConfigError(format!("Failed to serialize config: {}", e))
        })?;

        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent).map_err(|e| {
                BookbotError::ConfigError(format!("Failed to create config directory: {}", e))
            })?;
        }

        fs::write(path, content).map_err(|e| {
            BookbotError::ConfigError(format!("Failed to write config file: {}", e))
        })
    }

    /// Merges this config with another config, preferring values from the other config if present
    pub fn merge(&self, other: &Self) -> Self {
        Self {
            api_base: other.api_base.clone().or_else(|| self.api_base.clone()),
            mood: other.mood.clone().or_else(|| self.mood.clone()),
            language: other.language.clone().or_else(|| self.language.clone()),
            storage_dir: other.storage_dir.clone().or_else(|| self.storage_dir.clone()),
            voice_command: other
                .voice_command
                .clone()
                .or_else(|| self.voice_command.clone()),
            log_level: other.log_level.clone().or_else(|| self.log_level.clone()),
            suggestions: other.suggestions.clone().or_else(|| self.suggestions.clone()),
        }
    }

    /// Reads the overrides that can be given through the environment (or a `.env` file)
    pub fn from_env() -> Self {
        dotenvy::dotenv().ok();
        Self {
            api_base: env::var("BOOKBOT_API_BASE").ok(),
            log_level: env::var("BOOKBOT_LOG").ok(),
            voice_command: env::var("BOOKBOT_VOICE_COMMAND").ok(),
            ..Self::default()
        }
    }

    /// Builtin defaults, then the config file, then the environment
    pub fn load() -> BookbotResult<Self> {
        let file = match default_config_path() {
            Some(path) => Self::load_from_file(&path)?,
            None => Self::default(),
        };
        Ok(Self::builtin().merge(&file).merge(&Self::from_env()))
    }

    pub fn api_base(&self) -> &str {
        self.api_base.as_deref().unwrap_or(DEFAULT_API_BASE)
    }

    /// Directory backing the key-value storage
    pub fn storage_dir(&self) -> BookbotResult<PathBuf> {
        if let Some(dir) = &self.storage_dir {
            return Ok(dir.clone());
        }
        dirs::data_dir()
            .map(|dir| dir.join("bookbot").join("storage"))
            .ok_or_else(|| {
                BookbotError::ConfigError("Could not determine data directory".to_string())
            })
    }
}

/// Helper function to get default config file path
pub fn default_config_path() -> Option<PathBuf> {
    dirs::config_dir().map(|dir| dir.join("bookbot").join("config.toml"))
}
