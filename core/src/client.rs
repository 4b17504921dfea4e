use std::sync::OnceLock;

use async_trait::async_trait;
use regex::Regex;
use reqwest::Client;
use tracing::{debug, instrument, warn};

use crate::errors::{BookbotError, BookbotResult};
use crate::types::{ChatRequest, ChatResponse, DailyBook, DailyBookResponse, FeedbackRequest};

/// Shown instead of any chat failure, whatever its cause
pub const OUT_OF_SCOPE_APOLOGY: &str = "I apologize, but I'm unable to process that request. As a book recommender, I specialize in suggesting reading materials and discussing literature. Could you please ask me something related to books or reading?";

pub const UNKNOWN_TITLE: &str = "Unknown Title";
pub const UNKNOWN_AUTHOR: &str = "Unknown Author";
pub const DEFAULT_GENRE: &str = "Fiction";
pub const NO_DESCRIPTION: &str = "No description available.";

/// Book shown when the daily book cannot be fetched at all
pub fn fallback_daily_book() -> DailyBook {
    DailyBook {
        title: "The Midnight Library".to_string(),
        author: "Matt Haig".to_string(),
        genre: "Fiction, Fantasy".to_string(),
        description: "Between life and death there is a library, and within that library, the shelves go on forever. Every book provides a chance to try another life you could have lived.".to_string(),
    }
}

struct BookPatterns {
    title: Regex,
    author: Regex,
    genre: Regex,
    description: Regex,
}

fn book_patterns() -> Option<&'static BookPatterns> {
    static PATTERNS: OnceLock<Option<BookPatterns>> = OnceLock::new();
    PATTERNS
        .get_or_init(|| {
            Some(BookPatterns {
                title: Regex::new(r#""([^"]+)""#).ok()?,
                author: Regex::new(r"by ([^(]+)").ok()?,
                genre: Regex::new(r"\(([^)]+)\)").ok()?,
                description: Regex::new(r"- (.+)$").ok()?,
            })
        })
        .as_ref()
}

fn first_group(re: &Regex, text: &str) -> Option<String> {
    re.captures(text)
        .and_then(|caps| caps.get(1))
        .map(|m| m.as_str().to_string())
}

/// Parses `"Title" by Author (Genre) - Description`; each missing field falls back on its own
pub fn parse_daily_book(text: &str) -> DailyBook {
    let Some(patterns) = book_patterns() else {
        return DailyBook {
            title: UNKNOWN_TITLE.to_string(),
            author: UNKNOWN_AUTHOR.to_string(),
            genre: DEFAULT_GENRE.to_string(),
            description: NO_DESCRIPTION.to_string(),
        };
    };

    DailyBook {
        title: first_group(&patterns.title, text).unwrap_or_else(|| UNKNOWN_TITLE.to_string()),
        author: first_group(&patterns.author, text)
            .map(|author| author.trim().to_string())
            .unwrap_or_else(|| UNKNOWN_AUTHOR.to_string()),
        genre: first_group(&patterns.genre, text).unwrap_or_else(|| DEFAULT_GENRE.to_string()),
        description: first_group(&patterns.description, text)
            .unwrap_or_else(|| NO_DESCRIPTION.to_string()),
    }
}

/// Request/response calls to the book-chat backend. One attempt each, no retries.
#[async_trait]
pub trait ChatTransport: Send + Sync {
    /// Never fails; falls back to a fixed book
    async fn fetch_daily_book(&self) -> DailyBook;

    async fn send_message(&self, request: ChatRequest) -> BookbotResult<String>;

    async fn send_feedback(&self, message_id: u64, is_positive: bool) -> BookbotResult<()>;

    async fn health(&self) -> BookbotResult<bool>;
}

/// HTTP client for the backend
#[derive(Debug, Clone)]
pub struct HttpTransport {
    client: Client,
    base_url: String,
}

impl HttpTransport {
    pub fn new(base_url: impl Into<String>) -> Self {
        Self::with_client(Client::new(), base_url)
    }

    pub fn with_client(client: Client, base_url: impl Into<String>) -> Self {
        let base_url = base_url.into().trim_end_matches('/').to_string();
        Self { client, base_url }
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    fn url(&self, path: &str) -> String {
        format!("{}{}", self.base_url, path)
    }

    async fn try_fetch_daily_book(&self) -> BookbotResult<DailyBook> {
        let response = self
            .client
            .get(self.url("/api/daily_book"))
            .send()
            .await
            .map_err(|e| BookbotError::RequestError(format!("Failed to send request: {}", e)))?;

        // The body is read even on error statuses; the backend sends `{error}` there
        let body: DailyBookResponse = response.json().await.map_err(|e| {
            BookbotError::ResponseError(format!("Failed to parse daily book: {}", e))
        })?;

        if let Some(error) = body.error {
            return Err(BookbotError::BackendError {
                error,
                details: None,
            });
        }
        let book = body.book.ok_or_else(|| {
            BookbotError::ResponseError("No book in daily book response".to_string())
        })?;
        Ok(parse_daily_book(&book))
    }
}

#[async_trait]
impl ChatTransport for HttpTransport {
    #[instrument(skip(self))]
    async fn fetch_daily_book(&self) -> DailyBook {
        match self.try_fetch_daily_book().await {
            Ok(book) => book,
            Err(e) => {
                warn!("Error loading daily book: {}", e);
                fallback_daily_book()
            }
        }
    }

    #[instrument(skip(self, request), fields(history = request.history.len()))]
    async fn send_message(&self, request: ChatRequest) -> BookbotResult<String> {
        debug!("Sending chat message: {}", request.message);
        let response = self
            .client
            .post(self.url("/api/chat"))
            .json(&request)
            .send()
            .await
            .map_err(|e| BookbotError::RequestError(format!("Failed to send request: {}", e)))?;

        let status = response.status();
        if !status.is_success() {
            let error_body = response.text().await.unwrap_or_default();
            return Err(BookbotError::HttpError {
                status_code: status.as_u16(),
                message: format!("Chat request failed: {}", error_body),
            });
        }

        let body: ChatResponse = response.json().await.map_err(|e| {
            BookbotError::ResponseError(format!("Failed to parse chat response: {}", e))
        })?;

        if let Some(error) = body.error {
            return Err(BookbotError::BackendError {
                error,
                details: body.details,
            });
        }

        body.response
            .ok_or_else(|| BookbotError::ResponseError("No response text in reply".to_string()))
    }

    #[instrument(skip(self))]
    async fn send_feedback(&self, message_id: u64, is_positive: bool) -> BookbotResult<()> {
        self.client
            .post(self.url("/api/feedback"))
            .json(&FeedbackRequest {
                message_id,
                is_positive,
            })
            .send()
            .await
            .map_err(|e| BookbotError::RequestError(format!("Failed to send feedback: {}", e)))?;
        Ok(())
    }

    async fn health(&self) -> BookbotResult<bool> {
        let response = self
            .client
            .get(self.url("/health"))
            .send()
            .await
            .map_err(|e| BookbotError::RequestError(format!("Failed to reach backend: {}", e)))?;
        Ok(response.status().is_success())
    }
}
