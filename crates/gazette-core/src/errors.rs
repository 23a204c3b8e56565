/// Core error type for the bot.
///
/// Adapter crates map their specific errors into this type so the pipeline
/// can handle failures consistently (user-facing message vs. logged-only).
#[derive(Debug, thiserror::Error)]
pub enum Error {
    #[error("config error: {0}")]
    Config(String),

    #[error("invalid request: {0}")]
    InvalidRequest(String),

    #[error("fetch failed for {url}: {reason}")]
    Fetch { url: String, reason: String },

    #[error("summary generation failed: {0}")]
    Generation(String),

    #[error("llm error: {0}")]
    Llm(String),

    #[error("store error: {0}")]
    Store(String),

    #[error("i/o error: {0}")]
    Io(#[from] std::io::Error),

    #[error("json error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("http error: {0}")]
    Http(#[from] reqwest::Error),

    #[error("external error: {0}")]
    External(String),
}

impl Error {
    /// The single human-readable line sent to the channel when a stage-ending
    /// error reaches the top of the pipeline. Raw error text stays in logs.
    pub fn user_message(&self) -> String {
        match self {
            Error::InvalidRequest(msg) => msg.clone(),
            Error::Fetch { .. } => {
                "I could not retrieve the article content from that link.".to_string()
            }
            Error::Generation(_) | Error::Llm(_) => {
                "Sorry, I could not generate a summary for that article.".to_string()
            }
            _ => "Something went wrong while processing that link.".to_string(),
        }
    }
}

pub type Result<T> = std::result::Result<T, Error>;
