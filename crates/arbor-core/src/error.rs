//! Error types for Arbor

use thiserror::Error;

/// Result type alias using Arbor's Error
pub type Result<T> = std::result::Result<T, Error>;

/// Arbor error types with helpful messages and suggestions
#[derive(Error, Debug)]
pub enum Error {
    // Entity errors (E001-E099)
    #[error("Topic '{0}' not found. Run `arbor topics list` to see all topics.")]
    TopicNotFound(String),

    // Network errors (E100-E199)
    #[error("Network error: {0}. Check your internet connection.")]
    Network(#[from] reqwest::Error),

    #[error("LLM API error: {0}. Check your API key with `arbor config get llm.default_model`.")]
    Llm(String),

    #[error("Rate limited. Waiting {0} seconds before retry.")]
    RateLimited(u64),

    // Classification errors (E200-E299)
    #[error("Classification failed: {0}")]
    Classification(String),

    // Database errors (E400-E499)
    #[error("Database error: {0}")]
    Database(#[from] sqlx::Error),

    // Config errors (E600-E699)
    #[error("Configuration error: {0}")]
    Config(String),

    // Input errors (E800-E899)
    #[error("Invalid input: {0}")]
    InvalidInput(String),

    // Generic errors
    #[error("{0}")]
    Other(String),

    #[error(transparent)]
    Io(#[from] std::io::Error),
}

impl Error {
    /// Get error code for this error type
    pub fn code(&self) -> &'static str {
        match self {
            Self::TopicNotFound(_) => "E001",
            Self::Network(_) => "E100",
            Self::Llm(_) => "E101",
            Self::RateLimited(_) => "E102",
            Self::Classification(_) => "E200",
            Self::Database(_) => "E400",
            Self::Config(_) => "E600",
            Self::InvalidInput(_) => "E800",
            Self::Other(_) | Self::Io(_) => "E9999",
        }
    }

    /// Whether this error is a unique-constraint violation reported by the store.
    ///
    /// Concurrent creators race on the `topics.slug` unique index; the loser's
    /// insert fails with this error and recovers by re-reading the winning row.
    pub fn is_unique_violation(&self) -> bool {
        match self {
            Self::Database(sqlx::Error::Database(db)) => {
                db.kind() == sqlx::error::ErrorKind::UniqueViolation
            }
            _ => false,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_codes() {
        assert_eq!(Error::TopicNotFound("x".into()).code(), "E001");
        assert_eq!(Error::Llm("boom".into()).code(), "E101");
        assert_eq!(Error::Classification("bad json".into()).code(), "E200");
        assert_eq!(Error::Other("misc".into()).code(), "E9999");
    }

    #[test]
    fn test_non_database_errors_are_not_unique_violations() {
        assert!(!Error::TopicNotFound("x".into()).is_unique_violation());
        assert!(!Error::Database(sqlx::Error::RowNotFound).is_unique_violation());
    }
}
