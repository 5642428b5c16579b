use thiserror::Error;

#[derive(Error, Debug)]
pub enum SolaceError {
    #[error("Invalid input: {0}")]
    InvalidInput(String),

    #[error("Retrieval service unavailable: {0}")]
    RetrievalUnavailable(String),

    #[error("No passages found for query")]
    NoPassagesFound,

    #[error("Synthesis service unavailable: {0}")]
    SynthesisUnavailable(String),

    #[error("Content blocked by moderation policy")]
    ModerationBlocked,

    #[error("Configuration error: {0}")]
    Config(String),

    #[error("HTTP error: {0}")]
    HttpError(String),

    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    #[error("TOML parsing error: {0}")]
    TomlParsing(#[from] toml::de::Error),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

impl SolaceError {
    /// Short machine-readable tag for the error class.
    #[must_use]
    pub fn kind(&self) -> &'static str {
        match self {
            Self::InvalidInput(_) => "invalid_input",
            Self::RetrievalUnavailable(_) => "retrieval_unavailable",
            Self::NoPassagesFound => "no_passages_found",
            Self::SynthesisUnavailable(_) => "synthesis_unavailable",
            Self::ModerationBlocked => "moderation_blocked",
            Self::Config(_) => "config",
            Self::HttpError(_) => "http",
            Self::Serialization(_) => "serialization",
            Self::TomlParsing(_) => "toml",
            Self::Io(_) => "io",
        }
    }

    /// Human-readable message safe to show to callers. Never leaks
    /// collaborator endpoints, keys, or internal error chains.
    #[must_use]
    pub fn user_message(&self) -> String {
        match self {
            Self::InvalidInput(reason) => format!("Invalid request: {reason}"),
            Self::RetrievalUnavailable(_) => {
                "The passage index is temporarily unavailable. Please try again shortly."
                    .to_string()
            }
            Self::NoPassagesFound => {
                "No passages matched your concern. Try rephrasing it in a few more words."
                    .to_string()
            }
            Self::SynthesisUnavailable(_) => {
                "We found passages but could not generate an explanation. Please try again."
                    .to_string()
            }
            Self::ModerationBlocked => {
                "We could not generate an explanation for this request.".to_string()
            }
            _ => "An internal error occurred. Please try again.".to_string(),
        }
    }
}

impl From<reqwest::Error> for SolaceError {
    fn from(e: reqwest::Error) -> Self {
        Self::HttpError(e.to_string())
    }
}

pub type Result<T> = std::result::Result<T, SolaceError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_kinds() {
        assert_eq!(
            SolaceError::InvalidInput("empty input".into()).kind(),
            "invalid_input"
        );
        assert_eq!(SolaceError::NoPassagesFound.kind(), "no_passages_found");
        assert_eq!(SolaceError::ModerationBlocked.kind(), "moderation_blocked");
    }

    #[test]
    fn test_user_message_does_not_leak_internals() {
        let err = SolaceError::RetrievalUnavailable(
            "connect error: https://index.internal:9200 refused".into(),
        );
        let msg = err.user_message();
        assert!(!msg.contains("index.internal"));
        assert!(!msg.contains("9200"));
    }
}
