//! Errors surfaced by the content source and the content pipeline

/// Failure of a content source call or of mapping its response
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum SourceError {
    /// Transport failure, backend error or timeout
    #[error("content source unavailable: {0}")]
    SourceUnavailable(String),

    /// No document of the given type has the given key
    #[error("document not found: {document_type}/{key}")]
    NotFound { document_type: String, key: String },

    /// Pagination cursor is malformed, foreign or expired
    #[error("invalid pagination cursor: {0}")]
    InvalidCursor(String),

    /// Document type is unknown to the backend
    #[error("unknown document type: {0}")]
    InvalidType(String),

    /// Publication timestamp is missing or unparseable
    #[error("invalid date: {0}")]
    InvalidDate(String),

    /// Backend answered with a body that does not decode
    #[error("malformed response: {0}")]
    MalformedResponse(String),
}

impl SourceError {
    pub fn not_found(document_type: &str, key: &str) -> Self {
        Self::NotFound {
            document_type: document_type.to_string(),
            key: key.to_string(),
        }
    }
}

impl From<reqwest::Error> for SourceError {
    fn from(e: reqwest::Error) -> Self {
        if e.is_decode() {
            Self::MalformedResponse(e.to_string())
        } else {
            Self::SourceUnavailable(e.to_string())
        }
    }
}

pub type SourceResult<T> = std::result::Result<T, SourceError>;
