//! Error taxonomy for the retrieval pipeline.
//!
//! Library code returns [`Error`]; the CLI and server glue wrap it in
//! `anyhow` where convenient. The HTTP layer maps each variant onto a
//! status code (see `server`).

pub type Result<T> = std::result::Result<T, Error>;

#[derive(Debug, thiserror::Error)]
pub enum Error {
    /// A credential or connection parameter is missing.
    #[error("configuration error: {0}")]
    Configuration(String),

    /// Transport failure or non-success status from an external service.
    #[error("{service} unavailable: {message}")]
    BackendUnavailable {
        service: &'static str,
        message: String,
    },

    /// Some chunks of a document failed to embed or persist.
    #[error("partial ingestion: {persisted}/{total} chunks persisted")]
    PartialIngestion { persisted: usize, total: usize },

    /// Rejected before any backend call.
    #[error("invalid input: {0}")]
    MalformedInput(String),

    /// A single datastore row could not be decoded.
    #[error("row decode error: {0}")]
    RowDecode(String),

    #[error("{kind} not found: {name}")]
    NotFound { kind: &'static str, name: String },

    #[error("database error: {0}")]
    Database(#[from] sqlx::Error),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

impl Error {
    pub fn backend(service: &'static str, message: impl Into<String>) -> Self {
        Error::BackendUnavailable {
            service,
            message: message.into(),
        }
    }

    pub fn malformed(message: impl Into<String>) -> Self {
        Error::MalformedInput(message.into())
    }
}

impl From<reqwest::Error> for Error {
    fn from(e: reqwest::Error) -> Self {
        Error::backend("http", e.to_string())
    }
}
