use thiserror::Error;

#[derive(Error, Debug)]
pub enum Error {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    #[error("Fetch error for {url}: {reason}")]
    Fetch { url: String, reason: String },

    #[error("Extraction failed: {reason}")]
    Extraction { reason: String },

    #[error("Could not parse date {input:?} with format {format:?}")]
    DateParse { input: String, format: String },

    #[error("Backend write error: {0}")]
    BackendWrite(String),

    #[error("Configuration error: {0}")]
    Configuration(String),

    #[error("Invalid URL: {0}")]
    InvalidUrl(String),

    #[error("Storage error: {0}")]
    Storage(String),

    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    #[error("External error: {0}")]
    External(#[from] anyhow::Error),
}

impl Error {
    pub fn fetch(url: impl Into<String>, reason: impl ToString) -> Self {
        Error::Fetch {
            url: url.into(),
            reason: reason.to_string(),
        }
    }

    pub fn extraction(reason: impl Into<String>) -> Self {
        Error::Extraction {
            reason: reason.into(),
        }
    }

    /// Failures worth another attempt at the same URL.
    pub fn is_retryable(&self) -> bool {
        matches!(self, Error::Fetch { .. } | Error::Http(_))
    }

    /// Expected per-link failures that are not counted as errors.
    pub fn is_benign_skip(&self) -> bool {
        matches!(self, Error::Extraction { .. })
    }

    /// Short machine-readable tag used in skip records and log fields.
    pub fn kind(&self) -> &'static str {
        match self {
            Error::Io(_) => "io",
            Error::Serialization(_) => "serialization",
            Error::Fetch { .. } | Error::Http(_) => "fetch",
            Error::Extraction { .. } => "extraction",
            Error::DateParse { .. } => "date_format_drift",
            Error::BackendWrite(_) => "backend_write",
            Error::Configuration(_) => "configuration",
            Error::InvalidUrl(_) => "invalid_url",
            Error::Storage(_) => "storage",
            Error::External(_) => "external",
        }
    }
}

pub type Result<T> = std::result::Result<T, Error>;
