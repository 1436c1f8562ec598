use crate::utils::validation::ValidationError;
use thiserror::Error;

pub type ClientResult<T> = Result<T, ClientError>;

#[derive(Error, Debug)]
pub enum ClientError {
    #[error("Validation failed: {0}")]
    Validation(#[from] ValidationError),

    #[error("Error fetching files: {0}")]
    Fetch(String),

    #[error("Upload failed: {0}")]
    Upload(String),

    #[error("Error generating download link: {0}")]
    DownloadLink(String),

    #[error("Quota service error: {0}")]
    Quota(String),

    #[error("You've reached your {tier} tier limit of {limit} {kind}")]
    QuotaExceeded {
        tier: &'static str,
        limit: u64,
        kind: &'static str,
    },

    #[error("Configuration error: {0}")]
    Config(String),

    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

impl ClientError {
    /// Validation failures never reach the network and leave state untouched.
    pub fn is_validation(&self) -> bool {
        matches!(self, ClientError::Validation(_))
    }
}
