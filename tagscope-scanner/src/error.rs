use thiserror::Error;

#[derive(Error, Debug)]
pub enum ScanError {
    #[error("HTTP request failed: {0}")]
    HttpError(#[from] reqwest::Error),

    #[error("Invalid URL: {0}")]
    InvalidUrl(String),

    #[error("Upstream returned {status}: {body}")]
    Upstream { status: u16, body: String },

    #[error("Request to {0} timed out")]
    Timeout(String),

    #[error("Other error: {0}")]
    Other(String),
}

impl ScanError {
    /// Status code to surface to API callers, when the failure came from upstream
    pub fn upstream_status(&self) -> Option<u16> {
        match self {
            ScanError::Upstream { status, .. } => Some(*status),
            ScanError::HttpError(e) => e.status().map(|s| s.as_u16()),
            _ => None,
        }
    }
}

pub type Result<T> = std::result::Result<T, ScanError>;
