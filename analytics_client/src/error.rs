use thiserror::Error;

/// Failures of the upload/analysis cycle. `Display` is the user-facing text.
#[derive(Debug, Error, Clone, PartialEq)]
pub enum AnalysisError {
    #[error("Please upload a file first")]
    NoFile,
    #[error("Please draw at least one zone for video analysis")]
    NoZones,
    #[error("An analysis is already running")]
    Busy,
    #[error("Network error during upload")]
    Network,
    #[error("{message}")]
    Server { status: u16, message: String },
    #[error("Could not encode zones: {0}")]
    Encode(String),
}

impl AnalysisError {
    /// Server failure message: the response body when it has text, else the status.
    pub fn from_status(status: u16, body: &str) -> Self {
        let body = body.trim();
        let message = if body.is_empty() {
            format!("Upload failed with status {status}")
        } else {
            body.to_string()
        };
        AnalysisError::Server { status, message }
    }
}

/// Failures of the account endpoints. `Display` is the user-facing text.
#[derive(Debug, Error, Clone, PartialEq)]
pub enum AccountError {
    #[error("{0}")]
    Validation(String),
    #[error("No response from server. Check your network.")]
    Network,
    #[error("{0}")]
    Rejected(String),
    #[error("You are not logged in")]
    NotLoggedIn,
}

#[derive(Debug, Error)]
pub enum MediaError {
    #[error("Wait for the current analysis to finish")]
    Busy,
    #[error("File size exceeds {limit_mb}MB limit")]
    TooLarge { limit_mb: u64 },
    #[error("Invalid file format. Please upload an image or video.")]
    Unsupported,
    #[error("Could not read {path}: {source}")]
    Io {
        path: String,
        #[source]
        source: std::io::Error,
    },
}
