//! Error handling for vidfetch

use thiserror::Error;

/// Main error type for vidfetch
///
/// Invalid input and extraction failures are recovered by re-prompting;
/// download failures are terminal for one item; filesystem failures during
/// cleanup are logged per entry and never abort the sweep.
#[derive(Debug, Error)]
pub enum VidfetchError {
    #[error("yt-dlp not found. Please install yt-dlp")]
    YtDlpNotFound,

    #[error("Invalid URL: {0}")]
    InvalidUrl(String),

    #[error("Invalid selection: {0}")]
    InvalidSelection(String),

    #[error("Failed to extract video info: {0}")]
    ExtractionError(String),

    #[error("Download failed: {0}")]
    DownloadError(String),

    #[error("IO error: {0}")]
    IoError(#[from] std::io::Error),

    #[error("Serialization error: {0}")]
    SerializationError(#[from] serde_json::Error),
}
