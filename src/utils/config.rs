//! Application configuration

use serde::{Deserialize, Serialize};
use std::path::PathBuf;

/// Application settings
///
/// The resilience knobs are configuration values handed to yt-dlp, not
/// logic this layer implements.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AppSettings {
    /// Durable destination for completed artifacts
    pub final_dir: PathBuf,

    /// Disposable working directory for in-progress downloads
    pub scratch_dir: PathBuf,

    /// Retry attempts for transient network failures
    pub retry_attempts: u32,

    /// Retry attempts for fragment failures
    pub fragment_retries: u32,

    /// Exponential backoff spec between retries (yt-dlp syntax)
    pub retry_sleep: String,

    /// Chunk size for chunked transfer (bytes)
    pub http_chunk_size: u64,

    /// Connection idle timeout (seconds)
    pub socket_timeout_secs: u64,

    /// Container for merged video downloads
    pub merge_container: String,

    /// Container for extracted audio downloads
    pub audio_container: String,
}

impl Default for AppSettings {
    fn default() -> Self {
        let final_dir = dirs::download_dir()
            .unwrap_or_else(|| PathBuf::from("./downloads"))
            .join("vidfetch");
        // Scratch lives under the final dir so the common move is a
        // same-volume rename.
        let scratch_dir = final_dir.join(".in-progress");

        Self {
            final_dir,
            scratch_dir,
            retry_attempts: 10,
            fragment_retries: 10,
            retry_sleep: "exp=1:30".to_string(),
            http_chunk_size: 10 * 1024 * 1024, // 10 MiB
            socket_timeout_secs: 30,
            merge_container: "mp4".to_string(),
            audio_container: "mp3".to_string(),
        }
    }
}

impl AppSettings {
    /// Point both directories at a user-chosen output location
    pub fn with_output_dir(mut self, output: PathBuf) -> Self {
        self.scratch_dir = output.join(".in-progress");
        self.final_dir = output;
        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_config() {
        let config = AppSettings::default();
        assert!(config.retry_attempts > 0);
        assert!(config.fragment_retries > 0);
        assert!(config.http_chunk_size > 0);
        assert!(config.socket_timeout_secs > 0);
        assert!(config.scratch_dir.starts_with(&config.final_dir));
    }

    #[test]
    fn test_output_dir_override() {
        let config = AppSettings::default().with_output_dir(PathBuf::from("/tmp/out"));
        assert_eq!(config.final_dir, PathBuf::from("/tmp/out"));
        assert_eq!(config.scratch_dir, PathBuf::from("/tmp/out/.in-progress"));
    }
}
