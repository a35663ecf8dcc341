//! yt-dlp wrapper for probing and fetching media
//!
//! Probing uses `--dump-json --no-download`; fetching runs yt-dlp with the
//! resilience flags from [`FetchOptions`] and asks it to print the final
//! artifact path so the caller can reconcile filenames.

use crate::extractor::models::{FetchOptions, PlaylistInfo, VideoInfo};
use crate::extractor::traits::MediaSource;
use crate::utils::error::VidfetchError;
use anyhow::Result;
use async_trait::async_trait;
use std::path::PathBuf;
use std::process::Stdio;
use tokio::process::Command as AsyncCommand;
use tracing::{debug, error, info, warn};

/// Media source backed by the yt-dlp binary
pub struct YtDlpSource {
    ytdlp_path: PathBuf,
}

impl YtDlpSource {
    /// Initialize the source and verify yt-dlp availability
    pub fn new() -> Result<Self> {
        let ytdlp_path = match find_ytdlp() {
            Some(path) => {
                info!("Found yt-dlp at: {}", path.display());
                path
            }
            None => {
                error!("yt-dlp not found anywhere");
                return Err(VidfetchError::YtDlpNotFound.into());
            }
        };

        Ok(Self { ytdlp_path })
    }

    /// Build a source around an explicit binary path (used in tests)
    pub fn with_path(ytdlp_path: PathBuf) -> Self {
        Self { ytdlp_path }
    }

    pub fn ytdlp_path(&self) -> &PathBuf {
        &self.ytdlp_path
    }
}

#[async_trait]
impl MediaSource for YtDlpSource {
    fn id(&self) -> &'static str {
        "yt-dlp"
    }

    /// Extract video information without downloading
    /// Uses: yt-dlp --dump-json --no-download
    async fn probe(&self, url: &str) -> Result<VideoInfo> {
        debug!("Probing URL: {}", url);

        let output = AsyncCommand::new(&self.ytdlp_path)
            .arg("--dump-json")
            .arg("--no-download")
            .arg("--no-warnings")
            .arg(url)
            .output()
            .await
            .map_err(VidfetchError::IoError)?;

        if !output.status.success() {
            let error_msg = String::from_utf8_lossy(&output.stderr);
            error!("yt-dlp probe failed: {}", error_msg);
            return Err(VidfetchError::ExtractionError(error_msg.to_string()).into());
        }

        let json_str = String::from_utf8(output.stdout)?;
        let video_info: VideoInfo =
            serde_json::from_str(&json_str).map_err(VidfetchError::SerializationError)?;

        Ok(video_info)
    }

    /// Extract playlist information
    /// Uses: yt-dlp -J --flat-playlist
    async fn probe_playlist(&self, url: &str) -> Result<PlaylistInfo> {
        debug!("Probing playlist URL: {}", url);

        let output = AsyncCommand::new(&self.ytdlp_path)
            .arg("-J")
            .arg("--flat-playlist")
            .arg("--no-warnings")
            .arg(url)
            .output()
            .await
            .map_err(VidfetchError::IoError)?;

        if !output.status.success() {
            let error_msg = String::from_utf8_lossy(&output.stderr);
            error!("yt-dlp playlist probe failed: {}", error_msg);
            return Err(VidfetchError::ExtractionError(error_msg.to_string()).into());
        }

        let json_str = String::from_utf8(output.stdout)?;
        let playlist: PlaylistInfo =
            serde_json::from_str(&json_str).map_err(VidfetchError::SerializationError)?;

        Ok(playlist)
    }

    /// Download one item with the given options.
    ///
    /// yt-dlp's own progress output stays on inherited stderr so the user
    /// sees it; stdout is piped to capture the printed artifact path.
    async fn fetch(&self, url: &str, options: &FetchOptions) -> Result<PathBuf> {
        debug!(
            "Fetching {} with format spec {}",
            url, options.format_spec
        );

        let mut cmd = AsyncCommand::new(&self.ytdlp_path);
        cmd.arg("-f")
            .arg(&options.format_spec)
            .arg("--no-warnings")
            .arg("--newline")
            .arg("--no-playlist")
            .arg("--retries")
            .arg(options.retries.to_string())
            .arg("--fragment-retries")
            .arg(options.fragment_retries.to_string())
            .arg("--retry-sleep")
            .arg(&options.retry_sleep)
            .arg("--http-chunk-size")
            .arg(options.http_chunk_size.to_string())
            .arg("--socket-timeout")
            .arg(options.socket_timeout.to_string())
            .arg("-o")
            .arg(&options.output_template)
            .arg("--no-simulate")
            .arg("--print")
            .arg("after_move:filepath");

        if options.extract_audio {
            cmd.arg("-x");
            if let Some(audio_format) = &options.audio_format {
                cmd.arg("--audio-format").arg(audio_format);
            }
        } else if let Some(container) = &options.merge_container {
            cmd.arg("--merge-output-format").arg(container);
        }

        cmd.arg(url);
        cmd.stdout(Stdio::piped());
        cmd.stderr(Stdio::inherit());

        let output = cmd.output().await.map_err(VidfetchError::IoError)?;

        if !output.status.success() {
            return Err(VidfetchError::DownloadError(format!(
                "yt-dlp exited with {}",
                output.status
            ))
            .into());
        }

        let stdout = String::from_utf8_lossy(&output.stdout);
        let reported = stdout
            .lines()
            .rev()
            .map(str::trim)
            .find(|line| !line.is_empty())
            .map(PathBuf::from);

        match reported {
            Some(path) => Ok(path),
            None => {
                warn!("yt-dlp did not report an artifact path");
                Err(VidfetchError::DownloadError(
                    "fetcher reported no artifact path".to_string(),
                )
                .into())
            }
        }
    }
}

// ============================================================
// yt-dlp Detection Functions
// ============================================================

/// Find yt-dlp binary with priority:
/// 1. System PATH
/// 2. Common installation paths
pub fn find_ytdlp() -> Option<PathBuf> {
    if let Some(system) = find_in_path() {
        info!("Using system yt-dlp: {:?}", system);
        return Some(system);
    }

    if let Some(common) = find_in_common_paths() {
        info!("Using yt-dlp from common path: {:?}", common);
        return Some(common);
    }

    warn!("yt-dlp not found anywhere");
    None
}

/// Find yt-dlp in system PATH
fn find_in_path() -> Option<PathBuf> {
    if let Ok(path) = which::which("yt-dlp") {
        if path.exists() {
            return Some(path);
        }
    }
    None
}

/// Find yt-dlp in common installation paths
fn find_in_common_paths() -> Option<PathBuf> {
    let common_paths = [
        // macOS Homebrew (Apple Silicon)
        "/opt/homebrew/bin/yt-dlp",
        // macOS Homebrew (Intel)
        "/usr/local/bin/yt-dlp",
        // System
        "/usr/bin/yt-dlp",
        // pip user install
        "~/.local/bin/yt-dlp",
    ];

    for path_str in common_paths {
        let expanded = if let Some(rest) = path_str.strip_prefix("~/") {
            if let Some(home) = dirs::home_dir() {
                home.join(rest)
            } else {
                PathBuf::from(path_str)
            }
        } else {
            PathBuf::from(path_str)
        };

        if expanded.exists() && is_executable(&expanded) {
            return Some(expanded);
        }
    }

    None
}

/// Check if a file is executable
fn is_executable(path: &PathBuf) -> bool {
    #[cfg(unix)]
    {
        use std::os::unix::fs::PermissionsExt;

        if let Ok(metadata) = std::fs::metadata(path) {
            let permissions = metadata.permissions();
            return permissions.mode() & 0o111 != 0;
        }
        false
    }

    #[cfg(not(unix))]
    {
        path.exists()
    }
}
