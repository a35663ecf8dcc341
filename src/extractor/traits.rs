use crate::extractor::models::{FetchOptions, PlaylistInfo, VideoInfo};
use anyhow::Result;
use async_trait::async_trait;
use std::path::PathBuf;

/// Core trait for media sources
///
/// This trait isolates the session and orchestrator from the concrete
/// extraction backend (yt-dlp today, anything else tomorrow).
#[async_trait]
pub trait MediaSource: Send + Sync {
    /// Returns a unique identifier for this source (for logging)
    fn id(&self) -> &'static str;

    /// Resolves a URL into video metadata without downloading
    async fn probe(&self, url: &str) -> Result<VideoInfo>;

    /// Resolves a playlist URL into its flat entry list
    async fn probe_playlist(&self, url: &str) -> Result<PlaylistInfo>;

    /// Performs the actual fetch-and-postprocess for one item.
    ///
    /// Returns the artifact path the fetcher reports, which may differ from
    /// the path implied by the output template.
    async fn fetch(&self, url: &str, options: &FetchOptions) -> Result<PathBuf>;
}
