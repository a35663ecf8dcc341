//! Data structures for probed media metadata
//!
//! These are deserialized directly from yt-dlp's JSON output so that the
//! rest of the crate never touches loosely-typed maps.

use serde::{Deserialize, Serialize};

/// Metadata for a single video, as returned by a probe
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct VideoInfo {
    pub id: String,
    pub title: String,
    // The top-level `url` key in probe JSON is the resolved media URL of the
    // default format, not the page; only `webpage_url` identifies the video.
    #[serde(rename = "webpage_url")]
    pub url: String,
    #[serde(default)]
    pub duration: Option<f64>,
    pub uploader: Option<String>,
    #[serde(default)]
    pub formats: Vec<Format>,
    pub extractor: Option<String>,
}

/// One concrete encoding/resolution/container option for a video
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Format {
    pub format_id: String,
    pub ext: String,
    pub resolution: Option<String>,
    #[serde(default)]
    pub filesize: Option<u64>,
    pub vcodec: Option<String>,
    pub acodec: Option<String>,
    pub format_note: Option<String>,
    pub width: Option<u32>,
    pub height: Option<u32>,
    pub tbr: Option<f32>,
    pub abr: Option<f32>,
}

impl Format {
    /// Resolution label used for display and deduplication.
    ///
    /// yt-dlp reports "audio only" in the resolution field for audio-only
    /// streams; video streams without one get a label derived from height.
    pub fn resolution_label(&self) -> String {
        if let Some(res) = &self.resolution {
            return res.clone();
        }
        match self.height {
            Some(h) => format!("{}p", h),
            None => "unknown".to_string(),
        }
    }

    /// True when the format carries an audio stream but no video stream.
    ///
    /// Storyboard pseudo formats report "none" for both codecs, so a
    /// missing video codec alone is not enough.
    pub fn is_audio_only(&self) -> bool {
        let no_video = self
            .vcodec
            .as_deref()
            .map_or(true, |v| v == "none" || v.is_empty());
        let has_audio = self
            .acodec
            .as_deref()
            .map_or(false, |a| a != "none" && !a.is_empty());
        no_video && has_audio
    }
}

/// Configuration bundle handed to the fetcher for one download.
///
/// Everything here is passed straight through to yt-dlp; the coordination
/// layer only decides the values.
#[derive(Debug, Clone)]
pub struct FetchOptions {
    /// yt-dlp format specification, e.g. "137+bestaudio/137" or "251"
    pub format_spec: String,
    /// Container to merge split audio/video streams into
    pub merge_container: Option<String>,
    /// Extract audio instead of keeping a video container
    pub extract_audio: bool,
    /// Target audio container when extracting, e.g. "mp3"
    pub audio_format: Option<String>,
    /// Full output template passed as `-o`
    pub output_template: std::path::PathBuf,
    /// Retry count for transient network failures
    pub retries: u32,
    /// Retry count for fragment failures
    pub fragment_retries: u32,
    /// yt-dlp retry-sleep spec, e.g. "exp=1:30"
    pub retry_sleep: String,
    /// Chunked transfer size in bytes
    pub http_chunk_size: u64,
    /// Connection idle timeout in seconds
    pub socket_timeout: u64,
}

/// Playlist metadata from a flat-playlist probe
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PlaylistInfo {
    pub id: String,
    pub title: String,
    #[serde(default)]
    pub entries: Vec<PlaylistEntry>,
}

/// One entry of a flat playlist (no format data until probed individually)
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PlaylistEntry {
    pub id: String,
    pub title: Option<String>,
    pub url: String,
}
