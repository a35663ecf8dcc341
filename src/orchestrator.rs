//! Download orchestration
//!
//! Drives one fetch through the media source, reconciles the artifact path,
//! and records the outcome on the item. Fetch and filesystem failures are
//! caught here and recorded as item status, never propagated to the session.

use crate::extractor::{FetchOptions, MediaSource, VideoInfo};
use crate::placement::FilePlacement;
use crate::utils::{AppSettings, VidfetchError};
use anyhow::Result;
use std::path::PathBuf;
use std::sync::Arc;
use tracing::{error, info, warn};
use uuid::Uuid;

/// Lifecycle of one download
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum MediaStatus {
    Pending,
    Downloading,
    Finished,
    Error,
}

impl MediaStatus {
    /// Finished and Error are terminal
    pub fn is_terminal(&self) -> bool {
        matches!(self, Self::Finished | Self::Error)
    }
}

/// One video being downloaded, exclusively owned by the session
#[derive(Debug, Clone)]
pub struct MediaItem {
    pub id: Uuid,
    pub url: String,
    pub title: String,
    pub status: MediaStatus,
    pub final_path: Option<PathBuf>,
}

impl MediaItem {
    pub fn new(url: impl Into<String>, title: impl Into<String>) -> Self {
        Self {
            id: Uuid::new_v4(),
            url: url.into(),
            title: title.into(),
            status: MediaStatus::Pending,
            final_path: None,
        }
    }
}

/// Height-or-audio tag carried by a selection
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SelectionTag {
    Video { label: String },
    Audio,
}

impl SelectionTag {
    pub fn label(&self) -> &str {
        match self {
            Self::Video { label } => label,
            Self::Audio => "audio",
        }
    }
}

/// A resolved user choice: one format id out of the presented ranked set
#[derive(Debug, Clone)]
pub struct SelectionChoice {
    pub format_id: String,
    pub tag: SelectionTag,
}

/// Issues fetches and places finished artifacts
pub struct Orchestrator {
    source: Arc<dyn MediaSource>,
    placement: FilePlacement,
    settings: AppSettings,
}

impl Orchestrator {
    pub fn new(source: Arc<dyn MediaSource>, placement: FilePlacement, settings: AppSettings) -> Self {
        Self {
            source,
            placement,
            settings,
        }
    }

    /// Download one item with the chosen format.
    ///
    /// Every failure path ends with `MediaStatus::Error` on the item; the
    /// session decides what to report.
    pub async fn download(
        &self,
        item: &mut MediaItem,
        choice: &SelectionChoice,
        subdir: Option<&str>,
    ) {
        item.status = MediaStatus::Downloading;
        info!("Downloading '{}' as {}", item.title, choice.tag.label());

        match self.fetch_and_place(item, choice, subdir).await {
            Ok(path) => {
                info!("Finished '{}' -> {:?}", item.title, path);
                item.final_path = Some(path);
                item.status = MediaStatus::Finished;
            }
            Err(e) => {
                error!("Download of '{}' failed: {:#}", item.title, e);
                item.status = MediaStatus::Error;
            }
        }
    }

    async fn fetch_and_place(
        &self,
        item: &MediaItem,
        choice: &SelectionChoice,
        subdir: Option<&str>,
    ) -> Result<PathBuf> {
        self.placement.ensure_directories().await?;

        let options = self.build_fetch_options(&item.title, choice);
        let reported = self.source.fetch(&item.url, &options).await?;

        let artifact = self.resolve_artifact(&item.title, choice, reported)?;
        let placed = self.placement.move_to_final(&artifact, subdir).await?;
        Ok(placed)
    }

    /// Build the configuration bundle handed to the fetcher.
    ///
    /// Video choices request the chosen format merged with the best audio
    /// track (split-stream sites); audio choices request extraction into a
    /// compressed audio container.
    pub fn build_fetch_options(&self, title: &str, choice: &SelectionChoice) -> FetchOptions {
        let stem = self.artifact_stem(title, choice);
        let output_template = self.settings.scratch_dir.join(format!("{}.%(ext)s", stem));

        let (format_spec, merge_container, extract_audio, audio_format) = match choice.tag {
            SelectionTag::Video { .. } => (
                format!("{}+bestaudio/{}", choice.format_id, choice.format_id),
                Some(self.settings.merge_container.clone()),
                false,
                None,
            ),
            SelectionTag::Audio => (
                choice.format_id.clone(),
                None,
                true,
                Some(self.settings.audio_container.clone()),
            ),
        };

        FetchOptions {
            format_spec,
            merge_container,
            extract_audio,
            audio_format,
            output_template,
            retries: self.settings.retry_attempts,
            fragment_retries: self.settings.fragment_retries,
            retry_sleep: self.settings.retry_sleep.clone(),
            http_chunk_size: self.settings.http_chunk_size,
            socket_timeout: self.settings.socket_timeout_secs,
        }
    }

    /// Expected filename stem for a download: sanitized "title [tag]"
    fn artifact_stem(&self, title: &str, choice: &SelectionChoice) -> String {
        FilePlacement::sanitize_filename(&format!("{} [{}]", title, choice.tag.label()))
    }

    /// Expected artifact location in the scratch directory
    pub fn expected_artifact(&self, title: &str, choice: &SelectionChoice) -> PathBuf {
        let ext = match choice.tag {
            SelectionTag::Video { .. } => &self.settings.merge_container,
            SelectionTag::Audio => &self.settings.audio_container,
        };
        self.settings
            .scratch_dir
            .join(format!("{}.{}", self.artifact_stem(title, choice), ext))
    }

    /// Best-effort reconciliation of expected vs reported artifact paths.
    ///
    /// Extractors occasionally pick a different extension or name than the
    /// template implies, so the literal reported path is the fallback.
    fn resolve_artifact(
        &self,
        title: &str,
        choice: &SelectionChoice,
        reported: PathBuf,
    ) -> Result<PathBuf> {
        let expected = self.expected_artifact(title, choice);
        if expected.exists() {
            return Ok(expected);
        }

        if reported.exists() {
            warn!(
                "Expected artifact {:?} absent, using reported path {:?}",
                expected, reported
            );
            return Ok(reported);
        }

        Err(VidfetchError::DownloadError(format!(
            "artifact missing after fetch: expected {:?}, reported {:?}",
            expected, reported
        ))
        .into())
    }
}

/// Build a pending item from probed metadata
pub fn item_from_info(info: &VideoInfo) -> MediaItem {
    MediaItem::new(info.url.clone(), info.title.clone())
}
