//! File placement for completed downloads
//!
//! Owns the scratch and final directories: sanitizes names, moves finished
//! artifacts into place, and sweeps the scratch directory clean on exit.

use anyhow::{Context, Result};
use chrono::Utc;
use std::path::{Path, PathBuf};
use tokio::fs;
use tracing::{debug, info, warn};

/// Manages the scratch and final directories for one session
#[derive(Debug, Clone)]
pub struct FilePlacement {
    scratch_dir: PathBuf,
    final_dir: PathBuf,
}

impl FilePlacement {
    pub fn new(scratch_dir: PathBuf, final_dir: PathBuf) -> Self {
        Self {
            scratch_dir,
            final_dir,
        }
    }

    pub fn scratch_dir(&self) -> &Path {
        &self.scratch_dir
    }

    pub fn final_dir(&self) -> &Path {
        &self.final_dir
    }

    /// Create both directories if absent
    pub async fn ensure_directories(&self) -> Result<()> {
        fs::create_dir_all(&self.scratch_dir)
            .await
            .context("Failed to create scratch directory")?;
        fs::create_dir_all(&self.final_dir)
            .await
            .context("Failed to create final directory")?;
        Ok(())
    }

    /// Sanitizes a filename by replacing characters disallowed in common
    /// filesystems with an underscore.
    ///
    /// Idempotent: sanitizing an already-sanitized name is a no-op.
    ///
    /// # Examples
    /// ```
    /// use vidfetch::placement::FilePlacement;
    /// assert_eq!(FilePlacement::sanitize_filename("a/b:c"), "a_b_c");
    /// assert_eq!(FilePlacement::sanitize_filename("clean.mp4"), "clean.mp4");
    /// ```
    pub fn sanitize_filename(name: &str) -> String {
        // Characters invalid on Windows/macOS/Linux filesystems
        let invalid_chars = ['/', '\\', '*', '?', ':', '"', '<', '>', '|', '\0'];

        name.chars()
            .map(|c| if invalid_chars.contains(&c) { '_' } else { c })
            .collect()
    }

    /// Move a finished artifact from scratch into the final directory.
    ///
    /// `subdir` places the artifact in a named subfolder (playlists). The
    /// name is sanitized; a conflicting destination gets a timestamp prefix.
    /// Rename is tried first, with copy+delete as the cross-device fallback.
    pub async fn move_to_final(&self, source: &Path, subdir: Option<&str>) -> Result<PathBuf> {
        let target_dir = match subdir {
            Some(name) => self.final_dir.join(Self::sanitize_filename(name)),
            None => self.final_dir.clone(),
        };

        fs::create_dir_all(&target_dir)
            .await
            .context("Failed to create target directory")?;

        let file_name = source
            .file_name()
            .and_then(|n| n.to_str())
            .context("Artifact has no usable file name")?;
        let file_name = Self::sanitize_filename(file_name);

        let mut target_path = target_dir.join(&file_name);
        if target_path.exists() {
            warn!("Target already exists, adding timestamp: {:?}", target_path);
            let timestamp = Utc::now().format("%Y%m%d_%H%M%S");
            target_path = target_dir.join(format!("{}_{}", timestamp, file_name));
        }

        debug!("Moving {:?} -> {:?}", source, target_path);

        // Same-volume rename first, copy+delete across devices
        match fs::rename(source, &target_path).await {
            Ok(()) => {}
            Err(rename_err) => {
                debug!("Rename failed ({}), falling back to copy", rename_err);
                fs::copy(source, &target_path)
                    .await
                    .context("Failed to copy artifact to final directory")?;
                fs::remove_file(source)
                    .await
                    .context("Failed to remove artifact from scratch")?;
            }
        }

        info!("Placed artifact at {:?}", target_path);
        Ok(target_path)
    }

    /// Remove every entry under the scratch directory.
    ///
    /// Individual deletion failures are logged and skipped; the sweep never
    /// aborts. A missing scratch directory counts as already clean.
    pub async fn cleanup_scratch(&self) -> Result<usize> {
        let mut entries = match fs::read_dir(&self.scratch_dir).await {
            Ok(entries) => entries,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                debug!("Scratch directory absent, nothing to clean");
                return Ok(0);
            }
            Err(e) => return Err(e).context("Failed to read scratch directory"),
        };

        let mut removed = 0usize;
        loop {
            let entry = match entries.next_entry().await {
                Ok(Some(entry)) => entry,
                Ok(None) => break,
                Err(e) => {
                    warn!("Failed to read scratch entry: {}", e);
                    break;
                }
            };

            let path = entry.path();
            // symlink_metadata so symlinks are removed, not followed
            let is_dir = match fs::symlink_metadata(&path).await {
                Ok(meta) => meta.is_dir(),
                Err(e) => {
                    warn!("Failed to stat {:?}: {}", path, e);
                    continue;
                }
            };

            let result = if is_dir {
                fs::remove_dir_all(&path).await
            } else {
                fs::remove_file(&path).await
            };

            match result {
                Ok(()) => {
                    debug!("Removed scratch entry {:?}", path);
                    removed += 1;
                }
                Err(e) => warn!("Failed to remove {:?}: {}", path, e),
            }
        }

        info!("Scratch cleanup removed {} entries", removed);
        Ok(removed)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    fn placement(temp: &TempDir) -> FilePlacement {
        FilePlacement::new(temp.path().join("scratch"), temp.path().join("final"))
    }

    #[test]
    fn sanitize_replaces_invalid_characters() {
        assert_eq!(
            FilePlacement::sanitize_filename(r#"a/b\c*d?e:f"g<h>i|j"#),
            "a_b_c_d_e_f_g_h_i_j"
        );
    }

    #[test]
    fn sanitize_keeps_safe_names() {
        assert_eq!(
            FilePlacement::sanitize_filename("Some Video [1080p].mp4"),
            "Some Video [1080p].mp4"
        );
    }

    #[test]
    fn sanitize_is_idempotent() {
        let messy = r#"we|ird: "name"?.mp4"#;
        let once = FilePlacement::sanitize_filename(messy);
        let twice = FilePlacement::sanitize_filename(&once);
        assert_eq!(once, twice);
    }

    #[tokio::test]
    async fn move_places_file_in_final_dir() {
        let temp = TempDir::new().expect("temp dir");
        let placement = placement(&temp);
        placement.ensure_directories().await.expect("dirs");

        let source = placement.scratch_dir().join("clip [720p].mp4");
        fs::write(&source, b"data").await.expect("write");

        let target = placement.move_to_final(&source, None).await.expect("move");

        assert!(!source.exists());
        assert!(target.exists());
        assert_eq!(target.parent().unwrap(), placement.final_dir());
    }

    #[tokio::test]
    async fn move_sanitizes_target_name() {
        let temp = TempDir::new().expect("temp dir");
        let placement = placement(&temp);
        placement.ensure_directories().await.expect("dirs");

        let source = placement.scratch_dir().join("odd name.mp4");
        fs::write(&source, b"data").await.expect("write");

        let target = placement
            .move_to_final(&source, Some("My Playlist: Vol 1"))
            .await
            .expect("move");

        assert!(target
            .parent()
            .unwrap()
            .ends_with("My Playlist_ Vol 1"));
    }

    #[tokio::test]
    async fn move_resolves_conflicts_with_timestamp() {
        let temp = TempDir::new().expect("temp dir");
        let placement = placement(&temp);
        placement.ensure_directories().await.expect("dirs");

        fs::write(placement.final_dir().join("clip.mp4"), b"old")
            .await
            .expect("write existing");
        let source = placement.scratch_dir().join("clip.mp4");
        fs::write(&source, b"new").await.expect("write");

        let target = placement.move_to_final(&source, None).await.expect("move");

        assert_ne!(target, placement.final_dir().join("clip.mp4"));
        assert!(target.exists());
    }

    #[tokio::test]
    async fn cleanup_removes_files_and_subdirectories() {
        let temp = TempDir::new().expect("temp dir");
        let placement = placement(&temp);
        placement.ensure_directories().await.expect("dirs");

        fs::write(placement.scratch_dir().join("part.f137.mp4"), b"x")
            .await
            .expect("write");
        let nested = placement.scratch_dir().join("fragments");
        fs::create_dir(&nested).await.expect("mkdir");
        fs::write(nested.join("frag0"), b"x").await.expect("write");

        let removed = placement.cleanup_scratch().await.expect("cleanup");

        assert_eq!(removed, 2);
        let mut entries = fs::read_dir(placement.scratch_dir()).await.expect("read");
        assert!(entries.next_entry().await.expect("next").is_none());
    }

    #[cfg(unix)]
    #[tokio::test]
    async fn cleanup_removes_symlinks_without_following() {
        let temp = TempDir::new().expect("temp dir");
        let placement = placement(&temp);
        placement.ensure_directories().await.expect("dirs");

        let outside = temp.path().join("keep.txt");
        fs::write(&outside, b"keep").await.expect("write");
        let link = placement.scratch_dir().join("link");
        tokio::fs::symlink(&outside, &link).await.expect("symlink");

        let removed = placement.cleanup_scratch().await.expect("cleanup");

        assert_eq!(removed, 1);
        assert!(!link.exists());
        assert!(outside.exists());
    }

    #[tokio::test]
    async fn cleanup_of_missing_scratch_is_clean() {
        let temp = TempDir::new().expect("temp dir");
        let placement = placement(&temp);
        // ensure_directories deliberately not called

        let removed = placement.cleanup_scratch().await.expect("cleanup");
        assert_eq!(removed, 0);
    }
}
