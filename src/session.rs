//! Interactive session driver
//!
//! Sequences one download end to end: prompt for a URL until the source
//! resolves metadata, present the ranked format menu, prompt for a
//! selection, download, report, and unconditionally clean the scratch
//! directory. Playlists resolve to a flat entry list; the menu is built from
//! the first entry's probe and the chosen format applies to every entry.

use crate::extractor::{MediaSource, PlaylistInfo, VideoInfo};
use crate::format_selector::{FormatSelector, RankedFormats};
use crate::orchestrator::{item_from_info, MediaItem, MediaStatus, Orchestrator, SelectionChoice, SelectionTag};
use crate::placement::FilePlacement;
use crate::utils::VidfetchError;
use anyhow::{bail, Result};
use regex::Regex;
use std::sync::{Arc, OnceLock};
use tokio::io::{AsyncBufReadExt, BufReader, Lines, Stdin};
use tracing::{info, warn};

/// One rendered menu line and the choice it resolves to
#[derive(Debug, Clone)]
pub struct MenuEntry {
    pub display: String,
    pub choice: SelectionChoice,
}

/// Interactive session over stdin/stdout
pub struct Session {
    source: Arc<dyn MediaSource>,
    orchestrator: Orchestrator,
    placement: FilePlacement,
    initial_url: Option<String>,
}

/// What a URL resolved to
enum Resolved {
    Single(VideoInfo),
    Playlist {
        playlist: PlaylistInfo,
        sample: VideoInfo,
    },
}

impl Session {
    pub fn new(
        source: Arc<dyn MediaSource>,
        orchestrator: Orchestrator,
        placement: FilePlacement,
        initial_url: Option<String>,
    ) -> Self {
        Self {
            source,
            orchestrator,
            placement,
            initial_url,
        }
    }

    /// Run the session to completion.
    ///
    /// Cleanup runs before returning on every path except a failed prompt
    /// read (closed stdin), which the caller handles via the same cleanup
    /// handle the signal watcher holds.
    pub async fn run(mut self) -> Result<()> {
        let mut lines = BufReader::new(tokio::io::stdin()).lines();

        let resolved = self.resolve_metadata(&mut lines).await?;

        let ranked = match &resolved {
            Resolved::Single(info) => FormatSelector::rank(&info.formats),
            Resolved::Playlist { sample, .. } => FormatSelector::rank(&sample.formats),
        };

        if ranked.is_empty() {
            println!("No downloadable formats were found for this URL.");
            self.cleanup().await;
            return Ok(());
        }

        let menu = build_menu(&ranked);
        println!("Available qualities:");
        for (i, entry) in menu.iter().enumerate() {
            println!("{}. {}", i + 1, entry.display);
        }

        let choice = self.prompt_selection(&mut lines, &menu).await?;
        info!("Selected format {} ({})", choice.format_id, choice.tag.label());

        let items = match resolved {
            Resolved::Single(info) => {
                let mut item = item_from_info(&info);
                self.orchestrator.download(&mut item, &choice, None).await;
                vec![item]
            }
            Resolved::Playlist { playlist, .. } => {
                self.download_playlist(&playlist, &choice).await
            }
        };

        for item in &items {
            report_outcome(item);
        }

        self.cleanup().await;
        Ok(())
    }

    /// AwaitingURL: re-prompt until the source resolves metadata
    async fn resolve_metadata(&mut self, lines: &mut Lines<BufReader<Stdin>>) -> Result<Resolved> {
        loop {
            let url = match self.initial_url.take() {
                Some(url) => url,
                None => prompt(lines, "Enter the video or playlist URL: ").await?,
            };
            let url = url.trim().to_string();

            if let Err(e) = validate_url(&url) {
                println!("{}. Please try again.", e);
                continue;
            }

            println!("Resolving metadata...");

            if is_playlist_url(&url) {
                let playlist = match self.source.probe_playlist(&url).await {
                    Ok(playlist) => playlist,
                    Err(e) => {
                        warn!("Playlist probe failed: {:#}", e);
                        println!("Could not resolve that playlist. Please try another URL.");
                        continue;
                    }
                };
                let Some(first) = playlist.entries.first() else {
                    println!("That playlist is empty. Please try another URL.");
                    continue;
                };
                match self.source.probe(&first.url).await {
                    Ok(sample) => return Ok(Resolved::Playlist { playlist, sample }),
                    Err(e) => {
                        warn!("Probe of first playlist entry failed: {:#}", e);
                        println!("Could not resolve that playlist. Please try another URL.");
                        continue;
                    }
                }
            }

            match self.source.probe(&url).await {
                Ok(info) => {
                    println!("Found: {}", info.title);
                    return Ok(Resolved::Single(info));
                }
                Err(e) => {
                    warn!("Probe failed: {:#}", e);
                    println!("Could not resolve that URL. Please try again.");
                }
            }
        }
    }

    /// AwaitingSelection: re-prompt indefinitely on bad input
    async fn prompt_selection(
        &self,
        lines: &mut Lines<BufReader<Stdin>>,
        menu: &[MenuEntry],
    ) -> Result<SelectionChoice> {
        loop {
            let input = prompt(lines, "Select the desired quality: ").await?;
            match parse_selection(&input, menu.len()) {
                Ok(index) => return Ok(menu[index].choice.clone()),
                Err(e) => println!("{}.", e),
            }
        }
    }

    /// Download every playlist entry with the chosen selection
    async fn download_playlist(
        &self,
        playlist: &PlaylistInfo,
        choice: &SelectionChoice,
    ) -> Vec<MediaItem> {
        println!(
            "Downloading playlist '{}' ({} entries)...",
            playlist.title,
            playlist.entries.len()
        );

        let mut items = Vec::with_capacity(playlist.entries.len());
        for entry in &playlist.entries {
            let title = entry.title.clone().unwrap_or_else(|| entry.id.clone());
            let mut item = MediaItem::new(entry.url.clone(), title);
            self.orchestrator
                .download(&mut item, choice, Some(&playlist.title))
                .await;
            items.push(item);
        }
        items
    }

    /// Unconditional scratch sweep; failures are logged, never fatal
    async fn cleanup(&self) {
        if let Err(e) = self.placement.cleanup_scratch().await {
            warn!("Scratch cleanup failed: {:#}", e);
        }
    }
}

/// Read one line after printing a prompt; a closed stdin ends the session
async fn prompt(lines: &mut Lines<BufReader<Stdin>>, message: &str) -> Result<String> {
    use std::io::Write;
    print!("{}", message);
    std::io::stdout().flush()?;

    match lines.next_line().await? {
        Some(line) => Ok(line),
        None => bail!("standard input closed"),
    }
}

/// Render the ranked list plus one trailing best-audio entry
pub fn build_menu(ranked: &RankedFormats) -> Vec<MenuEntry> {
    let mut menu: Vec<MenuEntry> = ranked
        .video
        .iter()
        .map(|f| {
            let label = f.resolution_label();
            MenuEntry {
                display: format!("{} ({})", label, f.ext),
                choice: SelectionChoice {
                    format_id: f.format_id.clone(),
                    tag: SelectionTag::Video { label },
                },
            }
        })
        .collect();

    if let Some(audio) = &ranked.best_audio {
        let display = match audio.abr {
            Some(abr) => format!("Best audio ({:.0} kbps)", abr),
            None => "Best audio".to_string(),
        };
        menu.push(MenuEntry {
            display,
            choice: SelectionChoice {
                format_id: audio.format_id.clone(),
                tag: SelectionTag::Audio,
            },
        });
    }

    menu
}

/// Parse a 1-based menu index; any error re-prompts
pub fn parse_selection(input: &str, menu_len: usize) -> Result<usize, VidfetchError> {
    let out_of_range = || {
        VidfetchError::InvalidSelection(format!(
            "enter a number between 1 and {}",
            menu_len
        ))
    };
    let index: usize = input.trim().parse().map_err(|_| out_of_range())?;
    if index >= 1 && index <= menu_len {
        Ok(index - 1)
    } else {
        Err(out_of_range())
    }
}

/// Reject anything that is not a recognizable video or playlist URL
pub fn validate_url(url: &str) -> Result<(), VidfetchError> {
    if url.is_empty() {
        return Err(VidfetchError::InvalidUrl("empty input".to_string()));
    }
    if !is_supported_url(url) {
        return Err(VidfetchError::InvalidUrl(url.to_string()));
    }
    Ok(())
}

/// Accept YouTube watch/share/playlist URL shapes, as the original site
/// frontend produces them
pub fn is_supported_url(url: &str) -> bool {
    static SUPPORTED_URL: OnceLock<Regex> = OnceLock::new();
    let pattern = SUPPORTED_URL.get_or_init(|| {
        Regex::new(
            r"^(https?://)?(www\.)?(youtube\.com/(watch\?|playlist\?|embed/|v/|shorts/)|youtu\.be/)",
        )
        .expect("static regex")
    });
    pattern.is_match(url)
}

/// Playlist URLs carry a list parameter without a single watch id
pub fn is_playlist_url(url: &str) -> bool {
    url.contains("playlist?list=")
}

/// Report a finished item's outcome to the user
fn report_outcome(item: &MediaItem) {
    match (&item.status, &item.final_path) {
        (MediaStatus::Finished, Some(path)) => {
            println!("Download completed: {}", path.display());
        }
        _ => {
            println!("Download failed: {}", item.title);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::extractor::Format;

    fn format(id: &str, label: &str, height: Option<u32>, audio: bool) -> Format {
        Format {
            format_id: id.to_string(),
            ext: "mp4".to_string(),
            resolution: Some(label.to_string()),
            filesize: None,
            vcodec: Some(if audio { "none" } else { "avc1" }.to_string()),
            acodec: Some(if audio { "opus" } else { "none" }.to_string()),
            format_note: None,
            width: None,
            height,
            tbr: None,
            abr: if audio { Some(160.0) } else { None },
        }
    }

    #[test]
    fn menu_appends_best_audio_last() {
        let formats = vec![
            format("137", "1080p", Some(1080), false),
            format("22", "720p", Some(720), false),
            format("251", "audio only", None, true),
        ];
        let ranked = FormatSelector::rank(&formats);
        let menu = build_menu(&ranked);

        assert_eq!(menu.len(), 3);
        assert_eq!(menu[0].display, "1080p (mp4)");
        assert_eq!(menu[2].choice.tag, SelectionTag::Audio);
        assert!(menu[2].display.contains("160"));
    }

    #[test]
    fn menu_without_audio_has_no_audio_entry() {
        let formats = vec![format("22", "720p", Some(720), false)];
        let ranked = FormatSelector::rank(&formats);
        let menu = build_menu(&ranked);

        assert_eq!(menu.len(), 1);
        assert!(matches!(menu[0].choice.tag, SelectionTag::Video { .. }));
    }

    #[test]
    fn selection_parses_valid_indices() {
        assert_eq!(parse_selection("1", 3).unwrap(), 0);
        assert_eq!(parse_selection(" 3 ", 3).unwrap(), 2);
    }

    #[test]
    fn selection_rejects_out_of_range_and_garbage() {
        for input in ["0", "4", "abc", "", "-1"] {
            let err = parse_selection(input, 3).unwrap_err();
            assert!(matches!(err, VidfetchError::InvalidSelection(_)));
        }
    }

    #[test]
    fn url_validation_returns_typed_errors() {
        assert!(matches!(
            validate_url(""),
            Err(VidfetchError::InvalidUrl(_))
        ));
        assert!(matches!(
            validate_url("https://example.com/watch?v=abc"),
            Err(VidfetchError::InvalidUrl(_))
        ));
        assert!(validate_url("https://youtu.be/dQw4w9WgXcQ").is_ok());
    }

    #[test]
    fn url_validation_accepts_known_shapes() {
        assert!(is_supported_url("https://www.youtube.com/watch?v=dQw4w9WgXcQ"));
        assert!(is_supported_url("youtu.be/dQw4w9WgXcQ"));
        assert!(is_supported_url(
            "https://www.youtube.com/playlist?list=PL123"
        ));
        assert!(is_supported_url("https://youtube.com/shorts/abc123"));
    }

    #[test]
    fn url_validation_rejects_other_input() {
        assert!(!is_supported_url(""));
        assert!(!is_supported_url("not a url"));
        assert!(!is_supported_url("https://example.com/watch?v=abc"));
    }

    #[test]
    fn playlist_detection() {
        assert!(is_playlist_url(
            "https://www.youtube.com/playlist?list=PL123"
        ));
        assert!(!is_playlist_url("https://www.youtube.com/watch?v=abc"));
    }
}
