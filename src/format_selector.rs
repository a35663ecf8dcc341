//! Format selection logic
//!
//! Converts the raw format list from a probe into a ranked, deduplicated
//! sequence of video formats plus at most one best audio-only format.
//! Pure functions of the input metadata; no side effects.

use crate::extractor::Format;
use std::collections::HashSet;

/// Ranked selection produced from one probe
#[derive(Debug, Clone)]
pub struct RankedFormats {
    /// Video formats, one per resolution label, best resolution first
    pub video: Vec<Format>,
    /// Best standalone audio-only format, if the site serves one
    pub best_audio: Option<Format>,
}

impl RankedFormats {
    pub fn is_empty(&self) -> bool {
        self.video.is_empty() && self.best_audio.is_none()
    }
}

/// Format selector over an immutable format snapshot
pub struct FormatSelector;

impl FormatSelector {
    /// Rank and deduplicate the formats of one media item
    pub fn rank(formats: &[Format]) -> RankedFormats {
        RankedFormats {
            video: Self::ranked_video(formats),
            best_audio: Self::best_audio(formats),
        }
    }

    /// Deduplicated video formats, descending by height.
    ///
    /// Keeps at most one entry per distinct resolution label (first seen
    /// wins), excluding "audio only" and the mhtml thumbnail-sheet pseudo
    /// format. Unknown heights sort last.
    pub fn ranked_video(formats: &[Format]) -> Vec<Format> {
        let mut seen_labels = HashSet::new();
        let mut video: Vec<Format> = formats
            .iter()
            .filter(|f| f.ext != "mhtml")
            .filter(|f| f.resolution_label() != "audio only")
            .filter(|f| seen_labels.insert(f.resolution_label()))
            .cloned()
            .collect();

        // Stable sort keeps first-seen order among equal heights
        video.sort_by_key(|f| std::cmp::Reverse(f.height.unwrap_or(0)));
        video
    }

    /// Best audio-only format by average bitrate.
    ///
    /// Ties are broken by first-seen order; `None` for input without any
    /// audio-only format (absence is valid, not an error).
    pub fn best_audio(formats: &[Format]) -> Option<Format> {
        let mut best: Option<&Format> = None;

        for format in formats.iter().filter(|f| f.is_audio_only()) {
            let abr = format.abr.unwrap_or(0.0);
            match best {
                Some(current) if abr <= current.abr.unwrap_or(0.0) => {}
                _ => best = Some(format),
            }
        }

        best.cloned()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn video_format(id: &str, label: &str, height: Option<u32>, ext: &str) -> Format {
        Format {
            format_id: id.to_string(),
            ext: ext.to_string(),
            resolution: Some(label.to_string()),
            filesize: None,
            vcodec: Some("avc1.640028".to_string()),
            acodec: Some("none".to_string()),
            format_note: None,
            width: height.map(|h| h * 16 / 9),
            height,
            tbr: None,
            abr: None,
        }
    }

    fn audio_format(id: &str, abr: Option<f32>) -> Format {
        Format {
            format_id: id.to_string(),
            ext: "webm".to_string(),
            resolution: Some("audio only".to_string()),
            filesize: None,
            vcodec: Some("none".to_string()),
            acodec: Some("opus".to_string()),
            format_note: None,
            width: None,
            height: None,
            tbr: None,
            abr,
        }
    }

    #[test]
    fn dedup_keeps_first_seen_per_label() {
        let formats = vec![
            video_format("a", "1080p", Some(1080), "mp4"),
            video_format("b", "1080p", Some(1080), "webm"),
            video_format("c", "720p", Some(720), "mp4"),
            audio_format("d", Some(128.0)),
            audio_format("e", Some(160.0)),
        ];

        let ranked = FormatSelector::rank(&formats);

        assert_eq!(ranked.video.len(), 2);
        assert_eq!(ranked.video[0].format_id, "a");
        assert_eq!(ranked.video[0].ext, "mp4");
        assert_eq!(ranked.video[1].format_id, "c");
        assert_eq!(ranked.best_audio.unwrap().format_id, "e");
    }

    #[test]
    fn no_duplicate_labels_in_output() {
        let formats = vec![
            video_format("a", "720p", Some(720), "mp4"),
            video_format("b", "720p", Some(720), "mp4"),
            video_format("c", "480p", Some(480), "mp4"),
            video_format("d", "480p", Some(480), "webm"),
        ];

        let video = FormatSelector::ranked_video(&formats);
        let mut labels: Vec<String> = video.iter().map(|f| f.resolution_label()).collect();
        let before = labels.len();
        labels.dedup();
        assert_eq!(labels.len(), before);
    }

    #[test]
    fn ordering_non_increasing_in_height() {
        let formats = vec![
            video_format("a", "360p", Some(360), "mp4"),
            video_format("b", "1080p", Some(1080), "mp4"),
            video_format("c", "720p", Some(720), "mp4"),
        ];

        let video = FormatSelector::ranked_video(&formats);
        let heights: Vec<u32> = video.iter().map(|f| f.height.unwrap_or(0)).collect();
        assert!(heights.windows(2).all(|w| w[0] >= w[1]));
    }

    #[test]
    fn unknown_height_sorts_last() {
        let formats = vec![
            video_format("a", "storyboard", None, "webp"),
            video_format("b", "480p", Some(480), "mp4"),
        ];

        let video = FormatSelector::ranked_video(&formats);
        assert_eq!(video.last().unwrap().format_id, "a");
    }

    #[test]
    fn mhtml_thumbnail_sheets_excluded() {
        let formats = vec![
            video_format("sb0", "48x27", Some(27), "mhtml"),
            video_format("a", "720p", Some(720), "mp4"),
        ];

        let video = FormatSelector::ranked_video(&formats);
        assert_eq!(video.len(), 1);
        assert_eq!(video[0].format_id, "a");
    }

    #[test]
    fn best_audio_none_for_empty_or_all_video() {
        assert!(FormatSelector::best_audio(&[]).is_none());

        let all_video = vec![video_format("a", "720p", Some(720), "mp4")];
        assert!(FormatSelector::best_audio(&all_video).is_none());
    }

    #[test]
    fn best_audio_tie_breaks_first_seen() {
        let formats = vec![
            audio_format("first", Some(128.0)),
            audio_format("second", Some(128.0)),
        ];

        assert_eq!(
            FormatSelector::best_audio(&formats).unwrap().format_id,
            "first"
        );
    }

    #[test]
    fn best_audio_never_picks_storyboards() {
        // Storyboard sheets have no codecs at all; without a real
        // audio-only stream there is no best audio
        let mut storyboard = video_format("sb0", "48x27", Some(27), "mhtml");
        storyboard.vcodec = Some("none".to_string());
        storyboard.acodec = Some("none".to_string());
        let video = video_format("22", "720p", Some(720), "mp4");

        assert!(FormatSelector::best_audio(&[storyboard.clone(), video]).is_none());

        // With a real audio stream present, the storyboard still loses
        let audio = audio_format("251", Some(48.0));
        let best = FormatSelector::best_audio(&[storyboard, audio]).unwrap();
        assert_eq!(best.format_id, "251");
    }

    #[test]
    fn best_audio_handles_missing_bitrate() {
        let formats = vec![audio_format("a", None), audio_format("b", Some(48.0))];
        assert_eq!(FormatSelector::best_audio(&formats).unwrap().format_id, "b");
    }
}
