//! vidfetch library

pub mod extractor;
pub mod format_selector;
pub mod orchestrator;
pub mod placement;
pub mod session;
pub mod utils;

// Re-export main types for easier use
pub use extractor::{FetchOptions, Format, MediaSource, PlaylistInfo, VideoInfo, YtDlpSource};
pub use format_selector::{FormatSelector, RankedFormats};
pub use orchestrator::{MediaItem, MediaStatus, Orchestrator, SelectionChoice, SelectionTag};
pub use placement::FilePlacement;
pub use session::Session;
pub use utils::{AppSettings, VidfetchError};
