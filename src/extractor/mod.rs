pub mod models;
pub mod traits;
pub mod ytdlp;

pub use models::{FetchOptions, Format, PlaylistEntry, PlaylistInfo, VideoInfo};
pub use traits::MediaSource;
pub use ytdlp::YtDlpSource;
