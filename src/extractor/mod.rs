pub mod models;
pub mod traits;
pub mod ytdlp;

pub use models::{FlatEntry, RawFormat, RawInfo};
pub use traits::MediaEngine;
pub use ytdlp::YtDlpEngine;
