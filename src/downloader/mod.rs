//! Engine options and the events a running download reports

pub mod options;
pub mod progress;

pub use options::{DownloadOptions, Postprocessor, DEFAULT_OUTPUT_TEMPLATE, TITLE_PLACEHOLDER};
pub use progress::{DownloadEvent, EngineEvent, PostprocessEvent};
