//! Format model: raw engine metadata → selectable, display-ready formats

pub mod codec;
pub mod parser;
pub mod selection;

pub use codec::CodecTable;
pub use parser::{
    parse_format, parse_metadata, size_label, AudioFacet, FormatSummary, Formats, Metadata,
    ParsedFormat, VideoFacet,
};
pub use selection::{
    AudioConversion, AudioTarget, FormatChoice, FormatMenu, FormatPick, QualityLevel,
};
