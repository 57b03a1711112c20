//! Decoders for the data formats found in EDL datasets.
//!
//! - [`TSyncDecoder`] - Time-sync files
//! - [`CsvDecoder`] - Delimited text tables (feature `csv`)
//! - [`JsonDecoder`] - pandas-style JSON tables, optionally zstd-compressed
//! - [`VideoDecoder`] - Video frames, pixels decoded by a [`FrameReader`]
//! - [`IntanDecoder`] - Electrophysiology signals opened by a [`SignalOpener`]
//!
//! The first three are part of
//! [`DataLoaderRegistry::with_defaults`](crate::data::DataLoaderRegistry::with_defaults).

#[cfg(feature = "csv")]
mod delimited;
mod intan;
mod json;
mod syncfile;
mod video;

#[cfg(feature = "csv")]
pub use delimited::{CsvDecoder, CsvRows, DEFAULT_DELIMITER};
pub use intan::{IntanDecoder, SignalOpener, SignalReader, SignalSource};
pub use json::{JsonDecoder, EXTENDED_PANDAS_SCHEMA};
pub use syncfile::TSyncDecoder;
pub use video::{Frame, FrameImage, FrameImages, FrameReader, VideoDecoder};
