//! Typed data storage of datasets.
//!
//! This module provides:
//! - [`DataFile`] / [`DataPart`] - A logical data stream and its file parts
//! - [`DataClass`] / [`DataLoaderRegistry`] - Decoder selection
//! - [`Record`] - Items produced by decoders

mod file;
mod options;
mod record;
mod registry;

pub use file::{DataFile, DataPart};
pub use options::ReadOptions;
pub use record::{DataFrame, Record};
pub use registry::{
    default_registry, register_decoder, DataClass, DataLoaderRegistry, DecodeContext, Decoder,
    Records, FILE_TYPE_RULES, MEDIA_TYPE_RULES,
};
