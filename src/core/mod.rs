//! Core layer - unit identity, manifests and time synchronization.
//!
//! This module provides:
//! - [`UnitHeader`] / [`UnitType`] - Identity and manifest persistence of a unit
//! - [`Manifest`] - The `manifest.toml` document
//! - [`EdlUnit`] - Interface shared by collections, groups and datasets
//! - [`TimeSynchronizer`] - Device clock to master clock conversion

mod header;
pub mod manifest;
mod time_sync;
mod traits;

pub use header::{UnitHeader, UnitType};
pub use manifest::{
    DataFileEntry, Manifest, PartEntry, ATTRIBUTES_FILENAME, FORMAT_VERSION, MANIFEST_FILENAME,
};
pub use time_sync::{SyncMap, SyncPoint, TimeSynchronizer, TimeUnit};
pub use traits::EdlUnit;
