//! # EDL
//!
//! Reading and writing of the Experiment Directory Layout (EDL), a
//! self-describing directory hierarchy for scientific recordings.
//!
//! Every directory of an EDL tree is a *unit* with a `manifest.toml`. The
//! root is a collection; below it, groups nest further groups and datasets.
//! Datasets reference their data files (video, electrophysiology, tables,
//! timestamps) and read them through pluggable decoders, synchronizing
//! device clocks to the master clock of the acquisition system.
//!
//! ## Modules
//!
//! - [`util`] - Errors and name sanitizing
//! - [`core`] - Unit identity, manifests, time synchronization
//! - [`unit`] - Collections, groups and datasets
//! - [`data`] - Data files, decoder registry, records
//! - [`dataio`] - Built-in decoders
//!
//! ## Example
//!
//! ```ignore
//! use edl::prelude::*;
//!
//! let collection = Collection::open("/data/experiments/m42_session1")?;
//! let videos = collection.group_by_name("videos").unwrap();
//! let miniscope = videos.dataset_by_name("miniscope").unwrap();
//!
//! for record in miniscope.read_aux_data("tsync", &ReadOptions::default())? {
//!     println!("{:?}", record?);
//! }
//! ```

pub mod core;
pub mod data;
pub mod dataio;
pub mod unit;
pub mod util;

// Re-export commonly used types
pub use crate::core::{EdlUnit, TimeSynchronizer, UnitType};
pub use data::{DataFile, DataPart, ReadOptions, Record};
pub use unit::{load, Collection, Dataset, Group, Unit};
pub use util::{Error, Result};

/// Prelude module for convenient imports
pub mod prelude {
    pub use crate::core::{EdlUnit, SyncMap, TimeSynchronizer, TimeUnit, UnitType};
    pub use crate::data::{
        DataClass, DataFile, DataLoaderRegistry, DataPart, ReadOptions, Record, Records,
    };
    pub use crate::unit::{Collection, Dataset, Group, Unit};
    pub use crate::util::{Error, Result};
}
