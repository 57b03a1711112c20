//! The EDL unit hierarchy.
//!
//! A tree is rooted in a [`Collection`] and contains [`Group`]s and
//! [`Dataset`]s, each stored as one directory with a `manifest.toml`.
//!
//! ## Example
//!
//! ```ignore
//! use edl::prelude::*;
//!
//! let unit = edl::load("/data/experiments/m42_session1")?;
//! if let Unit::Collection(collection) = unit {
//!     for group in collection.groups() {
//!         println!("{:?}", group.name());
//!     }
//! }
//! ```

mod collection;
mod dataset;
mod group;

pub use collection::Collection;
pub use dataset::Dataset;
pub use group::Group;

use std::path::{Path, PathBuf};

use uuid::Uuid;

use crate::core::{EdlUnit, Manifest, UnitHeader, UnitType, MANIFEST_FILENAME};
use crate::util::{Error, Result};

/// Any unit of an EDL tree.
#[derive(Debug)]
pub enum Unit {
    Collection(Collection),
    Group(Group),
    Dataset(Dataset),
}

impl Unit {
    /// The group behind a collection or group.
    pub fn as_group(&self) -> Option<&Group> {
        match self {
            Self::Collection(c) => Some(c),
            Self::Group(g) => Some(g),
            Self::Dataset(_) => None,
        }
    }

    pub fn as_group_mut(&mut self) -> Option<&mut Group> {
        match self {
            Self::Collection(c) => Some(c),
            Self::Group(g) => Some(g),
            Self::Dataset(_) => None,
        }
    }

    pub fn as_dataset(&self) -> Option<&Dataset> {
        match self {
            Self::Dataset(d) => Some(d),
            _ => None,
        }
    }

    pub fn as_dataset_mut(&mut self) -> Option<&mut Dataset> {
        match self {
            Self::Dataset(d) => Some(d),
            _ => None,
        }
    }

    pub fn into_collection(self) -> Option<Collection> {
        match self {
            Self::Collection(c) => Some(c),
            _ => None,
        }
    }

    fn inner(&self) -> &dyn EdlUnit {
        match self {
            Self::Collection(c) => c,
            Self::Group(g) => g,
            Self::Dataset(d) => d,
        }
    }

    fn inner_mut(&mut self) -> &mut dyn EdlUnit {
        match self {
            Self::Collection(c) => c,
            Self::Group(g) => g,
            Self::Dataset(d) => d,
        }
    }
}

impl From<Collection> for Unit {
    fn from(c: Collection) -> Self {
        Self::Collection(c)
    }
}

impl From<Group> for Unit {
    fn from(g: Group) -> Self {
        Self::Group(g)
    }
}

impl From<Dataset> for Unit {
    fn from(d: Dataset) -> Self {
        Self::Dataset(d)
    }
}

impl EdlUnit for Unit {
    fn header(&self) -> &UnitHeader {
        self.inner().header()
    }

    fn header_mut(&mut self) -> &mut UnitHeader {
        self.inner_mut().header_mut()
    }

    fn set_root_path(&mut self, path: Option<PathBuf>) {
        self.inner_mut().set_root_path(path);
    }

    fn set_collection_id(&mut self, id: Uuid) {
        self.inner_mut().set_collection_id(id);
    }

    fn load(&mut self, path: &Path, manifest: Option<Manifest>) -> Result<()> {
        self.inner_mut().load(path, manifest)
    }

    fn save(&self) -> Result<()> {
        self.inner().save()
    }
}

/// Open the unit stored at `path`, whatever its type.
pub fn load(path: impl AsRef<Path>) -> Result<Unit> {
    let path = path.as_ref();
    let mf_path = path.join(MANIFEST_FILENAME);
    if !mf_path.is_file() {
        return Err(Error::invalid_unit(path, "no manifest file found"));
    }
    let mf = Manifest::read(&mf_path)?;

    let mut unit = match mf.unit_type().parse::<UnitType>()? {
        UnitType::Collection => Unit::Collection(Collection::default()),
        UnitType::Group => Unit::Group(Group::default()),
        UnitType::Dataset => Unit::Dataset(Dataset::default()),
    };
    unit.load(path, Some(mf))?;
    Ok(unit)
}
