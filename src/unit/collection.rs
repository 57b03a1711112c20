//! The root of an EDL tree.

use std::ops::{Deref, DerefMut};
use std::path::{Path, PathBuf};

use uuid::Uuid;

use super::Group;
use crate::core::{EdlUnit, Manifest, UnitHeader, UnitType};
use crate::util::Result;

/// A group at the root of a unit tree.
///
/// Group operations are available through `Deref`.
///
/// ## Example
///
/// ```ignore
/// use edl::prelude::*;
///
/// let mut collection = Collection::new("mouse-42 session 1");
/// collection.set_root_path(Some("/data/experiments".into()));
/// collection.attributes_mut().insert("subject_id".into(), "m42".into());
///
/// let videos = collection.get_or_create_group("videos")?;
/// let ds = videos.get_or_create_dataset("miniscope")?;
/// collection.save()?;
/// ```
#[derive(Debug)]
pub struct Collection(Group);

impl Collection {
    /// Create a new collection with a fresh collection ID.
    pub fn new(name: &str) -> Self {
        Self(Group::with_type(UnitType::Collection, Some(name)))
    }

    /// Load a collection from its directory.
    pub fn open(path: impl AsRef<Path>) -> Result<Self> {
        let mut collection = Self::default();
        collection.load(path.as_ref(), None)?;
        Ok(collection)
    }

    /// Identifier of the software which generated this collection.
    pub fn generator_id(&self) -> Option<&str> {
        self.0.header().generator_id()
    }

    pub fn set_generator_id(&mut self, id: impl Into<String>) {
        self.0.header_mut().set_generator_id(Some(id.into()));
    }

    /// Human-readable, likely unique name of this collection.
    ///
    /// Joins the `subject_id` attribute, the name, the creation date and
    /// the start of the collection ID. The format is not meant to be parsed.
    pub fn collection_idname(&self) -> String {
        let mut parts = Vec::with_capacity(4);
        match self.attributes().get("subject_id") {
            Some(toml::Value::String(s)) if !s.is_empty() => parts.push(s.clone()),
            Some(toml::Value::String(_)) | None => {}
            Some(other) => parts.push(other.to_string()),
        }
        if let Some(name) = self.name() {
            parts.push(name.to_string());
        }
        parts.push(self.time_created().format("%y-%m-%d").to_string());
        parts.push(self.collection_id().hyphenated().to_string()[..6].to_string());

        parts.join("_").replace(' ', "")
    }
}

impl Default for Collection {
    fn default() -> Self {
        Self(Group::with_type(UnitType::Collection, None))
    }
}

impl Deref for Collection {
    type Target = Group;

    fn deref(&self) -> &Group {
        &self.0
    }
}

impl DerefMut for Collection {
    fn deref_mut(&mut self) -> &mut Group {
        &mut self.0
    }
}

impl EdlUnit for Collection {
    fn header(&self) -> &UnitHeader {
        self.0.header()
    }

    fn header_mut(&mut self) -> &mut UnitHeader {
        self.0.header_mut()
    }

    fn set_root_path(&mut self, path: Option<PathBuf>) {
        self.0.set_root_path(path);
    }

    fn set_collection_id(&mut self, id: Uuid) {
        self.0.set_collection_id(id);
    }

    fn load(&mut self, path: &Path, manifest: Option<Manifest>) -> Result<()> {
        self.0.load(path, manifest)
    }

    fn save(&self) -> Result<()> {
        self.0.save()
    }
}
