//! Common interface of all EDL units.

use std::fs;
use std::path::{Path, PathBuf};

use chrono::{DateTime, FixedOffset};
use uuid::Uuid;

use super::{Manifest, UnitHeader, UnitType};
use crate::util::{sanitize_name, Error, Result};

/// Behavior shared by collections, groups and datasets.
///
/// Implementors only provide header access, the fan-out setters and their
/// own load/save; identity accessors and renaming are provided.
pub trait EdlUnit {
    /// Identity and metadata of this unit.
    fn header(&self) -> &UnitHeader;

    /// Mutable identity and metadata of this unit.
    fn header_mut(&mut self) -> &mut UnitHeader;

    /// Set the parent directory, updating any descendants.
    fn set_root_path(&mut self, path: Option<PathBuf>);

    /// Set the collection ID, updating any descendants.
    fn set_collection_id(&mut self, id: Uuid);

    /// Load this unit from its directory.
    ///
    /// `manifest` may carry an already parsed manifest to avoid reading it twice.
    fn load(&mut self, path: &Path, manifest: Option<Manifest>) -> Result<()>;

    /// Persist this unit (and its descendants) to disk.
    fn save(&self) -> Result<()>;

    fn name(&self) -> Option<&str> {
        self.header().name()
    }

    fn unit_type(&self) -> UnitType {
        self.header().unit_type()
    }

    fn root_path(&self) -> Option<&Path> {
        self.header().root_path()
    }

    /// Directory of this unit, `None` until name and root path are set.
    fn path(&self) -> Option<PathBuf> {
        self.header().path()
    }

    fn collection_id(&self) -> Uuid {
        self.header().collection_id()
    }

    fn time_created(&self) -> DateTime<FixedOffset> {
        self.header().time_created()
    }

    fn attributes(&self) -> &toml::Table {
        self.header().attributes()
    }

    fn attributes_mut(&mut self) -> &mut toml::Table {
        self.header_mut().attributes_mut()
    }

    /// Rename this unit, moving its directory if it already exists on disk.
    ///
    /// A unit can not see its siblings; use [`Group::rename_child`] to also
    /// reject names already taken in memory. An existing directory at the
    /// target path is never replaced. On failure the previous name is kept.
    ///
    /// [`Group::rename_child`]: crate::unit::Group::rename_child
    fn change_name(&mut self, new_name: &str) -> Result<()> {
        let old_path = self.path();
        let Some(name) = sanitize_name(new_name) else {
            return Err(Error::invalid_unit(
                old_path.unwrap_or_default(),
                "unit name can not be empty",
            ));
        };
        if let Some(target) = self.root_path().map(|root| root.join(&name)) {
            if old_path.as_ref() != Some(&target) && target.exists() {
                return Err(Error::invalid_unit(target, "a unit directory with this name already exists"));
            }
        }
        let old_name = self.header_mut().name().map(str::to_owned);
        self.header_mut().set_name(Some(name));

        if let (Some(old), Some(new)) = (old_path.filter(|p| p.exists()), self.path()) {
            if let Err(e) = fs::rename(&old, &new) {
                self.header_mut().set_name(old_name);
                return Err(e.into());
            }
            tracing::debug!(from = %old.display(), to = %new.display(), "renamed unit directory");
        }

        // descendants live below our directory
        let root = self.root_path().map(Path::to_path_buf);
        self.set_root_path(root);
        Ok(())
    }
}
