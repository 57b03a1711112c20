//! Identity and manifest persistence shared by all units.
//!
//! The [`UnitHeader`] holds everything a unit stores in its manifest that is
//! not specific to groups or datasets.

use std::fmt;
use std::fs;
use std::path::{Path, PathBuf};
use std::str::FromStr;

use chrono::{DateTime, FixedOffset, Local, SubsecRound};
use uuid::Uuid;

use super::manifest::{
    datetime_from_toml, datetime_to_toml, read_attributes, write_attributes, Manifest,
    ATTRIBUTES_FILENAME, FORMAT_VERSION, MANIFEST_FILENAME,
};
use crate::util::{sanitize_name, Error, Result};

/// Concrete kind of an EDL unit.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum UnitType {
    Collection,
    Group,
    Dataset,
}

impl UnitType {
    /// Manifest spelling of this type.
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Collection => "collection",
            Self::Group => "group",
            Self::Dataset => "dataset",
        }
    }
}

impl fmt::Display for UnitType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for UnitType {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        match s {
            "collection" => Ok(Self::Collection),
            "group" => Ok(Self::Group),
            "dataset" => Ok(Self::Dataset),
            other => Err(Error::UnknownUnitType(other.to_string())),
        }
    }
}

/// Creation time with second resolution.
fn now_seconds() -> DateTime<FixedOffset> {
    Local::now().fixed_offset().trunc_subsecs(0)
}

/// Identity and metadata of a unit.
#[derive(Clone, Debug)]
pub struct UnitHeader {
    name: Option<String>,
    unit_type: UnitType,
    collection_id: Uuid,
    root_path: Option<PathBuf>,
    time_created: DateTime<FixedOffset>,
    generator_id: Option<String>,
    authors: Vec<String>,
    attributes: toml::Table,
    format_version: String,
}

impl UnitHeader {
    /// Create a header for a new unit. The name is sanitized.
    pub fn new(unit_type: UnitType, name: Option<&str>) -> Self {
        Self {
            name: name.and_then(sanitize_name),
            unit_type,
            collection_id: Uuid::new_v4(),
            root_path: None,
            time_created: now_seconds(),
            generator_id: None,
            authors: Vec::new(),
            attributes: toml::Table::new(),
            format_version: FORMAT_VERSION.to_string(),
        }
    }

    pub fn name(&self) -> Option<&str> {
        self.name.as_deref()
    }

    pub(crate) fn set_name(&mut self, name: Option<String>) {
        self.name = name;
    }

    #[inline]
    pub fn unit_type(&self) -> UnitType {
        self.unit_type
    }

    pub fn collection_id(&self) -> Uuid {
        self.collection_id
    }

    pub(crate) fn set_collection_id(&mut self, id: Uuid) {
        self.collection_id = id;
    }

    /// Directory containing this unit's directory.
    pub fn root_path(&self) -> Option<&Path> {
        self.root_path.as_deref()
    }

    pub(crate) fn set_root_path(&mut self, path: Option<PathBuf>) {
        self.root_path = path;
    }

    /// Directory of this unit, defined once both name and root path are set.
    pub fn path(&self) -> Option<PathBuf> {
        match (&self.root_path, &self.name) {
            (Some(root), Some(name)) => Some(root.join(name)),
            _ => None,
        }
    }

    pub fn time_created(&self) -> DateTime<FixedOffset> {
        self.time_created
    }

    pub fn set_time_created(&mut self, time: DateTime<FixedOffset>) {
        self.time_created = time;
    }

    /// Identifier of the software which generated this unit.
    pub fn generator_id(&self) -> Option<&str> {
        self.generator_id.as_deref()
    }

    pub fn set_generator_id(&mut self, id: Option<String>) {
        self.generator_id = id;
    }

    pub fn authors(&self) -> &[String] {
        &self.authors
    }

    pub fn authors_mut(&mut self) -> &mut Vec<String> {
        &mut self.authors
    }

    /// Free-form user metadata.
    pub fn attributes(&self) -> &toml::Table {
        &self.attributes
    }

    pub fn attributes_mut(&mut self) -> &mut toml::Table {
        &mut self.attributes
    }

    pub fn set_attributes(&mut self, attributes: toml::Table) {
        self.attributes = attributes;
    }

    pub fn format_version(&self) -> &str {
        &self.format_version
    }

    /// Load identity from a unit directory.
    ///
    /// If `manifest` is `None`, `manifest.toml` inside `path` is read. The
    /// manifest is returned so that groups and datasets can read their own
    /// sections from it.
    pub fn load(&mut self, path: &Path, manifest: Option<Manifest>) -> Result<Manifest> {
        if !path.is_dir() {
            return Err(Error::invalid_unit(path, "does not specify an existing directory"));
        }
        let path = fs::canonicalize(path)?;

        match self.load_checked(&path, manifest) {
            Ok(mf) => {
                tracing::debug!(path = %path.display(), unit_type = %self.unit_type, "loaded unit");
                Ok(mf)
            }
            Err(e) => {
                self.detach();
                Err(e)
            }
        }
    }

    /// Validate the manifest at `path` and take over its identity. Nothing is
    /// changed unless every check passes.
    fn load_checked(&mut self, path: &Path, manifest: Option<Manifest>) -> Result<Manifest> {
        let mf = match manifest {
            Some(mf) => mf,
            None => {
                let mf_path = path.join(MANIFEST_FILENAME);
                if !mf_path.is_file() {
                    return Err(Error::invalid_unit(path, "no manifest file found"));
                }
                Manifest::read(mf_path)?
            }
        };

        let format_version = mf.format_version();
        if format_version != FORMAT_VERSION {
            return Err(Error::UnsupportedFormatVersion {
                found: format_version,
                expected: FORMAT_VERSION.to_string(),
            });
        }

        if mf.unit_type() != self.unit_type.as_str() {
            return Err(Error::TypeMismatch {
                expected: self.unit_type.to_string(),
                actual: mf.unit_type().to_string(),
            });
        }

        let Some(time_created) = mf.time_created.as_ref() else {
            return Err(Error::invalid_unit(path, "manifest has no creation time"));
        };
        let time_created = datetime_from_toml(time_created)?;

        let attrs_path = path.join(ATTRIBUTES_FILENAME);
        let attributes = if attrs_path.is_file() {
            read_attributes(attrs_path)?
        } else {
            toml::Table::new()
        };

        self.name = path
            .file_name()
            .map(|n| n.to_string_lossy().into_owned());
        self.root_path = path.parent().map(Path::to_path_buf);
        self.format_version = format_version;
        self.attributes = attributes;
        self.time_created = time_created;
        if let Some(id) = mf.collection_id {
            self.collection_id = id;
        }
        if let Some(generator) = &mf.generator {
            self.generator_id = Some(generator.clone());
        }
        if !mf.authors.is_empty() {
            self.authors = mf.authors.clone();
        }
        Ok(mf)
    }

    fn detach(&mut self) {
        self.name = None;
        self.root_path = None;
    }

    /// Build the manifest sections common to all unit types.
    pub fn make_manifest(&self) -> Result<Manifest> {
        Ok(Manifest {
            format_version: Some(toml::Value::String(self.format_version.clone())),
            unit_type: Some(self.unit_type.as_str().to_string()),
            collection_id: Some(self.collection_id),
            time_created: Some(datetime_to_toml(&self.time_created)?),
            generator: self.generator_id.clone().filter(|g| !g.is_empty()),
            authors: self.authors.clone(),
            ..Manifest::default()
        })
    }

    /// Write manifest and attributes into the unit directory.
    pub fn save_metadata(&self, manifest: &Manifest) -> Result<()> {
        let path = self.path().ok_or(Error::NoPathSet)?;
        fs::create_dir_all(&path)?;

        manifest.write(path.join(MANIFEST_FILENAME))?;
        if !self.attributes.is_empty() {
            write_attributes(path.join(ATTRIBUTES_FILENAME), &self.attributes)?;
        }

        tracing::debug!(path = %path.display(), unit_type = %self.unit_type, "saved unit");
        Ok(())
    }
}
