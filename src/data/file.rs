//! Data files and their parts.

use std::path::{Path, PathBuf};

use smallvec::SmallVec;

use super::registry::{default_registry, DataClass, DataLoaderRegistry, Records};
use super::ReadOptions;
use crate::core::{DataFileEntry, PartEntry};
use crate::util::{Error, Result};

/// One physical file of a (possibly split) data stream.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct DataPart {
    fname: String,
    index: i64,
}

impl DataPart {
    /// Index of parts that were added without explicit position.
    pub const UNINDEXED: i64 = -1;

    pub fn new(fname: impl Into<String>, index: i64) -> Self {
        Self {
            fname: fname.into(),
            index,
        }
    }

    /// File name relative to the owning dataset directory.
    pub fn fname(&self) -> &str {
        &self.fname
    }

    /// Ordering key, [`Self::UNINDEXED`] if unset.
    pub fn index(&self) -> i64 {
        self.index
    }
}

/// Extension of a part file name, empty if it has none.
fn part_extension(fname: &str) -> &str {
    Path::new(fname)
        .extension()
        .and_then(|e| e.to_str())
        .unwrap_or("")
}

/// A logical data stream made of ordered file parts.
///
/// The media type and file type decide which decoder reads the data, see
/// [`DataClass::resolve`].
#[derive(Clone, Debug, Default)]
pub struct DataFile {
    base_path: Option<PathBuf>,
    media_type: Option<String>,
    file_type: Option<String>,
    summary: Option<String>,
    parts: SmallVec<[DataPart; 4]>,
}

impl DataFile {
    /// Create an empty data file.
    pub fn new() -> Self {
        Self::default()
    }

    /// Set the media type.
    pub fn with_media_type(mut self, media_type: impl Into<String>) -> Self {
        self.media_type = Some(media_type.into());
        self
    }

    /// Set the file type.
    pub fn with_file_type(mut self, file_type: impl Into<String>) -> Self {
        self.file_type = Some(file_type.into());
        self
    }

    /// Set the summary.
    pub fn with_summary(mut self, summary: impl Into<String>) -> Self {
        self.summary = Some(summary.into());
        self
    }

    pub fn media_type(&self) -> Option<&str> {
        self.media_type.as_deref()
    }

    pub fn set_media_type(&mut self, media_type: Option<String>) {
        self.media_type = media_type;
    }

    /// File type, inferred from the first part's extension if not set.
    pub fn file_type(&self) -> Option<&str> {
        self.file_type.as_deref().or_else(|| {
            self.parts
                .first()
                .map(|p| part_extension(&p.fname))
                .filter(|ext| !ext.is_empty())
        })
    }

    pub fn set_file_type(&mut self, file_type: Option<String>) {
        self.file_type = file_type;
    }

    /// Human-readable description of the data.
    pub fn summary(&self) -> Option<&str> {
        self.summary.as_deref()
    }

    pub fn set_summary(&mut self, summary: Option<String>) {
        self.summary = summary;
    }

    /// Directory the part file names are relative to.
    pub fn base_path(&self) -> Option<&Path> {
        self.base_path.as_deref()
    }

    pub(crate) fn set_base_path(&mut self, path: Option<PathBuf>) {
        self.base_path = path;
    }

    /// Parts ordered by index.
    pub fn parts(&self) -> &[DataPart] {
        &self.parts
    }

    /// Check if nothing about this data file is known yet.
    pub fn is_empty(&self) -> bool {
        self.parts.is_empty()
            && self.media_type.is_none()
            && self.file_type.is_none()
            && self.summary.is_none()
    }

    /// Register a new part.
    ///
    /// The first part decides the file type if none was set; parts with a
    /// different extension are rejected. With `allow_exists`, adding a name
    /// twice returns the existing part.
    pub fn new_part(&mut self, fname: &str, index: i64, allow_exists: bool) -> Result<&DataPart> {
        if let Some(pos) = self.parts.iter().position(|p| p.fname == fname) {
            if allow_exists {
                return Ok(&self.parts[pos]);
            }
            return Err(Error::DuplicatePart(fname.to_string()));
        }

        let ext = part_extension(fname);
        match self.file_type().map(str::to_owned) {
            None if !ext.is_empty() => self.file_type = Some(ext.to_string()),
            Some(current) if current != ext => {
                return Err(Error::TypeConflict {
                    expected: current,
                    actual: ext.to_string(),
                })
            }
            _ => {}
        }

        // after all parts with a lower or equal index, keeps ties in insertion order
        let pos = self
            .parts
            .iter()
            .position(|p| p.index > index)
            .unwrap_or(self.parts.len());
        self.parts.insert(pos, DataPart::new(fname, index));
        Ok(&self.parts[pos])
    }

    /// Register a part without explicit index.
    pub fn add_part(&mut self, fname: &str) -> Result<&DataPart> {
        self.new_part(fname, DataPart::UNINDEXED, false)
    }

    /// Absolute paths of all parts, in index order.
    pub fn part_paths(&self) -> Result<Vec<PathBuf>> {
        let base = self.base_path.as_ref().ok_or(Error::NoPathSet)?;
        Ok(self.parts.iter().map(|p| base.join(&p.fname)).collect())
    }

    /// Check if `key` is part of the media type or file type.
    pub fn matches_type(&self, key: &str) -> bool {
        self.media_type().is_some_and(|t| t.contains(key))
            || self.file_type().is_some_and(|t| t.contains(key))
    }

    /// Check if `key` is part of the type tags or the summary.
    pub fn matches_key(&self, key: &str) -> bool {
        self.matches_type(key) || self.summary().is_some_and(|s| s.contains(key))
    }

    /// Data class used to select a decoder.
    pub fn data_class(&self) -> Result<DataClass> {
        DataClass::resolve(self.media_type(), self.file_type())
    }

    /// Read the data with the process-wide decoder registry.
    pub fn read(&self, aux_data: &[DataFile], options: &ReadOptions) -> Result<Records> {
        self.read_with(&default_registry(), aux_data, options)
    }

    /// Read the data with an explicit decoder registry.
    ///
    /// Returns a lazy, single-pass sequence of records.
    pub fn read_with(
        &self,
        registry: &DataLoaderRegistry,
        aux_data: &[DataFile],
        options: &ReadOptions,
    ) -> Result<Records> {
        let class = self.data_class()?;
        let decoder = registry
            .decoder(class)
            .ok_or_else(|| Error::UnknownDataClass(class.to_string()))?;

        let ctx = super::DecodeContext {
            parts: self.part_paths()?,
            aux_data,
            options,
            registry,
        };
        decoder.read(ctx)
    }

    /// Create from a manifest entry. Parts are ordered by index.
    pub fn from_entry(entry: &DataFileEntry) -> Self {
        let mut parts: SmallVec<[DataPart; 4]> = entry
            .parts
            .iter()
            .map(|p| DataPart::new(&p.fname, p.index.unwrap_or(DataPart::UNINDEXED)))
            .collect();
        parts.sort_by_key(|p| p.index);

        Self {
            base_path: None,
            media_type: entry.media_type.clone(),
            file_type: entry.file_type.clone(),
            summary: entry.summary.clone(),
            parts,
        }
    }

    /// Manifest entry describing this data file.
    pub fn to_entry(&self) -> DataFileEntry {
        DataFileEntry {
            media_type: self.media_type.clone(),
            file_type: self.file_type.clone(),
            summary: self.summary.clone(),
            parts: self
                .parts
                .iter()
                .map(|p| PartEntry {
                    fname: p.fname.clone(),
                    index: (p.index != DataPart::UNINDEXED).then_some(p.index),
                })
                .collect(),
        }
    }
}
