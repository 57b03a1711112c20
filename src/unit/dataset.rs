//! Datasets: units holding actual data.

use std::path::{Path, PathBuf};

use uuid::Uuid;

use crate::core::{EdlUnit, Manifest, UnitHeader, UnitType};
use crate::data::{default_registry, DataFile, DataLoaderRegistry, ReadOptions, Records};
use crate::util::{Error, Result};

/// A leaf unit with one primary data stream and any number of auxiliary
/// streams (e.g. timestamps of a video).
///
/// ## Example
///
/// ```ignore
/// let ds = group.get_or_create_dataset("miniscope")?;
/// ds.data_mut().set_media_type(Some("video/x-matroska".into()));
/// ds.data_mut().new_part("msSession_0.mkv", 0, false)?;
/// ds.save()?;
/// ```
#[derive(Debug)]
pub struct Dataset {
    header: UnitHeader,
    data: DataFile,
    aux_data: Vec<DataFile>,
}

impl Dataset {
    /// Create a new, empty dataset.
    pub fn new(name: &str) -> Self {
        Self::with_name(Some(name))
    }

    fn with_name(name: Option<&str>) -> Self {
        Self {
            header: UnitHeader::new(UnitType::Dataset, name),
            data: DataFile::new(),
            aux_data: Vec::new(),
        }
    }

    /// The primary data.
    pub fn data(&self) -> &DataFile {
        &self.data
    }

    pub fn data_mut(&mut self) -> &mut DataFile {
        &mut self.data
    }

    /// Replace the primary data. Part paths become relative to this dataset.
    pub fn set_data(&mut self, mut data: DataFile) {
        data.set_base_path(self.path());
        self.data = data;
    }

    pub fn aux_data(&self) -> &[DataFile] {
        &self.aux_data
    }

    /// Append an auxiliary data stream.
    pub fn add_aux_data(&mut self, mut aux: DataFile) -> &mut DataFile {
        aux.set_base_path(self.path());
        self.aux_data.push(aux);
        let last = self.aux_data.len() - 1;
        &mut self.aux_data[last]
    }

    /// First auxiliary data whose media type, file type or summary
    /// contains `key`.
    pub fn aux_data_by_key(&self, key: &str) -> Option<&DataFile> {
        self.aux_data.iter().find(|df| df.matches_key(key))
    }

    pub fn aux_data_by_key_mut(&mut self, key: &str) -> Option<&mut DataFile> {
        self.aux_data.iter_mut().find(|df| df.matches_key(key))
    }

    /// Read the primary data, with auxiliary data available to the decoder.
    pub fn read_data(&self, options: &ReadOptions) -> Result<Records> {
        self.read_data_with(&default_registry(), options)
    }

    pub fn read_data_with(
        &self,
        registry: &DataLoaderRegistry,
        options: &ReadOptions,
    ) -> Result<Records> {
        self.data.read_with(registry, &self.aux_data, options)
    }

    /// Read the auxiliary data matching `key`.
    pub fn read_aux_data(&self, key: &str, options: &ReadOptions) -> Result<Records> {
        self.read_aux_data_with(&default_registry(), key, options)
    }

    pub fn read_aux_data_with(
        &self,
        registry: &DataLoaderRegistry,
        key: &str,
        options: &ReadOptions,
    ) -> Result<Records> {
        let aux = self
            .aux_data_by_key(key)
            .ok_or_else(|| Error::AuxDataNotFound(key.to_string()))?;
        aux.read_with(registry, &[], options)
    }

    fn refresh_base_paths(&mut self) {
        let path = self.header.path();
        self.data.set_base_path(path.clone());
        for aux in &mut self.aux_data {
            aux.set_base_path(path.clone());
        }
    }
}

impl Default for Dataset {
    fn default() -> Self {
        Self::with_name(None)
    }
}

impl EdlUnit for Dataset {
    fn header(&self) -> &UnitHeader {
        &self.header
    }

    fn header_mut(&mut self) -> &mut UnitHeader {
        &mut self.header
    }

    fn set_root_path(&mut self, path: Option<PathBuf>) {
        self.header.set_root_path(path);
        self.refresh_base_paths();
    }

    fn set_collection_id(&mut self, id: Uuid) {
        self.header.set_collection_id(id);
    }

    fn load(&mut self, path: &Path, manifest: Option<Manifest>) -> Result<()> {
        let mf = self.header.load(path, manifest)?;

        self.data = mf.data.as_ref().map(DataFile::from_entry).unwrap_or_default();
        self.aux_data = mf.data_aux.iter().map(DataFile::from_entry).collect();
        self.refresh_base_paths();
        Ok(())
    }

    fn save(&self) -> Result<()> {
        let mut mf = self.header.make_manifest()?;
        if !self.data.is_empty() {
            mf.data = Some(self.data.to_entry());
        }
        mf.data_aux = self
            .aux_data
            .iter()
            .filter(|aux| !aux.is_empty())
            .map(DataFile::to_entry)
            .collect();
        self.header.save_metadata(&mf)
    }
}
