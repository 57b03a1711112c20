//! Groups of units.

use std::fs;
use std::path::{Path, PathBuf};

use uuid::Uuid;

use super::{Dataset, Unit};
use crate::core::{EdlUnit, Manifest, UnitHeader, UnitType, MANIFEST_FILENAME};
use crate::util::{sanitize_name, Error, Result};

/// A unit containing other groups and datasets.
///
/// All children share the group's collection ID and live in the group's
/// directory.
#[derive(Debug)]
pub struct Group {
    header: UnitHeader,
    children: Vec<Unit>,
}

impl Group {
    /// Create a new, empty group.
    pub fn new(name: &str) -> Self {
        Self::with_type(UnitType::Group, Some(name))
    }

    pub(crate) fn with_type(unit_type: UnitType, name: Option<&str>) -> Self {
        Self {
            header: UnitHeader::new(unit_type, name),
            children: Vec::new(),
        }
    }

    /// All children in insertion (or load) order.
    pub fn children(&self) -> &[Unit] {
        &self.children
    }

    /// Child groups.
    pub fn groups(&self) -> impl Iterator<Item = &Group> {
        self.children.iter().filter_map(Unit::as_group)
    }

    /// Child datasets.
    pub fn datasets(&self) -> impl Iterator<Item = &Dataset> {
        self.children.iter().filter_map(Unit::as_dataset)
    }

    pub fn child_by_name(&self, name: &str) -> Option<&Unit> {
        self.children.iter().find(|c| c.name() == Some(name))
    }

    pub fn group_by_name(&self, name: &str) -> Option<&Group> {
        self.groups().find(|g| g.name() == Some(name))
    }

    pub fn group_by_name_mut(&mut self, name: &str) -> Option<&mut Group> {
        self.children
            .iter_mut()
            .filter_map(Unit::as_group_mut)
            .find(|g| g.name() == Some(name))
    }

    pub fn dataset_by_name(&self, name: &str) -> Option<&Dataset> {
        self.datasets().find(|d| d.name() == Some(name))
    }

    pub fn dataset_by_name_mut(&mut self, name: &str) -> Option<&mut Dataset> {
        self.children
            .iter_mut()
            .filter_map(Unit::as_dataset_mut)
            .find(|d| d.name() == Some(name))
    }

    /// Attach a unit as child of this group.
    ///
    /// The child takes over this group's collection ID and is placed in this
    /// group's directory. If the child already exists on disk elsewhere, its
    /// directory is moved.
    pub fn add_child(&mut self, child: impl Into<Unit>) -> Result<&mut Unit> {
        let mut child = child.into();
        if child.unit_type() == UnitType::Collection {
            return Err(Error::InvalidChild(
                "a collection can not be a child of another unit".into(),
            ));
        }
        let Some(name) = child.name().map(str::to_owned) else {
            return Err(Error::InvalidChild("child unit has no name".into()));
        };
        if self.child_by_name(&name).is_some() {
            return Err(Error::InvalidChild(format!(
                "a child named '{name}' already exists"
            )));
        }

        let own_path = self.path();
        if let (Some(old), Some(new)) = (child.path(), own_path.as_ref().map(|p| p.join(&name))) {
            if old != new && old.exists() {
                if let Some(parent) = new.parent() {
                    fs::create_dir_all(parent)?;
                }
                fs::rename(&old, &new)?;
                tracing::debug!(from = %old.display(), to = %new.display(), "moved unit directory");
            }
        }

        child.set_collection_id(self.collection_id());
        child.set_root_path(own_path);
        self.children.push(child);

        let last = self.children.len() - 1;
        Ok(&mut self.children[last])
    }

    /// Rename child `name`, keeping sibling names unique.
    pub fn rename_child(&mut self, name: &str, new_name: &str) -> Result<&mut Unit> {
        let new_name = sanitize_name(new_name)
            .ok_or_else(|| Error::InvalidChild("child unit has no name".into()))?;
        if new_name != name && self.child_by_name(&new_name).is_some() {
            return Err(Error::InvalidChild(format!(
                "a child named '{new_name}' already exists"
            )));
        }
        let child = self
            .children
            .iter_mut()
            .find(|c| c.name() == Some(name))
            .ok_or_else(|| Error::InvalidChild(format!("no child named '{name}'")))?;
        child.change_name(&new_name)?;
        Ok(child)
    }

    /// Child group `name`, created, attached and saved if missing.
    ///
    /// The new group is only written to disk if this group has a path.
    pub fn get_or_create_group(&mut self, name: &str) -> Result<&mut Group> {
        let name = sanitize_name(name)
            .ok_or_else(|| Error::InvalidChild("child unit has no name".into()))?;
        if self.group_by_name(&name).is_none() {
            let unit = self.add_child(Group::new(&name))?;
            if unit.path().is_some() {
                unit.save()?;
            }
        }
        self.group_by_name_mut(&name)
            .ok_or_else(|| Error::InvalidChild(format!("'{name}' is not a group")))
    }

    /// Child dataset `name`, created, attached and saved if missing.
    ///
    /// The new dataset is only written to disk if this group has a path.
    pub fn get_or_create_dataset(&mut self, name: &str) -> Result<&mut Dataset> {
        let name = sanitize_name(name)
            .ok_or_else(|| Error::InvalidChild("child unit has no name".into()))?;
        if self.dataset_by_name(&name).is_none() {
            let unit = self.add_child(Dataset::new(&name))?;
            if unit.path().is_some() {
                unit.save()?;
            }
        }
        self.dataset_by_name_mut(&name)
            .ok_or_else(|| Error::InvalidChild(format!("'{name}' is not a dataset")))
    }

    /// Subdirectories of this group that contain a manifest, sorted by name.
    fn unit_dirs(path: &Path) -> Result<Vec<PathBuf>> {
        let mut dirs = Vec::new();
        for entry in fs::read_dir(path)? {
            let dir = entry?.path();
            if dir.is_dir() && dir.join(MANIFEST_FILENAME).is_file() {
                dirs.push(dir);
            }
        }
        dirs.sort();
        Ok(dirs)
    }
}

impl Default for Group {
    fn default() -> Self {
        Self::with_type(UnitType::Group, None)
    }
}

impl EdlUnit for Group {
    fn header(&self) -> &UnitHeader {
        &self.header
    }

    fn header_mut(&mut self) -> &mut UnitHeader {
        &mut self.header
    }

    fn set_root_path(&mut self, path: Option<PathBuf>) {
        self.header.set_root_path(path);
        let own_path = self.header.path();
        for child in &mut self.children {
            child.set_root_path(own_path.clone());
        }
    }

    fn set_collection_id(&mut self, id: Uuid) {
        self.header.set_collection_id(id);
        for child in &mut self.children {
            child.set_collection_id(id);
        }
    }

    fn load(&mut self, path: &Path, manifest: Option<Manifest>) -> Result<()> {
        self.header.load(path, manifest)?;
        self.children.clear();

        let own_path = self.path().ok_or(Error::NoPathSet)?;
        for dir in Self::unit_dirs(&own_path)? {
            let mf = Manifest::read(dir.join(MANIFEST_FILENAME))?;
            let mut child = match mf.unit_type().parse::<UnitType>()? {
                UnitType::Group => Unit::Group(Group::default()),
                UnitType::Dataset => Unit::Dataset(Dataset::default()),
                UnitType::Collection => {
                    return Err(Error::UnknownUnitType(UnitType::Collection.to_string()))
                }
            };
            child.load(&dir, Some(mf))?;
            self.children.push(child);
        }
        Ok(())
    }

    fn save(&self) -> Result<()> {
        let mf = self.header.make_manifest()?;
        self.header.save_metadata(&mf)?;
        for child in &self.children {
            child.save()?;
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_add_child_requires_name() {
        let mut group = Group::new("root");
        let err = group.add_child(Dataset::default()).unwrap_err();
        assert!(matches!(err, Error::InvalidChild(_)));
        assert!(group.children().is_empty());
    }

    #[test]
    fn test_add_child_rejects_duplicates() {
        let mut group = Group::new("root");
        group.add_child(Dataset::new("a")).unwrap();
        assert!(group.add_child(Group::new("a")).is_err());
        assert_eq!(group.children().len(), 1);
    }

    #[test]
    fn test_rename_child_keeps_names_unique() {
        let mut group = Group::new("root");
        group.add_child(Dataset::new("a")).unwrap();
        group.add_child(Group::new("b")).unwrap();

        let err = group.rename_child("a", "b").unwrap_err();
        assert!(matches!(err, Error::InvalidChild(_)));
        assert!(group.dataset_by_name("a").is_some());

        let renamed = group.rename_child("a", "c:d").unwrap();
        assert_eq!(renamed.name(), Some("cd"));
        assert!(group.dataset_by_name("cd").is_some());
        assert!(group.rename_child("missing", "x").is_err());
    }

    #[test]
    fn test_collection_id_propagates() {
        let mut inner = Group::new("inner");
        inner.add_child(Dataset::new("leaf")).unwrap();

        let mut outer = Group::new("outer");
        outer.add_child(inner).unwrap();

        let id = outer.collection_id();
        let inner = outer.group_by_name("inner").unwrap();
        assert_eq!(inner.collection_id(), id);
        assert_eq!(inner.dataset_by_name("leaf").unwrap().collection_id(), id);

        let new_id = Uuid::new_v4();
        outer.set_collection_id(new_id);
        let leaf = outer
            .group_by_name("inner")
            .and_then(|g| g.dataset_by_name("leaf"))
            .unwrap();
        assert_eq!(leaf.collection_id(), new_id);
    }

    #[test]
    fn test_root_path_propagates() {
        let mut group = Group::new("session");
        group.get_or_create_group("raw").unwrap();
        group
            .group_by_name_mut("raw")
            .unwrap()
            .get_or_create_dataset("cam")
            .unwrap();
        assert!(group.group_by_name("raw").unwrap().path().is_none());

        group.set_root_path(Some(PathBuf::from("/data")));
        let cam = group
            .group_by_name("raw")
            .and_then(|g| g.dataset_by_name("cam"))
            .unwrap();
        assert_eq!(cam.path(), Some(PathBuf::from("/data/session/raw/cam")));
        assert_eq!(cam.data().base_path(), Some(Path::new("/data/session/raw/cam")));
    }

    #[test]
    fn test_typed_lookup() {
        let mut group = Group::new("root");
        group.add_child(Group::new("g")).unwrap();
        group.add_child(Dataset::new("d")).unwrap();

        assert_eq!(group.groups().count(), 1);
        assert_eq!(group.datasets().count(), 1);
        assert!(group.group_by_name("d").is_none());
        assert!(group.dataset_by_name("g").is_none());
        assert!(group.get_or_create_dataset("g").is_err());
    }

    #[test]
    fn test_get_or_create_is_idempotent() {
        let dir = tempfile::tempdir().unwrap();
        let mut group = Group::new("root");
        group.set_root_path(Some(dir.path().to_path_buf()));

        let id = group.get_or_create_dataset("events").unwrap().collection_id();
        assert!(dir.path().join("root/events").join(MANIFEST_FILENAME).is_file());

        group.get_or_create_dataset("events").unwrap();
        assert_eq!(group.children().len(), 1);
        assert_eq!(group.dataset_by_name("events").unwrap().collection_id(), id);
    }

    #[test]
    fn test_load_skips_plain_directories() {
        let dir = tempfile::tempdir().unwrap();
        let mut group = Group::new("root");
        group.set_root_path(Some(dir.path().to_path_buf()));
        group.add_child(Dataset::new("b")).unwrap();
        group.add_child(Group::new("a")).unwrap();
        group.save().unwrap();
        fs::create_dir(dir.path().join("root/scratch")).unwrap();

        let mut loaded = Group::default();
        loaded.load(&dir.path().join("root"), None).unwrap();
        let names: Vec<_> = loaded.children().iter().filter_map(|c| c.name()).collect();
        assert_eq!(names, ["a", "b"]);
    }

    #[test]
    fn test_load_rejects_nested_collection() {
        let dir = tempfile::tempdir().unwrap();
        let mut group = Group::new("root");
        group.set_root_path(Some(dir.path().to_path_buf()));
        group.save().unwrap();

        let mut nested = crate::unit::Collection::new("nested");
        nested.set_root_path(Some(dir.path().join("root")));
        nested.save().unwrap();

        let err = Group::default().load(&dir.path().join("root"), None).unwrap_err();
        assert!(matches!(err, Error::UnknownUnitType(ref t) if t == "collection"));
    }
}
