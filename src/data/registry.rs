//! Decoder dispatch.
//!
//! A [`DataFile`](super::DataFile) is mapped to a [`DataClass`] by its media
//! type and file type, and the class selects a [`Decoder`] from a
//! [`DataLoaderRegistry`].
//!
//! ## Precedence
//!
//! 1. `media_type` prefix rules ([`MEDIA_TYPE_RULES`])
//! 2. `file_type` exact rules ([`FILE_TYPE_RULES`])
//!
//! ## Example
//!
//! ```ignore
//! use edl::data::{register_decoder, DataClass};
//! use edl::dataio::VideoDecoder;
//!
//! register_decoder(DataClass::Video, VideoDecoder::new(MyFfmpegReader));
//! ```

use std::collections::HashMap;
use std::fmt;
use std::path::PathBuf;
use std::sync::Arc;

use once_cell::sync::Lazy;
use parking_lot::RwLock;

use super::{DataFile, ReadOptions, Record};
use crate::util::{Error, Result};

/// Lazy, single-pass sequence of decoded records.
pub type Records = Box<dyn Iterator<Item = Result<Record>>>;

// ============================================================================
// Data classes
// ============================================================================

/// Kind of data a decoder understands.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum DataClass {
    Video,
    TSync,
    Csv,
    Json,
    Intan,
}

/// Media type prefixes, checked first.
pub const MEDIA_TYPE_RULES: &[(&str, DataClass)] = &[
    ("video/", DataClass::Video),
    ("text/csv", DataClass::Csv),
    ("application/json", DataClass::Json),
    ("application/x-tsync", DataClass::TSync),
];

/// File types (extensions without dot), checked if no media type rule matched.
pub const FILE_TYPE_RULES: &[(&str, DataClass)] = &[
    ("tsync", DataClass::TSync),
    ("csv", DataClass::Csv),
    ("json", DataClass::Json),
    ("zst", DataClass::Json),
    ("rhd", DataClass::Intan),
];

impl DataClass {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Video => "video",
            Self::TSync => "tsync",
            Self::Csv => "csv",
            Self::Json => "json",
            Self::Intan => "intan",
        }
    }

    /// Resolve the class of data with the given type tags.
    ///
    /// Empty tags count as unset.
    pub fn resolve(media_type: Option<&str>, file_type: Option<&str>) -> Result<Self> {
        let media_type = media_type.filter(|s| !s.is_empty());
        let file_type = file_type.filter(|s| !s.is_empty());

        if let Some(media) = media_type {
            if let Some((_, class)) = MEDIA_TYPE_RULES.iter().find(|(p, _)| media.starts_with(p)) {
                return Ok(*class);
            }
        }
        if let Some(ftype) = file_type {
            if let Some((_, class)) = FILE_TYPE_RULES.iter().find(|(t, _)| *t == ftype) {
                return Ok(*class);
            }
        }

        match media_type.or(file_type) {
            Some(key) => Err(Error::UnknownDataClass(key.to_string())),
            None => Err(Error::NoTypeAssociation),
        }
    }
}

impl fmt::Display for DataClass {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

// ============================================================================
// Decoders
// ============================================================================

/// Everything a decoder gets to read one data file.
pub struct DecodeContext<'a> {
    /// Absolute part paths in index order.
    pub parts: Vec<PathBuf>,
    /// Auxiliary data of the owning dataset.
    pub aux_data: &'a [DataFile],
    pub options: &'a ReadOptions,
    /// Registry used to read auxiliary data.
    pub registry: &'a DataLoaderRegistry,
}

impl<'a> DecodeContext<'a> {
    /// All auxiliary data files whose type tags contain `key`.
    pub fn aux_by_type<'k>(&'k self, key: &'k str) -> impl Iterator<Item = &'a DataFile> + 'k {
        self.aux_data.iter().filter(move |df| df.matches_type(key))
    }

    /// Read an auxiliary data file with this context's registry.
    pub fn read_aux(&self, aux: &DataFile) -> Result<Records> {
        aux.read_with(self.registry, &[], &ReadOptions::default())
    }
}

/// Decodes the parts of a data file into records.
pub trait Decoder: Send + Sync {
    fn read(&self, ctx: DecodeContext<'_>) -> Result<Records>;
}

impl<F> Decoder for F
where
    F: Fn(DecodeContext<'_>) -> Result<Records> + Send + Sync,
{
    fn read(&self, ctx: DecodeContext<'_>) -> Result<Records> {
        self(ctx)
    }
}

// ============================================================================
// Registry
// ============================================================================

/// Maps data classes to decoders.
#[derive(Clone, Default)]
pub struct DataLoaderRegistry {
    decoders: HashMap<DataClass, Arc<dyn Decoder>>,
}

impl DataLoaderRegistry {
    /// Create an empty registry.
    pub fn new() -> Self {
        Self::default()
    }

    /// Create a registry with all decoders that need no external codec.
    pub fn with_defaults() -> Self {
        let mut registry = Self::new();
        registry.register(DataClass::TSync, crate::dataio::TSyncDecoder);
        #[cfg(feature = "csv")]
        registry.register(DataClass::Csv, crate::dataio::CsvDecoder);
        registry.register(DataClass::Json, crate::dataio::JsonDecoder);
        registry
    }

    /// Install a decoder, returning the one it replaces.
    pub fn register(
        &mut self,
        class: DataClass,
        decoder: impl Decoder + 'static,
    ) -> Option<Arc<dyn Decoder>> {
        self.decoders.insert(class, Arc::new(decoder))
    }

    /// Remove the decoder of a class.
    pub fn unregister(&mut self, class: DataClass) -> Option<Arc<dyn Decoder>> {
        self.decoders.remove(&class)
    }

    pub fn decoder(&self, class: DataClass) -> Option<Arc<dyn Decoder>> {
        self.decoders.get(&class).cloned()
    }

    pub fn contains(&self, class: DataClass) -> bool {
        self.decoders.contains_key(&class)
    }

    /// Registered classes, sorted.
    pub fn classes(&self) -> Vec<DataClass> {
        let mut classes: Vec<_> = self.decoders.keys().copied().collect();
        classes.sort();
        classes
    }
}

impl fmt::Debug for DataLoaderRegistry {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("DataLoaderRegistry")
            .field("classes", &self.classes())
            .finish()
    }
}

static DEFAULT_REGISTRY: Lazy<RwLock<DataLoaderRegistry>> =
    Lazy::new(|| RwLock::new(DataLoaderRegistry::with_defaults()));

/// Snapshot of the process-wide registry.
pub fn default_registry() -> DataLoaderRegistry {
    DEFAULT_REGISTRY.read().clone()
}

/// Install a decoder in the process-wide registry.
pub fn register_decoder(class: DataClass, decoder: impl Decoder + 'static) {
    DEFAULT_REGISTRY.write().register(class, decoder);
    tracing::debug!(%class, "registered decoder");
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_resolve_media_type() {
        let cases = [
            ("video/x-matroska", DataClass::Video),
            ("video/mp4", DataClass::Video),
            ("text/csv", DataClass::Csv),
            ("application/json", DataClass::Json),
            ("application/x-tsync", DataClass::TSync),
        ];
        for (media, class) in cases {
            assert_eq!(DataClass::resolve(Some(media), None).unwrap(), class);
        }
    }

    #[test]
    fn test_resolve_file_type() {
        let cases = [
            ("tsync", DataClass::TSync),
            ("csv", DataClass::Csv),
            ("json", DataClass::Json),
            ("zst", DataClass::Json),
            ("rhd", DataClass::Intan),
        ];
        for (ftype, class) in cases {
            assert_eq!(DataClass::resolve(None, Some(ftype)).unwrap(), class);
        }
    }

    #[test]
    fn test_media_type_wins() {
        let class = DataClass::resolve(Some("video/x-matroska"), Some("csv")).unwrap();
        assert_eq!(class, DataClass::Video);
    }

    #[test]
    fn test_unmatched_media_type_falls_back() {
        let class = DataClass::resolve(Some("application/octet-stream"), Some("rhd")).unwrap();
        assert_eq!(class, DataClass::Intan);
    }

    #[test]
    fn test_resolve_failures() {
        assert!(matches!(DataClass::resolve(None, None), Err(Error::NoTypeAssociation)));
        assert!(matches!(DataClass::resolve(Some(""), Some("")), Err(Error::NoTypeAssociation)));
        assert!(matches!(
            DataClass::resolve(Some("image/png"), None),
            Err(Error::UnknownDataClass(ref k)) if k == "image/png"
        ));
        assert!(matches!(
            DataClass::resolve(None, Some("mkv")),
            Err(Error::UnknownDataClass(ref k)) if k == "mkv"
        ));
        // prefix rules are not substring rules
        assert!(DataClass::resolve(Some("x-video/raw"), None).is_err());
    }

    #[test]
    fn test_aux_by_type_outlives_key() {
        let aux = vec![
            DataFile::new().with_file_type("tsync"),
            DataFile::new().with_media_type("text/csv"),
            DataFile::new().with_file_type("tsync").with_summary("second clock"),
        ];
        let options = ReadOptions::default();
        let registry = DataLoaderRegistry::new();
        let ctx = DecodeContext {
            parts: Vec::new(),
            aux_data: &aux,
            options: &options,
            registry: &registry,
        };

        let found: Vec<&DataFile> = {
            let key = String::from("tsync");
            ctx.aux_by_type(&key).collect()
        };
        assert_eq!(found.len(), 2);
        assert_eq!(found[1].summary(), Some("second clock"));
        assert_eq!(ctx.aux_by_type("csv").count(), 1);
    }

    #[test]
    fn test_default_classes() {
        let registry = DataLoaderRegistry::with_defaults();
        assert!(registry.contains(DataClass::TSync));
        assert!(registry.contains(DataClass::Json));
        assert!(!registry.contains(DataClass::Video));
        assert!(!registry.contains(DataClass::Intan));
        #[cfg(feature = "csv")]
        assert!(registry.contains(DataClass::Csv));
    }

    #[test]
    fn test_missing_decoder() {
        let mut df = DataFile::new().with_media_type("video/x-matroska");
        df.set_base_path(Some(PathBuf::from("/tmp")));
        let err = df
            .read_with(&DataLoaderRegistry::new(), &[], &ReadOptions::default())
            .err()
            .unwrap();
        assert!(matches!(err, Error::UnknownDataClass(ref k) if k == "video"));
    }

    #[test]
    fn test_closure_decoder() {
        let mut registry = DataLoaderRegistry::new();
        registry.register(DataClass::Video, |ctx: DecodeContext<'_>| -> Result<Records> {
            let rows: Vec<Result<Record>> = ctx
                .parts
                .into_iter()
                .map(|p| Ok(Record::Row(vec![p.display().to_string()])))
                .collect();
            Ok(Box::new(rows.into_iter()))
        });

        let mut df = DataFile::new().with_media_type("video/mp4");
        df.add_part("a.mp4").unwrap();
        df.set_base_path(Some(PathBuf::from("/rec")));

        let records: Vec<Record> = df
            .read_with(&registry, &[], &ReadOptions::default())
            .unwrap()
            .collect::<Result<_>>()
            .unwrap();
        assert_eq!(records.len(), 1);
        assert_eq!(records[0].as_row(), Some(&["/rec/a.mp4".to_string()][..]));
    }
}
