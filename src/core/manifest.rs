//! Manifest documents for EDL units.
//!
//! Every unit directory holds a `manifest.toml` describing its type and
//! identity, and optionally an `attributes.toml` with free-form user metadata.
//!
//! ```toml
//! format_version = "1"
//! type = "dataset"
//! collection_id = "a8701155-7b2e-4d3b-a0a4-6ec1b02d2b3c"
//! time_created = 2021-02-08T18:17:26+01:00
//! generator = "Syntalos 0.8.4"
//!
//! [data]
//! media_type = "video/x-matroska"
//! parts = [{ fname = "cam_1.mkv", index = 0 }]
//!
//! [[data_aux]]
//! file_type = "tsync"
//! parts = [{ fname = "cam_timestamps.tsync" }]
//! ```

use std::fs;
use std::path::Path;

use chrono::{DateTime, FixedOffset, Local, NaiveDate, NaiveDateTime, SecondsFormat, TimeZone, Utc};
use serde::{Deserialize, Deserializer, Serialize};
use toml::value::Datetime;
use uuid::Uuid;

use crate::util::{Error, Result};

/// EDL format version this library reads and writes.
pub const FORMAT_VERSION: &str = "1";

/// File name of the unit manifest.
pub const MANIFEST_FILENAME: &str = "manifest.toml";

/// File name of the optional attributes document.
pub const ATTRIBUTES_FILENAME: &str = "attributes.toml";

/// Contents of a `manifest.toml` file.
///
/// Fields are optional at this level; required-ness is checked when a unit
/// is loaded so that errors can name the unit path.
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct Manifest {
    /// Format version, usually a string but tolerated as any value.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub format_version: Option<toml::Value>,

    /// Declared unit type.
    #[serde(rename = "type", default, skip_serializing_if = "Option::is_none")]
    pub unit_type: Option<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub collection_id: Option<Uuid>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub time_created: Option<Datetime>,

    /// Identifier of the software that generated the unit.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub generator: Option<String>,

    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub authors: Vec<String>,

    /// Primary data of a dataset.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub data: Option<DataFileEntry>,

    /// Auxiliary data of a dataset.
    #[serde(
        default,
        skip_serializing_if = "Vec::is_empty",
        deserialize_with = "one_or_many"
    )]
    pub data_aux: Vec<DataFileEntry>,
}

/// A `data` or `data_aux` table.
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct DataFileEntry {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub media_type: Option<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub file_type: Option<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub summary: Option<String>,

    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub parts: Vec<PartEntry>,
}

/// One entry of a `parts` list.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct PartEntry {
    pub fname: String,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub index: Option<i64>,
}

impl Manifest {
    /// Parse a manifest from TOML text.
    pub fn from_toml(content: &str) -> Result<Self> {
        Ok(toml::from_str(content)?)
    }

    /// Serialize this manifest to TOML text.
    pub fn to_toml(&self) -> Result<String> {
        Ok(toml::to_string(self)?)
    }

    /// Read a manifest file.
    pub fn read(path: impl AsRef<Path>) -> Result<Self> {
        let content = fs::read_to_string(path)?;
        Self::from_toml(&content)
    }

    /// Write this manifest to a file.
    pub fn write(&self, path: impl AsRef<Path>) -> Result<()> {
        fs::write(path, self.to_toml()?)?;
        Ok(())
    }

    /// Format version as string, `"unknown"` if missing.
    pub fn format_version(&self) -> String {
        match &self.format_version {
            Some(toml::Value::String(s)) => s.clone(),
            Some(other) => other.to_string(),
            None => String::from("unknown"),
        }
    }

    /// Declared unit type, empty if missing.
    pub fn unit_type(&self) -> &str {
        self.unit_type.as_deref().unwrap_or_default()
    }
}

fn one_or_many<'de, D>(deserializer: D) -> std::result::Result<Vec<DataFileEntry>, D::Error>
where
    D: Deserializer<'de>,
{
    #[derive(Deserialize)]
    #[serde(untagged)]
    enum OneOrMany {
        // must come first, an empty array would otherwise match a defaulted entry
        Many(Vec<DataFileEntry>),
        One(DataFileEntry),
    }

    Ok(match OneOrMany::deserialize(deserializer)? {
        OneOrMany::Many(entries) => entries,
        OneOrMany::One(entry) => vec![entry],
    })
}

/// Read an attributes document.
pub fn read_attributes(path: impl AsRef<Path>) -> Result<toml::Table> {
    let content = fs::read_to_string(path)?;
    Ok(toml::from_str(&content)?)
}

/// Write an attributes document.
pub fn write_attributes(path: impl AsRef<Path>, attributes: &toml::Table) -> Result<()> {
    fs::write(path, toml::to_string(attributes)?)?;
    Ok(())
}

// ============================================================================
// Timestamp Conversion
// ============================================================================

/// Convert a creation time to a TOML offset datetime.
pub fn datetime_to_toml(dt: &DateTime<FixedOffset>) -> Result<Datetime> {
    dt.to_rfc3339_opts(SecondsFormat::Secs, false)
        .parse()
        .map_err(|e| Error::decode(format!("invalid timestamp {dt}: {e}")))
}

/// Convert a TOML datetime to a creation time.
///
/// Local datetimes (no offset) are interpreted in the local timezone, plain
/// dates as local midnight.
pub fn datetime_from_toml(dt: &Datetime) -> Result<DateTime<FixedOffset>> {
    let s = dt.to_string();
    let invalid = || Error::decode(format!("invalid timestamp '{s}'"));

    if dt.offset.is_some() {
        return DateTime::parse_from_rfc3339(&s).map_err(|_| invalid());
    }

    let naive = match (dt.date.is_some(), dt.time.is_some()) {
        (true, true) => NaiveDateTime::parse_from_str(&s, "%Y-%m-%dT%H:%M:%S%.f")
            .or_else(|_| NaiveDateTime::parse_from_str(&s, "%Y-%m-%dT%H:%M:%S"))
            .map_err(|_| invalid())?,
        (true, false) => NaiveDate::parse_from_str(&s, "%Y-%m-%d")
            .map_err(|_| invalid())?
            .and_hms_opt(0, 0, 0)
            .ok_or_else(invalid)?,
        _ => return Err(invalid()),
    };

    match Local.from_local_datetime(&naive).earliest() {
        Some(local) => Ok(local.fixed_offset()),
        // nonexistent local time (DST gap)
        None => Ok(Utc.from_utc_datetime(&naive).fixed_offset()),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{Datelike, Timelike};

    const DATASET_MANIFEST: &str = r#"
format_version = "1"
type = "dataset"
collection_id = "a8701155-7b2e-4d3b-a0a4-6ec1b02d2b3c"
time_created = 2021-02-08T18:17:26+01:00
generator = "Syntalos 0.8.4"
authors = ["Jane Doe"]

[data]
media_type = "video/x-matroska"
summary = "Miniscope video"
parts = [{ fname = "msc_2.mkv", index = 1 }, { fname = "msc_1.mkv", index = 0 }]

[[data_aux]]
file_type = "tsync"
parts = [{ fname = "msc_timestamps.tsync" }]
"#;

    #[test]
    fn test_parse_dataset_manifest() {
        let mf = Manifest::from_toml(DATASET_MANIFEST).unwrap();
        assert_eq!(mf.format_version(), "1");
        assert_eq!(mf.unit_type(), "dataset");
        assert_eq!(mf.generator.as_deref(), Some("Syntalos 0.8.4"));
        assert_eq!(mf.authors, vec!["Jane Doe".to_string()]);

        let data = mf.data.as_ref().unwrap();
        assert_eq!(data.media_type.as_deref(), Some("video/x-matroska"));
        assert_eq!(data.parts.len(), 2);
        assert_eq!(data.parts[0].index, Some(1));

        assert_eq!(mf.data_aux.len(), 1);
        assert_eq!(mf.data_aux[0].parts[0].index, None);
    }

    #[test]
    fn test_single_aux_table() {
        let mf = Manifest::from_toml(
            r#"
format_version = "1"
type = "dataset"

[data_aux]
file_type = "csv"
"#,
        )
        .unwrap();
        assert_eq!(mf.data_aux.len(), 1);
        assert_eq!(mf.data_aux[0].file_type.as_deref(), Some("csv"));
    }

    #[test]
    fn test_format_version_variants() {
        let mf = Manifest::from_toml("format_version = 2\ntype = \"group\"").unwrap();
        assert_eq!(mf.format_version(), "2");

        let mf = Manifest::from_toml("type = \"group\"").unwrap();
        assert_eq!(mf.format_version(), "unknown");
    }

    #[test]
    fn test_manifest_serialize() {
        let mut mf = Manifest::from_toml(DATASET_MANIFEST).unwrap();
        mf.generator = None;

        let text = mf.to_toml().unwrap();
        assert!(text.contains("format_version = \"1\""));
        assert!(text.contains("type = \"dataset\""));
        assert!(!text.contains("generator"));

        let parsed = Manifest::from_toml(&text).unwrap();
        assert_eq!(parsed, mf);
    }

    #[test]
    fn test_datetime_offset() {
        let mf = Manifest::from_toml(DATASET_MANIFEST).unwrap();
        let dt = datetime_from_toml(mf.time_created.as_ref().unwrap()).unwrap();
        assert_eq!(dt.year(), 2021);
        assert_eq!(dt.hour(), 18);
        assert_eq!(dt.offset().local_minus_utc(), 3600);

        let back = datetime_to_toml(&dt).unwrap();
        assert_eq!(datetime_from_toml(&back).unwrap(), dt);
    }

    #[test]
    fn test_datetime_local() {
        let dt: Datetime = "2020-11-03T09:30:00".parse().unwrap();
        let parsed = datetime_from_toml(&dt).unwrap();
        assert_eq!(parsed.naive_local().to_string(), "2020-11-03 09:30:00");

        let date: Datetime = "2020-11-03".parse().unwrap();
        let parsed = datetime_from_toml(&date).unwrap();
        assert_eq!(parsed.day(), 3);
        assert_eq!(parsed.hour(), 0);
    }
}
