//! Time-synchronization (.tsync) file reader and writer.
//!
//! A tsync file stores pairs of timestamps that relate a device clock to a
//! master clock. Depending on [`TSyncFileMode`] the pairs either describe
//! every sample (continuous mode, e.g. video frame index to master time) or
//! only the points at which the device clock was corrected (syncpoints mode).
//!
//! ## Layout
//!
//! All integers are little-endian. Strings are a `u32` byte length followed
//! by UTF-8 data.
//!
//! | Field          | Type          |
//! |----------------|---------------|
//! | magic          | `[u8; 8]`     |
//! | version        | `u16`         |
//! | time_created   | `i64` (unix s)|
//! | module_name    | string        |
//! | collection_id  | string        |
//! | user_header    | string (JSON) |
//! | sync_mode      | `u16`         |
//! | time_names     | 2 x string    |
//! | time_units     | 2 x `u16`     |
//! | entry count    | `u64`         |
//! | entries        | n x (`i64`, `i64`) |
//!
//! ## Example
//!
//! ```ignore
//! use tsync::TSyncFile;
//!
//! let tsf = TSyncFile::open("camera_timestamps.tsync")?;
//! for (device, master) in &tsf.times {
//!     println!("{device} -> {master}");
//! }
//! ```

use std::fmt;
use std::fs::File;
use std::io::{self, BufReader, BufWriter, Read, Write};
use std::path::Path;

use byteorder::{LittleEndian, ReadBytesExt, WriteBytesExt};
use thiserror::Error;

/// Magic bytes at the start of every tsync file.
pub const TSYNC_MAGIC: &[u8; 8] = b"ETSYNC\x00\x01";

/// Current tsync format version.
pub const TSYNC_FORMAT_VERSION: u16 = 1;

/// Upper bound for a single string field, guards against corrupt length prefixes.
const MAX_STRING_LEN: u32 = 64 * 1024 * 1024;

/// Errors raised while reading or writing tsync files.
#[derive(Error, Debug)]
pub enum Error {
    /// Invalid magic bytes at start of file
    #[error("Invalid tsync file: expected magic bytes")]
    InvalidMagic,

    /// Unsupported file format version
    #[error("Unsupported tsync format version: {0}")]
    UnsupportedVersion(u16),

    /// Enum field holds a value this reader does not know
    #[error("Invalid value {value} for {field}")]
    InvalidEnum { field: &'static str, value: u16 },

    /// File ended in the middle of a field
    #[error("Unexpected end of tsync data")]
    Truncated,

    /// String field too large to be plausible
    #[error("String field of {0} bytes exceeds limit")]
    StringTooLong(u32),

    /// I/O error
    #[error("I/O error: {0}")]
    Io(io::Error),

    /// UTF-8 conversion error
    #[error("Invalid UTF-8: {0}")]
    Utf8(#[from] std::string::FromUtf8Error),
}

impl From<io::Error> for Error {
    fn from(e: io::Error) -> Self {
        if e.kind() == io::ErrorKind::UnexpectedEof {
            Self::Truncated
        } else {
            Self::Io(e)
        }
    }
}

/// Result type alias for tsync operations.
pub type Result<T> = std::result::Result<T, Error>;

/// How the timestamp pairs of a file are meant to be interpreted.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
#[repr(u16)]
pub enum TSyncFileMode {
    /// One pair per sample, no interpolation required.
    Continuous = 0,
    /// Sparse correction points, interpolate in between.
    SyncPoints = 1,
}

impl TryFrom<u16> for TSyncFileMode {
    type Error = Error;

    fn try_from(value: u16) -> Result<Self> {
        match value {
            0 => Ok(Self::Continuous),
            1 => Ok(Self::SyncPoints),
            _ => Err(Error::InvalidEnum { field: "sync_mode", value }),
        }
    }
}

impl fmt::Display for TSyncFileMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Continuous => write!(f, "continuous"),
            Self::SyncPoints => write!(f, "syncpoints"),
        }
    }
}

/// Unit of one timestamp column.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
#[repr(u16)]
pub enum TSyncTimeUnit {
    /// Plain sample or frame index.
    Index = 0,
    Nanoseconds = 1,
    Microseconds = 2,
    Milliseconds = 3,
    Seconds = 4,
}

impl TryFrom<u16> for TSyncTimeUnit {
    type Error = Error;

    fn try_from(value: u16) -> Result<Self> {
        match value {
            0 => Ok(Self::Index),
            1 => Ok(Self::Nanoseconds),
            2 => Ok(Self::Microseconds),
            3 => Ok(Self::Milliseconds),
            4 => Ok(Self::Seconds),
            _ => Err(Error::InvalidEnum { field: "time_unit", value }),
        }
    }
}

impl fmt::Display for TSyncTimeUnit {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            Self::Index => "index",
            Self::Nanoseconds => "ns",
            Self::Microseconds => "µs",
            Self::Milliseconds => "ms",
            Self::Seconds => "s",
        };
        f.write_str(s)
    }
}

/// Contents of a tsync file.
#[derive(Clone, Debug, PartialEq)]
pub struct TSyncFile {
    /// Creation time as unix timestamp (seconds).
    pub time_created: i64,
    /// Name of the module that recorded the data.
    pub module_name: String,
    /// Collection ID of the recording this file belongs to.
    pub collection_id: String,
    /// Free-form JSON header.
    pub user_header: String,
    /// Interpretation of the timestamp pairs.
    pub sync_mode: TSyncFileMode,
    /// Names of the (device, master) columns.
    pub time_names: (String, String),
    /// Units of the (device, master) columns.
    pub time_units: (TSyncTimeUnit, TSyncTimeUnit),
    /// (device, master) timestamp pairs.
    pub times: Vec<(i64, i64)>,
}

impl TSyncFile {
    /// Create an empty file description.
    pub fn new(sync_mode: TSyncFileMode, time_units: (TSyncTimeUnit, TSyncTimeUnit)) -> Self {
        Self {
            time_created: 0,
            module_name: String::new(),
            collection_id: String::new(),
            user_header: String::new(),
            sync_mode,
            time_names: (String::from("device-time"), String::from("master-time")),
            time_units,
            times: Vec::new(),
        }
    }

    /// Read a tsync file from disk.
    pub fn open(path: impl AsRef<Path>) -> Result<Self> {
        let file = File::open(path)?;
        Self::read_from(&mut BufReader::new(file))
    }

    /// Write this file to disk, replacing existing content.
    pub fn save(&self, path: impl AsRef<Path>) -> Result<()> {
        let file = File::create(path)?;
        let mut writer = BufWriter::new(file);
        self.write_to(&mut writer)?;
        writer.flush()?;
        Ok(())
    }

    /// Parse tsync data from a reader.
    pub fn read_from<R: Read>(reader: &mut R) -> Result<Self> {
        let mut magic = [0u8; 8];
        reader.read_exact(&mut magic)?;
        if &magic != TSYNC_MAGIC {
            return Err(Error::InvalidMagic);
        }

        let version = reader.read_u16::<LittleEndian>()?;
        if version != TSYNC_FORMAT_VERSION {
            return Err(Error::UnsupportedVersion(version));
        }

        let time_created = reader.read_i64::<LittleEndian>()?;
        let module_name = read_string(reader)?;
        let collection_id = read_string(reader)?;
        let user_header = read_string(reader)?;
        let sync_mode = TSyncFileMode::try_from(reader.read_u16::<LittleEndian>()?)?;
        let time_names = (read_string(reader)?, read_string(reader)?);
        let time_units = (
            TSyncTimeUnit::try_from(reader.read_u16::<LittleEndian>()?)?,
            TSyncTimeUnit::try_from(reader.read_u16::<LittleEndian>()?)?,
        );

        let count = reader.read_u64::<LittleEndian>()?;
        // capacity is only a hint, a corrupt count must not trigger a huge allocation
        let mut times = Vec::with_capacity(count.min(1 << 16) as usize);
        for _ in 0..count {
            let device = reader.read_i64::<LittleEndian>()?;
            let master = reader.read_i64::<LittleEndian>()?;
            times.push((device, master));
        }

        Ok(Self {
            time_created,
            module_name,
            collection_id,
            user_header,
            sync_mode,
            time_names,
            time_units,
            times,
        })
    }

    /// Serialize this file to a writer.
    pub fn write_to<W: Write>(&self, writer: &mut W) -> Result<()> {
        writer.write_all(TSYNC_MAGIC)?;
        writer.write_u16::<LittleEndian>(TSYNC_FORMAT_VERSION)?;
        writer.write_i64::<LittleEndian>(self.time_created)?;
        write_string(writer, &self.module_name)?;
        write_string(writer, &self.collection_id)?;
        write_string(writer, &self.user_header)?;
        writer.write_u16::<LittleEndian>(self.sync_mode as u16)?;
        write_string(writer, &self.time_names.0)?;
        write_string(writer, &self.time_names.1)?;
        writer.write_u16::<LittleEndian>(self.time_units.0 as u16)?;
        writer.write_u16::<LittleEndian>(self.time_units.1 as u16)?;

        writer.write_u64::<LittleEndian>(self.times.len() as u64)?;
        for &(device, master) in &self.times {
            writer.write_i64::<LittleEndian>(device)?;
            writer.write_i64::<LittleEndian>(master)?;
        }
        Ok(())
    }

    /// Number of timestamp pairs.
    #[inline]
    pub fn len(&self) -> usize {
        self.times.len()
    }

    /// Check if the file holds no timestamp pairs.
    #[inline]
    pub fn is_empty(&self) -> bool {
        self.times.is_empty()
    }
}

fn read_string<R: Read>(reader: &mut R) -> Result<String> {
    let len = reader.read_u32::<LittleEndian>()?;
    if len > MAX_STRING_LEN {
        return Err(Error::StringTooLong(len));
    }
    let mut buf = vec![0u8; len as usize];
    reader.read_exact(&mut buf)?;
    Ok(String::from_utf8(buf)?)
}

fn write_string<W: Write>(writer: &mut W, s: &str) -> Result<()> {
    writer.write_u32::<LittleEndian>(s.len() as u32)?;
    writer.write_all(s.as_bytes())?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Cursor;

    fn sample_file() -> TSyncFile {
        let mut tsf = TSyncFile::new(
            TSyncFileMode::SyncPoints,
            (TSyncTimeUnit::Microseconds, TSyncTimeUnit::Microseconds),
        );
        tsf.time_created = 1_612_804_646;
        tsf.module_name = "Intan RHD2000".into();
        tsf.collection_id = "a8701155-7b2e-4d3b-a0a4-6ec1b02d2b3c".into();
        tsf.user_header = r#"{"subject":"blink1"}"#.into();
        tsf.times = vec![(6196, 0), (1_000_000, 1_000_120), (2_000_000, 2_000_310)];
        tsf
    }

    #[test]
    fn test_write_then_read() {
        let tsf = sample_file();
        let mut buf = Vec::new();
        tsf.write_to(&mut buf).unwrap();

        let parsed = TSyncFile::read_from(&mut Cursor::new(&buf)).unwrap();
        assert_eq!(parsed, tsf);
        assert_eq!(parsed.len(), 3);
    }

    #[test]
    fn test_invalid_magic() {
        let mut data = b"NOTSYNC!".to_vec();
        data.extend_from_slice(&[0u8; 32]);
        let err = TSyncFile::read_from(&mut Cursor::new(&data)).unwrap_err();
        assert!(matches!(err, Error::InvalidMagic));
    }

    #[test]
    fn test_unsupported_version() {
        let mut data = TSYNC_MAGIC.to_vec();
        data.extend_from_slice(&7u16.to_le_bytes());
        let err = TSyncFile::read_from(&mut Cursor::new(&data)).unwrap_err();
        assert!(matches!(err, Error::UnsupportedVersion(7)));
    }

    #[test]
    fn test_truncated_entries() {
        let mut buf = Vec::new();
        sample_file().write_to(&mut buf).unwrap();
        buf.truncate(buf.len() - 4);

        let err = TSyncFile::read_from(&mut Cursor::new(&buf)).unwrap_err();
        assert!(matches!(err, Error::Truncated));
    }

    #[test]
    fn test_invalid_mode() {
        let tsf = TSyncFile::new(
            TSyncFileMode::Continuous,
            (TSyncTimeUnit::Index, TSyncTimeUnit::Milliseconds),
        );
        let mut buf = Vec::new();
        tsf.write_to(&mut buf).unwrap();

        // magic + version + time + 3 empty strings
        let mode_pos = 8 + 2 + 8 + 3 * 4;
        buf[mode_pos] = 9;
        let err = TSyncFile::read_from(&mut Cursor::new(&buf)).unwrap_err();
        assert!(matches!(err, Error::InvalidEnum { field: "sync_mode", value: 9 }));
    }

    #[test]
    fn test_save_and_open() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("frames.tsync");

        let mut tsf = TSyncFile::new(
            TSyncFileMode::Continuous,
            (TSyncTimeUnit::Index, TSyncTimeUnit::Milliseconds),
        );
        tsf.times = (0..10).map(|i| (i, i * 33)).collect();
        tsf.save(&path).unwrap();

        let loaded = TSyncFile::open(&path).unwrap();
        assert_eq!(loaded.sync_mode, TSyncFileMode::Continuous);
        assert_eq!(loaded.times[9], (9, 297));
    }

    #[test]
    fn test_unit_display() {
        assert_eq!(TSyncTimeUnit::Milliseconds.to_string(), "ms");
        assert_eq!(TSyncFileMode::SyncPoints.to_string(), "syncpoints");
    }
}
