//! Decoded records.

use serde_json::Value;
use tsync::TSyncFile;

use crate::dataio::{Frame, SignalReader};

/// A column-oriented table with a row index.
///
/// Cells are JSON values so that CSV and JSON sources share one type.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct DataFrame {
    pub columns: Vec<String>,
    pub index: Vec<Value>,
    /// Row-major cell values.
    pub data: Vec<Vec<Value>>,
    pub time_unit: Option<String>,
    pub data_unit: Option<String>,
    pub collection_id: Option<String>,
}

impl DataFrame {
    pub fn num_rows(&self) -> usize {
        self.data.len()
    }

    pub fn num_columns(&self) -> usize {
        self.columns.len()
    }

    /// Position of a named column.
    pub fn column_index(&self, name: &str) -> Option<usize> {
        self.columns.iter().position(|c| c == name)
    }

    /// All cells of a named column; missing cells are `null`.
    pub fn column(&self, name: &str) -> Option<Vec<&Value>> {
        let idx = self.column_index(name)?;
        Some(
            self.data
                .iter()
                .map(|row| row.get(idx).unwrap_or(&Value::Null))
                .collect(),
        )
    }
}

/// One item produced by a decoder.
#[derive(Debug)]
pub enum Record {
    /// A raw text row.
    Row(Vec<String>),
    /// A whole table.
    Table(DataFrame),
    /// A video frame.
    Frame(Frame),
    /// A lazily read electrophysiology signal.
    Signal(SignalReader),
    /// A time-sync file.
    TSync(TSyncFile),
}

impl Record {
    pub fn as_row(&self) -> Option<&[String]> {
        match self {
            Self::Row(row) => Some(row),
            _ => None,
        }
    }

    pub fn as_table(&self) -> Option<&DataFrame> {
        match self {
            Self::Table(t) => Some(t),
            _ => None,
        }
    }

    pub fn as_frame(&self) -> Option<&Frame> {
        match self {
            Self::Frame(f) => Some(f),
            _ => None,
        }
    }

    pub fn into_signal(self) -> Option<SignalReader> {
        match self {
            Self::Signal(s) => Some(s),
            _ => None,
        }
    }

    pub fn into_tsync(self) -> Option<TSyncFile> {
        match self {
            Self::TSync(t) => Some(t),
            _ => None,
        }
    }
}
