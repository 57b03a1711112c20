//! Delimited text tables.
//!
//! Rows are read with `;` as default delimiter, which is what acquisition
//! software writes for event and timestamp tables.

use std::fs::File;
use std::path::{Path, PathBuf};
use std::vec;

use serde_json::Value;

use crate::data::{DataFrame, DecodeContext, Decoder, Record, Records};
use crate::util::{Error, Result};

/// Default field delimiter.
pub const DEFAULT_DELIMITER: u8 = b';';

/// Yields [`Record::Row`]s, or one [`Record::Table`] per part with the
/// `as_table` option.
#[derive(Clone, Copy, Debug, Default)]
pub struct CsvDecoder;

impl Decoder for CsvDecoder {
    fn read(&self, ctx: DecodeContext<'_>) -> Result<Records> {
        let delimiter = match ctx.options.string("delimiter") {
            None => DEFAULT_DELIMITER,
            Some(d) if d.len() == 1 => d.as_bytes()[0],
            Some(d) => return Err(Error::decode(format!("invalid CSV delimiter {d:?}"))),
        };

        if ctx.options.flag("as_table", false) {
            let tables = ctx
                .parts
                .into_iter()
                .map(move |path| read_table(&path, delimiter).map(Record::Table));
            Ok(Box::new(tables))
        } else {
            Ok(Box::new(CsvRows::new(ctx.parts, delimiter)))
        }
    }
}

fn reader_builder(delimiter: u8) -> csv::ReaderBuilder {
    let mut builder = csv::ReaderBuilder::new();
    builder.delimiter(delimiter).has_headers(false).flexible(true);
    builder
}

/// Rows of all parts, opening one part at a time.
pub struct CsvRows {
    parts: vec::IntoIter<PathBuf>,
    delimiter: u8,
    current: Option<csv::StringRecordsIntoIter<File>>,
}

impl CsvRows {
    pub fn new(parts: Vec<PathBuf>, delimiter: u8) -> Self {
        Self {
            parts: parts.into_iter(),
            delimiter,
            current: None,
        }
    }
}

impl Iterator for CsvRows {
    type Item = Result<Record>;

    fn next(&mut self) -> Option<Self::Item> {
        loop {
            if let Some(row) = self.current.as_mut().and_then(|rows| rows.next()) {
                return Some(
                    row.map(|r| Record::Row(r.iter().map(str::to_owned).collect()))
                        .map_err(Error::from),
                );
            }

            let path = self.parts.next()?;
            match reader_builder(self.delimiter).from_path(&path) {
                Ok(reader) => self.current = Some(reader.into_records()),
                Err(e) => {
                    self.current = None;
                    return Some(Err(e.into()));
                }
            }
        }
    }
}

/// Read one part as a table with the first row as header.
fn read_table(path: &Path, delimiter: u8) -> Result<DataFrame> {
    let mut reader = reader_builder(delimiter).from_path(path)?;
    let mut rows = reader.records();

    let columns = match rows.next() {
        Some(header) => header?.iter().map(str::to_owned).collect(),
        None => Vec::new(),
    };

    let mut frame = DataFrame {
        columns,
        ..DataFrame::default()
    };
    for (i, row) in rows.enumerate() {
        let row = row?;
        frame.index.push(Value::from(i));
        frame
            .data
            .push(row.iter().map(|cell| Value::String(cell.to_owned())).collect());
    }
    Ok(frame)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::data::{DataFile, ReadOptions};
    use std::fs;

    fn events_file(dir: &Path) -> DataFile {
        fs::write(dir.join("events_0.csv"), "time;event\n10;start\n").unwrap();
        fs::write(dir.join("events_1.csv"), "time;event\n20;stop\n30;pause\n").unwrap();

        let mut df = DataFile::new();
        df.new_part("events_1.csv", 1, false).unwrap();
        df.new_part("events_0.csv", 0, false).unwrap();
        df.set_base_path(Some(dir.to_path_buf()));
        df
    }

    #[test]
    fn test_rows_across_parts() {
        let dir = tempfile::tempdir().unwrap();
        let df = events_file(dir.path());

        let rows: Vec<Vec<String>> = df
            .read(&[], &ReadOptions::default())
            .unwrap()
            .map(|r| r.unwrap().as_row().unwrap().to_vec())
            .collect();

        assert_eq!(rows.len(), 5);
        assert_eq!(rows[0], ["time", "event"]);
        assert_eq!(rows[1], ["10", "start"]);
        assert_eq!(rows[4], ["30", "pause"]);
    }

    #[test]
    fn test_as_table() {
        let dir = tempfile::tempdir().unwrap();
        let df = events_file(dir.path());

        let opts = ReadOptions::new().with("as_table", true);
        let tables: Vec<DataFrame> = df
            .read(&[], &opts)
            .unwrap()
            .map(|r| r.unwrap().as_table().unwrap().clone())
            .collect();

        assert_eq!(tables.len(), 2);
        assert_eq!(tables[1].columns, ["time", "event"]);
        assert_eq!(tables[1].num_rows(), 2);
        assert_eq!(tables[1].column("event").unwrap()[1], &Value::from("pause"));
    }

    #[test]
    fn test_custom_delimiter() {
        let dir = tempfile::tempdir().unwrap();
        fs::write(dir.path().join("a.csv"), "1,2,3\n").unwrap();
        let mut df = DataFile::new();
        df.add_part("a.csv").unwrap();
        df.set_base_path(Some(dir.path().to_path_buf()));

        let opts = ReadOptions::new().with("delimiter", ",");
        let row = df.read(&[], &opts).unwrap().next().unwrap().unwrap();
        assert_eq!(row.as_row().unwrap().len(), 3);

        let bad = ReadOptions::new().with("delimiter", ";;");
        assert!(matches!(df.read(&[], &bad), Err(Error::Decode(_))));
    }

    #[test]
    fn test_missing_part() {
        let dir = tempfile::tempdir().unwrap();
        let mut rows = CsvRows::new(vec![dir.path().join("none.csv")], DEFAULT_DELIMITER);
        assert!(matches!(rows.next(), Some(Err(Error::Csv(_)))));
        assert!(rows.next().is_none());
    }
}
