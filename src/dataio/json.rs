//! JSON tables in pandas "split" orientation.
//!
//! ```json
//! {"columns": ["time", "value"], "index": [0, 1], "data": [[0, 1.5], [10, 1.7]]}
//! ```
//!
//! The `extended-pandas` schema adds `collection_id`, `time_unit` and
//! `data_unit` keys, and may omit the index.

use std::fs::File;
use std::io::{BufReader, Read};
use std::path::Path;

use serde::Deserialize;
use serde_json::Value;

use crate::data::{DataFrame, DecodeContext, Decoder, Record, Records};
use crate::util::{Error, Result};

/// Value of the `json_schema` option selecting the extended layout.
pub const EXTENDED_PANDAS_SCHEMA: &str = "extended-pandas";

/// Yields one [`Record::Table`] per part.
#[derive(Clone, Copy, Debug, Default)]
pub struct JsonDecoder;

impl Decoder for JsonDecoder {
    fn read(&self, ctx: DecodeContext<'_>) -> Result<Records> {
        let extended = ctx.options.string("json_schema") == Some(EXTENDED_PANDAS_SCHEMA);
        let tables = ctx
            .parts
            .into_iter()
            .map(move |path| read_table(&path, extended).map(Record::Table));
        Ok(Box::new(tables))
    }
}

#[derive(Deserialize)]
struct SplitDocument {
    #[serde(default)]
    columns: Vec<Value>,
    #[serde(default)]
    index: Option<Vec<Value>>,
    #[serde(default)]
    data: Vec<Vec<Value>>,
    collection_id: Option<String>,
    time_unit: Option<String>,
    data_unit: Option<String>,
}

fn column_name(value: Value) -> String {
    match value {
        Value::String(s) => s,
        other => other.to_string(),
    }
}

fn open_part(path: &Path) -> Result<Box<dyn Read>> {
    let file = File::open(path)?;
    if path.extension().is_some_and(|e| e == "zst") {
        #[cfg(feature = "zstd")]
        return Ok(Box::new(zstd::stream::read::Decoder::new(file)?));
        #[cfg(not(feature = "zstd"))]
        return Err(Error::decode(format!(
            "{} is zstd-compressed, but zstd support is not enabled",
            path.display()
        )));
    }
    Ok(Box::new(BufReader::new(file)))
}

fn read_table(path: &Path, extended: bool) -> Result<DataFrame> {
    let doc: SplitDocument = serde_json::from_reader(open_part(path)?)?;

    let mut frame = DataFrame {
        columns: doc.columns.into_iter().map(column_name).collect(),
        index: doc.index.unwrap_or_default(),
        data: doc.data,
        ..DataFrame::default()
    };

    if extended {
        let missing = |key: &str| Error::decode(format!("{}: missing `{key}`", path.display()));
        frame.collection_id = Some(doc.collection_id.ok_or_else(|| missing("collection_id"))?);
        frame.time_unit = Some(doc.time_unit.ok_or_else(|| missing("time_unit"))?);
        frame.data_unit = Some(doc.data_unit.ok_or_else(|| missing("data_unit"))?);
    }
    if frame.index.is_empty() {
        frame.index = (0..frame.data.len()).map(Value::from).collect();
    }

    Ok(frame)
}
