//! Reading of time-sync files.

use std::path::PathBuf;

use tsync::TSyncFile;

use crate::data::{DataFile, DecodeContext, Decoder, Record, Records};
use crate::util::{Error, Result};

/// Yields one [`Record::TSync`] per part.
#[derive(Clone, Copy, Debug, Default)]
pub struct TSyncDecoder;

impl Decoder for TSyncDecoder {
    fn read(&self, ctx: DecodeContext<'_>) -> Result<Records> {
        Ok(Box::new(ctx.parts.into_iter().map(read_part)))
    }
}

fn read_part(path: PathBuf) -> Result<Record> {
    let tsf = TSyncFile::open(&path)?;
    tracing::debug!(
        path = %path.display(),
        entries = tsf.len(),
        mode = %tsf.sync_mode,
        "read tsync file"
    );
    Ok(Record::TSync(tsf))
}

/// Read all time-sync files of an auxiliary data stream.
pub(crate) fn read_tsync_files(ctx: &DecodeContext<'_>, aux: &DataFile) -> Result<Vec<TSyncFile>> {
    let mut files = Vec::new();
    for record in ctx.read_aux(aux)? {
        match record?.into_tsync() {
            Some(tsf) => files.push(tsf),
            None => {
                return Err(Error::sync(format!(
                    "auxiliary data {:?} did not decode to time-sync files",
                    aux.parts().first().map(|p| p.fname()).unwrap_or_default()
                )));
            }
        }
    }
    Ok(files)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::data::{DataClass, DataLoaderRegistry, ReadOptions};
    use tsync::{TSyncFileMode, TSyncTimeUnit};

    #[test]
    fn test_read_parts() {
        let dir = tempfile::tempdir().unwrap();
        let mut df = DataFile::new();
        for (i, n) in [3usize, 5].iter().enumerate() {
            let mut tsf = TSyncFile::new(
                TSyncFileMode::Continuous,
                (TSyncTimeUnit::Index, TSyncTimeUnit::Milliseconds),
            );
            tsf.times = (0..*n as i64).map(|k| (k, k * 33)).collect();
            let fname = format!("ts_{i}.tsync");
            tsf.save(dir.path().join(&fname)).unwrap();
            df.new_part(&fname, i as i64, false).unwrap();
        }
        df.set_base_path(Some(dir.path().to_path_buf()));

        let lens: Vec<usize> = df
            .read(&[], &ReadOptions::default())
            .unwrap()
            .map(|r| r.unwrap().into_tsync().unwrap().len())
            .collect();
        assert_eq!(lens, [3, 5]);
    }

    #[test]
    fn test_missing_part_is_error() {
        let dir = tempfile::tempdir().unwrap();
        let mut df = DataFile::new();
        df.add_part("gone.tsync").unwrap();
        df.set_base_path(Some(dir.path().to_path_buf()));

        let mut records = df.read(&[], &ReadOptions::default()).unwrap();
        assert!(matches!(records.next(), Some(Err(Error::TSync(_)))));
    }

    #[test]
    fn test_non_tsync_records_are_rejected() {
        let dir = tempfile::tempdir().unwrap();
        let mut aux = DataFile::new();
        aux.add_part("sync.tsync").unwrap();
        aux.set_base_path(Some(dir.path().to_path_buf()));

        // a decoder that yields table rows for tsync data
        let mut registry = DataLoaderRegistry::new();
        registry.register(DataClass::TSync, |_ctx: DecodeContext<'_>| -> Result<Records> {
            Ok(Box::new(std::iter::once(Ok(Record::Row(vec!["0".into(), "12".into()])))))
        });
        let options = ReadOptions::default();
        let ctx = DecodeContext {
            parts: Vec::new(),
            aux_data: std::slice::from_ref(&aux),
            options: &options,
            registry: &registry,
        };

        let err = read_tsync_files(&ctx, &aux).unwrap_err();
        assert!(matches!(err, Error::SyncIncompatible(_)), "unexpected error: {err}");
    }
}
