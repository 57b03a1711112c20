//! Intan RHD electrophysiology signals.
//!
//! The amplifier runs on its own clock. Correction points written by the
//! acquisition system during recording (a `tsync` file in syncpoints mode,
//! microseconds on both sides) are used to compute a master-clock timestamp
//! in milliseconds for every sample.
//!
//! Parsing of the RHD binary layout is done by a [`SignalOpener`] supplied by
//! the application. A recording may be split into several files; timestamps
//! are computed over the whole recording and then sliced per file.

use std::fmt;
use std::path::Path;
use std::sync::Arc;

use tsync::{TSyncFileMode, TSyncTimeUnit};

use super::syncfile::read_tsync_files;
use crate::core::{SyncMap, TimeSynchronizer, TimeUnit};
use crate::data::{DecodeContext, Decoder, Record, Records};
use crate::util::{Error, Result};

/// Raw access to one signal file.
pub trait SignalSource: Send {
    /// Path of the underlying file.
    fn path(&self) -> &Path;

    /// Highest sampling rate of all channels, in Hz.
    fn sample_rate(&self) -> f64;

    /// Number of amplifier samples in this file.
    fn sample_count(&self) -> usize;
}

/// Opens signal files.
pub trait SignalOpener: Send + Sync {
    fn open(&self, path: &Path) -> Result<Box<dyn SignalSource>>;
}

/// A signal file with optional master-clock timestamps (milliseconds).
pub struct SignalReader {
    source: Box<dyn SignalSource>,
    sync_times: Option<Vec<f64>>,
    nosync_times: Option<Vec<f64>>,
}

impl SignalReader {
    pub fn new(source: Box<dyn SignalSource>) -> Self {
        Self {
            source,
            sync_times: None,
            nosync_times: None,
        }
    }

    pub fn source(&self) -> &dyn SignalSource {
        self.source.as_ref()
    }

    pub fn into_source(self) -> Box<dyn SignalSource> {
        self.source
    }

    /// Check if timestamps were synchronized or otherwise adjusted.
    pub fn has_adjusted_times(&self) -> bool {
        self.sync_times.is_some()
    }

    /// Timestamp of every sample, synchronized to the master clock.
    pub fn sync_times(&self) -> Option<&[f64]> {
        self.sync_times.as_deref()
    }

    /// Timestamps corrected by the initial clock offset only.
    pub fn nosync_times(&self) -> Option<&[f64]> {
        self.nosync_times.as_deref()
    }
}

impl fmt::Debug for SignalReader {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("SignalReader")
            .field("path", &self.source.path())
            .field("sample_rate", &self.source.sample_rate())
            .field("samples", &self.source.sample_count())
            .field("synced", &self.has_adjusted_times())
            .finish()
    }
}

/// Decoder for the `intan` data class.
///
/// Options:
/// - `do_timesync` (default `true`): interpolate between sync points;
///   otherwise only the initial offset is applied
/// - `include_nosync_time` (default `false`): also provide offset-only times
#[derive(Clone)]
pub struct IntanDecoder {
    opener: Arc<dyn SignalOpener>,
}

impl IntanDecoder {
    pub fn new(opener: impl SignalOpener + 'static) -> Self {
        Self {
            opener: Arc::new(opener),
        }
    }
}

/// Sync map in microseconds from the first `tsync` auxiliary data.
fn load_sync_map(ctx: &DecodeContext<'_>) -> Result<SyncMap> {
    let mut map = SyncMap::new();
    let Some(aux) = ctx.aux_by_type("tsync").next() else {
        return Ok(map);
    };

    let files = read_tsync_files(ctx, aux)?;
    for tsf in &files {
        if tsf.sync_mode != TSyncFileMode::SyncPoints {
            return Err(Error::sync(format!(
                "signal timestamps need a tsync file in syncpoints mode, found {}",
                tsf.sync_mode
            )));
        }
        if tsf.time_units != (TSyncTimeUnit::Microseconds, TSyncTimeUnit::Microseconds) {
            return Err(Error::sync(format!(
                "both tsync time units must be microseconds, found ({}, {})",
                tsf.time_units.0, tsf.time_units.1
            )));
        }
        map.extend(tsf.times.iter().map(|&(d, m)| (d as f64, m as f64)));
    }
    if files.len() > 1 {
        tracing::warn!(
            count = files.len(),
            "more than one tsync file found for signal data, concatenating sync maps"
        );
    }
    Ok(map)
}

impl Decoder for IntanDecoder {
    fn read(&self, ctx: DecodeContext<'_>) -> Result<Records> {
        let do_timesync = ctx.options.flag("do_timesync", true);
        let include_nosync = ctx.options.flag("include_nosync_time", false);

        let sync_map = load_sync_map(&ctx)?;
        tracing::info!(
            offset_us = sync_map.initial_offset(),
            sync_info = !sync_map.is_empty(),
            "initial signal time offset"
        );

        if sync_map.is_empty() {
            let opener = Arc::clone(&self.opener);
            let readers = ctx
                .parts
                .into_iter()
                .map(move |path| -> Result<Record> {
                    Ok(Record::Signal(SignalReader::new(opener.open(&path)?)))
                });
            return Ok(Box::new(readers));
        }

        let mut sources = Vec::with_capacity(ctx.parts.len());
        let mut sample_rate = None;
        for path in &ctx.parts {
            let source = self.opener.open(path)?;
            match sample_rate {
                None => sample_rate = Some(source.sample_rate()),
                Some(rate) if rate != source.sample_rate() => {
                    return Err(Error::decode(format!(
                        "sampling rate of {} ({} Hz) differs from previous files ({rate} Hz), \
                         the data may not belong to the same recording",
                        path.display(),
                        source.sample_rate()
                    )));
                }
                Some(_) => {}
            }
            sources.push(source);
        }
        let Some(sample_rate) = sample_rate else {
            return Ok(Box::new(std::iter::empty::<Result<Record>>()));
        };

        let total: usize = sources.iter().map(|s| s.sample_count()).sum();
        let sync = TimeSynchronizer::new(sample_rate, TimeUnit::Milliseconds);
        let map = sync_map.converted(TimeUnit::Microseconds, TimeUnit::Milliseconds);

        let nosync = (include_nosync || !do_timesync)
            .then(|| sync.offset_times(total, map.initial_offset()));
        let times = if do_timesync {
            sync.synchronize(total, &map)
        } else {
            nosync.clone().unwrap_or_default()
        };

        let mut start = 0;
        let mut readers: Vec<Result<Record>> = Vec::with_capacity(sources.len());
        for source in sources {
            let end = start + source.sample_count();
            readers.push(Ok(Record::Signal(SignalReader {
                source,
                sync_times: Some(times[start..end].to_vec()),
                nosync_times: nosync
                    .as_ref()
                    .filter(|_| include_nosync)
                    .map(|t| t[start..end].to_vec()),
            })));
            start = end;
        }
        Ok(Box::new(readers.into_iter()))
    }
}
