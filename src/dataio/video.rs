//! Video frames with master-clock timestamps.
//!
//! Pixel decoding is left to a [`FrameReader`] supplied by the application
//! (usually a binding to a system video library). This module pairs the
//! decoded images with the frame timestamps stored next to the video,
//! either as a `tsync` file or as a legacy `frame;timestamp` CSV table.
//!
//! ## Example
//!
//! ```ignore
//! use edl::data::{register_decoder, DataClass};
//! use edl::dataio::VideoDecoder;
//!
//! register_decoder(DataClass::Video, VideoDecoder::new(MyReader));
//! for frame in dataset.read_data(&ReadOptions::default())? {
//!     let frame = frame?;
//! }
//! ```

use std::fmt;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::vec;

use tsync::{TSyncFileMode, TSyncTimeUnit};

use super::syncfile::read_tsync_files;
use crate::data::{DecodeContext, Decoder, Record, Records};
use crate::util::{Error, Result};

/// Pixel data of one frame, row-major.
#[derive(Clone, PartialEq, Eq)]
pub struct FrameImage {
    pub width: u32,
    pub height: u32,
    pub data: Vec<u8>,
}

impl fmt::Debug for FrameImage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("FrameImage")
            .field("width", &self.width)
            .field("height", &self.height)
            .field("bytes", &self.data.len())
            .finish()
    }
}

/// A decoded frame.
#[derive(Clone, Debug, PartialEq)]
pub struct Frame {
    /// Frame number, as recorded in the timestamp table if there is one.
    pub index: u64,
    /// Master-clock time in milliseconds, `None` without timestamp table.
    pub time_ms: Option<f64>,
    pub image: FrameImage,
}

/// Lazy sequence of images of one video file.
pub type FrameImages = Box<dyn Iterator<Item = Result<FrameImage>>>;

/// Decodes video container files.
pub trait FrameReader: Send + Sync {
    fn open(&self, path: &Path) -> Result<FrameImages>;
}

/// Decoder for the `video` data class.
///
/// Options:
/// - `do_timesync` (default `true`): attach timestamps from auxiliary data
#[derive(Clone)]
pub struct VideoDecoder {
    reader: Arc<dyn FrameReader>,
}

impl VideoDecoder {
    pub fn new(reader: impl FrameReader + 'static) -> Self {
        Self {
            reader: Arc::new(reader),
        }
    }
}

impl Decoder for VideoDecoder {
    fn read(&self, ctx: DecodeContext<'_>) -> Result<Records> {
        let timestamps = if ctx.options.flag("do_timesync", true) {
            load_timestamps(&ctx)?
        } else {
            None
        };

        Ok(Box::new(VideoFrames {
            reader: Arc::clone(&self.reader),
            parts: ctx.parts.into_iter(),
            current: None,
            position: 0,
            timestamps,
        }))
    }
}

/// Frame number and time of each frame, from a `tsync` or CSV aux file.
fn load_timestamps(ctx: &DecodeContext<'_>) -> Result<Option<Vec<(u64, f64)>>> {
    let frame_number = |value: i64| {
        u64::try_from(value).map_err(|_| Error::decode(format!("invalid frame number {value}")))
    };

    if let Some(aux) = ctx.aux_by_type("tsync").next() {
        let mut timestamps = Vec::new();
        for tsf in read_tsync_files(ctx, aux)? {
            if tsf.sync_mode != TSyncFileMode::Continuous {
                return Err(Error::sync(format!(
                    "video timestamps need a tsync file in continuous mode, found {}",
                    tsf.sync_mode
                )));
            }
            if tsf.time_units != (TSyncTimeUnit::Index, TSyncTimeUnit::Milliseconds) {
                return Err(Error::sync(format!(
                    "video timestamps need (index, milliseconds) time units, found ({}, {})",
                    tsf.time_units.0, tsf.time_units.1
                )));
            }
            for &(index, time) in &tsf.times {
                timestamps.push((frame_number(index)?, time as f64));
            }
        }
        return Ok(Some(timestamps));
    }

    if let Some(aux) = ctx.aux_by_type("csv").next() {
        let mut timestamps = Vec::new();
        // first row is the header
        for record in ctx.read_aux(aux)?.skip(1) {
            let record = record?;
            let row = record.as_row().unwrap_or_default();
            let (Some(index), Some(time)) = (row.first(), row.get(1)) else {
                return Err(Error::decode(format!("incomplete timestamp row {row:?}")));
            };
            let index = index
                .trim()
                .parse::<i64>()
                .map_err(|e| Error::decode(format!("invalid frame number {index:?}: {e}")))?;
            let time = time
                .trim()
                .parse::<f64>()
                .map_err(|e| Error::decode(format!("invalid timestamp {time:?}: {e}")))?;
            timestamps.push((frame_number(index)?, time));
        }
        return Ok(Some(timestamps));
    }

    Ok(None)
}

struct VideoFrames {
    reader: Arc<dyn FrameReader>,
    parts: vec::IntoIter<PathBuf>,
    current: Option<FrameImages>,
    position: usize,
    timestamps: Option<Vec<(u64, f64)>>,
}

impl VideoFrames {
    fn make_frame(&self, position: usize, image: FrameImage) -> Result<Frame> {
        let Some(timestamps) = &self.timestamps else {
            return Ok(Frame {
                index: position as u64,
                time_ms: None,
                image,
            });
        };
        let &(index, time) = timestamps.get(position).ok_or_else(|| {
            Error::decode(format!(
                "frame {position} has no timestamp, timestamp table has {} entries",
                timestamps.len()
            ))
        })?;
        Ok(Frame {
            index,
            time_ms: Some(time),
            image,
        })
    }
}

impl Iterator for VideoFrames {
    type Item = Result<Record>;

    fn next(&mut self) -> Option<Self::Item> {
        loop {
            if let Some(image) = self.current.as_mut().and_then(|images| images.next()) {
                let position = self.position;
                self.position += 1;
                return Some(image.and_then(|img| self.make_frame(position, img)).map(Record::Frame));
            }

            self.current = None;
            let path = self.parts.next()?;
            match self.reader.open(&path) {
                Ok(images) => self.current = Some(images),
                Err(e) => return Some(Err(e)),
            }
        }
    }
}
