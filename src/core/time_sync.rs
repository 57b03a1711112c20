//! Synchronization of device sample clocks to a master clock.
//!
//! Recording devices with their own clock (electrophysiology amplifiers,
//! cameras) drift against the master clock of the acquisition system. The
//! acquisition system watches the device timestamps and, whenever they
//! deviate from its prediction, writes a correction point
//! `(device_time, master_time)`. The first point is the initial offset
//! between both clocks.
//!
//! [`TimeSynchronizer`] turns such a sparse [`SyncMap`] into one master
//! timestamp per recorded sample by linear interpolation between consecutive
//! correction points, and by extending the first and last segment slope
//! beyond the covered range.
//!
//! All arithmetic happens in one [`TimeUnit`]; the caller converts the map
//! beforehand and receives timestamps in the same unit.

use std::fmt;

/// Unit of time values handled by the synchronizer.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum TimeUnit {
    Nanoseconds,
    Microseconds,
    Milliseconds,
    Seconds,
}

impl TimeUnit {
    /// Number of units in one second.
    #[inline]
    pub fn per_second(&self) -> f64 {
        match self {
            Self::Nanoseconds => 1e9,
            Self::Microseconds => 1e6,
            Self::Milliseconds => 1e3,
            Self::Seconds => 1.0,
        }
    }

    /// Convert a value in this unit to `target`.
    #[inline]
    pub fn convert(&self, value: f64, target: TimeUnit) -> f64 {
        value * target.per_second() / self.per_second()
    }
}

impl fmt::Display for TimeUnit {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            Self::Nanoseconds => "ns",
            Self::Microseconds => "µs",
            Self::Milliseconds => "ms",
            Self::Seconds => "s",
        };
        f.write_str(s)
    }
}

/// A single clock correction point.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct SyncPoint {
    pub device_time: f64,
    pub master_time: f64,
}

impl SyncPoint {
    pub fn new(device_time: f64, master_time: f64) -> Self {
        Self {
            device_time,
            master_time,
        }
    }
}

/// Ordered list of clock correction points.
///
/// Points are expected to be strictly increasing in device time.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct SyncMap {
    points: Vec<SyncPoint>,
}

impl SyncMap {
    pub fn new() -> Self {
        Self::default()
    }

    /// Build a map from `(device_time, master_time)` pairs.
    pub fn from_pairs<I>(pairs: I) -> Self
    where
        I: IntoIterator<Item = (f64, f64)>,
    {
        pairs.into_iter().collect()
    }

    pub fn push(&mut self, device_time: f64, master_time: f64) {
        self.points.push(SyncPoint::new(device_time, master_time));
    }

    pub fn points(&self) -> &[SyncPoint] {
        &self.points
    }

    #[inline]
    pub fn len(&self) -> usize {
        self.points.len()
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.points.is_empty()
    }

    /// Device-to-master offset at recording start (`device - master` of the
    /// first point), zero for an empty map.
    pub fn initial_offset(&self) -> f64 {
        self.points
            .first()
            .map(|p| p.device_time - p.master_time)
            .unwrap_or(0.0)
    }

    /// Copy of this map with all values converted between units.
    pub fn converted(&self, from: TimeUnit, to: TimeUnit) -> Self {
        self.points
            .iter()
            .map(|p| (from.convert(p.device_time, to), from.convert(p.master_time, to)))
            .collect()
    }
}

impl FromIterator<(f64, f64)> for SyncMap {
    fn from_iter<T: IntoIterator<Item = (f64, f64)>>(iter: T) -> Self {
        Self {
            points: iter
                .into_iter()
                .map(|(device, master)| SyncPoint::new(device, master))
                .collect(),
        }
    }
}

impl Extend<(f64, f64)> for SyncMap {
    fn extend<T: IntoIterator<Item = (f64, f64)>>(&mut self, iter: T) {
        for (device, master) in iter {
            self.push(device, master);
        }
    }
}

/// Computes master-clock timestamps for samples recorded at a fixed rate.
#[derive(Clone, Copy, Debug)]
pub struct TimeSynchronizer {
    sample_rate: f64,
    unit: TimeUnit,
}

impl TimeSynchronizer {
    /// Create a synchronizer for a device sampling at `sample_rate` Hz,
    /// working in `unit`.
    pub fn new(sample_rate: f64, unit: TimeUnit) -> Self {
        Self { sample_rate, unit }
    }

    #[inline]
    pub fn sample_rate(&self) -> f64 {
        self.sample_rate
    }

    #[inline]
    pub fn unit(&self) -> TimeUnit {
        self.unit
    }

    /// Device time of sample `index`.
    #[inline]
    pub fn nominal_time(&self, index: usize) -> f64 {
        index as f64 / self.sample_rate * self.unit.per_second()
    }

    /// Sample index closest to a device time.
    #[inline]
    pub fn sample_index(&self, device_time: f64) -> i64 {
        (device_time / self.unit.per_second() * self.sample_rate).round() as i64
    }

    /// Device timestamps of `len` samples.
    pub fn nominal_times(&self, len: usize) -> Vec<f64> {
        (0..len).map(|i| self.nominal_time(i)).collect()
    }

    /// Device timestamps shifted by a constant clock offset.
    pub fn offset_times(&self, len: usize, offset: f64) -> Vec<f64> {
        (0..len).map(|i| self.nominal_time(i) - offset).collect()
    }

    /// Master timestamps for `len` samples.
    ///
    /// A map of at most two points holds only the initial offset and the
    /// end point, so only the initial offset is applied. If the map reaches beyond the recorded data, timestamps are
    /// computed as far as data exists and the rest of the map is ignored.
    pub fn synchronize(&self, len: usize, map: &SyncMap) -> Vec<f64> {
        let points = map.points();
        if points.len() <= 2 {
            tracing::debug!(
                points = points.len(),
                "time sync map too short for interpolation, applying initial offset only"
            );
            return self.offset_times(len, map.initial_offset());
        }

        let n = len as i64;
        let mut times = vec![0.0; len];
        let last_frame = points.len() - 2;
        let mut slope = 0.0;

        for (k, frame) in points.windows(2).enumerate() {
            let (start, end) = (frame[0], frame[1]);
            let d_start = self.sample_index(start.device_time);
            let d_end = self.sample_index(end.device_time);

            if d_end < d_start {
                tracing::error!(
                    frame = k,
                    start = d_start,
                    end = d_end,
                    "time sync points are not ordered by device time, stopping synchronization"
                );
                break;
            }
            if d_end > d_start {
                slope = (end.master_time - start.master_time) / (d_end - d_start) as f64;
            }
            let value_at = |i: i64| start.master_time + (i - d_start) as f64 * slope;

            if k == 0 {
                for i in 0..d_start.clamp(0, n) {
                    times[i as usize] = value_at(i);
                }
            }

            if d_end >= n {
                tracing::error!(
                    sync_index = d_end.saturating_add(1),
                    data_len = len,
                    "time sync index is bigger than the amount of recorded data; data may be \
                     missing or the time-sync file does not belong to this recording"
                );
                for i in d_start.max(0)..n {
                    times[i as usize] = value_at(i);
                }
                break;
            }

            for i in d_start.max(0)..d_end.max(0) {
                times[i as usize] = value_at(i);
            }
            if d_end >= 0 {
                times[d_end as usize] = end.master_time;
            }

            if k == last_frame {
                for i in d_end.saturating_add(1).max(0)..n {
                    times[i as usize] = end.master_time + (i - d_end) as f64 * slope;
                }
            }
        }

        times
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn assert_close(a: f64, b: f64) {
        assert!((a - b).abs() < 1e-9, "{a} != {b}");
    }

    #[test]
    fn test_unit_convert() {
        assert_close(TimeUnit::Microseconds.convert(1500.0, TimeUnit::Milliseconds), 1.5);
        assert_close(TimeUnit::Seconds.convert(2.0, TimeUnit::Microseconds), 2e6);
    }

    #[test]
    fn test_initial_offset() {
        let map = SyncMap::from_pairs([(6196.0, 0.0), (1_000_000.0, 993_900.0)]);
        assert_close(map.initial_offset(), 6196.0);
        assert_close(SyncMap::new().initial_offset(), 0.0);
    }

    #[test]
    fn test_bootstrap_only_shifts() {
        let sync = TimeSynchronizer::new(1000.0, TimeUnit::Milliseconds);
        let map = SyncMap::from_pairs([(-6.196, 0.0)]);
        let times = sync.synchronize(5000, &map);

        assert_eq!(times.len(), 5000);
        for (i, t) in times.iter().enumerate() {
            assert_close(*t, sync.nominal_time(i) + 6.196);
        }
    }

    #[test]
    fn test_empty_map_is_nominal() {
        let sync = TimeSynchronizer::new(20_000.0, TimeUnit::Milliseconds);
        let times = sync.synchronize(40, &SyncMap::new());
        assert_eq!(times, sync.nominal_times(40));
        assert_close(times[20], 1.0);
    }

    #[test]
    fn test_interpolation_midpoint() {
        let sync = TimeSynchronizer::new(1000.0, TimeUnit::Milliseconds);
        let map = SyncMap::from_pairs([(0.0, 0.0), (1000.0, 1000.0), (2000.0, 2050.0)]);
        let times = sync.synchronize(2001, &map);

        let idx = sync.sample_index(1500.0) as usize;
        assert_eq!(idx, 1500);
        assert_close(times[idx], 1525.0);
        assert_close(times[500], 500.0);
        assert_close(times[1000], 1000.0);
        assert_close(times[2000], 2050.0);
    }

    #[test]
    fn test_edge_extrapolation() {
        let sync = TimeSynchronizer::new(1000.0, TimeUnit::Milliseconds);
        let map = SyncMap::from_pairs([(500.0, 600.0), (1000.0, 1150.0), (1500.0, 1700.0)]);
        let times = sync.synchronize(2000, &map);

        // slope of 1.1 ms per sample on both sides
        assert_close(times[0], 600.0 - 500.0 * 1.1);
        assert_close(times[499], 600.0 - 1.1);
        assert_close(times[500], 600.0);
        assert_close(times[1000], 1150.0);
        assert_close(times[1500], 1700.0);
        assert_close(times[1999], 1700.0 + 499.0 * 1.1);
    }

    #[test]
    fn test_microsecond_map() {
        let sync = TimeSynchronizer::new(30_000.0, TimeUnit::Microseconds);
        let map = SyncMap::from_pairs([
            (0.0, 100.0),
            (500_000.0, 500_115.0),
            (1_000_000.0, 1_000_130.0),
        ]);
        let times = sync.synchronize(60_000, &map);

        assert_close(times[0], 100.0);
        assert_close(times[15_000], 500_115.0);
        assert_close(times[30_000], 1_000_130.0);
        let slope = 500_015.0 / 15_000.0;
        assert!((times[59_999] - (1_000_130.0 + 29_999.0 * slope)).abs() < 1e-6);
    }

    #[test]
    fn test_offset_and_end_point_only() {
        let sync = TimeSynchronizer::new(1000.0, TimeUnit::Milliseconds);
        let map = SyncMap::from_pairs([(-6.196, 0.0), (1000.0, 1010.0)]);
        let times = sync.synchronize(2000, &map);

        assert_eq!(times, sync.offset_times(2000, -6.196));
        assert_close(times[0], 6.196);
        assert_close(times[1999], 1999.0 + 6.196);
    }

    #[test]
    fn test_span_beyond_data_is_clipped() {
        let sync = TimeSynchronizer::new(1000.0, TimeUnit::Milliseconds);
        let map = SyncMap::from_pairs([(0.0, 0.0), (1000.0, 1000.0), (2000.0, 2100.0), (3000.0, 3100.0)]);
        let times = sync.synchronize(1500, &map);

        assert_eq!(times.len(), 1500);
        assert_close(times[999], 999.0);
        // second frame keeps its true slope of 1.1
        assert_close(times[1499], 1000.0 + 499.0 * 1.1);
    }

    #[test]
    fn test_saturated_sync_index_is_clipped() {
        let sync = TimeSynchronizer::new(1000.0, TimeUnit::Milliseconds);
        let map = SyncMap::from_pairs([(0.0, 0.0), (1000.0, 1000.0), (f64::MAX, f64::MAX)]);
        assert_eq!(sync.sample_index(f64::MAX), i64::MAX);

        let times = sync.synchronize(1500, &map);
        assert_eq!(times.len(), 1500);
        assert_close(times[500], 500.0);
        assert_close(times[1000], 1000.0);
    }

    #[test]
    fn test_unordered_map_stops() {
        let sync = TimeSynchronizer::new(1000.0, TimeUnit::Milliseconds);
        let map = SyncMap::from_pairs([(0.0, 0.0), (1000.0, 1000.0), (500.0, 1500.0)]);
        let times = sync.synchronize(2000, &map);

        assert_close(times[1000], 1000.0);
        assert_close(times[1500], 0.0);
    }
}
