use std::path::PathBuf;

use serde::Serialize;

use crate::MICROS_PER_SECOND;

/// One entry of a channel's chunk index.
///
/// A chunk is a contiguous run of samples recorded at one fixed frequency.
/// `start_offset` addresses the chunk's first sample inside the channel's
/// backing dataset, `start_time` is a Unix timestamp in microseconds (UTC).
/// Chunks may leave gaps between each other but never overlap.
///
/// # Examples
///
/// ```rust
/// use artiseg::IndexEntry;
///
/// let entry = IndexEntry {
///     start_offset: 0,
///     start_time: 1_600_000_000_000_000,
///     length: 1000,
///     frequency: 100.0,
/// };
///
/// assert_eq!(entry.interval_us(), 10_000);
/// // 1000 samples at 100 Hz span 10 seconds
/// assert_eq!(entry.end_time() - entry.start_time, 10_000_000);
/// ```
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct IndexEntry {
    pub start_offset: u64,
    pub start_time: i64,
    pub length: i64,
    pub frequency: f64,
}

impl IndexEntry {
    /// Sample interval in microseconds, rounded from the chunk frequency.
    pub fn interval_us(&self) -> i64 {
        (MICROS_PER_SECOND as f64 / self.frequency).round() as i64
    }

    /// Exclusive end time of the chunk in microseconds.
    pub fn end_time(&self) -> i64 {
        self.start_time + self.length * self.interval_us()
    }
}

/// A segment's identity before any samples are attached: a half-open time
/// range plus the file and patient it came from.
///
/// Produced by the segmenter, consumed by [`RangeResolver`](crate::RangeResolver),
/// which turns it into a [`ResolvedSegment`] carrying data. Keeping the two
/// states as separate types means a partially-initialized segment can never
/// travel through the pipeline.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct SegmentRef {
    /// Start of the range, Unix microseconds (UTC).
    pub start_time: i64,
    /// End of the range, Unix microseconds (UTC). Always after `start_time`.
    pub end_time: i64,
    /// Signal file the segment was cut from.
    pub source_file: PathBuf,
    /// Patient identifier derived from the file name.
    pub patient_id: String,
}

impl SegmentRef {
    pub fn duration_us(&self) -> i64 {
        self.end_time - self.start_time
    }
}

/// A segment after materialization: the time range of a [`SegmentRef`] plus
/// the sanitized samples and the frequency resolved from the chunk index.
///
/// `empty == true` means no index chunk overlapped the requested range.
/// Whether that is tolerated or fatal is decided by the caller through
/// `skip_empty` (see [`ExtractOptions`](crate::ExtractOptions)).
///
/// `data` never contains non-finite values; anything missing in the store
/// has been replaced by [`MISSING_VALUE`](crate::MISSING_VALUE).
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ResolvedSegment {
    pub start_time: i64,
    pub end_time: i64,
    pub empty: bool,
    pub source_file: PathBuf,
    pub patient_id: String,
    /// Sampling frequency of the last index chunk the resolver touched for
    /// this range, 0.0 when no candidate chunk was touched at all.
    pub frequency: f64,
    pub data: Vec<f64>,
}

impl ResolvedSegment {
    pub fn duration_us(&self) -> i64 {
        self.end_time - self.start_time
    }
}
