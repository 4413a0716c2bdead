use crate::error::{ExtractError, Result};
use crate::naming::NamingPolicy;
use crate::store::SampleStore;
use crate::types::IndexEntry;

/// A channel's chunk index, normalized into sorted parallel lookup arrays.
///
/// Built once per file open and read-only afterwards. The arrays are sorted
/// ascending by chunk start time so time ranges can be bounded with two
/// binary searches.
///
/// # Examples
///
/// ```rust
/// use artiseg::{MemStore, SampleIndex, TbiNaming};
///
/// let mut store = MemStore::new();
/// store.add_contiguous("icp", 1_600_000_000_000_000, 100.0, vec![0.0; 1000]);
///
/// let index = SampleIndex::load(&store, "icp", &TbiNaming).unwrap();
/// assert_eq!(index.channel(), "icp");
/// assert_eq!(index.len(), 1);
/// assert_eq!(index.frequency(0), 100.0);
/// ```
#[derive(Debug, Clone)]
pub struct SampleIndex {
    channel: String,
    start_times: Vec<i64>,
    frequencies: Vec<f64>,
    lengths: Vec<i64>,
    start_offsets: Vec<u64>,
    intervals: Vec<i64>,
}

impl SampleIndex {
    /// Loads the chunk index of `channel` from a store.
    ///
    /// When the store does not carry the requested channel, the naming
    /// policy's fallback is tried within the same call (by default `abp`
    /// falls back to `art`); only when neither exists does the load fail
    /// with [`ExtractError::MissingFile`].
    pub fn load<S, N>(store: &S, channel: &str, naming: &N) -> Result<SampleIndex>
    where
        S: SampleStore,
        N: NamingPolicy,
    {
        let resolved = if store.has_channel(channel) {
            channel.to_string()
        } else {
            match naming.fallback_channel(channel) {
                Some(alt) if store.has_channel(alt) => alt.to_string(),
                _ => {
                    return Err(ExtractError::MissingFile(format!(
                        "channel '{}' has no index",
                        channel
                    )))
                }
            }
        };

        let mut entries = store.chunk_index(&resolved)?;
        entries.sort_by_key(|e| e.start_time);

        let mut index = SampleIndex {
            channel: resolved,
            start_times: Vec::with_capacity(entries.len()),
            frequencies: Vec::with_capacity(entries.len()),
            lengths: Vec::with_capacity(entries.len()),
            start_offsets: Vec::with_capacity(entries.len()),
            intervals: Vec::with_capacity(entries.len()),
        };
        for entry in entries {
            index.start_times.push(entry.start_time);
            index.frequencies.push(entry.frequency);
            index.lengths.push(entry.length);
            index.start_offsets.push(entry.start_offset);
            index.intervals.push(entry.interval_us());
        }
        Ok(index)
    }

    /// The channel this index describes, after any naming fallback.
    pub fn channel(&self) -> &str {
        &self.channel
    }

    pub fn len(&self) -> usize {
        self.start_times.len()
    }

    pub fn is_empty(&self) -> bool {
        self.start_times.is_empty()
    }

    pub fn start_time(&self, chunk: usize) -> i64 {
        self.start_times[chunk]
    }

    pub fn frequency(&self, chunk: usize) -> f64 {
        self.frequencies[chunk]
    }

    pub fn length(&self, chunk: usize) -> i64 {
        self.lengths[chunk]
    }

    pub fn start_offset(&self, chunk: usize) -> u64 {
        self.start_offsets[chunk]
    }

    /// Sample interval of a chunk in microseconds.
    pub fn interval_us(&self, chunk: usize) -> i64 {
        self.intervals[chunk]
    }

    /// Start and exclusive end time of a chunk in microseconds.
    pub fn chunk_span(&self, chunk: usize) -> (i64, i64) {
        let start = self.start_times[chunk];
        (start, start + self.lengths[chunk] * self.intervals[chunk])
    }

    /// Reassembles the chunk's index entry.
    pub fn entry(&self, chunk: usize) -> IndexEntry {
        IndexEntry {
            start_offset: self.start_offsets[chunk],
            start_time: self.start_times[chunk],
            length: self.lengths[chunk],
            frequency: self.frequencies[chunk],
        }
    }

    /// Half-open range of chunk indices that may overlap `[start, end]`.
    ///
    /// The lower bound is the last chunk starting at or before `start`
    /// (clamped to the first chunk), the upper bound the first chunk
    /// starting at or after `end`. Candidates still need an overlap check:
    /// the chunk below may end before `start` when the recording has gaps.
    pub fn candidate_range(&self, start: i64, end: i64) -> (usize, usize) {
        let lo = self
            .start_times
            .partition_point(|&t| t <= start)
            .saturating_sub(1);
        let hi = self.start_times.partition_point(|&t| t < end);
        (lo, hi)
    }
}
