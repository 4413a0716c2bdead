use std::collections::BTreeMap;
use std::path::PathBuf;

use crate::error::{ExtractError, Result};
use crate::index::SampleIndex;
use crate::store::SampleStore;
use crate::types::{ResolvedSegment, SegmentRef};
use crate::MISSING_VALUE;

/// Chunk samples fetched during one resolution pass, keyed by the chunk's
/// `(start_time, end_time)` span in microseconds.
///
/// The cache belongs to a single pass: create one, materialize a batch of
/// segments through it, drop it. It is never shared between extractor
/// instances, so extractors stay independent of each other. A `BTreeMap`
/// keeps the chunks ordered by start time, which is what makes
/// concatenation walk overlapping chunks in time order.
#[derive(Debug, Default)]
pub struct ChunkCache {
    chunks: BTreeMap<(i64, i64), CachedChunk>,
}

#[derive(Debug)]
struct CachedChunk {
    interval_us: i64,
    samples: Vec<f64>,
}

impl ChunkCache {
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of distinct chunks fetched so far.
    pub fn len(&self) -> usize {
        self.chunks.len()
    }

    pub fn is_empty(&self) -> bool {
        self.chunks.is_empty()
    }
}

/// Maps segment time ranges onto raw samples of one indexed channel.
///
/// The resolver borrows a store and the channel's [`SampleIndex`] and turns
/// [`SegmentRef`]s into [`ResolvedSegment`]s: it bounds the candidate chunks
/// with two binary searches, fetches each candidate once per pass, slices
/// the fetched chunks to the exact requested range and concatenates the
/// slices in time order. Non-finite samples are replaced with
/// [`MISSING_VALUE`](crate::MISSING_VALUE) so downstream consumers never see
/// a NaN.
///
/// A segment whose range no chunk overlaps comes back with `empty == true`
/// when the resolver was built with `skip_empty`, and fails with
/// [`ExtractError::EmptySegment`] otherwise.
///
/// The reported `frequency` is taken from the last candidate chunk touched
/// while fetching. When a range spans chunks of differing frequency the
/// report is ambiguous by design; recordings that mix frequencies within
/// one channel need a consistency check this crate does not impose.
///
/// # Examples
///
/// ```rust
/// use artiseg::{MemStore, RangeResolver, SampleIndex, SegmentRef, TbiNaming};
///
/// let t0 = 1_600_000_000_000_000;
/// let mut store = MemStore::new();
/// store.add_contiguous("icp", t0, 100.0, (0..6000).map(f64::from).collect());
///
/// let index = SampleIndex::load(&store, "icp", &TbiNaming).unwrap();
/// let resolver = RangeResolver::new(&store, &index, true);
///
/// let segment = SegmentRef {
///     start_time: t0 + 10_000_000,
///     end_time: t0 + 20_000_000,
///     source_file: "TBI_1001.hdf5".into(),
///     patient_id: "1001".to_string(),
/// };
/// let resolved = resolver.materialize(&segment).unwrap();
///
/// // 10 seconds at 100 Hz
/// assert_eq!(resolved.data.len(), 1000);
/// assert_eq!(resolved.frequency, 100.0);
/// assert!(!resolved.empty);
/// ```
pub struct RangeResolver<'a, S: SampleStore> {
    store: &'a S,
    index: &'a SampleIndex,
    skip_empty: bool,
}

impl<'a, S: SampleStore> RangeResolver<'a, S> {
    pub fn new(store: &'a S, index: &'a SampleIndex, skip_empty: bool) -> Self {
        RangeResolver {
            store,
            index,
            skip_empty,
        }
    }

    /// Materializes one segment with a cache private to this call.
    pub fn materialize(&self, segment: &SegmentRef) -> Result<ResolvedSegment> {
        let mut cache = ChunkCache::new();
        self.materialize_in(&mut cache, segment)
    }

    /// Raw sanitized samples covering `[start, end]` microseconds, without
    /// any segment bookkeeping. Subject to the same empty-range policy as
    /// segment materialization.
    pub fn resolve_range(&self, start: i64, end: i64) -> Result<Vec<f64>> {
        let segment = SegmentRef {
            start_time: start,
            end_time: end,
            source_file: PathBuf::new(),
            patient_id: String::new(),
        };
        Ok(self.materialize(&segment)?.data)
    }

    /// Materializes a batch of segments sharing one chunk cache, so chunks
    /// overlapped by several segments are fetched only once.
    pub fn materialize_batch(&self, segments: &[SegmentRef]) -> Result<Vec<ResolvedSegment>> {
        let mut cache = ChunkCache::new();
        segments
            .iter()
            .map(|s| self.materialize_in(&mut cache, s))
            .collect()
    }

    /// Materializes one segment through a caller-scoped cache.
    ///
    /// Use this when several batches belong to the same resolution pass and
    /// should share fetched chunks.
    pub fn materialize_in(
        &self,
        cache: &mut ChunkCache,
        segment: &SegmentRef,
    ) -> Result<ResolvedSegment> {
        let (lo, hi) = self
            .index
            .candidate_range(segment.start_time, segment.end_time);

        let mut frequency = 0.0;
        for chunk in lo..hi {
            let key = self.index.chunk_span(chunk);
            if !cache.chunks.contains_key(&key) {
                let samples = self.store.read_samples(
                    self.index.channel(),
                    self.index.start_offset(chunk),
                    self.index.length(chunk) as usize,
                )?;
                cache.chunks.insert(
                    key,
                    CachedChunk {
                        interval_us: self.index.interval_us(chunk),
                        samples,
                    },
                );
            }
            frequency = self.index.frequency(chunk);
        }

        let mut data = Vec::new();
        let mut overlapped = false;
        for (&(chunk_start, chunk_end), chunk) in &cache.chunks {
            if chunk_start <= segment.end_time && chunk_end >= segment.start_time {
                overlapped = true;
                let first = ((segment.start_time - chunk_start).max(0) / chunk.interval_us) as usize;
                let last = (((segment.end_time - chunk_start) / chunk.interval_us) as usize)
                    .min(chunk.samples.len());
                if first < last {
                    data.extend(
                        chunk.samples[first..last]
                            .iter()
                            .map(|&v| if v.is_finite() { v } else { MISSING_VALUE }),
                    );
                }
            }
        }

        if !overlapped && !self.skip_empty {
            return Err(ExtractError::EmptySegment {
                start: segment.start_time,
                end: segment.end_time,
            });
        }

        Ok(ResolvedSegment {
            start_time: segment.start_time,
            end_time: segment.end_time,
            empty: !overlapped,
            source_file: segment.source_file.clone(),
            patient_id: segment.patient_id.clone(),
            frequency,
            data,
        })
    }
}
