use std::collections::HashMap;
use std::path::Path;

use crate::error::{ExtractError, Result};
use crate::types::IndexEntry;

/// Read-only access to an indexed sample store.
///
/// A store holds one or more named channels (e.g. `icp`, `abp`, `art`), each
/// backed by a flat sequence of samples and described by a chunk index. The
/// extraction pipeline only ever reads: it asks for the index once per file
/// open and for raw sample runs during materialization.
///
/// The on-disk container format is deliberately not part of this crate;
/// implement this trait over whatever reader library the recordings live in.
pub trait SampleStore {
    /// Channel names present in the store.
    fn channels(&self) -> Vec<String>;

    /// True when the store carries the named channel.
    fn has_channel(&self, name: &str) -> bool {
        self.channels().iter().any(|c| c == name)
    }

    /// The per-chunk index of the named channel.
    ///
    /// Fails with [`ExtractError::MissingFile`] when the channel or its
    /// index is absent.
    fn chunk_index(&self, channel: &str) -> Result<Vec<IndexEntry>>;

    /// Reads `len` raw samples of `channel` starting at `start_offset`.
    ///
    /// A read past the end of the backing dataset returns the samples that
    /// exist rather than failing.
    fn read_samples(&self, channel: &str, start_offset: u64, len: usize) -> Result<Vec<f64>>;
}

/// Opens stores for signal files discovered during a folder walk.
///
/// The folder aggregator knows nothing about container formats; it asks the
/// provider which paths are signal files and how to open them.
pub trait StoreProvider {
    type Store: SampleStore;

    /// Whether `path` names a signal file this provider can open.
    fn is_signal_file(&self, path: &Path) -> bool;

    fn open(&self, path: &Path) -> Result<Self::Store>;
}

/// Sample store held entirely in memory.
///
/// Each channel owns one flat sample vector; index entries address into it
/// via `start_offset`. Useful for embedding recordings that are already in
/// memory and as a fixture in tests.
///
/// # Examples
///
/// ```rust
/// use artiseg::{IndexEntry, MemStore, SampleStore};
///
/// let mut store = MemStore::new();
/// store.add_contiguous("icp", 1_600_000_000_000_000, 100.0, vec![12.5; 500]);
///
/// assert!(store.has_channel("icp"));
/// let index = store.chunk_index("icp").unwrap();
/// assert_eq!(index.len(), 1);
/// assert_eq!(index[0].length, 500);
///
/// let samples = store.read_samples("icp", 100, 10).unwrap();
/// assert_eq!(samples.len(), 10);
/// ```
#[derive(Debug, Clone, Default)]
pub struct MemStore {
    channels: HashMap<String, MemChannel>,
}

#[derive(Debug, Clone, Default)]
struct MemChannel {
    index: Vec<IndexEntry>,
    samples: Vec<f64>,
}

impl MemStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Adds a channel backed by `samples` and described by `index`.
    ///
    /// Offsets in `index` address into `samples`; the entries do not have to
    /// arrive sorted, loading normalizes their order.
    pub fn add_channel(&mut self, name: &str, index: Vec<IndexEntry>, samples: Vec<f64>) {
        self.channels
            .insert(name.to_string(), MemChannel { index, samples });
    }

    /// Adds a channel holding one contiguous chunk starting at `start_time`.
    pub fn add_contiguous(&mut self, name: &str, start_time: i64, frequency: f64, samples: Vec<f64>) {
        let entry = IndexEntry {
            start_offset: 0,
            start_time,
            length: samples.len() as i64,
            frequency,
        };
        self.add_channel(name, vec![entry], samples);
    }
}

impl SampleStore for MemStore {
    fn channels(&self) -> Vec<String> {
        self.channels.keys().cloned().collect()
    }

    fn has_channel(&self, name: &str) -> bool {
        self.channels.contains_key(name)
    }

    fn chunk_index(&self, channel: &str) -> Result<Vec<IndexEntry>> {
        self.channels
            .get(channel)
            .map(|c| c.index.clone())
            .ok_or_else(|| ExtractError::MissingFile(format!("channel '{}' has no index", channel)))
    }

    fn read_samples(&self, channel: &str, start_offset: u64, len: usize) -> Result<Vec<f64>> {
        let chan = self.channels.get(channel).ok_or_else(|| {
            ExtractError::MissingFile(format!("channel '{}' has no data", channel))
        })?;
        let start = (start_offset as usize).min(chan.samples.len());
        let end = start.saturating_add(len).min(chan.samples.len());
        Ok(chan.samples[start..end].to_vec())
    }
}
