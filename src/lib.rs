//! # Artefact-annotated segment extraction
//!
//! A library for cutting labeled training and analysis segments out of
//! long physiological waveform recordings (arterial blood pressure,
//! intracranial pressure and friends), driven by externally supplied
//! artefact annotations.
//!
//! Recordings live in an indexed sample store: a flat run of samples per
//! channel plus a compact chunk index mapping time to sample offsets. An
//! annotation document marks the intervals a human flagged as artifactual.
//! From those two inputs the crate reconstructs exactly which raw samples
//! belong to any microsecond time range, partitions each recording into
//! anomalous segments (one per artefact) and normal segments (fixed-width
//! windows tiling the gaps between artefacts), and aggregates the process
//! across whole folders of patient recordings under a single enforced
//! sampling-frequency invariant.
//!
//! ## Quick Start
//!
//! ### Extracting one file
//!
//! ```rust
//! use artiseg::{ExtractOptions, SingleFileExtractor, Result};
//!
//! fn main() -> Result<()> {
//!     # let dir = std::env::temp_dir().join("artiseg_quickstart");
//!     # std::fs::create_dir_all(&dir)?;
//!     # let signal_path = dir.join("TBI_1001_1.hdf5");
//!     # std::fs::write(&signal_path, b"")?;
//!     # artiseg::doctest_utils::write_demo_annotations(signal_path.with_extension("artf"))?;
//!     // A store is anything implementing `SampleStore`; the demo store
//!     // holds one minute of 100 Hz intracranial pressure in memory.
//!     let store = artiseg::doctest_utils::demo_store();
//!
//!     let extractor =
//!         SingleFileExtractor::new(store, &signal_path, "icp", ExtractOptions::default())?;
//!     let extraction = extractor.extract()?;
//!
//!     println!(
//!         "patient {}: {} anomalous, {} normal segments at {} Hz",
//!         extractor.patient_id(),
//!         extraction.anomalies.len(),
//!         extraction.normals.len(),
//!         extraction.frequency(),
//!     );
//!
//!     for segment in &extraction.anomalies {
//!         assert!(!segment.empty);
//!         assert!(segment.data.iter().all(|v| v.is_finite()));
//!     }
//!     # assert_eq!(extraction.anomalies.len(), 2);
//!     # std::fs::remove_dir_all(&dir).ok();
//!     Ok(())
//! }
//! ```
//!
//! ### Capping normal segments
//!
//! Training setups often want at most a handful of normal windows per
//! anomaly. The matching option bounds the normal count without promising
//! an exact ratio:
//!
//! ```rust
//! use std::num::NonZeroUsize;
//! use artiseg::{ExtractOptions, SingleFileExtractor, Result};
//!
//! fn main() -> Result<()> {
//!     # let dir = std::env::temp_dir().join("artiseg_matching");
//!     # std::fs::create_dir_all(&dir)?;
//!     # let signal_path = dir.join("TBI_1001_1.hdf5");
//!     # std::fs::write(&signal_path, b"")?;
//!     # artiseg::doctest_utils::write_demo_annotations(signal_path.with_extension("artf"))?;
//!     let options = ExtractOptions {
//!         matching: true,
//!         matching_multiplier: NonZeroUsize::new(2).unwrap(),
//!         ..ExtractOptions::default()
//!     };
//!
//!     let store = artiseg::doctest_utils::demo_store();
//!     let extractor = SingleFileExtractor::new(store, &signal_path, "icp", options)?;
//!     let extraction = extractor.extract()?;
//!
//!     assert!(extraction.normals.len() <= extraction.anomalies.len() * 2);
//!     # std::fs::remove_dir_all(&dir).ok();
//!     Ok(())
//! }
//! ```
//!
//! ## Time model
//!
//! All segment boundaries are Unix timestamps in **microseconds**, UTC.
//! Annotation documents spell timestamps as `DD/MM/YYYY HH:MM:SS.ffffff`;
//! [`parse_timestamp`] and [`render_timestamp`] convert losslessly between
//! the two representations. A chunk's sample interval is
//! `round(1_000_000 / frequency)` microseconds.
//!
//! ## Error model
//!
//! Everything fallible returns [`Result`] with [`ExtractError`]. Per-file
//! problems (missing annotation file, underivable patient id) are skippable
//! at folder scope; the cross-file frequency invariant is not. A folder
//! that mixes sampling frequencies fails as a whole, because fixed-width
//! windowing downstream assumes one frequency.

pub mod artefact;
pub mod error;
pub mod export;
pub mod extract;
pub mod index;
pub mod naming;
pub mod resolver;
pub mod segmenter;
pub mod store;
pub mod types;

#[doc(hidden)]
pub mod doctest_utils; // For internal doctest support

// Re-export main types for convenience
pub use artefact::{
    parse_timestamp, render_timestamp, Artefact, ArtefactSet, ArtfMetadata, ARTF_TIME_FORMAT,
};
pub use error::{ExtractError, Result};
pub use export::{export_extraction, ExportFormat};
pub use extract::{
    Extraction, ExtractOptions, FolderExtractor, SingleFileExtractor, ANNOTATION_EXTENSION,
};
pub use index::SampleIndex;
pub use naming::{NamingPolicy, TbiNaming};
pub use resolver::{ChunkCache, RangeResolver};
pub use segmenter::{apply_matching, partition_channel};
pub use store::{MemStore, SampleStore, StoreProvider};
pub use types::{IndexEntry, ResolvedSegment, SegmentRef};

// Important constants
/// Sentinel written in place of non-finite samples during materialization.
pub const MISSING_VALUE: f64 = -99999.0;
/// Width of a normal-segment window: 10 seconds, in microseconds.
pub const NORMAL_WINDOW_US: i64 = 10_000_000;
/// Microseconds per second.
pub const MICROS_PER_SECOND: i64 = 1_000_000;

/// Library version
///
/// Returns the current version of the artiseg library.
///
/// # Examples
///
/// ```rust
/// let version = artiseg::version();
/// assert!(!version.is_empty());
/// assert!(version.contains('.'));
/// ```
pub fn version() -> &'static str {
    env!("CARGO_PKG_VERSION")
}
