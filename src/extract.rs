use std::collections::BTreeMap;
use std::num::NonZeroUsize;
use std::path::{Path, PathBuf};

use log::{debug, warn};
use walkdir::WalkDir;

use crate::artefact::ArtefactSet;
use crate::error::{ExtractError, Result};
use crate::index::SampleIndex;
use crate::naming::{NamingPolicy, TbiNaming};
use crate::resolver::{ChunkCache, RangeResolver};
use crate::segmenter::{apply_matching, partition_channel};
use crate::store::{SampleStore, StoreProvider};
use crate::types::ResolvedSegment;
use crate::MISSING_VALUE;

/// File extension annotation documents are expected under, next to their
/// signal file.
pub const ANNOTATION_EXTENSION: &str = "artf";

/// Knobs of the extraction pipeline.
///
/// `skip_empty` decides what happens to a segment whose time range resolves
/// no indexed samples: tolerated and dropped from the output (the default),
/// or fatal with [`ExtractError::EmptySegment`].
///
/// With `matching` enabled the number of normal segments is capped at
/// `matching_multiplier` per anomalous segment. The cap is an upper bound;
/// see [`apply_matching`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ExtractOptions {
    pub matching: bool,
    pub matching_multiplier: NonZeroUsize,
    pub skip_empty: bool,
}

impl Default for ExtractOptions {
    fn default() -> Self {
        ExtractOptions {
            matching: false,
            matching_multiplier: NonZeroUsize::MIN,
            skip_empty: true,
        }
    }
}

/// Everything extracted from one signal file: anomalous segments drawn from
/// the annotations and normal segments cut from the gaps between them, all
/// materialized and non-empty.
#[derive(Debug, Clone)]
pub struct Extraction {
    pub anomalies: Vec<ResolvedSegment>,
    pub normals: Vec<ResolvedSegment>,
}

impl Extraction {
    /// The extraction's resolved sampling frequency: the first segment's,
    /// or 0.0 when nothing was extracted.
    pub fn frequency(&self) -> f64 {
        self.anomalies
            .first()
            .or_else(|| self.normals.first())
            .map(|s| s.frequency)
            .unwrap_or(0.0)
    }

    pub fn is_empty(&self) -> bool {
        self.anomalies.is_empty() && self.normals.is_empty()
    }
}

/// Extracts anomalous and normal segments from a single signal file.
///
/// Opening resolves the channel (with the naming policy's fallback), loads
/// its chunk index and reads the annotation document expected next to the
/// signal file with an `.artf` extension. [`extract`](Self::extract) then
/// runs the whole pipeline: partition the timeline, cap the normal windows
/// when matching is on, materialize every segment through one shared chunk
/// cache and drop whatever stayed empty.
///
/// # Examples
///
/// ```rust
/// use artiseg::{ExtractOptions, SingleFileExtractor};
///
/// # fn main() -> artiseg::Result<()> {
/// # let dir = std::env::temp_dir().join("artiseg_doc_extractor");
/// # std::fs::create_dir_all(&dir)?;
/// # let signal_path = dir.join("TBI_1001_1.hdf5");
/// # std::fs::write(&signal_path, b"")?;
/// # artiseg::doctest_utils::write_demo_annotations(signal_path.with_extension("artf"))?;
/// let store = artiseg::doctest_utils::demo_store();
/// let extractor =
///     SingleFileExtractor::new(store, &signal_path, "icp", ExtractOptions::default())?;
///
/// let extraction = extractor.extract()?;
/// println!(
///     "{} anomalous and {} normal segments from patient {}",
///     extraction.anomalies.len(),
///     extraction.normals.len(),
///     extractor.patient_id()
/// );
/// # assert!(!extraction.is_empty());
/// # std::fs::remove_dir_all(&dir).ok();
/// # Ok(())
/// # }
/// ```
pub struct SingleFileExtractor<S: SampleStore> {
    store: S,
    index: SampleIndex,
    artefacts: ArtefactSet,
    signal_path: PathBuf,
    patient_id: String,
    options: ExtractOptions,
}

impl<S: SampleStore> SingleFileExtractor<S> {
    /// Opens a signal file with the default [`TbiNaming`] rules.
    pub fn new<P: Into<PathBuf>>(
        store: S,
        signal_path: P,
        channel: &str,
        options: ExtractOptions,
    ) -> Result<Self> {
        Self::with_naming(store, signal_path, channel, options, &TbiNaming)
    }

    /// Opens a signal file under a custom naming policy.
    pub fn with_naming<P: Into<PathBuf>, N: NamingPolicy>(
        store: S,
        signal_path: P,
        channel: &str,
        options: ExtractOptions,
        naming: &N,
    ) -> Result<Self> {
        let signal_path = signal_path.into();
        let index = SampleIndex::load(&store, channel, naming)?;
        let artefacts = ArtefactSet::load(signal_path.with_extension(ANNOTATION_EXTENSION))?;
        let patient_id = naming.patient_id(&signal_path)?;
        Ok(SingleFileExtractor {
            store,
            index,
            artefacts,
            signal_path,
            patient_id,
            options,
        })
    }

    /// Runs the full pipeline and returns the materialized segments.
    ///
    /// Segments that resolved no data are dropped from the result; with
    /// `skip_empty` off the first such segment aborts the extraction
    /// instead.
    pub fn extract(&self) -> Result<Extraction> {
        let (anomalous, mut normal) = partition_channel(
            &self.artefacts,
            self.index.channel(),
            &self.signal_path,
            &self.patient_id,
        );
        if self.options.matching {
            normal = apply_matching(normal, anomalous.len(), self.options.matching_multiplier);
        }

        let resolver = RangeResolver::new(&self.store, &self.index, self.options.skip_empty);
        // One cache for the whole file so anomalies and normals share fetches
        let mut cache = ChunkCache::new();
        let normals = normal
            .iter()
            .map(|s| resolver.materialize_in(&mut cache, s))
            .collect::<Result<Vec<_>>>()?;
        let anomalies = anomalous
            .iter()
            .map(|s| resolver.materialize_in(&mut cache, s))
            .collect::<Result<Vec<_>>>()?;
        debug!(
            "extracted {} anomalous / {} normal segments from {}",
            anomalies.len(),
            normals.len(),
            self.signal_path.display()
        );

        Ok(Extraction {
            anomalies: anomalies.into_iter().filter(|s| !s.empty).collect(),
            normals: normals.into_iter().filter(|s| !s.empty).collect(),
        })
    }

    /// Anomalous segments only.
    pub fn anomalies(&self) -> Result<Vec<ResolvedSegment>> {
        Ok(self.extract()?.anomalies)
    }

    /// Normal segments only.
    pub fn normals(&self) -> Result<Vec<ResolvedSegment>> {
        Ok(self.extract()?.normals)
    }

    /// Number of anomalous artefacts per annotator for the resolved channel.
    pub fn annotator_counts(&self) -> BTreeMap<String, usize> {
        self.artefacts.annotator_counts(self.index.channel())
    }

    /// The entire channel as one array, chunk by chunk in index order, with
    /// non-finite samples replaced by the sentinel.
    pub fn full_channel(&self) -> Result<Vec<f64>> {
        let mut out = Vec::new();
        for chunk in 0..self.index.len() {
            let samples = self.store.read_samples(
                self.index.channel(),
                self.index.start_offset(chunk),
                self.index.length(chunk) as usize,
            )?;
            out.extend(
                samples
                    .into_iter()
                    .map(|v| if v.is_finite() { v } else { MISSING_VALUE }),
            );
        }
        Ok(out)
    }

    /// The resolved channel name, after any naming fallback.
    pub fn channel(&self) -> &str {
        self.index.channel()
    }

    pub fn patient_id(&self) -> &str {
        &self.patient_id
    }

    pub fn signal_path(&self) -> &Path {
        &self.signal_path
    }

    /// The annotation document the extractor was opened with.
    pub fn artefacts(&self) -> &ArtefactSet {
        &self.artefacts
    }
}

/// Extracts segments from every annotated signal file under a folder,
/// recursing into subfolders.
///
/// Signal files are whatever the [`StoreProvider`] recognizes; each one
/// must have a co-located annotation file sharing its base name, otherwise
/// it is skipped (logged, not an error). Files that fail to extract are
/// likewise reported and skipped without touching what other files already
/// contributed.
///
/// One invariant is enforced across the whole run: every file must resolve
/// the same sampling frequency. A second distinct frequency anywhere fails
/// the aggregation with [`ExtractError::FrequencyMismatch`] naming the
/// conflicting values, and no partial output is returned: downstream
/// fixed-width windowing assumes a single frequency.
pub struct FolderExtractor<P: StoreProvider> {
    root: PathBuf,
    provider: P,
    channel: String,
    options: ExtractOptions,
}

impl<P: StoreProvider> FolderExtractor<P> {
    pub fn new<R: Into<PathBuf>>(
        root: R,
        provider: P,
        channel: &str,
        options: ExtractOptions,
    ) -> Result<Self> {
        let root = root.into();
        if !root.is_dir() {
            return Err(ExtractError::MissingFile(format!(
                "{}: no such folder",
                root.display()
            )));
        }
        Ok(FolderExtractor {
            root,
            provider,
            channel: channel.to_string(),
            options,
        })
    }

    /// Extracts all anomalous and normal segments under the folder.
    pub fn extract_all(&self) -> Result<(Vec<ResolvedSegment>, Vec<ResolvedSegment>)> {
        let mut anomalies = Vec::new();
        let mut normals = Vec::new();
        let mut frequencies: Vec<f64> = Vec::new();

        for path in self.annotated_signal_files() {
            match self.extract_file(&path) {
                Ok(extraction) => {
                    track_frequency(&mut frequencies, extraction.frequency());
                    anomalies.extend(extraction.anomalies);
                    normals.extend(extraction.normals);
                }
                Err(err) => warn!("skipping {}: {}", path.display(), err),
            }
        }

        if frequencies.len() > 1 {
            return Err(ExtractError::FrequencyMismatch(frequencies));
        }
        Ok((anomalies, normals))
    }

    /// Extracts segments grouped by patient identifier.
    #[allow(clippy::type_complexity)]
    pub fn extract_by_patient(
        &self,
    ) -> Result<(
        BTreeMap<String, Vec<ResolvedSegment>>,
        BTreeMap<String, Vec<ResolvedSegment>>,
    )> {
        let mut anomalies: BTreeMap<String, Vec<ResolvedSegment>> = BTreeMap::new();
        let mut normals: BTreeMap<String, Vec<ResolvedSegment>> = BTreeMap::new();
        let mut frequencies: Vec<f64> = Vec::new();

        for path in self.annotated_signal_files() {
            match self.extract_file(&path) {
                Ok(extraction) => {
                    track_frequency(&mut frequencies, extraction.frequency());
                    for segment in extraction.anomalies {
                        anomalies
                            .entry(segment.patient_id.clone())
                            .or_default()
                            .push(segment);
                    }
                    for segment in extraction.normals {
                        normals
                            .entry(segment.patient_id.clone())
                            .or_default()
                            .push(segment);
                    }
                }
                Err(err) => warn!("skipping {}: {}", path.display(), err),
            }
        }

        if frequencies.len() > 1 {
            return Err(ExtractError::FrequencyMismatch(frequencies));
        }
        Ok((anomalies, normals))
    }

    /// Signal files under the root that have a co-located annotation file.
    /// Files without one are logged and left out.
    fn annotated_signal_files(&self) -> Vec<PathBuf> {
        let mut files = Vec::new();
        for entry in WalkDir::new(&self.root)
            .sort_by_file_name()
            .into_iter()
            .filter_map(|e| e.ok())
        {
            if !entry.file_type().is_file() {
                continue;
            }
            let path = entry.into_path();
            if !self.provider.is_signal_file(&path) {
                continue;
            }
            if path.with_extension(ANNOTATION_EXTENSION).is_file() {
                files.push(path);
            } else {
                warn!("no annotation file for {}, skipping", path.display());
            }
        }
        files
    }

    fn extract_file(&self, path: &Path) -> Result<Extraction> {
        let store = self.provider.open(path)?;
        let extractor = SingleFileExtractor::new(store, path, &self.channel, self.options)?;
        extractor.extract()
    }
}

/// Records a file's resolved frequency; 0.0 means the file contributed
/// nothing and is not evidence of a mismatch.
fn track_frequency(frequencies: &mut Vec<f64>, frequency: f64) {
    if frequency != 0.0 && !frequencies.contains(&frequency) {
        frequencies.push(frequency);
    }
}
