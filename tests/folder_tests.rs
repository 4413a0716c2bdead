use std::fs;
use std::path::Path;

use artiseg::doctest_utils::{artf_document, MemProvider, T0};
use artiseg::{ExtractError, ExtractOptions, FolderExtractor, MemStore};

const SECOND: i64 = 1_000_000;

fn init_logging() {
    let _ = env_logger::builder().is_test(true).try_init();
}

/// 60 s ramp channel at the given frequency.
fn ramp_store(frequency: f64) -> MemStore {
    let length = (60.0 * frequency) as usize;
    let mut store = MemStore::new();
    store.add_contiguous("icp", T0, frequency, (0..length).map(|k| k as f64).collect());
    store
}

/// Annotation document with two Global artefacts leaving a 30 s gap:
/// each file yields 2 anomalous and 3 normal segments.
fn two_artefact_doc() -> String {
    artf_document(
        &[
            (T0 + 10 * SECOND, T0 + 15 * SECOND),
            (T0 + 45 * SECOND, T0 + 50 * SECOND),
        ],
        &[],
    )
}

/// Creates a signal/annotation pair in `dir` and registers its store.
fn add_recording(dir: &Path, provider: &mut MemProvider, stem: &str, frequency: f64) {
    fs::write(dir.join(format!("{}.hdf5", stem)), b"").unwrap();
    fs::write(dir.join(format!("{}.artf", stem)), two_artefact_doc()).unwrap();
    provider.insert(stem, ramp_store(frequency));
}

#[test]
fn test_folder_totals_are_per_file_sums() {
    init_logging();
    let dir = tempfile::tempdir().unwrap();
    let sub = dir.path().join("ward_b");
    fs::create_dir(&sub).unwrap();

    let mut provider = MemProvider::new();
    add_recording(dir.path(), &mut provider, "TBI_1001_a", 100.0);
    add_recording(&sub, &mut provider, "TBI_2002_a", 100.0);

    let extractor =
        FolderExtractor::new(dir.path(), provider, "icp", ExtractOptions::default()).unwrap();
    let (anomalies, normals) = extractor.extract_all().unwrap();

    // Two files, each contributing 2 anomalous and 3 normal segments
    assert_eq!(anomalies.len(), 4);
    assert_eq!(normals.len(), 6);
    assert!(anomalies.iter().all(|s| s.frequency == 100.0));
}

#[test]
fn test_frequency_mismatch_aborts_run() {
    init_logging();
    let dir = tempfile::tempdir().unwrap();

    let mut provider = MemProvider::new();
    add_recording(dir.path(), &mut provider, "TBI_1001_a", 100.0);
    add_recording(dir.path(), &mut provider, "TBI_2002_a", 50.0);

    let extractor =
        FolderExtractor::new(dir.path(), provider, "icp", ExtractOptions::default()).unwrap();

    match extractor.extract_all() {
        Err(ExtractError::FrequencyMismatch(frequencies)) => {
            // Both conflicting values are named
            assert_eq!(frequencies.len(), 2);
            assert!(frequencies.contains(&100.0));
            assert!(frequencies.contains(&50.0));
        }
        other => panic!("expected FrequencyMismatch, got {:?}", other.map(|_| ())),
    }
}

#[test]
fn test_unannotated_signal_files_skipped() {
    init_logging();
    let dir = tempfile::tempdir().unwrap();

    let mut provider = MemProvider::new();
    add_recording(dir.path(), &mut provider, "TBI_1001_a", 100.0);
    // Signal file with a store but no annotation document next to it
    fs::write(dir.path().join("TBI_3003_a.hdf5"), b"").unwrap();
    provider.insert("TBI_3003_a", ramp_store(100.0));

    let extractor =
        FolderExtractor::new(dir.path(), provider, "icp", ExtractOptions::default()).unwrap();
    let (anomalies, normals) = extractor.extract_all().unwrap();
    assert_eq!(anomalies.len(), 2);
    assert_eq!(normals.len(), 3);
}

#[test]
fn test_failing_file_does_not_poison_run() {
    init_logging();
    let dir = tempfile::tempdir().unwrap();

    let mut provider = MemProvider::new();
    add_recording(dir.path(), &mut provider, "TBI_1001_a", 100.0);
    // Annotated pair whose store cannot be opened
    fs::write(dir.path().join("TBI_4004_a.hdf5"), b"").unwrap();
    fs::write(dir.path().join("TBI_4004_a.artf"), two_artefact_doc()).unwrap();
    // Annotated pair whose file name carries no patient id
    fs::write(dir.path().join("nopatient.hdf5"), b"").unwrap();
    fs::write(dir.path().join("nopatient.artf"), two_artefact_doc()).unwrap();
    provider.insert("nopatient", ramp_store(100.0));

    let extractor =
        FolderExtractor::new(dir.path(), provider, "icp", ExtractOptions::default()).unwrap();
    let (anomalies, normals) = extractor.extract_all().unwrap();

    // Only the healthy file contributes; the failures are logged and skipped
    assert_eq!(anomalies.len(), 2);
    assert_eq!(normals.len(), 3);
}

#[test]
fn test_extract_by_patient_grouping() {
    init_logging();
    let dir = tempfile::tempdir().unwrap();

    let mut provider = MemProvider::new();
    add_recording(dir.path(), &mut provider, "TBI_1001_a", 100.0);
    add_recording(dir.path(), &mut provider, "TBI_1001_b", 100.0);
    add_recording(dir.path(), &mut provider, "TBI_2002_a", 100.0);

    let extractor =
        FolderExtractor::new(dir.path(), provider, "icp", ExtractOptions::default()).unwrap();
    let (anomalies, normals) = extractor.extract_by_patient().unwrap();

    assert_eq!(anomalies.keys().collect::<Vec<_>>(), vec!["1001", "2002"]);
    // Patient 1001 has two recordings merged together
    assert_eq!(anomalies["1001"].len(), 4);
    assert_eq!(anomalies["2002"].len(), 2);
    assert_eq!(normals["1001"].len(), 6);
    assert!(anomalies["1001"].iter().all(|s| s.patient_id == "1001"));
}

#[test]
fn test_matching_applies_per_file() {
    init_logging();
    let dir = tempfile::tempdir().unwrap();

    let mut provider = MemProvider::new();
    add_recording(dir.path(), &mut provider, "TBI_1001_a", 100.0);
    add_recording(dir.path(), &mut provider, "TBI_2002_a", 100.0);

    let options = ExtractOptions {
        matching: true,
        ..ExtractOptions::default()
    };
    let extractor = FolderExtractor::new(dir.path(), provider, "icp", options).unwrap();
    let (anomalies, normals) = extractor.extract_all().unwrap();

    // Each file caps its 3 windows at 2 (one per anomaly)
    assert_eq!(anomalies.len(), 4);
    assert_eq!(normals.len(), 4);
}

#[test]
fn test_missing_root_folder() {
    let provider = MemProvider::new();
    let result = FolderExtractor::new(
        "/definitely/not/a/folder",
        provider,
        "icp",
        ExtractOptions::default(),
    );
    assert!(matches!(result, Err(ExtractError::MissingFile(_))));
}
