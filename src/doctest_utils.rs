// Internal utilities for documentation tests
// This file contains helpers that build fixtures for doctests

use std::collections::HashMap;
use std::io;
use std::path::Path;

use chrono::{DateTime, Utc};

use crate::artefact::render_timestamp;
use crate::error::{ExtractError, Result};
use crate::store::{MemStore, StoreProvider};

/// Epoch of all demo fixtures: 2020-09-13 12:26:40 UTC, in microseconds.
pub const T0: i64 = 1_600_000_000_000_000;

/// A store with one contiguous `icp` chunk: 60 seconds at 100 Hz, starting
/// at [`T0`], carrying a slow sine wave around 12 mmHg.
pub fn demo_store() -> MemStore {
    let samples: Vec<f64> = (0..6000)
        .map(|i| {
            let t = i as f64 / 100.0;
            12.0 + 3.0 * (2.0 * std::f64::consts::PI * 0.2 * t).sin()
        })
        .collect();
    let mut store = MemStore::new();
    store.add_contiguous("icp", T0, 100.0, samples);
    store
}

/// A store whose arterial channel is named `art`, standing in for a
/// missing `abp`.
pub fn demo_art_store() -> MemStore {
    let samples: Vec<f64> = (0..6000)
        .map(|i| {
            let t = i as f64 / 100.0;
            80.0 + 40.0 * (2.0 * std::f64::consts::PI * 1.1 * t).sin()
        })
        .collect();
    let mut store = MemStore::new();
    store.add_contiguous("art", T0, 100.0, samples);
    store
}

/// Renders an epoch-microsecond instant in the annotation timestamp layout.
pub fn stamp(micros: i64) -> String {
    let ts = DateTime::<Utc>::from_timestamp_micros(micros).unwrap_or(DateTime::<Utc>::UNIX_EPOCH);
    render_timestamp(&ts)
}

/// Builds an annotation document from `(start_us, end_us)` interval lists:
/// one Global block followed by one SignalGroup block per named group.
pub fn artf_document(global: &[(i64, i64)], groups: &[(&str, Vec<(i64, i64)>)]) -> String {
    let mut doc = String::from("<?xml version=\"1.0\" encoding=\"utf-8\"?>\n<ICMArtefacts>\n");
    doc.push_str("\t<Global>\n");
    for &(start, end) in global {
        doc.push_str(&artefact_element(start, end));
    }
    doc.push_str("\t</Global>\n");
    for (name, intervals) in groups {
        doc.push_str(&format!("\t<SignalGroup Name=\"{}\">\n", name));
        for &(start, end) in intervals {
            doc.push_str(&artefact_element(start, end));
        }
        doc.push_str("\t</SignalGroup>\n");
    }
    doc.push_str("</ICMArtefacts>\n");
    doc
}

fn artefact_element(start: i64, end: i64) -> String {
    format!(
        "\t\t<Artefact ModifiedBy=\"Administrator\" ModifiedDate=\"{}\" StartTime=\"{}\" EndTime=\"{}\"/>\n",
        stamp(end),
        stamp(start),
        stamp(end),
    )
}

/// Writes the annotation document used by the quick-start examples:
/// a Global artefact at [`T0`]+10s..+15s and an `icp` artefact at
/// [`T0`]+30s..+35s.
pub fn write_demo_annotations<P: AsRef<Path>>(path: P) -> io::Result<()> {
    let doc = artf_document(
        &[(T0 + 10_000_000, T0 + 15_000_000)],
        &[("icp", vec![(T0 + 30_000_000, T0 + 35_000_000)])],
    );
    std::fs::write(path, doc)
}

/// Store provider backed by pre-built in-memory stores keyed by file stem.
/// Treats `.hdf5` paths as signal files.
#[derive(Debug, Clone, Default)]
pub struct MemProvider {
    stores: HashMap<String, MemStore>,
}

impl MemProvider {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn insert(&mut self, stem: &str, store: MemStore) {
        self.stores.insert(stem.to_string(), store);
    }
}

impl StoreProvider for MemProvider {
    type Store = MemStore;

    fn is_signal_file(&self, path: &Path) -> bool {
        path.extension().map_or(false, |e| e == "hdf5")
    }

    fn open(&self, path: &Path) -> Result<MemStore> {
        let stem = path.file_stem().and_then(|s| s.to_str()).unwrap_or("");
        self.stores
            .get(stem)
            .cloned()
            .ok_or_else(|| ExtractError::MissingFile(format!("{}: no such store", path.display())))
    }
}
