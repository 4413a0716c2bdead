use std::num::NonZeroUsize;
use std::path::Path;

use crate::artefact::ArtefactSet;
use crate::types::SegmentRef;
use crate::NORMAL_WINDOW_US;

/// Splits a channel's annotated timeline into anomalous and normal segment
/// references.
///
/// Every artefact applying to the channel (its signal group's plus the
/// Global ones, in document order) becomes exactly one anomalous segment,
/// times converted verbatim to epoch microseconds. Normal segments are cut
/// from the gaps between consecutive artefacts in that sequence: each gap is
/// tiled with fixed-width windows of [`NORMAL_WINDOW_US`], the fractional
/// remainder dropped. No normal window is emitted before the first artefact
/// has been seen; a recording's lead-in is deliberately left unlabeled.
///
/// # Examples
///
/// ```rust
/// use std::path::Path;
/// use artiseg::{partition_channel, ArtefactSet};
///
/// let doc = r#"<ICMArtefacts>
///     <Global>
///         <Artefact ModifiedBy="a" ModifiedDate="01/01/2023 12:00:00.000000" StartTime="01/01/2023 10:00:00.000000" EndTime="01/01/2023 10:00:05.000000"/>
///     </Global>
///     <SignalGroup Name="icp">
///         <Artefact ModifiedBy="a" ModifiedDate="01/01/2023 12:00:00.000000" StartTime="01/01/2023 10:00:20.000000" EndTime="01/01/2023 10:00:25.000000"/>
///     </SignalGroup>
/// </ICMArtefacts>"#;
/// let set = ArtefactSet::parse(doc).unwrap();
///
/// let (anomalous, normal) =
///     partition_channel(&set, "icp", Path::new("TBI_1001.hdf5"), "1001");
///
/// assert_eq!(anomalous.len(), 2);
/// // The 15 s gap between the artefacts holds one 10 s window;
/// // the 5 s remainder is dropped
/// assert_eq!(normal.len(), 1);
/// assert_eq!(normal[0].duration_us(), 10_000_000);
/// ```
pub fn partition_channel(
    artefacts: &ArtefactSet,
    channel: &str,
    source_file: &Path,
    patient_id: &str,
) -> (Vec<SegmentRef>, Vec<SegmentRef>) {
    let mut anomalous = Vec::new();
    let mut normal = Vec::new();

    let mut normal_start: Option<i64> = None;
    for artefact in artefacts.for_channel(channel) {
        let start = artefact.start_micros();
        let end = artefact.end_micros();

        anomalous.push(SegmentRef {
            start_time: start,
            end_time: end,
            source_file: source_file.to_path_buf(),
            patient_id: patient_id.to_string(),
        });

        if let Some(gap_start) = normal_start {
            slice_gap(gap_start, start, source_file, patient_id, &mut normal);
        }
        normal_start = Some(end);
    }

    (anomalous, normal)
}

/// Tiles the gap between two anomalies with fixed-width normal windows.
///
/// A gap shorter than one window yields nothing; so does a non-positive gap
/// from overlapping or out-of-order artefacts.
fn slice_gap(
    gap_start: i64,
    gap_end: i64,
    source_file: &Path,
    patient_id: &str,
    out: &mut Vec<SegmentRef>,
) {
    let gap = gap_end - gap_start;
    if gap < NORMAL_WINDOW_US {
        return;
    }
    let windows = gap / NORMAL_WINDOW_US;
    for i in 0..windows {
        let start = gap_start + i * NORMAL_WINDOW_US;
        out.push(SegmentRef {
            start_time: start,
            end_time: start + NORMAL_WINDOW_US,
            source_file: source_file.to_path_buf(),
            patient_id: patient_id.to_string(),
        });
    }
}

/// Caps the number of normal segments at `anomaly_count * multiplier`.
///
/// This is an upper bound, not an exact ratio: when fewer normal segments
/// exist than the bound allows, all of them are kept.
///
/// # Examples
///
/// ```rust
/// use std::num::NonZeroUsize;
/// use artiseg::{apply_matching, SegmentRef};
///
/// let normals: Vec<SegmentRef> = (0..10)
///     .map(|i| SegmentRef {
///         start_time: i * 10_000_000,
///         end_time: (i + 1) * 10_000_000,
///         source_file: "TBI_1001.hdf5".into(),
///         patient_id: "1001".to_string(),
///     })
///     .collect();
///
/// let capped = apply_matching(normals, 3, NonZeroUsize::new(2).unwrap());
/// assert_eq!(capped.len(), 6);
/// ```
pub fn apply_matching(
    mut normals: Vec<SegmentRef>,
    anomaly_count: usize,
    multiplier: NonZeroUsize,
) -> Vec<SegmentRef> {
    normals.truncate(anomaly_count.saturating_mul(multiplier.get()));
    normals
}

#[cfg(test)]
mod tests {
    use super::*;

    fn window_refs(count: i64) -> Vec<SegmentRef> {
        (0..count)
            .map(|i| SegmentRef {
                start_time: i * NORMAL_WINDOW_US,
                end_time: (i + 1) * NORMAL_WINDOW_US,
                source_file: "TBI_1.hdf5".into(),
                patient_id: "1".to_string(),
            })
            .collect()
    }

    #[test]
    fn test_slice_gap_counts() {
        let file = Path::new("TBI_1.hdf5");
        for (gap_s, expected) in [(0, 0), (5, 0), (10, 1), (15, 1), (25, 2), (30, 3)] {
            let mut out = Vec::new();
            slice_gap(0, gap_s * 1_000_000, file, "1", &mut out);
            assert_eq!(out.len(), expected, "gap of {}s", gap_s);
            for window in &out {
                assert_eq!(window.duration_us(), NORMAL_WINDOW_US);
            }
        }
    }

    #[test]
    fn test_slice_gap_negative() {
        let mut out = Vec::new();
        slice_gap(20_000_000, 10_000_000, Path::new("TBI_1.hdf5"), "1", &mut out);
        assert!(out.is_empty());
    }

    #[test]
    fn test_matching_is_upper_bound() {
        let one = NonZeroUsize::MIN;
        // More normals than the bound: truncated
        assert_eq!(apply_matching(window_refs(10), 4, one).len(), 4);
        // Fewer normals than the bound: all kept
        assert_eq!(apply_matching(window_refs(2), 4, one).len(), 2);
        // Zero anomalies: nothing kept
        assert!(apply_matching(window_refs(5), 0, one).is_empty());

        let multiplier = NonZeroUsize::new(3).unwrap();
        for normals in [3usize, 6, 12] {
            let kept = apply_matching(window_refs(normals as i64), 2, multiplier);
            assert!(kept.len() <= 2 * multiplier.get());
        }
    }
}
