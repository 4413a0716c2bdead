use std::num::NonZeroUsize;
use std::path::Path;

use artiseg::doctest_utils::{artf_document, stamp, T0};
use artiseg::{
    apply_matching, parse_timestamp, partition_channel, render_timestamp, ArtefactSet,
    ExtractError, NORMAL_WINDOW_US,
};

const SECOND: i64 = 1_000_000;

#[test]
fn test_timestamp_round_trip() {
    for raw in [
        "02/01/2023 10:00:00.123456",
        "13/09/2020 12:26:40.000000",
        "31/12/1999 23:59:59.999999",
    ] {
        let parsed = parse_timestamp(raw).unwrap();
        assert_eq!(render_timestamp(&parsed), raw);
    }
}

#[test]
fn test_timestamp_padding() {
    // Shorter fractions are zero-padded to microseconds before parsing
    let short = parse_timestamp("02/01/2023 10:00:00.5").unwrap();
    let full = parse_timestamp("02/01/2023 10:00:00.500000").unwrap();
    assert_eq!(short, full);

    let bare = parse_timestamp("02/01/2023 10:00:00").unwrap();
    assert_eq!(render_timestamp(&bare), "02/01/2023 10:00:00.000000");
}

#[test]
fn test_timestamp_epoch_conversion() {
    let parsed = parse_timestamp("13/09/2020 12:26:40.000000").unwrap();
    assert_eq!(parsed.timestamp_micros(), T0);
}

#[test]
fn test_artefact_equality_ignores_metadata() {
    let doc = format!(
        r#"<ICMArtefacts>
    <Global>
        <Artefact ModifiedBy="nurse7" ModifiedDate="{d1}" StartTime="{s}" EndTime="{e}"/>
    </Global>
    <SignalGroup Name="icp">
        <Artefact ModifiedBy="dr_m" ModifiedDate="{d2}" StartTime="{s}" EndTime="{e}"/>
    </SignalGroup>
</ICMArtefacts>"#,
        d1 = stamp(T0),
        d2 = stamp(T0 + 3600 * SECOND),
        s = stamp(T0 + 10 * SECOND),
        e = stamp(T0 + 15 * SECOND),
    );
    let set = ArtefactSet::parse(&doc).unwrap();

    let global = set.global();
    let group = set.group("icp");
    // Same interval annotated by two different people is the same artefact
    assert_eq!(global[0], group[0]);
    assert_ne!(global[0].modified_by, group[0].modified_by);
}

#[test]
fn test_document_structure() {
    let doc = artf_document(
        &[(T0, T0 + 5 * SECOND)],
        &[
            ("icp", vec![(T0 + 20 * SECOND, T0 + 25 * SECOND)]),
            ("art", vec![]),
        ],
    );
    let set = ArtefactSet::parse(&doc).unwrap();

    assert_eq!(set.global().len(), 1);
    assert_eq!(set.group("icp").len(), 1);
    assert_eq!(set.group("art").len(), 0);
    assert_eq!(set.group("ecg").len(), 0);
    assert_eq!(set.group_names(), vec!["icp", "art"]);
    assert!(set.metadata().is_none());

    // A channel sees its own group plus Global; an unknown one only Global
    assert_eq!(set.for_channel("icp").len(), 2);
    assert_eq!(set.for_channel("ecg").len(), 1);
}

#[test]
fn test_info_metadata() {
    let doc = r#"<ICMArtefacts>
    <Global>
    </Global>
    <Info HDF5Filename="TBI_1001_1.hdf5" UserID="annotator42"/>
</ICMArtefacts>"#;
    let set = ArtefactSet::parse(doc).unwrap();
    let meta = set.metadata().unwrap();
    assert_eq!(meta.signal_filename.as_deref(), Some("TBI_1001_1.hdf5"));
    assert_eq!(meta.user_id.as_deref(), Some("annotator42"));
    assert!(set.is_empty());
}

#[test]
fn test_orphan_artefact_rejected() {
    let doc = format!(
        r#"<ICMArtefacts>
    <Artefact ModifiedBy="x" ModifiedDate="{t}" StartTime="{t}" EndTime="{t}"/>
</ICMArtefacts>"#,
        t = stamp(T0),
    );
    assert!(matches!(
        ArtefactSet::parse(&doc),
        Err(ExtractError::InvalidAnnotation(_))
    ));
}

#[test]
fn test_unnamed_signal_group_rejected() {
    let doc = "<ICMArtefacts><SignalGroup></SignalGroup></ICMArtefacts>";
    assert!(matches!(
        ArtefactSet::parse(doc),
        Err(ExtractError::InvalidAnnotation(_))
    ));
}

#[test]
fn test_bad_timestamp_rejected() {
    let doc = r#"<ICMArtefacts>
    <Global>
        <Artefact ModifiedBy="x" ModifiedDate="01/01/2023 10:00:00.000000" StartTime="not a time" EndTime="01/01/2023 10:00:05.000000"/>
    </Global>
</ICMArtefacts>"#;
    assert!(matches!(
        ArtefactSet::parse(doc),
        Err(ExtractError::InvalidTimestamp(_))
    ));
}

#[test]
fn test_partition_two_block_scenario() {
    // One Global artefact [T0, T0+5s], one icp artefact [T0+20s, T0+25s]
    let doc = artf_document(
        &[(T0, T0 + 5 * SECOND)],
        &[("icp", vec![(T0 + 20 * SECOND, T0 + 25 * SECOND)])],
    );
    let set = ArtefactSet::parse(&doc).unwrap();
    let file = Path::new("TBI_1001_1.hdf5");

    let (anomalous, normal) = partition_channel(&set, "icp", file, "1001");

    assert_eq!(anomalous.len(), 2);
    assert_eq!(anomalous[0].start_time, T0);
    assert_eq!(anomalous[1].start_time, T0 + 20 * SECOND);

    // The 15 s between the artefacts holds one full 10 s window; the 5 s
    // remainder is dropped and nothing precedes the first artefact
    assert_eq!(normal.len(), 1);
    assert_eq!(normal[0].start_time, T0 + 5 * SECOND);
    assert_eq!(normal[0].end_time, T0 + 15 * SECOND);

    // A channel without its own group only sees the Global artefact
    let (abp_anomalous, abp_normal) = partition_channel(&set, "abp", file, "1001");
    assert_eq!(abp_anomalous.len(), 1);
    assert!(abp_normal.is_empty());
}

#[test]
fn test_partition_window_tiling() {
    // Gap of 35 s between two Global artefacts: three 10 s windows, 5 s dropped
    let doc = artf_document(
        &[
            (T0, T0 + 5 * SECOND),
            (T0 + 40 * SECOND, T0 + 45 * SECOND),
        ],
        &[],
    );
    let set = ArtefactSet::parse(&doc).unwrap();

    let (anomalous, normal) =
        partition_channel(&set, "icp", Path::new("TBI_1001_1.hdf5"), "1001");

    assert_eq!(anomalous.len(), 2);
    assert_eq!(normal.len(), 3);
    for (i, window) in normal.iter().enumerate() {
        assert_eq!(window.duration_us(), NORMAL_WINDOW_US);
        assert_eq!(window.start_time, T0 + 5 * SECOND + i as i64 * NORMAL_WINDOW_US);
    }
    // The dropped remainder never reaches into the next anomaly
    assert!(normal.last().unwrap().end_time <= T0 + 40 * SECOND);
}

#[test]
fn test_partition_no_lead_in_windows() {
    // A single artefact deep into the recording: no windows before it
    let doc = artf_document(&[(T0 + 50 * SECOND, T0 + 55 * SECOND)], &[]);
    let set = ArtefactSet::parse(&doc).unwrap();

    let (anomalous, normal) =
        partition_channel(&set, "icp", Path::new("TBI_1001_1.hdf5"), "1001");
    assert_eq!(anomalous.len(), 1);
    assert!(normal.is_empty());
}

#[test]
fn test_partition_preserves_document_order() {
    // Artefacts listed out of time order stay in document order and the
    // negative "gap" between them yields no windows
    let doc = artf_document(
        &[
            (T0 + 30 * SECOND, T0 + 35 * SECOND),
            (T0, T0 + 5 * SECOND),
        ],
        &[],
    );
    let set = ArtefactSet::parse(&doc).unwrap();

    let (anomalous, normal) =
        partition_channel(&set, "icp", Path::new("TBI_1001_1.hdf5"), "1001");
    assert_eq!(anomalous[0].start_time, T0 + 30 * SECOND);
    assert_eq!(anomalous[1].start_time, T0);
    assert!(normal.is_empty());
}

#[test]
fn test_matching_bound_holds_over_partitions() {
    let doc = artf_document(
        &[
            (T0, T0 + 5 * SECOND),
            (T0 + 100 * SECOND, T0 + 105 * SECOND),
        ],
        &[],
    );
    let set = ArtefactSet::parse(&doc).unwrap();
    let (anomalous, normal) =
        partition_channel(&set, "icp", Path::new("TBI_1001_1.hdf5"), "1001");

    // 95 s gap: nine full windows available
    assert_eq!(normal.len(), 9);

    for k in 1..=4usize {
        let multiplier = NonZeroUsize::new(k).unwrap();
        let kept = apply_matching(normal.clone(), anomalous.len(), multiplier);
        assert!(kept.len() <= anomalous.len() * k);
        // The cap keeps the earliest windows
        assert_eq!(kept[0], normal[0]);
    }
}
