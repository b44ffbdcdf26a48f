#![allow(clippy::expect_used, clippy::unwrap_used, clippy::panic)]
//! End-to-end tests: write files, scan them, load bands back
//!
//! Every test builds its own directory of SFT files with the public writer
//! so the scans see exactly what a user's data directory would hold.

use pretty_assertions::assert_eq;
use sftkit_catalog::{
    CatalogError, Constraints, check_crc, find_sfts, list_detectors, load_multi_sfts, load_sfts,
    partition_by_detector, write_sft_file, write_vector_to_dir, write_vector_to_file,
};
use sftkit_formats::{Complex32, Detector, GpsTime, Sft};
use std::path::Path;

fn sft(detector: &str, seconds: i32, first_bin: u32, num_bins: usize) -> Sft {
    let delta_f = 0.01;
    Sft {
        detector: detector.parse().unwrap(),
        epoch: GpsTime::from_seconds(seconds),
        f0: f64::from(first_bin) * delta_f,
        delta_f,
        data: (0..num_bins)
            .map(|k| Complex32::new(seconds as f32, k as f32))
            .collect(),
    }
}

fn glob(dir: &Path) -> String {
    format!("{}/*.sft", dir.display())
}

#[test]
fn three_files_scan_and_load() {
    let dir = tempfile::tempdir().unwrap();
    for (name, epoch) in [("c.sft", 300), ("a.sft", 100), ("b.sft", 200)] {
        write_sft_file(&sft("H1", epoch, 5000, 50), &dir.path().join(name), None).unwrap();
    }

    let catalog = find_sfts(&glob(dir.path()), &Constraints::default()).unwrap();
    assert_eq!(catalog.len(), 3);
    let epochs: Vec<i32> = catalog.iter().map(|e| e.epoch().seconds).collect();
    assert_eq!(epochs, [100, 200, 300]);

    let sfts = load_sfts(&catalog, None, None).unwrap();
    assert_eq!(sfts.len(), 3);
    for (loaded, epoch) in sfts.iter().zip([100, 200, 300]) {
        assert_eq!(loaded.epoch, GpsTime::from_seconds(epoch));
        assert_eq!(loaded.data.len(), 50);
        assert_eq!(loaded.first_bin(), 5000);
        assert_eq!(loaded.data[7], Complex32::new(epoch as f32, 7.0));
    }
}

#[test]
fn scanning_twice_gives_the_same_catalog() {
    let dir = tempfile::tempdir().unwrap();
    let vector: Vec<Sft> = (0..4).map(|i| sft("L1", 1000 + 10 * i, 200, 16)).collect();
    let paths = write_vector_to_dir(&vector, dir.path(), None, None).unwrap();
    assert_eq!(paths.len(), 4);

    let first = find_sfts(&glob(dir.path()), &Constraints::default()).unwrap();
    let second = find_sfts(&glob(dir.path()), &Constraints::default()).unwrap();
    assert_eq!(first, second);
}

#[test]
fn merged_files_must_be_consistent() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("merged.sft");

    // Concatenate two single-block files with different detectors
    write_sft_file(&sft("H1", 100, 10, 4), &dir.path().join("h.part"), None).unwrap();
    write_sft_file(&sft("L1", 200, 10, 4), &dir.path().join("l.part"), None).unwrap();
    let mut bytes = std::fs::read(dir.path().join("h.part")).unwrap();
    bytes.extend(std::fs::read(dir.path().join("l.part")).unwrap());
    std::fs::write(&path, bytes).unwrap();

    assert!(matches!(
        find_sfts(&glob(dir.path()), &Constraints::default()),
        Err(CatalogError::InconsistentMergedFile { .. })
    ));

    write_vector_to_file(&[sft("H1", 100, 10, 4), sft("H1", 200, 10, 4)], &path, None).unwrap();
    let catalog = find_sfts(&glob(dir.path()), &Constraints::default()).unwrap();
    assert_eq!(catalog.len(), 2);
    assert_eq!(
        catalog.get(1).unwrap().locator().unwrap().offset(),
        std::fs::metadata(&path).unwrap().len() / 2
    );
}

#[test]
fn narrow_band_pieces_stitch_or_report_gaps() {
    let dir = tempfile::tempdir().unwrap();
    write_sft_file(&sft("H1", 100, 1000, 10), &dir.path().join("low.sft"), None).unwrap();
    write_sft_file(&sft("H1", 100, 1010, 10), &dir.path().join("high.sft"), None).unwrap();

    let catalog = find_sfts(&glob(dir.path()), &Constraints::default()).unwrap();
    let sfts = load_sfts(&catalog, Some(10.05), Some(10.15)).unwrap();
    assert_eq!(sfts.len(), 1);
    assert_eq!(sfts[0].first_bin(), 1005);
    assert_eq!(sfts[0].data.len(), 10);
    assert_eq!(sfts[0].data[4], Complex32::new(100.0, 9.0));
    assert_eq!(sfts[0].data[5], Complex32::new(100.0, 0.0));

    // Replace the upper piece with one that starts a bin too late
    write_sft_file(&sft("H1", 100, 1011, 10), &dir.path().join("high.sft"), None).unwrap();
    let catalog = find_sfts(&glob(dir.path()), &Constraints::default()).unwrap();
    assert!(matches!(
        load_sfts(&catalog, None, None),
        Err(CatalogError::DataGap(_))
    ));
}

#[test]
fn multi_detector_partition_and_load() {
    let dir = tempfile::tempdir().unwrap();
    for (det, epoch) in [("L1", 100), ("H1", 100), ("V1", 150), ("H1", 200)] {
        let name = format!("{det}-{epoch}.sft");
        write_sft_file(&sft(det, epoch, 300, 8), &dir.path().join(name), None).unwrap();
    }

    let catalog = find_sfts(&glob(dir.path()), &Constraints::default()).unwrap();
    let detectors: Vec<Detector> = list_detectors(&catalog);
    assert_eq!(
        detectors.iter().map(Detector::as_str).collect::<Vec<_>>(),
        ["H1", "L1", "V1"]
    );

    let view = partition_by_detector(&catalog);
    assert_eq!(view.get("H1".parse().unwrap()).unwrap().len(), 2);

    let multi = load_multi_sfts(&catalog, Some(3.0), Some(3.04)).unwrap();
    assert_eq!(multi.total_sfts(), 4);
    for (_, sfts) in multi.iter() {
        assert!(sfts.iter().all(|s| s.data.len() == 4));
    }
}

#[test]
fn checksums_catch_flipped_bytes() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("a.sft");
    write_sft_file(&sft("H1", 100, 10, 4), &path, Some("flip test")).unwrap();

    let catalog = find_sfts(&glob(dir.path()), &Constraints::default()).unwrap();
    assert!(check_crc(&catalog).unwrap());

    let original = std::fs::read(&path).unwrap();
    // Comment starts right after the 48-byte header
    for offset in [48, 52, original.len() - 8, original.len() - 1] {
        let mut bytes = original.clone();
        bytes[offset] ^= 0x80;
        std::fs::write(&path, &bytes).unwrap();
        assert!(!check_crc(&catalog).unwrap(), "flip at {offset} went unnoticed");
    }
}

#[test]
fn timestamps_select_exact_epochs() {
    let dir = tempfile::tempdir().unwrap();
    for epoch in [100, 200, 300] {
        write_sft_file(
            &sft("H1", epoch, 10, 4),
            &dir.path().join(format!("{epoch}.sft")),
            None,
        )
        .unwrap();
    }
    let list = dir.path().join("wanted.txt");
    std::fs::write(&list, "# epochs to analyse\n300\n100 0\n").unwrap();

    let constraints = Constraints::default().with_timestamps_file(&list);
    let catalog = find_sfts(&glob(dir.path()), &constraints).unwrap();
    let epochs: Vec<i32> = catalog.iter().map(|e| e.epoch().seconds).collect();
    assert_eq!(epochs, [100, 300]);

    std::fs::write(&list, "300\n400\n").unwrap();
    assert!(matches!(
        find_sfts(&glob(dir.path()), &constraints),
        Err(CatalogError::MissingTimestamp(_))
    ));
}
