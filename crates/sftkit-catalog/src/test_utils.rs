//! Shared fixtures for catalog tests

use sftkit_formats::{Complex32, GpsTime, Sft, SftWriter};
use std::fs::File;
use std::io::{BufWriter, Write};
use std::path::{Path, PathBuf};

/// SFT whose sample `i` is `(i + 0.5, -i / 4)`, all exactly representable.
pub fn sample_sft(detector: &str, seconds: i32, f0: f64, delta_f: f64, num_bins: usize) -> Sft {
    Sft {
        detector: detector.parse().expect("test detector code"),
        epoch: GpsTime::from_seconds(seconds),
        f0,
        delta_f,
        data: (0..num_bins)
            .map(|i| Complex32::new(i as f32 + 0.5, -(i as f32) * 0.25))
            .collect(),
    }
}

/// Write one block to `dir/name`.
pub fn write_single(dir: &Path, name: &str, sft: &Sft) -> PathBuf {
    write_merged(dir, name, std::slice::from_ref(sft))
}

/// Write blocks back to back into `dir/name`.
pub fn write_merged(dir: &Path, name: &str, sfts: &[Sft]) -> PathBuf {
    let path = dir.join(name);
    let mut out = BufWriter::new(File::create(&path).expect("create test file"));
    SftWriter::new()
        .write_all(sfts, &mut out, None)
        .expect("encode test SFTs");
    out.flush().expect("flush test file");
    path
}
