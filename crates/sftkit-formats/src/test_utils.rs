//! Shared fixtures for format tests

use crate::detector::Detector;
use crate::gps::GpsTime;
use crate::sft::{Complex32, Sft, write_sft};

/// SFT with a recognizable, exactly representable sample pattern.
pub fn sample_sft(detector: &str, seconds: i32, f0: f64, delta_f: f64, num_bins: usize) -> Sft {
    let detector: Detector = detector.parse().expect("test detector code");
    let data = (0..num_bins)
        .map(|i| Complex32::new(i as f32 + 0.5, -(i as f32) * 0.25))
        .collect();
    Sft {
        detector,
        epoch: GpsTime::from_seconds(seconds),
        f0,
        delta_f,
        data,
    }
}

/// Encode one little-endian block.
pub fn sft_bytes(sft: &Sft, comment: Option<&str>) -> Vec<u8> {
    let mut out = Vec::new();
    write_sft(sft, &mut out, comment).expect("encode test SFT");
    out
}
