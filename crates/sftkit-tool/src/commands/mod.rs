//! Command implementations

pub mod dump;
pub mod find;
pub mod load;
pub mod merge;
pub mod sfdb;
pub mod validate;

use serde::Serialize;
use sftkit_formats::Sft;

/// Summary of one detector's loaded vector
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct VectorSummary {
    /// Detector code
    pub detector: String,
    /// Number of SFTs
    pub num_sfts: usize,
    /// Start frequency in Hz
    pub f0: f64,
    /// Frequency resolution in Hz
    pub delta_f: f64,
    /// Bins per SFT
    pub num_bins: usize,
    /// First epoch, GPS seconds
    pub first_epoch: f64,
    /// Last epoch, GPS seconds
    pub last_epoch: f64,
}

impl VectorSummary {
    /// Summarize a non-empty vector.
    pub fn new(detector: &str, sfts: &[Sft]) -> Option<Self> {
        let (first, last) = (sfts.first()?, sfts.last()?);
        Some(Self {
            detector: detector.to_string(),
            num_sfts: sfts.len(),
            f0: first.f0,
            delta_f: first.delta_f,
            num_bins: first.num_bins(),
            first_epoch: first.epoch.as_f64(),
            last_epoch: last.epoch.as_f64(),
        })
    }
}
