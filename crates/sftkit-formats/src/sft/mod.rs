//! Version-2 SFT blocks
//!
//! An SFT file holds one or more self-contained blocks laid out back to back.
//! Each block is:
//!
//! ```text
//! +------------------+
//! | header (48 B)    |  version, epoch, tbase, first bin, nsamples, crc64,
//! |                  |  detector, padding, comment_length
//! +------------------+
//! | comment          |  comment_length bytes, NUL terminated, zero padded
//! +------------------+
//! | data             |  nsamples x (f32 re, f32 im)
//! +------------------+
//! ```
//!
//! The byte order of a block is detected from its version tag, so files
//! written on big-endian hosts read back transparently.

mod header;
mod reader;
mod writer;

pub use header::{
    CRC_OFFSET, HEADER_SIZE, MAX_VERSION, MIN_VERSION, RawHeaderV2, SftHeader, detect_version,
    has_valid_crc64, read_header,
};
pub use reader::{BinsRead, read_bins, read_sft};
pub use writer::{SftWriter, build_comment, write_sft};

use crate::SftFormat;
use crate::bins::nearest_bin;
use crate::detector::Detector;
use crate::error::{Result, SftError};
use crate::gps::GpsTime;
use binrw::{BinRead, BinWrite};
use std::collections::BTreeMap;
use std::io::Cursor;

/// Bytes per stored sample (two `f32`)
pub const BYTES_PER_BIN: u64 = 8;

/// One complex frequency-bin amplitude
#[derive(Debug, Clone, Copy, Default, PartialEq, BinRead, BinWrite)]
pub struct Complex32 {
    /// Real part
    pub re: f32,
    /// Imaginary part
    pub im: f32,
}

impl Complex32 {
    /// Create a sample.
    pub const fn new(re: f32, im: f32) -> Self {
        Self { re, im }
    }

    /// Scale both parts by a real factor.
    #[must_use]
    pub fn scale(self, factor: f32) -> Self {
        Self::new(self.re * factor, self.im * factor)
    }
}

/// An in-memory SFT: one detector, one epoch, a contiguous run of bins
#[derive(Debug, Clone, PartialEq)]
pub struct Sft {
    /// Instrument that recorded the data
    pub detector: Detector,
    /// Start time of the transformed segment
    pub epoch: GpsTime,
    /// Frequency of the first bin in Hz
    pub f0: f64,
    /// Bin spacing in Hz, the inverse of the time baseline
    pub delta_f: f64,
    /// One sample per bin, starting at `f0`
    pub data: Vec<Complex32>,
}

impl Sft {
    /// Zero-filled SFT with `num_bins` samples.
    pub fn zeroed(detector: Detector, epoch: GpsTime, f0: f64, delta_f: f64, num_bins: usize) -> Self {
        Self {
            detector,
            epoch,
            f0,
            delta_f,
            data: vec![Complex32::default(); num_bins],
        }
    }

    /// Number of frequency bins
    pub fn num_bins(&self) -> usize {
        self.data.len()
    }

    /// Index of the first bin, `round(f0 / delta_f)`
    pub fn first_bin(&self) -> u32 {
        nearest_bin(self.f0, self.delta_f)
    }

    /// Time baseline in seconds
    pub fn t_sft(&self) -> f64 {
        1.0 / self.delta_f
    }

    /// Check the fields a writer refuses to encode.
    pub fn validate(&self) -> Result<()> {
        if self.delta_f.is_nan() || self.delta_f <= 0.0 {
            return Err(SftError::InvalidArgument(format!(
                "frequency resolution must be positive, got {}",
                self.delta_f
            )));
        }
        if self.f0.is_nan() || self.f0 < 0.0 {
            return Err(SftError::InvalidArgument(format!(
                "start frequency must be non-negative, got {}",
                self.f0
            )));
        }
        if self.data.is_empty() {
            return Err(SftError::InvalidArgument(
                "SFT has no frequency bins".to_string(),
            ));
        }
        if self.data.len() > i32::MAX as usize {
            return Err(SftError::InvalidArgument(format!(
                "{} bins exceed the format limit",
                self.data.len()
            )));
        }
        if self.epoch.seconds < 0 || !self.epoch.is_normalized() {
            return Err(SftError::InvalidArgument(format!(
                "invalid epoch {}",
                self.epoch
            )));
        }
        Ok(())
    }
}

impl SftFormat for Sft {
    fn parse(data: &[u8]) -> Result<Self> {
        read_sft(&mut Cursor::new(data))
    }

    fn build(&self) -> Result<Vec<u8>> {
        let mut cursor = Cursor::new(Vec::new());
        write_sft(self, &mut cursor, None)?;
        Ok(cursor.into_inner())
    }
}

/// A time series of SFTs from one detector
pub type SftVector = Vec<Sft>;

/// SFT vectors keyed by detector, iterated in alphabetical detector order
#[derive(Debug, Clone, Default, PartialEq)]
pub struct MultiSftVector {
    vectors: BTreeMap<Detector, SftVector>,
}

impl MultiSftVector {
    /// Empty container.
    pub fn new() -> Self {
        Self::default()
    }

    /// Insert or replace the vector for `detector`.
    pub fn insert(&mut self, detector: Detector, sfts: SftVector) -> Option<SftVector> {
        self.vectors.insert(detector, sfts)
    }

    /// Vector for one detector
    pub fn get(&self, detector: &Detector) -> Option<&SftVector> {
        self.vectors.get(detector)
    }

    /// Number of detectors
    pub fn len(&self) -> usize {
        self.vectors.len()
    }

    /// Whether no detector is present
    pub fn is_empty(&self) -> bool {
        self.vectors.is_empty()
    }

    /// Detectors in alphabetical order
    pub fn detectors(&self) -> impl Iterator<Item = &Detector> {
        self.vectors.keys()
    }

    /// `(detector, vector)` pairs in alphabetical order
    pub fn iter(&self) -> impl Iterator<Item = (&Detector, &SftVector)> {
        self.vectors.iter()
    }

    /// Total number of SFTs across detectors
    pub fn total_sfts(&self) -> usize {
        self.vectors.values().map(Vec::len).sum()
    }
}

impl IntoIterator for MultiSftVector {
    type Item = (Detector, SftVector);
    type IntoIter = std::collections::btree_map::IntoIter<Detector, SftVector>;

    fn into_iter(self) -> Self::IntoIter {
        self.vectors.into_iter()
    }
}
