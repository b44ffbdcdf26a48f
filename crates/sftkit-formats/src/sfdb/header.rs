//! SFDB block header
//!
//! Every block starts with an `f64` running count, followed by this header.
//! All fields are little-endian.

use crate::detector::Detector;
use crate::error::{Result, SftError};
use binrw::{BinRead, BinWrite};

/// Size of the header record in bytes, without the leading count
pub const SFDB_HEADER_SIZE: usize = 200;

/// SFDB detector numbers and the codes they stand for
pub const SFDB_DETECTORS: &[(i32, &str)] = &[(1, "V1"), (2, "H1"), (3, "L1")];

/// Detector for an SFDB detector number.
pub fn sfdb_detector(det: i32) -> Result<Detector> {
    SFDB_DETECTORS
        .iter()
        .find(|(number, _)| *number == det)
        .map(|(_, code)| code.parse::<Detector>())
        .transpose()?
        .ok_or_else(|| SftError::Sfdb(format!("unsupported detector number {det}")))
}

/// SFDB detector whose code appears in `name`, checked in numbering order.
pub fn sfdb_detector_in_name(name: &str) -> Option<Detector> {
    SFDB_DETECTORS
        .iter()
        .find(|(_, code)| name.contains(code))
        .and_then(|(_, code)| code.parse().ok())
}

/// Header record as stored on disk
///
/// Most fields are carried through untouched; the loader only uses the
/// epoch, baseline, resolution, payload sizes and normalization factors.
#[derive(Debug, Clone, Copy, PartialEq, BinRead, BinWrite)]
#[brw(little)]
pub struct SfdbHeader {
    /// Detector number, see [`SFDB_DETECTORS`]
    #[br(assert(
        SFDB_DETECTORS.iter().any(|(number, _)| *number == det),
        "unsupported SFDB detector number {}", det
    ))]
    pub det: i32,
    /// Epoch seconds
    pub gps_sec: i32,
    /// Epoch nanoseconds
    pub gps_nsec: i32,
    /// Coherence time in seconds
    pub tbase: f64,
    /// Index of the first frequency bin
    pub firstfrind: i32,
    /// Number of frequency bins
    pub nsamples: i32,
    /// Reduction factor of the short power spectrum
    pub red: i32,
    /// Block type
    pub typ: i32,
    /// Fraction of flagged samples
    pub n_flag: f32,
    /// Scale back to 1e-20 strain units
    pub einstein: f32,
    /// Epoch as a modified Julian date
    pub mjdtime: f64,
    /// FFTs contributing to this block
    pub nfft: i32,
    /// Window type
    pub wink: i32,
    /// Data normalization
    pub normd: f32,
    /// Window normalization
    pub normw: f32,
    /// Initial frequency in Hz
    pub frinit: f64,
    /// Sampling time in seconds
    pub tsamplu: f64,
    /// Frequency resolution in Hz
    pub deltanu: f64,
    /// Detector velocity, equatorial frame
    pub velocity: [f64; 3],
    /// Detector position, equatorial frame
    pub position: [f64; 3],
    /// Zeroed samples in the time series
    pub n_zeroes: i32,
    /// Saturated samples
    pub sat_howmany: f64,
    /// Reserved
    pub spare_f64: [f64; 3],
    /// Reserved
    pub spare_f32: [f32; 3],
    /// Length of the averaged spectrum, `<= 0` when `red` applies instead
    pub lavesp: i32,
    /// Reserved
    pub spare_i32: [i32; 2],
}

impl SfdbHeader {
    /// Detector code of this block
    pub fn detector(&self) -> Result<Detector> {
        sfdb_detector(self.det)
    }

    /// Lengths in `f32` values of the averaged spectrum, the short power
    /// spectrum and the interleaved complex data that follow the header.
    pub fn payload_lengths(&self) -> Result<(usize, usize, usize)> {
        if self.nsamples < 0 {
            return Err(SftError::Sfdb(format!(
                "negative sample count {}",
                self.nsamples
            )));
        }
        let nsamples = self.nsamples as usize;

        let (averaged, short) = if self.lavesp > 0 {
            (self.lavesp as usize, self.lavesp as usize)
        } else if self.red > 0 {
            (self.red as usize, nsamples / self.red as usize)
        } else {
            return Err(SftError::Sfdb(format!(
                "neither lavesp ({}) nor red ({}) is positive",
                self.lavesp, self.red
            )));
        };
        Ok((averaged, short, 2 * nsamples))
    }

    /// Combined factor applied to every stored sample
    pub fn normalization(&self) -> f32 {
        (f64::from(self.einstein) * self.tsamplu * f64::from(self.normw)) as f32
    }
}

#[cfg(test)]
#[allow(clippy::expect_used, clippy::unwrap_used)]
mod tests {
    use super::*;
    use crate::sfdb::test_header;
    use binrw::BinWriterExt;
    use std::io::Cursor;

    #[test]
    fn test_record_size() {
        let mut cursor = Cursor::new(Vec::new());
        cursor.write_le(&test_header(2, 1000, 4)).unwrap();
        assert_eq!(cursor.into_inner().len(), SFDB_HEADER_SIZE);
    }

    #[test]
    fn test_unknown_detector_rejected() {
        let mut cursor = Cursor::new(Vec::new());
        cursor.write_le(&test_header(7, 1000, 4)).unwrap();
        cursor.set_position(0);
        assert!(SfdbHeader::read(&mut cursor).is_err());
        assert!(sfdb_detector(0).is_err());
        assert_eq!(sfdb_detector(3).unwrap().as_str(), "L1");
    }

    #[test]
    fn test_detector_from_name() {
        assert_eq!(
            sfdb_detector_in_name("segments_H1_start.txt").map(|d| d.to_string()),
            Some("H1".to_string())
        );
        assert_eq!(sfdb_detector_in_name("segments_K1.txt"), None);
    }

    #[test]
    fn test_payload_lengths() {
        let mut header = test_header(1, 0, 10);
        header.lavesp = 3;
        assert_eq!(header.payload_lengths().unwrap(), (3, 3, 20));

        header.lavesp = 0;
        header.red = 4;
        assert_eq!(header.payload_lengths().unwrap(), (4, 2, 20));

        header.red = 0;
        assert!(header.payload_lengths().is_err());
    }
}
