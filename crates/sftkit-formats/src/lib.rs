//! Binary codecs for Short Fourier Transform (SFT) data
//!
#![allow(clippy::cast_possible_truncation)] // Header fields are fixed-width on disk
#![allow(clippy::cast_possible_wrap)] // Header fields are fixed-width on disk
#![allow(clippy::cast_sign_loss)] // Sample counts are validated positive before casting
#![allow(clippy::cast_lossless)] // Sometimes clearer than From
#![allow(clippy::cast_precision_loss)] // Bin indices stay far below 2^52
#![allow(clippy::uninlined_format_args)] // Backwards compatibility
#![allow(clippy::doc_markdown)] // Detector codes and field names don't need backticks
#![allow(clippy::module_name_repetitions)] // Clear naming is preferred
#![allow(clippy::similar_names)] // Domain-specific naming patterns
#![allow(clippy::float_cmp)] // Version tags and test values compare exactly
#![allow(clippy::derive_partial_eq_without_eq)] // Binary format structs
#![allow(clippy::redundant_closure_for_method_calls)] // Iterator chains
#![allow(clippy::return_self_not_must_use)] // Builder patterns
//! This crate reads and writes the version-2 SFT file format used for
//! continuous-wave gravitational-wave searches, along with the pieces needed
//! to work with it: the CRC64 checksum, GPS epochs, frequency-bin rounding,
//! detector codes, the official file naming convention, timestamps files and
//! the Rome SFDB block format.
//!
//! # Formats
//!
//! - **SFT v2**: 48-byte header, NUL-terminated comment, complex `f32` samples.
//!   Either byte order is read; little-endian is written by default.
//! - **SFDB**: little-endian blocks with averaged spectra and complex data,
//!   read-only in practice but encoded symmetrically.
//!
//! Files are sequences of blocks; the [`SftFormat`] trait covers one block.
//! Multi-file discovery and loading live in `sftkit-catalog`.

#![warn(missing_docs)]

/// Frequency-bin rounding conventions
pub mod bins;
/// CRC64 (ISO 3309 reflected) checksum
pub mod crc64;
/// Two-character detector codes
pub mod detector;
pub mod error;
/// GPS epochs and the half-open range predicate
pub mod gps;
/// Official `S-D-G-T.sft` file names
pub mod naming;
pub mod sfdb;
pub mod sft;
pub mod timestamps;

#[cfg(test)]
#[allow(clippy::expect_used, clippy::unwrap_used)]
pub(crate) mod test_utils;

pub use detector::{Detector, KNOWN_DETECTORS, is_valid_detector};
pub use error::{Result, SftError};
pub use gps::{GpsTime, gps_in_range};
pub use naming::SftFilename;
pub use sft::{Complex32, MultiSftVector, Sft, SftHeader, SftVector, SftWriter};

/// Symmetric encode/decode of one self-contained block
pub trait SftFormat: Sized {
    /// Parse from bytes
    fn parse(data: &[u8]) -> Result<Self>;

    /// Build to bytes
    fn build(&self) -> Result<Vec<u8>>;

    /// Verify that `data` survives a parse/build cycle byte for byte.
    fn verify_round_trip(data: &[u8]) -> Result<()> {
        let parsed = Self::parse(data)?;
        let rebuilt = parsed.build()?;
        if data != rebuilt.as_slice() {
            return Err(SftError::InvalidArgument(
                "round-trip verification failed".to_string(),
            ));
        }
        Ok(())
    }
}
