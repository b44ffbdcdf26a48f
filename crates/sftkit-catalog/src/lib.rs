//! Discovery, cataloguing and loading of SFT files.
//!
//! This crate sits on top of `sftkit-formats` and handles everything that
//! spans more than one block or more than one file:
//!
//! - **Resolver**: expands file patterns (`a;b`, globs, `list:` files) into
//!   sorted paths
//! - **Catalog**: scans every block header without reading samples, checks
//!   merged files for consistency and applies selection constraints
//! - **View**: splits a catalog by detector without copying descriptors
//! - **Loader**: stitches catalog entries into complete in-memory SFTs for a
//!   frequency band, detecting gaps between partial files
//! - **Writer**: writes single, merged and per-SFT files with official names
//! - **SFDB**: converts Rome SFDB files into SFT vectors
//!
//! # Example
//!
//! ```rust,no_run
//! use sftkit_catalog::{Constraints, find_sfts, load_multi_sfts};
//!
//! # fn example() -> sftkit_catalog::Result<()> {
//! let constraints = Constraints::default().with_detector("H1".parse()?);
//! let catalog = find_sfts("data/*.sft", &constraints)?;
//! let sfts = load_multi_sfts(&catalog, Some(100.0), Some(101.0))?;
//! for (detector, vector) in sfts.iter() {
//!     println!("{detector}: {} SFTs", vector.len());
//! }
//! # Ok(())
//! # }
//! ```

#![warn(missing_docs)]
#![allow(clippy::must_use_candidate)]
#![allow(clippy::cast_possible_truncation)] // Bin counts fit the on-disk i32 fields
#![allow(clippy::cast_precision_loss)] // Bin indices stay far below 2^52
#![allow(clippy::uninlined_format_args)] // Backwards compatibility

use sftkit_formats::SftError;
use std::path::PathBuf;
use thiserror::Error;

// Pattern expansion
pub mod resolver;

// Header scanning and selection
pub mod catalog;

// Per-detector partitioning
pub mod view;

// Band-limited vector loading
pub mod loader;

// File output
pub mod writer;

// Rome SFDB ingestion
pub mod sfdb;

// Job configuration
pub mod config;

pub use catalog::{
    Constraints, Locator, SftCatalog, SftDescriptor, check_crc, count_detectors, find_sfts,
    list_detectors,
};
pub use config::CatalogConfig;
pub use loader::{load_from_view, load_multi_sfts, load_sfts};
pub use resolver::find_files;
pub use sfdb::read_sfdb;
pub use view::{CatalogView, partition_by_detector};
pub use writer::{
    FileWriter, write_sft_file, write_vector_to_dir, write_vector_to_file,
    write_vector_to_named_file,
};

/// Result type for catalog operations.
pub type Result<T> = std::result::Result<T, CatalogError>;

/// Errors that can occur while finding, loading or writing SFTs.
#[derive(Debug, Error)]
pub enum CatalogError {
    /// I/O error occurred.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// Block-level codec error.
    #[error(transparent)]
    Sft(#[from] SftError),

    /// A block in a scanned file could not be decoded.
    #[error("{path}:{offset} is not a valid SFT block: {source}")]
    CorruptBlock {
        /// File holding the block
        path: PathBuf,
        /// Byte offset of the block
        offset: u64,
        /// Underlying decode error
        #[source]
        source: SftError,
    },

    /// Bad caller input.
    #[error("Invalid argument: {0}")]
    InvalidArgument(String),

    /// Pattern matched no files.
    #[error("No files found: {0}")]
    NotFound(String),

    /// Consecutive blocks of a merged file disagree.
    #[error("Merged SFT file {path} has inconsistent block at offset {offset}: {reason}")]
    InconsistentMergedFile {
        /// The merged file
        path: PathBuf,
        /// Offset of the offending block
        offset: u64,
        /// Which rule was broken
        reason: String,
    },

    /// Matched SFTs have different frequency resolutions.
    #[error("Inconsistent frequency resolution: {expected} != {found}")]
    InconsistentDeltaF {
        /// Resolution of the first SFT
        expected: f64,
        /// Conflicting resolution
        found: f64,
    },

    /// A requested timestamp has no matching SFT.
    #[error("Timestamp {0} did not find a matching SFT")]
    MissingTimestamp(String),

    /// Pieces of one SFT do not join up.
    #[error("Data gap: {0}")]
    DataGap(String),

    /// Pieces of one SFT disagree on epoch or resolution.
    #[error("Inconsistent segment: {0}")]
    InconsistentSegment(String),

    /// Loaded SFT stops short of the requested band.
    #[error("Incomplete segment: {0}")]
    IncompleteSegment(String),

    /// A stored checksum does not match the block contents.
    #[error("CRC64 checksum mismatch in SFTs matching '{0}'")]
    ChecksumMismatch(String),

    /// SFDB ingestion failed.
    #[error("SFDB error: {0}")]
    Sfdb(String),

    /// Configuration file could not be parsed.
    #[error("Configuration error: {0}")]
    Config(#[from] serde_json::Error),
}

#[cfg(test)]
#[allow(clippy::expect_used, clippy::unwrap_used)]
pub(crate) mod test_utils;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_messages() {
        let err = CatalogError::InconsistentDeltaF {
            expected: 0.5,
            found: 0.25,
        };
        assert_eq!(
            err.to_string(),
            "Inconsistent frequency resolution: 0.5 != 0.25"
        );

        let err: CatalogError = SftError::InvalidDetector("Q1".to_string()).into();
        assert_eq!(err.to_string(), "invalid detector code 'Q1'");
    }
}
