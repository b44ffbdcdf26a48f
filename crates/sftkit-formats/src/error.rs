//! Error types for SFT encoding and decoding

use thiserror::Error;

/// Errors raised while reading, writing or naming SFT data
#[derive(Debug, Error)]
pub enum SftError {
    /// I/O error from the underlying stream
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// Binary record could not be decoded or encoded
    #[error("binary format error: {0}")]
    BinRw(#[from] binrw::Error),

    /// Leading version tag does not match any supported version in either byte order
    #[error("unsupported SFT version tag {tag:?}, supported range is [{min}, {max}]")]
    BadVersion {
        /// Raw 8 bytes found where the version tag was expected
        tag: [u8; 8],
        /// Lowest supported version
        min: u32,
        /// Highest supported version
        max: u32,
    },

    /// Header decoded but violates a structural rule
    #[error("corrupt SFT header: {0}")]
    CorruptHeader(String),

    /// Bad caller input
    #[error("invalid argument: {0}")]
    InvalidArgument(String),

    /// Requested bin window is empty or degenerate
    #[error("invalid bin range [{first}, {last}]")]
    InvalidRange {
        /// First requested bin
        first: u32,
        /// Last requested bin
        last: u32,
    },

    /// Caller-supplied sample buffer cannot hold the bins to be read
    #[error("sample buffer too small: need {needed} bins, have {available}")]
    BufferTooSmall {
        /// Bins that would be read
        needed: usize,
        /// Slots available in the buffer
        available: usize,
    },

    /// Two-character code is not a known detector
    #[error("invalid detector code '{0}'")]
    InvalidDetector(String),

    /// Filename description field contains forbidden characters
    #[error("invalid description field '{field}': {reason}")]
    InvalidDescriptionField {
        /// The rejected field
        field: String,
        /// Why it was rejected
        reason: String,
    },

    /// Filename does not follow the S-D-G-T.sft convention
    #[error("invalid SFT filename '{name}': {reason}")]
    InvalidFilename {
        /// The rejected filename
        name: String,
        /// Why it was rejected
        reason: String,
    },

    /// Epoch string or timestamps-file line could not be parsed
    #[error("invalid timestamp '{input}': {reason}")]
    InvalidTimestamp {
        /// Offending input text
        input: String,
        /// Why it was rejected
        reason: String,
    },

    /// SFDB block is malformed or uses an unsupported detector number
    #[error("SFDB error: {0}")]
    Sfdb(String),
}

/// Result type for SFT format operations
pub type Result<T> = std::result::Result<T, SftError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_messages() {
        let err = SftError::InvalidRange { first: 10, last: 4 };
        assert_eq!(err.to_string(), "invalid bin range [10, 4]");

        let err = SftError::InvalidDetector("Q7".to_string());
        assert_eq!(err.to_string(), "invalid detector code 'Q7'");

        let err = SftError::BufferTooSmall {
            needed: 8,
            available: 2,
        };
        assert!(err.to_string().contains("need 8 bins"));
    }

    #[test]
    fn test_io_conversion() {
        let io = std::io::Error::new(std::io::ErrorKind::UnexpectedEof, "short read");
        let err: SftError = io.into();
        assert!(matches!(err, SftError::Io(_)));
    }
}
