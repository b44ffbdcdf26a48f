//! Detector codes
//!
//! Every SFT block names its instrument with a two-character code: a site
//! letter followed by a channel character (`H1`, `L1`, `V1`, ...). Only codes
//! from a fixed table are accepted, both when reading and when writing.

use crate::error::{Result, SftError};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// Known detector prefixes.
///
/// Interferometers and bar detectors with registered site codes, followed by
/// the `Z1`..`Z9` pseudo-detectors used for synthetic data.
pub const KNOWN_DETECTORS: &[&str] = &[
    "A1", "B1", "C1", "E1", "E2", "E3", "G1", "H1", "H2", "I1", "K1", "L1", "N1", "O1", "T1",
    "U1", "V1", "X1", "Z1", "Z2", "Z3", "Z4", "Z5", "Z6", "Z7", "Z8", "Z9",
];

/// Validated two-character detector code
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct Detector([u8; 2]);

impl Detector {
    /// Build from raw header bytes, rejecting unknown codes.
    pub fn from_bytes(bytes: [u8; 2]) -> Result<Self> {
        if is_valid_detector(&bytes) {
            Ok(Self(bytes))
        } else {
            Err(SftError::InvalidDetector(
                String::from_utf8_lossy(&bytes).into_owned(),
            ))
        }
    }

    /// Raw bytes as stored in the header
    pub const fn as_bytes(&self) -> [u8; 2] {
        self.0
    }

    /// Site letter, e.g. `H` for `H1`
    pub const fn site(&self) -> char {
        self.0[0] as char
    }

    /// Channel character, e.g. `1` for `H1`
    pub const fn channel(&self) -> char {
        self.0[1] as char
    }

    /// Code as a string slice
    pub fn as_str(&self) -> &str {
        // Table entries are ASCII
        std::str::from_utf8(&self.0).unwrap_or("??")
    }
}

/// Whether the first two bytes of `name` form a known detector code.
pub fn is_valid_detector(name: &[u8]) -> bool {
    name.len() >= 2
        && KNOWN_DETECTORS
            .iter()
            .any(|known| known.as_bytes() == &name[..2])
}

impl FromStr for Detector {
    type Err = SftError;

    fn from_str(s: &str) -> Result<Self> {
        let bytes = s.as_bytes();
        if bytes.len() != 2 {
            return Err(SftError::InvalidDetector(s.to_string()));
        }
        Self::from_bytes([bytes[0], bytes[1]])
    }
}

impl TryFrom<String> for Detector {
    type Error = SftError;

    fn try_from(value: String) -> Result<Self> {
        value.parse()
    }
}

impl From<Detector> for String {
    fn from(detector: Detector) -> Self {
        detector.as_str().to_string()
    }
}

impl fmt::Display for Detector {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[cfg(test)]
#[allow(clippy::expect_used, clippy::unwrap_used)]
mod tests {
    use super::*;

    #[test]
    fn test_known_codes() {
        for code in ["H1", "L1", "V1", "G1", "K1", "Z3"] {
            let det: Detector = code.parse().unwrap();
            assert_eq!(det.as_str(), code);
            assert_eq!(det.to_string(), code);
        }
    }

    #[test]
    fn test_unknown_codes_rejected() {
        assert!("Q1".parse::<Detector>().is_err());
        assert!("H".parse::<Detector>().is_err());
        assert!("H1X".parse::<Detector>().is_err());
        assert!(Detector::from_bytes([0, 0]).is_err());
    }

    #[test]
    fn test_prefix_validation() {
        assert!(is_valid_detector(b"H1:DCS-CALIB"));
        assert!(!is_valid_detector(b"H"));
        assert!(!is_valid_detector(b"h1"));
    }

    #[test]
    fn test_site_and_channel() {
        let det: Detector = "H2".parse().unwrap();
        assert_eq!(det.site(), 'H');
        assert_eq!(det.channel(), '2');
        assert_eq!(det.as_bytes(), *b"H2");
    }

    #[test]
    fn test_ordering_is_alphabetical() {
        let mut dets: Vec<Detector> = ["V1", "H1", "L1"]
            .iter()
            .map(|s| s.parse().unwrap())
            .collect();
        dets.sort();
        let names: Vec<&str> = dets.iter().map(Detector::as_str).collect();
        assert_eq!(names, ["H1", "L1", "V1"]);
    }
}
