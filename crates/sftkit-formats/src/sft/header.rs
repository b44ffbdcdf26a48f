//! SFT v2 block header
//!
//! ```text
//! offset  size  field
//!      0     8  version (f64, 2.0)
//!      8     4  gps_sec (i32)
//!     12     4  gps_nsec (i32)
//!     16     8  tbase (f64, seconds)
//!     24     4  first_frequency_index (i32)
//!     28     4  nsamples (i32)
//!     32     8  crc64 (u64)
//!     40     2  detector (2 ASCII bytes)
//!     42     2  padding
//!     44     4  comment_length (i32, multiple of 8)
//! ```
//!
//! All multi-byte fields share the byte order of the version tag.

use crate::crc64::{CRC64_INIT, crc64};
use crate::detector::Detector;
use crate::error::{Result, SftError};
use crate::gps::GpsTime;
use crate::sft::BYTES_PER_BIN;
use binrw::{BinRead, BinWrite, Endian};
use std::io::{Cursor, Read, Seek, SeekFrom};
use tracing::{debug, warn};

/// Size of the fixed header in bytes
pub const HEADER_SIZE: usize = 48;

/// Offset of the crc64 field inside the header
pub const CRC_OFFSET: usize = 32;

/// Lowest supported format version
pub const MIN_VERSION: u32 = 2;

/// Highest supported format version
pub const MAX_VERSION: u32 = 2;

const DATA_CHUNK: usize = 8192;

/// Header record exactly as stored on disk
///
/// The byte order is chosen at read/write time through `read_options` and
/// `write_options`.
#[derive(Debug, Clone, Copy, PartialEq, BinRead, BinWrite)]
pub struct RawHeaderV2 {
    /// Format version, 2.0
    pub version: f64,
    /// Epoch seconds
    pub gps_sec: i32,
    /// Epoch nanoseconds
    pub gps_nsec: i32,
    /// Time baseline in seconds
    pub tbase: f64,
    /// Index of the first stored bin
    pub first_frequency_index: i32,
    /// Number of stored bins
    pub nsamples: i32,
    /// Checksum over header, comment and data
    pub crc64: u64,
    /// Detector code
    pub detector: [u8; 2],
    /// Reserved
    pub padding: [u8; 2],
    /// Comment length including NUL terminator and zero padding
    pub comment_length: i32,
}

impl RawHeaderV2 {
    /// Encode with the given byte order.
    pub fn to_bytes(&self, endian: Endian) -> Result<[u8; HEADER_SIZE]> {
        let mut cursor = Cursor::new([0u8; HEADER_SIZE]);
        self.write_options(&mut cursor, endian, ())?;
        Ok(cursor.into_inner())
    }

    /// Decode with the given byte order.
    pub fn from_bytes(bytes: &[u8; HEADER_SIZE], endian: Endian) -> Result<Self> {
        Ok(Self::read_options(&mut Cursor::new(bytes), endian, ())?)
    }
}

/// Decoded and validated block header
#[derive(Debug, Clone, PartialEq)]
pub struct SftHeader {
    /// Instrument code
    pub detector: Detector,
    /// Start time
    pub epoch: GpsTime,
    /// Frequency of the first stored bin in Hz
    pub f0: f64,
    /// Bin spacing in Hz
    pub delta_f: f64,
    /// Format version
    pub version: u32,
    /// Number of stored bins
    pub num_bins: u32,
    /// Checksum stored in the header
    pub crc64: u64,
    /// Comment text up to its NUL terminator, if the block has one
    pub comment: Option<String>,
    /// Byte order of the block
    pub endian: Endian,
}

impl SftHeader {
    /// Index of the first stored bin
    pub fn first_bin(&self) -> u32 {
        crate::bins::nearest_bin(self.f0, self.delta_f)
    }

    /// Index of the last stored bin
    pub fn last_bin(&self) -> u32 {
        self.first_bin() + self.num_bins - 1
    }

    /// Size of the sample payload that follows the header and comment
    pub fn data_len(&self) -> u64 {
        u64::from(self.num_bins) * BYTES_PER_BIN
    }

    /// Whether samples need swapping on this host
    pub fn needs_byte_swap(&self) -> bool {
        let native = if cfg!(target_endian = "little") {
            Endian::Little
        } else {
            Endian::Big
        };
        self.endian != native
    }
}

/// Run `f`, putting the stream back where it started if `f` fails.
pub(crate) fn restore_on_error<R, T>(
    reader: &mut R,
    f: impl FnOnce(&mut R) -> Result<T>,
) -> Result<T>
where
    R: Seek,
{
    let start = reader.stream_position()?;
    let result = f(reader);
    if result.is_err()
        && let Err(e) = reader.seek(SeekFrom::Start(start))
    {
        warn!("Failed to restore stream position {start}: {e}");
    }
    result
}

/// Peek at the version tag and its byte order.
///
/// The stream position is unchanged on return, success or not.
pub fn detect_version<R: Read + Seek>(reader: &mut R) -> Result<(u32, Endian)> {
    let start = reader.stream_position()?;
    let mut tag = [0u8; 8];
    let read = reader.read_exact(&mut tag);
    reader.seek(SeekFrom::Start(start))?;
    read?;

    for version in (MIN_VERSION..=MAX_VERSION).rev() {
        let expected = f64::from(version);
        if f64::from_le_bytes(tag) == expected {
            return Ok((version, Endian::Little));
        }
        if f64::from_be_bytes(tag) == expected {
            return Ok((version, Endian::Big));
        }
    }

    Err(SftError::BadVersion {
        tag,
        min: MIN_VERSION,
        max: MAX_VERSION,
    })
}

/// Header plus the checksum accumulated over header and comment bytes
pub(crate) struct HeaderRead {
    pub header: SftHeader,
    pub running_crc: u64,
}

/// Read and validate one block header, leaving the stream at the first sample.
///
/// On failure the stream is restored to where it was.
pub fn read_header<R: Read + Seek>(reader: &mut R) -> Result<SftHeader> {
    Ok(read_header_with_crc(reader)?.header)
}

pub(crate) fn read_header_with_crc<R: Read + Seek>(reader: &mut R) -> Result<HeaderRead> {
    restore_on_error(reader, |reader| {
        let (version, endian) = detect_version(reader)?;
        match version {
            2 => read_v2_header(reader, endian),
            other => Err(SftError::CorruptHeader(format!(
                "unsupported SFT version {other}"
            ))),
        }
    })
}

fn read_v2_header<R: Read>(reader: &mut R, endian: Endian) -> Result<HeaderRead> {
    let mut bytes = [0u8; HEADER_SIZE];
    reader.read_exact(&mut bytes)?;

    // Checksum is over the stored bytes with the crc field zeroed
    let mut zeroed = bytes;
    zeroed[CRC_OFFSET..CRC_OFFSET + 8].fill(0);
    let mut running_crc = crc64(&zeroed, CRC64_INIT);

    let raw = RawHeaderV2::from_bytes(&bytes, endian)?;

    if raw.version != 2.0 {
        return Err(corrupt(format!("wrong version {} in v2 header", raw.version)));
    }
    if raw.nsamples <= 0 {
        return Err(corrupt(format!(
            "non-positive number of samples {}",
            raw.nsamples
        )));
    }
    if raw.comment_length < 0 {
        return Err(corrupt(format!(
            "negative comment length {}",
            raw.comment_length
        )));
    }
    if raw.comment_length % 8 != 0 {
        return Err(corrupt(format!(
            "comment length {} is not a multiple of 8",
            raw.comment_length
        )));
    }
    let detector = Detector::from_bytes(raw.detector).map_err(|_| {
        corrupt(format!(
            "illegal detector name '{}'",
            String::from_utf8_lossy(&raw.detector)
        ))
    })?;

    let comment = if raw.comment_length > 0 {
        let mut comment = vec![0u8; raw.comment_length as usize];
        reader.read_exact(&mut comment)?;
        let text = validate_comment(&comment)?;

        // Only the string, its terminator and minimal padding are summed
        let len = text.len() + 1;
        let pad_len = (8 - len % 8) % 8;
        running_crc = crc64(&comment[..len], running_crc);
        running_crc = crc64(&[0u8; 7][..pad_len], running_crc);
        Some(String::from_utf8_lossy(text).into_owned())
    } else {
        None
    };

    let epoch = GpsTime::new(raw.gps_sec, raw.gps_nsec);
    if epoch.seconds < 0 || !epoch.is_normalized() {
        return Err(corrupt(format!("invalid GPS epoch {epoch}")));
    }
    let delta_f = 1.0 / raw.tbase;
    if delta_f.is_nan() || delta_f <= 0.0 {
        return Err(corrupt(format!("non-positive frequency spacing {delta_f}")));
    }
    let f0 = f64::from(raw.first_frequency_index) / raw.tbase;
    if f0 < 0.0 {
        return Err(corrupt(format!("negative start frequency {f0}")));
    }

    debug!(
        "Read v2 header: {} at {}, f0={}, df={}, {} bins",
        detector, epoch, f0, delta_f, raw.nsamples
    );

    Ok(HeaderRead {
        header: SftHeader {
            detector,
            epoch,
            f0,
            delta_f,
            version: 2,
            num_bins: raw.nsamples as u32,
            crc64: raw.crc64,
            comment,
            endian,
        },
        running_crc,
    })
}

/// Comment must end in NUL with nothing but NUL after the first one.
/// Returns the text before the terminator.
fn validate_comment(comment: &[u8]) -> Result<&[u8]> {
    if comment.last() != Some(&0) {
        return Err(corrupt("comment is not NUL terminated".to_string()));
    }
    let end = comment.iter().position(|&b| b == 0).unwrap_or(comment.len());
    if comment[end..].iter().any(|&b| b != 0) {
        return Err(corrupt("non-NUL bytes after end of comment".to_string()));
    }
    Ok(&comment[..end])
}

fn corrupt(message: String) -> SftError {
    SftError::CorruptHeader(message)
}

/// Recompute the checksum of the block at the current position and compare it
/// with the stored value.
///
/// A structurally invalid header or a short data section yields `Ok(false)`.
/// Only failures to read the version tag or to seek are returned as errors.
pub fn has_valid_crc64<R: Read + Seek>(reader: &mut R) -> Result<bool> {
    let (version, _) = detect_version(reader)?;
    if version != 2 {
        return Err(SftError::CorruptHeader(format!(
            "checksum requested for version {version} block"
        )));
    }

    let HeaderRead {
        header,
        mut running_crc,
    } = match read_header_with_crc(reader) {
        Ok(read) => read,
        Err(e) => {
            debug!("Header unreadable during checksum pass: {e}");
            return Ok(false);
        }
    };

    let mut remaining = header.data_len();
    let mut chunk = vec![0u8; DATA_CHUNK];
    while remaining > 0 {
        let len = remaining.min(DATA_CHUNK as u64) as usize;
        if let Err(e) = reader.read_exact(&mut chunk[..len]) {
            debug!("Short data section during checksum pass: {e}");
            return Ok(false);
        }
        running_crc = crc64(&chunk[..len], running_crc);
        remaining -= len as u64;
    }

    Ok(running_crc == header.crc64)
}

#[cfg(test)]
#[allow(clippy::expect_used, clippy::unwrap_used)]
mod tests {
    use super::*;
    use crate::sft::{SftWriter, write_sft};
    use crate::test_utils::{sample_sft, sft_bytes};
    use pretty_assertions::assert_eq;

    fn raw_header() -> RawHeaderV2 {
        RawHeaderV2 {
            version: 2.0,
            gps_sec: 700_000_000,
            gps_nsec: 0,
            tbase: 1800.0,
            first_frequency_index: 90_000,
            nsamples: 4,
            crc64: 0,
            detector: *b"H1",
            padding: [0, 0],
            comment_length: 0,
        }
    }

    fn header_only(raw: &RawHeaderV2, endian: Endian) -> Cursor<Vec<u8>> {
        let mut bytes = raw.to_bytes(endian).unwrap().to_vec();
        bytes.extend_from_slice(&[0u8; 32]);
        Cursor::new(bytes)
    }

    #[test]
    fn test_raw_header_layout() {
        let bytes = raw_header().to_bytes(Endian::Little).unwrap();
        assert_eq!(&bytes[0..8], &2.0f64.to_le_bytes());
        assert_eq!(&bytes[8..12], &700_000_000i32.to_le_bytes());
        assert_eq!(&bytes[40..42], b"H1");
        assert_eq!(&bytes[44..48], &0i32.to_le_bytes());

        let back = RawHeaderV2::from_bytes(&bytes, Endian::Little).unwrap();
        assert_eq!(back, raw_header());
    }

    #[test]
    fn test_detect_version_both_orders() {
        let mut le = header_only(&raw_header(), Endian::Little);
        assert_eq!(detect_version(&mut le).unwrap(), (2, Endian::Little));
        assert_eq!(le.position(), 0);

        let mut be = header_only(&raw_header(), Endian::Big);
        assert_eq!(detect_version(&mut be).unwrap(), (2, Endian::Big));
    }

    #[test]
    fn test_bad_version_restores_position() {
        let mut raw = raw_header();
        raw.version = 1.0;
        let mut cursor = header_only(&raw, Endian::Little);
        cursor.set_position(0);
        let err = read_header(&mut cursor).unwrap_err();
        assert!(matches!(err, SftError::BadVersion { .. }));
        assert_eq!(cursor.position(), 0);
    }

    #[test]
    fn test_header_fields_decoded() {
        let mut cursor = header_only(&raw_header(), Endian::Big);
        let header = read_header(&mut cursor).unwrap();
        assert_eq!(header.detector.as_str(), "H1");
        assert_eq!(header.epoch, GpsTime::new(700_000_000, 0));
        assert_eq!(header.first_bin(), 90_000);
        assert_eq!(header.last_bin(), 90_003);
        assert_eq!(header.num_bins, 4);
        assert_eq!(header.endian, Endian::Big);
        assert_eq!(header.comment, None);
        assert_eq!(cursor.position(), HEADER_SIZE as u64);
    }

    #[test]
    fn test_structural_violations_are_corrupt() {
        let cases: Vec<Box<dyn Fn(&mut RawHeaderV2)>> = vec![
            Box::new(|h| h.nsamples = 0),
            Box::new(|h| h.comment_length = -8),
            Box::new(|h| h.comment_length = 5),
            Box::new(|h| h.detector = *b"Q9"),
            Box::new(|h| h.gps_nsec = 1_000_000_000),
            Box::new(|h| h.gps_sec = -1),
            Box::new(|h| h.tbase = -1800.0),
            Box::new(|h| h.first_frequency_index = -5),
        ];
        for mutate in cases {
            let mut raw = raw_header();
            mutate(&mut raw);
            let mut cursor = header_only(&raw, Endian::Little);
            let err = read_header(&mut cursor).unwrap_err();
            assert!(
                matches!(err, SftError::CorruptHeader(_)),
                "unexpected error {err:?} for {raw:?}"
            );
            assert_eq!(cursor.position(), 0);
        }
    }

    #[test]
    fn test_comment_rules() {
        let base = |comment: &[u8]| {
            let mut raw = raw_header();
            raw.comment_length = comment.len() as i32;
            let mut bytes = raw.to_bytes(Endian::Little).unwrap().to_vec();
            bytes.extend_from_slice(comment);
            bytes.extend_from_slice(&[0u8; 32]);
            Cursor::new(bytes)
        };

        let header = read_header(&mut base(b"H1; ok\0\0")).unwrap();
        assert_eq!(header.comment.as_deref(), Some("H1; ok"));

        assert!(read_header(&mut base(b"H1; bad!")).is_err());
        assert!(read_header(&mut base(b"H1\0x\0\0\0\0")).is_err());
    }

    #[test]
    fn test_written_block_has_valid_crc() {
        let sft = sample_sft("L1", 800_000_000, 100.0, 0.5, 12);
        let bytes = sft_bytes(&sft, Some("unit test"));
        let mut cursor = Cursor::new(bytes);
        assert!(has_valid_crc64(&mut cursor).unwrap());
    }

    #[test]
    fn test_big_endian_block_has_valid_crc() {
        let sft = sample_sft("V1", 900_000_000, 10.0, 0.125, 7);
        let mut cursor = Cursor::new(Vec::new());
        SftWriter::new()
            .with_endian(Endian::Big)
            .write(&sft, &mut cursor, Some("swapped"))
            .unwrap();
        cursor.set_position(0);
        assert!(has_valid_crc64(&mut cursor).unwrap());
    }

    #[test]
    fn test_corrupted_data_fails_crc() {
        let sft = sample_sft("H1", 800_000_000, 100.0, 0.5, 12);
        let mut cursor = Cursor::new(Vec::new());
        write_sft(&sft, &mut cursor, None).unwrap();
        let mut bytes = cursor.into_inner();
        let last = bytes.len() - 3;
        bytes[last] ^= 0x40;
        assert!(!has_valid_crc64(&mut Cursor::new(bytes)).unwrap());
    }

    #[test]
    fn test_truncated_data_fails_crc() {
        let sft = sample_sft("H1", 800_000_000, 100.0, 0.5, 12);
        let mut bytes = sft_bytes(&sft, None);
        bytes.truncate(bytes.len() - 8);
        assert!(!has_valid_crc64(&mut Cursor::new(bytes)).unwrap());
    }
}
