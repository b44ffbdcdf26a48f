//! Encoding SFTs as v2 blocks

use crate::crc64::{CRC64_INIT, crc64};
use crate::error::{Result, SftError};
use crate::sft::header::{CRC_OFFSET, RawHeaderV2};
use crate::sft::{BYTES_PER_BIN, Sft};
use binrw::{BinWrite, Endian};
use std::io::{Cursor, Write};
use tracing::debug;

/// Block encoder
///
/// Blocks are written little-endian unless configured otherwise.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SftWriter {
    endian: Endian,
}

impl Default for SftWriter {
    fn default() -> Self {
        Self {
            endian: Endian::Little,
        }
    }
}

impl SftWriter {
    /// Little-endian writer.
    pub fn new() -> Self {
        Self::default()
    }

    /// Write blocks in the given byte order.
    #[must_use]
    pub const fn with_endian(mut self, endian: Endian) -> Self {
        self.endian = endian;
        self
    }

    /// Byte order used for new blocks
    pub const fn endian(&self) -> Endian {
        self.endian
    }

    /// Write one block: header, comment and samples.
    ///
    /// The stored comment is the detector code, followed by `"; "` and
    /// `comment` when given. The checksum is computed over exactly the bytes
    /// written, with the checksum field zeroed.
    pub fn write<W: Write>(&self, sft: &Sft, writer: &mut W, comment: Option<&str>) -> Result<()> {
        sft.validate()?;

        let comment = build_comment(sft, comment)?;
        let first_frequency_index = (sft.f0 / sft.delta_f).round();
        if first_frequency_index > f64::from(i32::MAX) {
            return Err(SftError::InvalidArgument(format!(
                "first bin {first_frequency_index} exceeds the format limit"
            )));
        }

        let mut raw = RawHeaderV2 {
            version: 2.0,
            gps_sec: sft.epoch.seconds,
            gps_nsec: sft.epoch.nanoseconds,
            tbase: sft.t_sft(),
            first_frequency_index: first_frequency_index as i32,
            nsamples: sft.data.len() as i32,
            crc64: 0,
            detector: sft.detector.as_bytes(),
            padding: [0, 0],
            comment_length: comment.len() as i32,
        };

        let mut data = Cursor::new(Vec::with_capacity(
            sft.data.len() * BYTES_PER_BIN as usize,
        ));
        sft.data.write_options(&mut data, self.endian, ())?;
        let data = data.into_inner();

        let header = raw.to_bytes(self.endian)?;
        debug_assert!(header[CRC_OFFSET..CRC_OFFSET + 8].iter().all(|&b| b == 0));
        let mut crc = crc64(&header, CRC64_INIT);
        crc = crc64(&comment, crc);
        crc = crc64(&data, crc);
        raw.crc64 = crc;

        writer.write_all(&raw.to_bytes(self.endian)?)?;
        writer.write_all(&comment)?;
        writer.write_all(&data)?;

        debug!(
            "Wrote {} block at {}: {} bins, crc64={:016x}",
            sft.detector,
            sft.epoch,
            sft.data.len(),
            crc
        );
        Ok(())
    }

    /// Write several blocks back to back into one stream.
    pub fn write_all<'a, W, I>(&self, sfts: I, writer: &mut W, comment: Option<&str>) -> Result<()>
    where
        W: Write,
        I: IntoIterator<Item = &'a Sft>,
    {
        for sft in sfts {
            self.write(sft, writer, comment)?;
        }
        Ok(())
    }
}

/// Write one little-endian block.
pub fn write_sft<W: Write>(sft: &Sft, writer: &mut W, comment: Option<&str>) -> Result<()> {
    SftWriter::new().write(sft, writer, comment)
}

/// Comment field as stored: text, NUL terminator, zero padding to a multiple
/// of 8 bytes.
pub fn build_comment(sft: &Sft, comment: Option<&str>) -> Result<Vec<u8>> {
    let mut text = sft.detector.to_string();
    if let Some(comment) = comment {
        if comment.contains('\0') {
            return Err(SftError::InvalidArgument(
                "comment must not contain NUL bytes".to_string(),
            ));
        }
        text.push_str("; ");
        text.push_str(comment);
    }

    let mut bytes = text.into_bytes();
    bytes.push(0);
    let pad_len = (8 - bytes.len() % 8) % 8;
    bytes.resize(bytes.len() + pad_len, 0);
    Ok(bytes)
}

#[cfg(test)]
#[allow(clippy::expect_used, clippy::unwrap_used)]
mod tests {
    use super::*;
    use crate::sft::header::{HEADER_SIZE, read_header};
    use crate::sft::read_sft;
    use crate::test_utils::sample_sft;
    use pretty_assertions::assert_eq;

    #[test]
    fn test_comment_layout() {
        let sft = sample_sft("H1", 1, 0.0, 1.0, 1);
        assert_eq!(build_comment(&sft, None).unwrap(), b"H1\0\0\0\0\0\0");
        assert_eq!(
            build_comment(&sft, Some("test")).unwrap(),
            b"H1; test\0\0\0\0\0\0\0\0"
        );
        assert!(build_comment(&sft, Some("a\0b")).is_err());
    }

    #[test]
    fn test_header_fields_written() {
        let sft = sample_sft("L1", 812_345_678, 100.25, 0.25, 3);
        let mut out = Vec::new();
        write_sft(&sft, &mut out, Some("made by test")).unwrap();

        let raw = RawHeaderV2::from_bytes(out[..HEADER_SIZE].try_into().unwrap(), Endian::Little)
            .unwrap();
        assert_eq!(raw.version, 2.0);
        assert_eq!(raw.gps_sec, 812_345_678);
        assert_eq!(raw.tbase, 4.0);
        assert_eq!(raw.first_frequency_index, 401);
        assert_eq!(raw.nsamples, 3);
        assert_eq!(&raw.detector, b"L1");
        assert_eq!(raw.comment_length, 24);
        assert_eq!(out.len(), HEADER_SIZE + 24 + 3 * 8);

        let header = read_header(&mut Cursor::new(&out)).unwrap();
        assert_eq!(header.comment.as_deref(), Some("L1; made by test"));
        assert_eq!(header.crc64, raw.crc64);
    }

    #[test]
    fn test_invalid_sft_rejected_before_writing() {
        let mut sft = sample_sft("H1", 1, 1.0, 1.0, 2);
        sft.delta_f = -1.0;
        let mut out = Vec::new();
        assert!(write_sft(&sft, &mut out, None).is_err());
        assert!(out.is_empty());
    }

    #[test]
    fn test_write_all_concatenates_blocks() {
        let sfts = vec![
            sample_sft("H1", 100, 5.0, 0.5, 4),
            sample_sft("H1", 200, 5.0, 0.5, 4),
        ];
        let mut out = Cursor::new(Vec::new());
        SftWriter::new().write_all(&sfts, &mut out, None).unwrap();
        out.set_position(0);

        assert_eq!(read_sft(&mut out).unwrap(), sfts[0]);
        assert_eq!(read_sft(&mut out).unwrap(), sfts[1]);
        assert_eq!(out.position(), out.get_ref().len() as u64);
    }

    #[test]
    fn test_endian_is_configurable() {
        let writer = SftWriter::new().with_endian(Endian::Big);
        assert_eq!(writer.endian(), Endian::Big);
        let sft = sample_sft("H1", 100, 5.0, 0.5, 1);
        let mut out = Vec::new();
        writer.write(&sft, &mut out, None).unwrap();
        assert_eq!(&out[..8], &2.0f64.to_be_bytes());
    }
}
