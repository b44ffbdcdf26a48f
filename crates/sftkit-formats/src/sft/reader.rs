//! Partial reads of SFT sample data

use crate::error::{Result, SftError};
use crate::sft::header::{SftHeader, read_header};
use crate::sft::{BYTES_PER_BIN, Complex32, Sft};
use binrw::{BinRead, Endian};
use std::io::{Cursor, Read, Seek, SeekFrom};

/// Outcome of [`read_bins`]
#[derive(Debug, Clone, PartialEq)]
pub struct BinsRead {
    /// Header of the block that was read
    pub header: SftHeader,
    /// `(first, last)` bins copied into the buffer, `None` when the block
    /// holds none of the requested bins
    pub range: Option<(u32, u32)>,
}

impl BinsRead {
    /// Number of bins copied
    pub fn num_bins(&self) -> usize {
        self.range
            .map_or(0, |(first, last)| (last - first + 1) as usize)
    }

    /// Frequency of the first copied bin
    pub fn f0(&self) -> Option<f64> {
        self.range
            .map(|(first, _)| f64::from(first) * self.header.delta_f)
    }
}

/// Read bins `[first, last]` of the block at the current stream position into
/// `buf`.
///
/// The request is clamped to the bins the block actually holds. An empty
/// intersection is not an error: `range` is `None` and the stream is left
/// just past the header. Samples are converted to native byte order.
pub fn read_bins<R: Read + Seek>(
    reader: &mut R,
    first: u32,
    last: u32,
    buf: &mut [Complex32],
) -> Result<BinsRead> {
    if first > last {
        return Err(SftError::InvalidRange { first, last });
    }

    let header = read_header(reader)?;
    let block_first = header.first_bin();
    let block_last = header.last_bin();

    let first = first.max(block_first);
    let last = last.min(block_last);
    if first > last {
        return Ok(BinsRead {
            header,
            range: None,
        });
    }

    let count = (last - first + 1) as usize;
    if buf.len() < count {
        return Err(SftError::BufferTooSmall {
            needed: count,
            available: buf.len(),
        });
    }

    let offset = u64::from(first - block_first) * BYTES_PER_BIN;
    reader.seek(SeekFrom::Current(offset as i64))?;

    let mut raw = vec![0u8; count * BYTES_PER_BIN as usize];
    reader.read_exact(&mut raw)?;
    decode_samples(&raw, header.endian, &mut buf[..count])?;

    Ok(BinsRead {
        header,
        range: Some((first, last)),
    })
}

/// Decode packed `(re, im)` pairs in the given byte order.
pub(crate) fn decode_samples(raw: &[u8], endian: Endian, out: &mut [Complex32]) -> Result<()> {
    let mut cursor = Cursor::new(raw);
    for sample in out.iter_mut() {
        *sample = Complex32::read_options(&mut cursor, endian, ())?;
    }
    Ok(())
}

/// Read the complete block at the current position.
pub fn read_sft<R: Read + Seek>(reader: &mut R) -> Result<Sft> {
    let header = read_header(reader)?;
    let mut data = vec![Complex32::default(); header.num_bins as usize];
    let mut raw = vec![0u8; header.data_len() as usize];
    reader.read_exact(&mut raw)?;
    decode_samples(&raw, header.endian, &mut data)?;

    Ok(Sft {
        detector: header.detector,
        epoch: header.epoch,
        f0: header.f0,
        delta_f: header.delta_f,
        data,
    })
}

#[cfg(test)]
#[allow(clippy::expect_used, clippy::unwrap_used)]
mod tests {
    use super::*;
    use crate::sft::SftWriter;
    use crate::test_utils::{sample_sft, sft_bytes};
    use pretty_assertions::assert_eq;

    // Bins 100..=109 at df = 0.5
    fn block(endian: Endian) -> Cursor<Vec<u8>> {
        let sft = sample_sft("H1", 700_000_000, 50.0, 0.5, 10);
        let mut cursor = Cursor::new(Vec::new());
        SftWriter::new()
            .with_endian(endian)
            .write(&sft, &mut cursor, None)
            .unwrap();
        cursor.set_position(0);
        cursor
    }

    #[test]
    fn test_read_inner_window() {
        let expected = sample_sft("H1", 700_000_000, 50.0, 0.5, 10);
        let mut buf = vec![Complex32::default(); 10];
        let read = read_bins(&mut block(Endian::Little), 103, 105, &mut buf).unwrap();

        assert_eq!(read.range, Some((103, 105)));
        assert_eq!(read.num_bins(), 3);
        assert_eq!(read.f0(), Some(51.5));
        assert_eq!(&buf[..3], &expected.data[3..6]);
    }

    #[test]
    fn test_window_is_clamped() {
        let expected = sample_sft("H1", 700_000_000, 50.0, 0.5, 10);
        let mut buf = vec![Complex32::default(); 20];
        let read = read_bins(&mut block(Endian::Big), 90, 200, &mut buf).unwrap();
        assert_eq!(read.range, Some((100, 109)));
        assert_eq!(&buf[..10], expected.data.as_slice());
    }

    #[test]
    fn test_disjoint_window_reads_nothing() {
        let mut buf = vec![Complex32::default(); 4];
        let read = read_bins(&mut block(Endian::Little), 200, 203, &mut buf).unwrap();
        assert_eq!(read.range, None);
        assert_eq!(read.num_bins(), 0);
        assert_eq!(read.f0(), None);
    }

    #[test]
    fn test_inverted_window_rejected() {
        let mut buf = vec![Complex32::default(); 4];
        let err = read_bins(&mut block(Endian::Little), 105, 104, &mut buf).unwrap_err();
        assert!(matches!(err, SftError::InvalidRange { first: 105, last: 104 }));
    }

    #[test]
    fn test_small_buffer_rejected() {
        let mut buf = vec![Complex32::default(); 2];
        let err = read_bins(&mut block(Endian::Little), 100, 105, &mut buf).unwrap_err();
        assert!(matches!(
            err,
            SftError::BufferTooSmall {
                needed: 6,
                available: 2
            }
        ));
    }

    #[test]
    fn test_truncated_payload_is_io_error() {
        let sft = sample_sft("H1", 700_000_000, 50.0, 0.5, 10);
        let mut bytes = sft_bytes(&sft, None);
        bytes.truncate(bytes.len() - 4);
        let mut buf = vec![Complex32::default(); 10];
        let err = read_bins(&mut Cursor::new(bytes), 100, 109, &mut buf).unwrap_err();
        assert!(matches!(err, SftError::Io(_)));
    }

    #[test]
    fn test_read_whole_block_both_orders() {
        let expected = sample_sft("H1", 700_000_000, 50.0, 0.5, 10);
        assert_eq!(read_sft(&mut block(Endian::Little)).unwrap(), expected);
        assert_eq!(read_sft(&mut block(Endian::Big)).unwrap(), expected);
    }
}
