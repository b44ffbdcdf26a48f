//! Rome-format Short Fourier DataBase (SFDB) blocks
//!
//! An SFDB file is a sequence of blocks:
//!
//! ```text
//! +---------------------+
//! | count (f64)         |
//! +---------------------+
//! | header (200 B)      |  see [`SfdbHeader`]
//! +---------------------+
//! | averaged spectrum   |  lavesp f32 (or red f32 when lavesp <= 0)
//! +---------------------+
//! | short power spectrum|  lavesp f32 (or nsamples / red f32)
//! +---------------------+
//! | data                |  nsamples x (f32 re, f32 im)
//! +---------------------+
//! ```
//!
//! Everything is little-endian. Only the complex data is needed to build SFTs;
//! the spectra are kept so blocks can be written back unchanged.

mod header;

pub use header::{
    SFDB_DETECTORS, SFDB_HEADER_SIZE, SfdbHeader, sfdb_detector, sfdb_detector_in_name,
};

use crate::SftFormat;
use crate::error::{Result, SftError};
use crate::gps::GpsTime;
use crate::sft::{Complex32, Sft};
use binrw::{BinRead, BinWrite, Endian};
use std::io::{Cursor, Read, Write};
use tracing::warn;

/// One SFDB block with its payload
#[derive(Debug, Clone, PartialEq)]
pub struct SfdbBlock {
    /// Running block counter stored in front of the header
    pub count: f64,
    /// Fixed header
    pub header: SfdbHeader,
    /// Averaged spectrum
    pub averaged_spectrum: Vec<f32>,
    /// Short power spectrum
    pub short_spectrum: Vec<f32>,
    /// Interleaved `(re, im)` values, two per bin
    pub data: Vec<f32>,
}

impl SfdbBlock {
    /// Read the next block, or `None` at end of stream.
    ///
    /// A stream ending inside the count field is treated as the end with a
    /// warning. A stream ending anywhere later is an error.
    pub fn read_from<R: Read>(reader: &mut R) -> Result<Option<Self>> {
        let mut count = [0u8; 8];
        let mut filled = 0;
        while filled < count.len() {
            match reader.read(&mut count[filled..])? {
                0 => break,
                n => filled += n,
            }
        }
        if filled == 0 {
            return Ok(None);
        }
        if filled < count.len() {
            warn!("Ignoring {filled} trailing bytes after last SFDB block");
            return Ok(None);
        }

        let mut header_bytes = [0u8; header::SFDB_HEADER_SIZE];
        reader.read_exact(&mut header_bytes)?;
        let header = SfdbHeader::read(&mut Cursor::new(&header_bytes[..]))?;

        let (averaged, short, data) = header.payload_lengths()?;
        Ok(Some(Self {
            count: f64::from_le_bytes(count),
            header,
            averaged_spectrum: read_f32s(reader, averaged)?,
            short_spectrum: read_f32s(reader, short)?,
            data: read_f32s(reader, data)?,
        }))
    }

    /// Write this block.
    pub fn write_to<W: Write>(&self, writer: &mut W) -> Result<()> {
        let (averaged, short, data) = self.header.payload_lengths()?;
        if self.averaged_spectrum.len() != averaged
            || self.short_spectrum.len() != short
            || self.data.len() != data
        {
            return Err(SftError::Sfdb(format!(
                "payload sizes ({}, {}, {}) do not match header ({averaged}, {short}, {data})",
                self.averaged_spectrum.len(),
                self.short_spectrum.len(),
                self.data.len()
            )));
        }

        let mut out = Cursor::new(Vec::new());
        self.count.write_options(&mut out, Endian::Little, ())?;
        self.header.write(&mut out)?;
        self.averaged_spectrum
            .write_options(&mut out, Endian::Little, ())?;
        self.short_spectrum.write_options(&mut out, Endian::Little, ())?;
        self.data.write_options(&mut out, Endian::Little, ())?;
        writer.write_all(&out.into_inner())?;
        Ok(())
    }

    /// Number of frequency bins in the block
    pub fn num_bins(&self) -> usize {
        self.data.len() / 2
    }

    /// Normalized samples for bins `first..first + count`.
    pub fn samples(&self, first: usize, count: usize) -> Result<Vec<Complex32>> {
        if first + count > self.num_bins() {
            return Err(SftError::Sfdb(format!(
                "bins {first}..{} outside the {} stored bins",
                first + count,
                self.num_bins()
            )));
        }
        let norm = self.header.normalization();
        Ok(self.data[2 * first..2 * (first + count)]
            .chunks_exact(2)
            .map(|pair| Complex32::new(pair[0], pair[1]).scale(norm))
            .collect())
    }

    /// Convert bins `first..first + count` into an SFT starting at `f0`.
    ///
    /// The epoch keeps whole seconds only.
    pub fn to_sft(&self, first: usize, count: usize, f0: f64) -> Result<Sft> {
        Ok(Sft {
            detector: self.header.detector()?,
            epoch: GpsTime::from_seconds(self.header.gps_sec),
            f0,
            delta_f: self.header.deltanu,
            data: self.samples(first, count)?,
        })
    }
}

impl SftFormat for SfdbBlock {
    fn parse(data: &[u8]) -> Result<Self> {
        Self::read_from(&mut Cursor::new(data))?
            .ok_or_else(|| SftError::Sfdb("empty input".to_string()))
    }

    fn build(&self) -> Result<Vec<u8>> {
        let mut out = Vec::new();
        self.write_to(&mut out)?;
        Ok(out)
    }
}

fn read_f32s<R: Read>(reader: &mut R, count: usize) -> Result<Vec<f32>> {
    let mut raw = vec![0u8; count * 4];
    reader.read_exact(&mut raw)?;
    Ok(raw
        .chunks_exact(4)
        .map(|b| f32::from_le_bytes([b[0], b[1], b[2], b[3]]))
        .collect())
}

/// Science-mode intervals of one detector, as paired start/end lists
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ScienceSegments {
    starts: Vec<GpsTime>,
    ends: Vec<GpsTime>,
}

impl ScienceSegments {
    /// Pair up start and end times. Both lists must have the same length.
    pub fn new(starts: Vec<GpsTime>, ends: Vec<GpsTime>) -> Result<Self> {
        if starts.len() != ends.len() {
            return Err(SftError::InvalidArgument(format!(
                "got {} starting and {} finishing timestamps, lengths must be equal",
                starts.len(),
                ends.len()
            )));
        }
        Ok(Self { starts, ends })
    }

    /// Number of intervals
    pub fn len(&self) -> usize {
        self.starts.len()
    }

    /// Whether there are no intervals
    pub fn is_empty(&self) -> bool {
        self.starts.is_empty()
    }

    /// Whether a block starting at `gps_sec` and lasting `tbase` seconds ends
    /// inside an interval that started at or before it.
    ///
    /// Intervals are scanned in order while their start is not after the
    /// block start. Only whole seconds are compared.
    pub fn contains(&self, gps_sec: i32, tbase: f64) -> bool {
        let block_end = f64::from(gps_sec) + tbase;
        self.starts
            .iter()
            .zip(&self.ends)
            .take_while(|(start, _)| gps_sec >= start.seconds)
            .any(|(_, end)| block_end < f64::from(end.seconds))
    }
}

#[cfg(test)]
pub(crate) fn test_header(det: i32, gps_sec: i32, nsamples: i32) -> SfdbHeader {
    SfdbHeader {
        det,
        gps_sec,
        gps_nsec: 0,
        tbase: 1024.0,
        firstfrind: 0,
        nsamples,
        red: 2,
        typ: 0,
        n_flag: 0.0,
        einstein: 2.0,
        mjdtime: 0.0,
        nfft: 1,
        wink: 0,
        normd: 1.0,
        normw: 0.5,
        frinit: 0.0,
        tsamplu: 4.0,
        deltanu: 1.0 / 1024.0,
        velocity: [0.0; 3],
        position: [0.0; 3],
        n_zeroes: 0,
        sat_howmany: 0.0,
        spare_f64: [0.0; 3],
        spare_f32: [0.0; 3],
        lavesp: 0,
        spare_i32: [0; 2],
    }
}

/// Block whose data value `k` equals `k`, with normalization 4.
#[cfg(test)]
pub(crate) fn test_block(det: i32, gps_sec: i32, nsamples: i32) -> SfdbBlock {
    let header = test_header(det, gps_sec, nsamples);
    let (averaged, short, data) = header.payload_lengths().expect("valid test header");
    SfdbBlock {
        count: 1.0,
        header,
        averaged_spectrum: vec![1.0; averaged],
        short_spectrum: vec![2.0; short],
        data: (0..data).map(|k| k as f32).collect(),
    }
}

#[cfg(test)]
#[allow(clippy::expect_used, clippy::unwrap_used)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn test_block_layout() {
        let block = test_block(2, 1000, 4);
        let bytes = block.build().unwrap();
        // count + header + red + nsamples/red + 2 * nsamples
        assert_eq!(bytes.len(), 8 + SFDB_HEADER_SIZE + 4 * (2 + 2 + 8));
        assert_eq!(SfdbBlock::parse(&bytes).unwrap(), block);
    }

    #[test]
    fn test_reads_consecutive_blocks() {
        let mut bytes = test_block(1, 10, 4).build().unwrap();
        bytes.extend(test_block(3, 20, 6).build().unwrap());

        let mut cursor = Cursor::new(bytes);
        let first = SfdbBlock::read_from(&mut cursor).unwrap().unwrap();
        let second = SfdbBlock::read_from(&mut cursor).unwrap().unwrap();
        assert_eq!(first.header.gps_sec, 10);
        assert_eq!(second.header.detector().unwrap().as_str(), "L1");
        assert!(SfdbBlock::read_from(&mut cursor).unwrap().is_none());
    }

    #[test]
    fn test_truncated_block_is_error() {
        let mut bytes = test_block(1, 10, 4).build().unwrap();
        bytes.truncate(bytes.len() - 1);
        assert!(SfdbBlock::read_from(&mut Cursor::new(bytes)).is_err());
    }

    #[test]
    fn test_samples_are_normalized() {
        let block = test_block(2, 1000, 4);
        // einstein 2 * tsamplu 4 * normw 0.5
        assert_eq!(block.header.normalization(), 4.0);
        assert_eq!(
            block.samples(1, 2).unwrap(),
            [Complex32::new(8.0, 12.0), Complex32::new(16.0, 20.0)]
        );
        assert!(block.samples(3, 2).is_err());

        let sft = block.to_sft(0, 4, 0.0).unwrap();
        assert_eq!(sft.detector.as_str(), "H1");
        assert_eq!(sft.epoch, GpsTime::from_seconds(1000));
        assert_eq!(sft.delta_f, 1.0 / 1024.0);
        assert_eq!(sft.data.len(), 4);
    }

    #[test]
    fn test_mismatched_payload_not_written() {
        let mut block = test_block(2, 1000, 4);
        block.data.pop();
        assert!(block.build().is_err());
    }

    #[test]
    fn test_science_segments() {
        let segments = ScienceSegments::new(
            vec![GpsTime::from_seconds(1000), GpsTime::from_seconds(5000)],
            vec![GpsTime::from_seconds(3000), GpsTime::from_seconds(9000)],
        )
        .unwrap();

        assert!(segments.contains(1000, 1024.0));
        assert!(segments.contains(5500, 1024.0));
        // Ends past the first interval
        assert!(!segments.contains(2500, 1024.0));
        // Starts before any interval
        assert!(!segments.contains(500, 100.0));
        // Past the last interval, no out-of-bounds scan
        assert!(!segments.contains(9500, 10.0));

        assert!(ScienceSegments::new(vec![GpsTime::from_seconds(1)], vec![]).is_err());
    }
}
