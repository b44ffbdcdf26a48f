//! `sftkit dump`

use crate::OutputFormat;
use anyhow::{Context, Result};
use serde::Serialize;
use sftkit_catalog::find_files;
use sftkit_formats::sft::{read_header, read_sft};
use std::fs::File;
use std::io::{BufReader, Seek, SeekFrom, Write};
use std::path::Path;

/// One block as dumped
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct BlockRecord {
    /// File holding the block
    pub path: String,
    /// Byte offset of the block
    pub offset: u64,
    /// Detector code
    pub detector: String,
    /// Epoch, `sec.nnnnnnnnn`
    pub epoch: String,
    /// Start frequency in Hz
    pub f0: f64,
    /// Frequency resolution in Hz
    pub delta_f: f64,
    /// Number of stored bins
    pub num_bins: u32,
    /// Stored checksum, hex
    pub crc64: String,
    /// `little` or `big`
    pub endian: String,
    /// Stored comment
    pub comment: Option<String>,
    /// Leading `(re, im)` samples
    pub samples: Vec<(f32, f32)>,
}

/// Print every block of every file matching `pattern`.
pub fn handle<W: Write>(pattern: &str, bins: usize, format: OutputFormat, out: &mut W) -> Result<()> {
    let mut records = Vec::new();
    for path in find_files(pattern)? {
        dump_file(&path, bins, &mut records)
            .with_context(|| format!("failed to dump {}", path.display()))?;
    }

    match format {
        OutputFormat::Text => {
            for record in &records {
                writeln!(out, "{} : {}", record.path, record.offset)?;
                writeln!(
                    out,
                    "  {} {} f0={} df={} bins={} crc64={} {}-endian",
                    record.detector,
                    record.epoch,
                    record.f0,
                    record.delta_f,
                    record.num_bins,
                    record.crc64,
                    record.endian
                )?;
                if let Some(comment) = &record.comment {
                    writeln!(out, "  comment: {comment}")?;
                }
                for (k, (re, im)) in record.samples.iter().enumerate() {
                    writeln!(out, "  [{k}] {re} {im}")?;
                }
            }
        }
        OutputFormat::Json | OutputFormat::JsonPretty => {
            writeln!(out, "{}", format.to_json(&records)?)?;
        }
    }
    Ok(())
}

fn dump_file(path: &Path, bins: usize, records: &mut Vec<BlockRecord>) -> Result<()> {
    let file = File::open(path)?;
    let len = file.metadata()?.len();
    let mut reader = BufReader::new(file);

    let mut offset = 0;
    while offset < len {
        let header = read_header(&mut reader)?;
        reader.seek(SeekFrom::Start(offset))?;
        let sft = read_sft(&mut reader)?;

        records.push(BlockRecord {
            path: path.display().to_string(),
            offset,
            detector: header.detector.to_string(),
            epoch: header.epoch.to_string(),
            f0: header.f0,
            delta_f: header.delta_f,
            num_bins: header.num_bins,
            crc64: format!("{:016x}", header.crc64),
            endian: format!("{:?}", header.endian).to_lowercase(),
            comment: header.comment,
            samples: sft.data.iter().take(bins).map(|c| (c.re, c.im)).collect(),
        });
        offset = reader.stream_position()?;
    }
    Ok(())
}
