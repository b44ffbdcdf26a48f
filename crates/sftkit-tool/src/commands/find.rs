//! `sftkit find`

use crate::OutputFormat;
use anyhow::Result;
use serde::Serialize;
use sftkit_catalog::{CatalogConfig, SftDescriptor};
use std::io::Write;

/// One catalog entry as reported
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct EntryRecord {
    /// File holding the block, empty for in-memory entries
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
    /// Stored comment
    #[serde(skip_serializing_if = "Option::is_none")]
    pub comment: Option<String>,
}

impl From<&SftDescriptor> for EntryRecord {
    fn from(entry: &SftDescriptor) -> Self {
        let (path, offset) = entry.locator().map_or((String::new(), 0), |locator| {
            (locator.path().display().to_string(), locator.offset())
        });
        Self {
            path,
            offset,
            detector: entry.detector().to_string(),
            epoch: entry.epoch().to_string(),
            f0: entry.header.f0,
            delta_f: entry.header.delta_f,
            num_bins: entry.num_bins(),
            comment: entry.comment().map(str::to_string),
        }
    }
}

/// Scan and list every kept block.
pub fn handle<W: Write>(config: &CatalogConfig, format: OutputFormat, out: &mut W) -> Result<()> {
    let catalog = config.find()?;
    let records: Vec<EntryRecord> = catalog.iter().map(EntryRecord::from).collect();

    match format {
        OutputFormat::Text => {
            for (entry, record) in catalog.iter().zip(&records) {
                writeln!(
                    out,
                    "{}  {}  {}  f0={} df={} bins={}",
                    entry, record.detector, record.epoch, record.f0, record.delta_f, record.num_bins
                )?;
            }
            writeln!(out, "{} SFTs", records.len())?;
        }
        OutputFormat::Json | OutputFormat::JsonPretty => {
            writeln!(out, "{}", format.to_json(&records)?)?;
        }
    }
    Ok(())
}
