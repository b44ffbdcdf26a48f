//! `sftkit validate`

use crate::OutputFormat;
use anyhow::Result;
use serde::Serialize;
use sftkit_catalog::{CatalogConfig, check_crc};
use std::io::Write;
use tracing::info;

#[derive(Serialize)]
struct Report {
    num_sfts: usize,
    valid: bool,
}

/// Scan, then recompute every checksum. Returns whether all matched.
pub fn handle<W: Write>(config: &CatalogConfig, format: OutputFormat, out: &mut W) -> Result<bool> {
    let catalog = config.clone().with_checksums(false).find()?;
    info!("Checking checksums of {} SFTs", catalog.len());
    let valid = check_crc(&catalog)?;

    match format {
        OutputFormat::Text => {
            let verdict = if valid { "OK" } else { "FAILED" };
            writeln!(out, "{verdict}: {} SFTs checked", catalog.len())?;
        }
        OutputFormat::Json | OutputFormat::JsonPretty => {
            let report = Report {
                num_sfts: catalog.len(),
                valid,
            };
            writeln!(out, "{}", format.to_json(&report)?)?;
        }
    }
    Ok(valid)
}
