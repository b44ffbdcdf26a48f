//! `sftkit load`

use crate::OutputFormat;
use crate::commands::VectorSummary;
use anyhow::Result;
use sftkit_catalog::CatalogConfig;
use std::io::Write;

/// Load the configured band and summarize each detector.
pub fn handle<W: Write>(config: &CatalogConfig, format: OutputFormat, out: &mut W) -> Result<()> {
    let vectors = config.load()?;
    let summaries: Vec<VectorSummary> = vectors
        .iter()
        .filter_map(|(detector, sfts)| VectorSummary::new(detector.as_str(), sfts))
        .collect();

    match format {
        OutputFormat::Text => {
            for s in &summaries {
                writeln!(
                    out,
                    "{}: {} SFTs, f0={} df={} bins={}, epochs {} to {}",
                    s.detector, s.num_sfts, s.f0, s.delta_f, s.num_bins, s.first_epoch, s.last_epoch
                )?;
            }
        }
        OutputFormat::Json | OutputFormat::JsonPretty => {
            writeln!(out, "{}", format.to_json(&summaries)?)?;
        }
    }
    Ok(())
}
