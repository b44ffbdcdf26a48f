//! `sftkit merge`

use crate::OutputFormat;
use anyhow::{Context, Result};
use sftkit_catalog::{CatalogConfig, write_vector_to_named_file};
use sftkit_formats::MultiSftVector;
use std::io::Write;
use std::path::{Path, PathBuf};
use tracing::info;

/// Load the configured band and write one merged file per detector into
/// `out_dir`.
pub fn handle<W: Write>(
    config: &CatalogConfig,
    out_dir: &Path,
    comment: Option<&str>,
    misc: Option<&str>,
    format: OutputFormat,
    out: &mut W,
) -> Result<()> {
    let vectors = config.load()?;
    let written = write_merged(&vectors, out_dir, comment, misc)?;
    report_paths(&written, format, out)
}

/// Write each detector's vector as one officially named merged file.
pub(crate) fn write_merged(
    vectors: &MultiSftVector,
    out_dir: &Path,
    comment: Option<&str>,
    misc: Option<&str>,
) -> Result<Vec<PathBuf>> {
    std::fs::create_dir_all(out_dir)
        .with_context(|| format!("failed to create {}", out_dir.display()))?;

    let mut written = Vec::with_capacity(vectors.len());
    for (detector, sfts) in vectors.iter() {
        let path = write_vector_to_named_file(sfts, out_dir, comment, misc)
            .with_context(|| format!("failed to write merged file for {detector}"))?;
        info!("Wrote {} SFTs for {} to {}", sfts.len(), detector, path.display());
        written.push(path);
    }
    Ok(written)
}

pub(crate) fn report_paths<W: Write>(
    paths: &[PathBuf],
    format: OutputFormat,
    out: &mut W,
) -> Result<()> {
    match format {
        OutputFormat::Text => {
            for path in paths {
                writeln!(out, "{}", path.display())?;
            }
        }
        OutputFormat::Json | OutputFormat::JsonPretty => {
            let names: Vec<String> = paths.iter().map(|p| p.display().to_string()).collect();
            writeln!(out, "{}", format.to_json(&names)?)?;
        }
    }
    Ok(())
}
