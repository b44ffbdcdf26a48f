//! `sftkit sfdb`

use crate::OutputFormat;
use crate::commands::merge::{report_paths, write_merged};
use anyhow::Result;
use sftkit_catalog::read_sfdb;
use std::io::Write;
use std::path::Path;

/// Which SFDB files to read and which band to extract
#[derive(Debug, Clone, Copy)]
pub struct SfdbJob<'a> {
    /// SFDB file pattern
    pub pattern: &'a str,
    /// Lower band edge in Hz
    pub f_min: f64,
    /// Upper band edge in Hz
    pub f_max: f64,
    /// Science-mode start timestamps pattern
    pub science_starts: Option<&'a str>,
    /// Science-mode end timestamps pattern
    pub science_ends: Option<&'a str>,
}

/// Convert SFDB blocks to SFTs and write one merged file per detector.
pub fn handle<W: Write>(
    job: &SfdbJob<'_>,
    out_dir: &Path,
    misc: Option<&str>,
    format: OutputFormat,
    out: &mut W,
) -> Result<()> {
    let vectors = read_sfdb(
        job.f_min,
        job.f_max,
        job.pattern,
        job.science_starts,
        job.science_ends,
    )?;
    let written = write_merged(&vectors, out_dir, Some("converted from SFDB"), misc)?;
    report_paths(&written, format, out)
}
