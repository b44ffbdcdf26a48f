//! Command-line front end for sftkit
//!
//! The `sftkit` binary is a thin wrapper: it parses [`Cli`], sets up logging
//! and calls [`run`]. Commands write their report to the given writer so they
//! can be driven from tests.

#![warn(missing_docs)]
#![allow(clippy::uninlined_format_args)] // Backwards compatibility

pub mod commands;

use anyhow::{Context, Result};
use clap::{Args, Parser, Subcommand, ValueEnum};
use sftkit_catalog::CatalogConfig;
use sftkit_formats::{Detector, GpsTime};
use std::io::Write;
use std::path::PathBuf;

/// Find, validate, inspect and merge SFT files
#[derive(Debug, Parser)]
#[command(
    name = "sftkit",
    about = "Find, validate, inspect and merge SFT files",
    version
)]
pub struct Cli {
    /// JSON job configuration; command-line flags override its fields
    #[arg(short, long, global = true, env = "SFTKIT_CONFIG")]
    pub config: Option<PathBuf>,

    /// Report format
    #[arg(short = 'o', long, value_enum, global = true, default_value = "text")]
    pub format: OutputFormat,

    /// Shorthand for `--format json`
    #[arg(long, global = true)]
    pub json: bool,

    /// Log format on stderr
    #[arg(long, value_enum, global = true, env = "SFTKIT_LOG_FORMAT", default_value = "text")]
    pub log_format: LogFormat,

    /// Command to run
    #[command(subcommand)]
    pub command: Commands,
}

impl Cli {
    /// Report format after applying `--json`
    pub fn output_format(&self) -> OutputFormat {
        if self.json {
            OutputFormat::Json
        } else {
            self.format
        }
    }
}

/// Report format
#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum OutputFormat {
    /// Human-readable text
    Text,
    /// Compact JSON
    Json,
    /// Indented JSON
    JsonPretty,
}

impl OutputFormat {
    /// Serialize `value` for the JSON formats.
    pub fn to_json<T: serde::Serialize>(self, value: &T) -> Result<String> {
        Ok(match self {
            Self::JsonPretty => serde_json::to_string_pretty(value)?,
            Self::Json | Self::Text => serde_json::to_string(value)?,
        })
    }
}

/// Log format
#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum LogFormat {
    /// Plain text lines
    Text,
    /// One JSON object per event
    Json,
}

/// Available commands
#[derive(Debug, Subcommand)]
pub enum Commands {
    /// List the SFT blocks matching a pattern
    Find {
        /// Files to scan and what to keep
        #[command(flatten)]
        scan: ScanArgs,
    },

    /// Recompute the checksum of every block; exits non-zero on mismatch
    Validate {
        /// Files to scan and what to keep
        #[command(flatten)]
        scan: ScanArgs,
    },

    /// Print block headers and the first samples of each block
    Dump {
        /// File pattern
        pattern: String,

        /// Samples to print per block
        #[arg(long, default_value_t = 4)]
        bins: usize,
    },

    /// Load a frequency band and summarize it per detector
    Load {
        /// Files to scan and what to keep
        #[command(flatten)]
        scan: ScanArgs,

        /// Frequency band
        #[command(flatten)]
        band: BandArgs,
    },

    /// Load a band and write one merged file per detector
    Merge {
        /// Files to scan and what to keep
        #[command(flatten)]
        scan: ScanArgs,

        /// Frequency band
        #[command(flatten)]
        band: BandArgs,

        /// Output directory
        #[arg(long, short = 'd')]
        out_dir: PathBuf,

        /// Comment stored in every block
        #[arg(long)]
        comment: Option<String>,

        /// Description tag added to the file names
        #[arg(long)]
        misc: Option<String>,
    },

    /// Convert Rome SFDB files into merged SFT files
    Sfdb {
        /// SFDB file pattern
        pattern: String,

        /// Lower band edge in Hz
        #[arg(long)]
        f_min: f64,

        /// Upper band edge in Hz
        #[arg(long)]
        f_max: f64,

        /// Pattern for science-mode start timestamps files, one per detector
        #[arg(long, requires = "science_ends")]
        science_starts: Option<String>,

        /// Pattern for science-mode end timestamps files, one per detector
        #[arg(long, requires = "science_starts")]
        science_ends: Option<String>,

        /// Output directory
        #[arg(long, short = 'd')]
        out_dir: PathBuf,

        /// Description tag added to the file names
        #[arg(long)]
        misc: Option<String>,
    },
}

/// Which files to scan and which blocks to keep
#[derive(Debug, Clone, Default, Args)]
pub struct ScanArgs {
    /// File pattern: path, glob, `a;b` list or `list:<file>`
    pub pattern: Option<String>,

    /// Keep only this detector
    #[arg(long, env = "SFTKIT_DETECTOR")]
    pub detector: Option<Detector>,

    /// Keep epochs at or after this GPS time
    #[arg(long)]
    pub min_start: Option<GpsTime>,

    /// Keep epochs before this GPS time
    #[arg(long)]
    pub max_start: Option<GpsTime>,

    /// Keep only epochs listed in this timestamps file
    #[arg(long)]
    pub timestamps: Option<PathBuf>,
}

impl ScanArgs {
    /// Overlay these flags on a job configuration.
    pub fn apply(&self, mut config: CatalogConfig) -> CatalogConfig {
        if let Some(pattern) = &self.pattern {
            config.pattern.clone_from(pattern);
        }
        let mut constraints = std::mem::take(&mut config.constraints);
        if let Some(detector) = self.detector {
            constraints = constraints.with_detector(detector);
        }
        if self.min_start.is_some() {
            constraints.min_start = self.min_start;
        }
        if self.max_start.is_some() {
            constraints.max_start = self.max_start;
        }
        if let Some(path) = &self.timestamps {
            constraints = constraints.with_timestamps_file(path);
        }
        config.with_constraints(constraints)
    }
}

/// Frequency band flags
#[derive(Debug, Clone, Copy, Default, Args)]
pub struct BandArgs {
    /// Lower band edge in Hz, defaults to the lowest stored bin
    #[arg(long, allow_negative_numbers = true)]
    pub f_min: Option<f64>,

    /// Upper band edge in Hz, defaults to the highest stored bin
    #[arg(long, allow_negative_numbers = true)]
    pub f_max: Option<f64>,
}

impl BandArgs {
    /// Overlay these flags on a job configuration.
    pub fn apply(&self, config: CatalogConfig) -> CatalogConfig {
        let f_min = self.f_min.or(config.f_min);
        let f_max = self.f_max.or(config.f_max);
        config.with_band(f_min, f_max)
    }
}

/// Job configuration from `--config`, or the defaults.
pub fn base_config(cli: &Cli) -> Result<CatalogConfig> {
    match &cli.config {
        Some(path) => CatalogConfig::from_json_file(path)
            .with_context(|| format!("failed to load configuration {}", path.display())),
        None => Ok(CatalogConfig::default()),
    }
}

/// Run the selected command, writing its report to `out`.
///
/// Returns `false` when the command completed but found a problem, such as a
/// checksum mismatch.
pub fn run<W: Write>(cli: &Cli, out: &mut W) -> Result<bool> {
    let format = cli.output_format();
    match &cli.command {
        Commands::Find { scan } => {
            let config = scan.apply(base_config(cli)?);
            commands::find::handle(&config, format, out)?;
            Ok(true)
        }
        Commands::Validate { scan } => {
            let config = scan.apply(base_config(cli)?);
            commands::validate::handle(&config, format, out)
        }
        Commands::Dump { pattern, bins } => {
            commands::dump::handle(pattern, *bins, format, out)?;
            Ok(true)
        }
        Commands::Load { scan, band } => {
            let config = band.apply(scan.apply(base_config(cli)?));
            commands::load::handle(&config, format, out)?;
            Ok(true)
        }
        Commands::Merge {
            scan,
            band,
            out_dir,
            comment,
            misc,
        } => {
            let config = band.apply(scan.apply(base_config(cli)?));
            commands::merge::handle(
                &config,
                out_dir,
                comment.as_deref(),
                misc.as_deref(),
                format,
                out,
            )?;
            Ok(true)
        }
        Commands::Sfdb {
            pattern,
            f_min,
            f_max,
            science_starts,
            science_ends,
            out_dir,
            misc,
        } => {
            let job = commands::sfdb::SfdbJob {
                pattern,
                f_min: *f_min,
                f_max: *f_max,
                science_starts: science_starts.as_deref(),
                science_ends: science_ends.as_deref(),
            };
            commands::sfdb::handle(&job, out_dir, misc.as_deref(), format, out)?;
            Ok(true)
        }
    }
}
