//! Configuration for scan-and-load jobs

use crate::catalog::{Constraints, SftCatalog, check_crc, find_sfts};
use crate::loader::load_multi_sfts;
use crate::{CatalogError, Result};
use serde::{Deserialize, Serialize};
use sftkit_formats::MultiSftVector;
use std::path::Path;
use tracing::info;

/// Which files to scan, what to keep and which band to load
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct CatalogConfig {
    /// File pattern, see [`crate::resolver`]
    pub pattern: String,

    /// Selection applied while scanning
    pub constraints: Constraints,

    /// Lower band edge in Hz, `None` for the lowest stored bin
    #[serde(skip_serializing_if = "Option::is_none")]
    pub f_min: Option<f64>,

    /// Upper band edge in Hz, `None` for the highest stored bin
    #[serde(skip_serializing_if = "Option::is_none")]
    pub f_max: Option<f64>,

    /// Recompute every block checksum after scanning
    pub verify_checksums: bool,
}

impl Default for CatalogConfig {
    fn default() -> Self {
        Self {
            pattern: "*.sft".to_string(),
            constraints: Constraints::default(),
            f_min: None,
            f_max: None,
            verify_checksums: false,
        }
    }
}

impl CatalogConfig {
    /// Configuration scanning `pattern` with no constraints
    pub fn new(pattern: impl Into<String>) -> Self {
        Self {
            pattern: pattern.into(),
            ..Default::default()
        }
    }

    /// Load a configuration from a JSON file. Missing fields take their
    /// defaults.
    pub fn from_json_file<P: AsRef<Path>>(path: P) -> Result<Self> {
        let text = std::fs::read_to_string(path.as_ref())?;
        let config: Self = serde_json::from_str(&text)?;
        config.validate()?;
        Ok(config)
    }

    /// Set the scan constraints
    #[must_use]
    pub fn with_constraints(mut self, constraints: Constraints) -> Self {
        self.constraints = constraints;
        self
    }

    /// Set the frequency band
    #[must_use]
    pub const fn with_band(mut self, f_min: Option<f64>, f_max: Option<f64>) -> Self {
        self.f_min = f_min;
        self.f_max = f_max;
        self
    }

    /// Enable or disable checksum verification
    #[must_use]
    pub const fn with_checksums(mut self, verify: bool) -> Self {
        self.verify_checksums = verify;
        self
    }

    /// Check the configuration for obvious mistakes.
    pub fn validate(&self) -> Result<()> {
        if self.pattern.is_empty() {
            return Err(CatalogError::InvalidArgument(
                "file pattern must not be empty".to_string(),
            ));
        }
        if let (Some(f_min), Some(f_max)) = (self.f_min, self.f_max)
            && f_min > f_max
        {
            return Err(CatalogError::InvalidArgument(format!(
                "band [{f_min}, {f_max}] is reversed"
            )));
        }
        Ok(())
    }

    /// Scan the configured files, verifying checksums when enabled.
    pub fn find(&self) -> Result<SftCatalog> {
        self.validate()?;
        let catalog = find_sfts(&self.pattern, &self.constraints)?;
        if self.verify_checksums {
            if !check_crc(&catalog)? {
                return Err(CatalogError::ChecksumMismatch(self.pattern.clone()));
            }
            info!("Verified checksums of {} SFTs", catalog.len());
        }
        Ok(catalog)
    }

    /// Scan and load the configured band for every detector.
    pub fn load(&self) -> Result<MultiSftVector> {
        let catalog = self.find()?;
        load_multi_sfts(&catalog, self.f_min, self.f_max)
    }
}
