//! Writing SFTs to files
//!
//! A merged file is a sequence of self-contained blocks from one detector
//! in increasing epoch order. Each block carries its own checksum.

use crate::{CatalogError, Result};
use binrw::Endian;
use sftkit_formats::naming::{official_name_for_merged, official_name_for_sft};
use sftkit_formats::{Sft, SftWriter};
use std::fs::File;
use std::io::{BufWriter, Write};
use std::path::{Path, PathBuf};
use tracing::{debug, info};

/// Writes SFTs to files in a chosen byte order
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct FileWriter {
    codec: SftWriter,
}

impl FileWriter {
    /// Little-endian file writer.
    pub fn new() -> Self {
        Self::default()
    }

    /// Write blocks in the given byte order.
    #[must_use]
    pub const fn with_endian(mut self, endian: Endian) -> Self {
        self.codec = self.codec.with_endian(endian);
        self
    }

    /// Write a single SFT to `path`, replacing any existing file.
    pub fn write_sft(&self, sft: &Sft, path: &Path, comment: Option<&str>) -> Result<()> {
        self.write_blocks(std::slice::from_ref(sft), path, comment)
    }

    /// Write `sfts` as one merged file at `path`.
    pub fn write_vector(&self, sfts: &[Sft], path: &Path, comment: Option<&str>) -> Result<()> {
        check_mergeable(sfts)?;
        self.write_blocks(sfts, path, comment)
    }

    /// Write each SFT to its own officially named file in `dir`.
    ///
    /// Returns the written paths in input order.
    pub fn write_vector_to_dir(
        &self,
        sfts: &[Sft],
        dir: &Path,
        comment: Option<&str>,
        misc: Option<&str>,
    ) -> Result<Vec<PathBuf>> {
        let mut paths = Vec::with_capacity(sfts.len());
        for sft in sfts {
            let path = dir.join(official_name_for_sft(sft, misc)?);
            self.write_sft(sft, &path, comment)?;
            paths.push(path);
        }
        info!("Wrote {} SFT files to {}", paths.len(), dir.display());
        Ok(paths)
    }

    /// Write `sfts` as one merged file in `dir`, named by the merged-file
    /// convention.
    pub fn write_vector_to_named_file(
        &self,
        sfts: &[Sft],
        dir: &Path,
        comment: Option<&str>,
        misc: Option<&str>,
    ) -> Result<PathBuf> {
        check_mergeable(sfts)?;
        let path = dir.join(official_name_for_merged(sfts, misc)?);
        self.write_blocks(sfts, &path, comment)?;
        Ok(path)
    }

    fn write_blocks(&self, sfts: &[Sft], path: &Path, comment: Option<&str>) -> Result<()> {
        let file = File::create(path).map_err(|e| {
            std::io::Error::new(e.kind(), format!("failed to create {}: {e}", path.display()))
        })?;
        let mut out = BufWriter::new(file);
        self.codec.write_all(sfts, &mut out, comment)?;
        out.flush()?;
        debug!("Wrote {} SFTs to {}", sfts.len(), path.display());
        Ok(())
    }
}

/// Blocks of a merged file share a detector and increase in epoch.
fn check_mergeable(sfts: &[Sft]) -> Result<()> {
    let Some(first) = sfts.first() else {
        return Err(CatalogError::InvalidArgument(
            "cannot write an empty SFT vector".to_string(),
        ));
    };
    for pair in sfts.windows(2) {
        if pair[1].detector != first.detector {
            return Err(CatalogError::InvalidArgument(format!(
                "merged file mixes detectors {} and {}",
                first.detector, pair[1].detector
            )));
        }
        if pair[1].epoch <= pair[0].epoch {
            return Err(CatalogError::InvalidArgument(format!(
                "merged file epochs must increase: {} then {}",
                pair[0].epoch, pair[1].epoch
            )));
        }
    }
    Ok(())
}

/// Write a single little-endian SFT to `path`.
pub fn write_sft_file(sft: &Sft, path: &Path, comment: Option<&str>) -> Result<()> {
    FileWriter::new().write_sft(sft, path, comment)
}

/// Write `sfts` as one little-endian merged file at `path`.
pub fn write_vector_to_file(sfts: &[Sft], path: &Path, comment: Option<&str>) -> Result<()> {
    FileWriter::new().write_vector(sfts, path, comment)
}

/// Write each SFT to its own officially named file in `dir`.
pub fn write_vector_to_dir(
    sfts: &[Sft],
    dir: &Path,
    comment: Option<&str>,
    misc: Option<&str>,
) -> Result<Vec<PathBuf>> {
    FileWriter::new().write_vector_to_dir(sfts, dir, comment, misc)
}

/// Write `sfts` as one officially named merged file in `dir`.
pub fn write_vector_to_named_file(
    sfts: &[Sft],
    dir: &Path,
    comment: Option<&str>,
    misc: Option<&str>,
) -> Result<PathBuf> {
    FileWriter::new().write_vector_to_named_file(sfts, dir, comment, misc)
}
