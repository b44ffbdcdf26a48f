//! Converting Rome SFDB files into SFT vectors

use crate::resolver::find_files;
use crate::{CatalogError, Result};
use sftkit_formats::bins::covering_bins;
use sftkit_formats::sfdb::{ScienceSegments, SfdbBlock, sfdb_detector_in_name};
use sftkit_formats::timestamps::read_timestamps_file;
use sftkit_formats::{Detector, MultiSftVector, SftVector};
use std::collections::BTreeMap;
use std::fs::File;
use std::io::BufReader;
use std::path::Path;
use tracing::{debug, info, warn};

/// Read every SFDB file matching `pattern` and convert the band
/// `[f_min, f_max]` of each block into an SFT.
///
/// When `science_starts` and `science_ends` are given (both or neither), they
/// are patterns for paired timestamps files, one pair per detector, and only
/// blocks inside those intervals are kept. The detector of each pair is read
/// from the file name of its start file.
///
/// Each SFT starts at `f_min` and has the block's frequency resolution. The
/// vectors are sorted by epoch.
pub fn read_sfdb(
    f_min: f64,
    f_max: f64,
    pattern: &str,
    science_starts: Option<&str>,
    science_ends: Option<&str>,
) -> Result<MultiSftVector> {
    if !(f_min >= 0.0 && f_max >= f_min) {
        return Err(CatalogError::InvalidArgument(format!(
            "invalid SFDB band [{f_min}, {f_max}]"
        )));
    }

    let science = match (science_starts, science_ends) {
        (Some(starts), Some(ends)) => Some(read_science_segments(starts, ends)?),
        (None, None) => None,
        (Some(_), None) => {
            return Err(CatalogError::InvalidArgument(
                "science-mode start times given without finishing times".to_string(),
            ));
        }
        (None, Some(_)) => {
            return Err(CatalogError::InvalidArgument(
                "science-mode finishing times given without start times".to_string(),
            ));
        }
    };

    let files = find_files(pattern)?;
    let mut kept: Vec<(Detector, SfdbBlock)> = Vec::new();
    let mut t_sft = None;
    let mut total = 0usize;

    for path in &files {
        let mut reader = BufReader::new(File::open(path)?);
        while let Some(block) = SfdbBlock::read_from(&mut reader).map_err(|e| sfdb_error(path, &e))? {
            total += 1;
            t_sft = Some(block.header.tbase);
            let detector = block.header.detector()?;

            let in_science = match &science {
                None => true,
                Some(science) => match science.get(&detector) {
                    Some(segments) => segments.contains(block.header.gps_sec, block.header.tbase),
                    None => {
                        warn!(
                            "No science-mode times for {}, skipping block at {}",
                            detector, block.header.gps_sec
                        );
                        false
                    }
                },
            };
            if in_science {
                kept.push((detector, block));
            }
        }
    }

    let Some(t_sft) = t_sft.filter(|_| !kept.is_empty()) else {
        return Err(CatalogError::Sfdb(format!(
            "no SFDB blocks found in '{pattern}'"
        )));
    };
    info!(
        "Keeping {} of {} SFDB blocks from {} files",
        kept.len(),
        total,
        files.len()
    );

    let (first, count) = covering_bins(f_min, f_max - f_min, t_sft);
    debug!("SFDB bins [{}, {})", first, first + count);

    let mut vectors: BTreeMap<Detector, SftVector> = BTreeMap::new();
    for (detector, block) in &kept {
        let sft = block.to_sft(first as usize, count as usize, f_min)?;
        vectors.entry(*detector).or_default().push(sft);
    }

    let mut multi = MultiSftVector::new();
    for (detector, mut sfts) in vectors {
        sfts.sort_by_key(|sft| sft.epoch);
        multi.insert(detector, sfts);
    }
    Ok(multi)
}

fn sfdb_error(path: &Path, error: &sftkit_formats::SftError) -> CatalogError {
    CatalogError::Sfdb(format!("{}: {error}", path.display()))
}

/// Science-mode intervals per detector from paired timestamps files.
fn read_science_segments(starts: &str, ends: &str) -> Result<BTreeMap<Detector, ScienceSegments>> {
    let start_files = find_files(starts)?;
    let end_files = find_files(ends)?;
    if start_files.len() != end_files.len() {
        return Err(CatalogError::InvalidArgument(format!(
            "{} starting and {} finishing timestamps files",
            start_files.len(),
            end_files.len()
        )));
    }

    let mut science = BTreeMap::new();
    for (start_file, end_file) in start_files.iter().zip(&end_files) {
        let detector = detector_in_file_name(start_file)?;
        let segments = ScienceSegments::new(
            read_timestamps_file(start_file, None, None)?,
            read_timestamps_file(end_file, None, None)?,
        )?;
        debug!(
            "{} science-mode intervals for {} from {}",
            segments.len(),
            detector,
            start_file.display()
        );
        science.insert(detector, segments);
    }
    Ok(science)
}

fn detector_in_file_name(path: &Path) -> Result<Detector> {
    path.file_name()
        .and_then(|name| name.to_str())
        .and_then(sfdb_detector_in_name)
        .ok_or_else(|| {
            CatalogError::InvalidArgument(format!(
                "no detector name found in timestamps file name {}",
                path.display()
            ))
        })
}
