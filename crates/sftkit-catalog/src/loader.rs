//! Loading catalogued SFTs into memory
//!
//! A catalog may describe one SFT spread over several blocks, each holding a
//! different frequency range (for example narrow-band files cut from the same
//! data). The loader groups entries by epoch, reads the requested bin window
//! from every piece and stitches the pieces together, insisting that they
//! join without gaps and cover the whole window.

use crate::catalog::{SftCatalog, SftDescriptor, open_sft_file};
use crate::view::{CatalogView, partition_by_detector};
use crate::{CatalogError, Result};
use sftkit_formats::bins::{round_frequency_down_to_bin, round_frequency_up_to_bin};
use sftkit_formats::sft::read_bins;
use sftkit_formats::{Complex32, GpsTime, MultiSftVector, Sft, SftError, SftVector};
use std::cmp::Ordering;
use std::fs::File;
use std::io::{BufReader, Seek, SeekFrom};
use std::path::Path;
use tracing::{debug, info};

/// Load every SFT in `catalog`, restricted to the band `[f_min, f_max)`.
///
/// A missing or negative band edge selects the lowest (highest) bin present
/// in the catalog. Entries sharing an epoch are stitched into one SFT.
pub fn load_sfts(catalog: &SftCatalog, f_min: Option<f64>, f_max: Option<f64>) -> Result<SftVector> {
    let entries: Vec<&SftDescriptor> = catalog.iter().collect();
    load_entries(&entries, f_min, f_max)
}

/// Load each detector of a view into its own vector.
///
/// Fails as a whole if any detector fails.
pub fn load_from_view(
    view: &CatalogView<'_>,
    f_min: Option<f64>,
    f_max: Option<f64>,
) -> Result<MultiSftVector> {
    if view.is_empty() {
        return Err(CatalogError::InvalidArgument(
            "catalog view holds no detectors".to_string(),
        ));
    }

    let mut vectors = MultiSftVector::new();
    for (detector, entries) in view.iter() {
        let sfts = load_entries(entries, f_min, f_max)?;
        debug!("Loaded {} SFTs for {}", sfts.len(), detector);
        vectors.insert(detector, sfts);
    }
    Ok(vectors)
}

/// Partition `catalog` by detector and load every detector.
pub fn load_multi_sfts(
    catalog: &SftCatalog,
    f_min: Option<f64>,
    f_max: Option<f64>,
) -> Result<MultiSftVector> {
    load_from_view(&partition_by_detector(catalog), f_min, f_max)
}

/// Progress of one output SFT while its pieces are read
#[derive(Debug, Clone, Copy, Default)]
struct Stitch {
    epoch: Option<GpsTime>,
    last: Option<u32>,
}

/// One contribution to an output SFT
struct Piece<'a> {
    entry: &'a SftDescriptor,
    delta_f: f64,
    epoch: GpsTime,
    range: Option<(u32, u32)>,
}

fn load_entries(
    entries: &[&SftDescriptor],
    f_min: Option<f64>,
    f_max: Option<f64>,
) -> Result<SftVector> {
    let Some(first_entry) = entries.first() else {
        return Err(CatalogError::InvalidArgument(
            "cannot load from an empty catalog".to_string(),
        ));
    };
    let delta_f = first_entry.header.delta_f;
    let (first_bin, last_bin) = bin_window(entries, delta_f, f_min, f_max)?;
    let num_bins = (last_bin - first_bin + 1) as usize;

    // Output slot of every entry: a new slot each time the epoch changes
    let mut slots = Vec::with_capacity(entries.len());
    let mut num_sfts = 0usize;
    let mut previous: Option<GpsTime> = None;
    for entry in entries {
        if previous != Some(entry.epoch()) {
            num_sfts += 1;
            previous = Some(entry.epoch());
        }
        slots.push(num_sfts - 1);
    }

    info!(
        "Loading {} SFTs from {} catalog entries, bins [{}, {}]",
        num_sfts,
        entries.len(),
        first_bin,
        last_bin
    );

    let mut sfts: SftVector = Vec::with_capacity(num_sfts);
    for (i, entry) in entries.iter().enumerate() {
        if i == 0 || slots[i] != slots[i - 1] {
            sfts.push(Sft::zeroed(
                entry.detector(),
                entry.epoch(),
                f64::from(first_bin) * delta_f,
                delta_f,
                num_bins,
            ));
        }
    }
    let mut stitches = vec![Stitch::default(); num_sfts];
    let mut scratch = vec![Complex32::default(); num_bins];

    // Frequency, then file, then offset keeps reads sequential
    let mut order: Vec<usize> = (0..entries.len()).collect();
    order.sort_by(|&a, &b| read_order(entries[a], entries[b]));

    let mut open: Option<(&Path, BufReader<File>)> = None;
    for index in order {
        let entry = entries[index];
        let piece = match entry.resident_data() {
            Some(data) => copy_resident(entry, data, first_bin, last_bin, &mut scratch),
            None => {
                let Some(locator) = entry.locator() else {
                    continue;
                };
                if open.as_ref().is_none_or(|(path, _)| *path != locator.path()) {
                    debug!("Opening SFT file '{}'", locator.path().display());
                    let file = open_sft_file(locator.path())?;
                    open = Some((locator.path(), BufReader::new(file)));
                }
                let Some((_, reader)) = open.as_mut() else {
                    continue;
                };
                reader.seek(SeekFrom::Start(locator.offset()))?;
                let read = read_bins(reader, first_bin, last_bin, &mut scratch).map_err(
                    |source| CatalogError::CorruptBlock {
                        path: locator.path().to_path_buf(),
                        offset: locator.offset(),
                        source,
                    },
                )?;
                Piece {
                    entry,
                    delta_f: read.header.delta_f,
                    epoch: read.header.epoch,
                    range: read.range,
                }
            }
        };

        let slot = slots[index];
        stitch_piece(
            &piece,
            &mut stitches[slot],
            &mut sfts[slot],
            &scratch,
            first_bin,
            delta_f,
        )?;
    }

    for (stitch, sft) in stitches.iter().zip(&mut sfts) {
        if stitch.last != Some(last_bin) {
            let missing_from = stitch.last.map_or(first_bin, |last| last + 1);
            return Err(CatalogError::IncompleteSegment(format!(
                "SFT at {} ends before the requested band: missing bins [{}, {}]",
                sft.epoch, missing_from, last_bin
            )));
        }
        if let Some(epoch) = stitch.epoch {
            sft.epoch = epoch;
        }
    }

    Ok(sfts)
}

/// Bin window `[first, last]` for the requested band.
fn bin_window(
    entries: &[&SftDescriptor],
    delta_f: f64,
    f_min: Option<f64>,
    f_max: Option<f64>,
) -> Result<(u32, u32)> {
    let first = match f_min.filter(|f| *f >= 0.0) {
        Some(f_min) => round_frequency_down_to_bin(f_min, delta_f),
        None => entries
            .iter()
            .map(|e| e.header.first_bin())
            .min()
            .unwrap_or_default(),
    };
    let last = match f_max.filter(|f| *f >= 0.0) {
        Some(f_max) => round_frequency_up_to_bin(f_max, delta_f).saturating_sub(1),
        None => entries
            .iter()
            .map(|e| e.header.last_bin())
            .max()
            .unwrap_or_default(),
    };

    // A positive upper edge that rounds to bin 0 leaves nothing to load
    if (last == 0 && f_max.is_some_and(|f| f > 0.0)) || first > last {
        return Err(SftError::InvalidRange { first, last }.into());
    }
    Ok((first, last))
}

fn read_order(a: &SftDescriptor, b: &SftDescriptor) -> Ordering {
    fn position(e: &SftDescriptor) -> Option<(&Path, u64)> {
        e.locator().map(|l| (l.path(), l.offset()))
    }
    a.header
        .f0
        .total_cmp(&b.header.f0)
        .then_with(|| position(a).cmp(&position(b)))
}

fn copy_resident<'a>(
    entry: &'a SftDescriptor,
    data: &[Complex32],
    first_bin: u32,
    last_bin: u32,
    scratch: &mut [Complex32],
) -> Piece<'a> {
    let block_first = entry.header.first_bin();
    let block_last = block_first + data.len() as u32 - 1;
    let first = first_bin.max(block_first);
    let last = last_bin.min(block_last);

    let range = (first <= last).then(|| {
        let start = (first - block_first) as usize;
        let count = (last - first + 1) as usize;
        scratch[..count].copy_from_slice(&data[start..start + count]);
        (first, last)
    });

    Piece {
        entry,
        delta_f: entry.header.delta_f,
        epoch: entry.epoch(),
        range,
    }
}

fn stitch_piece(
    piece: &Piece<'_>,
    stitch: &mut Stitch,
    sft: &mut Sft,
    scratch: &[Complex32],
    first_bin: u32,
    delta_f: f64,
) -> Result<()> {
    let Some((read_first, read_last)) = piece.range else {
        // Nothing in the window, but the epoch must still agree
        match stitch.epoch {
            None => stitch.epoch = Some(piece.epoch),
            Some(epoch) if epoch != piece.epoch => {
                return Err(CatalogError::InconsistentSegment(format!(
                    "{}: epoch {} differs from {}",
                    piece.entry, piece.epoch, epoch
                )));
            }
            Some(_) => {}
        }
        return Ok(());
    };

    let expected = stitch.last.map_or(first_bin, |last| last + 1);
    if read_first != expected {
        return Err(CatalogError::DataGap(format!(
            "{}: read starts at bin {} but bin {} was expected",
            piece.entry, read_first, expected
        )));
    }
    if stitch.last.is_none() {
        stitch.epoch = Some(piece.epoch);
    }

    if piece.delta_f != delta_f {
        return Err(CatalogError::InconsistentSegment(format!(
            "{}: frequency resolution {} differs from {}",
            piece.entry, piece.delta_f, delta_f
        )));
    }
    if stitch.epoch != Some(piece.epoch) {
        return Err(CatalogError::InconsistentSegment(format!(
            "{}: epoch {} differs from the other pieces",
            piece.entry, piece.epoch
        )));
    }

    let offset = (read_first - first_bin) as usize;
    let count = (read_last - read_first + 1) as usize;
    sft.data[offset..offset + count].copy_from_slice(&scratch[..count]);
    stitch.last = Some(read_last);
    Ok(())
}
