//! SFT catalogs
//!
//! A catalog indexes every block in a set of files by reading headers only.
//! Entries are sorted by epoch, then start frequency, and all share one
//! frequency resolution. Sample data stays on disk until a loader asks for it.

use crate::resolver::find_files;
use crate::{CatalogError, Result};
use serde::{Deserialize, Serialize};
use sftkit_formats::sft::{SftHeader, has_valid_crc64, read_header};
use sftkit_formats::timestamps::read_timestamps_file;
use sftkit_formats::{Complex32, Detector, GpsTime, Sft, gps_in_range};
use std::cmp::Ordering;
use std::collections::BTreeSet;
use std::fmt;
use std::fs::File;
use std::io::{BufReader, Seek, SeekFrom};
use std::path::{Path, PathBuf};
use tracing::{debug, info, warn};

/// Where a block lives on disk
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct Locator {
    path: PathBuf,
    offset: u64,
}

impl Locator {
    /// Block at `offset` bytes into `path`.
    pub fn new(path: impl Into<PathBuf>, offset: u64) -> Self {
        Self {
            path: path.into(),
            offset,
        }
    }

    /// File holding the block
    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Byte offset of the block header
    pub const fn offset(&self) -> u64 {
        self.offset
    }
}

impl fmt::Display for Locator {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} : {}", self.path.display(), self.offset)
    }
}

#[derive(Debug, Clone, PartialEq)]
enum Source {
    File(Locator),
    Resident(Vec<Complex32>),
}

/// One catalog entry: a decoded header and where its samples come from
#[derive(Debug, Clone, PartialEq)]
pub struct SftDescriptor {
    /// Header of the block
    pub header: SftHeader,
    source: Source,
}

impl SftDescriptor {
    /// Entry for a block on disk.
    pub fn on_disk(header: SftHeader, locator: Locator) -> Self {
        Self {
            header,
            source: Source::File(locator),
        }
    }

    /// Entry whose samples are already in memory.
    pub fn resident(sft: Sft) -> Self {
        let header = SftHeader {
            detector: sft.detector,
            epoch: sft.epoch,
            f0: sft.f0,
            delta_f: sft.delta_f,
            version: 2,
            num_bins: sft.data.len() as u32,
            crc64: 0,
            comment: None,
            endian: binrw::Endian::Little,
        };
        Self {
            header,
            source: Source::Resident(sft.data),
        }
    }

    /// Disk location, `None` for resident entries
    pub fn locator(&self) -> Option<&Locator> {
        match &self.source {
            Source::File(locator) => Some(locator),
            Source::Resident(_) => None,
        }
    }

    /// In-memory samples, `None` for entries on disk
    pub fn resident_data(&self) -> Option<&[Complex32]> {
        match &self.source {
            Source::File(_) => None,
            Source::Resident(data) => Some(data),
        }
    }

    /// Instrument code
    pub fn detector(&self) -> Detector {
        self.header.detector
    }

    /// Start time
    pub fn epoch(&self) -> GpsTime {
        self.header.epoch
    }

    /// Number of stored bins
    pub fn num_bins(&self) -> u32 {
        self.header.num_bins
    }

    /// Stored comment, if any
    pub fn comment(&self) -> Option<&str> {
        self.header.comment.as_deref()
    }
}

impl fmt::Display for SftDescriptor {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match &self.source {
            Source::File(locator) => write!(f, "{locator}"),
            Source::Resident(_) => write!(f, "<memory> {} {}", self.header.detector, self.header.epoch),
        }
    }
}

/// Epoch-then-frequency order used for catalogs
fn compare_descriptors(a: &SftDescriptor, b: &SftDescriptor) -> Ordering {
    a.header
        .epoch
        .cmp(&b.header.epoch)
        .then_with(|| a.header.f0.total_cmp(&b.header.f0))
}

/// Sorted collection of descriptors sharing one frequency resolution
#[derive(Debug, Clone, Default, PartialEq)]
pub struct SftCatalog {
    entries: Vec<SftDescriptor>,
}

impl SftCatalog {
    /// Build a catalog from arbitrary descriptors, checking the resolution
    /// and sorting them.
    pub fn from_descriptors(mut entries: Vec<SftDescriptor>) -> Result<Self> {
        check_uniform_delta_f(&entries)?;
        entries.sort_by(compare_descriptors);
        Ok(Self { entries })
    }

    /// Catalog over SFTs already in memory.
    pub fn from_sfts(sfts: impl IntoIterator<Item = Sft>) -> Result<Self> {
        Self::from_descriptors(sfts.into_iter().map(SftDescriptor::resident).collect())
    }

    /// Number of entries
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// Whether the catalog is empty
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Entries in catalog order
    pub fn iter(&self) -> std::slice::Iter<'_, SftDescriptor> {
        self.entries.iter()
    }

    /// Entry by position
    pub fn get(&self, index: usize) -> Option<&SftDescriptor> {
        self.entries.get(index)
    }

    /// All entries as a slice
    pub fn entries(&self) -> &[SftDescriptor] {
        &self.entries
    }

    /// Frequency resolution shared by every entry
    pub fn delta_f(&self) -> Option<f64> {
        self.entries.first().map(|e| e.header.delta_f)
    }
}

impl<'a> IntoIterator for &'a SftCatalog {
    type Item = &'a SftDescriptor;
    type IntoIter = std::slice::Iter<'a, SftDescriptor>;

    fn into_iter(self) -> Self::IntoIter {
        self.entries.iter()
    }
}

fn check_uniform_delta_f(entries: &[SftDescriptor]) -> Result<()> {
    let Some(first) = entries.first() else {
        return Ok(());
    };
    let expected = first.header.delta_f;
    match entries.iter().find(|e| e.header.delta_f != expected) {
        Some(other) => Err(CatalogError::InconsistentDeltaF {
            expected,
            found: other.header.delta_f,
        }),
        None => Ok(()),
    }
}

/// Selection applied while scanning
///
/// All set fields must hold for a block to be kept.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Constraints {
    /// Keep only this detector
    #[serde(skip_serializing_if = "Option::is_none")]
    pub detector: Option<Detector>,
    /// Keep epochs at or after this time
    #[serde(skip_serializing_if = "Option::is_none")]
    pub min_start: Option<GpsTime>,
    /// Keep epochs strictly before this time
    #[serde(skip_serializing_if = "Option::is_none")]
    pub max_start: Option<GpsTime>,
    /// Keep only these epochs; each one inside the time range must be found
    #[serde(skip_serializing_if = "Option::is_none")]
    pub timestamps: Option<Vec<GpsTime>>,
    /// Timestamps file, read and merged into `timestamps`
    #[serde(skip_serializing_if = "Option::is_none")]
    pub timestamps_file: Option<PathBuf>,
}

impl Constraints {
    /// Keep only `detector`.
    #[must_use]
    pub fn with_detector(mut self, detector: Detector) -> Self {
        self.detector = Some(detector);
        self
    }

    /// Keep epochs in `[min, max)`. `None` leaves that side open.
    #[must_use]
    pub fn with_time_range(mut self, min: Option<GpsTime>, max: Option<GpsTime>) -> Self {
        self.min_start = min;
        self.max_start = max;
        self
    }

    /// Keep only the listed epochs.
    #[must_use]
    pub fn with_timestamps(mut self, timestamps: Vec<GpsTime>) -> Self {
        self.timestamps = Some(timestamps);
        self
    }

    /// Keep only epochs listed in a timestamps file.
    #[must_use]
    pub fn with_timestamps_file<P: AsRef<Path>>(mut self, path: P) -> Self {
        self.timestamps_file = Some(path.as_ref().to_path_buf());
        self
    }

    /// Explicit list plus the file contents, `None` if neither is set.
    fn timestamp_list(&self) -> Result<Option<Vec<GpsTime>>> {
        let mut list = self.timestamps.clone();
        if let Some(path) = &self.timestamps_file {
            let from_file =
                read_timestamps_file(path, self.min_start.as_ref(), self.max_start.as_ref())?;
            list.get_or_insert_with(Vec::new).extend(from_file);
        }
        Ok(list)
    }

    fn in_range(&self, epoch: GpsTime) -> bool {
        gps_in_range(epoch, self.min_start.as_ref(), self.max_start.as_ref()) == Ordering::Equal
    }

    fn accepts(&self, header: &SftHeader, timestamps: Option<&[GpsTime]>) -> bool {
        if self.detector.is_some_and(|d| d != header.detector) {
            return false;
        }
        if !self.in_range(header.epoch) {
            return false;
        }
        timestamps.is_none_or(|list| list.contains(&header.epoch))
    }
}

/// Scan every file matching `pattern` and catalog the blocks that pass
/// `constraints`.
///
/// Any unreadable block, or a merged file whose blocks disagree, fails the
/// whole scan. Every listed timestamp inside the time range must be found.
pub fn find_sfts(pattern: &str, constraints: &Constraints) -> Result<SftCatalog> {
    let timestamps = constraints.timestamp_list()?;
    let files = find_files(pattern)?;

    let mut entries = Vec::new();
    for path in &files {
        scan_file(path, constraints, timestamps.as_deref(), &mut entries)?;
    }
    entries.shrink_to_fit();

    if let Some(timestamps) = &timestamps {
        for (i, ts) in timestamps.iter().enumerate() {
            if constraints.in_range(*ts) && !entries.iter().any(|e| e.header.epoch == *ts) {
                return Err(CatalogError::MissingTimestamp(format!("{} : {ts}", i + 1)));
            }
        }
    }

    let catalog = SftCatalog::from_descriptors(entries)?;
    info!(
        "Found {} SFTs in {} files matching '{}'",
        catalog.len(),
        files.len(),
        pattern
    );
    Ok(catalog)
}

/// Open an SFT file, naming it in the error.
pub(crate) fn open_sft_file(path: &Path) -> std::io::Result<File> {
    File::open(path).map_err(|e| {
        std::io::Error::new(e.kind(), format!("failed to open {}: {e}", path.display()))
    })
}

fn scan_file(
    path: &Path,
    constraints: &Constraints,
    timestamps: Option<&[GpsTime]>,
    entries: &mut Vec<SftDescriptor>,
) -> Result<()> {
    let file = open_sft_file(path)?;
    let file_len = file.metadata()?.len();
    if file_len == 0 {
        return Err(std::io::Error::new(
            std::io::ErrorKind::UnexpectedEof,
            format!("{} is empty", path.display()),
        )
        .into());
    }

    let mut reader = BufReader::new(file);
    let mut previous: Option<SftHeader> = None;
    let mut offset = 0u64;
    let mut blocks = 0usize;

    while offset < file_len {
        let header = read_header(&mut reader).map_err(|source| CatalogError::CorruptBlock {
            path: path.to_path_buf(),
            offset,
            source,
        })?;

        if let Some(previous) = &previous
            && let Err(reason) = check_merged_block(previous, &header)
        {
            return Err(CatalogError::InconsistentMergedFile {
                path: path.to_path_buf(),
                offset,
                reason,
            });
        }

        if constraints.accepts(&header, timestamps) {
            entries.push(SftDescriptor::on_disk(
                header.clone(),
                Locator::new(path, offset),
            ));
        }
        blocks += 1;

        let data_start = reader.stream_position()?;
        let data_len = header.data_len();
        previous = Some(header);

        if data_start + data_len >= file_len {
            break;
        }
        reader.seek(SeekFrom::Start(data_start + data_len))?;
        offset = data_start + data_len;
    }

    debug!("Scanned {} blocks in {}", blocks, path.display());
    Ok(())
}

/// Rules for consecutive blocks in one file.
fn check_merged_block(previous: &SftHeader, next: &SftHeader) -> std::result::Result<(), String> {
    if previous.detector != next.detector {
        return Err(format!(
            "non-identical detectors {} and {}",
            previous.detector, next.detector
        ));
    }
    if previous.version != next.version {
        return Err(format!(
            "non-identical versions {} and {}",
            previous.version, next.version
        ));
    }
    if previous.epoch.as_f64() >= next.epoch.as_f64() {
        return Err(format!(
            "non-increasing epochs {} and {}",
            previous.epoch, next.epoch
        ));
    }
    if previous.delta_f != next.delta_f {
        return Err(format!(
            "non-identical time baselines {} and {}",
            1.0 / previous.delta_f,
            1.0 / next.delta_f
        ));
    }
    if previous.f0 != next.f0 {
        return Err(format!(
            "non-identical start frequencies {} and {}",
            previous.f0, next.f0
        ));
    }
    if previous.num_bins != next.num_bins {
        return Err(format!(
            "non-identical number of bins {} and {}",
            previous.num_bins, next.num_bins
        ));
    }
    Ok(())
}

/// Distinct detectors in the catalog, sorted.
pub fn list_detectors(catalog: &SftCatalog) -> Vec<Detector> {
    catalog
        .iter()
        .map(SftDescriptor::detector)
        .collect::<BTreeSet<_>>()
        .into_iter()
        .collect()
}

/// Number of distinct detectors in the catalog.
pub fn count_detectors(catalog: &SftCatalog) -> usize {
    list_detectors(catalog).len()
}

/// Re-read every block on disk and compare its stored checksum with a
/// freshly computed one.
///
/// Stops at the first mismatch and returns `false`. Resident entries have no
/// stored checksum and are skipped.
pub fn check_crc(catalog: &SftCatalog) -> Result<bool> {
    let mut open: Option<(&Path, BufReader<File>)> = None;

    for entry in catalog {
        let Some(locator) = entry.locator() else {
            continue;
        };

        if open.as_ref().is_none_or(|(path, _)| *path != locator.path()) {
            let file = open_sft_file(locator.path())?;
            open = Some((locator.path(), BufReader::new(file)));
        }
        let Some((_, reader)) = open.as_mut() else {
            continue;
        };

        reader.seek(SeekFrom::Start(locator.offset()))?;
        if !has_valid_crc64(reader)? {
            warn!("CRC64 checksum failure for SFT '{locator}'");
            return Ok(false);
        }
    }
    Ok(true)
}
