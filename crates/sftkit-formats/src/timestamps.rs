//! Plain-text data files and timestamps lists
//!
//! Data files are line oriented. Everything after `#` or `%` on a line is a
//! comment, surrounding whitespace is trimmed and blank lines are dropped.
//! A timestamps file holds one epoch per line, either as `seconds.fraction`
//! with an optional `GPS`/`MJD` suffix, or in the legacy `seconds nanoseconds`
//! form, which is still accepted with a warning.

use crate::error::{Result, SftError};
use crate::gps::{GpsTime, gps_in_range};
use std::cmp::Ordering;
use std::path::Path;
use tracing::{debug, warn};

/// Strip comments and blank lines from data-file text.
pub fn parse_data_lines(text: &str) -> Vec<&str> {
    text.lines()
        .map(|line| {
            let end = line.find(['#', '%']).unwrap_or(line.len());
            line[..end].trim()
        })
        .filter(|line| !line.is_empty())
        .collect()
}

/// Read a data file and return its content lines.
pub fn read_data_file(path: &Path) -> Result<Vec<String>> {
    let text = std::fs::read_to_string(path)?;
    Ok(parse_data_lines(&text)
        .into_iter()
        .map(str::to_string)
        .collect())
}

/// Parse one timestamps line.
///
/// The second value reports whether the legacy `sec ns` form was used.
pub fn parse_timestamp_line(line: &str) -> Result<(GpsTime, bool)> {
    if let Some(gps) = parse_legacy(line)? {
        return Ok((gps, true));
    }
    Ok((line.parse()?, false))
}

/// `sec ns[junk]`, accepted when two leading integers are present.
fn parse_legacy(line: &str) -> Result<Option<GpsTime>> {
    let mut tokens = line.split_whitespace();
    let (Some(first), Some(second)) = (tokens.next(), tokens.next()) else {
        return Ok(None);
    };
    let Ok(seconds) = first.parse::<i32>() else {
        return Ok(None);
    };

    let digits_end = second
        .char_indices()
        .find(|&(i, c)| !(c.is_ascii_digit() || (i == 0 && matches!(c, '-' | '+'))))
        .map_or(second.len(), |(i, _)| i);
    let Ok(nanoseconds) = second[..digits_end].parse::<i32>() else {
        return Ok(None);
    };

    let junk = &second[digits_end..];
    let junk = if junk.is_empty() {
        tokens.next().unwrap_or("")
    } else {
        junk
    };
    if !junk.is_empty() {
        return Err(SftError::InvalidTimestamp {
            input: line.to_string(),
            reason: format!("unconverted trailing junk '{junk}'"),
        });
    }
    Ok(Some(GpsTime::new(seconds, nanoseconds)))
}

/// Load a timestamps file, keeping only epochs inside `[min, max)`.
pub fn read_timestamps_file(
    path: &Path,
    min: Option<&GpsTime>,
    max: Option<&GpsTime>,
) -> Result<Vec<GpsTime>> {
    let lines = read_data_file(path)?;
    let mut timestamps = Vec::with_capacity(lines.len());

    for (number, line) in lines.iter().enumerate() {
        let (gps, legacy) = parse_timestamp_line(line).map_err(|e| match e {
            SftError::InvalidTimestamp { reason, .. } => SftError::InvalidTimestamp {
                input: format!("{}:{}: {line}", path.display(), number + 1),
                reason,
            },
            other => other,
        })?;
        if legacy {
            warn!(
                "Line {}: obsolete 'sec ns' timestamp '{}', use 'xx.yy[GPS|MJD]' instead: {}",
                number + 1,
                line,
                gps
            );
        }
        if gps_in_range(gps, min, max) == Ordering::Equal {
            timestamps.push(gps);
        }
    }

    debug!(
        "Read {} of {} timestamps from {}",
        timestamps.len(),
        lines.len(),
        path.display()
    );
    Ok(timestamps)
}

/// Load one timestamps file per detector.
pub fn read_multi_timestamps_files<P: AsRef<Path>>(
    paths: &[P],
    min: Option<&GpsTime>,
    max: Option<&GpsTime>,
) -> Result<Vec<Vec<GpsTime>>> {
    if paths.is_empty() {
        return Err(SftError::InvalidArgument(
            "no timestamps files given".to_string(),
        ));
    }
    paths
        .iter()
        .map(|path| read_timestamps_file(path.as_ref(), min, max))
        .collect()
}
