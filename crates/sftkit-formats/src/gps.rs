//! GPS epochs and the half-open time-range predicate
//!
//! Epochs are integer seconds plus nanoseconds. They parse from the textual
//! forms used in timestamps files:
//!
//! ```text
//! 714180733            plain GPS seconds
//! 714180733.25         fractional GPS seconds
//! 714180733.25GPS      explicit GPS suffix
//! 53000.5MJD           Modified Julian Date, in Terrestrial Time
//! ```

use crate::error::{Result, SftError};
use serde::{Deserialize, Serialize};
use std::cmp::Ordering;
use std::fmt;
use std::str::FromStr;

/// Nanoseconds per second
pub const NANOS_PER_SECOND: i32 = 1_000_000_000;

/// MJD of the GPS epoch, 1980-01-06
const GPS_EPOCH_MJD: i64 = 44244;

/// TT - GPS offset in seconds (TT - TAI = 32.184, TAI - GPS = 19)
const TT_MINUS_GPS: f64 = 51.184;

const SECONDS_PER_DAY: i64 = 86_400;

/// A GPS time stamp
#[derive(
    Debug, Clone, Copy, Default, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize,
)]
pub struct GpsTime {
    /// Whole GPS seconds
    pub seconds: i32,
    /// Nanoseconds past `seconds`, in `[0, 1e9)` for normalized values
    pub nanoseconds: i32,
}

impl GpsTime {
    /// Create an epoch from seconds and nanoseconds.
    pub const fn new(seconds: i32, nanoseconds: i32) -> Self {
        Self {
            seconds,
            nanoseconds,
        }
    }

    /// Epoch with whole seconds only
    pub const fn from_seconds(seconds: i32) -> Self {
        Self::new(seconds, 0)
    }

    /// Epoch as floating-point seconds
    pub fn as_f64(&self) -> f64 {
        f64::from(self.seconds) + f64::from(self.nanoseconds) * 1e-9
    }

    /// Whether both fields are zero
    pub const fn is_zero(&self) -> bool {
        self.seconds == 0 && self.nanoseconds == 0
    }

    /// Whether the nanosecond field lies in `[0, 1e9)`
    pub const fn is_normalized(&self) -> bool {
        self.nanoseconds >= 0 && self.nanoseconds < NANOS_PER_SECOND
    }

    /// Build from a total second count and a fraction in `[0, 1)`.
    fn from_parts(whole: i64, fraction: f64) -> Result<Self> {
        let mut whole = whole;
        let mut nanos = (fraction * 1e9).round() as i64;
        if nanos >= i64::from(NANOS_PER_SECOND) {
            nanos -= i64::from(NANOS_PER_SECOND);
            whole += 1;
        }
        let seconds = i32::try_from(whole).map_err(|_| SftError::InvalidTimestamp {
            input: whole.to_string(),
            reason: "seconds out of range".to_string(),
        })?;
        Ok(Self::new(seconds, nanos as i32))
    }
}

/// Position of `gps` relative to the half-open range `[min, max)`.
///
/// Returns `Less` below the range, `Equal` inside it and `Greater` at or
/// above `max`. A missing bound is unbounded on that side. Comparison uses
/// floating-point seconds.
pub fn gps_in_range(gps: GpsTime, min: Option<&GpsTime>, max: Option<&GpsTime>) -> Ordering {
    if let Some(min) = min
        && gps.as_f64() < min.as_f64()
    {
        return Ordering::Less;
    }
    if let Some(max) = max
        && gps.as_f64() >= max.as_f64()
    {
        return Ordering::Greater;
    }
    Ordering::Equal
}

impl fmt::Display for GpsTime {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}.{:09}", self.seconds, self.nanoseconds)
    }
}

impl FromStr for GpsTime {
    type Err = SftError;

    fn from_str(s: &str) -> Result<Self> {
        let text = s.trim();
        if let Some(mjd) = text.strip_suffix("MJD") {
            return parse_mjd_tt(mjd.trim_end(), s);
        }
        let text = text.strip_suffix("GPS").map_or(text, str::trim_end);
        parse_decimal_seconds(text, s)
    }
}

fn invalid(input: &str, reason: &str) -> SftError {
    SftError::InvalidTimestamp {
        input: input.to_string(),
        reason: reason.to_string(),
    }
}

/// Split `[-+]digits[.digits]` into sign, integer part and fraction digits.
fn split_decimal<'a>(text: &'a str, input: &str) -> Result<(bool, &'a str, &'a str)> {
    let (negative, body) = match text.as_bytes().first() {
        Some(b'-') => (true, &text[1..]),
        Some(b'+') => (false, &text[1..]),
        _ => (false, text),
    };
    let (int_part, frac_part) = body.split_once('.').unwrap_or((body, ""));
    if int_part.is_empty() && frac_part.is_empty() {
        return Err(invalid(input, "no digits"));
    }
    if !int_part.bytes().all(|b| b.is_ascii_digit())
        || !frac_part.bytes().all(|b| b.is_ascii_digit())
    {
        return Err(invalid(input, "expected [-]seconds[.fraction]"));
    }
    Ok((negative, int_part, frac_part))
}

fn parse_int(digits: &str, input: &str) -> Result<i64> {
    if digits.is_empty() {
        return Ok(0);
    }
    digits
        .parse::<i64>()
        .map_err(|_| invalid(input, "integer part out of range"))
}

/// Fraction digits as a value in `[0, 1)`
fn parse_fraction(digits: &str) -> f64 {
    if digits.is_empty() {
        return 0.0;
    }
    format!("0.{digits}").parse::<f64>().unwrap_or(0.0)
}

fn parse_decimal_seconds(text: &str, input: &str) -> Result<GpsTime> {
    let (negative, int_part, frac_part) = split_decimal(text, input)?;
    let whole = parse_int(int_part, input)?;
    let fraction = parse_fraction(frac_part);
    if negative {
        // -a.b = -(a+1) + (1 - 0.b)
        if fraction > 0.0 {
            GpsTime::from_parts(-whole - 1, 1.0 - fraction)
        } else {
            GpsTime::from_parts(-whole, 0.0)
        }
    } else {
        GpsTime::from_parts(whole, fraction)
    }
}

fn parse_mjd_tt(text: &str, input: &str) -> Result<GpsTime> {
    let (negative, int_part, frac_part) = split_decimal(text, input)?;
    if negative {
        return Err(invalid(input, "negative MJD"));
    }
    let days = parse_int(int_part, input)?;
    let day_seconds = parse_fraction(frac_part) * 86_400.0 - TT_MINUS_GPS;
    let carry = day_seconds.floor();
    let whole = (days - GPS_EPOCH_MJD) * SECONDS_PER_DAY + carry as i64;
    GpsTime::from_parts(whole, day_seconds - carry)
}
