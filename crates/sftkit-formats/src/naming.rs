//! Canonical SFT file names
//!
//! ```text
//! S-D-G-T.sft
//!
//! S  site letter                       H
//! D  <count>_<IFO>_<Tsft>SFT[_<misc>]  1_H1_1800SFT_O4run
//! G  GPS start, at least 9 digits      800000000
//! T  seconds spanned by the file       1800
//! ```
//!
//! The span is rounded up: an endpoint epoch with a non-zero nanosecond part
//! adds one second.

use crate::error::{Result, SftError};
use crate::sft::Sft;
use std::fmt;

/// Largest span that fits the nine-character T field
const MAX_SPAN: u32 = 999_999_999;

/// Fields of a canonical SFT file name
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SftFilename {
    /// Site letter, `S` field
    pub site: char,
    /// Channel character completing the detector code
    pub channel: char,
    /// Number of SFTs in the file
    pub num_sfts: u32,
    /// SFT baseline in whole seconds
    pub t_sft: u32,
    /// GPS seconds of the first SFT
    pub gps_start: u32,
    /// Total seconds covered
    pub span: u32,
    /// Optional free-form tag appended to the description
    pub misc: Option<String>,
}

impl SftFilename {
    /// Name fields for a file holding a single SFT.
    pub fn for_sft(sft: &Sft, misc: Option<&str>) -> Result<Self> {
        let t_sft = baseline_seconds(sft)?;
        let mut span = t_sft;
        if sft.epoch.nanoseconds > 0 {
            span += 1;
        }
        Self::new(
            sft.detector.site(),
            sft.detector.channel(),
            1,
            t_sft,
            start_seconds(sft)?,
            span,
            misc,
        )
    }

    /// Name fields for a merged file holding `sfts` in epoch order.
    pub fn for_merged(sfts: &[Sft], misc: Option<&str>) -> Result<Self> {
        let (Some(first), Some(last)) = (sfts.first(), sfts.last()) else {
            return Err(SftError::InvalidArgument(
                "cannot name an empty SFT vector".to_string(),
            ));
        };
        let t_sft = baseline_seconds(first)?;
        let start = start_seconds(first)?;
        let end = start_seconds(last)?;
        if end < start {
            return Err(SftError::InvalidArgument(format!(
                "last epoch {} precedes first epoch {}",
                last.epoch, first.epoch
            )));
        }

        let mut span = u64::from(end - start) + u64::from(t_sft);
        if first.epoch.nanoseconds > 0 {
            span += 1;
        }
        if last.epoch.nanoseconds > 0 {
            span += 1;
        }
        let span = u32::try_from(span).unwrap_or(u32::MAX);
        Self::new(
            first.detector.site(),
            first.detector.channel(),
            sfts.len() as u32,
            t_sft,
            start,
            span,
            misc,
        )
    }

    /// Assemble name fields, validating `misc` and the span width.
    pub fn new(
        site: char,
        channel: char,
        num_sfts: u32,
        t_sft: u32,
        gps_start: u32,
        span: u32,
        misc: Option<&str>,
    ) -> Result<Self> {
        if let Some(misc) = misc {
            check_valid_description_field(misc)?;
        }
        if span > MAX_SPAN {
            return Err(SftError::InvalidArgument(format!(
                "span of {span} s does not fit the name field"
            )));
        }
        Ok(Self {
            site,
            channel,
            num_sfts,
            t_sft,
            gps_start,
            span,
            misc: misc.map(str::to_string),
        })
    }

    /// The `D` field
    pub fn description(&self) -> String {
        let mut desc = format!(
            "{}_{}{}_{}SFT",
            self.num_sfts, self.site, self.channel, self.t_sft
        );
        if let Some(misc) = &self.misc {
            desc.push('_');
            desc.push_str(misc);
        }
        desc
    }

    /// Parse a canonical name back into its fields.
    pub fn parse(name: &str) -> Result<Self> {
        let fail = |reason: &str| SftError::InvalidFilename {
            name: name.to_string(),
            reason: reason.to_string(),
        };

        let stem = name
            .strip_suffix(".sft")
            .ok_or_else(|| fail("missing .sft extension"))?;
        let parts: Vec<&str> = stem.split('-').collect();
        let [s, d, g, t] = parts.as_slice() else {
            return Err(fail("expected four '-' separated fields"));
        };

        let mut s_chars = s.chars();
        let (Some(site), None) = (s_chars.next(), s_chars.next()) else {
            return Err(fail("site field must be one character"));
        };

        let mut fields = d.splitn(4, '_');
        let count = fields.next().unwrap_or_default();
        let ifo = fields.next().ok_or_else(|| fail("description lacks detector"))?;
        let kind = fields.next().ok_or_else(|| fail("description lacks SFT type"))?;
        let misc = fields.next();

        let num_sfts = count
            .parse::<u32>()
            .map_err(|_| fail("invalid SFT count"))?;
        let mut ifo_chars = ifo.chars();
        let (Some(ifo_site), Some(channel), None) =
            (ifo_chars.next(), ifo_chars.next(), ifo_chars.next())
        else {
            return Err(fail("detector must be two characters"));
        };
        if ifo_site != site {
            return Err(fail("detector does not match site letter"));
        }
        let t_sft = kind
            .strip_suffix("SFT")
            .and_then(|t| t.parse::<u32>().ok())
            .ok_or_else(|| fail("invalid SFT type, expected <Tsft>SFT"))?;

        if g.len() < 9 || !g.bytes().all(|b| b.is_ascii_digit()) {
            return Err(fail("GPS start must have at least 9 digits"));
        }
        let gps_start = g.parse::<u32>().map_err(|_| fail("GPS start out of range"))?;
        let span = t.parse::<u32>().map_err(|_| fail("invalid span"))?;

        Self::new(site, channel, num_sfts, t_sft, gps_start, span, misc)
    }
}

impl fmt::Display for SftFilename {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{}-{}-{:09}-{}.sft",
            self.site,
            self.description(),
            self.gps_start,
            self.span
        )
    }
}

/// Canonical name from explicit fields.
pub fn official_sft_filename(
    site: char,
    channel: char,
    num_sfts: u32,
    t_sft: u32,
    gps_start: u32,
    span: u32,
    misc: Option<&str>,
) -> Result<String> {
    Ok(SftFilename::new(site, channel, num_sfts, t_sft, gps_start, span, misc)?.to_string())
}

/// Canonical name for a single SFT.
pub fn official_name_for_sft(sft: &Sft, misc: Option<&str>) -> Result<String> {
    Ok(SftFilename::for_sft(sft, misc)?.to_string())
}

/// Canonical name for a merged file holding `sfts`.
pub fn official_name_for_merged(sfts: &[Sft], misc: Option<&str>) -> Result<String> {
    Ok(SftFilename::for_merged(sfts, misc)?.to_string())
}

/// Check a free-form description tag.
///
/// Allowed characters are ASCII alphanumerics and `_`, `+`, `#`. A lone
/// uppercase letter is reserved and rejected.
pub fn check_valid_description_field(desc: &str) -> Result<()> {
    let fail = |reason: String| SftError::InvalidDescriptionField {
        field: desc.to_string(),
        reason,
    };

    let mut chars = desc.chars();
    if let (Some(c), None) = (chars.next(), chars.next())
        && c.is_ascii_uppercase()
    {
        return Err(fail(
            "single uppercase description is reserved for raw frames".to_string(),
        ));
    }
    if let Some(c) = desc
        .chars()
        .find(|&c| !(c.is_ascii_alphanumeric() || matches!(c, '_' | '+' | '#')))
    {
        return Err(fail(format!(
            "invalid character '{c}', only alphanumerics and '_', '+', '#' are allowed"
        )));
    }
    Ok(())
}

fn baseline_seconds(sft: &Sft) -> Result<u32> {
    let t_sft = sft.t_sft().round();
    if !t_sft.is_finite() || t_sft < 0.0 || t_sft > f64::from(u32::MAX) {
        return Err(SftError::InvalidArgument(format!(
            "cannot name SFT with resolution {}",
            sft.delta_f
        )));
    }
    Ok(t_sft as u32)
}

fn start_seconds(sft: &Sft) -> Result<u32> {
    u32::try_from(sft.epoch.seconds).map_err(|_| {
        SftError::InvalidArgument(format!("cannot name SFT with epoch {}", sft.epoch))
    })
}
