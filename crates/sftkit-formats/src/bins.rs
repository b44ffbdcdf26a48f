//! Frequency to bin conversions
//!
//! Bin `k` of an SFT with resolution `df` sits at frequency `k * df`.
//! Requested band edges rarely land exactly on a bin, and `f / df` carries
//! floating-point noise, so the edges are rounded with a relative fudge of
//! `10 * f64::EPSILON` (about `2e-15`): a lower edge a hair below a bin still
//! maps to that bin, and likewise for an upper edge a hair above one.

/// Relative fudge applied when rounding a lower edge down
pub const FUDGE_UP: f64 = 1.0 + 10.0 * f64::EPSILON;

/// Relative fudge applied when rounding an upper edge up
pub const FUDGE_DOWN: f64 = 1.0 - 10.0 * f64::EPSILON;

/// Round `freq` down to the bin containing it.
pub fn round_frequency_down_to_bin(freq: f64, df: f64) -> u32 {
    let ratio = freq / df;
    (ratio * FUDGE_UP).floor() as u32
}

/// Round `freq` up to the next bin boundary.
pub fn round_frequency_up_to_bin(freq: f64, df: f64) -> u32 {
    let ratio = freq / df;
    (ratio * FUDGE_DOWN).ceil() as u32
}

/// Bin index nearest to `freq`, as stored in headers.
pub fn nearest_bin(freq: f64, df: f64) -> u32 {
    (freq / df).round() as u32
}

/// Smallest run of bins covering `[f_min, f_min + band]` at baseline `t_sft`.
///
/// Both edges are included, so a zero band still yields one bin. Returns
/// `(first_bin, num_bins)`.
pub fn covering_bins(f_min: f64, band: f64, t_sft: f64) -> (u32, u32) {
    let df = 1.0 / t_sft;
    let first = round_frequency_down_to_bin(f_min, df);
    let last = round_frequency_up_to_bin(f_min + band, df).max(first);
    (first, last - first + 1)
}
