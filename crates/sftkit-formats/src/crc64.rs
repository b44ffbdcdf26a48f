//! CRC-64 checksum used by version-2 SFT blocks
//!
//! The checksum is the reflected CRC-64 with polynomial `0xD800000000000000`
//! (the ISO 3309 polynomial `0x1B` bit-reversed), started from all ones and
//! without a final XOR. It is computed incrementally over the raw on-disk
//! bytes of a block:
//!
//! ```text
//! header (48 bytes, crc64 field zeroed)
//! comment (comment_length bytes, NUL terminated)
//! padding (zero bytes up to a multiple of 8, part of comment_length)
//! data (nsamples * 8 bytes)
//! ```
//!
//! Byte order matters: the checksum is taken over the bytes exactly as they
//! appear in the file, before any endian conversion.

/// Reflected form of the ISO 3309 CRC-64 polynomial
pub const CRC64_POLY: u64 = 0xD800_0000_0000_0000;

/// Initial value for a fresh checksum
pub const CRC64_INIT: u64 = !0;

/// Lookup table, built at compile time and shared read-only.
static CRC64_TABLE: [u64; 256] = build_table();

const fn build_table() -> [u64; 256] {
    let mut table = [0u64; 256];
    let mut i = 0;
    while i < 256 {
        let mut part = i as u64;
        let mut bit = 0;
        while bit < 8 {
            part = if part & 1 == 0 {
                part >> 1
            } else {
                (part >> 1) ^ CRC64_POLY
            };
            bit += 1;
        }
        table[i] = part;
        i += 1;
    }
    table
}

/// Fold `data` into a running checksum.
///
/// An empty slice returns `crc` unchanged, so calls can be chained freely.
pub fn crc64(data: &[u8], crc: u64) -> u64 {
    data.iter().fold(crc, |crc, &byte| {
        (crc >> 8) ^ CRC64_TABLE[((crc ^ u64::from(byte)) & 0xff) as usize]
    })
}

/// Incremental checksum state.
///
/// Convenience wrapper around [`crc64`] for code that feeds a block piece by
/// piece.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Crc64 {
    value: u64,
}

impl Crc64 {
    /// Start a new checksum.
    pub const fn new() -> Self {
        Self { value: CRC64_INIT }
    }

    /// Feed more bytes.
    pub fn update(&mut self, data: &[u8]) {
        self.value = crc64(data, self.value);
    }

    /// Current checksum value.
    pub const fn value(&self) -> u64 {
        self.value
    }
}

impl Default for Crc64 {
    fn default() -> Self {
        Self::new()
    }
}
