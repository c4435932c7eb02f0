//! Byte-level encoding for integer and fixed-width string fields.
//!
//! Integers are little-endian two's-complement at 1, 2 or 4 bytes. Writes
//! accept any `i64` and fold it into the field's range before encoding.
//! Strings occupy a fixed run of bytes; reads stop at the first `0x00`.

/// Largest integer width supported by a field, in bytes.
pub const MAX_INT_BYTES: usize = 4;

/// Terminator byte for fixed-width strings.
pub const TERMINATOR: u8 = 0;

/// Fold `value` into an unsigned field of `bytes` width (`value mod 2^w`).
pub fn wrap_unsigned(value: i64, bytes: u32) -> u64 {
    let mask = (1u64 << (bytes * 8)) - 1;
    (value as u64) & mask
}

/// Fold `value` into a signed field of `bytes` width.
///
/// Positive overflow wraps two's-complement (`128 -> -128` at 8 bits).
/// Negative overflow folds to `(max - 1) + (value rem max)`, so `-129`
/// lands on `126` at 8 bits. In-range values are returned unchanged.
pub fn wrap_signed(value: i64, bytes: u32) -> i64 {
    let max = 1i64 << (bytes * 8 - 1);
    if value < -max {
        (max - 1) + (value % max)
    } else if value > max - 1 {
        -max + (value % max)
    } else {
        value
    }
}

/// Encode the low `bytes` bytes of `raw` little-endian.
pub fn encode_le(raw: u64, bytes: u32) -> [u8; MAX_INT_BYTES] {
    let mut out = [0u8; MAX_INT_BYTES];
    for (i, slot) in out.iter_mut().enumerate().take(bytes as usize) {
        *slot = (raw >> (i * 8)) as u8;
    }
    out
}

/// Decode an unsigned little-endian integer from `src`.
pub fn decode_unsigned(src: &[u8]) -> u64 {
    src.iter()
        .enumerate()
        .fold(0u64, |acc, (i, &b)| acc | ((b as u64) << (i * 8)))
}

/// Decode a signed little-endian integer from `src`, sign-extending the top bit.
pub fn decode_signed(src: &[u8]) -> i64 {
    let raw = decode_unsigned(src);
    let bits = src.len() as u32 * 8;
    if bits == 0 {
        return 0;
    }
    let shift = 64 - bits;
    ((raw << shift) as i64) >> shift
}

/// Text encoding used by a fixed-width string field.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash)]
pub enum StringEncoding {
    /// UTF-8; invalid sequences decode to U+FFFD.
    #[default]
    Utf8,
    /// ISO-8859-1: one byte per code point up to U+00FF.
    Latin1,
    /// 7-bit ASCII; the high bit is ignored on read.
    Ascii,
}

impl StringEncoding {
    /// Encode `text`. Code points the encoding cannot represent become `?`.
    pub fn encode(self, text: &str) -> Vec<u8> {
        match self {
            Self::Utf8 => text.as_bytes().to_vec(),
            Self::Latin1 => text
                .chars()
                .map(|c| u8::try_from(c as u32).unwrap_or(b'?'))
                .collect(),
            Self::Ascii => text
                .chars()
                .map(|c| if c.is_ascii() { c as u8 } else { b'?' })
                .collect(),
        }
    }

    /// Decode `bytes` in full (no terminator handling).
    pub fn decode(self, bytes: &[u8]) -> String {
        match self {
            Self::Utf8 => String::from_utf8_lossy(bytes).into_owned(),
            Self::Latin1 => bytes.iter().map(|&b| b as char).collect(),
            Self::Ascii => bytes.iter().map(|&b| (b & 0x7F) as char).collect(),
        }
    }
}

/// Decode a fixed-width string, truncating at the first terminator.
///
/// If no terminator is present the whole run is decoded.
pub fn decode_fixed(bytes: &[u8], encoding: StringEncoding) -> String {
    let end = bytes
        .iter()
        .position(|&b| b == TERMINATOR)
        .unwrap_or(bytes.len());
    encoding.decode(&bytes[..end])
}

/// Encode `text` for a field of `width` bytes.
///
/// The result is at most `width` bytes long. Text shorter than the field is
/// followed by a single terminator; bytes after it are left for the caller
/// not to touch.
pub fn encode_fixed(text: &str, width: u32, encoding: StringEncoding) -> Vec<u8> {
    let mut bytes = encoding.encode(text);
    let width = width as usize;
    if bytes.len() >= width {
        bytes.truncate(width);
    } else {
        bytes.push(TERMINATOR);
    }
    bytes
}
