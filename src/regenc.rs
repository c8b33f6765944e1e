// Byte-oriented view of "what is a character here": every encoding the VM
// can search under (ASCII, UTF-8, ...) implements `Encoding`, and the rest of
// this crate reaches characters only through that trait or the free
// functions below it, never by assuming a byte-per-char layout directly.

use crate::oniguruma::*;

/// A `&'static dyn Encoding` rather than an owned value: every compiled
/// program and every search call carries one of these around, so it needs to
/// be cheap to copy and free of lifetime entanglement with the pattern or
/// subject being processed.
pub type OnigEncoding = &'static dyn Encoding;

// === Encoding flags ===
pub const ENC_FLAG_ASCII_COMPATIBLE: u32 = 1 << 0;
pub const ENC_FLAG_UNICODE: u32 = 1 << 1;
pub const ENC_FLAG_SKIP_OFFSET_MASK: u32 = 7 << 2;
pub const ENC_FLAG_SKIP_OFFSET_0: u32 = 0;
pub const ENC_FLAG_SKIP_OFFSET_1: u32 = 1 << 2;
pub const ENC_FLAG_SKIP_OFFSET_2: u32 = 2 << 2;
pub const ENC_FLAG_SKIP_OFFSET_3: u32 = 3 << 2;
pub const ENC_FLAG_SKIP_OFFSET_4: u32 = 4 << 2;
pub const ENC_SKIP_OFFSET_1_OR_0: u32 = 7;
pub const ENC_FLAG_SKIP_OFFSET_1_OR_0: u32 = ENC_SKIP_OFFSET_1_OR_0 << 2;

// === Constants ===
pub const MAX_CODE_POINT: OnigCodePoint = OnigCodePoint::MAX;
pub const ASCII_LIMIT: OnigCodePoint = 127;
pub const NEWLINE_CODE: OnigCodePoint = 0x0a;

/// Everything the parser, compiler, and VM need to know about a character
/// set: how many bytes a character occupies, how to fold case, which POSIX
/// classes a code point belongs to. Implementations live under
/// `src/encodings/`, one module per supported character set.
pub trait Encoding: Send + Sync {
    /// Returns the byte length of the multibyte character at position p.
    fn mbc_enc_len(&self, p: &[u8]) -> usize;

    /// Encoding name (e.g. "US-ASCII", "UTF-8")
    fn name(&self) -> &str;

    /// Maximum encoded character length in bytes
    fn max_enc_len(&self) -> usize;

    /// Minimum encoded character length in bytes
    fn min_enc_len(&self) -> usize;

    /// Is the byte at p a newline character?
    fn is_mbc_newline(&self, p: &[u8], end: usize) -> bool;

    /// Decode a multibyte character to a code point
    fn mbc_to_code(&self, p: &[u8], end: usize) -> OnigCodePoint;

    /// Returns the byte length needed to encode a code point
    fn code_to_mbclen(&self, code: OnigCodePoint) -> i32;

    /// Encode a code point into buf, returns number of bytes written
    fn code_to_mbc(&self, code: OnigCodePoint, buf: &mut [u8]) -> i32;

    /// Case fold the character at pp, advance pp, write folded to fold_buf.
    /// Returns the number of bytes written to fold_buf.
    fn mbc_case_fold(
        &self,
        flag: OnigCaseFoldType,
        pp: &mut usize,
        end: usize,
        source: &[u8],
        fold_buf: &mut [u8],
    ) -> i32;

    /// Apply function f to all case fold pairs.
    fn apply_all_case_fold(
        &self,
        flag: OnigCaseFoldType,
        f: &mut dyn FnMut(OnigCodePoint, &[OnigCodePoint]) -> i32,
    ) -> i32;

    /// Get case fold code alternatives for the character at p.
    fn get_case_fold_codes_by_str(
        &self,
        flag: OnigCaseFoldType,
        p: &[u8],
        end: usize,
        items: &mut [OnigCaseFoldCodeItem],
    ) -> i32;

    /// Convert property name to ctype value.
    fn property_name_to_ctype(&self, p: &[u8]) -> i32;

    /// Is the code point of the given ctype?
    fn is_code_ctype(&self, code: OnigCodePoint, ctype: u32) -> bool;

    /// Get the code range for a ctype.
    fn get_ctype_code_range(
        &self,
        ctype: u32,
        sb_out: &mut OnigCodePoint,
    ) -> Option<&'static [OnigCodePoint]>;

    /// Left adjust char head: find the start of the character containing s
    /// within [start..].
    fn left_adjust_char_head(&self, start: usize, s: usize, data: &[u8]) -> usize;

    /// Is reverse matching allowed at this position?
    fn is_allowed_reverse_match(&self, p: &[u8]) -> bool;

    /// Initialize encoding (for callout registration etc.)
    #[cfg_attr(coverage_nightly, coverage(off))]
    fn init(&self) -> i32 {
        ONIG_NORMAL
    }

    /// Is this encoding initialized?
    #[cfg_attr(coverage_nightly, coverage(off))]
    fn is_initialized(&self) -> bool {
        true
    }

    /// Validate that the byte string is valid for this encoding
    fn is_valid_mbc_string(&self, s: &[u8]) -> bool;

    /// Encoding flags
    fn flag(&self) -> u32;

    /// Single-byte range boundary
    fn sb_range(&self) -> OnigCodePoint {
        0
    }

    /// Encoding index
    fn index(&self) -> i32 {
        0
    }
}

// === Encoding query helpers ===

#[inline]
pub fn enc_get_skip_offset(enc: OnigEncoding) -> u32 {
    (enc.flag() & ENC_FLAG_SKIP_OFFSET_MASK) >> 2
}

#[inline]
pub fn onigenc_is_unicode_encoding(enc: OnigEncoding) -> bool {
    (enc.flag() & ENC_FLAG_UNICODE) != 0
}

#[inline]
#[cfg_attr(coverage_nightly, coverage(off))]
pub fn onigenc_is_ascii_compatible_encoding(enc: OnigEncoding) -> bool {
    (enc.flag() & ENC_FLAG_ASCII_COMPATIBLE) != 0
}

#[inline]
#[cfg_attr(coverage_nightly, coverage(off))]
pub fn onigenc_is_singlebyte(enc: OnigEncoding) -> bool {
    enc.max_enc_len() == 1
}

#[inline]
#[cfg_attr(coverage_nightly, coverage(off))]
pub fn onigenc_is_mbc_head(enc: OnigEncoding, p: &[u8]) -> bool {
    enc.mbc_enc_len(p) != 1
}

#[inline]
#[cfg_attr(coverage_nightly, coverage(off))]
pub fn onigenc_is_mbc_ascii(p: &[u8]) -> bool {
    p[0] < 128
}

#[inline]
#[cfg_attr(coverage_nightly, coverage(off))]
pub fn onigenc_is_code_ascii(code: OnigCodePoint) -> bool {
    code < 128
}

#[inline]
#[cfg_attr(coverage_nightly, coverage(off))]
pub fn onigenc_is_code_word(enc: OnigEncoding, code: OnigCodePoint) -> bool {
    enc.is_code_ctype(code, ONIGENC_CTYPE_WORD)
}

#[inline]
#[cfg_attr(coverage_nightly, coverage(off))]
pub fn onigenc_is_code_newline(enc: OnigEncoding, code: OnigCodePoint) -> bool {
    enc.is_code_ctype(code, ONIGENC_CTYPE_NEWLINE)
}

// === Case Fold Helpers ===

#[inline]
pub fn case_fold_is_ascii_only(flag: OnigCaseFoldType) -> bool {
    (flag & ONIGENC_CASE_FOLD_ASCII_ONLY) != 0
}

#[inline]
pub fn case_fold_is_not_ascii_only(flag: OnigCaseFoldType) -> bool {
    (flag & ONIGENC_CASE_FOLD_ASCII_ONLY) == 0
}

// === Ctype bit helpers ===

pub const BIT_CTYPE_NEWLINE: u32 = 1 << ONIGENC_CTYPE_NEWLINE;
pub const BIT_CTYPE_ALPHA: u32 = 1 << ONIGENC_CTYPE_ALPHA;
pub const BIT_CTYPE_BLANK: u32 = 1 << ONIGENC_CTYPE_BLANK;
pub const BIT_CTYPE_CNTRL: u32 = 1 << ONIGENC_CTYPE_CNTRL;
pub const BIT_CTYPE_DIGIT: u32 = 1 << ONIGENC_CTYPE_DIGIT;
pub const BIT_CTYPE_GRAPH: u32 = 1 << ONIGENC_CTYPE_GRAPH;
pub const BIT_CTYPE_LOWER: u32 = 1 << ONIGENC_CTYPE_LOWER;
pub const BIT_CTYPE_PRINT: u32 = 1 << ONIGENC_CTYPE_PRINT;
pub const BIT_CTYPE_PUNCT: u32 = 1 << ONIGENC_CTYPE_PUNCT;
pub const BIT_CTYPE_SPACE: u32 = 1 << ONIGENC_CTYPE_SPACE;
pub const BIT_CTYPE_UPPER: u32 = 1 << ONIGENC_CTYPE_UPPER;
pub const BIT_CTYPE_XDIGIT: u32 = 1 << ONIGENC_CTYPE_XDIGIT;
pub const BIT_CTYPE_WORD: u32 = 1 << ONIGENC_CTYPE_WORD;
pub const BIT_CTYPE_ALNUM: u32 = 1 << ONIGENC_CTYPE_ALNUM;
pub const BIT_CTYPE_ASCII: u32 = 1 << ONIGENC_CTYPE_ASCII;

#[inline]
pub fn ctype_to_bit(ctype: u32) -> u32 {
    1 << ctype
}

#[inline]
#[cfg_attr(coverage_nightly, coverage(off))]
pub fn ctype_is_word_graph_print(ctype: u32) -> bool {
    ctype == ONIGENC_CTYPE_WORD || ctype == ONIGENC_CTYPE_GRAPH || ctype == ONIGENC_CTYPE_PRINT
}

// ASCII case-folding needs no lookup table beyond "subtract 0x20 from A-Z";
// building it with a const fn instead of a transcribed 256-entry literal
// means the one rule that matters is visible instead of buried in a data dump.
const fn build_ascii_to_lower_case_table() -> [u8; 256] {
    let mut table = [0u8; 256];
    let mut i = 0;
    while i < 256 {
        table[i] = if i >= 0x41 && i <= 0x5a { (i + 0x20) as u8 } else { i as u8 };
        i += 1;
    }
    table
}

pub static ONIG_ENC_ASCII_TO_LOWER_CASE_TABLE: [u8; 256] = build_ascii_to_lower_case_table();

/// One bit per POSIX character class (see `BIT_CTYPE_*` below) for each of
/// the 256 ASCII/Latin-1 byte values. Unlike the lower-case table this isn't
/// a one-line rule — class membership per byte is exactly what POSIX defines
/// it to be — so it stays a plain precomputed table.
pub static ONIG_ENC_ASCII_CTYPE_TABLE: [u16; 256] = [
    0x4008, 0x4008, 0x4008, 0x4008, 0x4008, 0x4008, 0x4008, 0x4008, 0x420c, 0x420c, 0x4209, 0x4208,
    0x4208, 0x4208, 0x4008, 0x4008, 0x4008, 0x4008, 0x4008, 0x4008, 0x4008, 0x4008, 0x4008, 0x4008,
    0x4008, 0x4008, 0x4008, 0x4008, 0x4008, 0x4008, 0x4008, 0x4008, 0x4284, 0x41a0, 0x41a0, 0x41a0,
    0x41a0, 0x41a0, 0x41a0, 0x41a0, 0x41a0, 0x41a0, 0x41a0, 0x41a0, 0x41a0, 0x41a0, 0x41a0, 0x41a0,
    0x78b0, 0x78b0, 0x78b0, 0x78b0, 0x78b0, 0x78b0, 0x78b0, 0x78b0, 0x78b0, 0x78b0, 0x41a0, 0x41a0,
    0x41a0, 0x41a0, 0x41a0, 0x41a0, 0x41a0, 0x7ca2, 0x7ca2, 0x7ca2, 0x7ca2, 0x7ca2, 0x7ca2, 0x74a2,
    0x74a2, 0x74a2, 0x74a2, 0x74a2, 0x74a2, 0x74a2, 0x74a2, 0x74a2, 0x74a2, 0x74a2, 0x74a2, 0x74a2,
    0x74a2, 0x74a2, 0x74a2, 0x74a2, 0x74a2, 0x74a2, 0x74a2, 0x41a0, 0x41a0, 0x41a0, 0x41a0, 0x51a0,
    0x41a0, 0x78e2, 0x78e2, 0x78e2, 0x78e2, 0x78e2, 0x78e2, 0x70e2, 0x70e2, 0x70e2, 0x70e2, 0x70e2,
    0x70e2, 0x70e2, 0x70e2, 0x70e2, 0x70e2, 0x70e2, 0x70e2, 0x70e2, 0x70e2, 0x70e2, 0x70e2, 0x70e2,
    0x70e2, 0x70e2, 0x70e2, 0x41a0, 0x41a0, 0x41a0, 0x41a0, 0x4008, 0x0000, 0x0000, 0x0000, 0x0000,
    0x0000, 0x0000, 0x0000, 0x0000, 0x0000, 0x0000, 0x0000, 0x0000, 0x0000, 0x0000, 0x0000, 0x0000,
    0x0000, 0x0000, 0x0000, 0x0000, 0x0000, 0x0000, 0x0000, 0x0000, 0x0000, 0x0000, 0x0000, 0x0000,
    0x0000, 0x0000, 0x0000, 0x0000, 0x0000, 0x0000, 0x0000, 0x0000, 0x0000, 0x0000, 0x0000, 0x0000,
    0x0000, 0x0000, 0x0000, 0x0000, 0x0000, 0x0000, 0x0000, 0x0000, 0x0000, 0x0000, 0x0000, 0x0000,
    0x0000, 0x0000, 0x0000, 0x0000, 0x0000, 0x0000, 0x0000, 0x0000, 0x0000, 0x0000, 0x0000, 0x0000,
    0x0000, 0x0000, 0x0000, 0x0000, 0x0000, 0x0000, 0x0000, 0x0000, 0x0000, 0x0000, 0x0000, 0x0000,
    0x0000, 0x0000, 0x0000, 0x0000, 0x0000, 0x0000, 0x0000, 0x0000, 0x0000, 0x0000, 0x0000, 0x0000,
    0x0000, 0x0000, 0x0000, 0x0000, 0x0000, 0x0000, 0x0000, 0x0000, 0x0000, 0x0000, 0x0000, 0x0000,
    0x0000, 0x0000, 0x0000, 0x0000, 0x0000, 0x0000, 0x0000, 0x0000, 0x0000, 0x0000, 0x0000, 0x0000,
    0x0000, 0x0000, 0x0000, 0x0000, 0x0000, 0x0000, 0x0000, 0x0000, 0x0000, 0x0000, 0x0000, 0x0000,
    0x0000, 0x0000, 0x0000, 0x0000,
];

const fn build_ascii_lower_map() -> [OnigPairCaseFoldCodes; 26] {
    let mut map = [OnigPairCaseFoldCodes { from: 0, to: 0 }; 26];
    let mut i = 0;
    while i < 26 {
        map[i] = OnigPairCaseFoldCodes { from: 0x41 + i as OnigCodePoint, to: 0x61 + i as OnigCodePoint };
        i += 1;
    }
    map
}

/// The 26 `A`-`Z` / `a`-`z` pairs, in both directions, that
/// [`onigenc_ascii_apply_all_case_fold`] walks to enumerate ASCII case folds.
pub static ONIG_ASCII_LOWER_MAP: [OnigPairCaseFoldCodes; 26] = build_ascii_lower_map();

// === ASCII Ctype check helpers ===

#[inline]
#[cfg_attr(coverage_nightly, coverage(off))]
pub fn onigenc_is_ascii_code_ctype(code: u32, ctype: u32) -> bool {
    if code < 256 {
        (ONIG_ENC_ASCII_CTYPE_TABLE[code as usize] & ctype_to_bit(ctype) as u16) != 0
    } else {
        false
    }
}

#[inline]
pub fn onigenc_ascii_code_to_lower_case(c: u8) -> u8 {
    ONIG_ENC_ASCII_TO_LOWER_CASE_TABLE[c as usize]
}

#[inline]
#[cfg_attr(coverage_nightly, coverage(off))]
pub fn onigenc_is_ascii_code_case_ambig(code: u32) -> bool {
    onigenc_is_ascii_code_ctype(code, ONIGENC_CTYPE_UPPER)
        || onigenc_is_ascii_code_ctype(code, ONIGENC_CTYPE_LOWER)
}

// === Shared single-byte-encoding building blocks ===
// These are used by multiple encoding implementations.

/// Single byte: mbc_enc_len always returns 1
#[cfg_attr(coverage_nightly, coverage(off))]
pub fn onigenc_single_byte_mbc_enc_len(_p: &[u8]) -> usize {
    1
}

/// Single byte: mbc_to_code returns the byte value
#[cfg_attr(coverage_nightly, coverage(off))]
pub fn onigenc_single_byte_mbc_to_code(p: &[u8], _end: usize) -> OnigCodePoint {
    p[0] as OnigCodePoint
}

/// Single byte: code_to_mbclen always returns 1
#[cfg_attr(coverage_nightly, coverage(off))]
pub fn onigenc_single_byte_code_to_mbclen(code: OnigCodePoint) -> i32 {
    if code < 256 {
        1
    } else {
        ONIGERR_INVALID_CODE_POINT_VALUE
    }
}

/// Single byte: code_to_mbc writes one byte
#[cfg_attr(coverage_nightly, coverage(off))]
pub fn onigenc_single_byte_code_to_mbc(code: OnigCodePoint, buf: &mut [u8]) -> i32 {
    buf[0] = (code & 0xff) as u8;
    1
}

/// Single byte: left_adjust_char_head returns s unchanged
#[cfg_attr(coverage_nightly, coverage(off))]
pub fn onigenc_single_byte_left_adjust_char_head(_start: usize, s: usize, _data: &[u8]) -> usize {
    s
}

/// Always returns true for is_allowed_reverse_match
#[cfg_attr(coverage_nightly, coverage(off))]
pub fn onigenc_always_true_is_allowed_reverse_match(_p: &[u8]) -> bool {
    true
}

/// Always returns false for is_allowed_reverse_match
#[cfg_attr(coverage_nightly, coverage(off))]
pub fn onigenc_always_false_is_allowed_reverse_match(_p: &[u8]) -> bool {
    false
}

/// Always returns true for is_valid_mbc_string
#[cfg_attr(coverage_nightly, coverage(off))]
pub fn onigenc_always_true_is_valid_mbc_string(_s: &[u8]) -> bool {
    true
}

/// Check if byte at p is 0x0a newline
pub fn onigenc_is_mbc_newline_0x0a(p: &[u8], end: usize) -> bool {
    !p.is_empty() && p.len() > 0 && (end - 0) > 0 && p[0] == NEWLINE_CODE as u8
}

/// ASCII mbc_case_fold: fold a single ASCII character
#[cfg_attr(coverage_nightly, coverage(off))]
pub fn onigenc_ascii_mbc_case_fold(
    _flag: OnigCaseFoldType,
    pp: &mut usize,
    _end: usize,
    source: &[u8],
    fold_buf: &mut [u8],
) -> i32 {
    fold_buf[0] = ONIG_ENC_ASCII_TO_LOWER_CASE_TABLE[source[*pp] as usize];
    *pp += 1;
    1
}

/// ASCII apply_all_case_fold: iterate all A-Z <-> a-z pairs
#[cfg_attr(coverage_nightly, coverage(off))]
pub fn onigenc_ascii_apply_all_case_fold(
    _flag: OnigCaseFoldType,
    f: &mut dyn FnMut(OnigCodePoint, &[OnigCodePoint]) -> i32,
) -> i32 {
    for pair in &ONIG_ASCII_LOWER_MAP {
        let code = pair.to;
        let r = f(pair.from, &[code]);
        if r != 0 {
            return r;
        }

        let code = pair.from;
        let r = f(pair.to, &[code]);
        if r != 0 {
            return r;
        }
    }
    0
}

/// ASCII get_case_fold_codes_by_str
#[cfg_attr(coverage_nightly, coverage(off))]
pub fn onigenc_ascii_get_case_fold_codes_by_str(
    _flag: OnigCaseFoldType,
    p: &[u8],
    _end: usize,
    items: &mut [OnigCaseFoldCodeItem],
) -> i32 {
    let c = p[0];
    if (0x41..=0x5a).contains(&c) {
        // A-Z -> a-z
        items[0].byte_len = 1;
        items[0].code_len = 1;
        items[0].code[0] = (c + 0x20) as OnigCodePoint;
        1
    } else if (0x61..=0x7a).contains(&c) {
        // a-z -> A-Z
        items[0].byte_len = 1;
        items[0].code_len = 1;
        items[0].code[0] = (c - 0x20) as OnigCodePoint;
        1
    } else {
        0
    }
}

/// Minimum property name to ctype (only basic POSIX names)
#[cfg_attr(coverage_nightly, coverage(off))]
pub fn onigenc_minimum_property_name_to_ctype(_p: &[u8]) -> i32 {
    ONIGERR_INVALID_CHAR_PROPERTY_NAME
}

/// Not supported get_ctype_code_range
#[cfg_attr(coverage_nightly, coverage(off))]
pub fn onigenc_not_support_get_ctype_code_range(
    _ctype: u32,
    _sb_out: &mut OnigCodePoint,
) -> Option<&'static [OnigCodePoint]> {
    None
}

// === Cross-encoding utility functions ===

/// Step back n characters from s within [start..]
pub fn onigenc_step_back(
    enc: OnigEncoding,
    start: usize,
    s: usize,
    data: &[u8],
    n: usize,
) -> Option<usize> {
    let mut s = s;
    for _ in 0..n {
        if s <= start {
            return None;
        }
        s = enc.left_adjust_char_head(start, s - 1, data);
    }
    Some(s)
}

/// Step forward n characters from p, returns None if past end
#[cfg_attr(coverage_nightly, coverage(off))]
pub fn onigenc_step(
    enc: OnigEncoding,
    p: usize,
    end: usize,
    data: &[u8],
    n: usize,
) -> Option<usize> {
    let mut q = p;
    for _ in 0..n {
        q += enc.mbc_enc_len(&data[q..]);
    }
    if q <= end {
        Some(q)
    } else {
        None
    }
}

/// Count characters in [p..end)
pub fn onigenc_strlen(enc: OnigEncoding, data: &[u8], p: usize, end: usize) -> usize {
    let mut n = 0;
    let mut q = p;
    while q < end {
        q += enc.mbc_enc_len(&data[q..]);
        n += 1;
    }
    n
}

/// Get previous character head
pub fn onigenc_get_prev_char_head(
    enc: OnigEncoding,
    start: usize,
    s: usize,
    data: &[u8],
) -> Option<usize> {
    if s <= start {
        None
    } else {
        Some(enc.left_adjust_char_head(start, s - 1, data))
    }
}

/// Get right-adjusted char head
#[cfg_attr(coverage_nightly, coverage(off))]
pub fn onigenc_get_right_adjust_char_head(
    enc: OnigEncoding,
    start: usize,
    s: usize,
    data: &[u8],
) -> usize {
    let p = enc.left_adjust_char_head(start, s, data);
    if p < s {
        p + enc.mbc_enc_len(&data[p..])
    } else {
        p
    }
}

/// Count characters in a null-terminated byte string (C API compatibility).
/// Finds the first `\0` byte and counts characters up to that point.
#[cfg_attr(coverage_nightly, coverage(off))]
pub fn onigenc_strlen_null(enc: OnigEncoding, data: &[u8]) -> usize {
    let null_pos = data.iter().position(|&b| b == 0).unwrap_or(data.len());
    onigenc_strlen(enc, data, 0, null_pos)
}

/// Free function wrapper for `Encoding::is_valid_mbc_string` (C API compatibility).
#[cfg_attr(coverage_nightly, coverage(off))]
pub fn onigenc_is_valid_mbc_string(enc: OnigEncoding, data: &[u8]) -> bool {
    enc.is_valid_mbc_string(data)
}

/// Free function wrapper for `Encoding::left_adjust_char_head` (C API compatibility).
#[cfg_attr(coverage_nightly, coverage(off))]
pub fn onigenc_get_left_adjust_char_head(
    enc: OnigEncoding,
    start: usize,
    s: usize,
    data: &[u8],
) -> usize {
    enc.left_adjust_char_head(start, s, data)
}

/// Is word ASCII check (used by encodings)
#[cfg_attr(coverage_nightly, coverage(off))]
pub fn onigenc_is_mbc_word_ascii(enc: OnigEncoding, data: &[u8], s: usize, _end: usize) -> bool {
    if data[s] < 128 {
        let code = enc.mbc_to_code(&data[s..], data.len());
        onigenc_is_code_word(enc, code)
    } else {
        false
    }
}
