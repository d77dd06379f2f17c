//! Temporal-macro detection over sentinel-padded buffers.
//!
//! Finds whole-token occurrences of `__DATE__`, `__TIME__` and
//! `__TIMESTAMP__` in preprocessed source. This runs on every input file on
//! every cache lookup, so both search paths are tuned for throughput:
//!
//! - **Scalar**: Boyer-Moore-Horspool over the union of the three 8-byte
//!   needle prefixes, with a cheap two-byte candidate filter (`'E'` at the
//!   fifth macro character, `'_'` at the first) before the full verifier.
//! - **Vectorized**: AVX2, 32 bytes per iteration. Two 32-byte loads (offset
//!   0 and offset 5) are compared against broadcast `'_'` and `'E'`; the
//!   AND of the equality masks marks candidate positions, extracted
//!   low-to-high from the movemask. Inspired by
//!   <http://0x80.pl/articles/simd-strfind.html>.
//!
//! Both paths feed the same verifier and return identical masks for
//! identical input. The vectorized path is selected at runtime when the CPU
//! supports AVX2; everything else uses the scalar path.
//!
//! # Buffer contract
//! The [`PaddedBuffer`] sentinels make the inner loops branch-free: the
//! verifier reads one byte before a candidate (head sentinel `b'\n'` at live
//! index -1) and one byte after it (trailing NUL at live index `size()`),
//! and the AVX2 loads may extend up to 28 bytes past the live region, all
//! inside the allocation. Both sentinel values are non-identifier bytes, so
//! matches touching either end of the buffer pass the token-boundary test
//! without extra branches.

use crate::padded_buffer::{PaddedBuffer, HEAD_PAD};

/// Bitmask of temporal macros found in a buffer.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct TemporalFindings(u8);

impl TemporalFindings {
    /// No temporal macros.
    pub const NONE: Self = Self(0);
    /// `__DATE__` occurs as a whole token.
    pub const DATE: Self = Self(1 << 0);
    /// `__TIME__` occurs as a whole token.
    pub const TIME: Self = Self(1 << 1);
    /// `__TIMESTAMP__` occurs as a whole token.
    pub const TIMESTAMP: Self = Self(1 << 2);

    /// Returns `true` when every bit of `other` is set in `self`.
    #[inline]
    pub fn contains(self, other: Self) -> bool {
        self.0 & other.0 == other.0
    }

    /// Returns `true` when no macro was found.
    #[inline]
    pub fn is_empty(self) -> bool {
        self.0 == 0
    }

    /// The raw mask, for callers that persist findings compactly.
    #[inline]
    pub fn bits(self) -> u8 {
        self.0
    }
}

impl std::ops::BitOr for TemporalFindings {
    type Output = Self;

    #[inline]
    fn bitor(self, rhs: Self) -> Self {
        Self(self.0 | rhs.0)
    }
}

impl std::ops::BitOrAssign for TemporalFindings {
    #[inline]
    fn bitor_assign(&mut self, rhs: Self) {
        self.0 |= rhs.0;
    }
}

/// Length of the tracked needle window.
///
/// `__DATE__` and `__TIME__` fit entirely; `__TIMESTAMP__` is tracked by its
/// first 8 bytes (`__TIMEST`) and disambiguated by the verifier.
const NEEDLE_LEN: usize = 8;

/// The three 8-byte windows the search loops look for.
const NEEDLE_PREFIXES: [&[u8; NEEDLE_LEN]; 3] = [b"__DATE__", b"__TIME__", b"__TIMEST"];

/// Boyer-Moore-Horspool skip distances for the union of the needle prefixes.
///
/// `MACRO_SKIP[c]` is how far the cursor may advance after seeing byte `c` at
/// the end of the current window without skipping past a match of any needle:
/// the classical Horspool skip (`NEEDLE_LEN - 1 - i` for the last occurrence
/// at position `i < NEEDLE_LEN - 1`), minimized across the three needles.
static MACRO_SKIP: [u8; 256] = build_skip_table();

const fn build_skip_table() -> [u8; 256] {
    let mut table = [NEEDLE_LEN as u8; 256];
    let mut n = 0;
    while n < NEEDLE_PREFIXES.len() {
        let mut i = 0;
        while i < NEEDLE_LEN - 1 {
            let skip = (NEEDLE_LEN - 1 - i) as u8;
            let c = NEEDLE_PREFIXES[n][i] as usize;
            if skip < table[c] {
                table[c] = skip;
            }
            i += 1;
        }
        n += 1;
    }
    table
}

/// Identifier continuation bytes: `[A-Za-z0-9_]`.
#[inline]
fn is_ident_byte(b: u8) -> bool {
    b == b'_' || b.is_ascii_alphanumeric()
}

/// Verifies a candidate match and applies the token-boundary test.
///
/// `p` is the live index of the byte just after the leading `__` (so the
/// candidate macro starts at `p - 1`, and `padded[p + HEAD_PAD - 1]` is known
/// to be `'_'`). A candidate is accepted only when the byte before the first
/// underscore and the byte after the trailing underscore are both
/// non-identifier bytes; the sentinels cover candidates at either end of the
/// buffer.
#[inline]
fn verify_candidate(padded: &[u8], size: usize, p: usize) -> TemporalFindings {
    let remaining = size.saturating_sub(p);
    if remaining < 7 {
        return TemporalFindings::NONE;
    }

    let tail = &padded[HEAD_PAD + p..];
    let (found, match_len) = if &tail[..7] == b"_DATE__" {
        (TemporalFindings::DATE, 7)
    } else if &tail[..7] == b"_TIME__" {
        (TemporalFindings::TIME, 7)
    } else if remaining >= 12 && &tail[..12] == b"_TIMESTAMP__" {
        (TemporalFindings::TIMESTAMP, 12)
    } else {
        return TemporalFindings::NONE;
    };

    // p >= 1 on both search paths, so `p - 2` bottoms out at the head
    // sentinel and `p + match_len` tops out at the first trailing sentinel.
    let before = padded[HEAD_PAD + p - 2];
    let after = padded[HEAD_PAD + p + match_len];
    if !is_ident_byte(before) && !is_ident_byte(after) {
        found
    } else {
        TemporalFindings::NONE
    }
}

/// Scans a buffer for temporal macros, picking the fastest available path.
pub fn scan(buffer: &PaddedBuffer) -> TemporalFindings {
    #[cfg(target_arch = "x86_64")]
    if std::is_x86_feature_detected!("avx2") {
        // SAFETY: guarded by runtime feature detection.
        return unsafe { scan_avx2_impl(buffer) };
    }
    scan_scalar(buffer)
}

/// Scalar Boyer-Moore-Horspool scan.
///
/// The cursor `i` tracks the *end* of an 8-byte window. Seeing `'E'` two
/// bytes back and `'_'` seven bytes back is necessary for any of the three
/// needles to end here ('E' first, on the assumption that it is rarer than
/// '_' in source text); only then is the verifier consulted.
pub fn scan_scalar(buffer: &PaddedBuffer) -> TemporalFindings {
    let padded = buffer.padded();
    let size = buffer.size();
    let mut findings = TemporalFindings::NONE;

    let mut i = NEEDLE_LEN - 1;
    while i < size {
        let end = HEAD_PAD + i;
        if padded[end - 2] == b'E' && padded[end - 7] == b'_' {
            findings |= verify_candidate(padded, size, i - 6);
        }
        i += MACRO_SKIP[padded[end] as usize] as usize;
    }
    findings
}

/// AVX2 scan, or `None` when the CPU does not support AVX2.
///
/// Exposed separately so tests can cross-check it against the scalar path on
/// hardware that has it.
#[cfg(target_arch = "x86_64")]
pub fn scan_avx2(buffer: &PaddedBuffer) -> Option<TemporalFindings> {
    if std::is_x86_feature_detected!("avx2") {
        // SAFETY: guarded by runtime feature detection.
        Some(unsafe { scan_avx2_impl(buffer) })
    } else {
        None
    }
}

#[cfg(target_arch = "x86_64")]
#[target_feature(enable = "avx2")]
unsafe fn scan_avx2_impl(buffer: &PaddedBuffer) -> TemporalFindings {
    use core::arch::x86_64::*;

    let padded = buffer.padded();
    let size = buffer.size();
    let mut findings = TemporalFindings::NONE;

    // All three macros start with '_' and have 'E' at offset 5.
    let first = _mm256_set1_epi8(b'_' as i8);
    let last = _mm256_set1_epi8(b'E' as i8);

    let base = padded.as_ptr();
    let mut i = 0usize;
    while i + NEEDLE_LEN <= size {
        // SAFETY: `i <= size - 8` and the allocation extends TAIL_PAD bytes
        // past the live region, so both 32-byte loads stay inside `padded`.
        let block_first = _mm256_loadu_si256(base.add(HEAD_PAD + i) as *const __m256i);
        let block_last = _mm256_loadu_si256(base.add(HEAD_PAD + i + 5) as *const __m256i);

        let eq_first = _mm256_cmpeq_epi8(first, block_first);
        let eq_last = _mm256_cmpeq_epi8(last, block_last);
        let mut mask = _mm256_movemask_epi8(_mm256_and_si256(eq_first, eq_last)) as u32;

        // Each set bit marks a '_' with an 'E' five bytes later; hand the
        // position after that '_' to the verifier, lowest bit first.
        while mask != 0 {
            let pos = mask.trailing_zeros() as usize + 1;
            mask &= mask - 1;
            findings |= verify_candidate(padded, size, i + pos);
        }
        i += 32;
    }
    findings
}
