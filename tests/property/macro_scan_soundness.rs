//! Soundness properties of the temporal-macro scanner.
//!
//! The load-bearing property is path equivalence: the scalar and AVX2
//! scanners must return identical masks for identical input, over arbitrary
//! byte soup as well as inputs engineered to sit on block and buffer
//! boundaries.

use compcache::{scan, scan_scalar, PaddedBuffer, TemporalFindings};
use proptest::prelude::*;

const MACROS: [(&[u8], TemporalFindings); 3] = [
    (b"__DATE__", TemporalFindings::DATE),
    (b"__TIME__", TemporalFindings::TIME),
    (b"__TIMESTAMP__", TemporalFindings::TIMESTAMP),
];

/// Bytes that can never contribute to a needle window.
const NEEDLE_FREE: &[u8] = b"bcfghjklnoqruvwxyz0123456789 \n\t(){};#+-*/<>=\"'";

/// Printable non-identifier bytes, valid on either side of a whole token.
const NON_IDENT: &[u8] = b" \n\t\r(){};,#<>%:.!+-=";

/// Identifier continuation bytes.
const IDENT: &[u8] = b"abcdefghijklmnopqrstuvwxyzABCDEFGHIJKLMNOPQRSTUVWXYZ0123456789_";

fn scan_all_paths(input: &[u8]) -> TemporalFindings {
    let buffer = PaddedBuffer::from_bytes(input);
    let scalar = scan_scalar(&buffer);
    assert_eq!(
        scan(&buffer),
        scalar,
        "auto-selected path disagrees with scalar"
    );
    #[cfg(target_arch = "x86_64")]
    if let Some(vector) = compcache::scan_avx2(&buffer) {
        assert_eq!(vector, scalar, "AVX2 path disagrees with scalar");
    }
    scalar
}

fn bytes_from(alphabet: &'static [u8], len: usize) -> impl Strategy<Value = Vec<u8>> {
    proptest::collection::vec(proptest::sample::select(alphabet.to_vec()), 0..len)
}

proptest! {
    #![proptest_config(ProptestConfig::with_cases(512))]

    #[test]
    fn paths_agree_on_arbitrary_bytes(input in proptest::collection::vec(any::<u8>(), 0..2048)) {
        scan_all_paths(&input);
    }

    #[test]
    fn paths_agree_on_underscore_heavy_soup(
        input in bytes_from(b"_ETIMDASP", 512)
    ) {
        scan_all_paths(&input);
    }

    #[test]
    fn needle_free_input_finds_nothing(input in bytes_from(NEEDLE_FREE, 4096)) {
        prop_assert_eq!(scan_all_paths(&input), TemporalFindings::NONE);
    }

    #[test]
    fn identifier_neighbors_suppress_all_macros(
        macro_idx in 0usize..3,
        prefix in bytes_from(IDENT, 12).prop_filter("non-empty", |v| !v.is_empty()),
        suffix in bytes_from(IDENT, 12).prop_filter("non-empty", |v| !v.is_empty()),
    ) {
        let (needle, _) = MACROS[macro_idx];
        let mut input = prefix;
        input.extend_from_slice(needle);
        input.extend_from_slice(&suffix);
        prop_assert_eq!(scan_all_paths(&input), TemporalFindings::NONE);
    }

    #[test]
    fn non_identifier_neighbors_expose_the_macro(
        macro_idx in 0usize..3,
        prefix in bytes_from(NON_IDENT, 12),
        suffix in bytes_from(NON_IDENT, 12),
    ) {
        let (needle, expected) = MACROS[macro_idx];
        let mut input = prefix;
        input.extend_from_slice(needle);
        input.extend_from_slice(&suffix);
        prop_assert_eq!(scan_all_paths(&input), expected);
    }

    #[test]
    fn macro_is_found_at_every_offset(
        macro_idx in 0usize..3,
        offset in 0usize..96,
    ) {
        let (needle, expected) = MACROS[macro_idx];
        let mut input = vec![b' '; offset];
        input.extend_from_slice(needle);
        prop_assert_eq!(scan_all_paths(&input), expected);
    }

    #[test]
    fn findings_are_the_union_over_occurrences(
        picks in proptest::collection::vec(0usize..3, 1..6),
        separator in proptest::sample::select(NON_IDENT.to_vec()),
    ) {
        let mut input = Vec::new();
        let mut expected = TemporalFindings::NONE;
        for idx in &picks {
            let (needle, finding) = MACROS[*idx];
            input.extend_from_slice(needle);
            input.push(separator);
            expected = expected | finding;
        }
        prop_assert_eq!(scan_all_paths(&input), expected);
    }
}
