//! Source-input scanning and hashing for compiler-output caching.
//!
//! Decides whether a preprocessed translation unit is eligible for cache
//! reuse and mixes the right entropy into its cache key:
//!
//! - [`macro_scan`] finds whole-token uses of `__DATE__`, `__TIME__` and
//!   `__TIMESTAMP__` at multi-GB/s throughput (scalar Boyer-Moore-Horspool
//!   with an AVX2 path selected at runtime), reading over the sentinel
//!   bytes a [`PaddedBuffer`] guarantees around its live region.
//! - [`source_hash`] absorbs a source buffer into the caller's hash and,
//!   per finding, the entropy that would change the macro's expansion
//!   (today's date, the file's mtime). Callers opt out with
//!   [`Sloppiness::TIME_MACROS`].
//! - [`command_hash`] runs compiler-check commands and absorbs their merged
//!   stdout/stderr into the hash with strict process hygiene (drained
//!   pipes, reaped children, propagated exit status).
//!
//! The hash itself is a caller-owned [`EntropySink`]; the production
//! implementation is [`blake3::Hasher`].

pub mod command_args;
pub mod command_hash;
pub mod config;
pub mod entropy;
pub mod macro_scan;
pub mod padded_buffer;
pub mod source_hash;
#[cfg(test)]
pub mod test_utils;

pub use command_hash::{hash_command_output, hash_multicommand_output};
pub use config::{Config, Sloppiness};
pub use entropy::{absorb_file, EntropySink};
pub use macro_scan::{scan, scan_scalar, TemporalFindings};
#[cfg(target_arch = "x86_64")]
pub use macro_scan::scan_avx2;
pub use padded_buffer::PaddedBuffer;
pub use source_hash::{
    hash_source_file, hash_source_string, is_precompiled_header, SourceHashError,
};
