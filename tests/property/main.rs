//! Property-based soundness tests.
//!
//! Run with: `cargo test --test property`

mod buffer_invariants;
mod macro_scan_soundness;
