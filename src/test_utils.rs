//! Shared helpers for unit tests.

use crate::entropy::EntropySink;

/// Sink that records absorbed material instead of hashing it, so tests can
/// assert on exactly what was fed in.
#[derive(Default)]
pub struct CollectSink {
    /// Concatenation of every `absorb_bytes` call.
    pub bytes: Vec<u8>,
    /// Labels passed to `absorb_delimiter`, in order.
    pub delimiters: Vec<String>,
    /// Values passed to `absorb_int`, in order.
    pub ints: Vec<i64>,
}

impl EntropySink for CollectSink {
    fn absorb_bytes(&mut self, bytes: &[u8]) {
        self.bytes.extend_from_slice(bytes);
    }

    fn absorb_delimiter(&mut self, label: &str) {
        self.delimiters.push(label.to_string());
    }

    fn absorb_int(&mut self, value: i64) {
        self.ints.push(value);
    }
}
