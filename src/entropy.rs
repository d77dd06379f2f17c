//! Incremental hash capability consumed by the source and command hashers.
//!
//! The cache key is accumulated in an [`EntropySink`] owned by the caller;
//! this crate only absorbs material into it. Delimiters frame differently
//! typed fields so that `absorb_bytes(a); absorb_delimiter("x");
//! absorb_bytes(b)` can never collide with `absorb_bytes(a ++ b)`: the frame
//! starts with a NUL and a fixed tag, a sequence vanishingly unlikely to
//! appear at a matching position in ordinary absorbed content, and the label
//! itself is NUL-terminated.

use std::fs::File;
use std::io::{self, Read};
use std::path::Path;

/// Frame prefix absorbed before every delimiter label.
const DELIMITER_FRAME: &[u8] = b"\x00cOmPcAcHe";

/// Chunk size for streaming files into a sink.
const FILE_CHUNK: usize = 64 * 1024;

/// An incremental hash accumulator.
///
/// Implementations must be order-sensitive: absorbing the same material in a
/// different order or with different framing must (modulo hash collisions)
/// produce a different final digest. The digest itself is not part of this
/// interface; callers finalize through the concrete type they own.
pub trait EntropySink {
    /// Mixes a byte slice into the state.
    fn absorb_bytes(&mut self, bytes: &[u8]);

    /// Mixes a framed field label into the state.
    fn absorb_delimiter(&mut self, label: &str);

    /// Mixes an integer in fixed-width little-endian form.
    fn absorb_int(&mut self, value: i64);
}

/// The production sink.
impl EntropySink for blake3::Hasher {
    #[inline]
    fn absorb_bytes(&mut self, bytes: &[u8]) {
        self.update(bytes);
    }

    fn absorb_delimiter(&mut self, label: &str) {
        self.update(DELIMITER_FRAME);
        self.update(label.as_bytes());
        self.update(&[0]);
    }

    #[inline]
    fn absorb_int(&mut self, value: i64) {
        self.update(&value.to_le_bytes());
    }
}

/// Streams an entire file into the sink, returning the byte count absorbed.
pub fn absorb_file<S: EntropySink + ?Sized>(sink: &mut S, path: &Path) -> io::Result<u64> {
    let mut file = File::open(path)?;
    let mut chunk = vec![0u8; FILE_CHUNK];
    let mut total = 0u64;
    loop {
        match file.read(&mut chunk) {
            Ok(0) => return Ok(total),
            Ok(n) => {
                sink.absorb_bytes(&chunk[..n]);
                total += n as u64;
            }
            Err(err) if err.kind() == io::ErrorKind::Interrupted => continue,
            Err(err) => return Err(err),
        }
    }
}
