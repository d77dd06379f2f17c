//! Source-input hashing with temporal-macro awareness.
//!
//! Absorbs a preprocessed source buffer into the caller's hash and, when the
//! buffer uses a temporal macro, mixes in exactly the entropy that would
//! change the macro's expansion:
//!
//! - `__DATE__` — today's local date (year, month, day).
//! - `__TIME__` — nothing; a cache hit within the same second is too
//!   unlikely to be worth hashing the clock. The finding is still reported
//!   so the caller can disable its "preprocessor output unchanged"
//!   optimization.
//! - `__TIMESTAMP__` — the source file's mtime rendered through the local
//!   timezone in the fixed `asctime` form. Two machines in different
//!   timezones may therefore produce different cache keys for the same
//!   file; that is accepted, not a bug.
//!
//! Scanning is skipped entirely when the caller opted into
//! [`Sloppiness::TIME_MACROS`].

use std::fmt;
use std::fs;
use std::io;
use std::path::{Path, PathBuf};
use std::time::{SystemTime, UNIX_EPOCH};

use chrono::{DateTime, Datelike, Local, TimeZone};

use crate::config::{Config, Sloppiness};
use crate::entropy::{absorb_file, EntropySink};
use crate::macro_scan::{self, TemporalFindings};
use crate::padded_buffer::PaddedBuffer;

/// Failure to produce a complete source hash.
///
/// Once an error is returned, the sink holds a partial absorption; the
/// caller must discard the key rather than finalize it.
#[derive(Debug)]
#[non_exhaustive]
pub enum SourceHashError {
    /// The source file could not be read.
    Io { path: PathBuf, source: io::Error },
    /// The mtime needed for `__TIMESTAMP__` could not be obtained.
    Stat { path: PathBuf, source: io::Error },
    /// A timestamp could not be converted to broken-down local time.
    Clock,
}

impl fmt::Display for SourceHashError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Io { path, source } => {
                write!(f, "failed to read {}: {source}", path.display())
            }
            Self::Stat { path, source } => {
                write!(f, "failed to stat {}: {source}", path.display())
            }
            Self::Clock => write!(f, "local time conversion failed"),
        }
    }
}

impl std::error::Error for SourceHashError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            Self::Io { source, .. } | Self::Stat { source, .. } => Some(source),
            Self::Clock => None,
        }
    }
}

/// Hashes an in-memory source buffer, adding temporal-macro entropy.
///
/// `path` names the buffer's origin; it is stat'ed only when the buffer
/// contains `__TIMESTAMP__`, and otherwise serves diagnostics. Returns the
/// findings mask so the caller can react to `__TIME__` (see module docs).
pub fn hash_source_string<S: EntropySink + ?Sized>(
    config: &Config,
    sink: &mut S,
    buffer: &PaddedBuffer,
    path: &Path,
) -> Result<TemporalFindings, SourceHashError> {
    let findings = if config.sloppiness().contains(Sloppiness::TIME_MACROS) {
        TemporalFindings::NONE
    } else {
        macro_scan::scan(buffer)
    };

    sink.absorb_bytes(buffer.as_bytes());

    if findings.contains(TemporalFindings::DATE) {
        tracing::debug!("found __DATE__ in {}", path.display());
        let now = Local::now();
        sink.absorb_delimiter("date");
        sink.absorb_int(i64::from(now.year()));
        sink.absorb_int(i64::from(now.month()));
        sink.absorb_int(i64::from(now.day()));
    }

    if findings.contains(TemporalFindings::TIME) {
        tracing::debug!("found __TIME__ in {}", path.display());
    }

    if findings.contains(TemporalFindings::TIMESTAMP) {
        tracing::debug!("found __TIMESTAMP__ in {}", path.display());
        let mtime = fs::metadata(path)
            .and_then(|meta| meta.modified())
            .map_err(|source| SourceHashError::Stat {
                path: path.to_path_buf(),
                source,
            })?;
        let modified = local_time(mtime).ok_or(SourceHashError::Clock)?;
        sink.absorb_delimiter("timestamp");
        let rendered = modified.format("%a %b %e %H:%M:%S %Y\n").to_string();
        sink.absorb_bytes(rendered.as_bytes());
    }

    Ok(findings)
}

/// Hashes a source file.
///
/// Precompiled headers are absorbed verbatim with no scanning (their binary
/// content embeds whatever the compiler resolved at build time). Everything
/// else is read into a [`PaddedBuffer`] sized by `size_hint` and handed to
/// [`hash_source_string`].
pub fn hash_source_file<S: EntropySink + ?Sized>(
    config: &Config,
    sink: &mut S,
    path: &Path,
    size_hint: u64,
) -> Result<TemporalFindings, SourceHashError> {
    if is_precompiled_header(path) {
        absorb_file(sink, path).map_err(|source| SourceHashError::Io {
            path: path.to_path_buf(),
            source,
        })?;
        return Ok(TemporalFindings::NONE);
    }

    let buffer = PaddedBuffer::from_file(path, size_hint).map_err(|source| {
        SourceHashError::Io {
            path: path.to_path_buf(),
            source,
        }
    })?;
    hash_source_string(config, sink, &buffer, path)
}

/// Returns `true` when `path` designates a precompiled header: a `.gch`,
/// `.pch` or `.pth` file, or any file inside a `*.gch` directory.
pub fn is_precompiled_header(path: &Path) -> bool {
    let matches_ext = |p: &Path| {
        p.extension()
            .and_then(|ext| ext.to_str())
            .is_some_and(|ext| matches!(ext, "gch" | "pch" | "pth"))
    };
    matches_ext(path)
        || path
            .parent()
            .is_some_and(|dir| dir.extension().and_then(|e| e.to_str()) == Some("gch"))
}

/// Converts a filesystem timestamp to broken-down local time.
///
/// Returns `None` when the instant has no unambiguous local representation
/// (possible around timezone transitions).
fn local_time(t: SystemTime) -> Option<DateTime<Local>> {
    let (secs, nanos) = match t.duration_since(UNIX_EPOCH) {
        Ok(d) => (i64::try_from(d.as_secs()).ok()?, d.subsec_nanos()),
        Err(err) => {
            // Pre-epoch mtime: carry the fractional second into the nanos
            // field, which chrono requires in [0, 1e9).
            let d = err.duration();
            let mut secs = -i64::try_from(d.as_secs()).ok()?;
            let mut nanos = d.subsec_nanos();
            if nanos > 0 {
                secs -= 1;
                nanos = 1_000_000_000 - nanos;
            }
            (secs, nanos)
        }
    };
    Local.timestamp_opt(secs, nanos).single()
}
