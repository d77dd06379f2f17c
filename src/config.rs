//! Caller-supplied relaxations of cache-key strictness.
//!
//! Sloppiness trades correctness guarantees for hit rate. Each flag names one
//! check the hasher may skip; the source hasher consults
//! [`Sloppiness::TIME_MACROS`] to bypass temporal-macro detection entirely.

use std::fmt;
use std::str::FromStr;

/// Bitset of enabled sloppiness relaxations.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct Sloppiness(u32);

impl Sloppiness {
    /// No relaxations; every check runs.
    pub const NONE: Self = Self(0);
    /// Ignore `__DATE__`, `__TIME__` and `__TIMESTAMP__` in source files.
    pub const TIME_MACROS: Self = Self(1 << 0);
    /// Trust precompiled headers even when defines may differ.
    pub const PCH_DEFINES: Self = Self(1 << 1);
    /// Ignore `__FILE__` expansion differences.
    pub const FILE_MACRO: Self = Self(1 << 2);
    /// Skip include-file mtime checks.
    pub const INCLUDE_FILE_MTIME: Self = Self(1 << 3);
    /// Skip include-file ctime checks.
    pub const INCLUDE_FILE_CTIME: Self = Self(1 << 4);
    /// Accept size/mtime equality as content equality for input files.
    pub const FILE_STAT_MATCHES: Self = Self(1 << 5);

    /// Returns `true` when every bit of `other` is set in `self`.
    #[inline]
    pub fn contains(self, other: Self) -> bool {
        self.0 & other.0 == other.0
    }

    /// Returns the union of `self` and `other`.
    #[inline]
    pub fn union(self, other: Self) -> Self {
        Self(self.0 | other.0)
    }

    fn from_name(name: &str) -> Option<Self> {
        match name {
            "time_macros" => Some(Self::TIME_MACROS),
            "pch_defines" => Some(Self::PCH_DEFINES),
            "file_macro" => Some(Self::FILE_MACRO),
            "include_file_mtime" => Some(Self::INCLUDE_FILE_MTIME),
            "include_file_ctime" => Some(Self::INCLUDE_FILE_CTIME),
            "file_stat_matches" => Some(Self::FILE_STAT_MATCHES),
            _ => None,
        }
    }
}

impl fmt::Display for Sloppiness {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        const NAMES: [(Sloppiness, &str); 6] = [
            (Sloppiness::TIME_MACROS, "time_macros"),
            (Sloppiness::PCH_DEFINES, "pch_defines"),
            (Sloppiness::FILE_MACRO, "file_macro"),
            (Sloppiness::INCLUDE_FILE_MTIME, "include_file_mtime"),
            (Sloppiness::INCLUDE_FILE_CTIME, "include_file_ctime"),
            (Sloppiness::FILE_STAT_MATCHES, "file_stat_matches"),
        ];
        let mut first = true;
        for (flag, name) in NAMES {
            if self.contains(flag) {
                if !first {
                    f.write_str(",")?;
                }
                f.write_str(name)?;
                first = false;
            }
        }
        Ok(())
    }
}

/// Parses a comma- or space-separated flag list, e.g. `"time_macros,
/// pch_defines"`. Unknown names are skipped with a log line rather than
/// rejected, so configurations written for newer versions stay loadable.
impl FromStr for Sloppiness {
    type Err = std::convert::Infallible;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let mut flags = Self::NONE;
        for word in s.split([',', ' ']).filter(|w| !w.is_empty()) {
            match Self::from_name(word) {
                Some(flag) => flags = flags.union(flag),
                None => tracing::debug!("ignoring unknown sloppiness flag: {word}"),
            }
        }
        Ok(flags)
    }
}

/// Hasher-relevant configuration.
#[derive(Clone, Copy, Debug, Default)]
pub struct Config {
    sloppiness: Sloppiness,
}

impl Config {
    /// Creates a configuration with the given sloppiness flags.
    pub fn with_sloppiness(sloppiness: Sloppiness) -> Self {
        Self { sloppiness }
    }

    /// The enabled sloppiness relaxations.
    #[inline]
    pub fn sloppiness(&self) -> Sloppiness {
        self.sloppiness
    }
}
