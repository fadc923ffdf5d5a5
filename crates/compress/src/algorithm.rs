//! Codec selection and the file-name suffixes each codec owns.

use core::fmt;
use core::ops::RangeInclusive;
use core::str::FromStr;

/// Codecs available to a session.
#[derive(Clone, Copy, Debug, Default, Eq, PartialEq, Hash)]
pub enum Algorithm {
    /// Deflate, framed as gzip members.
    #[default]
    Deflate,
    /// Zstandard frames.
    #[cfg(feature = "zstd")]
    Zstd,
}

impl Algorithm {
    /// Canonical name used on the command line and in diagnostics.
    #[must_use]
    pub const fn name(self) -> &'static str {
        match self {
            Self::Deflate => "deflate",
            #[cfg(feature = "zstd")]
            Self::Zstd => "zstd",
        }
    }

    /// File-name suffix, including the leading dot, for compressed output.
    #[must_use]
    pub const fn suffix(self) -> &'static str {
        match self {
            Self::Deflate => ".gz",
            #[cfg(feature = "zstd")]
            Self::Zstd => ".zst",
        }
    }

    /// Accepted compression levels.
    #[must_use]
    pub const fn level_range(self) -> RangeInclusive<u32> {
        match self {
            Self::Deflate => 1..=9,
            #[cfg(feature = "zstd")]
            Self::Zstd => 1..=22,
        }
    }

    /// Level used when none is requested.
    #[must_use]
    pub const fn default_level(self) -> u32 {
        1
    }

    /// Codecs compiled into this build.
    #[must_use]
    pub fn available() -> &'static [Self] {
        #[cfg(feature = "zstd")]
        {
            const ALGORITHMS: &[Algorithm] = &[Algorithm::Deflate, Algorithm::Zstd];
            ALGORITHMS
        }

        #[cfg(not(feature = "zstd"))]
        {
            const ALGORITHMS: &[Algorithm] = &[Algorithm::Deflate];
            ALGORITHMS
        }
    }

    /// Finds the codec whose suffix ends `file_name`.
    #[must_use]
    pub fn from_suffix(file_name: &str) -> Option<Self> {
        Self::available()
            .iter()
            .copied()
            .find(|algorithm| {
                let suffix = algorithm.suffix();
                file_name.len() > suffix.len() && file_name.ends_with(suffix)
            })
    }
}

impl fmt::Display for Algorithm {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// Error returned when parsing an unsupported algorithm name.
#[derive(Clone, Debug, Eq, PartialEq, thiserror::Error)]
#[error("unsupported algorithm: {input}")]
pub struct AlgorithmParseError {
    input: String,
}

impl AlgorithmParseError {
    /// Returns the rejected input.
    #[must_use]
    pub fn input(&self) -> &str {
        &self.input
    }
}

impl FromStr for Algorithm {
    type Err = AlgorithmParseError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "deflate" | "gzip" | "gz" => Ok(Self::Deflate),
            #[cfg(feature = "zstd")]
            "zstd" | "zst" => Ok(Self::Zstd),
            other => Err(AlgorithmParseError {
                input: other.to_owned(),
            }),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn available_algorithms_always_include_deflate() {
        assert!(Algorithm::available().contains(&Algorithm::Deflate));
    }

    #[test]
    fn parsing_accepts_aliases() {
        assert_eq!("deflate".parse::<Algorithm>().unwrap(), Algorithm::Deflate);
        assert_eq!(" GZIP ".parse::<Algorithm>().unwrap(), Algorithm::Deflate);
    }

    #[cfg(feature = "zstd")]
    #[test]
    fn parsing_accepts_zstd() {
        assert_eq!("zstd".parse::<Algorithm>().unwrap(), Algorithm::Zstd);
        assert_eq!(Algorithm::Zstd.suffix(), ".zst");
        assert_eq!(Algorithm::Zstd.level_range(), 1..=22);
    }

    #[test]
    fn parsing_rejects_unknown() {
        let err = "brotli".parse::<Algorithm>().expect_err("unsupported");
        assert_eq!(err.input(), "brotli");
    }

    #[test]
    fn suffix_lookup_requires_a_stem() {
        assert_eq!(Algorithm::from_suffix("data.gz"), Some(Algorithm::Deflate));
        assert_eq!(Algorithm::from_suffix(".gz"), None);
        assert_eq!(Algorithm::from_suffix("data.txt"), None);
    }

    #[cfg(feature = "zstd")]
    #[test]
    fn suffix_lookup_finds_zstd() {
        assert_eq!(Algorithm::from_suffix("a.tar.zst"), Some(Algorithm::Zstd));
    }
}
