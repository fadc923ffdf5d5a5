//! Output file names derived from input names.
//!
//! Compression appends the codec suffix; decompression strips a known
//! suffix and picks the codec from it. `-o` replaces the input name as the
//! base in both directions.

use std::ffi::OsString;
use std::path::{Path, PathBuf};

use compress::{Algorithm, Direction};

/// What to do with one input file.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum OutputPlan {
    /// Transform into `destination` with `algorithm`.
    Process {
        /// Output path.
        destination: PathBuf,
        /// Codec for the session.
        algorithm: Algorithm,
    },
    /// Compression input already carries a compressed suffix.
    AlreadyCompressed(Algorithm),
    /// Decompression input has no suffix this build understands.
    UnknownSuffix,
}

/// Plans the output for `input`.
///
/// `algorithm` is the codec chosen on the command line; it only applies
/// when compressing.
pub fn plan_output(
    input: &Path,
    output_base: Option<&Path>,
    direction: Direction,
    algorithm: Algorithm,
) -> OutputPlan {
    let name = input.file_name().and_then(|name| name.to_str());
    let existing = name.and_then(Algorithm::from_suffix);

    match direction {
        Direction::Compress => {
            if let Some(existing) = existing {
                return OutputPlan::AlreadyCompressed(existing);
            }
            let base = output_base.unwrap_or(input);
            OutputPlan::Process {
                destination: append_suffix(base, algorithm.suffix()),
                algorithm,
            }
        }
        Direction::Decompress => {
            let Some(existing) = existing else {
                return OutputPlan::UnknownSuffix;
            };
            let destination = match output_base {
                Some(base) => base.to_path_buf(),
                None => strip_suffix(input, existing.suffix()),
            };
            OutputPlan::Process {
                destination,
                algorithm: existing,
            }
        }
    }
}

/// Suffixes understood by this build, for diagnostics.
pub fn supported_suffixes() -> String {
    Algorithm::available()
        .iter()
        .map(|algorithm| algorithm.suffix())
        .collect::<Vec<_>>()
        .join("/")
}

fn append_suffix(path: &Path, suffix: &str) -> PathBuf {
    let mut name = OsString::from(path.as_os_str());
    name.push(suffix);
    PathBuf::from(name)
}

fn strip_suffix(path: &Path, suffix: &str) -> PathBuf {
    let Some(name) = path.file_name().and_then(|name| name.to_str()) else {
        return path.to_path_buf();
    };
    let stem = &name[..name.len() - suffix.len()];
    path.with_file_name(stem)
}
