//! Typed view of the command line.

use std::ffi::OsString;
use std::path::{Path, PathBuf};

use compress::Algorithm;

use crate::command_builder::clap_command;

/// Name used when `argv[0]` is missing or not valid UTF-8.
pub const DEFAULT_PROGRAM_NAME: &str = "qzip";

/// Parsed command-line arguments.
///
/// Option-valued fields are `None` when the flag was absent so the caller
/// can apply codec-specific defaults.
#[allow(clippy::struct_excessive_bools)]
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct ParsedArgs {
    /// Base name of `argv[0]`.
    pub program_name: String,
    /// `-h`, `--help`
    pub show_help: bool,
    /// `-V`, `--version`
    pub show_version: bool,
    /// `-d`, `--decompress`
    pub decompress: bool,
    /// `-k`, `--keep`
    pub keep: bool,
    /// `-f`, `--force`
    pub force: bool,
    /// Cleared by `-i`, `--no-io-uring`.
    pub io_uring: bool,
    /// Cleared by `-D`, `--no-direct`.
    pub direct_io: bool,
    /// `-S`, `--speed`, in bytes per second; zero means unlimited.
    pub speed: u64,
    /// `-L`, `--level`
    pub level: Option<u32>,
    /// `-C`, `--chunksz`
    pub member_size: Option<usize>,
    /// `-A`, `--algorithm`
    pub algorithm: Algorithm,
    /// `-o`, `--output`
    pub output: Option<PathBuf>,
    /// `-R`, `--recursive`
    pub recursive: bool,
    /// Number of `-v` flags.
    pub verbose: u8,
    /// `-q`, `--quiet`
    pub quiet: bool,
    /// Operands; empty selects stream mode.
    pub files: Vec<PathBuf>,
}

/// Parses `arguments`, the first of which is the program name.
pub fn parse_args<I, T>(arguments: I) -> Result<ParsedArgs, clap::Error>
where
    I: IntoIterator<Item = T>,
    T: Into<OsString> + Clone,
{
    let arguments: Vec<OsString> = arguments.into_iter().map(Into::into).collect();
    let program_name = program_name(arguments.first().map(Path::new));
    let mut matches = clap_command(&program_name).try_get_matches_from(arguments)?;

    Ok(ParsedArgs {
        show_help: matches.get_flag("help"),
        show_version: matches.get_flag("version"),
        decompress: matches.get_flag("decompress"),
        keep: matches.get_flag("keep"),
        force: matches.get_flag("force"),
        io_uring: !matches.get_flag("no-io-uring"),
        direct_io: !matches.get_flag("no-direct"),
        speed: matches.remove_one::<u64>("speed").unwrap_or(0),
        level: matches.remove_one::<u32>("level"),
        member_size: matches.remove_one::<usize>("chunksz"),
        algorithm: matches
            .remove_one::<Algorithm>("algorithm")
            .unwrap_or_default(),
        output: matches.remove_one::<PathBuf>("output"),
        recursive: matches.get_flag("recursive"),
        verbose: matches.get_count("verbose"),
        quiet: matches.get_flag("quiet"),
        files: matches
            .remove_many::<PathBuf>("files")
            .map(Iterator::collect)
            .unwrap_or_default(),
        program_name,
    })
}

fn program_name(argv0: Option<&Path>) -> String {
    argv0
        .and_then(Path::file_name)
        .and_then(|name| name.to_str())
        .filter(|name| !name.is_empty())
        .unwrap_or(DEFAULT_PROGRAM_NAME)
        .to_owned()
}
