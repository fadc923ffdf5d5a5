use clap::{Arg, ArgAction, Command as ClapCommand, value_parser};
use std::path::PathBuf;

use bandwidth::parse_speed;
use compress::Algorithm;

/// Static help snapshot; `{prog}` is replaced with the invoked name.
pub(crate) const HELP_TEXT: &str = "\
Usage: {prog} [OPTION]... [FILE]...
Compress or uncompress FILEs (by default, compress FILES in-place).

Mandatory arguments to long options are mandatory for short options too.

  -A, --algorithm NAME  set algorithm type (deflate|zstd)
  -C, --chunksz BYTES   set input bytes per compressed member
  -d, --decompress      decompress
  -D, --no-direct       don't use O_DIRECT to read and write files
  -f, --force           force overwrite of output file and compress to a terminal
  -h, --help            give this help
  -i, --no-io-uring     don't use io_uring to read and write files
  -k, --keep            keep (don't delete) input files
  -L, --level N         set compression level
  -o, --output NAME     set output file name
  -q, --quiet           suppress reports and warnings
  -R, --recursive       process directories recursively
  -S, --speed RATE      limit throughput (MiB/s, or a K/M/G suffix)
  -v, --verbose         print more diagnostics (repeat for more)
  -V, --version         display version number

With no FILE, read standard input.
";

fn parse_algorithm(value: &str) -> Result<Algorithm, compress::AlgorithmParseError> {
    value.parse()
}

fn parse_member_size(value: &str) -> Result<usize, std::num::ParseIntError> {
    value.trim().parse()
}

pub(crate) fn clap_command(program_name: &str) -> ClapCommand {
    ClapCommand::new("qzip")
        .bin_name(program_name.to_owned())
        .disable_help_flag(true)
        .disable_version_flag(true)
        .arg(
            Arg::new("help")
                .short('h')
                .long("help")
                .action(ArgAction::SetTrue),
        )
        .arg(
            Arg::new("version")
                .short('V')
                .long("version")
                .action(ArgAction::SetTrue),
        )
        .arg(
            Arg::new("decompress")
                .short('d')
                .long("decompress")
                .alias("uncompress")
                .action(ArgAction::SetTrue),
        )
        .arg(
            Arg::new("keep")
                .short('k')
                .long("keep")
                .action(ArgAction::SetTrue),
        )
        .arg(
            Arg::new("force")
                .short('f')
                .long("force")
                .action(ArgAction::SetTrue),
        )
        .arg(
            Arg::new("no-io-uring")
                .short('i')
                .long("no-io-uring")
                .alias("io_uring")
                .action(ArgAction::SetTrue),
        )
        .arg(
            Arg::new("no-direct")
                .short('D')
                .long("no-direct")
                .alias("no_direct")
                .action(ArgAction::SetTrue),
        )
        .arg(
            Arg::new("speed")
                .short('S')
                .long("speed")
                .value_name("RATE")
                .value_parser(parse_speed),
        )
        .arg(
            Arg::new("level")
                .short('L')
                .long("level")
                .value_name("N")
                .value_parser(value_parser!(u32)),
        )
        .arg(
            Arg::new("chunksz")
                .short('C')
                .long("chunksz")
                .value_name("BYTES")
                .value_parser(parse_member_size),
        )
        .arg(
            Arg::new("algorithm")
                .short('A')
                .long("algorithm")
                .value_name("NAME")
                .value_parser(parse_algorithm),
        )
        .arg(
            Arg::new("output")
                .short('o')
                .long("output")
                .value_name("NAME")
                .value_parser(value_parser!(PathBuf)),
        )
        .arg(
            Arg::new("recursive")
                .short('R')
                .long("recursive")
                .action(ArgAction::SetTrue),
        )
        .arg(
            Arg::new("verbose")
                .short('v')
                .long("verbose")
                .action(ArgAction::Count),
        )
        .arg(
            Arg::new("quiet")
                .short('q')
                .long("quiet")
                .action(ArgAction::SetTrue),
        )
        .arg(
            Arg::new("files")
                .value_name("FILE")
                .num_args(0..)
                .action(ArgAction::Append)
                .value_parser(value_parser!(PathBuf)),
        )
}

pub(crate) fn render_help(program_name: &str) -> String {
    HELP_TEXT.replace("{prog}", program_name)
}
