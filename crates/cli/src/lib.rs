#![deny(unsafe_code)]
#![deny(missing_docs)]
#![deny(rustdoc::broken_intra_doc_links)]

//! # Overview
//!
//! `cli` is the thin command-line front-end of qzip. It parses
//! `qzip [OPTION]... [FILE]...` with [`clap`](https://docs.rs/clap/), maps
//! the flags onto [`transfer::TransferConfig`] and
//! [`compress::EngineOptions`], and hands each file (or standard input) to
//! the streaming pipeline.
//!
//! # Design
//!
//! [`run`] accepts the arguments together with handles for standard output
//! and error so the binary and the tests drive the same code.
//! [`run_with_input`] additionally takes standard input and the terminal
//! state, which stream-mode tests substitute.
//!
//! - One I/O backend and one session per codec serve the whole invocation.
//! - Compression appends `.gz`/`.zst`; decompression strips it and picks the
//!   codec from it. Inputs that already look compressed are skipped with a
//!   warning when compressing.
//! - `-R` walks directories depth-first, skipping hidden entries.
//! - With no FILE, standard input is transformed to standard output.
//!
//! # Invariants
//!
//! - `run` never panics; failures surface as [`transfer::ExitCode`] values.
//! - The first failing file ends the invocation with one diagnostic.
//! - Per-file reports go to standard output unless `-q`; in stream mode they
//!   go to standard error because standard output carries the data.
//!
//! # Examples
//!
//! ```
//! let mut stdout = Vec::new();
//! let mut stderr = Vec::new();
//! let exit_code = cli::run(["qzip", "--version"], &mut stdout, &mut stderr);
//!
//! assert_eq!(exit_code, 0);
//! assert!(String::from_utf8(stdout).unwrap().starts_with("qzip v"));
//! assert!(stderr.is_empty());
//! ```

use std::ffi::OsString;
use std::io::{self, IsTerminal, Read, Write};

use logging::VerbosityConfig;
use transfer::ExitCode;

mod arguments;
mod command_builder;
mod error;
mod execution;
mod naming;
mod walk;

pub use arguments::{DEFAULT_PROGRAM_NAME, ParsedArgs, parse_args};
pub use error::CliError;
pub use naming::{OutputPlan, plan_output};

use command_builder::render_help;
use execution::{FileRunner, run_stream, validate_options};

/// Whether the standard streams are attached to a terminal.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct Terminals {
    /// Standard input is a terminal.
    pub stdin: bool,
    /// Standard output is a terminal.
    pub stdout: bool,
}

impl Terminals {
    /// Queries the process's real standard streams.
    pub fn detect() -> Self {
        Self {
            stdin: io::stdin().is_terminal(),
            stdout: io::stdout().is_terminal(),
        }
    }
}

/// Runs qzip with the process's standard input.
///
/// Returns the process exit code.
pub fn run<I, T, O, E>(arguments: I, stdout: &mut O, stderr: &mut E) -> i32
where
    I: IntoIterator<Item = T>,
    T: Into<OsString> + Clone,
    O: Write,
    E: Write,
{
    let stdin = io::stdin();
    let mut input = stdin.lock();
    run_with_input(arguments, &mut input, Terminals::detect(), stdout, stderr)
}

/// Runs qzip reading stream-mode data from `input`.
pub fn run_with_input<I, T, O, E>(
    arguments: I,
    input: &mut dyn Read,
    terminals: Terminals,
    stdout: &mut O,
    stderr: &mut E,
) -> i32
where
    I: IntoIterator<Item = T>,
    T: Into<OsString> + Clone,
    O: Write,
    E: Write,
{
    let args = match parse_args(arguments) {
        Ok(args) => args,
        Err(error) => {
            let _ = write!(stderr, "{error}");
            let _ = writeln!(
                stderr,
                "Try `{DEFAULT_PROGRAM_NAME} --help' for more information."
            );
            return ExitCode::Error.as_i32();
        }
    };

    if args.show_help {
        return print_help(&args, stdout);
    }
    if args.show_version {
        let _ = writeln!(stdout, "{} v{}", args.program_name, env!("CARGO_PKG_VERSION"));
        return ExitCode::Ok.as_i32();
    }

    let verbosity = if args.quiet {
        VerbosityConfig::quiet()
    } else {
        VerbosityConfig::from_verbose_level(args.verbose)
    };
    if logging::init_tracing(verbosity).is_err() {
        tracing::debug!("tracing subscriber already installed");
    }

    let outcome = if args.files.is_empty() {
        if terminals.stdin {
            return print_help(&args, stdout);
        }
        stream_mode(&args, input, terminals, stdout, stderr)
    } else {
        file_mode(&args, stdout)
    };

    match outcome {
        Ok(()) => ExitCode::Ok.as_i32(),
        Err(error) => {
            let _ = writeln!(stderr, "{}: {error}", args.program_name);
            error.exit_code().as_i32()
        }
    }
}

fn stream_mode<O: Write, E: Write>(
    args: &ParsedArgs,
    input: &mut dyn Read,
    terminals: Terminals,
    stdout: &mut O,
    stderr: &mut E,
) -> Result<(), CliError> {
    if !args.decompress && terminals.stdout && !args.force {
        return Err(CliError::Terminal);
    }
    validate_options(args)?;
    let stats = run_stream(args, input, stdout)?;
    if !args.quiet {
        if let Some(report) = stats.report() {
            write!(stderr, "{report}").map_err(CliError::Report)?;
        }
    }
    Ok(())
}

fn file_mode<O: Write>(args: &ParsedArgs, stdout: &mut O) -> Result<(), CliError> {
    validate_options(args)?;
    FileRunner::new(args, stdout)?.run()
}

fn print_help<O: Write>(args: &ParsedArgs, stdout: &mut O) -> i32 {
    let _ = stdout.write_all(render_help(&args.program_name).as_bytes());
    ExitCode::Ok.as_i32()
}
