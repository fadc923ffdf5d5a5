//! Turns parsed arguments into pipeline runs.

use std::collections::HashMap;
use std::collections::hash_map::Entry;
use std::fs;
use std::io::{Read, Write};
use std::path::Path;

use compress::{Algorithm, Direction, EngineOptions, TransformEngine, open_session};
use fast_io::IoBackend;
use tracing::{debug, warn};
use transfer::{BackendChoice, TransferConfig, TransferStats, process_file, process_stream};

use crate::arguments::ParsedArgs;
use crate::error::CliError;
use crate::naming::{OutputPlan, plan_output, supported_suffixes};
use crate::walk::DirectoryWalker;

/// Engine options for `algorithm` with the level and member size from the
/// command line. The level only matters when compressing.
fn engine_options(args: &ParsedArgs, algorithm: Algorithm, direction: Direction) -> EngineOptions {
    let mut options = EngineOptions::new(algorithm);
    if direction == Direction::Compress {
        if let Some(level) = args.level {
            options = options.with_level(level);
        }
    }
    if let Some(member_size) = args.member_size {
        options = options.with_member_size(member_size);
    }
    options
}

pub(crate) fn direction(args: &ParsedArgs) -> Direction {
    if args.decompress {
        Direction::Decompress
    } else {
        Direction::Compress
    }
}

/// Checks codec options before any file is touched.
pub(crate) fn validate_options(args: &ParsedArgs) -> Result<(), CliError> {
    let direction = direction(args);
    engine_options(args, args.algorithm, direction).validate()?;
    Ok(())
}

pub(crate) fn transfer_config(args: &ParsedArgs) -> Result<TransferConfig, CliError> {
    let backend = if args.io_uring {
        BackendChoice::IoUring
    } else {
        BackendChoice::Sync
    };
    Ok(TransferConfig::builder(direction(args))
        .keep_source(args.keep)
        .direct_io(args.direct_io)
        .backend(backend)
        .rate_limit(args.speed)
        .build()?)
}

/// One session per codec, opened on first use and reused for every file.
struct Sessions<'a> {
    args: &'a ParsedArgs,
    direction: Direction,
    open: HashMap<Algorithm, Box<dyn TransformEngine>>,
}

impl<'a> Sessions<'a> {
    fn new(args: &'a ParsedArgs, direction: Direction) -> Self {
        Self {
            args,
            direction,
            open: HashMap::new(),
        }
    }

    fn get(&mut self, algorithm: Algorithm) -> Result<&mut dyn TransformEngine, CliError> {
        let engine = match self.open.entry(algorithm) {
            Entry::Occupied(entry) => entry.into_mut(),
            Entry::Vacant(entry) => {
                let options = engine_options(self.args, algorithm, self.direction);
                debug!(%algorithm, direction = %self.direction, "opening session");
                entry.insert(open_session(&options, self.direction)?)
            }
        };
        Ok(&mut **engine)
    }
}

/// Runs every operand in order, stopping at the first failure.
pub(crate) struct FileRunner<'a, Out: Write> {
    args: &'a ParsedArgs,
    config: TransferConfig,
    backend: Box<dyn IoBackend>,
    sessions: Sessions<'a>,
    reports: &'a mut Out,
}

impl<'a, Out: Write> FileRunner<'a, Out> {
    pub(crate) fn new(args: &'a ParsedArgs, reports: &'a mut Out) -> Result<Self, CliError> {
        let config = transfer_config(args)?;
        let backend = config.backend().open();
        debug!(backend = ?backend.kind(), "I/O backend ready");
        Ok(Self {
            args,
            sessions: Sessions::new(args, config.direction()),
            config,
            backend,
            reports,
        })
    }

    pub(crate) fn run(&mut self) -> Result<(), CliError> {
        let args = self.args;
        for operand in &args.files {
            self.process_operand(operand)?;
        }
        Ok(())
    }

    fn process_operand(&mut self, operand: &Path) -> Result<(), CliError> {
        let metadata = fs::metadata(operand).map_err(|source| CliError::Operand {
            path: operand.to_path_buf(),
            source,
        })?;

        if !metadata.is_dir() {
            return self.process_entry(operand, false);
        }
        if !self.args.recursive {
            warn!(path = %operand.display(), "is a directory -- ignored (use -R)");
            return Ok(());
        }
        for entry in DirectoryWalker::new(operand)? {
            self.process_entry(&entry?, true)?;
        }
        Ok(())
    }

    /// `nested` entries come from a directory walk; an unknown suffix there
    /// is skipped instead of failing the run.
    fn process_entry(&mut self, source: &Path, nested: bool) -> Result<(), CliError> {
        let direction = self.config.direction();
        let plan = plan_output(
            source,
            self.args.output.as_deref(),
            direction,
            self.args.algorithm,
        );

        let (destination, algorithm) = match plan {
            OutputPlan::Process {
                destination,
                algorithm,
            } => (destination, algorithm),
            OutputPlan::AlreadyCompressed(algorithm) => {
                warn!(
                    path = %source.display(),
                    "already has {} suffix -- unchanged",
                    algorithm.suffix()
                );
                return Ok(());
            }
            OutputPlan::UnknownSuffix if nested => {
                warn!(path = %source.display(), "unknown suffix -- ignored");
                return Ok(());
            }
            OutputPlan::UnknownSuffix => {
                return Err(CliError::WrongSuffix {
                    path: source.to_path_buf(),
                    supported: supported_suffixes(),
                });
            }
        };

        if !self.args.force && fs::symlink_metadata(&destination).is_ok() {
            return Err(CliError::OutputExists { path: destination });
        }

        let engine = self.sessions.get(algorithm)?;
        let report = process_file(
            engine,
            source,
            &destination,
            &self.config,
            &mut *self.backend,
        )?;

        if !self.args.quiet {
            if let Some(stats) = report.stats.report() {
                write!(self.reports, "{stats}").map_err(CliError::Report)?;
            }
        }
        Ok(())
    }
}

/// Stream mode: everything on `input` goes through one session to `output`.
pub(crate) fn run_stream(
    args: &ParsedArgs,
    input: &mut dyn Read,
    output: &mut dyn Write,
) -> Result<TransferStats, CliError> {
    let config = transfer_config(args)?;
    let options = engine_options(args, args.algorithm, config.direction());
    let mut engine = open_session(&options, config.direction())?;
    Ok(process_stream(&mut *engine, input, output, &config)?)
}
