use std::io;
use std::path::PathBuf;

use compress::EngineError;
use thiserror::Error;
use transfer::{ConfigError, ExitCode, TransferError};

/// Failure that ends an invocation.
#[derive(Debug, Error)]
pub enum CliError {
    /// The pipeline failed on a file or stream.
    #[error(transparent)]
    Transfer(#[from] TransferError),

    /// Codec options were rejected.
    #[error(transparent)]
    Engine(#[from] EngineError),

    /// Pipeline settings were rejected.
    #[error("invalid settings: {0}")]
    Config(#[from] ConfigError),

    /// An operand does not exist or cannot be queried.
    #[error("{}: {source}", path.display())]
    Operand {
        /// Operand as given.
        path: PathBuf,
        /// Underlying I/O error.
        #[source]
        source: io::Error,
    },

    /// A decompression operand has no recognised suffix.
    #[error("{}: wrong suffix; supported suffixes: {supported}", path.display())]
    WrongSuffix {
        /// Operand as given.
        path: PathBuf,
        /// Suffixes this build understands.
        supported: String,
    },

    /// The output exists and `-f` was not given.
    #[error("{} already exists; use -f to overwrite", path.display())]
    OutputExists {
        /// Planned output path.
        path: PathBuf,
    },

    /// A directory could not be listed during a recursive walk.
    #[error("cannot read directory {}: {source}", path.display())]
    Walk {
        /// Directory being listed.
        path: PathBuf,
        /// Underlying I/O error.
        #[source]
        source: io::Error,
    },

    /// Compressed data would go to a terminal.
    #[error("compressed data not written to a terminal; use -f to force compression")]
    Terminal,

    /// Writing a report failed.
    #[error("cannot write report: {0}")]
    Report(#[source] io::Error),
}

impl CliError {
    /// Process exit code for this failure.
    pub fn exit_code(&self) -> ExitCode {
        match self {
            Self::Transfer(error) => error.exit_code(),
            Self::Walk { .. } => ExitCode::Open,
            Self::Engine(_)
            | Self::Config(_)
            | Self::Operand { .. }
            | Self::WrongSuffix { .. }
            | Self::OutputExists { .. }
            | Self::Terminal
            | Self::Report(_) => ExitCode::Error,
        }
    }
}
