//! Error types shared by the deck composer, the launcher and the log parsers.
//!
//! MOPAC reports most trouble as free text in its output, so the failures a
//! caller sees fall into a few groups:
//!
//! - **Input**: the molecule or calculation cannot be turned into a deck
//! - **I/O**: the deck or log cannot be created or opened
//! - **Format / Parse**: a log line does not have the expected shape or number
//! - **Not found**: the log ended before the requested result appeared
//! - **Launch**: the engine executable is missing or exited with an error
//! - **Convergence**: the engine printed a termination warning; the parsed
//!   value is still available through [`crate::output::Outcome`]

use std::num::ParseFloatError;
use std::path::PathBuf;
use thiserror::Error;

/// Warning attached to a result when MOPAC stopped the optimization early.
///
/// The numbers that come with it are usable, but the calculation probably
/// did not converge properly.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
#[error("Probable problem in calculation {job}: {reason}")]
pub struct ConvergenceWarning {
    /// Job base name the warning refers to
    pub job: String,
    /// The engine message that triggered the warning
    pub reason: String,
}

/// Error type for every fallible operation in this crate.
#[derive(Error, Debug)]
pub enum RunnerError {
    /// The molecule, coordinates or calculation cannot produce a valid deck
    #[error("Input error: {0}")]
    Input(String),

    /// A deck or log file could not be created, written or read
    #[error("IO error on {}: {source}", path.display())]
    Io {
        /// File that was being accessed
        path: PathBuf,
        /// Underlying I/O error
        #[source]
        source: std::io::Error,
    },

    /// Log text supplied by the caller could not be read
    #[error("Failed to read MOPAC output of job {job}: {source}")]
    Read {
        /// Job base name
        job: String,
        /// Underlying I/O error
        #[source]
        source: std::io::Error,
    },

    /// A log line did not have the expected layout
    #[error("Format error: {0}")]
    Format(String),

    /// A numeric field could not be parsed
    #[error("Parse error: cannot read {text:?} as a number")]
    Parse {
        /// The offending text, already trimmed
        text: String,
        /// Underlying parse error
        #[source]
        source: ParseFloatError,
    },

    /// The log ended before the requested result was seen
    #[error("{what} not found for job {job}")]
    NotFound {
        /// What was being looked for ("energy", "geometry")
        what: &'static str,
        /// Job base name
        job: String,
    },

    /// The engine executable or the launching shell is not available
    #[error("External command '{command}' not found or not executable")]
    CommandNotFound {
        /// Command as configured
        command: String,
    },

    /// The engine process could not be started or exited unsuccessfully
    #[error("MOPAC calculation failed: {0}")]
    Calculation(String),

    /// A result was produced but the engine reported a termination warning
    #[error(transparent)]
    Convergence(#[from] ConvergenceWarning),
}

impl RunnerError {
    pub(crate) fn io(path: impl Into<PathBuf>, source: std::io::Error) -> Self {
        RunnerError::Io {
            path: path.into(),
            source,
        }
    }
}

/// Type alias for results in this crate
pub type Result<T> = std::result::Result<T, RunnerError>;
