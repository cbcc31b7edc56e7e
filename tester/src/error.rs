//! Harness error types
//!
//! Setup, readiness and assertion failures each get their own variant so a
//! scenario can tell "the cluster never got ready" apart from "the traced
//! tool produced the wrong output". Teardown never produces an error.

use std::path::PathBuf;
use std::time::Duration;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum HarnessError {
    #[error("Failed to spawn `{program}`: {source}")]
    Spawn {
        program: String,
        #[source]
        source: std::io::Error,
    },

    #[error("Setup step '{step}' failed with status {status}: {output}")]
    Setup { step: String, status: i32, output: String },

    #[error("Readiness wait exceeded {deadline:?} for {target}")]
    WaitDeadlineExceeded { target: String, deadline: Duration },

    #[error("Every watcher failed for {target}: {conditions:?}")]
    AllWatchersFailed { target: String, conditions: Vec<String> },

    #[error("No watchers supplied for {target}")]
    NoWatchers { target: String },

    #[error("Test name '{name}' has no DNS-compliant characters")]
    InvalidTestName { name: String },

    #[error("Assertion failed: {message}")]
    AssertionFailed { message: String },

    #[error("Configuration error: {field}: {message}")]
    Config { field: String, message: String },

    #[error("Unknown scenario '{name}'. Available: {available}")]
    UnknownScenario { name: String, available: String },

    #[error("I/O error on {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Invalid glob pattern: {0}")]
    Pattern(#[from] glob::PatternError),
}

impl HarnessError {
    pub fn assertion(message: impl Into<String>) -> Self {
        Self::AssertionFailed { message: message.into() }
    }

    pub fn config(field: impl Into<String>, message: impl Into<String>) -> Self {
        Self::Config {
            field: field.into(),
            message: message.into(),
        }
    }

    pub fn io(path: impl Into<PathBuf>, source: std::io::Error) -> Self {
        Self::Io {
            path: path.into(),
            source,
        }
    }

    /// Whether this error came from getting the cluster ready rather than from the test body
    pub fn is_setup_failure(&self) -> bool {
        matches!(
            self,
            Self::Setup { .. } | Self::WaitDeadlineExceeded { .. } | Self::AllWatchersFailed { .. } | Self::NoWatchers { .. }
        )
    }
}

pub type HarnessResult<T> = Result<T, HarnessError>;
