//! Logging bootstrap for harness binaries
//!
//! Installs a `tracing-subscriber` fmt subscriber filtered by `EnvFilter`.
//! Output always goes to stdout; when a log file is given the same events are
//! also appended there without ANSI colouring, so a CI job can archive them.

use std::fs::OpenOptions;
use std::path::Path;
use std::sync::Mutex;

use tracing_subscriber::{EnvFilter, fmt, prelude::*};

use crate::errors::{SharedError, SharedResult};

/// Crates whose events are kept at the requested level; everything else is `warn`.
const HARNESS_TARGETS: &[&str] = &["tester", "shared"];

/// Build the filter directive string for a base level such as `info` or `debug`.
pub fn filter_directives(base_level: &str) -> String {
    let mut directives = vec!["warn".to_string()];
    directives.extend(HARNESS_TARGETS.iter().map(|target| format!("{target}={base_level}")));
    directives.join(",")
}

/// Initialize tracing for a harness process.
///
/// `RUST_LOG` wins over `base_level` when set. Calling this twice is not an
/// error; the second call leaves the first subscriber in place.
pub fn init_tracing(base_level: &str, log_file: Option<&Path>) -> SharedResult<()> {
    let env_filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(filter_directives(base_level)));

    let file_layer = match log_file {
        Some(path) => {
            let file = OpenOptions::new()
                .create(true)
                .append(true)
                .open(path)
                .map_err(|source| SharedError::LogFile {
                    path: path.to_path_buf(),
                    source,
                })?;
            Some(
                fmt::layer()
                    .with_ansi(false)
                    .with_target(true)
                    .with_writer(Mutex::new(file)),
            )
        }
        None => None,
    };

    let stdout_layer = fmt::layer()
        .with_target(true)
        .with_thread_ids(false)
        .with_file(false)
        .with_line_number(false)
        .compact();

    if let Err(e) = tracing_subscriber::registry()
        .with(env_filter)
        .with(stdout_layer)
        .with(file_layer)
        .try_init()
    {
        // A global subscriber already exists (e.g. a second test in the same binary)
        tracing::debug!("Tracing already initialized: {}", e);
    }

    Ok(())
}
