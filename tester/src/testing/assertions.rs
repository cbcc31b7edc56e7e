//! Assertion helpers for test bodies
//!
//! Each check returns an [`AssertionResult`] instead of panicking, so a
//! scenario can log the details and turn the failure into a
//! [`HarnessError::AssertionFailed`] with `into_result`.

use std::path::Path;

use crate::error::{HarnessError, HarnessResult};
use crate::runtime::{CommandResult, LogBundle};

/// Lines of command output quoted in failure details
const OUTPUT_TAIL_LINES: usize = 20;

#[derive(Debug, Clone)]
pub struct AssertionResult {
    pub success: bool,
    pub message: String,
    pub details: Option<String>,
}

impl AssertionResult {
    pub fn success(message: String) -> Self {
        Self {
            success: true,
            message,
            details: None,
        }
    }

    pub fn failure(message: String, details: Option<String>) -> Self {
        Self {
            success: false,
            message,
            details,
        }
    }

    pub fn with_details(mut self, details: String) -> Self {
        self.details = Some(details);
        self
    }

    /// Log the outcome and convert a failure into an error
    pub fn into_result(self) -> HarnessResult<()> {
        if self.success {
            tracing::info!("✅ {}", self.message);
            return Ok(());
        }

        match self.details {
            Some(details) => {
                tracing::error!("❌ {}\n{}", self.message, details);
                Err(HarnessError::assertion(format!("{}\n{}", self.message, details)))
            }
            None => {
                tracing::error!("❌ {}", self.message);
                Err(HarnessError::assertion(self.message))
            }
        }
    }
}

fn output_tail(output: &str) -> String {
    let lines: Vec<&str> = output.lines().collect();
    let start = lines.len().saturating_sub(OUTPUT_TAIL_LINES);
    lines[start..].join("\n")
}

pub fn assert_exit_success(result: &CommandResult) -> AssertionResult {
    if result.success() {
        AssertionResult::success("Command exited successfully".to_string())
    } else {
        AssertionResult::failure(
            format!("Command exited with status {}", result.status),
            Some(output_tail(&result.output)),
        )
    }
}

pub fn assert_output_contains(result: &CommandResult, needle: &str) -> AssertionResult {
    if result.contains(needle) {
        AssertionResult::success(format!("Output contains '{needle}'"))
    } else {
        AssertionResult::failure(
            format!("Expected substring '{needle}' not found in output (status {})", result.status),
            Some(output_tail(&result.output)),
        )
    }
}

pub fn assert_bundle_not_empty(bundle: &LogBundle) -> AssertionResult {
    if bundle.is_empty() {
        AssertionResult::failure("No *.log files were produced".to_string(), None)
    } else {
        AssertionResult::success(format!("{} log file(s) produced", bundle.len()))
    }
}

pub fn assert_every_log_contains(bundle: &LogBundle, needle: &str) -> AssertionResult {
    let missing = bundle.missing(needle);
    if missing.is_empty() {
        AssertionResult::success(format!("All {} log file(s) contain '{needle}'", bundle.len()))
    } else {
        let listed: Vec<String> = missing.iter().map(|p| p.display().to_string()).collect();
        AssertionResult::failure(
            format!("{} of {} log file(s) lack '{needle}'", missing.len(), bundle.len()),
            Some(listed.join("\n")),
        )
    }
}

/// Every log must sit in a per-pod directory whose name starts with `prefix`
pub fn assert_logs_under_pod_prefix(bundle: &LogBundle, root: &Path, prefix: &str) -> AssertionResult {
    let stray: Vec<String> = bundle
        .paths()
        .filter(|path| {
            let pod_dir = path
                .strip_prefix(root)
                .ok()
                .and_then(|relative| relative.components().next())
                .map(|first| first.as_os_str().to_string_lossy().into_owned());
            !matches!(pod_dir, Some(ref dir) if dir.starts_with(prefix) && path.parent() != Some(root))
        })
        .map(|path| path.display().to_string())
        .collect();

    if stray.is_empty() {
        AssertionResult::success(format!("All log file(s) belong to '{prefix}' pods"))
    } else {
        AssertionResult::failure(
            format!("{} log file(s) outside a '{prefix}*' pod directory", stray.len()),
            Some(stray.join("\n")),
        )
    }
}
