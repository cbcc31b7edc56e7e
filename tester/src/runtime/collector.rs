//! Collection of trace logs written to an output directory
//!
//! Eager and one-shot: every `*.log` file under the directory is read fully
//! into memory. Fine for test output, not meant for large volumes.

use std::collections::BTreeMap;
use std::path::{Path, PathBuf};

use glob::{Pattern, glob};
use tracing::{debug, info};

use crate::error::{HarnessError, HarnessResult};

/// Log file path to full content
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct LogBundle {
    entries: BTreeMap<PathBuf, String>,
}

impl LogBundle {
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn get(&self, path: &Path) -> Option<&str> {
        self.entries.get(path).map(String::as_str)
    }

    pub fn iter(&self) -> impl Iterator<Item = (&Path, &str)> {
        self.entries.iter().map(|(path, content)| (path.as_path(), content.as_str()))
    }

    pub fn paths(&self) -> impl Iterator<Item = &Path> {
        self.entries.keys().map(PathBuf::as_path)
    }

    /// Files whose content lacks `needle`
    pub fn missing(&self, needle: &str) -> Vec<&Path> {
        self.iter()
            .filter(|(_, content)| !content.contains(needle))
            .map(|(path, _)| path)
            .collect()
    }

    pub fn all_contain(&self, needle: &str) -> bool {
        self.missing(needle).is_empty()
    }
}

impl FromIterator<(PathBuf, String)> for LogBundle {
    fn from_iter<I: IntoIterator<Item = (PathBuf, String)>>(iter: I) -> Self {
        Self {
            entries: iter.into_iter().collect(),
        }
    }
}

#[derive(Debug, Default, Clone, Copy)]
pub struct LogCollector;

impl LogCollector {
    pub const SUFFIX_PATTERN: &'static str = "**/*.log";

    pub fn new() -> Self {
        Self
    }

    /// Read every `*.log` file under `directory`, at any depth.
    ///
    /// An empty directory gives an empty bundle; an unreadable file is an error.
    pub fn collect(&self, directory: &Path) -> HarnessResult<LogBundle> {
        let pattern = format!(
            "{}/{}",
            Pattern::escape(&directory.to_string_lossy()),
            Self::SUFFIX_PATTERN
        );
        debug!("🔍 Collecting logs matching {}", pattern);

        let mut entries = BTreeMap::new();
        for entry in glob(&pattern)? {
            let path = entry.map_err(|e| {
                let path = e.path().to_path_buf();
                HarnessError::io(path, e.into_error())
            })?;

            if !path.is_file() {
                continue;
            }

            let content = std::fs::read_to_string(&path).map_err(|source| HarnessError::io(&path, source))?;
            entries.insert(path, content);
        }

        info!("📄 Collected {} log file(s) from {}", entries.len(), directory.display());
        Ok(LogBundle { entries })
    }
}
