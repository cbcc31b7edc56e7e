//! Harness Configuration
//!
//! Locations of the binaries and assets under test plus the knobs that
//! control readiness waits and setup strictness.

use std::path::{Path, PathBuf};
use std::time::Duration;

use crate::error::{HarnessError, HarnessResult};
use crate::runtime::readiness::DEFAULT_CONDITIONS;
use crate::runtime::{RacePolicy, SetupPolicy, TraceDefaults};

#[derive(Debug, Clone)]
pub struct HarnessConfig {
    /// Repository root; other defaults are derived from it
    pub repo_dir: PathBuf,
    pub kstrace_bin: PathBuf,
    pub asset_dir: PathBuf,
    pub kubectl: String,
    pub trace: TraceDefaults,
    pub ready_conditions: Vec<String>,
    pub race_policy: RacePolicy,
    /// `None` waits forever for readiness
    pub ready_deadline: Option<Duration>,
    pub setup_policy: SetupPolicy,
}

impl Default for HarnessConfig {
    fn default() -> Self {
        // Tests are launched from <repo>/test
        Self::for_repo("..")
    }
}

impl HarnessConfig {
    /// Create a new builder
    pub fn builder() -> crate::config::builder::HarnessConfigBuilder {
        crate::config::builder::HarnessConfigBuilder::new()
    }

    /// Defaults laid out relative to a repository root
    pub fn for_repo(repo_dir: impl AsRef<Path>) -> Self {
        let repo_dir = repo_dir.as_ref().to_path_buf();
        Self {
            kstrace_bin: repo_dir.join("bin").join("kubectl-strace"),
            asset_dir: repo_dir.join("test").join("assets"),
            repo_dir,
            kubectl: "kubectl".to_string(),
            trace: TraceDefaults::default(),
            ready_conditions: DEFAULT_CONDITIONS.iter().map(|c| c.to_string()).collect(),
            race_policy: RacePolicy::default(),
            ready_deadline: Some(Duration::from_secs(120)),
            setup_policy: SetupPolicy::default(),
        }
    }

    /// Defaults overridden by the process environment (after loading `.env`)
    pub fn from_env() -> HarnessResult<Self> {
        dotenv::dotenv().ok();
        Self::default().with_overrides(|key| std::env::var(key).ok())
    }

    /// Apply overrides from any key/value source
    pub fn with_overrides<F>(mut self, lookup: F) -> HarnessResult<Self>
    where
        F: Fn(&str) -> Option<String>,
    {
        if let Some(repo) = lookup("E2E_REPO_DIR") {
            let overridden = Self::for_repo(repo);
            self.kstrace_bin = overridden.kstrace_bin;
            self.asset_dir = overridden.asset_dir;
            self.repo_dir = overridden.repo_dir;
        }
        if let Some(bin) = lookup("KSTRACE_BIN") {
            self.kstrace_bin = PathBuf::from(bin);
        }
        if let Some(dir) = lookup("E2E_ASSET_DIR") {
            self.asset_dir = PathBuf::from(dir);
        }
        if let Some(kubectl) = lookup("KUBECTL") {
            self.kubectl = kubectl;
        }
        if let Some(socket) = lookup("KSTRACE_SOCKET_PATH") {
            self.trace.socket_path = PathBuf::from(socket);
        }
        if let Some(image) = lookup("KSTRACE_IMAGE") {
            self.trace.image = Some(image);
        }
        if let Some(secs) = lookup("KSTRACE_TRACE_TIMEOUT_SECS") {
            self.trace.trace_timeout = Duration::from_secs(parse_secs("KSTRACE_TRACE_TIMEOUT_SECS", &secs)?);
        }
        if let Some(secs) = lookup("E2E_READY_TIMEOUT_SECS") {
            // 0 disables the deadline
            self.ready_deadline = match parse_secs("E2E_READY_TIMEOUT_SECS", &secs)? {
                0 => None,
                n => Some(Duration::from_secs(n)),
            };
        }
        if let Some(policy) = lookup("E2E_RACE_POLICY") {
            self.race_policy = policy
                .parse()
                .map_err(|e: String| HarnessError::config("E2E_RACE_POLICY", e))?;
        }
        if let Some(policy) = lookup("E2E_SETUP_POLICY") {
            self.setup_policy = policy
                .parse()
                .map_err(|e: String| HarnessError::config("E2E_SETUP_POLICY", e))?;
        }
        Ok(self)
    }

    pub fn validate(&self) -> HarnessResult<()> {
        if self.ready_conditions.is_empty() {
            return Err(HarnessError::config("ready_conditions", "at least one condition is required"));
        }
        if self.kubectl.trim().is_empty() {
            return Err(HarnessError::config("kubectl", "must not be empty"));
        }
        Ok(())
    }
}

fn parse_secs(field: &str, value: &str) -> HarnessResult<u64> {
    value
        .trim()
        .parse()
        .map_err(|e| HarnessError::config(field, format!("'{value}' is not a number of seconds: {e}")))
}
