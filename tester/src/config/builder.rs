//! Harness Configuration Builder
//!
//! Provides a flexible builder pattern for constructing harness configurations

use super::HarnessConfig;
use crate::runtime::{RacePolicy, SetupPolicy};
use std::path::PathBuf;
use std::time::Duration;

pub struct HarnessConfigBuilder {
    config: HarnessConfig,
}

impl HarnessConfigBuilder {
    pub fn new() -> Self {
        Self {
            config: HarnessConfig::default(),
        }
    }

    /// Start from an existing configuration (e.g. one loaded from the environment)
    pub fn from_config(config: HarnessConfig) -> Self {
        Self { config }
    }

    /// Re-derive binary and asset locations from a repository root
    pub fn repo_dir<P: Into<PathBuf>>(mut self, repo_dir: P) -> Self {
        let derived = HarnessConfig::for_repo(repo_dir.into());
        self.config.repo_dir = derived.repo_dir;
        self.config.kstrace_bin = derived.kstrace_bin;
        self.config.asset_dir = derived.asset_dir;
        self
    }

    /// Set the traced tool binary
    pub fn kstrace_bin<P: Into<PathBuf>>(mut self, path: P) -> Self {
        self.config.kstrace_bin = path.into();
        self
    }

    /// Set the directory holding asset manifests
    pub fn asset_dir<P: Into<PathBuf>>(mut self, path: P) -> Self {
        self.config.asset_dir = path.into();
        self
    }

    /// Set the cluster CLI program
    pub fn kubectl<S: Into<String>>(mut self, program: S) -> Self {
        self.config.kubectl = program.into();
        self
    }

    /// Set the container runtime socket handed to the traced tool
    pub fn socket_path<P: Into<PathBuf>>(mut self, path: P) -> Self {
        self.config.trace.socket_path = path.into();
        self
    }

    /// Set the traced tool's own log file
    pub fn tool_log_file<P: Into<PathBuf>>(mut self, path: P) -> Self {
        self.config.trace.log_file = path.into();
        self
    }

    /// Set the traced tool's log level (trace, debug, info, warn, error)
    pub fn tool_log_level<S: Into<String>>(mut self, level: S) -> Self {
        self.config.trace.log_level = level.into();
        self
    }

    /// Set how long the traced tool captures syscalls
    pub fn trace_timeout(mut self, timeout: Duration) -> Self {
        self.config.trace.trace_timeout = timeout;
        self
    }

    /// Set the trace image
    pub fn trace_image<S: Into<String>>(mut self, image: S) -> Self {
        self.config.trace.image = Some(image.into());
        self
    }

    /// Replace the raced readiness conditions
    pub fn ready_conditions<I, S>(mut self, conditions: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.config.ready_conditions = conditions.into_iter().map(Into::into).collect();
        self
    }

    pub fn race_policy(mut self, policy: RacePolicy) -> Self {
        self.config.race_policy = policy;
        self
    }

    /// Set the readiness deadline (None waits forever)
    pub fn ready_deadline(mut self, deadline: Option<Duration>) -> Self {
        self.config.ready_deadline = deadline;
        self
    }

    pub fn setup_policy(mut self, policy: SetupPolicy) -> Self {
        self.config.setup_policy = policy;
        self
    }

    /// Build the configuration
    pub fn build(self) -> HarnessConfig {
        self.config
    }
}

impl Default for HarnessConfigBuilder {
    fn default() -> Self {
        Self::new()
    }
}
