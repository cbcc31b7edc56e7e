//! Invocation of the traced tool (`kubectl-strace`)

use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;

use shared::format_go_duration;
use tracing::info;

use crate::error::HarnessResult;
use crate::runtime::command::{CommandResult, CommandRunner, CommandSpec};

/// Where the traced tool writes syscall output
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum OutputTarget {
    /// Stream to standard output (`--output -`)
    Stdout,
    /// One `*.log` file per traced container under this directory
    Directory(PathBuf),
}

impl OutputTarget {
    pub fn as_arg(&self) -> String {
        match self {
            OutputTarget::Stdout => "-".to_string(),
            OutputTarget::Directory(dir) => dir.to_string_lossy().into_owned(),
        }
    }
}

/// Flags passed on every invocation
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TraceDefaults {
    pub log_file: PathBuf,
    pub log_level: String,
    pub socket_path: PathBuf,
    pub trace_timeout: Duration,
    /// Trace image override (`--image`); the tool's built-in image when `None`
    pub image: Option<String>,
}

impl Default for TraceDefaults {
    fn default() -> Self {
        Self {
            log_file: PathBuf::from("kstrace.log"),
            log_level: "trace".to_string(),
            socket_path: PathBuf::from("/run/k3s/containerd/containerd.sock"),
            trace_timeout: Duration::from_secs(10),
            image: None,
        }
    }
}

pub struct TraceInvoker {
    binary: PathBuf,
    defaults: TraceDefaults,
    runner: Arc<dyn CommandRunner>,
}

impl TraceInvoker {
    pub fn new(binary: impl Into<PathBuf>, defaults: TraceDefaults, runner: Arc<dyn CommandRunner>) -> Self {
        Self {
            binary: binary.into(),
            defaults,
            runner,
        }
    }

    pub fn defaults(&self) -> &TraceDefaults {
        &self.defaults
    }

    /// Build the command line without running it
    pub fn command(&self, target: &str, namespace: &str, output: &OutputTarget, extra_args: &[String]) -> CommandSpec {
        let mut spec = CommandSpec::new(self.binary.to_string_lossy())
            .args(["-n", namespace])
            .arg(format!("--log-file={}", self.defaults.log_file.display()))
            .arg(format!("--log-level={}", self.defaults.log_level))
            .arg(format!("--socket-path={}", self.defaults.socket_path.display()))
            .arg(format!("--trace-timeout={}", format_go_duration(self.defaults.trace_timeout)));

        if let Some(ref image) = self.defaults.image {
            spec = spec.args(["--image", image.as_str()]);
        }

        spec.arg("--output")
            .arg(output.as_arg())
            .args(extra_args.iter().cloned())
            .arg(target)
    }

    /// Trace `target` once; no retries
    pub async fn invoke(
        &self,
        target: &str,
        namespace: &str,
        output: &OutputTarget,
        extra_args: &[String],
    ) -> HarnessResult<CommandResult> {
        let spec = self.command(target, namespace, output, extra_args);
        info!("🔬 Tracing {} in {} (output: {})", target, namespace, output.as_arg());
        self.runner.run(&spec).await
    }
}
