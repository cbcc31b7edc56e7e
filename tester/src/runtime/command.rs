//! External command execution
//!
//! Every interaction with the cluster and with the traced tool goes through
//! [`CommandRunner`]. The real implementation merges stdout and stderr into a
//! single pipe so callers see the interleaving the process actually produced.

use std::fmt;
use std::os::fd::OwnedFd;
use std::process::{ExitStatus, Stdio};

use async_trait::async_trait;
use tokio::io::AsyncReadExt;
use tokio::process::Command;
use tracing::{debug, warn};

use crate::error::{HarnessError, HarnessResult};

/// A program plus its arguments, rendered verbatim (no shell involved)
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CommandSpec {
    pub program: String,
    pub args: Vec<String>,
}

impl CommandSpec {
    pub fn new(program: impl Into<String>) -> Self {
        Self {
            program: program.into(),
            args: Vec::new(),
        }
    }

    pub fn arg(mut self, arg: impl Into<String>) -> Self {
        self.args.push(arg.into());
        self
    }

    pub fn args<I, S>(mut self, args: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.args.extend(args.into_iter().map(Into::into));
        self
    }

    pub(crate) fn to_command(&self) -> Command {
        let mut command = Command::new(&self.program);
        command.args(&self.args);
        command
    }

    fn spawn_error(&self, source: std::io::Error) -> HarnessError {
        HarnessError::Spawn {
            program: self.program.clone(),
            source,
        }
    }
}

impl fmt::Display for CommandSpec {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.program)?;
        for arg in &self.args {
            write!(f, " {arg}")?;
        }
        Ok(())
    }
}

/// Exit status and combined stdout/stderr of one finished command
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CommandResult {
    pub status: i32,
    pub output: String,
}

impl CommandResult {
    pub fn new(status: i32, output: impl Into<String>) -> Self {
        Self {
            status,
            output: output.into(),
        }
    }

    pub fn success(&self) -> bool {
        self.status == 0
    }

    pub fn contains(&self, needle: &str) -> bool {
        self.output.contains(needle)
    }
}

/// Exit code of a finished process; `-signal` when it was killed by a signal.
pub fn exit_code(status: ExitStatus) -> i32 {
    use std::os::unix::process::ExitStatusExt;

    status
        .code()
        .unwrap_or_else(|| -status.signal().unwrap_or(1))
}

/// Command execution abstraction for dependency injection
#[mockall::automock]
#[async_trait]
pub trait CommandRunner: Send + Sync {
    /// Run to completion and return the exit status plus merged output.
    ///
    /// No timeout is applied here; a caller that needs a deadline passes it
    /// to the program itself (for example `--trace-timeout`).
    async fn run(&self, spec: &CommandSpec) -> HarnessResult<CommandResult>;

    /// Start the command and return immediately.
    ///
    /// The process is spawned before this returns, so the request is always
    /// issued. Its completion is observed by a detached task that only logs.
    /// Outside a tokio runtime nothing is spawned and an error is returned.
    fn fire_and_forget(&self, spec: &CommandSpec) -> HarnessResult<()>;
}

/// [`CommandRunner`] backed by real OS processes
#[derive(Debug, Default, Clone)]
pub struct ProcessCommandRunner;

impl ProcessCommandRunner {
    pub fn new() -> Self {
        Self
    }

    /// One pipe, two write ends: both child streams land in the same buffer.
    ///
    /// Every end is close-on-exec so a child spawned concurrently elsewhere
    /// cannot hold the write end open; the `dup2` onto fds 1 and 2 in our own
    /// child clears the flag there.
    fn merged_output_pipe() -> std::io::Result<(OwnedFd, OwnedFd, OwnedFd)> {
        let (reader, writer) = cloexec_pipe()?;
        // try_clone dups with F_DUPFD_CLOEXEC
        let stderr_writer = writer.try_clone()?;
        Ok((reader, writer, stderr_writer))
    }
}

#[cfg(any(target_os = "linux", target_os = "android", target_os = "freebsd", target_os = "netbsd", target_os = "openbsd"))]
fn cloexec_pipe() -> std::io::Result<(OwnedFd, OwnedFd)> {
    nix::unistd::pipe2(nix::fcntl::OFlag::O_CLOEXEC).map_err(std::io::Error::from)
}

#[cfg(not(any(target_os = "linux", target_os = "android", target_os = "freebsd", target_os = "netbsd", target_os = "openbsd")))]
fn cloexec_pipe() -> std::io::Result<(OwnedFd, OwnedFd)> {
    use nix::fcntl::{FcntlArg, FdFlag, fcntl};
    use std::os::fd::AsRawFd;

    let (reader, writer) = nix::unistd::pipe().map_err(std::io::Error::from)?;
    for fd in [&reader, &writer] {
        fcntl(fd.as_raw_fd(), FcntlArg::F_SETFD(FdFlag::FD_CLOEXEC)).map_err(std::io::Error::from)?;
    }
    Ok((reader, writer))
}

#[async_trait]
impl CommandRunner for ProcessCommandRunner {
    async fn run(&self, spec: &CommandSpec) -> HarnessResult<CommandResult> {
        debug!("▶️ Running: {}", spec);

        let (reader, stdout_writer, stderr_writer) =
            Self::merged_output_pipe().map_err(|source| spec.spawn_error(source))?;

        let mut command = spec.to_command();
        command
            .stdin(Stdio::null())
            .stdout(Stdio::from(stdout_writer))
            .stderr(Stdio::from(stderr_writer));

        let mut child = command.spawn().map_err(|source| spec.spawn_error(source))?;
        // The command still owns the parent's copies of the write ends; EOF never
        // arrives while they are open.
        drop(command);

        let mut pipe = tokio::fs::File::from_std(std::fs::File::from(reader));
        let mut raw = Vec::new();
        let (read_result, wait_result) = tokio::join!(pipe.read_to_end(&mut raw), child.wait());

        let status = wait_result.map_err(|source| spec.spawn_error(source))?;
        if let Err(e) = read_result {
            warn!("⚠️ Output of `{}` could not be fully read: {}", spec, e);
        }

        let result = CommandResult::new(exit_code(status), String::from_utf8_lossy(&raw).into_owned());
        debug!("⏹️ `{}` exited with status {}", spec, result.status);
        Ok(result)
    }

    fn fire_and_forget(&self, spec: &CommandSpec) -> HarnessResult<()> {
        debug!("🚀 Detaching: {}", spec);

        let handle = tokio::runtime::Handle::try_current()
            .map_err(|e| spec.spawn_error(std::io::Error::other(e.to_string())))?;

        let mut command = spec.to_command();
        command.stdin(Stdio::null()).stdout(Stdio::null()).stderr(Stdio::piped());

        let child = command.spawn().map_err(|source| spec.spawn_error(source))?;
        let rendered = spec.to_string();

        handle.spawn(async move {
            match child.wait_with_output().await {
                Ok(output) if output.status.success() => {
                    debug!("✅ Detached `{}` finished", rendered);
                }
                Ok(output) => {
                    warn!(
                        "⚠️ Detached `{}` exited with status {}: {}",
                        rendered,
                        exit_code(output.status),
                        String::from_utf8_lossy(&output.stderr).trim()
                    );
                }
                Err(e) => {
                    warn!("⚠️ Detached `{}` could not be reaped: {}", rendered, e);
                }
            }
        });

        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_command_spec_display() {
        let spec = CommandSpec::new("kubectl").args(["get", "pods"]).arg("-A");
        assert_eq!(spec.to_string(), "kubectl get pods -A");
    }

    #[test]
    fn test_command_result_helpers() {
        let result = CommandResult::new(0, "execve(\"/bin/sh\")");
        assert!(result.success());
        assert!(result.contains("execve"));
        assert!(!CommandResult::new(2, "").success());
    }

    #[tokio::test]
    async fn test_run_merges_stdout_and_stderr() {
        let runner = ProcessCommandRunner::new();
        let spec = CommandSpec::new("sh").args(["-c", "echo out; echo err 1>&2"]);

        let result = runner.run(&spec).await.unwrap();

        assert!(result.success());
        assert!(result.contains("out"));
        assert!(result.contains("err"));
    }

    #[tokio::test]
    async fn test_run_reports_exit_status() {
        let runner = ProcessCommandRunner::new();
        let spec = CommandSpec::new("sh").args(["-c", "echo failing; exit 3"]);

        let result = runner.run(&spec).await.unwrap();

        assert_eq!(result.status, 3);
        assert_eq!(result.output.trim(), "failing");
    }

    #[tokio::test]
    async fn test_run_handles_output_larger_than_pipe_buffer() {
        let runner = ProcessCommandRunner::new();
        let spec = CommandSpec::new("sh").args(["-c", "head -c 200000 /dev/zero | tr '\\0' 'x'"]);

        let result = runner.run(&spec).await.unwrap();

        assert!(result.success());
        assert_eq!(result.output.len(), 200_000);
    }

    #[test]
    fn test_merged_output_pipe_is_close_on_exec() {
        use nix::fcntl::{FcntlArg, FdFlag, fcntl};
        use std::os::fd::AsRawFd;

        let (reader, stdout_writer, stderr_writer) = ProcessCommandRunner::merged_output_pipe().unwrap();

        for fd in [&reader, &stdout_writer, &stderr_writer] {
            let flags = FdFlag::from_bits_truncate(fcntl(fd.as_raw_fd(), FcntlArg::F_GETFD).unwrap());
            assert!(flags.contains(FdFlag::FD_CLOEXEC));
        }
    }

    #[tokio::test]
    async fn test_run_missing_program_is_spawn_error() {
        let runner = ProcessCommandRunner::new();
        let spec = CommandSpec::new("definitely-not-a-real-binary-12345");

        let err = runner.run(&spec).await.unwrap_err();
        assert!(matches!(err, HarnessError::Spawn { .. }));
    }

    #[tokio::test]
    async fn test_fire_and_forget_returns_before_completion() {
        let runner = ProcessCommandRunner::new();
        let spec = CommandSpec::new("sleep").arg("5");

        let started = std::time::Instant::now();
        runner.fire_and_forget(&spec).unwrap();

        assert!(started.elapsed() < std::time::Duration::from_secs(2));
    }

    #[test]
    fn test_fire_and_forget_outside_runtime_is_an_error() {
        let runner = ProcessCommandRunner::new();
        let err = runner.fire_and_forget(&CommandSpec::new("true")).unwrap_err();

        assert!(matches!(err, HarnessError::Spawn { .. }));
    }

    #[tokio::test]
    async fn test_fire_and_forget_missing_program_is_spawn_error() {
        let runner = ProcessCommandRunner::new();
        let spec = CommandSpec::new("definitely-not-a-real-binary-12345");

        assert!(runner.fire_and_forget(&spec).is_err());
    }
}
