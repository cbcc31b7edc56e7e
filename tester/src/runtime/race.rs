//! First-to-finish race between condition watchers
//!
//! Different resource kinds expose different readiness conditions (a Pod has
//! `Ready`, a Deployment has `Available`), and only one of them ever applies.
//! Rather than asking which kind a manifest holds, the harness launches one
//! watcher per condition and takes whichever finishes first.
//!
//! Each watcher child is owned by its own task. The task awaits that one
//! child's exit and reports through a channel, so no process-wide "wait for
//! any child" call is made and several races can run side by side. Once the
//! race is decided every other watcher is killed and reaped before returning.

use std::str::FromStr;
use std::time::Duration;

use tokio::process::Child;
use tokio::sync::{mpsc, oneshot};
use tokio::task::JoinHandle;
use tokio::time::{Instant, timeout_at};
use tracing::{debug, info, warn};

use crate::error::{HarnessError, HarnessResult};
use crate::runtime::command::{CommandSpec, exit_code};

/// What counts as winning the race
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum RacePolicy {
    /// Any watcher exiting ends the race, whatever its status
    #[default]
    FirstExit,
    /// Only a zero exit ends the race; failures are kept as diagnostics
    FirstSuccess,
}

impl FromStr for RacePolicy {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().replace('_', "-").as_str() {
            "first-exit" => Ok(Self::FirstExit),
            "first-success" => Ok(Self::FirstSuccess),
            other => Err(format!("unknown race policy '{other}' (expected first-exit or first-success)")),
        }
    }
}

/// One watcher to launch: the condition it waits for and the command doing the waiting
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct WatchCommand {
    pub condition: String,
    pub spec: CommandSpec,
}

impl WatchCommand {
    pub fn new(condition: impl Into<String>, spec: CommandSpec) -> Self {
        Self {
            condition: condition.into(),
            spec,
        }
    }
}

/// A watcher that exited on its own
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct WatcherReport {
    pub condition: String,
    pub pid: Option<u32>,
    pub status: i32,
}

impl WatcherReport {
    pub fn success(&self) -> bool {
        self.status == 0
    }
}

/// Result of a decided race
#[derive(Debug, Clone)]
pub struct WaitOutcome {
    pub winner: WatcherReport,
    /// Watchers that exited unsuccessfully before the winner (only under `FirstSuccess`)
    pub failures: Vec<WatcherReport>,
    /// PIDs of watchers that were still running and got killed
    pub cancelled: Vec<u32>,
}

struct RunningWatcher {
    condition: String,
    pid: Option<u32>,
    cancel: Option<oneshot::Sender<()>>,
    /// Resolves to `true` when the watcher was killed rather than exiting on its own
    task: JoinHandle<bool>,
}

/// Launches watchers and blocks until one of them decides the race
#[derive(Debug, Clone)]
pub struct ConditionRaceWaiter {
    policy: RacePolicy,
    deadline: Option<Duration>,
}

impl ConditionRaceWaiter {
    pub fn new(policy: RacePolicy, deadline: Option<Duration>) -> Self {
        Self { policy, deadline }
    }

    /// Wait with no deadline at all; a race nobody wins blocks forever
    pub fn unbounded(policy: RacePolicy) -> Self {
        Self::new(policy, None)
    }

    pub fn policy(&self) -> RacePolicy {
        self.policy
    }

    pub fn deadline(&self) -> Option<Duration> {
        self.deadline
    }

    /// Run the race for `target` (used only in logs and errors).
    pub async fn race(&self, target: &str, watchers: Vec<WatchCommand>) -> HarnessResult<WaitOutcome> {
        if watchers.is_empty() {
            return Err(HarnessError::NoWatchers {
                target: target.to_string(),
            });
        }

        let conditions: Vec<&str> = watchers.iter().map(|w| w.condition.as_str()).collect();
        info!("⏳ Waiting for {} to reach one of {:?}", target, conditions);

        // Capacity covers one report per watcher, so a task never blocks on send
        let (report_tx, mut report_rx) = mpsc::channel(watchers.len());
        let mut running = Vec::with_capacity(watchers.len());

        for watcher in watchers {
            match Self::launch(watcher, report_tx.clone()) {
                Ok(handle) => running.push(handle),
                Err(e) => {
                    Self::cancel_all(running).await;
                    return Err(e);
                }
            }
        }
        drop(report_tx);

        let deadline_at = self.deadline.map(|d| Instant::now() + d);
        let mut failures = Vec::new();

        let decided = loop {
            let next = match deadline_at {
                Some(at) => match timeout_at(at, report_rx.recv()).await {
                    Ok(report) => report,
                    Err(_) => {
                        warn!("⏰ {} not ready within {:?}", target, self.deadline.unwrap_or_default());
                        break Err(HarnessError::WaitDeadlineExceeded {
                            target: target.to_string(),
                            deadline: self.deadline.unwrap_or_default(),
                        });
                    }
                },
                None => report_rx.recv().await,
            };

            match next {
                Some(report) if self.policy == RacePolicy::FirstExit || report.success() => break Ok(report),
                Some(report) => {
                    debug!(
                        "❌ Watcher for {} exited with status {} on {}",
                        report.condition, report.status, target
                    );
                    failures.push(report);
                }
                None => {
                    break Err(HarnessError::AllWatchersFailed {
                        target: target.to_string(),
                        conditions: failures.iter().map(|r| r.condition.clone()).collect(),
                    });
                }
            }
        };

        let cancelled = Self::cancel_all(running).await;

        let winner = decided?;
        info!(
            "✅ {} settled via {} (status {}), cancelled {} watcher(s)",
            target,
            winner.condition,
            winner.status,
            cancelled.len()
        );

        Ok(WaitOutcome {
            winner,
            failures,
            cancelled,
        })
    }

    fn launch(watcher: WatchCommand, reports: mpsc::Sender<WatcherReport>) -> HarnessResult<RunningWatcher> {
        let mut command = watcher.spec.to_command();
        command
            .stdin(std::process::Stdio::null())
            .stdout(std::process::Stdio::null())
            .stderr(std::process::Stdio::null())
            .kill_on_drop(true);

        let child = command.spawn().map_err(|source| HarnessError::Spawn {
            program: watcher.spec.program.clone(),
            source,
        })?;
        let pid = child.id();
        debug!("👀 Watcher for {} started (PID: {:?}): {}", watcher.condition, pid, watcher.spec);

        let (cancel_tx, cancel_rx) = oneshot::channel();
        let condition = watcher.condition.clone();
        let task = tokio::spawn(Self::watch(child, condition, pid, cancel_rx, reports));

        Ok(RunningWatcher {
            condition: watcher.condition,
            pid,
            cancel: Some(cancel_tx),
            task,
        })
    }

    async fn watch(
        mut child: Child,
        condition: String,
        pid: Option<u32>,
        cancel: oneshot::Receiver<()>,
        reports: mpsc::Sender<WatcherReport>,
    ) -> bool {
        tokio::select! {
            status = child.wait() => {
                let status = match status {
                    Ok(status) => exit_code(status),
                    Err(e) => {
                        warn!("⚠️ Could not reap watcher for {}: {}", condition, e);
                        -1
                    }
                };
                let _ = reports.send(WatcherReport { condition, pid, status }).await;
                false
            }
            _ = cancel => {
                // kill() also waits, so the child is reaped before this task ends
                if let Err(e) = child.kill().await {
                    warn!("⚠️ Failed to kill watcher for {}: {}", condition, e);
                }
                true
            }
        }
    }

    /// Signal every watcher to stop and join all of them; returns the PIDs that were killed
    async fn cancel_all(running: Vec<RunningWatcher>) -> Vec<u32> {
        let mut running = running;
        for watcher in &mut running {
            if let Some(cancel) = watcher.cancel.take() {
                // Err means the watcher already exited on its own
                let _ = cancel.send(());
            }
        }

        let mut cancelled = Vec::new();
        for watcher in running {
            match watcher.task.await {
                Ok(true) => {
                    debug!("🛑 Cancelled watcher for {} (PID: {:?})", watcher.condition, watcher.pid);
                    cancelled.extend(watcher.pid);
                }
                Ok(false) => {}
                Err(e) => warn!("⚠️ Watcher task for {} ended abnormally: {}", watcher.condition, e),
            }
        }
        cancelled
    }
}

impl Default for ConditionRaceWaiter {
    fn default() -> Self {
        Self::new(RacePolicy::default(), Some(Duration::from_secs(120)))
    }
}
