//! Per-test session: setup, body, guaranteed teardown
//!
//! A session walks `Init → NamespaceCreated → AssetsReady → BodyRunning →
//! TearingDown → Done`. Teardown is entered on every path out of setup or
//! the body, including a panicking body, and only issues delete requests.
//! If the session future itself is dropped (an outer timeout fired), the
//! deletes are issued from a drop guard instead.

use std::future::Future;
use std::panic::AssertUnwindSafe;
use std::path::PathBuf;
use std::sync::Arc;

use futures_util::FutureExt;
use tracing::{error, info, warn};

use crate::error::HarnessResult;
use crate::runtime::{AssetLifecycleManager, TestContext};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Phase {
    Init,
    NamespaceCreated,
    AssetsReady,
    BodyRunning,
    TearingDown,
    Done,
}

/// Issues teardown when dropped unless [`TeardownGuard::finish`] already did
struct TeardownGuard {
    lifecycle: Arc<AssetLifecycleManager>,
    context: TestContext,
    armed: bool,
}

impl TeardownGuard {
    fn new(lifecycle: Arc<AssetLifecycleManager>, context: TestContext) -> Self {
        Self {
            lifecycle,
            context,
            armed: true,
        }
    }

    fn finish(mut self) {
        self.armed = false;
        self.lifecycle.teardown(&self.context);
    }
}

impl Drop for TeardownGuard {
    fn drop(&mut self) {
        if self.armed {
            warn!("🚨 Session for {} cancelled, issuing cleanup", self.context.namespace);
            self.lifecycle.teardown(&self.context);
        }
    }
}

pub struct TestSession {
    context: TestContext,
    lifecycle: Arc<AssetLifecycleManager>,
    phases: Vec<Phase>,
    /// Log file of the traced tool, dumped when the body fails
    tool_log: Option<PathBuf>,
    failure_log: Option<String>,
}

impl TestSession {
    pub fn new(context: TestContext, lifecycle: AssetLifecycleManager) -> Self {
        Self {
            context,
            lifecycle: Arc::new(lifecycle),
            phases: vec![Phase::Init],
            tool_log: None,
            failure_log: None,
        }
    }

    pub fn with_tool_log(mut self, path: impl Into<PathBuf>) -> Self {
        self.tool_log = Some(path.into());
        self
    }

    pub fn context(&self) -> &TestContext {
        &self.context
    }

    pub fn phase(&self) -> Phase {
        self.phases.last().copied().unwrap_or(Phase::Init)
    }

    /// Every phase entered so far, in order
    pub fn phases(&self) -> &[Phase] {
        &self.phases
    }

    /// Traced tool log captured after the last failed body, if it could be read
    pub fn failure_log(&self) -> Option<&str> {
        self.failure_log.as_deref()
    }

    fn enter(&mut self, phase: Phase) {
        tracing::debug!("🔀 {}: {:?} -> {:?}", self.context.namespace, self.phase(), phase);
        self.phases.push(phase);
    }

    /// Run `body` between setup and teardown.
    ///
    /// A setup error skips the body and is returned after teardown. A panic
    /// in the body is resumed after teardown.
    pub async fn run<F, Fut, T>(&mut self, body: F) -> HarnessResult<T>
    where
        F: FnOnce(TestContext) -> Fut,
        Fut: Future<Output = HarnessResult<T>>,
    {
        info!("🧪 Starting test in namespace {}", self.context.namespace);
        let guard = TeardownGuard::new(self.lifecycle.clone(), self.context.clone());

        let outcome = match self.setup().await {
            Ok(()) => {
                self.enter(Phase::BodyRunning);
                AssertUnwindSafe(body(self.context.clone())).catch_unwind().await
            }
            Err(e) => {
                error!("❌ Setup failed for {}: {}", self.context.namespace, e);
                Ok(Err(e))
            }
        };

        let body_failed = self.phases.contains(&Phase::BodyRunning) && !matches!(outcome, Ok(Ok(_)));
        if body_failed {
            self.failure_log = self.dump_tool_log().await;
        }

        self.enter(Phase::TearingDown);
        guard.finish();
        self.enter(Phase::Done);

        match outcome {
            Ok(result) => {
                match &result {
                    Ok(_) => info!("🏁 Test in {} passed", self.context.namespace),
                    Err(e) => error!("❌ Test in {} failed: {}", self.context.namespace, e),
                }
                result
            }
            Err(panic) => std::panic::resume_unwind(panic),
        }
    }

    async fn setup(&mut self) -> HarnessResult<()> {
        self.lifecycle.setup(&self.context).await?;
        self.enter(Phase::NamespaceCreated);
        self.enter(Phase::AssetsReady);
        Ok(())
    }

    async fn dump_tool_log(&self) -> Option<String> {
        let path = self.tool_log.as_ref()?;

        match tokio::fs::read_to_string(path).await {
            Ok(contents) => {
                error!("📜 Traced tool log ({}):\n{}", path.display(), contents);
                Some(contents)
            }
            Err(e) => {
                warn!("⚠️ Traced tool log {} unavailable: {}", path.display(), e);
                None
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::HarnessError;
    use crate::runtime::command::{CommandResult, MockCommandRunner};
    use crate::runtime::race::{WaitOutcome, WatcherReport};
    use crate::runtime::readiness::MockReadinessProbe;
    use crate::runtime::Kubectl;
    use mockall::Sequence;
    use mockall::predicate::eq;
    use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
    use std::time::Duration;

    fn context() -> TestContext {
        TestContext {
            namespace: "test-session-wxyz".to_string(),
            assets: vec!["target_pod.yaml".to_string()],
            asset_dir: PathBuf::from("/assets"),
        }
    }

    fn ready_probe() -> MockReadinessProbe {
        let mut readiness = MockReadinessProbe::new();
        readiness.expect_wait_until_ready().returning(|_, _| {
            Ok(WaitOutcome {
                winner: WatcherReport {
                    condition: "Ready".to_string(),
                    pid: None,
                    status: 0,
                },
                failures: Vec::new(),
                cancelled: Vec::new(),
            })
        });
        readiness
    }

    /// Runner whose setup commands exit with `status` and whose teardown is counted
    fn runner(status: i32, teardown_calls: usize) -> MockCommandRunner {
        let mut runner = MockCommandRunner::new();
        runner
            .expect_run()
            .returning(move |_| Ok(CommandResult::new(status, "")));
        runner
            .expect_fire_and_forget()
            .times(teardown_calls)
            .returning(|_| Ok(()));
        runner
    }

    fn session(runner: MockCommandRunner) -> TestSession {
        let lifecycle = AssetLifecycleManager::new(Arc::new(runner), Arc::new(ready_probe()), Kubectl::default());
        TestSession::new(context(), lifecycle)
    }

    #[tokio::test]
    async fn test_successful_run_walks_every_phase() {
        let mut session = session(runner(0, 2));

        let namespace = session.run(|ctx| async move { Ok(ctx.namespace) }).await.unwrap();

        assert_eq!(namespace, "test-session-wxyz");
        assert_eq!(
            session.phases(),
            &[
                Phase::Init,
                Phase::NamespaceCreated,
                Phase::AssetsReady,
                Phase::BodyRunning,
                Phase::TearingDown,
                Phase::Done
            ]
        );
    }

    #[tokio::test]
    async fn test_failing_body_still_tears_down() {
        let mut session = session(runner(0, 2));

        let err = session
            .run(|_| async { Err::<(), _>(HarnessError::assertion("expected substring not found")) })
            .await
            .unwrap_err();

        assert!(matches!(err, HarnessError::AssertionFailed { .. }));
        assert_eq!(session.phase(), Phase::Done);
    }

    #[tokio::test]
    async fn test_setup_failure_skips_body_but_tears_down() {
        let mut session = session(runner(1, 2));
        let body_ran = Arc::new(AtomicBool::new(false));

        let flag = body_ran.clone();
        let err = session
            .run(|_| async move {
                flag.store(true, Ordering::SeqCst);
                Ok(())
            })
            .await
            .unwrap_err();

        assert!(err.is_setup_failure());
        assert!(!body_ran.load(Ordering::SeqCst));
        assert!(!session.phases().contains(&Phase::BodyRunning));
        assert_eq!(session.phase(), Phase::Done);
    }

    #[tokio::test]
    async fn test_panicking_body_tears_down_then_resumes_panic() {
        let mut session = session(runner(0, 2));

        let caught = AssertUnwindSafe(session.run(|_| async {
            if true {
                panic!("assertion inside test body");
            }
            Ok(())
        }))
        .catch_unwind()
        .await;

        assert!(caught.is_err());
        assert_eq!(session.phase(), Phase::Done);
    }

    #[tokio::test]
    async fn test_failed_body_dumps_tool_log() {
        let dir = tempfile::tempdir().unwrap();
        let log = dir.path().join("kstrace.log");
        std::fs::write(&log, "level=error msg=\"no running containers\"").unwrap();

        let mut session = session(runner(0, 2)).with_tool_log(&log);
        let result = session
            .run(|_| async { Err::<(), _>(HarnessError::assertion("no execve")) })
            .await;

        assert!(result.is_err());
        assert_eq!(session.failure_log(), Some("level=error msg=\"no running containers\""));
        assert_eq!(session.phase(), Phase::Done);
    }

    #[tokio::test]
    async fn test_passing_body_leaves_tool_log_alone() {
        let dir = tempfile::tempdir().unwrap();
        let log = dir.path().join("kstrace.log");
        std::fs::write(&log, "level=info msg=\"attached\"").unwrap();

        let mut session = session(runner(0, 2)).with_tool_log(&log);
        session.run(|_| async { Ok(()) }).await.unwrap();

        assert_eq!(session.failure_log(), None);
    }

    #[tokio::test]
    async fn test_missing_tool_log_is_not_an_error() {
        let mut session = session(runner(0, 2)).with_tool_log("/nonexistent/kstrace.log");
        let err = session
            .run(|_| async { Err::<(), _>(HarnessError::assertion("no execve")) })
            .await
            .unwrap_err();

        assert!(matches!(err, HarnessError::AssertionFailed { .. }));
        assert_eq!(session.failure_log(), None);
    }

    #[tokio::test]
    async fn test_cancelled_session_still_issues_teardown() {
        let deletes = Arc::new(AtomicUsize::new(0));
        let mut runner = MockCommandRunner::new();
        runner.expect_run().returning(|_| Ok(CommandResult::new(0, "")));
        let counter = deletes.clone();
        runner.expect_fire_and_forget().returning(move |_| {
            counter.fetch_add(1, Ordering::SeqCst);
            Ok(())
        });

        let mut session = session(runner);
        let outcome = tokio::time::timeout(
            Duration::from_millis(200),
            session.run(|_| async {
                tokio::time::sleep(Duration::from_secs(60)).await;
                Ok(())
            }),
        )
        .await;

        assert!(outcome.is_err());
        assert_eq!(session.phase(), Phase::BodyRunning);
        // One asset delete plus the namespace delete
        assert_eq!(deletes.load(Ordering::SeqCst), 2);
    }

    #[tokio::test]
    async fn test_namespace_created_before_assets_applied() {
        let mut runner = MockCommandRunner::new();
        let mut seq = Sequence::new();
        runner
            .expect_run()
            .with(eq(Kubectl::default().create_namespace("test-session-wxyz")))
            .times(1)
            .in_sequence(&mut seq)
            .returning(|_| Ok(CommandResult::new(0, "namespace/test-session-wxyz created")));
        runner
            .expect_run()
            .withf(|spec| spec.args.first().map(String::as_str) == Some("apply"))
            .times(1)
            .in_sequence(&mut seq)
            .returning(|_| Ok(CommandResult::new(0, "pod/target-pod created")));
        runner.expect_fire_and_forget().times(2).returning(|_| Ok(()));

        let mut session = session(runner);
        session.run(|_| async { Ok(()) }).await.unwrap();

        assert_eq!(&session.phases()[..3], &[Phase::Init, Phase::NamespaceCreated, Phase::AssetsReady]);
    }
}
