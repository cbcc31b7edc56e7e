//! E2E Testing Framework for kubectl-strace
//!
//! Provisions a throwaway namespace per test, applies the workload manifests
//! into it, waits for them to settle, runs the traced tool against them and
//! checks the syscalls it captured. Cleanup is always attempted and never
//! waited on.
//!
//! ## Main Interface
//!
//! A scenario is a [`TestSession`] wrapped around an async body:
//!
//! ```rust,no_run
//! use tester::*;
//!
//! # async fn example() -> HarnessResult<()> {
//! let harness = Harness::new(HarnessConfig::from_env()?);
//! let tracer = harness.trace_invoker();
//! let mut session = harness.session("test_pod", &["target_pod.yaml"])?;
//!
//! session
//!     .run(|ctx| async move {
//!         let result = tracer.invoke("pod/target-pod", &ctx.namespace, &OutputTarget::Stdout, &[]).await?;
//!         assert_output_contains(&result, "execve").into_result()
//!     })
//!     .await
//! # }
//! ```

// Core modules
pub mod config;
pub mod error;
pub mod runtime;
pub mod scenarios;
pub mod testing;

// Main interfaces - re-exported at crate root for convenience
pub use config::{HarnessConfig, HarnessConfigBuilder};
pub use error::{HarnessError, HarnessResult};
pub use scenarios::{Harness, TestScenarios};
pub use testing::{Phase, TestSession};

// Supporting types
pub use runtime::{
    AssetLifecycleManager, CommandResult, CommandRunner, CommandSpec, ConditionRaceWaiter, LogBundle, LogCollector,
    OutputTarget, ProcessCommandRunner, RacePolicy, SetupPolicy, TestContext, TraceInvoker, WaitOutcome,
};
pub use testing::{AssertionResult, assert_bundle_not_empty, assert_every_log_contains, assert_output_contains};
