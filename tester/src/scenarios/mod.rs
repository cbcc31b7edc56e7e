//! Test Scenarios
//!
//! One function per traced resource kind, plus the [`Harness`] that wires
//! configuration into sessions and tracer invocations.

pub mod deployment;
pub mod pod;

use std::sync::Arc;

use crate::config::HarnessConfig;
use crate::error::{HarnessError, HarnessResult};
use crate::runtime::{
    AssetLifecycleManager, CommandRunner, ConditionRaceWaiter, Kubectl, KubectlReadiness, ProcessCommandRunner,
    TestContext, TraceInvoker,
};
use crate::testing::TestSession;

/// Syscall every traced workload is expected to show
pub const EXPECTED_SYSCALL: &str = "execve";

/// Shared wiring for every scenario
#[derive(Clone)]
pub struct Harness {
    config: HarnessConfig,
    runner: Arc<dyn CommandRunner>,
}

impl Harness {
    pub fn new(config: HarnessConfig) -> Self {
        Self::with_runner(config, Arc::new(ProcessCommandRunner::new()))
    }

    pub fn with_runner(config: HarnessConfig, runner: Arc<dyn CommandRunner>) -> Self {
        Self { config, runner }
    }

    pub fn config(&self) -> &HarnessConfig {
        &self.config
    }

    pub fn kubectl(&self) -> Kubectl {
        Kubectl::new(&self.config.kubectl)
    }

    pub fn lifecycle(&self) -> AssetLifecycleManager {
        let waiter = ConditionRaceWaiter::new(self.config.race_policy, self.config.ready_deadline);
        let readiness = KubectlReadiness::new(self.kubectl(), self.config.ready_conditions.clone(), waiter);

        AssetLifecycleManager::new(self.runner.clone(), Arc::new(readiness), self.kubectl())
            .with_policy(self.config.setup_policy)
    }

    /// Fresh namespace and session for one test
    pub fn session(&self, test_name: &str, assets: &[&str]) -> HarnessResult<TestSession> {
        let context = TestContext::new(
            test_name,
            assets.iter().map(|asset| asset.to_string()).collect(),
            &self.config.asset_dir,
        )?;

        Ok(TestSession::new(context, self.lifecycle()).with_tool_log(&self.config.trace.log_file))
    }

    pub fn trace_invoker(&self) -> TraceInvoker {
        TraceInvoker::new(&self.config.kstrace_bin, self.config.trace.clone(), self.runner.clone())
    }
}

pub struct TestScenarios {
    harness: Harness,
}

impl TestScenarios {
    pub fn new(harness: Harness) -> Self {
        Self { harness }
    }

    pub fn harness(&self) -> &Harness {
        &self.harness
    }

    /// Run a specific scenario by name
    pub async fn run_scenario(&self, name: &str) -> HarnessResult<()> {
        match name {
            "pod" => pod::pod(&self.harness).await,
            "deployment" => deployment::deployment(&self.harness).await,

            // Run all scenarios
            "all" => {
                tracing::info!("🧪 Running FULL E2E Test Suite");
                pod::pod(&self.harness).await?;
                deployment::deployment(&self.harness).await?;
                tracing::info!("🏆 ALL E2E Tests COMPLETED Successfully!");
                Ok(())
            }

            _ => Err(HarnessError::UnknownScenario {
                name: name.to_string(),
                available: Self::available_scenarios().join(", "),
            }),
        }
    }

    /// Get list of available scenarios
    pub fn available_scenarios() -> Vec<&'static str> {
        vec!["pod", "deployment", "all"]
    }
}
