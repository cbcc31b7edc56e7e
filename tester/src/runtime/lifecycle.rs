//! Namespace and asset lifecycle
//!
//! Setup is sequential: create the namespace, then apply each asset and wait
//! for it to settle before touching the next one, so a config object can be
//! listed ahead of the workload that needs it. Teardown only issues deletes
//! and never waits for the cluster to finish garbage collection.

use std::path::Path;
use std::str::FromStr;
use std::sync::Arc;

use tracing::{info, warn};

use crate::error::{HarnessError, HarnessResult};
use crate::runtime::command::{CommandResult, CommandRunner, CommandSpec};
use crate::runtime::context::TestContext;
use crate::runtime::kubectl::Kubectl;
use crate::runtime::race::WaitOutcome;
use crate::runtime::readiness::ReadinessProbe;

/// How setup reacts to a cluster command exiting non-zero
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum SetupPolicy {
    /// Fail the test before its body runs
    #[default]
    Strict,
    /// Log the failure and keep going
    Lenient,
}

impl FromStr for SetupPolicy {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "strict" => Ok(Self::Strict),
            "lenient" => Ok(Self::Lenient),
            other => Err(format!("unknown setup policy '{other}' (expected strict or lenient)")),
        }
    }
}

pub struct AssetLifecycleManager {
    runner: Arc<dyn CommandRunner>,
    readiness: Arc<dyn ReadinessProbe>,
    kubectl: Kubectl,
    policy: SetupPolicy,
}

impl AssetLifecycleManager {
    pub fn new(runner: Arc<dyn CommandRunner>, readiness: Arc<dyn ReadinessProbe>, kubectl: Kubectl) -> Self {
        Self {
            runner,
            readiness,
            kubectl,
            policy: SetupPolicy::default(),
        }
    }

    pub fn with_policy(mut self, policy: SetupPolicy) -> Self {
        self.policy = policy;
        self
    }

    pub fn policy(&self) -> SetupPolicy {
        self.policy
    }

    pub async fn create_namespace(&self, name: &str) -> HarnessResult<()> {
        info!("📦 Creating namespace {}", name);
        let spec = self.kubectl.create_namespace(name);
        let result = self.runner.run(&spec).await?;
        self.check("create namespace", &spec, result)
    }

    /// Forced delete; returns as soon as the request is issued
    pub fn delete_namespace(&self, name: &str) {
        info!("🗑️ Deleting namespace {}", name);
        self.detach(&self.kubectl.delete_namespace(name));
    }

    /// Apply each asset in order, waiting for readiness before the next one
    pub async fn create_assets(&self, assets: &[String], namespace: &str, asset_dir: &Path) -> HarnessResult<()> {
        if assets.is_empty() {
            return Ok(());
        }

        info!("📦 Creating test assets {:?} in {}", assets, namespace);
        for asset in assets {
            let path = asset_dir.join(asset);
            let spec = self.kubectl.apply(namespace, &path);
            let result = self.runner.run(&spec).await?;
            self.check("apply asset", &spec, result)?;

            let outcome = self.readiness.wait_until_ready(namespace, &path).await?;
            self.check_ready(asset, &outcome)?;
        }
        Ok(())
    }

    /// Forced delete of every asset; returns as soon as the requests are issued
    pub fn delete_assets(&self, assets: &[String], namespace: &str, asset_dir: &Path) {
        if assets.is_empty() {
            return;
        }

        info!("🗑️ Deleting test assets {:?} from {}", assets, namespace);
        for asset in assets {
            self.detach(&self.kubectl.delete_asset(namespace, &asset_dir.join(asset)));
        }
    }

    /// Namespace first, then every asset in order, each one ready before the next
    pub async fn setup(&self, context: &TestContext) -> HarnessResult<()> {
        self.create_namespace(&context.namespace).await?;
        self.create_assets(&context.assets, &context.namespace, &context.asset_dir)
            .await
    }

    /// Best-effort cleanup. Safe to call any number of times.
    pub fn teardown(&self, context: &TestContext) {
        self.delete_assets(&context.assets, &context.namespace, &context.asset_dir);
        self.delete_namespace(&context.namespace);
    }

    fn detach(&self, spec: &CommandSpec) {
        if let Err(e) = self.runner.fire_and_forget(spec) {
            warn!("⚠️ Cleanup request `{}` could not be issued: {}", spec, e);
        }
    }

    fn check_ready(&self, asset: &str, outcome: &WaitOutcome) -> HarnessResult<()> {
        let winner = &outcome.winner;
        if winner.success() {
            return Ok(());
        }

        match self.policy {
            SetupPolicy::Strict => Err(HarnessError::Setup {
                step: "wait ready".to_string(),
                status: winner.status,
                output: format!("{} watcher for {} exited first", winner.condition, asset),
            }),
            SetupPolicy::Lenient => {
                warn!(
                    "⚠️ {} settled with {} exiting {}; continuing",
                    asset, winner.condition, winner.status
                );
                Ok(())
            }
        }
    }

    fn check(&self, step: &str, spec: &CommandSpec, result: CommandResult) -> HarnessResult<()> {
        if result.success() {
            return Ok(());
        }

        match self.policy {
            SetupPolicy::Strict => Err(HarnessError::Setup {
                step: step.to_string(),
                status: result.status,
                output: result.output,
            }),
            SetupPolicy::Lenient => {
                warn!(
                    "⚠️ `{}` exited with status {}, continuing: {}",
                    spec,
                    result.status,
                    result.output.trim()
                );
                Ok(())
            }
        }
    }
}
