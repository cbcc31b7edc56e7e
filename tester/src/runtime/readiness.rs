//! Readiness checks for applied assets

use std::path::Path;

use async_trait::async_trait;

use crate::error::HarnessResult;
use crate::runtime::kubectl::Kubectl;
use crate::runtime::race::{ConditionRaceWaiter, WaitOutcome, WatchCommand};

/// Conditions raced by default: pods report `Ready`, deployments `Available`
pub const DEFAULT_CONDITIONS: &[&str] = &["Ready", "Available"];

/// Readiness abstraction for dependency injection
#[mockall::automock]
#[async_trait]
pub trait ReadinessProbe: Send + Sync {
    /// Block until the resources described by `asset` reach a terminal observable state
    async fn wait_until_ready(&self, namespace: &str, asset: &Path) -> HarnessResult<WaitOutcome>;
}

/// Races one `kubectl wait` per condition
#[derive(Debug, Clone)]
pub struct KubectlReadiness {
    kubectl: Kubectl,
    conditions: Vec<String>,
    waiter: ConditionRaceWaiter,
}

impl KubectlReadiness {
    pub fn new(kubectl: Kubectl, conditions: Vec<String>, waiter: ConditionRaceWaiter) -> Self {
        Self {
            kubectl,
            conditions,
            waiter,
        }
    }

    pub fn watchers(&self, namespace: &str, asset: &Path) -> Vec<WatchCommand> {
        self.conditions
            .iter()
            .map(|condition| {
                WatchCommand::new(
                    condition.clone(),
                    self.kubectl.wait_for_condition(namespace, asset, condition),
                )
            })
            .collect()
    }
}

#[async_trait]
impl ReadinessProbe for KubectlReadiness {
    async fn wait_until_ready(&self, namespace: &str, asset: &Path) -> HarnessResult<WaitOutcome> {
        let target = format!("{}/{}", namespace, asset.display());
        self.waiter.race(&target, self.watchers(namespace, asset)).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::runtime::race::RacePolicy;
    use std::path::PathBuf;
    use std::time::Duration;

    fn conditions() -> Vec<String> {
        DEFAULT_CONDITIONS.iter().map(|c| c.to_string()).collect()
    }

    #[test]
    fn test_one_watcher_per_condition() {
        let readiness = KubectlReadiness::new(Kubectl::default(), conditions(), ConditionRaceWaiter::default());
        let watchers = readiness.watchers("ns1", &PathBuf::from("assets/target_deployment.yaml"));

        assert_eq!(watchers.len(), 2);
        assert_eq!(watchers[0].condition, "Ready");
        assert!(watchers[0].spec.args.contains(&"--for=condition=Ready=true".to_string()));
        assert_eq!(watchers[1].condition, "Available");
        assert!(watchers[1].spec.args.contains(&"--for=condition=Available=true".to_string()));
    }

    #[tokio::test]
    async fn test_wait_until_ready_races_the_watchers() {
        // `true` stands in for a kubectl that reports the condition immediately
        let readiness = KubectlReadiness::new(
            Kubectl::new("true"),
            conditions(),
            ConditionRaceWaiter::new(RacePolicy::FirstSuccess, Some(Duration::from_secs(10))),
        );

        let outcome = readiness
            .wait_until_ready("ns1", &PathBuf::from("assets/target_pod.yaml"))
            .await
            .unwrap();

        assert!(outcome.winner.success());
    }
}
