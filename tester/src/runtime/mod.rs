//! Runtime Management
//!
//! Process execution, condition races and the cluster resource lifecycle used
//! while a test runs.

pub mod collector;
pub mod command;
pub mod context;
pub mod kubectl;
pub mod lifecycle;
pub mod race;
pub mod readiness;
pub mod trace;

// Re-export main types
pub use collector::{LogBundle, LogCollector};
pub use command::{CommandResult, CommandRunner, CommandSpec, ProcessCommandRunner};
pub use context::{TestContext, is_dns_label};
pub use kubectl::Kubectl;
pub use lifecycle::{AssetLifecycleManager, SetupPolicy};
pub use race::{ConditionRaceWaiter, RacePolicy, WaitOutcome, WatchCommand, WatcherReport};
pub use readiness::{KubectlReadiness, ReadinessProbe};
pub use trace::{OutputTarget, TraceDefaults, TraceInvoker};
