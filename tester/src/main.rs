//! E2E Test Runner
//!
//! Runs kubectl-strace end-to-end scenarios against the current cluster:
//! - Creates a namespace per scenario and applies its manifests
//! - Races readiness conditions until the workload settles
//! - Invokes the traced tool and checks the captured syscalls
//! - Issues best-effort deletes for everything it created

use clap::Parser;
use std::path::PathBuf;
use std::time::Duration;
use tokio::time::timeout;

use tester::{Harness, HarnessConfig, HarnessConfigBuilder, RacePolicy, SetupPolicy, TestScenarios};

#[derive(Parser)]
#[command(name = "tester")]
#[command(about = "E2E testing framework for kubectl-strace")]
struct Args {
    /// Test scenario to run (pod, deployment, all)
    #[arg(long, default_value = "all")]
    scenario: String,

    /// Outer timeout for the whole run, in seconds
    #[arg(long, default_value = "600")]
    timeout_secs: u64,

    /// Path to the kubectl-strace binary
    #[arg(long)]
    kstrace_bin: Option<PathBuf>,

    /// Directory holding the asset manifests
    #[arg(long)]
    asset_dir: Option<PathBuf>,

    /// Cluster CLI program
    #[arg(long)]
    kubectl: Option<String>,

    /// Readiness deadline per asset in seconds (0 waits forever)
    #[arg(long)]
    ready_timeout_secs: Option<u64>,

    /// Readiness race policy (first-exit, first-success)
    #[arg(long)]
    race_policy: Option<RacePolicy>,

    /// Setup failure handling (strict, lenient)
    #[arg(long)]
    setup_policy: Option<SetupPolicy>,

    /// File receiving a copy of the harness logs
    #[arg(long, default_value = "test_logs.log")]
    log_file: PathBuf,

    /// Enable verbose tracing output
    #[arg(long)]
    verbose: bool,
}

impl Args {
    fn into_config(self, base: HarnessConfig) -> HarnessConfig {
        let mut builder = HarnessConfigBuilder::from_config(base);

        if let Some(bin) = self.kstrace_bin {
            builder = builder.kstrace_bin(bin);
        }
        if let Some(dir) = self.asset_dir {
            builder = builder.asset_dir(dir);
        }
        if let Some(kubectl) = self.kubectl {
            builder = builder.kubectl(kubectl);
        }
        if let Some(secs) = self.ready_timeout_secs {
            builder = builder.ready_deadline((secs > 0).then(|| Duration::from_secs(secs)));
        }
        if let Some(policy) = self.race_policy {
            builder = builder.race_policy(policy);
        }
        if let Some(policy) = self.setup_policy {
            builder = builder.setup_policy(policy);
        }

        builder.build()
    }
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let args = Args::parse();

    let level = if args.verbose { "debug" } else { "info" };
    shared::logging::init_tracing(level, Some(&args.log_file))?;

    let scenario = args.scenario.clone();
    let outer_timeout = Duration::from_secs(args.timeout_secs);
    let config = args.into_config(HarnessConfig::from_env()?);
    config.validate()?;

    tracing::info!("🧪 Starting E2E test framework");
    tracing::info!(
        "Scenario: {}, Timeout: {}s, kstrace: {}",
        scenario,
        outer_timeout.as_secs(),
        config.kstrace_bin.display()
    );

    let scenarios = TestScenarios::new(Harness::new(config));

    match timeout(outer_timeout, scenarios.run_scenario(&scenario)).await {
        Ok(Ok(())) => {
            tracing::info!("✅ Test scenario '{}' completed successfully", scenario);
        }
        Ok(Err(e)) => {
            tracing::error!("❌ Test scenario '{}' failed: {}", scenario, e);
            return Err(e.into());
        }
        Err(_) => {
            tracing::error!(
                "⏰ Test scenario '{}' timed out after {}s",
                scenario,
                outer_timeout.as_secs()
            );
            return Err("Test timeout".into());
        }
    }

    tracing::info!("🏁 E2E testing completed");
    Ok(())
}
