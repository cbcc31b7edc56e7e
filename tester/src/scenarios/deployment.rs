//! Multi-replica deployment, directory output

use tracing::warn;

use super::{EXPECTED_SYSCALL, Harness};
use crate::error::{HarnessError, HarnessResult};
use crate::runtime::{LogCollector, OutputTarget};
use crate::testing::{assert_bundle_not_empty, assert_every_log_contains, assert_logs_under_pod_prefix};

pub const TEST_NAME: &str = "test_deployment";
pub const ASSETS: &[&str] = &["target_deployment.yaml"];
pub const TARGET: &str = "deploy/target-deployment";
/// Pods of the deployment are named `<prefix>-<hash>-<id>`
pub const POD_PREFIX: &str = "target-deployment";

/// Trace every replica into a temp directory and check each log file
pub async fn deployment(harness: &Harness) -> HarnessResult<()> {
    tracing::info!("🧪 Deployment: directory output");

    let tracer = harness.trace_invoker();
    let mut session = harness.session(TEST_NAME, ASSETS)?;

    session
        .run(|ctx| async move {
            let output_dir = tempfile::tempdir().map_err(|e| HarnessError::io(std::env::temp_dir(), e))?;
            let output = OutputTarget::Directory(output_dir.path().to_path_buf());

            let result = tracer.invoke(TARGET, &ctx.namespace, &output, &[]).await?;
            if !result.success() {
                warn!("⚠️ Tracer exited with status {}; checking whatever it wrote", result.status);
            }

            let logs = LogCollector::new().collect(output_dir.path())?;
            assert_bundle_not_empty(&logs).into_result()?;
            assert_logs_under_pod_prefix(&logs, output_dir.path(), POD_PREFIX).into_result()?;
            assert_every_log_contains(&logs, EXPECTED_SYSCALL).into_result()
        })
        .await?;

    tracing::info!("✅ Deployment: PASSED");
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::runtime::CommandResult;
    use crate::scenarios::test_support::{fake_harness, output_dir};

    fn write_replica_logs(spec: &crate::runtime::CommandSpec, contents: &[&str]) {
        let dir = output_dir(spec).expect("--output directory");
        for (i, content) in contents.iter().enumerate() {
            let pod_dir = dir.join(format!("{POD_PREFIX}-5f7b9-{i}"));
            std::fs::create_dir_all(&pod_dir).unwrap();
            std::fs::write(pod_dir.join("app_strace.log"), content).unwrap();
        }
    }

    #[tokio::test]
    async fn test_deployment_passes_when_every_replica_logged_syscall() {
        let harness = fake_harness(|spec| {
            write_replica_logs(spec, &["execve(\"/app\")", "execve(\"/app\") = 0"]);
            CommandResult::new(0, "")
        });

        deployment(&harness).await.unwrap();
    }

    #[tokio::test]
    async fn test_deployment_fails_without_logs() {
        let harness = fake_harness(|_| CommandResult::new(0, ""));

        let err = deployment(&harness).await.unwrap_err();
        assert!(matches!(err, HarnessError::AssertionFailed { ref message } if message.contains("No *.log")));
    }

    #[tokio::test]
    async fn test_deployment_fails_when_one_replica_lacks_syscall() {
        let harness = fake_harness(|spec| {
            write_replica_logs(spec, &["execve(\"/app\")", "read(3, ...)"]);
            CommandResult::new(0, "")
        });

        let err = deployment(&harness).await.unwrap_err();
        assert!(matches!(err, HarnessError::AssertionFailed { ref message } if message.contains("1 of 2")));
    }
}
