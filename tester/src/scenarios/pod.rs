//! Single-container pod, streamed output

use super::{EXPECTED_SYSCALL, Harness};
use crate::error::HarnessResult;
use crate::runtime::OutputTarget;
use crate::testing::assert_output_contains;

pub const TEST_NAME: &str = "test_pod";
pub const ASSETS: &[&str] = &["target_pod.yaml"];
pub const TARGET: &str = "pod/target-pod";

/// Trace a pod with `--output -` and look for the syscall in stdout
pub async fn pod(harness: &Harness) -> HarnessResult<()> {
    tracing::info!("🧪 Pod: streamed output");

    let tracer = harness.trace_invoker();
    let mut session = harness.session(TEST_NAME, ASSETS)?;

    session
        .run(|ctx| async move {
            let result = tracer.invoke(TARGET, &ctx.namespace, &OutputTarget::Stdout, &[]).await?;
            assert_output_contains(&result, EXPECTED_SYSCALL).into_result()
        })
        .await?;

    tracing::info!("✅ Pod: PASSED");
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::HarnessError;
    use crate::runtime::CommandResult;
    use crate::scenarios::test_support::fake_harness;

    #[tokio::test]
    async fn test_pod_passes_when_stdout_has_syscall() {
        let harness = fake_harness(|spec| {
            assert!(spec.args.windows(2).any(|pair| pair == ["--output", "-"]));
            assert_eq!(spec.args.last().map(String::as_str), Some(TARGET));
            CommandResult::new(0, "[pid 12] execve(\"/bin/sleep\", [\"sleep\", \"1\"], ...) = 0")
        });

        pod(&harness).await.unwrap();
    }

    #[tokio::test]
    async fn test_pod_fails_without_syscall() {
        let harness = fake_harness(|_| CommandResult::new(1, "level=fatal msg=\"no container found\""));

        let err = pod(&harness).await.unwrap_err();
        assert!(matches!(err, HarnessError::AssertionFailed { ref message } if message.contains("execve")));
    }
}
