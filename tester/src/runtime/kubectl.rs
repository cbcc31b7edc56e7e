//! Cluster CLI argument assembly
//!
//! Only builds [`CommandSpec`]s; running them is the job of a
//! [`CommandRunner`](crate::runtime::CommandRunner).

use std::path::Path;

use crate::runtime::command::CommandSpec;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Kubectl {
    program: String,
}

impl Kubectl {
    pub fn new(program: impl Into<String>) -> Self {
        Self {
            program: program.into(),
        }
    }

    pub fn program(&self) -> &str {
        &self.program
    }

    fn command(&self) -> CommandSpec {
        CommandSpec::new(&self.program)
    }

    pub fn create_namespace(&self, name: &str) -> CommandSpec {
        self.command().args(["create", "ns", name])
    }

    pub fn delete_namespace(&self, name: &str) -> CommandSpec {
        self.command().args(["delete", "ns", "--force", "--wait=false", name])
    }

    pub fn apply(&self, namespace: &str, asset: &Path) -> CommandSpec {
        self.command()
            .args(["apply", "--wait", "-n", namespace, "-f"])
            .arg(asset.to_string_lossy())
    }

    pub fn delete_asset(&self, namespace: &str, asset: &Path) -> CommandSpec {
        self.command()
            .args(["delete", "--force", "--wait=false", "-n", namespace, "-f"])
            .arg(asset.to_string_lossy())
    }

    /// `kubectl wait` blocking until `condition` is true on the resources in `asset`
    pub fn wait_for_condition(&self, namespace: &str, asset: &Path, condition: &str) -> CommandSpec {
        self.command()
            .args(["wait", "-n", namespace, "-f"])
            .arg(asset.to_string_lossy())
            .arg(format!("--for=condition={condition}=true"))
    }
}

impl Default for Kubectl {
    fn default() -> Self {
        Self::new("kubectl")
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::path::PathBuf;

    fn asset() -> PathBuf {
        PathBuf::from("/repo/test/assets/target_pod.yaml")
    }

    #[test]
    fn test_namespace_commands() {
        let kubectl = Kubectl::default();
        assert_eq!(kubectl.create_namespace("test-pod-abcd").to_string(), "kubectl create ns test-pod-abcd");
        assert_eq!(
            kubectl.delete_namespace("test-pod-abcd").to_string(),
            "kubectl delete ns --force --wait=false test-pod-abcd"
        );
    }

    #[test]
    fn test_asset_commands() {
        let kubectl = Kubectl::new("/usr/local/bin/kubectl");
        assert_eq!(
            kubectl.apply("ns1", &asset()).to_string(),
            "/usr/local/bin/kubectl apply --wait -n ns1 -f /repo/test/assets/target_pod.yaml"
        );
        assert_eq!(
            kubectl.delete_asset("ns1", &asset()).to_string(),
            "/usr/local/bin/kubectl delete --force --wait=false -n ns1 -f /repo/test/assets/target_pod.yaml"
        );
    }

    #[test]
    fn test_wait_command() {
        let spec = Kubectl::default().wait_for_condition("ns1", &asset(), "Available");
        assert_eq!(
            spec.args,
            vec![
                "wait",
                "-n",
                "ns1",
                "-f",
                "/repo/test/assets/target_pod.yaml",
                "--for=condition=Available=true"
            ]
        );
    }
}
