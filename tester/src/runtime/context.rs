//! Per-test context
//!
//! Each test gets its own namespace, derived from the test name plus a random
//! four-letter suffix. The suffix makes collisions between concurrent runs
//! unlikely (26^4 combinations) but does not rule them out.

use std::path::PathBuf;

use rand::Rng;

use crate::error::{HarnessError, HarnessResult};

/// Longest name a namespace (an RFC 1123 label) may have
pub const MAX_DNS_LABEL_LEN: usize = 63;

/// Number of random lowercase characters appended to the test name
pub const SUFFIX_LEN: usize = 4;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TestContext {
    pub namespace: String,
    pub assets: Vec<String>,
    pub asset_dir: PathBuf,
}

impl TestContext {
    pub fn new(test_name: &str, assets: Vec<String>, asset_dir: impl Into<PathBuf>) -> HarnessResult<Self> {
        Self::with_rng(test_name, assets, asset_dir, &mut rand::thread_rng())
    }

    pub fn with_rng<R: Rng>(
        test_name: &str,
        assets: Vec<String>,
        asset_dir: impl Into<PathBuf>,
        rng: &mut R,
    ) -> HarnessResult<Self> {
        let base = sanitize_test_name(test_name).ok_or_else(|| HarnessError::InvalidTestName {
            name: test_name.to_string(),
        })?;

        Ok(Self {
            namespace: format!("{base}-{}", random_suffix(rng)),
            assets,
            asset_dir: asset_dir.into(),
        })
    }

    /// Full path of one asset file
    pub fn asset_path(&self, asset: &str) -> PathBuf {
        self.asset_dir.join(asset)
    }

    pub fn asset_paths(&self) -> Vec<PathBuf> {
        self.assets.iter().map(|asset| self.asset_path(asset)).collect()
    }
}

/// Turn a test name into the DNS-compliant base of a namespace.
///
/// Lowercases, maps `_` to `-`, drops whitespace and any other character a
/// DNS label cannot hold, trims hyphens and leaves room for the suffix.
/// Returns `None` when nothing usable is left.
pub fn sanitize_test_name(test_name: &str) -> Option<String> {
    let mapped: String = test_name
        .to_lowercase()
        .chars()
        .filter_map(|c| match c {
            '_' => Some('-'),
            'a'..='z' | '0'..='9' | '-' => Some(c),
            _ => None,
        })
        .collect();

    let max_base = MAX_DNS_LABEL_LEN - SUFFIX_LEN - 1;
    let truncated: String = mapped.trim_matches('-').chars().take(max_base).collect();
    let base = truncated.trim_end_matches('-');

    if base.is_empty() { None } else { Some(base.to_string()) }
}

pub fn random_suffix<R: Rng>(rng: &mut R) -> String {
    (0..SUFFIX_LEN).map(|_| rng.gen_range(b'a'..=b'z') as char).collect()
}

/// RFC 1123 label: 1-63 chars of `[a-z0-9-]`, alphanumeric at both ends
pub fn is_dns_label(value: &str) -> bool {
    let bytes = value.as_bytes();
    let (Some(first), Some(last)) = (bytes.first(), bytes.last()) else {
        return false;
    };

    value.len() <= MAX_DNS_LABEL_LEN
        && first.is_ascii_alphanumeric()
        && last.is_ascii_alphanumeric()
        && bytes
            .iter()
            .all(|b| b.is_ascii_lowercase() || b.is_ascii_digit() || *b == b'-')
}

#[cfg(test)]
mod tests {
    use super::*;
    use rand::SeedableRng;
    use rand::rngs::StdRng;

    #[test]
    fn test_namespace_from_method_name() {
        let ctx = TestContext::new("test_pod", vec!["target_pod.yaml".into()], "/assets").unwrap();

        assert!(ctx.namespace.starts_with("test-pod-"));
        assert_eq!(ctx.namespace.len(), "test-pod-".len() + SUFFIX_LEN);
        assert!(is_dns_label(&ctx.namespace));
    }

    #[test]
    fn test_namespace_for_awkward_names() {
        let long_name = "very_long_name_".repeat(10);
        let names = [
            "Test Deployment",
            "__leading_and_trailing__",
            "UPPER_case_With.Dots/and:colons",
            "scénario_ünïcode_42",
            long_name.as_str(),
        ];

        for name in names {
            let ctx = TestContext::new(name, Vec::new(), "/assets").unwrap();
            assert!(is_dns_label(&ctx.namespace), "{name:?} produced {:?}", ctx.namespace);
        }
    }

    #[test]
    fn test_name_without_usable_characters() {
        let err = TestContext::new("___ ...", Vec::new(), "/assets").unwrap_err();
        assert!(matches!(err, HarnessError::InvalidTestName { .. }));
    }

    #[test]
    fn test_suffix_is_lowercase_letters() {
        let mut rng = StdRng::seed_from_u64(7);
        for _ in 0..100 {
            let suffix = random_suffix(&mut rng);
            assert_eq!(suffix.len(), SUFFIX_LEN);
            assert!(suffix.chars().all(|c| c.is_ascii_lowercase()));
        }
    }

    #[test]
    fn test_suffixes_vary() {
        let mut rng = StdRng::seed_from_u64(42);
        let suffixes: std::collections::HashSet<String> = (0..50).map(|_| random_suffix(&mut rng)).collect();
        assert!(suffixes.len() > 40, "expected mostly distinct suffixes, got {}", suffixes.len());
    }

    #[test]
    fn test_asset_paths_follow_declaration_order() {
        let ctx = TestContext::new(
            "test_ordering",
            vec!["config.yaml".into(), "workload.yaml".into()],
            "/repo/test/assets",
        )
        .unwrap();

        assert_eq!(
            ctx.asset_paths(),
            vec![
                PathBuf::from("/repo/test/assets/config.yaml"),
                PathBuf::from("/repo/test/assets/workload.yaml")
            ]
        );
    }

    #[test]
    fn test_is_dns_label() {
        assert!(is_dns_label("test-pod-abcd"));
        assert!(is_dns_label("a"));
        assert!(!is_dns_label(""));
        assert!(!is_dns_label("-leading"));
        assert!(!is_dns_label("trailing-"));
        assert!(!is_dns_label("Upper"));
        assert!(!is_dns_label("under_score"));
        assert!(!is_dns_label(&"a".repeat(64)));
    }
}
