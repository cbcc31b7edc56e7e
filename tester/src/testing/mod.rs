//! Testing Framework
//!
//! This module provides the per-test session and the assertion helpers used
//! by scenario bodies.

pub mod assertions;
pub mod session;

// Re-export main types
pub use assertions::{
    AssertionResult, assert_bundle_not_empty, assert_every_log_contains, assert_exit_success, assert_logs_under_pod_prefix,
    assert_output_contains,
};
pub use session::{Phase, TestSession};
