//! Shared building blocks for the kstrace end-to-end harness
//!
//! Holds the pieces every harness binary needs regardless of scenario:
//! logging bootstrap, Go-style duration rendering for flags handed to the
//! traced tool, and the error type for both.

pub mod duration;
pub mod errors;
pub mod logging;

pub use duration::format_go_duration;
pub use errors::*;
