//! Duration rendering in the format accepted by Go's `time.ParseDuration`
//!
//! The traced tool parses `--trace-timeout` with Go semantics, so `10s`,
//! `1m30s` and `250ms` are all valid while `10` is not.

use std::time::Duration;

/// Render a duration as a Go duration string (`1h2m3s`, `1m30s`, `250ms`).
///
/// Sub-millisecond precision is dropped. A zero duration renders as `0s`.
pub fn format_go_duration(duration: Duration) -> String {
    let total_ms = duration.as_millis();
    if total_ms == 0 {
        return "0s".to_string();
    }

    let hours = total_ms / 3_600_000;
    let minutes = (total_ms / 60_000) % 60;
    let seconds = (total_ms / 1_000) % 60;
    let millis = total_ms % 1_000;

    if total_ms < 1_000 {
        return format!("{millis}ms");
    }

    // Fractional seconds follow Go's own Duration.String form ("1.25s")
    let mut rendered = String::new();
    if hours > 0 {
        rendered.push_str(&format!("{hours}h"));
    }
    if hours > 0 || minutes > 0 {
        rendered.push_str(&format!("{minutes}m"));
    }
    if millis == 0 {
        rendered.push_str(&format!("{seconds}s"));
    } else {
        let fraction = format!("{millis:03}");
        rendered.push_str(&format!("{seconds}.{}s", fraction.trim_end_matches('0')));
    }
    rendered
}
