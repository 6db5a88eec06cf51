//! Prometheus metrics collection for scumbag.
//!
//! Exposed on `/metrics` when `bot.metrics_port` is set.
//!
//! - `scumbag_inbound_lines_total{server}` - PRIVMSG lines handed to the fan-out
//! - `scumbag_links_total{outcome}` - link archive results (new, existing, ignored)
//! - `scumbag_command_total{command}` / `scumbag_command_duration_seconds{command}`
//! - `scumbag_command_errors_total{command, error}`
//! - `scumbag_fanout_failures_total{task, kind}` - fan-out tasks that errored or panicked
//! - `scumbag_connected_sessions` - sessions currently connected
//! - `scumbag_reconnects_total{result}`

use prometheus::{
    Encoder, HistogramOpts, HistogramVec, IntCounterVec, IntGauge, Opts, Registry, TextEncoder,
};
use std::sync::OnceLock;

/// Global Prometheus registry for all metrics.
pub static REGISTRY: OnceLock<Registry> = OnceLock::new();

pub fn registry() -> &'static Registry {
    REGISTRY.get_or_init(Registry::new)
}

// ========================================================================
// Counters (monotonic increasing)
// ========================================================================

/// Inbound PRIVMSG lines by server.
pub static INBOUND_LINES: OnceLock<IntCounterVec> = OnceLock::new();

/// Link archive outcomes.
pub static LINKS: OnceLock<IntCounterVec> = OnceLock::new();

/// Commands processed by name.
pub static COMMAND_COUNTER: OnceLock<IntCounterVec> = OnceLock::new();

/// Command errors by name and error kind.
pub static COMMAND_ERRORS: OnceLock<IntCounterVec> = OnceLock::new();

/// Fan-out task failures by task and kind (error or panic).
pub static FANOUT_FAILURES: OnceLock<IntCounterVec> = OnceLock::new();

/// Reconnect attempts by result.
pub static RECONNECTS: OnceLock<IntCounterVec> = OnceLock::new();

// ========================================================================
// Gauges and histograms
// ========================================================================

pub static CONNECTED_SESSIONS: OnceLock<IntGauge> = OnceLock::new();

/// Command latency by name.
pub static COMMAND_LATENCY: OnceLock<HistogramVec> = OnceLock::new();

/// Initialize the Prometheus metrics registry.
///
/// Safe to call more than once; later calls are no-ops.
pub fn init() {
    let r = registry();

    macro_rules! register {
        ($metric:ident, $init:expr) => {
            if $metric.get().is_none() {
                match $init {
                    Ok(m) => {
                        if let Err(e) = r.register(Box::new(m.clone())) {
                            tracing::warn!(error = %e, concat!("Failed to register metric ", stringify!($metric)));
                        }
                        let _ = $metric.set(m);
                    }
                    Err(e) => {
                        tracing::warn!(error = %e, concat!("Failed to create metric ", stringify!($metric)));
                    }
                }
            }
        };
    }

    register!(INBOUND_LINES, IntCounterVec::new(Opts::new("scumbag_inbound_lines_total", "Inbound PRIVMSG lines"), &["server"]));
    register!(LINKS, IntCounterVec::new(Opts::new("scumbag_links_total", "Link archive outcomes"), &["outcome"]));
    register!(COMMAND_COUNTER, IntCounterVec::new(Opts::new("scumbag_command_total", "Bot commands processed by name"), &["command"]));
    register!(COMMAND_LATENCY, HistogramVec::new(
        HistogramOpts::new("scumbag_command_duration_seconds", "Bot command latency by name")
            .buckets(vec![0.001, 0.005, 0.01, 0.05, 0.1, 0.5, 1.0, 2.5, 5.0, 10.0]),
        &["command"]));
    register!(COMMAND_ERRORS, IntCounterVec::new(Opts::new("scumbag_command_errors_total", "Bot command errors"), &["command", "error"]));
    register!(FANOUT_FAILURES, IntCounterVec::new(Opts::new("scumbag_fanout_failures_total", "Fan-out task failures"), &["task", "kind"]));
    register!(CONNECTED_SESSIONS, IntGauge::new("scumbag_connected_sessions", "Sessions currently connected"));
    register!(RECONNECTS, IntCounterVec::new(Opts::new("scumbag_reconnects_total", "Reconnect attempts"), &["result"]));
}

/// Gather all metrics and encode them in Prometheus text format.
pub fn gather_metrics() -> String {
    let encoder = TextEncoder::new();
    let metric_families = registry().gather();
    let mut buffer = vec![];
    if let Err(e) = encoder.encode(&metric_families, &mut buffer) {
        tracing::error!(error = %e, "Failed to encode Prometheus metrics");
        return String::new();
    }
    match String::from_utf8(buffer) {
        Ok(s) => s,
        Err(e) => {
            tracing::error!(error = %e, "Prometheus metrics were not valid UTF-8");
            String::new()
        }
    }
}

// ============================================================================
// Helper functions
// ============================================================================

fn inc(metric: &OnceLock<IntCounterVec>, labels: &[&str]) {
    if let Some(c) = metric.get() {
        c.with_label_values(labels).inc();
    }
}

#[inline]
pub fn record_inbound_line(server: &str) {
    inc(&INBOUND_LINES, &[server]);
}

/// Record a link archive outcome: "new", "existing" or "ignored".
#[inline]
pub fn record_link(outcome: &str) {
    inc(&LINKS, &[outcome]);
}

/// Record a command execution with latency.
#[inline]
pub fn record_command(command: &str, duration_secs: f64) {
    inc(&COMMAND_COUNTER, &[command]);
    if let Some(h) = COMMAND_LATENCY.get() {
        h.with_label_values(&[command]).observe(duration_secs);
    }
}

/// Record a command error.
#[inline]
pub fn record_command_error(command: &str, error: &str) {
    inc(&COMMAND_ERRORS, &[command, error]);
}

/// Record a failed fan-out task. `kind` is "error" or "panic".
#[inline]
pub fn record_fanout_failure(task: &str, kind: &str) {
    inc(&FANOUT_FAILURES, &[task, kind]);
}

/// Record a reconnect attempt: "success", "failure" or "aborted".
#[inline]
pub fn record_reconnect(result: &str) {
    inc(&RECONNECTS, &[result]);
}

#[inline]
pub fn inc_connected_sessions() {
    if let Some(g) = CONNECTED_SESSIONS.get() {
        g.inc();
    }
}

#[inline]
pub fn dec_connected_sessions() {
    if let Some(g) = CONNECTED_SESSIONS.get() {
        g.dec();
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_metrics_lifecycle() {
        init();
        init();

        record_command("url", 0.001);
        record_link("new");
        record_fanout_failure("spell", "panic");

        let output = gather_metrics();
        assert!(output.contains("scumbag_command_total"));
        assert!(output.contains("scumbag_links_total"));
        assert!(output.contains("scumbag_fanout_failures_total"));
    }
}
