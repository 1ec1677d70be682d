//! Structured health reporting for daemon lifecycle events.

use std::sync::Arc;

use ecryptfsd_config::Config;

use crate::bootstrap::BootstrapError;
use crate::dispatch::{DispatchError, DispatchSummary};

const HEALTH_TARGET: &str = concat!(env!("CARGO_PKG_NAME"), "::health");

/// Observer trait used to surface lifecycle events to telemetry sinks.
pub trait HealthReporter: Send + Sync {
    /// Invoked before configuration loading begins.
    fn bootstrap_starting(&self);

    /// Invoked after bootstrap completes successfully.
    fn bootstrap_succeeded(&self, config: &Config);

    /// Invoked when bootstrap fails.
    fn bootstrap_failed(&self, error: &BootstrapError);

    /// Invoked once the kernel channel is bound.
    fn channel_opened(&self, protocol: i32, pid: u32);

    /// Invoked when the dispatch loop ends after a QUIT.
    fn dispatch_stopped(&self, summary: &DispatchSummary);

    /// Invoked when the dispatch loop fails or never starts.
    fn dispatch_failed(&self, error: &DispatchError);
}

impl<T> HealthReporter for Arc<T>
where
    T: HealthReporter,
{
    fn bootstrap_starting(&self) {
        (**self).bootstrap_starting();
    }

    fn bootstrap_succeeded(&self, config: &Config) {
        (**self).bootstrap_succeeded(config);
    }

    fn bootstrap_failed(&self, error: &BootstrapError) {
        (**self).bootstrap_failed(error);
    }

    fn channel_opened(&self, protocol: i32, pid: u32) {
        (**self).channel_opened(protocol, pid);
    }

    fn dispatch_stopped(&self, summary: &DispatchSummary) {
        (**self).dispatch_stopped(summary);
    }

    fn dispatch_failed(&self, error: &DispatchError) {
        (**self).dispatch_failed(error);
    }
}

/// Default reporter that records lifecycle events using `tracing`.
#[derive(Debug, Default, Clone, Copy)]
pub struct StructuredHealthReporter;

impl StructuredHealthReporter {
    /// Builds a new reporter.
    #[must_use]
    pub fn new() -> Self {
        Self
    }
}

impl HealthReporter for StructuredHealthReporter {
    fn bootstrap_starting(&self) {
        tracing::info!(
            target: HEALTH_TARGET,
            event = "bootstrap_starting",
            pid = std::process::id(),
            "starting eCryptfs key daemon"
        );
    }

    fn bootstrap_succeeded(&self, config: &Config) {
        tracing::info!(
            target: HEALTH_TARGET,
            event = "bootstrap_succeeded",
            netlink_protocol = config.netlink_protocol(),
            error_threshold = config.error_threshold(),
            log_filter = %config.log_filter(),
            log_format = %config.log_format(),
            "daemon bootstrap completed"
        );
    }

    fn bootstrap_failed(&self, error: &BootstrapError) {
        tracing::error!(
            target: HEALTH_TARGET,
            event = "bootstrap_failed",
            error = %error,
            "daemon bootstrap failed"
        );
    }

    fn channel_opened(&self, protocol: i32, pid: u32) {
        tracing::debug!(
            target: HEALTH_TARGET,
            event = "channel_opened",
            protocol,
            pid,
            "eCryptfs netlink socket initialised"
        );
    }

    fn dispatch_stopped(&self, summary: &DispatchSummary) {
        tracing::info!(
            target: HEALTH_TARGET,
            event = "dispatch_stopped",
            hellos = summary.hellos,
            requests = summary.requests,
            replies = summary.replies,
            dropped = summary.dropped,
            spoofed = summary.spoofed,
            "dispatch loop stopped"
        );
    }

    fn dispatch_failed(&self, error: &DispatchError) {
        tracing::error!(
            target: HEALTH_TARGET,
            event = "dispatch_failed",
            error = %error,
            startup = error.is_startup_failure(),
            "dispatch loop failed"
        );
    }
}
