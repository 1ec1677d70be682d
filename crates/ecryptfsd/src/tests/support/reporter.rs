//! Test double for [`HealthReporter`] that records structured events for assertions.

use std::sync::Mutex;

use ecryptfsd_config::Config;

use crate::bootstrap::BootstrapError;
use crate::dispatch::{DispatchError, DispatchSummary};
use crate::health::HealthReporter;

/// Structured health events tracked during tests.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum HealthEvent {
    /// Bootstrap started.
    BootstrapStarting,
    /// Bootstrap completed successfully.
    BootstrapSucceeded,
    /// Bootstrap failed with an error description.
    BootstrapFailed(String),
    /// The channel was bound for the given protocol.
    ChannelOpened(i32),
    /// The dispatch loop ended after QUIT.
    DispatchStopped(DispatchSummary),
    /// The dispatch loop failed with an error description.
    DispatchFailed(String),
}

/// Records health events for assertions.
#[derive(Debug, Default)]
pub struct RecordingHealthReporter {
    events: Mutex<Vec<HealthEvent>>,
}

impl RecordingHealthReporter {
    /// Captures a copy of the recorded events.
    #[must_use]
    pub fn events(&self) -> Vec<HealthEvent> {
        self.events
            .lock()
            .expect("health reporter mutex poisoned")
            .clone()
    }

    fn record(&self, event: HealthEvent) {
        self.events
            .lock()
            .expect("health reporter mutex poisoned")
            .push(event);
    }
}

impl HealthReporter for RecordingHealthReporter {
    fn bootstrap_starting(&self) {
        self.record(HealthEvent::BootstrapStarting);
    }

    fn bootstrap_succeeded(&self, _config: &Config) {
        self.record(HealthEvent::BootstrapSucceeded);
    }

    fn bootstrap_failed(&self, error: &BootstrapError) {
        self.record(HealthEvent::BootstrapFailed(error.to_string()));
    }

    fn channel_opened(&self, protocol: i32, _pid: u32) {
        self.record(HealthEvent::ChannelOpened(protocol));
    }

    fn dispatch_stopped(&self, summary: &DispatchSummary) {
        self.record(HealthEvent::DispatchStopped(*summary));
    }

    fn dispatch_failed(&self, error: &DispatchError) {
        self.record(HealthEvent::DispatchFailed(error.to_string()));
    }
}
