//! Consecutive-failure accounting for the dispatch loop.

/// How a dispatch session ended.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Termination {
    /// The kernel asked the daemon to quit.
    Clean,
    /// Transport failures exceeded the threshold.
    Error,
}

/// Lifecycle of a dispatch session.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DaemonState {
    /// Receiving and answering messages.
    Running,
    /// The loop has stopped and will not receive again.
    Terminated(Termination),
}

/// Session state owned by the dispatcher.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Session {
    error_count: u32,
    threshold: u32,
    state: DaemonState,
}

impl Session {
    /// Starts a running session that tolerates `threshold` consecutive
    /// failures and terminates on the next one.
    #[must_use]
    pub const fn new(threshold: u32) -> Self {
        Self {
            error_count: 0,
            threshold,
            state: DaemonState::Running,
        }
    }

    /// Counts a transport failure. Returns `true` when this failure pushed
    /// the count past the threshold, in which case the session terminates
    /// with [`Termination::Error`].
    pub fn record_failure(&mut self) -> bool {
        self.error_count = self.error_count.saturating_add(1);
        if self.error_count > self.threshold {
            self.state = DaemonState::Terminated(Termination::Error);
            return true;
        }
        false
    }

    /// Clears the failure count after a successfully classified message.
    pub fn record_success(&mut self) {
        self.error_count = 0;
    }

    /// Terminates the session cleanly.
    pub fn quit(&mut self) {
        self.state = DaemonState::Terminated(Termination::Clean);
    }

    /// Consecutive failures since the last success.
    #[must_use]
    pub const fn error_count(&self) -> u32 {
        self.error_count
    }

    /// Consecutive failures tolerated before the session terminates.
    #[must_use]
    pub const fn threshold(&self) -> u32 {
        self.threshold
    }

    /// Current lifecycle state.
    #[must_use]
    pub const fn state(&self) -> DaemonState {
        self.state
    }

    /// Returns `true` while the loop should keep receiving.
    #[must_use]
    pub const fn is_running(&self) -> bool {
        matches!(self.state, DaemonState::Running)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rstest::rstest;

    #[rstest]
    #[case(0)]
    #[case(1)]
    #[case(8)]
    fn terminates_on_the_failure_after_the_threshold(#[case] threshold: u32) {
        let mut session = Session::new(threshold);
        for _ in 0..threshold {
            assert!(!session.record_failure());
            assert!(session.is_running());
        }

        assert!(session.record_failure());
        assert_eq!(
            session.state(),
            DaemonState::Terminated(Termination::Error)
        );
        assert_eq!(session.error_count(), threshold + 1);
    }

    #[rstest]
    fn threshold_is_independent_of_the_count() {
        let mut session = Session::new(3);
        session.record_failure();
        session.record_failure();
        session.record_success();
        session.record_failure();

        assert_eq!(session.threshold(), 3);
        assert_eq!(session.error_count(), 1);
    }

    #[rstest]
    fn success_resets_the_count() {
        let mut session = Session::new(2);
        session.record_failure();
        session.record_failure();
        session.record_success();

        assert_eq!(session.error_count(), 0);
        assert!(!session.record_failure());
        assert!(session.is_running());
    }

    #[rstest]
    fn quit_terminates_cleanly() {
        let mut session = Session::new(8);
        session.quit();
        assert_eq!(session.state(), DaemonState::Terminated(Termination::Clean));
        assert!(!session.is_running());
    }
}
