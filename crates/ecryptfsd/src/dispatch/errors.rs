//! Error types for the dispatch loop.

use thiserror::Error;

use crate::resolver::RegistrationError;
use crate::transport::TransportError;

/// Reasons the dispatch loop ended without a QUIT from the kernel.
#[derive(Debug, Error)]
pub enum DispatchError {
    /// Key-resolution backends could not be loaded; the loop never ran.
    #[error(transparent)]
    Registration(#[from] RegistrationError),
    /// Too many consecutive transport failures.
    #[error("netlink error threshold exceeded after {failures} consecutive failures")]
    IoExhausted {
        /// Consecutive failures counted, including the last one.
        failures: u32,
        /// Failure that crossed the threshold.
        #[source]
        last: TransportError,
    },
}

impl DispatchError {
    /// Returns `true` when the loop never started.
    #[must_use]
    pub const fn is_startup_failure(&self) -> bool {
        matches!(self, Self::Registration(_))
    }
}
