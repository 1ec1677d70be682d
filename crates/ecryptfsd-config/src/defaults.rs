//! Built-in values used when no configuration layer supplies an override.

use crate::logging::LogFormat;

/// Default `tracing` filter expression for the daemon.
pub const DEFAULT_LOG_FILTER: &str = "info";

/// Netlink protocol family number reserved for the eCryptfs channel
/// (`NETLINK_ECRYPTFS`).
pub const DEFAULT_NETLINK_PROTOCOL: i32 = 19;

/// Consecutive transport failures tolerated before the daemon gives up.
///
/// The dispatcher terminates on the failure that pushes the counter past
/// this value.
pub const DEFAULT_ERROR_THRESHOLD: u32 = 8;

/// Default log filter expression.
#[must_use]
pub fn default_log_filter() -> &'static str {
    DEFAULT_LOG_FILTER
}

/// Default logging format.
#[must_use]
pub fn default_log_format() -> LogFormat {
    LogFormat::Json
}

/// Default netlink protocol family number.
#[must_use]
pub const fn default_netlink_protocol() -> i32 {
    DEFAULT_NETLINK_PROTOCOL
}

/// Default consecutive-failure threshold.
#[must_use]
pub const fn default_error_threshold() -> u32 {
    DEFAULT_ERROR_THRESHOLD
}
