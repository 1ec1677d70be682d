//! Configuration shared by the eCryptfs key daemon and its tooling.
//!
//! Values are layered by `ortho_config`: the built-in defaults in
//! [`defaults`], then any configuration file, then `ECRYPTFSD_*` environment
//! variables, and finally command-line flags. Later layers win.

mod defaults;
mod logging;

use ortho_config::OrthoConfig;
use serde::{Deserialize, Serialize};
use thiserror::Error;

pub use defaults::{
    DEFAULT_ERROR_THRESHOLD, DEFAULT_LOG_FILTER, DEFAULT_NETLINK_PROTOCOL,
    default_error_threshold, default_log_filter, default_log_format, default_netlink_protocol,
};
pub use logging::{LogFormat, LogFormatParseError};

/// Highest netlink protocol number the kernel accepts (`MAX_LINKS - 1`).
pub const MAX_NETLINK_PROTOCOL: i32 = 31;

/// Resolved daemon configuration.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize, Serialize, OrthoConfig)]
#[ortho_config(prefix = "ECRYPTFSD")]
#[serde(default)]
pub struct Config {
    /// `tracing` filter expression applied to daemon telemetry.
    pub log_filter: String,
    /// Encoding used for emitted log events.
    pub log_format: LogFormat,
    /// Netlink protocol family number of the kernel channel.
    pub netlink_protocol: i32,
    /// Consecutive transport failures tolerated before shutdown.
    pub error_threshold: u32,
    /// Stay attached to the controlling terminal instead of daemonising.
    pub foreground: bool,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            log_filter: default_log_filter().to_owned(),
            log_format: default_log_format(),
            netlink_protocol: default_netlink_protocol(),
            error_threshold: default_error_threshold(),
            foreground: false,
        }
    }
}

impl Config {
    /// Returns the configured log filter expression.
    #[must_use]
    pub fn log_filter(&self) -> &str {
        self.log_filter.as_str()
    }

    /// Returns the configured log format.
    #[must_use]
    pub const fn log_format(&self) -> LogFormat {
        self.log_format
    }

    /// Returns the netlink protocol family number.
    #[must_use]
    pub const fn netlink_protocol(&self) -> i32 {
        self.netlink_protocol
    }

    /// Returns the consecutive-failure threshold.
    #[must_use]
    pub const fn error_threshold(&self) -> u32 {
        self.error_threshold
    }

    /// Returns `true` when the daemon should not detach.
    #[must_use]
    pub const fn foreground(&self) -> bool {
        self.foreground
    }

    /// Checks values that deserialise cleanly but cannot be used.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if !(0..=MAX_NETLINK_PROTOCOL).contains(&self.netlink_protocol) {
            return Err(ConfigError::NetlinkProtocol {
                value: self.netlink_protocol,
            });
        }
        if self.log_filter.trim().is_empty() {
            return Err(ConfigError::EmptyLogFilter);
        }
        Ok(())
    }
}

/// Semantic problems found in an otherwise well-formed configuration.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum ConfigError {
    /// The netlink protocol number is outside the kernel's table.
    #[error("netlink protocol {value} is outside 0..={MAX_NETLINK_PROTOCOL}")]
    NetlinkProtocol {
        /// Rejected protocol number.
        value: i32,
    },
    /// The log filter was blank.
    #[error("log filter must not be empty")]
    EmptyLogFilter,
}
