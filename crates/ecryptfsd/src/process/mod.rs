//! Daemon process supervision: launch mode, daemonisation, and the
//! top-level run entry point.

pub(crate) mod daemonizer;
mod errors;
pub(crate) mod launch;

pub use daemonizer::{DaemonizeError, Daemonizer, SystemDaemonizer};
pub use errors::LaunchError;
pub use launch::{LaunchMode, exit_status, run_daemon};

pub(crate) const PROCESS_TARGET: &str = concat!(env!("CARGO_PKG_NAME"), "::process");
pub(crate) const FOREGROUND_ENV_VAR: &str = "ECRYPTFSD_FOREGROUND";
