//! Userspace endpoint of the eCryptfs kernel key-request channel.
//!
//! The eCryptfs kernel module asks userspace to perform key operations over
//! a private netlink protocol. This crate provides the daemon that answers
//! it: [`transport`] frames envelopes over the raw socket and rejects
//! datagrams that did not come from the kernel, [`dispatch`] runs the
//! receive-classify-reply loop with its consecutive-failure threshold, and
//! [`resolver`] defines the contract for the backends that turn requests
//! into replies.
//!
//! The launch sequence loads configuration through [`ecryptfsd_config`],
//! detaches from the terminal unless running in the foreground, installs
//! structured telemetry, binds the channel to the daemon's final pid,
//! registers resolver backends, and serves until the kernel sends QUIT.

mod bootstrap;
pub mod dispatch;
mod health;
mod process;
pub mod resolver;
mod telemetry;
pub mod transport;

pub use bootstrap::{
    BootstrapError, ChannelOpener, ConfigLoader, Daemon, NetlinkOpener, StaticConfigLoader,
    SystemConfigLoader, bootstrap_with,
};
pub use health::{HealthReporter, StructuredHealthReporter};
pub use process::{
    DaemonizeError, Daemonizer, LaunchError, LaunchMode, SystemDaemonizer, exit_status,
    run_daemon,
};
pub use telemetry::{TelemetryError, TelemetryHandle};

#[cfg(test)]
mod tests;
