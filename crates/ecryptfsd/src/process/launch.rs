//! Launch sequencing for the daemon process.

use std::env;
use std::process::ExitCode;
use std::sync::Arc;

use ecryptfsd_config::Config;
use tracing::{error, info};

use crate::StructuredHealthReporter;
use crate::bootstrap::{
    ChannelOpener, ConfigLoader, NetlinkOpener, StaticConfigLoader, SystemConfigLoader,
    bootstrap_with,
};
use crate::dispatch::DispatchSummary;
use crate::health::HealthReporter;
use crate::resolver::{ResolverRegistrar, UnavailableRegistrar};

use super::daemonizer::{Daemonizer, SystemDaemonizer};
use super::errors::LaunchError;
use super::{FOREGROUND_ENV_VAR, PROCESS_TARGET};

/// Launch mode for the daemon.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LaunchMode {
    /// Fork into the background and detach from the controlling terminal.
    Background,
    /// Remain attached to the terminal; used under supervisors and in tests.
    Foreground,
}

impl LaunchMode {
    fn detect() -> Self {
        if env::var_os(FOREGROUND_ENV_VAR).is_some() {
            Self::Foreground
        } else {
            Self::Background
        }
    }

    /// Applies the `foreground` configuration flag on top of `self`.
    #[must_use]
    pub const fn with_config(self, config: &Config) -> Self {
        if config.foreground() {
            Self::Foreground
        } else {
            self
        }
    }
}

/// Process-level collaborators needed to control daemon lifecycle.
pub(crate) struct ProcessControl<D> {
    pub(crate) mode: LaunchMode,
    pub(crate) daemonizer: D,
}

/// Service dependencies required to construct the daemon runtime.
pub(crate) struct ServiceDeps<L, O, G> {
    pub(crate) loader: L,
    pub(crate) reporter: Arc<dyn HealthReporter>,
    pub(crate) opener: O,
    pub(crate) registrar: G,
}

/// Collaborators required to launch the daemon runtime.
pub(crate) struct LaunchPlan<L, D, O, G> {
    pub(crate) process: ProcessControl<D>,
    pub(crate) services: ServiceDeps<L, O, G>,
}

/// Runs the daemon using the production collaborators.
///
/// Returns once the kernel sends QUIT. Fails when configuration, bootstrap,
/// resolver registration, or the channel itself fails.
pub fn run_daemon() -> Result<DispatchSummary, LaunchError> {
    let plan = LaunchPlan {
        process: ProcessControl {
            mode: LaunchMode::detect(),
            daemonizer: SystemDaemonizer::new(),
        },
        services: ServiceDeps {
            loader: SystemConfigLoader,
            reporter: Arc::new(StructuredHealthReporter::new()),
            opener: NetlinkOpener,
            registrar: UnavailableRegistrar,
        },
    };
    run_daemon_with(plan)
}

/// Maps a finished run onto the process exit status.
///
/// Failures are logged through `tracing`; bootstrap and dispatch failures
/// have already been reported as health events by then.
pub fn exit_status(outcome: &Result<DispatchSummary, LaunchError>) -> ExitCode {
    match outcome {
        Ok(_) => ExitCode::SUCCESS,
        Err(err) => {
            error!(
                target: PROCESS_TARGET,
                error = %err,
                "daemon exited with an error"
            );
            ExitCode::FAILURE
        }
    }
}

/// Runs the daemon with injected collaborators.
pub(crate) fn run_daemon_with<L, D, O, G>(
    plan: LaunchPlan<L, D, O, G>,
) -> Result<DispatchSummary, LaunchError>
where
    L: ConfigLoader,
    D: Daemonizer,
    O: ChannelOpener,
    G: ResolverRegistrar,
{
    let LaunchPlan { process, services } = plan;
    let ProcessControl { mode, daemonizer } = process;
    let ServiceDeps {
        loader,
        reporter,
        opener,
        registrar,
    } = services;

    let config = loader.load()?;
    let mode = mode.with_config(&config);
    if matches!(mode, LaunchMode::Background) {
        daemonizer.daemonize()?;
    }

    let static_loader = StaticConfigLoader::new(config);
    let daemon = bootstrap_with(&static_loader, reporter, &opener)?;
    info!(
        target: PROCESS_TARGET,
        ?mode,
        pid = std::process::id(),
        "starting eCryptfs userspace netlink daemon"
    );
    let summary = daemon.serve(&registrar)?;
    info!(
        target: PROCESS_TARGET,
        "shutdown sequence completed"
    );
    Ok(summary)
}
