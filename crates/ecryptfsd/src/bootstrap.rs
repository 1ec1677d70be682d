//! Daemon bootstrap orchestration.

use std::sync::Arc;

use ortho_config::{OrthoConfig, OrthoError};
use thiserror::Error;

use ecryptfsd_config::{Config, ConfigError};

use crate::dispatch::{self, DispatchError, DispatchSummary};
use crate::health::HealthReporter;
use crate::resolver::ResolverRegistrar;
use crate::telemetry::{self, TelemetryError, TelemetryHandle};
use crate::transport::{Channel, NetlinkChannel, Transport, TransportError};

/// Trait abstracting configuration loading for testability.
pub trait ConfigLoader: Send + Sync {
    /// Loads the daemon configuration.
    fn load(&self) -> Result<Config, Arc<OrthoError>>;
}

/// Loader that delegates to [`Config::load`].
#[derive(Debug, Default, Clone, Copy)]
pub struct SystemConfigLoader;

impl ConfigLoader for SystemConfigLoader {
    fn load(&self) -> Result<Config, Arc<OrthoError>> {
        Config::load()
    }
}

/// Loader that hands out an already resolved configuration.
#[derive(Debug, Clone)]
pub struct StaticConfigLoader {
    config: Config,
}

impl StaticConfigLoader {
    /// Wraps `config`.
    #[must_use]
    pub fn new(config: Config) -> Self {
        Self { config }
    }
}

impl ConfigLoader for StaticConfigLoader {
    fn load(&self) -> Result<Config, Arc<OrthoError>> {
        Ok(self.config.clone())
    }
}

/// Opens the channel the daemon talks to the kernel over.
pub trait ChannelOpener {
    /// Channel produced on success.
    type Channel: Channel;

    /// Opens and binds the channel described by `config`.
    fn open(&self, config: &Config) -> Result<Self::Channel, TransportError>;
}

/// Opener for the real netlink socket.
#[derive(Debug, Default, Clone, Copy)]
pub struct NetlinkOpener;

impl ChannelOpener for NetlinkOpener {
    type Channel = NetlinkChannel;

    fn open(&self, config: &Config) -> Result<Self::Channel, TransportError> {
        NetlinkChannel::open(config.netlink_protocol())
    }
}

/// Errors surfaced during bootstrap.
#[derive(Debug, Error)]
pub enum BootstrapError {
    /// Configuration failed to load.
    #[error("failed to load configuration: {source}")]
    Configuration {
        /// Underlying loader error.
        #[source]
        source: Arc<OrthoError>,
    },
    /// Configuration loaded but holds unusable values.
    #[error("invalid configuration: {source}")]
    InvalidConfiguration {
        /// Validation failure.
        #[source]
        source: ConfigError,
    },
    /// Telemetry initialisation failed.
    #[error("failed to initialise telemetry: {source}")]
    Telemetry {
        /// Underlying telemetry error.
        #[source]
        source: TelemetryError,
    },
    /// The kernel channel could not be opened.
    #[error("failed to open the eCryptfs netlink channel: {source}")]
    Channel {
        /// Underlying transport error.
        #[source]
        source: TransportError,
    },
}

/// Result of a successful bootstrap invocation.
pub struct Daemon<C: Channel> {
    config: Config,
    transport: Transport<C>,
    telemetry: TelemetryHandle,
    reporter: Arc<dyn HealthReporter>,
}

impl<C: Channel> Daemon<C> {
    /// Accessor for the resolved configuration.
    #[must_use]
    pub fn config(&self) -> &Config {
        &self.config
    }

    /// Accessor for the telemetry handle, primarily useful for testing.
    #[must_use]
    pub fn telemetry(&self) -> TelemetryHandle {
        self.telemetry
    }

    /// Accessor for the open transport.
    #[must_use]
    pub fn transport(&self) -> &Transport<C> {
        &self.transport
    }

    /// Registers resolver backends, runs the dispatch loop, and closes the
    /// channel once the loop has ended.
    ///
    /// # Errors
    ///
    /// Propagates [`dispatch::serve`] failures after reporting them.
    pub fn serve<G>(mut self, registrar: &G) -> Result<DispatchSummary, DispatchError>
    where
        G: ResolverRegistrar,
    {
        let outcome = dispatch::serve(&mut self.transport, registrar, &self.config);
        self.transport.close();
        match &outcome {
            Ok(summary) => self.reporter.dispatch_stopped(summary),
            Err(error) => self.reporter.dispatch_failed(error),
        }
        outcome
    }
}

/// Bootstraps the daemon using the supplied collaborators.
///
/// Loads and validates configuration, installs telemetry, and opens the
/// kernel channel. The channel is bound to the calling process's pid, so
/// this must run in the process that will serve requests.
pub fn bootstrap_with<O>(
    loader: &dyn ConfigLoader,
    reporter: Arc<dyn HealthReporter>,
    opener: &O,
) -> Result<Daemon<O::Channel>, BootstrapError>
where
    O: ChannelOpener,
{
    reporter.bootstrap_starting();

    let result = load_validated(loader).and_then(|config| {
        let telemetry =
            telemetry::initialise(&config).map_err(|source| BootstrapError::Telemetry { source })?;
        let channel = opener
            .open(&config)
            .map_err(|source| BootstrapError::Channel { source })?;
        Ok((config, telemetry, channel))
    });

    let (config, telemetry, channel) = match result {
        Ok(parts) => parts,
        Err(error) => {
            reporter.bootstrap_failed(&error);
            return Err(error);
        }
    };

    reporter.channel_opened(config.netlink_protocol(), std::process::id());
    reporter.bootstrap_succeeded(&config);
    Ok(Daemon {
        config,
        transport: Transport::new(channel),
        telemetry,
        reporter,
    })
}

fn load_validated(loader: &dyn ConfigLoader) -> Result<Config, BootstrapError> {
    let config = loader
        .load()
        .map_err(|source| BootstrapError::Configuration { source })?;
    config
        .validate()
        .map_err(|source| BootstrapError::InvalidConfiguration { source })?;
    Ok(config)
}
