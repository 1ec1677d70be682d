//! Collaborator doubles for bootstrap, launch, and dispatch tests.

use std::ffi::OsString;
use std::io;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};

use ortho_config::{OrthoConfig, OrthoError};

use ecryptfsd_config::Config;

use crate::bootstrap::{ChannelOpener, ConfigLoader};
use crate::process::{DaemonizeError, Daemonizer};
use crate::resolver::{
    KeyMessage, KeyResolver, RegistrationError, ResolveError, ResolverRegistrar,
};
use crate::transport::TransportError;
use crate::transport::test_support::LoopbackChannel;

/// Opener that hands out clones of a shared loopback channel.
#[derive(Debug, Clone, Default)]
pub struct LoopbackOpener {
    pub channel: LoopbackChannel,
    opened: Arc<AtomicUsize>,
}

impl LoopbackOpener {
    /// Number of times [`ChannelOpener::open`] ran.
    pub fn opened(&self) -> usize {
        self.opened.load(Ordering::SeqCst)
    }
}

impl ChannelOpener for LoopbackOpener {
    type Channel = LoopbackChannel;

    fn open(&self, _config: &Config) -> Result<Self::Channel, TransportError> {
        self.opened.fetch_add(1, Ordering::SeqCst);
        Ok(self.channel.clone())
    }
}

/// Opener that behaves as if the kernel module were not loaded.
#[derive(Debug, Clone, Copy, Default)]
pub struct FailingOpener;

impl ChannelOpener for FailingOpener {
    type Channel = LoopbackChannel;

    fn open(&self, config: &Config) -> Result<Self::Channel, TransportError> {
        Err(TransportError::ChannelUnavailable {
            protocol: config.netlink_protocol(),
            source: io::Error::from(io::ErrorKind::Unsupported),
        })
    }
}

/// Loader that fails by passing an unparseable CLI value.
#[derive(Debug, Clone, Copy, Default)]
pub struct FailingConfigLoader;

impl ConfigLoader for FailingConfigLoader {
    fn load(&self) -> Result<Config, Arc<OrthoError>> {
        Config::load_from_iter([
            OsString::from("ecryptfsd"),
            OsString::from("--error-threshold"),
            OsString::from("many"),
        ])
    }
}

/// Daemoniser that counts calls instead of forking.
#[derive(Debug, Clone, Default)]
pub struct RecordingDaemonizer {
    calls: Arc<AtomicUsize>,
}

impl RecordingDaemonizer {
    /// Number of daemonisation requests.
    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }
}

impl Daemonizer for RecordingDaemonizer {
    fn daemonize(&self) -> Result<(), DaemonizeError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        Ok(())
    }
}

#[derive(Debug, Default)]
struct RegistrarState {
    fail_registration: bool,
    reject_requests: bool,
    resolved: Vec<KeyMessage>,
    releases: usize,
}

/// Registrar whose resolvers upper-case request bodies and record their
/// lifecycle in shared state.
#[derive(Debug, Clone, Default)]
pub struct RecordingRegistrar {
    state: Arc<Mutex<RegistrarState>>,
}

impl RecordingRegistrar {
    fn with_state<T>(&self, f: impl FnOnce(&mut RegistrarState) -> T) -> T {
        f(&mut self.state.lock().expect("registrar mutex poisoned"))
    }

    /// Makes the next registration fail.
    pub fn fail_registration(&self) {
        self.with_state(|state| state.fail_registration = true);
    }

    /// Makes resolvers reject every request.
    pub fn reject_requests(&self) {
        self.with_state(|state| state.reject_requests = true);
    }

    /// Requests seen by resolvers, in order.
    pub fn resolved(&self) -> Vec<KeyMessage> {
        self.with_state(|state| state.resolved.clone())
    }

    /// Number of resolver releases.
    pub fn releases(&self) -> usize {
        self.with_state(|state| state.releases)
    }
}

impl ResolverRegistrar for RecordingRegistrar {
    type Resolver = RecordingResolver;

    fn register(&self, _config: &Config) -> Result<Self::Resolver, RegistrationError> {
        if self.with_state(|state| state.fail_registration) {
            return Err(RegistrationError::new("deliberate registration failure"));
        }
        Ok(RecordingResolver {
            registrar: self.clone(),
        })
    }
}

/// Resolver produced by [`RecordingRegistrar`].
#[derive(Debug)]
pub struct RecordingResolver {
    registrar: RecordingRegistrar,
}

impl KeyResolver for RecordingResolver {
    fn resolve(&mut self, request: &KeyMessage) -> Result<KeyMessage, ResolveError> {
        self.registrar.with_state(|state| {
            state.resolved.push(request.clone());
            if state.reject_requests {
                return Err(ResolveError::new(request.index, "deliberate rejection"));
            }
            Ok(KeyMessage::new(0, request.data.to_ascii_uppercase()))
        })
    }

    fn release(&mut self) {
        self.registrar.with_state(|state| state.releases += 1);
    }
}
