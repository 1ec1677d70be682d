//! Resolver used when no key module is built into the daemon.

use ecryptfsd_config::Config;
use tracing::warn;

use super::{KeyMessage, KeyResolver, RegistrationError, ResolveError, ResolverRegistrar};

const RESOLVER_TARGET: &str = concat!(env!("CARGO_PKG_NAME"), "::resolver::unavailable");

/// Registrar that always succeeds and yields an [`UnavailableResolver`].
#[derive(Debug, Clone, Copy, Default)]
pub struct UnavailableRegistrar;

impl ResolverRegistrar for UnavailableRegistrar {
    type Resolver = UnavailableResolver;

    fn register(&self, _config: &Config) -> Result<Self::Resolver, RegistrationError> {
        warn!(
            target: RESOLVER_TARGET,
            "no key modules are available; key requests will be rejected"
        );
        Ok(UnavailableResolver::default())
    }
}

/// Resolver that rejects every request.
#[derive(Debug, Clone, Copy, Default)]
pub struct UnavailableResolver {
    rejected: u64,
}

impl UnavailableResolver {
    /// Number of requests rejected so far.
    #[must_use]
    pub const fn rejected(&self) -> u64 {
        self.rejected
    }
}

impl KeyResolver for UnavailableResolver {
    fn resolve(&mut self, request: &KeyMessage) -> Result<KeyMessage, ResolveError> {
        self.rejected += 1;
        Err(ResolveError::new(request.index, "no key module is available"))
    }

    fn release(&mut self) {
        warn!(
            target: RESOLVER_TARGET,
            rejected = self.rejected,
            "released placeholder resolver"
        );
    }
}
