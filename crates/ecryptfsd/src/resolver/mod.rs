//! Key-resolution collaborator contract.
//!
//! The dispatcher hands each REQUEST to a [`KeyResolver`] obtained from a
//! [`ResolverRegistrar`] at startup. Resolvers own whatever key modules they
//! load and unload them in [`KeyResolver::release`], which the dispatcher
//! calls exactly once when the loop ends.

mod message;
mod placeholder;

use std::error::Error as StdError;

use ecryptfsd_config::Config;
use thiserror::Error;

pub use self::message::{KEY_MESSAGE_HEADER_LEN, KeyMessage, KeyMessageError};
pub use self::placeholder::{UnavailableRegistrar, UnavailableResolver};

type BoxedSource = Box<dyn StdError + Send + Sync>;

/// Turns kernel key requests into replies.
pub trait KeyResolver {
    /// Produces the reply body for `request`.
    ///
    /// The dispatcher overwrites the reply's correlation index with the
    /// request's, so implementations need not copy it.
    fn resolve(&mut self, request: &KeyMessage) -> Result<KeyMessage, ResolveError>;

    /// Unloads backends. Called once, after the last `resolve`.
    fn release(&mut self);
}

/// Loads key-resolution backends at startup.
pub trait ResolverRegistrar {
    /// Resolver produced by a successful registration.
    type Resolver: KeyResolver;

    /// Registers every available backend.
    fn register(&self, config: &Config) -> Result<Self::Resolver, RegistrationError>;
}

/// Failure reported by a resolver for a single request.
#[derive(Debug, Error)]
#[error("key request {index} could not be resolved: {message}")]
pub struct ResolveError {
    /// Correlation index of the failed request.
    pub index: u32,
    message: String,
    #[source]
    source: Option<BoxedSource>,
}

impl ResolveError {
    /// Builds an error without an underlying source.
    #[must_use]
    pub fn new(index: u32, message: impl Into<String>) -> Self {
        Self {
            index,
            message: message.into(),
            source: None,
        }
    }

    /// Builds an error that wraps an underlying source.
    #[must_use]
    pub fn with_source(index: u32, message: impl Into<String>, source: impl Into<BoxedSource>) -> Self {
        Self {
            index,
            message: message.into(),
            source: Some(source.into()),
        }
    }

    /// Human-readable description of the failure.
    #[must_use]
    pub fn message(&self) -> &str {
        self.message.as_str()
    }
}

/// Failure to load key-resolution backends.
#[derive(Debug, Error)]
#[error("failed to register key modules: {message}")]
pub struct RegistrationError {
    message: String,
    #[source]
    source: Option<BoxedSource>,
}

impl RegistrationError {
    /// Builds an error without an underlying source.
    #[must_use]
    pub fn new(message: impl Into<String>) -> Self {
        Self {
            message: message.into(),
            source: None,
        }
    }

    /// Builds an error that wraps an underlying source.
    #[must_use]
    pub fn with_source(message: impl Into<String>, source: impl Into<BoxedSource>) -> Self {
        Self {
            message: message.into(),
            source: Some(source.into()),
        }
    }

    /// Human-readable description of the failure.
    #[must_use]
    pub fn message(&self) -> &str {
        self.message.as_str()
    }
}
