//! The daemon's receive-classify-reply loop.

use ecryptfsd_config::Config;
use tracing::{debug, error, info, warn};

use super::DISPATCH_TARGET;
use super::errors::DispatchError;
use super::session::Session;
use crate::resolver::{KeyMessage, KeyResolver, ResolverRegistrar};
use crate::transport::{Channel, MessageType, Received, Transport, TransportError};

/// Counters describing what a dispatch session did.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct DispatchSummary {
    /// HELO messages received.
    pub hellos: u64,
    /// REQUEST messages received.
    pub requests: u64,
    /// RESPONSE messages sent.
    pub replies: u64,
    /// Requests that produced no reply.
    pub dropped: u64,
    /// Datagrams discarded because a userspace process sent them.
    pub spoofed: u64,
    /// Messages of a type the daemon does not act on.
    pub ignored: u64,
    /// Transport failures counted against the threshold.
    pub transport_failures: u64,
}

/// Registers resolver backends and runs the dispatch loop until the kernel
/// sends QUIT or transport failures exhaust the threshold.
///
/// # Errors
///
/// Returns [`DispatchError::Registration`] without receiving anything when
/// the registrar fails, and [`DispatchError::IoExhausted`] when the loop
/// gives up on the channel.
pub fn serve<C, G>(
    transport: &mut Transport<C>,
    registrar: &G,
    config: &Config,
) -> Result<DispatchSummary, DispatchError>
where
    C: Channel,
    G: ResolverRegistrar,
{
    let resolver = registrar.register(config).inspect_err(|err| {
        error!(target: DISPATCH_TARGET, error = %err, "failed to register key modules");
    })?;
    Dispatcher::new(resolver, config.error_threshold()).run(transport)
}

/// Single-threaded dispatcher owning the session state and the resolver.
#[derive(Debug)]
pub struct Dispatcher<R: KeyResolver> {
    resolver: R,
    session: Session,
    summary: DispatchSummary,
}

impl<R: KeyResolver> Dispatcher<R> {
    /// Creates a dispatcher in the running state.
    pub fn new(resolver: R, threshold: u32) -> Self {
        Self {
            resolver,
            session: Session::new(threshold),
            summary: DispatchSummary::default(),
        }
    }

    /// Runs until the session terminates, then releases the resolver.
    ///
    /// The resolver is released exactly once whichever way the loop ends.
    ///
    /// # Errors
    ///
    /// Returns [`DispatchError::IoExhausted`] when consecutive transport
    /// failures exceed the threshold.
    pub fn run<C: Channel>(
        mut self,
        transport: &mut Transport<C>,
    ) -> Result<DispatchSummary, DispatchError> {
        let mut exhausted = None;
        while self.session.is_running() {
            if let Err(err) = self.step(transport) {
                exhausted = self.count_failure(err);
            }
        }
        self.resolver.release();

        match exhausted {
            Some(last) => Err(DispatchError::IoExhausted {
                failures: self.session.error_count(),
                last,
            }),
            None => {
                info!(
                    target: DISPATCH_TARGET,
                    requests = self.summary.requests,
                    replies = self.summary.replies,
                    "kernel requested shutdown"
                );
                Ok(self.summary)
            }
        }
    }

    fn step<C: Channel>(&mut self, transport: &mut Transport<C>) -> Result<(), TransportError> {
        let message = transport.receive()?;
        match message.kind {
            MessageType::Hello => {
                debug!(target: DISPATCH_TARGET, "received HELO from the kernel");
                self.summary.hellos += 1;
                self.session.record_success();
            }
            MessageType::Quit => {
                debug!(target: DISPATCH_TARGET, "received QUIT from the kernel");
                self.session.quit();
            }
            MessageType::Request => {
                self.summary.requests += 1;
                self.session.record_success();
                self.answer(transport, &message)?;
            }
            MessageType::Response | MessageType::Unrecognized(_) => {
                debug!(
                    target: DISPATCH_TARGET,
                    kind = %message.kind,
                    "ignoring netlink message"
                );
                self.summary.ignored += 1;
            }
        }
        Ok(())
    }

    fn answer<C: Channel>(
        &mut self,
        transport: &mut Transport<C>,
        message: &Received,
    ) -> Result<(), TransportError> {
        let Some(reply) = self.resolve(message) else {
            self.summary.dropped += 1;
            return Ok(());
        };
        transport
            .send(Some(&reply), MessageType::Response, 0, message.sequence)
            .inspect_err(|err| {
                error!(
                    target: DISPATCH_TARGET,
                    error = %err,
                    sequence = message.sequence,
                    "failed to send response to kernel request"
                );
            })?;
        self.summary.replies += 1;
        Ok(())
    }

    fn resolve(&mut self, message: &Received) -> Option<Vec<u8>> {
        let request = match KeyMessage::decode(&message.payload) {
            Ok(request) => request,
            Err(err) => {
                error!(
                    target: DISPATCH_TARGET,
                    error = %err,
                    sequence = message.sequence,
                    "failed to parse key request"
                );
                return None;
            }
        };
        let reply = match self.resolver.resolve(&request) {
            Ok(reply) => reply.correlate_with(&request),
            Err(err) => {
                error!(
                    target: DISPATCH_TARGET,
                    error = %err,
                    sequence = message.sequence,
                    "failed to process key request"
                );
                return None;
            }
        };
        reply
            .encode()
            .inspect_err(|err| {
                error!(
                    target: DISPATCH_TARGET,
                    error = %err,
                    index = request.index,
                    "failed to encode key response"
                );
            })
            .ok()
    }

    /// Counts a failure and returns it when it exhausted the threshold.
    fn count_failure(&mut self, err: TransportError) -> Option<TransportError> {
        if err.is_security_fault() {
            warn!(target: DISPATCH_TARGET, error = %err, "discarded netlink message");
            self.summary.spoofed += 1;
            return None;
        }
        self.summary.transport_failures += 1;
        let exhausted = self.session.record_failure();
        error!(
            target: DISPATCH_TARGET,
            error = %err,
            error_count = self.session.error_count(),
            "netlink transport failure"
        );
        if !exhausted {
            return None;
        }
        error!(
            target: DISPATCH_TARGET,
            threshold = self.session.threshold(),
            "netlink error threshold exceeded; terminating daemon"
        );
        Some(err)
    }
}
