//! Error types for channel and framing operations.

use std::collections::TryReserveError;
use std::io;

use thiserror::Error;

use super::MessageType;

/// Errors surfaced while opening the channel or exchanging envelopes.
#[derive(Debug, Error)]
pub enum TransportError {
    /// The host refused to create a socket for the protocol family.
    #[error("netlink protocol {protocol} is unavailable: {source}")]
    ChannelUnavailable {
        /// Netlink protocol number that was requested.
        protocol: i32,
        /// Underlying OS error.
        #[source]
        source: io::Error,
    },
    /// Binding the socket to the daemon's address failed.
    #[error("failed to bind netlink socket to pid {pid}: {source}")]
    BindFailed {
        /// Address (pid) the socket was bound to.
        pid: u32,
        /// Underlying OS error.
        #[source]
        source: io::Error,
    },
    /// The send primitive rejected the envelope.
    #[error("failed to send {kind} message: {source}")]
    SendFailed {
        /// Type of the envelope that could not be sent.
        kind: MessageType,
        /// Underlying OS error.
        #[source]
        source: io::Error,
    },
    /// The receive primitive reported an error.
    #[error("failed to receive netlink message: {source}")]
    ReceiveFailed {
        /// Underlying OS error.
        #[source]
        source: io::Error,
    },
    /// A message buffer could not be grown.
    #[error("failed to allocate {requested} bytes for a netlink message")]
    AllocationFailed {
        /// Size that was requested.
        requested: usize,
        /// Allocator error.
        #[source]
        source: TryReserveError,
    },
    /// The envelope or its address metadata was malformed.
    #[error("malformed netlink message: {violation}")]
    Protocol {
        /// Description of what was wrong.
        violation: ProtocolViolation,
    },
    /// The envelope came from a userspace process rather than the kernel.
    #[error("netlink message from userspace pid {pid} discarded; it may be spoofing the kernel")]
    SpoofSuspected {
        /// Pid reported by the kernel for the sender.
        pid: u32,
    },
}

impl TransportError {
    /// Returns `true` for faults caused by an untrusted third party.
    ///
    /// These are logged and discarded; they never count towards the
    /// consecutive-failure threshold.
    #[must_use]
    pub const fn is_security_fault(&self) -> bool {
        matches!(self, Self::SpoofSuspected { .. })
    }

    pub(crate) const fn protocol(violation: ProtocolViolation) -> Self {
        Self::Protocol { violation }
    }
}

/// Specific ways an inbound envelope can be malformed.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
pub enum ProtocolViolation {
    /// The source address was not the size of a netlink address.
    #[error("source address has unexpected length")]
    AddressLength,
    /// Fewer bytes than a header were available.
    #[error("datagram of {received} bytes is shorter than a header")]
    ShortHeader {
        /// Bytes available at the head of the queue.
        received: usize,
    },
    /// The declared length cannot describe a valid envelope.
    #[error("declared length {declared} is invalid")]
    DeclaredLength {
        /// Length taken from the header.
        declared: u32,
    },
    /// The consuming read returned fewer bytes than declared.
    #[error("expected {declared} bytes but received {received}")]
    Truncated {
        /// Length taken from the header.
        declared: usize,
        /// Bytes actually read.
        received: usize,
    },
    /// An outbound payload does not fit in a 32-bit envelope length.
    #[error("payload of {len} bytes exceeds the envelope length field")]
    Oversized {
        /// Payload length that was rejected.
        len: usize,
    },
}
