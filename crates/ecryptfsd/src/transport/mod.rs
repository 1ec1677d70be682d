//! Framed message exchange with the eCryptfs kernel module.
//!
//! The kernel and the daemon talk over a raw netlink socket. Datagrams carry
//! no length prefix beyond the envelope header, so [`Transport::receive`]
//! peeks the header to learn the size before consuming the datagram, and
//! rejects anything that did not come from the kernel itself.

mod buffer;
mod channel;
mod envelope;
mod errors;
mod framed;
mod netlink;
#[cfg(test)]
pub(crate) mod test_support;

pub use self::channel::{Channel, Origin};
pub use self::envelope::{EnvelopeHeader, HEADER_LEN, MessageType};
pub use self::errors::{ProtocolViolation, TransportError};
pub use self::framed::{Received, Transport};
pub use self::netlink::NetlinkChannel;

const TRANSPORT_TARGET: &str = concat!(env!("CARGO_PKG_NAME"), "::transport");
