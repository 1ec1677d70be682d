//! Raw datagram primitive that the framing layer is built on.

use std::io;

/// Netlink source address attached to a received datagram.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Origin {
    /// Port id of the sender. Zero for the kernel.
    pub pid: u32,
    /// Multicast group mask.
    pub groups: u32,
}

impl Origin {
    /// Address of the kernel peer.
    pub const KERNEL: Self = Self { pid: 0, groups: 0 };

    /// Builds an origin for a userspace sender.
    #[must_use]
    pub const fn process(pid: u32) -> Self {
        Self { pid, groups: 0 }
    }

    /// Returns `true` when the datagram was sent by the kernel.
    #[must_use]
    pub const fn is_kernel(self) -> bool {
        self.pid == 0
    }
}

/// Datagram channel connected to the kernel peer.
///
/// Implementations only move bytes. Framing, sizing and origin checks live
/// in [`super::Transport`]. A channel is not safe for concurrent sends and
/// receives; the transport takes `&mut self` for every operation.
pub trait Channel {
    /// Copies the head datagram into `buf` without consuming it.
    ///
    /// Returns the number of bytes copied, which is at most `buf.len()`,
    /// together with the sender's address. The origin is `None` under the
    /// same conditions as for [`Channel::recv`].
    fn peek(&mut self, buf: &mut [u8]) -> io::Result<(usize, Option<Origin>)>;

    /// Consumes the head datagram into `buf`.
    ///
    /// The origin is `None` when the address metadata reported by the host
    /// does not have the size of a netlink address.
    fn recv(&mut self, buf: &mut [u8]) -> io::Result<(usize, Option<Origin>)>;

    /// Sends one datagram to the kernel peer.
    fn send(&mut self, frame: &[u8]) -> io::Result<usize>;

    /// Releases the channel. Calling this more than once is harmless.
    fn close(&mut self);
}
