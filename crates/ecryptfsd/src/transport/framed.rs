//! Framing, two-phase receive, and origin validation over a [`Channel`].

use std::io;

use tracing::debug;

use super::buffer::{FrameBuffer, copy_exact};
use super::errors::ProtocolViolation;
use super::{
    Channel, EnvelopeHeader, HEADER_LEN, MessageType, NetlinkChannel, Origin, TRANSPORT_TARGET,
    TransportError,
};

/// Envelope accepted from the kernel peer.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Received {
    /// Message classification.
    pub kind: MessageType,
    /// Protocol flags as sent.
    pub flags: u16,
    /// Sequence number to echo in any reply.
    pub sequence: u32,
    /// Payload bytes; empty when the envelope carried none.
    pub payload: Vec<u8>,
}

/// Framed message endpoint connected to the kernel.
///
/// The transport owns its channel exclusively. Every operation takes
/// `&mut self`, so at most one receive or send is in flight at a time.
#[derive(Debug)]
pub struct Transport<C: Channel> {
    channel: C,
    buffer: FrameBuffer,
    closed: bool,
}

impl Transport<NetlinkChannel> {
    /// Opens the kernel channel for the given netlink protocol number.
    ///
    /// # Errors
    ///
    /// Propagates [`NetlinkChannel::open`] failures.
    pub fn open(protocol: i32) -> Result<Self, TransportError> {
        NetlinkChannel::open(protocol).map(Self::new)
    }
}

impl<C: Channel> Transport<C> {
    /// Wraps an already opened channel.
    pub fn new(channel: C) -> Self {
        Self {
            channel,
            buffer: FrameBuffer::default(),
            closed: false,
        }
    }

    /// Borrows the underlying channel.
    pub const fn channel(&self) -> &C {
        &self.channel
    }

    /// Returns `true` once [`Transport::close`] has run.
    pub const fn is_closed(&self) -> bool {
        self.closed
    }

    /// Frames `payload` and sends it to the kernel as a single datagram.
    ///
    /// The declared length is the header size plus the payload length, with
    /// no padding. A missing payload is sent as a bare header.
    ///
    /// # Errors
    ///
    /// Returns [`TransportError::SendFailed`] when the channel rejects the
    /// datagram or accepts only part of it.
    pub fn send(
        &mut self,
        payload: Option<&[u8]>,
        kind: MessageType,
        flags: u16,
        sequence: u32,
    ) -> Result<(), TransportError> {
        let payload = payload.unwrap_or_default();
        let total = HEADER_LEN
            .checked_add(payload.len())
            .ok_or_else(|| {
                TransportError::protocol(ProtocolViolation::Oversized { len: payload.len() })
            })?;
        let length = u32::try_from(total).map_err(|_| {
            TransportError::protocol(ProtocolViolation::Oversized { len: payload.len() })
        })?;

        let header = EnvelopeHeader {
            length,
            kind,
            flags,
            sequence,
            pid: 0,
        };
        let mut frame = Vec::new();
        frame
            .try_reserve_exact(total)
            .map_err(|source| TransportError::AllocationFailed {
                requested: total,
                source,
            })?;
        header.encode_into(&mut frame);
        frame.extend_from_slice(payload);

        let written = self
            .channel
            .send(&frame)
            .map_err(|source| TransportError::SendFailed { kind, source })?;
        if written != frame.len() {
            return Err(TransportError::SendFailed {
                kind,
                source: io::Error::new(
                    io::ErrorKind::WriteZero,
                    format!("sent {written} of {} bytes", frame.len()),
                ),
            });
        }
        debug!(
            target: TRANSPORT_TARGET,
            kind = %kind,
            sequence,
            length,
            "sent netlink message"
        );
        Ok(())
    }

    /// Receives the next envelope from the kernel.
    ///
    /// The header is peeked first to learn the sender and the declared
    /// length. Datagrams from userspace are dropped at this point, before any
    /// buffer is sized for them. The buffer is then sized to the declared
    /// length and the datagram consumed; its memory is returned once the
    /// payload has been copied out. Datagrams that cannot be framed are
    /// still consumed so they cannot wedge the channel.
    ///
    /// # Errors
    ///
    /// - [`TransportError::ReceiveFailed`] when the channel reports an error.
    /// - [`TransportError::AllocationFailed`] when the buffer cannot grow.
    /// - [`TransportError::Protocol`] for malformed envelopes or address
    ///   metadata.
    /// - [`TransportError::SpoofSuspected`] when a userspace process sent
    ///   the datagram.
    pub fn receive(&mut self) -> Result<Received, TransportError> {
        let mut head = [0_u8; HEADER_LEN];
        let (peeked, origin) = self.channel.peek(&mut head).map_err(receive_failed)?;
        if let Err(error) = check_origin(origin) {
            self.discard_head()?;
            return Err(error);
        }
        let Some(header) = head.get(..peeked).and_then(EnvelopeHeader::decode) else {
            self.discard_head()?;
            return Err(TransportError::protocol(ProtocolViolation::ShortHeader {
                received: peeked,
            }));
        };
        let Some(declared) = header
            .declared_len()
            .filter(|_| header.payload_len().is_some())
        else {
            self.discard_head()?;
            return Err(TransportError::protocol(ProtocolViolation::DeclaredLength {
                declared: header.length,
            }));
        };

        let outcome = self.read_frame(header, declared);
        self.buffer.release();
        outcome
    }

    /// Releases the channel. Later calls do nothing.
    pub fn close(&mut self) {
        if self.closed {
            return;
        }
        self.closed = true;
        self.channel.close();
        debug!(target: TRANSPORT_TARGET, "transport closed");
    }

    fn read_frame(
        &mut self,
        peeked: EnvelopeHeader,
        declared: usize,
    ) -> Result<Received, TransportError> {
        let buf = self.buffer.resize(declared)?;
        let (received, origin) = self.channel.recv(buf).map_err(receive_failed)?;
        check_origin(origin)?;
        if received < declared {
            return Err(TransportError::protocol(ProtocolViolation::Truncated {
                declared,
                received,
            }));
        }

        let frame = self.buffer.as_slice();
        let header = EnvelopeHeader::decode(frame).unwrap_or(peeked);
        let payload = copy_exact(frame.get(HEADER_LEN..declared).unwrap_or_default())?;
        debug!(
            target: TRANSPORT_TARGET,
            kind = %header.kind,
            sequence = header.sequence,
            payload_len = payload.len(),
            "received netlink message"
        );
        Ok(Received {
            kind: header.kind,
            flags: header.flags,
            sequence: header.sequence,
            payload,
        })
    }

    fn discard_head(&mut self) -> Result<(), TransportError> {
        let mut scratch = [0_u8; HEADER_LEN];
        self.channel
            .recv(&mut scratch)
            .map(drop)
            .map_err(receive_failed)
    }
}

fn check_origin(origin: Option<Origin>) -> Result<(), TransportError> {
    let origin = origin.ok_or_else(|| TransportError::protocol(ProtocolViolation::AddressLength))?;
    if origin.is_kernel() {
        Ok(())
    } else {
        Err(TransportError::SpoofSuspected { pid: origin.pid })
    }
}

fn receive_failed(source: io::Error) -> TransportError {
    TransportError::ReceiveFailed { source }
}
