//! Netlink envelope header codec.
//!
//! Every datagram on the channel starts with a `nlmsghdr`:
//!
//! | offset | width | field      |
//! |--------|-------|------------|
//! | 0      | 4     | length     |
//! | 4      | 2     | type       |
//! | 6      | 2     | flags      |
//! | 8      | 4     | sequence   |
//! | 12     | 4     | sender pid |
//!
//! Integers use host byte order because the kernel writes the header with
//! native stores. The length covers the header and the payload.

use std::fmt;

/// Size of the envelope header in bytes.
pub const HEADER_LEN: usize = 16;

/// Classification of an envelope by its type field.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum MessageType {
    /// Kernel announces that it is alive.
    Hello,
    /// Kernel asks the daemon to shut down.
    Quit,
    /// Kernel asks for a key operation.
    Request,
    /// Daemon reply to a request.
    Response,
    /// Any type number this daemon does not know about.
    Unrecognized(u16),
}

impl MessageType {
    /// Wire value of [`MessageType::Hello`].
    pub const HELLO: u16 = 100;
    /// Wire value of [`MessageType::Quit`].
    pub const QUIT: u16 = 101;
    /// Wire value of [`MessageType::Request`].
    pub const REQUEST: u16 = 102;
    /// Wire value of [`MessageType::Response`].
    pub const RESPONSE: u16 = 103;

    /// Maps a wire value onto the closed set of known types.
    #[must_use]
    pub const fn from_wire(value: u16) -> Self {
        match value {
            Self::HELLO => Self::Hello,
            Self::QUIT => Self::Quit,
            Self::REQUEST => Self::Request,
            Self::RESPONSE => Self::Response,
            other => Self::Unrecognized(other),
        }
    }

    /// Returns the wire value for this type.
    #[must_use]
    pub const fn to_wire(self) -> u16 {
        match self {
            Self::Hello => Self::HELLO,
            Self::Quit => Self::QUIT,
            Self::Request => Self::REQUEST,
            Self::Response => Self::RESPONSE,
            Self::Unrecognized(other) => other,
        }
    }
}

impl From<u16> for MessageType {
    fn from(value: u16) -> Self {
        Self::from_wire(value)
    }
}

impl From<MessageType> for u16 {
    fn from(value: MessageType) -> Self {
        value.to_wire()
    }
}

impl fmt::Display for MessageType {
    fn fmt(&self, formatter: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Hello => formatter.write_str("HELO"),
            Self::Quit => formatter.write_str("QUIT"),
            Self::Request => formatter.write_str("REQUEST"),
            Self::Response => formatter.write_str("RESPONSE"),
            Self::Unrecognized(value) => write!(formatter, "unrecognized({value})"),
        }
    }
}

/// Decoded envelope header.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct EnvelopeHeader {
    /// Total envelope length, header included.
    pub length: u32,
    /// Message classification.
    pub kind: MessageType,
    /// Protocol flags, carried through untouched.
    pub flags: u16,
    /// Sender-chosen sequence number.
    pub sequence: u32,
    /// Sender pid as written by the sender. Not trustworthy for origin checks.
    pub pid: u32,
}

impl EnvelopeHeader {
    /// Decodes a header from the front of `bytes`.
    ///
    /// Returns `None` when fewer than [`HEADER_LEN`] bytes are available.
    #[must_use]
    pub fn decode(bytes: &[u8]) -> Option<Self> {
        Some(Self {
            length: read_u32(bytes, 0)?,
            kind: MessageType::from_wire(read_u16(bytes, 4)?),
            flags: read_u16(bytes, 6)?,
            sequence: read_u32(bytes, 8)?,
            pid: read_u32(bytes, 12)?,
        })
    }

    /// Appends the encoded header to `out`.
    pub fn encode_into(&self, out: &mut Vec<u8>) {
        out.extend_from_slice(&self.length.to_ne_bytes());
        out.extend_from_slice(&self.kind.to_wire().to_ne_bytes());
        out.extend_from_slice(&self.flags.to_ne_bytes());
        out.extend_from_slice(&self.sequence.to_ne_bytes());
        out.extend_from_slice(&self.pid.to_ne_bytes());
    }

    /// Declared total length as a `usize`, when it fits.
    #[must_use]
    pub fn declared_len(&self) -> Option<usize> {
        usize::try_from(self.length).ok()
    }

    /// Declared payload length, or `None` when the declared length is
    /// shorter than the header itself.
    #[must_use]
    pub fn payload_len(&self) -> Option<usize> {
        self.declared_len()?.checked_sub(HEADER_LEN)
    }
}

fn read_u16(bytes: &[u8], offset: usize) -> Option<u16> {
    let raw = bytes.get(offset..offset + 2)?;
    raw.try_into().ok().map(u16::from_ne_bytes)
}

fn read_u32(bytes: &[u8], offset: usize) -> Option<u32> {
    let raw = bytes.get(offset..offset + 4)?;
    raw.try_into().ok().map(u32::from_ne_bytes)
}
