//! Payload carried by REQUEST and RESPONSE envelopes.
//!
//! The layout is fixed by the kernel module: a `u32` correlation index, a
//! `u32` data length, then the data bytes, integers in host byte order.

use thiserror::Error;

/// Bytes preceding the data section.
pub const KEY_MESSAGE_HEADER_LEN: usize = 8;

/// Key operation request or its reply.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct KeyMessage {
    /// Correlation index assigned by the kernel. Replies must carry the
    /// request's index unchanged.
    pub index: u32,
    /// Operation-specific body.
    pub data: Vec<u8>,
}

impl KeyMessage {
    /// Builds a message with the given index and body.
    #[must_use]
    pub fn new(index: u32, data: Vec<u8>) -> Self {
        Self { index, data }
    }

    /// Parses a payload received from the kernel.
    ///
    /// Bytes beyond the declared data length are ignored.
    ///
    /// # Errors
    ///
    /// Returns [`KeyMessageError`] when the payload is too short for its own
    /// declared length.
    pub fn decode(payload: &[u8]) -> Result<Self, KeyMessageError> {
        let fixed = payload
            .get(..KEY_MESSAGE_HEADER_LEN)
            .ok_or(KeyMessageError::Truncated { len: payload.len() })?;
        let (index, data_len) = fixed.split_at(4);
        let index = u32::from_ne_bytes(to_array(index));
        let declared = u32::from_ne_bytes(to_array(data_len));
        let data = usize::try_from(declared)
            .ok()
            .and_then(|len| payload.get(KEY_MESSAGE_HEADER_LEN..)?.get(..len))
            .ok_or(KeyMessageError::DataLength {
                declared,
                available: payload.len().saturating_sub(KEY_MESSAGE_HEADER_LEN),
            })?;
        Ok(Self {
            index,
            data: data.to_vec(),
        })
    }

    /// Serialises the message into an envelope payload.
    ///
    /// # Errors
    ///
    /// Returns [`KeyMessageError::Oversized`] when the body does not fit the
    /// 32-bit length field.
    pub fn encode(&self) -> Result<Vec<u8>, KeyMessageError> {
        let data_len = u32::try_from(self.data.len())
            .map_err(|_| KeyMessageError::Oversized { len: self.data.len() })?;
        let mut payload = Vec::with_capacity(KEY_MESSAGE_HEADER_LEN + self.data.len());
        payload.extend_from_slice(&self.index.to_ne_bytes());
        payload.extend_from_slice(&data_len.to_ne_bytes());
        payload.extend_from_slice(&self.data);
        Ok(payload)
    }

    /// Copies the correlation index of `request` into this reply.
    #[must_use]
    pub fn correlate_with(mut self, request: &Self) -> Self {
        self.index = request.index;
        self
    }
}

fn to_array(bytes: &[u8]) -> [u8; 4] {
    let mut out = [0_u8; 4];
    out.copy_from_slice(bytes);
    out
}

/// Errors raised while parsing or serialising a [`KeyMessage`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
pub enum KeyMessageError {
    /// The payload is shorter than the fixed fields.
    #[error("key message of {len} bytes is shorter than its fixed fields")]
    Truncated {
        /// Payload length received.
        len: usize,
    },
    /// The declared data length runs past the end of the payload.
    #[error("key message declares {declared} data bytes but carries {available}")]
    DataLength {
        /// Length taken from the message.
        declared: u32,
        /// Bytes actually present after the fixed fields.
        available: usize,
    },
    /// The body does not fit the 32-bit length field.
    #[error("key message body of {len} bytes is too large")]
    Oversized {
        /// Body length that was rejected.
        len: usize,
    },
}
