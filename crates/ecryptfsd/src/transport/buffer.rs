//! Fallible buffer sizing for inbound envelopes.

use super::TransportError;

/// Receive buffer that is resized to each envelope's declared length.
///
/// The buffer holds memory only while a datagram is being read; call
/// [`FrameBuffer::release`] once its contents have been copied out.
#[derive(Debug, Default)]
pub(crate) struct FrameBuffer {
    bytes: Vec<u8>,
}

impl FrameBuffer {
    /// Resizes the buffer to exactly `len` zeroed bytes and returns it.
    ///
    /// Growth goes through `try_reserve_exact` so an absurd declared length
    /// surfaces as [`TransportError::AllocationFailed`] instead of aborting.
    pub(crate) fn resize(&mut self, len: usize) -> Result<&mut [u8], TransportError> {
        self.bytes.clear();
        self.bytes
            .try_reserve_exact(len)
            .map_err(|source| TransportError::AllocationFailed {
                requested: len,
                source,
            })?;
        self.bytes.resize(len, 0);
        Ok(self.bytes.as_mut_slice())
    }

    pub(crate) fn as_slice(&self) -> &[u8] {
        self.bytes.as_slice()
    }

    /// Drops the contents and gives the allocation back.
    pub(crate) fn release(&mut self) {
        self.bytes = Vec::new();
    }

    #[cfg(test)]
    pub(crate) fn capacity(&self) -> usize {
        self.bytes.capacity()
    }
}

/// Copies `bytes` into a fresh vector whose capacity matches its length.
pub(crate) fn copy_exact(bytes: &[u8]) -> Result<Vec<u8>, TransportError> {
    let mut copy = Vec::new();
    copy.try_reserve_exact(bytes.len())
        .map_err(|source| TransportError::AllocationFailed {
            requested: bytes.len(),
            source,
        })?;
    copy.extend_from_slice(bytes);
    Ok(copy)
}
