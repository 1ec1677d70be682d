//! In-memory channel used by unit and behaviour tests.
//!
//! [`LoopbackChannel`] keeps a queue of inbound datagrams, each tagged with
//! the origin the host would report, and records every outbound frame.
//! Clones share state, so a test can keep one handle while the transport
//! owns another.

use std::collections::VecDeque;
use std::io;
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

use super::{Channel, EnvelopeHeader, HEADER_LEN, MessageType, Origin};

/// Encodes a complete envelope as the kernel would send it.
#[must_use]
pub fn kernel_frame(kind: MessageType, sequence: u32, payload: &[u8]) -> Vec<u8> {
    let length = u32::try_from(HEADER_LEN + payload.len()).unwrap_or(u32::MAX);
    let header = EnvelopeHeader {
        length,
        kind,
        flags: 0,
        sequence,
        pid: 0,
    };
    let mut frame = Vec::with_capacity(HEADER_LEN + payload.len());
    header.encode_into(&mut frame);
    frame.extend_from_slice(payload);
    frame
}

#[derive(Debug)]
enum Inbound {
    Datagram {
        bytes: Vec<u8>,
        origin: Option<Origin>,
    },
    Fault(io::ErrorKind),
}

#[derive(Debug, Default)]
struct LoopbackState {
    inbound: VecDeque<Inbound>,
    sent: Vec<Vec<u8>>,
    send_fault: Option<io::ErrorKind>,
    peeks: usize,
    recv_lens: Vec<usize>,
    closes: usize,
}

/// Shared in-memory [`Channel`] double.
///
/// Peeking or receiving from an empty queue fails with
/// [`io::ErrorKind::WouldBlock`], so a fresh loopback fails every receive.
#[derive(Debug, Clone, Default)]
pub struct LoopbackChannel {
    state: Arc<Mutex<LoopbackState>>,
}

impl LoopbackChannel {
    fn lock(&self) -> MutexGuard<'_, LoopbackState> {
        self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Queues a well-formed envelope from the kernel.
    pub fn push_from_kernel(&self, kind: MessageType, sequence: u32, payload: &[u8]) {
        self.push_raw(kernel_frame(kind, sequence, payload), Some(Origin::KERNEL));
    }

    /// Queues a well-formed envelope that the host attributes to `pid`.
    pub fn push_from_process(&self, pid: u32, kind: MessageType, sequence: u32, payload: &[u8]) {
        self.push_raw(
            kernel_frame(kind, sequence, payload),
            Some(Origin::process(pid)),
        );
    }

    /// Queues arbitrary bytes with an arbitrary origin. `None` models
    /// address metadata of the wrong size.
    pub fn push_raw(&self, bytes: Vec<u8>, origin: Option<Origin>) {
        self.lock()
            .inbound
            .push_back(Inbound::Datagram { bytes, origin });
    }

    /// Queues a receive failure.
    pub fn push_fault(&self, kind: io::ErrorKind) {
        self.lock().inbound.push_back(Inbound::Fault(kind));
    }

    /// Makes every subsequent send fail with `kind`.
    pub fn fail_sends(&self, kind: io::ErrorKind) {
        self.lock().send_fault = Some(kind);
    }

    /// Moves every recorded outbound frame onto the inbound queue as if the
    /// kernel had echoed it.
    pub fn loop_back(&self) {
        let mut state = self.lock();
        let frames = std::mem::take(&mut state.sent);
        state.inbound.extend(frames.into_iter().map(|bytes| Inbound::Datagram {
            bytes,
            origin: Some(Origin::KERNEL),
        }));
    }

    /// Returns a copy of every outbound frame in send order.
    #[must_use]
    pub fn sent(&self) -> Vec<Vec<u8>> {
        self.lock().sent.clone()
    }

    /// Decodes every outbound frame into its header and payload.
    #[must_use]
    pub fn sent_envelopes(&self) -> Vec<(EnvelopeHeader, Vec<u8>)> {
        self.lock()
            .sent
            .iter()
            .filter_map(|frame| {
                let header = EnvelopeHeader::decode(frame)?;
                let payload = frame.get(HEADER_LEN..)?.to_vec();
                Some((header, payload))
            })
            .collect()
    }

    /// Number of inbound entries still queued.
    #[must_use]
    pub fn pending(&self) -> usize {
        self.lock().inbound.len()
    }

    /// Number of peeks attempted, successful or not.
    #[must_use]
    pub fn peeks(&self) -> usize {
        self.lock().peeks
    }

    /// Length of the buffer handed to every consuming receive, in order.
    #[must_use]
    pub fn recv_buffer_lens(&self) -> Vec<usize> {
        self.lock().recv_lens.clone()
    }

    /// Number of times [`Channel::close`] ran.
    #[must_use]
    pub fn closes(&self) -> usize {
        self.lock().closes
    }
}

fn empty_queue() -> io::Error {
    io::Error::new(io::ErrorKind::WouldBlock, "loopback queue is empty")
}

fn copy_prefix(source: &[u8], buf: &mut [u8]) -> usize {
    let len = source.len().min(buf.len());
    if let (Some(dst), Some(src)) = (buf.get_mut(..len), source.get(..len)) {
        dst.copy_from_slice(src);
    }
    len
}

impl Channel for LoopbackChannel {
    fn peek(&mut self, buf: &mut [u8]) -> io::Result<(usize, Option<Origin>)> {
        let mut state = self.lock();
        state.peeks += 1;
        match state.inbound.front() {
            Some(Inbound::Datagram { bytes, origin }) => Ok((copy_prefix(bytes, buf), *origin)),
            Some(Inbound::Fault(kind)) => {
                let kind = *kind;
                state.inbound.pop_front();
                Err(io::Error::from(kind))
            }
            None => Err(empty_queue()),
        }
    }

    fn recv(&mut self, buf: &mut [u8]) -> io::Result<(usize, Option<Origin>)> {
        let mut state = self.lock();
        state.recv_lens.push(buf.len());
        match state.inbound.pop_front() {
            Some(Inbound::Datagram { bytes, origin }) => Ok((copy_prefix(&bytes, buf), origin)),
            Some(Inbound::Fault(kind)) => Err(io::Error::from(kind)),
            None => Err(empty_queue()),
        }
    }

    fn send(&mut self, frame: &[u8]) -> io::Result<usize> {
        let mut state = self.lock();
        if let Some(kind) = state.send_fault {
            return Err(io::Error::from(kind));
        }
        state.sent.push(frame.to_vec());
        Ok(frame.len())
    }

    fn close(&mut self) {
        self.lock().closes += 1;
    }
}
