//! Netlink socket implementation of [`Channel`].

use std::io::{self, IoSliceMut};
use std::os::fd::{AsRawFd, FromRawFd, OwnedFd, RawFd};

use nix::sys::socket::{MsgFlags, NetlinkAddr, bind, recvmsg, sendto};
use tracing::debug;

use super::{Channel, Origin, TRANSPORT_TARGET, TransportError};

/// Raw netlink socket bound to the daemon's process id.
#[derive(Debug)]
pub struct NetlinkChannel {
    fd: Option<OwnedFd>,
    protocol: i32,
    pid: u32,
}

impl NetlinkChannel {
    /// Creates a raw netlink socket for `protocol` and binds it to this
    /// process's pid with no multicast groups.
    ///
    /// # Errors
    ///
    /// Returns [`TransportError::ChannelUnavailable`] when the socket cannot
    /// be created (for example when the eCryptfs module is not loaded) and
    /// [`TransportError::BindFailed`] when the address is already taken.
    pub fn open(protocol: i32) -> Result<Self, TransportError> {
        let fd = create_socket(protocol)
            .map_err(|source| TransportError::ChannelUnavailable { protocol, source })?;
        let pid = std::process::id();
        bind(fd.as_raw_fd(), &NetlinkAddr::new(pid, 0))
            .map_err(|errno| TransportError::BindFailed {
                pid,
                source: io::Error::from(errno),
            })?;
        debug!(
            target: TRANSPORT_TARGET,
            protocol,
            pid,
            "netlink socket bound"
        );
        Ok(Self {
            fd: Some(fd),
            protocol,
            pid,
        })
    }

    /// Netlink protocol family the socket was opened for.
    #[must_use]
    pub const fn protocol(&self) -> i32 {
        self.protocol
    }

    /// Address the socket is bound to.
    #[must_use]
    pub const fn pid(&self) -> u32 {
        self.pid
    }

    /// Returns `true` until [`Channel::close`] has been called.
    #[must_use]
    pub const fn is_open(&self) -> bool {
        self.fd.is_some()
    }

    fn raw_fd(&self) -> io::Result<RawFd> {
        self.fd
            .as_ref()
            .map(AsRawFd::as_raw_fd)
            .ok_or_else(|| io::Error::from(io::ErrorKind::NotConnected))
    }
}

impl Channel for NetlinkChannel {
    fn peek(&mut self, buf: &mut [u8]) -> io::Result<(usize, Option<Origin>)> {
        let fd = self.raw_fd()?;
        receive_from(fd, buf, MsgFlags::MSG_PEEK)
    }

    fn recv(&mut self, buf: &mut [u8]) -> io::Result<(usize, Option<Origin>)> {
        let fd = self.raw_fd()?;
        receive_from(fd, buf, MsgFlags::empty())
    }

    fn send(&mut self, frame: &[u8]) -> io::Result<usize> {
        let fd = self.raw_fd()?;
        let kernel = NetlinkAddr::new(0, 0);
        with_retry(|| sendto(fd, frame, &kernel, MsgFlags::empty()))
    }

    fn close(&mut self) {
        if self.fd.take().is_some() {
            debug!(target: TRANSPORT_TARGET, pid = self.pid, "netlink socket closed");
        }
    }
}

impl Drop for NetlinkChannel {
    fn drop(&mut self) {
        self.close();
    }
}

fn create_socket(protocol: i32) -> io::Result<OwnedFd> {
    // SAFETY: `socket` has no memory-safety preconditions; the arguments are
    // plain integers and the return value is checked before use.
    let raw = unsafe {
        libc::socket(
            libc::AF_NETLINK,
            libc::SOCK_RAW | libc::SOCK_CLOEXEC,
            protocol,
        )
    };
    if raw < 0 {
        return Err(io::Error::last_os_error());
    }
    // SAFETY: `raw` is a freshly created descriptor owned by nobody else.
    Ok(unsafe { OwnedFd::from_raw_fd(raw) })
}

/// Reads the head datagram together with its netlink source address.
fn receive_from(
    fd: RawFd,
    buf: &mut [u8],
    flags: MsgFlags,
) -> io::Result<(usize, Option<Origin>)> {
    with_retry(|| {
        let mut iov = [IoSliceMut::new(&mut *buf)];
        let message = recvmsg::<NetlinkAddr>(fd, &mut iov, None, flags)?;
        let origin = message.address.map(|addr| Origin {
            pid: addr.pid(),
            groups: addr.groups(),
        });
        Ok((message.bytes, origin))
    })
}

/// Repeats a socket call that was interrupted by a signal.
fn with_retry<T>(mut call: impl FnMut() -> nix::Result<T>) -> io::Result<T> {
    loop {
        match call() {
            Ok(value) => return Ok(value),
            Err(nix::errno::Errno::EINTR) => continue,
            Err(errno) => return Err(io::Error::from(errno)),
        }
    }
}
