//! Kernel message dispatch.
//!
//! The dispatcher runs a strictly sequential loop: receive one envelope,
//! classify it, react, repeat. HELO and REQUEST reset the consecutive
//! failure count; REQUEST payloads go to the key resolver and successful
//! replies are sent back as RESPONSE with the request's sequence number and
//! correlation index. QUIT ends the loop cleanly. Transport failures are
//! counted and end the loop once they exceed the configured threshold.
//! Datagrams from userspace senders are discarded without being counted.

mod dispatcher;
mod errors;
mod session;

pub use self::dispatcher::{DispatchSummary, Dispatcher, serve};
pub use self::errors::DispatchError;
pub use self::session::{DaemonState, Session, Termination};

const DISPATCH_TARGET: &str = concat!(env!("CARGO_PKG_NAME"), "::dispatch");
