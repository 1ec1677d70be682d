//! Test suites for the eCryptfs key daemon.

mod support;
