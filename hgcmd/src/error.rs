use std::{io, path::PathBuf};

use thiserror::Error;

/// The error taxonomy for every fallible operation in this crate.
///
/// Transport-level failures (`ServerUnavailable`, `TransportFailed`,
/// `ProtocolViolation`, `HandshakeFailed`) poison the `Session` they
/// occurred on; the caller should treat the session as unusable and close
/// it. `CommandFailed` is not a transport failure: the session remains
/// usable afterwards.
#[derive(Debug, Error)]
pub enum Error {
    #[error("invalid argument: {0}")]
    InvalidArgument(String),

    #[error("'{0}' does not exist or is not a Mercurial repository (no .hg directory)")]
    InvalidRepository(PathBuf),

    #[error("failed to start the hg command server")]
    ServerUnavailable(#[source] io::Error),

    #[error("handshake with the hg command server failed: {0}")]
    HandshakeFailed(String),

    #[error("protocol violation: {0}")]
    ProtocolViolation(String),

    #[error("transport failed")]
    TransportFailed(#[source] io::Error),

    #[error("command {argv:?} exited with code {exit_code}")]
    CommandFailed { argv: Vec<String>, exit_code: i32, stdout: Vec<u8>, stderr: Vec<u8> },

    #[error("session is closed")]
    SessionClosed,
}

pub type Result<T> = std::result::Result<T, Error>;
