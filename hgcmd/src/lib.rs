//! hgcmd is a client library for Mercurial's command server.
//!
//! It owns a long-lived `hg serve --cmdserver pipe` subprocess and exposes
//! it as a [`Session`] with two entry points: [`Session::run_command`] (the
//! primitive: caller-supplied output sinks and input providers, raw exit
//! code) and [`Session::get_command_output`] (the convenience layer: UTF-8
//! decoded stdout/stderr). Everything about the wire protocol -- the
//! 5 byte frame headers, the channel multiplexing, the handshake -- is
//! handled internally; this crate has no knowledge of what any individual
//! Mercurial subcommand does.

mod channel;
mod consts;
mod error;
mod frame;
mod process;
mod router;
mod session;
mod version;

pub use channel::Channel;
pub use error::{Error, Result};
pub use router::{InputProvider, OutputSink, RouterTables};
pub use session::{CommandResult, Session};
