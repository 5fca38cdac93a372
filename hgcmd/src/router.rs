use std::{collections::HashMap, io::Write};

use crate::{
    channel::Channel,
    error::Result,
    frame::{decode_exit_code, write_input_reply, DecodedFrame},
};

/// A caller-supplied sink for one output channel (`o`, `e`, or `d`).
pub type OutputSink<'a> = &'a mut dyn Write;

/// A caller-supplied provider for one request channel (`I` or `L`): given
/// the number of bytes the server asked for, returns the bytes to send.
/// An empty return value signals EOF.
pub type InputProvider<'a> = &'a mut dyn FnMut(u32) -> Vec<u8>;

/// The two optional tables a `run_command` caller may register, bundled so
/// the command loop has one thing to thread through its dispatch step.
#[derive(Default)]
pub struct RouterTables<'a> {
    pub outputs: HashMap<Channel, OutputSink<'a>>,
    pub inputs: HashMap<Channel, InputProvider<'a>>,
}

impl<'a> RouterTables<'a> {
    pub fn new() -> Self {
        Self { outputs: HashMap::new(), inputs: HashMap::new() }
    }
}

/// Dispatch one decoded frame: append output-channel payloads to their
/// registered sink (discarding if none is registered), answer input
/// requests by invoking the registered provider (or signalling EOF if
/// none is registered), and surface the exit code once a `result` frame
/// arrives.
///
/// Returns `Ok(Some(exit_code))` once the command is complete, `Ok(None)`
/// if the caller should keep reading frames.
pub fn dispatch<W: Write>(
    frame: DecodedFrame,
    stdin: &mut W,
    tables: &mut RouterTables<'_>,
) -> Result<Option<i32>> {
    match frame {
        DecodedFrame::Data { channel: Channel::Result, payload } => {
            Ok(Some(decode_exit_code(&payload)?))
        }
        DecodedFrame::Data { channel, payload } => {
            if let Some(sink) = tables.outputs.get_mut(&channel) {
                sink.write_all(&payload).map_err(crate::error::Error::TransportFailed)?;
            }
            Ok(None)
        }
        DecodedFrame::Request { channel, requested } => {
            let reply = match tables.inputs.get_mut(&channel) {
                Some(provider) => provider(requested),
                None => Vec::new(),
            };
            write_input_reply(stdin, &reply)?;
            Ok(None)
        }
    }
}
