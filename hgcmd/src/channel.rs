use crate::error::Error;

/// Channel is the one-byte tag at the start of every server->client frame.
///
/// `Input`/`LineInput` request data *from* the client; `Output`/`Error`/
/// `Debug` deliver data *to* the client; `Result` terminates a command.
#[derive(Copy, Clone, Debug, PartialEq, Eq, Hash)]
pub enum Channel {
    /// `I`: the server wants a length-prefixed chunk of raw bytes on stdin.
    Input,
    /// `L`: the server wants a length-prefixed chunk of line-oriented input.
    LineInput,
    /// `o`: standard output.
    Output,
    /// `e`: standard error.
    Error,
    /// `r`: command result; payload is a 4 byte big-endian signed exit code.
    Result,
    /// `d`: debug output.
    Debug,
}

impl Channel {
    pub fn tag(self) -> u8 {
        match self {
            Channel::Input => b'I',
            Channel::LineInput => b'L',
            Channel::Output => b'o',
            Channel::Error => b'e',
            Channel::Result => b'r',
            Channel::Debug => b'd',
        }
    }

    /// `I` and `L` carry no payload; the header's length field is instead
    /// the number of bytes the server is willing to receive.
    pub fn is_request(self) -> bool {
        matches!(self, Channel::Input | Channel::LineInput)
    }

    fn from_tag(tag: u8) -> Option<Channel> {
        Some(match tag {
            b'I' => Channel::Input,
            b'L' => Channel::LineInput,
            b'o' => Channel::Output,
            b'e' => Channel::Error,
            b'r' => Channel::Result,
            b'd' => Channel::Debug,
            _ => return None,
        })
    }
}

/// The result of decoding a raw channel tag byte.
///
/// Per documented Mercurial command-server behavior, an *unknown* channel
/// letter is mandatory (must abort the command) if uppercase, optional
/// (may be skipped, treated like a data frame) if lowercase.
#[derive(Debug)]
pub enum Decoded {
    Known(Channel),
    UnknownOptional(u8),
}

pub fn decode_tag(tag: u8) -> Result<Decoded, Error> {
    if let Some(c) = Channel::from_tag(tag) {
        return Ok(Decoded::Known(c));
    }
    if tag.is_ascii_uppercase() {
        return Err(Error::ProtocolViolation(format!("unknown mandatory channel '{}'", tag as char)));
    }
    Ok(Decoded::UnknownOptional(tag))
}
