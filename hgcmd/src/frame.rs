use std::io::{self, Read, Write};

use byteorder::{BigEndian, ReadBytesExt as _, WriteBytesExt as _};

use crate::{
    channel::{decode_tag, Channel, Decoded},
    consts::{MAX_SINGLE_IO, RUNCOMMAND_PREFIX},
    error::{Error, Result},
};

/// A decoded server->client frame, already stripped of its 5 byte header.
#[derive(Debug)]
pub enum DecodedFrame {
    /// `o`/`e`/`d`/`r`: `length` bytes of payload follow the header.
    Data { channel: Channel, payload: Vec<u8> },
    /// `I`/`L`: the header's length field is the number of bytes the
    /// server is willing to accept, not a payload length.
    Request { channel: Channel, requested: u32 },
}

/// Read `buf.len()` bytes from `r`, looping over short reads and splitting
/// any single request larger than `MAX_SINGLE_IO` into multiple calls so we
/// never ask a host read primitive for more than it can report back in one
/// shot. A `0`-byte read before the buffer is full is treated as premature
/// EOF, which is always a `TransportFailed`.
pub fn read_full<R: Read + ?Sized>(r: &mut R, buf: &mut [u8]) -> Result<()> {
    let mut total = 0usize;
    while total < buf.len() {
        let want = (buf.len() - total).min(MAX_SINGLE_IO);
        match r.read(&mut buf[total..total + want]) {
            Ok(0) => {
                return Err(Error::TransportFailed(io::Error::new(
                    io::ErrorKind::UnexpectedEof,
                    "hg command server closed the pipe mid-frame",
                )));
            }
            Ok(n) => total += n,
            Err(e) if e.kind() == io::ErrorKind::Interrupted => continue,
            Err(e) => return Err(Error::TransportFailed(e)),
        }
    }
    Ok(())
}

/// Mirror of [`read_full`] for writes: loops over short writes and splits
/// oversized buffers the same way.
pub fn write_full<W: Write + ?Sized>(w: &mut W, buf: &[u8]) -> Result<()> {
    let mut total = 0usize;
    while total < buf.len() {
        let want = (buf.len() - total).min(MAX_SINGLE_IO);
        match w.write(&buf[total..total + want]) {
            Ok(0) => {
                return Err(Error::TransportFailed(io::Error::new(
                    io::ErrorKind::WriteZero,
                    "hg command server closed the pipe mid-write",
                )));
            }
            Ok(n) => total += n,
            Err(e) if e.kind() == io::ErrorKind::Interrupted => continue,
            Err(e) => return Err(Error::TransportFailed(e)),
        }
    }
    Ok(())
}

/// Decode exactly one frame from `r`, including any unknown-optional
/// (lowercase, not recognized) channel frames, which are fully consumed
/// and silently dropped so the stream stays in sync. Returns `Ok(None)`
/// when the frame decoded was one of those skipped frames; the caller
/// should simply read again.
pub fn decode_frame<R: Read>(r: &mut R) -> Result<Option<DecodedFrame>> {
    let mut tag = [0u8; 1];
    read_full(r, &mut tag)?;

    let mut len_buf = [0u8; 4];
    read_full(r, &mut len_buf)?;
    let len = (&len_buf[..])
        .read_u32::<BigEndian>()
        .map_err(Error::TransportFailed)?;

    match decode_tag(tag[0])? {
        Decoded::Known(channel) if channel.is_request() => {
            Ok(Some(DecodedFrame::Request { channel, requested: len }))
        }
        Decoded::Known(channel) => {
            let mut payload = vec![0u8; len as usize];
            read_full(r, &mut payload)?;
            Ok(Some(DecodedFrame::Data { channel, payload }))
        }
        Decoded::UnknownOptional(_) => {
            let mut discard = vec![0u8; len as usize];
            read_full(r, &mut discard)?;
            Ok(None)
        }
    }
}

/// Decode the 4 byte big-endian signed exit code carried by a `result`
/// frame's payload.
pub fn decode_exit_code(payload: &[u8]) -> Result<i32> {
    if payload.len() != 4 {
        return Err(Error::ProtocolViolation(format!(
            "result frame payload must be 4 bytes, got {}",
            payload.len()
        )));
    }
    (&payload[..]).read_i32::<BigEndian>().map_err(Error::TransportFailed)
}

/// Write a `runcommand` submission: the literal ASCII prefix, a 4 byte
/// big-endian length, then the argv entries joined by a single NUL byte
/// (no terminating NUL).
pub fn write_command<W: Write>(w: &mut W, argv: &[String]) -> Result<()> {
    let joined = argv.join("\0");
    let body = joined.as_bytes();

    write_full(w, RUNCOMMAND_PREFIX)?;
    let mut len_buf = Vec::with_capacity(4);
    len_buf.write_u32::<BigEndian>(body.len() as u32).map_err(Error::TransportFailed)?;
    write_full(w, &len_buf)?;
    write_full(w, body)
}

/// Write an input-channel reply: a 4 byte big-endian length followed by
/// that many bytes. An empty `data` slice signals EOF to the server.
pub fn write_input_reply<W: Write>(w: &mut W, data: &[u8]) -> Result<()> {
    let mut len_buf = Vec::with_capacity(4);
    len_buf.write_u32::<BigEndian>(data.len() as u32).map_err(Error::TransportFailed)?;
    write_full(w, &len_buf)?;
    write_full(w, data)
}

#[cfg(test)]
mod test {
    use std::io::Cursor;

    use super::*;

    fn header(tag: u8, len: u32) -> Vec<u8> {
        let mut v = vec![tag];
        v.extend_from_slice(&len.to_be_bytes());
        v
    }

    #[test]
    fn decodes_output_frame() {
        let mut buf = header(b'o', 5);
        buf.extend_from_slice(b"hello");
        let mut cur = Cursor::new(buf);
        match decode_frame(&mut cur).unwrap().unwrap() {
            DecodedFrame::Data { channel, payload } => {
                assert_eq!(channel, Channel::Output);
                assert_eq!(payload, b"hello");
            }
            other => panic!("unexpected frame: {:?}", other),
        }
    }

    #[test]
    fn decodes_input_request_with_no_payload() {
        let buf = header(b'I', 128);
        let mut cur = Cursor::new(buf);
        match decode_frame(&mut cur).unwrap().unwrap() {
            DecodedFrame::Request { channel, requested } => {
                assert_eq!(channel, Channel::Input);
                assert_eq!(requested, 128);
            }
            other => panic!("unexpected frame: {:?}", other),
        }
    }

    #[test]
    fn skips_unknown_optional_channel_and_stays_in_sync() {
        let mut buf = header(b'x', 3);
        buf.extend_from_slice(b"abc");
        buf.extend_from_slice(&header(b'o', 2));
        buf.extend_from_slice(b"ok");
        let mut cur = Cursor::new(buf);

        assert!(decode_frame(&mut cur).unwrap().is_none());
        match decode_frame(&mut cur).unwrap().unwrap() {
            DecodedFrame::Data { channel, payload } => {
                assert_eq!(channel, Channel::Output);
                assert_eq!(payload, b"ok");
            }
            other => panic!("unexpected frame: {:?}", other),
        }
    }

    #[test]
    fn unknown_mandatory_channel_is_protocol_violation() {
        let buf = header(b'X', 0);
        let mut cur = Cursor::new(buf);
        assert!(matches!(decode_frame(&mut cur), Err(Error::ProtocolViolation(_))));
    }

    #[test]
    fn premature_eof_is_transport_failed() {
        let buf = header(b'o', 10); // promises 10 bytes, delivers none
        let mut cur = Cursor::new(buf);
        assert!(matches!(decode_frame(&mut cur), Err(Error::TransportFailed(_))));
    }

    #[test]
    fn exit_code_round_trips_through_network_order() {
        for code in [0i32, 1, -1, 255, i32::MIN, i32::MAX] {
            let bytes = code.to_be_bytes();
            assert_eq!(decode_exit_code(&bytes).unwrap(), code);
        }
    }

    #[test]
    fn exit_code_rejects_wrong_length() {
        assert!(decode_exit_code(&[0, 0, 0]).is_err());
    }

    #[test]
    fn write_command_frames_argv_with_nul_separators_and_length_prefix() {
        let mut out = Vec::new();
        write_command(&mut out, &["log".to_string(), "-r".to_string(), "tip".to_string()]).unwrap();

        assert!(out.starts_with(RUNCOMMAND_PREFIX));
        let rest = &out[RUNCOMMAND_PREFIX.len()..];
        let len = u32::from_be_bytes(rest[..4].try_into().unwrap()) as usize;
        let body = &rest[4..4 + len];
        assert_eq!(body, b"log\0-r\0tip");
        assert_eq!(rest.len(), 4 + len);
    }

    #[test]
    fn write_input_reply_zero_length_signals_eof() {
        let mut out = Vec::new();
        write_input_reply(&mut out, &[]).unwrap();
        assert_eq!(out, vec![0, 0, 0, 0]);
    }

    #[test]
    fn read_full_loops_over_short_reads() {
        struct OneByteAtATime<'a>(&'a [u8]);
        impl<'a> Read for OneByteAtATime<'a> {
            fn read(&mut self, buf: &mut [u8]) -> io::Result<usize> {
                if self.0.is_empty() {
                    return Ok(0);
                }
                buf[0] = self.0[0];
                self.0 = &self.0[1..];
                Ok(1)
            }
        }

        let mut r = OneByteAtATime(b"hello");
        let mut out = [0u8; 5];
        read_full(&mut r, &mut out).unwrap();
        assert_eq!(&out, b"hello");
    }
}
