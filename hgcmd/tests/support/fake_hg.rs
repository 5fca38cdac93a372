//! A minimal stand-in for `hg serve --cmdserver pipe`, built as its own
//! binary so `tests/session.rs` can exercise the wire protocol over a real
//! subprocess and real pipes without requiring Mercurial to be installed.
//!
//! It ignores its own argv entirely (the caller is `Session::new`, which
//! always passes `serve --cmdserver pipe --cwd ... --repository ...`) and
//! instead scripts its behavior off the first token of whatever argv is
//! submitted over the `runcommand` channel. Frame encode/decode is
//! hand-written here rather than reused from `hgcmd`'s own `frame.rs`, so a
//! bug shared between the library and its test fixture can't cancel out.

use std::io::{self, Read, Write};

fn write_frame(out: &mut impl Write, tag: u8, payload: &[u8]) -> io::Result<()> {
    out.write_all(&[tag])?;
    out.write_all(&(payload.len() as u32).to_be_bytes())?;
    out.write_all(payload)?;
    out.flush()
}

fn write_result(out: &mut impl Write, exit_code: i32) -> io::Result<()> {
    write_frame(out, b'r', &exit_code.to_be_bytes())
}

fn request_input(out: &mut impl Write, tag: u8, requested: u32) -> io::Result<()> {
    out.write_all(&[tag])?;
    out.write_all(&requested.to_be_bytes())?;
    out.flush()
}

fn read_input_reply(input: &mut impl Read) -> io::Result<Vec<u8>> {
    let mut len_buf = [0u8; 4];
    input.read_exact(&mut len_buf)?;
    let mut data = vec![0u8; u32::from_be_bytes(len_buf) as usize];
    input.read_exact(&mut data)?;
    Ok(data)
}

fn main() -> io::Result<()> {
    let stdout = io::stdout();
    let mut out = stdout.lock();
    let stdin = io::stdin();
    let mut input = stdin.lock();

    write_frame(&mut out, b'o', b"capabilities: getencoding runcommand\nencoding: UTF-8\n")?;

    loop {
        let mut prefix = [0u8; 11];
        if input.read_exact(&mut prefix).is_err() {
            return Ok(());
        }
        assert_eq!(&prefix, b"runcommand\n", "fake_hg only understands runcommand submissions");

        let mut len_buf = [0u8; 4];
        input.read_exact(&mut len_buf)?;
        let len = u32::from_be_bytes(len_buf) as usize;
        let mut body = vec![0u8; len];
        input.read_exact(&mut body)?;

        let argv: Vec<String> =
            body.split(|&b| b == 0).map(|s| String::from_utf8_lossy(s).into_owned()).collect();
        let subcommand = argv.first().map(String::as_str).unwrap_or("");

        match subcommand {
            // echo <text>: write <text> to stdout, exit 0.
            "echo" => {
                write_frame(&mut out, b'o', argv.get(1).map(String::as_bytes).unwrap_or(b""))?;
                write_result(&mut out, 0)?;
            }
            // echo-both: one frame on stdout, one on stderr, exit 0.
            "echo-both" => {
                write_frame(&mut out, b'o', b"on stdout")?;
                write_frame(&mut out, b'e', b"on stderr")?;
                write_result(&mut out, 0)?;
            }
            // echo-big: a payload too large for a single read, exit 0.
            "echo-big" => {
                write_frame(&mut out, b'o', &vec![b'x'; 3_000_000])?;
                write_result(&mut out, 0)?;
            }
            // ask-input: write, request 5 bytes on the line-input channel,
            // write what came back, then exit 0. Exercises that writes
            // before the request and writes after the reply stay ordered.
            "ask-input" => {
                write_frame(&mut out, b'o', b"before:")?;
                request_input(&mut out, b'L', 5)?;
                let reply = read_input_reply(&mut input)?;
                write_frame(&mut out, b'o', b"after:")?;
                write_frame(&mut out, b'o', &reply)?;
                write_result(&mut out, 0)?;
            }
            // fail: no output, exit 1.
            "fail" => {
                write_result(&mut out, 1)?;
            }
            _ => {
                write_result(&mut out, 0)?;
            }
        }
    }
}
