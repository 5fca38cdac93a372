use std::{
    collections::{BTreeMap, HashMap, HashSet},
    path::Path,
    process,
    sync::Mutex,
};

use tracing::{debug, instrument, warn};

use crate::{
    channel::Channel,
    consts::DEFAULT_HG_EXECUTABLE,
    error::{Error, Result},
    frame::{decode_frame, write_command, DecodedFrame},
    process::{self as supervisor, SpawnSpec},
    router::{dispatch, RouterTables},
    version,
};

/// The bytes captured by [`Session::get_command_output`], already decoded
/// as UTF-8 -- the command server's canonical wire encoding regardless of
/// the `HGENCODING` applied to repository content.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CommandResult {
    pub stdout: String,
    pub stderr: String,
    pub exit_code: i32,
}

struct Inner {
    child: process::Child,
    stdin: process::ChildStdin,
    stdout: process::ChildStdout,
    closed: bool,
}

/// A `Session` owns one `hg serve --cmdserver pipe` subprocess bound to a
/// single repository. Construct one with [`Session::new`], submit as many
/// commands as needed through [`Session::run_command`] or
/// [`Session::get_command_output`], and call [`Session::close`] (or just
/// drop it) when done.
///
/// `RunCommand` is strictly serialized: the session's internal mutex
/// guards the subprocess's stdin and stdout as a single unit, so only one
/// command is ever in flight, and input-provider callbacks run inline on
/// the calling thread while that lock is held.
pub struct Session {
    inner: Mutex<Inner>,
    encoding: String,
    capabilities: HashSet<String>,
    root: Mutex<Option<String>>,
    configuration: Mutex<Option<BTreeMap<String, String>>>,
    version: Mutex<Option<String>>,
}

impl Session {
    /// Spawn the command server for `repo` and complete the handshake.
    ///
    /// `encoding` sets `HGENCODING` for the subprocess. `config_overrides`
    /// becomes a single `--config k1=v1,k2=v2,...` argument. `hg_path`
    /// defaults to the hard-coded fallback `"hg"` on `PATH` when `None`.
    #[instrument(skip(config_overrides), fields(repo = %repo.as_ref().display()))]
    pub fn new(
        repo: impl AsRef<Path>,
        encoding: Option<String>,
        config_overrides: Option<BTreeMap<String, String>>,
        hg_path: Option<String>,
    ) -> Result<Session> {
        let repo = repo.as_ref();
        supervisor::validate_repo(repo)?;

        let spec = SpawnSpec {
            repo: repo.to_path_buf(),
            encoding,
            config_overrides: config_overrides.unwrap_or_default(),
            hg_path: hg_path.unwrap_or_else(|| DEFAULT_HG_EXECUTABLE.to_string()),
        };

        let mut child = supervisor::spawn(&spec)?;
        let stdin = child.stdin.take().ok_or_else(|| {
            Error::ServerUnavailable(std::io::Error::new(
                std::io::ErrorKind::Other,
                "hg command server has no stdin pipe",
            ))
        })?;
        let mut stdout = child.stdout.take().ok_or_else(|| {
            Error::ServerUnavailable(std::io::Error::new(
                std::io::ErrorKind::Other,
                "hg command server has no stdout pipe",
            ))
        })?;

        let (encoding, capabilities) = match handshake(&mut stdout) {
            Ok(ok) => ok,
            Err(e) => {
                let _ = child.kill();
                return Err(e);
            }
        };

        Ok(Session {
            inner: Mutex::new(Inner { child, stdin, stdout, closed: false }),
            encoding,
            capabilities,
            root: Mutex::new(None),
            configuration: Mutex::new(None),
            version: Mutex::new(None),
        })
    }

    /// The `encoding` field from the handshake's hello frame.
    pub fn encoding(&self) -> &str {
        &self.encoding
    }

    /// The `capabilities` set from the handshake's hello frame.
    pub fn capabilities(&self) -> &HashSet<String> {
        &self.capabilities
    }

    /// The primitive: submit `argv` (argv[0] is the subcommand) and
    /// dispatch every frame the server emits through `tables` until the
    /// `result` frame arrives, returning its exit code.
    ///
    /// A transport-level failure (`TransportFailed`, `ProtocolViolation`)
    /// poisons the session: it is marked closed and the subprocess is
    /// killed before the error is returned, matching the state machine in
    /// which a transport error moves the session to `Closed` implicitly.
    #[instrument(skip(self, tables), fields(argv = ?argv))]
    pub fn run_command(&self, argv: &[String], tables: &mut RouterTables<'_>) -> Result<i32> {
        if argv.is_empty() {
            return Err(Error::InvalidArgument("argv must not be empty".into()));
        }

        let mut inner = self.inner.lock().unwrap();
        if inner.closed {
            return Err(Error::SessionClosed);
        }

        let result = run_command_locked(&mut inner, argv, tables);

        if matches!(result, Err(Error::TransportFailed(_)) | Err(Error::ProtocolViolation(_))) {
            warn!("poisoning session after transport-level failure");
            inner.closed = true;
            let _ = inner.child.kill();
        }

        result
    }

    /// The convenience layer: run `argv`, capturing `o`/`e` into in-memory
    /// buffers and decoding them as UTF-8. Never errors on a non-zero exit
    /// code by itself -- interpreting exit codes is left to the caller (or
    /// to a higher layer that knows which codes are benign for which
    /// subcommand).
    pub fn get_command_output(
        &self,
        argv: &[String],
        inputs: Option<HashMap<Channel, &mut dyn FnMut(u32) -> Vec<u8>>>,
    ) -> Result<CommandResult> {
        let mut stdout_buf = Vec::new();
        let mut stderr_buf = Vec::new();
        let exit_code = {
            let mut tables = RouterTables::new();
            tables.outputs.insert(Channel::Output, &mut stdout_buf);
            tables.outputs.insert(Channel::Error, &mut stderr_buf);
            if let Some(inputs) = inputs {
                tables.inputs = inputs;
            }
            self.run_command(argv, &mut tables)?
        };

        Ok(CommandResult {
            stdout: String::from_utf8_lossy(&stdout_buf).into_owned(),
            stderr: String::from_utf8_lossy(&stderr_buf).into_owned(),
            exit_code,
        })
    }

    /// `hg root`, trimmed and memoized. Throws `CommandFailed` on a
    /// non-zero exit rather than returning a half-valid path.
    pub fn root(&self) -> Result<String> {
        if let Some(cached) = self.root.lock().unwrap().clone() {
            return Ok(cached);
        }
        let argv = vec!["root".to_string()];
        let out = self.get_command_output(&argv, None)?;
        fail_on_nonzero(&argv, &out)?;
        let root = out.stdout.trim_end().to_string();
        *self.root.lock().unwrap() = Some(root.clone());
        Ok(root)
    }

    /// `hg showconfig`, parsed as `key=value` lines (lines without `=` are
    /// skipped) and memoized.
    pub fn configuration(&self) -> Result<BTreeMap<String, String>> {
        if let Some(cached) = self.configuration.lock().unwrap().clone() {
            return Ok(cached);
        }
        let argv = vec!["showconfig".to_string()];
        let out = self.get_command_output(&argv, None)?;
        fail_on_nonzero(&argv, &out)?;

        let mut map = BTreeMap::new();
        for line in out.stdout.lines() {
            if let Some((k, v)) = line.split_once('=') {
                map.insert(k.to_string(), v.to_string());
            }
        }
        *self.configuration.lock().unwrap() = Some(map.clone());
        Ok(map)
    }

    /// `hg version`, parsed against the banner pattern described in
    /// spec.md 4.6 and normalized to `major.minor.trivial[extra]`, with
    /// `trivial` defaulting to `0`. Memoized.
    pub fn version(&self) -> Result<String> {
        if let Some(cached) = self.version.lock().unwrap().clone() {
            return Ok(cached);
        }
        let argv = vec!["version".to_string()];
        let out = self.get_command_output(&argv, None)?;
        fail_on_nonzero(&argv, &out)?;

        let parsed = version::parse_banner(&out.stdout)?;
        *self.version.lock().unwrap() = Some(parsed.clone());
        Ok(parsed)
    }

    /// Terminate the subprocess and release its pipes. Every subsequent
    /// call on this `Session` fails with `SessionClosed`. Safe to call
    /// more than once.
    pub fn close(&self) {
        let mut inner = self.inner.lock().unwrap();
        if inner.closed {
            return;
        }
        debug!("closing hg command server session");
        inner.closed = true;
        let _ = inner.child.kill();
        let _ = inner.child.wait();
    }
}

impl Drop for Session {
    fn drop(&mut self) {
        self.close();
    }
}

fn run_command_locked(inner: &mut Inner, argv: &[String], tables: &mut RouterTables<'_>) -> Result<i32> {
    write_command(&mut inner.stdin, argv)?;
    loop {
        match decode_frame(&mut inner.stdout)? {
            Some(frame) => {
                if let Some(code) = dispatch(frame, &mut inner.stdin, tables)? {
                    return Ok(code);
                }
            }
            None => continue,
        }
    }
}

fn fail_on_nonzero(argv: &[String], out: &CommandResult) -> Result<()> {
    if out.exit_code != 0 {
        return Err(Error::CommandFailed {
            argv: argv.to_vec(),
            exit_code: out.exit_code,
            stdout: out.stdout.clone().into_bytes(),
            stderr: out.stderr.clone().into_bytes(),
        });
    }
    Ok(())
}

/// Read the single hello frame the server emits right after spawn and
/// extract `encoding` and `capabilities`. Absence of either field is a
/// fatal `HandshakeFailed`, per spec.md 4.5.
fn handshake(stdout: &mut process::ChildStdout) -> Result<(String, HashSet<String>)> {
    let payload = loop {
        match decode_frame(stdout)? {
            Some(DecodedFrame::Data { channel: Channel::Output, payload }) => break payload,
            Some(DecodedFrame::Data { channel, .. }) => {
                return Err(Error::HandshakeFailed(format!(
                    "expected hello frame on channel 'o', got a frame on {:?}",
                    channel
                )));
            }
            Some(DecodedFrame::Request { .. }) => {
                return Err(Error::HandshakeFailed(
                    "server asked for input before sending a hello frame".into(),
                ));
            }
            None => continue,
        }
    };

    let text = String::from_utf8_lossy(&payload);
    let mut encoding = None;
    let mut capabilities = None;
    for line in text.lines() {
        if let Some((key, value)) = line.split_once(": ") {
            match key {
                "encoding" => encoding = Some(value.to_string()),
                "capabilities" => {
                    capabilities = Some(value.split(' ').map(str::to_string).collect::<HashSet<_>>())
                }
                _ => {}
            }
        }
    }

    let encoding = encoding.ok_or_else(|| Error::HandshakeFailed("hello frame missing 'encoding'".into()))?;
    let capabilities =
        capabilities.ok_or_else(|| Error::HandshakeFailed("hello frame missing 'capabilities'".into()))?;

    Ok((encoding, capabilities))
}
