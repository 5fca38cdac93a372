#![allow(dead_code)]

use std::process::Command;

/// Whether a real `hg` binary is reachable on `PATH`. Integration tests
/// that need one skip (rather than fail) when it isn't, since the
/// environment building this crate is not guaranteed to have Mercurial
/// installed.
pub fn hg_available() -> bool {
    Command::new("hg").arg("--version").output().map(|out| out.status.success()).unwrap_or(false)
}

/// Create a fresh temp dir and run `hg init` in it, returning the dir.
/// Panics if `hg init` fails -- callers should already have checked
/// `hg_available()`.
pub fn init_repo() -> tempfile::TempDir {
    let dir = tempfile::tempdir().expect("creating temp dir");
    let status = Command::new("hg")
        .arg("init")
        .arg(dir.path())
        .status()
        .expect("spawning hg init");
    assert!(status.success(), "hg init failed");
    dir
}

/// Path to the `fake_hg` fixture binary (`tests/support/fake_hg.rs`), built
/// by cargo alongside this crate's tests. Speaks just enough of the
/// command-server wire protocol to exercise the transport without a real
/// `hg` installation anywhere.
pub fn fake_hg_path() -> &'static str {
    env!("CARGO_BIN_EXE_fake_hg")
}

/// A temp dir that merely looks like a Mercurial repository to
/// `validate_repo`'s `.hg`-directory check. `fake_hg` never reads
/// repository content, so nothing further needs to be initialized here.
pub fn fake_repo() -> tempfile::TempDir {
    let dir = tempfile::tempdir().expect("creating temp dir");
    std::fs::create_dir(dir.path().join(".hg")).expect("creating .hg directory");
    dir
}
