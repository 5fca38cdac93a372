use std::{
    collections::BTreeMap,
    path::{Path, PathBuf},
    process::{self, Stdio},
};

use tracing::{debug, instrument};

use crate::error::{Error, Result};

/// Everything needed to spawn `hg serve --cmdserver pipe` for a single
/// repository. Bundled so `Session::new` has one thing to validate and one
/// thing to hand to [`spawn`].
pub struct SpawnSpec {
    pub repo: PathBuf,
    pub encoding: Option<String>,
    pub config_overrides: BTreeMap<String, String>,
    pub hg_path: String,
}

/// Validate that `repo` looks like a Mercurial working directory: it must
/// exist and contain a `.hg` subdirectory. An empty path is an
/// `InvalidArgument`, not an `InvalidRepository`, since it's a caller
/// mistake rather than a missing repo.
pub fn validate_repo(repo: &Path) -> Result<()> {
    if repo.as_os_str().is_empty() {
        return Err(Error::InvalidArgument("repository path must not be empty".into()));
    }
    if !repo.is_dir() || !repo.join(".hg").is_dir() {
        return Err(Error::InvalidRepository(repo.to_path_buf()));
    }
    Ok(())
}

/// Spawn the command server subprocess with its three standard streams
/// redirected to pipes, no shell, and the environment/cwd the spec
/// requires. Returns the child with stdin/stdout/stderr still attached so
/// the caller can take them.
#[instrument(skip(spec), fields(repo = %spec.repo.display()))]
pub fn spawn(spec: &SpawnSpec) -> Result<process::Child> {
    let mut cmd = process::Command::new(&spec.hg_path);
    cmd.arg("serve")
        .arg("--cmdserver")
        .arg("pipe")
        .arg("--cwd")
        .arg(&spec.repo)
        .arg("--repository")
        .arg(&spec.repo)
        .current_dir(&spec.repo)
        .stdin(Stdio::piped())
        .stdout(Stdio::piped())
        .stderr(Stdio::piped());

    if let Some(encoding) = &spec.encoding {
        cmd.env("HGENCODING", encoding);
    }

    if !spec.config_overrides.is_empty() {
        let joined = spec
            .config_overrides
            .iter()
            .map(|(k, v)| format!("{k}={v}"))
            .collect::<Vec<_>>()
            .join(",");
        cmd.arg("--config").arg(joined);
    }

    debug!("spawning hg command server");
    cmd.spawn().map_err(Error::ServerUnavailable)
}

#[cfg(test)]
mod test {
    use super::*;

    #[test]
    fn empty_path_is_invalid_argument() {
        assert!(matches!(validate_repo(Path::new("")), Err(Error::InvalidArgument(_))));
    }

    #[test]
    fn missing_path_is_invalid_repository() {
        assert!(matches!(
            validate_repo(Path::new("/does/not/exist/hgcmd-test")),
            Err(Error::InvalidRepository(_))
        ));
    }

    #[test]
    fn dir_without_dot_hg_is_invalid_repository() {
        let dir = tempfile::tempdir().unwrap();
        assert!(matches!(validate_repo(dir.path()), Err(Error::InvalidRepository(_))));
    }

    #[test]
    fn dir_with_dot_hg_is_valid() {
        let dir = tempfile::tempdir().unwrap();
        std::fs::create_dir(dir.path().join(".hg")).unwrap();
        assert!(validate_repo(dir.path()).is_ok());
    }
}
