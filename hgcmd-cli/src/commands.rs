//! Argv assembly for the handful of Mercurial subcommands this binary
//! wraps. Each function only builds the argument vector; calling
//! `hgcmd::Session::get_command_output` and interpreting the result is
//! left to `main.rs`. This module has no knowledge of the wire protocol.

pub fn init(dest: &str) -> Vec<String> {
    vec!["init".to_string(), dest.to_string()]
}

pub fn clone(source: &str, dest: Option<&str>) -> Vec<String> {
    let mut argv = vec!["clone".to_string(), source.to_string()];
    if let Some(dest) = dest {
        argv.push(dest.to_string());
    }
    argv
}

pub fn add(paths: &[String]) -> Vec<String> {
    let mut argv = vec!["add".to_string()];
    argv.extend(paths.iter().cloned());
    argv
}

pub fn commit(message: &str, paths: &[String]) -> Vec<String> {
    let mut argv = vec!["commit".to_string(), "-m".to_string(), message.to_string()];
    argv.extend(paths.iter().cloned());
    argv
}

pub fn status(paths: &[String]) -> Vec<String> {
    let mut argv = vec!["status".to_string()];
    argv.extend(paths.iter().cloned());
    argv
}

pub fn log(template: Option<&str>, limit: Option<u32>) -> Vec<String> {
    let mut argv = vec!["log".to_string()];
    if let Some(template) = template {
        argv.push("--template".to_string());
        argv.push(template.to_string());
    }
    if let Some(limit) = limit {
        argv.push("--limit".to_string());
        argv.push(limit.to_string());
    }
    argv
}

pub fn diff(paths: &[String]) -> Vec<String> {
    let mut argv = vec!["diff".to_string()];
    argv.extend(paths.iter().cloned());
    argv
}

pub fn pull(source: Option<&str>) -> Vec<String> {
    let mut argv = vec!["pull".to_string()];
    if let Some(source) = source {
        argv.push(source.to_string());
    }
    argv
}

pub fn push(dest: Option<&str>) -> Vec<String> {
    let mut argv = vec!["push".to_string()];
    if let Some(dest) = dest {
        argv.push(dest.to_string());
    }
    argv
}

pub fn merge(revision: Option<&str>) -> Vec<String> {
    let mut argv = vec!["merge".to_string()];
    if let Some(revision) = revision {
        argv.push("-r".to_string());
        argv.push(revision.to_string());
    }
    argv
}

pub fn update(revision: Option<&str>) -> Vec<String> {
    let mut argv = vec!["update".to_string()];
    if let Some(revision) = revision {
        argv.push(revision.to_string());
    }
    argv
}

pub fn heads() -> Vec<String> {
    vec!["heads".to_string()]
}

#[cfg(test)]
mod test {
    use super::*;

    #[test]
    fn commit_places_message_before_paths() {
        let argv = commit("fix bug", &["a.txt".to_string(), "b.txt".to_string()]);
        assert_eq!(argv, vec!["commit", "-m", "fix bug", "a.txt", "b.txt"]);
    }

    #[test]
    fn clone_omits_dest_when_unset() {
        assert_eq!(clone("http://example.com/repo", None), vec!["clone", "http://example.com/repo"]);
    }

    #[test]
    fn log_with_template_and_limit() {
        let argv = log(Some("{desc}\\n"), Some(5));
        assert_eq!(argv, vec!["log", "--template", "{desc}\\n", "--limit", "5"]);
    }

    #[test]
    fn heads_takes_no_arguments() {
        assert_eq!(heads(), vec!["heads"]);
    }
}
