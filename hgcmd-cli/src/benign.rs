//! Exit code 1 has command-specific meaning for several Mercurial
//! subcommands (spec.md 4.4/7). `hgcmd` itself surfaces the raw integer;
//! this thin layer is where the CLI decides which ones to treat as a
//! non-error ("nothing to do") rather than a failure worth a non-zero
//! process exit.

const BENIGN_ON_ONE: &[&str] = &["commit", "merge", "update", "pull", "push", "heads"];

pub fn is_benign(subcommand: &str, exit_code: i32) -> bool {
    exit_code == 0 || (exit_code == 1 && BENIGN_ON_ONE.contains(&subcommand))
}
