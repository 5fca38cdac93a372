use std::process::ExitCode;

use anyhow::Context;
use clap::{Parser, Subcommand};
use tracing_subscriber::fmt::format::FmtSpan;

mod benign;
mod commands;
mod config;

#[derive(Parser, Debug)]
#[clap(version, author, about)]
struct Args {
    #[clap(short, long, action, help = "a toml file containing configuration")]
    config_file: Option<String>,
    #[clap(short, long, action, help = "the repository to operate on", default_value = ".")]
    repo: String,
    #[clap(long, action, help = "path to the hg executable, overriding the config file")]
    hg_path: Option<String>,
    #[clap(short, long, action = clap::ArgAction::Count, help = "show more in logs, may be provided multiple times")]
    verbose: u8,
    #[clap(subcommand)]
    command: Commands,
}

#[derive(Subcommand, Debug)]
enum Commands {
    #[clap(about = "create a new repository")]
    Init { dest: String },
    #[clap(about = "clone an existing repository")]
    Clone { source: String, dest: Option<String> },
    #[clap(about = "add files to be tracked")]
    Add { paths: Vec<String> },
    #[clap(about = "commit staged changes")]
    Commit {
        #[clap(short, long)]
        message: String,
        paths: Vec<String>,
    },
    #[clap(about = "show the status of the working copy")]
    Status { paths: Vec<String> },
    #[clap(about = "show revision history")]
    Log {
        #[clap(long)]
        template: Option<String>,
        #[clap(long)]
        limit: Option<u32>,
    },
    #[clap(about = "show changes in the working copy")]
    Diff { paths: Vec<String> },
    #[clap(about = "pull changes from another repository")]
    Pull { source: Option<String> },
    #[clap(about = "push changes to another repository")]
    Push { dest: Option<String> },
    #[clap(about = "merge another revision into the working copy")]
    Merge { revision: Option<String> },
    #[clap(about = "update the working copy to a revision")]
    Update { revision: Option<String> },
    #[clap(about = "show the current repository heads")]
    Heads,
}

fn main() -> anyhow::Result<ExitCode> {
    let args = Args::parse();

    let trace_level = match args.verbose {
        0 => tracing::Level::WARN,
        1 => tracing::Level::INFO,
        _ => tracing::Level::DEBUG,
    };
    tracing_subscriber::fmt()
        .with_max_level(trace_level)
        .with_target(false)
        .with_span_events(FmtSpan::NEW | FmtSpan::CLOSE)
        .init();

    let config = config::read_config(&args.config_file).context("reading config file")?;

    // `init`/`clone` have no existing repository to attach a session to
    // yet, so they get a raw one-shot subprocess instead of a `Session`.
    match &args.command {
        Commands::Init { dest } => return run_bootstrap(&config, commands::init(dest)),
        Commands::Clone { source, dest } => {
            return run_bootstrap(&config, commands::clone(source, dest.as_deref()));
        }
        _ => {}
    }

    let session = hgcmd::Session::new(
        &args.repo,
        config.encoding(),
        config.config_overrides(),
        args.hg_path.clone().or_else(|| config.hg_path()),
    )
    .context("starting the hg command server")?;

    let (subcommand, argv) = match &args.command {
        Commands::Add { paths } => ("add", commands::add(paths)),
        Commands::Commit { message, paths } => ("commit", commands::commit(message, paths)),
        Commands::Status { paths } => ("status", commands::status(paths)),
        Commands::Log { template, limit } => ("log", commands::log(template.as_deref(), *limit)),
        Commands::Diff { paths } => ("diff", commands::diff(paths)),
        Commands::Pull { source } => ("pull", commands::pull(source.as_deref())),
        Commands::Push { dest } => ("push", commands::push(dest.as_deref())),
        Commands::Merge { revision } => ("merge", commands::merge(revision.as_deref())),
        Commands::Update { revision } => ("update", commands::update(revision.as_deref())),
        Commands::Heads => ("heads", commands::heads()),
        Commands::Init { .. } | Commands::Clone { .. } => unreachable!("handled above"),
    };

    let result = session.get_command_output(&argv, None).context("running hg command")?;
    print!("{}", result.stdout);
    eprint!("{}", result.stderr);

    if benign::is_benign(subcommand, result.exit_code) {
        Ok(ExitCode::SUCCESS)
    } else {
        Ok(ExitCode::FAILURE)
    }
}

/// `init`/`clone` run before any `.hg` directory exists, so there's
/// nothing for a `Session` to attach to. Shell out directly instead; this
/// is the one place in the CLI layer that talks to `hg` without going
/// through `hgcmd`'s command server transport.
fn run_bootstrap(config: &config::Config, argv: Vec<String>) -> anyhow::Result<ExitCode> {
    let hg_path = config.hg_path().unwrap_or_else(|| "hg".to_string());
    let status = std::process::Command::new(hg_path)
        .args(&argv)
        .status()
        .context("spawning hg")?;
    Ok(if status.success() { ExitCode::SUCCESS } else { ExitCode::FAILURE })
}
