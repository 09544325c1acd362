//! sprig - a small local version-control engine
//!
//! This is the main entry point for the sprig command-line interface.

use std::path::PathBuf;
use std::process::ExitCode;

use clap::{Parser, Subcommand};
use tracing_subscriber::EnvFilter;

use sprig::repo::{LogEntry, MergeOutcome, RepoError, RepoResult, Repository, RepositoryConfig};

// ==================== Arguments ====================

/// Track snapshots of a flat directory, with branches and three-way merge.
#[derive(Parser, Debug)]
#[command(name = "sprig", version)]
struct Cli {
    /// Working directory of the repository.
    #[arg(short = 'C', long = "dir", global = true, default_value = ".")]
    dir: PathBuf,

    /// Author name recorded on new commits.
    #[arg(long, global = true, env = "SPRIG_AUTHOR_NAME")]
    author_name: Option<String>,

    /// Author email recorded on new commits.
    #[arg(long, global = true, env = "SPRIG_AUTHOR_EMAIL")]
    author_email: Option<String>,

    /// Log more (-v info, -vv debug). RUST_LOG overrides.
    #[arg(short, long, global = true, action = clap::ArgAction::Count)]
    verbose: u8,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Create a repository in the working directory.
    Init,

    /// Stage a file for the next commit.
    Add { file: String },

    /// Record the staged changes.
    Commit { message: String },

    /// Unstage a file, or stage its removal.
    Rm { file: String },

    /// Show the history of the current commit.
    Log,

    /// Show every commit ever made.
    GlobalLog,

    /// Print the ids of commits with the given message.
    Find { message: String },

    /// Show branches, staged files and working-tree changes.
    Status,

    /// `checkout <branch>`, `checkout -- <file>` or `checkout <commit> -- <file>`.
    Checkout {
        /// Branch name, or commit id when a file follows `--`.
        target: Option<String>,

        /// File to restore.
        #[arg(last = true)]
        file: Option<String>,
    },

    /// Create a branch at the current commit.
    Branch { name: String },

    /// Delete a branch.
    RmBranch { name: String },

    /// Check out a commit and move the current branch to it.
    Reset { commit: String },

    /// Merge a branch into the current branch.
    Merge { branch: String },
}

// ==================== Main ====================

fn main() -> ExitCode {
    let cli = Cli::parse();
    init_logging(cli.verbose);

    match run(cli) {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) if e.is_informational() => {
            println!("{}", e);
            ExitCode::SUCCESS
        }
        Err(e) => {
            eprintln!("{}", e);
            ExitCode::FAILURE
        }
    }
}

fn init_logging(verbose: u8) {
    let level = match verbose {
        0 => "warn",
        1 => "info",
        _ => "debug",
    };
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(level));

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(false)
        .without_time()
        .with_writer(std::io::stderr)
        .init();
}

fn config(cli: &Cli) -> RepositoryConfig {
    let mut config = RepositoryConfig::new(&cli.dir);
    if let Some(name) = &cli.author_name {
        config = config.author_name(name.clone());
    }
    if let Some(email) = &cli.author_email {
        config = config.author_email(email.clone());
    }
    config
}

fn run(cli: Cli) -> RepoResult<()> {
    let config = config(&cli);
    // every command except init works on an existing repository
    let open = || Repository::open(config.clone());

    match cli.command {
        Command::Init => Repository::init(config.clone()).map(|_| ()),
        Command::Add { file } => open()?.add(&file),
        Command::Commit { message } => open()?.commit(&message).map(|_| ()),
        Command::Rm { file } => open()?.rm(&file),
        Command::Log => {
            for commit in open()?.log()? {
                println!("{}", LogEntry(&commit));
            }
            Ok(())
        }
        Command::GlobalLog => {
            for commit in open()?.global_log()? {
                println!("{}", LogEntry(&commit));
            }
            Ok(())
        }
        Command::Find { message } => {
            for id in open()?.find(&message)? {
                println!("{}", id);
            }
            Ok(())
        }
        Command::Status => {
            println!("{}", open()?.status()?);
            Ok(())
        }
        Command::Checkout { target, file } => checkout(&open()?, target, file),
        Command::Branch { name } => open()?.branch(&name).map(|_| ()),
        Command::RmBranch { name } => open()?.rm_branch(&name),
        Command::Reset { commit } => open()?.reset(&commit),
        Command::Merge { branch } => {
            let outcome = open()?.merge(&branch)?;
            match outcome {
                MergeOutcome::FastForward(_) => println!("Current branch fast-forwarded."),
                MergeOutcome::Merged { .. } if outcome.has_conflict() => {
                    println!("Encountered a merge conflict.")
                }
                MergeOutcome::Merged { .. } => {}
            }
            Ok(())
        }
    }
}

fn checkout(repo: &Repository, target: Option<String>, file: Option<String>) -> RepoResult<()> {
    match (target, file) {
        (None, Some(file)) => repo.checkout_file(&file),
        (Some(commit), Some(file)) => repo.checkout_file_in_commit(&commit, &file),
        (Some(branch), None) => repo.checkout_branch(&branch),
        (None, None) => Err(RepoError::NoSuchBranch),
    }
}
