//! # termfs CLI - a persistent virtual filesystem with git-like history
//!
//! Drives a file-backed termfs workspace one command at a time. The working
//! directory, the tree and the repository all persist in the store between
//! invocations.
//!
//! ## Usage
//! ```bash
//! termfs fs mkdir /tmp/x
//! termfs fs write /tmp/x/a.txt "hi"
//! termfs fs cat /tmp/x/a.txt
//!
//! termfs git init
//! termfs git add /tmp/x/a.txt
//! termfs git commit -m "first"
//! termfs git log
//! ```

use anyhow::Context;
use clap::{Args, Parser, Subcommand};
use colored::*;
use std::path::PathBuf;
use termfs::utils::{format_bytes, format_usage};
use termfs::{
    DiffEntry, LsOptions, MergeOutcome, RmOptions, StatusReport, Workspace,
    WorkspaceBuilder,
};
use tracing_subscriber::EnvFilter;

/// termfs - virtual filesystem with a git-like engine
#[derive(Parser)]
#[command(name = "termfs")]
#[command(version, about = "Virtual Unix-style filesystem with git-like version control")]
#[command(long_about = None)]
struct Cli {
    /// Store directory (defaults to $TERMFS_STORE or ./.termfs)
    #[arg(short, long, global = true)]
    store: Option<PathBuf>,

    /// User name for a freshly created filesystem
    #[arg(long, global = true)]
    user: Option<String>,

    /// Enable verbose output
    #[arg(short, long, global = true)]
    verbose: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Filesystem commands
    #[command(subcommand)]
    Fs(FsCommand),

    /// Version control commands
    #[command(subcommand)]
    Git(GitCommand),

    /// Show storage consumption
    Usage,

    /// Reset the filesystem and repository to defaults
    Reset,
}

#[derive(Subcommand)]
enum FsCommand {
    /// Print the working directory
    Pwd,
    /// Change the working directory
    Cd { path: String },
    /// List a directory
    Ls(LsArgs),
    /// Show metadata for a path
    Stat { path: String },
    /// Print a file
    Cat { path: String },
    /// Create a file or bump its modification time
    Touch { path: String },
    /// Create a directory
    Mkdir { path: String },
    /// Remove a file or directory
    Rm {
        path: String,
        /// Remove directories and their contents
        #[arg(short, long)]
        recursive: bool,
    },
    /// Remove an empty directory
    Rmdir { path: String },
    /// Copy a file or directory
    Cp { src: String, dest: String },
    /// Move or rename a file or directory
    Mv { src: String, dest: String },
    /// Replace a file's content
    Write { path: String, content: String },
    /// Append to a file
    Append { path: String, content: String },
    /// Find nodes by name glob
    Find {
        /// Glob pattern (`*` and `?`)
        pattern: String,
        /// Where to start (defaults to the working directory)
        #[arg(default_value = "")]
        start: String,
    },
    /// Search file contents with a regex
    Grep {
        pattern: String,
        #[arg(default_value = "")]
        path: String,
    },
    /// Tab-completion candidates for a partial path
    Complete {
        #[arg(default_value = "")]
        partial: String,
    },
}

#[derive(Args)]
struct LsArgs {
    path: Option<String>,
    /// Show hidden entries
    #[arg(short, long)]
    all: bool,
    /// Long listing
    #[arg(short, long)]
    long: bool,
}

#[derive(Subcommand)]
enum GitCommand {
    /// Create an empty repository
    Init,
    /// Show the working tree status
    Status,
    /// Stage changes
    Add {
        /// Path to stage
        path: Option<String>,
        /// Stage every change
        #[arg(short = 'A', long)]
        all: bool,
    },
    /// Unstage changes (everything when no path is given)
    Reset { path: Option<String> },
    /// Record staged changes
    Commit {
        /// Commit message
        #[arg(short, long)]
        message: String,
    },
    /// Show history of the current branch
    Log {
        /// Limit the number of entries
        #[arg(short = 'n', long)]
        limit: Option<usize>,
    },
    /// Show a commit and its changes
    Show { hash: String },
    /// List, create or delete branches
    Branch {
        name: Option<String>,
        /// Delete the named branch
        #[arg(short, long)]
        delete: bool,
    },
    /// Switch branches or restore a commit
    Checkout { target: String },
    /// Fast-forward the current branch
    Merge { branch: String },
    /// Show unstaged (or staged) changes
    Diff {
        #[arg(long)]
        staged: bool,
    },
}

fn main() {
    let cli = Cli::parse();

    // Set up logging
    let filter = if cli.verbose {
        EnvFilter::new("debug")
    } else {
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn"))
    };
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .init();

    // Disable colors if needed
    if std::env::var("NO_COLOR").is_ok() {
        colored::control::set_override(false);
    }

    if let Err(e) = run(cli) {
        eprintln!("{}: {:#}", "Error".red().bold(), e);
        std::process::exit(1);
    }
}

/// Main command runner
fn run(cli: Cli) -> anyhow::Result<()> {
    let store_dir = cli
        .store
        .or_else(|| std::env::var_os("TERMFS_STORE").map(PathBuf::from))
        .unwrap_or_else(|| PathBuf::from(".termfs"));

    let mut builder = WorkspaceBuilder::new();
    if let Some(user) = cli.user {
        builder = builder.home_dir(format!("/home/{}", user)).user(user);
    }
    let mut ws = builder
        .open(&store_dir)
        .with_context(|| format!("failed to open store at {}", store_dir.display()))?;

    match cli.command {
        Commands::Fs(cmd) => run_fs(&mut ws, cmd),
        Commands::Git(cmd) => run_git(&mut ws, cmd),
        Commands::Usage => cmd_usage(&ws),
        Commands::Reset => {
            ws.reset();
            println!("{}", "Workspace reset to defaults".green());
            Ok(())
        }
    }
}

fn run_fs(ws: &mut Workspace, cmd: FsCommand) -> anyhow::Result<()> {
    let fs = &mut ws.filesystem;
    match cmd {
        FsCommand::Pwd => println!("{}", fs.cwd()),
        FsCommand::Cd { path } => println!("{}", fs.cd(&path)?),
        FsCommand::Ls(args) => {
            let options = LsOptions {
                all: args.all,
                long: args.long,
            };
            for entry in fs.ls(args.path.as_deref(), options)? {
                let name = if entry.is_dir() {
                    format!("{}/", entry.name).blue().bold()
                } else {
                    entry.name.normal()
                };
                match &entry.details {
                    Some(details) => println!(
                        "{} {:>10} {} {}",
                        if entry.is_dir() { "d" } else { "-" },
                        format_bytes(details.size),
                        details.modified_at.format("%Y-%m-%d %H:%M").to_string().dimmed(),
                        name
                    ),
                    None => println!("{}", name),
                }
            }
        }
        FsCommand::Stat { path } => {
            let entry = fs.stat(&path)?;
            println!("  Path: {}", entry.path.cyan());
            println!("  Type: {}", entry.node_type.as_str());
            if let Some(details) = entry.details {
                println!("  Size: {}", format_bytes(details.size));
                println!("Create: {}", details.created_at.format("%Y-%m-%d %H:%M:%S"));
                println!("Modify: {}", details.modified_at.format("%Y-%m-%d %H:%M:%S"));
            }
        }
        FsCommand::Cat { path } => print!("{}", fs.cat(&path)?),
        FsCommand::Touch { path } => fs.touch(&path)?,
        FsCommand::Mkdir { path } => fs.mkdir(&path)?,
        FsCommand::Rm { path, recursive } => fs.rm(&path, RmOptions { recursive })?,
        FsCommand::Rmdir { path } => fs.rmdir(&path)?,
        FsCommand::Cp { src, dest } => {
            let target = fs.cp(&src, &dest)?;
            println!("{} -> {}", src, target.cyan());
        }
        FsCommand::Mv { src, dest } => {
            let target = fs.mv(&src, &dest)?;
            println!("{} -> {}", src, target.cyan());
        }
        FsCommand::Write { path, content } => fs.write_file(&path, &content)?,
        FsCommand::Append { path, content } => fs.append_file(&path, &content)?,
        FsCommand::Find { pattern, start } => {
            for path in fs.find(&start, &pattern)? {
                println!("{}", path);
            }
        }
        FsCommand::Grep { pattern, path } => {
            for hit in fs.grep(&pattern, &path)? {
                println!("{}:{}: {}", hit.path.magenta(), hit.line.to_string().green(), hit.content);
            }
        }
        FsCommand::Complete { partial } => {
            for candidate in fs.completions(&partial) {
                println!("{}", candidate);
            }
        }
    }
    Ok(())
}

fn run_git(ws: &mut Workspace, cmd: GitCommand) -> anyhow::Result<()> {
    let Workspace { filesystem, git, .. } = ws;
    match cmd {
        GitCommand::Init => {
            git.init()?;
            println!("Initialized empty repository on branch {}", git.current_branch().green());
        }
        GitCommand::Status => print_status(&git.status(filesystem)?, git.detached_head()),
        GitCommand::Add { path, all } => {
            let count = match (path, all) {
                (_, true) => git.add_all(filesystem)?,
                (Some(path), false) => git.add(filesystem, &path)?,
                (None, false) => anyhow::bail!("nothing specified, nothing added (try 'git add -A')"),
            };
            println!("Staged {} path(s)", count);
        }
        GitCommand::Reset { path } => {
            let count = match path {
                Some(path) => git.reset(filesystem, &path)?,
                None => git.reset_all()?,
            };
            println!("Unstaged {} path(s)", count);
        }
        GitCommand::Commit { message } => {
            let commit = git.commit(filesystem, &message)?;
            println!(
                "[{} {}] {}",
                git.current_branch().green(),
                commit.hash.yellow(),
                commit.summary()
            );
        }
        GitCommand::Log { limit } => {
            for entry in git.log(limit)? {
                print!("{} ", entry.hash.yellow().bold());
                if !entry.branches.is_empty() {
                    print!("({}) ", entry.branches.join(", ").green());
                }
                println!(
                    "{} {}",
                    entry.timestamp.format("%Y-%m-%d %H:%M:%S").to_string().dimmed(),
                    entry.message
                );
            }
        }
        GitCommand::Show { hash } => {
            let details = git.show(&hash)?;
            println!("{} {}", "commit".yellow(), details.commit.hash.yellow().bold());
            if let Some(parent) = &details.commit.parent_hash {
                println!("Parent: {}", parent.dimmed());
            }
            println!("Date:   {}", details.commit.timestamp.format("%Y-%m-%d %H:%M:%S"));
            println!();
            println!("    {}", details.commit.message);
            println!();
            print_diff(&details.changes);
        }
        GitCommand::Branch { name: None, .. } => {
            for branch in git.list_branches()? {
                let marker = if branch.is_current { "*".green().bold() } else { " ".normal() };
                let head = branch.head.as_deref().unwrap_or("(no commits)");
                println!("{} {} {}", marker, branch.name, head.dimmed());
            }
        }
        GitCommand::Branch { name: Some(name), delete } => {
            if delete {
                git.delete_branch(&name)?;
                println!("Deleted branch {}", name);
            } else {
                git.branch(&name)?;
                println!("Created branch {}", name.green());
            }
        }
        GitCommand::Checkout { target } => {
            let result = git.checkout(filesystem, &target)?;
            if result.detached {
                println!(
                    "Checked out commit {} (branch {} unchanged)",
                    result.commit.unwrap_or_default().yellow(),
                    result.branch
                );
            } else {
                println!("Switched to branch {}", result.branch.green());
            }
            println!(
                "{}",
                format!(
                    "{} written, {} removed",
                    result.restore.files_written, result.restore.files_removed
                )
                .dimmed()
            );
        }
        GitCommand::Merge { branch } => match git.merge(filesystem, &branch)? {
            MergeOutcome::AlreadyUpToDate => println!("Already up to date."),
            MergeOutcome::FastForward { from, to, .. } => {
                println!(
                    "Updating {}..{}\nFast-forward",
                    from.unwrap_or_else(|| "0000000".to_string()),
                    to
                );
            }
        },
        GitCommand::Diff { staged } => {
            let entries = if staged {
                git.diff_staged(filesystem)?
            } else {
                git.diff(filesystem)?
            };
            print_diff(&entries);
        }
    }
    Ok(())
}

fn cmd_usage(ws: &Workspace) -> anyhow::Result<()> {
    let usage = ws.storage_usage()?;
    println!("{}", format_usage(&usage));
    Ok(())
}

fn print_status(report: &StatusReport, detached: Option<&str>) {
    match detached {
        Some(hash) => println!("HEAD at {} (on branch {})", hash.yellow(), report.branch),
        None => println!("On branch {}", report.branch.green()),
    }

    let staged: Vec<_> = report.staged_changes().collect();
    if !staged.is_empty() {
        println!("\nChanges to be committed:");
        for entry in staged {
            println!("        {}", format!("{}:   {}", entry.change.label(), entry.path).green());
        }
    }
    if !report.unstaged.is_empty() {
        println!("\nChanges not staged for commit:");
        for entry in &report.unstaged {
            println!("        {}", format!("{}:   {}", entry.change.label(), entry.path).red());
        }
    }
    if !report.untracked.is_empty() {
        println!("\nUntracked files:");
        for path in &report.untracked {
            println!("        {}", path.red());
        }
    }
    if report.is_clean() {
        println!("nothing to commit, working tree clean");
    }
}

fn print_diff(entries: &[DiffEntry]) {
    for entry in entries {
        println!("{}", format!("--- {} ({})", entry.path, entry.change.label()).bold());
        if let Some(old) = &entry.old_content {
            for line in old.lines() {
                println!("{}", format!("-{}", line).red());
            }
        }
        if let Some(new) = &entry.new_content {
            for line in new.lines() {
                println!("{}", format!("+{}", line).green());
            }
        }
    }
}
