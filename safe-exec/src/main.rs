//! Safe Executor - Main entry point
//!
//! Intercepts potentially destructive shell commands, backs up vital paths
//! first, and gates execution behind an explicit confirmation.

use anyhow::Result;
use clap::Parser;
use safe_exec::{ExecOptions, SafeExecutor};
use std::path::PathBuf;
use vitals_guardian::{utils, StdinConfirmer, VitalsContext, VitalsGuardian};

#[derive(Parser, Debug)]
#[command(author, version, about, long_about = None)]
struct Args {
    /// Force execution without confirmation
    #[arg(long)]
    force: bool,

    /// Show what would happen without executing
    #[arg(long)]
    dry_run: bool,

    /// Strict mode: confirm every destructive command
    #[arg(long)]
    strict: bool,

    /// Skip the automatic pre-destructive snapshot
    #[arg(long)]
    no_backup: bool,

    /// Repository root to protect (defaults to the current directory)
    #[arg(long, value_name = "DIR")]
    repo_root: Option<PathBuf>,

    /// Log level (trace, debug, info, warn, error)
    #[arg(short, long, default_value = "info")]
    log_level: String,

    /// The command to execute (use `--` to separate it from the flags)
    #[arg(trailing_var_arg = true, allow_hyphen_values = true, required = true)]
    command: Vec<String>,
}

fn main() -> Result<()> {
    let args = Args::parse();

    let repo_root = match args.repo_root {
        Some(root) => root,
        None => std::env::current_dir()?,
    };
    let ctx = VitalsContext::new(&repo_root);
    ctx.ensure_dirs()?;
    utils::logger::init(&args.log_level, Some((&ctx.vitals_dir, "safe-exec.log")))?;

    let guardian = VitalsGuardian::new(ctx)?;
    let auto_backup = !args.no_backup && guardian.config().auto_backup_on_destructive;

    let mut executor = SafeExecutor::new(
        &repo_root,
        guardian,
        StdinConfirmer,
        auto_backup,
        args.strict,
    );

    let command = args.command.join(" ");
    let outcome = executor.execute(
        &command,
        ExecOptions {
            force: args.force,
            dry_run: args.dry_run,
        },
    )?;

    std::process::exit(outcome.exit_code());
}
