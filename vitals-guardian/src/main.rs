//! Vitals Guardian - Main entry point
//!
//! CLI for integrity checks, snapshots, listing and restores of the
//! configured vital paths.

use anyhow::Result;
use clap::{Parser, Subcommand};
use std::io::Write;
use std::path::PathBuf;
use vitals_guardian::{
    utils, Confirmation, GuardianError, Severity, StdinConfirmer, Strictness, VitalsContext,
    VitalsGuardian, VitalsProtector,
};

#[derive(Parser, Debug)]
#[command(author, version, about, long_about = None)]
struct Args {
    /// Repository root to protect (defaults to the current directory)
    #[arg(long, value_name = "DIR")]
    repo_root: Option<PathBuf>,

    /// Log level (trace, debug, info, warn, error)
    #[arg(short, long, default_value = "info")]
    log_level: String,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Verify vital-path integrity against the saved manifest
    Check,
    /// Create a snapshot of all vital paths
    Snapshot {
        /// Reason tag recorded in the snapshot metadata
        #[arg(long, default_value = "manual")]
        reason: String,
    },
    /// List available snapshots, newest first
    List,
    /// Restore vital paths from a snapshot
    Restore {
        /// Snapshot name; interactive selection when omitted
        #[arg(long)]
        snapshot: Option<String>,
        /// Specific relative paths to restore (default: everything)
        #[arg(long, num_args = 1..)]
        files: Vec<String>,
    },
}

fn main() -> Result<()> {
    let args = Args::parse();

    let repo_root = match args.repo_root {
        Some(root) => root,
        None => std::env::current_dir()?,
    };
    let ctx = VitalsContext::new(repo_root);
    ctx.ensure_dirs()?;
    utils::logger::init(&args.log_level, Some((&ctx.vitals_dir, "vitals.log")))?;

    let mut guardian = VitalsGuardian::new(ctx)?;

    let code = match args.command {
        Command::Check => cmd_check(&mut guardian)?,
        Command::Snapshot { reason } => cmd_snapshot(&guardian, &reason)?,
        Command::List => cmd_list(&guardian),
        Command::Restore { snapshot, files } => {
            let files = if files.is_empty() { None } else { Some(files) };
            cmd_restore(&mut guardian, snapshot, files)?
        }
    };

    std::process::exit(code);
}

fn cmd_check(guardian: &mut VitalsGuardian) -> Result<i32> {
    let report = guardian.check_integrity()?;

    println!("\n{}", "=".repeat(60));
    println!("INTEGRITY CHECK RESULT");
    println!("{}", "=".repeat(60));

    if report.issues.is_empty() {
        println!("\n[OK] All vital files are intact");
        return Ok(0);
    }

    let by_severity = |s: Severity| report.issues.iter().filter(move |i| i.severity == s);

    let critical: Vec<_> = by_severity(Severity::Critical).collect();
    let warnings: Vec<_> = by_severity(Severity::Warning).collect();
    let info: Vec<_> = by_severity(Severity::Info).collect();

    if !critical.is_empty() {
        println!("\n[!] MISSING VITAL FILES ({}):", critical.len());
        for issue in &critical {
            println!("   [X] {}", issue.path);
        }
    }
    if !warnings.is_empty() {
        println!("\n[~] Modified files ({}):", warnings.len());
        for issue in &warnings {
            println!("   [~] {}", issue.path);
        }
    }
    if !info.is_empty() {
        println!("\n[+] New files ({}):", info.len());
        for issue in &info {
            println!("   [+] {}", issue.path);
        }
    }

    if !critical.is_empty()
        && StdinConfirmer.confirm("\nRestore from a snapshot?", Strictness::Normal)
    {
        cmd_restore(guardian, None, None)?;
    }

    Ok(if critical.is_empty() { 0 } else { 1 })
}

fn cmd_snapshot(guardian: &VitalsGuardian, reason: &str) -> Result<i32> {
    let info = guardian.create_snapshot(reason)?;
    println!("\n[OK] Snapshot created: {}", info.name);
    // Partial copy errors are reported in the log/metadata, never fatal
    Ok(0)
}

fn cmd_list(guardian: &VitalsGuardian) -> i32 {
    let snapshots = guardian.list_snapshots();

    println!("\n{}", "=".repeat(60));
    println!("AVAILABLE SNAPSHOTS");
    println!("{}", "=".repeat(60));

    if snapshots.is_empty() {
        println!("\nNo snapshots available");
        return 0;
    }

    println!("\n{:<44} {:<20} {:<8} {:<12}", "Name", "Reason", "Files", "Size (MB)");
    println!("{}", "-".repeat(86));
    for snap in &snapshots {
        println!(
            "{:<44} {:<20} {:<8} {:<12.2}",
            snap.name,
            snap.reason,
            snap.files_backed,
            snap.size_bytes as f64 / (1024.0 * 1024.0)
        );
    }
    println!("\nTotal: {} snapshot(s)", snapshots.len());
    0
}

fn cmd_restore(
    guardian: &mut VitalsGuardian,
    snapshot: Option<String>,
    files: Option<Vec<String>>,
) -> Result<i32> {
    let name = match snapshot {
        Some(name) => name,
        None => match select_snapshot(guardian)? {
            Some(name) => name,
            None => {
                println!("Operation cancelled");
                return Ok(0);
            }
        },
    };

    match guardian.restore_from_backup(&name, files.as_deref()) {
        Ok(report) if report.success() => {
            println!("\n[OK] Restore completed: {} item(s)", report.restored);
            Ok(0)
        }
        Ok(report) => {
            println!("\n[!] Restore completed with {} error(s):", report.errors.len());
            for err in &report.errors {
                println!("   - {err}");
            }
            Ok(1)
        }
        Err(GuardianError::SnapshotNotFound(name)) => {
            eprintln!("\n[ERROR] Snapshot not found: {name}");
            Ok(1)
        }
        Err(e) => Err(e.into()),
    }
}

/// Interactive numbered selection over the ten most recent snapshots.
fn select_snapshot(guardian: &VitalsGuardian) -> Result<Option<String>> {
    let snapshots = guardian.list_snapshots();
    if snapshots.is_empty() {
        println!("\nNo snapshots available to restore");
        return Ok(None);
    }

    println!("\nAvailable snapshots:");
    for (i, snap) in snapshots.iter().take(10).enumerate() {
        println!("  {}. {} ({})", i + 1, snap.name, snap.reason);
    }

    print!("\nSelect a snapshot number (or 'cancel'): ");
    std::io::stdout().flush()?;
    let mut line = String::new();
    std::io::stdin().read_line(&mut line)?;
    let choice = line.trim();

    if matches!(choice.to_ascii_lowercase().as_str(), "cancel" | "c" | "n" | "no" | "") {
        return Ok(None);
    }

    let Ok(index) = choice.parse::<usize>() else {
        println!("Invalid input");
        return Ok(None);
    };
    if index == 0 || index > snapshots.len() {
        println!("Invalid selection");
        return Ok(None);
    }

    let selected = &snapshots[index - 1];
    println!("\nSelected: {}", selected.name);
    if !StdinConfirmer.confirm(
        "Confirm restore? Current files will be replaced.",
        Strictness::Normal,
    ) {
        return Ok(None);
    }

    Ok(Some(selected.name.clone()))
}
