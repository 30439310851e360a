//! Guarded execution: pre-backup, confirmation gate, execution, post-check,
//! optional restore.
//!
//! The executor owns no persistent state; it orchestrates the guardian (via
//! the `VitalsProtector` trait) around the literal execution of the command.

use crate::analyzer::{CommandAnalysis, CommandAnalyzer, RiskLevel};
use anyhow::Result;
use std::path::PathBuf;
use tracing::{error, info, warn};
use vitals_guardian::{Confirmation, Strictness, VitalsProtector};

/// Terminal state of one guarded invocation.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ExecOutcome {
    /// The command ran; carries its success flag.
    Completed { success: bool },
    /// Dry run: nothing was executed.
    DryRun,
    /// The user declined the confirmation gate; the command never ran.
    Cancelled,
}

impl ExecOutcome {
    /// Exit code for the CLI: only a successful run (or dry run) is 0.
    pub fn exit_code(&self) -> i32 {
        match self {
            ExecOutcome::Completed { success: true } | ExecOutcome::DryRun => 0,
            _ => 1,
        }
    }
}

#[derive(Debug, Clone, Copy, Default)]
pub struct ExecOptions {
    pub force: bool,
    pub dry_run: bool,
}

pub struct SafeExecutor<G, C> {
    guardian: G,
    confirmer: C,
    analyzer: CommandAnalyzer,
    repo_root: PathBuf,
    auto_backup: bool,
}

impl<G: VitalsProtector, C: Confirmation> SafeExecutor<G, C> {
    pub fn new(
        repo_root: impl Into<PathBuf>,
        guardian: G,
        confirmer: C,
        auto_backup: bool,
        strict: bool,
    ) -> Self {
        let repo_root = repo_root.into();
        let analyzer =
            CommandAnalyzer::new(&repo_root, guardian.vital_paths().to_vec(), strict);
        Self {
            guardian,
            confirmer,
            analyzer,
            repo_root,
            auto_backup,
        }
    }

    /// Run one command through the guard.
    ///
    /// Non-destructive commands run immediately. Destructive ones get the
    /// full treatment: analysis printout, pre-backup when a vital is in the
    /// blast radius, confirmation gate (unless forced), execution, and a
    /// post-hoc integrity re-check with an offered restore. Rollback is
    /// driven solely by that re-check, never by the command's exit status.
    pub fn execute(&mut self, command: &str, opts: ExecOptions) -> Result<ExecOutcome> {
        info!("Analyzing command: {command}");
        let analysis = self.analyzer.analyze(command);

        if !analysis.is_destructive {
            if opts.dry_run {
                println!("[DRY-RUN] Would execute: {command}");
                return Ok(ExecOutcome::DryRun);
            }
            return Ok(ExecOutcome::Completed {
                success: run_shell(command, &self.repo_root),
            });
        }

        print_analysis(&analysis);

        // Back up before asking, so the operator can inspect the snapshot
        // while deciding.
        let mut backup_name = None;
        if self.auto_backup && !opts.dry_run && !analysis.affected_vitals.is_empty() {
            info!("Creating safety snapshot of vital paths");
            let snapshot = self.guardian.create_snapshot("predestructive")?;
            println!("[BACKUP] Created: {}", snapshot.name);
            backup_name = Some(snapshot.name);
        }

        if analysis.requires_confirmation && !opts.force {
            if !self.prompt_confirmation(&analysis, backup_name.as_deref()) {
                info!("Execution cancelled by the operator");
                println!("[CANCELLED] No action taken");
                return Ok(ExecOutcome::Cancelled);
            }
        }

        if opts.dry_run {
            println!("\n[DRY-RUN] Would execute: {command}");
            return Ok(ExecOutcome::DryRun);
        }

        info!("Executing command: {command}");
        let success = run_shell(command, &self.repo_root);
        if success {
            info!("Command completed successfully");
        } else {
            error!("Command reported failure");
        }

        if !analysis.affected_vitals.is_empty() {
            self.post_check(backup_name.as_deref())?;
        }

        Ok(ExecOutcome::Completed { success })
    }

    /// Re-check integrity after a vital-affecting command and offer a
    /// restore from the pre-destructive snapshot when something vital went
    /// missing. The offer is never silent; declining leaves the loss as-is.
    fn post_check(&mut self, backup_name: Option<&str>) -> Result<()> {
        println!("\n[VERIFY] Re-checking vital file integrity...");
        let report = self.guardian.check_integrity()?;
        if report.all_ok {
            println!("[VERIFY] All vital files accounted for");
            return Ok(());
        }

        warn!("{} vital file(s) missing after execution", report.critical_count());
        println!(
            "[!] ALERT: {} vital file(s) missing after the operation",
            report.critical_count()
        );

        let Some(name) = backup_name else {
            println!("    No pre-destructive snapshot is available to restore from");
            return Ok(());
        };

        if self
            .confirmer
            .confirm("Restore from the safety snapshot?", Strictness::Normal)
        {
            let restore = self.guardian.restore_from_backup(name, None)?;
            if restore.success() {
                println!("[OK] Restored {} item(s) from {name}", restore.restored);
            } else {
                println!(
                    "[!] Restore finished with {} error(s); see the log",
                    restore.errors.len()
                );
            }
        }
        Ok(())
    }

    fn prompt_confirmation(&self, analysis: &CommandAnalysis, backup_name: Option<&str>) -> bool {
        println!("\n{}", "-".repeat(60));
        if analysis.risk_level == RiskLevel::Critical {
            println!("[!] CRITICAL: this operation can cause irreversible data loss");
        }
        if let Some(name) = backup_name {
            println!("[INFO] A safety snapshot exists: {name}");
        }

        // Critical risk demands the literal affirmative token
        let strictness = if analysis.risk_level == RiskLevel::Critical {
            Strictness::Explicit
        } else {
            Strictness::Normal
        };
        self.confirmer
            .confirm("Proceed with this destructive operation?", strictness)
    }
}

/// Print the structured analysis so the operator never confirms blind.
fn print_analysis(analysis: &CommandAnalysis) {
    println!("\n{}", "=".repeat(60));
    println!("SECURITY ANALYSIS - DESTRUCTIVE OPERATION DETECTED");
    println!("{}", "=".repeat(60));
    println!("\nCommand: {}", analysis.command);
    println!("Risk level: {}", analysis.risk_level.to_string().to_uppercase());

    if !analysis.reasons.is_empty() {
        println!("\nReasons:");
        for reason in &analysis.reasons {
            println!("  - {reason}");
        }
    }

    if !analysis.affected_vitals.is_empty() {
        println!("\n[!] VITAL PATHS AFFECTED ({}):", analysis.affected_vitals.len());
        for vital in analysis.affected_vitals.iter().take(10) {
            println!("    * {vital}");
        }
        if analysis.affected_vitals.len() > 10 {
            println!("    ... and {} more", analysis.affected_vitals.len() - 10);
        }
    }

    if analysis.estimated_files > 0 {
        println!("\nEstimated files affected: {}", analysis.estimated_files);
    }
    if !analysis.affected_dirs.is_empty() {
        println!("Directories affected: {}", analysis.affected_dirs.len());
    }
}

/// Run the command through the platform shell, blocking until it exits.
fn run_shell(command: &str, cwd: &std::path::Path) -> bool {
    let mut shell = if cfg!(windows) {
        let mut cmd = std::process::Command::new("cmd");
        cmd.arg("/C");
        cmd
    } else {
        let mut cmd = std::process::Command::new("sh");
        cmd.arg("-c");
        cmd
    };

    match shell.arg(command).current_dir(cwd).status() {
        Ok(status) => status.success(),
        Err(e) => {
            error!("Cannot spawn command: {e}");
            false
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::cell::RefCell;
    use std::fs;
    use tempfile::TempDir;
    use vitals_guardian::{GuardianConfig, VitalsContext, VitalsGuardian};

    /// Scripted confirmer: records prompts, replies from a fixed plan.
    struct Scripted {
        answer: bool,
        seen: RefCell<Vec<Strictness>>,
    }

    impl Scripted {
        fn new(answer: bool) -> Self {
            Self {
                answer,
                seen: RefCell::new(Vec::new()),
            }
        }
    }

    impl Confirmation for Scripted {
        fn confirm(&self, _prompt: &str, strictness: Strictness) -> bool {
            self.seen.borrow_mut().push(strictness);
            self.answer
        }
    }

    fn guarded(temp: &TempDir, answer: bool, strict: bool) -> SafeExecutor<VitalsGuardian, Scripted> {
        fs::create_dir_all(temp.path().join("config")).unwrap();
        fs::write(temp.path().join("config/app.json"), b"{}").unwrap();

        let ctx = VitalsContext::new(temp.path());
        ctx.ensure_dirs().unwrap();
        let config = GuardianConfig {
            vitals: vec!["config/".to_string()],
            ..GuardianConfig::default()
        };
        config.save(&ctx.config_path).unwrap();

        let guardian = VitalsGuardian::new(ctx).unwrap();
        SafeExecutor::new(temp.path(), guardian, Scripted::new(answer), true, strict)
    }

    #[test]
    fn test_non_destructive_runs_directly() {
        let temp = TempDir::new().unwrap();
        let mut exec = guarded(&temp, false, false);

        let outcome = exec.execute("true", ExecOptions::default()).unwrap();
        assert_eq!(outcome, ExecOutcome::Completed { success: true });
        // No confirmation was ever requested
        assert!(exec.confirmer.seen.borrow().is_empty());
    }

    #[test]
    fn test_failing_command_surfaces_failure() {
        let temp = TempDir::new().unwrap();
        let mut exec = guarded(&temp, false, false);

        let outcome = exec.execute("false", ExecOptions::default()).unwrap();
        assert_eq!(outcome, ExecOutcome::Completed { success: false });
        assert_eq!(outcome.exit_code(), 1);
    }

    #[test]
    fn test_declined_gate_cancels_without_running() {
        let temp = TempDir::new().unwrap();
        let mut exec = guarded(&temp, false, false);

        let outcome = exec.execute("rm -rf config", ExecOptions::default()).unwrap();
        assert_eq!(outcome, ExecOutcome::Cancelled);
        assert_eq!(outcome.exit_code(), 1);
        // The vital directory is untouched
        assert!(temp.path().join("config/app.json").exists());
    }

    #[test]
    fn test_backup_exists_before_the_gate() {
        let temp = TempDir::new().unwrap();
        let mut exec = guarded(&temp, false, false);

        exec.execute("rm -rf config", ExecOptions::default()).unwrap();

        // Declined, yet the pre-destructive snapshot was already taken
        let reasons: Vec<String> = exec
            .guardian
            .list_snapshots()
            .iter()
            .map(|s| s.reason.clone())
            .collect();
        assert!(reasons.contains(&"predestructive".to_string()));
    }

    #[test]
    fn test_critical_risk_demands_explicit_confirmation() {
        let temp = TempDir::new().unwrap();
        let mut exec = guarded(&temp, false, false);

        exec.execute("rm -rf config", ExecOptions::default()).unwrap();
        assert_eq!(exec.confirmer.seen.borrow().as_slice(), &[Strictness::Explicit]);
    }

    #[test]
    fn test_dry_run_never_executes() {
        let temp = TempDir::new().unwrap();
        let mut exec = guarded(&temp, true, false);

        let opts = ExecOptions {
            dry_run: true,
            ..Default::default()
        };
        let outcome = exec.execute("rm -rf config", opts).unwrap();

        assert_eq!(outcome, ExecOutcome::DryRun);
        assert_eq!(outcome.exit_code(), 0);
        assert!(temp.path().join("config/app.json").exists());
        // Dry runs never snapshot
        assert!(exec.guardian.list_snapshots().is_empty());
    }

    #[test]
    fn test_confirmed_destruction_offers_restore_and_recovers() {
        let temp = TempDir::new().unwrap();
        // Answer yes to both the gate and the restore offer
        let mut exec = guarded(&temp, true, false);
        // Seed the baseline so the post-check has something to compare
        exec.guardian.check_integrity().unwrap();

        let outcome = exec.execute("rm -rf config", ExecOptions::default()).unwrap();
        assert_eq!(outcome, ExecOutcome::Completed { success: true });

        // The command deleted the vital dir; the post-check restored it
        assert!(temp.path().join("config/app.json").exists());
    }

    #[test]
    fn test_force_skips_the_gate() {
        let temp = TempDir::new().unwrap();
        // Confirmer would decline, but force bypasses it; it still answers
        // the post-check restore offer.
        let mut exec = guarded(&temp, false, false);
        exec.guardian.check_integrity().unwrap();

        let opts = ExecOptions {
            force: true,
            ..Default::default()
        };
        let outcome = exec.execute("rm -rf config", opts).unwrap();

        assert_eq!(outcome, ExecOutcome::Completed { success: true });
        // Gate was skipped; only the restore offer reached the confirmer,
        // and it declined, so the loss stands.
        assert!(!temp.path().join("config/app.json").exists());
        assert_eq!(exec.confirmer.seen.borrow().as_slice(), &[Strictness::Normal]);
    }
}
