//! Guarded execution scenarios against a throwaway repository.

use safe_exec::{CommandAnalyzer, ExecOptions, ExecOutcome, RiskLevel, SafeExecutor};
use std::fs;
use tempfile::TempDir;
use vitals_guardian::{
    Confirmation, GuardianConfig, Strictness, VitalsContext, VitalsGuardian, VitalsProtector,
};

struct AlwaysAnswer(bool);

impl Confirmation for AlwaysAnswer {
    fn confirm(&self, _prompt: &str, _strictness: Strictness) -> bool {
        self.0
    }
}

fn setup(temp: &TempDir) -> VitalsGuardian {
    fs::create_dir_all(temp.path().join("data")).unwrap();
    fs::write(temp.path().join("data/records.csv"), b"a,b\n1,2\n").unwrap();
    fs::write(temp.path().join("scratch.tmp"), b"scratch").unwrap();

    let ctx = VitalsContext::new(temp.path());
    ctx.ensure_dirs().unwrap();
    GuardianConfig {
        vitals: vec!["data/".to_string()],
        ..GuardianConfig::default()
    }
    .save(&ctx.config_path)
    .unwrap();

    VitalsGuardian::new(ctx).unwrap()
}

#[test]
fn rm_rf_dot_classifies_critical_with_explicit_gate() {
    let temp = TempDir::new().unwrap();
    let guardian = setup(&temp);

    let analyzer = CommandAnalyzer::new(temp.path(), guardian.vital_paths().to_vec(), false);
    let analysis = analyzer.analyze("rm -rf .");

    assert!(analysis.is_destructive);
    assert_eq!(analysis.risk_level, RiskLevel::Critical);
    assert!(analysis.requires_confirmation);
    // The current directory contains the vital `data/` dir
    assert!(!analysis.affected_vitals.is_empty());
}

#[test]
fn deleting_non_vital_scratch_runs_without_gate() {
    let temp = TempDir::new().unwrap();
    let guardian = setup(&temp);

    // Declining confirmer proves no gate was consulted
    let mut exec = SafeExecutor::new(temp.path(), guardian, AlwaysAnswer(false), true, false);
    let outcome = exec.execute("rm -f scratch.tmp", ExecOptions::default()).unwrap();

    assert_eq!(outcome, ExecOutcome::Completed { success: true });
    assert!(!temp.path().join("scratch.tmp").exists());
    assert!(temp.path().join("data/records.csv").exists());
}

#[test]
fn vital_loss_is_recovered_from_the_predestructive_snapshot() {
    let temp = TempDir::new().unwrap();
    let guardian = setup(&temp);
    guardian.check_integrity().unwrap();

    let mut exec = SafeExecutor::new(temp.path(), guardian, AlwaysAnswer(true), true, false);
    let outcome = exec.execute("rm -rf data", ExecOptions::default()).unwrap();

    assert_eq!(outcome, ExecOutcome::Completed { success: true });
    // The post-execution check noticed the loss and the accepted offer
    // brought the snapshot back
    assert_eq!(
        fs::read(temp.path().join("data/records.csv")).unwrap(),
        b"a,b\n1,2\n"
    );
}

#[test]
fn no_backup_mode_still_gates_but_never_snapshots() {
    let temp = TempDir::new().unwrap();
    let guardian = setup(&temp);

    let mut exec = SafeExecutor::new(temp.path(), guardian, AlwaysAnswer(false), false, false);
    let outcome = exec.execute("rm -rf data", ExecOptions::default()).unwrap();

    assert_eq!(outcome, ExecOutcome::Cancelled);
    assert!(temp.path().join("data/records.csv").exists());
}
