//! Safe Executor Library
//!
//! Classifies arbitrary shell command strings as destructive or not,
//! estimates their filesystem blast radius against the vital paths, and
//! supervises execution: pre-backup, confirmation gate, post-execution
//! integrity re-check, optional restore.

pub mod analyzer;
pub mod executor;

pub use analyzer::{CommandAnalysis, CommandAnalyzer, RiskLevel, RiskWeights};
pub use executor::{ExecOutcome, ExecOptions, SafeExecutor};
