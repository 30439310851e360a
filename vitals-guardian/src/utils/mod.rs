//! Utility modules for the vitals guardian.

pub mod errors;
pub mod logger;

pub use errors::GuardianError;
