//! Guardian facade: wires the registry and the snapshot store together
//! behind the single `VitalsProtector` interface consumed by the guarded
//! executor.

use crate::config::{GuardianConfig, VitalsContext};
use crate::manifest::CheckReport;
use crate::registry::VitalsRegistry;
use crate::snapshot::{RestoreReport, SnapshotInfo, SnapshotStore};
use crate::utils::errors::Result;
use std::path::PathBuf;

/// Protection operations the guarded executor depends on. Exactly one
/// concrete implementation exists: [`VitalsGuardian`].
pub trait VitalsProtector {
    /// Concrete, existing vital paths for this run.
    fn vital_paths(&self) -> &[PathBuf];

    fn create_snapshot(&self, reason: &str) -> Result<SnapshotInfo>;

    fn check_integrity(&self) -> Result<CheckReport>;

    /// Restores may resurrect paths that did not exist at startup, so the
    /// implementation re-expands the vital set afterwards.
    fn restore_from_backup(&mut self, name: &str, files: Option<&[String]>)
        -> Result<RestoreReport>;
}

pub struct VitalsGuardian {
    config: GuardianConfig,
    registry: VitalsRegistry,
    store: SnapshotStore,
}

impl VitalsGuardian {
    /// Load (or seed) the configuration and construct the components over
    /// the given context. Creates the vitals/backup directories if absent.
    pub fn new(ctx: VitalsContext) -> Result<Self> {
        ctx.ensure_dirs()?;
        let config = GuardianConfig::load_or_seed(&ctx);
        let registry = VitalsRegistry::new(ctx.clone(), &config.vitals);
        let store = SnapshotStore::new(ctx, config.max_backups);
        Ok(Self {
            config,
            registry,
            store,
        })
    }

    pub fn config(&self) -> &GuardianConfig {
        &self.config
    }

    pub fn list_snapshots(&self) -> Vec<SnapshotInfo> {
        self.store.list_snapshots()
    }
}

impl VitalsProtector for VitalsGuardian {
    fn vital_paths(&self) -> &[PathBuf] {
        self.registry.vital_paths()
    }

    fn create_snapshot(&self, reason: &str) -> Result<SnapshotInfo> {
        self.store.create_snapshot(self.registry.vital_paths(), reason)
    }

    fn check_integrity(&self) -> Result<CheckReport> {
        self.registry.check_integrity()
    }

    /// Restore from the named snapshot, then rebuild and persist the
    /// manifest so the baseline reflects the restored state.
    fn restore_from_backup(
        &mut self,
        name: &str,
        files: Option<&[String]>,
    ) -> Result<RestoreReport> {
        let report = self
            .store
            .restore(self.registry.vital_paths(), name, files)?;
        self.registry.refresh(&self.config.vitals);
        let manifest = self.registry.build_manifest();
        self.registry.save_manifest(&manifest)?;
        Ok(report)
    }
}
