//! The migration driver.

use krbmv_ccache::{CacheStore, CredentialCache};
use krbmv_types::CacheType;
use serde::Serialize;
use tracing::{info, warn};

use crate::config::MigrateConfig;
use crate::copier;
use crate::error::{MigrateError, MigrateResult};
use crate::planner::{self, WritePlan};
use crate::resolver;

/// Outcome of a successful run.
#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
pub struct MigrationReport {
    /// Source cache name as resolved.
    pub source: String,
    /// Destination cache name as resolved.
    pub target: String,
    /// The cache the credentials were written into.
    pub write_target: String,
    pub target_type: CacheType,
    /// `true` when a new cache was allocated next to an occupied destination.
    pub forked: bool,
    /// Principal the destination held before the run, if any.
    pub existing_principal: Option<String>,
    /// Number of credentials stored into the write target.
    pub copied: usize,
    /// Source credentials the write target already held.
    pub already_present: usize,
}

/// Run one migration: resolve both caches, pick the write target, copy.
///
/// The store's default name is changed only when a fork into a collection
/// is needed.
pub fn migrate<S: CacheStore>(
    store: &mut S,
    config: &MigrateConfig,
) -> MigrateResult<MigrationReport> {
    let target_name = config.target_name()?.clone();
    let source_name = match &config.source {
        Some(name) => name.clone(),
        None => resolver::default_name(store),
    };
    info!(source = %source_name, "source credential cache");
    info!(cache = %target_name, "target credential cache");

    let source = resolver::resolve(store, &source_name)?;
    let destination = resolver::resolve(store, &target_name)?;
    info!(cache_type = %destination.cache_type(), "target cache type");

    match source.principal() {
        Ok(Some(principal)) => info!(%principal, "source cache principal"),
        Ok(None) => warn!(source = %source.name(), "source cache has no principal"),
        Err(e) => {
            return Err(MigrateError::CacheResolution {
                name: source.name().to_string_lossy(),
                source: e,
            })
        }
    }

    // Opened before planning so an unreadable source never leaves a new
    // cache behind in the destination collection.
    let records = copier::open_source(&source)?;

    let source_label = source.name().to_string_lossy();
    let target_label = destination.name().to_string_lossy();
    let target_type = destination.cache_type();

    let plan = planner::plan(store, destination, config.force)?;
    let forked = plan.is_forked();
    let existing_principal = match &plan {
        WritePlan::Forked { existing, .. } => Some(existing.to_string()),
        WritePlan::Direct(_) => None,
    };
    let write_target = plan.into_target();
    if forked {
        info!(cache = %write_target.name(), "writing into new cache");
    }

    let stats = copier::copy_records(records, &write_target)?;
    info!(
        copied = stats.copied,
        already_present = stats.already_present,
        cache = %write_target.name(),
        "migration complete"
    );

    Ok(MigrationReport {
        source: source_label,
        target: target_label,
        write_target: write_target.name().to_string_lossy(),
        target_type,
        forked,
        existing_principal,
        copied: stats.copied,
        already_present: stats.already_present,
    })
}
