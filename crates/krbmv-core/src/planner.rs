//! Choosing the write target.
//!
//! | destination principal | force | type       | write target            |
//! |-----------------------|-------|------------|-------------------------|
//! | none                  | any   | any        | destination             |
//! | present               | yes   | any        | destination             |
//! | present               | no    | FILE       | abort (unsafe overwrite) |
//! | present               | no    | other      | new unique cache        |

use krbmv_ccache::{CacheStore, CredentialCache};
use krbmv_types::{CacheType, Principal};
use tracing::{debug, info};

use crate::error::{MigrateError, MigrateResult};
use crate::resolver;

/// The single cache a run writes into.
#[derive(Debug)]
pub enum WritePlan<C> {
    /// Write into the destination itself.
    Direct(C),
    /// The destination holds `existing`; write into a new cache allocated
    /// alongside it instead.
    Forked { target: C, existing: Principal },
}

impl<C> WritePlan<C> {
    pub fn into_target(self) -> C {
        match self {
            WritePlan::Direct(target) | WritePlan::Forked { target, .. } => target,
        }
    }

    pub fn is_forked(&self) -> bool {
        matches!(self, WritePlan::Forked { .. })
    }
}

/// Decide where the credentials of this run go.
///
/// An empty destination is the normal case, not an error. A destination
/// whose principal cannot be read at all is a resolution failure.
pub fn plan<S: CacheStore>(
    store: &mut S,
    destination: S::Cache,
    force: bool,
) -> MigrateResult<WritePlan<S::Cache>> {
    let existing = destination
        .principal()
        .map_err(|source| MigrateError::CacheResolution {
            name: destination.name().to_string_lossy(),
            source,
        })?;

    let Some(existing) = existing else {
        debug!(cache = %destination.name(), "no existing principal found");
        return Ok(WritePlan::Direct(destination));
    };
    info!(cache = %destination.name(), principal = %existing, "existing target cache principal");

    if force {
        info!(cache = %destination.name(), "force set, writing into target cache directly");
        return Ok(WritePlan::Direct(destination));
    }

    if destination.cache_type() == CacheType::File {
        return Err(MigrateError::UnsafeOverwrite {
            name: destination.name().to_string_lossy(),
            principal: existing.to_string(),
        });
    }

    info!(
        cache = %destination.name(),
        cache_type = %destination.cache_type(),
        principal = %existing,
        "principal found in existing cache, appending a new cache to the collection"
    );
    store.set_default_name(destination.name().clone());
    let target = resolver::new_unique(store, destination.cache_type())?;
    debug!(name = %target.name(), cache_type = %target.cache_type(), "generated new cache");

    Ok(WritePlan::Forked { target, existing })
}
