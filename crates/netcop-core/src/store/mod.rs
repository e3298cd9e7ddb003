// ── Policy store ──
//
// Read-only access to policies, their targets and the traffic classes they
// reference. Reads are blocking and never retried here; a failed read
// aborts the current dispatch cycle and the watch loop tries again on its
// next tick.

mod memory;

use std::path::Path;

use chrono::NaiveDateTime;
use tracing::debug;

pub use memory::MemoryStore;

use crate::convert;
use crate::error::CoreError;
use crate::model::{EntityId, Policy, Target, TrafficClass};
use crate::params::{self, ParameterBag};
use crate::schedule;

/// Data access seam consumed by the dispatcher.
pub trait PolicyStore {
    /// Every policy, in listing order.
    fn policies(&self) -> Result<Vec<Policy>, CoreError>;

    /// Targets of one policy, in listing order.
    fn targets(&self, policy_id: EntityId) -> Result<Vec<Target>, CoreError>;

    /// A traffic class with its subnet and port associations.
    fn traffic_class(&self, class_id: EntityId) -> Result<TrafficClass, CoreError>;

    fn policy(&self, policy_id: EntityId) -> Result<Policy, CoreError> {
        self.policies()?
            .into_iter()
            .find(|p| p.id == policy_id)
            .ok_or_else(|| CoreError::not_found("policy", policy_id))
    }

    /// True when any policy carries at least one time window.
    fn has_time_windows(&self) -> Result<bool, CoreError> {
        Ok(self.policies()?.iter().any(Policy::has_windows))
    }
}

/// Policies in effect at `at`, in listing order.
pub fn active_policies<S>(store: &S, at: NaiveDateTime) -> Result<Vec<Policy>, CoreError>
where
    S: PolicyStore + ?Sized,
{
    let active: Vec<Policy> = store
        .policies()?
        .into_iter()
        .filter(|p| schedule::is_active(p, at))
        .collect();
    debug!(%at, active = active.len(), "evaluated schedules");
    Ok(active)
}

/// Collect the parameter bag of one policy from its targets.
pub fn parameter_bag<S>(store: &S, policy_id: EntityId) -> Result<ParameterBag, CoreError>
where
    S: PolicyStore + ?Sized,
{
    let targets = store.targets(policy_id)?;
    params::collect(&targets, |class_id| store.traffic_class(*class_id))
}

/// Read a catalog file and convert it into an in-memory store.
///
/// Any read or parse failure surfaces as `CoreError::StoreUnavailable`;
/// malformed rows only drop the policies they belong to.
pub fn load_catalog(path: impl AsRef<Path>) -> Result<MemoryStore, CoreError> {
    let catalog = netcop_catalog::Catalog::from_path(path)?;
    Ok(convert::into_store(&catalog))
}
