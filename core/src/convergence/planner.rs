//! Topology planner — maps a cluster snapshot to a desired service.
//!
//! The planner is a pure function: it takes an immutable snapshot and
//! returns the service this node should run, or `None` when nothing is due
//! for change. It never contacts the network or the supervisor.

use crate::types::service::{
    ServiceDefinition, StartupPolicy, SCHEDULER_SERVICE, WORKER_SERVICE,
};

use super::snapshot::ClusterSnapshot;

/// Directory holding the cache wrapper executables, spliced ahead of the
/// workload's search path when cache augmentation is on.
pub const CACHE_BIN_DIR: &str = "/usr/lib/ccache";

/// Compute the desired service for this node.
///
/// Rules, evaluated in order:
/// 1. Unreachable workload: no plan.
/// 2. Leader: always the scheduler service, independent of cache settings.
/// 3. Worker: the worker service only once a scheduler address is known.
/// 4. Worker cache augmentation: environment set iff a cache volume is
///    mounted AND configuration requests it.
pub fn plan(snapshot: &ClusterSnapshot) -> Option<ServiceDefinition> {
    if !snapshot.connected {
        return None;
    }

    if snapshot.is_leader {
        return Some(ServiceDefinition {
            name: SCHEDULER_SERVICE.into(),
            summary: "icecream scheduler service".into(),
            command: "icecc-scheduler -vvv".into(),
            environment: Default::default(),
            startup: StartupPolicy::Enabled,
        });
    }

    let scheduler_addr = snapshot.scheduler_address.as_deref()?;

    let mut def = ServiceDefinition {
        name: WORKER_SERVICE.into(),
        summary: "icecream worker service".into(),
        command: format!("iceccd -vvv -s {}", scheduler_addr),
        environment: Default::default(),
        startup: StartupPolicy::Enabled,
    };

    if snapshot.cache_requested {
        if let Some(storage) = &snapshot.storage_location {
            def.environment
                .insert("CACHE_PREFIX".into(), "icecc".into());
            def.environment
                .insert("CACHE_DIR".into(), storage.display().to_string());
            def.environment.insert(
                "PATH".into(),
                format!("{}:{}", CACHE_BIN_DIR, snapshot.search_path),
            );
        }
    }

    Some(def)
}
