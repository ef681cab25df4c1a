//! Cluster snapshot — a point-in-time view of everything the planner needs.
//!
//! Built once per lifecycle event from the platform collaborators and
//! discarded after use. Connectivity failure is data, not an error: an
//! unreachable workload yields `connected = false` with every other field at
//! its default, and downstream stages skip without mutating service state.

use std::path::PathBuf;

use crate::data::settings::Settings;
use crate::infrastructure::Platform;

/// Immutable input to the topology planner.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ClusterSnapshot {
    /// Whether the workload process is reachable.
    pub connected: bool,
    /// Whether this node currently holds cluster leadership.
    pub is_leader: bool,
    /// The scheduler address, once a leader has published it. Always read
    /// from the peer store, never computed locally by a peer.
    pub scheduler_address: Option<String>,
    /// The cache volume path, present only if one is mounted.
    pub storage_location: Option<PathBuf>,
    /// The workload's executable search path, needed to splice in the
    /// cache-bin directory.
    pub search_path: String,
    /// Whether configuration requests cache augmentation.
    pub cache_requested: bool,
}

impl ClusterSnapshot {
    /// The snapshot for an unreachable workload: everything at default.
    pub fn disconnected() -> ClusterSnapshot {
        ClusterSnapshot {
            connected: false,
            is_leader: false,
            scheduler_address: None,
            storage_location: None,
            search_path: String::new(),
            cache_requested: false,
        }
    }
}

/// Gather a snapshot from the platform. Never fails: an unreachable
/// workload produces the disconnected snapshot.
pub fn build(platform: &Platform, settings: &Settings) -> ClusterSnapshot {
    if !platform.workload.can_connect() {
        return ClusterSnapshot::disconnected();
    }
    ClusterSnapshot {
        connected: true,
        is_leader: platform.membership.is_leader(),
        scheduler_address: platform.peers.scheduler_address(),
        storage_location: platform.mounts.cache_volume(),
        search_path: platform.workload.search_path(),
        cache_requested: settings.cache_enabled,
    }
}
