//! Infrastructure seams for the platform collaborators.
//!
//! Provides the traits the reconciliation core depends on — the workload
//! (exec + service supervisor), the peer relation key-value store, storage
//! mount lookup, cluster membership, and a clock — plus implementations for
//! the local host (production) and mocks (testing). The core never talks to
//! a process, file, or network endpoint except through these traits.

pub mod local;
pub mod mock;

use std::path::PathBuf;
use std::time::Duration;

use crate::types::health::ServiceQuery;
use crate::types::service::{ServiceDefinition, ServiceSet};

/// The workload container: command execution plus the service supervisor.
///
/// The declared service set is owned by the supervisor; mutations are
/// expressed as per-name upserts (`merge_service_layer`), never as whole-set
/// replacement, so sequential reconciliations from different roles cannot
/// race on unrelated entries.
pub trait Workload: Send {
    /// Whether the workload process is currently reachable.
    fn can_connect(&self) -> bool;

    /// Run an argument vector to completion. Returns captured stdout on
    /// success, an error description otherwise.
    fn exec(&mut self, argv: &[&str]) -> Result<String, String>;

    /// The workload's executable search path (its `PATH`).
    fn search_path(&self) -> String;

    /// Merge one service definition into the declared set, replacing any
    /// previous definition with the same name and leaving every other entry
    /// untouched.
    fn merge_service_layer(&mut self, def: &ServiceDefinition) -> Result<(), String>;

    /// Converge running processes to the full declared set: start anything
    /// declared-but-not-running, restart anything whose declaration changed,
    /// leave unaffected services running.
    fn replan(&mut self) -> Result<(), String>;

    /// Query the running flag of a named service. Failure (e.g. the service
    /// is not declared yet) is a typed outcome, not an error.
    fn service_running(&self, name: &str) -> ServiceQuery;

    /// The current declared service set.
    fn declared_services(&self) -> ServiceSet;
}

/// The peer relation key-value store, scoped to the application.
///
/// Holds a single key — the scheduler address. Written only by the leader,
/// read by all peers; propagation between nodes is the platform's job.
pub trait PeerStore: Send {
    fn scheduler_address(&self) -> Option<String>;

    fn publish_scheduler_address(&mut self, addr: &str) -> Result<(), String>;
}

/// Storage mount lookup for the shared build-cache volume.
pub trait StorageMounts: Send {
    /// The filesystem path of the cache volume, if one is mounted.
    fn cache_volume(&self) -> Option<PathBuf>;
}

/// Cluster membership as reported by the surrounding platform. Leadership
/// and address assignment are trusted inputs, never computed here.
pub trait Membership: Send {
    fn is_leader(&self) -> bool;

    /// This node's bind address, used by the leader to publish the
    /// scheduler endpoint.
    fn bind_address(&self) -> Option<String>;
}

/// Injectable sleep dependency so the health verifier's retry loop can be
/// tested without wall-clock delays.
pub trait Clock: Send {
    fn sleep(&self, duration: Duration);
}

/// Everything the reconciliation pipeline needs from the outside world,
/// bundled so `Sys` can hold one value.
pub struct Platform {
    pub workload: Box<dyn Workload>,
    pub peers: Box<dyn PeerStore>,
    pub mounts: Box<dyn StorageMounts>,
    pub membership: Box<dyn Membership>,
    pub clock: Box<dyn Clock>,
}

#[cfg(test)]
mod tests {
    use super::mock::MockWorkload;
    use super::*;

    #[test]
    fn mock_implements_workload() {
        let workload = MockWorkload::new();
        // Ensure the trait object can be constructed.
        let _: &dyn Workload = &workload;
    }
}
