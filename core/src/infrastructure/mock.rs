//! Mock platform collaborators for testing.
//!
//! Each mock records the calls made against it and serves pre-configured
//! responses, making it easy to write deterministic tests for the
//! reconciliation pipeline without a real workload, peer store, or clock.

use std::cell::RefCell;
use std::collections::HashMap;
use std::path::PathBuf;
use std::time::Duration;

use crate::types::health::ServiceQuery;
use crate::types::service::{merge, ServiceDefinition, ServiceSet};

use super::{Clock, Membership, PeerStore, Platform, StorageMounts, Workload};

/// A test-double workload: in-memory declared set, scripted running-state
/// queries, preset exec responses.
pub struct MockWorkload {
    /// Whether `can_connect` reports reachable.
    pub connected: bool,
    /// Value returned by `search_path`.
    pub path: String,
    /// The declared service set, updated through `merge_service_layer`.
    pub declared: ServiceSet,
    /// Services whose running flag reads true once the scripted queries
    /// (if any) are exhausted.
    pub running: Vec<String>,
    /// Number of `replan` calls.
    pub replan_count: u32,
    /// Scripted per-service query outcomes, consumed front-to-back.
    query_script: RefCell<HashMap<String, Vec<ServiceQuery>>>,
    /// Preset exec responses, consumed in order; defaults to empty Ok.
    exec_responses: RefCell<Vec<Result<String, String>>>,
    /// All argument vectors passed to `exec`, in order.
    pub exec_calls: Vec<Vec<String>>,
}

impl MockWorkload {
    pub fn new() -> MockWorkload {
        MockWorkload {
            connected: true,
            path: "/usr/bin:/bin".into(),
            declared: ServiceSet::new(),
            running: Vec::new(),
            replan_count: 0,
            query_script: RefCell::new(HashMap::new()),
            exec_responses: RefCell::new(Vec::new()),
            exec_calls: Vec::new(),
        }
    }

    /// A workload that reports unreachable.
    pub fn disconnected() -> MockWorkload {
        let mut workload = MockWorkload::new();
        workload.connected = false;
        workload
    }

    /// Mark a service as running (used once the query script is exhausted).
    pub fn set_running(&mut self, name: &str) {
        if !self.running.iter().any(|s| s == name) {
            self.running.push(name.to_string());
        }
    }

    /// Script the next query outcomes for a service, served in order before
    /// falling back to the running set.
    pub fn script_queries(&mut self, name: &str, outcomes: Vec<ServiceQuery>) {
        self.query_script
            .borrow_mut()
            .insert(name.to_string(), outcomes);
    }

    /// Preset exec responses, served in order; exhausted calls return `Ok("")`.
    pub fn set_exec_responses(&mut self, responses: Vec<Result<String, String>>) {
        let mut reversed = responses;
        reversed.reverse();
        *self.exec_responses.borrow_mut() = reversed;
    }
}

impl Default for MockWorkload {
    fn default() -> Self {
        Self::new()
    }
}

impl Workload for MockWorkload {
    fn can_connect(&self) -> bool {
        self.connected
    }

    fn exec(&mut self, argv: &[&str]) -> Result<String, String> {
        self.exec_calls
            .push(argv.iter().map(|s| s.to_string()).collect());
        let mut responses = self.exec_responses.borrow_mut();
        responses.pop().unwrap_or_else(|| Ok(String::new()))
    }

    fn search_path(&self) -> String {
        self.path.clone()
    }

    fn merge_service_layer(&mut self, def: &ServiceDefinition) -> Result<(), String> {
        self.declared = merge(&self.declared, def);
        Ok(())
    }

    fn replan(&mut self) -> Result<(), String> {
        self.replan_count += 1;
        Ok(())
    }

    fn service_running(&self, name: &str) -> ServiceQuery {
        let mut script = self.query_script.borrow_mut();
        if let Some(outcomes) = script.get_mut(name) {
            if !outcomes.is_empty() {
                return outcomes.remove(0);
            }
        }
        if self.running.iter().any(|s| s == name) {
            ServiceQuery::Running
        } else if self.declared.contains(name) {
            ServiceQuery::NotRunning
        } else {
            ServiceQuery::Failed(format!("service not declared: {}", name))
        }
    }

    fn declared_services(&self) -> ServiceSet {
        self.declared.clone()
    }
}

/// In-memory peer store recording every publish.
pub struct MockPeerStore {
    pub address: Option<String>,
    pub published: Vec<String>,
}

impl MockPeerStore {
    pub fn new() -> MockPeerStore {
        MockPeerStore {
            address: None,
            published: Vec::new(),
        }
    }

    pub fn with_address(addr: &str) -> MockPeerStore {
        MockPeerStore {
            address: Some(addr.to_string()),
            published: Vec::new(),
        }
    }
}

impl Default for MockPeerStore {
    fn default() -> Self {
        Self::new()
    }
}

impl PeerStore for MockPeerStore {
    fn scheduler_address(&self) -> Option<String> {
        self.address.clone()
    }

    fn publish_scheduler_address(&mut self, addr: &str) -> Result<(), String> {
        self.address = Some(addr.to_string());
        self.published.push(addr.to_string());
        Ok(())
    }
}

/// Storage mount lookup with a fixed answer.
pub struct MockMounts {
    pub volume: Option<PathBuf>,
}

impl MockMounts {
    pub fn none() -> MockMounts {
        MockMounts { volume: None }
    }

    pub fn at(path: &str) -> MockMounts {
        MockMounts {
            volume: Some(PathBuf::from(path)),
        }
    }
}

impl StorageMounts for MockMounts {
    fn cache_volume(&self) -> Option<PathBuf> {
        self.volume.clone()
    }
}

/// Membership with fixed leadership and bind address.
pub struct MockMembership {
    pub leader: bool,
    pub address: Option<String>,
}

impl MockMembership {
    pub fn leader(addr: &str) -> MockMembership {
        MockMembership {
            leader: true,
            address: Some(addr.to_string()),
        }
    }

    pub fn worker() -> MockMembership {
        MockMembership {
            leader: false,
            address: None,
        }
    }
}

impl Membership for MockMembership {
    fn is_leader(&self) -> bool {
        self.leader
    }

    fn bind_address(&self) -> Option<String> {
        self.address.clone()
    }
}

/// Clock that records requested sleeps instead of blocking.
pub struct MockClock {
    slept: RefCell<Vec<Duration>>,
}

impl MockClock {
    pub fn new() -> MockClock {
        MockClock {
            slept: RefCell::new(Vec::new()),
        }
    }

    /// All sleep durations requested so far, in order.
    pub fn sleeps(&self) -> Vec<Duration> {
        self.slept.borrow().clone()
    }

    /// Total simulated time slept.
    pub fn total_slept(&self) -> Duration {
        self.slept.borrow().iter().sum()
    }
}

impl Default for MockClock {
    fn default() -> Self {
        Self::new()
    }
}

impl Clock for MockClock {
    fn sleep(&self, duration: Duration) {
        self.slept.borrow_mut().push(duration);
    }
}

/// A platform wired entirely from mocks: reachable workload, empty peer
/// store, no cache volume, worker membership, non-blocking clock.
pub fn mock_platform() -> Platform {
    Platform {
        workload: Box::new(MockWorkload::new()),
        peers: Box::new(MockPeerStore::new()),
        mounts: Box::new(MockMounts::none()),
        membership: Box::new(MockMembership::worker()),
        clock: Box::new(MockClock::new()),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn merge_updates_declared_set() {
        let mut mock = MockWorkload::new();
        let def = ServiceDefinition::new("scheduler", "s", "icecc-scheduler -vvv");
        mock.merge_service_layer(&def).unwrap();
        assert!(mock.declared.contains("scheduler"));
    }

    #[test]
    fn query_falls_back_to_running_set() {
        let mut mock = MockWorkload::new();
        let def = ServiceDefinition::new("worker", "w", "iceccd -vvv -s 10.0.0.1");
        mock.merge_service_layer(&def).unwrap();
        assert_eq!(mock.service_running("worker"), ServiceQuery::NotRunning);

        mock.set_running("worker");
        assert_eq!(mock.service_running("worker"), ServiceQuery::Running);
    }

    #[test]
    fn undeclared_query_fails() {
        let mock = MockWorkload::new();
        match mock.service_running("ghost") {
            ServiceQuery::Failed(reason) => assert!(reason.contains("ghost")),
            other => panic!("expected Failed, got {:?}", other),
        }
    }

    #[test]
    fn scripted_queries_served_in_order() {
        let mut mock = MockWorkload::new();
        mock.script_queries(
            "worker",
            vec![
                ServiceQuery::Failed("not declared".into()),
                ServiceQuery::NotRunning,
                ServiceQuery::Running,
            ],
        );
        assert!(matches!(
            mock.service_running("worker"),
            ServiceQuery::Failed(_)
        ));
        assert_eq!(mock.service_running("worker"), ServiceQuery::NotRunning);
        assert_eq!(mock.service_running("worker"), ServiceQuery::Running);
    }

    #[test]
    fn exec_records_argv_and_serves_responses() {
        let mut mock = MockWorkload::new();
        mock.set_exec_responses(vec![Ok("cache hit rate 95%".into()), Err("exit 1".into())]);
        assert_eq!(mock.exec(&["ccache", "-s"]).unwrap(), "cache hit rate 95%");
        assert!(mock.exec(&["apt", "update", "-y"]).is_err());
        assert_eq!(mock.exec_calls.len(), 2);
        assert_eq!(mock.exec_calls[0], vec!["ccache", "-s"]);
    }

    #[test]
    fn peer_store_records_publishes() {
        let mut peers = MockPeerStore::new();
        assert!(peers.scheduler_address().is_none());
        peers.publish_scheduler_address("10.0.0.5").unwrap();
        assert_eq!(peers.scheduler_address().as_deref(), Some("10.0.0.5"));
        assert_eq!(peers.published, vec!["10.0.0.5"]);
    }

    #[test]
    fn clock_accumulates_sleeps() {
        let clock = MockClock::new();
        clock.sleep(Duration::from_millis(500));
        clock.sleep(Duration::from_millis(500));
        assert_eq!(clock.total_slept(), Duration::from_secs(1));
        assert_eq!(clock.sleeps().len(), 2);
    }
}
