//! Local-host implementations of the platform traits.
//!
//! `LocalWorkload` supervises declared services as child processes of the
//! daemon itself, `FilePeerStore` keeps the single peer key in a JSON file,
//! `FsMounts` answers mount lookups from the filesystem, and `SystemClock`
//! sleeps for real. These back `icf daemon run` on a plain host; tests use
//! the mocks instead.

use std::cell::RefCell;
use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::process::{Child, Command, Stdio};
use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::types::health::ServiceQuery;
use crate::types::service::{merge, ServiceDefinition, ServiceSet, StartupPolicy};

use super::{Clock, Membership, PeerStore, StorageMounts, Workload};

/// Supervises the declared service set as local child processes.
///
/// `replan` spawns anything declared-but-not-running via `sh -c`, restarts
/// anything whose declaration changed since it was spawned, and leaves
/// unaffected children alone.
pub struct LocalWorkload {
    declared: ServiceSet,
    children: RefCell<HashMap<String, Child>>,
    /// Command string each child was spawned with, to detect changed
    /// declarations on replan.
    started_with: HashMap<String, String>,
}

impl LocalWorkload {
    pub fn new() -> LocalWorkload {
        LocalWorkload {
            declared: ServiceSet::new(),
            children: RefCell::new(HashMap::new()),
            started_with: HashMap::new(),
        }
    }

    /// Kill every supervised child (best effort). Called on daemon shutdown.
    pub fn stop_all(&mut self) {
        let mut children = self.children.borrow_mut();
        for (_, child) in children.iter_mut() {
            let _ = child.kill();
            let _ = child.wait();
        }
        children.clear();
        self.started_with.clear();
    }

    fn spawn_service(&self, def: &ServiceDefinition) -> Result<Child, String> {
        Command::new("sh")
            .arg("-c")
            .arg(&def.command)
            .envs(def.environment.iter())
            .stdout(Stdio::null())
            .stderr(Stdio::null())
            .spawn()
            .map_err(|e| format!("failed to spawn service {}: {}", def.name, e))
    }
}

impl Default for LocalWorkload {
    fn default() -> Self {
        Self::new()
    }
}

impl Drop for LocalWorkload {
    fn drop(&mut self) {
        self.stop_all();
    }
}

impl Workload for LocalWorkload {
    fn can_connect(&self) -> bool {
        true
    }

    fn exec(&mut self, argv: &[&str]) -> Result<String, String> {
        if argv.is_empty() {
            return Err("empty argument vector".into());
        }
        let output = Command::new(argv[0])
            .args(&argv[1..])
            .output()
            .map_err(|e| format!("failed to execute {}: {}", argv[0], e))?;
        if output.status.success() {
            Ok(String::from_utf8_lossy(&output.stdout).to_string())
        } else {
            Err(String::from_utf8_lossy(&output.stderr).to_string())
        }
    }

    fn search_path(&self) -> String {
        std::env::var("PATH").unwrap_or_default()
    }

    fn merge_service_layer(&mut self, def: &ServiceDefinition) -> Result<(), String> {
        self.declared = merge(&self.declared, def);
        Ok(())
    }

    fn replan(&mut self) -> Result<(), String> {
        let mut children = self.children.borrow_mut();
        for name in self.declared.names() {
            let def = match self.declared.get(&name) {
                Some(d) => d,
                None => continue,
            };
            if def.startup != StartupPolicy::Enabled {
                continue;
            }

            let changed = self
                .started_with
                .get(&name)
                .map(|cmd| cmd != &def.command)
                .unwrap_or(false);
            let alive = match children.get_mut(&name) {
                Some(child) => child.try_wait().map(|s| s.is_none()).unwrap_or(false),
                None => false,
            };

            if alive && !changed {
                continue;
            }
            if let Some(mut old) = children.remove(&name) {
                let _ = old.kill();
                let _ = old.wait();
            }
            let child = self.spawn_service(def)?;
            children.insert(name.clone(), child);
            self.started_with.insert(name, def.command.clone());
        }
        Ok(())
    }

    fn service_running(&self, name: &str) -> ServiceQuery {
        if !self.declared.contains(name) {
            return ServiceQuery::Failed(format!("service not declared: {}", name));
        }
        let mut children = self.children.borrow_mut();
        match children.get_mut(name) {
            Some(child) => match child.try_wait() {
                Ok(None) => ServiceQuery::Running,
                Ok(Some(_)) => ServiceQuery::NotRunning,
                Err(e) => ServiceQuery::Failed(format!("wait failed for {}: {}", name, e)),
            },
            None => ServiceQuery::NotRunning,
        }
    }

    fn declared_services(&self) -> ServiceSet {
        self.declared.clone()
    }
}

#[derive(Debug, Default, Serialize, Deserialize)]
struct PeerData {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    scheduler_address: Option<String>,
}

/// Peer relation store backed by a JSON file.
///
/// On a real cluster this key lives in platform-propagated relation data;
/// the file stands in for it on a single host and is re-read on every query
/// so concurrent writers are picked up.
pub struct FilePeerStore {
    path: PathBuf,
}

impl FilePeerStore {
    pub fn new(path: &Path) -> FilePeerStore {
        FilePeerStore {
            path: path.to_path_buf(),
        }
    }

    fn read(&self) -> PeerData {
        std::fs::read_to_string(&self.path)
            .ok()
            .and_then(|content| serde_json::from_str(&content).ok())
            .unwrap_or_default()
    }
}

impl PeerStore for FilePeerStore {
    fn scheduler_address(&self) -> Option<String> {
        self.read().scheduler_address
    }

    fn publish_scheduler_address(&mut self, addr: &str) -> Result<(), String> {
        let data = PeerData {
            scheduler_address: Some(addr.to_string()),
        };
        let json = serde_json::to_string_pretty(&data)
            .map_err(|e| format!("failed to serialize peer data: {}", e))?;
        std::fs::write(&self.path, json)
            .map_err(|e| format!("cannot write {}: {}", self.path.display(), e))
    }
}

/// Mount lookup that reports the configured cache volume iff the directory
/// actually exists.
pub struct FsMounts {
    volume: Option<PathBuf>,
}

impl FsMounts {
    pub fn new(volume: Option<PathBuf>) -> FsMounts {
        FsMounts { volume }
    }
}

impl StorageMounts for FsMounts {
    fn cache_volume(&self) -> Option<PathBuf> {
        self.volume.as_ref().filter(|p| p.is_dir()).cloned()
    }
}

/// Membership read once from settings. Leadership election is the
/// platform's job; on a plain host it is operator-assigned.
pub struct StaticMembership {
    leader: bool,
    address: Option<String>,
}

impl StaticMembership {
    pub fn new(leader: bool, address: Option<String>) -> StaticMembership {
        StaticMembership { leader, address }
    }
}

impl Membership for StaticMembership {
    fn is_leader(&self) -> bool {
        self.leader
    }

    fn bind_address(&self) -> Option<String> {
        self.address.clone()
    }
}

/// Wall-clock sleep.
pub struct SystemClock;

impl Clock for SystemClock {
    fn sleep(&self, duration: Duration) {
        std::thread::sleep(duration);
    }
}
