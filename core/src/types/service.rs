use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

/// Name of the scheduler service, run by the leader only.
pub const SCHEDULER_SERVICE: &str = "scheduler";

/// Name of the worker service, run by any node once a scheduler address is known.
pub const WORKER_SERVICE: &str = "worker";

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum StartupPolicy {
    Enabled,
    Disabled,
}

/// A single declared service: what to run and how to start it.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct ServiceDefinition {
    pub name: String,
    pub summary: String,
    pub command: String,
    #[serde(default, skip_serializing_if = "BTreeMap::is_empty")]
    pub environment: BTreeMap<String, String>,
    pub startup: StartupPolicy,
}

impl ServiceDefinition {
    /// Convenience constructor with enabled startup and empty environment.
    pub fn new(name: &str, summary: &str, command: &str) -> ServiceDefinition {
        ServiceDefinition {
            name: name.to_string(),
            summary: summary.to_string(),
            command: command.to_string(),
            environment: BTreeMap::new(),
            startup: StartupPolicy::Enabled,
        }
    }
}

/// The supervisor's declared service set — an explicit mapping from service
/// name to definition. Mutations are expressed as per-name upserts via
/// [`merge`], never as whole-set replacement.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq, Eq)]
pub struct ServiceSet {
    services: BTreeMap<String, ServiceDefinition>,
}

impl ServiceSet {
    pub fn new() -> ServiceSet {
        ServiceSet {
            services: BTreeMap::new(),
        }
    }

    pub fn get(&self, name: &str) -> Option<&ServiceDefinition> {
        self.services.get(name)
    }

    pub fn contains(&self, name: &str) -> bool {
        self.services.contains_key(name)
    }

    pub fn names(&self) -> Vec<String> {
        self.services.keys().cloned().collect()
    }

    pub fn len(&self) -> usize {
        self.services.len()
    }

    pub fn is_empty(&self) -> bool {
        self.services.is_empty()
    }

    /// Insert a definition keyed by its own name, replacing any previous
    /// definition under that name.
    pub fn insert(&mut self, def: ServiceDefinition) {
        self.services.insert(def.name.clone(), def);
    }
}

/// Merge one definition into a declared set: replace by name, leave every
/// other entry untouched. Pure — returns a new set.
pub fn merge(current: &ServiceSet, def: &ServiceDefinition) -> ServiceSet {
    let mut merged = current.clone();
    merged.insert(def.clone());
    merged
}
