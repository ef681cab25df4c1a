//! Persisted unit state — an explicit, versioned key-value store.
//!
//! State that must survive across lifecycle events lives here, keyed under
//! stable identifiers in a JSON file. Missing keys initialize to their
//! documented defaults on first access; nothing sets defaults implicitly
//! from handler code.

use std::collections::BTreeMap;
use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};

/// The current store format version. Bump on incompatible layout changes.
pub const STORE_VERSION: u32 = 1;

/// Stable storage identifier for the observed-tags list.
///
/// Default when absent: empty list.
const OBSERVED_TAGS_KEY: &str = "observed_tags";

#[derive(Debug, Serialize, Deserialize)]
struct StoreFile {
    version: u32,
    #[serde(default)]
    values: BTreeMap<String, serde_json::Value>,
}

impl Default for StoreFile {
    fn default() -> Self {
        StoreFile {
            version: STORE_VERSION,
            values: BTreeMap::new(),
        }
    }
}

/// Versioned key-value store persisted as JSON, passed explicitly into each
/// reconciliation call that needs it.
pub struct StateStore {
    path: PathBuf,
    file: StoreFile,
}

impl StateStore {
    /// Open the store at the given path, starting empty if the file does
    /// not exist yet.
    pub fn open(path: &Path) -> Result<StateStore, String> {
        let file = if path.exists() {
            let content = std::fs::read_to_string(path)
                .map_err(|e| format!("cannot read {}: {}", path.display(), e))?;
            serde_json::from_str(&content)
                .map_err(|e| format!("cannot parse {}: {}", path.display(), e))?
        } else {
            StoreFile::default()
        };
        Ok(StateStore {
            path: path.to_path_buf(),
            file,
        })
    }

    pub fn version(&self) -> u32 {
        self.file.version
    }

    fn save(&self) -> Result<(), String> {
        let content = serde_json::to_string_pretty(&self.file)
            .map_err(|e| format!("cannot serialize state: {}", e))?;
        std::fs::write(&self.path, content)
            .map_err(|e| format!("cannot write {}: {}", self.path.display(), e))
    }

    /// The observed configuration values, in first-seen order.
    pub fn observed_tags(&self) -> Vec<String> {
        match self.file.values.get(OBSERVED_TAGS_KEY) {
            Some(value) => serde_json::from_value(value.clone()).unwrap_or_default(),
            None => Vec::new(),
        }
    }

    /// Append a newly observed value unless it is already present.
    /// Returns true when the value was appended (and persisted).
    pub fn record_tag(&mut self, value: &str) -> Result<bool, String> {
        let mut tags = self.observed_tags();
        if tags.iter().any(|t| t == value) {
            return Ok(false);
        }
        tags.push(value.to_string());
        self.file.values.insert(
            OBSERVED_TAGS_KEY.to_string(),
            serde_json::to_value(tags).map_err(|e| format!("cannot encode tags: {}", e))?,
        );
        self.save()?;
        Ok(true)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn test_store(suffix: &str) -> (PathBuf, StateStore) {
        let dir = std::env::temp_dir().join(format!(
            "icf-store-test-{}-{}",
            suffix,
            std::process::id()
        ));
        let _ = std::fs::remove_dir_all(&dir);
        std::fs::create_dir_all(&dir).unwrap();
        let path = dir.join("state.json");
        let store = StateStore::open(&path).unwrap();
        (dir, store)
    }

    #[test]
    fn missing_file_starts_empty_at_current_version() {
        let (dir, store) = test_store("empty");
        assert_eq!(store.version(), STORE_VERSION);
        assert!(store.observed_tags().is_empty());
        let _ = std::fs::remove_dir_all(&dir);
    }

    #[test]
    fn record_appends_in_order() {
        let (dir, mut store) = test_store("order");
        assert!(store.record_tag("alpha").unwrap());
        assert!(store.record_tag("beta").unwrap());
        assert_eq!(store.observed_tags(), vec!["alpha", "beta"]);
        let _ = std::fs::remove_dir_all(&dir);
    }

    #[test]
    fn duplicates_are_suppressed() {
        let (dir, mut store) = test_store("dedup");
        assert!(store.record_tag("alpha").unwrap());
        assert!(!store.record_tag("alpha").unwrap());
        assert_eq!(store.observed_tags().len(), 1);
        let _ = std::fs::remove_dir_all(&dir);
    }

    #[test]
    fn tags_survive_reopen() {
        let (dir, mut store) = test_store("reopen");
        store.record_tag("alpha").unwrap();
        store.record_tag("beta").unwrap();
        let path = dir.join("state.json");

        let reopened = StateStore::open(&path).unwrap();
        assert_eq!(reopened.observed_tags(), vec!["alpha", "beta"]);
        assert_eq!(reopened.version(), STORE_VERSION);
        let _ = std::fs::remove_dir_all(&dir);
    }

    #[test]
    fn corrupt_file_is_an_error() {
        let (dir, _) = test_store("corrupt");
        let path = dir.join("state.json");
        std::fs::write(&path, "not json").unwrap();
        assert!(StateStore::open(&path).is_err());
        let _ = std::fs::remove_dir_all(&dir);
    }
}
