use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};

/// The current settings version. Bump this when the settings format changes.
pub const SETTINGS_VERSION: &str = "0.1.0";

/// Unit configuration, loaded from `settings.yaml`.
///
/// Unknown keys are ignored and missing keys fall back to the defaults
/// below, so older files keep loading across upgrades.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct Settings {
    pub version: String,
    /// Whether workers should share the local build cache.
    pub cache_enabled: bool,
    /// Free-form tag recorded by the config-changed handler.
    pub cluster_tag: String,
    /// Whether this node is the operator-assigned cluster leader.
    pub leader: bool,
    /// Address the leader publishes as the scheduler endpoint.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub bind_address: Option<String>,
    /// Directory of the shared cache volume, if one is provisioned.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub cache_volume: Option<PathBuf>,
    /// Health poll interval in milliseconds.
    pub health_poll_interval: u64,
    /// Health poll attempt budget.
    pub health_poll_attempts: u32,
    /// How long the daemon waits for socket connections per tick (ms).
    pub socket_poll_ms: u64,
}

impl Default for Settings {
    fn default() -> Self {
        default_settings()
    }
}

/// Returns sensible defaults for all settings fields.
pub fn default_settings() -> Settings {
    Settings {
        version: SETTINGS_VERSION.into(),
        cache_enabled: false,
        cluster_tag: String::new(),
        leader: false,
        bind_address: None,
        cache_volume: None,
        health_poll_interval: 1000,
        health_poll_attempts: 10,
        socket_poll_ms: 50,
    }
}

/// Load `Settings` from a YAML file.
pub fn load(path: &Path) -> Result<Settings, String> {
    let content = std::fs::read_to_string(path)
        .map_err(|e| format!("cannot read {}: {}", path.display(), e))?;
    serde_yaml::from_str(&content)
        .map_err(|e| format!("cannot parse {}: {}", path.display(), e))
}

/// Save `Settings` to a YAML file.
pub fn save(path: &Path, settings: &Settings) -> Result<(), String> {
    let content = serde_yaml::to_string(settings)
        .map_err(|e| format!("cannot serialize settings: {}", e))?;
    std::fs::write(path, content)
        .map_err(|e| format!("cannot write {}: {}", path.display(), e))
}
