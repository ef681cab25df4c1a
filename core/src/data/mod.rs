//! Persistent unit data: settings plus the versioned state store.

pub mod settings;
pub mod store;

use std::path::{Path, PathBuf};

pub use settings::Settings;
pub use store::StateStore;

/// Central data root owning all persistent icefleet state.
pub struct Data {
    settings: Settings,
    store: StateStore,
    config_dir: PathBuf,
}

impl Data {
    /// Create a new Data instance rooted at `config_dir`.
    ///
    /// First use creates the directory and writes default settings; later
    /// uses load what is there, stamping the settings version on upgrades.
    /// Existing files are never overwritten beyond the version stamp.
    pub fn new(config_dir: &Path) -> Result<Data, String> {
        ensure_installed(config_dir)?;

        let settings = settings::load(&config_dir.join("settings.yaml"))?;
        let store = StateStore::open(&config_dir.join("state.json"))?;

        Ok(Data {
            settings,
            store,
            config_dir: config_dir.to_path_buf(),
        })
    }

    pub fn settings(&self) -> &Settings {
        &self.settings
    }

    pub fn store(&self) -> &StateStore {
        &self.store
    }

    pub fn store_mut(&mut self) -> &mut StateStore {
        &mut self.store
    }

    pub fn config_dir(&self) -> &Path {
        &self.config_dir
    }
}

/// Create the config directory and default settings on first use; stamp the
/// settings version when loading a file from an older release.
fn ensure_installed(config_dir: &Path) -> Result<(), String> {
    std::fs::create_dir_all(config_dir)
        .map_err(|e| format!("cannot create {}: {}", config_dir.display(), e))?;

    let settings_path = config_dir.join("settings.yaml");
    if !settings_path.exists() {
        settings::save(&settings_path, &settings::default_settings())?;
        return Ok(());
    }

    let mut loaded = settings::load(&settings_path)?;
    if loaded.version != settings::SETTINGS_VERSION {
        loaded.version = settings::SETTINGS_VERSION.to_string();
        settings::save(&settings_path, &loaded)?;
    }
    Ok(())
}
