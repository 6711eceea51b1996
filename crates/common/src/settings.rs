// VPN Connection Manager - Settings Module
// Persisted user preferences shared between the core and presentation layers

use std::fs;
use std::path::PathBuf;
use std::sync::Mutex;

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use tracing::debug;

/// Persisted preferences
#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct Settings {
    /// Reconnect to the last-used host when the configuration is ready
    #[serde(default)]
    pub autoconnect_enabled: bool,
    /// Attach on-demand rules at the next connect
    #[serde(default)]
    pub kill_switch_enabled: bool,
    /// Host of the latest successful connect
    #[serde(skip_serializing_if = "Option::is_none")]
    pub latest_connected_host: Option<String>,
    /// Account the tunnel authenticates as
    #[serde(default)]
    pub username: String,
    /// Fallback host when no connection has succeeded yet
    #[serde(default)]
    pub default_host: String,
}

/// Get the settings file path
pub fn settings_path() -> Result<PathBuf> {
    let config_dir = dirs::config_dir()
        .ok_or_else(|| anyhow::anyhow!("Could not determine config directory"))?;
    Ok(config_dir.join("vpn-manager").join("settings.toml"))
}

/// File-backed settings store; reads once at open, writes through on mutation
#[derive(Debug)]
pub struct SettingsStore {
    path: PathBuf,
    cached: Mutex<Settings>,
}

impl SettingsStore {
    /// Open the store at the default location
    pub fn open() -> Result<Self> {
        Self::open_at(settings_path()?)
    }

    /// Open the store at an explicit path; a missing file yields defaults
    pub fn open_at(path: PathBuf) -> Result<Self> {
        let settings = if path.exists() {
            let contents = fs::read_to_string(&path)
                .context(format!("Failed to read {}", path.display()))?;
            toml::from_str(&contents).context(format!("Failed to parse {}", path.display()))?
        } else {
            debug!(
                "Settings file does not exist, using defaults: {}",
                path.display()
            );
            Settings::default()
        };

        Ok(Self {
            path,
            cached: Mutex::new(settings),
        })
    }

    /// Current settings snapshot
    pub fn get(&self) -> Settings {
        self.cached.lock().unwrap().clone()
    }

    /// Apply a mutation and persist the result
    pub fn update(&self, apply: impl FnOnce(&mut Settings)) -> Result<()> {
        let mut cached = self.cached.lock().unwrap();
        apply(&mut cached);

        if let Some(parent) = self.path.parent() {
            fs::create_dir_all(parent).context("Failed to create settings directory")?;
        }

        let contents =
            toml::to_string_pretty(&*cached).context("Failed to serialize settings")?;
        fs::write(&self.path, contents)
            .context(format!("Failed to write {}", self.path.display()))?;

        debug!("Saved settings to {}", self.path.display());
        Ok(())
    }
}
