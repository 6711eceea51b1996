// Trait seams to the external tunnel provider, credential store, and settings

use async_trait::async_trait;
use tokio::sync::broadcast;

use vpn_manager_common::{ConnectionState, CredentialRef, ProviderConfig, Result, SettingsStore};

/// External subsystem that owns the actual secure tunnel and reports
/// connection status asynchronously. The controller never performs
/// cryptography or network I/O itself; everything goes through this seam.
#[async_trait]
pub trait TunnelProvider: Send + Sync {
    /// Re-read the provider's persisted configuration
    async fn load_configuration(&self) -> Result<()>;

    /// Persist the desired provider state
    async fn save_configuration(&self, config: ProviderConfig) -> Result<()>;

    /// Start the tunnel using the last saved configuration
    async fn start_tunnel(&self) -> Result<()>;

    /// Stop the tunnel (best effort)
    async fn stop_tunnel(&self);

    /// Server address of the currently loaded configuration, if any
    fn server_address(&self) -> Option<String>;

    fn is_enabled(&self) -> bool;

    fn is_on_demand_enabled(&self) -> bool;

    /// Subscribe to asynchronous status-change notifications
    fn subscribe_status(&self) -> broadcast::Receiver<ConnectionState>;
}

/// Secure storage returning an opaque reference to authentication material.
/// The reference is handed to the provider as-is, never decrypted here.
pub trait CredentialStore: Send + Sync {
    fn credential_reference(&self) -> Result<CredentialRef>;
}

/// Persisted preferences consumed by the controller
pub trait SettingsProvider: Send + Sync {
    fn username(&self) -> String;

    fn autoconnect_enabled(&self) -> bool;

    fn kill_switch_enabled(&self) -> bool;

    fn latest_connected_host(&self) -> Option<String>;

    /// Fallback host when no connection has succeeded yet
    fn default_host(&self) -> String;

    /// Record the host of the latest successful connect
    fn set_latest_connected_host(&self, host: &str) -> anyhow::Result<()>;
}

impl SettingsProvider for SettingsStore {
    fn username(&self) -> String {
        self.get().username
    }

    fn autoconnect_enabled(&self) -> bool {
        self.get().autoconnect_enabled
    }

    fn kill_switch_enabled(&self) -> bool {
        self.get().kill_switch_enabled
    }

    fn latest_connected_host(&self) -> Option<String> {
        self.get().latest_connected_host
    }

    fn default_host(&self) -> String {
        self.get().default_host
    }

    fn set_latest_connected_host(&self, host: &str) -> anyhow::Result<()> {
        self.update(|s| s.latest_connected_host = Some(host.to_string()))
    }
}
