// Thin adapter over the tunnel provider's configuration load/save

use std::sync::Arc;

use vpn_manager_common::{Error, ProviderConfig, Result};

use crate::provider::TunnelProvider;

/// Wraps provider configuration I/O, mapping failures to the configuration
/// error kinds the controller reports
#[derive(Clone)]
pub struct ConfigurationStore {
    provider: Arc<dyn TunnelProvider>,
}

impl ConfigurationStore {
    pub fn new(provider: Arc<dyn TunnelProvider>) -> Self {
        Self { provider }
    }

    pub async fn load(&self) -> Result<()> {
        self.provider
            .load_configuration()
            .await
            .map_err(|e| Error::ConfigurationLoad(e.to_string()))
    }

    pub async fn save(&self, config: ProviderConfig) -> Result<()> {
        self.provider
            .save_configuration(config)
            .await
            .map_err(|e| Error::ConfigurationSave(e.to_string()))
    }
}
