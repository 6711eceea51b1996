// Configuration structures for VPN Connection Manager

use std::fmt;

use zeroize::Zeroizing;

use crate::error::{Error, Result};
use crate::types::OnDemandRule;

/// Opaque reference to authentication material held by the credential store.
/// The bytes are never inspected here and are wiped on drop.
#[derive(Clone)]
pub struct CredentialRef(Zeroizing<Vec<u8>>);

impl CredentialRef {
    pub fn new(bytes: Vec<u8>) -> Self {
        Self(Zeroizing::new(bytes))
    }

    pub fn as_bytes(&self) -> &[u8] {
        &self.0
    }
}

impl fmt::Debug for CredentialRef {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("CredentialRef(<redacted>)")
    }
}

/// Tunnel configuration built per connect attempt
#[derive(Debug, Clone)]
pub struct ConnectionConfig {
    /// Tunnel endpoint hostname or IP
    pub host: String,
    /// Account the tunnel authenticates as
    pub username: String,
    /// Opaque handle to the authentication material
    pub credential: CredentialRef,
    /// Whether the kill switch preference was set when this config was built
    pub kill_switch_enabled: bool,
}

impl ConnectionConfig {
    /// Validate the configuration before handing it to the provider
    pub fn validate(&self) -> Result<()> {
        if self.host.is_empty() {
            return Err(Error::Config("Host cannot be empty".to_string()));
        }
        if self.username.is_empty() {
            return Err(Error::Config("Username cannot be empty".to_string()));
        }
        Ok(())
    }
}

/// Full desired provider state carried by a configuration save
#[derive(Debug, Clone)]
pub struct ProviderConfig {
    /// Tunnel configuration; `None` keeps whatever the provider last had
    pub connection: Option<ConnectionConfig>,
    pub enabled: bool,
    pub on_demand_enabled: bool,
    pub on_demand_rules: Vec<OnDemandRule>,
}
