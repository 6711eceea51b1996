// Error types for VPN Connection Manager

use thiserror::Error;

#[derive(Error, Debug)]
pub enum Error {
    #[error("Configuration error: {0}")]
    Config(String),

    #[error("Configuration load failed: {0}")]
    ConfigurationLoad(String),

    #[error("Configuration save failed: {0}")]
    ConfigurationSave(String),

    #[error("Tunnel start failed: {0}")]
    TunnelStart(String),

    #[error("Credential store error: {0}")]
    Credential(String),

    #[error("Settings error: {0}")]
    Settings(String),
}

pub type Result<T> = std::result::Result<T, Error>;
