// SPDX-License-Identifier: Apache-2.0
// Copyright 2025 VPN Manager Contributors

// VPN Connection Manager - Common Library
// Shared types, errors, and persisted settings

pub mod config;
pub mod error;
pub mod settings;
pub mod types;

pub use config::{ConnectionConfig, CredentialRef, ProviderConfig};
pub use error::{Error, Result};
pub use settings::{settings_path, Settings, SettingsStore};
pub use types::{ConnectionState, Event, InterfaceMatch, OnDemandRule, RuleAction};

// Re-export commonly used external types
pub use chrono::{DateTime, Utc};
