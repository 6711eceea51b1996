// SPDX-License-Identifier: Apache-2.0
// Copyright 2025 VPN Manager Contributors

// VPN Connection Manager - Control Library
// Connection lifecycle state machine and its collaborator seams

pub mod autoconnect;
pub mod controller;
pub mod events;
pub mod killswitch;
pub mod provider;
pub mod retry;
pub mod store;

pub use autoconnect::AutoconnectSupervisor;
pub use controller::{ConnectionController, StateSnapshot};
pub use events::{EventBus, SubscriptionToken};
pub use killswitch::KillSwitchPolicy;
pub use provider::{CredentialStore, SettingsProvider, TunnelProvider};
pub use retry::RetryScheduler;
pub use store::ConfigurationStore;

pub use vpn_manager_common as common;
