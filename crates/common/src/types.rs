// Shared types for VPN Connection Manager

use std::fmt;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Status of the logical tunnel connection, as reported by the provider
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum ConnectionState {
    /// Provider-side configuration is missing or corrupted
    Invalid,
    Disconnected,
    Connecting,
    Connected,
    Disconnecting,
    /// Provider is re-establishing the tunnel on its own
    Reasserting,
}

impl ConnectionState {
    /// Check if the state represents an active connection
    pub fn is_connected(&self) -> bool {
        matches!(self, ConnectionState::Connected)
    }

    /// Check if there is no tunnel. `Invalid` counts as disconnected: with no
    /// usable configuration there can be no tunnel either.
    pub fn is_disconnected(&self) -> bool {
        matches!(self, ConnectionState::Disconnected | ConnectionState::Invalid)
    }

    /// Check if the state represents a transitional state
    pub fn is_in_progress(&self) -> bool {
        matches!(
            self,
            ConnectionState::Connecting
                | ConnectionState::Disconnecting
                | ConnectionState::Reasserting
        )
    }
}

impl fmt::Display for ConnectionState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let label = match self {
            ConnectionState::Invalid => "invalid",
            ConnectionState::Disconnected => "disconnected",
            ConnectionState::Connecting => "connecting",
            ConnectionState::Connected => "connected",
            ConnectionState::Disconnecting => "disconnecting",
            ConnectionState::Reasserting => "reconnecting",
        };
        f.write_str(label)
    }
}

/// Interface match for an on-demand rule
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum InterfaceMatch {
    Any,
}

/// Action an on-demand rule takes when its match succeeds
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum RuleAction {
    Connect,
}

/// On-demand (kill switch) rule handed to the tunnel provider
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct OnDemandRule {
    pub action: RuleAction,
    pub interface: InterfaceMatch,
}

/// Events emitted by the connection controller
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum Event {
    /// Connection state changed, by command or by provider notification
    StatusChanged {
        state: ConnectionState,
        /// Whether the presentation layer should surface this change
        visible_to_user: bool,
        timestamp: DateTime<Utc>,
    },

    /// A provider operation failed
    Error {
        message: String,
        timestamp: DateTime<Utc>,
    },
}

impl Event {
    pub fn status(state: ConnectionState, visible_to_user: bool) -> Self {
        Event::StatusChanged {
            state,
            visible_to_user,
            timestamp: Utc::now(),
        }
    }

    pub fn error(message: impl Into<String>) -> Self {
        Event::Error {
            message: message.into(),
            timestamp: Utc::now(),
        }
    }
}
