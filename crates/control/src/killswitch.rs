// Kill switch (always-on) policy

use vpn_manager_common::{InterfaceMatch, OnDemandRule, RuleAction};

/// Decides whether on-demand rules are attached to a configuration.
/// Consulted exactly once per connect, at configuration-build time; flipping
/// the preference never affects an already-active tunnel until the next
/// reconnect.
#[derive(Debug, Clone, Copy, Default)]
pub struct KillSwitchPolicy;

impl KillSwitchPolicy {
    pub fn should_enable_on_demand(&self, preference: bool) -> bool {
        preference
    }

    /// Rule matching any interface, always connect
    pub fn build_on_demand_rule(&self) -> OnDemandRule {
        OnDemandRule {
            action: RuleAction::Connect,
            interface: InterfaceMatch::Any,
        }
    }
}
