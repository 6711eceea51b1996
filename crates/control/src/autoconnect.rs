// Autoconnect supervisor - reconnects to the last-used host when enabled

use std::sync::{Arc, Mutex};

use tracing::{debug, info};

use crate::controller::ConnectionController;
use crate::provider::SettingsProvider;

/// Observes the autoconnect preference and triggers a reconnect to the
/// latest host once the controller has completed its first configuration
/// load. Disabling never tears down an active tunnel.
pub struct AutoconnectSupervisor {
    controller: ConnectionController,
    inner: Arc<Mutex<Inner>>,
}

#[derive(Default)]
struct Inner {
    enabled: bool,
    connect_when_configured: bool,
}

impl AutoconnectSupervisor {
    /// Create the supervisor, seeding the preference from settings
    pub fn new(controller: ConnectionController, settings: &dyn SettingsProvider) -> Self {
        let supervisor = Self {
            controller,
            inner: Arc::new(Mutex::new(Inner::default())),
        };
        supervisor.spawn_deferred_trigger();
        supervisor.set_enabled(settings.autoconnect_enabled());
        supervisor
    }

    pub fn is_enabled(&self) -> bool {
        self.inner.lock().unwrap().enabled
    }

    /// Update the preference. Enabling connects to the latest host, now or
    /// after the first configuration load completes. Re-setting the same
    /// value is a no-op.
    pub fn set_enabled(&self, enabled: bool) {
        let mut inner = self.inner.lock().unwrap();
        if inner.enabled == enabled {
            return;
        }
        inner.enabled = enabled;

        if !enabled {
            return;
        }

        if self.controller.is_configured() {
            info!("Autoconnect enabled, connecting to latest host");
            self.controller.connect_to_latest_host();
        } else {
            debug!("Autoconnect enabled before configuration load, deferring");
            inner.connect_when_configured = true;
        }
    }

    // One-shot: waits for the configuration-ready signal and fires the
    // deferred connect at most once.
    fn spawn_deferred_trigger(&self) {
        let controller = self.controller.clone();
        let inner = self.inner.clone();

        tokio::spawn(async move {
            controller.wait_configured().await;

            let fire = {
                let mut inner = inner.lock().unwrap();
                let wanted = inner.enabled && inner.connect_when_configured;
                inner.connect_when_configured = false;
                wanted && !controller.is_active()
            };

            if fire {
                info!("Configuration ready, autoconnecting to latest host");
                controller.connect_to_latest_host();
            }
        });
    }
}
