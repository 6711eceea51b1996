// Test support: scripted in-memory collaborators for controller tests
#![allow(dead_code)]

use std::sync::{Arc, Mutex};
use std::time::Duration;

use async_trait::async_trait;
use tokio::sync::broadcast;
use tokio::time::sleep;

use vpn_manager_common::{
    ConnectionState, CredentialRef, Error, Event, ProviderConfig, Result,
};
use vpn_manager_control::{CredentialStore, EventBus, SettingsProvider, TunnelProvider};

pub fn init_tracing() {
    use tracing_subscriber::EnvFilter;
    let _ = tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env())
        .with_test_writer()
        .try_init();
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ProviderCall {
    Load,
    Save,
    Start,
    Stop,
}

#[derive(Default)]
struct ProviderState {
    calls: Vec<ProviderCall>,
    saved: Vec<ProviderConfig>,
    server_address: Option<String>,
    enabled: bool,
    on_demand_enabled: bool,
    fail_load: Option<String>,
    fail_save: Option<String>,
    fail_start: Option<String>,
}

/// In-memory tunnel provider recording every call; status notifications are
/// emitted explicitly by the test
pub struct MockProvider {
    state: Mutex<ProviderState>,
    status_tx: broadcast::Sender<ConnectionState>,
}

impl MockProvider {
    pub fn new() -> Arc<Self> {
        let (status_tx, _) = broadcast::channel(16);
        Arc::new(Self {
            state: Mutex::new(ProviderState::default()),
            status_tx,
        })
    }

    pub fn emit_status(&self, state: ConnectionState) {
        let _ = self.status_tx.send(state);
    }

    pub fn calls(&self) -> Vec<ProviderCall> {
        self.state.lock().unwrap().calls.clone()
    }

    pub fn call_count(&self, call: ProviderCall) -> usize {
        self.calls().iter().filter(|c| **c == call).count()
    }

    pub fn saved_configs(&self) -> Vec<ProviderConfig> {
        self.state.lock().unwrap().saved.clone()
    }

    pub fn last_saved(&self) -> Option<ProviderConfig> {
        self.state.lock().unwrap().saved.last().cloned()
    }

    pub fn fail_save(&self, message: &str) {
        self.state.lock().unwrap().fail_save = Some(message.to_string());
    }

    pub fn fail_load(&self, message: &str) {
        self.state.lock().unwrap().fail_load = Some(message.to_string());
    }

    pub fn fail_start(&self, message: &str) {
        self.state.lock().unwrap().fail_start = Some(message.to_string());
    }
}

#[async_trait]
impl TunnelProvider for MockProvider {
    async fn load_configuration(&self) -> Result<()> {
        let mut state = self.state.lock().unwrap();
        state.calls.push(ProviderCall::Load);
        match &state.fail_load {
            Some(message) => Err(Error::Config(message.clone())),
            None => Ok(()),
        }
    }

    async fn save_configuration(&self, config: ProviderConfig) -> Result<()> {
        let mut state = self.state.lock().unwrap();
        state.calls.push(ProviderCall::Save);
        if let Some(message) = &state.fail_save {
            return Err(Error::Config(message.clone()));
        }
        state.enabled = config.enabled;
        state.on_demand_enabled = config.on_demand_enabled;
        if let Some(connection) = &config.connection {
            state.server_address = Some(connection.host.clone());
        }
        state.saved.push(config);
        Ok(())
    }

    async fn start_tunnel(&self) -> Result<()> {
        let mut state = self.state.lock().unwrap();
        state.calls.push(ProviderCall::Start);
        match &state.fail_start {
            Some(message) => Err(Error::Config(message.clone())),
            None => Ok(()),
        }
    }

    async fn stop_tunnel(&self) {
        self.state.lock().unwrap().calls.push(ProviderCall::Stop);
    }

    fn server_address(&self) -> Option<String> {
        self.state.lock().unwrap().server_address.clone()
    }

    fn is_enabled(&self) -> bool {
        self.state.lock().unwrap().enabled
    }

    fn is_on_demand_enabled(&self) -> bool {
        self.state.lock().unwrap().on_demand_enabled
    }

    fn subscribe_status(&self) -> broadcast::Receiver<ConnectionState> {
        self.status_tx.subscribe()
    }
}

pub struct MockCredentials;

impl CredentialStore for MockCredentials {
    fn credential_reference(&self) -> Result<CredentialRef> {
        Ok(CredentialRef::new(b"test-credential-ref".to_vec()))
    }
}

#[derive(Debug)]
struct SettingsState {
    username: String,
    autoconnect_enabled: bool,
    kill_switch_enabled: bool,
    latest_connected_host: Option<String>,
    default_host: String,
}

/// In-memory settings with test knobs
pub struct MemorySettings {
    inner: Mutex<SettingsState>,
}

impl MemorySettings {
    pub fn new() -> Arc<Self> {
        Arc::new(Self {
            inner: Mutex::new(SettingsState {
                username: "testuser".to_string(),
                autoconnect_enabled: false,
                kill_switch_enabled: false,
                latest_connected_host: None,
                default_host: "default.example.com".to_string(),
            }),
        })
    }

    pub fn set_kill_switch_enabled(&self, enabled: bool) {
        self.inner.lock().unwrap().kill_switch_enabled = enabled;
    }

    pub fn set_autoconnect_enabled(&self, enabled: bool) {
        self.inner.lock().unwrap().autoconnect_enabled = enabled;
    }

    pub fn set_latest_host(&self, host: &str) {
        self.inner.lock().unwrap().latest_connected_host = Some(host.to_string());
    }
}

impl SettingsProvider for MemorySettings {
    fn username(&self) -> String {
        self.inner.lock().unwrap().username.clone()
    }

    fn autoconnect_enabled(&self) -> bool {
        self.inner.lock().unwrap().autoconnect_enabled
    }

    fn kill_switch_enabled(&self) -> bool {
        self.inner.lock().unwrap().kill_switch_enabled
    }

    fn latest_connected_host(&self) -> Option<String> {
        self.inner.lock().unwrap().latest_connected_host.clone()
    }

    fn default_host(&self) -> String {
        self.inner.lock().unwrap().default_host.clone()
    }

    fn set_latest_connected_host(&self, host: &str) -> anyhow::Result<()> {
        self.inner.lock().unwrap().latest_connected_host = Some(host.to_string());
        Ok(())
    }
}

/// Collect every published event for later inspection
pub fn collect_events(bus: &EventBus) -> Arc<Mutex<Vec<Event>>> {
    let events = Arc::new(Mutex::new(Vec::new()));
    let sink = events.clone();
    bus.subscribe(move |event| sink.lock().unwrap().push(event.clone()));
    events
}

/// Poll until `predicate` holds or the budget runs out
pub async fn wait_until(what: &str, predicate: impl Fn() -> bool) {
    for _ in 0..200 {
        if predicate() {
            return;
        }
        sleep(Duration::from_millis(5)).await;
    }
    panic!("condition not reached in time: {}", what);
}
