// VPN Connection Manager - Connection Controller
// Central state machine; serializes commands against provider status changes

use std::sync::Arc;
use std::time::Duration;

use tokio::sync::{broadcast, mpsc, watch};
use tracing::{debug, error, info, warn};

use vpn_manager_common::{ConnectionConfig, ConnectionState, Error, Event, ProviderConfig};

use crate::events::EventBus;
use crate::killswitch::KillSwitchPolicy;
use crate::provider::{CredentialStore, SettingsProvider, TunnelProvider};
use crate::retry::RetryScheduler;
use crate::store::ConfigurationStore;

/// Delay before retrying a connect that had to tear down an active tunnel
const RECONNECT_DELAY: Duration = Duration::from_millis(500);

type DoneCallback = Box<dyn FnOnce() + Send>;

enum Command {
    Connect { host: String },
    ConnectLatest,
    Disconnect { done: Option<DoneCallback> },
    Reload { done: Option<DoneCallback> },
}

/// Read-only view of the controller, published after every change
#[derive(Debug, Clone)]
pub struct StateSnapshot {
    pub state: ConnectionState,
    pub selected_host: Option<String>,
    pub enabled: bool,
    pub on_demand_enabled: bool,
    /// First configuration load has completed
    pub configured: bool,
    /// A plain disconnect requested an address refresh afterwards
    pub ip_refresh_requested: bool,
}

impl Default for StateSnapshot {
    fn default() -> Self {
        Self {
            state: ConnectionState::Invalid,
            selected_host: None,
            enabled: false,
            on_demand_enabled: false,
            configured: false,
            ip_refresh_requested: false,
        }
    }
}

/// Cloneable handle to the controller task. Commands are fire-and-forget;
/// completion is observed through events on the bus or explicit callbacks.
#[derive(Clone)]
pub struct ConnectionController {
    cmd_tx: mpsc::UnboundedSender<Command>,
    snapshot_rx: watch::Receiver<StateSnapshot>,
}

impl ConnectionController {
    /// Spawn the controller task and issue the initial configuration load.
    /// The process composition root is expected to construct exactly one.
    pub fn spawn(
        provider: Arc<dyn TunnelProvider>,
        credentials: Arc<dyn CredentialStore>,
        settings: Arc<dyn SettingsProvider>,
        bus: EventBus,
    ) -> Self {
        let (cmd_tx, cmd_rx) = mpsc::unbounded_channel();
        let (snapshot_tx, snapshot_rx) = watch::channel(StateSnapshot::default());
        let status_rx = provider.subscribe_status();

        let task = ControllerTask {
            store: ConfigurationStore::new(provider.clone()),
            provider,
            credentials,
            settings,
            policy: KillSwitchPolicy,
            retry: RetryScheduler::new(),
            bus,
            cmd_tx: cmd_tx.clone(),
            snapshot_tx,
            state: ConnectionState::Invalid,
            connection: None,
            selected_host: None,
            enabled: false,
            on_demand_enabled: false,
            configured: false,
            ip_refresh_requested: false,
        };
        tokio::spawn(task.run(cmd_rx, status_rx));

        let controller = Self { cmd_tx, snapshot_rx };
        controller.reload();
        controller
    }

    /// Connect to `host`, tearing down any active tunnel first
    pub fn connect(&self, host: impl Into<String>) {
        let _ = self.cmd_tx.send(Command::Connect { host: host.into() });
    }

    /// Connect to the last successfully connected host, falling back to the
    /// configured default
    pub fn connect_to_latest_host(&self) {
        let _ = self.cmd_tx.send(Command::ConnectLatest);
    }

    /// Stop the tunnel, clear the enabled/on-demand flags, and persist.
    /// Without a callback this is the teardown-without-followup form, which
    /// also requests an address refresh once disconnected.
    pub fn disconnect(&self) {
        let _ = self.cmd_tx.send(Command::Disconnect { done: None });
    }

    /// Like `disconnect`, invoking `done` once the teardown has been
    /// persisted. `done` runs whether or not the save succeeded; disconnect
    /// reports no error detail.
    pub fn disconnect_then<F>(&self, done: F)
    where
        F: FnOnce() + Send + 'static,
    {
        let _ = self.cmd_tx.send(Command::Disconnect {
            done: Some(Box::new(done)),
        });
    }

    /// Re-read configuration from the provider
    pub fn reload(&self) {
        let _ = self.cmd_tx.send(Command::Reload { done: None });
    }

    /// Like `reload`, invoking `done` once the load has completed
    pub fn reload_then<F>(&self, done: F)
    where
        F: FnOnce() + Send + 'static,
    {
        let _ = self.cmd_tx.send(Command::Reload {
            done: Some(Box::new(done)),
        });
    }

    // Read-only queries, served from the last published snapshot

    pub fn snapshot(&self) -> StateSnapshot {
        self.snapshot_rx.borrow().clone()
    }

    pub fn current_state(&self) -> ConnectionState {
        self.snapshot_rx.borrow().state
    }

    pub fn is_connected(&self) -> bool {
        self.current_state().is_connected()
    }

    pub fn is_disconnected(&self) -> bool {
        self.current_state().is_disconnected()
    }

    pub fn selected_host(&self) -> Option<String> {
        self.snapshot_rx.borrow().selected_host.clone()
    }

    pub fn is_kill_switch_active(&self) -> bool {
        let snapshot = self.snapshot_rx.borrow();
        snapshot.enabled && snapshot.on_demand_enabled
    }

    pub fn is_active(&self) -> bool {
        let snapshot = self.snapshot_rx.borrow();
        snapshot.enabled && !snapshot.state.is_disconnected()
    }

    pub fn is_configured(&self) -> bool {
        self.snapshot_rx.borrow().configured
    }

    /// Completes once the first configuration load has finished
    pub async fn wait_configured(&self) {
        let mut rx = self.snapshot_rx.clone();
        while !rx.borrow().configured {
            if rx.changed().await.is_err() {
                return;
            }
        }
    }

    /// Watch every published state snapshot
    pub fn watch(&self) -> watch::Receiver<StateSnapshot> {
        self.snapshot_rx.clone()
    }
}

struct ControllerTask {
    provider: Arc<dyn TunnelProvider>,
    store: ConfigurationStore,
    credentials: Arc<dyn CredentialStore>,
    settings: Arc<dyn SettingsProvider>,
    policy: KillSwitchPolicy,
    retry: RetryScheduler,
    bus: EventBus,
    cmd_tx: mpsc::UnboundedSender<Command>,
    snapshot_tx: watch::Sender<StateSnapshot>,

    state: ConnectionState,
    connection: Option<ConnectionConfig>,
    selected_host: Option<String>,
    enabled: bool,
    on_demand_enabled: bool,
    configured: bool,
    ip_refresh_requested: bool,
}

impl ControllerTask {
    async fn run(
        mut self,
        mut cmd_rx: mpsc::UnboundedReceiver<Command>,
        mut status_rx: broadcast::Receiver<ConnectionState>,
    ) {
        debug!("Connection controller task started");
        let mut status_open = true;

        loop {
            tokio::select! {
                cmd = cmd_rx.recv() => match cmd {
                    Some(cmd) => self.handle_command(cmd).await,
                    // all handles dropped
                    None => break,
                },
                status = status_rx.recv(), if status_open => match status {
                    Ok(state) => self.handle_status_change(state).await,
                    Err(broadcast::error::RecvError::Lagged(missed)) => {
                        warn!("Missed {} provider status notifications", missed);
                    }
                    Err(broadcast::error::RecvError::Closed) => {
                        warn!("Provider status channel closed");
                        status_open = false;
                    }
                },
            }
        }

        debug!("Connection controller task stopped");
    }

    async fn handle_command(&mut self, cmd: Command) {
        match cmd {
            Command::Connect { host } => self.handle_connect(host).await,
            Command::ConnectLatest => {
                let host = self
                    .settings
                    .latest_connected_host()
                    .unwrap_or_else(|| self.settings.default_host());
                self.handle_connect(host).await;
            }
            Command::Disconnect { done } => self.handle_disconnect(done).await,
            Command::Reload { done } => {
                self.handle_reload().await;
                if let Some(done) = done {
                    done();
                }
            }
        }
    }

    async fn handle_connect(&mut self, host: String) {
        if !self.state.is_disconnected() {
            // Never start over an existing tunnel: tear down first, then
            // retry the same connect after a short delay. Only the most
            // recent retry survives.
            info!(
                "Connect to {} requested while {}, disconnecting first",
                host, self.state
            );
            self.teardown().await;
            self.publish_snapshot();

            let cmd_tx = self.cmd_tx.clone();
            self.retry.schedule_once(RECONNECT_DELAY, move || {
                let _ = cmd_tx.send(Command::Connect { host });
            });
            return;
        }

        // A direct connect supersedes any retry still pending
        self.retry.cancel();

        let needs_reload = self.state == ConnectionState::Invalid;

        let credential = match self.credentials.credential_reference() {
            Ok(credential) => credential,
            Err(e) => {
                error!("Credential lookup failed: {}", e);
                self.bus.publish(&Event::error(e.to_string()));
                return;
            }
        };

        let kill_switch = self
            .policy
            .should_enable_on_demand(self.settings.kill_switch_enabled());
        let connection = ConnectionConfig {
            host: host.clone(),
            username: self.settings.username(),
            credential,
            kill_switch_enabled: kill_switch,
        };
        if let Err(e) = connection.validate() {
            error!("Refusing to connect: {}", e);
            self.bus.publish(&Event::error(e.to_string()));
            return;
        }

        let on_demand_rules = if kill_switch {
            vec![self.policy.build_on_demand_rule()]
        } else {
            Vec::new()
        };
        let config = ProviderConfig {
            connection: Some(connection.clone()),
            enabled: true,
            on_demand_enabled: kill_switch,
            on_demand_rules,
        };

        info!("Connecting to {} (kill switch: {})", host, kill_switch);
        if let Err(e) = self.store.save(config).await {
            error!("{}", e);
            self.bus.publish(&Event::error(e.to_string()));
            return;
        }

        self.connection = Some(connection);
        self.selected_host = Some(host.clone());
        self.enabled = true;
        self.on_demand_enabled = kill_switch;

        if needs_reload {
            // Invalid means the provider's view of the configuration went
            // stale; resynchronize before starting
            if let Err(e) = self.store.load().await {
                warn!("Reload before start failed: {}", e);
            }
            self.start_tunnel(&host).await;
            self.publish_status(true);
        } else {
            self.start_tunnel(&host).await;
        }

        self.publish_snapshot();
    }

    async fn start_tunnel(&mut self, host: &str) {
        match self.provider.start_tunnel().await {
            Ok(()) => {
                if let Err(e) = self.settings.set_latest_connected_host(host) {
                    warn!("Failed to record latest connected host: {}", e);
                }
                self.ip_refresh_requested = false;
            }
            Err(e) => {
                // The provider is authoritative: it will report a status
                // change itself (typically back to Disconnected), so state
                // is not reverted here.
                let wrapped = Error::TunnelStart(e.to_string());
                error!("{}", wrapped);
                self.bus.publish(&Event::error(wrapped.to_string()));
            }
        }
    }

    /// Stop the tunnel, clear the enabled/on-demand flags, persist. Save
    /// failures are logged only; disconnect is best effort by design.
    async fn teardown(&mut self) {
        self.provider.stop_tunnel().await;
        self.enabled = false;
        self.on_demand_enabled = false;

        let config = ProviderConfig {
            connection: self.connection.clone(),
            enabled: false,
            on_demand_enabled: false,
            on_demand_rules: Vec::new(),
        };
        if let Err(e) = self.store.save(config).await {
            warn!("{}", e);
        }
    }

    async fn handle_disconnect(&mut self, done: Option<DoneCallback>) {
        info!("Disconnecting");
        self.teardown().await;

        match done {
            Some(done) => done(),
            None => {
                // Plain disconnect wants a fresh address reported once the
                // tunnel is down; the consumer of this marker lives outside
                // the core.
                self.ip_refresh_requested = true;
            }
        }

        self.publish_snapshot();
    }

    async fn handle_reload(&mut self) {
        debug!("Reloading configuration from provider");
        let result = self.store.load().await;

        // A (non-user-visible) status event accompanies every load completion
        self.publish_status(false);
        if let Err(e) = result {
            error!("{}", e);
            self.bus.publish(&Event::error(e.to_string()));
        }

        self.refresh_from_provider();

        if !self.configured {
            // Load errors still count: the configuration has been read as
            // far as it ever will be, and autoconnect must not stay wedged.
            self.configured = true;
            info!("Initial configuration load complete");
        }

        self.publish_snapshot();
    }

    fn refresh_from_provider(&mut self) {
        self.selected_host = self.provider.server_address();
        self.enabled = self.provider.is_enabled();
        self.on_demand_enabled = self.provider.is_on_demand_enabled();
    }

    async fn handle_status_change(&mut self, state: ConnectionState) {
        info!("Provider status changed: {} -> {}", self.state, state);
        self.state = state;

        if state == ConnectionState::Invalid {
            // Invalid is "provider configuration missing or corrupted", not
            // a terminal state. Reload resynchronizes; the provider then
            // reports Disconnected on its own.
            self.handle_reload().await;
            info!("Recovered invalid configuration state via reload");
        }

        self.publish_status(true);
        self.publish_snapshot();
    }

    fn publish_status(&self, visible_to_user: bool) {
        self.bus.publish(&Event::status(self.state, visible_to_user));
    }

    fn publish_snapshot(&self) {
        let _ = self.snapshot_tx.send(StateSnapshot {
            state: self.state,
            selected_host: self.selected_host.clone(),
            enabled: self.enabled,
            on_demand_enabled: self.on_demand_enabled,
            configured: self.configured,
            ip_refresh_requested: self.ip_refresh_requested,
        });
    }
}
