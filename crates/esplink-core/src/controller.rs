// ── Controller abstraction ──
//
// Session lifecycle for one panel backend: initial load, push feed,
// command routing, and edit sessions over the shared DataStore and
// CatalogCache.

use std::sync::Arc;

use secrecy::ExposeSecret;
use tokio::sync::{Mutex, mpsc, watch};
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};

use esplink_api::models::DeviceRecord;
use esplink_api::{PanelClient, PushFeed, ReconnectConfig, TransportConfig};

use crate::catalog::CatalogCache;
use crate::command::{Command, CommandEnvelope, CommandResult};
use crate::config::ControllerConfig;
use crate::error::CoreError;
use crate::model::Device;
use crate::reconcile::reconcile_task;
use crate::session::DeviceDraft;
use crate::store::DataStore;
use crate::stream::EntityStream;

const COMMAND_CHANNEL_SIZE: usize = 64;

// ── ConnectionState ──────────────────────────────────────────────

/// Connection state observable by consumers.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ConnectionState {
    Disconnected,
    Connecting,
    Connected,
    Failed,
}

// ── Controller ───────────────────────────────────────────────────

/// The main entry point for consumers.
///
/// Cheaply cloneable via `Arc<ControllerInner>`. Owns the session
/// context: one store, one catalog, one command queue, and (optionally)
/// one push feed feeding the reconciler.
#[derive(Clone)]
pub struct Controller {
    inner: Arc<ControllerInner>,
}

struct ControllerInner {
    config: ControllerConfig,
    store: Arc<DataStore>,
    catalog: Arc<CatalogCache>,
    connection_state: watch::Sender<ConnectionState>,
    command_tx: Mutex<mpsc::Sender<CommandEnvelope>>,
    command_rx: Mutex<Option<mpsc::Receiver<CommandEnvelope>>>,
    cancel: CancellationToken,
    /// Child token for the current connection, replaced on reconnect.
    cancel_child: Mutex<CancellationToken>,
    /// Cloned out before each request; the lock is never held across I/O.
    client: Mutex<Option<Arc<PanelClient>>>,
    push_feed: Mutex<Option<PushFeed>>,
    task_handles: Mutex<Vec<JoinHandle<()>>>,
    /// Non-fatal problems hit during connect (e.g. catalog unavailable).
    warnings: Mutex<Vec<String>>,
}

impl Controller {
    /// Create a new Controller from configuration. Does NOT connect --
    /// call [`connect()`](Self::connect) to load data and start background tasks.
    pub fn new(config: ControllerConfig) -> Self {
        let (connection_state, _) = watch::channel(ConnectionState::Disconnected);
        let (command_tx, command_rx) = mpsc::channel(COMMAND_CHANNEL_SIZE);
        let cancel = CancellationToken::new();
        let cancel_child = cancel.child_token();

        Self {
            inner: Arc::new(ControllerInner {
                config,
                store: Arc::new(DataStore::new()),
                catalog: Arc::new(CatalogCache::new()),
                connection_state,
                command_tx: Mutex::new(command_tx),
                command_rx: Mutex::new(Some(command_rx)),
                cancel,
                cancel_child: Mutex::new(cancel_child),
                client: Mutex::new(None),
                push_feed: Mutex::new(None),
                task_handles: Mutex::new(Vec::new()),
                warnings: Mutex::new(Vec::new()),
            }),
        }
    }

    pub fn config(&self) -> &ControllerConfig {
        &self.inner.config
    }

    pub fn store(&self) -> &Arc<DataStore> {
        &self.inner.store
    }

    pub fn catalog(&self) -> &Arc<CatalogCache> {
        &self.inner.catalog
    }

    // ── Connection lifecycle ─────────────────────────────────────

    /// Connect to the backend.
    ///
    /// Loads the device list (fatal on failure) and the object catalog
    /// (a warning on failure), then spawns the command processor and,
    /// when configured, the push feed with its reconciler.
    pub async fn connect(&self) -> Result<(), CoreError> {
        self.inner.connection_state.send_replace(ConnectionState::Connecting);

        let child = self.inner.cancel.child_token();
        *self.inner.cancel_child.lock().await = child.clone();

        let config = &self.inner.config;
        let client = match PanelClient::new(config.url.clone(), &build_transport(config)) {
            Ok(c) => Arc::new(c),
            Err(e) => {
                self.inner.connection_state.send_replace(ConnectionState::Failed);
                return Err(e.into());
            }
        };
        *self.inner.client.lock().await = Some(client);

        if let Err(e) = self.refresh_devices().await {
            self.inner.connection_state.send_replace(ConnectionState::Failed);
            return Err(e);
        }

        if let Err(e) = self.refresh_catalog().await {
            let msg = format!("Object catalog unavailable: {e}");
            warn!("{msg}");
            self.inner.warnings.lock().await.push(msg);
        }

        let mut handles = self.inner.task_handles.lock().await;

        if let Some(rx) = self.inner.command_rx.lock().await.take() {
            let ctrl = self.clone();
            handles.push(tokio::spawn(command_processor_task(ctrl, rx)));
        }

        if let Some(push) = &config.push {
            let (tx, rx) = mpsc::channel(config.event_queue_capacity.max(1));
            let feed = PushFeed::spawn(
                push.url.clone(),
                push.topic.clone(),
                ReconnectConfig::default(),
                child.child_token(),
                config.api_key.as_ref().map(|k| k.expose_secret().to_owned()),
                tx,
            );
            *self.inner.push_feed.lock().await = Some(feed);

            let store = Arc::clone(&self.inner.store);
            handles.push(tokio::spawn(reconcile_task(store, rx, child.clone())));
            info!(url = %push.url, topic = %push.topic, "push feed spawned");
        }
        drop(handles);

        self.inner.connection_state.send_replace(ConnectionState::Connected);
        info!(devices = self.inner.store.device_count(), "connected to panel");
        Ok(())
    }

    /// Disconnect: stop the push feed and background tasks.
    pub async fn disconnect(&self) {
        // Cancel the child token (not the parent -- allows reconnect).
        self.inner.cancel_child.lock().await.cancel();

        if let Some(feed) = self.inner.push_feed.lock().await.take() {
            feed.join().await;
        }

        let mut handles = self.inner.task_handles.lock().await;
        for handle in handles.drain(..) {
            if let Err(e) = handle.await {
                warn!(error = %e, "background task panicked");
            }
        }
        drop(handles);

        *self.inner.client.lock().await = None;

        // Recreate command channel so reconnects can spawn a fresh receiver.
        {
            let (tx, rx) = mpsc::channel(COMMAND_CHANNEL_SIZE);
            *self.inner.command_tx.lock().await = tx;
            *self.inner.command_rx.lock().await = Some(rx);
        }

        self.inner.connection_state.send_replace(ConnectionState::Disconnected);
        debug!("disconnected");
    }

    async fn client(&self) -> Result<Arc<PanelClient>, CoreError> {
        self.inner
            .client
            .lock()
            .await
            .clone()
            .ok_or(CoreError::ControllerDisconnected)
    }

    // ── Refresh ──────────────────────────────────────────────────

    /// Fetch the device list and replace the store with it.
    pub async fn refresh_devices(&self) -> Result<usize, CoreError> {
        let client = self.client().await?;
        let records = client.list_devices().await?;
        let devices: Vec<Device> = records.into_iter().map(Device::from).collect();
        let count = devices.len();
        self.inner.store.replace_all(devices);
        debug!(count, "device list refreshed");
        Ok(count)
    }

    /// Fetch the object catalog. On failure the cached catalog stays.
    pub async fn refresh_catalog(&self) -> Result<usize, CoreError> {
        let client = self.client().await?;
        self.inner.catalog.refresh(&client).await
    }

    // ── Edit sessions ────────────────────────────────────────────

    /// Draft for a device that does not exist yet.
    pub fn new_device(&self) -> DeviceDraft {
        DeviceDraft::new()
    }

    /// Detached draft of a stored device.
    pub fn edit_device(&self, name: &str) -> Option<DeviceDraft> {
        self.inner
            .store
            .find_device_by_name(name)
            .map(|d| DeviceDraft::from_device(&d))
    }

    /// Submit a draft, then re-fetch the device list whatever the outcome.
    ///
    /// A draft that fails local validation is never sent, but the re-fetch
    /// still happens.
    pub async fn save_device(&self, draft: DeviceDraft) -> Result<CommandResult, CoreError> {
        self.execute(Command::SaveDevice { draft }).await
    }

    /// Delete a device once the operator has confirmed.
    ///
    /// Unconfirmed calls return [`CommandResult::Cancelled`] without any
    /// request. Confirmed calls re-fetch the device list whatever the outcome.
    pub async fn delete_device(
        &self,
        device: &Device,
        confirmed: bool,
    ) -> Result<CommandResult, CoreError> {
        if !confirmed {
            debug!(name = %device.name, "delete not confirmed");
            return Ok(CommandResult::Cancelled);
        }
        self.execute(Command::DeleteDevice {
            device: device.clone(),
        })
        .await
    }

    /// Ask the backend to reconnect to a device. No re-fetch.
    pub async fn reconnect_device(&self, device: &Device) -> Result<CommandResult, CoreError> {
        let id = require_id(device)?;
        self.execute(Command::ReconnectDevice { id }).await
    }

    // ── Command execution ────────────────────────────────────────

    /// Queue a command for the command processor and wait for its result.
    pub(crate) async fn execute(&self, cmd: Command) -> Result<CommandResult, CoreError> {
        if *self.inner.connection_state.borrow() != ConnectionState::Connected {
            return Err(CoreError::ControllerDisconnected);
        }

        let (tx, rx) = tokio::sync::oneshot::channel();

        let command_tx = self.inner.command_tx.lock().await.clone();

        command_tx
            .send(CommandEnvelope {
                command: cmd,
                response_tx: tx,
            })
            .await
            .map_err(|_| CoreError::ControllerDisconnected)?;

        rx.await.map_err(|_| CoreError::ControllerDisconnected)?
    }

    // ── One-shot convenience ─────────────────────────────────────

    /// One-shot: connect, run closure, disconnect.
    ///
    /// Tuned for the CLI: the push feed is disabled since only one
    /// request-response cycle is needed.
    pub async fn oneshot<F, Fut, T>(config: ControllerConfig, f: F) -> Result<T, CoreError>
    where
        F: FnOnce(Controller) -> Fut,
        Fut: std::future::Future<Output = Result<T, CoreError>>,
    {
        let mut cfg = config;
        cfg.push = None;

        let controller = Controller::new(cfg);
        controller.connect().await?;
        let result = f(controller.clone()).await;
        controller.disconnect().await;
        result
    }

    // ── State observation ────────────────────────────────────────

    /// Subscribe to connection state changes.
    pub fn connection_state(&self) -> watch::Receiver<ConnectionState> {
        self.inner.connection_state.subscribe()
    }

    pub fn devices_snapshot(&self) -> Arc<Vec<Arc<Device>>> {
        self.inner.store.devices_snapshot()
    }

    pub fn devices(&self) -> EntityStream<Device> {
        self.inner.store.subscribe_devices()
    }

    pub fn find_device(&self, name: &str) -> Option<Arc<Device>> {
        self.inner.store.find_device_by_name(name)
    }

    /// Drain warnings accumulated during connect.
    pub async fn take_warnings(&self) -> Vec<String> {
        std::mem::take(&mut *self.inner.warnings.lock().await)
    }
}

// ── Helpers ──────────────────────────────────────────────────────

fn build_transport(config: &ControllerConfig) -> TransportConfig {
    TransportConfig {
        timeout: config.timeout,
        api_key: config.api_key.clone(),
        accept_invalid_certs: config.accept_invalid_certs,
    }
}

fn require_id(device: &Device) -> Result<i64, CoreError> {
    device.id.ok_or_else(|| CoreError::DeviceNotFound {
        identifier: format!("{} (not saved yet)", device.name),
    })
}

// ── Background tasks ─────────────────────────────────────────────

/// Process commands from the mpsc channel one at a time.
async fn command_processor_task(controller: Controller, mut rx: mpsc::Receiver<CommandEnvelope>) {
    let cancel = controller.inner.cancel_child.lock().await.clone();

    loop {
        tokio::select! {
            biased;
            () = cancel.cancelled() => break,
            envelope = rx.recv() => {
                let Some(envelope) = envelope else { break };
                let result = route_command(&controller, envelope.command).await;
                let _ = envelope.response_tx.send(result);
            }
        }
    }
}

// ── Command routing ──────────────────────────────────────────────

/// Run a command against the backend.
///
/// Save and delete always re-fetch the device list afterwards, success or
/// failure, so the store reflects the backend rather than a guess. The
/// command's own result is returned; a failed re-fetch is only logged.
async fn route_command(controller: &Controller, cmd: Command) -> Result<CommandResult, CoreError> {
    let refetch = cmd.refetches();
    let client = controller.client().await?;

    let result: Result<(), CoreError> = match cmd {
        Command::SaveDevice { draft } => match draft.validate() {
            Ok(()) => {
                let record = DeviceRecord::from(draft.device());
                client.save_device(&record).await.map_err(CoreError::from)
            }
            Err(e) => Err(e),
        },
        Command::DeleteDevice { device } => match require_id(&device) {
            Ok(id) => client.delete_device(id).await.map_err(CoreError::from),
            Err(e) => Err(e),
        },
        Command::ReconnectDevice { id } => client.reconnect_device(id).await.map_err(CoreError::from),
    };

    if let Err(ref e) = result {
        warn!(error = %e, "command failed");
    }

    if refetch {
        if let Err(e) = controller.refresh_devices().await {
            warn!(error = %e, "device re-fetch after command failed");
        }
    }

    result.map(|()| CommandResult::Ok)
}
