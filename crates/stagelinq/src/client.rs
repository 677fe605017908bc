//! `StageLinq` builder and client.
//!
//! This is the entry point for applications. It ties the layers together:
//! transport → StateMap session → registry → player reconstruction.

use std::collections::HashMap;
use std::sync::{Arc, Weak};

use stagelinq_player::{PlayerEvent, PlayerHandle, QueueConfig, spawn_player};
use stagelinq_statemap::{
    DeviceEvent, DeviceId, DeviceInfo, StateEvent, StateMapConfig, StateMapError,
    StateMapHandle, StateMapRegistry, UnitType, spawn_session,
};
use stagelinq_transport::{Connection, TcpConnection, TransportError};
use tokio::sync::{Mutex, broadcast};
use tokio::task::JoinHandle;

use crate::{StageLinqConfig, StageLinqError};

/// Builder for a [`StageLinq`] client.
///
/// # Example
///
/// ```rust
/// use std::time::Duration;
/// use stagelinq::{QueueConfig, StageLinq};
///
/// let client = StageLinq::builder()
///     .queue_config(QueueConfig {
///         quiescence_window: Duration::from_millis(40),
///         ..QueueConfig::default()
///     })
///     .event_capacity(64)
///     .build();
/// assert_eq!(client.config().event_capacity, 64);
/// ```
pub struct StageLinqBuilder {
    config: StageLinqConfig,
}

impl StageLinqBuilder {
    /// Creates a builder with default settings.
    pub fn new() -> Self {
        Self {
            config: StageLinqConfig::default(),
        }
    }

    /// Replaces the whole configuration.
    pub fn config(mut self, config: StageLinqConfig) -> Self {
        self.config = config;
        self
    }

    /// Sets the StateMap session configuration.
    pub fn statemap_config(mut self, config: StateMapConfig) -> Self {
        self.config.statemap = config;
        self
    }

    /// Sets the per-deck queue timing.
    pub fn queue_config(mut self, config: QueueConfig) -> Self {
        self.config.queue = config;
        self
    }

    /// Sets the capacity of the player event channel.
    pub fn event_capacity(mut self, capacity: usize) -> Self {
        self.config.event_capacity = capacity;
        self
    }

    /// Builds the client. Nothing is connected yet.
    pub fn build(self) -> StageLinq {
        let config = self.config.validated();
        let registry = StateMapRegistry::new(config.statemap.event_capacity);
        let (player_events, _) = broadcast::channel(config.event_capacity);

        StageLinq {
            inner: Arc::new(ClientInner {
                config,
                registry,
                player_events,
                players: Mutex::new(HashMap::new()),
            }),
        }
    }
}

impl Default for StageLinqBuilder {
    fn default() -> Self {
        Self::new()
    }
}

struct ClientInner {
    config: StageLinqConfig,
    registry: StateMapRegistry,
    player_events: broadcast::Sender<PlayerEvent>,
    players: Mutex<HashMap<DeviceId, PlayerHandle>>,
}

/// A StageLinq client.
///
/// Hand it device connections with [`attach`](Self::attach) (or let it
/// open them with [`connect`](Self::connect)); it runs a StateMap session
/// per device and, for `PLAYER` units, a reconstruction task that turns
/// the device's state into [`PlayerEvent`]s.
///
/// Cloning gives another handle to the same client.
#[derive(Clone)]
pub struct StageLinq {
    inner: Arc<ClientInner>,
}

impl StageLinq {
    /// Creates a new builder.
    pub fn builder() -> StageLinqBuilder {
        StageLinqBuilder::new()
    }

    /// Creates a client with default settings.
    pub fn new() -> Self {
        StageLinqBuilder::new().build()
    }

    /// The validated configuration in use.
    pub fn config(&self) -> &StageLinqConfig {
        &self.inner.config
    }

    /// The device registry shared by all sessions.
    pub fn registry(&self) -> &StateMapRegistry {
        &self.inner.registry
    }

    /// Opens a TCP connection to the device's StateMap service at
    /// `info.address` and attaches it.
    pub async fn connect(&self, info: DeviceInfo) -> Result<StateMapHandle, StageLinqError> {
        let conn = TcpConnection::connect(info.address)
            .await?
            .with_read_buffer_size(self.inner.config.statemap.read_buffer_size);
        self.attach(conn, info).await
    }

    /// Starts a StateMap session over an established connection.
    ///
    /// For a `PLAYER` unit, a reconstruction task is started too (or the
    /// device's existing one kept, if it is still running). A connection
    /// for a device that already has one replaces it.
    ///
    /// # Errors
    /// Only if the player task can't be started; session failures are
    /// logged when the session ends.
    pub async fn attach<C>(&self, conn: C, info: DeviceInfo) -> Result<StateMapHandle, StageLinqError>
    where
        C: Connection<Error = TransportError>,
    {
        tracing::info!(
            device_id = %info.device_id,
            unit_type = %info.unit_type,
            address = %info.address,
            "attaching device"
        );

        if info.unit_type == UnitType::Player {
            self.ensure_player(&info).await?;
        }

        let (handle, task) = spawn_session(
            conn,
            info,
            self.inner.registry.clone(),
            self.inner.config.statemap.clone(),
        )
        .await;

        tokio::spawn(watch_session(
            Arc::downgrade(&self.inner),
            handle.clone(),
            task,
        ));
        Ok(handle)
    }

    async fn ensure_player(&self, info: &DeviceInfo) -> Result<(), StageLinqError> {
        let mut players = self.inner.players.lock().await;
        if players
            .get(&info.device_id)
            .is_some_and(|player| !player.is_finished())
        {
            return Ok(());
        }

        let player = spawn_player(
            info.clone(),
            self.inner.registry.subscribe_device(info.device_id).await,
            self.inner.player_events.clone(),
            self.inner.config.queue.clone(),
        )?;
        if players.insert(info.device_id, player).is_some() {
            tracing::debug!(device_id = %info.device_id, "replaced finished player task");
        }
        Ok(())
    }

    /// Stops the device's session and player task.
    ///
    /// Returns `false` if the device wasn't connected.
    pub async fn disconnect(&self, device_id: &DeviceId) -> bool {
        let session = self.inner.registry.get(device_id).await;
        if let Some(session) = &session {
            session.shutdown();
        }
        if let Some(player) = self.inner.players.lock().await.remove(device_id) {
            player.shutdown();
        }
        if session.is_some() {
            tracing::info!(%device_id, "device disconnected");
        }
        session.is_some()
    }

    /// Stops every session and player task.
    pub async fn shutdown(&self) {
        for info in self.inner.registry.devices().await {
            self.disconnect(&info.device_id).await;
        }
        for (_, player) in self.inner.players.lock().await.drain() {
            player.shutdown();
        }
        tracing::info!("stagelinq client shut down");
    }

    /// Removes the device's player task from the client and returns its
    /// handle, so the caller can [`join`](PlayerHandle::join) it and see
    /// why it ended.
    pub async fn take_player(&self, device_id: &DeviceId) -> Option<PlayerHandle> {
        self.inner.players.lock().await.remove(device_id)
    }

    /// Subscribes to `trackLoaded` / `nowPlaying` / `stateChanged` events
    /// from every player.
    pub fn subscribe_status(&self) -> broadcast::Receiver<PlayerEvent> {
        self.inner.player_events.subscribe()
    }

    /// Subscribes to every raw value update from every device.
    ///
    /// A subscriber that falls more than `statemap.event_capacity` events
    /// behind skips ahead; player reconstruction reads a separate lossless
    /// stream and is unaffected.
    pub fn subscribe_state(&self) -> broadcast::Receiver<StateEvent> {
        self.inner.registry.subscribe_state()
    }

    /// Subscribes to device connect/disconnect notifications.
    pub fn subscribe_devices(&self) -> broadcast::Receiver<DeviceEvent> {
        self.inner.registry.subscribe_devices()
    }

    /// Info for every connected device.
    pub async fn devices(&self) -> Vec<DeviceInfo> {
        self.inner.registry.devices().await
    }
}

impl Default for StageLinq {
    fn default() -> Self {
        Self::new()
    }
}

impl std::fmt::Debug for StageLinq {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("StageLinq")
            .field("config", &self.inner.config)
            .finish_non_exhaustive()
    }
}

/// Waits for a session to end, logs how, and stops the device's player
/// task unless a newer connection has taken over.
async fn watch_session(
    inner: Weak<ClientInner>,
    handle: StateMapHandle,
    task: JoinHandle<Result<(), StateMapError>>,
) {
    let device_id = handle.device_id();
    let connection_id = handle.connection_id();
    match task.await {
        Ok(Ok(())) => tracing::debug!(%device_id, %connection_id, "session finished"),
        Ok(Err(e)) => tracing::warn!(%device_id, %connection_id, error = %e, "session failed"),
        Err(e) => tracing::error!(%device_id, %connection_id, error = %e, "session task panicked"),
    }

    let Some(inner) = inner.upgrade() else {
        return;
    };
    if handle.is_retired() || inner.registry.get(&device_id).await.is_some() {
        return;
    }
    if let Some(player) = inner.players.lock().await.remove(&device_id) {
        tracing::debug!(%device_id, "stopping player task");
        player.shutdown();
    }
}
