//! The reconstruction task for one player device.
//!
//! Follows the actor pattern: a single task owns all of a player's state
//! (its index, the sync master values, one queue per deck) and the outside
//! world talks to it through a [`PlayerHandle`].
//!
//! ```text
//! device StateEvents ───► player task ──► deck queue A ─┐
//!                              ▲        ├─► deck queue B ─┤
//!                              │        └─► ...          │
//!                              └──────── DeckFlush ◄─────┘
//!                              │
//!                              └──► PlayerEvent broadcast
//! ```
//!
//! Deck queues are spawned the first time their deck sees an update.
//! Every flush is turned into exactly one [`PlayerEvent`] carrying a full
//! [`PlayerStatus`], so consumers never need an earlier event to make
//! sense of a later one.

use std::collections::HashMap;
use std::net::IpAddr;

use serde::Serialize;
use stagelinq_statemap::{DeviceId, DeviceInfo, StateEvent, UnitType};
use tokio::sync::{broadcast, mpsc, watch};
use tokio::task::JoinHandle;

use crate::queue::{DeckFlush, DeckQueue, QueueConfig, spawn_deck_queue};
use crate::{
    Classification, Layer, LayerUpdate, PlayerError, PlayerLayerState, classify, resolve_layer,
};

// ---------------------------------------------------------------------------
// Events
// ---------------------------------------------------------------------------

/// Which of the three player events a flush produced.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub enum PlayerEventKind {
    /// The batch contained `SongLoaded`: a new track is on the deck.
    TrackLoaded,
    /// The deck is playing.
    NowPlaying,
    /// Anything else changed.
    StateChanged,
}

impl PlayerEventKind {
    /// Event name as consumers know it.
    pub fn name(self) -> &'static str {
        match self {
            Self::TrackLoaded => "trackLoaded",
            Self::NowPlaying => "nowPlaying",
            Self::StateChanged => "stateChanged",
        }
    }

    /// Picks the event for a flush. `SongLoaded` wins over play state.
    pub fn for_flush(flush: &DeckFlush) -> Self {
        if flush.song_loaded {
            Self::TrackLoaded
        } else if flush.state.play_state == Some(true) {
            Self::NowPlaying
        } else {
            Self::StateChanged
        }
    }
}

impl std::fmt::Display for PlayerEventKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.name())
    }
}

/// Complete status of one deck of one player.
///
/// Serializes as one flat object: the deck's fields sit next to `deck`,
/// `player`, `address` and the master values.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct PlayerStatus {
    /// Player index followed by the deck letter, e.g. `"2A"`. Just the
    /// letter while the player index is unknown.
    pub deck: String,
    pub player: Option<u32>,
    /// Same as `state.layer`, which carries it when serialized.
    #[serde(skip_serializing)]
    pub layer: Layer,
    pub device_id: DeviceId,
    pub address: IpAddr,
    pub port: u16,
    pub master_tempo: Option<f64>,
    pub master_status: Option<bool>,
    #[serde(flatten)]
    pub state: PlayerLayerState,
}

/// A player event: what happened, and the deck's full status afterwards.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct PlayerEvent {
    pub kind: PlayerEventKind,
    pub status: PlayerStatus,
}

// ---------------------------------------------------------------------------
// PlayerHandle
// ---------------------------------------------------------------------------

/// Handle to a running reconstruction task.
///
/// Dropping the handle stops the task, as [`shutdown`](Self::shutdown)
/// does.
pub struct PlayerHandle {
    device_id: DeviceId,
    events: broadcast::Sender<PlayerEvent>,
    shutdown: watch::Sender<bool>,
    task: JoinHandle<Result<(), PlayerError>>,
}

impl PlayerHandle {
    pub fn device_id(&self) -> DeviceId {
        self.device_id
    }

    /// Subscribes to the event channel this player emits on.
    ///
    /// If several players share one channel (as the client does), the
    /// receiver sees all of their events.
    pub fn subscribe(&self) -> broadcast::Receiver<PlayerEvent> {
        self.events.subscribe()
    }

    /// Stops the task. Flushes that haven't been emitted yet are dropped.
    pub fn shutdown(&self) {
        self.shutdown.send_replace(true);
    }

    /// Returns `true` once the task has ended.
    pub fn is_finished(&self) -> bool {
        self.task.is_finished()
    }

    /// Waits for the task to end.
    ///
    /// Returns the error that ended it, such as
    /// [`PlayerError::UnrecognizedStateField`].
    pub async fn join(self) -> Result<(), PlayerError> {
        match self.task.await {
            Ok(result) => result,
            Err(e) => Err(PlayerError::TaskFailed(e.to_string())),
        }
    }
}

impl std::fmt::Debug for PlayerHandle {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("PlayerHandle")
            .field("device_id", &self.device_id)
            .field("finished", &self.task.is_finished())
            .finish()
    }
}

/// Starts reconstructing player state for `info`.
///
/// The task reads value updates for `info.device_id` from `states`, a
/// lossless per-device stream such as
/// [`StateMapRegistry::subscribe_device`](stagelinq_statemap::StateMapRegistry::subscribe_device)
/// (other devices' events are skipped), and
/// emits on `events`.
///
/// # Errors
/// [`PlayerError::NotAPlayer`] unless `info` describes a `PLAYER` unit.
pub fn spawn_player(
    info: DeviceInfo,
    states: mpsc::UnboundedReceiver<StateEvent>,
    events: broadcast::Sender<PlayerEvent>,
    config: QueueConfig,
) -> Result<PlayerHandle, PlayerError> {
    if info.unit_type != UnitType::Player {
        return Err(PlayerError::NotAPlayer {
            device_id: info.device_id,
            unit_type: info.unit_type,
        });
    }

    let (shutdown_tx, shutdown_rx) = watch::channel(false);
    let (flush_tx, flush_rx) = mpsc::unbounded_channel();
    let device_id = info.device_id;

    let actor = PlayerActor {
        info,
        config: config.validated(),
        player: None,
        master_tempo: None,
        master_status: None,
        queues: HashMap::new(),
        flush_tx,
        events: events.clone(),
    };
    let task = tokio::spawn(actor.run(states, flush_rx, shutdown_rx));

    Ok(PlayerHandle {
        device_id,
        events,
        shutdown: shutdown_tx,
        task,
    })
}

// ---------------------------------------------------------------------------
// Actor
// ---------------------------------------------------------------------------

struct DeckHandle {
    updates: mpsc::UnboundedSender<LayerUpdate>,
    queue: JoinHandle<()>,
}

struct PlayerActor {
    info: DeviceInfo,
    config: QueueConfig,
    player: Option<u32>,
    master_tempo: Option<f64>,
    master_status: Option<bool>,
    queues: HashMap<Layer, DeckHandle>,
    flush_tx: mpsc::UnboundedSender<DeckFlush>,
    events: broadcast::Sender<PlayerEvent>,
}

/// Resolves once shutdown has been requested, or the handle is gone.
async fn shutdown_requested(rx: &mut watch::Receiver<bool>) {
    while !*rx.borrow_and_update() {
        if rx.changed().await.is_err() {
            return;
        }
    }
}

impl PlayerActor {
    async fn run(
        mut self,
        mut states: mpsc::UnboundedReceiver<StateEvent>,
        mut flushes: mpsc::UnboundedReceiver<DeckFlush>,
        mut shutdown: watch::Receiver<bool>,
    ) -> Result<(), PlayerError> {
        let device_id = self.info.device_id;
        tracing::info!(%device_id, address = %self.info.address, "player reconstruction started");

        let result = loop {
            tokio::select! {
                biased;
                _ = shutdown_requested(&mut shutdown) => {
                    tracing::debug!(%device_id, "player reconstruction shutting down");
                    break Ok(());
                }
                Some(flush) = flushes.recv() => self.emit(flush),
                received = states.recv() => match received {
                    Some(event) if event.device_id == device_id => {
                        if let Err(e) = self.handle_state(&event) {
                            break Err(e);
                        }
                    }
                    Some(_) => {}
                    None => {
                        tracing::debug!(%device_id, "state stream closed");
                        break Ok(());
                    }
                },
            }
        };

        for deck in self.queues.values() {
            deck.queue.abort();
        }

        match &result {
            Ok(()) => tracing::info!(%device_id, "player reconstruction stopped"),
            Err(e) => tracing::error!(%device_id, error = %e, "player reconstruction failed"),
        }
        result
    }

    fn handle_state(&mut self, event: &StateEvent) -> Result<(), PlayerError> {
        let device_id = self.info.device_id;
        if let Some(layer) = resolve_layer(&event.path) {
            if !self.has_deck(layer) {
                tracing::trace!(
                    %device_id,
                    path = %event.path,
                    deck_count = self.info.deck_count,
                    "deck not present on this unit"
                );
                return Ok(());
            }
        }

        let classification = match classify(&event.path, &event.value) {
            Ok(c) => c,
            Err(e) if e.is_fatal() => return Err(e),
            Err(e) => {
                tracing::warn!(%device_id, error = %e, "skipping state update");
                return Ok(());
            }
        };

        match classification {
            Classification::PlayerIndex(index) => {
                tracing::debug!(%device_id, player = index, "player index");
                self.player = Some(index);
            }
            Classification::MasterTempo(tempo) => self.master_tempo = Some(tempo),
            Classification::MasterStatus(status) => self.master_status = Some(status),
            Classification::Deck(update) => {
                tracing::trace!(
                    %device_id,
                    layer = %update.layer,
                    field = update.field.name(),
                    "deck update"
                );
                self.push(update);
            }
            Classification::Ignored => {
                tracing::trace!(%device_id, path = %event.path, "no deck for path");
            }
        }
        Ok(())
    }

    /// A deck count of 0 means the unit didn't say; every deck is kept.
    fn has_deck(&self, layer: Layer) -> bool {
        self.info.deck_count == 0 || layer.deck_number() <= self.info.deck_count
    }

    fn push(&mut self, update: LayerUpdate) {
        let layer = update.layer;
        if !self.queues.contains_key(&layer) {
            let deck = self.spawn_deck(layer);
            self.queues.insert(layer, deck);
        }
        if let Some(deck) = self.queues.get(&layer) {
            // The queue only stops once this sender is dropped.
            let _ = deck.updates.send(update);
        }
    }

    fn spawn_deck(&self, layer: Layer) -> DeckHandle {
        tracing::debug!(device_id = %self.info.device_id, %layer, "starting deck queue");
        let queue = DeckQueue::new(layer, self.config.clone());
        let (updates, queue) = spawn_deck_queue(queue, self.flush_tx.clone());
        DeckHandle { updates, queue }
    }

    fn emit(&self, flush: DeckFlush) {
        let kind = PlayerEventKind::for_flush(&flush);
        let status = self.status(flush.state);
        tracing::debug!(
            device_id = %self.info.device_id,
            deck = %status.deck,
            event = %kind,
            "player event"
        );
        let _ = self.events.send(PlayerEvent { kind, status });
    }

    fn status(&self, state: PlayerLayerState) -> PlayerStatus {
        let layer = state.layer;
        let deck = match self.player {
            Some(player) => format!("{player}{layer}"),
            None => layer.to_string(),
        };
        PlayerStatus {
            deck,
            player: self.player,
            layer,
            device_id: self.info.device_id,
            address: self.info.address.ip(),
            port: self.info.address.port(),
            master_tempo: self.master_tempo,
            master_status: self.master_status,
            state,
        }
    }
}
