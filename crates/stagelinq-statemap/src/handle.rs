//! Handle to a running StateMap session, and the events it produces.

use std::collections::HashMap;
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};

use stagelinq_protocol::StateValue;
use stagelinq_transport::ConnectionId;
use tokio::sync::{Mutex, mpsc, watch};

use crate::{DeviceId, DeviceInfo, SessionPhase};

/// One decoded value update, tagged with the device it came from.
///
/// This is the generic "state message" event: every value update a
/// session decodes is published as one of these, whatever it means.
#[derive(Debug, Clone, PartialEq)]
pub struct StateEvent {
    pub device_id: DeviceId,
    pub path: String,
    pub value: StateValue,
}

/// Device lifecycle notifications published by the registry.
#[derive(Debug, Clone, PartialEq)]
pub enum DeviceEvent {
    /// A session was registered for this device (new, or replacing an
    /// older connection).
    Connected(DeviceInfo),
    /// The device's live session ended.
    Disconnected(DeviceId),
}

type Listeners = HashMap<String, Vec<mpsc::UnboundedSender<StateEvent>>>;

/// Handle to a running StateMap session.
///
/// Cheap to clone: all the shared parts sit behind `Arc`s. The registry
/// holds one per device, the caller that started the session holds
/// another.
#[derive(Clone)]
pub struct StateMapHandle {
    info: DeviceInfo,
    connection_id: ConnectionId,
    listeners: Arc<Mutex<Listeners>>,
    shutdown: Arc<watch::Sender<bool>>,
    phase: Arc<watch::Sender<SessionPhase>>,
    retired: Arc<AtomicBool>,
}

impl StateMapHandle {
    pub(crate) fn new(info: DeviceInfo, connection_id: ConnectionId) -> Self {
        let (shutdown, _) = watch::channel(false);
        let (phase, _) = watch::channel(SessionPhase::Connected);
        Self {
            info,
            connection_id,
            listeners: Arc::new(Mutex::new(HashMap::new())),
            shutdown: Arc::new(shutdown),
            phase: Arc::new(phase),
            retired: Arc::new(AtomicBool::new(false)),
        }
    }

    /// The device this session talks to.
    pub fn info(&self) -> &DeviceInfo {
        &self.info
    }

    /// Shorthand for `info().device_id`.
    pub fn device_id(&self) -> DeviceId {
        self.info.device_id
    }

    /// The connection this session owns.
    pub fn connection_id(&self) -> ConnectionId {
        self.connection_id
    }

    /// Registers a listener for one exact state path.
    ///
    /// Every value update for `path` on this connection is delivered to the
    /// returned receiver, in arrival order. Dropping the receiver
    /// unregisters it.
    pub async fn listen(&self, path: &str) -> mpsc::UnboundedReceiver<StateEvent> {
        let (tx, rx) = mpsc::unbounded_channel();
        self.listeners
            .lock()
            .await
            .entry(path.to_string())
            .or_default()
            .push(tx);
        rx
    }

    /// Delivers an event to the listeners of its path, pruning any whose
    /// receiver is gone.
    pub(crate) async fn notify_listeners(&self, event: &StateEvent) {
        let mut listeners = self.listeners.lock().await;
        let Some(senders) = listeners.get_mut(&event.path) else {
            return;
        };
        senders.retain(|tx| tx.send(event.clone()).is_ok());
        if senders.is_empty() {
            listeners.remove(&event.path);
        }
    }

    /// Asks the session to stop.
    ///
    /// The session stops before processing any further buffered frames and
    /// closes its socket. Idempotent.
    pub fn shutdown(&self) {
        self.shutdown.send_replace(true);
    }

    /// Returns `true` once [`shutdown`](Self::shutdown) has been called.
    pub fn is_shutdown_requested(&self) -> bool {
        *self.shutdown.borrow()
    }

    pub(crate) fn shutdown_receiver(&self) -> watch::Receiver<bool> {
        self.shutdown.subscribe()
    }

    /// The session's current lifecycle phase.
    pub fn phase(&self) -> SessionPhase {
        *self.phase.borrow()
    }

    /// Waits until the session reaches `target` (or closes).
    ///
    /// Returns the phase actually reached.
    pub async fn wait_for_phase(&self, target: SessionPhase) -> SessionPhase {
        let mut rx = self.phase.subscribe();
        match rx
            .wait_for(|&phase| phase == target || phase == SessionPhase::Closed)
            .await
        {
            Ok(phase) => *phase,
            Err(_) => SessionPhase::Closed,
        }
    }

    pub(crate) fn set_phase(&self, phase: SessionPhase) {
        let current = self.phase();
        if current.can_transition_to(phase) {
            tracing::debug!(
                device_id = %self.info.device_id,
                from = %current,
                to = %phase,
                "statemap session phase"
            );
            self.phase.send_replace(phase);
        }
    }

    /// Marks this handle as replaced by a newer connection for the same
    /// device. Its session keeps running until its socket closes, but the
    /// registry no longer publishes its traffic.
    pub(crate) fn retire(&self) {
        if !self.retired.swap(true, Ordering::AcqRel) {
            tracing::info!(
                device_id = %self.info.device_id,
                connection_id = %self.connection_id,
                "statemap connection replaced by a newer one"
            );
        }
    }

    /// Returns `true` if a newer connection replaced this one.
    pub fn is_retired(&self) -> bool {
        self.retired.load(Ordering::Acquire)
    }
}

impl std::fmt::Debug for StateMapHandle {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("StateMapHandle")
            .field("device_id", &self.info.device_id)
            .field("connection_id", &self.connection_id)
            .field("phase", &self.phase())
            .finish()
    }
}
