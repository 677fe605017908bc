//! The device registry: which StateMap session is live for each device,
//! and the broadcast channels everything downstream subscribes to.
//!
//! # One live session per device
//!
//! A device can reconnect while its old socket is still half-open. The
//! registry keeps exactly one entry per [`DeviceId`]: registering a new
//! session replaces the old entry (last writer wins) and retires the old
//! handle. The old session isn't closed here, closing sockets is the
//! connection layer's business, but nothing it decodes is published any
//! more.
//!
//! # Concurrency
//!
//! The map sits behind a `tokio::sync::RwLock`, so insert-or-replace is a
//! single write-locked step and lookups never see a half-updated map.
//! Sessions for different devices only share this lock.
//!
//! # Lossy and lossless state streams
//!
//! [`subscribe_state`](StateMapRegistry::subscribe_state) is a broadcast
//! of every device's traffic: a subscriber that falls behind by more than
//! the channel capacity skips events. Consumers that must see every
//! update of one device, in order, use
//! [`subscribe_device`](StateMapRegistry::subscribe_device) instead, an
//! unbounded per-device queue that survives reconnects.

use std::collections::HashMap;
use std::sync::Arc;

use stagelinq_transport::ConnectionId;
use tokio::sync::{Mutex, RwLock, broadcast, mpsc};

use crate::{DeviceEvent, DeviceId, DeviceInfo, StateEvent, StateMapHandle};

type DeviceSubscribers = HashMap<DeviceId, Vec<mpsc::UnboundedSender<StateEvent>>>;

struct RegistryInner {
    handles: RwLock<HashMap<DeviceId, StateMapHandle>>,
    device_states: Mutex<DeviceSubscribers>,
    state_tx: broadcast::Sender<StateEvent>,
    device_tx: broadcast::Sender<DeviceEvent>,
}

/// Registry of live StateMap sessions, keyed by device.
///
/// Cloning gives another reference to the same registry. Pass it to
/// whatever needs to look up devices or subscribe to their events.
#[derive(Clone)]
pub struct StateMapRegistry {
    inner: Arc<RegistryInner>,
}

impl StateMapRegistry {
    /// Creates an empty registry whose broadcast channels hold up to
    /// `event_capacity` unread events per subscriber.
    pub fn new(event_capacity: usize) -> Self {
        let (state_tx, _) = broadcast::channel(event_capacity.max(1));
        let (device_tx, _) = broadcast::channel(event_capacity.max(1));
        Self {
            inner: Arc::new(RegistryInner {
                handles: RwLock::new(HashMap::new()),
                device_states: Mutex::new(HashMap::new()),
                state_tx,
                device_tx,
            }),
        }
    }

    /// Inserts `handle` as the live session for its device.
    ///
    /// Returns the handle it replaced, if any, after retiring it.
    pub async fn register(&self, handle: StateMapHandle) -> Option<StateMapHandle> {
        let info = handle.info().clone();
        let replaced = {
            let mut handles = self.inner.handles.write().await;
            handles.insert(info.device_id, handle)
        };

        if let Some(old) = &replaced {
            old.retire();
        }

        tracing::info!(
            device_id = %info.device_id,
            unit_type = %info.unit_type,
            address = %info.address,
            replaced = replaced.is_some(),
            "statemap device registered"
        );
        let _ = self.inner.device_tx.send(DeviceEvent::Connected(info));
        replaced
    }

    /// Removes the entry for `device_id`, but only if it still belongs to
    /// `connection_id`. A session that was replaced can't unregister its
    /// successor.
    ///
    /// Returns `true` if an entry was removed.
    pub async fn unregister(&self, device_id: &DeviceId, connection_id: ConnectionId) -> bool {
        let removed = {
            let mut handles = self.inner.handles.write().await;
            match handles.get(device_id) {
                Some(h) if h.connection_id() == connection_id => {
                    handles.remove(device_id);
                    true
                }
                _ => false,
            }
        };

        if removed {
            tracing::info!(%device_id, %connection_id, "statemap device unregistered");
            let _ = self.inner.device_tx.send(DeviceEvent::Disconnected(*device_id));
        }
        removed
    }

    /// Returns the live session handle for a device.
    pub async fn get(&self, device_id: &DeviceId) -> Option<StateMapHandle> {
        self.inner.handles.read().await.get(device_id).cloned()
    }

    /// Returns `true` if `connection_id` is the live session for `device_id`.
    pub async fn is_current(&self, device_id: &DeviceId, connection_id: ConnectionId) -> bool {
        self.inner
            .handles
            .read()
            .await
            .get(device_id)
            .is_some_and(|h| h.connection_id() == connection_id)
    }

    /// Info for every registered device.
    pub async fn devices(&self) -> Vec<DeviceInfo> {
        self.inner
            .handles
            .read()
            .await
            .values()
            .map(|h| h.info().clone())
            .collect()
    }

    /// Number of registered devices.
    pub async fn len(&self) -> usize {
        self.inner.handles.read().await.len()
    }

    /// Returns `true` if no device is registered.
    pub async fn is_empty(&self) -> bool {
        self.inner.handles.read().await.is_empty()
    }

    /// Subscribes to every value update from every live session.
    pub fn subscribe_state(&self) -> broadcast::Receiver<StateEvent> {
        self.inner.state_tx.subscribe()
    }

    /// Subscribes to every value update from one device, without loss.
    ///
    /// Events arrive in the order the device's live session decoded them,
    /// across reconnects. Dropping the receiver unsubscribes.
    pub async fn subscribe_device(&self, device_id: DeviceId) -> mpsc::UnboundedReceiver<StateEvent> {
        let (tx, rx) = mpsc::unbounded_channel();
        self.inner
            .device_states
            .lock()
            .await
            .entry(device_id)
            .or_default()
            .push(tx);
        rx
    }

    /// Subscribes to device connect/disconnect notifications.
    pub fn subscribe_devices(&self) -> broadcast::Receiver<DeviceEvent> {
        self.inner.device_tx.subscribe()
    }

    /// Publishes a value update to the device's subscribers and the
    /// broadcast channel. Having no subscribers is fine.
    pub(crate) async fn publish_state(&self, event: StateEvent) {
        {
            let mut device_states = self.inner.device_states.lock().await;
            if let Some(senders) = device_states.get_mut(&event.device_id) {
                senders.retain(|tx| tx.send(event.clone()).is_ok());
                if senders.is_empty() {
                    device_states.remove(&event.device_id);
                }
            }
        }
        let _ = self.inner.state_tx.send(event);
    }
}

impl std::fmt::Debug for StateMapRegistry {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("StateMapRegistry").finish_non_exhaustive()
    }
}
