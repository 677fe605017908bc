//! Per-deck update batching.
//!
//! Loading a track makes a player fire a burst of separate updates:
//! title, artist, file path, `SongLoaded`, and so on, a few milliseconds
//! apart. Emitting a status for each of them would hand consumers a
//! string of half-updated decks. Instead every deck has a queue that
//! collects updates and flushes them as one batch:
//!
//! - when no new update has arrived for the **quiescence window**;
//! - at once, when a flush-forcing update (`SongLoaded`) arrives;
//! - when the oldest pending update has waited **max batch delay**, so a
//!   field that changes continuously (a moving fader) can't hold the deck
//!   back forever.
//!
//! On flush, the batch is merged into the deck's snapshot. A batch that
//! contains `SongLoaded` is a new track: the old snapshot is thrown away
//! and the batch alone becomes the new one. Any other batch overwrites
//! only the fields it names.
//!
//! [`DeckQueue`] is the synchronous core, driven with explicit instants so
//! it can be tested without a runtime. [`spawn_deck_queue`] wraps it in a
//! task with timers.

use std::time::Duration;

use serde::{Deserialize, Serialize};
use tokio::sync::mpsc;
use tokio::task::JoinHandle;
use tokio::time::{self, Instant};

use crate::{Layer, LayerUpdate, PlayerLayerState};

// ---------------------------------------------------------------------------
// QueueConfig
// ---------------------------------------------------------------------------

/// Timing of the per-deck queues.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct QueueConfig {
    /// Idle time after which pending updates are flushed.
    pub quiescence_window: Duration,

    /// Longest an update may wait in the queue, however busy the deck is.
    pub max_batch_delay: Duration,
}

impl Default for QueueConfig {
    fn default() -> Self {
        Self {
            quiescence_window: Duration::from_millis(25),
            max_batch_delay: Duration::from_millis(250),
        }
    }
}

impl QueueConfig {
    /// Clamp any out-of-range values so the config is safe to use.
    ///
    /// `max_batch_delay` is raised to at least the quiescence window.
    pub fn validated(mut self) -> Self {
        if self.quiescence_window.is_zero() {
            tracing::warn!("quiescence_window of 0 is invalid, using 1ms");
            self.quiescence_window = Duration::from_millis(1);
        }
        if self.max_batch_delay < self.quiescence_window {
            tracing::warn!(
                max_batch_delay_ms = self.max_batch_delay.as_millis() as u64,
                quiescence_window_ms = self.quiescence_window.as_millis() as u64,
                "max_batch_delay shorter than quiescence_window, raising it"
            );
            self.max_batch_delay = self.quiescence_window;
        }
        self
    }
}

// ---------------------------------------------------------------------------
// DeckQueue
// ---------------------------------------------------------------------------

/// Result of one flush: the deck's merged snapshot.
#[derive(Debug, Clone, PartialEq)]
pub struct DeckFlush {
    /// Full state of the deck after the merge.
    pub state: PlayerLayerState,
    /// Whether the batch contained `SongLoaded` (and so replaced the
    /// snapshot rather than patching it).
    pub song_loaded: bool,
}

/// Pending updates and the merged snapshot for one deck.
#[derive(Debug)]
pub struct DeckQueue {
    layer: Layer,
    config: QueueConfig,
    snapshot: PlayerLayerState,
    pending: Vec<LayerUpdate>,
    first_pending_at: Option<Instant>,
    last_pending_at: Option<Instant>,
    forced: bool,
}

impl DeckQueue {
    pub fn new(layer: Layer, config: QueueConfig) -> Self {
        Self {
            layer,
            config: config.validated(),
            snapshot: PlayerLayerState::new(layer),
            pending: Vec::new(),
            first_pending_at: None,
            last_pending_at: None,
            forced: false,
        }
    }

    pub fn layer(&self) -> Layer {
        self.layer
    }

    /// The deck's state as of the last flush.
    pub fn snapshot(&self) -> &PlayerLayerState {
        &self.snapshot
    }

    /// Number of updates waiting for the next flush.
    pub fn pending_len(&self) -> usize {
        self.pending.len()
    }

    /// Adds an update received at `now` and restarts the quiescence window.
    pub fn push(&mut self, update: LayerUpdate, now: Instant) {
        debug_assert_eq!(update.layer, self.layer);
        self.forced |= update.field.is_flush_forcing();
        self.first_pending_at.get_or_insert(now);
        self.last_pending_at = Some(now);
        self.pending.push(update);
    }

    /// Returns `true` if a flush-forcing update is pending.
    pub fn is_flush_forced(&self) -> bool {
        self.forced
    }

    /// When the pending batch is due, `None` if nothing is pending.
    pub fn deadline(&self) -> Option<Instant> {
        let last = self.last_pending_at?;
        let first = self.first_pending_at?;
        Some((last + self.config.quiescence_window).min(first + self.config.max_batch_delay))
    }

    /// Returns `true` if the batch should be flushed at `now`.
    pub fn is_due(&self, now: Instant) -> bool {
        self.forced || self.deadline().is_some_and(|deadline| now >= deadline)
    }

    /// Merges the pending batch into the snapshot and returns the result.
    ///
    /// Returns `None` if nothing was pending.
    pub fn flush(&mut self) -> Option<DeckFlush> {
        if self.pending.is_empty() {
            return None;
        }

        let batch = std::mem::take(&mut self.pending);
        self.first_pending_at = None;
        self.last_pending_at = None;
        self.forced = false;

        let song_loaded = batch.iter().any(|u| u.field.is_flush_forcing());
        if song_loaded {
            self.snapshot = PlayerLayerState::new(self.layer);
        }
        for update in &batch {
            self.snapshot.apply(&update.field);
        }

        tracing::trace!(
            layer = %self.layer,
            updates = batch.len(),
            song_loaded,
            "deck flushed"
        );
        Some(DeckFlush {
            state: self.snapshot.clone(),
            song_loaded,
        })
    }
}

// ---------------------------------------------------------------------------
// Queue task
// ---------------------------------------------------------------------------

/// Sleeps until `deadline`, or forever if there is none.
async fn wait_for_deadline(deadline: Option<Instant>) {
    match deadline {
        Some(deadline) => time::sleep_until(deadline).await,
        None => std::future::pending::<()>().await,
    }
}

/// Runs `queue` on its own task.
///
/// Updates sent on the returned channel are batched; every flush is sent
/// to `flushes`. The task ends, dropping anything still pending, when the
/// update sender is dropped or the flush receiver goes away.
pub fn spawn_deck_queue(
    mut queue: DeckQueue,
    flushes: mpsc::UnboundedSender<DeckFlush>,
) -> (mpsc::UnboundedSender<LayerUpdate>, JoinHandle<()>) {
    let (tx, mut rx) = mpsc::unbounded_channel::<LayerUpdate>();

    let task = tokio::spawn(async move {
        let layer = queue.layer();
        tracing::debug!(%layer, "deck queue started");

        loop {
            tokio::select! {
                update = rx.recv() => {
                    let Some(update) = update else {
                        break;
                    };
                    queue.push(update, Instant::now());
                    if !queue.is_flush_forced() {
                        continue;
                    }
                }
                _ = wait_for_deadline(queue.deadline()) => {}
            }

            if let Some(flush) = queue.flush() {
                if flushes.send(flush).is_err() {
                    break;
                }
            }
        }

        if queue.pending_len() > 0 {
            tracing::debug!(%layer, dropped = queue.pending_len(), "deck queue stopped with pending updates");
        } else {
            tracing::debug!(%layer, "deck queue stopped");
        }
    });

    (tx, task)
}
