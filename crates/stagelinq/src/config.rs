//! Client configuration.

use serde::{Deserialize, Serialize};
use stagelinq_player::QueueConfig;
use stagelinq_statemap::StateMapConfig;

use crate::StageLinqError;

/// Configuration for a [`StageLinq`](crate::StageLinq) client.
///
/// Every field has a default, so a config file only needs the values it
/// changes:
///
/// ```rust
/// use stagelinq::StageLinqConfig;
///
/// let config = StageLinqConfig::from_json(
///     r#"{ "queue": { "quiescence_window": { "secs": 0, "nanos": 50000000 } } }"#,
/// )
/// .unwrap();
/// assert_eq!(config.queue.quiescence_window.as_millis(), 50);
/// assert_eq!(config.event_capacity, 256);
/// ```
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct StageLinqConfig {
    /// StateMap sessions and the device registry.
    pub statemap: StateMapConfig,

    /// Per-deck update batching.
    pub queue: QueueConfig,

    /// Capacity of the player event channel.
    pub event_capacity: usize,
}

impl Default for StageLinqConfig {
    fn default() -> Self {
        Self {
            statemap: StateMapConfig::default(),
            queue: QueueConfig::default(),
            event_capacity: Self::DEFAULT_EVENT_CAPACITY,
        }
    }
}

impl StageLinqConfig {
    pub const DEFAULT_EVENT_CAPACITY: usize = 256;

    /// Parses a JSON config document. Missing fields take their defaults.
    pub fn from_json(json: &str) -> Result<Self, StageLinqError> {
        Ok(serde_json::from_str::<Self>(json)?.validated())
    }

    /// Clamp any out-of-range values so the config is safe to use.
    pub fn validated(mut self) -> Self {
        self.statemap = self.statemap.validated();
        self.queue = self.queue.validated();
        if self.event_capacity == 0 {
            tracing::warn!("event_capacity of 0 is invalid, using the default");
            self.event_capacity = Self::DEFAULT_EVENT_CAPACITY;
        }
        self
    }
}
