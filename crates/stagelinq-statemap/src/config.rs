//! Session configuration and lifecycle phases.

use serde::{Deserialize, Serialize};
use stagelinq_protocol::DEFAULT_MAX_FRAME_LEN;
use stagelinq_transport::DEFAULT_READ_BUFFER_SIZE;

// ---------------------------------------------------------------------------
// StateMapConfig
// ---------------------------------------------------------------------------

/// Configuration for StateMap sessions and the registry they report to.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct StateMapConfig {
    /// Capacity of the registry's broadcast channels. Slow subscribers
    /// that fall further behind than this miss events (they see a
    /// `Lagged` error), the session itself never blocks on them.
    pub event_capacity: usize,

    /// Largest frame accepted from a device, in bytes.
    pub max_frame_len: usize,

    /// How many undecodable messages in a row end the session.
    pub max_consecutive_decode_errors: u32,

    /// Size of each socket read, in bytes, for connections the client
    /// opens itself.
    pub read_buffer_size: usize,
}

impl Default for StateMapConfig {
    fn default() -> Self {
        Self {
            event_capacity: 1024,
            max_frame_len: DEFAULT_MAX_FRAME_LEN,
            max_consecutive_decode_errors: 16,
            read_buffer_size: DEFAULT_READ_BUFFER_SIZE,
        }
    }
}

impl StateMapConfig {
    /// Smallest frame limit we accept; a subscribe for a long path
    /// already needs a couple of hundred bytes.
    pub const MIN_FRAME_LEN: usize = 256;

    /// Clamp any out-of-range values so the config is safe to use.
    pub fn validated(mut self) -> Self {
        if self.event_capacity == 0 {
            tracing::warn!("event_capacity of 0 is invalid, using 1");
            self.event_capacity = 1;
        }
        if self.max_frame_len < Self::MIN_FRAME_LEN {
            tracing::warn!(
                max_frame_len = self.max_frame_len,
                min = Self::MIN_FRAME_LEN,
                "max_frame_len too small, clamping"
            );
            self.max_frame_len = Self::MIN_FRAME_LEN;
        }
        if self.max_consecutive_decode_errors == 0 {
            self.max_consecutive_decode_errors = 1;
        }
        if self.read_buffer_size == 0 {
            tracing::warn!("read_buffer_size of 0 is invalid, using the default");
            self.read_buffer_size = DEFAULT_READ_BUFFER_SIZE;
        }
        self
    }
}

// ---------------------------------------------------------------------------
// SessionPhase
// ---------------------------------------------------------------------------

/// The lifecycle phase of a StateMap session.
///
/// Transitions are strictly ordered, and there's no way back:
///
/// ```text
/// Connected → Subscribing → Streaming → Closed
/// ```
///
/// - **Connected**: socket handed over, nothing sent yet.
/// - **Subscribing**: sending one subscribe per catalog path.
/// - **Streaming**: decoding and dispatching device messages.
/// - **Closed**: the session task has ended (socket closed, shutdown
///   requested, or a fatal error). Closing may happen from any phase.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SessionPhase {
    Connected,
    Subscribing,
    Streaming,
    Closed,
}

impl SessionPhase {
    /// The next phase in the normal progression, `None` once closed.
    pub fn next(self) -> Option<Self> {
        match self {
            Self::Connected => Some(Self::Subscribing),
            Self::Subscribing => Some(Self::Streaming),
            Self::Streaming => Some(Self::Closed),
            Self::Closed => None,
        }
    }

    /// Returns `true` if moving to `target` is allowed from here.
    pub fn can_transition_to(self, target: Self) -> bool {
        (target == Self::Closed && self != Self::Closed) || self.next() == Some(target)
    }
}

impl std::fmt::Display for SessionPhase {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Connected => write!(f, "Connected"),
            Self::Subscribing => write!(f, "Subscribing"),
            Self::Streaming => write!(f, "Streaming"),
            Self::Closed => write!(f, "Closed"),
        }
    }
}
