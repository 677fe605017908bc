//! Error types for player reconstruction.

use stagelinq_statemap::{DeviceId, UnitType};

/// Errors raised while turning state updates into player status.
#[derive(Debug, thiserror::Error)]
pub enum PlayerError {
    /// A deck-scoped path matched no row of the field table.
    ///
    /// The field table lists everything the engine understands about a
    /// deck, so this means the device sends state we don't model yet.
    /// It ends the device's reconstruction task.
    #[error("unrecognized state field: {path}")]
    UnrecognizedStateField { path: String },

    /// A known path carried the wrong kind of value. The update is
    /// skipped; the task keeps running.
    #[error("{path}: expected a {expected} payload, got {found}")]
    PayloadMismatch {
        path: String,
        expected: &'static str,
        found: &'static str,
    },

    /// Reconstruction was requested for a device that isn't a player.
    #[error("device {device_id} is a {unit_type}, not a player")]
    NotAPlayer {
        device_id: DeviceId,
        unit_type: UnitType,
    },

    /// The reconstruction task panicked or was aborted.
    #[error("player task failed: {0}")]
    TaskFailed(String),
}

impl PlayerError {
    /// Returns `true` for errors that end the reconstruction task.
    pub fn is_fatal(&self) -> bool {
        !matches!(self, Self::PayloadMismatch { .. })
    }
}
