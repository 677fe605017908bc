//! # StageLinq
//!
//! Client for the StageLinq protocol spoken by networked DJ players and
//! mixers.
//!
//! The client subscribes to a device's StateMap service, decodes the
//! stream of state updates it pushes, and, for players, reconstructs
//! per-deck status: which track is loaded, whether it's playing, tempo,
//! and so on.
//!
//! ## Layers
//!
//! | crate                 | role                                          |
//! |-----------------------|-----------------------------------------------|
//! | `stagelinq-protocol`  | codec, framing, StateMap messages             |
//! | `stagelinq-transport` | byte-stream connections (TCP)                 |
//! | `stagelinq-statemap`  | sessions, subscription catalogs, registry     |
//! | `stagelinq-player`    | deck reconstruction and update batching       |
//! | `stagelinq`           | this crate: one entry point, config, logging  |
//!
//! ## Quick Start
//!
//! ```rust,no_run
//! use stagelinq::prelude::*;
//!
//! # async fn example() -> Result<(), StageLinqError> {
//! let client = StageLinq::new();
//! let mut status = client.subscribe_status();
//!
//! client
//!     .connect(DeviceInfo {
//!         device_id: "4be14112-5ead-4848-a07d-b37ca8a7220e".parse()?,
//!         unit_type: UnitType::Player,
//!         deck_count: 4,
//!         address: "192.168.1.50:51338".parse().unwrap(),
//!     })
//!     .await?;
//!
//! while let Ok(event) = status.recv().await {
//!     println!("{} {}: {:?}", event.kind, event.status.deck, event.status.state.title);
//! }
//! # Ok(())
//! # }
//! ```

mod client;
mod config;
mod error;
pub mod logging;

pub use client::{StageLinq, StageLinqBuilder};
pub use config::StageLinqConfig;
pub use error::StageLinqError;

pub use stagelinq_player::{
    Layer, PlayerError, PlayerEvent, PlayerEventKind, PlayerHandle, PlayerLayerState,
    PlayerStatus, QueueConfig,
};
pub use stagelinq_protocol::{ProtocolError, StateValue};
pub use stagelinq_statemap::{
    DeviceEvent, DeviceId, DeviceInfo, SessionPhase, StateEvent, StateMapConfig, StateMapError,
    StateMapHandle, UnitType,
};
pub use stagelinq_transport::{Connection, TcpConnection, TransportError};

/// Everything an application usually needs.
pub mod prelude {
    pub use crate::{
        DeviceEvent, DeviceId, DeviceInfo, PlayerEvent, PlayerEventKind, PlayerStatus, StageLinq,
        StageLinqConfig, StageLinqError, StateEvent, StateValue, UnitType,
    };
}
