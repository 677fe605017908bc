//! StateMap engine for StageLinq.
//!
//! StateMap is the sub-protocol a StageLinq device uses to publish its
//! state: every deck, fader, and preference is a `/`-delimited path with
//! a JSON value, and a client subscribes to the paths it cares about.
//!
//! This crate provides:
//!
//! - **[`spawn_session`]**: runs one device socket through subscribe and
//!   stream, decoding and dispatching every message.
//! - **[`StateMapHandle`]**: handle to a running session: path listeners,
//!   lifecycle phase, shutdown.
//! - **[`StateMapRegistry`]**: the live session for each [`DeviceId`],
//!   plus broadcast channels of [`StateEvent`]s and [`DeviceEvent`]s and
//!   lossless per-device [`StateEvent`] queues.
//! - **[`catalog`]**: the fixed lists of paths subscribed per [`UnitType`].
//!
//! # Architecture
//!
//! ```text
//! Connection ──► session task ──► listeners (per path)
//!                     │
//!                     └────────► registry ──► per-device StateEvent queues
//!                                         ├─► StateEvent broadcast
//!                                         └─► DeviceEvent broadcast
//! ```
//!
//! Sessions for different devices run on their own tasks and only share
//! the registry. Within one session, messages are decoded and dispatched
//! strictly in arrival order.
//!
//! # Example
//!
//! ```rust,no_run
//! use stagelinq_statemap::{
//!     DeviceId, DeviceInfo, StateMapConfig, StateMapRegistry, UnitType, spawn_session,
//! };
//! use stagelinq_transport::TcpConnection;
//!
//! # async fn example() -> Result<(), Box<dyn std::error::Error>> {
//! let address = "192.168.1.50:51338".parse()?;
//! let info = DeviceInfo {
//!     device_id: "4be14112-5ead-4848-a07d-b37ca8a7220e".parse()?,
//!     unit_type: UnitType::Player,
//!     deck_count: 4,
//!     address,
//! };
//!
//! let registry = StateMapRegistry::new(1024);
//! let mut events = registry.subscribe_state();
//!
//! let conn = TcpConnection::connect(address).await?;
//! let (_handle, _task) = spawn_session(conn, info, registry, StateMapConfig::default()).await;
//!
//! while let Ok(event) = events.recv().await {
//!     println!("{} {} = {:?}", event.device_id, event.path, event.value);
//! }
//! # Ok(())
//! # }
//! ```

pub mod catalog;
mod config;
mod device;
mod error;
mod handle;
mod registry;
mod session;

pub use config::{SessionPhase, StateMapConfig};
pub use device::{DeviceId, DeviceInfo, UnitType};
pub use error::StateMapError;
pub use handle::{DeviceEvent, StateEvent, StateMapHandle};
pub use registry::StateMapRegistry;
pub use session::spawn_session;
