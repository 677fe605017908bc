//! Player state reconstruction for StageLinq.
//!
//! A player device doesn't send "deck 2 loaded *Song* by *Artist*". It
//! sends a stream of flat StateMap updates (`/Engine/Deck2/Track/SongName`,
//! `/Engine/Deck2/Track/ArtistName`, ...) and leaves it to the client to
//! put decks back together. This crate does that:
//!
//! - **[`classify`]** maps a path and value to a player-wide value or a
//!   field of one deck, through the ordered [`FIELD_TABLE`].
//! - **[`DeckQueue`]** batches one deck's updates and merges each batch
//!   into the deck's snapshot.
//! - **[`spawn_player`]** runs the whole pipeline for one device and emits
//!   a [`PlayerEvent`] per batch.
//!
//! # Events
//!
//! Every batch produces exactly one event, carrying the deck's complete
//! [`PlayerStatus`]:
//!
//! | kind                               | when                                 |
//! |------------------------------------|--------------------------------------|
//! | [`TrackLoaded`](PlayerEventKind::TrackLoaded)   | the batch contained `SongLoaded` |
//! | [`NowPlaying`](PlayerEventKind::NowPlaying)     | the deck's `playState` is true   |
//! | [`StateChanged`](PlayerEventKind::StateChanged) | anything else                    |

mod error;
mod fields;
mod layer;
mod player;
mod queue;

pub use error::PlayerError;
pub use fields::{Classification, FIELD_TABLE, FieldRow, Matcher, classify, resolve_layer};
pub use layer::{FieldValue, Layer, LayerUpdate, PlayerLayerState};
pub use player::{PlayerEvent, PlayerEventKind, PlayerHandle, PlayerStatus, spawn_player};
pub use queue::{DeckFlush, DeckQueue, QueueConfig, spawn_deck_queue};
