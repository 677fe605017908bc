//! Wire protocol for StageLinq.
//!
//! This crate defines the bytes that travel between a StageLinq device and
//! this client:
//!
//! - **Codec** ([`ReadContext`], [`WriteContext`]): fixed strings,
//!   big-endian integers, and length-prefixed UTF-16 network strings.
//! - **Framing** ([`FrameDecoder`], [`encode_frame`]): the 4-byte length
//!   envelope that turns a TCP byte stream into discrete messages.
//! - **Messages** ([`StateMessage`], [`StateValue`]): the StateMap
//!   sub-protocol's value updates and interval polls.
//! - **Errors** ([`ProtocolError`]).
//!
//! # Architecture
//!
//! The protocol layer sits between transport (raw bytes) and the StateMap
//! session (typed messages). It knows nothing about sockets or devices.
//!
//! ```text
//! Transport (bytes) → Frame → StateMessage → StateMap session
//! ```

mod codec;
mod error;
mod frame;
mod message;

pub use codec::{ReadContext, WriteContext};
pub use error::ProtocolError;
pub use frame::{DEFAULT_MAX_FRAME_LEN, FrameDecoder, LENGTH_PREFIX_LEN, encode_frame};
pub use message::{
    MAGIC_MARKER, RESULT_REJECT, StateMessage, StateValue, TAG_INTERVAL, TAG_VALUE_UPDATE,
    encode_poll_response, encode_subscribe,
};
