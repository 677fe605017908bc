//! StateMap message types and their wire encoding.
//!
//! Inside a frame, every StateMap message looks like this:
//!
//! ```text
//! ["smaa"][u32 type tag][payload]
//! ```
//!
//! | tag          | meaning      | payload                                     |
//! |--------------|--------------|---------------------------------------------|
//! | `0x00000000` | value update | path (network string), JSON (network string)|
//! | `0x000007d2` | interval     | path (network string), interval (`i32`)     |
//!
//! The interval tag is used in both directions: the client sends it to
//! subscribe to a path (interval `0` means "push on change"), and the
//! device sends it to ask whether it may poll a path. Polls are answered
//! with a value-update tag carrying a result code instead of JSON; see
//! [`encode_poll_response`].

use serde::Deserialize;
use serde_json::{Map, Value};

use crate::{ProtocolError, ReadContext, WriteContext};

/// Marker that starts every StateMap message.
pub const MAGIC_MARKER: &str = "smaa";

/// Type tag of a value update (and of a poll response).
pub const TAG_VALUE_UPDATE: u32 = 0x0000_0000;

/// Type tag of a subscribe request / interval poll.
pub const TAG_INTERVAL: u32 = 0x0000_07d2;

/// Result code sent in a poll response: "don't poll this path".
pub const RESULT_REJECT: u32 = 0xffff_ffff;

// ---------------------------------------------------------------------------
// StateValue
// ---------------------------------------------------------------------------

/// The value carried by a [`StateMessage::ValueUpdate`].
///
/// On the wire this is a JSON object, and which kind of value it holds is
/// decided by which key is present:
///
/// | JSON                        | variant             |
/// |-----------------------------|---------------------|
/// | `{"string": "2"}`           | `String("2")`       |
/// | `{"value": 128.0}`          | `Number(128.0)`     |
/// | `{"state": true}`           | `State(true)`       |
/// | `{"color": "#ff00aaff"}`    | `Color("#ff00aaff")`|
///
/// Devices also send a numeric `type` key alongside; it's ignored.
#[derive(Debug, Clone, PartialEq)]
pub enum StateValue {
    String(String),
    Number(f64),
    State(bool),
    Color(String),
}

/// Raw shape of the JSON payload, before we check that exactly one value
/// key is present.
#[derive(Deserialize)]
struct JsonPayload {
    string: Option<String>,
    value: Option<f64>,
    state: Option<bool>,
    color: Option<String>,
}

impl StateValue {
    /// Parses the JSON payload of a value update.
    ///
    /// # Errors
    /// [`ProtocolError::Json`] for malformed JSON or a mistyped key,
    /// [`ProtocolError::InvalidPayload`] when zero or several value keys
    /// are present.
    pub fn from_json(json: &str) -> Result<Self, ProtocolError> {
        let raw: JsonPayload = serde_json::from_str(json)?;

        let mut found = Vec::with_capacity(1);
        if let Some(s) = raw.string {
            found.push(Self::String(s));
        }
        if let Some(v) = raw.value {
            found.push(Self::Number(v));
        }
        if let Some(b) = raw.state {
            found.push(Self::State(b));
        }
        if let Some(c) = raw.color {
            found.push(Self::Color(c));
        }

        match found.len() {
            1 => Ok(found.remove(0)),
            0 => Err(ProtocolError::InvalidPayload(format!(
                "no value key in {json}"
            ))),
            n => Err(ProtocolError::InvalidPayload(format!(
                "{n} value keys in {json}"
            ))),
        }
    }

    /// Serializes the value as the single-key JSON object devices expect.
    pub fn to_json(&self) -> Result<String, ProtocolError> {
        let (key, value) = match self {
            Self::String(s) => ("string", Value::from(s.as_str())),
            Self::Number(n) => ("value", Value::from(*n)),
            Self::State(b) => ("state", Value::from(*b)),
            Self::Color(c) => ("color", Value::from(c.as_str())),
        };
        let mut map = Map::new();
        map.insert(key.to_string(), value);
        Ok(serde_json::to_string(&Value::Object(map))?)
    }

    /// The string payload, if this is a `String`.
    pub fn as_str(&self) -> Option<&str> {
        match self {
            Self::String(s) => Some(s),
            _ => None,
        }
    }

    /// The numeric payload, if this is a `Number`.
    pub fn as_f64(&self) -> Option<f64> {
        match self {
            Self::Number(n) => Some(*n),
            _ => None,
        }
    }

    /// The boolean payload, if this is a `State`.
    pub fn as_bool(&self) -> Option<bool> {
        match self {
            Self::State(b) => Some(*b),
            _ => None,
        }
    }

    /// The colour payload, if this is a `Color`.
    pub fn as_color(&self) -> Option<&str> {
        match self {
            Self::Color(c) => Some(c),
            _ => None,
        }
    }

    /// Short name of the variant, for logs and error messages.
    pub fn kind(&self) -> &'static str {
        match self {
            Self::String(_) => "string",
            Self::Number(_) => "value",
            Self::State(_) => "state",
            Self::Color(_) => "color",
        }
    }
}

// ---------------------------------------------------------------------------
// StateMessage
// ---------------------------------------------------------------------------

/// A decoded StateMap message.
#[derive(Debug, Clone, PartialEq)]
pub enum StateMessage {
    /// A state path changed value.
    ValueUpdate { path: String, value: StateValue },

    /// Subscribe request (outbound) or poll request (inbound).
    /// An interval of `0` means "push on change".
    IntervalPoll { path: String, interval_ms: i32 },
}

impl StateMessage {
    /// The state path this message refers to.
    pub fn path(&self) -> &str {
        match self {
            Self::ValueUpdate { path, .. } | Self::IntervalPoll { path, .. } => path,
        }
    }

    /// Decodes one inner message (the bytes of a frame, without the length
    /// prefix).
    ///
    /// # Errors
    /// - [`ProtocolError::InvalidMarker`] if the message doesn't start with `smaa`
    /// - [`ProtocolError::UnknownMessageType`] for any tag other than the two above
    /// - [`ProtocolError::UnexpectedEof`], [`ProtocolError::InvalidString`],
    ///   [`ProtocolError::Json`], [`ProtocolError::InvalidPayload`] for
    ///   malformed fields
    pub fn decode(message: &[u8]) -> Result<Self, ProtocolError> {
        let mut ctx = ReadContext::new(message);

        let marker = ctx.read_fixed_string(MAGIC_MARKER.len())?;
        if marker != MAGIC_MARKER {
            return Err(ProtocolError::InvalidMarker(marker));
        }

        match ctx.read_u32()? {
            TAG_VALUE_UPDATE => {
                let path = ctx.read_network_string_utf16()?;
                let json = ctx.read_network_string_utf16()?;
                let value = StateValue::from_json(&json)?;
                Ok(Self::ValueUpdate { path, value })
            }
            TAG_INTERVAL => {
                let path = ctx.read_network_string_utf16()?;
                let interval_ms = ctx.peek_i32()?;
                ctx.seek(4)?;
                Ok(Self::IntervalPoll { path, interval_ms })
            }
            tag => Err(ProtocolError::UnknownMessageType(tag)),
        }
    }

    /// Encodes this message as an inner message (no length prefix).
    pub fn encode(&self) -> Result<Vec<u8>, ProtocolError> {
        let mut ctx = WriteContext::new();
        ctx.write_fixed_string(MAGIC_MARKER, MAGIC_MARKER.len())?;
        match self {
            Self::ValueUpdate { path, value } => {
                ctx.write_u32(TAG_VALUE_UPDATE);
                ctx.write_network_string_utf16(path);
                ctx.write_network_string_utf16(&value.to_json()?);
            }
            Self::IntervalPoll { path, interval_ms } => {
                ctx.write_u32(TAG_INTERVAL);
                ctx.write_network_string_utf16(path);
                ctx.write_i32(*interval_ms);
            }
        }
        Ok(ctx.into_bytes())
    }
}

/// Encodes a subscribe request for `path` with the given interval.
///
/// The session always subscribes with interval `0` (push on change).
pub fn encode_subscribe(path: &str, interval_ms: u32) -> Result<Vec<u8>, ProtocolError> {
    let mut ctx = WriteContext::new();
    ctx.write_fixed_string(MAGIC_MARKER, MAGIC_MARKER.len())?;
    ctx.write_u32(TAG_INTERVAL);
    ctx.write_network_string_utf16(path);
    ctx.write_u32(interval_ms);
    Ok(ctx.into_bytes())
}

/// Encodes the answer to an inbound poll for `path`: a value-update tag
/// followed by [`RESULT_REJECT`], telling the device not to poll it.
pub fn encode_poll_response(path: &str) -> Result<Vec<u8>, ProtocolError> {
    let mut ctx = WriteContext::new();
    ctx.write_fixed_string(MAGIC_MARKER, MAGIC_MARKER.len())?;
    ctx.write_u32(TAG_VALUE_UPDATE);
    ctx.write_network_string_utf16(path);
    ctx.write_u32(RESULT_REJECT);
    Ok(ctx.into_bytes())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn raw_value_update(path: &str, json: &str) -> Vec<u8> {
        let mut ctx = WriteContext::new();
        ctx.write_fixed_string(MAGIC_MARKER, 4).unwrap();
        ctx.write_u32(TAG_VALUE_UPDATE);
        ctx.write_network_string_utf16(path);
        ctx.write_network_string_utf16(json);
        ctx.into_bytes()
    }

    #[test]
    fn test_decode_device_json_with_type_key() {
        let bytes = raw_value_update(
            "/Client/Preferences/Player",
            r#"{"string":"2","type":4}"#,
        );
        let msg = StateMessage::decode(&bytes).unwrap();
        assert_eq!(
            msg,
            StateMessage::ValueUpdate {
                path: "/Client/Preferences/Player".into(),
                value: StateValue::String("2".into()),
            }
        );
    }

    #[test]
    fn test_decode_each_payload_shape() {
        let cases = [
            (r#"{"value":128.5}"#, StateValue::Number(128.5)),
            (r#"{"state":false}"#, StateValue::State(false)),
            (r##"{"color":"#ff1e90ff"}"##, StateValue::Color("#ff1e90ff".into())),
            (r#"{"string":""}"#, StateValue::String(String::new())),
        ];
        for (json, expected) in cases {
            let msg = StateMessage::decode(&raw_value_update("/p", json)).unwrap();
            assert_eq!(
                msg,
                StateMessage::ValueUpdate {
                    path: "/p".into(),
                    value: expected
                },
                "json {json}"
            );
        }
    }

    #[test]
    fn test_payload_without_value_key_rejected() {
        let bytes = raw_value_update("/p", r#"{"type":1}"#);
        assert!(matches!(
            StateMessage::decode(&bytes),
            Err(ProtocolError::InvalidPayload(_))
        ));
    }

    #[test]
    fn test_payload_with_two_value_keys_rejected() {
        let bytes = raw_value_update("/p", r#"{"state":true,"value":1}"#);
        assert!(matches!(
            StateMessage::decode(&bytes),
            Err(ProtocolError::InvalidPayload(_))
        ));
    }

    #[test]
    fn test_malformed_json_rejected() {
        let bytes = raw_value_update("/p", "{state:");
        assert!(matches!(
            StateMessage::decode(&bytes),
            Err(ProtocolError::Json(_))
        ));
    }

    #[test]
    fn test_bad_marker_rejected() {
        let mut bytes = raw_value_update("/p", r#"{"state":true}"#);
        bytes[0] = b'x';
        assert!(matches!(
            StateMessage::decode(&bytes),
            Err(ProtocolError::InvalidMarker(m)) if m == "xmaa"
        ));
    }

    #[test]
    fn test_unknown_tag_rejected() {
        let mut ctx = WriteContext::new();
        ctx.write_fixed_string(MAGIC_MARKER, 4).unwrap();
        ctx.write_u32(0x0000_07d1);
        assert!(matches!(
            StateMessage::decode(&ctx.into_bytes()),
            Err(ProtocolError::UnknownMessageType(0x7d1))
        ));
    }

    #[test]
    fn test_truncated_interval_rejected() {
        let mut ctx = WriteContext::new();
        ctx.write_fixed_string(MAGIC_MARKER, 4).unwrap();
        ctx.write_u32(TAG_INTERVAL);
        ctx.write_network_string_utf16("/p");
        ctx.write(&[0, 0]);
        assert!(matches!(
            StateMessage::decode(&ctx.into_bytes()),
            Err(ProtocolError::UnexpectedEof { .. })
        ));
    }

    #[test]
    fn test_subscribe_matches_interval_poll_encoding() {
        let subscribe = encode_subscribe("/Engine/Deck1/Play", 0).unwrap();
        let poll = StateMessage::IntervalPoll {
            path: "/Engine/Deck1/Play".into(),
            interval_ms: 0,
        }
        .encode()
        .unwrap();
        assert_eq!(subscribe, poll);
    }

    #[test]
    fn test_poll_response_layout() {
        let bytes = encode_poll_response("/a").unwrap();
        let mut expected = b"smaa".to_vec();
        expected.extend_from_slice(&[0, 0, 0, 0]); // value-update tag
        expected.extend_from_slice(&[0, 0, 0, 2, 0, b'/', 0, b'a']);
        expected.extend_from_slice(&[0xff, 0xff, 0xff, 0xff]);
        assert_eq!(bytes, expected);
    }

    #[test]
    fn test_state_value_accessors() {
        assert_eq!(StateValue::String("x".into()).as_str(), Some("x"));
        assert_eq!(StateValue::Number(1.0).as_str(), None);
        assert_eq!(StateValue::Number(1.5).as_f64(), Some(1.5));
        assert_eq!(StateValue::State(true).as_bool(), Some(true));
        assert_eq!(StateValue::Color("#00".into()).as_color(), Some("#00"));
        assert_eq!(StateValue::State(true).kind(), "state");
    }
}
