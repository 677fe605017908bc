//! Unified error type for the StageLinq client.

use stagelinq_player::PlayerError;
use stagelinq_protocol::ProtocolError;
use stagelinq_statemap::StateMapError;
use stagelinq_transport::TransportError;

/// Top-level error that wraps all crate-specific errors.
///
/// When using the `stagelinq` crate you deal with this single error type
/// instead of importing errors from each sub-crate. The `#[from]`
/// attributes let `?` convert sub-crate errors automatically.
#[derive(Debug, thiserror::Error)]
pub enum StageLinqError {
    /// Connecting, sending, or receiving failed.
    #[error(transparent)]
    Transport(#[from] TransportError),

    /// Bytes from a device couldn't be decoded.
    #[error(transparent)]
    Protocol(#[from] ProtocolError),

    /// A StateMap session failed.
    #[error(transparent)]
    StateMap(#[from] StateMapError),

    /// Player reconstruction failed.
    #[error(transparent)]
    Player(#[from] PlayerError),

    /// A configuration document couldn't be parsed.
    #[error("invalid config: {0}")]
    Config(#[from] serde_json::Error),
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_from_transport_error() {
        let err = TransportError::ConnectionClosed("gone".into());
        let stagelinq_err: StageLinqError = err.into();
        assert!(matches!(stagelinq_err, StageLinqError::Transport(_)));
        assert!(stagelinq_err.to_string().contains("gone"));
    }

    #[test]
    fn test_from_protocol_error() {
        let err = ProtocolError::UnknownMessageType(0x1234);
        let stagelinq_err: StageLinqError = err.into();
        assert!(matches!(stagelinq_err, StageLinqError::Protocol(_)));
        assert_eq!(stagelinq_err.to_string(), "unknown message type 0x00001234");
    }

    #[test]
    fn test_from_statemap_error() {
        let err = StateMapError::TooManyDecodeErrors(17);
        let stagelinq_err: StageLinqError = err.into();
        assert!(matches!(stagelinq_err, StageLinqError::StateMap(_)));
    }

    #[test]
    fn test_from_player_error() {
        let err = PlayerError::UnrecognizedStateField {
            path: "/Engine/Deck1/Nope".into(),
        };
        let stagelinq_err: StageLinqError = err.into();
        assert!(matches!(stagelinq_err, StageLinqError::Player(_)));
        assert!(stagelinq_err.to_string().contains("/Engine/Deck1/Nope"));
    }
}
