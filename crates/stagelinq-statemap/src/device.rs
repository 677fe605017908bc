//! Device identity and metadata handed over by the connection layer.

use std::fmt;
use std::net::SocketAddr;
use std::str::FromStr;

use serde::{Serialize, Serializer};

use crate::StateMapError;

// ---------------------------------------------------------------------------
// DeviceId
// ---------------------------------------------------------------------------

/// The 16-byte token a device announces itself with.
///
/// Every map that needs to find a device's connection or state is keyed
/// by this. It's displayed in the usual 8-4-4-4-12 hex form:
///
/// ```rust
/// use stagelinq_statemap::DeviceId;
///
/// let id: DeviceId = "4be14112-5ead-4848-a07d-b37ca8a7220e".parse().unwrap();
/// assert_eq!(id.to_string(), "4be14112-5ead-4848-a07d-b37ca8a7220e");
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct DeviceId([u8; 16]);

impl DeviceId {
    /// Wraps a raw 16-byte token.
    pub const fn new(bytes: [u8; 16]) -> Self {
        Self(bytes)
    }

    /// The raw token bytes.
    pub fn as_bytes(&self) -> &[u8; 16] {
        &self.0
    }
}

impl fmt::Display for DeviceId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for (i, byte) in self.0.iter().enumerate() {
            if matches!(i, 4 | 6 | 8 | 10) {
                f.write_str("-")?;
            }
            write!(f, "{byte:02x}")?;
        }
        Ok(())
    }
}

impl FromStr for DeviceId {
    type Err = StateMapError;

    /// Parses 32 hex digits, with or without the dashes.
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let hex: Vec<u8> = s.bytes().filter(|&b| b != b'-').collect();
        if hex.len() != 32 {
            return Err(StateMapError::InvalidDeviceId(s.to_string()));
        }

        let mut bytes = [0u8; 16];
        for (i, pair) in hex.chunks_exact(2).enumerate() {
            let digits = std::str::from_utf8(pair)
                .map_err(|_| StateMapError::InvalidDeviceId(s.to_string()))?;
            bytes[i] = u8::from_str_radix(digits, 16)
                .map_err(|_| StateMapError::InvalidDeviceId(s.to_string()))?;
        }
        Ok(Self(bytes))
    }
}

impl Serialize for DeviceId {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.collect_str(self)
    }
}

// ---------------------------------------------------------------------------
// UnitType
// ---------------------------------------------------------------------------

/// What kind of unit a device announced itself as.
///
/// Decides which [`catalog`](crate::catalog) of state paths the session
/// subscribes to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum UnitType {
    Player,
    Controller,
    Mixer,
    #[default]
    Unknown,
}

impl UnitType {
    /// Maps the unit name from a device announcement (`"PLAYER"`,
    /// `"CONTROLLER"`, `"MIXER"`). Anything else is `Unknown`.
    pub fn from_name(name: &str) -> Self {
        match name {
            "PLAYER" => Self::Player,
            "CONTROLLER" => Self::Controller,
            "MIXER" => Self::Mixer,
            _ => Self::Unknown,
        }
    }
}

impl fmt::Display for UnitType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Player => write!(f, "PLAYER"),
            Self::Controller => write!(f, "CONTROLLER"),
            Self::Mixer => write!(f, "MIXER"),
            Self::Unknown => write!(f, "UNKNOWN"),
        }
    }
}

// ---------------------------------------------------------------------------
// DeviceInfo
// ---------------------------------------------------------------------------

/// Everything the session needs to know about a device before it starts.
///
/// Supplied by the discovery/connection layer together with the socket.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DeviceInfo {
    /// The device's announced token.
    pub device_id: DeviceId,
    /// What kind of unit it is.
    pub unit_type: UnitType,
    /// How many decks the unit has (1–4 for players). Player
    /// reconstruction ignores updates for decks above it; 0 means the
    /// unit didn't say, and every deck is kept.
    pub deck_count: u8,
    /// Address of the device's StateMap service.
    pub address: SocketAddr,
}
