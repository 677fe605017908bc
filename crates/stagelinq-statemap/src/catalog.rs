//! Static catalogs of state paths to subscribe to, per unit type.
//!
//! The catalog is configuration, not something derived at runtime: a
//! session subscribes to every path of its unit's catalog, in order, as
//! soon as it connects.

use crate::UnitType;

/// State paths subscribed to on a `PLAYER` unit.
///
/// Every `DeckN` path here maps onto a field the player reconstruction
/// engine understands.
pub const PLAYER_STATES: &[&str] = &[
    "/Engine/DeckCount",
    "/Engine/Master/MasterTempo",
    "/Engine/Sync/Network/MasterStatus",
    "/Client/Preferences/Player",
    "/Client/Preferences/LayerB",
    "/Client/Preferences/PlayerJogColorA",
    "/Client/Preferences/PlayerJogColorB",
    "/Client/Preferences/PlayerJogColorC",
    "/Client/Preferences/PlayerJogColorD",
    "/Client/Librarian/DevicesController/CurrentDevice",
    "/Client/Librarian/DevicesController/HasSDCardConnected",
    "/Client/Librarian/DevicesController/HasUsbDeviceConnected",
    // Deck 1
    "/Engine/Deck1/Play",
    "/Engine/Deck1/PlayState",
    "/Engine/Deck1/CurrentBPM",
    "/Engine/Deck1/ExternalMixerVolume",
    "/Engine/Deck1/Track/ArtistName",
    "/Engine/Deck1/Track/SongLoaded",
    "/Engine/Deck1/Track/SongName",
    "/Engine/Deck1/Track/TrackData",
    "/Engine/Deck1/Track/TrackName",
    "/Engine/Deck1/Track/TrackNetworkPath",
    // Deck 2
    "/Engine/Deck2/Play",
    "/Engine/Deck2/PlayState",
    "/Engine/Deck2/CurrentBPM",
    "/Engine/Deck2/ExternalMixerVolume",
    "/Engine/Deck2/Track/ArtistName",
    "/Engine/Deck2/Track/SongLoaded",
    "/Engine/Deck2/Track/SongName",
    "/Engine/Deck2/Track/TrackData",
    "/Engine/Deck2/Track/TrackName",
    "/Engine/Deck2/Track/TrackNetworkPath",
    // Deck 3
    "/Engine/Deck3/Play",
    "/Engine/Deck3/PlayState",
    "/Engine/Deck3/CurrentBPM",
    "/Engine/Deck3/ExternalMixerVolume",
    "/Engine/Deck3/Track/ArtistName",
    "/Engine/Deck3/Track/SongLoaded",
    "/Engine/Deck3/Track/SongName",
    "/Engine/Deck3/Track/TrackData",
    "/Engine/Deck3/Track/TrackName",
    "/Engine/Deck3/Track/TrackNetworkPath",
    // Deck 4
    "/Engine/Deck4/Play",
    "/Engine/Deck4/PlayState",
    "/Engine/Deck4/CurrentBPM",
    "/Engine/Deck4/ExternalMixerVolume",
    "/Engine/Deck4/Track/ArtistName",
    "/Engine/Deck4/Track/SongLoaded",
    "/Engine/Deck4/Track/SongName",
    "/Engine/Deck4/Track/TrackData",
    "/Engine/Deck4/Track/TrackName",
    "/Engine/Deck4/Track/TrackNetworkPath",
];

/// State paths subscribed to on a `MIXER` unit.
pub const MIXER_STATES: &[&str] = &[
    "/Mixer/CH1faderPosition",
    "/Mixer/CH2faderPosition",
    "/Mixer/CH3faderPosition",
    "/Mixer/CH4faderPosition",
    "/Mixer/CrossfaderPosition",
    "/Mixer/ChannelAssignment1",
    "/Mixer/ChannelAssignment2",
    "/Mixer/ChannelAssignment3",
    "/Mixer/ChannelAssignment4",
];

/// Returns the subscription catalog for a unit type, in subscribe order.
///
/// A controller is a player and a mixer in one box, so it gets both
/// lists, player paths first. Unknown units get nothing.
pub fn paths_for(unit_type: UnitType) -> Vec<&'static str> {
    match unit_type {
        UnitType::Player => PLAYER_STATES.to_vec(),
        UnitType::Mixer => MIXER_STATES.to_vec(),
        UnitType::Controller => PLAYER_STATES
            .iter()
            .chain(MIXER_STATES.iter())
            .copied()
            .collect(),
        UnitType::Unknown => Vec::new(),
    }
}
