//! Decks (layers) and the state reconstructed for each of them.

use std::fmt;

use serde::Serialize;

// ---------------------------------------------------------------------------
// Layer
// ---------------------------------------------------------------------------

/// One of the up to four decks on a player, lettered `A` to `D`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize)]
pub enum Layer {
    A,
    B,
    C,
    D,
}

impl Layer {
    /// All layers, in order.
    pub const ALL: [Layer; 4] = [Layer::A, Layer::B, Layer::C, Layer::D];

    /// Maps a 1-based deck number (`Deck1` .. `Deck4`) to its layer.
    pub fn from_deck_number(n: u8) -> Option<Self> {
        match n {
            1 => Some(Self::A),
            2 => Some(Self::B),
            3 => Some(Self::C),
            4 => Some(Self::D),
            _ => None,
        }
    }

    /// The 1-based deck number, the inverse of
    /// [`from_deck_number`](Self::from_deck_number).
    pub fn deck_number(self) -> u8 {
        match self {
            Self::A => 1,
            Self::B => 2,
            Self::C => 3,
            Self::D => 4,
        }
    }

    /// Maps a deck letter. Only upper case is accepted, as devices send it.
    pub fn from_letter(c: char) -> Option<Self> {
        match c {
            'A' => Some(Self::A),
            'B' => Some(Self::B),
            'C' => Some(Self::C),
            'D' => Some(Self::D),
            _ => None,
        }
    }

    pub fn letter(self) -> char {
        match self {
            Self::A => 'A',
            Self::B => 'B',
            Self::C => 'C',
            Self::D => 'D',
        }
    }
}

impl fmt::Display for Layer {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.letter())
    }
}

// ---------------------------------------------------------------------------
// FieldValue / LayerUpdate
// ---------------------------------------------------------------------------

/// A single deck field with its new value.
#[derive(Debug, Clone, PartialEq)]
pub enum FieldValue {
    PlayState(bool),
    TrackNetworkPath(String),
    SongLoaded(bool),
    Title(String),
    Artist(String),
    HasTrackData(bool),
    FileLocation(String),
    CurrentBpm(f64),
    ExternalMixerVolume(f64),
    Play(bool),
    JogColor(String),
}

impl FieldValue {
    /// Field name as it appears in serialized status.
    pub fn name(&self) -> &'static str {
        match self {
            Self::PlayState(_) => "playState",
            Self::TrackNetworkPath(_) => "trackNetworkPath",
            Self::SongLoaded(_) => "songLoaded",
            Self::Title(_) => "title",
            Self::Artist(_) => "artist",
            Self::HasTrackData(_) => "hasTrackData",
            Self::FileLocation(_) => "fileLocation",
            Self::CurrentBpm(_) => "currentBpm",
            Self::ExternalMixerVolume(_) => "externalMixerVolume",
            Self::Play(_) => "play",
            Self::JogColor(_) => "jogColor",
        }
    }

    /// `songLoaded` means a new track: it flushes the deck's queue at once
    /// and resets the deck's state.
    pub fn is_flush_forcing(&self) -> bool {
        matches!(self, Self::SongLoaded(_))
    }
}

/// A classified patch for one deck, as pushed onto that deck's queue.
#[derive(Debug, Clone, PartialEq)]
pub struct LayerUpdate {
    pub layer: Layer,
    pub field: FieldValue,
}

// ---------------------------------------------------------------------------
// PlayerLayerState
// ---------------------------------------------------------------------------

/// Everything known about one deck.
///
/// Fields start out unknown (`None`) and are filled in as updates arrive.
/// Unknown fields are left out of the serialized form.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct PlayerLayerState {
    pub layer: Layer,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub play_state: Option<bool>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub track_network_path: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub song_loaded: Option<bool>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub title: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub artist: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub has_track_data: Option<bool>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub file_location: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub current_bpm: Option<f64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub external_mixer_volume: Option<f64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub play: Option<bool>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub jog_color: Option<String>,
}

impl PlayerLayerState {
    /// A deck with nothing known about it yet.
    pub fn new(layer: Layer) -> Self {
        Self {
            layer,
            play_state: None,
            track_network_path: None,
            song_loaded: None,
            title: None,
            artist: None,
            has_track_data: None,
            file_location: None,
            current_bpm: None,
            external_mixer_volume: None,
            play: None,
            jog_color: None,
        }
    }

    /// Overwrites the one field `value` names. Every other field is kept.
    pub fn apply(&mut self, value: &FieldValue) {
        match value {
            FieldValue::PlayState(v) => self.play_state = Some(*v),
            FieldValue::TrackNetworkPath(v) => self.track_network_path = Some(v.clone()),
            FieldValue::SongLoaded(v) => self.song_loaded = Some(*v),
            FieldValue::Title(v) => self.title = Some(v.clone()),
            FieldValue::Artist(v) => self.artist = Some(v.clone()),
            FieldValue::HasTrackData(v) => self.has_track_data = Some(*v),
            FieldValue::FileLocation(v) => self.file_location = Some(v.clone()),
            FieldValue::CurrentBpm(v) => self.current_bpm = Some(*v),
            FieldValue::ExternalMixerVolume(v) => self.external_mixer_volume = Some(*v),
            FieldValue::Play(v) => self.play = Some(*v),
            FieldValue::JogColor(v) => self.jog_color = Some(v.clone()),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_deck_numbers_map_to_letters() {
        let letters: Vec<char> = (1..=4)
            .map(|n| Layer::from_deck_number(n).unwrap().letter())
            .collect();
        assert_eq!(letters, ['A', 'B', 'C', 'D']);
        for layer in Layer::ALL {
            assert_eq!(Layer::from_deck_number(layer.deck_number()), Some(layer));
        }
        assert_eq!(Layer::from_deck_number(0), None);
        assert_eq!(Layer::from_deck_number(5), None);
    }

    #[test]
    fn test_from_letter() {
        assert_eq!(Layer::from_letter('C'), Some(Layer::C));
        assert_eq!(Layer::from_letter('c'), None);
        assert_eq!(Layer::from_letter('E'), None);
    }

    #[test]
    fn test_apply_overwrites_one_field() {
        let mut state = PlayerLayerState::new(Layer::B);
        state.apply(&FieldValue::Title("X".into()));
        state.apply(&FieldValue::Artist("Y".into()));
        state.apply(&FieldValue::Title("Z".into()));
        assert_eq!(state.title.as_deref(), Some("Z"));
        assert_eq!(state.artist.as_deref(), Some("Y"));
        assert_eq!(state.layer, Layer::B);
    }

    #[test]
    fn test_only_song_loaded_forces_flush() {
        assert!(FieldValue::SongLoaded(false).is_flush_forcing());
        assert!(!FieldValue::Play(true).is_flush_forcing());
        assert!(!FieldValue::Title("t".into()).is_flush_forcing());
    }

    #[test]
    fn test_unknown_fields_are_not_serialized() {
        let mut state = PlayerLayerState::new(Layer::A);
        state.apply(&FieldValue::CurrentBpm(128.0));
        let json = serde_json::to_value(&state).unwrap();
        assert_eq!(json, serde_json::json!({"layer": "A", "currentBpm": 128.0}));
    }
}
