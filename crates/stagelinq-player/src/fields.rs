//! Classification of state paths into player-wide values and deck fields.
//!
//! A player publishes everything as flat paths. Reconstructing decks from
//! them takes two steps.
//!
//! First, player-wide rules and deck resolution, in this order:
//!
//! | rule | path                                       | result            |
//! |------|--------------------------------------------|-------------------|
//! | 1    | ends with `/Client/Preferences/Player`     | player index      |
//! | 2    | contains `/Engine/Master/MasterTempo`      | master tempo      |
//! | 3    | contains `/Engine/Sync/Network/MasterStatus` | master status   |
//! | 4    | last segment `PlayerJogColor<A-D>`         | that deck         |
//! | 5    | a `Deck<1-4>` segment                      | deck `A`..`D`     |
//! | 6    | anything else                              | ignored           |
//!
//! Second, a deck-resolved path goes through [`FIELD_TABLE`], an ordered
//! list of `(matcher, setter)` rows. The first matching row wins. A path
//! that matches no row is [`PlayerError::UnrecognizedStateField`]: the
//! table is the complete list of deck fields we understand, and a device
//! sending something else should be noticed, not silently dropped.

use stagelinq_protocol::StateValue;

use crate::{FieldValue, Layer, LayerUpdate, PlayerError};

const PLAYER_INDEX_SUFFIX: &str = "/Client/Preferences/Player";
const MASTER_TEMPO: &str = "/Engine/Master/MasterTempo";
const MASTER_STATUS: &str = "/Engine/Sync/Network/MasterStatus";
const JOG_COLOR_PREFIX: &str = "PlayerJogColor";

/// What a state path means to the reconstruction engine.
#[derive(Debug, Clone, PartialEq)]
pub enum Classification {
    /// The player's index on the network (1..4).
    PlayerIndex(u32),
    /// Tempo of the sync master.
    MasterTempo(f64),
    /// Whether this player is the sync master.
    MasterStatus(bool),
    /// A field of one deck.
    Deck(LayerUpdate),
    /// Not deck-scoped and not player-wide.
    Ignored,
}

// ---------------------------------------------------------------------------
// Field table
// ---------------------------------------------------------------------------

/// How a table row recognizes a path.
#[derive(Debug, Clone, Copy)]
pub enum Matcher {
    /// The path ends with this (`"Track/SongName"` matches
    /// `/Engine/Deck1/Track/SongName`). Plain string suffix, so `"Play"`
    /// also matches `/Engine/Deck1/AutoPlay`.
    Suffix(&'static str),
    /// The last segment is `PlayerJogColorA` .. `PlayerJogColorD`.
    JogColor,
}

impl Matcher {
    pub fn matches(&self, path: &str) -> bool {
        match self {
            Self::Suffix(suffix) => path.ends_with(*suffix),
            Self::JogColor => jog_color_layer(path).is_some(),
        }
    }
}

/// One row of the field table.
pub struct FieldRow {
    pub matcher: Matcher,
    /// Payload kind the row expects, for mismatch reports.
    pub expected: &'static str,
    /// Builds the field from the payload; `None` if the kind is wrong.
    pub setter: fn(&StateValue) -> Option<FieldValue>,
}

/// Every deck field the engine understands, in match order.
///
/// `PlayState` sits before `Play` so the more specific row is tried
/// first.
pub const FIELD_TABLE: &[FieldRow] = &[
    FieldRow {
        matcher: Matcher::Suffix("PlayState"),
        expected: "state",
        setter: |v| v.as_bool().map(FieldValue::PlayState),
    },
    FieldRow {
        matcher: Matcher::Suffix("Track/TrackNetworkPath"),
        expected: "string",
        setter: |v| v.as_str().map(|s| FieldValue::TrackNetworkPath(s.to_string())),
    },
    FieldRow {
        matcher: Matcher::Suffix("Track/SongLoaded"),
        expected: "state",
        setter: |v| v.as_bool().map(FieldValue::SongLoaded),
    },
    FieldRow {
        matcher: Matcher::Suffix("Track/SongName"),
        expected: "string",
        setter: |v| v.as_str().map(|s| FieldValue::Title(s.to_string())),
    },
    FieldRow {
        matcher: Matcher::Suffix("Track/ArtistName"),
        expected: "string",
        setter: |v| v.as_str().map(|s| FieldValue::Artist(s.to_string())),
    },
    FieldRow {
        matcher: Matcher::Suffix("Track/TrackData"),
        expected: "state",
        setter: |v| v.as_bool().map(FieldValue::HasTrackData),
    },
    FieldRow {
        matcher: Matcher::Suffix("Track/TrackName"),
        expected: "string",
        setter: |v| v.as_str().map(|s| FieldValue::FileLocation(s.to_string())),
    },
    FieldRow {
        matcher: Matcher::Suffix("CurrentBPM"),
        expected: "value",
        setter: |v| v.as_f64().map(FieldValue::CurrentBpm),
    },
    FieldRow {
        matcher: Matcher::Suffix("ExternalMixerVolume"),
        expected: "value",
        setter: |v| v.as_f64().map(FieldValue::ExternalMixerVolume),
    },
    FieldRow {
        matcher: Matcher::Suffix("Play"),
        expected: "state",
        setter: |v| v.as_bool().map(FieldValue::Play),
    },
    FieldRow {
        matcher: Matcher::JogColor,
        expected: "color",
        setter: |v| v.as_color().map(|c| FieldValue::JogColor(c.to_string())),
    },
];

// ---------------------------------------------------------------------------
// Classification
// ---------------------------------------------------------------------------

/// Classifies one value update.
///
/// # Errors
/// - [`PlayerError::UnrecognizedStateField`] for a deck-scoped path that
///   matches no row of [`FIELD_TABLE`] (fatal for the device).
/// - [`PlayerError::PayloadMismatch`] when a known path carries the wrong
///   kind of value, or the player index isn't a number (skip the update).
pub fn classify(path: &str, value: &StateValue) -> Result<Classification, PlayerError> {
    if path.ends_with(PLAYER_INDEX_SUFFIX) {
        return value
            .as_str()
            .and_then(|s| s.trim().parse::<u32>().ok())
            .map(Classification::PlayerIndex)
            .ok_or_else(|| mismatch(path, "numeric string", value));
    }
    if path.contains(MASTER_TEMPO) {
        return value
            .as_f64()
            .map(Classification::MasterTempo)
            .ok_or_else(|| mismatch(path, "value", value));
    }
    if path.contains(MASTER_STATUS) {
        return value
            .as_bool()
            .map(Classification::MasterStatus)
            .ok_or_else(|| mismatch(path, "state", value));
    }

    let Some(layer) = resolve_layer(path) else {
        return Ok(Classification::Ignored);
    };

    let row = FIELD_TABLE
        .iter()
        .find(|row| row.matcher.matches(path))
        .ok_or_else(|| PlayerError::UnrecognizedStateField {
            path: path.to_string(),
        })?;

    let field = (row.setter)(value).ok_or_else(|| mismatch(path, row.expected, value))?;
    Ok(Classification::Deck(LayerUpdate { layer, field }))
}

/// Works out which deck a path belongs to, if any.
pub fn resolve_layer(path: &str) -> Option<Layer> {
    jog_color_layer(path).or_else(|| deck_segment_layer(path))
}

fn jog_color_layer(path: &str) -> Option<Layer> {
    let last = path.rsplit('/').next()?;
    let letter = last.strip_prefix(JOG_COLOR_PREFIX)?;
    let mut chars = letter.chars();
    match (chars.next(), chars.next()) {
        (Some(c), None) => Layer::from_letter(c),
        _ => None,
    }
}

fn deck_segment_layer(path: &str) -> Option<Layer> {
    path.split('/').find_map(|segment| {
        let digits = segment.strip_prefix("Deck")?;
        if digits.len() != 1 {
            return None;
        }
        Layer::from_deck_number(digits.parse().ok()?)
    })
}

fn mismatch(path: &str, expected: &'static str, value: &StateValue) -> PlayerError {
    PlayerError::PayloadMismatch {
        path: path.to_string(),
        expected,
        found: value.kind(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn deck(path: &str, value: StateValue) -> LayerUpdate {
        match classify(path, &value).unwrap() {
            Classification::Deck(update) => update,
            other => panic!("{path} classified as {other:?}"),
        }
    }

    #[test]
    fn test_deck_segments_map_to_layers() {
        for (n, layer) in [(1, Layer::A), (2, Layer::B), (3, Layer::C), (4, Layer::D)] {
            let update = deck(&format!("/Engine/Deck{n}/Play"), StateValue::State(true));
            assert_eq!(update.layer, layer);
            assert_eq!(update.field, FieldValue::Play(true));
        }
    }

    #[test]
    fn test_jog_color_maps_directly_to_deck() {
        let update = deck(
            "/Client/Preferences/PlayerJogColorB",
            StateValue::Color("#ff0000ff".into()),
        );
        assert_eq!(update.layer, Layer::B);
        assert_eq!(update.field, FieldValue::JogColor("#ff0000ff".into()));
    }

    #[test]
    fn test_player_wide_rules() {
        assert_eq!(
            classify("/Client/Preferences/Player", &StateValue::String("2".into())).unwrap(),
            Classification::PlayerIndex(2)
        );
        assert_eq!(
            classify("/Engine/Master/MasterTempo", &StateValue::Number(124.0)).unwrap(),
            Classification::MasterTempo(124.0)
        );
        assert_eq!(
            classify("/Engine/Sync/Network/MasterStatus", &StateValue::State(true)).unwrap(),
            Classification::MasterStatus(true)
        );
    }

    #[test]
    fn test_paths_without_deck_are_ignored() {
        for path in [
            "/Engine/DeckCount",
            "/Client/Preferences/LayerB",
            "/Client/Librarian/DevicesController/CurrentDevice",
            "/Engine/Deck5/Play",
        ] {
            assert_eq!(
                classify(path, &StateValue::State(true)).unwrap(),
                Classification::Ignored,
                "{path}"
            );
        }
    }

    #[test]
    fn test_unknown_deck_field_is_fatal() {
        let err = classify("/Engine/Deck1/Track/Mystery", &StateValue::State(true)).unwrap_err();
        assert!(matches!(
            err,
            PlayerError::UnrecognizedStateField { ref path } if path == "/Engine/Deck1/Track/Mystery"
        ));
        assert!(err.is_fatal());
    }

    #[test]
    fn test_wrong_payload_kind_is_mismatch() {
        let err = classify("/Engine/Deck2/CurrentBPM", &StateValue::String("fast".into()))
            .unwrap_err();
        assert!(matches!(
            err,
            PlayerError::PayloadMismatch { expected: "value", found: "string", .. }
        ));

        let err = classify("/Client/Preferences/Player", &StateValue::String("two".into()))
            .unwrap_err();
        assert!(matches!(err, PlayerError::PayloadMismatch { .. }));
    }

    #[test]
    fn test_play_state_is_not_play() {
        let update = deck("/Engine/Deck3/PlayState", StateValue::State(false));
        assert_eq!(update.field, FieldValue::PlayState(false));
    }

    #[test]
    fn test_suffix_matches_plain_string_suffix() {
        assert!(Matcher::Suffix("Play").matches("/Engine/Deck1/Play"));
        assert!(Matcher::Suffix("Play").matches("/Engine/Deck1/AutoPlay"));
        assert!(!Matcher::Suffix("Play").matches("/Engine/Deck1/PlayState"));
    }

    #[test]
    fn test_auto_play_classifies_as_play() {
        let update = deck("/Engine/Deck1/AutoPlay", StateValue::State(true));
        assert_eq!(update.layer, Layer::A);
        assert_eq!(update.field, FieldValue::Play(true));
    }

    #[test]
    fn test_track_fields() {
        let cases = [
            ("Track/TrackNetworkPath", StateValue::String("net://x".into()), FieldValue::TrackNetworkPath("net://x".into())),
            ("Track/SongLoaded", StateValue::State(true), FieldValue::SongLoaded(true)),
            ("Track/SongName", StateValue::String("Song".into()), FieldValue::Title("Song".into())),
            ("Track/ArtistName", StateValue::String("Artist".into()), FieldValue::Artist("Artist".into())),
            ("Track/TrackData", StateValue::State(true), FieldValue::HasTrackData(true)),
            ("Track/TrackName", StateValue::String("/x.mp3".into()), FieldValue::FileLocation("/x.mp3".into())),
            ("ExternalMixerVolume", StateValue::Number(0.75), FieldValue::ExternalMixerVolume(0.75)),
        ];
        for (suffix, value, expected) in cases {
            let update = deck(&format!("/Engine/Deck4/{suffix}"), value);
            assert_eq!(update.layer, Layer::D);
            assert_eq!(update.field, expected);
        }
    }
}
