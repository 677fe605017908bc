//! Integration tests for player reconstruction.
//!
//! The tests feed `StateEvent`s straight into the player's state queue,
//! the way the registry does for a live session, and watch the player events that come
//! out. Time is paused, so quiescence windows elapse instantly and
//! deterministically.

use std::time::Duration;

use stagelinq_player::{
    Classification, Layer, PlayerError, PlayerEvent, PlayerEventKind, PlayerHandle, QueueConfig,
    classify, spawn_player,
};
use stagelinq_protocol::StateValue;
use stagelinq_statemap::catalog::PLAYER_STATES;
use stagelinq_statemap::{DeviceId, DeviceInfo, StateEvent, UnitType};
use tokio::sync::{broadcast, mpsc};

const DEVICE: DeviceId = DeviceId::new([0x42; 16]);

struct Harness {
    states: mpsc::UnboundedSender<StateEvent>,
    events: broadcast::Receiver<PlayerEvent>,
    handle: PlayerHandle,
}

impl Harness {
    fn start() -> Self {
        Self::with_decks(4)
    }

    fn with_decks(deck_count: u8) -> Self {
        let (states, state_rx) = mpsc::unbounded_channel();
        let (event_tx, events) = broadcast::channel(64);
        let info = DeviceInfo {
            device_id: DEVICE,
            unit_type: UnitType::Player,
            deck_count,
            address: "192.168.1.50:51338".parse().unwrap(),
        };
        let handle = spawn_player(info, state_rx, event_tx, QueueConfig::default()).unwrap();
        Self {
            states,
            events,
            handle,
        }
    }

    fn send_from(&self, device_id: DeviceId, path: &str, value: StateValue) {
        self.states
            .send(StateEvent {
                device_id,
                path: path.into(),
                value,
            })
            .unwrap();
    }

    fn send(&self, path: &str, value: StateValue) {
        self.send_from(DEVICE, path, value);
    }

    async fn next_event(&mut self) -> PlayerEvent {
        tokio::time::timeout(Duration::from_secs(5), self.events.recv())
            .await
            .expect("no player event")
            .unwrap()
    }

    /// Lets every window elapse, then checks nothing more was emitted.
    async fn assert_quiet(&mut self) {
        tokio::time::sleep(Duration::from_secs(1)).await;
        assert!(self.events.try_recv().is_err(), "unexpected extra event");
    }
}

fn string(s: &str) -> StateValue {
    StateValue::String(s.into())
}

// ===========================================================================
// Events
// ===========================================================================

#[tokio::test(start_paused = true)]
async fn test_track_load_burst_emits_one_track_loaded() {
    let mut h = Harness::start();

    h.send("/Client/Preferences/Player", string("2"));
    h.send("/Engine/Deck1/Play", StateValue::State(true));
    h.send("/Engine/Deck1/Track/SongLoaded", StateValue::State(true));

    let event = h.next_event().await;
    assert_eq!(event.kind, PlayerEventKind::TrackLoaded);
    assert_eq!(event.status.player, Some(2));
    assert_eq!(event.status.layer, Layer::A);
    assert_eq!(event.status.deck, "2A");
    assert_eq!(event.status.state.song_loaded, Some(true));
    assert_eq!(event.status.state.play, Some(true));
    assert_eq!(event.status.device_id, DEVICE);
    assert_eq!(event.status.address.to_string(), "192.168.1.50");
    assert_eq!(event.status.port, 51338);

    h.assert_quiet().await;
}

#[tokio::test(start_paused = true)]
async fn test_new_track_discards_previous_track_fields() {
    let mut h = Harness::start();

    h.send("/Engine/Deck2/Track/SongName", string("X"));
    h.send("/Engine/Deck2/Track/ArtistName", string("Y"));
    h.send("/Engine/Deck2/Track/SongLoaded", StateValue::State(true));
    let first = h.next_event().await;
    assert_eq!(first.kind, PlayerEventKind::TrackLoaded);
    assert_eq!(first.status.state.title.as_deref(), Some("X"));
    assert_eq!(first.status.state.artist.as_deref(), Some("Y"));

    h.send("/Engine/Deck2/Track/SongLoaded", StateValue::State(true));
    h.send("/Engine/Deck2/Track/SongName", string("Z"));

    let reset = h.next_event().await;
    assert_eq!(reset.kind, PlayerEventKind::TrackLoaded);
    assert_eq!(reset.status.state.artist, None);
    assert_eq!(reset.status.state.title, None);

    let titled = h.next_event().await;
    assert_eq!(titled.kind, PlayerEventKind::StateChanged);
    assert_eq!(titled.status.state.title.as_deref(), Some("Z"));
    assert_eq!(titled.status.state.artist, None);
    assert_eq!(titled.status.state.song_loaded, Some(true));
}

#[tokio::test(start_paused = true)]
async fn test_updates_merge_into_existing_snapshot() {
    let mut h = Harness::start();

    h.send("/Engine/Deck1/Track/SongName", string("X"));
    h.send("/Engine/Deck1/Track/ArtistName", string("Y"));
    h.next_event().await;

    h.send("/Engine/Deck1/CurrentBPM", StateValue::Number(128.0));
    let event = h.next_event().await;
    assert_eq!(event.kind, PlayerEventKind::StateChanged);
    assert_eq!(event.status.state.title.as_deref(), Some("X"));
    assert_eq!(event.status.state.artist.as_deref(), Some("Y"));
    assert_eq!(event.status.state.current_bpm, Some(128.0));
}

#[tokio::test(start_paused = true)]
async fn test_play_state_emits_now_playing() {
    let mut h = Harness::start();

    h.send("/Engine/Deck3/PlayState", StateValue::State(true));
    let event = h.next_event().await;
    assert_eq!(event.kind, PlayerEventKind::NowPlaying);
    assert_eq!(event.status.layer, Layer::C);
    assert_eq!(event.status.deck, "C", "player index not known yet");

    h.send("/Engine/Deck3/PlayState", StateValue::State(false));
    let event = h.next_event().await;
    assert_eq!(event.kind, PlayerEventKind::StateChanged);
}

#[tokio::test(start_paused = true)]
async fn test_master_values_carried_in_status() {
    let mut h = Harness::start();

    h.send("/Engine/Master/MasterTempo", StateValue::Number(124.0));
    h.send("/Engine/Sync/Network/MasterStatus", StateValue::State(true));
    h.send(
        "/Client/Preferences/PlayerJogColorD",
        StateValue::Color("#ff00ff00".into()),
    );

    let event = h.next_event().await;
    assert_eq!(event.status.layer, Layer::D);
    assert_eq!(event.status.master_tempo, Some(124.0));
    assert_eq!(event.status.master_status, Some(true));
    assert_eq!(event.status.state.jog_color.as_deref(), Some("#ff00ff00"));
}

#[tokio::test(start_paused = true)]
async fn test_decks_flush_independently() {
    let mut h = Harness::start();

    h.send("/Engine/Deck1/CurrentBPM", StateValue::Number(120.0));
    h.send("/Engine/Deck2/CurrentBPM", StateValue::Number(130.0));

    let mut layers = vec![h.next_event().await.status.layer, h.next_event().await.status.layer];
    layers.sort();
    assert_eq!(layers, vec![Layer::A, Layer::B]);
    h.assert_quiet().await;
}

#[tokio::test(start_paused = true)]
async fn test_other_devices_and_deckless_paths_are_ignored() {
    let mut h = Harness::start();

    h.send_from(
        DeviceId::new([0x01; 16]),
        "/Engine/Deck1/Play",
        StateValue::State(true),
    );
    h.send("/Engine/DeckCount", StateValue::Number(2.0));
    h.send("/Client/Librarian/DevicesController/HasSDCardConnected", StateValue::State(true));

    h.assert_quiet().await;
    assert!(!h.handle.is_finished());
}

#[tokio::test(start_paused = true)]
async fn test_payload_mismatch_is_skipped() {
    let mut h = Harness::start();

    h.send("/Engine/Deck1/CurrentBPM", string("fast"));
    h.send("/Engine/Deck1/CurrentBPM", StateValue::Number(99.0));

    let event = h.next_event().await;
    assert_eq!(event.status.state.current_bpm, Some(99.0));
    h.assert_quiet().await;
}

// ===========================================================================
// Failure and shutdown
// ===========================================================================

#[tokio::test(start_paused = true)]
async fn test_unknown_deck_field_ends_reconstruction() {
    let h = Harness::start();

    h.send("/Engine/Deck1/Track/Mystery", StateValue::State(true));

    let result = tokio::time::timeout(Duration::from_secs(5), h.handle.join())
        .await
        .unwrap();
    match result {
        Err(PlayerError::UnrecognizedStateField { path }) => {
            assert_eq!(path, "/Engine/Deck1/Track/Mystery");
        }
        other => panic!("expected UnrecognizedStateField, got {other:?}"),
    }
}

#[tokio::test(start_paused = true)]
async fn test_decks_beyond_deck_count_are_ignored() {
    let mut h = Harness::with_decks(2);

    h.send("/Engine/Deck3/Track/SongName", string("Ghost"));
    h.send("/Engine/Deck4/Track/Mystery", StateValue::State(true));
    h.send("/Client/Preferences/PlayerJogColorC", StateValue::Color("#ff00ff00".into()));
    h.send("/Engine/Deck2/Track/SongName", string("Real"));

    let event = h.next_event().await;
    assert_eq!(event.status.layer, Layer::B);
    assert_eq!(event.status.state.title.as_deref(), Some("Real"));
    h.assert_quiet().await;
    assert!(!h.handle.is_finished());
}

#[tokio::test(start_paused = true)]
async fn test_burst_is_reconstructed_in_full() {
    let mut h = Harness::start();

    h.send("/Engine/Deck1/Track/SongLoaded", StateValue::State(true));
    h.send("/Engine/Deck1/Track/SongName", string("Z"));
    h.send("/Engine/Deck1/Track/ArtistName", string("Y"));
    for n in 0..1000 {
        h.send("/Engine/Deck1/CurrentBPM", StateValue::Number(f64::from(n)));
    }

    let mut kinds = Vec::new();
    let mut last = None;
    while last
        .as_ref()
        .is_none_or(|state: &stagelinq_player::PlayerLayerState| state.current_bpm != Some(999.0))
    {
        let event = h.next_event().await;
        kinds.push(event.kind);
        last = Some(event.status.state);
    }
    assert_eq!(kinds[0], PlayerEventKind::TrackLoaded);
    let last = last.unwrap();
    assert_eq!(last.song_loaded, Some(true));
    assert_eq!(last.title.as_deref(), Some("Z"));
    assert_eq!(last.artist.as_deref(), Some("Y"));
}

#[tokio::test(start_paused = true)]
async fn test_shutdown_drops_pending_updates() {
    let mut h = Harness::start();

    h.send("/Engine/Deck1/CurrentBPM", StateValue::Number(120.0));
    h.handle.shutdown();

    tokio::time::sleep(Duration::from_secs(1)).await;
    assert!(h.events.try_recv().is_err());
    assert!(h.handle.is_finished());

    let Harness { handle, .. } = h;
    assert!(handle.join().await.is_ok());
}

#[tokio::test(start_paused = true)]
async fn test_closed_state_stream_ends_task() {
    let Harness { states, handle, .. } = Harness::start();
    drop(states);
    assert!(handle.join().await.is_ok());
}

// ===========================================================================
// Catalog coverage
// ===========================================================================

#[test]
fn test_every_player_catalog_path_is_understood() {
    let values = [
        StateValue::String("1".into()),
        StateValue::Number(1.0),
        StateValue::State(true),
        StateValue::Color("#ffffffff".into()),
    ];
    for path in PLAYER_STATES {
        let understood = values.iter().any(|value| {
            matches!(
                classify(path, value),
                Ok(Classification::Deck(_))
                    | Ok(Classification::PlayerIndex(_))
                    | Ok(Classification::MasterTempo(_))
                    | Ok(Classification::MasterStatus(_))
                    | Ok(Classification::Ignored)
            )
        });
        assert!(understood, "{path} has no matching field");

        for value in &values {
            assert!(
                !matches!(
                    classify(path, value),
                    Err(PlayerError::UnrecognizedStateField { .. })
                ),
                "{path} would end reconstruction"
            );
        }
    }
}
