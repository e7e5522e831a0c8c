//! Controller-level scenarios with several browsers attached.
//!
//! These drive [`BridgeController`] directly with recording sinks, the same
//! way the event loop does, without any sockets.

use std::sync::{Arc, Mutex};

use mixer_bridge::application::{
    BridgeController, BridgeError, BridgeEvent, ClientSink, ConnectionId, ConsoleSink,
    DeliveryError,
};
use mixer_bridge::domain::BridgeConfig;
use mixer_core::{
    AuxConfig, ClientMessage, ConsoleFamily, MixerConfig, MixerUpdate, WireMessage, WireValue,
};
use serde_json::{json, Value};

// ── Test doubles ──────────────────────────────────────────────────────────────

#[derive(Clone, Default)]
struct RecordingConsole(Arc<Mutex<Vec<WireMessage>>>);

impl RecordingConsole {
    fn sent(&self) -> Vec<WireMessage> {
        self.0.lock().unwrap().clone()
    }
}

impl ConsoleSink for RecordingConsole {
    fn send(&mut self, message: WireMessage) -> Result<(), BridgeError> {
        self.0.lock().unwrap().push(message);
        Ok(())
    }
}

#[derive(Clone, Default)]
struct Browser(Arc<Mutex<Vec<String>>>);

impl Browser {
    fn frames(&self) -> Vec<Value> {
        self.0
            .lock()
            .unwrap()
            .iter()
            .map(|f| serde_json::from_str(f).unwrap())
            .collect()
    }

    fn last(&self) -> Value {
        self.frames().pop().expect("no frames received")
    }
}

impl ClientSink for Browser {
    fn deliver(&mut self, frame: String) -> Result<(), DeliveryError> {
        self.0.lock().unwrap().push(frame);
        Ok(())
    }
}

// ── Fixtures ──────────────────────────────────────────────────────────────────

fn aux(channel: u32, send: u32, stereo: bool) -> AuxConfig {
    AuxConfig {
        channel,
        send: Some(send),
        stereo,
        colour: "6, 106, 166".to_string(),
        label: None,
    }
}

fn config(family: ConsoleFamily, auxes: Vec<AuxConfig>, channels: Vec<u32>) -> BridgeConfig {
    BridgeConfig {
        family,
        mixer: MixerConfig {
            aux: auxes,
            channels,
            ignore_channels: vec![99],
        },
        ..BridgeConfig::default()
    }
}

/// Starts a controller and answers every SD loading request until ready.
fn loaded_sd_bridge(
    auxes: Vec<AuxConfig>,
    channels: Vec<u32>,
) -> (BridgeController<RecordingConsole>, RecordingConsole) {
    let console = RecordingConsole::default();
    let mut bridge =
        BridgeController::new(&config(ConsoleFamily::Sd, auxes, channels), console.clone())
            .unwrap();
    bridge.start().unwrap();

    let mut answered = 0;
    while !bridge.is_ready() {
        let request = console.sent()[answered].clone();
        answered += 1;
        bridge.on_console_message(&sd_answer(&request.address)).unwrap();
    }
    (bridge, console)
}

/// What an SD console would reply to a query address.
fn sd_answer(query: &str) -> WireMessage {
    let address = query.trim_end_matches("/?");
    let arg = if address.ends_with("name") {
        WireValue::Str("Name".to_string())
    } else if address.ends_with("send_pan") {
        WireValue::Float(0.5)
    } else {
        WireValue::Float(0.75)
    };
    WireMessage::new(address, vec![arg])
}

fn connect(bridge: &mut BridgeController<RecordingConsole>) -> (ConnectionId, Browser) {
    let id = ConnectionId::new();
    let browser = Browser::default();
    bridge
        .dispatch(BridgeEvent::ClientConnected {
            id,
            sink: Box::new(browser.clone()),
        })
        .unwrap();
    (id, browser)
}

fn client(text: &str) -> ClientMessage {
    serde_json::from_str(text).unwrap()
}

// ── Scenarios ─────────────────────────────────────────────────────────────────

#[test]
fn test_sd_load_requests_every_address_once_then_ready() {
    // Arrange / Act
    let (bridge, console) = loaded_sd_bridge(vec![aux(1, 70, true)], vec![3, 4]);

    // Assert: 1 aux name + 2×(pan+level) + 2 channel names
    assert!(bridge.is_ready());
    let sent = console.sent();
    assert_eq!(sent.len(), 7);
    assert_eq!(sent[0].address, "/sd/Aux_Outputs/1/Buss_Trim/name/?");
    assert_eq!(sent[1].address, "/sd/Input_Channels/3/Aux_Send/1/send_pan/?");
    assert_eq!(sent[6].address, "/sd/Input_Channels/4/Channel_Input/name/?");
    assert!(sent.iter().all(|m| m.args.is_empty()));
}

#[test]
fn test_new_connection_receives_config_without_values() {
    let (mut bridge, _) = loaded_sd_bridge(vec![aux(1, 70, true)], vec![3]);

    let (_, browser) = connect(&mut bridge);

    let frames = browser.frames();
    assert_eq!(frames.len(), 1);
    let config = &frames[0]["config"];
    assert_eq!(config["channels"], json!([{"channel": 3, "label": "Name"}]));
    assert_eq!(config["aux"][0]["channel"], 1);
    assert_eq!(config["aux"][0]["stereo"], true);
    assert_eq!(config["aux"][0]["label"], "Name");
    assert!(!frames[0].to_string().contains("level"));
}

#[test]
fn test_console_update_reaches_every_browser() {
    // Arrange
    let (mut bridge, _) = loaded_sd_bridge(vec![aux(1, 70, false)], vec![3]);
    let (_, b) = connect(&mut bridge);
    let (_, c) = connect(&mut bridge);

    // Act
    bridge
        .dispatch(BridgeEvent::Console(WireMessage::new(
            "/sd/Input_Channels/3/Aux_Send/1/send_level",
            vec![WireValue::Float(0.4)],
        )))
        .unwrap();

    // Assert
    let expected = json!({"aux": 1, "channel": 3, "level": 0.4});
    assert_eq!(b.last(), expected);
    assert_eq!(c.last(), expected);
}

#[test]
fn test_console_update_the_store_rejects_is_still_relayed() {
    // Arrange: mono aux 1, so a pan has nowhere to go; aux 4 is unconfigured
    let (mut bridge, _) = loaded_sd_bridge(vec![aux(1, 70, false)], vec![3]);
    let (_, browser) = connect(&mut bridge);

    // Act
    bridge
        .on_console_message(&WireMessage::new(
            "/sd/Input_Channels/3/Aux_Send/1/send_pan",
            vec![WireValue::Float(0.2)],
        ))
        .unwrap();
    bridge
        .on_console_message(&WireMessage::new(
            "/sd/Aux_Outputs/4/Buss_Trim/name",
            vec![WireValue::Str("X".to_string())],
        ))
        .unwrap();

    // Assert: both relayed, store unchanged
    let frames = browser.frames();
    assert_eq!(frames.len(), 3);
    assert_eq!(frames[2], json!({"auxname": "X", "channel": 4}));
    assert_eq!(bridge.store().value(1, 3).unwrap().pan(), None);
    assert!(bridge.store().aux(4).is_none());
}

#[test]
fn test_client_update_reaches_console_and_other_browsers_only() {
    // Arrange
    let (mut bridge, console) = loaded_sd_bridge(vec![aux(1, 70, true)], vec![3]);
    let (a_id, a) = connect(&mut bridge);
    let (_, b) = connect(&mut bridge);
    let sent_before = console.sent().len();

    // Act
    bridge
        .dispatch(BridgeEvent::ClientMessage {
            id: a_id,
            message: client(r#"{"aux":1,"channel":3,"pan":-0.5}"#),
        })
        .unwrap();

    // Assert: console gets the SD wire pan, B gets the update, A does not
    let sent = console.sent();
    assert_eq!(sent.len(), sent_before + 1);
    let wire = sent.last().unwrap();
    assert_eq!(wire.address, "/sd/Input_Channels/3/Aux_Send/1/send_pan");
    assert_eq!(wire.args, vec![WireValue::Float(0.25)]);
    assert_eq!(b.last(), json!({"aux": 1, "channel": 3, "pan": -0.5}));
    assert_eq!(a.frames().len(), 1, "originator only has its config frame");
}

#[test]
fn test_aux_query_answers_only_the_asker() {
    // Arrange: mono aux, one channel loaded at 0.75
    let (mut bridge, _) = loaded_sd_bridge(vec![aux(1, 70, false)], vec![3]);
    let (a_id, a) = connect(&mut bridge);
    let (_, b) = connect(&mut bridge);

    // Act
    bridge
        .dispatch(BridgeEvent::ClientMessage {
            id: a_id,
            message: client(r#"{"aux?":1}"#),
        })
        .unwrap();

    // Assert
    assert_eq!(
        a.last(),
        json!({"aux?": 1, "channels": {"3": {"level": 0.75}}})
    );
    assert_eq!(b.frames().len(), 1);
}

#[test]
fn test_aux_query_with_string_aux_number_is_answered() {
    let (mut bridge, _) = loaded_sd_bridge(vec![aux(1, 70, false)], vec![3]);
    let (id, browser) = connect(&mut bridge);

    bridge
        .on_client_message(id, client(r#"{"aux?":"1"}"#))
        .unwrap();

    assert_eq!(
        browser.last(),
        json!({"aux?": 1, "channels": {"3": {"level": 0.75}}})
    );
}

#[test]
fn test_aux_query_for_unknown_aux_is_empty() {
    let (mut bridge, _) = loaded_sd_bridge(vec![aux(1, 70, false)], vec![3]);
    let (id, browser) = connect(&mut bridge);

    bridge
        .on_client_message(id, client(r#"{"aux?":8}"#))
        .unwrap();

    assert_eq!(browser.last(), json!({"aux?": 8, "channels": {}}));
}

#[test]
fn test_update_outside_configured_mix_is_a_no_op() {
    // Arrange
    let (mut bridge, console) = loaded_sd_bridge(vec![aux(1, 70, false)], vec![3]);
    let (a_id, _) = connect(&mut bridge);
    let (_, b) = connect(&mut bridge);
    let sent_before = console.sent().len();

    // Act: channel 12 and aux 5 are not configured
    for text in [
        r#"{"aux":1,"channel":12,"level":0.3}"#,
        r#"{"aux":5,"channel":3,"level":0.3}"#,
    ] {
        bridge.on_client_message(a_id, client(text)).unwrap();
    }

    // Assert
    assert_eq!(console.sent().len(), sent_before);
    assert_eq!(b.frames().len(), 1);
}

#[test]
fn test_ignored_channel_name_from_console_is_not_stored() {
    let (mut bridge, _) = loaded_sd_bridge(vec![aux(1, 70, false)], vec![3]);
    let (_, browser) = connect(&mut bridge);

    bridge
        .on_console_message(&WireMessage::new(
            "/sd/Input_Channels/99/Channel_Input/name",
            vec![WireValue::Str("Talkback".to_string())],
        ))
        .unwrap();

    // The store never tracks it, though browsers still see the relay
    assert!(bridge.store().channels().iter().all(|c| c.number != 99));
    assert_eq!(browser.frames().len(), 2);
}

#[test]
fn test_unconfigured_channel_name_is_added_at_the_front() {
    let (mut bridge, _) = loaded_sd_bridge(vec![aux(1, 70, false)], vec![3]);

    bridge
        .on_console_message(&WireMessage::new(
            "/sd/Input_Channels/7/Channel_Input/name",
            vec![WireValue::Str("Spare".to_string())],
        ))
        .unwrap();

    let first = &bridge.store().channels()[0];
    assert_eq!(first.number, 7);
    assert_eq!(first.label.as_deref(), Some("Spare"));
    assert!(bridge.is_ready());
}

#[test]
fn test_disconnected_browser_stops_receiving() {
    let (mut bridge, _) = loaded_sd_bridge(vec![aux(1, 70, false)], vec![3]);
    let (id, browser) = connect(&mut bridge);

    bridge
        .dispatch(BridgeEvent::ClientDisconnected { id })
        .unwrap();
    bridge
        .on_console_message(&WireMessage::new(
            "/sd/Input_Channels/3/Aux_Send/1/send_level",
            vec![WireValue::Float(0.1)],
        ))
        .unwrap();

    assert!(bridge.hub().is_empty());
    assert_eq!(browser.frames().len(), 1);
}

#[test]
fn test_s_series_loads_from_resend_dump() {
    // Arrange: stereo aux 9 on send 70, channels 1 and 2
    let console = RecordingConsole::default();
    let mut bridge = BridgeController::new(
        &config(ConsoleFamily::S, vec![aux(9, 70, true)], vec![1, 2]),
        console.clone(),
    )
    .unwrap();

    // Act 1
    bridge.start().unwrap();

    // Assert 1: one resend request, nothing more while the dump streams in
    assert_eq!(console.sent(), vec![WireMessage::request("/console/resend")]);

    // Act 2: the console dumps its state
    let dump = [
        ("/channel/9/name", WireValue::Str("IEM 1".into())),
        ("/channel/1/name", WireValue::Str("Kick".into())),
        ("/channel/2/name", WireValue::Str("Snare".into())),
        ("/channel/1/send/70/level", WireValue::Float(-10.0)),
        ("/channel/1/send/70/pan", WireValue::Float(0.0)),
        ("/channel/2/send/70/level", WireValue::Float(10.0)),
        ("/channel/2/send/70/pan", WireValue::Float(-1.0)),
    ];
    for (address, arg) in dump {
        assert!(!bridge.is_ready());
        bridge
            .on_console_message(&WireMessage::new(address, vec![arg]))
            .unwrap();
    }

    // Assert 2
    assert!(bridge.is_ready());
    assert_eq!(console.sent().len(), 1);
    assert_eq!(bridge.store().aux(9).unwrap().label.as_deref(), Some("IEM 1"));
    let level = bridge.store().value(9, 1).unwrap().level().unwrap();
    assert!((level - 50.0 / 70.0).abs() < 1e-5);
    assert_eq!(bridge.store().value(9, 2).unwrap().level(), Some(1.0));
}

#[test]
fn test_s_series_client_level_is_sent_in_db_on_the_send_number() {
    // Arrange
    let console = RecordingConsole::default();
    let mut bridge = BridgeController::new(
        &BridgeConfig {
            skip_loading: true,
            ..config(ConsoleFamily::S, vec![aux(9, 70, false)], vec![1])
        },
        console.clone(),
    )
    .unwrap();
    bridge.start().unwrap();

    // Act
    bridge
        .on_client_message(
            ConnectionId::new(),
            ClientMessage::Update(MixerUpdate::Level {
                aux: 9,
                channel: 1,
                level: 1.0,
            }),
        )
        .unwrap();

    // Assert
    let sent = console.sent();
    assert_eq!(sent.len(), 1);
    assert_eq!(sent[0].address, "/channel/1/send/70/level");
    assert_eq!(sent[0].args, vec![WireValue::Float(10.0)]);
}

#[test]
fn test_skip_loading_serves_configured_labels_and_null_values() {
    // Arrange
    let mut labelled = aux(1, 70, true);
    labelled.label = Some("Drums".to_string());
    let mut bridge = BridgeController::new(
        &BridgeConfig {
            skip_loading: true,
            ..config(ConsoleFamily::Sd, vec![labelled], vec![3])
        },
        RecordingConsole::default(),
    )
    .unwrap();
    bridge.start().unwrap();
    let (id, browser) = connect(&mut bridge);

    // Act
    bridge.on_client_message(id, client(r#"{"aux?":1}"#)).unwrap();

    // Assert
    let frames = browser.frames();
    assert_eq!(frames[0]["config"]["aux"][0]["label"], "Drums");
    assert_eq!(
        frames[1],
        json!({"aux?": 1, "channels": {"3": {"level": null, "pan": null}}})
    );
}
