//! End-to-end event-pump tests: protocol events delivered on the client's
//! task must flow through the controller into the encounter trace with
//! presence deduplication applied.

use std::sync::Arc;
use std::time::Duration;

use gridmimic_core::encounter::DEFAULT_ACTOR;
use gridmimic_core::mock::{MemoryWriter, ScriptedClient};
use gridmimic_core::{
    BehaviorMode, EncounterLog, ProtocolEvent, SessionClient, SessionController, SessionState,
};

fn harness() -> (Arc<SessionController>, Arc<ScriptedClient>, MemoryWriter) {
    let writer = MemoryWriter::new();
    let log = Arc::new(EncounterLog::with_console_writer(
        DEFAULT_ACTOR,
        None,
        Box::new(writer.clone()),
    ));
    let client = Arc::new(ScriptedClient::accepting());
    let controller = Arc::new(SessionController::new(
        client.clone(),
        log,
        BehaviorMode::Standard,
        "Hello from the harness",
    ));
    (controller, client, writer)
}

/// Let the pump task drain everything queued so far.
async fn settle() {
    tokio::time::sleep(Duration::from_millis(50)).await;
}

#[tokio::test]
async fn pump_deduplicates_presence_across_redundant_updates() {
    let (controller, client, writer) = harness();
    let events = client.subscribe();
    let pump = tokio::spawn(controller.clone().run_event_pump(events));

    controller
        .login("Test", "User", "password", "http://localhost:9000/")
        .await
        .unwrap();

    // The server under test resends updates; the trace must not repeat.
    for _ in 0..3 {
        client.push_event(ProtocolEvent::ObjectUpdate {
            local_id: 11,
            is_avatar: true,
        });
    }
    client.push_event(ProtocolEvent::ObjectUpdate {
        local_id: 12,
        is_avatar: false,
    });
    client.push_event(ProtocolEvent::ObjectKilled { local_id: 11 });
    client.push_event(ProtocolEvent::ObjectKilled { local_id: 99 });
    settle().await;

    let signals = writer.signals();
    let presences = signals.iter().filter(|s| s.starts_with("Presence")).count();
    let vanishes = signals.iter().filter(|s| *s == "Vanished").count();
    assert_eq!(presences, 2);
    assert_eq!(vanishes, 1);
    assert_eq!(controller.sighting_counts().unwrap(), (0, 1));

    pump.abort();
}

#[tokio::test]
async fn pump_survives_events_interleaved_with_foreground_commands() {
    let (controller, client, writer) = harness();
    let events = client.subscribe();
    let pump = tokio::spawn(controller.clone().run_event_pump(events));

    controller
        .login("Test", "User", "password", "http://localhost:9000/")
        .await
        .unwrap();

    // Background chatter while the foreground issues an action.
    client.push_event(ProtocolEvent::ChatReceived {
        from_name: "Observer".to_string(),
        raw_message: vec![0x68, 0x69, 0x00],
        reliable: true,
        zerocoded: false,
    });
    controller.chat("outbound").await.unwrap();
    client.push_event(ProtocolEvent::AlertMessage {
        message: "region restart in 5 minutes".to_string(),
    });
    settle().await;

    let lines = writer.lines();
    // Every record arrived whole; nothing interleaved mid-line.
    assert!(lines.iter().all(|l| l.starts_with("{ \"at\": \"") && l.ends_with("\" }")));
    assert!(lines.iter().any(|l| l.contains("Dialect:NullTerminated")));
    assert!(lines.iter().any(|l| l.contains("region restart")));
    assert!(lines.iter().any(|l| l.contains("Msg: outbound")));

    pump.abort();
}

#[tokio::test]
async fn passive_disconnect_resets_the_session() {
    let (controller, client, _writer) = harness();
    let events = client.subscribe();
    let pump = tokio::spawn(controller.clone().run_event_pump(events));

    controller
        .login("Test", "User", "password", "http://localhost:9000/")
        .await
        .unwrap();
    client.push_event(ProtocolEvent::ObjectUpdate {
        local_id: 7,
        is_avatar: false,
    });
    client.push_event(ProtocolEvent::Disconnected {
        reason: "simulator went away".to_string(),
    });
    settle().await;

    assert_eq!(controller.state(), SessionState::Disconnected);

    // The session stays usable for a fresh login with an empty seen-set.
    controller
        .login("Test", "User", "password", "http://localhost:9000/")
        .await
        .unwrap();
    assert_eq!(controller.sighting_counts().unwrap(), (0, 0));

    pump.abort();
}
