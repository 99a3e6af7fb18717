use crate::helpers::DEADLINE;

use bridge_core::connection::event::BridgeEvent;
use bridge_core::error::process::ProcessError;
use bridge_core::process::{ProcessBridge, ProxyProcess};

use std::path::Path;

use tokio::sync::mpsc;
use tokio::time::timeout;

// ============================================================================
// Public API tests for the proxy process bridge
// Standard unix tools stand in for the peer's proxy executable
// ============================================================================

async fn next_event(events: &mut mpsc::Receiver<BridgeEvent>) -> BridgeEvent {
    timeout(DEADLINE, events.recv())
        .await
        .expect("event before the deadline")
        .expect("event channel open")
}

fn sh(script: &str) -> Vec<String> {
    vec!["-c".to_string(), script.to_string()]
}

#[tokio::test]
async fn given_missing_executable_when_starting_then_spawn_failed() {
    // GIVEN: A path with nothing behind it
    let (events, _events_rx) = mpsc::channel(16);
    let mut bridge = ProcessBridge::new(events);

    // WHEN: Starting it
    let result = bridge.start(Path::new("/nonexistent/bitwarden-proxy"), &[]);

    // THEN: SpawnFailed carrying the path, nothing running
    match result {
        Err(ProcessError::SpawnFailed { path, .. }) => {
            assert_eq!(path, Path::new("/nonexistent/bitwarden-proxy"));
        }
        other => panic!("Expected SpawnFailed, got {other:?}"),
    }
    assert!(!bridge.is_running());
}

#[tokio::test]
async fn given_stopped_bridge_when_sending_then_not_running() {
    let (events, _events_rx) = mpsc::channel(16);
    let mut bridge = ProcessBridge::new(events);

    let result = bridge.send(b"{}");

    assert!(matches!(result, Err(ProcessError::NotRunning { .. })));
}

/// **VALUE**: Frames written to the peer's stdin and read from its stdout
/// survive the trip through a real pipe.
///
/// **WHY THIS MATTERS**: `cat` echoes our own framing back, so this covers the
/// writer, the reader and the codec on real file descriptors.
///
/// **BUG THIS CATCHES**: A missing flush leaving frames stuck in the writer,
/// or the reader emitting partial frames.
#[cfg(unix)]
#[tokio::test]
async fn given_cat_as_peer_when_sending_frames_then_they_come_back_in_order() {
    // GIVEN: `cat` as the proxy
    let (events, mut events_rx) = mpsc::channel(16);
    let mut bridge = ProcessBridge::new(events);
    let generation = bridge.start(Path::new("cat"), &[]).expect("cat spawns");
    assert!(bridge.is_running());

    // WHEN: Sending two frames, one larger than a pipe buffer
    let large = vec![b'x'; 100 * 1024];
    bridge.send(br#"{"command":"connected"}"#).expect("sends");
    bridge.send(&large).expect("sends");

    // THEN: Both come back whole, in order, tagged with our generation
    let mut received = Vec::new();
    while received.len() < 2 {
        match next_event(&mut events_rx).await {
            BridgeEvent::MessageReceived { generation: g, data } => {
                assert_eq!(g, generation);
                received.push(data);
            }
            other => panic!("Unexpected event {other:?}"),
        }
    }
    assert_eq!(received[0], br#"{"command":"connected"}"#);
    assert_eq!(received[1], large);

    bridge.stop();
    assert!(!bridge.is_running());
}

#[cfg(unix)]
#[tokio::test]
async fn given_peer_that_exits_when_waiting_then_process_terminated() {
    // GIVEN: A proxy that writes one frame and exits
    let (events, mut events_rx) = mpsc::channel(16);
    let mut bridge = ProcessBridge::new(events);
    let generation = bridge
        .start(Path::new("sh"), &sh(r"printf '\005\000\000\000hello'"))
        .expect("sh spawns");

    // WHEN: Collecting events until both the frame and the exit arrived
    let mut message = None;
    let mut terminated = false;
    while message.is_none() || !terminated {
        match next_event(&mut events_rx).await {
            BridgeEvent::MessageReceived { data, .. } => message = Some(data),
            BridgeEvent::ProcessTerminated { generation: g } => {
                assert_eq!(g, generation);
                terminated = true;
            }
            other => panic!("Unexpected event {other:?}"),
        }
    }

    // THEN: The frame arrived and the bridge no longer counts as running
    assert_eq!(message.as_deref(), Some(b"hello".as_slice()));
    assert!(!bridge.is_running());
    assert!(matches!(bridge.send(b"{}"), Err(ProcessError::NotRunning { .. })));
}

/// **VALUE**: A garbage length prefix is reported once and reading stops.
///
/// **WHY THIS MATTERS**: The manager relies on this event to restart the peer.
/// Reading on would feed misaligned bytes into the JSON decoder.
///
/// **BUG THIS CATCHES**: The reader swallowing codec errors.
#[cfg(unix)]
#[tokio::test]
async fn given_peer_writing_oversized_prefix_when_read_then_frame_stream_corrupted() {
    let (events, mut events_rx) = mpsc::channel(16);
    let mut bridge = ProcessBridge::new(events);
    let generation = bridge
        .start(Path::new("sh"), &sh(r"printf '\377\377\377\377'; sleep 5"))
        .expect("sh spawns");

    match next_event(&mut events_rx).await {
        BridgeEvent::FrameStreamCorrupted { generation: g } => assert_eq!(g, generation),
        other => panic!("Expected FrameStreamCorrupted, got {other:?}"),
    }

    bridge.stop();
}

#[cfg(unix)]
#[tokio::test]
async fn given_running_peer_when_restarted_then_generation_increases_and_old_exit_is_silent() {
    // GIVEN: A long-running proxy
    let (events, mut events_rx) = mpsc::channel(16);
    let mut bridge = ProcessBridge::new(events);
    let first = bridge.start(Path::new("sleep"), &["30".to_string()]).expect("spawns");

    // WHEN: Starting again, which stops the first one
    let second = bridge
        .start(Path::new("sh"), &sh("exit 0"))
        .expect("spawns");

    // THEN: A new generation, and the only exit reported is the second one's
    assert_eq!(second, first + 1);
    match next_event(&mut events_rx).await {
        BridgeEvent::ProcessTerminated { generation } => assert_eq!(generation, second),
        other => panic!("Expected ProcessTerminated, got {other:?}"),
    }
}
