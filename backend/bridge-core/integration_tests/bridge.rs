use crate::helpers::{DEADLINE, immediate_status_config, spawn_bridge};

use bridge_core::config::BridgeConfig;
use bridge_core::error::{BridgeError, CredentialError};
use bridge_core::key_store::MemoryKeyStore;
use bridge_core::message::COMMAND_CREDENTIAL_RETRIEVAL;
use bridge_core::testing::FakePeer;

use models::{ConnectionStatus, VaultStatus};

use serde_json::json;
use tokio::time::timeout;
use url::Url;

// ============================================================================
// Public API tests for the bridge actor and its handle
// ============================================================================

#[tokio::test]
async fn given_spawned_bridge_when_not_initialised_then_status_is_disabled() {
    let bridge = spawn_bridge(BridgeConfig::default(), MemoryKeyStore::new());

    assert_eq!(bridge.handle.status(), ConnectionStatus::Disabled);
    assert_eq!(bridge.proxy.starts(), 0);
}

/// **VALUE**: Drives the whole connection through the public handle, the
/// way the application does.
///
/// **WHY THIS MATTERS**: The manager is tested synchronously; this proves the
/// actor, the watch channel and the command path hold together.
///
/// **BUG THIS CATCHES**: Commands never reaching the actor, or status changes
/// not being published to subscribers.
#[tokio::test]
async fn given_fresh_bridge_when_handshake_completes_through_handle_then_connected() {
    // GIVEN: A bridge with no stored key and a willing peer
    let peer = FakePeer::new();
    let bridge = spawn_bridge(immediate_status_config(), MemoryKeyStore::new());

    // WHEN: Initialising and connecting
    bridge.handle.init_communication().await.expect("actor running");
    bridge
        .wait_for_status(|status| *status == ConnectionStatus::MissingHandshake)
        .await;
    bridge.deliver(FakePeer::connected()).await;

    // WHEN: The application asks for the handshake and the peer accepts
    bridge.handle.send_handshake().await.expect("actor running");
    let handshake = bridge.next_request().await;
    bridge
        .deliver(peer.accept_handshake(&handshake).expect("peer accepts"))
        .await;

    // WHEN: The peer answers the status request
    let status_request = bridge.next_request().await;
    bridge
        .deliver(
            peer.status(&status_request.message_id, "user@example.com", "unlocked", true)
                .expect("peer encrypts"),
        )
        .await;

    // THEN: Connected with an unlocked vault, key persisted
    let status = bridge.wait_for_status(ConnectionStatus::is_connected).await;
    assert_eq!(
        status.vault().map(|vault| vault.status),
        Some(VaultStatus::Unlocked)
    );
    assert_eq!(bridge.keys.current(), Some(peer.stored_key()));
}

#[tokio::test]
async fn given_disconnected_bridge_when_retrieving_then_not_connected() {
    let bridge = spawn_bridge(BridgeConfig::default(), MemoryKeyStore::new());
    let url = Url::parse("https://example.com/").expect("valid url");

    let result = bridge.handle.retrieve_credentials(url).await;

    assert!(matches!(result, Err(CredentialError::NotConnected { .. })));
}

#[tokio::test]
async fn given_connected_bridge_when_retrieving_through_handle_then_receives_credentials() {
    // GIVEN: Connected through a stored key
    let peer = FakePeer::new();
    let bridge = spawn_bridge(
        immediate_status_config(),
        MemoryKeyStore::with_key(peer.stored_key()),
    );
    bridge.handle.init_communication().await.expect("actor running");
    bridge.deliver(FakePeer::connected()).await;
    let status_request = bridge.next_request().await;
    bridge
        .deliver(
            peer.status(&status_request.message_id, "user@example.com", "unlocked", true)
                .expect("peer encrypts"),
        )
        .await;
    bridge.wait_for_status(ConnectionStatus::is_connected).await;

    // WHEN: A caller asks for credentials while the peer answers
    let handle = bridge.handle.clone();
    let url = Url::parse("https://example.com/login").expect("valid url");
    let call = tokio::spawn(async move { handle.retrieve_credentials(url).await });

    let request = bridge.next_request().await;
    bridge
        .deliver(
            peer.encrypted(
                &request.message_id,
                json!({
                    "command": COMMAND_CREDENTIAL_RETRIEVAL,
                    "payload": [{ "userId": "u", "credentialId": "c", "userName": "alice" }],
                }),
            )
            .expect("peer encrypts"),
        )
        .await;

    // THEN: The caller gets the credential
    let credentials = timeout(DEADLINE, call)
        .await
        .expect("answered before the deadline")
        .expect("task did not panic")
        .expect("retrieval succeeds");
    assert_eq!(credentials.len(), 1);
    assert_eq!(credentials[0].username.as_deref(), Some("alice"));
}

/// **VALUE**: Verifies retry timers run on real tokio time through the actor.
///
/// **WHY THIS MATTERS**: The scheduler posts into the same channel as every
/// other event; a timer that never reaches the manager means no reconnect.
///
/// **BUG THIS CATCHES**: The scheduler holding the wrong sender, or the
/// manager ignoring its own fresh timer as stale.
#[tokio::test(start_paused = true)]
async fn given_peer_not_running_when_it_starts_then_reconnect_timer_connects() {
    // GIVEN: A peer that is not running yet
    let bridge = spawn_bridge(BridgeConfig::default(), MemoryKeyStore::new());
    bridge.env.set_running(false);
    bridge.handle.init_communication().await.expect("actor running");
    bridge
        .wait_for_status(|status| *status == ConnectionStatus::NotRunning)
        .await;

    // WHEN: The peer starts and the reconnect delay passes
    bridge.env.set_running(true);

    // THEN: The retry starts the proxy
    bridge
        .wait_for_status(|status| *status == ConnectionStatus::MissingHandshake)
        .await;
    assert!(bridge.proxy.is_running());
    assert_eq!(bridge.proxy.starts(), 1);
}

#[tokio::test]
async fn given_connected_bridge_when_cancelled_through_handle_then_disabled() {
    let peer = FakePeer::new();
    let bridge = spawn_bridge(
        immediate_status_config(),
        MemoryKeyStore::with_key(peer.stored_key()),
    );
    bridge.handle.init_communication().await.expect("actor running");
    bridge.deliver(FakePeer::connected()).await;
    let status_request = bridge.next_request().await;
    bridge
        .deliver(
            peer.status(&status_request.message_id, "user@example.com", "locked", true)
                .expect("peer encrypts"),
        )
        .await;
    bridge.wait_for_status(ConnectionStatus::is_connected).await;

    bridge.handle.cancel_communication().await.expect("actor running");

    bridge
        .wait_for_status(|status| *status == ConnectionStatus::Disabled)
        .await;
    assert!(!bridge.proxy.is_running());
    assert!(bridge.keys.current().is_none());
}

/// **VALUE**: After shutdown every entry point reports the stop instead of hanging.
///
/// **WHY THIS MATTERS**: The application may still hold handle clones while
/// quitting; awaiting a dead actor forever would block the exit path.
///
/// **BUG THIS CATCHES**: Pending credential calls left without an answer, or
/// commands silently dropped after the actor ended.
#[tokio::test]
async fn given_shutdown_when_calling_handle_then_reports_bridge_stopped() {
    // GIVEN: A connected bridge with a credential call in flight
    let peer = FakePeer::new();
    let bridge = spawn_bridge(
        immediate_status_config(),
        MemoryKeyStore::with_key(peer.stored_key()),
    );
    bridge.handle.init_communication().await.expect("actor running");
    bridge.deliver(FakePeer::connected()).await;
    let status_request = bridge.next_request().await;
    bridge
        .deliver(
            peer.status(&status_request.message_id, "user@example.com", "unlocked", true)
                .expect("peer encrypts"),
        )
        .await;
    bridge.wait_for_status(ConnectionStatus::is_connected).await;

    let handle = bridge.handle.clone();
    let url = Url::parse("https://example.com/").expect("valid url");
    let call = tokio::spawn(async move { handle.retrieve_credentials(url).await });
    let _request = bridge.next_request().await;

    // WHEN: Shutting down
    bridge.handle.shutdown().await.expect("actor running");
    timeout(DEADLINE, bridge.task)
        .await
        .expect("actor stops before the deadline")
        .expect("actor did not panic");

    // THEN: The pending call and later commands report the stop
    let result = timeout(DEADLINE, call)
        .await
        .expect("answered before the deadline")
        .expect("task did not panic");
    assert!(matches!(result, Err(CredentialError::BridgeStopped { .. })));
    assert!(matches!(
        bridge.handle.init_communication().await,
        Err(BridgeError::Stopped { .. })
    ));
}
