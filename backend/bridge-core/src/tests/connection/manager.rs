use super::{Harness, test_config};

use crate::connection::event::{BridgeCommand, BridgeEvent};
use crate::key_store::MemoryKeyStore;
use crate::message::{COMMAND_HANDSHAKE, COMMAND_STATUS, PEER_ERROR_CANNOT_DECRYPT, PEER_ERROR_LOCKED};
use crate::scheduler::TimerKind;
use crate::testing::{FailingKeyStore, FakePeer};

use models::{BridgeErrorKind, ConnectionStatus, InstallationState, VaultStatus};

use std::ops::ControlFlow;

// ============================================
// CONNECT CHECKS
// ============================================

/// **VALUE**: The reconnect timer is at-most-one no matter how often a connect fails.
///
/// **WHY THIS MATTERS**: Every failed attempt asks for a retry. Stacking timers
/// would multiply attempts until the peer is launched many times a second.
///
/// **BUG THIS CATCHES**: `schedule_reconnect` scheduling unconditionally.
#[test]
fn given_peer_not_installed_when_init_twice_then_one_reconnect_timer() {
    // GIVEN: No peer on disk
    let mut harness = Harness::new();
    harness.env.set_installation(InstallationState::NotInstalled);

    // WHEN: Trying to connect twice before the timer fires
    harness.manager.init_communication();
    harness.manager.init_communication();

    // THEN: NotInstalled, one reconnect timer, no process
    assert_eq!(harness.status(), ConnectionStatus::NotInstalled);
    assert_eq!(harness.scheduler.count(TimerKind::Reconnect), 1);
    assert!(harness.manager.has_reconnect_timer());
    assert_eq!(harness.proxy.starts(), 0);
}

#[test]
fn given_old_version_when_init_then_status_old_version_and_retry() {
    let mut harness = Harness::new();
    harness.env.set_installation(InstallationState::OldVersion);

    harness.manager.init_communication();

    assert_eq!(harness.status(), ConnectionStatus::OldVersion);
    assert_eq!(harness.scheduler.count(TimerKind::Reconnect), 1);
}

#[test]
fn given_peer_not_running_when_init_then_status_not_running_and_retry() {
    let mut harness = Harness::new();
    harness.env.set_running(false);

    harness.manager.init_communication();

    assert_eq!(harness.status(), ConnectionStatus::NotRunning);
    assert_eq!(harness.scheduler.count(TimerKind::Reconnect), 1);
    assert_eq!(harness.proxy.starts(), 0);
}

#[test]
fn given_integration_not_approved_when_init_then_status_not_approved_and_retry() {
    let mut harness = Harness::new();
    harness.env.set_approved(false);

    harness.manager.init_communication();

    assert_eq!(harness.status(), ConnectionStatus::IntegrationNotApproved);
    assert_eq!(harness.scheduler.count(TimerKind::Reconnect), 1);
    assert_eq!(harness.proxy.starts(), 0);
}

#[test]
fn given_peer_not_selected_when_init_then_nothing_happens() {
    let mut harness = Harness::new();
    harness.env.set_selected(false);

    harness.manager.init_communication();

    assert_eq!(harness.status(), ConnectionStatus::Disabled);
    assert!(harness.scheduler.pending().is_empty());
    assert_eq!(harness.proxy.starts(), 0);
}

#[test]
fn given_not_installed_when_installed_before_retry_then_retry_starts_proxy() {
    // GIVEN: A failed attempt with its retry pending
    let mut harness = Harness::new();
    harness.env.set_installation(InstallationState::NotInstalled);
    harness.manager.init_communication();

    // WHEN: The peer appears and the retry fires
    harness.env.set_installation(InstallationState::Installed);
    assert!(harness.fire(TimerKind::Reconnect));

    // THEN: The proxy runs and no further retry is pending
    assert_eq!(harness.status(), ConnectionStatus::MissingHandshake);
    assert!(harness.proxy.is_running());
    assert!(!harness.manager.has_reconnect_timer());
}

#[test]
fn given_stored_key_when_init_then_status_connecting() {
    let peer = FakePeer::new();
    let mut harness =
        Harness::with_store(test_config(), MemoryKeyStore::with_key(peer.stored_key()));

    harness.manager.init_communication();

    assert_eq!(harness.status(), ConnectionStatus::Connecting);
    assert!(harness.proxy.is_running());
}

#[test]
fn given_unreadable_key_store_when_init_then_status_missing_handshake() {
    let mut harness = Harness::with_key_store(
        test_config(),
        FailingKeyStore {
            fail_read: true,
            fail_write: false,
        },
    );

    harness.manager.init_communication();

    assert_eq!(harness.status(), ConnectionStatus::MissingHandshake);
    assert!(harness.proxy.is_running());
}

#[test]
fn given_spawn_failure_when_init_then_error_and_retry() {
    let mut harness = Harness::new();
    harness.proxy.set_fail_start(true);

    harness.manager.init_communication();

    assert_eq!(
        harness.status(),
        ConnectionStatus::error(BridgeErrorKind::RunningOfProxyProcessFailed)
    );
    assert_eq!(harness.scheduler.count(TimerKind::Reconnect), 1);
}

// ============================================
// END TO END
// ============================================

/// **VALUE**: Walks the whole first-time connection, from missing peer to an
/// unlocked vault.
///
/// **WHY THIS MATTERS**: This is the path every new user takes. Each step
/// depends on state left behind by the previous one.
///
/// **BUG THIS CATCHES**: Broken hand-offs between steps: a key decrypted but
/// not stored, status never requested after the handshake, or the refresh
/// timer left running once the vault is unlocked.
#[test]
fn given_fresh_install_when_handshake_and_status_complete_then_connected() {
    let peer = FakePeer::new();
    let mut harness = Harness::new();

    // (1) Peer not installed
    harness.env.set_installation(InstallationState::NotInstalled);
    harness.manager.init_communication();
    assert_eq!(harness.status(), ConnectionStatus::NotInstalled);

    // (2) Installed, running, approved, no stored key
    harness.env.set_installation(InstallationState::Installed);
    assert!(harness.fire(TimerKind::Reconnect));
    assert_eq!(harness.status(), ConnectionStatus::MissingHandshake);
    assert!(harness.proxy.is_running());

    // (3) Peer connects; nothing is sent until the application asks for a handshake
    harness.deliver(FakePeer::connected());
    assert!(harness.sent().is_empty());
    harness.manager.send_handshake();
    let handshake = harness.single_sent();
    assert_eq!(handshake.command.as_deref(), Some(COMMAND_HANDSHAKE));
    assert_eq!(
        handshake.payload.as_ref().map(|p| p.application_name.as_str()),
        Some("Bitwarden")
    );

    // (4) Peer accepts; key stored, status requested
    harness.deliver(peer.accept_handshake(&handshake).expect("peer accepts"));
    assert_eq!(harness.status(), ConnectionStatus::WaitingForStatusResponse);
    assert_eq!(harness.keys.current(), Some(peer.stored_key()));
    let status_request = harness.single_sent();
    assert_eq!(
        peer.open(&status_request).expect("peer decrypts").command,
        COMMAND_STATUS
    );

    // (5) Unlocked vault reported
    harness.deliver(
        peer.status(&status_request.message_id, "user@example.com", "unlocked", true)
            .expect("peer encrypts"),
    );
    let ConnectionStatus::Connected { vault } = harness.status() else {
        panic!("Expected Connected, got {}", harness.status());
    };
    assert_eq!(vault.email, "user@example.com");
    assert_eq!(vault.status, VaultStatus::Unlocked);
    assert!(!harness.manager.has_refresh_timer());
    assert_eq!(harness.scheduler.count(TimerKind::StatusRefresh), 0);
    assert_eq!(harness.manager.pending_requests(), 0);
}

#[test]
fn given_connected_with_stored_key_when_status_delay_configured_then_status_waits_for_timer() {
    // GIVEN: A stored key and the default initial status delay
    let peer = FakePeer::new();
    let mut config = test_config();
    config.timing.initial_status_delay_ms = 2000;
    let mut harness = Harness::with_store(config, MemoryKeyStore::with_key(peer.stored_key()));
    harness.manager.init_communication();

    // WHEN: The peer connects
    harness.deliver(FakePeer::connected());

    // THEN: Nothing is sent until the delay timer fires
    assert_eq!(harness.status(), ConnectionStatus::WaitingForStatusResponse);
    assert!(harness.sent().is_empty());
    assert_eq!(harness.scheduler.count(TimerKind::DelayedStatus), 1);

    assert!(harness.fire(TimerKind::DelayedStatus));
    harness.answer_status(&peer, "unlocked");
    assert!(harness.status().is_connected());
}

// ============================================
// HANDSHAKE FAILURES
// ============================================

#[test]
fn given_refused_handshake_when_answered_then_handshake_failed_and_retry() {
    // GIVEN: A handshake in flight
    let mut harness = Harness::new();
    harness.manager.init_communication();
    harness.deliver(FakePeer::connected());
    harness.manager.send_handshake();
    let handshake = harness.single_sent();

    // WHEN: The peer refuses it
    harness.deliver(FakePeer::refuse_handshake(&handshake));

    // THEN: HandshakeFailed, proxy stopped, retry pending, nothing stored
    assert_eq!(
        harness.status(),
        ConnectionStatus::error(BridgeErrorKind::HandshakeFailed)
    );
    assert!(!harness.proxy.is_running());
    assert_eq!(harness.scheduler.count(TimerKind::Reconnect), 1);
    assert!(harness.keys.current().is_none());
}

/// **VALUE**: A handshake asked for before the peer is ready is not lost.
///
/// **WHY THIS MATTERS**: The application reacts to MissingHandshake, which is
/// set while the proxy is still starting. A handshake written then is read by
/// nobody, and the user waits for an approval prompt that never appears.
///
/// **BUG THIS CATCHES**: `send_handshake` writing to the proxy before the
/// `connected` notification.
#[test]
fn given_handshake_requested_before_peer_connects_when_connected_then_handshake_sent() {
    // GIVEN: Proxy started, no stored key, handshake asked for straight away
    let mut harness = Harness::new();
    harness.manager.init_communication();
    assert_eq!(harness.status(), ConnectionStatus::MissingHandshake);
    harness.manager.send_handshake();
    assert!(harness.sent().is_empty());

    // WHEN: The peer connects
    harness.deliver(FakePeer::connected());

    // THEN: The held handshake goes out, once
    let handshake = harness.single_sent();
    assert_eq!(handshake.command.as_deref(), Some(COMMAND_HANDSHAKE));
    assert_eq!(harness.manager.pending_requests(), 1);
}

#[test]
fn given_held_handshake_when_cancelled_and_reconnected_then_nothing_sent() {
    let mut harness = Harness::new();
    harness.manager.init_communication();
    harness.manager.send_handshake();

    harness.manager.cancel_communication();
    harness.manager.init_communication();
    harness.deliver(FakePeer::connected());

    assert!(harness.sent().is_empty());
    assert_eq!(harness.status(), ConnectionStatus::MissingHandshake);
}

#[test]
fn given_answer_to_stale_key_pair_when_handshake_answered_then_decryption_failed() {
    // GIVEN: Two handshakes; the peer answers the first one
    let peer = FakePeer::new();
    let mut harness = Harness::new();
    harness.manager.init_communication();
    harness.deliver(FakePeer::connected());
    harness.manager.send_handshake();
    let first = harness.single_sent();
    harness.manager.send_handshake();
    let _second = harness.single_sent();

    // WHEN: The answer encrypted to the replaced key pair arrives
    harness.deliver(peer.accept_handshake(&first).expect("peer accepts"));

    // THEN: DecryptionOfSharedKeyFailed and a retry
    assert_eq!(
        harness.status(),
        ConnectionStatus::error(BridgeErrorKind::DecryptionOfSharedKeyFailed)
    );
    assert_eq!(harness.scheduler.count(TimerKind::Reconnect), 1);
    assert!(harness.keys.current().is_none());
}

#[test]
fn given_key_store_write_failure_when_handshake_accepted_then_storing_failed() {
    let peer = FakePeer::new();
    let mut harness = Harness::with_key_store(
        test_config(),
        FailingKeyStore {
            fail_read: false,
            fail_write: true,
        },
    );
    harness.manager.init_communication();
    harness.deliver(FakePeer::connected());
    harness.manager.send_handshake();
    let handshake = harness.single_sent();

    harness.deliver(peer.accept_handshake(&handshake).expect("peer accepts"));

    assert_eq!(
        harness.status(),
        ConnectionStatus::error(BridgeErrorKind::StoringOfSharedKeyFailed)
    );
    assert!(harness.sent().is_empty());
}

#[test]
fn given_unreadable_key_store_when_peer_connects_then_handshake_not_approved() {
    let mut harness = Harness::with_key_store(
        test_config(),
        FailingKeyStore {
            fail_read: true,
            fail_write: false,
        },
    );
    harness.manager.init_communication();

    harness.deliver(FakePeer::connected());

    assert_eq!(harness.status(), ConnectionStatus::HandshakeNotApproved);
}

#[test]
fn given_stored_key_of_wrong_length_when_peer_connects_then_injection_failed() {
    let mut harness = Harness::with_store(
        test_config(),
        MemoryKeyStore::with_key(common::RedactedSharedKey::from_bytes(&[1u8; 16])),
    );
    harness.manager.init_communication();

    harness.deliver(FakePeer::connected());

    assert_eq!(
        harness.status(),
        ConnectionStatus::error(BridgeErrorKind::SharedKeyInjectionFailed)
    );
}

// ============================================
// STATUS HANDLING
// ============================================

/// **VALUE**: A locked vault is polled until it unlocks, then polling stops.
///
/// **WHY THIS MATTERS**: The user unlocks the peer in its own window; nothing
/// tells us except a fresh status answer.
///
/// **BUG THIS CATCHES**: The refresh timer never starting, not re-arming after
/// it fires, or running forever after unlock.
#[test]
fn given_locked_vault_when_refresh_fires_until_unlocked_then_timer_stops() {
    // GIVEN: Connected with a locked vault
    let peer = FakePeer::new();
    let mut harness = Harness::connected(&peer, "locked");
    assert!(harness.manager.has_refresh_timer());
    assert_eq!(harness.scheduler.count(TimerKind::StatusRefresh), 1);

    // WHEN: The refresh fires while still locked
    assert!(harness.fire(TimerKind::StatusRefresh));
    harness.answer_status(&peer, "locked");

    // THEN: One refresh timer is armed again
    assert_eq!(harness.scheduler.count(TimerKind::StatusRefresh), 1);

    // WHEN: The next refresh reports unlocked
    assert!(harness.fire(TimerKind::StatusRefresh));
    harness.answer_status(&peer, "unlocked");

    // THEN: Connected and unlocked, no refresh timer left
    assert_eq!(
        harness.status().vault().map(|vault| vault.status),
        Some(VaultStatus::Unlocked)
    );
    assert!(!harness.manager.has_refresh_timer());
    assert_eq!(harness.scheduler.count(TimerKind::StatusRefresh), 0);
}

/// **VALUE**: An unanswered status request is replaced, not piled up.
///
/// **WHY THIS MATTERS**: A locked vault is polled every few seconds. If the
/// peer stops answering, each tick would leave one more entry in the pending
/// table and the id generator for as long as the bridge runs.
///
/// **BUG THIS CATCHES**: `send_status` issuing a new request without retiring
/// the one still outstanding.
#[test]
fn given_locked_vault_when_refresh_fires_without_answers_then_one_request_outstanding() {
    // GIVEN: Connected with a locked vault and a silent peer
    let peer = FakePeer::new();
    let mut harness = Harness::connected(&peer, "locked");

    // WHEN: The refresh fires many times with no answer
    for _ in 0..50 {
        assert!(harness.fire(TimerKind::StatusRefresh));
    }

    // THEN: Only the latest request is outstanding, and only it is answered
    assert!(harness.manager.pending_requests() <= 1);
    let mut sent = harness.sent();
    assert_eq!(sent.len(), 50);
    let latest = sent.pop().expect("requests were sent");
    let oldest = sent.remove(0);

    harness.deliver(
        peer.status(&oldest.message_id, "user@example.com", "unlocked", true)
            .expect("peer encrypts"),
    );
    assert_eq!(
        harness.status().vault().map(|vault| vault.status),
        Some(VaultStatus::Locked)
    );

    harness.deliver(
        peer.status(&latest.message_id, "user@example.com", "unlocked", true)
            .expect("peer encrypts"),
    );
    assert_eq!(
        harness.status().vault().map(|vault| vault.status),
        Some(VaultStatus::Unlocked)
    );
    assert_eq!(harness.manager.pending_requests(), 0);
}

#[test]
fn given_status_without_active_vault_when_answered_then_no_active_vault() {
    let peer = FakePeer::with_shared_key(vec![8u8; 64]);
    let mut harness =
        Harness::with_store(test_config(), MemoryKeyStore::with_key(peer.stored_key()));
    harness.manager.init_communication();
    harness.deliver(FakePeer::connected());
    let request = harness.single_sent();

    harness.deliver(
        peer.status(&request.message_id, "user@example.com", "unlocked", false)
            .expect("peer encrypts"),
    );

    assert_eq!(
        harness.status(),
        ConnectionStatus::error(BridgeErrorKind::NoActiveVault)
    );
}

#[test]
fn given_status_encrypted_with_other_key_when_answered_then_decryption_of_data_failed() {
    // GIVEN: We hold one key, the answer is encrypted with another
    let ours = FakePeer::new();
    let imposter = FakePeer::new();
    let mut harness =
        Harness::with_store(test_config(), MemoryKeyStore::with_key(ours.stored_key()));
    harness.manager.init_communication();
    harness.deliver(FakePeer::connected());
    let request = harness.single_sent();

    // WHEN: The mismatched answer arrives
    harness.deliver(
        imposter
            .status(&request.message_id, "user@example.com", "unlocked", true)
            .expect("imposter encrypts"),
    );

    // THEN: The MAC check rejects it
    assert_eq!(
        harness.status(),
        ConnectionStatus::error(BridgeErrorKind::DecryptionOfDataFailed)
    );
}

#[test]
fn given_cannot_decrypt_error_when_status_answered_then_bitwarden_cannot_decrypt() {
    let peer = FakePeer::new();
    let mut harness =
        Harness::with_store(test_config(), MemoryKeyStore::with_key(peer.stored_key()));
    harness.manager.init_communication();
    harness.deliver(FakePeer::connected());
    let request = harness.single_sent();

    harness.deliver(FakePeer::error(&request.message_id, PEER_ERROR_CANNOT_DECRYPT));

    assert_eq!(
        harness.status(),
        ConnectionStatus::error(BridgeErrorKind::BitwardenCannotDecrypt)
    );
}

#[test]
fn given_unknown_peer_error_when_status_answered_then_bitwarden_responded_with_error() {
    let peer = FakePeer::new();
    let mut harness = Harness::connected(&peer, "unlocked");
    harness.manager.refresh_status_if_needed();
    let request = harness.single_sent();

    harness.deliver(FakePeer::error(&request.message_id, "something-else"));

    assert_eq!(
        harness.status(),
        ConnectionStatus::error(BridgeErrorKind::BitwardenRespondedWithError)
    );
}

#[test]
fn given_connected_when_peer_reports_locked_then_vault_locked_and_refresh_starts() {
    // GIVEN: Connected and unlocked
    let peer = FakePeer::new();
    let mut harness = Harness::connected(&peer, "unlocked");
    harness.manager.refresh_status_if_needed();
    let request = harness.single_sent();

    // WHEN: The peer answers `locked`
    harness.deliver(FakePeer::error(&request.message_id, PEER_ERROR_LOCKED));

    // THEN: Same vault, now locked, with polling
    let vault = harness.status().vault().cloned().expect("still connected");
    assert_eq!(vault.email, "user@example.com");
    assert!(vault.is_locked());
    assert!(harness.manager.has_refresh_timer());
}

#[test]
fn given_waiting_for_status_when_peer_reports_locked_then_status_requested_again() {
    let peer = FakePeer::new();
    let mut harness =
        Harness::with_store(test_config(), MemoryKeyStore::with_key(peer.stored_key()));
    harness.manager.init_communication();
    harness.deliver(FakePeer::connected());
    let request = harness.single_sent();

    harness.deliver(FakePeer::error(&request.message_id, PEER_ERROR_LOCKED));

    assert_eq!(harness.status(), ConnectionStatus::WaitingForStatusResponse);
    let retry = harness.single_sent();
    assert_ne!(retry.message_id, request.message_id);
}

/// **VALUE**: Only answers to our own outstanding requests are acted on.
///
/// **WHY THIS MATTERS**: The peer may replay or misroute answers; acting on
/// them could flip the vault state the user sees.
///
/// **BUG THIS CATCHES**: Missing message-id verification, or ids not retired
/// after their first answer.
#[test]
fn given_unknown_or_repeated_message_id_when_answer_arrives_then_ignored() {
    // GIVEN: Connected with an unlocked vault and one status request answered
    let peer = FakePeer::new();
    let mut harness = Harness::connected(&peer, "unlocked");
    harness.manager.refresh_status_if_needed();
    let request = harness.single_sent();
    let answer = peer
        .status(&request.message_id, "user@example.com", "unlocked", true)
        .expect("peer encrypts");
    harness.deliver(answer);

    // WHEN: A locked answer arrives for an id we never issued, and again for the answered id
    harness.deliver(
        peer.status("not-ours", "user@example.com", "locked", true)
            .expect("peer encrypts"),
    );
    harness.deliver(
        peer.status(&request.message_id, "user@example.com", "locked", true)
            .expect("peer encrypts"),
    );

    // THEN: Still unlocked
    assert_eq!(
        harness.status().vault().map(|vault| vault.status),
        Some(VaultStatus::Unlocked)
    );
}

#[test]
fn given_non_json_frame_when_received_then_ignored() {
    let peer = FakePeer::new();
    let mut harness = Harness::connected(&peer, "unlocked");

    harness.deliver(b"\x00garbage".to_vec());

    assert!(harness.status().is_connected());
}

#[test]
fn given_disabled_when_refresh_requested_then_nothing_sent() {
    let mut harness = Harness::new();

    harness.manager.refresh_status_if_needed();

    assert!(harness.sent().is_empty());
    assert_eq!(harness.status(), ConnectionStatus::Disabled);
}

#[test]
fn given_status_subscription_when_connected_then_subscriber_sees_vault() {
    let peer = FakePeer::new();
    let harness = Harness::connected(&peer, "unlocked");

    let receiver = harness.manager.subscribe();

    assert!(receiver.borrow().is_connected());
}

// ============================================
// PROCESS LIFECYCLE
// ============================================

#[test]
fn given_connected_when_peer_disconnects_then_not_running_and_retry() {
    let peer = FakePeer::new();
    let mut harness = Harness::connected(&peer, "unlocked");

    harness.deliver(FakePeer::disconnected());

    assert_eq!(harness.status(), ConnectionStatus::NotRunning);
    assert!(!harness.proxy.is_running());
    assert_eq!(harness.scheduler.count(TimerKind::Reconnect), 1);
}

#[test]
fn given_connected_locked_when_process_exits_then_not_running_and_timers_reset() {
    // GIVEN: Connected, locked, so the refresh timer is armed
    let peer = FakePeer::new();
    let mut harness = Harness::connected(&peer, "locked");
    let generation = harness.proxy.generation();

    // WHEN: The proxy exits
    harness.event(BridgeEvent::ProcessTerminated { generation });

    // THEN: NotRunning, refresh cancelled, one retry pending
    assert_eq!(harness.status(), ConnectionStatus::NotRunning);
    assert_eq!(harness.scheduler.count(TimerKind::StatusRefresh), 0);
    assert_eq!(harness.scheduler.count(TimerKind::Reconnect), 1);
}

/// **VALUE**: A manual re-init after an exit leaves no retry behind.
///
/// **WHY THIS MATTERS**: The exit scheduled a reconnect. If it still fires once
/// the new proxy is up, it restarts the healthy connection.
///
/// **BUG THIS CATCHES**: `connect` starting the proxy without cancelling the
/// pending reconnect timer.
#[test]
fn given_pending_reconnect_when_reinitialised_and_connected_then_retry_cancelled() {
    // GIVEN: The proxy exited and a reconnect is pending
    let peer = FakePeer::new();
    let mut harness = Harness::connected(&peer, "unlocked");
    let generation = harness.proxy.generation();
    harness.event(BridgeEvent::ProcessTerminated { generation });
    assert_eq!(harness.scheduler.count(TimerKind::Reconnect), 1);

    // WHEN: Communication is initialised again and completes
    harness.manager.init_communication();
    harness.deliver(FakePeer::connected());
    harness.answer_status(&peer, "unlocked");

    // THEN: No retry left to tear the new connection down
    assert_eq!(harness.scheduler.count(TimerKind::Reconnect), 0);
    assert!(!harness.manager.has_reconnect_timer());
    assert!(!harness.fire(TimerKind::Reconnect));
    assert!(harness.status().is_connected());
    assert_eq!(harness.proxy.generation(), generation + 1);
}

/// **VALUE**: Events from a proxy we already replaced are dropped.
///
/// **WHY THIS MATTERS**: After a restart the old process's exit and its last
/// frames still arrive. Acting on them would tear down the new connection.
///
/// **BUG THIS CATCHES**: Missing generation checks on process events.
#[test]
fn given_restarted_proxy_when_old_generation_exits_then_ignored() {
    // GIVEN: A proxy that was restarted once
    let peer = FakePeer::new();
    let mut harness = Harness::connected(&peer, "unlocked");
    let old_generation = harness.proxy.generation();
    harness.deliver(FakePeer::disconnected());
    assert!(harness.fire(TimerKind::Reconnect));
    assert_eq!(harness.proxy.generation(), old_generation + 1);

    // WHEN: The old process reports its exit and a late frame
    harness.event(BridgeEvent::ProcessTerminated {
        generation: old_generation,
    });
    harness.event(BridgeEvent::MessageReceived {
        generation: old_generation,
        data: FakePeer::disconnected(),
    });

    // THEN: The new proxy keeps running
    assert!(harness.proxy.is_running());
    assert_eq!(harness.status(), ConnectionStatus::Connecting);
}

#[test]
fn given_corrupted_frame_stream_when_reported_then_error_and_restart_scheduled() {
    let peer = FakePeer::new();
    let mut harness = Harness::connected(&peer, "unlocked");
    let generation = harness.proxy.generation();

    harness.event(BridgeEvent::FrameStreamCorrupted { generation });

    assert_eq!(
        harness.status(),
        ConnectionStatus::error(BridgeErrorKind::FrameStreamCorrupted)
    );
    assert!(!harness.proxy.is_running());
    assert_eq!(harness.scheduler.count(TimerKind::Reconnect), 1);
}

// ============================================
// CANCELLATION
// ============================================

/// **VALUE**: Cancelling tears everything down and nothing revives it.
///
/// **WHY THIS MATTERS**: This is the user turning the integration off. Any
/// leftover timer or late message that restarts the peer violates that.
///
/// **BUG THIS CATCHES**: A timer surviving cancel, the stored key kept on
/// disk, or a late status answer moving the bridge back to connected.
#[test]
fn given_connected_when_cancelled_then_disabled_and_late_messages_ignored() {
    // GIVEN: Connected, with a status request outstanding
    let peer = FakePeer::new();
    let mut harness = Harness::connected(&peer, "locked");
    harness.manager.refresh_status_if_needed();
    let request = harness.single_sent();
    let generation = harness.proxy.generation();

    // WHEN: Communication is cancelled
    harness.manager.cancel_communication();

    // THEN: Disabled, process stopped, keys gone, no timers
    assert_eq!(harness.status(), ConnectionStatus::Disabled);
    assert!(!harness.proxy.is_running());
    assert!(harness.keys.current().is_none());
    assert!(harness.scheduler.pending().is_empty());
    assert_eq!(harness.manager.pending_requests(), 0);

    // WHEN: Late messages arrive from the old process
    harness.event(BridgeEvent::MessageReceived {
        generation,
        data: peer
            .status(&request.message_id, "user@example.com", "unlocked", true)
            .expect("peer encrypts"),
    });
    harness.event(BridgeEvent::MessageReceived {
        generation,
        data: FakePeer::connected(),
    });
    harness.event(BridgeEvent::ProcessTerminated { generation });

    // THEN: Still disabled, nothing restarted
    assert_eq!(harness.status(), ConnectionStatus::Disabled);
    assert!(harness.scheduler.pending().is_empty());
    assert_eq!(harness.proxy.starts(), 1);
}

#[test]
fn given_pending_reconnect_when_cancelled_then_stale_firing_is_ignored() {
    // GIVEN: A scheduled retry whose handle we keep
    let mut harness = Harness::new();
    harness.env.set_running(false);
    harness.manager.init_communication();
    let (handle, _) = harness.scheduler.pending()[0];

    // WHEN: Cancelling, then delivering the old firing anyway
    harness.manager.cancel_communication();
    harness.env.set_running(true);
    harness.event(BridgeEvent::TimerFired(handle));

    // THEN: No connect attempt
    assert_eq!(harness.status(), ConnectionStatus::Disabled);
    assert_eq!(harness.proxy.starts(), 0);
}

#[test]
fn given_cancelled_when_init_again_then_reconnects() {
    let peer = FakePeer::new();
    let mut harness = Harness::connected(&peer, "unlocked");
    harness.manager.cancel_communication();

    harness.manager.init_communication();

    assert_eq!(harness.status(), ConnectionStatus::MissingHandshake);
    assert!(harness.proxy.is_running());
}

#[test]
fn given_shutdown_command_when_handled_then_breaks_and_stops_proxy() {
    let peer = FakePeer::new();
    let mut harness = Harness::connected(&peer, "unlocked");

    let flow = harness
        .manager
        .handle_event(BridgeEvent::Command(BridgeCommand::Shutdown));

    assert_eq!(flow, ControlFlow::Break(()));
    assert!(!harness.proxy.is_running());
}
