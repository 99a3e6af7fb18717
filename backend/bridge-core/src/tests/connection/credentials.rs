use super::Harness;

use crate::connection::event::BridgeCommand;
use crate::error::CredentialError;
use crate::message::{
    COMMAND_CREDENTIAL_CREATE, COMMAND_CREDENTIAL_RETRIEVAL, COMMAND_CREDENTIAL_UPDATE,
    PEER_ERROR_LOCKED,
};
use crate::testing::FakePeer;

use models::{BridgeErrorKind, ConnectionStatus, Credential, CredentialBuilder};

use serde_json::json;
use tokio::sync::oneshot;
use url::Url;

fn login_url() -> Url {
    Url::parse("https://example.com/login").expect("valid url")
}

fn new_credential() -> Credential {
    CredentialBuilder::default()
        .with_user_id("user-1")
        .with_url("https://example.com/login")
        .with_name("Example")
        .with_username("alice")
        .with_password("hunter2")
        .build()
        .expect("valid credential")
}

fn stored_credential() -> Credential {
    Credential {
        credential_id: Some("cred-1".to_string()),
        ..new_credential()
    }
}

fn retrieve(harness: &mut Harness) -> oneshot::Receiver<Result<Vec<Credential>, CredentialError>> {
    let (reply, answer) = oneshot::channel();
    harness.event(BridgeCommand::RetrieveCredentials {
        url: login_url(),
        reply,
    });
    answer
}

fn create(
    harness: &mut Harness,
    credential: Credential,
) -> oneshot::Receiver<Result<(), CredentialError>> {
    let (reply, answer) = oneshot::channel();
    harness.event(BridgeCommand::CreateCredential { credential, reply });
    answer
}

fn update(
    harness: &mut Harness,
    credential: Credential,
) -> oneshot::Receiver<Result<(), CredentialError>> {
    let (reply, answer) = oneshot::channel();
    harness.event(BridgeCommand::UpdateCredential { credential, reply });
    answer
}

#[test]
fn given_not_connected_when_retrieving_then_not_connected_and_nothing_sent() {
    // GIVEN: A bridge that never connected
    let mut harness = Harness::new();

    // WHEN: Asking for credentials
    let mut answer = retrieve(&mut harness);

    // THEN: Answered straight away, nothing reaches the peer
    assert!(matches!(
        answer.try_recv(),
        Ok(Err(CredentialError::NotConnected { .. }))
    ));
    assert!(harness.sent().is_empty());
}

/// **VALUE**: Retrieval decodes the peer's list and drops entries it cannot use.
///
/// **WHY THIS MATTERS**: An entry without a credential id cannot be updated
/// later; returning it would set the caller up for a failed save.
///
/// **BUG THIS CATCHES**: Partial entries leaking out, or the whole call failing
/// because one entry was incomplete.
#[test]
fn given_connected_when_retrieving_then_returns_complete_credentials() {
    // GIVEN: Connected and a retrieval in flight
    let peer = FakePeer::new();
    let mut harness = Harness::connected(&peer, "unlocked");
    let mut answer = retrieve(&mut harness);
    let request = harness.single_sent();

    // THEN: The peer sees the right command and URL
    let command = peer.open(&request).expect("peer decrypts");
    assert_eq!(command.command, COMMAND_CREDENTIAL_RETRIEVAL);
    assert_eq!(
        command.payload.and_then(|payload| payload.uri).as_deref(),
        Some("https://example.com/login")
    );

    // WHEN: The peer answers with one complete and one partial entry
    harness.deliver(
        peer.encrypted(
            &request.message_id,
            json!({
                "command": COMMAND_CREDENTIAL_RETRIEVAL,
                "payload": [
                    {
                        "userId": "user-1",
                        "credentialId": "cred-1",
                        "userName": "alice",
                        "password": "hunter2",
                        "name": "Example",
                    },
                    { "userId": "user-1", "userName": "orphan" },
                ],
            }),
        )
        .expect("peer encrypts"),
    );

    // THEN: Only the complete entry comes back
    let credentials = answer
        .try_recv()
        .expect("answered")
        .expect("retrieval succeeds");
    assert_eq!(credentials.len(), 1);
    assert_eq!(credentials[0].credential_id.as_deref(), Some("cred-1"));
    assert_eq!(credentials[0].username.as_deref(), Some("alice"));
    assert_eq!(credentials[0].url, "https://example.com/login");
    assert_eq!(harness.manager.pending_requests(), 0);
}

#[test]
fn given_connected_when_creating_then_sends_fields_and_reports_success() {
    // GIVEN: Connected
    let peer = FakePeer::new();
    let mut harness = Harness::connected(&peer, "unlocked");

    // WHEN: Creating a credential and the peer accepts
    let mut answer = create(&mut harness, new_credential());
    let request = harness.single_sent();
    let command = peer.open(&request).expect("peer decrypts");
    harness.deliver(
        peer.encrypted(
            &request.message_id,
            json!({ "command": COMMAND_CREDENTIAL_CREATE, "payload": { "status": "success" } }),
        )
        .expect("peer encrypts"),
    );

    // THEN: The command carried the credential, the call succeeded
    assert_eq!(command.command, COMMAND_CREDENTIAL_CREATE);
    let payload = command.payload.expect("create has a payload");
    assert_eq!(payload.user_id.as_deref(), Some("user-1"));
    assert_eq!(payload.user_name.as_deref(), Some("alice"));
    assert_eq!(payload.password.as_deref(), Some("hunter2"));
    assert_eq!(payload.uri.as_deref(), Some("https://example.com/login"));
    assert_eq!(payload.credential_id, None);
    assert!(matches!(answer.try_recv(), Ok(Ok(()))));
}

#[test]
fn given_peer_answers_failure_when_creating_then_creation_failed() {
    let peer = FakePeer::new();
    let mut harness = Harness::connected(&peer, "unlocked");

    let mut answer = create(&mut harness, new_credential());
    let request = harness.single_sent();
    harness.deliver(
        peer.encrypted(
            &request.message_id,
            json!({ "command": COMMAND_CREDENTIAL_CREATE, "payload": { "status": "failure" } }),
        )
        .expect("peer encrypts"),
    );

    assert!(matches!(
        answer.try_recv(),
        Ok(Err(CredentialError::CreationFailed { .. }))
    ));
    assert!(harness.status().is_connected());
}

#[test]
fn given_stored_credential_when_updating_then_sends_its_id() {
    let peer = FakePeer::new();
    let mut harness = Harness::connected(&peer, "unlocked");

    let mut answer = update(&mut harness, stored_credential());
    let request = harness.single_sent();
    let command = peer.open(&request).expect("peer decrypts");
    harness.deliver(
        peer.encrypted(
            &request.message_id,
            json!({ "command": COMMAND_CREDENTIAL_UPDATE, "payload": { "status": "success" } }),
        )
        .expect("peer encrypts"),
    );

    assert_eq!(command.command, COMMAND_CREDENTIAL_UPDATE);
    assert_eq!(
        command.payload.and_then(|payload| payload.credential_id).as_deref(),
        Some("cred-1")
    );
    assert!(matches!(answer.try_recv(), Ok(Ok(()))));
}

#[test]
fn given_credential_without_id_when_updating_then_missing_credential_id() {
    let peer = FakePeer::new();
    let mut harness = Harness::connected(&peer, "unlocked");

    let mut answer = update(&mut harness, new_credential());

    assert!(matches!(
        answer.try_recv(),
        Ok(Err(CredentialError::MissingCredentialId { .. }))
    ));
    assert!(harness.sent().is_empty());
}

#[test]
fn given_vault_locked_when_retrieving_then_peer_error_and_vault_marked_locked() {
    // GIVEN: Connected, a retrieval in flight
    let peer = FakePeer::new();
    let mut harness = Harness::connected(&peer, "unlocked");
    let mut answer = retrieve(&mut harness);
    let request = harness.single_sent();

    // WHEN: The peer answers `locked`
    harness.deliver(FakePeer::error(&request.message_id, PEER_ERROR_LOCKED));

    // THEN: The caller gets the peer error, the status shows a locked vault
    match answer.try_recv() {
        Ok(Err(CredentialError::Peer { error, .. })) => assert_eq!(error, PEER_ERROR_LOCKED),
        other => panic!("Expected a peer error, got {other:?}"),
    }
    assert!(harness.status().vault().is_some_and(|vault| vault.is_locked()));
}

#[test]
fn given_other_peer_error_when_creating_then_status_untouched() {
    let peer = FakePeer::new();
    let mut harness = Harness::connected(&peer, "unlocked");

    let mut answer = create(&mut harness, new_credential());
    let request = harness.single_sent();
    harness.deliver(FakePeer::error(&request.message_id, "invalid-uri"));

    assert!(matches!(
        answer.try_recv(),
        Ok(Err(CredentialError::Peer { .. }))
    ));
    assert!(harness.status().vault().is_some_and(|vault| !vault.is_locked()));
}

#[test]
fn given_answer_with_wrong_key_when_retrieving_then_send_error_and_status_error() {
    let peer = FakePeer::new();
    let imposter = FakePeer::new();
    let mut harness = Harness::connected(&peer, "unlocked");

    let mut answer = retrieve(&mut harness);
    let request = harness.single_sent();
    harness.deliver(
        imposter
            .encrypted(&request.message_id, json!({ "command": COMMAND_CREDENTIAL_RETRIEVAL }))
            .expect("imposter encrypts"),
    );

    assert!(matches!(
        answer.try_recv(),
        Ok(Err(CredentialError::Send { .. }))
    ));
    assert_eq!(
        harness.status(),
        ConnectionStatus::error(BridgeErrorKind::DecryptionOfDataFailed)
    );
}

#[test]
fn given_pending_call_when_process_exits_then_peer_terminated() {
    let peer = FakePeer::new();
    let mut harness = Harness::connected(&peer, "unlocked");
    let mut answer = retrieve(&mut harness);
    let generation = harness.proxy.generation();

    harness.event(crate::connection::event::BridgeEvent::ProcessTerminated { generation });

    assert!(matches!(
        answer.try_recv(),
        Ok(Err(CredentialError::PeerTerminated { .. }))
    ));
}

#[test]
fn given_pending_call_when_cancelled_then_cancelled() {
    let peer = FakePeer::new();
    let mut harness = Harness::connected(&peer, "unlocked");
    let mut answer = create(&mut harness, new_credential());

    harness.manager.cancel_communication();

    assert!(matches!(
        answer.try_recv(),
        Ok(Err(CredentialError::Cancelled { .. }))
    ));
}
