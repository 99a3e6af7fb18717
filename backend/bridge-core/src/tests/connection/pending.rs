use crate::connection::pending::{PendingRequest, PendingTable};
use crate::error::CredentialError;
use crate::message::Expectation;

use tokio::sync::oneshot;

#[test]
fn given_requests_when_asked_for_expectation_then_only_handshake_is_plaintext() {
    let (reply, _answer) = oneshot::channel();

    assert_eq!(PendingRequest::Handshake.expectation(), Expectation::Handshake);
    assert_eq!(PendingRequest::Status.expectation(), Expectation::Encrypted);
    assert_eq!(PendingRequest::Create { reply }.expectation(), Expectation::Encrypted);
}

#[test]
fn given_mixed_table_when_failing_all_then_callers_get_error_and_table_empties() {
    // GIVEN: A status request and a credential call waiting
    let mut table = PendingTable::new();
    let (reply, mut answer) = oneshot::channel();
    table.insert("status".to_string(), PendingRequest::Status);
    table.insert("create".to_string(), PendingRequest::Create { reply });

    // WHEN: Failing everything
    table.fail_all(CredentialError::peer_terminated);

    // THEN: The caller hears about it and nothing is left
    assert!(matches!(
        answer.try_recv(),
        Ok(Err(CredentialError::PeerTerminated { .. }))
    ));
    assert!(table.is_empty());
}

#[test]
fn given_taken_request_when_taken_again_then_none() {
    let mut table = PendingTable::new();
    table.insert("id".to_string(), PendingRequest::Status);

    assert!(table.take("id").is_some());
    assert!(table.take("id").is_none());
}
