//! Requests waiting for an answer, keyed by message id.

use crate::connection::event::{CredentialsReply, WriteReply};
use crate::error::CredentialError;
use crate::message::Expectation;

use std::collections::HashMap;

use log::trace;
use url::Url;

#[derive(Debug)]
pub enum PendingRequest {
    Handshake,
    Status,
    Retrieve { url: Url, reply: CredentialsReply },
    Create { reply: WriteReply },
    Update { reply: WriteReply },
}

impl PendingRequest {
    pub fn expectation(&self) -> Expectation {
        match self {
            PendingRequest::Handshake => Expectation::Handshake,
            _ => Expectation::Encrypted,
        }
    }

    /// Answer a credential call with `error`. Status and handshake requests
    /// have nobody waiting and are dropped.
    pub fn fail(self, error: CredentialError) {
        let delivered = match self {
            PendingRequest::Retrieve { reply, .. } => reply.send(Err(error)).is_ok(),
            PendingRequest::Create { reply } | PendingRequest::Update { reply } => {
                reply.send(Err(error)).is_ok()
            }
            PendingRequest::Handshake | PendingRequest::Status => true,
        };

        if !delivered {
            trace!("Credential caller went away before the failure was delivered");
        }
    }
}

#[derive(Debug, Default)]
pub struct PendingTable {
    entries: HashMap<String, PendingRequest>,
}

impl PendingTable {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn insert(&mut self, message_id: String, request: PendingRequest) {
        self.entries.insert(message_id, request);
    }

    pub fn take(&mut self, message_id: &str) -> Option<PendingRequest> {
        self.entries.remove(message_id)
    }

    /// Empty the table, failing every waiting credential call.
    pub fn fail_all(&mut self, error: impl Fn() -> CredentialError) {
        for (_, request) in self.entries.drain() {
            request.fail(error());
        }
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}
