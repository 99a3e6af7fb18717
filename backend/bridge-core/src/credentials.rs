//! Credential retrieval and storage through the connected peer.
//!
//! Calls are only accepted while the bridge is connected. Each one travels as
//! an encrypted command and is answered once, either with the result or with a
//! [`CredentialError`]. Nothing here retries.

use crate::connection::event::BridgeCommand;
use crate::connection::handle::BridgeHandle;
use crate::error::CredentialError;
use crate::message::{
    COMMAND_CREDENTIAL_RETRIEVAL, CommandPayload, EncryptedCommand, PayloadItem, Response,
    STATUS_SUCCESS,
};

use models::{Credential, CredentialBuilder};

use log::{debug, trace};
use tokio::sync::oneshot;
use url::Url;

impl BridgeHandle {
    /// Logins the peer holds for `url`.
    pub async fn retrieve_credentials(&self, url: Url) -> Result<Vec<Credential>, CredentialError> {
        self.ensure_connected()?;

        let (reply, answer) = oneshot::channel();
        self.call(BridgeCommand::RetrieveCredentials { url, reply }, answer)
            .await
    }

    /// Store a new login. `credential.credential_id` is ignored.
    pub async fn create(&self, credential: Credential) -> Result<(), CredentialError> {
        self.ensure_connected()?;

        let (reply, answer) = oneshot::channel();
        self.call(BridgeCommand::CreateCredential { credential, reply }, answer)
            .await
    }

    /// Overwrite a stored login. Needs `credential.credential_id`.
    pub async fn update(&self, credential: Credential) -> Result<(), CredentialError> {
        if credential.credential_id.is_none() {
            return Err(CredentialError::missing_credential_id());
        }
        self.ensure_connected()?;

        let (reply, answer) = oneshot::channel();
        self.call(BridgeCommand::UpdateCredential { credential, reply }, answer)
            .await
    }

    fn ensure_connected(&self) -> Result<(), CredentialError> {
        let status = self.status.borrow();
        if status.is_connected() {
            Ok(())
        } else {
            Err(CredentialError::not_connected(&*status))
        }
    }

    async fn call<T>(
        &self,
        command: BridgeCommand,
        answer: oneshot::Receiver<Result<T, CredentialError>>,
    ) -> Result<T, CredentialError> {
        self.command(command)
            .await
            .map_err(|_| CredentialError::bridge_stopped())?;

        answer
            .await
            .map_err(|_| CredentialError::bridge_stopped())?
    }
}

// ============================================
// WIRE COMMANDS
// ============================================

fn payload_for(credential: &Credential) -> CommandPayload {
    CommandPayload {
        uri: Some(credential.url.clone()),
        user_id: Some(credential.user_id.clone()),
        user_name: credential.username.clone(),
        password: credential.password.clone(),
        name: credential.name.clone(),
        credential_id: None,
    }
}

pub fn retrieval_command(url: &Url) -> EncryptedCommand {
    EncryptedCommand::credential_retrieval(url.as_str())
}

pub fn create_command(credential: &Credential) -> EncryptedCommand {
    EncryptedCommand::credential_create(payload_for(credential))
}

#[track_caller]
pub fn update_command(credential: &Credential) -> Result<EncryptedCommand, CredentialError> {
    let credential_id = credential
        .credential_id
        .clone()
        .ok_or_else(CredentialError::missing_credential_id)?;

    Ok(EncryptedCommand::credential_update(CommandPayload {
        credential_id: Some(credential_id),
        ..payload_for(credential)
    }))
}

// ============================================
// RESPONSES
// ============================================

/// Credentials from a decrypted retrieval answer. Items without a
/// credential id or owner are skipped.
pub fn parse_retrieval(inner: &Response, url: &Url) -> Result<Vec<Credential>, CredentialError> {
    if inner.command.as_deref() != Some(COMMAND_CREDENTIAL_RETRIEVAL) {
        return Err(CredentialError::retrieval_failed(format!(
            "Answered with command {:?}",
            inner.command
        )));
    }

    let items = inner.items().ok_or_else(|| {
        CredentialError::retrieval_failed("Expected an array of credentials")
    })?;

    let credentials: Vec<Credential> = items
        .iter()
        .filter_map(|item| credential_from_item(item, url))
        .collect();

    debug!(
        "Retrieved {} of {} credentials for {url}",
        credentials.len(),
        items.len()
    );
    Ok(credentials)
}

fn credential_from_item(item: &PayloadItem, url: &Url) -> Option<Credential> {
    let (Some(user_id), Some(credential_id)) = (&item.user_id, &item.credential_id) else {
        trace!("Skipping credential item without userId or credentialId");
        return None;
    };

    let mut builder = CredentialBuilder::default()
        .with_user_id(user_id.clone())
        .with_credential_id(credential_id.clone())
        .with_url(url.as_str());

    if let Some(ref name) = item.name {
        builder = builder.with_name(name.clone());
    }
    if let Some(ref username) = item.user_name {
        builder = builder.with_username(username.clone());
    }
    if let Some(ref password) = item.password {
        builder = builder.with_password(password.clone());
    }

    builder
        .build()
        .map_err(|e| trace!("Skipping invalid credential item: {e}"))
        .ok()
}

/// Outcome of a create or update. Success is `status: "success"`.
pub fn parse_write(
    inner: &Response,
    expected_command: &str,
    failed: impl Fn(String) -> CredentialError,
) -> Result<(), CredentialError> {
    if inner.command.as_deref() != Some(expected_command) {
        return Err(failed(format!("Answered with command {:?}", inner.command)));
    }

    match inner.item().and_then(|item| item.status.as_deref()) {
        Some(STATUS_SUCCESS) => Ok(()),
        Some(status) => Err(failed(format!("Peer answered {status}"))),
        None => Err(failed("Answer carried no status".to_string())),
    }
}
