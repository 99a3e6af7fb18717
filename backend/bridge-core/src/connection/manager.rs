//! The connection state machine.
//!
//! [`BridgeManager`] is synchronous and owns everything: the proxy process,
//! timers, keys and the pending-request table. It is driven one
//! [`BridgeEvent`] at a time, either by the actor in
//! [`handle`](crate::connection::handle) or directly by tests.

use crate::config::BridgeConfig;
use crate::connection::event::{BridgeCommand, BridgeEvent, CredentialsReply, WriteReply};
use crate::connection::pending::{PendingRequest, PendingTable};
use crate::credentials;
use crate::crypto::CryptoChannel;
use crate::discovery::{InstallationCheck, PasswordManagerSelection, RunningApplicationCheck};
use crate::error::{CoreError, CredentialError};
use crate::key_store::SharedKeyStore;
use crate::message::{
    COMMAND_CREDENTIAL_CREATE, COMMAND_CREDENTIAL_UPDATE, COMMAND_STATUS, EncryptedCommand,
    EncryptedPayload, HandshakeResponse, MessageIdGenerator, PEER_ERROR_CANNOT_DECRYPT,
    PEER_ERROR_LOCKED, Request, Response, ResponseKind, STATUS_SUCCESS,
};
use crate::process::ProxyProcess;
use crate::scheduler::{Scheduler, TimerHandle, TimerKind};

use common::RedactedSharedKey;
use models::{BridgeErrorKind, ConnectionStatus, Credential, InstallationState};

use std::ops::ControlFlow;

use log::{debug, error, info, trace, warn};
use tokio::sync::{oneshot, watch};
use url::Url;

/// The local facts the manager needs before it starts the peer.
pub struct Collaborators {
    pub installation: Box<dyn InstallationCheck>,
    pub running: Box<dyn RunningApplicationCheck>,
    pub selection: Box<dyn PasswordManagerSelection>,
    pub key_store: Box<dyn SharedKeyStore>,
}

pub struct BridgeManager {
    config: BridgeConfig,
    collaborators: Collaborators,
    proxy: Box<dyn ProxyProcess>,
    scheduler: Box<dyn Scheduler>,
    crypto: CryptoChannel,
    message_ids: MessageIdGenerator,
    pending: PendingTable,
    status: ConnectionStatus,
    status_tx: watch::Sender<ConnectionStatus>,
    generation: Option<u64>,
    /// Set by the `connected` notification of the current proxy.
    peer_connected: bool,
    /// A handshake asked for before the peer was ready.
    handshake_requested: bool,
    /// The one status request allowed in flight.
    status_request: Option<String>,
    reconnect_timer: Option<TimerHandle>,
    refresh_timer: Option<TimerHandle>,
    delayed_status_timer: Option<TimerHandle>,
}

impl BridgeManager {
    pub fn new(
        config: BridgeConfig,
        collaborators: Collaborators,
        proxy: Box<dyn ProxyProcess>,
        scheduler: Box<dyn Scheduler>,
    ) -> Self {
        let (status_tx, _) = watch::channel(ConnectionStatus::Disabled);

        Self {
            config,
            collaborators,
            proxy,
            scheduler,
            crypto: CryptoChannel::new(),
            message_ids: MessageIdGenerator::new(),
            pending: PendingTable::new(),
            status: ConnectionStatus::Disabled,
            status_tx,
            generation: None,
            peer_connected: false,
            handshake_requested: false,
            status_request: None,
            reconnect_timer: None,
            refresh_timer: None,
            delayed_status_timer: None,
        }
    }

    /// Replace the crypto channel, e.g. one with a smaller RSA key for tests.
    pub fn with_crypto(mut self, crypto: CryptoChannel) -> Self {
        self.crypto = crypto;
        self
    }

    pub fn status(&self) -> &ConnectionStatus {
        &self.status
    }

    pub fn subscribe(&self) -> watch::Receiver<ConnectionStatus> {
        self.status_tx.subscribe()
    }

    pub fn pending_requests(&self) -> usize {
        self.pending.len()
    }

    pub fn has_reconnect_timer(&self) -> bool {
        self.reconnect_timer.is_some()
    }

    pub fn has_refresh_timer(&self) -> bool {
        self.refresh_timer.is_some()
    }

    /// Apply one event. `Break` once the bridge has shut down.
    pub fn handle_event(&mut self, event: BridgeEvent) -> ControlFlow<()> {
        match event {
            BridgeEvent::Command(command) => return self.handle_command(command),
            BridgeEvent::TimerFired(handle) => self.handle_timer(handle),
            BridgeEvent::MessageReceived { generation, data } => {
                if self.is_current(generation) {
                    self.handle_message(&data);
                } else {
                    trace!("Dropping message from stale proxy generation {generation}");
                }
            }
            BridgeEvent::ProcessTerminated { generation } => {
                if self.is_current(generation) {
                    self.handle_process_terminated();
                } else {
                    trace!("Ignoring exit of stale proxy generation {generation}");
                }
            }
            BridgeEvent::FrameStreamCorrupted { generation } => {
                if self.is_current(generation) {
                    self.handle_frame_stream_corrupted();
                }
            }
        }

        ControlFlow::Continue(())
    }

    fn handle_command(&mut self, command: BridgeCommand) -> ControlFlow<()> {
        match command {
            BridgeCommand::InitCommunication => self.init_communication(),
            BridgeCommand::SendHandshake => self.send_handshake(),
            BridgeCommand::RefreshStatusIfNeeded => self.refresh_status_if_needed(),
            BridgeCommand::CancelCommunication => self.cancel_communication(),
            BridgeCommand::RetrieveCredentials { url, reply } => {
                self.retrieve_credentials(url, reply)
            }
            BridgeCommand::CreateCredential { credential, reply } => {
                self.create_credential(credential, reply)
            }
            BridgeCommand::UpdateCredential { credential, reply } => {
                self.update_credential(credential, reply)
            }
            BridgeCommand::Shutdown => {
                self.shutdown();
                return ControlFlow::Break(());
            }
        }

        ControlFlow::Continue(())
    }

    fn is_current(&self, generation: u64) -> bool {
        self.generation == Some(generation)
    }

    // ============================================
    // PUBLIC OPERATIONS
    // ============================================

    pub fn init_communication(&mut self) {
        info!("Initialising communication with {}", self.config.peer.application_name);
        self.connect();
    }

    /// Generate a fresh key pair and offer its public half to the peer.
    ///
    /// Before the peer's `connected` notification the request is held and
    /// sent once it arrives.
    pub fn send_handshake(&mut self) {
        if !self.peer_connected {
            debug!("Peer not connected yet, holding the handshake");
            self.handshake_requested = true;
            return;
        }
        self.handshake_requested = false;

        let public_key = match self.crypto.generate_key_pair() {
            Ok(public_key) => public_key,
            Err(e) => {
                error!("Handshake key pair unavailable: {e}");
                return;
            }
        };

        let message_id = self.message_ids.generate();
        let request = Request::handshake(
            message_id.clone(),
            public_key,
            self.config.peer.application_name.clone(),
        );

        let sent = request
            .to_bytes()
            .map_err(CoreError::from)
            .and_then(|bytes| self.proxy.send(&bytes).map_err(CoreError::from));

        match sent {
            Ok(()) => {
                debug!("Handshake request sent ({message_id})");
                self.pending.insert(message_id, PendingRequest::Handshake);
            }
            Err(e) => {
                warn!("Failed to send handshake request: {e}");
                self.message_ids.retire(&message_id);
            }
        }
    }

    pub fn refresh_status_if_needed(&mut self) {
        match self.status {
            ConnectionStatus::Connected { .. } | ConnectionStatus::Error { .. } => {
                self.send_status()
            }
            _ => trace!("No status refresh needed in {}", self.status),
        }
    }

    /// Tear everything down. Nothing happens until the next `init_communication`.
    pub fn cancel_communication(&mut self) {
        info!("Cancelling communication");

        self.cancel_timers();
        self.stop_proxy();
        self.pending.fail_all(CredentialError::cancelled);
        self.message_ids.clear();
        self.handshake_requested = false;

        if let Err(e) = self.collaborators.key_store.clean() {
            warn!("Failed to remove stored shared key: {e}");
        }
        self.crypto.clean_keys();
        self.set_status(ConnectionStatus::Disabled);
    }

    fn shutdown(&mut self) {
        info!("Bridge shutting down");
        self.cancel_timers();
        self.stop_proxy();
        self.pending.fail_all(CredentialError::bridge_stopped);
        self.message_ids.clear();
        self.handshake_requested = false;
    }

    // ============================================
    // CONNECTING
    // ============================================

    fn connect(&mut self) {
        if !self.collaborators.selection.is_selected() {
            debug!("Peer is not the selected password manager, not connecting");
            return;
        }

        match self.collaborators.installation.installation_state() {
            InstallationState::NotInstalled => {
                self.set_status(ConnectionStatus::NotInstalled);
                self.schedule_reconnect();
                return;
            }
            InstallationState::OldVersion => {
                self.set_status(ConnectionStatus::OldVersion);
                self.schedule_reconnect();
                return;
            }
            InstallationState::Installed => {}
        }

        if !self.collaborators.running.is_running() {
            self.set_status(ConnectionStatus::NotRunning);
            self.schedule_reconnect();
            return;
        }

        if !self.collaborators.installation.is_integration_approved() {
            self.set_status(ConnectionStatus::IntegrationNotApproved);
            self.schedule_reconnect();
            return;
        }

        let has_key = match self.collaborators.key_store.retrieve() {
            Ok(key) => key.is_some(),
            Err(e) => {
                debug!("Stored shared key unreadable, treating as missing: {e}");
                false
            }
        };

        if has_key {
            self.set_status(ConnectionStatus::Connecting);
        } else {
            self.set_status(ConnectionStatus::MissingHandshake);
        }

        self.stop_proxy();
        let peer = &self.config.peer;
        match self.proxy.start(&peer.executable_path, &peer.arguments) {
            Ok(generation) => {
                self.generation = Some(generation);
                self.cancel_timer(TimerKind::Reconnect);
            }
            Err(e) => {
                error!("Running of proxy process failed: {e}");
                self.set_status(ConnectionStatus::error(
                    BridgeErrorKind::RunningOfProxyProcessFailed,
                ));
                self.schedule_reconnect();
            }
        }
    }

    fn stop_proxy(&mut self) {
        self.generation = None;
        self.peer_connected = false;
        self.status_request = None;
        self.proxy.stop();
    }

    /// Kill the peer and try again later.
    fn cancel_connection_and_schedule_next_attempt(&mut self) {
        self.stop_proxy();
        self.pending.fail_all(CredentialError::peer_terminated);
        self.schedule_reconnect();
    }

    fn handle_process_terminated(&mut self) {
        if !self.collaborators.selection.is_selected() || self.status == ConnectionStatus::Disabled
        {
            return;
        }

        self.cancel_timer(TimerKind::StatusRefresh);
        self.cancel_timer(TimerKind::DelayedStatus);
        self.cancel_connection_and_schedule_next_attempt();
        self.set_status(ConnectionStatus::NotRunning);
    }

    fn handle_frame_stream_corrupted(&mut self) {
        self.cancel_timer(TimerKind::DelayedStatus);
        self.cancel_connection_and_schedule_next_attempt();
        self.set_status(ConnectionStatus::error(BridgeErrorKind::FrameStreamCorrupted));
    }

    // ============================================
    // TIMERS
    // ============================================

    fn timer_slot(&mut self, kind: TimerKind) -> &mut Option<TimerHandle> {
        match kind {
            TimerKind::Reconnect => &mut self.reconnect_timer,
            TimerKind::StatusRefresh => &mut self.refresh_timer,
            TimerKind::DelayedStatus => &mut self.delayed_status_timer,
        }
    }

    fn schedule_reconnect(&mut self) {
        if self.reconnect_timer.is_some() {
            trace!("Reconnect already scheduled");
            return;
        }

        let delay = self.config.timing.reconnect_delay();
        self.reconnect_timer = Some(self.scheduler.schedule(TimerKind::Reconnect, delay));
    }

    fn ensure_refresh_timer(&mut self) {
        if self.refresh_timer.is_none() {
            let interval = self.config.timing.status_refresh_interval();
            self.refresh_timer = Some(self.scheduler.schedule(TimerKind::StatusRefresh, interval));
        }
    }

    fn cancel_timer(&mut self, kind: TimerKind) {
        if let Some(handle) = self.timer_slot(kind).take() {
            self.scheduler.cancel(handle);
        }
    }

    fn cancel_timers(&mut self) {
        self.cancel_timer(TimerKind::Reconnect);
        self.cancel_timer(TimerKind::StatusRefresh);
        self.cancel_timer(TimerKind::DelayedStatus);
    }

    fn handle_timer(&mut self, handle: TimerHandle) {
        let slot = self.timer_slot(handle.kind);
        if *slot != Some(handle) {
            trace!("Ignoring stale {:?} timer #{}", handle.kind, handle.id);
            return;
        }
        *slot = None;

        match handle.kind {
            TimerKind::Reconnect => self.connect(),
            TimerKind::DelayedStatus => self.send_status(),
            TimerKind::StatusRefresh => {
                self.send_status();
                if self.is_connected_and_locked() {
                    self.ensure_refresh_timer();
                }
            }
        }
    }

    // ============================================
    // STATUS
    // ============================================

    fn is_connected_and_locked(&self) -> bool {
        self.status.vault().is_some_and(|vault| vault.is_locked())
    }

    fn set_status(&mut self, status: ConnectionStatus) {
        if self.status != status {
            info!("Status changed: {} -> {}", self.status, status);
        } else {
            debug!("Status unchanged: {status}");
        }

        self.status = status.clone();
        self.status_tx.send_if_modified(|current| {
            if *current == status {
                return false;
            }
            *current = status;
            true
        });

        if self.is_connected_and_locked() {
            self.ensure_refresh_timer();
        } else {
            self.cancel_timer(TimerKind::StatusRefresh);
        }
    }

    fn send_status(&mut self) {
        if let Some(superseded) = self.status_request.take() {
            trace!("Superseding unanswered status request {superseded}");
            self.pending.take(&superseded);
            self.message_ids.retire(&superseded);
        }

        match self.send_encrypted(&EncryptedCommand::status()) {
            Ok(message_id) => {
                trace!("Status request sent ({message_id})");
                self.status_request = Some(message_id.clone());
                self.pending.insert(message_id, PendingRequest::Status);
            }
            Err(e) => {
                warn!("Making the status message failed: {e}");
                self.set_status(ConnectionStatus::error(
                    BridgeErrorKind::SendingOfStatusMessageFailed,
                ));
            }
        }
    }

    /// Encrypt and send `command`. Returns the message id to await.
    fn send_encrypted(&mut self, command: &EncryptedCommand) -> Result<String, CoreError> {
        let plain = zeroize::Zeroizing::new(command.to_bytes()?);
        let encrypted = self.crypto.encrypt_command(&plain)?;

        let message_id = self.message_ids.generate();
        let bytes = Request::encrypted_command(message_id.clone(), encrypted).to_bytes()?;

        if let Err(e) = self.proxy.send(&bytes) {
            self.message_ids.retire(&message_id);
            return Err(e.into());
        }

        Ok(message_id)
    }

    // ============================================
    // INCOMING MESSAGES
    // ============================================

    fn handle_message(&mut self, data: &[u8]) {
        let response = match Response::from_slice(data) {
            Ok(response) => response,
            Err(e) => {
                warn!("Can't decode message from peer: {e}");
                return;
            }
        };

        match response.notification() {
            Some(ResponseKind::Connected) => return self.handle_connected(),
            Some(ResponseKind::Disconnected) => return self.handle_disconnected(),
            _ => {}
        }

        let Some(message_id) = response.message_id.as_deref() else {
            debug!("Peer message without message id, ignoring");
            return;
        };

        if !self.message_ids.verify(message_id) {
            debug!("Unknown message id {message_id}, ignoring the message");
            return;
        }

        let Some(request) = self.pending.take(message_id) else {
            debug!("Message {message_id} was already answered, ignoring");
            return;
        };
        self.message_ids.retire(message_id);
        if self.status_request.as_deref() == Some(message_id) {
            self.status_request = None;
        }

        let kind = response.kind(request.expectation());

        match request {
            PendingRequest::Handshake => self.handle_handshake_response(kind),
            PendingRequest::Status => self.handle_status_response(kind),
            PendingRequest::Retrieve { url, reply } => {
                let result = self
                    .decrypt_for_call(kind)
                    .and_then(|inner| credentials::parse_retrieval(&inner, &url));
                deliver(reply, result);
            }
            PendingRequest::Create { reply } => {
                let result = self.decrypt_for_call(kind).and_then(|inner| {
                    credentials::parse_write(&inner, COMMAND_CREDENTIAL_CREATE, |message| {
                        CredentialError::creation_failed(message)
                    })
                });
                deliver(reply, result);
            }
            PendingRequest::Update { reply } => {
                let result = self.decrypt_for_call(kind).and_then(|inner| {
                    credentials::parse_write(&inner, COMMAND_CREDENTIAL_UPDATE, |message| {
                        CredentialError::update_failed(message)
                    })
                });
                deliver(reply, result);
            }
        }
    }

    fn handle_connected(&mut self) {
        self.peer_connected = true;

        let stored = match self.collaborators.key_store.retrieve() {
            Ok(stored) => stored,
            Err(e) => {
                error!("Failed to retrieve shared key: {e}");
                self.set_status(ConnectionStatus::HandshakeNotApproved);
                return;
            }
        };

        let Some(stored) = stored else {
            if self.handshake_requested {
                info!("Peer connected, sending the held handshake");
                self.send_handshake();
            } else {
                info!("Peer connected, waiting for the handshake");
            }
            return;
        };
        self.handshake_requested = false;

        let installed = stored
            .decode()
            .map(|bytes| self.crypto.set_shared_key(&bytes))
            .unwrap_or(false);

        if !installed {
            self.set_status(ConnectionStatus::error(BridgeErrorKind::SharedKeyInjectionFailed));
            return;
        }

        self.set_status(ConnectionStatus::WaitingForStatusResponse);

        let delay = self.config.timing.initial_status_delay();
        if delay.is_zero() {
            self.send_status();
        } else {
            self.cancel_timer(TimerKind::DelayedStatus);
            self.delayed_status_timer =
                Some(self.scheduler.schedule(TimerKind::DelayedStatus, delay));
        }
    }

    fn handle_disconnected(&mut self) {
        info!("Peer reported disconnected");
        self.cancel_timer(TimerKind::DelayedStatus);
        self.cancel_connection_and_schedule_next_attempt();

        if self.status != ConnectionStatus::Disabled {
            self.set_status(ConnectionStatus::NotRunning);
        }
    }

    fn handle_handshake_response(&mut self, kind: ResponseKind) {
        let HandshakeResponse { status, shared_key } = match kind {
            ResponseKind::Handshake(response) => response,
            ResponseKind::PeerError(error) => return self.handle_peer_error(&error),
            other => {
                warn!("Unexpected answer to the handshake: {other:?}");
                self.set_status(ConnectionStatus::error(BridgeErrorKind::HandshakeFailed));
                return self.cancel_connection_and_schedule_next_attempt();
            }
        };

        if status != STATUS_SUCCESS {
            warn!("Peer refused the handshake: {status}");
            self.set_status(ConnectionStatus::error(BridgeErrorKind::HandshakeFailed));
            return self.cancel_connection_and_schedule_next_attempt();
        }

        let key = match self.crypto.decrypt_shared_key(&shared_key) {
            Ok(key) => key,
            Err(e) => {
                error!("Decryption of shared key failed: {e}");
                self.set_status(ConnectionStatus::error(
                    BridgeErrorKind::DecryptionOfSharedKeyFailed,
                ));
                return self.cancel_connection_and_schedule_next_attempt();
            }
        };

        let stored = RedactedSharedKey::from_bytes(key.as_bytes());
        if let Err(e) = self.collaborators.key_store.save(&stored) {
            error!("Storing of shared key failed: {e}");
            self.set_status(ConnectionStatus::error(BridgeErrorKind::StoringOfSharedKeyFailed));
            return;
        }

        self.crypto.install_shared_key(key);
        self.set_status(ConnectionStatus::WaitingForStatusResponse);
        self.send_status();
    }

    fn handle_status_response(&mut self, kind: ResponseKind) {
        let payload = match kind {
            ResponseKind::Encrypted(payload) => payload,
            ResponseKind::PeerError(error) => return self.handle_peer_error(&error),
            other => {
                warn!("Unexpected answer to the status request: {other:?}");
                return self.set_status(ConnectionStatus::error(BridgeErrorKind::ParsingFailed));
            }
        };

        let inner = match self.decrypt_payload(&payload) {
            Ok(inner) => inner,
            Err(kind) => return self.set_status(ConnectionStatus::error(kind)),
        };

        if let Some(error) = inner.peer_error() {
            let error = error.to_string();
            return self.handle_peer_error(&error);
        }

        if inner.command.as_deref() != Some(COMMAND_STATUS) {
            warn!("Status request answered with command {:?}", inner.command);
            return self.set_status(ConnectionStatus::error(BridgeErrorKind::ParsingFailed));
        }

        match inner.active_vault() {
            Ok(vault) => self.set_status(ConnectionStatus::Connected { vault }),
            Err(kind) => self.set_status(ConnectionStatus::error(kind)),
        }
    }

    /// Peer errors that answer the connection itself (handshake, status).
    fn handle_peer_error(&mut self, error: &str) {
        if self.apply_locked(error) {
            return;
        }

        let kind = if error == PEER_ERROR_CANNOT_DECRYPT {
            BridgeErrorKind::BitwardenCannotDecrypt
        } else {
            BridgeErrorKind::BitwardenRespondedWithError
        };

        warn!("Peer responded with error: {error}");
        self.set_status(ConnectionStatus::error(kind));
    }

    /// `locked` marks the current vault locked, or asks again when not connected.
    fn apply_locked(&mut self, error: &str) -> bool {
        if error != PEER_ERROR_LOCKED {
            return false;
        }

        match self.status.vault() {
            Some(vault) => {
                let locked = vault.locked();
                self.set_status(ConnectionStatus::Connected { vault: locked });
            }
            None => self.send_status(),
        }
        true
    }

    /// Decrypt an encrypted payload into the inner response.
    fn decrypt_payload(&self, payload: &EncryptedPayload) -> Result<Response, BridgeErrorKind> {
        let parts = payload.decode_parts().map_err(|e| {
            warn!("Encrypted payload unusable: {e}");
            BridgeErrorKind::ParsingFailed
        })?;

        let plain = self
            .crypto
            .decrypt(&parts.data, &parts.iv, &parts.mac)
            .map(zeroize::Zeroizing::new)
            .map_err(|e| {
                warn!("Decryption of data failed: {e}");
                BridgeErrorKind::DecryptionOfDataFailed
            })?;

        Response::from_slice(&plain).map_err(|e| {
            warn!("Decrypted payload is not a valid message: {e}");
            BridgeErrorKind::ParsingFailed
        })
    }

    /// Decrypt path for credential calls. Peer errors go to the caller and
    /// leave the status alone, except `locked`.
    fn decrypt_for_call(&mut self, kind: ResponseKind) -> Result<Response, CredentialError> {
        let payload = match kind {
            ResponseKind::Encrypted(payload) => payload,
            ResponseKind::PeerError(error) => {
                self.apply_locked(&error);
                return Err(CredentialError::peer(error));
            }
            other => {
                return Err(CredentialError::send(format!(
                    "Unexpected answer from peer: {other:?}"
                )));
            }
        };

        let inner = match self.decrypt_payload(&payload) {
            Ok(inner) => inner,
            Err(kind) => {
                self.set_status(ConnectionStatus::error(kind));
                return Err(CredentialError::send(format!(
                    "Response could not be decrypted: {kind:?}"
                )));
            }
        };

        if let Some(error) = inner.peer_error() {
            let error = error.to_string();
            self.apply_locked(&error);
            return Err(CredentialError::peer(error));
        }

        Ok(inner)
    }

    // ============================================
    // CREDENTIAL CALLS
    // ============================================

    fn ensure_connected(&self) -> Result<(), CredentialError> {
        if self.status.is_connected() {
            Ok(())
        } else {
            Err(CredentialError::not_connected(&self.status))
        }
    }

    fn retrieve_credentials(&mut self, url: Url, reply: CredentialsReply) {
        if let Err(e) = self.ensure_connected() {
            return deliver(reply, Err(e));
        }

        match self.send_encrypted(&credentials::retrieval_command(&url)) {
            Ok(message_id) => self
                .pending
                .insert(message_id, PendingRequest::Retrieve { url, reply }),
            Err(e) => deliver(reply, Err(CredentialError::send(e.to_string()))),
        }
    }

    fn create_credential(&mut self, credential: Credential, reply: WriteReply) {
        if let Err(e) = self.ensure_connected() {
            return deliver(reply, Err(e));
        }

        match self.send_encrypted(&credentials::create_command(&credential)) {
            Ok(message_id) => self.pending.insert(message_id, PendingRequest::Create { reply }),
            Err(e) => deliver(reply, Err(CredentialError::send(e.to_string()))),
        }
    }

    fn update_credential(&mut self, credential: Credential, reply: WriteReply) {
        if let Err(e) = self.ensure_connected() {
            return deliver(reply, Err(e));
        }

        let command = match credentials::update_command(&credential) {
            Ok(command) => command,
            Err(e) => return deliver(reply, Err(e)),
        };

        match self.send_encrypted(&command) {
            Ok(message_id) => self.pending.insert(message_id, PendingRequest::Update { reply }),
            Err(e) => deliver(reply, Err(CredentialError::send(e.to_string()))),
        }
    }
}

fn deliver<T>(
    reply: oneshot::Sender<Result<T, CredentialError>>,
    result: Result<T, CredentialError>,
) {
    if reply.send(result).is_err() {
        trace!("Credential caller went away before the answer arrived");
    }
}

impl Drop for BridgeManager {
    fn drop(&mut self) {
        self.cancel_timers();
        self.stop_proxy();
    }
}
