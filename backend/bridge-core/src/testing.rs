//! Stand-ins for the peer, its process and the clock.
//!
//! Used by this crate's tests and available to embedders that want to drive
//! a [`BridgeManager`](crate::connection::BridgeManager) deterministically.
//! Outside this crate's unit tests it needs the `testing` feature.

use crate::connection::event::BridgeEvent;
use crate::connection::manager::Collaborators;
use crate::crypto::CryptoChannel;
use crate::crypto::shared_key::SHARED_KEY_LEN;
use crate::discovery::{InstallationCheck, PasswordManagerSelection, RunningApplicationCheck};
use crate::error::crypto::CryptoError;
use crate::error::key_store::KeyStoreError;
use crate::error::process::ProcessError;
use crate::error::protocol::ProtocolError;
use crate::key_store::SharedKeyStore;
use crate::message::{
    COMMAND_STATUS, EncryptedCommand, EncryptedString, NOTIFICATION_CONNECTED,
    NOTIFICATION_DISCONNECTED, PROTOCOL_VERSION, Request, STATUS_SUCCESS,
};
use crate::process::ProxyProcess;
use crate::scheduler::{Scheduler, TimerHandle, TimerKind};

use common::{ErrorLocation, RedactedSharedKey};
use models::InstallationState;

use std::path::Path;
use std::sync::{Arc, Mutex, MutexGuard};
use std::time::Duration;

use base64::Engine;
use base64::engine::general_purpose::STANDARD as BASE64;
use rand::RngCore;
use rsa::pkcs8::DecodePublicKey;
use rsa::{Oaep, RsaPublicKey};
use serde_json::{Value, json};
use sha1::Sha1;

/// RSA size used by tests; large enough for OAEP over a 64-byte key.
pub const TEST_RSA_BITS: usize = 1024;

fn lock<T>(mutex: &Mutex<T>) -> MutexGuard<'_, T> {
    mutex.lock().unwrap_or_else(|e| e.into_inner())
}

// ============================================
// SCHEDULER
// ============================================

#[derive(Debug, Default)]
struct ManualState {
    next_id: u64,
    pending: Vec<(TimerHandle, Duration)>,
}

/// Records timers instead of running them. Clones share state.
#[derive(Debug, Clone, Default)]
pub struct ManualScheduler {
    state: Arc<Mutex<ManualState>>,
}

impl ManualScheduler {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn pending(&self) -> Vec<(TimerHandle, Duration)> {
        lock(&self.state).pending.clone()
    }

    pub fn count(&self, kind: TimerKind) -> usize {
        lock(&self.state)
            .pending
            .iter()
            .filter(|(handle, _)| handle.kind == kind)
            .count()
    }

    /// Remove the oldest pending timer of `kind` and return its firing.
    pub fn fire(&self, kind: TimerKind) -> Option<BridgeEvent> {
        let mut state = lock(&self.state);
        let index = state
            .pending
            .iter()
            .position(|(handle, _)| handle.kind == kind)?;
        let (handle, _) = state.pending.remove(index);
        Some(BridgeEvent::TimerFired(handle))
    }
}

impl Scheduler for ManualScheduler {
    fn schedule(&mut self, kind: TimerKind, delay: Duration) -> TimerHandle {
        let mut state = lock(&self.state);
        state.next_id += 1;
        let handle = TimerHandle {
            kind,
            id: state.next_id,
        };
        state.pending.push((handle, delay));
        handle
    }

    fn cancel(&mut self, handle: TimerHandle) {
        lock(&self.state).pending.retain(|(pending, _)| *pending != handle);
    }
}

// ============================================
// PROXY PROCESS
// ============================================

#[derive(Debug, Default)]
struct FakeProxyState {
    running: bool,
    generation: u64,
    starts: usize,
    fail_start: bool,
    sent: Vec<Vec<u8>>,
}

/// Records what the manager sends. Clones share state.
#[derive(Debug, Clone, Default)]
pub struct FakeProxy {
    state: Arc<Mutex<FakeProxyState>>,
}

impl FakeProxy {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn set_fail_start(&self, fail: bool) {
        lock(&self.state).fail_start = fail;
    }

    pub fn is_running(&self) -> bool {
        lock(&self.state).running
    }

    pub fn generation(&self) -> u64 {
        lock(&self.state).generation
    }

    pub fn starts(&self) -> usize {
        lock(&self.state).starts
    }

    /// Drain and decode everything sent since the last call.
    pub fn take_sent(&self) -> Vec<Request> {
        std::mem::take(&mut lock(&self.state).sent)
            .iter()
            .filter_map(|bytes| serde_json::from_slice(bytes).ok())
            .collect()
    }
}

impl ProxyProcess for FakeProxy {
    fn start(&mut self, path: &Path, _args: &[String]) -> Result<u64, ProcessError> {
        let mut state = lock(&self.state);
        state.starts += 1;

        if state.fail_start {
            return Err(ProcessError::SpawnFailed {
                message: "Spawn refused by test".to_string(),
                path: path.to_path_buf(),
                location: ErrorLocation::caller(),
                source: std::io::Error::new(std::io::ErrorKind::NotFound, "fake"),
            });
        }

        state.generation += 1;
        state.running = true;
        Ok(state.generation)
    }

    fn send(&mut self, payload: &[u8]) -> Result<(), ProcessError> {
        let mut state = lock(&self.state);
        if !state.running {
            return Err(ProcessError::not_running("Fake proxy is stopped"));
        }
        state.sent.push(payload.to_vec());
        Ok(())
    }

    fn stop(&mut self) {
        lock(&self.state).running = false;
    }

    fn is_running(&self) -> bool {
        lock(&self.state).running
    }
}

// ============================================
// LOCAL MACHINE
// ============================================

#[derive(Debug)]
struct EnvironmentState {
    installation: InstallationState,
    running: bool,
    approved: bool,
    selected: bool,
}

/// Installation, running and selection answers in one switchable place.
#[derive(Debug, Clone)]
pub struct FakeEnvironment {
    state: Arc<Mutex<EnvironmentState>>,
}

impl Default for FakeEnvironment {
    fn default() -> Self {
        Self::ready()
    }
}

impl FakeEnvironment {
    /// Installed, running, approved and selected.
    pub fn ready() -> Self {
        Self {
            state: Arc::new(Mutex::new(EnvironmentState {
                installation: InstallationState::Installed,
                running: true,
                approved: true,
                selected: true,
            })),
        }
    }

    pub fn set_installation(&self, installation: InstallationState) {
        lock(&self.state).installation = installation;
    }

    pub fn set_running(&self, running: bool) {
        lock(&self.state).running = running;
    }

    pub fn set_approved(&self, approved: bool) {
        lock(&self.state).approved = approved;
    }

    pub fn set_selected(&self, selected: bool) {
        lock(&self.state).selected = selected;
    }

    pub fn collaborators(&self, key_store: impl SharedKeyStore + 'static) -> Collaborators {
        Collaborators {
            installation: Box::new(self.clone()),
            running: Box::new(self.clone()),
            selection: Box::new(self.clone()),
            key_store: Box::new(key_store),
        }
    }
}

impl InstallationCheck for FakeEnvironment {
    fn installation_state(&self) -> InstallationState {
        lock(&self.state).installation
    }

    fn is_integration_approved(&self) -> bool {
        lock(&self.state).approved
    }
}

impl RunningApplicationCheck for FakeEnvironment {
    fn is_running(&self) -> bool {
        lock(&self.state).running
    }
}

impl PasswordManagerSelection for FakeEnvironment {
    fn is_selected(&self) -> bool {
        lock(&self.state).selected
    }
}

/// A key store whose reads or writes always fail.
#[derive(Debug, Clone, Copy, Default)]
pub struct FailingKeyStore {
    pub fail_read: bool,
    pub fail_write: bool,
}

impl SharedKeyStore for FailingKeyStore {
    fn retrieve(&self) -> Result<Option<RedactedSharedKey>, KeyStoreError> {
        if self.fail_read {
            return Err(KeyStoreError::Corrupted {
                location: ErrorLocation::caller(),
                reason: "read refused by test".to_string(),
            });
        }
        Ok(None)
    }

    fn save(&mut self, _key: &RedactedSharedKey) -> Result<(), KeyStoreError> {
        if self.fail_write {
            return Err(KeyStoreError::Corrupted {
                location: ErrorLocation::caller(),
                reason: "write refused by test".to_string(),
            });
        }
        Ok(())
    }

    fn clean(&mut self) -> Result<(), KeyStoreError> {
        Ok(())
    }
}

// ============================================
// PEER
// ============================================

/// The peer's half of the protocol.
pub struct FakePeer {
    crypto: CryptoChannel,
    shared_key: Vec<u8>,
}

impl Default for FakePeer {
    fn default() -> Self {
        Self::new()
    }
}

impl FakePeer {
    /// A peer with a freshly generated shared key.
    pub fn new() -> Self {
        let mut shared_key = vec![0u8; SHARED_KEY_LEN];
        rand::thread_rng().fill_bytes(&mut shared_key);
        Self::with_shared_key(shared_key)
    }

    pub fn with_shared_key(shared_key: Vec<u8>) -> Self {
        let mut crypto = CryptoChannel::with_key_bits(TEST_RSA_BITS);
        crypto.set_shared_key(&shared_key);
        Self { crypto, shared_key }
    }

    /// The key as our key store would hold it.
    pub fn stored_key(&self) -> RedactedSharedKey {
        RedactedSharedKey::from_bytes(&self.shared_key)
    }

    pub fn connected() -> Vec<u8> {
        notification(NOTIFICATION_CONNECTED)
    }

    pub fn disconnected() -> Vec<u8> {
        notification(NOTIFICATION_DISCONNECTED)
    }

    /// Accept a handshake request, encrypting our key to its public key.
    pub fn accept_handshake(&self, request: &Request) -> Result<Vec<u8>, CryptoError> {
        let public_key = request
            .payload
            .as_ref()
            .map(|payload| payload.public_key.as_str())
            .ok_or_else(|| CryptoError::missing_key("Handshake carried no public key"))?;

        let der = BASE64
            .decode(public_key)
            .map_err(|e| CryptoError::missing_key(format!("Public key is not Base64: {e}")))?;
        let public_key = RsaPublicKey::from_public_key_der(&der)
            .map_err(|e| CryptoError::missing_key(format!("Public key is not SPKI: {e}")))?;

        let encrypted = public_key
            .encrypt(&mut rand::thread_rng(), Oaep::new::<Sha1>(), &self.shared_key)
            .map_err(|e| CryptoError::encryption_failed(format!("RSA-OAEP failed: {e}")))?;

        Ok(to_bytes(json!({
            "messageId": request.message_id,
            "version": PROTOCOL_VERSION,
            "payload": { "status": STATUS_SUCCESS, "sharedKey": BASE64.encode(encrypted) },
        })))
    }

    pub fn refuse_handshake(request: &Request) -> Vec<u8> {
        to_bytes(json!({
            "messageId": request.message_id,
            "version": PROTOCOL_VERSION,
            "payload": { "status": "canceled" },
        }))
    }

    /// A plaintext `{ error }` answer.
    pub fn error(message_id: &str, error: &str) -> Vec<u8> {
        to_bytes(json!({
            "messageId": message_id,
            "version": PROTOCOL_VERSION,
            "payload": { "error": error },
        }))
    }

    /// Decrypt the command inside an encrypted request.
    pub fn open(&self, request: &Request) -> Result<EncryptedCommand, ProtocolError> {
        let encrypted: EncryptedString = request
            .encrypted_command
            .as_deref()
            .ok_or_else(|| ProtocolError::unexpected_shape("Request is not encrypted"))?
            .parse()?;

        let plain = self
            .crypto
            .decrypt(&encrypted.data, &encrypted.iv, &encrypted.mac)
            .map_err(|e| ProtocolError::parsing_failed(e.to_string()))?;

        Ok(serde_json::from_slice(&plain)?)
    }

    /// Encrypt `inner` as the answer to `message_id`.
    pub fn encrypted(&self, message_id: &str, inner: Value) -> Result<Vec<u8>, CryptoError> {
        let encrypted = self.crypto.encrypt(&to_bytes(inner))?;

        Ok(to_bytes(json!({
            "messageId": message_id,
            "version": PROTOCOL_VERSION,
            "encryptedPayload": {
                "encryptionType": 2,
                "data": BASE64.encode(&encrypted.data),
                "iv": BASE64.encode(&encrypted.iv),
                "mac": BASE64.encode(&encrypted.mac),
            },
        })))
    }

    /// Encrypted status answer with a single vault.
    pub fn status(
        &self,
        message_id: &str,
        email: &str,
        vault_status: &str,
        active: bool,
    ) -> Result<Vec<u8>, CryptoError> {
        self.encrypted(
            message_id,
            json!({
                "command": COMMAND_STATUS,
                "payload": [{
                    "id": "vault-1",
                    "email": email,
                    "status": vault_status,
                    "active": active,
                }],
            }),
        )
    }
}

fn notification(command: &str) -> Vec<u8> {
    to_bytes(json!({ "command": command, "version": PROTOCOL_VERSION }))
}

fn to_bytes(value: Value) -> Vec<u8> {
    value.to_string().into_bytes()
}
