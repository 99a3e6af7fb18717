mod credentials;
mod manager;
mod pending;

use crate::config::BridgeConfig;
use crate::connection::event::BridgeEvent;
use crate::connection::manager::BridgeManager;
use crate::crypto::CryptoChannel;
use crate::key_store::{MemoryKeyStore, SharedKeyStore};
use crate::message::Request;
use crate::scheduler::TimerKind;
use crate::testing::{FakeEnvironment, FakePeer, FakeProxy, ManualScheduler, TEST_RSA_BITS};

use models::ConnectionStatus;

/// Default config, except the first status request goes out immediately.
fn test_config() -> BridgeConfig {
    let mut config = BridgeConfig::default();
    config.timing.initial_status_delay_ms = 0;
    config
}

/// A manager wired to fakes, plus handles on every fake.
struct Harness {
    manager: BridgeManager,
    proxy: FakeProxy,
    scheduler: ManualScheduler,
    env: FakeEnvironment,
    keys: MemoryKeyStore,
}

impl Harness {
    fn new() -> Self {
        Self::with_store(test_config(), MemoryKeyStore::new())
    }

    fn with_store(config: BridgeConfig, keys: MemoryKeyStore) -> Self {
        let mut harness = Self::build(config, FakeEnvironment::ready(), keys.clone());
        harness.keys = keys;
        harness
    }

    fn with_key_store(config: BridgeConfig, key_store: impl SharedKeyStore + 'static) -> Self {
        Self::build(config, FakeEnvironment::ready(), key_store)
    }

    fn build(
        config: BridgeConfig,
        env: FakeEnvironment,
        key_store: impl SharedKeyStore + 'static,
    ) -> Self {
        let proxy = FakeProxy::new();
        let scheduler = ManualScheduler::new();
        let manager = BridgeManager::new(
            config,
            env.collaborators(key_store),
            Box::new(proxy.clone()),
            Box::new(scheduler.clone()),
        )
        .with_crypto(CryptoChannel::with_key_bits(TEST_RSA_BITS));

        Self {
            manager,
            proxy,
            scheduler,
            env,
            keys: MemoryKeyStore::new(),
        }
    }

    /// Connected to `peer` through a stored key, vault in `vault_status`.
    fn connected(peer: &FakePeer, vault_status: &str) -> Self {
        let mut harness =
            Self::with_store(test_config(), MemoryKeyStore::with_key(peer.stored_key()));

        harness.manager.init_communication();
        harness.deliver(FakePeer::connected());
        harness.answer_status(peer, vault_status);

        assert!(harness.status().is_connected(), "harness failed to connect");
        harness
    }

    fn status(&self) -> ConnectionStatus {
        self.manager.status().clone()
    }

    /// Hand `data` to the manager as if the current proxy had sent it.
    fn deliver(&mut self, data: Vec<u8>) {
        let generation = self.proxy.generation();
        self.event(BridgeEvent::MessageReceived { generation, data });
    }

    fn event(&mut self, event: impl Into<BridgeEvent>) {
        let _ = self.manager.handle_event(event.into());
    }

    /// Fire the oldest pending timer of `kind`. `false` if there was none.
    fn fire(&mut self, kind: TimerKind) -> bool {
        match self.scheduler.fire(kind) {
            Some(event) => {
                self.event(event);
                true
            }
            None => false,
        }
    }

    fn sent(&self) -> Vec<Request> {
        self.proxy.take_sent()
    }

    /// The single request sent since the last check.
    fn single_sent(&self) -> Request {
        let mut sent = self.sent();
        assert_eq!(sent.len(), 1, "expected exactly one request, got {sent:?}");
        sent.remove(0)
    }

    /// Answer the one outstanding status request.
    fn answer_status(&mut self, peer: &FakePeer, vault_status: &str) {
        let request = self.single_sent();
        let answer = peer
            .status(&request.message_id, "user@example.com", vault_status, true)
            .expect("peer encrypts");
        self.deliver(answer);
    }
}
