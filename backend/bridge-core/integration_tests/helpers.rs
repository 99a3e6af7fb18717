//! Test helpers for bridge integration tests.
//!
//! - Assembling a bridge actor around the in-crate fakes
//! - Waiting for status changes and outgoing requests with a deadline

use bridge_core::config::BridgeConfig;
use bridge_core::connection::event::BridgeEvent;
use bridge_core::connection::{BridgeHandle, BridgeManager};
use bridge_core::crypto::CryptoChannel;
use bridge_core::key_store::MemoryKeyStore;
use bridge_core::message::Request;
use bridge_core::scheduler::TokioScheduler;
use bridge_core::testing::{FakeEnvironment, FakeProxy, TEST_RSA_BITS};

use models::ConnectionStatus;

use std::time::Duration;

use tokio::sync::mpsc;
use tokio::task::JoinHandle;
use tokio::time::timeout;

pub const DEADLINE: Duration = Duration::from_secs(10);

/// A running bridge actor plus handles on its fakes.
pub struct TestBridge {
    pub handle: BridgeHandle,
    pub task: JoinHandle<()>,
    pub events: mpsc::Sender<BridgeEvent>,
    pub proxy: FakeProxy,
    pub env: FakeEnvironment,
    pub keys: MemoryKeyStore,
}

/// Bridge with a fake proxy and real tokio timers.
pub fn spawn_bridge(config: BridgeConfig, keys: MemoryKeyStore) -> TestBridge {
    let (events_tx, events_rx) = mpsc::channel(100);
    let proxy = FakeProxy::new();
    let env = FakeEnvironment::ready();

    let manager = BridgeManager::new(
        config,
        env.collaborators(keys.clone()),
        Box::new(proxy.clone()),
        Box::new(TokioScheduler::new(events_tx.clone())),
    )
    .with_crypto(CryptoChannel::with_key_bits(TEST_RSA_BITS));

    let (handle, task) = BridgeHandle::run(manager, events_tx.clone(), events_rx);

    TestBridge {
        handle,
        task,
        events: events_tx,
        proxy,
        env,
        keys,
    }
}

/// Config with the first status request sent as soon as the peer connects.
pub fn immediate_status_config() -> BridgeConfig {
    let mut config = BridgeConfig::default();
    config.timing.initial_status_delay_ms = 0;
    config
}

impl TestBridge {
    /// Post `data` as a frame from the current proxy.
    pub async fn deliver(&self, data: Vec<u8>) {
        let generation = self.proxy.generation();
        self.events
            .send(BridgeEvent::MessageReceived { generation, data })
            .await
            .expect("bridge actor is running");
    }

    /// Wait until the status satisfies `predicate`.
    pub async fn wait_for_status(
        &self,
        predicate: impl FnMut(&ConnectionStatus) -> bool,
    ) -> ConnectionStatus {
        let mut status = self.handle.subscribe();
        let reached = timeout(DEADLINE, status.wait_for(predicate))
            .await
            .expect("status reached before the deadline")
            .expect("bridge actor is running")
            .clone();
        reached
    }

    /// Wait for the next request sent to the proxy. Expects it to be the only one.
    pub async fn next_request(&self) -> Request {
        timeout(DEADLINE, async {
            loop {
                let mut sent = self.proxy.take_sent();
                if !sent.is_empty() {
                    assert_eq!(sent.len(), 1, "expected one request, got {sent:?}");
                    return sent.remove(0);
                }
                tokio::time::sleep(Duration::from_millis(5)).await;
            }
        })
        .await
        .expect("request sent before the deadline")
    }
}
