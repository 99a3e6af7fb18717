//! The bridge actor and the handle the application holds.
//!
//! # Architecture
//!
//! One tokio task owns the [`BridgeManager`]. Everything that can change its
//! state reaches it through one mpsc channel:
//! - API calls on [`BridgeHandle`]
//! - proxy stdout frames, stderr end, process exit
//! - timer firings from the [`TokioScheduler`]
//!
//! Status reads go through a `watch` channel and never wait on the actor.

use crate::config::BridgeConfig;
use crate::connection::event::{BridgeCommand, BridgeEvent};
use crate::connection::manager::{BridgeManager, Collaborators};
use crate::error::BridgeError;
use crate::process::ProcessBridge;
use crate::scheduler::TokioScheduler;

use models::ConnectionStatus;

use std::ops::ControlFlow;

use log::info;
use tokio::sync::{mpsc, watch};
use tokio::task::JoinHandle;

pub const EVENT_CHANNEL_CAPACITY: usize = 100;

/// Cheap to clone; all clones drive the same bridge.
#[derive(Clone)]
pub struct BridgeHandle {
    pub(crate) events: mpsc::Sender<BridgeEvent>,
    pub(crate) status: watch::Receiver<ConnectionStatus>,
}

impl BridgeHandle {
    /// Start a bridge talking to a real peer process.
    ///
    /// Must be called from within a tokio runtime.
    pub fn spawn(config: BridgeConfig, collaborators: Collaborators) -> (Self, JoinHandle<()>) {
        let (events_tx, events_rx) = mpsc::channel(EVENT_CHANNEL_CAPACITY);

        let proxy = ProcessBridge::new(events_tx.clone());
        let scheduler = TokioScheduler::new(events_tx.clone());
        let manager =
            BridgeManager::new(config, collaborators, Box::new(proxy), Box::new(scheduler));

        Self::run(manager, events_tx, events_rx)
    }

    /// Drive an already assembled manager. `events_tx` must be the sender its
    /// proxy and scheduler post to.
    pub fn run(
        manager: BridgeManager,
        events_tx: mpsc::Sender<BridgeEvent>,
        events_rx: mpsc::Receiver<BridgeEvent>,
    ) -> (Self, JoinHandle<()>) {
        let status = manager.subscribe();
        let task = tokio::spawn(bridge_actor(manager, events_rx));

        info!("Bridge actor spawned");

        (
            Self {
                events: events_tx,
                status,
            },
            task,
        )
    }

    pub fn status(&self) -> ConnectionStatus {
        self.status.borrow().clone()
    }

    /// A receiver notified on every status change.
    pub fn subscribe(&self) -> watch::Receiver<ConnectionStatus> {
        self.status.clone()
    }

    pub async fn init_communication(&self) -> Result<(), BridgeError> {
        self.command(BridgeCommand::InitCommunication).await
    }

    pub async fn send_handshake(&self) -> Result<(), BridgeError> {
        self.command(BridgeCommand::SendHandshake).await
    }

    pub async fn refresh_status_if_needed(&self) -> Result<(), BridgeError> {
        self.command(BridgeCommand::RefreshStatusIfNeeded).await
    }

    pub async fn cancel_communication(&self) -> Result<(), BridgeError> {
        self.command(BridgeCommand::CancelCommunication).await
    }

    /// Stop the actor. Pending credential calls fail with `BridgeStopped`.
    pub async fn shutdown(&self) -> Result<(), BridgeError> {
        self.command(BridgeCommand::Shutdown).await
    }

    pub(crate) async fn command(&self, command: BridgeCommand) -> Result<(), BridgeError> {
        self.events
            .send(BridgeEvent::Command(command))
            .await
            .map_err(|e| BridgeError::stopped(format!("Bridge actor died: {e}")))
    }
}

/// Processes events until shutdown or until every sender is gone.
async fn bridge_actor(mut manager: BridgeManager, mut events: mpsc::Receiver<BridgeEvent>) {
    info!("Bridge actor started");

    while let Some(event) = events.recv().await {
        if let ControlFlow::Break(()) = manager.handle_event(event) {
            break;
        }
    }

    info!("Bridge actor stopped");
}
