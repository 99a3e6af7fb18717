//! Delayed events for the connection manager.
//!
//! The manager never sleeps. It asks a [`Scheduler`] to deliver a
//! [`BridgeEvent::TimerFired`] later and keeps the returned handle; a firing
//! whose handle no longer matches the one it holds is stale and ignored.

use crate::connection::event::BridgeEvent;

use std::collections::HashMap;
use std::time::Duration;

use log::trace;
use tokio::sync::mpsc;
use tokio::task::JoinHandle;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum TimerKind {
    /// One-shot retry of the connect attempt.
    Reconnect,
    /// Re-sends the status request while the vault is locked.
    StatusRefresh,
    /// First status request after a `connected` notification.
    DelayedStatus,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct TimerHandle {
    pub kind: TimerKind,
    pub id: u64,
}

pub trait Scheduler: Send {
    fn schedule(&mut self, kind: TimerKind, delay: Duration) -> TimerHandle;

    fn cancel(&mut self, handle: TimerHandle);
}

/// Runs each timer as a `tokio::time::sleep` task posting into the actor channel.
pub struct TokioScheduler {
    events: mpsc::Sender<BridgeEvent>,
    next_id: u64,
    tasks: HashMap<u64, JoinHandle<()>>,
}

impl TokioScheduler {
    pub fn new(events: mpsc::Sender<BridgeEvent>) -> Self {
        Self {
            events,
            next_id: 0,
            tasks: HashMap::new(),
        }
    }

    pub fn active(&self) -> usize {
        self.tasks.values().filter(|task| !task.is_finished()).count()
    }
}

impl Scheduler for TokioScheduler {
    fn schedule(&mut self, kind: TimerKind, delay: Duration) -> TimerHandle {
        self.tasks.retain(|_, task| !task.is_finished());

        self.next_id += 1;
        let handle = TimerHandle {
            kind,
            id: self.next_id,
        };

        let events = self.events.clone();
        let task = tokio::spawn(async move {
            tokio::time::sleep(delay).await;
            if events.send(BridgeEvent::TimerFired(handle)).await.is_err() {
                trace!("Timer {handle:?} fired after the bridge stopped");
            }
        });

        trace!("Scheduled {kind:?} timer #{} in {delay:?}", handle.id);
        self.tasks.insert(handle.id, task);
        handle
    }

    fn cancel(&mut self, handle: TimerHandle) {
        if let Some(task) = self.tasks.remove(&handle.id) {
            task.abort();
            trace!("Cancelled {:?} timer #{}", handle.kind, handle.id);
        }
    }
}

impl Drop for TokioScheduler {
    fn drop(&mut self) {
        for (_, task) in self.tasks.drain() {
            task.abort();
        }
    }
}
