use super::actor::{DispatchActor, DispatchActorHandle};
use super::cycle::DispatchCycle;
use crate::error::BotResult;
use std::sync::Arc;
use std::time::Duration;
use tokio::task::JoinHandle;

/// Handle for interacting with the dispatch actor. This is the trigger
/// surface: the scheduler and the HTTP API both run cycles through it, and
/// the actor behind it serializes them.
#[derive(Clone)]
pub struct DispatchHandle {
    actor_handle: DispatchActorHandle,
    _actor_task: Arc<JoinHandle<()>>,
}

impl DispatchHandle {
    /// Create a new DispatchHandle and spawn the actor
    pub fn new(cycle: DispatchCycle, cycle_deadline: Duration) -> Self {
        let (mut actor, handle) = DispatchActor::new(cycle, cycle_deadline);

        let actor_task = tokio::spawn(async move {
            actor.run().await;
        });

        Self {
            actor_handle: handle,
            _actor_task: Arc::new(actor_task),
        }
    }

    /// Run one dispatch cycle now; returns overall success. Safe to call
    /// concurrently, cycles are queued behind one another.
    pub async fn run_cycle_now(&self) -> BotResult<bool> {
        self.actor_handle.run_cycle().await
    }

    /// Shutdown the actor
    pub async fn shutdown(&self) -> BotResult<()> {
        self.actor_handle.shutdown().await
    }
}
