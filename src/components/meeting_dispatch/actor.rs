use super::cycle::DispatchCycle;
use crate::error::{component_error, BotResult};
use std::time::Duration;
use tokio::sync::mpsc;
use tokio::time::timeout;
use tracing::{error, info, warn};

/// The dispatch actor that processes messages. Commands are handled one at
/// a time off the mailbox, which is what guarantees that two cycles never
/// overlap, whatever mix of scheduler ticks and manual triggers arrives.
pub struct DispatchActor {
    cycle: DispatchCycle,
    cycle_deadline: Duration,
    command_rx: mpsc::Receiver<DispatchCommand>,
}

/// Commands that can be sent to the dispatch actor
pub enum DispatchCommand {
    /// Run one cycle now; replies with overall success
    RunCycle(mpsc::Sender<bool>),
    Shutdown,
}

/// Handle for communicating with the dispatch actor
#[derive(Clone)]
pub struct DispatchActorHandle {
    command_tx: mpsc::Sender<DispatchCommand>,
}

impl DispatchActorHandle {
    /// Run one dispatch cycle and wait for its outcome
    pub async fn run_cycle(&self) -> BotResult<bool> {
        let (response_tx, mut response_rx) = mpsc::channel(1);
        self.command_tx
            .send(DispatchCommand::RunCycle(response_tx))
            .await
            .map_err(|e| component_error(&format!("Actor mailbox error: {}", e)))?;

        response_rx
            .recv()
            .await
            .ok_or_else(|| component_error("Response channel closed"))
    }

    /// Shutdown the actor
    pub async fn shutdown(&self) -> BotResult<()> {
        let _ = self.command_tx.send(DispatchCommand::Shutdown).await;
        Ok(())
    }
}

impl DispatchActor {
    /// Create a new actor and return its handle
    pub fn new(cycle: DispatchCycle, cycle_deadline: Duration) -> (Self, DispatchActorHandle) {
        let (command_tx, command_rx) = mpsc::channel(32);

        let actor = Self {
            cycle,
            cycle_deadline,
            command_rx,
        };

        let handle = DispatchActorHandle { command_tx };

        (actor, handle)
    }

    /// Start the actor's processing loop
    pub async fn run(&mut self) {
        info!("Dispatch actor started");

        while let Some(cmd) = self.command_rx.recv().await {
            match cmd {
                DispatchCommand::RunCycle(response_tx) => {
                    let success = self.run_one_cycle().await;
                    let _ = response_tx.send(success).await;
                }
                DispatchCommand::Shutdown => {
                    info!("Dispatch actor shutting down");
                    break;
                }
            }
        }

        info!("Dispatch actor shut down");
    }

    /// Run one cycle under the deadline. A timed-out cycle is abandoned and
    /// reported as failed; writes that already committed stay committed.
    async fn run_one_cycle(&self) -> bool {
        match timeout(self.cycle_deadline, self.cycle.run()).await {
            Ok(Ok(())) => {
                info!("Dispatch cycle completed");
                true
            }
            Ok(Err(e)) => {
                error!("Dispatch cycle failed: {}", e);
                false
            }
            Err(_) => {
                warn!(
                    deadline_secs = self.cycle_deadline.as_secs(),
                    "Dispatch cycle exceeded its deadline and was abandoned"
                );
                false
            }
        }
    }
}
