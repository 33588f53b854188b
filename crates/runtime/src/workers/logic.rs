//! Worker task that owns the turn logic.
//!
//! Hooks run here one at a time, on request of the session controller. Each
//! command carries a reply channel, so the controller knows when control has
//! been handed back.

use tokio::sync::{mpsc, oneshot};
use tracing::debug;

use crate::api::{GameOutcome, Result, TurnContext, TurnLogic};

/// Commands the controller sends to the logic worker
pub enum LogicCommand {
    Start { reply: oneshot::Sender<()> },
    Updated { reply: oneshot::Sender<()> },
    RunTurn { reply: oneshot::Sender<Result<bool>> },
    End {
        outcome: GameOutcome,
        reply: oneshot::Sender<()>,
    },
}

impl LogicCommand {
    fn name(&self) -> &'static str {
        match self {
            LogicCommand::Start { .. } => "Start",
            LogicCommand::Updated { .. } => "Updated",
            LogicCommand::RunTurn { .. } => "RunTurn",
            LogicCommand::End { .. } => "End",
        }
    }
}

pub struct LogicWorker {
    logic: Box<dyn TurnLogic>,
    ctx: TurnContext,
    command_rx: mpsc::Receiver<LogicCommand>,
}

impl LogicWorker {
    pub fn new(
        logic: Box<dyn TurnLogic>,
        ctx: TurnContext,
        command_rx: mpsc::Receiver<LogicCommand>,
    ) -> Self {
        Self {
            logic,
            ctx,
            command_rx,
        }
    }

    /// Main worker loop. Returns after `End`, or once the controller is gone.
    pub async fn run(mut self) {
        while let Some(cmd) = self.command_rx.recv().await {
            let name = cmd.name();
            let ended = matches!(cmd, LogicCommand::End { .. });
            let delivered = match cmd {
                LogicCommand::Start { reply } => {
                    self.logic.start(&self.ctx);
                    reply.send(()).is_ok()
                }
                LogicCommand::Updated { reply } => {
                    self.logic.game_updated(&self.ctx);
                    reply.send(()).is_ok()
                }
                LogicCommand::RunTurn { reply } => {
                    let result = self.logic.run_turn(&self.ctx).await;
                    reply.send(result).is_ok()
                }
                LogicCommand::End { outcome, reply } => {
                    self.logic.end(&outcome);
                    reply.send(()).is_ok()
                }
            };
            if !delivered {
                debug!("{name} reply channel closed (controller dropped)");
            }
            if ended {
                break;
            }
        }
        debug!("logic worker stopped");
    }
}
