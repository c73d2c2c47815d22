//! Command orchestration helpers from UI actions to backend command queue.

use crossbeam_channel::{Sender, TrySendError};

use crate::backend_bridge::commands::BackendCommand;

pub fn dispatch_backend_command(
    cmd_tx: &Sender<BackendCommand>,
    cmd: BackendCommand,
    status: &mut String,
) {
    let cmd_name = match &cmd {
        BackendCommand::Connect { .. } => "connect",
        BackendCommand::Disconnect => "disconnect",
        BackendCommand::Refresh => "refresh",
        BackendCommand::CreateProposal { .. } => "create_proposal",
        BackendCommand::Vote { .. } => "vote",
        BackendCommand::Pause { .. } => "pause_proposal",
        BackendCommand::Unpause { .. } => "unpause_proposal",
        BackendCommand::Delete { .. } => "delete_proposal",
    };

    match cmd_tx.try_send(cmd) {
        Ok(()) => tracing::debug!(command = cmd_name, "queued ui->backend command"),
        Err(TrySendError::Full(_)) => {
            *status = "UI command queue is full; please retry".to_string();
        }
        Err(TrySendError::Disconnected(_)) => {
            *status =
                "Backend command processor disconnected (possible startup/runtime failure); retry connect"
                    .to_string();
        }
    }
}
