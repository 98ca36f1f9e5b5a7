use crate::{PdfCommand, PdfUpdate, handlers};
use tokio::sync::mpsc;

/// Async worker task that processes PDF commands and sends updates
pub async fn worker_task(
    mut command_rx: mpsc::UnboundedReceiver<PdfCommand>,
    update_tx: mpsc::UnboundedSender<PdfUpdate>,
) {
    while let Some(cmd) = command_rx.recv().await {
        process_command(cmd, &mut command_rx, &update_tx).await;
    }
    log::debug!("Command channel closed, worker exiting");
}

async fn process_command(
    cmd: PdfCommand,
    command_rx: &mut mpsc::UnboundedReceiver<PdfCommand>,
    update_tx: &mpsc::UnboundedSender<PdfUpdate>,
) {
    match cmd {
        PdfCommand::SortLoadConfig { path } => {
            handlers::handle_load_config(path, update_tx).await;
        }
        PdfCommand::SortLoadReplacements { path } => {
            handlers::handle_load_replacements(path, update_tx).await;
        }
        PdfCommand::SortPlan {
            mut input_path,
            mut options,
        } => {
            // Drain any queued plan commands, keeping only the most recent
            while let Ok(next_cmd) = command_rx.try_recv() {
                if let PdfCommand::SortPlan {
                    input_path: new_path,
                    options: new_options,
                } = next_cmd
                {
                    log::debug!("Discarding queued plan, using newer request");
                    input_path = new_path;
                    options = new_options;
                } else {
                    // Since we can't put it back, process it now before the plan
                    Box::pin(process_command(next_cmd, command_rx, update_tx)).await;
                }
            }

            handlers::handle_plan(input_path, options, update_tx).await;
        }
        PdfCommand::SortRun { request, cancel } => {
            handlers::handle_run(request, cancel, update_tx).await;
        }
    }
}
