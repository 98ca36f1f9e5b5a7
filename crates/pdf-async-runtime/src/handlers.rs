use crate::PdfUpdate;
use pdf_sort::{CancelToken, SortError, SortOptions, SortRequest};
use std::path::PathBuf;
use tokio::sync::mpsc;

pub async fn handle_load_config(path: PathBuf, update_tx: &mpsc::UnboundedSender<PdfUpdate>) {
    match SortOptions::load(&path).await {
        Ok(options) => {
            let _ = update_tx.send(PdfUpdate::SortConfigLoaded { options });
        }
        Err(e) => {
            let _ = update_tx.send(PdfUpdate::Error {
                message: format!("Failed to load config {}: {e}", path.display()),
            });
        }
    }
}

pub async fn handle_load_replacements(
    path: PathBuf,
    update_tx: &mpsc::UnboundedSender<PdfUpdate>,
) {
    match pdf_sort::read_replacements(&path).await {
        Ok(values) => {
            let _ = update_tx.send(PdfUpdate::SortReplacementsLoaded { path, values });
        }
        Err(e) => {
            let _ = update_tx.send(PdfUpdate::Error {
                message: e.to_string(),
            });
        }
    }
}

pub async fn handle_plan(
    input_path: PathBuf,
    options: SortOptions,
    update_tx: &mpsc::UnboundedSender<PdfUpdate>,
) {
    match pdf_sort::plan_file(&input_path, &options).await {
        Ok(documents) => {
            let _ = update_tx.send(PdfUpdate::SortPlanned {
                input_path,
                documents,
            });
        }
        Err(e) => {
            let _ = update_tx.send(PdfUpdate::Error {
                message: format!("Failed to plan {}: {e}", input_path.display()),
            });
        }
    }
}

pub async fn handle_run(
    request: SortRequest,
    cancel: CancelToken,
    update_tx: &mpsc::UnboundedSender<PdfUpdate>,
) {
    let progress_tx = update_tx.clone();
    let on_progress = move |progress: pdf_sort::Progress| {
        let _ = progress_tx.send(PdfUpdate::Progress {
            operation: progress.phase.label().to_string(),
            current: progress.completed,
            total: progress.total,
        });
    };

    match pdf_sort::sort_file(&request, on_progress, cancel).await {
        Ok(summary) => {
            let _ = update_tx.send(PdfUpdate::SortComplete { summary });
        }
        Err(SortError::Cancelled) => {
            log::info!("Sort of {} cancelled", request.input_path.display());
            let _ = update_tx.send(PdfUpdate::SortCancelled);
        }
        Err(e) => {
            let _ = update_tx.send(PdfUpdate::Error {
                message: format!("Failed to sort {}: {e}", request.input_path.display()),
            });
        }
    }
}
