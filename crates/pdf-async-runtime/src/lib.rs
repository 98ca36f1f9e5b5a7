use std::path::PathBuf;

mod handlers;
mod worker;

pub use worker::worker_task;

// Re-export types from library crates
pub use pdf_sort::{CancelToken, DocumentDescriptor, SortOptions, SortRequest, SortSummary};

/// Commands sent from a front end to the worker
#[derive(Debug)]
pub enum PdfCommand {
    SortLoadConfig {
        path: PathBuf,
    },
    SortLoadReplacements {
        path: PathBuf,
    },
    /// Compute the output order without writing anything
    SortPlan {
        input_path: PathBuf,
        options: SortOptions,
    },
    SortRun {
        request: SortRequest,
        cancel: CancelToken,
    },
}

/// Updates sent from the worker to a front end
#[derive(Debug, Clone)]
pub enum PdfUpdate {
    Progress {
        operation: String,
        current: usize,
        total: usize,
    },
    SortConfigLoaded {
        options: SortOptions,
    },
    SortReplacementsLoaded {
        path: PathBuf,
        values: Vec<String>,
    },
    SortPlanned {
        input_path: PathBuf,
        documents: Vec<DocumentDescriptor>,
    },
    SortComplete {
        summary: SortSummary,
    },
    SortCancelled,
    Error {
        message: String,
    },
}

impl PdfUpdate {
    /// Whether this update ends the command that produced it
    pub fn is_final(&self) -> bool {
        !matches!(self, PdfUpdate::Progress { .. })
    }
}
