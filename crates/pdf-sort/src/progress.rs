//! Progress reporting and cancellation for a sort run

use crate::types::{Result, SortError};
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};

/// Stage of a sort run
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Phase {
    /// Reading first pages and extracting keys
    Scanning,
    /// Copying pages and substituting placeholders
    Rebuilding,
}

impl Phase {
    pub fn label(self) -> &'static str {
        match self {
            Phase::Scanning => "Scanning documents",
            Phase::Rebuilding => "Building sorted PDF",
        }
    }
}

/// Cumulative progress: one unit per document per phase
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Progress {
    pub phase: Phase,
    pub completed: usize,
    pub total: usize,
}

impl Progress {
    /// Completed share of the run in `0.0..=1.0`
    pub fn fraction(&self) -> f32 {
        if self.total == 0 {
            1.0
        } else {
            self.completed as f32 / self.total as f32
        }
    }
}

/// Counts completed units and forwards each step to a callback
pub(crate) struct ProgressTracker<'a> {
    callback: &'a mut dyn FnMut(Progress),
    completed: usize,
    total: usize,
}

impl<'a> ProgressTracker<'a> {
    pub(crate) fn new(callback: &'a mut dyn FnMut(Progress), total: usize) -> Self {
        Self {
            callback,
            completed: 0,
            total,
        }
    }

    pub(crate) fn advance(&mut self, phase: Phase) {
        self.completed = (self.completed + 1).min(self.total);
        (self.callback)(Progress {
            phase,
            completed: self.completed,
            total: self.total,
        });
    }
}

/// Cooperative cancellation flag, checked between documents
#[derive(Debug, Clone, Default)]
pub struct CancelToken {
    cancelled: Arc<AtomicBool>,
}

impl CancelToken {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn cancel(&self) {
        self.cancelled.store(true, Ordering::SeqCst);
    }

    pub fn is_cancelled(&self) -> bool {
        self.cancelled.load(Ordering::SeqCst)
    }

    pub(crate) fn check(&self) -> Result<()> {
        if self.is_cancelled() {
            Err(SortError::Cancelled)
        } else {
            Ok(())
        }
    }
}
