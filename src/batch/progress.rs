//! Progress notifications
//!
//! One update is emitted per settled window. Sending goes through an unbounded
//! channel so a slow or departed consumer can never stall a job.

use serde::Serialize;
use tokio::sync::mpsc;
use tracing::trace;

#[derive(Debug, Clone, Copy, Serialize, PartialEq, Eq)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum Phase {
    Generate,
    Apply,
}

#[derive(Debug, Clone, Serialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct ProgressUpdate {
    pub phase: Phase,
    pub processed_count: usize,
    pub total_count: usize,
    pub current_label: String,
}

/// Fire-and-forget progress sender
#[derive(Debug, Clone, Default)]
pub struct ProgressReporter {
    tx: Option<mpsc::UnboundedSender<ProgressUpdate>>,
}

impl ProgressReporter {
    /// Reporter plus the receiving end for a renderer
    pub fn channel() -> (Self, mpsc::UnboundedReceiver<ProgressUpdate>) {
        let (tx, rx) = mpsc::unbounded_channel();
        (Self { tx: Some(tx) }, rx)
    }

    pub fn disabled() -> Self {
        Self::default()
    }

    pub fn emit(&self, update: ProgressUpdate) {
        if let Some(tx) = &self.tx {
            if tx.send(update).is_err() {
                trace!("Progress receiver dropped; update discarded");
            }
        }
    }
}
