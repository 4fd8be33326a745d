use serde::Serialize;
use tokio::sync::mpsc;
use tracing::trace;

pub const PROCESSING_WITH_AI_LABEL: &str = "Processing with AI...";
pub const SAVING_LABEL: &str = "Saving to database...";

/// Externally visible phase of a batch run.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum BatchPhase {
    Extracting,
    Enriching,
    Persisting,
    Done,
    Failed,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct BatchProgress {
    pub state: BatchPhase,
    pub percent: f64,
    pub current_label: String,
}

/// Sends progress updates to whoever submitted the batch.
///
/// A reporter without a receiver, or whose receiver went away, silently
/// drops updates; the batch keeps running either way.
#[derive(Debug, Clone, Default)]
pub struct ProgressReporter {
    sender: Option<mpsc::Sender<BatchProgress>>,
}

impl ProgressReporter {
    pub fn new(sender: mpsc::Sender<BatchProgress>) -> Self {
        Self {
            sender: Some(sender),
        }
    }

    pub fn disabled() -> Self {
        Self::default()
    }

    pub async fn report(&self, state: BatchPhase, percent: f64, current_label: impl Into<String>) {
        let update = BatchProgress {
            state,
            percent: percent.clamp(0.0, 100.0),
            current_label: current_label.into(),
        };
        trace!(state = ?update.state, percent = update.percent, label = %update.current_label, "batch progress");

        if let Some(sender) = &self.sender {
            // A closed channel means the client disconnected
            let _ = sender.send(update).await;
        }
    }
}
