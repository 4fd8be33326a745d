use std::time::Duration;

use common::utils::config::AppConfig;

/// Knobs for a batch run. The progress values are part of the user facing
/// contract of the upload view.
#[derive(Debug, Clone)]
pub struct IngestionTuning {
    /// Share of the progress bar covered by enrichment, in percent.
    pub enrichment_progress_share: f64,
    /// Progress shown while the batch is being written.
    pub persistence_progress: f64,
    /// Upper bound for a single extraction or inference call.
    pub collaborator_timeout: Duration,
}

impl Default for IngestionTuning {
    fn default() -> Self {
        Self {
            enrichment_progress_share: 90.0,
            persistence_progress: 95.0,
            collaborator_timeout: Duration::from_secs(120),
        }
    }
}

impl IngestionTuning {
    /// Percentage reached once comment `index` (0-based) of `total` is done.
    pub fn enrichment_progress(&self, index: usize, total: usize) -> f64 {
        if total == 0 {
            return self.enrichment_progress_share;
        }
        (index.saturating_add(1)) as f64 / total as f64 * self.enrichment_progress_share
    }
}

#[derive(Debug, Clone, Default)]
pub struct IngestionConfig {
    pub tuning: IngestionTuning,
}

impl IngestionConfig {
    pub fn from_app_config(config: &AppConfig) -> Self {
        Self {
            tuning: IngestionTuning {
                collaborator_timeout: Duration::from_secs(config.collaborator_timeout_secs),
                ..IngestionTuning::default()
            },
        }
    }
}
