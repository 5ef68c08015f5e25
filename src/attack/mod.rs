pub mod scheduler;
pub mod virtual_client;

pub use scheduler::*;
pub use virtual_client::*;

use std::time::Duration;

use crate::config::Config;

/// Immutable description of the load each virtual client applies.
#[derive(Debug, Clone)]
pub struct AttackPlan {
    pub resource_id: String,
    pub concurrency: u32,
    pub duration: Duration,
    pub pacing_delay: Duration,
    pub max_iterations: Option<u64>,
    pub content_template: String,
}

impl AttackPlan {
    pub fn from_config(cfg: &Config) -> Self {
        Self {
            resource_id: cfg.target.resource_id.clone(),
            concurrency: cfg.load.concurrency,
            duration: cfg.load.duration,
            pacing_delay: cfg.load.pacing_delay,
            max_iterations: cfg.load.max_iterations,
            content_template: cfg.load.content_template.clone(),
        }
    }

    /// Upper bound on log entries when every client is capped, for pre-sizing.
    pub fn expected_requests(&self) -> Option<usize> {
        let per_client = self.max_iterations?;
        let total = per_client.saturating_mul(u64::from(self.concurrency));
        usize::try_from(total).ok()
    }
}
