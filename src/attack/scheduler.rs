use chrono::{DateTime, Utc};
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::Barrier;
use tokio::task::JoinSet;
use tokio::time::{sleep, Instant};
use tokio_util::sync::CancellationToken;
use tracing::{error, info, info_span, warn, Instrument};

use super::{AttackPlan, ClientSummary, VirtualClient};
use crate::client::SeatApi;
use crate::domain::{Credential, OutcomeLog, VirtualUserId};

/// Everything the scheduler hands back once every client has stopped.
#[derive(Debug)]
pub struct CompletedRun {
    pub log: OutcomeLog,
    pub clients: Vec<ClientSummary>,
    pub started_at: DateTime<Utc>,
    pub elapsed: Duration,
    /// True when the run was stopped by an external signal rather than by
    /// the duration cutoff or the iteration cap
    pub interrupted: bool,
}

impl CompletedRun {
    pub fn total_iterations(&self) -> u64 {
        self.clients.iter().map(|c| c.iterations).sum()
    }
}

/// Keeps `concurrency` virtual clients running for the configured duration.
pub struct LoadScheduler<A: SeatApi + ?Sized + 'static> {
    api: Arc<A>,
    plan: Arc<AttackPlan>,
}

impl<A: SeatApi + ?Sized + 'static> LoadScheduler<A> {
    pub fn new(api: Arc<A>, plan: AttackPlan) -> Self {
        Self {
            api,
            plan: Arc::new(plan),
        }
    }

    /// Run for the configured duration.
    pub async fn run(&self, credential: Credential) -> CompletedRun {
        self.run_until(credential, CancellationToken::new()).await
    }

    /// Run for the configured duration, or until `shutdown` is cancelled,
    /// whichever comes first.
    ///
    /// Clients stop cooperatively: in-flight requests always complete and are
    /// recorded, no request is started after the cutoff.
    pub async fn run_until(&self, credential: Credential, shutdown: CancellationToken) -> CompletedRun {
        let concurrency = self.plan.concurrency.max(1);
        let cancel = shutdown.child_token();
        let log = Arc::new(
            self.plan
                .expected_requests()
                .map(|n| OutcomeLog::with_capacity(n.min(1 << 20)))
                .unwrap_or_default(),
        );
        let start_gate = Arc::new(Barrier::new(concurrency as usize));

        let started_at = Utc::now();
        let clock = Instant::now();

        let mut clients = JoinSet::new();
        for id in 1..=concurrency {
            let client = VirtualClient::new(
                VirtualUserId(id),
                Arc::clone(&self.api),
                credential.clone(),
                Arc::clone(&self.plan),
                Arc::clone(&log),
            );
            let span = info_span!("virtual_client", vu = id);
            clients.spawn(
                client
                    .run(Arc::clone(&start_gate), cancel.clone())
                    .instrument(span),
            );
        }
        info!(
            concurrency,
            duration = ?self.plan.duration,
            pacing = ?self.plan.pacing_delay,
            resource = %self.plan.resource_id,
            "attack started"
        );

        let cutoff = sleep(self.plan.duration);
        tokio::pin!(cutoff);

        let mut summaries = Vec::with_capacity(concurrency as usize);
        loop {
            tokio::select! {
                _ = &mut cutoff, if !cancel.is_cancelled() => {
                    info!("duration elapsed, stopping virtual clients");
                    cancel.cancel();
                }
                joined = clients.join_next() => match joined {
                    Some(Ok(summary)) => summaries.push(summary),
                    Some(Err(e)) => error!(error = %e, "virtual client task failed"),
                    None => break,
                },
            }
        }
        // every client is done; release the cutoff for anything still listening
        cancel.cancel();

        let interrupted = shutdown.is_cancelled();
        if interrupted {
            warn!("attack interrupted before the configured duration elapsed");
        }

        let elapsed = clock.elapsed();
        let log = Arc::try_unwrap(log).unwrap_or_else(|shared| shared.snapshot().into_iter().collect());
        summaries.sort_by_key(|s| s.virtual_user);

        info!(
            requests = log.len(),
            clients = summaries.len(),
            elapsed = ?elapsed,
            "attack finished"
        );

        CompletedRun {
            log,
            clients: summaries,
            started_at,
            elapsed,
            interrupted,
        }
    }
}
