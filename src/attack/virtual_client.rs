use std::sync::Arc;
use tokio::sync::Barrier;
use tokio::time::{sleep, Instant};
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};

use super::AttackPlan;
use crate::classifier::classify;
use crate::client::SeatApi;
use crate::domain::{
    AttackRequest, AttackResponse, Credential, Outcome, OutcomeLog, OutcomeRecord, VirtualUserId,
};

/// What a virtual client did over its lifetime
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ClientSummary {
    pub virtual_user: VirtualUserId,
    pub iterations: u64,
}

/// One simulated user hammering the contention endpoint.
pub struct VirtualClient<A: SeatApi + ?Sized> {
    id: VirtualUserId,
    api: Arc<A>,
    credential: Credential,
    plan: Arc<AttackPlan>,
    log: Arc<OutcomeLog>,
}

impl<A: SeatApi + ?Sized> VirtualClient<A> {
    pub fn new(
        id: VirtualUserId,
        api: Arc<A>,
        credential: Credential,
        plan: Arc<AttackPlan>,
        log: Arc<OutcomeLog>,
    ) -> Self {
        Self {
            id,
            api,
            credential,
            plan,
            log,
        }
    }

    /// Run until `cancel` fires or the iteration cap is reached.
    ///
    /// Cancellation is only observed between iterations and during the pacing
    /// delay, never while a request is in flight.
    pub async fn run(self, start: Arc<Barrier>, cancel: CancellationToken) -> ClientSummary {
        tokio::select! {
            biased;
            _ = cancel.cancelled() => return self.summary(0),
            _ = start.wait() => {}
        }

        let mut iterations = 0u64;
        loop {
            if cancel.is_cancelled() || self.reached_cap(iterations) {
                break;
            }

            self.attack_once().await;
            iterations += 1;

            if self.reached_cap(iterations) {
                break;
            }
            if self.plan.pacing_delay.is_zero() {
                tokio::task::yield_now().await;
                continue;
            }
            tokio::select! {
                biased;
                _ = cancel.cancelled() => break,
                _ = sleep(self.plan.pacing_delay) => {}
            }
        }

        debug!(iterations, "virtual client finished");
        self.summary(iterations)
    }

    fn reached_cap(&self, iterations: u64) -> bool {
        self.plan
            .max_iterations
            .is_some_and(|max| iterations >= max)
    }

    fn summary(&self, iterations: u64) -> ClientSummary {
        ClientSummary {
            virtual_user: self.id,
            iterations,
        }
    }

    /// Build, send, classify and record a single request.
    pub async fn attack_once(&self) -> Outcome {
        let request = AttackRequest::new(
            self.plan.resource_id.as_str(),
            self.id,
            &self.plan.content_template,
            self.credential.clone(),
        );

        let started = Instant::now();
        let (response, transport_error) = match self.api.claim_seat(&request).await {
            Ok(response) => (response, None),
            Err(e) => {
                warn!(error = %e, "transport failure");
                (AttackResponse::transport_failure(), Some(e.to_string()))
            }
        };
        let latency = started.elapsed();

        let outcome = classify(&response);
        match outcome {
            Outcome::Won => info!(status = response.status, ?latency, "golden seat won"),
            Outcome::RejectedExpected => debug!(
                status = response.status,
                server_message = response.error_message().unwrap_or_default(),
                "claim rejected"
            ),
            Outcome::RejectedUnexpected => warn!(
                status = response.status,
                server_message = response.error_message().unwrap_or_default(),
                "unexpected response"
            ),
        }

        let message = transport_error.or_else(|| response.error_message().map(str::to_owned));
        self.log.record(OutcomeRecord {
            virtual_user: self.id,
            outcome,
            status: response.status,
            latency,
            message,
        });
        outcome
    }
}
