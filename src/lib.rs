//! Concurrent load harness for single-winner ("golden seat") contention.
//!
//! One login provisions a shared bearer token, then a fixed population of
//! virtual clients races for the seat until the run duration elapses. Every
//! response is classified and the resulting log is reduced into a report that
//! says whether the target ever granted more seats than it has.

pub mod attack;
pub mod classifier;
pub mod client;
pub mod config;
pub mod domain;
pub mod error;
pub mod provision;
pub mod report;
pub mod telemetry;

use std::sync::Arc;
use tokio_util::sync::CancellationToken;
use validator::Validate;

use attack::{AttackPlan, LoadScheduler};
use client::SeatApi;
use config::Config;
use error::HarnessError;
use report::Report;

/// Validate the configuration, provision a credential, run the attack and
/// summarize it.
///
/// Only configuration and provisioning failures surface as errors; a run in
/// which every request failed still yields a report.
pub async fn run_harness<A>(
    api: Arc<A>,
    cfg: &Config,
    shutdown: CancellationToken,
) -> Result<Report, HarnessError>
where
    A: SeatApi + ?Sized + 'static,
{
    cfg.validate()?;
    let credential = provision::provision(&*api, &cfg.login).await?;

    let scheduler = LoadScheduler::new(api, AttackPlan::from_config(cfg));
    let run = scheduler.run_until(credential, shutdown).await;

    Ok(Report::from_run(&run, cfg.load.seat_capacity))
}
