//! Aggregation of the outcome log into the final verdict.

use anyhow::{Context, Result};
use chrono::{DateTime, Utc};
use serde::Serialize;
use std::collections::BTreeMap;
use std::fmt;
use std::path::Path;
use std::time::Duration;
use uuid::Uuid;

use crate::attack::CompletedRun;
use crate::config::ReportFormat;
use crate::domain::{Outcome, OutcomeRecord, VirtualUserId};

/// Final summary of an attack run.
#[derive(Debug, Clone, Serialize)]
pub struct Report {
    pub total_requests: u64,
    pub won: u64,
    pub rejected_expected: u64,
    pub rejected_unexpected: u64,
    /// Seats the target may legitimately grant (1 for a single golden seat)
    pub seat_capacity: u64,
    /// `won <= seat_capacity`
    pub exclusivity_held: bool,
    /// Virtual users that were granted a seat, in order of appearance
    pub winners: Vec<VirtualUserId>,
    /// Histogram by HTTP status; 0 counts transport failures
    pub status_counts: BTreeMap<u16, u64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub latency: Option<LatencySummary>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub run: Option<RunInfo>,
}

#[derive(Debug, Clone, Serialize)]
pub struct RunInfo {
    pub run_id: Uuid,
    pub started_at: DateTime<Utc>,
    pub elapsed_ms: u64,
    pub virtual_users: usize,
    pub requests_per_second: f64,
    pub interrupted: bool,
}

/// Latency distribution in milliseconds (nearest-rank percentiles)
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct LatencySummary {
    pub min_ms: f64,
    pub mean_ms: f64,
    pub p50_ms: f64,
    pub p95_ms: f64,
    pub p99_ms: f64,
    pub max_ms: f64,
}

impl LatencySummary {
    pub fn from_latencies(latencies: &[Duration]) -> Option<Self> {
        if latencies.is_empty() {
            return None;
        }
        let mut sorted = latencies.to_vec();
        sorted.sort_unstable();

        let ms = |d: Duration| d.as_secs_f64() * 1_000.0;
        let total: Duration = sorted.iter().sum();
        let percentile = |p: f64| {
            let rank = ((p / 100.0) * sorted.len() as f64).ceil() as usize;
            ms(sorted[rank.clamp(1, sorted.len()) - 1])
        };

        Some(Self {
            min_ms: ms(sorted[0]),
            mean_ms: ms(total) / sorted.len() as f64,
            p50_ms: percentile(50.0),
            p95_ms: percentile(95.0),
            p99_ms: percentile(99.0),
            max_ms: ms(sorted[sorted.len() - 1]),
        })
    }
}

/// Reduce the outcome log into per-outcome counts and the exclusivity verdict.
pub fn summarize(records: &[OutcomeRecord], seat_capacity: u64) -> Report {
    let mut won = 0u64;
    let mut rejected_expected = 0u64;
    let mut rejected_unexpected = 0u64;
    let mut winners = Vec::new();
    let mut status_counts = BTreeMap::new();

    for record in records {
        match record.outcome {
            Outcome::Won => {
                won += 1;
                winners.push(record.virtual_user);
            }
            Outcome::RejectedExpected => rejected_expected += 1,
            Outcome::RejectedUnexpected => rejected_unexpected += 1,
        }
        *status_counts.entry(record.status).or_insert(0u64) += 1;
    }

    let latencies: Vec<Duration> = records.iter().map(|r| r.latency).collect();

    Report {
        total_requests: records.len() as u64,
        won,
        rejected_expected,
        rejected_unexpected,
        seat_capacity,
        exclusivity_held: won <= seat_capacity,
        winners,
        status_counts,
        latency: LatencySummary::from_latencies(&latencies),
        run: None,
    }
}

impl Report {
    /// Summarize a finished run, including timing metadata.
    pub fn from_run(run: &CompletedRun, seat_capacity: u64) -> Self {
        let records = run.log.snapshot();
        let mut report = summarize(&records, seat_capacity);

        let secs = run.elapsed.as_secs_f64();
        report.run = Some(RunInfo {
            run_id: Uuid::new_v4(),
            started_at: run.started_at,
            elapsed_ms: u64::try_from(run.elapsed.as_millis()).unwrap_or(u64::MAX),
            virtual_users: run.clients.len(),
            requests_per_second: if secs > 0.0 {
                report.total_requests as f64 / secs
            } else {
                0.0
            },
            interrupted: run.interrupted,
        });
        report
    }

    pub fn render(&self, format: ReportFormat) -> Result<String> {
        match format {
            ReportFormat::Text => Ok(self.to_string()),
            ReportFormat::Json => self.to_json(),
        }
    }

    pub fn to_json(&self) -> Result<String> {
        serde_json::to_string_pretty(self).context("failed to serialize report")
    }

    pub async fn write_json(&self, path: &Path) -> Result<()> {
        if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
            tokio::fs::create_dir_all(parent)
                .await
                .with_context(|| format!("failed to create {}", parent.display()))?;
        }
        tokio::fs::write(path, self.to_json()?)
            .await
            .with_context(|| format!("failed to write report to {}", path.display()))
    }
}

impl fmt::Display for Report {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(f, "golden seat attack report")?;
        if let Some(run) = &self.run {
            writeln!(f, "  run id                {}", run.run_id)?;
            writeln!(f, "  started at            {}", run.started_at.to_rfc3339())?;
            writeln!(
                f,
                "  elapsed               {:.2}s ({} virtual users, {:.1} req/s){}",
                run.elapsed_ms as f64 / 1_000.0,
                run.virtual_users,
                run.requests_per_second,
                if run.interrupted { ", interrupted" } else { "" }
            )?;
        }
        writeln!(f, "  requests              {}", self.total_requests)?;
        writeln!(f, "  won                   {}", self.won)?;
        writeln!(f, "  rejected (expected)   {}", self.rejected_expected)?;
        writeln!(f, "  rejected (unexpected) {}", self.rejected_unexpected)?;

        let statuses = self
            .status_counts
            .iter()
            .map(|(status, n)| match status {
                0 => format!("transport={n}"),
                s => format!("{s}={n}"),
            })
            .collect::<Vec<_>>()
            .join(" ");
        writeln!(f, "  statuses              {statuses}")?;

        if let Some(l) = &self.latency {
            writeln!(
                f,
                "  latency ms            min={:.1} mean={:.1} p50={:.1} p95={:.1} p99={:.1} max={:.1}",
                l.min_ms, l.mean_ms, l.p50_ms, l.p95_ms, l.p99_ms, l.max_ms
            )?;
        }

        if !self.winners.is_empty() {
            let winners = self
                .winners
                .iter()
                .map(|vu| format!("#{vu}"))
                .collect::<Vec<_>>()
                .join(", ");
            writeln!(f, "  winners               {winners}")?;
        }

        let verdict = if self.exclusivity_held { "HELD" } else { "VIOLATED" };
        writeln!(
            f,
            "  exclusivity           {verdict} ({} won, capacity {})",
            self.won, self.seat_capacity
        )?;

        if self.rejected_unexpected > 0 {
            write!(
                f,
                "  WARNING: {} unexpected responses, the target misbehaved beyond normal contention",
                self.rejected_unexpected
            )?;
        }
        Ok(())
    }
}
