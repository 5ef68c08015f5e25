use anyhow::{Context, Result};
use clap::Parser;
use golden_seat_harness::{
    client::HttpSeatApi,
    config::{Config, ConfigOverrides, LogFormat, ReportFormat},
    report::Report,
    run_harness, telemetry,
};
use std::path::PathBuf;
use std::process::ExitCode;
use std::sync::Arc;
use std::time::Duration;
use tokio_util::sync::CancellationToken;
use tracing::{error, info, warn};

const EXIT_OK: u8 = 0;
const EXIT_FATAL: u8 = 1;
const EXIT_VIOLATION: u8 = 2;

#[derive(Parser, Debug)]
#[command(name = "golden-seat-harness")]
#[command(about = "Race many virtual users for a golden seat and verify at most one wins", long_about = None)]
#[command(version)]
struct Cli {
    /// TOML configuration file (defaults to config/default.toml when present)
    #[arg(long, short)]
    config: Option<PathBuf>,

    /// Base URL of the video service
    #[arg(long)]
    base_url: Option<String>,

    /// Video id whose golden seat is attacked
    #[arg(long)]
    resource_id: Option<String>,

    /// Number of concurrent virtual users
    #[arg(long, short = 'n')]
    concurrency: Option<u32>,

    /// Run duration, e.g. 30s or 2m
    #[arg(long, short, value_parser = humantime::parse_duration)]
    duration: Option<Duration>,

    /// Pause between two requests of the same virtual user, e.g. 1s or 250ms
    #[arg(long, value_parser = humantime::parse_duration)]
    pacing_delay: Option<Duration>,

    /// Per-request timeout
    #[arg(long, value_parser = humantime::parse_duration)]
    request_timeout: Option<Duration>,

    /// Stop each virtual user after this many requests
    #[arg(long)]
    max_iterations: Option<u64>,

    /// Number of seats the target may grant
    #[arg(long)]
    seat_capacity: Option<u64>,

    /// Login user name
    #[arg(long, env = "SEAT_USERNAME")]
    username: Option<String>,

    /// Login password
    #[arg(long, env = "SEAT_PASSWORD", hide_env_values = true)]
    password: Option<String>,

    /// Report format printed to stdout
    #[arg(long, value_enum)]
    format: Option<ReportFormat>,

    /// Also write the JSON report to this file
    #[arg(long, short)]
    output: Option<PathBuf>,

    /// Exit with code 2 when more seats were won than exist
    #[arg(long)]
    fail_on_violation: bool,

    /// Log output format
    #[arg(long, value_enum)]
    log_format: Option<LogFormat>,

    /// Print the effective configuration and exit
    #[arg(long)]
    print_config: bool,
}

impl Cli {
    fn overrides(&self) -> ConfigOverrides {
        let mut o = ConfigOverrides::new();
        if let Some(v) = &self.base_url {
            o.set("target", "base_url", v.as_str());
        }
        if let Some(v) = &self.resource_id {
            o.set("target", "resource_id", v.as_str());
        }
        if let Some(v) = self.request_timeout {
            o.set_duration("target", "request_timeout", v);
        }
        if let Some(v) = self.concurrency {
            o.set("load", "concurrency", i64::from(v));
        }
        if let Some(v) = self.duration {
            o.set_duration("load", "duration", v);
        }
        if let Some(v) = self.pacing_delay {
            o.set_duration("load", "pacing_delay", v);
        }
        if let Some(v) = self.max_iterations {
            o.set("load", "max_iterations", i64::try_from(v).unwrap_or(i64::MAX));
        }
        if let Some(v) = self.seat_capacity {
            o.set("load", "seat_capacity", i64::try_from(v).unwrap_or(i64::MAX));
        }
        if let Some(v) = &self.username {
            o.set("login", "username", v.as_str());
        }
        if let Some(v) = &self.password {
            o.set("login", "password", v.as_str());
        }
        if let Some(v) = self.format {
            o.set("report", "format", v.to_string());
        }
        if let Some(v) = &self.output {
            o.set("report", "output", v.display().to_string());
        }
        if self.fail_on_violation {
            o.set("report", "fail_on_violation", true);
        }
        if let Some(v) = self.log_format {
            o.set("telemetry", "log_format", v.to_string());
        }
        o
    }
}

#[tokio::main]
async fn main() -> ExitCode {
    dotenvy::dotenv().ok();
    let cli = Cli::parse();

    let cfg = match Config::load(cli.config.as_deref(), &cli.overrides()) {
        Ok(cfg) => cfg,
        Err(e) => {
            eprintln!("configuration error: {e:#}");
            return ExitCode::from(EXIT_FATAL);
        }
    };

    if cli.print_config {
        return match cfg.to_redacted_toml() {
            Ok(rendered) => {
                print!("{rendered}");
                ExitCode::SUCCESS
            }
            Err(e) => {
                eprintln!("{e:#}");
                ExitCode::from(EXIT_FATAL)
            }
        };
    }

    telemetry::init_tracing(cfg.telemetry.log_format);

    match run(cfg).await {
        Ok(code) => ExitCode::from(code),
        Err(e) => {
            error!(error = %format!("{e:#}"), "attack aborted");
            eprintln!("error: {e:#}");
            ExitCode::from(EXIT_FATAL)
        }
    }
}

/// Run the attack and print the report. Errors are fatal (exit 1).
async fn run(cfg: Config) -> Result<u8> {
    let api = Arc::new(HttpSeatApi::new(&cfg.target).context("failed to build HTTP client")?);

    let shutdown = CancellationToken::new();
    telemetry::cancel_on_shutdown(shutdown.clone());

    info!(
        target_url = %cfg.target.base_url,
        resource = %cfg.target.resource_id,
        concurrency = cfg.load.concurrency,
        "starting golden seat attack"
    );
    let report = run_harness(api, &cfg, shutdown.clone()).await?;
    shutdown.cancel();

    println!("{}", report.render(cfg.report.format)?);
    if let Some(path) = &cfg.report.output {
        report.write_json(path).await?;
        info!(path = %path.display(), "report written");
    }

    Ok(exit_status(&report, &cfg))
}

/// Process exit status for a completed run.
fn exit_status(report: &Report, cfg: &Config) -> u8 {
    if report.exclusivity_held {
        return EXIT_OK;
    }
    warn!(
        won = report.won,
        capacity = report.seat_capacity,
        "exclusivity violated"
    );
    if cfg.report.fail_on_violation {
        EXIT_VIOLATION
    } else {
        EXIT_OK
    }
}
