use anyhow::{Context, Result};
use figment::{
    providers::{Env, Format, Serialized, Toml},
    Figment,
};
use serde::{Deserialize, Deserializer, Serialize};
use std::path::{Path, PathBuf};
use std::time::Duration;
use validator::{Validate, ValidationError};

pub const DEFAULT_CONFIG_PATH: &str = "config/default.toml";
pub const ENV_PREFIX: &str = "SEAT__";

/// Immutable configuration of one attack run.
#[derive(Debug, Clone, Default, Serialize, Deserialize, Validate)]
#[serde(default)]
pub struct Config {
    #[validate(nested)]
    pub target: TargetConfig,
    #[validate(nested)]
    pub login: LoginConfig,
    #[validate(nested)]
    pub load: LoadConfig,
    pub report: ReportConfig,
    pub telemetry: TelemetryConfig,
}

#[derive(Debug, Clone, Serialize, Deserialize, Validate)]
#[serde(default)]
pub struct TargetConfig {
    #[validate(url)]
    pub base_url: String,
    #[serde(deserialize_with = "string_or_scalar")]
    #[validate(length(min = 1))]
    pub resource_id: String,
    #[serde(with = "humantime_serde")]
    #[validate(custom(function = "non_zero_duration"))]
    pub request_timeout: Duration,
    #[validate(length(min = 1))]
    pub user_agent: String,
}

impl Default for TargetConfig {
    fn default() -> Self {
        Self {
            base_url: "http://localhost:8080".to_string(),
            resource_id: "500".to_string(),
            request_timeout: Duration::from_secs(10),
            user_agent: concat!("golden-seat-harness/", env!("CARGO_PKG_VERSION")).to_string(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, Validate)]
#[serde(default)]
pub struct LoginConfig {
    #[serde(deserialize_with = "string_or_scalar")]
    #[validate(length(min = 1))]
    pub username: String,
    #[serde(deserialize_with = "string_or_scalar")]
    #[validate(length(min = 1))]
    pub password: String,
    /// JSON pointer to the token inside the login response
    #[validate(custom(function = "json_pointer"))]
    pub token_pointer: String,
}

impl Default for LoginConfig {
    fn default() -> Self {
        Self {
            username: "testuser".to_string(),
            password: "password123".to_string(),
            token_pointer: "/data/token".to_string(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, Validate)]
#[serde(default)]
pub struct LoadConfig {
    #[validate(range(min = 1))]
    pub concurrency: u32,
    #[serde(with = "humantime_serde")]
    #[validate(custom(function = "non_zero_duration"))]
    pub duration: Duration,
    #[serde(with = "humantime_serde")]
    pub pacing_delay: Duration,
    /// Per-client iteration cap; unbounded (duration only) when unset
    #[serde(skip_serializing_if = "Option::is_none")]
    #[validate(range(min = 1))]
    pub max_iterations: Option<u64>,
    /// Comment body, `{vu}` is replaced by the virtual user id
    #[validate(length(min = 1))]
    pub content_template: String,
    /// Number of seats the target may legitimately hand out
    #[validate(range(min = 1))]
    pub seat_capacity: u64,
}

impl Default for LoadConfig {
    fn default() -> Self {
        Self {
            concurrency: 500,
            duration: Duration::from_secs(30),
            pacing_delay: Duration::from_secs(1),
            max_iterations: None,
            content_template: "attacker #{vu} is going for the golden seat!".to_string(),
            seat_capacity: 1,
        }
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize, clap::ValueEnum, strum::Display)]
#[serde(rename_all = "lowercase")]
#[strum(serialize_all = "lowercase")]
pub enum ReportFormat {
    #[default]
    Text,
    Json,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct ReportConfig {
    pub format: ReportFormat,
    /// Also write the JSON report to this file
    #[serde(skip_serializing_if = "Option::is_none")]
    pub output: Option<PathBuf>,
    /// Exit with a distinct code when more seats were won than exist
    pub fail_on_violation: bool,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize, clap::ValueEnum, strum::Display)]
#[serde(rename_all = "lowercase")]
#[strum(serialize_all = "lowercase")]
pub enum LogFormat {
    #[default]
    Json,
    Pretty,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct TelemetryConfig {
    pub log_format: LogFormat,
}

/// Accept a string, or a bare scalar that the env provider parsed eagerly
/// (`SEAT__TARGET__RESOURCE_ID=42`, an all-digit password).
fn string_or_scalar<'de, D>(deserializer: D) -> Result<String, D::Error>
where
    D: Deserializer<'de>,
{
    #[derive(Deserialize)]
    #[serde(untagged)]
    enum Scalar {
        Text(String),
        Unsigned(u64),
        Signed(i64),
        Float(f64),
        Flag(bool),
    }

    Ok(match Scalar::deserialize(deserializer)? {
        Scalar::Text(s) => s,
        Scalar::Unsigned(n) => n.to_string(),
        Scalar::Signed(n) => n.to_string(),
        Scalar::Float(n) => n.to_string(),
        Scalar::Flag(b) => b.to_string(),
    })
}

fn non_zero_duration(value: &Duration) -> Result<(), ValidationError> {
    if value.is_zero() {
        return Err(ValidationError::new("non_zero_duration"));
    }
    Ok(())
}

fn json_pointer(value: &str) -> Result<(), ValidationError> {
    if !value.is_empty() && !value.starts_with('/') {
        return Err(ValidationError::new("json_pointer"));
    }
    Ok(())
}

/// Key-level overrides coming from the command line; highest precedence.
#[derive(Debug, Clone, Default)]
pub struct ConfigOverrides {
    table: toml::Table,
}

impl ConfigOverrides {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn set(&mut self, section: &str, key: &str, value: impl Into<toml::Value>) -> &mut Self {
        let entry = self
            .table
            .entry(section.to_string())
            .or_insert_with(|| toml::Value::Table(toml::Table::new()));
        if let toml::Value::Table(section) = entry {
            section.insert(key.to_string(), value.into());
        }
        self
    }

    pub fn set_duration(&mut self, section: &str, key: &str, value: Duration) -> &mut Self {
        self.set(section, key, humantime::format_duration(value).to_string())
    }
}

impl Config {
    /// Load from defaults, the TOML file, `SEAT__*` env vars and CLI overrides,
    /// in that order, then validate.
    pub fn load(path: Option<&Path>, overrides: &ConfigOverrides) -> Result<Self> {
        if let Some(path) = path {
            if !path.exists() {
                anyhow::bail!("config file {} does not exist", path.display());
            }
        }
        let path = path
            .map(Path::to_path_buf)
            .unwrap_or_else(|| PathBuf::from(DEFAULT_CONFIG_PATH));

        let cfg: Config = Self::figment(&path, overrides)
            .extract()
            .context("failed to read configuration")?;
        cfg.validate()
            .with_context(|| format!("invalid configuration (from {})", path.display()))?;
        Ok(cfg)
    }

    pub fn figment(path: &Path, overrides: &ConfigOverrides) -> Figment {
        Figment::new()
            .merge(Serialized::defaults(Config::default()))
            .merge(Toml::file(path))
            .merge(Env::prefixed(ENV_PREFIX).split("__"))
            .merge(Serialized::defaults(&overrides.table))
    }

    /// Effective configuration as TOML, password masked
    pub fn to_redacted_toml(&self) -> Result<String> {
        let mut shown = self.clone();
        shown.login.password = "********".to_string();
        toml::to_string_pretty(&shown).context("failed to render configuration")
    }
}
