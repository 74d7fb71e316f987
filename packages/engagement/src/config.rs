//! Runtime configuration loaded from the environment.

use dotenvy::dotenv;
use std::env;
use std::path::PathBuf;
use std::str::FromStr;

use crate::error::{EngagementError, Result};
use crate::security::{ApiCredentials, SecretString};
use crate::types::config::{BulkConfig, ClassifierConfig, PaginatorConfig};

const DEFAULT_CONCURRENCY: usize = 4;
const DEFAULT_PAGE_DELAY_MS: u64 = 1_000;
const DEFAULT_PAGE_TIMEOUT_SECS: u64 = 30;

/// Settings for an extraction run.
#[derive(Debug, Clone)]
pub struct RunConfig {
    pub api_base_url: String,
    pub api_token: SecretString,

    /// SQLite URL; runs keep results in memory when unset
    pub database_url: Option<String>,

    pub concurrency_limit: usize,
    pub max_results_per_target: Option<usize>,
    pub page_delay_ms: u64,
    pub page_timeout_secs: u64,

    /// Shared request quota across workers (unlimited when unset)
    pub requests_per_second: Option<u32>,

    /// JSON file overriding classifier thresholds
    pub classifier_config_path: Option<PathBuf>,
}

impl RunConfig {
    /// Load configuration from environment variables.
    pub fn from_env() -> Result<Self> {
        // Load .env file if present (development)
        let _ = dotenv();
        Self::from_lookup(|key| env::var(key).ok())
    }

    /// Load configuration from an arbitrary key lookup.
    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Result<Self> {
        let var = |key: &str| lookup(key).filter(|value| !value.trim().is_empty());

        Ok(Self {
            api_base_url: var("ENGAGEMENT_API_BASE_URL")
                .ok_or_else(|| missing("ENGAGEMENT_API_BASE_URL"))?,
            api_token: var("ENGAGEMENT_API_TOKEN")
                .map(SecretString::from)
                .ok_or_else(|| missing("ENGAGEMENT_API_TOKEN"))?,
            database_url: var("DATABASE_URL"),
            concurrency_limit: parse_var(&var, "CONCURRENCY_LIMIT")?
                .unwrap_or(DEFAULT_CONCURRENCY),
            max_results_per_target: parse_var(&var, "MAX_RESULTS_PER_TARGET")?,
            page_delay_ms: parse_var(&var, "PAGE_DELAY_MS")?.unwrap_or(DEFAULT_PAGE_DELAY_MS),
            page_timeout_secs: parse_var(&var, "PAGE_TIMEOUT_SECS")?
                .unwrap_or(DEFAULT_PAGE_TIMEOUT_SECS),
            requests_per_second: parse_var(&var, "REQUESTS_PER_SECOND")?,
            classifier_config_path: var("CLASSIFIER_CONFIG_PATH").map(PathBuf::from),
        })
    }

    /// Validated API credentials.
    pub fn credentials(&self) -> Result<ApiCredentials> {
        ApiCredentials::new(&self.api_base_url, self.api_token.clone())
    }

    /// Classifier calibration, from the configured file or the defaults.
    pub fn classifier(&self) -> Result<ClassifierConfig> {
        let Some(path) = &self.classifier_config_path else {
            return Ok(ClassifierConfig::default());
        };

        let json = std::fs::read_to_string(path).map_err(|e| {
            EngagementError::Config(format!("cannot read {}: {e}", path.display()))
        })?;
        ClassifierConfig::from_json(&json).map_err(|e| {
            EngagementError::Config(format!("invalid classifier config {}: {e}", path.display()))
        })
    }

    /// Bulk-run settings derived from this configuration.
    pub fn bulk_config(&self) -> Result<BulkConfig> {
        let paginator = PaginatorConfig::new()
            .with_page_delay_ms(self.page_delay_ms)
            .with_page_timeout_ms(self.page_timeout_secs.saturating_mul(1_000));

        Ok(BulkConfig::new()
            .with_concurrency_limit(self.concurrency_limit)
            .with_per_target_cap(self.max_results_per_target)
            .with_paginator(paginator)
            .with_classifier(self.classifier()?))
    }
}

fn missing(key: &str) -> EngagementError {
    EngagementError::Config(format!("{key} must be set"))
}

fn parse_var<T: FromStr>(var: &impl Fn(&str) -> Option<String>, key: &str) -> Result<Option<T>>
where
    T::Err: std::fmt::Display,
{
    var(key)
        .map(|raw| {
            raw.trim().parse::<T>().map_err(|e| {
                EngagementError::Config(format!("{key} must be a valid number ({raw:?}: {e})"))
            })
        })
        .transpose()
}
