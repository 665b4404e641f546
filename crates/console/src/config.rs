//! Console settings read from the environment.

use std::path::PathBuf;
use std::time::Duration;

use marketadmin_auth::SelfExclusionRule;
use thiserror::Error;

use crate::marketplace::SUB_ADMINS_LINK;
use crate::sqlite_store::default_db_path;
use crate::store::DEFAULT_SESSION_TTL_DAYS;

pub const API_URL_VAR: &str = "MARKETADMIN_API_URL";
pub const SESSION_DB_VAR: &str = "MARKETADMIN_SESSION_DB";
pub const SESSION_TTL_DAYS_VAR: &str = "MARKETADMIN_SESSION_TTL_DAYS";
pub const HTTP_TIMEOUT_SECS_VAR: &str = "MARKETADMIN_HTTP_TIMEOUT_SECS";
pub const RESTRICTED_ROLE_VAR: &str = "MARKETADMIN_RESTRICTED_ROLE";
pub const RESTRICTED_LINKS_VAR: &str = "MARKETADMIN_RESTRICTED_LINKS";

pub const DEFAULT_API_URL: &str = "http://localhost:8080/api";
pub const DEFAULT_HTTP_TIMEOUT_SECS: u64 = 30;
pub const MAX_SESSION_TTL_DAYS: u64 = 3650;
pub const MAX_HTTP_TIMEOUT_SECS: u64 = 3600;
pub const DEFAULT_RESTRICTED_ROLE: &str = "sub_admin";

#[derive(Debug, Error, PartialEq, Eq)]
pub enum ConfigError {
    #[error("{var} must be an integer between 1 and {max}, got {value:?}")]
    InvalidNumber {
        var: &'static str,
        value: String,
        max: u64,
    },
    #[error("no data directory available; set MARKETADMIN_SESSION_DB")]
    NoDataDir,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ConsoleConfig {
    pub api_url: String,
    pub session_db: PathBuf,
    pub session_ttl: chrono::Duration,
    pub http_timeout: Duration,
    pub restricted_role: String,
    pub restricted_links: Vec<String>,
}

impl ConsoleConfig {
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Build from an arbitrary variable source. Unset or blank variables
    /// fall back to their defaults.
    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Result<Self, ConfigError> {
        let var = |key: &str| lookup(key).filter(|v| !v.trim().is_empty());

        let api_url = var(API_URL_VAR).unwrap_or_else(|| {
            tracing::info!("{API_URL_VAR} not set; using {DEFAULT_API_URL}");
            DEFAULT_API_URL.to_string()
        });

        let session_db = match var(SESSION_DB_VAR) {
            Some(path) => PathBuf::from(path),
            None => default_db_path().map_err(|_| ConfigError::NoDataDir)?,
        };

        let ttl_days = parse_bounded(SESSION_TTL_DAYS_VAR, var(SESSION_TTL_DAYS_VAR), MAX_SESSION_TTL_DAYS)?
            .unwrap_or(DEFAULT_SESSION_TTL_DAYS as u64);
        let timeout_secs = parse_bounded(HTTP_TIMEOUT_SECS_VAR, var(HTTP_TIMEOUT_SECS_VAR), MAX_HTTP_TIMEOUT_SECS)?
            .unwrap_or(DEFAULT_HTTP_TIMEOUT_SECS);

        let restricted_role =
            var(RESTRICTED_ROLE_VAR).unwrap_or_else(|| DEFAULT_RESTRICTED_ROLE.to_string());
        let restricted_links = match var(RESTRICTED_LINKS_VAR) {
            Some(list) => list
                .split(',')
                .map(str::trim)
                .filter(|l| !l.is_empty())
                .map(str::to_string)
                .collect(),
            None => vec![SUB_ADMINS_LINK.to_string()],
        };

        Ok(Self {
            api_url,
            session_db,
            session_ttl: chrono::Duration::days(ttl_days as i64),
            http_timeout: Duration::from_secs(timeout_secs),
            restricted_role,
            restricted_links,
        })
    }

    pub fn self_exclusion_rules(&self) -> Vec<SelfExclusionRule> {
        vec![SelfExclusionRule::new(
            self.restricted_role.clone(),
            self.restricted_links.clone(),
        )]
    }
}

/// Parse an optional setting in `1..=max`.
fn parse_bounded(
    var: &'static str,
    value: Option<String>,
    max: u64,
) -> Result<Option<u64>, ConfigError> {
    let Some(value) = value else {
        return Ok(None);
    };
    match value.trim().parse::<u64>() {
        Ok(n) if (1..=max).contains(&n) => Ok(Some(n)),
        _ => {
            tracing::warn!(var, value = %value, max, "invalid numeric setting");
            Err(ConfigError::InvalidNumber { var, value, max })
        }
    }
}
