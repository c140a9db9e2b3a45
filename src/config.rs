//! Deployment settings read from the environment.
//!
//! `main` loads a `.env` file (if any) through `dotenvy` before calling
//! [`Config::from_env`].

use crate::domain::operator::OperatorPolicy;
use crate::error::{PosError, Result};
use reqwest::Url;
use std::time::Duration;

pub const BACKEND_BASE_URL: &str = "CLUBPAY_BACKEND_BASE_URL";
pub const LOCATION_ID: &str = "CLUBPAY_LOCATION_ID";
pub const DEVICE_NAME: &str = "CLUBPAY_DEVICE_NAME";
pub const OPERATORS: &str = "CLUBPAY_OPERATORS";
pub const HTTP_TIMEOUT_SECS: &str = "CLUBPAY_HTTP_TIMEOUT_SECS";

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Config {
    pub backend_base_url: Url,
    pub location_id: Option<String>,
    pub device_name: String,
    /// `Some` selects the fixed operator list, `None` the logged-in user.
    pub operators: Option<Vec<String>>,
    pub http_timeout: Duration,
}

impl Config {
    pub fn from_env() -> Result<Self> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    pub fn from_lookup<F>(lookup: F) -> Result<Self>
    where
        F: Fn(&str) -> Option<String>,
    {
        let non_blank = |key: &str| lookup(key).map(|v| v.trim().to_string()).filter(|v| !v.is_empty());

        let raw_url = non_blank(BACKEND_BASE_URL)
            .ok_or_else(|| PosError::Config(format!("{BACKEND_BASE_URL} must be set")))?;
        let backend_base_url = Url::parse(&raw_url)
            .map_err(|e| PosError::Config(format!("{BACKEND_BASE_URL} is not a valid URL: {e}")))?;
        if backend_base_url.cannot_be_a_base() {
            return Err(PosError::Config(format!(
                "{BACKEND_BASE_URL} cannot be used as a base URL"
            )));
        }

        let device_name = non_blank(DEVICE_NAME).unwrap_or_else(|| {
            let host = non_blank("HOSTNAME")
                .or_else(system_hostname)
                .unwrap_or_else(|| "unknown".to_string());
            format!("{host}-pos")
        });

        let operators = non_blank(OPERATORS).map(|raw| {
            raw.split(',')
                .map(str::trim)
                .filter(|name| !name.is_empty())
                .map(str::to_string)
                .collect::<Vec<_>>()
        });

        let http_timeout = match non_blank(HTTP_TIMEOUT_SECS) {
            Some(raw) => raw
                .parse::<u64>()
                .ok()
                .filter(|secs| *secs > 0)
                .map(Duration::from_secs)
                .ok_or_else(|| {
                    PosError::Config(format!("{HTTP_TIMEOUT_SECS} must be a positive integer"))
                })?,
            None => crate::infrastructure::http::DEFAULT_TIMEOUT,
        };

        Ok(Self {
            backend_base_url,
            location_id: non_blank(LOCATION_ID),
            device_name,
            operators,
            http_timeout,
        })
    }

    pub fn operator_policy(&self) -> OperatorPolicy {
        match &self.operators {
            Some(names) => OperatorPolicy::fixed_list(names),
            None => OperatorPolicy::AuthenticatedUser,
        }
    }
}

/// The machine's hostname as reported by the OS, if it is readable and non-blank.
fn system_hostname() -> Option<String> {
    hostname::get()
        .ok()
        .and_then(|name| name.into_string().ok())
        .map(|name| name.trim().to_string())
        .filter(|name| !name.is_empty())
}
