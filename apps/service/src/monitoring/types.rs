use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::time::Duration;
use url::Url;

use crate::registry::RegistryError;
use crate::validation::{validate_http_endpoint, validate_target_id};

/// A monitored endpoint, unique by `id` within the registry
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Target {
    pub id: String,
    pub url: Url,
}

impl Target {
    /// Build a target from raw user input, validating both the id and the URL
    pub fn parse(id: impl Into<String>, url: &str) -> Result<Self, RegistryError> {
        let id = id.into();

        if let Err(reason) = validate_target_id(&id).into_result() {
            return Err(RegistryError::InvalidId { id, reason });
        }

        let url = validate_http_endpoint(url)
            .map_err(|reason| RegistryError::InvalidUrl { url: url.to_string(), reason })?;

        Ok(Self { id, url })
    }
}

/// Debounced health of a target as seen by the monitor
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum HealthState {
    /// Last observation was healthy
    Healthy,
    /// Failing, but not yet for long enough to alert
    Suspect,
    /// Alerted and still failing
    Down,
}

impl std::fmt::Display for HealthState {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            HealthState::Healthy => write!(f, "healthy"),
            HealthState::Suspect => write!(f, "suspect"),
            HealthState::Down => write!(f, "down"),
        }
    }
}

/// Outcome of a single probe
///
/// Exactly one of `status_code != 0` and `error.is_some()` holds: either a
/// response came back, or the request never completed.
#[derive(Debug, Clone, PartialEq)]
pub struct CheckResult {
    /// Target that was probed
    pub target: Target,

    /// HTTP status code, 0 when no response was received
    pub status_code: u16,

    /// True iff `status_code` is in [200, 300)
    pub healthy: bool,

    /// Wall-clock time the probe started
    pub timestamp: DateTime<Utc>,

    /// Elapsed time of the probe, recorded on every outcome
    pub duration: Duration,

    /// Transport-level failure (connect error, timeout, ...)
    pub error: Option<String>,
}

impl CheckResult {
    /// Create an unfinished result for a probe started at `timestamp`
    pub fn new(target: Target, timestamp: DateTime<Utc>) -> Self {
        Self {
            target,
            status_code: 0,
            healthy: false,
            timestamp,
            duration: Duration::ZERO,
            error: None,
        }
    }

    /// Record a received response
    pub fn responded(mut self, status_code: u16, duration: Duration) -> Self {
        self.status_code = status_code;
        self.healthy = (200..300).contains(&status_code);
        self.duration = duration;
        self.error = None;
        self
    }

    /// Record a probe that never produced a response
    pub fn failed(mut self, error: impl Into<String>, duration: Duration) -> Self {
        self.status_code = 0;
        self.healthy = false;
        self.duration = duration;
        self.error = Some(error.into());
        self
    }
}
