use chrono::{DateTime, Utc};
use healthwatch::{CheckResult, HealthState, MonitorState, Target};
use serde::{Deserialize, Serialize};

/// Body of `POST /targets`
#[derive(Debug, Deserialize)]
pub struct NewTarget {
    pub id: String,
    pub url: String,
}

#[derive(Debug, Serialize)]
pub struct TargetView {
    pub id: String,
    pub url: String,
}

impl From<Target> for TargetView {
    fn from(target: Target) -> Self {
        Self { id: target.id, url: target.url.to_string() }
    }
}

#[derive(Debug, Serialize)]
pub struct ResultView {
    pub id: String,
    pub url: String,
    pub status: u16,
    pub healthy: bool,
    pub timestamp: DateTime<Utc>,
    pub duration_seconds: f64,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

impl From<CheckResult> for ResultView {
    fn from(result: CheckResult) -> Self {
        Self {
            id: result.target.id,
            url: result.target.url.to_string(),
            status: result.status_code,
            healthy: result.healthy,
            timestamp: result.timestamp,
            duration_seconds: result.duration.as_secs_f64(),
            error: result.error,
        }
    }
}

/// Debounce state of one target as last seen by the monitor
#[derive(Debug, Serialize)]
pub struct StateView {
    pub id: String,
    pub state: HealthState,
    pub consecutive_failures: u32,
    pub alerted: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub last_result: Option<ResultView>,
}

impl StateView {
    pub fn new(id: String, state: MonitorState) -> Self {
        Self {
            id,
            state: state.health(),
            consecutive_failures: state.consecutive_failures(),
            alerted: state.alerted(),
            last_result: state.last_result().cloned().map(ResultView::from),
        }
    }
}
