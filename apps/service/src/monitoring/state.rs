use super::types::{CheckResult, HealthState};

/// Transition produced by feeding one result into a [`MonitorState`]
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Transition {
    /// Failure run reached the threshold, fire alert handlers
    Alert,
    /// First success after an alerted run, fire resolve handlers
    Resolve,
}

/// Per-target debounce state
///
/// Healthy: no failures, not alerted. Suspect: failing below the threshold.
/// Down: alerted, stays so until the next healthy result.
#[derive(Debug, Clone, Default)]
pub struct MonitorState {
    consecutive_failures: u32,
    alerted: bool,
    last_result: Option<CheckResult>,
}

impl MonitorState {
    /// Apply one result and report the transition it causes, if any
    ///
    /// An alert fires once per run of at least `failure_threshold` consecutive
    /// failures; a resolve fires on the first success after an alerted run.
    pub fn observe(&mut self, result: CheckResult, failure_threshold: u32) -> Option<Transition> {
        let transition = if result.healthy {
            let transition = self.alerted.then_some(Transition::Resolve);
            self.consecutive_failures = 0;
            self.alerted = false;
            transition
        } else {
            self.consecutive_failures = self.consecutive_failures.saturating_add(1);
            if self.consecutive_failures >= failure_threshold && !self.alerted {
                self.alerted = true;
                Some(Transition::Alert)
            } else {
                None
            }
        };

        self.last_result = Some(result);
        transition
    }

    pub fn health(&self) -> HealthState {
        if self.alerted {
            HealthState::Down
        } else if self.consecutive_failures > 0 {
            HealthState::Suspect
        } else {
            HealthState::Healthy
        }
    }

    pub fn consecutive_failures(&self) -> u32 {
        self.consecutive_failures
    }

    pub fn alerted(&self) -> bool {
        self.alerted
    }

    pub fn last_result(&self) -> Option<&CheckResult> {
        self.last_result.as_ref()
    }
}
