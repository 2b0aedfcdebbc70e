use std::collections::{HashMap, HashSet};
use std::sync::Arc;
use tokio::sync::RwLock;
use tracing::{debug, error, info, warn};

use super::executor::ProbeExecutor;
use super::state::{MonitorState, Transition};
use super::types::CheckResult;
use crate::metrics::Metrics;
use crate::notify::{Notifier, Notifiers};

/// Health monitor - runs check cycles and turns results into alert/resolve events
///
/// Only result processing (and the purge steps) mutate the state map. Cycles
/// are driven by a single scheduler task and never overlap, so state updates
/// are sequential; readers only need the read lock.
pub struct HealthMonitor {
    executor: Arc<ProbeExecutor>,
    failure_threshold: u32,
    alert_notifiers: Vec<Arc<dyn Notifier>>,
    resolve_notifiers: Vec<Arc<dyn Notifier>>,
    ledger: RwLock<Ledger>,
    metrics: Arc<Metrics>,
}

#[derive(Default)]
struct Ledger {
    states: HashMap<String, MonitorState>,
    /// Bumped by `forget`; a cycle drops results whose epoch moved since it started
    epochs: HashMap<String, u64>,
}

impl Ledger {
    fn epoch(&self, id: &str) -> u64 {
        self.epochs.get(id).copied().unwrap_or_default()
    }
}

impl HealthMonitor {
    pub fn new(
        executor: Arc<ProbeExecutor>,
        failure_threshold: u32,
        notifiers: Notifiers,
        metrics: Arc<Metrics>,
    ) -> Self {
        Self {
            executor,
            failure_threshold: failure_threshold.max(1),
            alert_notifiers: notifiers.alert,
            resolve_notifiers: notifiers.resolve,
            ledger: RwLock::new(Ledger::default()),
            metrics,
        }
    }

    pub fn executor(&self) -> &Arc<ProbeExecutor> {
        &self.executor
    }

    pub fn failure_threshold(&self) -> u32 {
        self.failure_threshold
    }

    /// Probe every target once and process all results
    ///
    /// Returns the number of results processed. Results for targets that were
    /// forgotten while their probe was in flight are discarded, and state for
    /// targets that were not part of this cycle's snapshot is dropped afterwards.
    pub async fn run_cycle(&self) -> usize {
        let epochs = self.ledger.read().await.epochs.clone();
        let results = self.executor.check_all().await;
        let seen: HashSet<String> = results.iter().map(|r| r.target.id.clone()).collect();
        let mut processed = 0;

        for result in results {
            let started = epochs.get(&result.target.id).copied().unwrap_or_default();
            if self.apply(result, Some(started)).await {
                processed += 1;
            }
        }

        let mut ledger = self.ledger.write().await;
        ledger.states.retain(|id, _| seen.contains(id));
        ledger.epochs.retain(|id, _| seen.contains(id));
        drop(ledger);

        debug!(processed, "Check cycle complete");
        processed
    }

    /// Feed one result through the target's state machine
    ///
    /// The new state is stored before any handler runs, so handler failures
    /// can never leave the state half-updated.
    pub async fn process_result(&self, result: CheckResult) {
        self.apply(result, None).await;
    }

    /// Returns false when the result was discarded as stale
    async fn apply(&self, result: CheckResult, started: Option<u64>) -> bool {
        let transition = {
            let mut ledger = self.ledger.write().await;
            let id = &result.target.id;
            if started.is_some_and(|epoch| ledger.epoch(id) != epoch) {
                debug!(target_id = %id, "Target was forgotten during the cycle, result discarded");
                return false;
            }

            ledger
                .states
                .entry(id.clone())
                .or_default()
                .observe(result.clone(), self.failure_threshold)
        };

        match transition {
            Some(Transition::Alert) => {
                warn!(
                    target_id = %result.target.id,
                    status = result.status_code,
                    threshold = self.failure_threshold,
                    "Target marked down"
                );
                self.metrics.record_alert();
                self.dispatch(&self.alert_notifiers, "alert", &result).await;
            }
            Some(Transition::Resolve) => {
                info!(target_id = %result.target.id, status = result.status_code, "Target recovered");
                self.metrics.record_resolve();
                self.dispatch(&self.resolve_notifiers, "resolve", &result).await;
            }
            None => {}
        }

        true
    }

    /// Current state for `id`, if it has produced a result
    pub async fn state(&self, id: &str) -> Option<MonitorState> {
        self.ledger.read().await.states.get(id).cloned()
    }

    /// Drop the state of a target that has been unregistered
    ///
    /// Results of probes already in flight for `id` are discarded as well, so
    /// a target re-registered under the same id starts from a clean state.
    pub async fn forget(&self, id: &str) {
        let mut ledger = self.ledger.write().await;
        *ledger.epochs.entry(id.to_string()).or_default() += 1;
        if ledger.states.remove(id).is_some() {
            debug!(target_id = %id, "Dropped monitor state");
        }
    }

    /// Invoke every handler in order; failures are logged and never stop the rest
    async fn dispatch(&self, notifiers: &[Arc<dyn Notifier>], event: &str, result: &CheckResult) {
        for notifier in notifiers {
            if let Err(e) = notifier.notify(&result.target, result).await {
                error!(
                    notifier = notifier.name(),
                    event,
                    target_id = %result.target.id,
                    error = %e,
                    "Notification failed"
                );
            }
        }
    }
}
