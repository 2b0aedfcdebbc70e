use chrono::Utc;
use std::sync::Arc;
use std::time::{Duration, Instant};
use tokio::sync::Semaphore;
use tracing::{debug, error};

use super::checker::Checker;
use super::types::{CheckResult, Target};
use crate::metrics::Metrics;
use crate::registry::{RegistryError, TargetRegistry};

/// Probe executor - turns targets into check results
///
/// A cycle spawns one task per target and joins them all before returning.
/// Without a concurrency limit every target is probed at once, so very large
/// registries open that many connections simultaneously.
pub struct ProbeExecutor {
    checker: Arc<dyn Checker>,
    registry: Arc<TargetRegistry>,
    metrics: Arc<Metrics>,
    limit: Option<Arc<Semaphore>>,
}

impl ProbeExecutor {
    pub fn new(checker: Arc<dyn Checker>, registry: Arc<TargetRegistry>, metrics: Arc<Metrics>) -> Self {
        Self { checker, registry, metrics, limit: None }
    }

    /// Allow at most `max` probes in flight at once
    pub fn with_concurrency_limit(mut self, max: usize) -> Self {
        self.limit = Some(Arc::new(Semaphore::new(max.max(1))));
        self
    }

    pub fn registry(&self) -> &Arc<TargetRegistry> {
        &self.registry
    }

    /// Probe a single target; failures are reported in the result
    pub async fn check_one(&self, target: &Target) -> CheckResult {
        probe(self.checker.as_ref(), &self.registry, &self.metrics, target.clone()).await
    }

    /// Probe every registered target concurrently
    ///
    /// Results line up one-to-one with the registry snapshot taken at the
    /// start of the call, whatever order the probes complete in.
    pub async fn check_all(&self) -> Vec<CheckResult> {
        let targets = self.registry.snapshot().await;
        self.check_targets(targets).await
    }

    /// Look up `id` and probe it
    pub async fn check_single(&self, id: &str) -> Result<CheckResult, RegistryError> {
        let target = self.registry.get(id).await?;
        Ok(self.check_one(&target).await)
    }

    async fn check_targets(&self, targets: Vec<Target>) -> Vec<CheckResult> {
        let started = Instant::now();

        let handles: Vec<_> = targets
            .iter()
            .cloned()
            .map(|target| {
                let checker = Arc::clone(&self.checker);
                let registry = Arc::clone(&self.registry);
                let metrics = Arc::clone(&self.metrics);
                let limit = self.limit.clone();

                tokio::spawn(async move {
                    let _permit = match limit {
                        Some(semaphore) => semaphore.acquire_owned().await.ok(),
                        None => None,
                    };
                    probe(checker.as_ref(), &registry, &metrics, target).await
                })
            })
            .collect();

        let joined = futures::future::join_all(handles).await;

        let results: Vec<CheckResult> = joined
            .into_iter()
            .zip(targets)
            .map(|(joined, target)| match joined {
                Ok(result) => result,
                Err(e) => {
                    error!(target_id = %target.id, error = %e, "Probe task failed");
                    CheckResult::new(target, Utc::now())
                        .failed(format!("probe task failed: {e}"), Duration::ZERO)
                }
            })
            .collect();

        debug!(
            targets = results.len(),
            healthy = results.iter().filter(|r| r.healthy).count(),
            elapsed_ms = started.elapsed().as_millis() as u64,
            "Checked all targets"
        );

        results
    }
}

/// Run one probe and classify its outcome
///
/// Metrics are only updated if the target was not removed or replaced while
/// the probe was in flight.
async fn probe(checker: &dyn Checker, registry: &TargetRegistry, metrics: &Metrics, target: Target) -> CheckResult {
    let timestamp = Utc::now();
    let start = Instant::now();

    let outcome = checker.check(&target.url).await;
    let elapsed = start.elapsed();

    let result = match outcome {
        Ok(status_code) => CheckResult::new(target, timestamp).responded(status_code, elapsed),
        Err(e) => CheckResult::new(target, timestamp).failed(format!("{e:#}"), elapsed),
    };

    debug!(
        target_id = %result.target.id,
        status = result.status_code,
        healthy = result.healthy,
        duration_ms = result.duration.as_millis() as u64,
        error = result.error.as_deref().unwrap_or(""),
        "Probe finished"
    );
    if registry.while_registered(&result.target, || metrics.record_check(&result)).await.is_none() {
        debug!(target_id = %result.target.id, "Target changed during probe, metrics not recorded");
    }

    result
}
