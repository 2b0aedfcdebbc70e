use std::sync::Arc;
use std::time::Duration;
use thiserror::Error;
use tracing::info;

use crate::config::Config;
use crate::metrics::Metrics;
use crate::monitoring::{
    CheckResult, Checker, HealthMonitor, HttpChecker, MonitorState, MonitoringScheduler,
    ProbeExecutor, Target,
};
use crate::notify::{NotifyError, build_notifiers};
use crate::registry::{RegistryError, TargetRegistry, TargetStore};

#[derive(Debug, Error)]
pub enum ServiceError {
    #[error(transparent)]
    Registry(#[from] RegistryError),
    #[error("failed to build HTTP checker: {0:#}")]
    Checker(anyhow::Error),
    #[error("failed to set up notifiers: {0}")]
    Notify(#[from] NotifyError),
}

/// Entry point for everything outside the engine (REST layer, binaries)
///
/// The scheduler and on-demand callers share the registry and executor but
/// nothing else; on-demand checks never touch monitor state.
pub struct HealthService {
    registry: Arc<TargetRegistry>,
    monitor: Arc<HealthMonitor>,
    metrics: Arc<Metrics>,
}

impl HealthService {
    pub fn new(registry: Arc<TargetRegistry>, monitor: Arc<HealthMonitor>, metrics: Arc<Metrics>) -> Self {
        Self { registry, monitor, metrics }
    }

    /// Build the whole engine from configuration and register seed targets
    pub async fn from_config(config: &Config) -> Result<Self, ServiceError> {
        let timeout = config.monitor.check_timeout();
        let checker = HttpChecker::new(timeout).map_err(ServiceError::Checker)?;
        Self::with_checker(config, Arc::new(checker)).await
    }

    /// Same as [`HealthService::from_config`] with a caller-supplied checker
    pub async fn with_checker(config: &Config, checker: Arc<dyn Checker>) -> Result<Self, ServiceError> {
        let metrics = Arc::new(Metrics::default());

        let registry = match &config.storage.targets_file {
            Some(path) => TargetRegistry::open(TargetStore::new(path), metrics.clone()).await?,
            None => TargetRegistry::in_memory(metrics.clone()),
        };
        let registry = Arc::new(registry);

        let mut executor = ProbeExecutor::new(checker, registry.clone(), metrics.clone());
        if let Some(max) = config.monitor.max_concurrent_probes {
            executor = executor.with_concurrency_limit(max);
        }

        let notifiers = build_notifiers(&config.notify, config.monitor.check_timeout())?;
        info!(?notifiers, "Notifiers configured");

        let monitor = HealthMonitor::new(
            Arc::new(executor),
            config.monitor.failure_threshold,
            notifiers,
            metrics.clone(),
        );

        let service = Self::new(registry, Arc::new(monitor), metrics);
        for seed in &config.targets {
            service.register(&seed.id, &seed.url).await?;
        }

        Ok(service)
    }

    /// Validate and register a target, replacing any target with the same id
    pub async fn register(&self, id: &str, url: &str) -> Result<Target, RegistryError> {
        let target = Target::parse(id, url)?;
        self.registry.add(target.clone()).await?;
        Ok(target)
    }

    /// Unregister a target and drop its monitor state
    pub async fn unregister(&self, id: &str) -> Result<(), RegistryError> {
        self.registry.remove(id).await?;
        self.monitor.forget(id).await;
        Ok(())
    }

    pub async fn targets(&self) -> Vec<Target> {
        self.registry.snapshot().await
    }

    /// On-demand probe of one target
    pub async fn check_single(&self, id: &str) -> Result<CheckResult, RegistryError> {
        self.monitor.executor().check_single(id).await
    }

    /// On-demand probe of every target, outside the monitoring cycle
    pub async fn check_all(&self) -> Vec<CheckResult> {
        self.monitor.executor().check_all().await
    }

    pub async fn state(&self, id: &str) -> Option<MonitorState> {
        self.monitor.state(id).await
    }

    pub fn monitor(&self) -> &Arc<HealthMonitor> {
        &self.monitor
    }

    pub fn metrics(&self) -> &Metrics {
        &self.metrics
    }

    /// Scheduler driving this service's monitor every `interval`
    pub fn scheduler(&self, interval: Duration) -> MonitoringScheduler {
        MonitoringScheduler::new(self.monitor.clone(), interval)
    }
}
