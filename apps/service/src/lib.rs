//! healthwatch - periodic HTTP health checking with debounced alerting
//!
//! A [`registry::TargetRegistry`] holds the monitored targets. Each cycle the
//! [`monitoring::HealthMonitor`] asks the [`monitoring::ProbeExecutor`] to
//! probe all of them in parallel, then feeds every result through a per-target
//! state machine that fires alert handlers after a run of consecutive failures
//! and resolve handlers on the first success afterwards.

pub mod config;
pub mod metrics;
pub mod monitoring;
pub mod notify;
pub mod registry;
pub mod service;
pub mod validation;

pub use config::Config;
pub use monitoring::{CheckResult, HealthState, MonitorState, Target};
pub use registry::RegistryError;
pub use service::{HealthService, ServiceError};
