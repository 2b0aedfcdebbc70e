//! Monitoring engine module - probes targets and tracks their health
//!
//! This module is responsible for:
//! - Executing HTTP checks against registered targets
//! - Fanning a check cycle out over every target and joining the results
//! - Debouncing results into alert/resolve transitions
//! - Scheduling cycles on a fixed interval

pub mod checker;
pub mod executor;
pub mod monitor;
pub mod scheduler;
pub mod state;
pub mod types;


pub use checker::{Checker, HttpChecker};
pub use executor::ProbeExecutor;
pub use monitor::HealthMonitor;
pub use scheduler::{MonitoringScheduler, SchedulerHandle};
pub use state::{MonitorState, Transition};
pub use types::{CheckResult, HealthState, Target};
