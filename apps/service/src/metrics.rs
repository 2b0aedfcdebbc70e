//! Probe and registry metrics with Prometheus text exposition.

use std::collections::BTreeMap;
use std::fmt::Write;
use std::sync::atomic::{AtomicU64, AtomicUsize, Ordering};
use std::sync::{Mutex, PoisonError};

use crate::monitoring::types::CheckResult;

/// Latest probe figures for one target
#[derive(Debug, Clone, Default)]
struct TargetSeries {
    url: String,
    healthy: bool,
    status_code: u16,
    duration_seconds: f64,
    checks_total: u64,
    connection_errors: u64,
    unhealthy_statuses: u64,
}

#[derive(Debug, Default)]
pub struct Metrics {
    registered_targets: AtomicUsize,
    alerts_total: AtomicU64,
    resolves_total: AtomicU64,
    targets: Mutex<BTreeMap<String, TargetSeries>>,
}

impl Metrics {
    pub fn set_registered_targets(&self, count: usize) {
        self.registered_targets.store(count, Ordering::Relaxed);
    }

    pub fn registered_targets(&self) -> usize {
        self.registered_targets.load(Ordering::Relaxed)
    }

    pub fn record_alert(&self) {
        self.alerts_total.fetch_add(1, Ordering::Relaxed);
    }

    pub fn record_resolve(&self) {
        self.resolves_total.fetch_add(1, Ordering::Relaxed);
    }

    /// Fold one probe outcome into the per-target series
    pub fn record_check(&self, result: &CheckResult) {
        let mut targets = self.targets.lock().unwrap_or_else(PoisonError::into_inner);
        let series = targets.entry(result.target.id.clone()).or_default();

        series.url = result.target.url.to_string();
        series.healthy = result.healthy;
        series.status_code = result.status_code;
        series.duration_seconds = result.duration.as_secs_f64();
        series.checks_total += 1;

        if result.error.is_some() {
            series.connection_errors += 1;
        } else if !result.healthy {
            series.unhealthy_statuses += 1;
        }
    }

    /// Drop every series for a target that is no longer registered
    pub fn forget_target(&self, id: &str) {
        self.targets.lock().unwrap_or_else(PoisonError::into_inner).remove(id);
    }

    /// Render all metrics in Prometheus text format
    pub fn render_prometheus(&self) -> String {
        let targets = self.targets.lock().unwrap_or_else(PoisonError::into_inner).clone();
        let mut out = String::new();

        out.push_str("# HELP healthwatch_registered_targets Number of registered targets.\n");
        out.push_str("# TYPE healthwatch_registered_targets gauge\n");
        let _ = writeln!(out, "healthwatch_registered_targets {}", self.registered_targets());

        out.push_str("# HELP healthwatch_alerts_total Alert transitions fired.\n");
        out.push_str("# TYPE healthwatch_alerts_total counter\n");
        let _ = writeln!(out, "healthwatch_alerts_total {}", self.alerts_total.load(Ordering::Relaxed));

        out.push_str("# HELP healthwatch_resolves_total Resolve transitions fired.\n");
        out.push_str("# TYPE healthwatch_resolves_total counter\n");
        let _ =
            writeln!(out, "healthwatch_resolves_total {}", self.resolves_total.load(Ordering::Relaxed));

        out.push_str("# HELP healthwatch_check_status Last probe verdict (1 healthy, 0 unhealthy).\n");
        out.push_str("# TYPE healthwatch_check_status gauge\n");
        for (id, s) in &targets {
            let _ = writeln!(out, "healthwatch_check_status{{{}}} {}", labels(id, &s.url), u8::from(s.healthy));
        }

        out.push_str("# HELP healthwatch_check_status_code HTTP status code of the last probe.\n");
        out.push_str("# TYPE healthwatch_check_status_code gauge\n");
        for (id, s) in &targets {
            let _ = writeln!(out, "healthwatch_check_status_code{{{}}} {}", labels(id, &s.url), s.status_code);
        }

        out.push_str("# HELP healthwatch_check_duration_seconds Duration of the last probe.\n");
        out.push_str("# TYPE healthwatch_check_duration_seconds gauge\n");
        for (id, s) in &targets {
            let _ = writeln!(
                out,
                "healthwatch_check_duration_seconds{{{}}} {:.6}",
                labels(id, &s.url),
                s.duration_seconds
            );
        }

        out.push_str("# HELP healthwatch_checks_total Probes performed.\n");
        out.push_str("# TYPE healthwatch_checks_total counter\n");
        for (id, s) in &targets {
            let _ = writeln!(out, "healthwatch_checks_total{{{}}} {}", labels(id, &s.url), s.checks_total);
        }

        out.push_str("# HELP healthwatch_check_errors_total Failed probes by kind.\n");
        out.push_str("# TYPE healthwatch_check_errors_total counter\n");
        for (id, s) in &targets {
            let labels = labels(id, &s.url);
            let _ = writeln!(
                out,
                "healthwatch_check_errors_total{{{labels},error_type=\"connection_error\"}} {}",
                s.connection_errors
            );
            let _ = writeln!(
                out,
                "healthwatch_check_errors_total{{{labels},error_type=\"unhealthy_status\"}} {}",
                s.unhealthy_statuses
            );
        }

        out
    }
}

fn labels(id: &str, url: &str) -> String {
    format!("target_id=\"{}\",url=\"{}\"", escape_label(id), escape_label(url))
}

fn escape_label(value: &str) -> String {
    value.replace('\\', "\\\\").replace('"', "\\\"").replace('\n', "\\n")
}
