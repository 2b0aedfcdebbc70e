use tracing::{info, warn};

use super::{NotificationKind, Notifier, NotifyError};
use crate::monitoring::types::{CheckResult, Target};

/// Writes transitions to the tracing log
pub struct LogNotifier {
    kind: NotificationKind,
}

impl LogNotifier {
    pub fn new(kind: NotificationKind) -> Self {
        Self { kind }
    }
}

#[async_trait::async_trait]
impl Notifier for LogNotifier {
    fn name(&self) -> &str {
        "log"
    }

    async fn notify(&self, target: &Target, result: &CheckResult) -> Result<(), NotifyError> {
        match self.kind {
            NotificationKind::Alert => warn!(
                target_id = %target.id,
                url = %target.url,
                status = result.status_code,
                error = result.error.as_deref().unwrap_or(""),
                "Target down"
            ),
            NotificationKind::Resolve => info!(
                target_id = %target.id,
                url = %target.url,
                status = result.status_code,
                duration_ms = result.duration.as_millis() as u64,
                "Target recovered"
            ),
        }

        Ok(())
    }
}
