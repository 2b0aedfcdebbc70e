//! Notification backends invoked on alert/resolve transitions
//!
//! Every backend implements [`Notifier`]; the monitor holds two ordered lists
//! (alert and resolve) built once at start-up and never touches backend
//! internals. A failed notification is logged by the monitor and dropped.

pub mod email;
pub mod log;
pub mod telegram;

use std::sync::Arc;
use std::time::Duration;
use thiserror::Error;

pub use email::EmailNotifier;
pub use log::LogNotifier;
pub use telegram::TelegramNotifier;

use crate::config::NotifyConfig;
use crate::monitoring::types::{CheckResult, Target};

#[derive(Debug, Error)]
pub enum NotifyError {
    #[error("notification request failed: {0}")]
    Request(#[from] reqwest::Error),
    #[error("notification rejected with status {status}: {description}")]
    Rejected { status: u16, description: String },
    #[error("invalid email address: {0}")]
    Address(#[from] lettre::address::AddressError),
    #[error("failed to build email: {0}")]
    Message(#[from] lettre::error::Error),
    #[error("SMTP delivery failed: {0}")]
    Smtp(#[from] lettre::transport::smtp::Error),
}

/// Which transition a notification reports
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum NotificationKind {
    /// Target went down after enough consecutive failures
    Alert,
    /// Previously alerted target is healthy again
    Resolve,
}

#[async_trait::async_trait]
pub trait Notifier: Send + Sync {
    /// Short backend name used in logs
    fn name(&self) -> &str;

    /// Deliver one notification about `target`
    async fn notify(&self, target: &Target, result: &CheckResult) -> Result<(), NotifyError>;
}

/// Alert and resolve handler lists, each invoked in order
#[derive(Clone, Default)]
pub struct Notifiers {
    pub alert: Vec<Arc<dyn Notifier>>,
    pub resolve: Vec<Arc<dyn Notifier>>,
}

impl Notifiers {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn on_alert(mut self, notifier: Arc<dyn Notifier>) -> Self {
        self.alert.push(notifier);
        self
    }

    pub fn on_resolve(mut self, notifier: Arc<dyn Notifier>) -> Self {
        self.resolve.push(notifier);
        self
    }
}

impl std::fmt::Debug for Notifiers {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let names = |list: &[Arc<dyn Notifier>]| list.iter().map(|n| n.name().to_string()).collect::<Vec<_>>();
        f.debug_struct("Notifiers")
            .field("alert", &names(&self.alert))
            .field("resolve", &names(&self.resolve))
            .finish()
    }
}

/// Build the handler lists from configuration
pub fn build_notifiers(config: &NotifyConfig, timeout: Duration) -> Result<Notifiers, NotifyError> {
    let mut notifiers = Notifiers::new();

    if config.log.enabled {
        notifiers = notifiers
            .on_alert(Arc::new(LogNotifier::new(NotificationKind::Alert)))
            .on_resolve(Arc::new(LogNotifier::new(NotificationKind::Resolve)));
    }

    if let Some(email) = &config.email {
        let alert = EmailNotifier::new(email, timeout, NotificationKind::Alert)?;
        let resolve = alert.for_kind(NotificationKind::Resolve);
        notifiers = notifiers.on_alert(Arc::new(alert)).on_resolve(Arc::new(resolve));
    }

    if let Some(telegram) = &config.telegram {
        let client = reqwest::Client::builder().timeout(timeout).build()?;
        notifiers = notifiers
            .on_alert(Arc::new(TelegramNotifier::new(
                telegram,
                client.clone(),
                NotificationKind::Alert,
            )))
            .on_resolve(Arc::new(TelegramNotifier::new(telegram, client, NotificationKind::Resolve)));
    }

    Ok(notifiers)
}
