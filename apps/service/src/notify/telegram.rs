use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::sync::{Mutex, PoisonError};
use std::time::{Duration, Instant};
use tracing::debug;

use super::{NotificationKind, Notifier, NotifyError};
use crate::config::TelegramConfig;
use crate::monitoring::types::{CheckResult, Target};

#[derive(Debug, Serialize)]
struct SendMessage<'a> {
    chat_id: i64,
    text: &'a str,
}

#[derive(Debug, Deserialize)]
struct ApiReply {
    #[serde(default)]
    description: Option<String>,
}

/// Sends transitions to a Telegram chat through the Bot API
pub struct TelegramNotifier {
    client: reqwest::Client,
    endpoint: String,
    chat_id: i64,
    kind: NotificationKind,
    throttle: Duration,
    last_alert: Mutex<HashMap<String, Instant>>,
}

impl TelegramNotifier {
    pub fn new(config: &TelegramConfig, client: reqwest::Client, kind: NotificationKind) -> Self {
        Self {
            client,
            endpoint: format!(
                "{}/bot{}/sendMessage",
                config.api_base.trim_end_matches('/'),
                config.bot_token
            ),
            chat_id: config.chat_id,
            kind,
            throttle: Duration::from_secs(config.throttle_seconds),
            last_alert: Mutex::new(HashMap::new()),
        }
    }

    /// Whether an alert for `target_id` goes out now; records the send time if so
    fn admit(&self, target_id: &str) -> bool {
        if self.kind != NotificationKind::Alert || self.throttle.is_zero() {
            return true;
        }

        let mut last_alert = self.last_alert.lock().unwrap_or_else(PoisonError::into_inner);
        let now = Instant::now();
        match last_alert.get(target_id) {
            Some(sent) if now.duration_since(*sent) < self.throttle => false,
            _ => {
                last_alert.insert(target_id.to_string(), now);
                true
            }
        }
    }
}

/// Message body for one transition
pub fn format_message(kind: NotificationKind, target: &Target, result: &CheckResult) -> String {
    let mut msg = match kind {
        NotificationKind::Alert => format!("⚠️ Alert for {} ({})\n", target.id, target.url),
        NotificationKind::Resolve => format!("✅ Resolved for {} ({})\n", target.id, target.url),
    };
    msg += &format!("Status: {}\n", result.status_code);
    msg += &format!("Duration: {:?}\n", result.duration);
    msg += &format!("Timestamp: {}\n", result.timestamp.to_rfc3339());

    if kind == NotificationKind::Alert {
        if let Some(error) = &result.error {
            msg += &format!("Error: {error}\n");
        }
    }

    msg
}

#[async_trait::async_trait]
impl Notifier for TelegramNotifier {
    fn name(&self) -> &str {
        "telegram"
    }

    async fn notify(&self, target: &Target, result: &CheckResult) -> Result<(), NotifyError> {
        if !self.admit(&target.id) {
            debug!(target_id = %target.id, "Telegram alert throttled");
            return Ok(());
        }

        let text = format_message(self.kind, target, result);
        // Strip the URL from errors, it carries the bot token
        let response = self
            .client
            .post(&self.endpoint)
            .json(&SendMessage { chat_id: self.chat_id, text: &text })
            .send()
            .await
            .map_err(reqwest::Error::without_url)?;

        let status = response.status();
        if status.is_success() {
            return Ok(());
        }

        let description = response
            .json::<ApiReply>()
            .await
            .ok()
            .and_then(|reply| reply.description)
            .unwrap_or_else(|| status.canonical_reason().unwrap_or("unknown error").to_string());

        Err(NotifyError::Rejected { status: status.as_u16(), description })
    }
}
