use lettre::message::header::ContentType;
use lettre::message::Mailbox;
use lettre::transport::smtp::authentication::{Credentials, Mechanism};
use lettre::{AsyncSmtpTransport, AsyncTransport, Message, Tokio1Executor};
use std::time::Duration;
use tracing::debug;

use super::{NotificationKind, Notifier, NotifyError};
use crate::config::EmailConfig;
use crate::monitoring::types::{CheckResult, Target};

/// Mails transitions to a fixed recipient list over SMTP with LOGIN auth
#[derive(Clone)]
pub struct EmailNotifier {
    transport: AsyncSmtpTransport<Tokio1Executor>,
    from: Mailbox,
    to: Vec<Mailbox>,
    kind: NotificationKind,
}

impl EmailNotifier {
    /// Implicit TLS wins over STARTTLS when both are enabled; neither means plaintext
    pub fn new(config: &EmailConfig, timeout: Duration, kind: NotificationKind) -> Result<Self, NotifyError> {
        let from: Mailbox = config.from.parse()?;
        let to = config.to.iter().map(|addr| addr.parse()).collect::<Result<Vec<Mailbox>, _>>()?;

        let builder = if config.use_tls {
            AsyncSmtpTransport::<Tokio1Executor>::relay(&config.host)?
        } else if config.starttls {
            AsyncSmtpTransport::<Tokio1Executor>::starttls_relay(&config.host)?
        } else {
            AsyncSmtpTransport::<Tokio1Executor>::builder_dangerous(&config.host)
        };

        let transport = builder
            .port(config.port)
            .credentials(Credentials::new(config.from.clone(), config.password.clone()))
            .authentication(vec![Mechanism::Login])
            .timeout(Some(timeout))
            .build();

        Ok(Self { transport, from, to, kind })
    }

    /// Same mailer, reporting the other transition
    pub fn for_kind(&self, kind: NotificationKind) -> Self {
        Self { kind, ..self.clone() }
    }

    fn message(&self, target: &Target, result: &CheckResult) -> Result<Message, NotifyError> {
        let (subject, body) = format_email(self.kind, target, result);

        let builder = self
            .to
            .iter()
            .cloned()
            .fold(Message::builder().from(self.from.clone()), |builder, to| builder.to(to));

        Ok(builder.subject(subject).header(ContentType::TEXT_PLAIN).body(body)?)
    }
}

/// Subject and plain-text body for one transition
pub fn format_email(kind: NotificationKind, target: &Target, result: &CheckResult) -> (String, String) {
    let (subject, heading) = match kind {
        NotificationKind::Alert => (
            format!("Health Check Alert: {} is DOWN", target.url),
            format!("Health Check Failed for {}", target.url),
        ),
        NotificationKind::Resolve => (
            format!("Health Check Resolved: {} is UP", target.url),
            format!("Health Check Recovered for {}", target.url),
        ),
    };

    let mut body = format!(
        "{heading}\n\nDetails:\n- Target ID: {}\n- URL: {}\n- Status Code: {}\n- Timestamp: {}\n- Duration: {:?}\n",
        target.id,
        target.url,
        result.status_code,
        result.timestamp.to_rfc3339(),
        result.duration,
    );

    match kind {
        NotificationKind::Alert => {
            if let Some(error) = &result.error {
                body += &format!("- Error: {error}\n");
            }
        }
        NotificationKind::Resolve => body += "- Status: RESOLVED\n",
    }

    (subject, body)
}

#[async_trait::async_trait]
impl Notifier for EmailNotifier {
    fn name(&self) -> &str {
        "email"
    }

    async fn notify(&self, target: &Target, result: &CheckResult) -> Result<(), NotifyError> {
        let message = self.message(target, result)?;
        let response = self.transport.send(message).await?;

        debug!(target_id = %target.id, code = %response.code(), "Email handed to SMTP server");
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Utc;
    use tokio::io::{AsyncBufReadExt, AsyncWriteExt, BufReader};
    use tokio::net::TcpListener;
    use tokio::sync::mpsc;

    fn target() -> Target {
        Target::parse("api", "https://api.example.test/health").unwrap()
    }

    fn config(port: u16) -> EmailConfig {
        EmailConfig {
            from: "monitor@example.test".into(),
            password: "hunter2".into(),
            host: "127.0.0.1".into(),
            port,
            to: vec!["ops@example.test".into(), "oncall@example.test".into()],
            use_tls: false,
            starttls: false,
        }
    }

    /// Fake SMTP server offering LOGIN auth; forwards every client line
    async fn fake_smtp() -> (u16, mpsc::UnboundedReceiver<String>) {
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let port = listener.local_addr().unwrap().port();
        let (tx, rx) = mpsc::unbounded_channel();

        tokio::spawn(async move {
            while let Ok((stream, _)) = listener.accept().await {
                let tx = tx.clone();
                tokio::spawn(async move {
                    let (read, mut write) = stream.into_split();
                    let mut lines = BufReader::new(read).lines();
                    let _ = write.write_all(b"220 fake.example.test ESMTP\r\n").await;

                    let mut in_data = false;
                    let mut auth_step = 0;
                    while let Ok(Some(line)) = lines.next_line().await {
                        let _ = tx.send(line.clone());
                        let reply: &[u8] = if in_data {
                            if line == "." {
                                in_data = false;
                                b"250 2.0.0 queued\r\n"
                            } else {
                                continue;
                            }
                        } else if auth_step == 1 {
                            auth_step = 2;
                            // base64("Password:")
                            b"334 UGFzc3dvcmQ6\r\n"
                        } else if auth_step == 2 {
                            auth_step = 0;
                            b"235 2.7.0 authenticated\r\n"
                        } else {
                            let verb = line.to_ascii_uppercase();
                            if verb.starts_with("EHLO") {
                                b"250-fake.example.test\r\n250 AUTH LOGIN\r\n"
                            } else if verb.starts_with("AUTH LOGIN") {
                                auth_step = 1;
                                // base64("Username:")
                                b"334 VXNlcm5hbWU6\r\n"
                            } else if verb.starts_with("DATA") {
                                in_data = true;
                                b"354 end with <CRLF>.<CRLF>\r\n"
                            } else if verb.starts_with("QUIT") {
                                let _ = write.write_all(b"221 bye\r\n").await;
                                break;
                            } else {
                                b"250 ok\r\n"
                            }
                        };
                        let _ = write.write_all(reply).await;
                    }
                });
            }
        });

        (port, rx)
    }

    /// Collect client lines up to the end of the message body
    async fn transcript(lines: &mut mpsc::UnboundedReceiver<String>) -> Vec<String> {
        let mut seen = Vec::new();
        while let Some(line) = lines.recv().await {
            let done = line == ".";
            seen.push(line);
            if done {
                break;
            }
        }
        seen
    }

    #[tokio::test]
    async fn test_sends_alert_to_every_recipient() {
        let (port, mut lines) = fake_smtp().await;
        let notifier = EmailNotifier::new(&config(port), Duration::from_secs(5), NotificationKind::Alert).unwrap();
        let result = CheckResult::new(target(), Utc::now()).failed("connection refused", Duration::from_millis(7));

        notifier.notify(&target(), &result).await.unwrap();

        let seen = transcript(&mut lines).await;
        assert!(seen.iter().any(|l| l.eq_ignore_ascii_case("AUTH LOGIN")));
        assert!(seen.iter().any(|l| l == "MAIL FROM:<monitor@example.test>"));
        assert!(seen.iter().any(|l| l == "RCPT TO:<ops@example.test>"));
        assert!(seen.iter().any(|l| l == "RCPT TO:<oncall@example.test>"));
        assert!(seen.iter().any(|l| l == "Subject: Health Check Alert: https://api.example.test/health is DOWN"));
        assert!(seen.iter().any(|l| l == "- Error: connection refused"));
    }

    #[tokio::test]
    async fn test_unreachable_server_is_an_error() {
        let port = {
            let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
            listener.local_addr().unwrap().port()
        };
        let notifier = EmailNotifier::new(&config(port), Duration::from_secs(2), NotificationKind::Resolve).unwrap();
        let result = CheckResult::new(target(), Utc::now()).responded(200, Duration::from_millis(7));

        let err = notifier.notify(&target(), &result).await.unwrap_err();
        assert!(matches!(err, NotifyError::Smtp(_)));
    }

    #[test]
    fn test_rejects_bad_addresses() {
        let mut bad = config(25);
        bad.to = vec!["not an address".into()];
        let err = EmailNotifier::new(&bad, Duration::from_secs(1), NotificationKind::Alert).err().unwrap();
        assert!(matches!(err, NotifyError::Address(_)));
    }

    #[test]
    fn test_email_format() {
        let failed = CheckResult::new(target(), Utc::now()).responded(503, Duration::from_millis(40));

        let (subject, body) = format_email(NotificationKind::Alert, &target(), &failed);
        assert_eq!(subject, "Health Check Alert: https://api.example.test/health is DOWN");
        assert!(body.starts_with("Health Check Failed for https://api.example.test/health\n\nDetails:\n"));
        assert!(body.contains("- Target ID: api\n"));
        assert!(body.contains("- Status Code: 503\n"));
        assert!(!body.contains("- Error:"));

        let recovered = CheckResult::new(target(), Utc::now()).responded(200, Duration::from_millis(40));
        let (subject, body) = format_email(NotificationKind::Resolve, &target(), &recovered);
        assert_eq!(subject, "Health Check Resolved: https://api.example.test/health is UP");
        assert!(body.ends_with("- Status: RESOLVED\n"));
    }
}
