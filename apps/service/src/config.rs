use std::path::PathBuf;
use std::time::Duration;
use std::{env, fmt, fs, path};

use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::validation::{
    validate_failure_threshold, validate_interval, validate_timeout, ValidationResult,
};

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("failed to read config {path}: {source}")]
    ReadFailed { path: PathBuf, source: std::io::Error },
    #[error("failed to write config {path}: {source}")]
    WriteFailed { path: PathBuf, source: std::io::Error },
    #[error("failed to parse config: {0}")]
    ParseFailed(#[from] toml::de::Error),
    #[error("failed to serialize config: {0}")]
    SerializeFailed(#[from] toml::ser::Error),
    #[error("no config path available, set XDG_CONFIG_HOME or HOME")]
    ConfigPathUnavailable,
    #[error("invalid config: {0}")]
    Invalid(String),
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    /// Targets registered at start-up, after any stored ones are loaded
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub targets: Vec<TargetSeed>,
    pub monitor: MonitorSettings,
    pub server: ServerSettings,
    pub storage: StorageSettings,
    pub logging: LoggingSettings,
    pub notify: NotifyConfig,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TargetSeed {
    pub id: String,
    pub url: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct MonitorSettings {
    pub check_interval_seconds: u64,
    pub check_timeout_seconds: u64,
    /// Consecutive unhealthy results needed before an alert fires
    pub failure_threshold: u32,
    /// Cap on simultaneous probes within a cycle, unbounded when unset
    #[serde(skip_serializing_if = "Option::is_none")]
    pub max_concurrent_probes: Option<usize>,
}

impl Default for MonitorSettings {
    fn default() -> Self {
        Self {
            check_interval_seconds: 30,
            check_timeout_seconds: 10,
            failure_threshold: 2,
            max_concurrent_probes: None,
        }
    }
}

impl MonitorSettings {
    pub fn check_interval(&self) -> Duration {
        Duration::from_secs(self.check_interval_seconds)
    }

    pub fn check_timeout(&self) -> Duration {
        Duration::from_secs(self.check_timeout_seconds)
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ServerSettings {
    pub bind: String,
    pub port: u16,
}

impl Default for ServerSettings {
    fn default() -> Self {
        Self { bind: "0.0.0.0".into(), port: 8080 }
    }
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct StorageSettings {
    /// JSON file the registry is persisted to, in-memory only when unset
    #[serde(skip_serializing_if = "Option::is_none")]
    pub targets_file: Option<PathBuf>,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum LogFormat {
    #[default]
    Compact,
    Json,
}

impl fmt::Display for LogFormat {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            LogFormat::Compact => write!(f, "compact"),
            LogFormat::Json => write!(f, "json"),
        }
    }
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct LoggingSettings {
    /// Falls back to `RUST_LOG_FORMAT` when unset
    #[serde(skip_serializing_if = "Option::is_none")]
    pub format: Option<LogFormat>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct NotifyConfig {
    pub log: LogNotifierConfig,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub email: Option<EmailConfig>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub telegram: Option<TelegramConfig>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct LogNotifierConfig {
    pub enabled: bool,
}

impl Default for LogNotifierConfig {
    fn default() -> Self {
        Self { enabled: true }
    }
}

/// SMTP settings; `from` doubles as the LOGIN username
#[derive(Clone, Serialize, Deserialize)]
pub struct EmailConfig {
    pub from: String,
    pub password: String,
    pub host: String,
    #[serde(default = "default_smtp_port")]
    pub port: u16,
    pub to: Vec<String>,
    /// Implicit TLS from the first byte, takes precedence over `starttls`
    #[serde(default)]
    pub use_tls: bool,
    #[serde(default)]
    pub starttls: bool,
}

fn default_smtp_port() -> u16 {
    587
}

impl fmt::Debug for EmailConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("EmailConfig")
            .field("from", &self.from)
            .field("password", &"<redacted>")
            .field("host", &self.host)
            .field("port", &self.port)
            .field("to", &self.to)
            .field("use_tls", &self.use_tls)
            .field("starttls", &self.starttls)
            .finish()
    }
}

#[derive(Clone, Serialize, Deserialize)]
pub struct TelegramConfig {
    pub bot_token: String,
    pub chat_id: i64,
    /// Minimum gap between two alerts for the same target
    #[serde(default)]
    pub throttle_seconds: u64,
    #[serde(default = "default_telegram_api")]
    pub api_base: String,
}

fn default_telegram_api() -> String {
    "https://api.telegram.org".into()
}

impl fmt::Debug for TelegramConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("TelegramConfig")
            .field("bot_token", &"<redacted>")
            .field("chat_id", &self.chat_id)
            .field("throttle_seconds", &self.throttle_seconds)
            .field("api_base", &self.api_base)
            .finish()
    }
}

/// Used to ensure we are actually reading a toml file
fn normalize_toml_path(path: &path::Path) -> path::PathBuf {
    let mut path = path.to_path_buf();
    if path.extension().map(|ext| ext != "toml").unwrap_or(true) {
        path.set_extension("toml");
    }
    path
}

/// Get default config path ($XDG_CONFIG_HOME/healthwatch/config.toml or
/// $HOME/.config/...)
fn default_config_path() -> Result<path::PathBuf, ConfigError> {
    let path = if let Ok(config_home) = env::var("XDG_CONFIG_HOME") {
        path::PathBuf::from(config_home)
    } else if let Some(home_dir) = env::home_dir() {
        home_dir.join(".config")
    } else {
        return Err(ConfigError::ConfigPathUnavailable);
    };

    Ok(path.join("healthwatch/config.toml"))
}

impl fmt::Display for Config {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let write_indented = |level: usize| {
            move |f: &mut fmt::Formatter<'_>, label: &str, value: &dyn fmt::Display| {
                writeln!(f, "  {:indent$}{}: {}", "", label, value, indent = level * 2)
            }
        };
        let write_title_indented = |level: usize| {
            move |f: &mut fmt::Formatter<'_>, label: &str| {
                writeln!(f, "{:indent$}{}", "", label, indent = level * 2)
            }
        };

        let write_title_1 = write_title_indented(1);
        let write_1 = write_indented(1);
        let unset = |value: Option<String>| value.unwrap_or_else(|| "unset".into());

        writeln!(f, "Current Internal Configuration State:")?;
        write_title_1(f, "Monitor")?;
        write_1(f, "Interval (s)", &self.monitor.check_interval_seconds)?;
        write_1(f, "Timeout (s)", &self.monitor.check_timeout_seconds)?;
        write_1(f, "Failure Threshold", &self.monitor.failure_threshold)?;
        write_1(
            f,
            "Max Concurrent Probes",
            &unset(self.monitor.max_concurrent_probes.map(|n| n.to_string())),
        )?;
        write_title_1(f, "Server")?;
        write_1(f, "Bind Address", &self.server.bind)?;
        write_1(f, "Port", &self.server.port)?;
        write_title_1(f, "Storage")?;
        write_1(
            f,
            "Targets File",
            &unset(self.storage.targets_file.as_ref().map(|p| p.display().to_string())),
        )?;
        write_title_1(f, "Logging")?;
        write_1(f, "Format", &unset(self.logging.format.map(|fmt| fmt.to_string())))?;
        write_title_1(f, "Notify")?;
        write_1(f, "Log", &self.notify.log.enabled)?;
        write_1(f, "Email", &self.notify.email.is_some())?;
        write_1(f, "Telegram", &self.notify.telegram.is_some())?;
        write_title_1(f, "Seed Targets")?;
        for seed in &self.targets {
            write_1(f, &seed.id, &seed.url)?;
        }

        Ok(())
    }
}

impl Config {
    /// Generate Config structure from file
    ///
    /// Creates a default config in ~/.config/healthwatch/config.toml
    ///  or the specified path, with the name config.toml if one does not exist
    ///
    /// ```no_run
    /// use healthwatch::config::Config;
    ///
    /// let cfg = Config::from_config(None::<&std::path::Path>)?;
    /// println!("{}", cfg);
    /// # Ok::<(), healthwatch::config::ConfigError>(())
    /// ```
    pub fn from_config(optional_path: Option<impl AsRef<path::Path>>) -> Result<Self, ConfigError> {
        let config_path: path::PathBuf = if let Some(path) = optional_path {
            normalize_toml_path(path.as_ref())
        } else {
            default_config_path()?
        };

        let config = if config_path.exists() {
            let raw_string = fs::read_to_string(&config_path)
                .map_err(|source| ConfigError::ReadFailed { path: config_path.clone(), source })?;
            Self::from_toml(&raw_string)?
        } else {
            let config = Self::default();
            config.write_config(&config_path)?;
            config
        };

        config.validate()?;
        Ok(config)
    }

    pub fn from_toml(raw: &str) -> Result<Self, ConfigError> {
        Ok(toml::from_str(raw)?)
    }

    /// Serialize and write a config to a file
    pub fn write_config(&self, path: &std::path::Path) -> Result<(), ConfigError> {
        let config_str: String = toml::to_string_pretty(self)?;

        let write_err = |source| ConfigError::WriteFailed { path: path.to_path_buf(), source };

        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent).map_err(write_err)?;
        }

        std::fs::write(path, config_str).map_err(write_err)
    }

    /// Reject settings the monitor cannot run with
    pub fn validate(&self) -> Result<(), ConfigError> {
        let monitor = &self.monitor;
        let checks = [
            validate_interval(monitor.check_interval_seconds),
            validate_timeout(monitor.check_timeout_seconds),
            validate_failure_threshold(monitor.failure_threshold),
            match monitor.max_concurrent_probes {
                Some(0) => ValidationResult::err("max_concurrent_probes must be at least 1"),
                _ => ValidationResult::ok(),
            },
            match &self.notify.email {
                Some(email) if email.to.is_empty() => {
                    ValidationResult::err("notify.email needs at least one recipient")
                }
                _ => ValidationResult::ok(),
            },
        ];

        checks.into_iter().try_for_each(|check| check.into_result().map_err(ConfigError::Invalid))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;

    #[test]
    fn test_defaults() {
        let config = Config::default();
        assert_eq!(config.monitor.check_interval(), Duration::from_secs(30));
        assert_eq!(config.monitor.check_timeout(), Duration::from_secs(10));
        assert_eq!(config.monitor.failure_threshold, 2);
        assert!(config.notify.log.enabled);
        assert!(config.notify.telegram.is_none());
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_parse_full_file() {
        let config = Config::from_toml(
            r#"
            [[targets]]
            id = "api"
            url = "https://api.example.test/health"

            [monitor]
            check_interval_seconds = 15
            check_timeout_seconds = 5
            failure_threshold = 3
            max_concurrent_probes = 16

            [storage]
            targets_file = "/var/lib/healthwatch/targets.json"

            [logging]
            format = "json"

            [notify.email]
            from = "monitor@example.test"
            password = "smtp-secret"
            host = "smtp.example.test"
            to = ["ops@example.test", "oncall@example.test"]
            starttls = true

            [notify.telegram]
            bot_token = "123:abc"
            chat_id = -100
            throttle_seconds = 60
            "#,
        )
        .unwrap();

        assert_eq!(config.targets, vec![TargetSeed {
            id: "api".into(),
            url: "https://api.example.test/health".into()
        }]);
        assert_eq!(config.monitor.failure_threshold, 3);
        assert_eq!(config.monitor.max_concurrent_probes, Some(16));
        assert_eq!(config.server.port, 8080);
        assert_eq!(config.logging.format, Some(LogFormat::Json));
        let email = config.notify.email.unwrap();
        assert_eq!(email.port, 587);
        assert_eq!(email.to.len(), 2);
        assert!(email.starttls && !email.use_tls);
        assert!(!format!("{email:?}").contains("smtp-secret"));
        let telegram = config.notify.telegram.unwrap();
        assert_eq!(telegram.chat_id, -100);
        assert_eq!(telegram.api_base, "https://api.telegram.org");
        assert!(!format!("{telegram:?}").contains("123:abc"));
    }

    #[test]
    fn test_validate_rejects_unusable_settings() {
        let mut config = Config::default();
        config.monitor.failure_threshold = 0;
        assert!(matches!(config.validate(), Err(ConfigError::Invalid(_))));

        let mut config = Config::default();
        config.monitor.max_concurrent_probes = Some(0);
        assert!(matches!(config.validate(), Err(ConfigError::Invalid(_))));

        let mut config = Config::default();
        config.monitor.check_timeout_seconds = 0;
        assert!(matches!(config.validate(), Err(ConfigError::Invalid(_))));

        // A probe may outlive the interval, the next cycle then starts late
        let mut config = Config::default();
        config.monitor.check_timeout_seconds = 60;
        assert!(config.validate().is_ok());

        let mut config = Config::default();
        config.notify.email = Some(EmailConfig {
            from: "monitor@example.test".into(),
            password: String::new(),
            host: "smtp.example.test".into(),
            port: 587,
            to: Vec::new(),
            use_tls: false,
            starttls: true,
        });
        assert!(matches!(config.validate(), Err(ConfigError::Invalid(_))));
    }

    #[test]
    fn test_missing_file_writes_defaults() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("conf/healthwatch");

        let config = Config::from_config(Some(&path)).unwrap();
        assert_eq!(config.monitor.check_interval_seconds, 30);

        let written = dir.path().join("conf/healthwatch.toml");
        assert!(written.exists());
        let reloaded = Config::from_config(Some(&written)).unwrap();
        assert_eq!(reloaded.server.port, config.server.port);
    }

    #[test]
    fn test_display_lists_sections() {
        let rendered = Config::default().to_string();
        assert!(rendered.contains("Monitor"));
        assert!(rendered.contains("Failure Threshold: 2"));
        assert!(rendered.contains("Targets File: unset"));
    }
}
