use std::env::var;
use std::str::FromStr;

use tracing::level_filters::LevelFilter;
use tracing_subscriber::{Layer, filter::EnvFilter, layer::SubscriberExt, util::SubscriberInitExt};

/// Output format of the log layer
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum LogFormat {
    /// Human readable, one line per event, no timestamps
    #[default]
    Compact,
    /// One JSON object per event
    Json,
}

impl FromStr for LogFormat {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "" | "compact" => Ok(Self::Compact),
            "json" => Ok(Self::Json),
            other => Err(format!("unknown log format '{other}'")),
        }
    }
}

/// Install the global subscriber at INFO
///
/// `format` wins over `RUST_LOG_FORMAT`; `RUST_LOG` overrides the level.
/// Calling this more than once is harmless.
pub fn init_tracing(format: Option<LogFormat>) -> LogFormat {
    init_tracing_with_level(format, LevelFilter::INFO)
}

/// Install the global subscriber with a custom default level
pub fn init_tracing_with_level(format: Option<LogFormat>, level: LevelFilter) -> LogFormat {
    let format = format.unwrap_or_else(format_from_env);
    let env_filter = EnvFilter::builder().with_default_directive(level.into()).from_env_lossy();

    let log_layer = match format {
        LogFormat::Json => tracing_subscriber::fmt::layer().json().with_filter(env_filter).boxed(),
        LogFormat::Compact => tracing_subscriber::fmt::layer()
            .compact()
            .without_time()
            .with_filter(env_filter)
            .boxed(),
    };

    // Fails only when a global subscriber is already set
    let _ = tracing_subscriber::registry().with(log_layer).try_init();
    format
}

fn format_from_env() -> LogFormat {
    var("RUST_LOG_FORMAT").ok().and_then(|raw| raw.parse().ok()).unwrap_or_default()
}
