use thiserror::Error;
use url::Url;

/// Upper bound on target identifiers, they end up in URLs and metric labels
const MAX_TARGET_ID_LEN: usize = 100;

/// Validation results with specific error messages
#[derive(Debug, Clone)]
pub struct ValidationResult {
    pub is_valid: bool,
    pub error: Option<String>,
}

impl ValidationResult {
    pub fn ok() -> Self {
        Self { is_valid: true, error: None }
    }

    pub fn err(msg: impl Into<String>) -> Self {
        Self { is_valid: false, error: Some(msg.into()) }
    }

    /// Convert into a `Result`, carrying the message on failure
    pub fn into_result(self) -> Result<(), String> {
        if self.is_valid {
            Ok(())
        } else {
            Err(self.error.unwrap_or_else(|| "Validation failed".to_string()))
        }
    }
}

/// Why a target URL was rejected
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum UrlRejection {
    #[error("target cannot be empty")]
    Empty,
    #[error("URL must include scheme (http:// or https://)")]
    MissingScheme,
    #[error("invalid scheme '{0}', must be http or https")]
    UnsupportedScheme(String),
    #[error("URL must have a valid host")]
    MissingHost,
    #[error("invalid URL: {0}")]
    Malformed(#[from] url::ParseError),
}

/// Parse and validate an absolute HTTP/HTTPS endpoint
pub fn validate_http_endpoint(target: &str) -> Result<Url, UrlRejection> {
    let target = target.trim();
    if target.is_empty() {
        return Err(UrlRejection::Empty);
    }

    match Url::parse(target) {
        Ok(url) => {
            let scheme = url.scheme();
            if scheme != "http" && scheme != "https" {
                return Err(UrlRejection::UnsupportedScheme(scheme.to_string()));
            }

            if url.host_str().is_none_or(str::is_empty) {
                return Err(UrlRejection::MissingHost);
            }

            Ok(url)
        }
        // "example.com/health" parses as a relative reference
        Err(url::ParseError::RelativeUrlWithoutBase) => Err(UrlRejection::MissingScheme),
        Err(e) => {
            if !target.contains("://") {
                Err(UrlRejection::MissingScheme)
            } else {
                Err(UrlRejection::Malformed(e))
            }
        }
    }
}

/// Validate a target identifier
pub fn validate_target_id(id: &str) -> ValidationResult {
    let trimmed = id.trim();

    if trimmed.is_empty() {
        return ValidationResult::err("Target id cannot be empty");
    }

    if trimmed.len() != id.len() {
        return ValidationResult::err("Target id cannot start or end with whitespace");
    }

    if id.chars().count() > MAX_TARGET_ID_LEN {
        return ValidationResult::err(format!(
            "Target id too long (max {MAX_TARGET_ID_LEN} characters)"
        ));
    }

    if id.contains('/') {
        return ValidationResult::err("Target id cannot contain '/'");
    }

    ValidationResult::ok()
}

/// Validate the cycle interval
pub fn validate_interval(interval: u64) -> ValidationResult {
    if interval == 0 {
        return ValidationResult::err("Interval must be at least 1 second");
    }

    ValidationResult::ok()
}

/// Validate the per-probe timeout
///
/// A timeout longer than the interval is allowed; the next cycle just starts late.
pub fn validate_timeout(timeout: u64) -> ValidationResult {
    if timeout == 0 {
        return ValidationResult::err("Timeout must be at least 1 second");
    }

    ValidationResult::ok()
}

/// Validate the consecutive-failure threshold
pub fn validate_failure_threshold(threshold: u32) -> ValidationResult {
    if threshold == 0 {
        return ValidationResult::err("Failure threshold must be at least 1");
    }

    ValidationResult::ok()
}
