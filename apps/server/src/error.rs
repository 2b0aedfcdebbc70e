use std::io::Error as IoError;

use actix_web::http::StatusCode;
use actix_web::{HttpResponse, ResponseError};
use healthwatch::config::ConfigError;
use healthwatch::{RegistryError, ServiceError};
use serde::Serialize;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum AppError {
    #[error("{0:#}")]
    Io(#[from] IoError),
    #[error("Address parsing error: {0}")]
    AddrParse(#[from] std::net::AddrParseError),
    #[error("Configuration error: {0}")]
    Config(#[from] ConfigError),
    #[error("Startup error: {0}")]
    Service(#[from] ServiceError),
}

/// Client-facing error with a stable machine-readable code
#[derive(Debug, Error)]
#[error("{code}: {message}")]
pub struct ApiError {
    status: StatusCode,
    code: &'static str,
    message: String,
}

#[derive(Serialize)]
struct ErrorBody<'a> {
    code: &'a str,
    message: &'a str,
}

impl ApiError {
    fn new(status: StatusCode, code: &'static str, message: impl Into<String>) -> Self {
        Self { status, code, message: message.into() }
    }

    pub fn parse_json_body(message: impl Into<String>) -> Self {
        Self::new(StatusCode::BAD_REQUEST, "parse_json_body", message)
    }

    pub fn state_not_found(id: &str) -> Self {
        Self::new(StatusCode::NOT_FOUND, "state_not_found", format!("no results recorded for '{id}' yet"))
    }

    /// Map a registry error raised while registering a target
    pub fn adding_target(err: RegistryError) -> Self {
        Self::from_registry(err, "adding_target")
    }

    /// Map a registry error raised while unregistering a target
    pub fn removing_target(err: RegistryError) -> Self {
        Self::from_registry(err, "removing_target")
    }

    pub fn code(&self) -> &'static str {
        self.code
    }

    fn from_registry(err: RegistryError, persistence_code: &'static str) -> Self {
        match &err {
            RegistryError::InvalidUrl { .. } => {
                Self::new(StatusCode::BAD_REQUEST, "invalid_url", err.to_string())
            }
            RegistryError::InvalidId { .. } => {
                Self::new(StatusCode::BAD_REQUEST, "invalid_id", err.to_string())
            }
            RegistryError::NotFound(_) => {
                Self::new(StatusCode::NOT_FOUND, "target_not_found", err.to_string())
            }
            RegistryError::Persistence(_) => {
                Self::new(StatusCode::INTERNAL_SERVER_ERROR, persistence_code, err.to_string())
            }
        }
    }
}

impl From<RegistryError> for ApiError {
    fn from(err: RegistryError) -> Self {
        Self::from_registry(err, "persistence_error")
    }
}

impl ResponseError for ApiError {
    fn status_code(&self) -> StatusCode {
        self.status
    }

    fn error_response(&self) -> HttpResponse {
        HttpResponse::build(self.status).json(ErrorBody { code: self.code, message: &self.message })
    }
}
