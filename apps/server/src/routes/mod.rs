use actix_web::web;

use crate::error::ApiError;

mod health;
mod metrics;
mod status;
mod targets;

#[cfg(test)]
mod tests;

macros_utils::routes! {
    load health,
    load targets,
    load status,
    load metrics,
}

/// JSON extractor settings; malformed bodies become `parse_json_body` errors
pub fn json_config() -> web::JsonConfig {
    web::JsonConfig::default()
        .limit(16 * 1024)
        .error_handler(|err, _req| ApiError::parse_json_body(err.to_string()).into())
}
