use actix_web::{HttpResponse, delete, get, post, web};
use healthwatch::{HealthService, RegistryError};
use tracing::info;

use crate::error::ApiError;
use crate::views::{NewTarget, ResultView, StateView, TargetView};

macros_utils::routes! {
    route list_targets,
    route add_target,
    route remove_target,
    route target_status,
    route target_state,
}

#[get("/targets")]
pub async fn list_targets(service: web::Data<HealthService>) -> HttpResponse {
    let targets: Vec<TargetView> = service.targets().await.into_iter().map(TargetView::from).collect();
    HttpResponse::Ok().json(targets)
}

/// Register a target, replacing any existing target with the same id
#[post("/targets")]
pub async fn add_target(
    service: web::Data<HealthService>,
    body: web::Json<NewTarget>,
) -> Result<HttpResponse, ApiError> {
    let NewTarget { id, url } = body.into_inner();
    let target = service.register(&id, &url).await.map_err(ApiError::adding_target)?;

    info!(target_id = %target.id, url = %target.url, "Target registered");
    Ok(HttpResponse::NoContent().finish())
}

/// Unregistering an unknown id is not an error
#[delete("/targets/{id}")]
pub async fn remove_target(
    service: web::Data<HealthService>,
    id: web::Path<String>,
) -> Result<HttpResponse, ApiError> {
    let id = id.into_inner();
    service.unregister(&id).await.map_err(ApiError::removing_target)?;

    info!(target_id = %id, "Target unregistered");
    Ok(HttpResponse::NoContent().finish())
}

/// Probe one target right now, outside the monitoring cycle
#[get("/targets/{id}/status")]
pub async fn target_status(
    service: web::Data<HealthService>,
    id: web::Path<String>,
) -> Result<HttpResponse, ApiError> {
    let result = service.check_single(&id).await.map_err(ApiError::from)?;
    Ok(HttpResponse::Ok().json(ResultView::from(result)))
}

#[get("/targets/{id}/state")]
pub async fn target_state(
    service: web::Data<HealthService>,
    id: web::Path<String>,
) -> Result<HttpResponse, ApiError> {
    let id = id.into_inner();
    match service.state(&id).await {
        Some(state) => Ok(HttpResponse::Ok().json(StateView::new(id, state))),
        None if service.targets().await.iter().all(|t| t.id != id) => {
            Err(RegistryError::NotFound(id).into())
        }
        None => Err(ApiError::state_not_found(&id)),
    }
}
