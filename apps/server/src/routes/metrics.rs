use actix_web::{HttpResponse, get, web};
use healthwatch::HealthService;

macros_utils::routes! {
    route metrics_route,
}

#[get("/metrics")]
pub async fn metrics_route(service: web::Data<HealthService>) -> HttpResponse {
    HttpResponse::Ok()
        .content_type("text/plain; version=0.0.4; charset=utf-8")
        .body(service.metrics().render_prometheus())
}
