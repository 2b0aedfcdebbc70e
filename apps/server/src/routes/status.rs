use actix_web::{HttpResponse, get, web};
use healthwatch::HealthService;

use crate::views::ResultView;

macros_utils::routes! {
    route status_route,
}

/// Probe every registered target concurrently; results keep registry order
#[get("/status")]
pub async fn status_route(service: web::Data<HealthService>) -> HttpResponse {
    let results: Vec<ResultView> = service.check_all().await.into_iter().map(ResultView::from).collect();
    HttpResponse::Ok().json(results)
}
