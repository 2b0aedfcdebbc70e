use std::net::SocketAddr;

use actix_web::http::StatusCode;
use actix_web::{App, test, web};
use healthwatch::HealthService;
use healthwatch::config::Config;
use serde_json::{Value, json};
use tokio::io::{AsyncReadExt, AsyncWriteExt};
use tokio::net::TcpListener;

use super::{json_config, routes};

/// Answer every request on a fresh port with `status`
async fn stub_endpoint(status: &'static str) -> SocketAddr {
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    tokio::spawn(async move {
        while let Ok((mut stream, _)) = listener.accept().await {
            tokio::spawn(async move {
                let mut buf = [0u8; 1024];
                let _ = stream.read(&mut buf).await;
                let reply = format!("HTTP/1.1 {status}\r\ncontent-length: 0\r\nconnection: close\r\n\r\n");
                let _ = stream.write_all(reply.as_bytes()).await;
                let _ = stream.shutdown().await;
            });
        }
    });
    addr
}

/// Port that was bound a moment ago and is very likely closed now
async fn closed_port() -> SocketAddr {
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    listener.local_addr().unwrap()
}

async fn service() -> web::Data<HealthService> {
    web::Data::new(HealthService::from_config(&Config::default()).await.unwrap())
}

macro_rules! app {
    ($service:expr) => {
        test::init_service(App::new().app_data($service.clone()).app_data(json_config()).configure(routes)).await
    };
}

#[actix_web::test]
async fn test_health_has_no_content() {
    let service = service().await;
    let app = app!(service);

    let resp = test::call_service(&app, test::TestRequest::get().uri("/health").to_request()).await;
    assert_eq!(resp.status(), StatusCode::NO_CONTENT);
}

#[actix_web::test]
async fn test_register_then_list() {
    let service = service().await;
    let app = app!(service);

    let req = test::TestRequest::post()
        .uri("/targets")
        .set_json(json!({ "id": "api", "url": "https://api.example.test/health" }))
        .to_request();
    let resp = test::call_service(&app, req).await;
    assert_eq!(resp.status(), StatusCode::NO_CONTENT);

    let body: Value = test::call_and_read_body_json(&app, test::TestRequest::get().uri("/targets").to_request()).await;
    assert_eq!(body, json!([{ "id": "api", "url": "https://api.example.test/health" }]));
}

#[actix_web::test]
async fn test_register_rejects_bad_input() {
    let service = service().await;
    let app = app!(service);

    let req = test::TestRequest::post()
        .uri("/targets")
        .set_json(json!({ "id": "api", "url": "api.example.test" }))
        .to_request();
    let resp = test::call_service(&app, req).await;
    assert_eq!(resp.status(), StatusCode::BAD_REQUEST);
    let body: Value = test::read_body_json(resp).await;
    assert_eq!(body["code"], "invalid_url");

    let req = test::TestRequest::post()
        .uri("/targets")
        .insert_header(("content-type", "application/json"))
        .set_payload("{\"id\": ")
        .to_request();
    let resp = test::call_service(&app, req).await;
    assert_eq!(resp.status(), StatusCode::BAD_REQUEST);
    let body: Value = test::read_body_json(resp).await;
    assert_eq!(body["code"], "parse_json_body");

    assert!(service.targets().await.is_empty());
}

#[actix_web::test]
async fn test_unregister_is_idempotent() {
    let service = service().await;
    service.register("api", "https://api.example.test").await.unwrap();
    let app = app!(service);

    for _ in 0..2 {
        let resp = test::call_service(&app, test::TestRequest::delete().uri("/targets/api").to_request()).await;
        assert_eq!(resp.status(), StatusCode::NO_CONTENT);
    }
    assert!(service.targets().await.is_empty());
}

#[actix_web::test]
async fn test_status_reports_every_target_in_order() {
    let ok = stub_endpoint("200 OK").await;
    let down = closed_port().await;

    let service = service().await;
    service.register("a-ok", &format!("http://{ok}/")).await.unwrap();
    service.register("b-down", &format!("http://{down}/")).await.unwrap();
    let app = app!(service);

    let body: Value = test::call_and_read_body_json(&app, test::TestRequest::get().uri("/status").to_request()).await;
    let results = body.as_array().unwrap();
    assert_eq!(results.len(), 2);

    assert_eq!(results[0]["id"], "a-ok");
    assert_eq!(results[0]["status"], 200);
    assert_eq!(results[0]["healthy"], true);
    assert!(results[0].get("error").is_none());
    assert!(results[0]["duration_seconds"].as_f64().unwrap() >= 0.0);

    assert_eq!(results[1]["id"], "b-down");
    assert_eq!(results[1]["status"], 0);
    assert_eq!(results[1]["healthy"], false);
    assert!(results[1]["error"].as_str().unwrap().starts_with("HTTP request failed"));
}

#[actix_web::test]
async fn test_single_status() {
    let unavailable = stub_endpoint("503 Service Unavailable").await;

    let service = service().await;
    service.register("api", &format!("http://{unavailable}/health")).await.unwrap();
    let app = app!(service);

    let body: Value =
        test::call_and_read_body_json(&app, test::TestRequest::get().uri("/targets/api/status").to_request()).await;
    assert_eq!(body["status"], 503);
    assert_eq!(body["healthy"], false);

    let resp = test::call_service(&app, test::TestRequest::get().uri("/targets/missing/status").to_request()).await;
    assert_eq!(resp.status(), StatusCode::NOT_FOUND);
    let body: Value = test::read_body_json(resp).await;
    assert_eq!(body["code"], "target_not_found");
}

#[actix_web::test]
async fn test_state_follows_monitor_cycles() {
    let down = closed_port().await;

    let service = service().await;
    service.register("api", &format!("http://{down}/")).await.unwrap();
    let app = app!(service);

    let resp = test::call_service(&app, test::TestRequest::get().uri("/targets/api/state").to_request()).await;
    assert_eq!(resp.status(), StatusCode::NOT_FOUND);
    let body: Value = test::read_body_json(resp).await;
    assert_eq!(body["code"], "state_not_found");

    service.monitor().run_cycle().await;
    let body: Value =
        test::call_and_read_body_json(&app, test::TestRequest::get().uri("/targets/api/state").to_request()).await;
    assert_eq!(body["state"], "suspect");
    assert_eq!(body["consecutive_failures"], 1);
    assert_eq!(body["alerted"], false);

    service.monitor().run_cycle().await;
    let body: Value =
        test::call_and_read_body_json(&app, test::TestRequest::get().uri("/targets/api/state").to_request()).await;
    assert_eq!(body["state"], "down");
    assert_eq!(body["alerted"], true);
    assert_eq!(body["last_result"]["status"], 0);

    let resp = test::call_service(&app, test::TestRequest::get().uri("/targets/other/state").to_request()).await;
    assert_eq!(resp.status(), StatusCode::NOT_FOUND);
    let body: Value = test::read_body_json(resp).await;
    assert_eq!(body["code"], "target_not_found");
}

#[actix_web::test]
async fn test_metrics_exposition() {
    let service = service().await;
    service.register("api", "https://api.example.test").await.unwrap();
    let app = app!(service);

    let resp = test::call_service(&app, test::TestRequest::get().uri("/metrics").to_request()).await;
    assert_eq!(resp.status(), StatusCode::OK);
    let body = test::read_body(resp).await;
    let text = std::str::from_utf8(&body).unwrap();
    assert!(text.contains("healthwatch_registered_targets 1"), "unexpected body:\n{text}");
}
