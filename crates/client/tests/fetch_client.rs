//! Integration tests for FetchClient and the worker running on top of it.
//!
//! Uses wiremock for HTTP mocking. Covers response classification, status
//! passthrough, body limits, and an install → fetch round against a live socket.

use std::sync::Arc;
use std::time::Duration;

use swcache_client::{
    FetchClient, FetchConfig, FetchOutcome, Network, OfflineWorker, Request, ResponseType, WorkerConfig,
};
use swcache_core::{CacheDb, Error};
use url::Url;
use wiremock::matchers::{method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

fn client_for(server: &MockServer, config: FetchConfig) -> FetchClient {
    FetchClient::new(config, Url::parse(&server.uri()).unwrap()).expect("failed to create client")
}

fn url(server: &MockServer, p: &str) -> Url {
    Url::parse(&format!("{}{}", server.uri(), p)).unwrap()
}

#[tokio::test]
async fn test_same_origin_response_is_basic() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/app/index.html"))
        .respond_with(
            ResponseTemplate::new(200)
                .set_body_string("<html>shell</html>")
                .insert_header("content-type", "text/html"),
        )
        .mount(&server)
        .await;

    let client = client_for(&server, FetchConfig::default());
    let response = client
        .fetch(&Request::get(url(&server, "/app/index.html")))
        .await
        .expect("fetch failed");

    assert_eq!(response.status.as_u16(), 200);
    assert_eq!(response.response_type, ResponseType::Basic);
    assert_eq!(response.content_type(), Some("text/html"));
    assert_eq!(&response.body[..], b"<html>shell</html>");
    assert!(response.is_cacheable());
}

#[tokio::test]
async fn test_error_status_is_a_response() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/app/missing.png"))
        .respond_with(ResponseTemplate::new(404))
        .mount(&server)
        .await;

    let client = client_for(&server, FetchConfig::default());
    let response = client
        .fetch(&Request::get(url(&server, "/app/missing.png")))
        .await
        .expect("404 should not be an error");

    assert_eq!(response.status.as_u16(), 404);
    assert!(!response.is_cacheable());
}

#[tokio::test]
async fn test_cross_origin_classification() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/tailwind.css"))
        .respond_with(ResponseTemplate::new(200).set_body_string("body{}"))
        .mount(&server)
        .await;
    Mock::given(method("GET"))
        .and(path("/cors.css"))
        .respond_with(
            ResponseTemplate::new(200)
                .set_body_string("body{}")
                .insert_header("access-control-allow-origin", "*"),
        )
        .mount(&server)
        .await;

    let client = FetchClient::new(FetchConfig::default(), Url::parse("https://labels.example/").unwrap()).unwrap();

    let opaque = client.fetch(&Request::get(url(&server, "/tailwind.css"))).await.unwrap();
    assert_eq!(opaque.response_type, ResponseType::Opaque);
    assert!(!opaque.is_cacheable());

    let cors = client.fetch(&Request::get(url(&server, "/cors.css"))).await.unwrap();
    assert_eq!(cors.response_type, ResponseType::Cors);
}

#[tokio::test]
async fn test_body_too_large() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/big.bin"))
        .respond_with(ResponseTemplate::new(200).set_body_bytes(vec![0u8; 2048]))
        .mount(&server)
        .await;

    let client = client_for(&server, FetchConfig { max_bytes: 1024, ..Default::default() });
    let result = client.fetch(&Request::get(url(&server, "/big.bin"))).await;

    assert!(matches!(result, Err(Error::NetworkFetch(msg)) if msg.contains("exceeds")));
}

#[tokio::test]
async fn test_timeout_is_network_error() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/slow"))
        .respond_with(ResponseTemplate::new(200).set_delay(Duration::from_millis(500)))
        .mount(&server)
        .await;

    let client = client_for(&server, FetchConfig { timeout: Duration::from_millis(100), ..Default::default() });
    let result = client.fetch(&Request::get(url(&server, "/slow"))).await;

    assert!(matches!(result, Err(Error::NetworkFetch(_))));
}

#[tokio::test]
async fn test_worker_over_http() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/app/index.html"))
        .respond_with(ResponseTemplate::new(200).set_body_string("<html>shell</html>"))
        .expect(1)
        .mount(&server)
        .await;
    Mock::given(method("GET"))
        .and(path("/app/manifest.json"))
        .respond_with(ResponseTemplate::new(200).set_body_string("{}"))
        .expect(1)
        .mount(&server)
        .await;

    let scope = url(&server, "/app/");
    let config = WorkerConfig::new("etiquetadora-v1.0.0", scope, &["./index.html", "./manifest.json"], "./index.html")
        .unwrap();
    let network = Arc::new(client_for(&server, FetchConfig::default()));
    let db = CacheDb::open_in_memory().await.unwrap();
    let worker = OfflineWorker::new(config, db.clone(), network);

    assert_eq!(worker.on_install().await.unwrap(), 2);
    worker.on_activate().await.unwrap();

    let cached = worker.on_fetch(&Request::get(url(&server, "/app/index.html"))).await.unwrap();
    assert!(matches!(cached, FetchOutcome::Cache(_)));

    let navigation = Request::navigate(url(&server, "/app/labels/42"));
    match worker.on_fetch(&navigation).await.unwrap() {
        FetchOutcome::Network(response) => assert_eq!(response.status.as_u16(), 404),
        other => panic!("expected live 404, got {}", other.source()),
    }
    assert_eq!(db.keys("etiquetadora-v1.0.0").await.unwrap().len(), 2);
}
