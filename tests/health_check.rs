//! Integration tests for the liveness endpoint

use std::net::TcpListener;
use std::sync::Arc;

use chirpy::auth::{AuthService, MIN_BCRYPT_COST};
use chirpy::clock::SystemClock;
use chirpy::configuration::AuthSettings;
use chirpy::startup::run;
use chirpy::store::InMemoryStore;

fn spawn_app() -> String {
    let listener = TcpListener::bind("127.0.0.1:0").expect("Failed to bind random port");
    let port = listener.local_addr().unwrap().port();

    let settings = AuthSettings {
        secret: "health-check-secret".to_string(),
        access_token_ttl_seconds: 3600,
        refresh_token_ttl_seconds: 60,
        bcrypt_cost: MIN_BCRYPT_COST,
    };
    let auth = AuthService::new(Arc::new(InMemoryStore::new()), &settings, Arc::new(SystemClock));
    let server = run(listener, auth).expect("Failed to create server");

    let _ = tokio::spawn(server);

    format!("http://127.0.0.1:{}", port)
}

#[tokio::test]
async fn health_check_works() {
    let addr = spawn_app();

    let response = reqwest::Client::new()
        .get(&format!("{}/api/healthz", addr))
        .send()
        .await
        .expect("Failed to execute request");

    assert!(response.status().is_success());
    assert_eq!(response.text().await.unwrap(), "OK");
}

#[tokio::test]
async fn unknown_route_returns_404() {
    let addr = spawn_app();

    let response = reqwest::Client::new()
        .get(&format!("{}/api/nothing-here", addr))
        .send()
        .await
        .expect("Failed to execute request");

    assert_eq!(404, response.status().as_u16());
}
