use super::*;
use axum::body::Body;
use axum::http::Request;
use tower::ServiceExt;

use crate::state::test_helpers::test_app_state;

async fn send(request: Request<Body>) -> axum::response::Response {
    app(test_app_state()).oneshot(request).await.unwrap()
}

async fn json_body(response: axum::response::Response) -> serde_json::Value {
    let bytes = axum::body::to_bytes(response.into_body(), usize::MAX).await.unwrap();
    serde_json::from_slice(&bytes).unwrap()
}

#[tokio::test]
async fn healthz_is_ok() {
    let response = send(Request::get("/healthz").body(Body::empty()).unwrap()).await;
    assert_eq!(response.status(), StatusCode::OK);
}

#[tokio::test]
async fn protected_route_without_token_is_401() {
    let response = send(Request::get("/api/wallet").body(Body::empty()).unwrap()).await;
    assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
    let body = json_body(response).await;
    assert_eq!(body["error"], "E_UNAUTHORIZED");
}

#[tokio::test]
async fn admin_route_without_token_is_401() {
    let request = Request::post("/api/matches/00000000-0000-0000-0000-000000000000/distribute")
        .body(Body::empty())
        .unwrap();
    let response = send(request).await;
    assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
}

#[tokio::test]
async fn unknown_route_is_404() {
    let response = send(Request::get("/api/nope").body(Body::empty()).unwrap()).await;
    assert_eq!(response.status(), StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn cors_preflight_is_allowed() {
    let request = Request::builder()
        .method("OPTIONS")
        .uri("/api/matches")
        .header("origin", "https://admin.example.com")
        .header("access-control-request-method", "GET")
        .body(Body::empty())
        .unwrap();
    let response = send(request).await;
    assert!(response.status().is_success());
    assert_eq!(
        response.headers().get("access-control-allow-origin").and_then(|v| v.to_str().ok()),
        Some("*")
    );
}
