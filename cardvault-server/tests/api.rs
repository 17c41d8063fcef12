//! HTTP-level tests driving the router with `tower::ServiceExt::oneshot`

use std::sync::Arc;

use axum::{
    body::{to_bytes, Body},
    http::{header, Request, StatusCode},
    Router,
};
use serde_json::{json, Value};
use tempfile::TempDir;
use tower::ServiceExt;

use cardvault_core::adapters::LocalStore;
use cardvault_core::{EntryPoint, ExpiryPolicy, LoggingService};
use cardvault_server::{router, AppState};

fn app() -> Router {
    let store = LocalStore::in_memory(ExpiryPolicy::default()).unwrap();
    router(AppState::new(Arc::new(store)))
}

async fn send(app: &Router, method: &str, uri: &str, body: Option<Value>) -> (StatusCode, Value) {
    let builder = Request::builder().method(method).uri(uri);
    let request = match body {
        Some(body) => builder
            .header(header::CONTENT_TYPE, "application/json")
            .body(Body::from(body.to_string()))
            .unwrap(),
        None => builder.body(Body::empty()).unwrap(),
    };

    let response = app.clone().oneshot(request).await.unwrap();
    let status = response.status();
    let bytes = to_bytes(response.into_body(), usize::MAX).await.unwrap();
    let json = if bytes.is_empty() {
        Value::Null
    } else {
        serde_json::from_slice(&bytes).unwrap()
    };
    (status, json)
}

fn card_body() -> Value {
    json!({
        "cardNumber": "4111111111111111",
        "cardHolder": "Ana Lima",
        "expiryDate": "12/28",
        "cvv": "123"
    })
}

#[tokio::test]
async fn test_health() {
    let app = app();
    let (status, body) = send(&app, "GET", "/health", None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body, json!({ "status": "ok", "backend": "local" }));
}

#[tokio::test]
async fn test_card_crud() {
    let app = app();

    let (status, created) = send(&app, "POST", "/cards", Some(card_body())).await;
    assert_eq!(status, StatusCode::CREATED);
    let id = created["id"].as_str().unwrap().to_string();
    assert_eq!(created["cardHolder"], "Ana Lima");
    assert!(created["createdAt"].is_string());

    let (status, listed) = send(&app, "GET", "/cards", None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(listed.as_array().map(Vec::len), Some(1));

    let (status, updated) = send(
        &app,
        "PUT",
        &format!("/cards/{id}"),
        Some(json!({ "cardHolder": "Ana L", "expiryDate": "01/29" })),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(updated["cardHolder"], "Ana L");
    assert_eq!(updated["expiryDate"], "01/29");
    assert_eq!(updated["cvv"], "123");

    let (status, deleted) = send(&app, "DELETE", &format!("/cards/{id}"), None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(deleted["id"], id.as_str());

    let (status, body) = send(&app, "GET", &format!("/cards/{id}"), None).await;
    assert_eq!(status, StatusCode::NOT_FOUND);
    assert_eq!(body["error"], "Credit card not found");
}

#[tokio::test]
async fn test_missing_card_fields() {
    let app = app();
    let (status, body) = send(
        &app,
        "POST",
        "/cards",
        Some(json!({ "cardNumber": "4111111111111111", "cardHolder": "" })),
    )
    .await;

    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["error"], "Missing required fields");
    assert_eq!(
        body["required"],
        json!(["cardNumber", "cardHolder", "expiryDate", "cvv"])
    );
    assert_eq!(body["missing"], json!(["cardHolder", "expiryDate", "cvv"]));
}

#[tokio::test]
async fn test_bad_expiry_is_rejected() {
    let app = app();
    let mut body = card_body();
    body["expiryDate"] = json!("2028-12");

    let (status, error) = send(&app, "POST", "/cards", Some(body)).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(error["error"], "Invalid expiry date format. Expected MM/YY");

    let mut body = card_body();
    body["expiryDate"] = json!("12/20");
    let (status, error) = send(&app, "POST", "/cards", Some(body)).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(
        error["error"],
        "Invalid expiry date. Year cannot be earlier than 2025"
    );
}

#[tokio::test]
async fn test_malformed_json() {
    let app = app();
    let request = Request::builder()
        .method("POST")
        .uri("/cards")
        .header(header::CONTENT_TYPE, "application/json")
        .body(Body::from("{not json"))
        .unwrap();

    let response = app.oneshot(request).await.unwrap();
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    let bytes = to_bytes(response.into_body(), usize::MAX).await.unwrap();
    let body: Value = serde_json::from_slice(&bytes).unwrap();
    assert_eq!(body["error"], "Invalid JSON body");
}

#[tokio::test]
async fn test_user_with_cards() {
    let app = app();

    let (status, user) = send(
        &app,
        "POST",
        "/users",
        Some(json!({ "email": "ana@example.com", "name": "Ana" })),
    )
    .await;
    assert_eq!(status, StatusCode::CREATED);
    let user_id = user["id"].as_str().unwrap().to_string();

    let mut card = card_body();
    card["userId"] = json!(user_id);
    let (status, created) = send(&app, "POST", "/api/cards", Some(card)).await;
    assert_eq!(status, StatusCode::CREATED);
    assert_eq!(created["user"]["email"], "ana@example.com");

    let (_, expanded) = send(&app, "GET", &format!("/users/{user_id}?include=cards"), None).await;
    assert_eq!(expanded["creditCards"].as_array().map(Vec::len), Some(1));

    let (_, plain) = send(&app, "GET", &format!("/users/{user_id}"), None).await;
    assert!(plain.get("creditCards").is_none());

    let (_, owned) = send(
        &app,
        "GET",
        &format!("/cards?userId={user_id}&include=user"),
        None,
    )
    .await;
    assert_eq!(owned[0]["user"]["id"], user_id.as_str());

    let (status, _) = send(&app, "DELETE", &format!("/users/{user_id}"), None).await;
    assert_eq!(status, StatusCode::OK);
    let (_, cards) = send(&app, "GET", "/cards", None).await;
    assert_eq!(cards, json!([]));
}

#[tokio::test]
async fn test_user_errors() {
    let app = app();

    let (status, body) = send(&app, "POST", "/users", Some(json!({ "name": "Ana" }))).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["error"], "Email is required");

    send(&app, "POST", "/users", Some(json!({ "email": "ana@example.com" }))).await;
    let (status, body) = send(
        &app,
        "POST",
        "/users",
        Some(json!({ "email": "ana@example.com" })),
    )
    .await;
    assert_eq!(status, StatusCode::CONFLICT);
    assert_eq!(body["error"], "User with this email already exists");

    let (status, body) = send(&app, "GET", "/users/nope", None).await;
    assert_eq!(status, StatusCode::NOT_FOUND);
    assert_eq!(body["error"], "User not found");

    let mut card = card_body();
    card["userId"] = json!("nope");
    let (status, body) = send(&app, "POST", "/cards", Some(card)).await;
    assert_eq!(status, StatusCode::NOT_FOUND);
    assert_eq!(body["error"], "User not found");
}

#[tokio::test]
async fn test_method_not_allowed() {
    let app = app();
    let request = Request::builder()
        .method("PATCH")
        .uri("/cards")
        .body(Body::empty())
        .unwrap();

    let response = app.clone().oneshot(request).await.unwrap();
    assert_eq!(response.status(), StatusCode::METHOD_NOT_ALLOWED);
    assert_eq!(response.headers()[header::ALLOW], "GET, POST");

    let (status, body) = send(&app, "POST", "/users/abc", Some(json!({}))).await;
    assert_eq!(status, StatusCode::METHOD_NOT_ALLOWED);
    assert_eq!(body["error"], "Method POST Not Allowed");
}

#[tokio::test]
async fn test_openapi_document() {
    let app = app();
    let (status, doc) = send(&app, "GET", "/openapi.json", None).await;
    assert_eq!(status, StatusCode::OK);
    assert!(doc["paths"]["/cards/{id}"].is_object());
    assert!(doc["components"]["schemas"]["CreditCard"].is_object());
}

#[tokio::test]
async fn test_mutations_are_logged() {
    let temp_dir = TempDir::new().unwrap();
    let events = Arc::new(LoggingService::new(temp_dir.path(), EntryPoint::Server, "test").unwrap());
    let store = LocalStore::in_memory(ExpiryPolicy::default()).unwrap();
    let app = router(AppState::new(Arc::new(store)).with_events(events.clone()));

    send(&app, "POST", "/cards", Some(card_body())).await;
    send(&app, "DELETE", "/cards/missing", None).await;

    let recent = events.get_recent(10).unwrap();
    let names: Vec<&str> = recent.iter().map(|e| e.event.as_str()).collect();
    assert_eq!(names, vec!["card_delete_failed", "card_create"]);
    assert_eq!(recent[0].error_message.as_deref(), Some("Credit card not found"));
}
