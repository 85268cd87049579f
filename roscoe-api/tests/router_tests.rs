//! HTTP router tests driven through `tower::ServiceExt::oneshot`.

use axum::{
    body::Body,
    http::{Request, StatusCode},
    Router,
};
use roscoe_api::{create_api_router, ApiConfig, AppState, AUTH_TOKEN_HEADER};
use roscoe_core::QueueConfig;
use roscoe_test_utils::{fixtures, memory_store, SqliteExecutor};
use serde_json::{json, Value};
use std::sync::Arc;
use tower::ServiceExt;

type BoxError = Box<dyn std::error::Error>;
type TestResult = Result<(), BoxError>;

const TOKEN: &str = "test-token";

// ============================================================================
// HELPERS
// ============================================================================

async fn app(require_auth: bool) -> Result<(Arc<SqliteExecutor>, Router), BoxError> {
    let store = memory_store().await?;
    let config = ApiConfig {
        require_auth,
        ..ApiConfig::default()
    };
    let state = AppState::new(store.clone(), config, QueueConfig::default());
    state.keys.add_with_key(TOKEN, "router tests").await?;
    Ok((store, create_api_router(&state)))
}

fn post_json(
    uri: &str,
    body: Value,
    token: Option<&str>,
) -> Result<Request<Body>, axum::http::Error> {
    let mut builder = Request::builder()
        .method("POST")
        .uri(uri)
        .header("content-type", "application/json");
    if let Some(token) = token {
        builder = builder.header(AUTH_TOKEN_HEADER, token);
    }
    builder.body(Body::from(body.to_string()))
}

fn get(uri: &str, token: Option<&str>) -> Result<Request<Body>, axum::http::Error> {
    let mut builder = Request::builder().method("GET").uri(uri);
    if let Some(token) = token {
        builder = builder.header(AUTH_TOKEN_HEADER, token);
    }
    builder.body(Body::empty())
}

async fn send(app: &Router, request: Request<Body>) -> Result<(StatusCode, Value), BoxError> {
    let response = app.clone().oneshot(request).await?;
    let status = response.status();
    let bytes = axum::body::to_bytes(response.into_body(), usize::MAX).await?;
    let body = if bytes.is_empty() {
        Value::Null
    } else {
        serde_json::from_slice(&bytes).unwrap_or(Value::Null)
    };
    Ok((status, body))
}

// ============================================================================
// AUTH
// ============================================================================

#[tokio::test]
async fn missing_token_is_unauthorized() -> TestResult {
    let (_store, app) = app(true).await?;

    let (status, body) = send(&app, post_json("/lookup", json!({"ids": [1]}), None)?).await?;
    assert_eq!(status, StatusCode::UNAUTHORIZED);
    assert_eq!(body, json!({"success": false, "error": "Unauthorized"}));
    Ok(())
}

#[tokio::test]
async fn unknown_token_is_unauthorized() -> TestResult {
    let (_store, app) = app(true).await?;

    let (status, _) = send(&app, get("/lookup/1", Some("nope"))?).await?;
    assert_eq!(status, StatusCode::UNAUTHORIZED);
    Ok(())
}

#[tokio::test]
async fn disabled_auth_opens_functional_routes() -> TestResult {
    let (_store, app) = app(false).await?;

    let (status, body) = send(&app, get("/lookup/1", None)?).await?;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body, json!({"success": true, "data": {"id": 1, "flagType": 0}}));
    Ok(())
}

#[tokio::test]
async fn health_and_metrics_need_no_token() -> TestResult {
    let (_store, app) = app(true).await?;

    let response = app.clone().oneshot(get("/health/ping", None)?).await?;
    assert_eq!(response.status(), StatusCode::OK);

    let (status, body) = send(&app, get("/health/ready", None)?).await?;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["status"], json!("healthy"));

    let response = app.clone().oneshot(get("/metrics", None)?).await?;
    assert_eq!(response.status(), StatusCode::OK);

    let (status, body) = send(&app, get("/openapi.json", None)?).await?;
    assert_eq!(status, StatusCode::OK);
    assert!(body["paths"]["/lookup"].is_object());
    Ok(())
}

// ============================================================================
// LOOKUP
// ============================================================================

#[tokio::test]
async fn batch_lookup_preserves_request_order() -> TestResult {
    let (store, app) = app(true).await?;
    fixtures::insert_live(&*store, &fixtures::flagged(1)).await?;
    fixtures::insert_queued(&*store, 42, 1_700_000_000, true, false, true).await?;

    let (status, body) = send(
        &app,
        post_json("/lookup", json!({"ids": [42, 7, 1]}), Some(TOKEN))?,
    )
    .await?;

    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["success"], json!(true));
    let data = body["data"].as_array().ok_or("data is not an array")?;
    let ids: Vec<&Value> = data.iter().map(|item| &item["id"]).collect();
    let types: Vec<&Value> = data.iter().map(|item| &item["flagType"]).collect();
    assert_eq!(ids, vec![&json!(42), &json!(7), &json!(1)]);
    assert_eq!(types, vec![&json!(3), &json!(0), &json!(1)]);
    assert_eq!(data[2]["confidence"], json!(0.5));
    assert!(data[0].get("confidence").is_none());
    Ok(())
}

#[tokio::test]
async fn batch_lookup_rejects_bad_input() -> TestResult {
    let (_store, app) = app(true).await?;

    let ids: Vec<u64> = (1..=101).collect();
    let request = post_json("/lookup", json!({"ids": ids}), Some(TOKEN))?;
    let (status, body) = send(&app, request).await?;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["error"], json!("Batch size too large (max 100)"));

    let request = post_json("/lookup", json!({"ids": [3, 0]}), Some(TOKEN))?;
    let (status, body) = send(&app, request).await?;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["error"], json!("Invalid ID in batch: must be greater than 0"));

    let request = post_json("/lookup", json!({"ids": "x"}), Some(TOKEN))?;
    let (status, body) = send(&app, request).await?;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body, json!({"success": false, "error": "Invalid request body"}));
    Ok(())
}

#[tokio::test]
async fn ids_beyond_storable_range() -> TestResult {
    let (store, app) = app(true).await?;
    fixtures::insert_live(&*store, &fixtures::flagged(1)).await?;
    let too_large: u64 = 9_223_372_036_854_775_808;

    let (status, body) = send(&app, get("/lookup/9223372036854775808", Some(TOKEN))?).await?;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["data"]["flagType"], json!(0));

    let request = post_json("/lookup", json!({"ids": [too_large, 1]}), Some(TOKEN))?;
    let (status, body) = send(&app, request).await?;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["data"][0]["id"], json!(too_large));
    assert_eq!(body["data"][0]["flagType"], json!(0));
    assert_eq!(body["data"][1]["flagType"], json!(1));

    let request = post_json("/queue", json!({"id": too_large}), Some(TOKEN))?;
    let (status, body) = send(&app, request).await?;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(
        body["error"],
        json!("Invalid ID: must not exceed 9223372036854775807")
    );
    Ok(())
}

#[tokio::test]
async fn single_lookup_validates_path() -> TestResult {
    let (_store, app) = app(true).await?;

    let (status, body) = send(&app, get("/lookup/abc", Some(TOKEN))?).await?;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["error"], json!("Invalid ID format: abc"));

    let (status, body) = send(&app, get("/lookup/0", Some(TOKEN))?).await?;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["error"], json!("Invalid ID: must be greater than 0"));
    Ok(())
}

#[tokio::test]
async fn single_lookup_parses_reasons() -> TestResult {
    let (store, app) = app(true).await?;
    fixtures::insert_live(&*store, &fixtures::confirmed(9)).await?;

    let (status, body) = send(&app, get("/lookup/9", Some(TOKEN))?).await?;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["data"]["flagType"], json!(2));
    assert_eq!(
        body["data"]["reasons"]["profile"]["message"],
        json!("Suspicious description")
    );
    Ok(())
}

// ============================================================================
// QUEUE
// ============================================================================

#[tokio::test]
async fn queue_admits_then_rejects_repeat() -> TestResult {
    let (_store, app) = app(true).await?;

    let (status, body) = send(&app, post_json("/queue", json!({"id": 5}), Some(TOKEN))?).await?;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body, json!({"success": true, "data": {"queued": 5}}));

    let (status, body) = send(&app, post_json("/queue", json!({"id": 5}), Some(TOKEN))?).await?;
    assert_eq!(status, StatusCode::CONFLICT);
    assert_eq!(body["error"], json!("User was queued within the past 7 days"));
    Ok(())
}

#[tokio::test]
async fn queue_rejects_flagged_and_invalid_users() -> TestResult {
    let (store, app) = app(true).await?;
    fixtures::insert_live(&*store, &fixtures::flagged(6)).await?;

    let (status, body) = send(&app, post_json("/queue", json!({"id": 6}), Some(TOKEN))?).await?;
    assert_eq!(status, StatusCode::CONFLICT);
    assert_eq!(body["error"], json!("User is already flagged or confirmed"));

    let (status, body) = send(&app, post_json("/queue", json!({"id": 0}), Some(TOKEN))?).await?;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["error"], json!("Invalid ID: must be greater than 0"));

    let (status, _) = send(&app, post_json("/queue", json!({"user": 1}), Some(TOKEN))?).await?;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    Ok(())
}
