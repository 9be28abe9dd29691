//! Integration tests for the optimizer API endpoints

use axum::{
    body::Body,
    http::{Request, StatusCode},
    Router,
};
use chrono::{Duration, Utc};
use cost_optimizer::{api, app, config::OptimizerConfig};
use optimizer_lib::{
    health::{Component, HealthRegistry},
    Dataset,
};
use serde_json::{json, Value};
use tower::ServiceExt;

/// Thirty days of an oversized, lightly used instance plus pricing and alternatives
fn dataset() -> Dataset {
    let today = Utc::now().date_naive();
    let cost_records: Vec<Value> = (0..30)
        .map(|i| {
            json!({
                "tenant": "acme", "provider": "aws", "resource_type": "compute",
                "resource_id": "i-1", "resource_name": "api-server", "sku": "m5.xlarge",
                "vcpu": 4, "memory_gb": 16.0, "avg_cpu_utilization": 0.15,
                "region": "us-east-1", "daily_cost": 10.0,
                "date": today - Duration::days(29 - i)
            })
        })
        .collect();

    let value = json!({
        "cost_records": cost_records,
        "resources": [{
            "tenant": "acme", "provider": "aws", "resource_id": "i-1", "name": "api-server",
            "resource_type": "compute", "sku": "m5.xlarge", "region": "us-east-1",
            "vcpu": 4, "memory_gb": 16.0
        }],
        "pricing": [
            {"provider": "aws", "sku": "m5.xlarge", "region": "us-east-1", "hourly_usd": 0.192},
            {"provider": "aws", "sku": "m5.large", "region": "us-east-1", "hourly_usd": 0.096},
            {"provider": "aws", "sku": "t3.large", "region": "us-east-1", "hourly_usd": 0.0832}
        ],
        "alternatives": [
            {
                "id": 1, "provider": "aws", "resource_type": "compute",
                "current_sku": "m5.xlarge", "alternative_sku": "m5.large",
                "alternative_provider": "aws", "vcpu": 2, "memory_gb": 8.0,
                "sku_family": "m5", "category": "downsize"
            },
            {
                "id": 2, "provider": "aws", "resource_type": "compute",
                "current_sku": "m5.xlarge", "alternative_sku": "t3.large",
                "alternative_provider": "aws", "vcpu": 2, "memory_gb": 8.0,
                "sku_family": "t3", "category": "different_family"
            }
        ]
    });
    serde_json::from_value(value).unwrap()
}

async fn setup_test_app() -> (Router, HealthRegistry) {
    let services = app::build(&OptimizerConfig::default(), Some(&dataset()))
        .await
        .unwrap();
    let health = services.state.health_registry.clone();
    (api::create_router(services.state), health)
}

async fn send(app: &Router, method: &str, uri: &str, body: Option<Value>) -> (StatusCode, Value) {
    let request = Request::builder().method(method).uri(uri);
    let request = match body {
        Some(body) => request
            .header("content-type", "application/json")
            .body(Body::from(body.to_string()))
            .unwrap(),
        None => request.body(Body::empty()).unwrap(),
    };

    let response = app.clone().oneshot(request).await.unwrap();
    let status = response.status();
    let body = axum::body::to_bytes(response.into_body(), usize::MAX)
        .await
        .unwrap();
    let value = if body.is_empty() {
        Value::Null
    } else {
        serde_json::from_slice(&body).unwrap()
    };
    (status, value)
}

#[tokio::test]
async fn test_healthz_returns_ok_when_healthy() {
    let (app, _health) = setup_test_app().await;

    let (status, health) = send(&app, "GET", "/healthz", None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(health["status"], "healthy");
}

#[tokio::test]
async fn test_healthz_returns_ok_when_degraded() {
    let (app, health) = setup_test_app().await;
    health
        .set_degraded(Component::ForecastBackend, "Model failed to load")
        .await;

    // Degraded still returns 200 (operational)
    let (status, body) = send(&app, "GET", "/healthz", None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["status"], "degraded");
}

#[tokio::test]
async fn test_healthz_returns_503_when_unhealthy() {
    let (app, health) = setup_test_app().await;
    health
        .set_unhealthy(Component::Storage, "Repository unreachable")
        .await;

    let (status, body) = send(&app, "GET", "/healthz", None).await;
    assert_eq!(status, StatusCode::SERVICE_UNAVAILABLE);
    assert_eq!(body["status"], "unhealthy");
}

#[tokio::test]
async fn test_readyz_follows_ready_flag() {
    let (app, health) = setup_test_app().await;

    let (status, body) = send(&app, "GET", "/readyz", None).await;
    assert_eq!(status, StatusCode::SERVICE_UNAVAILABLE);
    assert_eq!(body["ready"], false);

    health.set_ready(true).await;
    let (status, body) = send(&app, "GET", "/readyz", None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["ready"], true);
}

#[tokio::test]
async fn test_metrics_endpoint_returns_prometheus_format() {
    let (app, _health) = setup_test_app().await;

    let response = app
        .oneshot(
            Request::builder()
                .uri("/metrics")
                .body(Body::empty())
                .unwrap(),
        )
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);

    let content_type = response.headers().get("content-type").unwrap();
    assert!(content_type.to_str().unwrap().contains("text/plain"));

    let body = axum::body::to_bytes(response.into_body(), usize::MAX)
        .await
        .unwrap();
    let text = String::from_utf8(body.to_vec()).unwrap();
    assert!(text.contains("cost_optimizer_analysis_latency_seconds"));
}

#[tokio::test]
async fn test_analysis_generates_downsize() {
    let (app, _health) = setup_test_app().await;

    let (status, result) = send(&app, "POST", "/api/v1/analysis/acme/aws/i-1", None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(result["status"], "analyzed");
    assert_eq!(result["classification"], "UNDERUTILIZED");

    let recommendations = result["recommendations"].as_array().unwrap();
    assert_eq!(recommendations.len(), 1);
    assert_eq!(recommendations[0]["action"], "DOWNSIZE_INSTANCE");
    assert_eq!(recommendations[0]["estimated_monthly_savings"], 150.0);
    assert_eq!(recommendations[0]["status"], "ACTIVE");
}

#[tokio::test]
async fn test_analysis_without_history_uses_detected_config() {
    let (app, _health) = setup_test_app().await;

    let (status, result) = send(
        &app,
        "POST",
        "/api/v1/analysis/acme/aws/i-new",
        Some(json!({
            "detected_config": {
                "resource_name": "batch-worker",
                "resource_type": "compute",
                "sku": "m5.2xlarge",
                "vcpu": 8
            }
        })),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(result["status"], "no_history");

    let (status, result) = send(&app, "POST", "/api/v1/analysis/acme/aws/i-unknown", None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(result["status"], "no_data");
    assert!(result["recommendations"].as_array().unwrap().is_empty());
}

#[tokio::test]
async fn test_analysis_rejects_bad_input() {
    let (app, _health) = setup_test_app().await;

    let (status, body) = send(&app, "POST", "/api/v1/analysis/acme/oracle/i-1", None).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert!(body["error"].as_str().unwrap().contains("oracle"));

    let (status, body) = send(&app, "POST", "/api/v1/analysis/acme/aws/i%201", None).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert!(body["error"].is_string());

    let (status, body) = send(&app, "POST", "/api/v1/analysis/acme/azure/vm-1", None).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert!(body["error"].as_str().unwrap().contains("azure"));
}

#[tokio::test]
async fn test_recommendation_lifecycle() {
    let (app, _health) = setup_test_app().await;

    let (_, result) = send(&app, "POST", "/api/v1/analysis/acme/aws/i-1", None).await;
    let id = result["recommendations"][0]["id"].as_str().unwrap().to_string();

    let (status, listed) = send(
        &app,
        "GET",
        "/api/v1/recommendations?tenant=acme&status=ACTIVE",
        None,
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(listed.as_array().unwrap().len(), 1);

    let uri = format!("/api/v1/recommendations/{}/implement", id);
    let (status, implemented) = send(&app, "POST", &uri, None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(implemented["validation_status"], "PENDING");
    assert_eq!(implemented["expected_monthly_savings"], 150.0);

    let (status, body) = send(&app, "POST", &uri, None).await;
    assert_eq!(status, StatusCode::CONFLICT);
    assert!(body["error"].is_string());

    let missing = format!("/api/v1/recommendations/{}/dismiss", uuid::Uuid::new_v4());
    let (status, _) = send(&app, "POST", &missing, None).await;
    assert_eq!(status, StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn test_alternatives_ranked() {
    let (app, _health) = setup_test_app().await;

    let (status, comparison) = send(
        &app,
        "GET",
        "/api/v1/alternatives/acme/aws/i-1?sku=m5.xlarge&region=us-east-1",
        None,
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(comparison["current_resource"]["region"], "us-east");

    let ranked = comparison["ranked_alternatives"].as_array().unwrap();
    assert_eq!(ranked.len(), 2);
    let first = ranked[0]["overall_score"].as_f64().unwrap();
    let second = ranked[1]["overall_score"].as_f64().unwrap();
    assert!(first >= second);
    assert_eq!(ranked[0]["dimensions"].as_array().unwrap().len(), 6);
}

#[tokio::test]
async fn test_alternatives_requires_sku_and_region() {
    let (app, _health) = setup_test_app().await;

    let (status, body) = send(
        &app,
        "GET",
        "/api/v1/alternatives/acme/aws/i-1?region=us-east-1",
        None,
    )
    .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert!(body["error"].as_str().unwrap().contains("sku"));
}

#[tokio::test]
async fn test_preferences_validated() {
    let (app, _health) = setup_test_app().await;

    let (status, body) = send(
        &app,
        "PUT",
        "/api/v1/preferences/acme",
        Some(json!({ "dimension_weights": { "cost": 0.5, "performance": 0.2 } })),
    )
    .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert!(body["error"].as_str().unwrap().contains("sum"));

    let (status, body) = send(
        &app,
        "PUT",
        "/api/v1/preferences/acme",
        Some(json!({ "minimum_savings_threshold": 75.0 })),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["tenant"], "acme");

    let (_, comparison) = send(
        &app,
        "GET",
        "/api/v1/alternatives/acme/aws/i-1?sku=m5.xlarge&region=us-east-1",
        None,
    )
    .await;
    let ranked = comparison["ranked_alternatives"].as_array().unwrap();
    assert_eq!(ranked.len(), 1);
    assert_eq!(ranked[0]["alternative"]["alternative_sku"], "t3.large");
}

#[tokio::test]
async fn test_validation_run_reports_summary() {
    let (app, _health) = setup_test_app().await;

    let (status, summary) = send(&app, "POST", "/api/v1/validation/run", None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(summary["candidates"], 0);
    assert_eq!(summary["errors"], 0);
}
