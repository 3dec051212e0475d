//! Integration tests for the Courtside HTTP API.
//!
//! Each test builds the router over demo data and a scripted backend, then
//! drives it with `tower::ServiceExt::oneshot`.

use std::sync::Arc;

use axum::body::Body;
use axum::http::{Request, StatusCode};
use chrono::{TimeZone, Utc};
use serde_json::{json, Value};
use tower::ServiceExt;

use courtside_api::handlers::HealthResponse;
use courtside_api::{create_router, AppState};
use courtside_core::config::CourtsideConfig;
use courtside_core::seed::demo_dataset;
use courtside_core::store::{DataSource, InMemoryStore};
use courtside_flows::{BackendError, FlowOrchestrator, ScriptedBackend, ToolRegistry};

// =============================================================================
// Test helpers
// =============================================================================

fn make_state_with(backend: Arc<ScriptedBackend>, config: CourtsideConfig) -> AppState {
    let now = Utc.with_ymd_and_hms(2026, 10, 18, 12, 0, 0).unwrap();
    let source: Arc<dyn DataSource> = Arc::new(InMemoryStore::new(demo_dataset(now)));
    let tools = Arc::new(ToolRegistry::with_defaults(source).with_clock(move || now));
    let orchestrator =
        FlowOrchestrator::with_defaults(tools, backend, config.flows.clone()).unwrap();
    AppState::new(config, orchestrator)
}

fn make_app(backend: Arc<ScriptedBackend>) -> axum::Router {
    create_router(make_state_with(backend, CourtsideConfig::default()))
}

fn post_json(uri: &str, json: Value) -> Request<Body> {
    Request::builder()
        .method("POST")
        .uri(uri)
        .header("content-type", "application/json")
        .body(Body::from(json.to_string()))
        .unwrap()
}

async fn body_json(resp: axum::response::Response) -> Value {
    let bytes = axum::body::to_bytes(resp.into_body(), 1024 * 1024)
        .await
        .unwrap();
    serde_json::from_slice(&bytes).unwrap()
}

fn recommendation() -> Value {
    json!({
        "facilityName": "Riverside Tennis Club",
        "facilityType": "Tennis",
        "location": "Downtown",
        "reason": "Close to home and has evening slots"
    })
}

// =============================================================================
// Public endpoints
// =============================================================================

#[tokio::test]
async fn test_health_happy_path() {
    let app = make_app(Arc::new(ScriptedBackend::new()));
    let resp = app
        .oneshot(Request::get("/health").body(Body::empty()).unwrap())
        .await
        .unwrap();

    assert_eq!(resp.status(), StatusCode::OK);
    let health: HealthResponse = serde_json::from_value(body_json(resp).await).unwrap();
    assert_eq!(health.status, "healthy");
    assert_eq!(health.backend, "scripted");
    assert_eq!(health.flows, 5);
}

#[tokio::test]
async fn test_list_flows_includes_schemas() {
    let app = make_app(Arc::new(ScriptedBackend::new()));
    let resp = app
        .oneshot(Request::get("/flows").body(Body::empty()).unwrap())
        .await
        .unwrap();
    assert_eq!(resp.status(), StatusCode::OK);

    let json = body_json(resp).await;
    let flows = json["flows"].as_array().unwrap();
    let names: Vec<&str> = flows.iter().filter_map(|f| f["name"].as_str()).collect();
    for expected in [
        "businessPresentation",
        "facilityImage",
        "facilityRecommendation",
        "reviewSummary",
        "weekendPlanner",
    ] {
        assert!(names.contains(&expected), "missing {}", expected);
    }

    let presentation = flows
        .iter()
        .find(|f| f["name"] == "businessPresentation")
        .unwrap();
    assert_eq!(presentation["inputSchema"]["type"], "object");
    assert_eq!(presentation["tools"].as_array().unwrap().len(), 3);
}

// =============================================================================
// POST /flows/{name}
// =============================================================================

#[tokio::test]
async fn test_run_flow_happy_path() {
    let backend = Arc::new(ScriptedBackend::new().then_final(recommendation()));
    let app = make_app(backend.clone());
    let resp = app
        .oneshot(post_json(
            "/flows/facilityRecommendation",
            json!({ "preferences": "tennis after work", "pastBookings": "" }),
        ))
        .await
        .unwrap();

    assert_eq!(resp.status(), StatusCode::OK);
    assert_eq!(body_json(resp).await, recommendation());
    assert_eq!(backend.call_count(), 1);
}

#[tokio::test]
async fn test_run_unknown_flow_returns_404() {
    let app = make_app(Arc::new(ScriptedBackend::new()));
    let resp = app
        .oneshot(post_json("/flows/horoscope", json!({})))
        .await
        .unwrap();
    assert_eq!(resp.status(), StatusCode::NOT_FOUND);
    assert_eq!(body_json(resp).await["error"], "unknown_flow");
}

#[tokio::test]
async fn test_invalid_input_returns_422_with_issues() {
    let backend = Arc::new(ScriptedBackend::new());
    let app = make_app(backend.clone());
    let resp = app
        .oneshot(post_json(
            "/flows/facilityRecommendation",
            json!({ "preferences": "go", "pastBookings": "" }),
        ))
        .await
        .unwrap();

    assert_eq!(resp.status(), StatusCode::UNPROCESSABLE_ENTITY);
    let json = body_json(resp).await;
    assert_eq!(json["error"], "input_validation");
    let issues = json["details"]["issues"].as_array().unwrap();
    assert_eq!(issues[0]["path"], "preferences");
    assert_eq!(issues[0]["kind"], "too_short");
    assert_eq!(backend.call_count(), 0);
}

#[tokio::test]
async fn test_malformed_body_returns_400() {
    let app = make_app(Arc::new(ScriptedBackend::new()));
    let resp = app
        .oneshot(
            Request::builder()
                .method("POST")
                .uri("/flows/reviewSummary")
                .header("content-type", "application/json")
                .body(Body::from("{not json"))
                .unwrap(),
        )
        .await
        .unwrap();
    assert_eq!(resp.status(), StatusCode::BAD_REQUEST);
    assert_eq!(body_json(resp).await["error"], "bad_request");
}

#[tokio::test]
async fn test_review_summary_short_circuit_over_http() {
    let backend = Arc::new(ScriptedBackend::new());
    let app = make_app(backend.clone());
    let resp = app
        .oneshot(post_json(
            "/flows/reviewSummary",
            json!({ "facilityName": "Arena", "reviews": ["Great", "Bad lights"] }),
        ))
        .await
        .unwrap();

    assert_eq!(resp.status(), StatusCode::OK);
    assert_eq!(body_json(resp).await, json!({ "pros": [], "cons": [] }));
    assert_eq!(backend.call_count(), 0);
}

#[tokio::test]
async fn test_output_validation_returns_500() {
    let backend = Arc::new(ScriptedBackend::new().then_final(json!({
        "title": "Deck",
        "summary": "Summary",
        "slides": [{ "icon": "chart", "bulletPoints": ["Up"] }]
    })));
    let app = make_app(backend);
    let resp = app
        .oneshot(post_json(
            "/flows/businessPresentation",
            json!({ "audience": "investors", "currency": "USD" }),
        ))
        .await
        .unwrap();

    assert_eq!(resp.status(), StatusCode::INTERNAL_SERVER_ERROR);
    let json = body_json(resp).await;
    assert_eq!(json["error"], "output_validation");
    assert_eq!(json["details"]["issues"][0]["path"], "slides[0].slideTitle");
}

#[tokio::test]
async fn test_backend_failure_returns_502_generic_message() {
    let backend = Arc::new(ScriptedBackend::new().then_error(BackendError::Api {
        status: 429,
        message: "quota exceeded for project 1234".to_string(),
    }));
    let app = make_app(backend);
    let resp = app
        .oneshot(post_json(
            "/flows/facilityRecommendation",
            json!({ "preferences": "climbing", "pastBookings": "" }),
        ))
        .await
        .unwrap();

    assert_eq!(resp.status(), StatusCode::BAD_GATEWAY);
    let json = body_json(resp).await;
    assert_eq!(json["error"], "model_generation");
    assert_eq!(json["message"], "Generation failed");
    assert!(!json.to_string().contains("quota"));
}

#[tokio::test]
async fn test_presentation_tool_loop_over_http() {
    let backend = Arc::new(
        ScriptedBackend::new()
            .then_tools(&["getAppStats", "getRevenueTrend"])
            .then_final(json!({
                "title": "Courtside",
                "summary": "Growing",
                "slides": [{ "slideTitle": "Users", "icon": "users", "bulletPoints": ["5 users"] }]
            })),
    );
    let app = make_app(backend.clone());
    let resp = app
        .oneshot(post_json(
            "/flows/businessPresentation",
            json!({ "audience": "the board", "currency": "USD" }),
        ))
        .await
        .unwrap();

    assert_eq!(resp.status(), StatusCode::OK);
    assert_eq!(body_json(resp).await["slides"][0]["slideTitle"], "Users");

    let requests = backend.requests();
    assert_eq!(requests.len(), 2);
    let transcript = &requests[1].transcript;
    assert_eq!(transcript.len(), 2);
    assert_eq!(transcript[0].output["totalUsers"], 5);
    assert_eq!(transcript[1].output["months"].as_array().unwrap().len(), 6);
}

// =============================================================================
// POST /plan-weekend
// =============================================================================

#[tokio::test]
async fn test_plan_weekend_fills_facilities_from_data_source() {
    let backend = Arc::new(ScriptedBackend::new().then_final(json!({
        "plan": [{
            "day": "Saturday",
            "time": "09:00",
            "activity": "Bouldering session",
            "facilityName": "Summit Climbing Gym",
            "estimatedCost": 18.5,
            "reason": "Quiet in the morning"
        }],
        "summary": "Climb Saturday, rest Sunday"
    })));
    let app = make_app(backend.clone());
    let resp = app
        .oneshot(
            Request::builder()
                .method("POST")
                .uri("/plan-weekend")
                .header("content-type", "application/json")
                .header("x-user-id", "user-1")
                .body(Body::from(
                    json!({ "request": "Active weekend for a beginner climber" }).to_string(),
                ))
                .unwrap(),
        )
        .await
        .unwrap();

    assert_eq!(resp.status(), StatusCode::OK);
    let json = body_json(resp).await;
    assert_eq!(json["plan"][0]["facilityName"], "Summit Climbing Gym");

    let prompt = &backend.requests()[0].prompt;
    assert!(prompt.contains("All prices are in USD."));
    assert!(prompt.contains("- Riverside Tennis Club (Tennis)"));
}

#[tokio::test]
async fn test_plan_weekend_requires_request_field() {
    let app = make_app(Arc::new(ScriptedBackend::new()));
    let resp = app
        .oneshot(post_json("/plan-weekend", json!({ "wish": "tennis" })))
        .await
        .unwrap();
    assert_eq!(resp.status(), StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn test_plan_weekend_short_request_is_422() {
    let app = make_app(Arc::new(ScriptedBackend::new()));
    let resp = app
        .oneshot(post_json("/plan-weekend", json!({ "request": "golf" })))
        .await
        .unwrap();
    assert_eq!(resp.status(), StatusCode::UNPROCESSABLE_ENTITY);
    let json = body_json(resp).await;
    assert_eq!(json["details"]["issues"][0]["path"], "request");
}

// =============================================================================
// GET /tools/{name}
// =============================================================================

#[tokio::test]
async fn test_tool_popular_sports() {
    let app = make_app(Arc::new(ScriptedBackend::new()));
    let resp = app
        .oneshot(
            Request::get("/tools/getPopularSports")
                .body(Body::empty())
                .unwrap(),
        )
        .await
        .unwrap();
    assert_eq!(resp.status(), StatusCode::OK);

    let json = body_json(resp).await;
    let sports = json.as_array().unwrap();
    assert!(sports.len() <= 5);
    assert_eq!(sports[0]["sportName"], "Tennis");
}

#[tokio::test]
async fn test_tool_app_stats() {
    let app = make_app(Arc::new(ScriptedBackend::new()));
    let resp = app
        .oneshot(Request::get("/tools/getAppStats").body(Body::empty()).unwrap())
        .await
        .unwrap();
    assert_eq!(resp.status(), StatusCode::OK);

    let json = body_json(resp).await;
    assert_eq!(json["totalUsers"], 5);
    assert_eq!(json["totalFacilities"], 6);
}

#[tokio::test]
async fn test_unknown_tool_returns_404() {
    let app = make_app(Arc::new(ScriptedBackend::new()));
    let resp = app
        .oneshot(Request::get("/tools/getWeather").body(Body::empty()).unwrap())
        .await
        .unwrap();
    assert_eq!(resp.status(), StatusCode::NOT_FOUND);
    assert_eq!(body_json(resp).await["error"], "not_found");
}

// =============================================================================
// Rate limiting
// =============================================================================

#[tokio::test]
async fn test_model_routes_are_rate_limited() {
    let mut config = CourtsideConfig::default();
    config.general.rate_limit_per_sec = 1;
    let app = create_router(make_state_with(Arc::new(ScriptedBackend::new()), config));
    let input = json!({ "facilityName": "Arena", "reviews": [] });

    let first = app
        .clone()
        .oneshot(post_json("/flows/reviewSummary", input.clone()))
        .await
        .unwrap();
    assert_eq!(first.status(), StatusCode::OK);

    let second = app
        .clone()
        .oneshot(post_json("/flows/reviewSummary", input))
        .await
        .unwrap();
    assert_eq!(second.status(), StatusCode::TOO_MANY_REQUESTS);
    assert_eq!(body_json(second).await["error"], "too_many_requests");

    // Tools do not call the model and are not limited.
    let tools = app
        .oneshot(Request::get("/tools/getAppStats").body(Body::empty()).unwrap())
        .await
        .unwrap();
    assert_eq!(tools.status(), StatusCode::OK);
}
