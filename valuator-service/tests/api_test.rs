//! Integration tests for the valuator HTTP API.

use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;

use async_trait::async_trait;
use axum::body::Body;
use axum::http::{Request, StatusCode};
use serde_json::{json, Value};
use tower::ServiceExt;
use valuator_common::{Error, ServerConfig};
use valuator_service::{
    app, build_router, AppState, NarrativeGenerator, ValuationEngine, FALLBACK_ANALYSIS,
};

struct CannedNarrator {
    reply: Option<&'static str>,
    calls: AtomicUsize,
}

impl CannedNarrator {
    fn replying(reply: &'static str) -> Arc<Self> {
        Arc::new(Self {
            reply: Some(reply),
            calls: AtomicUsize::new(0),
        })
    }

    fn failing() -> Arc<Self> {
        Arc::new(Self {
            reply: None,
            calls: AtomicUsize::new(0),
        })
    }
}

#[async_trait]
impl NarrativeGenerator for CannedNarrator {
    fn name(&self) -> &str {
        "canned"
    }

    fn is_configured(&self) -> bool {
        true
    }

    async fn generate(&self, _prompt: &str) -> valuator_common::Result<String> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        self.reply
            .map(str::to_string)
            .ok_or_else(|| Error::external("canned", Some(500), "upstream down"))
    }
}

fn test_app(narrator: Arc<CannedNarrator>) -> axum::Router {
    build_router(AppState::new(ValuationEngine::new(), narrator))
}

fn valuation_body() -> Value {
    json!({
        "companyName": "Acme Analytics",
        "industry": "Technology",
        "companyStage": "Growth",
        "revenue": 1000000,
        "ebitda": 200000,
        "growthRate": 15,
        "employees": 50,
        "selectedMethods": ["dcf", "comparables", "assetBased"]
    })
}

fn post_json(uri: &str, body: &Value) -> Request<Body> {
    Request::builder()
        .method("POST")
        .uri(uri)
        .header("content-type", "application/json")
        .body(Body::from(body.to_string()))
        .unwrap()
}

fn get(uri: &str) -> Request<Body> {
    Request::builder().uri(uri).body(Body::empty()).unwrap()
}

async fn read_json(response: axum::response::Response) -> Value {
    let body = axum::body::to_bytes(response.into_body(), usize::MAX)
        .await
        .unwrap();
    serde_json::from_slice(&body).unwrap()
}

#[tokio::test]
async fn test_full_valuation_flow() {
    let narrator = CannedNarrator::replying("Healthy margins and strong growth.");
    let app = test_app(narrator.clone());

    // 1. Submit a valuation
    let response = app
        .clone()
        .oneshot(post_json("/api/valuations", &valuation_body()))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);

    let json = read_json(response).await;
    assert_eq!(json["success"], true);
    assert_eq!(json["valuationId"], 1);

    let results = &json["results"];
    assert_eq!(results["valuationRange"], "$2.1M - $2.8M");
    assert_eq!(results["confidence"], 90);
    assert_eq!(results["comps"], 2_940_000);
    assert_eq!(results["assetBased"], 800_000);
    assert_eq!(results["aiAnalysis"], "Healthy margins and strong growth.");
    assert_eq!(results["riskAssessment"]["marketRisk"], 80);
    assert_eq!(results["riskAssessment"]["overallScore"], 50);
    assert_eq!(results["keyMetrics"]["revenueMultiple"], 2.9);
    assert_eq!(results["keyMetrics"]["pegRatio"], 1.4);
    assert_eq!(narrator.calls.load(Ordering::SeqCst), 1);

    // 2. Fetch the stored record
    let response = app.clone().oneshot(get("/api/valuations/1")).await.unwrap();
    assert_eq!(response.status(), StatusCode::OK);

    let record = read_json(response).await;
    assert_eq!(record["id"], 1);
    assert_eq!(record["companyName"], "Acme Analytics");
    assert_eq!(record["valuationRange"], "$2.1M - $2.8M");
    assert_eq!(record["confidence"], 90);
    assert_eq!(record["aiAnalysis"], "Healthy margins and strong growth.");
    assert_eq!(record["dcfValue"], results["dcf"]);

    // 3. It shows up in the recent list
    let response = app.oneshot(get("/api/valuations?limit=5")).await.unwrap();
    assert_eq!(response.status(), StatusCode::OK);

    let list = read_json(response).await;
    assert_eq!(list["count"], 1);
    assert_eq!(list["valuations"][0]["id"], 1);
}

#[tokio::test]
async fn test_narrative_failure_uses_fallback() {
    let app = test_app(CannedNarrator::failing());

    let response = app
        .oneshot(post_json("/api/valuations", &valuation_body()))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);

    let json = read_json(response).await;
    assert_eq!(json["results"]["aiAnalysis"], FALLBACK_ANALYSIS);
    assert_eq!(json["results"]["valuationRange"], "$2.1M - $2.8M");
}

#[tokio::test]
async fn test_invalid_submission_is_rejected() {
    let app = test_app(CannedNarrator::replying("unused"));

    let mut body = valuation_body();
    body["companyName"] = json!("");

    let response = app
        .clone()
        .oneshot(post_json("/api/valuations", &body))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);

    let json = read_json(response).await;
    assert_eq!(json["success"], false);
    assert_eq!(json["error"], "Company name is required");

    // Nothing was stored
    let response = app.oneshot(get("/api/valuations")).await.unwrap();
    assert_eq!(read_json(response).await["count"], 0);
}

#[tokio::test]
async fn test_zero_ebitda_is_rejected() {
    let app = test_app(CannedNarrator::replying("unused"));

    let mut body = valuation_body();
    body["ebitda"] = json!(0);

    let response = app
        .oneshot(post_json("/api/valuations", &body))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);

    let json = read_json(response).await;
    assert_eq!(json["success"], false);
    assert_eq!(json["error"], "Cannot compute P/E ratio: EBITDA is zero");
}

#[tokio::test]
async fn test_malformed_json_is_bad_request() {
    let app = test_app(CannedNarrator::replying("unused"));

    let response = app
        .oneshot(
            Request::builder()
                .method("POST")
                .uri("/api/valuations")
                .header("content-type", "application/json")
                .body(Body::from("{not json"))
                .unwrap(),
        )
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    assert_eq!(read_json(response).await["success"], false);
}

#[tokio::test]
async fn test_unknown_valuation_is_not_found() {
    let app = test_app(CannedNarrator::replying("unused"));

    let response = app.oneshot(get("/api/valuations/42")).await.unwrap();
    assert_eq!(response.status(), StatusCode::NOT_FOUND);

    let json = read_json(response).await;
    assert_eq!(json["success"], false);
    assert_eq!(json["error"], "Valuation not found");
}

#[tokio::test]
async fn test_quick_calculator() {
    let app = test_app(CannedNarrator::replying("unused"));

    let response = app
        .oneshot(post_json(
            "/api/quick-calculator",
            &json!({"revenue": 2000000, "ebitda": 400000, "industry": "Retail"}),
        ))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);

    let json = read_json(response).await;
    assert_eq!(json["revenueMultiple"], "1.4x");
    assert_eq!(json["ebitdaMultiple"], "7.8x");
    assert_eq!(json["quickEstimate"], "$2.5M - $3.4M");
}

#[tokio::test]
async fn test_quick_calculator_requires_both_figures() {
    let app = test_app(CannedNarrator::replying("unused"));

    for body in [
        json!({"revenue": 2000000, "industry": "Retail"}),
        json!({"ebitda": 400000}),
        json!({"revenue": 0, "ebitda": 400000}),
    ] {
        let response = app
            .clone()
            .oneshot(post_json("/api/quick-calculator", &body))
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::BAD_REQUEST, "{body}");

        let json = read_json(response).await;
        assert_eq!(json["success"], false);
        assert_eq!(json["error"], "Revenue and EBITDA are required");
    }
}

#[tokio::test]
async fn test_ids_increase_across_submissions() {
    let app = test_app(CannedNarrator::replying("ok"));

    for expected in 1..=3 {
        let response = app
            .clone()
            .oneshot(post_json("/api/valuations", &valuation_body()))
            .await
            .unwrap();
        assert_eq!(read_json(response).await["valuationId"], expected);
    }

    let response = app.oneshot(get("/api/valuations?limit=2")).await.unwrap();
    let list = read_json(response).await;
    assert_eq!(list["count"], 2);
    assert_eq!(list["valuations"][0]["id"], 3);
    assert_eq!(list["valuations"][1]["id"], 2);
}

#[tokio::test]
async fn test_oversized_body_is_rejected() {
    let server = ServerConfig {
        body_limit_bytes: 256,
        ..ServerConfig::default()
    };
    let app = app(
        AppState::new(ValuationEngine::new(), CannedNarrator::replying("unused")),
        &server,
    );

    let mut body = valuation_body();
    body["companyName"] = json!("x".repeat(1024));

    let response = app
        .oneshot(post_json("/api/valuations", &body))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::PAYLOAD_TOO_LARGE);
}

#[tokio::test]
async fn test_cors_headers_present() {
    let app = app(
        AppState::new(ValuationEngine::new(), CannedNarrator::replying("unused")),
        &ServerConfig::default(),
    );

    let response = app
        .oneshot(
            Request::builder()
                .uri("/health")
                .header("origin", "http://localhost:3000")
                .body(Body::empty())
                .unwrap(),
        )
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);
    assert_eq!(response.headers()["access-control-allow-origin"], "*");
}
