//! HTTP generation client against an in-process axum server.

use std::time::Duration;

use assert_matches::assert_matches;
use axum::http::{HeaderMap, StatusCode};
use axum::routing::post;
use axum::{Json, Router};
use variantflow_core::catalog::find_variant;
use variantflow_core::tier::DiagramType;
use variantflow_generation::{
    GenerationClient, GenerationConfig, GenerationError, HttpGenerationClient, TimeoutSchedule,
};

const PAYLOAD: &str = r#"<definitions><process id="p"><task id="t"/></process></definitions>"#;

/// Serve `router` on an ephemeral port and return its base URL.
async fn spawn_server(router: Router) -> String {
    let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    tokio::spawn(async move {
        axum::serve(listener, router).await.unwrap();
    });
    format!("http://{addr}")
}

fn client(base_url: String, budget: Duration) -> HttpGenerationClient {
    HttpGenerationClient::new(&GenerationConfig {
        base_url,
        api_key: Some("test-key".into()),
        agent_mode: true,
        skip_upstream_cache: true,
        timeouts: TimeoutSchedule::uniform(budget),
    })
}

async fn generate(client: &HttpGenerationClient) -> Result<String, GenerationError> {
    client
        .generate(
            find_variant("decision-driven").unwrap(),
            "Steps:\n- Receive",
            DiagramType::Bpmn,
        )
        .await
}

// ---- Test: success returns payload and sends the expected request ----

#[tokio::test]
async fn success_returns_payload() {
    let router = Router::new().route(
        "/functions/v1/generate-bpmn",
        post(|headers: HeaderMap, Json(body): Json<serde_json::Value>| async move {
            let auth = headers
                .get("authorization")
                .and_then(|v| v.to_str().ok())
                .unwrap_or_default()
                .to_string();
            let ok = auth == "Bearer test-key"
                && body["diagramType"] == "bpmn"
                && body["skipCache"] == true
                && body["agentMode"] == true
                && body["prompt"].as_str().is_some_and(|p| p.contains("Receive"));
            if ok {
                (StatusCode::OK, Json(serde_json::json!({ "payload": PAYLOAD })))
            } else {
                (StatusCode::BAD_REQUEST, Json(serde_json::json!({ "error": "bad request" })))
            }
        }),
    );
    let base = spawn_server(router).await;

    let payload = generate(&client(base, Duration::from_secs(5))).await.unwrap();
    assert_eq!(payload, PAYLOAD);
}

// ---- Test: 429 is rate limited ----

#[tokio::test]
async fn too_many_requests_is_rate_limited() {
    let router = Router::new().route(
        "/functions/v1/generate-bpmn",
        post(|| async { (StatusCode::TOO_MANY_REQUESTS, "slow down") }),
    );
    let base = spawn_server(router).await;

    let err = generate(&client(base, Duration::from_secs(5))).await.unwrap_err();
    assert_matches!(err, GenerationError::RateLimited);
}

// ---- Test: other non-2xx statuses are transport errors ----

#[tokio::test]
async fn server_error_is_transport_error() {
    let router = Router::new().route(
        "/functions/v1/generate-bpmn",
        post(|| async { (StatusCode::INTERNAL_SERVER_ERROR, "boom") }),
    );
    let base = spawn_server(router).await;

    let err = generate(&client(base, Duration::from_secs(5))).await.unwrap_err();
    assert_matches!(err, GenerationError::Transport(msg) if msg.contains("500"));
}

// ---- Test: 2xx without payload is malformed ----

#[tokio::test]
async fn missing_payload_is_malformed() {
    let router = Router::new().route(
        "/functions/v1/generate-bpmn",
        post(|| async { Json(serde_json::json!({ "payload": "" })) }),
    );
    let base = spawn_server(router).await;

    let err = generate(&client(base, Duration::from_secs(5))).await.unwrap_err();
    assert_matches!(err, GenerationError::MalformedResponse(_));
}

// ---- Test: 2xx with a non-JSON body is malformed ----

#[tokio::test]
async fn non_json_body_is_malformed() {
    let router = Router::new().route(
        "/functions/v1/generate-bpmn",
        post(|| async { "<html>gateway page</html>" }),
    );
    let base = spawn_server(router).await;

    let err = generate(&client(base, Duration::from_secs(5))).await.unwrap_err();
    assert_matches!(err, GenerationError::MalformedResponse(_));
}

// ---- Test: slow service times out at the tier budget ----

#[tokio::test]
async fn slow_service_times_out() {
    let router = Router::new().route(
        "/functions/v1/generate-bpmn",
        post(|| async {
            tokio::time::sleep(Duration::from_secs(5)).await;
            Json(serde_json::json!({ "payload": PAYLOAD }))
        }),
    );
    let base = spawn_server(router).await;

    let budget = Duration::from_millis(200);
    let started = std::time::Instant::now();
    let err = generate(&client(base, budget)).await.unwrap_err();

    assert_matches!(err, GenerationError::Timeout(b) if b == budget);
    assert!(started.elapsed() < Duration::from_secs(2));
}

// ---- Test: unreachable service is a transport error ----

#[tokio::test]
async fn connection_refused_is_transport_error() {
    // Bind then drop to get a port with nothing listening.
    let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    drop(listener);

    let err = generate(&client(format!("http://{addr}"), Duration::from_secs(5)))
        .await
        .unwrap_err();
    assert_matches!(err, GenerationError::Transport(_));
}

// ---- Test: timeout schedule is exposed per variant ----

#[test]
fn timeout_for_uses_configured_schedule() {
    let c = client("http://unused".into(), Duration::from_secs(7));
    let v = find_variant("orchestrated-services").unwrap();
    assert_eq!(c.timeout_for(v), Duration::from_secs(7));
}
