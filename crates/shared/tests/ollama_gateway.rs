use std::collections::VecDeque;
use std::sync::Arc;

use axum::extract::State;
use axum::http::StatusCode;
use axum::routing::post;
use axum::{Json, Router};
use serde_json::{Value, json};
use shared::llm::{
    LlmGateway, LlmGatewayError, LlmGatewayRequest, OllamaGateway, OllamaGatewayConfig,
    prompts::intent_analysis_template,
};
use tokio::net::TcpListener;
use tokio::sync::{Mutex, oneshot};

#[derive(Debug, Clone)]
struct MockReply {
    status: StatusCode,
    body: Value,
}

#[derive(Debug, Clone)]
struct TestServerState {
    replies: Arc<Mutex<VecDeque<MockReply>>>,
    seen_bodies: Arc<Mutex<Vec<Value>>>,
}

impl TestServerState {
    fn with_replies(replies: Vec<MockReply>) -> Self {
        Self {
            replies: Arc::new(Mutex::new(VecDeque::from(replies))),
            seen_bodies: Arc::new(Mutex::new(Vec::new())),
        }
    }
}

#[tokio::test]
async fn parses_generate_response_and_usage() {
    let state = TestServerState::with_replies(vec![MockReply {
        status: StatusCode::OK,
        body: success_response_body("served-model", valid_intent_json_string()),
    }]);
    let (url, shutdown_tx, server_task) = spawn_test_server(state.clone()).await;

    let gateway = OllamaGateway::new(config_for(url)).expect("gateway should build");
    let response = gateway
        .generate(intent_request())
        .await
        .expect("generate should succeed");

    shutdown_tx.send(()).expect("shutdown signal should send");
    server_task.await.expect("server task should join");

    assert_eq!(response.model, "served-model");
    assert_eq!(response.output["intent"], "aggregate");
    let usage = response.usage.expect("usage should be present");
    assert_eq!(usage.prompt_tokens, 42);
    assert_eq!(usage.completion_tokens, 17);
    assert_eq!(usage.total_tokens, 59);

    let seen_bodies = state.seen_bodies.lock().await.clone();
    assert_eq!(seen_bodies.len(), 1);
    assert_eq!(seen_bodies[0]["model"], "test-model");
    assert_eq!(seen_bodies[0]["format"], "json");
    assert_eq!(seen_bodies[0]["stream"], false);
}

#[tokio::test]
async fn provider_error_status_is_surfaced() {
    let state = TestServerState::with_replies(vec![MockReply {
        status: StatusCode::INTERNAL_SERVER_ERROR,
        body: json!({"error": "model runner crashed"}),
    }]);
    let (url, shutdown_tx, server_task) = spawn_test_server(state.clone()).await;

    let gateway = OllamaGateway::new(config_for(url)).expect("gateway should build");
    let err = gateway
        .generate(intent_request())
        .await
        .expect_err("server error should fail the request");

    shutdown_tx.send(()).expect("shutdown signal should send");
    server_task.await.expect("server task should join");

    assert!(
        matches!(err, LlmGatewayError::ProviderFailure(ref message) if message.contains("status=500")),
        "expected provider failure, got {err:?}"
    );

    let seen_bodies = state.seen_bodies.lock().await.clone();
    assert_eq!(seen_bodies.len(), 1);
}

#[tokio::test]
async fn non_json_model_output_is_invalid_payload() {
    let state = TestServerState::with_replies(vec![MockReply {
        status: StatusCode::OK,
        body: success_response_body("served-model", "sure, here is your answer".to_string()),
    }]);
    let (url, shutdown_tx, server_task) = spawn_test_server(state.clone()).await;

    let gateway = OllamaGateway::new(config_for(url)).expect("gateway should build");
    let err = gateway
        .generate(intent_request())
        .await
        .expect_err("prose output should fail the request");

    shutdown_tx.send(()).expect("shutdown signal should send");
    server_task.await.expect("server task should join");

    assert!(
        matches!(err, LlmGatewayError::InvalidProviderPayload(_)),
        "expected invalid payload error, got {err:?}"
    );
}

#[tokio::test]
async fn non_object_model_output_is_invalid_payload() {
    let state = TestServerState::with_replies(vec![MockReply {
        status: StatusCode::OK,
        body: success_response_body("served-model", "[1, 2, 3]".to_string()),
    }]);
    let (url, shutdown_tx, server_task) = spawn_test_server(state.clone()).await;

    let gateway = OllamaGateway::new(config_for(url)).expect("gateway should build");
    let err = gateway
        .generate(intent_request())
        .await
        .expect_err("array output should fail the request");

    shutdown_tx.send(()).expect("shutdown signal should send");
    server_task.await.expect("server task should join");

    assert!(
        matches!(err, LlmGatewayError::InvalidProviderPayload(_)),
        "expected invalid payload error, got {err:?}"
    );
}

fn intent_request() -> LlmGatewayRequest {
    LlmGatewayRequest::from_template(
        intent_analysis_template(),
        json!({
            "columns": ["region", "sales"],
            "dtypes": {"region": "text", "sales": "number"},
            "row_count": 120,
            "query": "total sales per region"
        }),
    )
}

fn config_for(generate_url: String) -> OllamaGatewayConfig {
    OllamaGatewayConfig {
        generate_url,
        model: "test-model".to_string(),
        timeout_ms: 5_000,
    }
}

fn valid_intent_json_string() -> String {
    json!({
        "intent": "aggregate",
        "columns": ["sales"],
        "operation": "sum",
        "filters": {},
        "chart_type": null,
        "explanation": "sum of sales grouped by region"
    })
    .to_string()
}

fn success_response_body(model: &str, response: String) -> Value {
    json!({
        "model": model,
        "response": response,
        "done": true,
        "prompt_eval_count": 42,
        "eval_count": 17
    })
}

async fn spawn_test_server(
    state: TestServerState,
) -> (String, oneshot::Sender<()>, tokio::task::JoinHandle<()>) {
    let app = Router::new()
        .route("/api/generate", post(test_generate_handler))
        .with_state(state);

    let listener = TcpListener::bind("127.0.0.1:0")
        .await
        .expect("listener should bind");
    let local_addr = listener
        .local_addr()
        .expect("listener address should resolve");
    let (shutdown_tx, shutdown_rx) = oneshot::channel::<()>();

    let server_task = tokio::spawn(async move {
        let server = axum::serve(listener, app).with_graceful_shutdown(async move {
            let _ = shutdown_rx.await;
        });

        server.await.expect("test server should run");
    });

    (
        format!("http://{local_addr}/api/generate"),
        shutdown_tx,
        server_task,
    )
}

async fn test_generate_handler(
    State(state): State<TestServerState>,
    Json(payload): Json<Value>,
) -> (StatusCode, Json<Value>) {
    state.seen_bodies.lock().await.push(payload);

    let reply = state.replies.lock().await.pop_front().unwrap_or(MockReply {
        status: StatusCode::INTERNAL_SERVER_ERROR,
        body: json!({"error": "exhausted test replies"}),
    });

    (reply.status, Json(reply.body))
}
