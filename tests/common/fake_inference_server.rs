//! Fake inference service for integration tests.
//!
//! Spins up a minimal `axum` HTTP server on a random TCP port bound to
//! 127.0.0.1, speaking just enough of the caikit and vLLM REST APIs:
//!
//! - `POST /api/v1/task/text-generation`: `{"generated_text": …}`
//! - `POST /api/v1/task/server-streaming-text-generation`: one SSE event
//!   per configured chunk
//! - `POST /v1/completions`: `{"choices": [{"text": …}]}`
//! - `POST /v2/models/{model}/infer`: a KServe v2 tensor response naming
//!   `{model}__isvc-920cbf97a5`
//!
//! When a token is required, requests without `Authorization` get a 401 with
//! `x-ext-auth-reason: credential not found` and requests with the wrong
//! token a 403 with `x-ext-auth-reason: not authenticated`, the way the
//! serving platform's auth proxy answers.
//!
//! # Example
//!
//! ```rust,no_run
//! let server = FakeInferenceServer::start("74 degrees F").await.unwrap();
//! let target = Target::new(server.authority()).with_scheme(Scheme::Http);
//! ```

use axum::{
    extract::{Path, State},
    http::{HeaderMap, StatusCode},
    response::{IntoResponse, Response},
    routing::post,
    Router,
};
use std::net::SocketAddr;
use std::sync::Arc;
use tokio::net::TcpListener;
use tokio::sync::Mutex;

/// A request as the server saw it.
#[derive(Debug, Clone)]
pub struct ReceivedRequest {
    pub path: String,
    pub authorization: Option<String>,
    pub content_type: Option<String>,
    pub body: String,
}

#[derive(Default)]
struct ServerState {
    generated_text: String,
    stream_chunks: Vec<String>,
    required_token: Option<String>,
    received: Vec<ReceivedRequest>,
}

type Shared = Arc<Mutex<ServerState>>;

/// Handle to the running fake inference server.
pub struct FakeInferenceServer {
    addr: SocketAddr,
    state: Shared,
}

impl FakeInferenceServer {
    /// Start the server answering every query with `generated_text`. Returns
    /// once the server is listening.
    pub async fn start(generated_text: &str) -> std::io::Result<Self> {
        let listener = TcpListener::bind("127.0.0.1:0").await?;
        let addr = listener.local_addr()?;
        let state = Arc::new(Mutex::new(ServerState {
            generated_text: generated_text.to_string(),
            ..ServerState::default()
        }));

        let app = Router::new()
            .route("/api/v1/task/text-generation", post(text_generation))
            .route(
                "/api/v1/task/server-streaming-text-generation",
                post(streaming_text_generation),
            )
            .route("/v1/completions", post(completions))
            .route("/v2/models/{model}/infer", post(tensor_infer))
            .with_state(state.clone());

        tokio::spawn(async move {
            axum::serve(listener, app).await.unwrap();
        });

        Ok(Self { addr, state })
    }

    /// `127.0.0.1:PORT`, usable as a client host.
    pub fn authority(&self) -> String {
        self.addr.to_string()
    }

    /// Reject requests not carrying `Authorization: Bearer <token>`.
    pub async fn require_token(&self, token: &str) {
        self.state.lock().await.required_token = Some(token.to_string());
    }

    /// Chunks returned by the streaming endpoint.
    pub async fn stream(&self, chunks: &[&str]) {
        self.state.lock().await.stream_chunks = chunks.iter().map(|c| c.to_string()).collect();
    }

    pub async fn received(&self) -> Vec<ReceivedRequest> {
        self.state.lock().await.received.clone()
    }
}

// ---------------------------------------------------------------------------
// Route handlers
// ---------------------------------------------------------------------------

/// Record the request and apply the auth check; `Err` is the denial.
async fn admit(
    state: &Shared,
    path: &str,
    headers: &HeaderMap,
    body: String,
) -> Result<String, Response> {
    let header = |name: &str| {
        headers
            .get(name)
            .and_then(|v| v.to_str().ok())
            .map(str::to_string)
    };
    let authorization = header("authorization");

    let mut state = state.lock().await;
    state.received.push(ReceivedRequest {
        path: path.to_string(),
        authorization: authorization.clone(),
        content_type: header("content-type"),
        body,
    });

    if let Some(required) = &state.required_token {
        let expected = format!("Bearer {required}");
        match authorization {
            None => {
                return Err(deny(StatusCode::UNAUTHORIZED, "credential not found"));
            }
            Some(actual) if actual != expected => {
                return Err(deny(StatusCode::FORBIDDEN, "not authenticated"));
            }
            Some(_) => {}
        }
    }
    Ok(state.generated_text.clone())
}

fn deny(status: StatusCode, reason: &'static str) -> Response {
    (status, [("x-ext-auth-reason", reason)], String::new()).into_response()
}

async fn text_generation(State(state): State<Shared>, headers: HeaderMap, body: String) -> Response {
    match admit(&state, "/api/v1/task/text-generation", &headers, body).await {
        Ok(text) => axum::Json(serde_json::json!({
            "generated_text": text,
            "generated_tokens": 5,
            "finish_reason": "EOS_TOKEN",
        }))
        .into_response(),
        Err(denied) => denied,
    }
}

async fn streaming_text_generation(
    State(state): State<Shared>,
    headers: HeaderMap,
    body: String,
) -> Response {
    if let Err(denied) = admit(&state, "/api/v1/task/server-streaming-text-generation", &headers, body).await {
        return denied;
    }
    let chunks = state.lock().await.stream_chunks.clone();
    let events: String = chunks
        .iter()
        .map(|chunk| {
            format!(
                "data: {}\n\n",
                serde_json::json!({ "generated_text": chunk, "tokens": [], "details": null })
            )
        })
        .collect();
    (StatusCode::OK, [("content-type", "text/event-stream")], events).into_response()
}

async fn completions(State(state): State<Shared>, headers: HeaderMap, body: String) -> Response {
    match admit(&state, "/v1/completions", &headers, body).await {
        Ok(text) => axum::Json(serde_json::json!({
            "object": "text_completion",
            "choices": [{ "index": 0, "text": text, "finish_reason": "stop" }],
            "usage": { "completion_tokens": 5 },
        }))
        .into_response(),
        Err(denied) => denied,
    }
}

async fn tensor_infer(
    State(state): State<Shared>,
    Path(model): Path<String>,
    headers: HeaderMap,
    body: String,
) -> Response {
    let path = format!("/v2/models/{model}/infer");
    if let Err(denied) = admit(&state, &path, &headers, body).await {
        return denied;
    }
    // Written out by hand: the output tensor's keys are not in sorted order.
    let body = format!(
        r#"{{"model_name":"{model}__isvc-920cbf97a5","model_version":"1","outputs":[{{"name":"InceptionResnetV2/AuxLogits/Logits/BiasAdd:0","datatype":"FP32","shape":[1,1001],"data":[0.12,-0.4,1.7]}}]}}"#
    );
    (StatusCode::OK, [("content-type", "application/json")], body).into_response()
}
