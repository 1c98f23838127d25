//! HTTP API for the answering pipeline.
//!
//! | Method | Path | Description |
//! |--------|------|-------------|
//! | `POST` | `/answer` | Full answer as `{ "answer": ... }` |
//! | `POST` | `/answer/stream` | Server-sent events, one `data` event per fragment, then `end` |
//! | `GET`  | `/health` | Liveness and version |
//!
//! Errors are returned as `{ "error": { "code": ..., "message": ... } }`.

use crate::app::{build_pipeline, Preflight};
use axum::{
    extract::{rejection::JsonRejection, State},
    http::StatusCode,
    response::{
        sse::{Event, KeepAlive, Sse},
        IntoResponse, Response,
    },
    routing::{get, post},
    Json, Router,
};
use clap::Args;
use futures::{Stream, StreamExt};
use serde::Serialize;
use std::convert::Infallible;
use std::sync::Arc;
use studyqa_core::{config::AppConfig, AppError, AppResult};
use studyqa_knowledge::{AnswerRequest, RagPipeline};
use tower_http::{
    cors::{Any, CorsLayer},
    trace::TraceLayer,
};

/// Run the HTTP API
#[derive(Args, Debug)]
pub struct ServeCommand {
    /// Address to bind (overrides API_ADDRESS)
    #[arg(short, long)]
    pub address: Option<String>,

    /// Start without checking that the embedding model and collection are reachable
    #[arg(long)]
    pub skip_preflight: bool,
}

impl ServeCommand {
    pub async fn execute(&self, config: &AppConfig) -> AppResult<()> {
        let preflight = if self.skip_preflight {
            Preflight::Skip
        } else {
            Preflight::Verify
        };
        let pipeline = build_pipeline(config, preflight).await?;

        let address = self
            .address
            .clone()
            .unwrap_or_else(|| config.server.address.clone());

        let listener = tokio::net::TcpListener::bind(&address).await?;
        tracing::info!("Listening on http://{}", address);

        axum::serve(listener, router(Arc::new(pipeline)))
            .with_graceful_shutdown(shutdown_signal())
            .await?;

        tracing::info!("Server shutdown complete");
        Ok(())
    }
}

/// Shared state handed to every handler.
#[derive(Clone)]
struct AppState {
    pipeline: Arc<RagPipeline>,
}

/// Routes plus tracing and permissive CORS.
pub fn router(pipeline: Arc<RagPipeline>) -> Router {
    let cors = CorsLayer::new()
        .allow_origin(Any)
        .allow_methods(Any)
        .allow_headers(Any);

    Router::new()
        .route("/answer", post(handle_answer))
        .route("/answer/stream", post(handle_answer_stream))
        .route("/health", get(handle_health))
        .layer(TraceLayer::new_for_http())
        .layer(cors)
        .with_state(AppState { pipeline })
}

async fn shutdown_signal() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        tracing::error!("Failed to listen for shutdown signal: {}", e);
        std::future::pending::<()>().await;
    }
    tracing::info!("Shutdown signal received");
}

// ============ Errors ============

#[derive(Serialize)]
struct ErrorBody {
    error: ErrorDetail,
}

#[derive(Serialize)]
struct ErrorDetail {
    code: String,
    message: String,
}

/// An error on its way to becoming an HTTP response.
#[derive(Debug)]
struct ApiError {
    status: StatusCode,
    code: String,
    message: String,
}

impl ApiError {
    fn detail(&self) -> ErrorDetail {
        ErrorDetail {
            code: self.code.clone(),
            message: self.message.clone(),
        }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let body = ErrorBody {
            error: self.detail(),
        };
        (self.status, Json(body)).into_response()
    }
}

/// Pipeline failures carry a code and a generic message; details stay in the logs.
impl From<AppError> for ApiError {
    fn from(err: AppError) -> Self {
        let (status, message) = match &err {
            AppError::Timeout(_) => (StatusCode::GATEWAY_TIMEOUT, "The answer took too long"),
            AppError::InvalidRequest(_) => (StatusCode::BAD_REQUEST, "The question must not be blank"),
            e if e.is_upstream() => (
                StatusCode::BAD_GATEWAY,
                "A model or search service is unavailable",
            ),
            AppError::MalformedUpstream(_) => (
                StatusCode::BAD_GATEWAY,
                "A search service returned data that could not be used",
            ),
            _ => (
                StatusCode::INTERNAL_SERVER_ERROR,
                "The answer could not be produced",
            ),
        };

        ApiError {
            status,
            code: err.code().to_string(),
            message: message.to_string(),
        }
    }
}

/// Malformed JSON is a 400, a well-formed body of the wrong shape a 422.
impl From<JsonRejection> for ApiError {
    fn from(rejection: JsonRejection) -> Self {
        ApiError {
            status: rejection.status(),
            code: "bad_request".to_string(),
            message: rejection.body_text(),
        }
    }
}

// ============ POST /answer ============

#[derive(Serialize)]
struct AnswerResponse {
    answer: String,
}

async fn handle_answer(
    State(state): State<AppState>,
    payload: Result<Json<AnswerRequest>, JsonRejection>,
) -> Result<Json<AnswerResponse>, ApiError> {
    let Json(request) = payload?;
    let answer = state.pipeline.answer(&request).await?;
    Ok(Json(AnswerResponse { answer }))
}

// ============ POST /answer/stream ============

async fn handle_answer_stream(
    State(state): State<AppState>,
    payload: Result<Json<AnswerRequest>, JsonRejection>,
) -> Result<Sse<impl Stream<Item = Result<Event, Infallible>>>, ApiError> {
    let Json(request) = payload?;
    let fragments = state.pipeline.answer_stream(&request).await?;

    let events = fragments
        .map(|fragment| {
            Ok(match fragment {
                Ok(text) => Event::default().event("data").data(text),
                Err(e) => {
                    tracing::error!(error = %e, "Answer stream failed");
                    error_event(&ApiError::from(e))
                }
            })
        })
        .chain(futures::stream::once(async {
            Ok(Event::default().event("end").data(""))
        }));

    Ok(Sse::new(events).keep_alive(KeepAlive::default()))
}

fn error_event(err: &ApiError) -> Event {
    let payload = serde_json::to_string(&ErrorBody {
        error: err.detail(),
    })
    .unwrap_or_else(|_| format!("{{\"error\":{{\"code\":\"{}\"}}}}", err.code));
    Event::default().event("error").data(payload)
}

// ============ GET /health ============

#[derive(Serialize)]
struct HealthResponse {
    status: String,
    version: String,
}

async fn handle_health() -> Json<HealthResponse> {
    Json(HealthResponse {
        status: "ok".to_string(),
        version: env!("CARGO_PKG_VERSION").to_string(),
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::body::{to_bytes, Body};
    use axum::http::{header, Request};
    use std::time::Duration;
    use studyqa_knowledge::{
        JsonStudyCorpus, PipelineOptions, RetrievedHit, StudyRecord, VectorIndex,
    };
    use studyqa_llm::{LlmClient, LlmRequest, LlmResponse, LlmStream, LlmStreamChunk, LlmUsage};
    use studyqa_prompt::PromptSet;
    use tower::ServiceExt;

    struct FixedLlm {
        reply: String,
    }

    #[async_trait::async_trait]
    impl LlmClient for FixedLlm {
        fn provider_name(&self) -> &str {
            "fixed"
        }

        async fn complete(&self, request: &LlmRequest) -> AppResult<LlmResponse> {
            Ok(LlmResponse {
                content: self.reply.clone(),
                model: request.model.clone(),
                usage: LlmUsage::default(),
                done: true,
            })
        }

        async fn stream(&self, request: &LlmRequest) -> AppResult<LlmStream> {
            let chunks: Vec<AppResult<LlmStreamChunk>> = self
                .reply
                .split_inclusive(' ')
                .map(|piece| {
                    Ok(LlmStreamChunk {
                        content: piece.to_string(),
                        model: request.model.clone(),
                        done: false,
                        usage: None,
                    })
                })
                .collect();
            Ok(Box::pin(futures::stream::iter(chunks)))
        }
    }

    enum IndexMode {
        Hits,
        Offline,
        Stalled,
    }

    struct TestIndex {
        mode: IndexMode,
    }

    #[async_trait::async_trait]
    impl VectorIndex for TestIndex {
        fn collection_name(&self) -> &str {
            "studies"
        }

        async fn search(&self, _query: &str, _top_k: usize) -> AppResult<Vec<RetrievedHit>> {
            match self.mode {
                IndexMode::Hits => Ok(vec![RetrievedHit {
                    point_id: "1".to_string(),
                    external_id: Some("phs001189.q1".to_string()),
                    relevance_score: 0.9,
                    raw_metadata: serde_json::json!({}),
                }]),
                IndexMode::Offline => Err(AppError::VectorIndex("connection refused".to_string())),
                IndexMode::Stalled => {
                    tokio::time::sleep(Duration::from_secs(30)).await;
                    Ok(Vec::new())
                }
            }
        }
    }

    fn app(mode: IndexMode, timeout: Option<Duration>) -> Router {
        let corpus = JsonStudyCorpus::from_records(vec![StudyRecord {
            study_id: "phs001189".to_string(),
            name: "CCAF".to_string(),
            description: "Atrial fibrillation cohort.".to_string(),
        }]);
        let mut options = PipelineOptions::new("test-model");
        options.request_timeout = timeout;

        let pipeline = RagPipeline::new(
            Arc::new(FixedLlm {
                reply: "CCAF (phs001189) studies atrial fibrillation.".to_string(),
            }),
            Arc::new(TestIndex { mode }),
            Arc::new(corpus),
            Arc::new(PromptSet::builtin().unwrap()),
            options,
        )
        .unwrap();
        router(Arc::new(pipeline))
    }

    fn post(uri: &str, body: &str) -> Request<Body> {
        Request::builder()
            .method("POST")
            .uri(uri)
            .header(header::CONTENT_TYPE, "application/json")
            .body(Body::from(body.to_string()))
            .unwrap()
    }

    async fn body_json(response: Response) -> serde_json::Value {
        let bytes = to_bytes(response.into_body(), usize::MAX).await.unwrap();
        serde_json::from_slice(&bytes).unwrap()
    }

    #[tokio::test]
    async fn test_health() {
        let response = app(IndexMode::Hits, None)
            .oneshot(Request::get("/health").body(Body::empty()).unwrap())
            .await
            .unwrap();

        assert_eq!(response.status(), StatusCode::OK);
        let body = body_json(response).await;
        assert_eq!(body["status"], "ok");
        assert_eq!(body["version"], env!("CARGO_PKG_VERSION"));
    }

    #[tokio::test]
    async fn test_answer() {
        let response = app(IndexMode::Hits, None)
            .oneshot(post(
                "/answer",
                r#"{"input":"What does study phs001189 study?","chat_history":[]}"#,
            ))
            .await
            .unwrap();

        assert_eq!(response.status(), StatusCode::OK);
        let body = body_json(response).await;
        assert_eq!(body["answer"], "CCAF (phs001189) studies atrial fibrillation.");
    }

    #[tokio::test]
    async fn test_answer_stream_ends_with_end_event() {
        let response = app(IndexMode::Hits, None)
            .oneshot(post("/answer/stream", r#"{"input":"What is CCAF?"}"#))
            .await
            .unwrap();

        assert_eq!(response.status(), StatusCode::OK);
        let bytes = to_bytes(response.into_body(), usize::MAX).await.unwrap();
        let text = String::from_utf8(bytes.to_vec()).unwrap();

        assert!(text.contains("event: data"));
        assert!(text.contains("data: CCAF "));
        assert!(text.contains("phs001189"));
        let end = text.find("event: end").unwrap();
        assert!(text.rfind("event: data").unwrap() < end);
    }

    #[tokio::test]
    async fn test_upstream_outage_is_bad_gateway() {
        let response = app(IndexMode::Offline, None)
            .oneshot(post("/answer", r#"{"input":"q"}"#))
            .await
            .unwrap();

        assert_eq!(response.status(), StatusCode::BAD_GATEWAY);
        let body = body_json(response).await;
        assert_eq!(body["error"]["code"], "upstream_unavailable");
        assert!(!body["error"]["message"].as_str().unwrap().contains("refused"));
    }

    #[tokio::test]
    async fn test_stream_outage_fails_before_streaming() {
        let response = app(IndexMode::Offline, None)
            .oneshot(post("/answer/stream", r#"{"input":"q"}"#))
            .await
            .unwrap();

        assert_eq!(response.status(), StatusCode::BAD_GATEWAY);
    }

    #[tokio::test]
    async fn test_deadline_is_gateway_timeout() {
        let response = app(IndexMode::Stalled, Some(Duration::from_millis(50)))
            .oneshot(post("/answer", r#"{"input":"q"}"#))
            .await
            .unwrap();

        assert_eq!(response.status(), StatusCode::GATEWAY_TIMEOUT);
        assert_eq!(body_json(response).await["error"]["code"], "timeout");
    }

    #[tokio::test]
    async fn test_malformed_json_is_bad_request() {
        let response = app(IndexMode::Hits, None)
            .oneshot(post("/answer", "{not json"))
            .await
            .unwrap();

        assert_eq!(response.status(), StatusCode::BAD_REQUEST);
        assert_eq!(body_json(response).await["error"]["code"], "bad_request");
    }

    #[tokio::test]
    async fn test_blank_input_is_bad_request() {
        let response = app(IndexMode::Offline, None)
            .oneshot(post("/answer", r#"{"input":"   ","chat_history":[]}"#))
            .await
            .unwrap();

        assert_eq!(response.status(), StatusCode::BAD_REQUEST);
        assert_eq!(body_json(response).await["error"]["code"], "invalid_request");
    }

    #[tokio::test]
    async fn test_missing_input_is_unprocessable() {
        let response = app(IndexMode::Hits, None)
            .oneshot(post("/answer", r#"{"chat_history":[]}"#))
            .await
            .unwrap();

        assert_eq!(response.status(), StatusCode::UNPROCESSABLE_ENTITY);
    }
}
