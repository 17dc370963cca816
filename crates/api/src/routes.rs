use std::sync::Arc;

use axum::extract::{DefaultBodyLimit, Multipart, Path, State};
use axum::http::StatusCode;
use axum::routing::{get, post};
use axum::{Json, Router};
use index::GraphStore;
use query::GraphChat;
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value, json};
use tower_http::cors::CorsLayer;
use tower_http::trace::TraceLayer;
use tracing::info;

use crate::error::ApiError;
use crate::jobs::{Job, JobManager};
use crate::metrics::{Metrics, MetricsSnapshot};
use crate::pipeline::IngestOutcome;

pub struct AppState {
    pub jobs: JobManager,
    pub store: Arc<dyn GraphStore>,
    pub chat: GraphChat,
    pub metrics: Arc<Metrics>,
}

#[derive(Deserialize)]
pub struct QueryRequest {
    pub query: String,
    #[serde(default)]
    pub params: Map<String, Value>,
}

#[derive(Deserialize)]
pub struct ChatRequest {
    pub message: String,
}

#[derive(Serialize)]
pub struct ChatResponse {
    pub response: String,
    pub entities: Vec<String>,
    pub context: Vec<String>,
}

#[derive(Serialize)]
pub struct SubmitResponse {
    pub job_id: String,
    pub status: &'static str,
}

pub fn router(state: Arc<AppState>, max_upload_bytes: usize) -> Router {
    Router::new()
        .route("/health", get(health_check))
        .route("/stats", get(get_stats))
        .route("/metrics", get(get_metrics))
        .route("/ingest", post(ingest_document))
        .route("/ingest/async", post(submit_document))
        .route("/jobs/:job_id", get(job_status))
        .route("/query", post(run_query))
        .route("/graph", get(export_graph).delete(clear_graph))
        .route("/chat", post(chat))
        .layer(DefaultBodyLimit::max(max_upload_bytes))
        .layer(CorsLayer::permissive())
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}

fn tracked<T>(metrics: &Metrics, result: Result<T, ApiError>) -> Result<T, ApiError> {
    metrics.record_request(result.is_ok());
    result
}

/// Pull the `file` field out of a multipart upload.
async fn read_upload(mut multipart: Multipart) -> Result<(String, Vec<u8>), ApiError> {
    while let Some(field) = multipart
        .next_field()
        .await
        .map_err(|e| ApiError::BadRequest(e.to_string()))?
    {
        if field.name() != Some("file") {
            continue;
        }

        let filename = field
            .file_name()
            .map(str::to_string)
            .filter(|name| !name.trim().is_empty())
            .ok_or_else(|| ApiError::BadRequest("Uploaded file has no filename".to_string()))?;
        let bytes = field
            .bytes()
            .await
            .map_err(|e| ApiError::BadRequest(e.to_string()))?;

        return Ok((filename, bytes.to_vec()));
    }

    Err(ApiError::BadRequest("Missing multipart field 'file'".to_string()))
}

async fn ingest_document(
    State(state): State<Arc<AppState>>,
    multipart: Multipart,
) -> Result<Json<IngestOutcome>, ApiError> {
    let result: Result<_, ApiError> = async {
        let (filename, bytes) = read_upload(multipart).await?;
        info!(filename = %filename, bytes = bytes.len(), "Synchronous ingest");
        let outcome = state.jobs.run_now(filename, bytes).await?;
        Ok(Json(outcome))
    }
    .await;

    tracked(&state.metrics, result)
}

async fn submit_document(
    State(state): State<Arc<AppState>>,
    multipart: Multipart,
) -> Result<(StatusCode, Json<SubmitResponse>), ApiError> {
    let result: Result<_, ApiError> = async {
        let (filename, bytes) = read_upload(multipart).await?;
        let job_id = state.jobs.submit(filename, bytes);
        Ok((
            StatusCode::ACCEPTED,
            Json(SubmitResponse {
                job_id,
                status: "pending",
            }),
        ))
    }
    .await;

    tracked(&state.metrics, result)
}

async fn job_status(
    State(state): State<Arc<AppState>>,
    Path(job_id): Path<String>,
) -> Result<Json<Job>, ApiError> {
    let result = state
        .jobs
        .get(&job_id)
        .map(Json)
        .ok_or(ApiError::JobNotFound(job_id));

    tracked(&state.metrics, result)
}

async fn run_query(
    State(state): State<Arc<AppState>>,
    Json(req): Json<QueryRequest>,
) -> Result<Json<Value>, ApiError> {
    let result: Result<_, ApiError> = async {
        if req.query.trim().is_empty() {
            return Err(ApiError::BadRequest("Query must not be empty".to_string()));
        }
        let rows = state.store.query(&req.query, req.params).await?;
        Ok(Json(json!({ "results": rows })))
    }
    .await;

    tracked(&state.metrics, result)
}

async fn export_graph(State(state): State<Arc<AppState>>) -> Result<Json<Value>, ApiError> {
    let result: Result<_, ApiError> = async {
        let graph = state.store.export_graph().await?;
        Ok(Json(json!({
            "entities": graph.entities,
            "relations": graph.relations,
        })))
    }
    .await;

    tracked(&state.metrics, result)
}

async fn clear_graph(State(state): State<Arc<AppState>>) -> Result<Json<Value>, ApiError> {
    let result: Result<_, ApiError> = async {
        state.store.clear().await?;
        info!(backend = state.store.backend(), "Graph cleared");
        Ok(Json(json!({ "status": "cleared" })))
    }
    .await;

    tracked(&state.metrics, result)
}

async fn chat(
    State(state): State<Arc<AppState>>,
    Json(req): Json<ChatRequest>,
) -> Result<Json<ChatResponse>, ApiError> {
    let result: Result<_, ApiError> = async {
        if req.message.trim().is_empty() {
            return Err(ApiError::BadRequest("Message must not be empty".to_string()));
        }
        let answer = state.chat.answer(&req.message).await?;
        Ok(Json(ChatResponse {
            response: answer.answer,
            entities: answer.entities,
            context: answer.context,
        }))
    }
    .await;

    tracked(&state.metrics, result)
}

async fn health_check(State(state): State<Arc<AppState>>) -> Json<Value> {
    let graph = match state.store.ping().await {
        Ok(()) => "ok".to_string(),
        Err(e) => format!("error: {}", e),
    };

    Json(json!({
        "status": "ok",
        "graph_store": state.store.backend(),
        "graph": graph,
    }))
}

async fn get_stats(State(state): State<Arc<AppState>>) -> Result<Json<Value>, ApiError> {
    let stats = state.store.stats().await?;
    Ok(Json(json!({
        "backend": state.store.backend(),
        "entity_count": stats.entity_count,
        "relation_count": stats.relation_count,
        "jobs": state.jobs.registry().len(),
    })))
}

async fn get_metrics(State(state): State<Arc<AppState>>) -> Json<MetricsSnapshot> {
    Json(state.metrics.snapshot())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testing::{ScriptedExtractor, test_state};
    use axum::body::Body;
    use axum::http::{Request, Response, header};
    use index::MemoryGraphStore;
    use std::time::Duration;
    use tower::ServiceExt;

    const BOUNDARY: &str = "kg-test-boundary";

    const MUSK: &str = r#"{
        "entities": [
            {"name": "Elon Musk", "type": "Person", "description": "Entrepreneur"},
            {"name": "SpaceX", "type": "Organization", "description": "Rocket maker"},
            {"name": "Tesla", "type": "Organization"}
        ],
        "relations": [
            {"source": "Elon Musk", "target": "SpaceX", "type": "CEO_OF"},
            {"source": "Elon Musk", "target": "Tesla", "type": "CEO_OF"}
        ]
    }"#;

    fn app(replies: Vec<Result<&'static str, &'static str>>, staging: &std::path::Path) -> Router {
        let state = test_state(
            ScriptedExtractor::new(replies),
            Arc::new(MemoryGraphStore::new()),
            staging,
        );
        router(state, 1024 * 1024)
    }

    fn upload(uri: &str, field: &str, filename: &str, content: &str) -> Request<Body> {
        let body = format!(
            "--{b}\r\nContent-Disposition: form-data; name=\"{field}\"; filename=\"{filename}\"\r\nContent-Type: text/plain\r\n\r\n{content}\r\n--{b}--\r\n",
            b = BOUNDARY,
        );
        Request::builder()
            .method("POST")
            .uri(uri)
            .header(
                header::CONTENT_TYPE,
                format!("multipart/form-data; boundary={}", BOUNDARY),
            )
            .body(Body::from(body))
            .unwrap()
    }

    fn json_request(method: &str, uri: &str, body: Value) -> Request<Body> {
        Request::builder()
            .method(method)
            .uri(uri)
            .header(header::CONTENT_TYPE, "application/json")
            .body(Body::from(body.to_string()))
            .unwrap()
    }

    fn get_request(uri: &str) -> Request<Body> {
        Request::builder().uri(uri).body(Body::empty()).unwrap()
    }

    async fn body_json(response: Response<Body>) -> Value {
        let bytes = axum::body::to_bytes(response.into_body(), usize::MAX)
            .await
            .unwrap();
        serde_json::from_slice(&bytes).unwrap()
    }

    #[tokio::test]
    async fn test_sync_ingest_builds_graph() {
        let staging = tempfile::tempdir().unwrap();
        let app = app(vec![Ok(MUSK)], staging.path());

        let response = app
            .clone()
            .oneshot(upload("/ingest", "file", "musk.txt", "Elon Musk is the CEO of SpaceX and Tesla."))
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::OK);
        let body = body_json(response).await;
        assert_eq!(body["entities"].as_array().unwrap().len(), 3);
        assert_eq!(body["relations"].as_array().unwrap().len(), 2);
        assert_eq!(body["validation"]["conforms"], json!(true));
        assert_eq!(body["persisted"], json!(true));

        let graph = body_json(app.clone().oneshot(get_request("/graph")).await.unwrap()).await;
        assert_eq!(graph["entities"].as_array().unwrap().len(), 3);
        assert_eq!(graph["relations"][0]["type"], json!("CEO_OF"));

        let stats = body_json(app.oneshot(get_request("/stats")).await.unwrap()).await;
        assert_eq!(stats["entity_count"], json!(3));
        assert_eq!(stats["relation_count"], json!(2));
        assert_eq!(stats["backend"], json!("memory"));
    }

    #[tokio::test]
    async fn test_unsupported_upload_is_unprocessable() {
        let staging = tempfile::tempdir().unwrap();
        let app = app(vec![], staging.path());

        let response = app
            .oneshot(upload("/ingest", "file", "paper.pdf", "%PDF-1.4"))
            .await
            .unwrap();

        assert_eq!(response.status(), StatusCode::UNPROCESSABLE_ENTITY);
        let body = body_json(response).await;
        assert!(body["detail"].as_str().unwrap().contains("Unsupported file format"));
    }

    #[tokio::test]
    async fn test_sync_ingest_panic_is_internal_error() {
        let staging = tempfile::tempdir().unwrap();
        let state = test_state(
            ScriptedExtractor::panicking(),
            Arc::new(MemoryGraphStore::new()),
            staging.path(),
        );
        let app = router(state, 1024 * 1024);

        let response = app
            .oneshot(upload("/ingest", "file", "a.txt", "Some text"))
            .await
            .unwrap();

        assert_eq!(response.status(), StatusCode::INTERNAL_SERVER_ERROR);
        let body = body_json(response).await;
        assert!(body["detail"].as_str().unwrap().contains("extractor exploded"));
    }

    #[tokio::test]
    async fn test_missing_file_field_is_bad_request() {
        let staging = tempfile::tempdir().unwrap();
        let app = app(vec![], staging.path());

        let response = app
            .oneshot(upload("/ingest", "document", "a.txt", "hello"))
            .await
            .unwrap();

        assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    }

    #[tokio::test]
    async fn test_async_ingest_job_lifecycle() {
        let staging = tempfile::tempdir().unwrap();
        let app = app(vec![Ok(MUSK)], staging.path());

        let response = app
            .clone()
            .oneshot(upload("/ingest/async", "file", "musk.txt", "Elon Musk is the CEO of SpaceX."))
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::ACCEPTED);
        let job_id = body_json(response).await["job_id"].as_str().unwrap().to_string();

        let mut job = Value::Null;
        for _ in 0..200 {
            let response = app
                .clone()
                .oneshot(get_request(&format!("/jobs/{}", job_id)))
                .await
                .unwrap();
            assert_eq!(response.status(), StatusCode::OK);
            job = body_json(response).await;
            if job["status"] == json!("completed") || job["status"] == json!("failed") {
                break;
            }
            tokio::time::sleep(Duration::from_millis(10)).await;
        }

        assert_eq!(job["status"], json!("completed"));
        assert_eq!(job["progress"], json!(100.0));
        assert_eq!(job["result"]["entities"].as_array().unwrap().len(), 3);
        assert_eq!(job["error"], Value::Null);
    }

    #[tokio::test]
    async fn test_unknown_job_is_not_found() {
        let staging = tempfile::tempdir().unwrap();
        let app = app(vec![], staging.path());

        let response = app.oneshot(get_request("/jobs/does-not-exist")).await.unwrap();

        assert_eq!(response.status(), StatusCode::NOT_FOUND);
        let body = body_json(response).await;
        assert_eq!(body["detail"], json!("Job not found: does-not-exist"));
    }

    #[tokio::test]
    async fn test_clear_graph() {
        let staging = tempfile::tempdir().unwrap();
        let app = app(vec![Ok(MUSK)], staging.path());
        app.clone()
            .oneshot(upload("/ingest", "file", "musk.txt", "Elon Musk runs Tesla."))
            .await
            .unwrap();

        let response = app
            .clone()
            .oneshot(Request::builder().method("DELETE").uri("/graph").body(Body::empty()).unwrap())
            .await
            .unwrap();
        assert_eq!(body_json(response).await, json!({ "status": "cleared" }));

        let stats = body_json(app.oneshot(get_request("/stats")).await.unwrap()).await;
        assert_eq!(stats["entity_count"], json!(0));
    }

    #[tokio::test]
    async fn test_chat_answers_from_graph_context() {
        let staging = tempfile::tempdir().unwrap();
        let app = app(
            vec![
                Ok(MUSK),
                Ok(r#"{"entities": [{"name": "SpaceX", "type": "Organization"}], "relations": []}"#),
            ],
            staging.path(),
        );
        app.clone()
            .oneshot(upload("/ingest", "file", "musk.txt", "Elon Musk is the CEO of SpaceX and Tesla."))
            .await
            .unwrap();

        let response = app
            .oneshot(json_request("POST", "/chat", json!({ "message": "Who runs SpaceX?" })))
            .await
            .unwrap();

        assert_eq!(response.status(), StatusCode::OK);
        let body = body_json(response).await;
        assert_eq!(body["entities"], json!(["SpaceX"]));
        assert_eq!(body["context"], json!(["Elon Musk CEO_OF SpaceX (Entrepreneur)"]));
        assert_eq!(body["response"], json!("Elon Musk is the CEO of SpaceX."));
    }

    #[tokio::test]
    async fn test_blank_query_is_bad_request() {
        let staging = tempfile::tempdir().unwrap();
        let app = app(vec![], staging.path());

        let response = app
            .oneshot(json_request("POST", "/query", json!({ "query": "  " })))
            .await
            .unwrap();

        assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    }

    #[tokio::test]
    async fn test_health_and_metrics() {
        let staging = tempfile::tempdir().unwrap();
        let app = app(vec![], staging.path());

        let health = body_json(app.clone().oneshot(get_request("/health")).await.unwrap()).await;
        assert_eq!(health["status"], json!("ok"));
        assert_eq!(health["graph"], json!("ok"));

        app.clone().oneshot(get_request("/jobs/missing")).await.unwrap();
        let metrics = body_json(app.oneshot(get_request("/metrics")).await.unwrap()).await;
        assert_eq!(metrics["failed_requests"], json!(1));
    }
}
