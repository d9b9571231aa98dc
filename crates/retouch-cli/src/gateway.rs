//! HTTP gateway: JSON routes over the TaskManager.

use std::sync::Arc;

use axum::{
    Json, Router,
    extract::{DefaultBodyLimit, Path, State, rejection::JsonRejection},
    http::StatusCode,
    response::{IntoResponse, Response},
    routing::{get, post},
};
use base64::Engine;
use base64::engine::general_purpose::STANDARD;
use retouch_core::TaskManager;
use retouch_core::domain::{CoreError, ImagePayload, TaskId, TaskOutcome, TaskStatus};
use retouch_core::impls::probe_pixel_count;
use serde::{Deserialize, Serialize};
use serde_json::{Value, json};
use tower_http::cors::CorsLayer;
use tower_http::trace::TraceLayer;

/// REST API routes
pub fn router(manager: Arc<TaskManager>, max_body_bytes: usize) -> Router {
    Router::new()
        .route("/api/repair", post(repair))
        .route("/api/status/:task_id", get(status))
        .route("/api/cancel/:task_id", post(cancel))
        .route("/api/health", get(health))
        .layer(DefaultBodyLimit::max(max_body_bytes))
        .layer(TraceLayer::new_for_http())
        .layer(CorsLayer::permissive())
        .with_state(manager)
}

#[derive(Debug, Deserialize)]
struct RepairRequest {
    image: Option<String>,
    image_url: Option<String>,
}

#[derive(Debug, Serialize)]
struct RepairResponse {
    task_id: TaskId,
    status: TaskStatus,
    image_info: ImageInfo,
}

#[derive(Debug, Serialize)]
struct ImageInfo {
    /// Rounded megapixels, or "N/A" when the size is unknown at admission.
    megapixels: Value,
    estimated_time_seconds: u64,
}

#[derive(Debug, Serialize)]
struct HealthResponse {
    status: &'static str,
    enhancer: String,
    workers: usize,
    tasks_in_queue: usize,
    active_processing_tasks: usize,
    total_managed_tasks: usize,
}

async fn repair(
    State(manager): State<Arc<TaskManager>>,
    body: Result<Json<RepairRequest>, JsonRejection>,
) -> Result<Json<RepairResponse>, ApiError> {
    let Json(req) = body?;

    let (payload, size_hint) = match (req.image, req.image_url) {
        (Some(data), _) => {
            let payload = ImagePayload::from_data_url(&data)?;
            let size_hint = match &payload {
                ImagePayload::Inline(bytes) => Some(probe_pixel_count(bytes)?),
                ImagePayload::Remote(_) => None,
            };
            (payload, size_hint)
        }
        (None, Some(url)) => (ImagePayload::from_url(&url)?, None),
        (None, None) => {
            return Err(ApiError::BadRequest(
                "No image data or image_url provided".to_string(),
            ));
        }
    };

    let admission = manager.submit(payload, size_hint).await?;
    Ok(Json(RepairResponse {
        task_id: admission.task_id,
        status: TaskStatus::Pending,
        image_info: ImageInfo {
            megapixels: admission.megapixels.map_or_else(|| json!("N/A"), |mp| json!(mp)),
            estimated_time_seconds: admission.estimated_timeout_secs,
        },
    }))
}

async fn status(
    State(manager): State<Arc<TaskManager>>,
    Path(task_id): Path<String>,
) -> Result<Json<Value>, ApiError> {
    let task_id: TaskId = task_id.parse().map_err(|_| ApiError::NotFound)?;
    let report = manager.query_status(task_id).await?;

    let body = match (report.status, report.result) {
        (TaskStatus::Pending, _) => match (report.position, report.queue_size) {
            (Some(position), Some(queue_size)) => json!({
                "status": report.status,
                "position": position,
                "queue_size": queue_size,
            }),
            // picked up by a worker, not yet processing
            _ => json!({ "status": report.status, "position": "N/A" }),
        },
        (TaskStatus::Completed, Some(TaskOutcome::Success(bytes))) => json!({
            "status": report.status,
            "result": { "repairedImage": format!("data:image/png;base64,{}", STANDARD.encode(bytes)) },
        }),
        (TaskStatus::Error, Some(TaskOutcome::Error(description))) => json!({
            "status": report.status,
            "error": description,
        }),
        (status, _) => json!({ "status": status }),
    };
    Ok(Json(body))
}

async fn cancel(
    State(manager): State<Arc<TaskManager>>,
    Path(task_id): Path<String>,
) -> Response {
    let cancelled = task_id
        .parse::<TaskId>()
        .is_ok_and(|id| manager.request_cancellation(id));
    if cancelled {
        return Json(json!({ "status": "cancelled" })).into_response();
    }
    (
        StatusCode::NOT_FOUND,
        Json(json!({
            "status": "cannot_cancel",
            "message": "Task already completed or not found",
        })),
    )
        .into_response()
}

async fn health(State(manager): State<Arc<TaskManager>>) -> Json<HealthResponse> {
    let snapshot = manager.health_snapshot().await;
    Json(HealthResponse {
        status: "healthy",
        enhancer: snapshot.enhancer,
        workers: snapshot.worker_count,
        tasks_in_queue: snapshot.queue_depth,
        active_processing_tasks: snapshot.processing_count,
        total_managed_tasks: snapshot.total_tracked_tasks,
    })
}

/// API error types
#[derive(Debug)]
enum ApiError {
    BadRequest(String),
    NotFound,
    Busy(String),
    Rejected(JsonRejection),
    Internal(String),
}

impl From<CoreError> for ApiError {
    fn from(err: CoreError) -> Self {
        match err {
            CoreError::InvalidInput(msg) => ApiError::BadRequest(msg),
            CoreError::NotFound(_) => ApiError::NotFound,
            err @ CoreError::ServiceBusy { .. } => ApiError::Busy(err.to_string()),
            err => ApiError::Internal(err.to_string()),
        }
    }
}

impl From<JsonRejection> for ApiError {
    fn from(rejection: JsonRejection) -> Self {
        ApiError::Rejected(rejection)
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let (status, message) = match self {
            ApiError::BadRequest(msg) => (StatusCode::BAD_REQUEST, msg),
            ApiError::NotFound => (StatusCode::NOT_FOUND, "Task not found".to_string()),
            ApiError::Busy(msg) => (StatusCode::SERVICE_UNAVAILABLE, msg),
            ApiError::Rejected(rejection) => (rejection.status(), rejection.body_text()),
            ApiError::Internal(msg) => {
                tracing::error!(error = %msg, "request failed");
                (StatusCode::INTERNAL_SERVER_ERROR, msg)
            }
        };

        let body = Json(json!({
            "error": message,
        }));

        (status, body).into_response()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::body::Body;
    use axum::http::Request;
    use retouch_core::ServiceConfig;
    use retouch_core::app::AppBuilder;
    use retouch_core::ports::{EnhanceError, Enhancer};
    use std::io::Cursor;
    use tower::ServiceExt;

    struct EchoEnhancer;

    impl Enhancer for EchoEnhancer {
        fn name(&self) -> &str {
            "echo"
        }

        fn enhance(&self, image: &[u8]) -> Result<Vec<u8>, EnhanceError> {
            Ok(image.to_vec())
        }
    }

    fn manager_with(config: ServiceConfig) -> Arc<TaskManager> {
        let app = AppBuilder::new(config)
            .enhancer(Arc::new(EchoEnhancer))
            .build()
            .unwrap();
        app.manager().clone()
    }

    fn manager() -> Arc<TaskManager> {
        manager_with(ServiceConfig::default())
    }

    fn png_data_url(width: u32, height: u32) -> String {
        let img = image::RgbImage::new(width, height);
        let mut out = Cursor::new(Vec::new());
        image::DynamicImage::ImageRgb8(img)
            .write_to(&mut out, image::ImageFormat::Png)
            .unwrap();
        format!("data:image/png;base64,{}", STANDARD.encode(out.into_inner()))
    }

    async fn send(manager: &Arc<TaskManager>, req: Request<Body>) -> (StatusCode, Value) {
        let resp = router(manager.clone(), 1 << 20).oneshot(req).await.unwrap();
        let status = resp.status();
        let bytes = axum::body::to_bytes(resp.into_body(), usize::MAX).await.unwrap();
        (status, serde_json::from_slice(&bytes).unwrap())
    }

    fn post_json(uri: &str, body: Value) -> Request<Body> {
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

    fn post(uri: &str) -> Request<Body> {
        Request::builder().method("POST").uri(uri).body(Body::empty()).unwrap()
    }

    async fn submit_inline(manager: &Arc<TaskManager>) -> String {
        let (code, body) = send(manager, post_json("/api/repair", json!({ "image": png_data_url(4, 3) }))).await;
        assert_eq!(code, StatusCode::OK);
        body["task_id"].as_str().unwrap().to_string()
    }

    #[tokio::test]
    async fn inline_image_is_admitted_and_queued() {
        let m = manager();
        let (code, body) = send(&m, post_json("/api/repair", json!({ "image": png_data_url(4, 3) }))).await;
        assert_eq!(code, StatusCode::OK);
        assert_eq!(body["status"], "pending");
        assert_eq!(body["image_info"]["megapixels"], json!(0.0));
        assert_eq!(body["image_info"]["estimated_time_seconds"], 30);

        let task_id = body["task_id"].as_str().unwrap();
        assert!(task_id.starts_with("task-"));
        let (code, body) = send(&m, get(&format!("/api/status/{task_id}"))).await;
        assert_eq!(code, StatusCode::OK);
        assert_eq!(body, json!({ "status": "pending", "position": 1, "queue_size": 1 }));
    }

    #[tokio::test]
    async fn url_submission_has_unknown_size() {
        let m = manager();
        let (code, body) = send(
            &m,
            post_json("/api/repair", json!({ "image_url": "https://img.test/face.jpg" })),
        )
        .await;
        assert_eq!(code, StatusCode::OK);
        assert_eq!(body["image_info"]["megapixels"], "N/A");
        assert_eq!(body["image_info"]["estimated_time_seconds"], 120);
    }

    #[tokio::test]
    async fn bad_input_is_rejected() {
        let m = manager();

        let (code, body) = send(&m, post_json("/api/repair", json!({}))).await;
        assert_eq!(code, StatusCode::BAD_REQUEST);
        assert_eq!(body["error"], "No image data or image_url provided");

        let (code, body) = send(&m, post_json("/api/repair", json!({ "image_url": "ftp://x/y.png" }))).await;
        assert_eq!(code, StatusCode::BAD_REQUEST);
        assert_eq!(body["error"], "Invalid URL format");

        let not_an_image = format!("data:image/png;base64,{}", STANDARD.encode(b"hello"));
        let (code, body) = send(&m, post_json("/api/repair", json!({ "image": not_an_image }))).await;
        assert_eq!(code, StatusCode::BAD_REQUEST);
        assert!(body["error"].as_str().unwrap().starts_with("Invalid image data"));

        let (code, _) = send(&m, post_json("/api/repair", json!({ "image": "data:image/png;base64,@@@" }))).await;
        assert_eq!(code, StatusCode::BAD_REQUEST);

        // nothing was admitted
        assert_eq!(m.store().len(), 0);
    }

    #[tokio::test]
    async fn unknown_task_is_404() {
        let m = manager();
        let (code, body) = send(&m, get("/api/status/task-01ARZ3NDEKTSV4RRFFQ69G5FAV")).await;
        assert_eq!(code, StatusCode::NOT_FOUND);
        assert_eq!(body, json!({ "error": "Task not found" }));

        let (code, _) = send(&m, get("/api/status/not-an-id")).await;
        assert_eq!(code, StatusCode::NOT_FOUND);
    }

    #[tokio::test]
    async fn finished_tasks_expose_result_or_error() {
        let m = manager();
        let done = submit_inline(&m).await;
        let failed = submit_inline(&m).await;

        let done_id: TaskId = done.parse().unwrap();
        m.store().set_status(done_id, TaskStatus::Processing);
        m.store().complete(done_id, vec![1, 2, 3]);
        let failed_id: TaskId = failed.parse().unwrap();
        m.store().set_status(failed_id, TaskStatus::Processing);
        m.store().fail(failed_id, "enhancement failed: boom");

        let (code, body) = send(&m, get(&format!("/api/status/{done}"))).await;
        assert_eq!(code, StatusCode::OK);
        assert_eq!(body["status"], "completed");
        assert_eq!(body["result"]["repairedImage"], "data:image/png;base64,AQID");

        let (code, body) = send(&m, get(&format!("/api/status/{failed}"))).await;
        assert_eq!(code, StatusCode::OK);
        assert_eq!(body, json!({ "status": "error", "error": "enhancement failed: boom" }));
    }

    #[tokio::test]
    async fn cancel_once_then_cannot_cancel() {
        let m = manager();
        let id = submit_inline(&m).await;

        let (code, body) = send(&m, post(&format!("/api/cancel/{id}"))).await;
        assert_eq!(code, StatusCode::OK);
        assert_eq!(body, json!({ "status": "cancelled" }));

        let (code, body) = send(&m, post(&format!("/api/cancel/{id}"))).await;
        assert_eq!(code, StatusCode::NOT_FOUND);
        assert_eq!(body["status"], "cannot_cancel");

        let (_, body) = send(&m, get(&format!("/api/status/{id}"))).await;
        assert_eq!(body, json!({ "status": "cancelled" }));
    }

    #[tokio::test]
    async fn health_reports_counts() {
        let m = manager();
        submit_inline(&m).await;

        let (code, body) = send(&m, get("/api/health")).await;
        assert_eq!(code, StatusCode::OK);
        assert_eq!(
            body,
            json!({
                "status": "healthy",
                "enhancer": "echo",
                "workers": 2,
                "tasks_in_queue": 1,
                "active_processing_tasks": 0,
                "total_managed_tasks": 1,
            })
        );
    }

    #[tokio::test]
    async fn full_queue_is_503() {
        let m = manager_with(ServiceConfig {
            queue_capacity: Some(1),
            ..ServiceConfig::default()
        });
        submit_inline(&m).await;

        let (code, body) = send(&m, post_json("/api/repair", json!({ "image": png_data_url(2, 2) }))).await;
        assert_eq!(code, StatusCode::SERVICE_UNAVAILABLE);
        assert!(body["error"].as_str().unwrap().contains("capacity"));
        assert_eq!(m.store().len(), 1);
    }
}
