pub mod health;

use axum::{
    extract::DefaultBodyLimit,
    routing::{get, post},
    Router,
};

use crate::font_service::handlers::{handle_create_font_job, handle_get_font_job, MAX_JOB_UPLOAD_BYTES};
use crate::fonts::handlers::{handle_list_fonts, handle_upload_font, MAX_FONT_BYTES};
use crate::layout::handlers;
use crate::state::AppState;

pub fn build_router(state: AppState) -> Router {
    Router::new()
        .route("/health", get(health::health_handler))
        // Composition
        .route("/api/v1/compose", post(handlers::handle_compose))
        .route(
            "/api/v1/preview/:session",
            post(handlers::handle_preview).delete(handlers::handle_drop_preview),
        )
        .route("/api/v1/export/html", post(handlers::handle_export_html))
        // Fonts
        .route(
            "/api/v1/fonts",
            post(handle_upload_font)
                .get(handle_list_fonts)
                .layer(DefaultBodyLimit::max(MAX_FONT_BYTES)),
        )
        // Remote font builds
        .route(
            "/api/v1/font-jobs",
            post(handle_create_font_job).layer(DefaultBodyLimit::max(MAX_JOB_UPLOAD_BYTES)),
        )
        .route("/api/v1/font-jobs/:id", get(handle_get_font_job))
        .with_state(state)
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;
    use std::time::Duration;

    use async_trait::async_trait;
    use axum::body::{to_bytes, Body};
    use axum::http::{header, Request, StatusCode};
    use bytes::Bytes;
    use serde_json::{json, Value};
    use tower::ServiceExt;

    use super::*;
    use crate::config::Config;
    use crate::font_service::{
        CreateJobRequest, CreatedJob, FontBuildService, FontDownload, FontServiceError, RemoteStatus,
    };
    use crate::fonts::testing::minimal_sfnt;

    fn test_config() -> Config {
        let mut config = Config::from_lookup(|_| None).unwrap();
        config.compose_debounce = Duration::ZERO;
        config.font_service.poll_interval = Duration::from_millis(1);
        config
    }

    fn app() -> Router {
        build_router(AppState::new(test_config(), None))
    }

    async fn send(app: &Router, request: Request<Body>) -> (StatusCode, Bytes) {
        let response = app.clone().oneshot(request).await.unwrap();
        let status = response.status();
        let body = to_bytes(response.into_body(), usize::MAX).await.unwrap();
        (status, body)
    }

    async fn send_json(app: &Router, method: &str, uri: &str, body: Value) -> (StatusCode, Value) {
        let request = Request::builder()
            .method(method)
            .uri(uri)
            .header(header::CONTENT_TYPE, "application/json")
            .body(Body::from(body.to_string()))
            .unwrap();
        let (status, bytes) = send(app, request).await;
        let json = if bytes.is_empty() {
            Value::Null
        } else {
            serde_json::from_slice(&bytes).unwrap()
        };
        (status, json)
    }

    async fn get_json(app: &Router, uri: &str) -> (StatusCode, Value) {
        let request = Request::builder().uri(uri).body(Body::empty()).unwrap();
        let (status, bytes) = send(app, request).await;
        (status, serde_json::from_slice(&bytes).unwrap())
    }

    fn long_text() -> String {
        (0..300)
            .map(|i| format!("Line {i}: handwriting samples fill the page one careful stroke at a time."))
            .collect::<Vec<_>>()
            .join("\n")
    }

    #[tokio::test]
    async fn test_health() {
        let (status, body) = get_json(&app(), "/health").await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["service"], "inkpress");
    }

    #[tokio::test]
    async fn test_compose_empty_text() {
        let (status, body) = send_json(&app(), "POST", "/api/v1/compose", json!({"text": ""})).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["pages"], json!([]));
        assert_eq!(body["truncated"], false);
        assert_eq!(body["summary"], "Pages: 0 / 10");
        assert!(body.get("warning").is_none());
    }

    #[tokio::test]
    async fn test_compose_truncation_reports_warning() {
        let (status, body) = send_json(
            &app(),
            "POST",
            "/api/v1/compose",
            json!({"text": long_text(), "max_pages": 2, "strategy": "explicit"}),
        )
        .await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["pages"].as_array().unwrap().len(), 2);
        assert_eq!(body["pages"][0]["kind"], "lines");
        assert_eq!(body["truncated"], true);
        assert_eq!(body["summary"], "Pages: 2 / 2 (text truncated by limit)");
        assert!(body["warning"].is_string());
    }

    #[tokio::test]
    async fn test_compose_max_pages_is_clamped_to_limit() {
        let (_, body) = send_json(&app(), "POST", "/api/v1/compose", json!({"text": "hi", "max_pages": 50})).await;
        assert_eq!(body["max_pages"], 10);
    }

    #[tokio::test]
    async fn test_compose_unknown_font_is_not_found() {
        let (status, body) = send_json(
            &app(),
            "POST",
            "/api/v1/compose",
            json!({"text": "hi", "font_id": uuid::Uuid::new_v4()}),
        )
        .await;
        assert_eq!(status, StatusCode::NOT_FOUND);
        assert_eq!(body["error"]["code"], "NOT_FOUND");
    }

    #[tokio::test]
    async fn test_preview_skips_unchanged_text() {
        let app = app();
        let uri = "/api/v1/preview/tab-1";

        let (status, body) = send_json(&app, "POST", uri, json!({"text": "Dear diary"})).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["status"], "composed");
        assert_eq!(body["pages"][0]["content"], "Dear diary");

        let (_, body) = send_json(&app, "POST", uri, json!({"text": "Dear diary"})).await;
        assert_eq!(body["status"], "unchanged");

        let (_, body) = send_json(&app, "POST", uri, json!({"text": "Dear diary", "force": true})).await;
        assert_eq!(body["status"], "composed");

        let (status, _) = send_json(&app, "DELETE", uri, Value::Null).await;
        assert_eq!(status, StatusCode::NO_CONTENT);
        let (status, _) = send_json(&app, "DELETE", uri, Value::Null).await;
        assert_eq!(status, StatusCode::NOT_FOUND);
    }

    #[tokio::test]
    async fn test_preview_burst_composes_only_latest() {
        let mut config = test_config();
        config.compose_debounce = Duration::from_millis(200);
        let app = build_router(AppState::new(config, None));

        let first = {
            let app = app.clone();
            tokio::spawn(async move { send_json(&app, "POST", "/api/v1/preview/burst", json!({"text": "draf"})).await })
        };
        tokio::time::sleep(Duration::from_millis(50)).await;
        let (_, latest) = send_json(&app, "POST", "/api/v1/preview/burst", json!({"text": "draft"})).await;

        let (_, early) = first.await.unwrap();
        assert_eq!(early["status"], "superseded");
        assert_eq!(latest["status"], "composed");
        assert_eq!(latest["pages"][0]["content"], "draft");
    }

    #[tokio::test]
    async fn test_export_html_is_an_attachment() {
        let request = Request::builder()
            .method("POST")
            .uri("/api/v1/export/html")
            .header(header::CONTENT_TYPE, "application/json")
            .body(Body::from(json!({"text": "Hello"}).to_string()))
            .unwrap();
        let response = app().oneshot(request).await.unwrap();
        assert_eq!(response.status(), StatusCode::OK);

        let headers = response.headers();
        assert!(headers[header::CONTENT_TYPE].to_str().unwrap().starts_with("text/html"));
        let disposition = headers[header::CONTENT_DISPOSITION].to_str().unwrap().to_string();
        assert!(disposition.starts_with("attachment; filename=\"InkPress-Export-"));

        let body = to_bytes(response.into_body(), usize::MAX).await.unwrap();
        let html = String::from_utf8(body.to_vec()).unwrap();
        assert!(html.contains("Hello"));
        assert!(html.contains("Page 1"));
    }

    #[tokio::test]
    async fn test_upload_font_then_compose_with_it() {
        let app = app();
        let request = Request::builder()
            .method("POST")
            .uri("/api/v1/fonts?name=Ana%20Hand.ttf")
            .body(Body::from(minimal_sfnt()))
            .unwrap();
        let (status, bytes) = send(&app, request).await;
        assert_eq!(status, StatusCode::CREATED);
        let uploaded: Value = serde_json::from_slice(&bytes).unwrap();
        assert_eq!(uploaded["family"], "Ana Hand");

        let (_, fonts) = get_json(&app, "/api/v1/fonts").await;
        assert_eq!(fonts.as_array().unwrap().len(), 1);

        let font_id = uploaded["font_id"].clone();
        let (status, body) = send_json(&app, "POST", "/api/v1/compose", json!({"text": "hola", "font_id": font_id})).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["font_name"], "Ana Hand");
        assert!(body["font_family_css"].as_str().unwrap().starts_with("'Ana Hand'"));
    }

    #[tokio::test]
    async fn test_upload_corrupt_woff2_is_rejected() {
        let request = Request::builder()
            .method("POST")
            .uri("/api/v1/fonts")
            .body(Body::from(&b"wOF2\0\0\0\0"[..]))
            .unwrap();
        let (status, bytes) = send(&app(), request).await;
        assert_eq!(status, StatusCode::UNPROCESSABLE_ENTITY);
        let body: Value = serde_json::from_slice(&bytes).unwrap();
        assert_eq!(body["error"]["code"], "FONT_ERROR");
    }

    // ── font jobs ───────────────────────────────────────────────────────────

    struct InstantService;

    #[async_trait]
    impl FontBuildService for InstantService {
        async fn create_job(&self, request: CreateJobRequest) -> Result<CreatedJob, FontServiceError> {
            assert_eq!(request.language, "en");
            assert_eq!(request.images.len(), 1);
            Ok(CreatedJob {
                job_id: "r-9".to_string(),
                font_name: "Remote Hand".to_string(),
            })
        }

        async fn job_status(&self, _job_id: &str) -> Result<RemoteStatus, FontServiceError> {
            Ok(RemoteStatus {
                status: Some("done".to_string()),
                ..RemoteStatus::default()
            })
        }

        async fn download_font(&self, _job_id: &str) -> Result<FontDownload, FontServiceError> {
            Ok(FontDownload {
                data: Bytes::from(minimal_sfnt()),
                content_type: "font/ttf".to_string(),
            })
        }
    }

    fn multipart_request(parts: &[(&str, Option<(&str, &str)>, &str)]) -> Request<Body> {
        let boundary = "inkpress-test-boundary";
        let mut body = String::new();
        for (name, file, content) in parts {
            body.push_str(&format!("--{boundary}\r\n"));
            match file {
                Some((file_name, content_type)) => body.push_str(&format!(
                    "Content-Disposition: form-data; name=\"{name}\"; filename=\"{file_name}\"\r\nContent-Type: {content_type}\r\n\r\n"
                )),
                None => body.push_str(&format!("Content-Disposition: form-data; name=\"{name}\"\r\n\r\n")),
            }
            body.push_str(content);
            body.push_str("\r\n");
        }
        body.push_str(&format!("--{boundary}--\r\n"));

        Request::builder()
            .method("POST")
            .uri("/api/v1/font-jobs")
            .header(header::CONTENT_TYPE, format!("multipart/form-data; boundary={boundary}"))
            .body(Body::from(body))
            .unwrap()
    }

    #[tokio::test]
    async fn test_font_jobs_unavailable_without_service() {
        let request = multipart_request(&[("images[]", Some(("a.png", "image/png")), "png")]);
        let (status, _) = send(&app(), request).await;
        assert_eq!(status, StatusCode::SERVICE_UNAVAILABLE);
    }

    #[tokio::test]
    async fn test_font_job_without_images_is_rejected() {
        let service: Arc<dyn FontBuildService> = Arc::new(InstantService);
        let app = build_router(AppState::new(test_config(), Some(service)));
        let request = multipart_request(&[
            ("images[]", Some(("notes.txt", "text/plain")), "not an image"),
            ("language", None, "en"),
        ]);
        let (status, _) = send(&app, request).await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
    }

    #[tokio::test]
    async fn test_font_job_runs_to_ready() {
        let service: Arc<dyn FontBuildService> = Arc::new(InstantService);
        let state = AppState::new(test_config(), Some(service));
        let app = build_router(state.clone());

        let request = multipart_request(&[
            ("images[]", Some(("a.png", "image/png")), "png"),
            ("language", None, "en"),
            ("apiKey", None, "secret"),
        ]);
        let (status, bytes) = send(&app, request).await;
        assert_eq!(status, StatusCode::ACCEPTED);
        let job: Value = serde_json::from_slice(&bytes).unwrap();
        let uri = format!("/api/v1/font-jobs/{}", job["id"].as_str().unwrap());

        let mut phase = Value::Null;
        for _ in 0..200 {
            let (_, current) = get_json(&app, &uri).await;
            phase = current["phase"].clone();
            if phase == "ready" || phase == "failed" {
                assert_eq!(current["family"], "Remote Hand");
                assert_eq!(current["progress"], 100);
                break;
            }
            tokio::time::sleep(Duration::from_millis(5)).await;
        }
        assert_eq!(phase, "ready");
        assert_eq!(state.fonts.list().await.len(), 1);
    }

    #[tokio::test]
    async fn test_unknown_font_job_is_not_found() {
        let (status, _) = get_json(&app(), &format!("/api/v1/font-jobs/{}", uuid::Uuid::new_v4())).await;
        assert_eq!(status, StatusCode::NOT_FOUND);
    }
}
