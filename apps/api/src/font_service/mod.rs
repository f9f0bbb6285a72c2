//! Font-build client: talks to the remote service that turns handwriting
//! samples into a font file.
//!
//! The remote API is a three-step job protocol: create (multipart upload),
//! poll status, download the font. Everything else in the crate goes through
//! the [`FontBuildService`] trait so the job driver can be exercised without a
//! network.

use std::time::Duration;

use async_trait::async_trait;
use bytes::Bytes;
use percent_encoding::{utf8_percent_encode, AsciiSet, NON_ALPHANUMERIC};
use reqwest::multipart::{Form, Part};
use reqwest::{header, Client, Response};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use thiserror::Error;
use tracing::{debug, warn};

use crate::config::FontServiceConfig;
use crate::fonts::FontError;

pub mod handlers;
pub mod jobs;

const MAX_RETRIES: u32 = 3;
/// Error bodies are cut to this many characters.
const ERROR_BODY_LIMIT: usize = 300;
pub const DEFAULT_FONT_NAME: &str = "InkReplicaFont";
const DEFAULT_CONTENT_TYPE: &str = "application/octet-stream";
const JOB_ID_PLACEHOLDER: &str = "{jobId}";

/// Characters left unescaped in a path component, matching what browsers
/// leave alone in `encodeURIComponent`.
const PATH_COMPONENT: &AsciiSet = &NON_ALPHANUMERIC
    .remove(b'-')
    .remove(b'_')
    .remove(b'.')
    .remove(b'!')
    .remove(b'~')
    .remove(b'*')
    .remove(b'\'')
    .remove(b'(')
    .remove(b')');

#[derive(Debug, Error)]
pub enum FontServiceError {
    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    #[error("font service returned {status}: {message}")]
    Api { status: u16, message: String },

    #[error("JSON parse error: {0}")]
    Parse(#[from] serde_json::Error),

    #[error("font service response has no jobId/id")]
    MissingJobId,

    #[error("{0}")]
    JobFailed(String),

    #[error("font job did not finish within {0}s")]
    TimedOut(u64),

    #[error(transparent)]
    Font(#[from] FontError),
}

// ────────────────────────────────────────────────────────────────────────────
// Wire types
// ────────────────────────────────────────────────────────────────────────────

/// One handwriting sample forwarded to the create call.
#[derive(Debug, Clone)]
pub struct SampleImage {
    pub file_name: String,
    pub content_type: String,
    pub data: Bytes,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct OpenTypeHints {
    pub contextual_alternates: bool,
    pub ligatures: bool,
    pub kerning: bool,
    pub stylistic_sets: bool,
}

/// Shaping hints the build service may use when constructing GSUB/GPOS.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct JobOptions {
    pub max_pages: usize,
    pub target: String,
    pub opentype: OpenTypeHints,
}

impl JobOptions {
    pub fn new(max_pages: usize) -> Self {
        Self {
            max_pages,
            target: "us-letter-composer".to_string(),
            opentype: OpenTypeHints {
                contextual_alternates: true,
                ligatures: true,
                kerning: true,
                stylistic_sets: true,
            },
        }
    }
}

#[derive(Debug, Clone)]
pub struct CreateJobRequest {
    pub images: Vec<SampleImage>,
    pub language: String,
    pub options: JobOptions,
    pub api_key: Option<String>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct CreatedJob {
    pub job_id: String,
    pub font_name: String,
}

/// Reads the create-call body. Job id keys are tried in the order `jobId`,
/// `id`, `job_id` and may be strings or numbers.
pub fn parse_created_job(body: &Value) -> Result<CreatedJob, FontServiceError> {
    let job_id = ["jobId", "id", "job_id"]
        .iter()
        .find_map(|key| match body.get(key) {
            Some(Value::String(s)) if !s.trim().is_empty() => Some(s.trim().to_string()),
            Some(Value::Number(n)) => Some(n.to_string()),
            _ => None,
        })
        .ok_or(FontServiceError::MissingJobId)?;

    let font_name = ["fontName", "font_name"]
        .iter()
        .find_map(|key| body.get(key).and_then(Value::as_str))
        .map(str::trim)
        .filter(|name| !name.is_empty())
        .unwrap_or(DEFAULT_FONT_NAME)
        .to_string();

    Ok(CreatedJob { job_id, font_name })
}

/// Raw status body: `{ status, progress, message }`, every field optional.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct RemoteStatus {
    #[serde(default)]
    pub status: Option<String>,
    /// Usually a number, sometimes a numeric string.
    #[serde(default)]
    pub progress: Option<Value>,
    #[serde(default)]
    pub message: Option<String>,
}

#[derive(Debug, Clone, PartialEq)]
pub enum StatusCheck {
    Running { progress: u8, message: String },
    Finished,
    Failed(String),
}

impl RemoteStatus {
    pub fn classify(&self) -> StatusCheck {
        let status = self.status.as_deref().unwrap_or_default().trim().to_lowercase();
        let message = self.message.as_deref().unwrap_or_default().trim();

        match status.as_str() {
            "done" | "completed" => StatusCheck::Finished,
            "error" | "failed" => StatusCheck::Failed(if message.is_empty() {
                "Job failed.".to_string()
            } else {
                message.to_string()
            }),
            _ => StatusCheck::Running {
                progress: self.reported_progress().map_or(20, |p| p.clamp(10.0, 90.0).round() as u8),
                message: if message.is_empty() {
                    format!("Status: {status}")
                } else {
                    message.to_string()
                },
            },
        }
    }

    fn reported_progress(&self) -> Option<f64> {
        let value = match self.progress.as_ref()? {
            Value::Number(n) => n.as_f64()?,
            Value::String(s) => s.trim().parse::<f64>().ok()?,
            _ => return None,
        };
        value.is_finite().then_some(value)
    }
}

#[derive(Debug, Clone)]
pub struct FontDownload {
    pub data: Bytes,
    pub content_type: String,
}

// ────────────────────────────────────────────────────────────────────────────
// Service seam
// ────────────────────────────────────────────────────────────────────────────

#[async_trait]
pub trait FontBuildService: Send + Sync {
    async fn create_job(&self, request: CreateJobRequest) -> Result<CreatedJob, FontServiceError>;

    async fn job_status(&self, job_id: &str) -> Result<RemoteStatus, FontServiceError>;

    async fn download_font(&self, job_id: &str) -> Result<FontDownload, FontServiceError>;
}

/// Joins `base` and `path` with exactly one slash between them.
/// An empty base leaves the path untouched.
pub fn join_url(base: &str, path: &str) -> String {
    let base = base.trim();
    if base.is_empty() {
        return path.to_string();
    }
    match (base.ends_with('/'), path.starts_with('/')) {
        (true, true) => format!("{}{}", &base[..base.len() - 1], path),
        (false, false) => format!("{base}/{path}"),
        _ => format!("{base}{path}"),
    }
}

/// Substitutes the percent-encoded job id into a path template.
pub fn job_path(template: &str, job_id: &str) -> String {
    let encoded = utf8_percent_encode(job_id, PATH_COMPONENT).to_string();
    template.replace(JOB_ID_PLACEHOLDER, &encoded)
}

fn truncate_body(body: &str) -> String {
    body.chars().take(ERROR_BODY_LIMIT).collect()
}

async fn api_error(response: Response) -> FontServiceError {
    let status = response.status().as_u16();
    let body = response.text().await.unwrap_or_default();
    FontServiceError::Api {
        status,
        message: truncate_body(&body),
    }
}

/// `reqwest` implementation of [`FontBuildService`].
#[derive(Clone)]
pub struct FontBuildClient {
    client: Client,
    base_url: String,
    create_path: String,
    status_path: String,
    font_path: String,
}

impl FontBuildClient {
    pub fn new(base_url: &str, config: &FontServiceConfig) -> Result<Self, FontServiceError> {
        Ok(Self {
            client: Client::builder().timeout(config.request_timeout).build()?,
            base_url: base_url.trim().to_string(),
            create_path: config.create_path.clone(),
            status_path: config.status_path.clone(),
            font_path: config.font_path.clone(),
        })
    }

    /// GET with retry on 429 and 5xx, exponential backoff 1s, 2s.
    async fn get_with_retry(&self, url: &str) -> Result<Response, FontServiceError> {
        let mut last_error: Option<FontServiceError> = None;

        for attempt in 0..MAX_RETRIES {
            if attempt > 0 {
                let delay = Duration::from_millis(1000 * (1 << (attempt - 1)));
                warn!(
                    "Font service call attempt {} failed, retrying after {}ms...",
                    attempt,
                    delay.as_millis()
                );
                tokio::time::sleep(delay).await;
            }

            let response = match self.client.get(url).send().await {
                Ok(r) => r,
                Err(e) => {
                    last_error = Some(FontServiceError::Http(e));
                    continue;
                }
            };

            let status = response.status();
            if status.as_u16() == 429 || status.is_server_error() {
                last_error = Some(api_error(response).await);
                continue;
            }
            if !status.is_success() {
                return Err(api_error(response).await);
            }
            return Ok(response);
        }

        Err(last_error.unwrap_or(FontServiceError::Api {
            status: 0,
            message: format!("no response after {MAX_RETRIES} attempts"),
        }))
    }
}

#[async_trait]
impl FontBuildService for FontBuildClient {
    /// Not retried: a create call is not idempotent.
    async fn create_job(&self, request: CreateJobRequest) -> Result<CreatedJob, FontServiceError> {
        let mut form = Form::new();
        for image in request.images {
            let part = Part::bytes(image.data.to_vec())
                .file_name(image.file_name)
                .mime_str(&image.content_type)?;
            form = form.part("images[]", part);
        }
        form = form
            .text("language", request.language)
            .text("options", serde_json::to_string(&request.options)?);
        if let Some(key) = request.api_key.map(|k| k.trim().to_string()).filter(|k| !k.is_empty()) {
            form = form.text("apiKey", key);
        }

        let url = join_url(&self.base_url, &self.create_path);
        let response = self.client.post(&url).multipart(form).send().await?;
        if !response.status().is_success() {
            return Err(api_error(response).await);
        }

        let body: Value = response.json().await?;
        let created = parse_created_job(&body)?;
        debug!(job_id = %created.job_id, font_name = %created.font_name, "Font job created");
        Ok(created)
    }

    async fn job_status(&self, job_id: &str) -> Result<RemoteStatus, FontServiceError> {
        let url = join_url(&self.base_url, &job_path(&self.status_path, job_id));
        let body = self.get_with_retry(&url).await?.text().await?;
        Ok(serde_json::from_str(&body)?)
    }

    async fn download_font(&self, job_id: &str) -> Result<FontDownload, FontServiceError> {
        let url = join_url(&self.base_url, &job_path(&self.font_path, job_id));
        let response = self.get_with_retry(&url).await?;
        let content_type = response
            .headers()
            .get(header::CONTENT_TYPE)
            .and_then(|v| v.to_str().ok())
            .filter(|v| !v.trim().is_empty())
            .unwrap_or(DEFAULT_CONTENT_TYPE)
            .to_string();
        let data = response.bytes().await?;
        debug!(job_id, bytes = data.len(), content_type = %content_type, "Font downloaded");
        Ok(FontDownload { data, content_type })
    }
}

// ────────────────────────────────────────────────────────────────────────────
// Tests
// ────────────────────────────────────────────────────────────────────────────

#[cfg(test)]
mod tests {
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::sync::{Arc, Mutex};

    use axum::body::Body;
    use axum::extract::{Multipart, Path, State};
    use axum::response::IntoResponse;
    use axum::routing::{get, post};
    use axum::{Json, Router};
    use serde_json::json;

    use super::*;

    fn service_config() -> FontServiceConfig {
        FontServiceConfig {
            base_url: None,
            create_path: "/api/font/jobs".to_string(),
            status_path: "/api/font/jobs/{jobId}".to_string(),
            font_path: "/api/font/jobs/{jobId}/font".to_string(),
            poll_interval: Duration::from_millis(1100),
            request_timeout: Duration::from_secs(5),
            job_timeout: Duration::from_secs(600),
            job_retention: Duration::from_secs(3600),
        }
    }

    async fn spawn_backend(router: Router) -> FontBuildClient {
        let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        tokio::spawn(async move {
            axum::serve(listener, router).await.unwrap();
        });
        FontBuildClient::new(&format!("http://{addr}/"), &service_config()).unwrap()
    }

    #[test]
    fn test_join_url() {
        assert_eq!(join_url("https://x.io/", "/api"), "https://x.io/api");
        assert_eq!(join_url("https://x.io", "api"), "https://x.io/api");
        assert_eq!(join_url("https://x.io", "/api"), "https://x.io/api");
        assert_eq!(join_url("https://x.io/", "api"), "https://x.io/api");
        assert_eq!(join_url("  ", "/api"), "/api");
    }

    #[test]
    fn test_job_path_encodes_id() {
        assert_eq!(job_path("/jobs/{jobId}/font", "a b/c"), "/jobs/a%20b%2Fc/font");
        assert_eq!(job_path("/jobs/{jobId}", "job-1_(x)"), "/jobs/job-1_(x)");
    }

    #[test]
    fn test_parse_created_job_aliases() {
        let created = parse_created_job(&json!({"jobId": "abc", "id": "ignored"})).unwrap();
        assert_eq!(created.job_id, "abc");
        assert_eq!(created.font_name, DEFAULT_FONT_NAME);

        let created = parse_created_job(&json!({"job_id": 77, "font_name": "Ana"})).unwrap();
        assert_eq!(created.job_id, "77");
        assert_eq!(created.font_name, "Ana");

        assert!(matches!(
            parse_created_job(&json!({"jobId": ""})),
            Err(FontServiceError::MissingJobId)
        ));
    }

    #[test]
    fn test_status_classification() {
        let status = |v: Value| serde_json::from_value::<RemoteStatus>(v).unwrap().classify();

        assert_eq!(status(json!({"status": "DONE"})), StatusCheck::Finished);
        assert_eq!(status(json!({"status": "completed"})), StatusCheck::Finished);
        assert_eq!(status(json!({"status": "error"})), StatusCheck::Failed("Job failed.".into()));
        assert_eq!(
            status(json!({"status": "failed", "message": "bad scan"})),
            StatusCheck::Failed("bad scan".into())
        );
        assert_eq!(
            status(json!({"status": "running", "progress": 3})),
            StatusCheck::Running { progress: 10, message: "Status: running".into() }
        );
        assert_eq!(
            status(json!({"status": "running", "progress": "99", "message": "tracing"})),
            StatusCheck::Running { progress: 90, message: "tracing".into() }
        );
        assert_eq!(
            status(json!({"status": "queued"})),
            StatusCheck::Running { progress: 20, message: "Status: queued".into() }
        );
    }

    #[tokio::test]
    async fn test_create_job_sends_multipart() {
        let seen: Arc<Mutex<Vec<String>>> = Arc::default();
        let router = Router::new()
            .route(
                "/api/font/jobs",
                post(|State(seen): State<Arc<Mutex<Vec<String>>>>, mut multipart: Multipart| async move {
                    while let Some(field) = multipart.next_field().await.unwrap() {
                        let name = field.name().unwrap_or_default().to_string();
                        let text = field.text().await.unwrap_or_default();
                        seen.lock().unwrap().push(format!("{name}={}", text.len()));
                    }
                    Json(json!({"id": 42, "fontName": "Ana Hand"}))
                }),
            )
            .with_state(Arc::clone(&seen));
        let client = spawn_backend(router).await;

        let created = client
            .create_job(CreateJobRequest {
                images: vec![SampleImage {
                    file_name: "sample.png".into(),
                    content_type: "image/png".into(),
                    data: Bytes::from_static(b"png!"),
                }],
                language: "es".into(),
                options: JobOptions::new(10),
                api_key: Some("   ".into()),
            })
            .await
            .unwrap();

        assert_eq!(created, CreatedJob { job_id: "42".into(), font_name: "Ana Hand".into() });
        let seen = seen.lock().unwrap().clone();
        assert_eq!(seen.len(), 3, "blank api key must not be sent: {seen:?}");
        assert_eq!(seen[0], "images[]=4");
        assert_eq!(seen[1], "language=2");
        assert!(seen[2].starts_with("options="));
    }

    #[tokio::test]
    async fn test_status_and_download() {
        let router = Router::new()
            .route(
                "/api/font/jobs/:id",
                get(|Path(id): Path<String>| async move {
                    Json(json!({"status": "running", "progress": 55, "message": id}))
                }),
            )
            .route(
                "/api/font/jobs/:id/font",
                get(|| async { axum::http::Response::new(Body::from(vec![1u8, 2, 3])) }),
            );
        let client = spawn_backend(router).await;

        let status = client.job_status("job 1").await.unwrap();
        assert_eq!(
            status.classify(),
            StatusCheck::Running { progress: 55, message: "job 1".into() }
        );

        let download = client.download_font("job 1").await.unwrap();
        assert_eq!(download.data.as_ref(), &[1, 2, 3]);
        assert_eq!(download.content_type, DEFAULT_CONTENT_TYPE);
    }

    #[tokio::test]
    async fn test_retries_server_errors() {
        let calls = Arc::new(AtomicUsize::new(0));
        let router = Router::new()
            .route(
                "/api/font/jobs/:id",
                get(|State(calls): State<Arc<AtomicUsize>>| async move {
                    if calls.fetch_add(1, Ordering::SeqCst) == 0 {
                        (axum::http::StatusCode::SERVICE_UNAVAILABLE, "busy").into_response()
                    } else {
                        Json(json!({"status": "done"})).into_response()
                    }
                }),
            )
            .with_state(Arc::clone(&calls));
        let client = spawn_backend(router).await;

        let status = client.job_status("j").await.unwrap();
        assert_eq!(status.classify(), StatusCheck::Finished);
        assert_eq!(calls.load(Ordering::SeqCst), 2);
    }

    #[tokio::test]
    async fn test_client_errors_are_not_retried() {
        let calls = Arc::new(AtomicUsize::new(0));
        let router = Router::new()
            .route(
                "/api/font/jobs/:id",
                get(|State(calls): State<Arc<AtomicUsize>>| async move {
                    calls.fetch_add(1, Ordering::SeqCst);
                    (axum::http::StatusCode::NOT_FOUND, "x".repeat(400))
                }),
            )
            .with_state(Arc::clone(&calls));
        let client = spawn_backend(router).await;

        let err = client.job_status("missing").await.unwrap_err();
        match err {
            FontServiceError::Api { status, message } => {
                assert_eq!(status, 404);
                assert_eq!(message.len(), ERROR_BODY_LIMIT);
            }
            other => panic!("unexpected error: {other:?}"),
        }
        assert_eq!(calls.load(Ordering::SeqCst), 1);
    }
}
