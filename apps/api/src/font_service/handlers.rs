use std::sync::Arc;

use axum::{
    extract::{multipart::MultipartError, Multipart, Path, State},
    http::StatusCode,
    Json,
};
use bytes::Bytes;
use tracing::{debug, info, warn};
use uuid::Uuid;

use crate::errors::AppError;
use crate::font_service::jobs::{run_font_job, FontJob, PollSettings};
use crate::font_service::{CreateJobRequest, JobOptions, SampleImage};
use crate::layout::handlers::clamp_max_pages;
use crate::state::AppState;

pub const MAX_IMAGES: usize = 6;
pub const MAX_IMAGE_BYTES: usize = 5 * 1024 * 1024;
/// Body cap for the multipart route: six full-size images plus form fields.
pub const MAX_JOB_UPLOAD_BYTES: usize = MAX_IMAGES * MAX_IMAGE_BYTES + 1024 * 1024;
const DEFAULT_LANGUAGE: &str = "es";

/// A file part as received, before filtering.
#[derive(Debug, Clone)]
pub struct UploadedFile {
    pub file_name: String,
    pub content_type: String,
    pub data: Bytes,
}

/// Keeps `image/*` files of at most 5 MiB, first six only.
pub fn select_samples(files: Vec<UploadedFile>) -> Vec<SampleImage> {
    files
        .into_iter()
        .filter(|f| f.content_type.starts_with("image/"))
        .filter(|f| f.data.len() <= MAX_IMAGE_BYTES)
        .take(MAX_IMAGES)
        .map(|f| SampleImage {
            file_name: f.file_name,
            content_type: f.content_type,
            data: f.data,
        })
        .collect()
}

fn multipart_error(e: MultipartError) -> AppError {
    AppError::Validation(e.body_text())
}

/// POST /api/v1/font-jobs
pub async fn handle_create_font_job(
    State(state): State<AppState>,
    mut multipart: Multipart,
) -> Result<(StatusCode, Json<FontJob>), AppError> {
    let service = state.font_service.clone().ok_or_else(|| {
        AppError::ServiceUnavailable("Font build service is not configured (set FONT_API_BASE)".to_string())
    })?;

    let mut files = Vec::new();
    let mut language: Option<String> = None;
    let mut api_key: Option<String> = None;
    let mut max_pages: Option<f32> = None;

    while let Some(field) = multipart.next_field().await.map_err(multipart_error)? {
        let name = field.name().unwrap_or_default().to_string();
        match name.as_str() {
            "images[]" | "images" => {
                let file_name = field
                    .file_name()
                    .map(str::to_string)
                    .unwrap_or_else(|| format!("sample-{}", files.len() + 1));
                let content_type = field.content_type().unwrap_or_default().to_string();
                let data = field.bytes().await.map_err(multipart_error)?;
                files.push(UploadedFile {
                    file_name,
                    content_type,
                    data,
                });
            }
            "language" => language = Some(field.text().await.map_err(multipart_error)?),
            "apiKey" => api_key = Some(field.text().await.map_err(multipart_error)?),
            "maxPages" => max_pages = field.text().await.map_err(multipart_error)?.trim().parse::<f32>().ok(),
            _ => debug!(field = %name, "Ignoring unknown multipart field"),
        }
    }

    let received = files.len();
    let images = select_samples(files);
    if images.is_empty() {
        return Err(AppError::Validation(
            "No images accepted. Upload image files of at most 5 MiB each.".to_string(),
        ));
    }
    if images.len() < received {
        warn!(received, accepted = images.len(), "Some sample images were skipped");
    }

    let language = language
        .map(|l| l.trim().to_string())
        .filter(|l| !l.is_empty())
        .unwrap_or_else(|| DEFAULT_LANGUAGE.to_string());

    let request = CreateJobRequest {
        images,
        language,
        options: JobOptions::new(clamp_max_pages(max_pages, state.config.max_pages_limit)),
        api_key: api_key.map(|k| k.trim().to_string()).filter(|k| !k.is_empty()),
    };

    let job = state.jobs.create().await;
    info!(job_id = %job.id, images = request.images.len(), language = %request.language, "Font job accepted");

    let settings = PollSettings {
        interval: state.config.font_service.poll_interval,
        timeout: state.config.font_service.job_timeout,
    };
    tokio::spawn(run_font_job(
        service,
        Arc::clone(&state.jobs),
        Arc::clone(&state.fonts),
        job.id,
        request,
        settings,
    ));

    Ok((StatusCode::ACCEPTED, Json(job)))
}

/// GET /api/v1/font-jobs/:id
pub async fn handle_get_font_job(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
) -> Result<Json<FontJob>, AppError> {
    state
        .jobs
        .get(id)
        .await
        .map(Json)
        .ok_or_else(|| AppError::NotFound(format!("Font job {id} not found")))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn file(name: &str, content_type: &str, len: usize) -> UploadedFile {
        UploadedFile {
            file_name: name.to_string(),
            content_type: content_type.to_string(),
            data: Bytes::from(vec![0u8; len]),
        }
    }

    #[test]
    fn test_select_samples_filters_type_and_size() {
        let selected = select_samples(vec![
            file("a.png", "image/png", 10),
            file("notes.txt", "text/plain", 10),
            file("huge.jpg", "image/jpeg", MAX_IMAGE_BYTES + 1),
            file("b.jpg", "image/jpeg", MAX_IMAGE_BYTES),
        ]);
        let names: Vec<&str> = selected.iter().map(|s| s.file_name.as_str()).collect();
        assert_eq!(names, ["a.png", "b.jpg"]);
    }

    #[test]
    fn test_select_samples_caps_count() {
        let files = (0..9).map(|i| file(&format!("{i}.png"), "image/png", 1)).collect();
        let selected = select_samples(files);
        assert_eq!(selected.len(), MAX_IMAGES);
        assert_eq!(selected[5].file_name, "5.png");
    }
}
