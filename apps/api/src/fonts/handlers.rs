use axum::{
    extract::{Query, State},
    http::StatusCode,
    Json,
};
use bytes::Bytes;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::errors::AppError;
use crate::fonts::FontSummary;
use crate::state::AppState;

/// Upload size cap for raw font bodies.
pub const MAX_FONT_BYTES: usize = 10 * 1024 * 1024;

#[derive(Debug, Deserialize)]
pub struct UploadQuery {
    /// Original file name; its stem becomes the family name.
    pub name: Option<String>,
}

#[derive(Debug, Serialize)]
pub struct UploadResponse {
    pub font_id: Uuid,
    pub family: String,
    pub glyph_count: u16,
}

/// `HandFont.ttf` → `HandFont`. Blank names yield `None`.
pub fn family_from_file_name(name: &str) -> Option<String> {
    let name = name.trim();
    let stem = match name.rsplit_once('.') {
        Some((stem, _ext)) if !stem.is_empty() => stem,
        _ => name,
    };
    let stem = stem.trim();
    (!stem.is_empty()).then(|| stem.to_string())
}

/// POST /api/v1/fonts
pub async fn handle_upload_font(
    State(state): State<AppState>,
    Query(query): Query<UploadQuery>,
    body: Bytes,
) -> Result<(StatusCode, Json<UploadResponse>), AppError> {
    let suggested = query.name.as_deref().and_then(family_from_file_name);
    let font = state.fonts.load(body, suggested).await?;
    Ok((
        StatusCode::CREATED,
        Json(UploadResponse {
            font_id: font.id,
            family: font.family.clone(),
            glyph_count: font.glyph_count,
        }),
    ))
}

/// GET /api/v1/fonts
pub async fn handle_list_fonts(State(state): State<AppState>) -> Json<Vec<FontSummary>> {
    Json(state.fonts.list().await)
}
