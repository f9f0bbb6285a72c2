use axum::{
    extract::{Path, State},
    http::{header, StatusCode},
    response::{IntoResponse, Response},
    Json,
};
use chrono::Utc;
use serde::{Deserialize, Serialize};
use tracing::{debug, warn};
use uuid::Uuid;

use crate::errors::AppError;
use crate::fonts::ReadyFont;
use crate::layout::geometry::DEFAULT_MARGIN_IN;
use crate::layout::normalize::normalize_line_endings;
use crate::layout::render::render_html;
use crate::layout::typography::{DEFAULT_FONT_SIZE_PT, DEFAULT_LINE_HEIGHT};
use crate::layout::{
    Composer, CompositionInput, CompositionResult, FeatureSet, GenericFamily, Margins, PageGeometry, Strategy,
    TypographyConfig,
};
use crate::state::AppState;

const DEFAULT_MAX_PAGES: usize = 10;

// ────────────────────────────────────────────────────────────────────────────
// Request / response types
// ────────────────────────────────────────────────────────────────────────────

#[derive(Debug, Clone, Deserialize)]
pub struct ComposeRequest {
    /// Absent text composes as empty.
    #[serde(default)]
    pub text: Option<String>,
    /// A font previously loaded into the registry. Takes precedence over `fallback`.
    #[serde(default)]
    pub font_id: Option<Uuid>,
    #[serde(default)]
    pub fallback: GenericFamily,
    #[serde(default = "default_font_size_pt")]
    pub font_size_pt: f32,
    #[serde(default = "default_line_height")]
    pub line_height: f32,
    /// Uniform margin in inches.
    #[serde(default)]
    pub margin_in: Option<f32>,
    /// Per-side margins; wins over `margin_in` when both are given.
    #[serde(default)]
    pub margins: Option<Margins>,
    #[serde(default)]
    pub max_pages: Option<f32>,
    #[serde(default)]
    pub features: FeatureSet,
    /// Overrides the configured strategy for this request.
    #[serde(default)]
    pub strategy: Option<Strategy>,
}

fn default_font_size_pt() -> f32 {
    DEFAULT_FONT_SIZE_PT
}

fn default_line_height() -> f32 {
    DEFAULT_LINE_HEIGHT
}

#[derive(Debug, Serialize)]
pub struct ComposeResponse {
    #[serde(flatten)]
    pub result: CompositionResult,
    pub summary: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub warning: Option<String>,
}

impl From<CompositionResult> for ComposeResponse {
    fn from(result: CompositionResult) -> Self {
        let warning = result
            .truncated
            .then(|| format!("Text exceeds {} pages; the remainder was not laid out.", result.max_pages));
        Self {
            summary: result.summary(),
            warning,
            result,
        }
    }
}

#[derive(Debug, Deserialize)]
pub struct PreviewRequest {
    #[serde(flatten)]
    pub compose: ComposeRequest,
    /// Compose even when the text matches the last preview (settings changed).
    #[serde(default)]
    pub force: bool,
}

#[derive(Debug, Serialize)]
#[serde(tag = "status", rename_all = "snake_case")]
pub enum PreviewOutcome {
    Superseded,
    Unchanged,
    Composed(ComposeResponse),
}

// ────────────────────────────────────────────────────────────────────────────
// Request preparation
// ────────────────────────────────────────────────────────────────────────────

/// Rounds and clamps the requested page budget into `[1, limit]`.
pub fn clamp_max_pages(requested: Option<f32>, limit: usize) -> usize {
    let limit = limit.max(1);
    match requested {
        Some(pages) if pages.is_finite() => (pages.round().max(1.0) as usize).min(limit),
        _ => DEFAULT_MAX_PAGES.min(limit),
    }
}

fn page_geometry(req: &ComposeRequest) -> PageGeometry {
    let margins = req
        .margins
        .unwrap_or_else(|| Margins::uniform(req.margin_in.unwrap_or(DEFAULT_MARGIN_IN)));
    PageGeometry::us_letter(margins)
}

/// Resolves the font and builds the composer input for `req`.
async fn prepare(state: &AppState, req: ComposeRequest) -> Result<(Composer, CompositionInput, ReadyFont), AppError> {
    let font = state
        .fonts
        .resolve(req.font_id, req.fallback)
        .await
        .ok_or_else(|| AppError::NotFound(format!("Font {} is not loaded", req.font_id.unwrap_or_default())))?;

    let strategy = req.strategy.unwrap_or(state.config.compose_strategy);
    let composer = Composer::new(strategy, state.config.render_dpi);

    let input = CompositionInput {
        geometry: page_geometry(&req),
        typography: TypographyConfig::clamped(font.family_stack(), req.font_size_pt, req.line_height),
        max_pages: clamp_max_pages(req.max_pages, state.config.max_pages_limit),
        features: req.features,
        text: req.text.unwrap_or_default(),
    };

    Ok((composer, input, font))
}

/// Runs the CPU-bound layout on the blocking pool.
async fn compose_blocking(
    composer: Composer,
    input: CompositionInput,
    font: ReadyFont,
) -> Result<CompositionResult, AppError> {
    let result = tokio::task::spawn_blocking(move || composer.compose(&input, &font))
        .await
        .map_err(|e| AppError::Internal(anyhow::anyhow!("composition task panicked: {e}")))??;

    if result.truncated {
        warn!(
            pages = result.pages.len(),
            max_pages = result.max_pages,
            "Composition truncated by page limit"
        );
    }
    Ok(result)
}

// ────────────────────────────────────────────────────────────────────────────
// Handlers
// ────────────────────────────────────────────────────────────────────────────

/// POST /api/v1/compose
pub async fn handle_compose(
    State(state): State<AppState>,
    Json(req): Json<ComposeRequest>,
) -> Result<Json<ComposeResponse>, AppError> {
    let (composer, input, font) = prepare(&state, req).await?;
    let result = compose_blocking(composer, input, font).await?;
    Ok(Json(result.into()))
}

/// POST /api/v1/preview/:session
pub async fn handle_preview(
    State(state): State<AppState>,
    Path(session_id): Path<String>,
    Json(req): Json<PreviewRequest>,
) -> Result<Json<PreviewOutcome>, AppError> {
    let session = state.previews.session(&session_id).await;
    let ticket = session.schedule();

    if !session.wait_turn(ticket, state.config.compose_debounce).await {
        debug!(session = %session_id, generation = ticket.generation(), "Preview superseded");
        return Ok(Json(PreviewOutcome::Superseded));
    }

    let text = normalize_line_endings(req.compose.text.as_deref());
    if !req.force && session.is_unchanged(&text).await {
        return Ok(Json(PreviewOutcome::Unchanged));
    }

    let (composer, input, font) = prepare(&state, req.compose).await?;
    let result = compose_blocking(composer, input, font).await?;
    if !session.record(ticket, text).await {
        debug!(session = %session_id, generation = ticket.generation(), "Newer preview pending; text not recorded");
    }

    Ok(Json(PreviewOutcome::Composed(result.into())))
}

/// DELETE /api/v1/preview/:session
pub async fn handle_drop_preview(State(state): State<AppState>, Path(session_id): Path<String>) -> StatusCode {
    if state.previews.remove(&session_id).await {
        StatusCode::NO_CONTENT
    } else {
        StatusCode::NOT_FOUND
    }
}

/// POST /api/v1/export/html
pub async fn handle_export_html(
    State(state): State<AppState>,
    Json(req): Json<ComposeRequest>,
) -> Result<Response, AppError> {
    let (composer, input, font) = prepare(&state, req).await?;
    let result = compose_blocking(composer, input, font).await?;

    let title = format!("InkPress-Export-{}", Utc::now().format("%Y-%m-%d-%H-%M-%S"));
    let html = render_html(&result, &title);

    Ok((
        [
            (header::CONTENT_TYPE, "text/html; charset=utf-8".to_string()),
            (header::CONTENT_DISPOSITION, format!("attachment; filename=\"{title}.html\"")),
        ],
        html,
    )
        .into_response())
}
