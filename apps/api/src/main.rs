mod config;
mod errors;
mod font_service;
mod fonts;
mod layout;
mod routes;
mod state;

use anyhow::Result;
use std::net::SocketAddr;
use std::sync::Arc;
use tower_http::{cors::CorsLayer, trace::TraceLayer};
use tracing::{info, warn};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

use crate::config::Config;
use crate::font_service::{FontBuildClient, FontBuildService};
use crate::routes::build_router;
use crate::state::AppState;

#[tokio::main]
async fn main() -> Result<()> {
    // Load configuration first (fails on malformed env vars)
    let config = Config::from_env()?;

    // Initialize structured logging
    tracing_subscriber::registry()
        .with(EnvFilter::try_from_default_env().unwrap_or_else(|_| {
            EnvFilter::new(format!("{}={}", env!("CARGO_PKG_NAME"), &config.rust_log))
        }))
        .with(tracing_subscriber::fmt::layer())
        .init();

    info!("Starting InkPress v{}", env!("CARGO_PKG_VERSION"));
    info!(
        strategy = ?config.compose_strategy,
        dpi = config.render_dpi,
        max_pages = config.max_pages_limit,
        "Composer configured"
    );

    // Initialize the remote font builder, if one is configured
    let font_service: Option<Arc<dyn FontBuildService>> = match config.font_service.base_url.as_deref() {
        Some(base_url) => {
            let client = FontBuildClient::new(base_url, &config.font_service)?;
            info!("Font build client initialized ({base_url})");
            Some(Arc::new(client))
        }
        None => {
            warn!("FONT_API_BASE not set; font-job endpoints will answer 503");
            None
        }
    };

    let state = AppState::new(config.clone(), font_service);

    // Build router
    let app = build_router(state)
        .layer(TraceLayer::new_for_http())
        .layer(CorsLayer::permissive());

    let addr: SocketAddr = format!("0.0.0.0:{}", config.port).parse()?;
    info!("Listening on {addr}");

    let listener = tokio::net::TcpListener::bind(addr).await?;
    axum::serve(listener, app).await?;

    Ok(())
}
