mod config;
mod errors;
mod layout;
mod render;
mod routes;
mod sheet;
mod state;

use anyhow::Result;
use std::net::SocketAddr;
use tower_http::{cors::CorsLayer, trace::TraceLayer};
use tracing::info;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

use crate::config::Config;
use crate::layout::TextMetrics;
use crate::routes::build_router;
use crate::state::AppState;

#[tokio::main]
async fn main() -> Result<()> {
    // Load configuration first (fails on malformed numeric env vars)
    let config = Config::from_env()?;

    // Initialize structured logging
    tracing_subscriber::registry()
        .with(EnvFilter::try_from_default_env().unwrap_or_else(|_| {
            EnvFilter::new(format!(
                "{}={},tower_http={}",
                env!("CARGO_PKG_NAME").replace('-', "_"),
                &config.rust_log,
                &config.rust_log
            ))
        }))
        .with(tracing_subscriber::fmt::layer())
        .init();

    info!("Starting Gabarito API v{}", env!("CARGO_PKG_VERSION"));

    // Font loading never fails: unreadable faces fall back to the bitmap font
    let metrics = TextMetrics::load(config.font_path.as_deref());

    let state = AppState::new(config.clone(), metrics);
    state.store.ensure_root().await?;
    info!(
        "Artifact store ready at {} (max {} questions per sheet, {} font)",
        state.store.root().display(),
        config.max_questions,
        if state.service.uses_builtin_font() { "bitmap" } else { "TrueType" }
    );

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
