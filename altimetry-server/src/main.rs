//! Entry point for the altimetry HTTP API process: the Intake API
//! collaborator (spec §6) wired over the update pipeline core.

mod api;
mod config;
mod error;
mod metrics;
mod state;

use std::net::SocketAddr;

use axum::{middleware::from_fn, Router};
use state::AppState;
use tokio::net::TcpListener;
use tower_http::{compression::CompressionLayer, cors::CorsLayer, trace::TraceLayer};
use tracing::info;
use utoipa::OpenApi;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    dotenvy::dotenv().ok();

    init_tracing();

    info!("initializing altimetry API server");

    let config = config::Config::from_env()?;
    let state = AppState::new(&config).await?;

    let addr: SocketAddr = format!("{}:{}", config.host(), config.port()).parse()?;

    let openapi = api::openapi::ApiDoc::openapi();

    let app = Router::new()
        .merge(api::routes::router())
        .merge(utoipa_swagger_ui::SwaggerUi::new("/swagger-ui").url("/api-docs/openapi.json", openapi))
        .layer(TraceLayer::new_for_http())
        .layer(CompressionLayer::new())
        .layer(CorsLayer::permissive())
        .layer(from_fn(metrics::track_http_requests))
        .with_state(state.clone());

    let listener = TcpListener::bind(addr).await?;
    info!(addr = %listener.local_addr()?, "listening");

    let shutdown = shutdown_signal(state);

    axum::serve(
        listener,
        app.into_make_service_with_connect_info::<SocketAddr>(),
    )
    .with_graceful_shutdown(shutdown)
    .await?;

    Ok(())
}

fn init_tracing() {
    use tracing_subscriber::{fmt, layer::SubscriberExt, EnvFilter, Registry};

    let env_filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new("altimetry_server=info,altimetry_pipeline=info,tower_http=info"));

    let fmt_layer = fmt::layer()
        .with_target(true)
        .with_line_number(true)
        .with_thread_ids(true)
        .with_level(true);

    let registry = Registry::default().with(env_filter).with(fmt_layer);

    tracing::subscriber::set_global_default(registry)
        .expect("failed to initialize tracing subscriber");
}

/// Waits for SIGTERM/SIGINT, then signals every worker and the
/// orchestrator's background loops to stop once their current item
/// completes (spec §5, Cancellation/timeouts).
async fn shutdown_signal(state: AppState) {
    let ctrl_c = async {
        tokio::signal::ctrl_c()
            .await
            .expect("failed to install Ctrl+C handler");
    };

    #[cfg(unix)]
    let terminate = async {
        tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate())
            .expect("failed to install SIGTERM handler")
            .recv()
            .await;
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {},
        _ = terminate => {},
    }

    info!("shutdown signal received, stopping pipeline workers");
    state.pipeline.shutdown();
}
