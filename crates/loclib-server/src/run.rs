use std::path::Path;

use crate::config::ServerConfig;
use crate::error::Result;
use axum::http::StatusCode;
use axum::{response::IntoResponse, routing::get, Router};
use futures::FutureExt;
use loclib_app::{
    app_router,
    state::{AppConfig, AppState},
};
use loclib_dal::Storage;
use tower_http::{services::ServeDir, trace::TraceLayer};
use tracing::{debug, info};

pub async fn run(args: ServerConfig) -> Result<()> {
    let state = build_state(&args).await?;
    run_with_state(args, state).await
}

pub async fn run_with_state(args: ServerConfig, state: AppState) -> Result<()> {
    let shutdown = tokio::signal::ctrl_c().map(|_| ());
    run_graceful_with_state(args, state, shutdown).await
}

pub async fn run_graceful_with_state<S>(
    args: ServerConfig,
    state: AppState,
    shutdown_signal: S,
) -> Result<()>
where
    S: std::future::Future<Output = ()> + Send + 'static,
{
    let storage = state.storage().clone();
    let app = main_router(state, args.static_dir.as_deref());

    let ip: std::net::IpAddr = args.listen_address.parse()?;
    let addr = std::net::SocketAddr::from((ip, args.port));
    let listener = tokio::net::TcpListener::bind(&addr).await?;
    info!("Listening on {}", listener.local_addr()?);

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal)
        .await?;

    info!("Server stopped");
    storage.close().await;
    Ok(())
}

pub fn main_router(state: AppState, static_dir: Option<&Path>) -> Router<()> {
    let mut router = app_router(state).route("/health", get(health));
    if let Some(dir) = static_dir {
        debug!("Serving static files from {}", dir.display());
        router = router.nest_service("/static", ServeDir::new(dir));
    }
    router.layer(TraceLayer::new_for_http())
}

async fn health() -> impl IntoResponse {
    (StatusCode::OK, "OK")
}

pub async fn build_state(config: &ServerConfig) -> Result<AppState> {
    let data_dir = config.data_dir();
    if !data_dir.is_dir() {
        tokio::fs::create_dir_all(&data_dir).await?;
        info!("Created data directory {}", data_dir.display());
    }

    let storage = Storage::open(&config.storage_config()).await?;
    let app_config = AppConfig {
        site_name: config.site_name.clone(),
    };
    AppState::new(app_config, storage)
}
