//! HTTP front end: query form, job submission and static results.

pub mod form;
pub mod launch;
pub mod routes;

use std::{net::SocketAddr, path::PathBuf};

use anyhow::{Context, Result};
use axum::{
    routing::{get, post},
    Router,
};
use tokio::net::TcpListener;
use tower_http::{services::ServeDir, trace::TraceLayer};
use tracing::info;

use crate::config::Settings;

#[derive(Clone)]
pub struct AppState {
    pub settings: Settings,
    /// Executable started for each job, normally this binary.
    pub job_exe: PathBuf,
}

pub fn router(state: AppState) -> Router {
    let static_dir = ServeDir::new(&state.settings.static_dir);
    Router::new()
        .route("/", get(routes::index))
        .route("/query", post(routes::query))
        .nest_service("/static", static_dir)
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}

pub async fn serve(settings: Settings, host: String, port: u16) -> Result<()> {
    let job_exe = std::env::current_exe().context("locating job executable")?;
    let state = AppState { settings, job_exe };

    let addr: SocketAddr = format!("{host}:{port}").parse()?;
    info!(%addr, "serving keyword-contrast front end");
    let listener = TcpListener::bind(addr).await?;
    axum::serve(listener, router(state).into_make_service()).await?;
    Ok(())
}
