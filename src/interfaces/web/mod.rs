mod handlers;
mod router;

use std::convert::Infallible;
use std::sync::Arc;

use anyhow::{Context, Result};
use axum::{
    extract::State,
    response::sse::{Event, Sse},
};
use tokio_stream::Stream;
use tokio_stream::StreamExt;
use tokio_stream::wrappers::BroadcastStream;
use tracing::info;

use crate::core::engine::TaskEngine;

pub use router::build_api_router;

/// HTTP surface for task submission and monitoring.
pub struct ApiServer {
    engine: Arc<TaskEngine>,
    log_tx: tokio::sync::broadcast::Sender<String>,
    api_host: String,
    api_port: u16,
}

#[derive(Clone)]
pub(crate) struct AppState {
    pub(crate) engine: Arc<TaskEngine>,
    pub(crate) log_tx: tokio::sync::broadcast::Sender<String>,
    pub(crate) api_port: u16,
}

impl ApiServer {
    pub fn new(
        engine: Arc<TaskEngine>,
        log_tx: tokio::sync::broadcast::Sender<String>,
        api_host: String,
        api_port: u16,
    ) -> Self {
        Self {
            engine,
            log_tx,
            api_host,
            api_port,
        }
    }

    /// Bind and serve until the process is shut down.
    pub async fn serve(self) -> Result<()> {
        let addr = format!("{}:{}", self.api_host, self.api_port);
        let state = AppState {
            engine: self.engine,
            log_tx: self.log_tx,
            api_port: self.api_port,
        };
        let app = router::build_api_router(state);

        let listener = tokio::net::TcpListener::bind(&addr)
            .await
            .with_context(|| format!("failed to bind API server to {}", addr))?;
        info!("API Server running at http://{addr}");
        axum::serve(listener, app)
            .await
            .context("API server crashed")?;
        Ok(())
    }
}

// --- SSE Logs (used by router) ---

async fn sse_logs_endpoint(
    State(state): State<AppState>,
) -> Sse<impl Stream<Item = Result<Event, Infallible>>> {
    let receiver = state.log_tx.subscribe();
    let stream = BroadcastStream::new(receiver).map(|msg| match msg {
        Ok(log) => Ok(Event::default().data(log)),
        Err(_) => Ok(Event::default().data("Log stream lagged")),
    });

    Sse::new(stream)
}
