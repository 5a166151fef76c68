//! HTTP transport.
//!
//! Mounts the task protocol behind an axum router: health probe, agent
//! card, blocking and streaming message submission, task snapshot reads,
//! and cancellation. The transport is substitutable plumbing — all task
//! semantics live in the executor and the protocol types.

pub mod handlers;

use std::net::SocketAddr;
use std::sync::Arc;

use axum::routing::{get, post};
use axum::Router;
use tokio_util::sync::CancellationToken;
use tracing::info;

use crate::config::GlobalConfig;
use crate::executor::ClaudeExecutor;
use crate::protocol::board::TaskBoard;
use crate::protocol::card::AgentCard;
use crate::{AppError, Result};

/// Shared state handed to every request handler.
pub struct AppState {
    /// Global configuration.
    pub config: Arc<GlobalConfig>,
    /// The execution controller.
    pub executor: Arc<ClaudeExecutor>,
    /// Authoritative task snapshots.
    pub board: Arc<TaskBoard>,
    /// Agent card served to clients.
    pub card: AgentCard,
}

/// Build the application router.
#[must_use]
pub fn router(state: Arc<AppState>) -> Router {
    Router::new()
        .route("/health", get(handlers::health))
        .route("/.well-known/agent-card.json", get(handlers::agent_card))
        .route("/message/send", post(handlers::message_send))
        .route("/message/stream", post(handlers::message_stream))
        .route("/tasks/{task_id}", get(handlers::get_task))
        .route("/tasks/{task_id}/cancel", post(handlers::cancel_task))
        .with_state(state)
}

/// Serve the HTTP transport until the cancellation token fires.
///
/// # Errors
///
/// Returns [`AppError::Config`] when the listener fails to bind or the
/// server errors out.
pub async fn serve(state: Arc<AppState>, ct: CancellationToken) -> Result<()> {
    let bind: SocketAddr = format!("{}:{}", state.config.host, state.config.port)
        .parse()
        .map_err(|err| AppError::Config(format!("invalid bind address: {err}")))?;

    let listener = tokio::net::TcpListener::bind(bind)
        .await
        .map_err(|err| AppError::Config(format!("failed to bind {bind}: {err}")))?;

    info!(%bind, "task server listening");

    axum::serve(listener, router(state))
        .with_graceful_shutdown(ct.cancelled_owned())
        .await
        .map_err(|err| AppError::Config(format!("server error: {err}")))?;

    info!("task server shut down");
    Ok(())
}
