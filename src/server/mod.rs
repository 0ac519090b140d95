//! HTTP server for the Webhub chat API.
//!
//! Provides REST endpoints for:
//! - Session listing, creation, selection, and deletion
//! - Sending a message and receiving the assistant reply
//! - Controller status for a typing indicator
//!
//! Every other path is served from the static directory.

pub mod routes;
pub mod state;

pub use routes::create_router;
pub use state::AppState;

use std::future::Future;
use std::net::SocketAddr;
use std::sync::Arc;

use tower_http::cors::{Any, CorsLayer};
use tower_http::trace::TraceLayer;

use crate::chat::{ChatResult, ServerConfig};

/// Default server port.
pub const DEFAULT_PORT: u16 = 3000;

/// Serve the chat API on all interfaces until `shutdown_signal` completes.
///
/// In-flight requests are allowed to finish after the signal fires.
///
/// # Errors
/// Returns an error if the listener cannot be bound or the server fails.
pub async fn serve<F>(
    state: Arc<AppState>,
    config: &ServerConfig,
    shutdown_signal: F,
) -> ChatResult<()>
where
    F: Future<Output = ()> + Send + 'static,
{
    let bind_addr = SocketAddr::from(([0, 0, 0, 0], config.port));
    let listener = tokio::net::TcpListener::bind(bind_addr).await?;
    let addr = listener.local_addr()?;

    let sessions = state.store().read().await.len();
    tracing::info!(
        "Webhub chat listening on http://{addr} (generator: {}, sessions: {sessions}, static: {})",
        state.controller.generator_name(),
        state.static_dir.display()
    );

    let app = create_router(state)
        .layer(
            CorsLayer::new()
                .allow_origin(Any)
                .allow_methods(Any)
                .allow_headers(Any),
        )
        .layer(TraceLayer::new_for_http());

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal)
        .await?;

    tracing::info!("Webhub chat stopped accepting connections");
    Ok(())
}
