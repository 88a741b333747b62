//! HTTP request handling for the users API.
//!
//! This module contains the axum router, request payload validation and the
//! state shared by handlers. It is used unchanged by standalone servers and by
//! cluster workers; only the `AppState` differs.

pub mod payload;
pub mod routes;
pub mod state;

pub use routes::create_router;
pub use state::AppState;

use tokio::net::TcpListener;
use tracing::info;

use crate::config::ServeConfig;
use crate::error::ClusterError;

/// Runs a single-process server with its own store and no replication.
pub async fn serve(config: ServeConfig) -> Result<(), ClusterError> {
    let addr = config.addr();
    let listener = TcpListener::bind(addr)
        .await
        .map_err(|source| ClusterError::Bind { addr, source })?;

    info!("Server is listening on http://{}", addr);

    axum::serve(listener, create_router(AppState::standalone()))
        .with_graceful_shutdown(crate::shutdown_signal())
        .await
        .map_err(ClusterError::Serve)
}
