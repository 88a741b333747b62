//! Worker process: one store replica behind a private HTTP listener.

use std::sync::Arc;

use parking_lot::RwLock;
use tokio::io::{AsyncBufRead, AsyncWrite, BufReader};
use tokio::net::TcpListener;
use tracing::{error, info};

use crate::cluster::replication::{Replicator, SharedStore, apply_snapshots, emit_snapshots};
use crate::config::WorkerConfig;
use crate::error::ClusterError;
use crate::server::{AppState, create_router};
use crate::store::UserStore;

/// Runs a worker on its private port, using stdin and stdout as the control
/// channel to the coordinator.
///
/// Returns once the coordinator closes stdin.
pub async fn serve(config: WorkerConfig) -> Result<(), ClusterError> {
    let addr = config.addr();
    let listener = TcpListener::bind(addr)
        .await
        .map_err(|source| ClusterError::Bind { addr, source })?;

    serve_with(
        listener,
        BufReader::new(tokio::io::stdin()),
        tokio::io::stdout(),
    )
    .await
}

/// Runs a worker on `listener` with an arbitrary control channel.
///
/// Snapshots of local mutations are written to `control_out`; snapshots read
/// from `control_in` overwrite the local store. The server shuts down
/// gracefully when `control_in` reaches end of stream.
pub async fn serve_with<R, W>(
    listener: TcpListener,
    control_in: R,
    control_out: W,
) -> Result<(), ClusterError>
where
    R: AsyncBufRead + Unpin + Send + 'static,
    W: AsyncWrite + Unpin + Send + 'static,
{
    let addr = listener.local_addr().map_err(ClusterError::Serve)?;
    let store: SharedStore = Arc::new(RwLock::new(UserStore::new()));
    let (replicator, snapshots) = Replicator::channel();

    let emitter = tokio::spawn(async move {
        if let Err(e) = emit_snapshots(snapshots, control_out).await {
            error!("Failed to emit snapshot to coordinator: {}", e);
        }
    });

    let applier_store = Arc::clone(&store);
    let control_closed = async move {
        match apply_snapshots(control_in, applier_store).await {
            Ok(()) => info!("Control channel closed, worker on {} shutting down", addr),
            Err(e) => error!("Control channel failed: {}", e),
        }
    };

    info!("Worker is listening on http://{}", addr);

    let app = create_router(AppState::replicated(store, replicator));
    let result = axum::serve(listener, app)
        .with_graceful_shutdown(control_closed)
        .await
        .map_err(ClusterError::Serve);

    emitter.abort();
    result
}
