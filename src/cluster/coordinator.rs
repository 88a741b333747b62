//! Coordinator process: spawns the worker pool, proxies the public port and
//! relays replication traffic.

use std::net::SocketAddr;
use std::path::Path;
use std::process::Stdio;
use std::sync::Arc;

use tokio::io::BufReader;
use tokio::net::TcpListener;
use tokio::process::{Child, Command};
use tracing::{error, info, warn};

use crate::cluster::proxy::{Proxy, create_router};
use crate::cluster::relay::{ControlLink, spawn_relay};
use crate::config::{ClusterConfig, WORKER_HOST};
use crate::error::ClusterError;

/// One spawned worker.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct WorkerHandle {
    pub index: usize,
    pub port: u16,
    pub pid: Option<u32>,
}

impl WorkerHandle {
    /// Private address the worker listens on.
    pub fn addr(&self) -> SocketAddr {
        SocketAddr::new(WORKER_HOST, self.port)
    }
}

/// Workers in spawn order. Built once at startup and never resized; the
/// position of a worker here is both its round-robin turn and its relay index.
#[derive(Debug, Default, Clone)]
pub struct WorkerRegistry {
    workers: Vec<WorkerHandle>,
}

impl WorkerRegistry {
    pub fn push(&mut self, worker: WorkerHandle) {
        self.workers.push(worker);
    }

    pub fn workers(&self) -> &[WorkerHandle] {
        &self.workers
    }

    pub fn addrs(&self) -> Vec<SocketAddr> {
        self.workers.iter().map(WorkerHandle::addr).collect()
    }

    pub fn len(&self) -> usize {
        self.workers.len()
    }

    pub fn is_empty(&self) -> bool {
        self.workers.is_empty()
    }
}

/// Starts the coordinator and runs until Ctrl-C.
///
/// Binds the public port first, then spawns `config.worker_count()` copies of
/// the current executable in worker mode. Workers that die are logged and left
/// in the rotation; requests on their turn fail with 502.
pub async fn start(config: ClusterConfig) -> Result<(), ClusterError> {
    let ports = config.worker_ports()?;
    let program = std::env::current_exe().map_err(ClusterError::CurrentExe)?;

    let addr = config.public_addr();
    let listener = TcpListener::bind(addr)
        .await
        .map_err(|source| ClusterError::Bind { addr, source })?;

    let mut registry = WorkerRegistry::default();
    let mut links = Vec::with_capacity(ports.len());

    for (index, port) in ports.into_iter().enumerate() {
        let mut child = spawn_worker(&program, index, port)?;

        let to_worker = child
            .stdin
            .take()
            .ok_or(ClusterError::MissingPipe { index, pipe: "stdin" })?;
        let from_worker = child
            .stdout
            .take()
            .ok_or(ClusterError::MissingPipe { index, pipe: "stdout" })?;

        let worker = WorkerHandle {
            index,
            port,
            pid: child.id(),
        };
        info!(
            "Spawned worker {} (pid {:?}) on port {}",
            worker.index, worker.pid, worker.port
        );

        links.push(ControlLink {
            from_worker: BufReader::new(from_worker),
            to_worker,
        });
        tokio::spawn(watch_exit(worker.clone(), child));
        registry.push(worker);
    }

    spawn_relay(links);

    let proxy = Arc::new(Proxy::new(registry.addrs(), config.proxy()));
    info!(
        "Load balancer is listening on http://{} with {} workers",
        addr,
        registry.len()
    );

    axum::serve(listener, create_router(proxy))
        .with_graceful_shutdown(crate::shutdown_signal())
        .await
        .map_err(ClusterError::Serve)?;

    info!("Coordinator stopped, terminating workers");
    Ok(())
}

fn spawn_worker(program: &Path, index: usize, port: u16) -> Result<Child, ClusterError> {
    Command::new(program)
        .arg("worker")
        .arg("--port")
        .arg(port.to_string())
        .stdin(Stdio::piped())
        .stdout(Stdio::piped())
        .stderr(Stdio::inherit())
        .kill_on_drop(true)
        .spawn()
        .map_err(|source| ClusterError::Spawn {
            index,
            port,
            source,
        })
}

/// Logs the worker's termination. Holding `child` here also keeps it alive
/// until the coordinator's runtime shuts down.
async fn watch_exit(worker: WorkerHandle, mut child: Child) {
    match child.wait().await {
        Ok(status) => warn!(
            "Worker {} (pid {:?}, port {}) died: {}",
            worker.index, worker.pid, worker.port, status
        ),
        Err(e) => error!(
            "Failed to wait for worker {} (pid {:?}): {}",
            worker.index, worker.pid, e
        ),
    }
}
