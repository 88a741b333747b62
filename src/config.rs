//! Command-line and environment configuration.
//!
//! Every option can be given as a flag or through the environment variable
//! named next to it, the flag winning when both are present.

use std::net::{IpAddr, Ipv4Addr, SocketAddr};
use std::num::NonZeroUsize;
use std::time::Duration;

use clap::{Args, Parser, Subcommand};

use crate::error::ClusterError;

pub const DEFAULT_PORT: u16 = 4000;
pub const DEFAULT_MAX_BODY_BYTES: usize = 1024 * 1024;
pub const DEFAULT_UPSTREAM_TIMEOUT_MS: u64 = 30_000;

/// Address every worker binds to. Workers are only reachable through the coordinator.
pub const WORKER_HOST: IpAddr = IpAddr::V4(Ipv4Addr::LOCALHOST);

#[derive(Debug, Parser)]
#[command(name = "users-cluster", version, about = "In-memory users CRUD service")]
pub struct Cli {
    #[command(subcommand)]
    pub command: Command,
}

#[derive(Debug, Subcommand)]
pub enum Command {
    /// Run a single process with one store
    Serve(ServeConfig),
    /// Run the coordinator and its pool of worker processes
    Cluster(ClusterConfig),
    /// Run one worker; spawned by the coordinator
    #[command(hide = true)]
    Worker(WorkerConfig),
}

#[derive(Debug, Clone, Args)]
pub struct ServeConfig {
    #[arg(long, env = "HOST", default_value_t = WORKER_HOST)]
    pub host: IpAddr,

    #[arg(long, env = "PORT", default_value_t = DEFAULT_PORT)]
    pub port: u16,
}

impl ServeConfig {
    pub fn addr(&self) -> SocketAddr {
        SocketAddr::new(self.host, self.port)
    }
}

#[derive(Debug, Clone, Args)]
pub struct WorkerConfig {
    /// Private port this worker listens on
    #[arg(long)]
    pub port: u16,
}

impl WorkerConfig {
    pub fn addr(&self) -> SocketAddr {
        SocketAddr::new(WORKER_HOST, self.port)
    }
}

#[derive(Debug, Clone, Args)]
pub struct ClusterConfig {
    /// Interface the public listener binds to
    #[arg(long, env = "HOST", default_value_t = WORKER_HOST)]
    pub host: IpAddr,

    /// Public port clients connect to
    #[arg(long, env = "PORT", default_value_t = DEFAULT_PORT)]
    pub port: u16,

    /// Number of worker processes [default: available parallelism]
    #[arg(long, env = "WORKERS")]
    pub workers: Option<usize>,

    /// Port of the first worker; worker `i` listens on base + i [default: port + 1]
    #[arg(long, env = "WORKER_BASE_PORT")]
    pub worker_base_port: Option<u16>,

    /// Largest request body forwarded to a worker
    #[arg(long, env = "MAX_BODY_BYTES", default_value_t = DEFAULT_MAX_BODY_BYTES)]
    pub max_body_bytes: usize,

    /// How long to wait for a worker's response head
    #[arg(long, env = "UPSTREAM_TIMEOUT_MS", default_value_t = DEFAULT_UPSTREAM_TIMEOUT_MS)]
    pub upstream_timeout_ms: u64,
}

impl ClusterConfig {
    pub fn public_addr(&self) -> SocketAddr {
        SocketAddr::new(self.host, self.port)
    }

    /// Configured worker count, falling back to the host's parallelism.
    pub fn worker_count(&self) -> usize {
        self.workers.unwrap_or_else(|| {
            std::thread::available_parallelism()
                .map(NonZeroUsize::get)
                .unwrap_or(1)
        })
    }

    /// Private ports for the worker pool, in spawn order.
    pub fn worker_ports(&self) -> Result<Vec<u16>, ClusterError> {
        let count = self.worker_count();
        if count == 0 {
            return Err(ClusterError::NoWorkers);
        }

        let base = match self.worker_base_port {
            Some(base) => base,
            None => self.port.checked_add(1).ok_or(ClusterError::PortRange {
                base: self.port,
                count,
            })?,
        };

        (0..count)
            .map(|i| {
                u16::try_from(i)
                    .ok()
                    .and_then(|offset| base.checked_add(offset))
                    .ok_or(ClusterError::PortRange { base, count })
            })
            .collect()
    }

    pub fn proxy(&self) -> ProxyConfig {
        ProxyConfig {
            max_body_bytes: self.max_body_bytes,
            upstream_timeout: Duration::from_millis(self.upstream_timeout_ms),
        }
    }
}

/// Limits applied by the coordinator when forwarding a request.
#[derive(Debug, Clone)]
pub struct ProxyConfig {
    pub max_body_bytes: usize,
    pub upstream_timeout: Duration,
}

impl Default for ProxyConfig {
    fn default() -> Self {
        Self {
            max_body_bytes: DEFAULT_MAX_BODY_BYTES,
            upstream_timeout: Duration::from_millis(DEFAULT_UPSTREAM_TIMEOUT_MS),
        }
    }
}
