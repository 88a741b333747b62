//! # users-cluster - Replicated in-memory users service
//!
//! A small HTTP CRUD service for user records that can run as a single
//! process or as a coordinator fronting a pool of worker processes.
//!
//! ## Features
//!
//! - **CRUD API**: `/api/users` with JSON envelopes and field-level validation
//! - **Round-robin proxy**: the coordinator forwards each request to the next worker
//! - **Full-state replication**: every mutation ships the worker's whole store,
//!   which the coordinator relays to all other workers
//! - **Eventually consistent**: last applied snapshot wins, no sequencing
//!
//! ## Example
//!
//! ```rust
//! use users_cluster::store::{NewUser, UserStore};
//!
//! let mut store = UserStore::new();
//! let user = store.insert(NewUser {
//!     username: "Bob".to_string(),
//!     age: serde_json::Number::from(54),
//!     hobbies: vec!["Books".to_string()],
//! });
//! assert_eq!(store.get(&user.id), Some(&user));
//! ```

pub mod cluster;
pub mod config;
pub mod error;
pub mod server;
pub mod store;

pub use cluster::{ControlMessage, Proxy, RoundRobin, WorkerRegistry};
pub use error::{ApiError, ClusterError, ProxyError};
pub use server::{AppState, create_router};
pub use store::{NewUser, User, UserPatch, UserStore};

use tracing::warn;

/// Resolves on Ctrl-C. Used to stop the public listeners gracefully.
pub async fn shutdown_signal() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        warn!("Failed to install Ctrl-C handler: {}", e);
        std::future::pending::<()>().await;
    }
}
