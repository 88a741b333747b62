//! Multi-process deployment.
//!
//! A coordinator spawns a fixed pool of worker processes, forwards every
//! public request to one of them in round-robin order, and relays each
//! worker's full-store snapshots to all the other workers. Replication is
//! fire-and-forget and last-writer-wins: two workers mutating at the same
//! moment can overwrite each other's change.

pub mod balancer;
pub mod coordinator;
pub mod protocol;
pub mod proxy;
pub mod relay;
pub mod replication;
pub mod worker;

pub use balancer::RoundRobin;
pub use coordinator::{WorkerHandle, WorkerRegistry};
pub use protocol::ControlMessage;
pub use proxy::Proxy;
pub use relay::{ControlLink, Relay, spawn_relay};
pub use replication::{Replicator, SharedStore};
