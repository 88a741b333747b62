//! Shared handler state.

use std::sync::Arc;

use parking_lot::RwLock;

use crate::cluster::replication::{Replicator, SharedStore};
use crate::store::{NewUser, User, UserStore};

/// State handed to every request handler.
///
/// In standalone mode there is no replicator and mutations stay local. In a
/// worker, every successful mutation publishes the full store before the
/// handler returns.
#[derive(Clone)]
pub struct AppState {
    store: SharedStore,
    replicator: Option<Replicator>,
}

impl AppState {
    /// State for a single-process deployment.
    pub fn standalone() -> Self {
        Self {
            store: Arc::new(RwLock::new(UserStore::new())),
            replicator: None,
        }
    }

    /// State for a worker whose mutations are published through `replicator`.
    pub fn replicated(store: SharedStore, replicator: Replicator) -> Self {
        Self {
            store,
            replicator: Some(replicator),
        }
    }

    pub fn store(&self) -> &SharedStore {
        &self.store
    }

    /// Runs a read-only operation against the store.
    pub fn read<T>(&self, op: impl FnOnce(&UserStore) -> T) -> T {
        op(&self.store.read())
    }

    /// Inserts a new user and publishes the resulting snapshot.
    pub fn create(&self, new_user: NewUser) -> User {
        let mut store = self.store.write();
        let user = store.insert(new_user);
        self.publish(&store);
        user
    }

    /// Runs a mutating operation against the store.
    ///
    /// `op` returns `None` when it changed nothing (for example, the target id
    /// does not exist). Otherwise the snapshot is published while the write
    /// lock is still held, so snapshots leave in the same order as mutations.
    pub fn mutate<T>(&self, op: impl FnOnce(&mut UserStore) -> Option<T>) -> Option<T> {
        let mut store = self.store.write();
        let outcome = op(&mut store)?;
        self.publish(&store);
        Some(outcome)
    }

    fn publish(&self, store: &UserStore) {
        if let Some(replicator) = &self.replicator {
            replicator.publish(store.snapshot());
        }
    }
}
