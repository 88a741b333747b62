//! Worker-side replication.
//!
//! After every local mutation a worker publishes its complete store through a
//! `Replicator`. The emitter task drains those snapshots onto the control
//! stream in order. The applier task reads snapshots pushed by the coordinator
//! and overwrites the local store with each one, last applied wins.

use std::io;
use std::sync::Arc;

use parking_lot::RwLock;
use tokio::io::{AsyncBufRead, AsyncWrite};
use tokio::sync::mpsc;
use tracing::{debug, warn};

use crate::cluster::protocol::{ControlMessage, read_message, write_message};
use crate::store::{User, UserStore};

/// A store shared between request handlers and the snapshot applier.
pub type SharedStore = Arc<RwLock<UserStore>>;

/// Publishes full-store snapshots towards the coordinator.
///
/// Publishing never blocks and never fails the caller: once the emitter is
/// gone, snapshots are dropped with a warning.
#[derive(Debug, Clone)]
pub struct Replicator {
    tx: mpsc::UnboundedSender<ControlMessage>,
}

impl Replicator {
    /// Creates a replicator and the receiving end the emitter task drains.
    pub fn channel() -> (Self, mpsc::UnboundedReceiver<ControlMessage>) {
        let (tx, rx) = mpsc::unbounded_channel();
        (Self { tx }, rx)
    }

    /// Queues a snapshot of `users` for emission.
    pub fn publish(&self, users: Vec<User>) {
        let count = users.len();
        if self.tx.send(ControlMessage::UpdateUsers { users }).is_err() {
            warn!("Replication channel closed, dropping snapshot of {} users", count);
        }
    }
}

/// Writes queued snapshots to `writer` until the replicator side is dropped.
///
/// A write error ends the task: the coordinator is gone and nothing else will
/// read the stream.
pub async fn emit_snapshots<W>(
    mut rx: mpsc::UnboundedReceiver<ControlMessage>,
    mut writer: W,
) -> io::Result<()>
where
    W: AsyncWrite + Unpin,
{
    while let Some(message) = rx.recv().await {
        let ControlMessage::UpdateUsers { users } = &message;
        debug!("Emitting snapshot of {} users", users.len());
        write_message(&mut writer, &message).await?;
    }
    Ok(())
}

/// Applies snapshots read from `reader` to `store` until end of stream.
///
/// Each snapshot replaces the whole store under the write lock, so request
/// handlers never see a partially applied snapshot. Lines that do not decode
/// are logged and skipped.
pub async fn apply_snapshots<R>(mut reader: R, store: SharedStore) -> io::Result<()>
where
    R: AsyncBufRead + Unpin,
{
    loop {
        match read_message(&mut reader).await {
            Ok(Some(ControlMessage::UpdateUsers { users })) => {
                debug!("Applying snapshot of {} users", users.len());
                store.write().replace_all(users);
            }
            Ok(None) => return Ok(()),
            Err(e) if e.kind() == io::ErrorKind::InvalidData => {
                warn!("Skipping undecodable control message: {}", e);
            }
            Err(e) => return Err(e),
        }
    }
}
