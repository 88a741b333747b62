//! Coordinator-side replication relay.
//!
//! One collector task per worker reads that worker's control stream and tags
//! each message with the worker's index. A single relay task writes every
//! message to all workers except the one it came from. Delivery is
//! fire-and-forget: a failed write is logged and that copy is lost.

use futures_util::future::join_all;
use tokio::io::{AsyncBufRead, AsyncWrite, AsyncWriteExt};
use tokio::sync::mpsc;
use tokio::task::JoinHandle;
use tracing::{debug, info, warn};

use crate::cluster::protocol::{ControlMessage, encode_line, read_message};

/// A message received from the worker at `sender`.
pub type Envelope = (usize, ControlMessage);

/// Both directions of one worker's control channel.
pub struct ControlLink<R, W> {
    /// Messages coming from the worker.
    pub from_worker: R,
    /// Messages going to the worker.
    pub to_worker: W,
}

/// Writes messages to every worker but the sender.
pub struct Relay<W> {
    sinks: Vec<W>,
}

impl<W> Relay<W>
where
    W: AsyncWrite + Unpin,
{
    /// Creates a relay over worker sinks, indexed in registry order.
    pub fn new(sinks: Vec<W>) -> Self {
        Self { sinks }
    }

    /// Sends `message` to every worker except `sender`.
    ///
    /// Returns the number of workers the message was written to.
    pub async fn broadcast(&mut self, sender: usize, message: &ControlMessage) -> usize {
        let line = match encode_line(message) {
            Ok(line) => line,
            Err(e) => {
                warn!("Failed to encode message from worker {}: {}", sender, e);
                return 0;
            }
        };

        let writes = self
            .sinks
            .iter_mut()
            .enumerate()
            .filter(|(index, _)| *index != sender)
            .map(|(index, sink)| {
                let line = &line;
                async move {
                    if let Err(e) = sink.write_all(line).await {
                        return (index, Err(e));
                    }
                    (index, sink.flush().await)
                }
            });

        let mut delivered = 0;
        for (index, result) in join_all(writes).await {
            match result {
                Ok(()) => delivered += 1,
                Err(e) => warn!("Dropping update for worker {}: {}", index, e),
            }
        }
        delivered
    }

    /// Relays messages until every collector has finished.
    pub async fn run(mut self, mut rx: mpsc::UnboundedReceiver<Envelope>) {
        while let Some((sender, message)) = rx.recv().await {
            let delivered = self.broadcast(sender, &message).await;
            debug!(
                "Relayed update from worker {} to {} workers",
                sender, delivered
            );
        }
        info!("All worker control channels closed, relay stopping");
    }
}

/// Reads messages from one worker and forwards them to the relay.
///
/// Undecodable lines are skipped. Returns when the worker closes its stream.
pub async fn collect_from<R>(index: usize, mut reader: R, tx: mpsc::UnboundedSender<Envelope>)
where
    R: AsyncBufRead + Unpin,
{
    loop {
        match read_message(&mut reader).await {
            Ok(Some(message)) => {
                if tx.send((index, message)).is_err() {
                    return;
                }
            }
            Ok(None) => {
                info!("Worker {} closed its control channel", index);
                return;
            }
            Err(e) if e.kind() == std::io::ErrorKind::InvalidData => {
                warn!("Skipping undecodable message from worker {}: {}", index, e);
            }
            Err(e) => {
                warn!("Control channel of worker {} failed: {}", index, e);
                return;
            }
        }
    }
}

/// Spawns one collector per link plus the relay task.
///
/// The returned handle completes once every worker stream has closed and the
/// last message has been relayed.
pub fn spawn_relay<R, W>(links: Vec<ControlLink<R, W>>) -> JoinHandle<()>
where
    R: AsyncBufRead + Unpin + Send + 'static,
    W: AsyncWrite + Unpin + Send + 'static,
{
    let (tx, rx) = mpsc::unbounded_channel();
    let mut sinks = Vec::with_capacity(links.len());

    for (index, link) in links.into_iter().enumerate() {
        tokio::spawn(collect_from(index, link.from_worker, tx.clone()));
        sinks.push(link.to_worker);
    }
    drop(tx);

    tokio::spawn(Relay::new(sinks).run(rx))
}
