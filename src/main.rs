//! Main entry point for the users service.
//!
//! `serve` runs one standalone process, `cluster` runs the coordinator, and
//! the hidden `worker` subcommand is what the coordinator spawns.

use anyhow::Context;
use clap::Parser;
use tracing_subscriber::EnvFilter;

use users_cluster::cluster::{coordinator, worker};
use users_cluster::config::{Cli, Command};
use users_cluster::server;

fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    // Workers talk to the coordinator over stdout, so all logging goes to stderr.
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .with_writer(std::io::stderr)
        .init();

    match cli.command {
        Command::Serve(config) => multi_thread()?
            .block_on(server::serve(config))
            .context("standalone server failed"),
        Command::Cluster(config) => multi_thread()?
            .block_on(coordinator::start(config))
            .context("coordinator failed"),
        // One event loop per worker: requests and incoming snapshots interleave
        // but never run in parallel against the store.
        Command::Worker(config) => tokio::runtime::Builder::new_current_thread()
            .enable_all()
            .build()
            .context("failed to build worker runtime")?
            .block_on(worker::serve(config))
            .context("worker failed"),
    }
}

fn multi_thread() -> anyhow::Result<tokio::runtime::Runtime> {
    tokio::runtime::Builder::new_multi_thread()
        .enable_all()
        .build()
        .context("failed to build runtime")
}
