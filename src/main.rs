// procmap - live process-to-process network map
// Polls the socket tables, pairs both ends of local connections, and serves
// the resulting graph to a browser.

mod app;
mod cli;
mod collector;
mod net;
mod process;
mod rules;
mod theme;
mod topology;
mod web;

use anyhow::{Context, Result};
use app::SnapshotStore;
use clap::Parser;
use std::net::SocketAddr;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use tracing::info;
use tracing_subscriber::EnvFilter;
use web::AppContext;

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("procmap=info")),
        )
        .init();

    let settings = cli::Cli::parse().into_settings();
    info!(
        peer_only = settings.graph.peer_only,
        udp = settings.graph.udp_enabled,
        service_ports = settings.graph.service_ports.len(),
        "Starting procmap"
    );

    let rules = rules::load_rules(settings.rules_path.as_deref());
    let store = Arc::new(SnapshotStore::new(settings.edge_ttl, rules));

    let stop = Arc::new(AtomicBool::new(false));
    let collector = collector::platform_collector(settings.graph.udp_enabled);
    let poller = app::spawn_collector(
        collector,
        store.clone(),
        settings.poll_interval,
        stop.clone(),
    )
    .context("failed to start the collector thread")?;

    let addr = SocketAddr::new(settings.bind, settings.port);
    let ctx = Arc::new(AppContext::new(
        store,
        settings.graph,
        settings.rules_path,
    ));
    let served = web::serve(addr, ctx)
        .await
        .with_context(|| format!("HTTP server on {addr} failed"));

    stop.store(true, Ordering::Relaxed);
    // The thread notices the flag after its current sleep; no need to wait
    drop(poller);
    served
}
