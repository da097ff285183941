// Application state management
//
// The snapshot store is the only shared mutable state. The collector thread
// replaces its contents once per poll; graph requests read it under the same
// lock and build the topology while holding it. Building is fast and bounded
// so the lock is never held for long.

pub mod config;

use crate::collector::{build_listeners, Collector, ListenerIndex};
use crate::net::{ConnectionRecord, ProcessIdentity};
use crate::rules::ClassificationRule;
use crate::topology::{build_graph, EdgeCache, Graph, TopologyInput};
use config::GraphConfig;
use std::collections::HashMap;
use std::io;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use std::thread::{self, JoinHandle};
use std::time::{Duration, Instant};
use tracing::{debug, info};

/// One poll generation plus the state that survives across generations
#[derive(Debug)]
struct Snapshot {
    procs: HashMap<u32, ProcessIdentity>,
    conns: Vec<ConnectionRecord>,
    listeners: ListenerIndex,
    rules: Vec<ClassificationRule>,
    edge_cache: EdgeCache,
    generation: u64,
}

/// Lock-protected latest collector output
#[derive(Debug)]
pub struct SnapshotStore {
    inner: Mutex<Snapshot>,
}

impl SnapshotStore {
    pub fn new(edge_ttl: Duration, rules: Vec<ClassificationRule>) -> Self {
        Self {
            inner: Mutex::new(Snapshot {
                procs: HashMap::new(),
                conns: Vec::new(),
                listeners: ListenerIndex::new(),
                rules,
                edge_cache: EdgeCache::new(edge_ttl),
                generation: 0,
            }),
        }
    }

    /// A panicking reader must not take the dashboard down with it
    fn lock(&self) -> MutexGuard<'_, Snapshot> {
        self.inner.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Replace the current poll generation in one step, returning its number
    pub fn publish(
        &self,
        procs: HashMap<u32, ProcessIdentity>,
        conns: Vec<ConnectionRecord>,
        listeners: ListenerIndex,
    ) -> u64 {
        let mut snap = self.lock();
        snap.procs = procs;
        snap.conns = conns;
        snap.listeners = listeners;
        snap.generation += 1;
        snap.generation
    }

    /// Swap the rule list, returning how many rules are active
    pub fn set_rules(&self, rules: Vec<ClassificationRule>) -> usize {
        let count = rules.len();
        self.lock().rules = rules;
        count
    }

    /// Number of completed polls
    #[cfg(test)]
    pub fn generation(&self) -> u64 {
        self.lock().generation
    }

    /// Build the graph for the current snapshot and age the edge cache
    pub fn graph(&self, cfg: &GraphConfig, now: Instant) -> Graph {
        let mut guard = self.lock();
        let snap = &mut *guard;
        let input = TopologyInput {
            procs: &snap.procs,
            conns: &snap.conns,
            listeners: &snap.listeners,
            rules: &snap.rules,
        };
        build_graph(&input, cfg, &mut snap.edge_cache, now)
    }
}

// ============================================================================
// Collector loop
// ============================================================================

/// Run one poll and publish it
pub fn poll_once(collector: &mut dyn Collector, store: &SnapshotStore) {
    let started = Instant::now();
    let obs = collector.collect();
    if obs.is_empty() {
        debug!(collector = collector.name(), "Poll observed no sockets");
    }
    let listeners = build_listeners();
    let procs = obs.procs.len();
    let conns = obs.conns.len();
    let listening = listeners.len();

    let generation = store.publish(obs.procs, obs.conns, listeners);
    debug!(
        generation,
        procs,
        conns,
        listeners = listening,
        elapsed_ms = started.elapsed().as_millis() as u64,
        "Poll published"
    );
}

/// Start the collector on its own OS thread
///
/// The loop polls, publishes, then sleeps for `interval`. It stops once
/// `stop` is set; a poll in flight is never cancelled.
pub fn spawn_collector(
    mut collector: Box<dyn Collector>,
    store: Arc<SnapshotStore>,
    interval: Duration,
    stop: Arc<AtomicBool>,
) -> io::Result<JoinHandle<()>> {
    thread::Builder::new()
        .name("collector".to_string())
        .spawn(move || {
            info!(
                collector = collector.name(),
                interval_ms = interval.as_millis() as u64,
                "Collector started"
            );
            while !stop.load(Ordering::Relaxed) {
                poll_once(collector.as_mut(), &store);
                thread::sleep(interval);
            }
            info!("Collector stopped");
        })
}
