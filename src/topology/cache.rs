// Stale-edge cache
//
// The only state that survives between graph builds. Edges seen now are
// refreshed; edges not seen now stay visible as stale until they are older
// than the TTL, then they are evicted for good.

use super::GraphEdge;
use crate::theme::{Dashes, STALE_EDGE_COLOR, STALE_EDGE_WIDTH};
use std::collections::{BTreeMap, HashMap};
use std::time::{Duration, Instant};
use tracing::debug;

#[derive(Debug, Clone)]
struct CacheEntry {
    edge: GraphEdge,
    last_seen: Instant,
}

#[derive(Debug, Clone)]
pub struct EdgeCache {
    ttl: Duration,
    entries: HashMap<String, CacheEntry>,
}

impl EdgeCache {
    pub fn new(ttl: Duration) -> Self {
        Self {
            ttl,
            entries: HashMap::new(),
        }
    }

    /// Refresh current edges and add stale copies of recently vanished ones
    ///
    /// `now` is passed in so callers (and tests) control the clock.
    pub fn reconcile(&mut self, current: &mut BTreeMap<String, GraphEdge>, now: Instant) {
        for (id, edge) in current.iter() {
            self.entries.insert(
                id.clone(),
                CacheEntry {
                    edge: edge.clone(),
                    last_seen: now,
                },
            );
        }

        let ttl = self.ttl;
        let mut evicted = 0usize;
        self.entries.retain(|id, entry| {
            if current.contains_key(id) {
                return true;
            }
            if now.saturating_duration_since(entry.last_seen) > ttl {
                evicted += 1;
                return false;
            }
            current.insert(id.clone(), stale_copy(&entry.edge));
            true
        });

        if evicted > 0 {
            debug!(evicted, cached = self.entries.len(), "Evicted expired edges");
        }
    }
}

fn stale_copy(edge: &GraphEdge) -> GraphEdge {
    GraphEdge {
        color: STALE_EDGE_COLOR.to_string(),
        dashes: Dashes::SOLID,
        width: Some(STALE_EDGE_WIDTH),
        stale: true,
        ..edge.clone()
    }
}
