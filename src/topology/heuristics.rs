// Topology heuristics
//
// Which side of a pair is the server, and which local process owns the
// address an unpaired socket points at.

use crate::app::config::PRIVILEGED_PORT_LIMIT;
use crate::collector::listeners::{ListenerIndex, IPV4_ANY, IPV6_ANY};
use crate::net::Endpoint;
use std::collections::BTreeSet;

/// Guess the service port of a connection from its two ports
///
/// Precedence, first rule that applies:
/// 1. a port in the well-known set (`p1` checked before `p2`)
/// 2. the only privileged port (< 1024)
/// 3. the smaller port
///
/// No protocol inspection happens; this is a best-effort approximation.
pub fn service_port(p1: u16, p2: u16, well_known: &BTreeSet<u16>) -> u16 {
    if well_known.contains(&p1) {
        return p1;
    }
    if well_known.contains(&p2) {
        return p2;
    }
    if p1 < PRIVILEGED_PORT_LIMIT && p2 >= PRIVILEGED_PORT_LIMIT {
        return p1;
    }
    if p2 < PRIVILEGED_PORT_LIMIT && p1 >= PRIVILEGED_PORT_LIMIT {
        return p2;
    }
    p1.min(p2)
}

/// Find the local process listening on `target`
///
/// Lookup order: exact bind, wildcard bind (`0.0.0.0`, then `::`), then the
/// loopback alias (`127.x.y.z` -> `127.0.0.1`, `::1` -> `::`). The port
/// always has to match.
pub fn resolve_listener(target: &Endpoint, listeners: &ListenerIndex) -> Option<u32> {
    let port = target.port;
    if let Some(pid) = listeners.get(&target.host, port) {
        return Some(pid);
    }
    for wildcard in [IPV4_ANY, IPV6_ANY] {
        if let Some(pid) = listeners.get(wildcard, port) {
            return Some(pid);
        }
    }
    if target.host.starts_with("127.") {
        if let Some(pid) = listeners.get("127.0.0.1", port) {
            return Some(pid);
        }
    }
    if target.host == "::1" {
        return listeners.get(IPV6_ANY, port);
    }
    None
}
