// Topology graph builder
//
// Turns one snapshot of half-open socket records into a deduplicated
// node/edge document:
//
// 1. pair reciprocal sockets owned by different processes
// 2. infer which side of each pair is the server
// 3. fold parallel sockets between the same processes and port into one edge
// 4. resolve unpaired sockets to a local listener or an external endpoint
// 5. keep recently vanished edges visible as stale
// 6. make sure every edge endpoint has a node
// 7. fan out parallel edges between the same node pair
//
// A malformed record never fails the whole build; nodes that cannot be
// classified get default styling.

pub mod cache;
pub mod heuristics;
pub mod layout;

pub use cache::EdgeCache;

use crate::app::config::GraphConfig;
use crate::collector::ListenerIndex;
use crate::net::{ConnectionRecord, Endpoint, ProcessIdentity};
use crate::rules::{classify, ClassificationRule};
use crate::theme::{
    dashes_for_state, node_style, port_color, Dashes, EXTERNAL_NODE_TYPE, UDP_EDGE_COLOR,
};
use heuristics::{resolve_listener, service_port};
use serde::Serialize;
use std::collections::{BTreeMap, HashMap};
use std::time::Instant;
use tracing::debug;

// ============================================================================
// Graph document
// ============================================================================

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct GraphNode {
    pub id: String,
    pub label: String,
    pub title: String,
    pub color: String,
    pub icon: String,
    #[serde(rename = "type")]
    pub node_type: String,
    pub shape: String,
    pub image: Option<String>,
}

/// vis-network `smooth` option
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Smooth {
    pub enabled: bool,
    #[serde(rename = "type")]
    pub kind: &'static str,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub roundness: Option<f64>,
}

impl Smooth {
    /// Neutral hint for a lone edge
    pub fn continuous() -> Self {
        Self {
            enabled: true,
            kind: "continuous",
            roundness: None,
        }
    }

    /// Curved hint; the sign of `offset` picks the bend direction
    pub fn curved(offset: f64) -> Self {
        Self {
            enabled: true,
            kind: if offset >= 0.0 { "curvedCW" } else { "curvedCCW" },
            roundness: Some(offset.abs()),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct GraphEdge {
    pub id: String,
    pub from: String,
    pub to: String,
    pub label: String,
    pub title: String,
    pub color: String,
    pub protocol: String,
    pub state: String,
    pub dashes: Dashes,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub width: Option<f32>,
    #[serde(skip_serializing_if = "std::ops::Not::not")]
    pub stale: bool,
    pub smooth: Smooth,
    /// Port in the edge id, used to order parallel edges
    #[serde(skip)]
    pub port: u16,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct Graph {
    pub nodes: Vec<GraphNode>,
    pub edges: Vec<GraphEdge>,
}

/// Borrowed view of one snapshot generation
#[derive(Debug, Clone, Copy)]
pub struct TopologyInput<'a> {
    pub procs: &'a HashMap<u32, ProcessIdentity>,
    pub conns: &'a [ConnectionRecord],
    pub listeners: &'a ListenerIndex,
    pub rules: &'a [ClassificationRule],
}

// ============================================================================
// Builder
// ============================================================================

/// Build the graph for one request and age the edge cache
pub fn build_graph(
    input: &TopologyInput<'_>,
    cfg: &GraphConfig,
    cache: &mut EdgeCache,
    now: Instant,
) -> Graph {
    let mut builder = GraphBuilder::new(input, cfg);
    builder.add_process_nodes();

    // Canonical order so the result does not depend on collector ordering
    let mut conns: Vec<&ConnectionRecord> = input.conns.iter().collect();
    conns.sort();
    let peers = PeerIndex::new(&conns);

    builder.add_peer_edges(&conns, &peers);
    if !cfg.peer_only {
        builder.add_fallback_edges(&conns, &peers);
    }

    cache.reconcile(&mut builder.edges, now);
    builder.materialize_endpoints();
    layout::assign_curvature(&mut builder.edges);

    debug!(
        nodes = builder.nodes.len(),
        edges = builder.edges.len(),
        "build_graph: topology ready"
    );
    builder.finish()
}

/// (local, remote) -> record, first record in canonical order wins
struct PeerIndex<'a> {
    by_addrs: HashMap<(&'a Endpoint, &'a Endpoint), &'a ConnectionRecord>,
}

impl<'a> PeerIndex<'a> {
    fn new(conns: &[&'a ConnectionRecord]) -> Self {
        let mut by_addrs = HashMap::with_capacity(conns.len());
        for conn in conns {
            by_addrs.entry((&conn.local, &conn.remote)).or_insert(*conn);
        }
        Self { by_addrs }
    }

    /// The socket on the other end of `conn`, if this host observed it
    fn peer_of(&self, conn: &'a ConnectionRecord) -> Option<&'a ConnectionRecord> {
        self.by_addrs.get(&(&conn.remote, &conn.local)).copied()
    }
}

/// A rendered reciprocal pair and how many socket pairs folded into it
struct PairedEdge {
    id: String,
    sockets: usize,
}

struct GraphBuilder<'a> {
    input: &'a TopologyInput<'a>,
    cfg: &'a GraphConfig,
    nodes: BTreeMap<String, GraphNode>,
    edges: BTreeMap<String, GraphEdge>,
}

impl<'a> GraphBuilder<'a> {
    fn new(input: &'a TopologyInput<'a>, cfg: &'a GraphConfig) -> Self {
        Self {
            input,
            cfg,
            nodes: BTreeMap::new(),
            edges: BTreeMap::new(),
        }
    }

    fn add_process_nodes(&mut self) {
        for pid in self.input.procs.keys() {
            let node = self.process_node(*pid);
            self.nodes.insert(node.id.clone(), node);
        }
    }

    /// Steps 1-3: reciprocal pairing, role inference, dedup
    fn add_peer_edges<'c>(&mut self, conns: &[&'c ConnectionRecord], peers: &PeerIndex<'c>) {
        let mut pairs: HashMap<(u32, u32, u16), PairedEdge> = HashMap::new();

        for conn in conns {
            let Some(peer) = peers.peer_of(*conn) else {
                continue;
            };
            if peer.pid == conn.pid {
                continue;
            }

            let svc = service_port(conn.local.port, conn.remote.port, &self.cfg.service_ports);
            let key = (conn.pid.min(peer.pid), conn.pid.max(peer.pid), svc);
            let (server, client) = if conn.local.port == svc {
                (*conn, peer)
            } else {
                (peer, *conn)
            };

            let pair = pairs.entry(key).or_insert_with(|| {
                let edge = paired_edge(client, server, svc);
                let id = edge.id.clone();
                self.edges.entry(id.clone()).or_insert(edge);
                PairedEdge { id, sockets: 0 }
            });
            // Each logical pair shows up twice; count it from the lower pid only
            if conn.pid < peer.pid {
                pair.sockets += 1;
            }
        }

        for pair in pairs.values() {
            if pair.sockets <= 1 {
                continue;
            }
            if let Some(edge) = self.edges.get_mut(&pair.id) {
                edge.label = format!("{} ×{}", edge.label, pair.sockets);
                edge.title = format!("{} | sockets: {}", edge.title, pair.sockets);
            }
        }
    }

    /// Step 4: unpaired sockets go to a local listener or an external node
    fn add_fallback_edges<'c>(&mut self, conns: &[&'c ConnectionRecord], peers: &PeerIndex<'c>) {
        for conn in conns {
            if peers.peer_of(*conn).is_some() {
                continue;
            }

            let color = edge_color(conn, conn.remote.port);
            match resolve_listener(&conn.remote, self.input.listeners) {
                Some(dst) if dst == conn.pid => continue,
                Some(dst) => {
                    let to = dst.to_string();
                    if !self.nodes.contains_key(&to) {
                        let node = self.process_node(dst);
                        self.nodes.insert(to.clone(), node);
                    }
                    let title = format!(
                        "{}:{} → local:{} | {} {}",
                        conn.local.host,
                        conn.local.port,
                        conn.remote.port,
                        conn.protocol(),
                        conn.state
                    );
                    self.insert_fallback_edge(conn, to, title, color);
                }
                None => {
                    let to = conn.remote.to_string();
                    if !self.nodes.contains_key(&to) {
                        let node = self.external_node(&to);
                        self.nodes.insert(to.clone(), node);
                    }
                    let title = format!(
                        "{}:{} → {}:{} | {} {}",
                        conn.local.host,
                        conn.local.port,
                        conn.remote.host,
                        conn.remote.port,
                        conn.protocol(),
                        conn.state
                    );
                    self.insert_fallback_edge(conn, to, title, color);
                }
            }
        }
    }

    fn insert_fallback_edge(
        &mut self,
        conn: &ConnectionRecord,
        to: String,
        title: String,
        color: &str,
    ) {
        let id = format!("{}->{}:{}", conn.pid, to, conn.remote.port);
        self.edges.entry(id.clone()).or_insert_with(|| GraphEdge {
            id,
            from: conn.pid.to_string(),
            to,
            label: format!(":{}→:{}", conn.local.port, conn.remote.port),
            title,
            color: color.to_string(),
            protocol: conn.protocol().to_string(),
            state: conn.state.to_string(),
            dashes: dashes_for_state(conn.state),
            width: None,
            stale: false,
            smooth: Smooth::continuous(),
            port: conn.remote.port,
        });
    }

    /// Step 6: every endpoint needs a node, including those of stale edges
    fn materialize_endpoints(&mut self) {
        let endpoints: Vec<String> = self
            .edges
            .values()
            .flat_map(|edge| [edge.from.clone(), edge.to.clone()])
            .collect();

        for id in endpoints {
            if self.nodes.contains_key(&id) {
                continue;
            }
            match id.parse::<u32>() {
                Ok(pid) => {
                    let node = self.process_node(pid);
                    self.nodes.insert(id, node);
                }
                Err(_) if !self.cfg.peer_only => {
                    let node = self.external_node(&id);
                    self.nodes.insert(id, node);
                }
                Err(_) => {}
            }
        }
    }

    fn process_node(&self, pid: u32) -> GraphNode {
        let proc = self
            .input
            .procs
            .get(&pid)
            .cloned()
            .unwrap_or_else(|| ProcessIdentity::named(pid, ""));
        let (node_type, label) = classify(&proc, self.input.rules);
        let style = node_style(&node_type);
        let (shape, image) = self.shape_for(&node_type);

        let title = if !proc.command_line.is_empty() {
            proc.command_line.clone()
        } else if !proc.name.is_empty() {
            proc.name.clone()
        } else {
            "process".to_string()
        };

        GraphNode {
            id: pid.to_string(),
            label: format!("{label}\nPID {pid}"),
            title,
            color: style.color.to_string(),
            icon: style.icon.to_string(),
            node_type,
            shape,
            image,
        }
    }

    fn external_node(&self, id: &str) -> GraphNode {
        let style = node_style(EXTERNAL_NODE_TYPE);
        let icon_file = self
            .cfg
            .icons
            .as_ref()
            .and_then(|icons| icons.file_for(EXTERNAL_NODE_TYPE));
        let (shape, image) = match icon_file {
            Some(file) => ("image".to_string(), Some(format!("/assets/{file}"))),
            None => ("icon".to_string(), None),
        };

        GraphNode {
            id: id.to_string(),
            label: id.to_string(),
            title: "remote endpoint".to_string(),
            color: style.color.to_string(),
            icon: style.icon.to_string(),
            node_type: EXTERNAL_NODE_TYPE.to_string(),
            shape,
            image,
        }
    }

    /// The type's icon, else the service icon, else a font icon
    fn shape_for(&self, node_type: &str) -> (String, Option<String>) {
        let file = self
            .cfg
            .icons
            .as_ref()
            .and_then(|icons| icons.file_for(node_type).or_else(|| icons.file_for("service")));
        match file {
            Some(file) => ("image".to_string(), Some(format!("/assets/{file}"))),
            None => ("icon".to_string(), None),
        }
    }

    fn finish(self) -> Graph {
        Graph {
            nodes: self.nodes.into_values().collect(),
            edges: self.edges.into_values().collect(),
        }
    }
}

fn edge_color(conn: &ConnectionRecord, port: u16) -> &'static str {
    if conn.state.is_udp() {
        UDP_EDGE_COLOR
    } else {
        port_color(port)
    }
}

fn paired_edge(client: &ConnectionRecord, server: &ConnectionRecord, svc: u16) -> GraphEdge {
    GraphEdge {
        id: format!("{}->{}:{}", client.pid, server.pid, svc),
        from: client.pid.to_string(),
        to: server.pid.to_string(),
        label: format!(":{}→:{}", client.local.port, svc),
        title: format!(
            "{}:{} ↔ {}:{} | {} {} :{}",
            client.local.host,
            client.local.port,
            server.local.host,
            svc,
            client.protocol(),
            client.state,
            svc
        ),
        color: edge_color(client, svc).to_string(),
        protocol: client.protocol().to_string(),
        state: client.state.to_string(),
        dashes: dashes_for_state(client.state),
        width: None,
        stale: false,
        smooth: Smooth::continuous(),
        port: svc,
    }
}


#[cfg(test)]
mod tests {
    use super::*;
    use crate::app::config::IconSet;
    use crate::net::{parse_endpoint, ConnectionState};
    use crate::theme::STALE_EDGE_COLOR;
    use proptest::prelude::*;
    use std::time::Duration;

    fn rec(pid: u32, local: &str, remote: &str) -> ConnectionRecord {
        ConnectionRecord::new(
            pid,
            parse_endpoint(local).unwrap(),
            parse_endpoint(remote).unwrap(),
            ConnectionState::Established,
        )
    }

    fn procs(entries: &[(u32, &str)]) -> HashMap<u32, ProcessIdentity> {
        entries
            .iter()
            .map(|&(pid, name)| (pid, ProcessIdentity::named(pid, name)))
            .collect()
    }

    fn build(
        procs: &HashMap<u32, ProcessIdentity>,
        conns: &[ConnectionRecord],
        listeners: &ListenerIndex,
        cfg: &GraphConfig,
    ) -> Graph {
        let input = TopologyInput {
            procs,
            conns,
            listeners,
            rules: &[],
        };
        let mut cache = EdgeCache::new(Duration::from_secs(15));
        build_graph(&input, cfg, &mut cache, Instant::now())
    }

    fn node<'g>(graph: &'g Graph, id: &str) -> Option<&'g GraphNode> {
        graph.nodes.iter().find(|n| n.id == id)
    }

    #[test]
    fn test_reciprocal_pair_renders_one_edge() {
        let procs = procs(&[(100, "curl"), (200, "nginx")]);
        let conns = vec![
            rec(100, "10.0.0.1:5000", "10.0.0.2:443"),
            rec(200, "10.0.0.2:443", "10.0.0.1:5000"),
        ];
        let graph = build(&procs, &conns, &ListenerIndex::new(), &GraphConfig::new());

        assert_eq!(graph.edges.len(), 1);
        let edge = &graph.edges[0];
        assert_eq!(edge.id, "100->200:443");
        assert_eq!((edge.from.as_str(), edge.to.as_str()), ("100", "200"));
        assert_eq!(edge.label, ":5000→:443");
        assert_eq!(
            edge.title,
            "10.0.0.1:5000 ↔ 10.0.0.2:443 | TCP ESTABLISHED :443"
        );
        assert_eq!(edge.color, "#3489eb");
        assert_eq!(edge.smooth, Smooth::continuous());

        assert_eq!(graph.nodes.len(), 2);
        assert_eq!(node(&graph, "100").unwrap().label, "curl\nPID 100");
        assert_eq!(node(&graph, "200").unwrap().node_type, "app");
    }

    #[test]
    fn test_parallel_sockets_fold_into_one_edge() {
        let procs = procs(&[(100, "app"), (200, "postgres")]);
        let conns = vec![
            rec(100, "10.0.0.1:5001", "10.0.0.2:5432"),
            rec(100, "10.0.0.1:5000", "10.0.0.2:5432"),
            rec(200, "10.0.0.2:5432", "10.0.0.1:5000"),
            rec(200, "10.0.0.2:5432", "10.0.0.1:5001"),
        ];
        let graph = build(&procs, &conns, &ListenerIndex::new(), &GraphConfig::new());

        assert_eq!(graph.edges.len(), 1);
        let edge = &graph.edges[0];
        assert_eq!(edge.id, "100->200:5432");
        assert_eq!(edge.label, ":5000→:5432 ×2");
        assert!(edge.title.ends_with(" | sockets: 2"));
    }

    #[test]
    fn test_same_pid_pair_is_ignored() {
        let procs = procs(&[(100, "loop")]);
        let conns = vec![
            rec(100, "127.0.0.1:5000", "127.0.0.1:6000"),
            rec(100, "127.0.0.1:6000", "127.0.0.1:5000"),
        ];
        let graph = build(&procs, &conns, &ListenerIndex::new(), &GraphConfig::new());
        assert!(graph.edges.is_empty());
        assert_eq!(graph.nodes.len(), 1);
    }

    #[test]
    fn test_unpaired_socket_becomes_external_edge() {
        let procs = procs(&[(100, "resolver")]);
        let conns = vec![rec(100, "10.0.0.1:40000", "8.8.8.8:53")];
        let graph = build(&procs, &conns, &ListenerIndex::new(), &GraphConfig::new());

        assert_eq!(graph.edges.len(), 1);
        let edge = &graph.edges[0];
        assert_eq!(edge.id, "100->8.8.8.8:53:53");
        assert_eq!(edge.to, "8.8.8.8:53");
        assert_eq!(edge.label, ":40000→:53");
        assert_eq!(edge.color, "#888");

        let external = node(&graph, "8.8.8.8:53").unwrap();
        assert_eq!(external.node_type, EXTERNAL_NODE_TYPE);
        assert_eq!(external.title, "remote endpoint");
        assert_eq!(external.shape, "icon");
    }

    #[test]
    fn test_peer_only_suppresses_fallbacks() {
        let procs = procs(&[(100, "resolver")]);
        let conns = vec![
            rec(100, "10.0.0.1:40000", "8.8.8.8:53"),
            rec(100, "127.0.0.1:40001", "127.0.0.1:6379"),
        ];
        // Without peer-only this socket would resolve to the listener owner
        let listeners = ListenerIndex::from_listening([(Endpoint::new("0.0.0.0", 6379), 300)]);
        let cfg = GraphConfig {
            peer_only: true,
            ..GraphConfig::new()
        };
        let graph = build(&procs, &conns, &listeners, &cfg);

        assert!(graph.edges.is_empty());
        assert_eq!(graph.nodes.len(), 1);
        assert!(node(&graph, "300").is_none());
        assert!(graph.nodes.iter().all(|n| n.node_type != EXTERNAL_NODE_TYPE));

        let graph = build(&procs, &conns, &listeners, &GraphConfig::new());
        assert!(graph.edges.iter().any(|e| e.id == "100->300:6379"));
        assert!(node(&graph, "300").is_some());
    }

    #[test]
    fn test_unpaired_socket_resolves_to_listener() {
        let procs = procs(&[(100, "worker")]);
        let conns = vec![rec(100, "127.0.0.1:40000", "127.0.0.1:6379")];
        let listeners = ListenerIndex::from_listening([(Endpoint::new("0.0.0.0", 6379), 300)]);
        let graph = build(&procs, &conns, &listeners, &GraphConfig::new());

        assert_eq!(graph.edges.len(), 1);
        let edge = &graph.edges[0];
        assert_eq!(edge.id, "100->300:6379");
        assert_eq!(edge.color, "#b68900");
        assert!(edge.title.contains("→ local:6379"));
        // Listener owner was not in the snapshot but still gets a node
        assert_eq!(node(&graph, "300").unwrap().label, "pid 300\nPID 300");
    }

    #[test]
    fn test_listener_owned_by_observer_is_skipped() {
        let procs = procs(&[(100, "proxy")]);
        let conns = vec![rec(100, "10.0.0.1:40000", "10.0.0.1:8080")];
        let listeners = ListenerIndex::from_listening([(Endpoint::new("10.0.0.1", 8080), 100)]);
        let graph = build(&procs, &conns, &listeners, &GraphConfig::new());
        assert!(graph.edges.is_empty());
    }

    #[test]
    fn test_udp_edges_use_udp_color() {
        let procs = procs(&[(100, "dns"), (200, "client")]);
        let mut conns = vec![
            rec(100, "127.0.0.1:53", "127.0.0.1:41000"),
            rec(200, "127.0.0.1:41000", "127.0.0.1:53"),
        ];
        for conn in &mut conns {
            conn.state = ConnectionState::Udp;
        }
        let cfg = GraphConfig {
            udp_enabled: true,
            ..GraphConfig::new()
        };
        let graph = build(&procs, &conns, &ListenerIndex::new(), &cfg);

        assert_eq!(graph.edges.len(), 1);
        let edge = &graph.edges[0];
        assert_eq!(edge.id, "200->100:53");
        assert_eq!(edge.color, UDP_EDGE_COLOR);
        assert_eq!(edge.protocol, "UDP");
    }

    #[test]
    fn test_vanished_edge_decays_then_disappears() {
        let procs_now = procs(&[(100, "curl"), (200, "nginx")]);
        let conns = vec![
            rec(100, "10.0.0.1:5000", "10.0.0.2:443"),
            rec(200, "10.0.0.2:443", "10.0.0.1:5000"),
        ];
        let listeners = ListenerIndex::new();
        let cfg = GraphConfig::new();
        let mut cache = EdgeCache::new(Duration::from_secs(15));
        let t0 = Instant::now();

        let input = TopologyInput {
            procs: &procs_now,
            conns: &conns,
            listeners: &listeners,
            rules: &[],
        };
        build_graph(&input, &cfg, &mut cache, t0);

        let empty_procs = HashMap::new();
        let empty = TopologyInput {
            procs: &empty_procs,
            conns: &[],
            listeners: &listeners,
            rules: &[],
        };
        let graph = build_graph(&empty, &cfg, &mut cache, t0 + Duration::from_secs(5));
        assert_eq!(graph.edges.len(), 1);
        assert!(graph.edges[0].stale);
        assert_eq!(graph.edges[0].color, STALE_EDGE_COLOR);
        // Endpoints of the stale edge are materialized
        assert!(node(&graph, "100").is_some());
        assert!(node(&graph, "200").is_some());

        let graph = build_graph(&empty, &cfg, &mut cache, t0 + Duration::from_secs(16));
        assert!(graph.edges.is_empty());
        assert!(graph.nodes.is_empty());
    }

    #[test]
    fn test_icons_and_rules_shape_nodes() {
        let procs = procs(&[(100, "postgres"), (200, "psql")]);
        let rules: Vec<ClassificationRule> = serde_json::from_str(
            r#"[{"match_name": "/^postgres/", "type": "database", "label": "Primary DB"}]"#,
        )
        .unwrap();
        let cfg = GraphConfig {
            icons: Some(IconSet::with_files(
                "/icons",
                [("database", "database.png"), ("external", "external.png")],
            )),
            ..GraphConfig::new()
        };
        let listeners = ListenerIndex::new();
        let conns = vec![rec(200, "10.0.0.1:40000", "1.2.3.4:443")];
        let input = TopologyInput {
            procs: &procs,
            conns: &conns,
            listeners: &listeners,
            rules: &rules,
        };
        let mut cache = EdgeCache::new(Duration::from_secs(15));
        let graph = build_graph(&input, &cfg, &mut cache, Instant::now());

        let db = node(&graph, "100").unwrap();
        assert_eq!(db.node_type, "database");
        assert_eq!(db.label, "Primary DB\nPID 100");
        assert_eq!(db.shape, "image");
        assert_eq!(db.image.as_deref(), Some("/assets/database.png"));

        // No app or service icon on disk
        let client = node(&graph, "200").unwrap();
        assert_eq!(client.shape, "icon");
        assert_eq!(client.image, None);

        let external = node(&graph, "1.2.3.4:443").unwrap();
        assert_eq!(external.image.as_deref(), Some("/assets/external.png"));
    }

    #[test]
    fn test_parallel_services_fan_out() {
        let procs = procs(&[(100, "app"), (200, "server")]);
        let conns = vec![
            rec(100, "10.0.0.1:5000", "10.0.0.2:443"),
            rec(200, "10.0.0.2:443", "10.0.0.1:5000"),
            rec(100, "10.0.0.1:5001", "10.0.0.2:80"),
            rec(200, "10.0.0.2:80", "10.0.0.1:5001"),
        ];
        let graph = build(&procs, &conns, &ListenerIndex::new(), &GraphConfig::new());

        assert_eq!(graph.edges.len(), 2);
        let by_id: HashMap<&str, &GraphEdge> =
            graph.edges.iter().map(|e| (e.id.as_str(), e)).collect();
        assert_eq!(by_id["100->200:80"].smooth, Smooth::curved(0.0));
        assert_eq!(by_id["100->200:443"].smooth, Smooth::curved(0.15));
    }

    #[test]
    fn test_graph_serializes_for_the_renderer() {
        let procs = procs(&[(100, "curl"), (200, "nginx")]);
        let conns = vec![
            rec(100, "10.0.0.1:5000", "10.0.0.2:443"),
            rec(200, "10.0.0.2:443", "10.0.0.1:5000"),
        ];
        let graph = build(&procs, &conns, &ListenerIndex::new(), &GraphConfig::new());
        let json = serde_json::to_value(&graph).unwrap();

        let edge = &json["edges"][0];
        assert_eq!(edge["smooth"]["type"], "continuous");
        assert_eq!(edge["dashes"], false);
        assert!(edge.get("stale").is_none());
        assert!(edge.get("width").is_none());
        assert!(edge.get("port").is_none());
        assert_eq!(json["nodes"][0]["type"], "app");
    }

    proptest! {
        #![proptest_config(ProptestConfig::with_cases(64))]

        /// Collector ordering never changes the document
        #[test]
        fn prop_order_independent(conns in Just(vec![
            rec(100, "10.0.0.1:5000", "10.0.0.2:443"),
            rec(100, "10.0.0.1:5001", "10.0.0.2:443"),
            rec(200, "10.0.0.2:443", "10.0.0.1:5000"),
            rec(200, "10.0.0.2:443", "10.0.0.1:5001"),
            rec(100, "10.0.0.1:6000", "8.8.8.8:53"),
            rec(300, "127.0.0.1:7000", "127.0.0.1:6379"),
            rec(300, "127.0.0.1:7001", "127.0.0.1:6379"),
        ]).prop_shuffle()) {
            let procs = procs(&[(100, "a"), (200, "b"), (300, "c")]);
            let listeners = ListenerIndex::from_listening([(Endpoint::new("127.0.0.1", 6379), 400)]);
            let cfg = GraphConfig::new();
            let mut sorted = conns.clone();
            sorted.sort();
            prop_assert_eq!(
                build(&procs, &conns, &listeners, &cfg),
                build(&procs, &sorted, &listeners, &cfg)
            );
        }
    }
}
