// Theme module - Graph palette and icon conventions
//
// Colors are CSS strings handed straight to the browser renderer.
// Node types come from classification rules; edge colors come from the
// service port of the connection.

pub mod edge;

pub use edge::{dashes_for_state, Dashes, STALE_EDGE_COLOR, STALE_EDGE_WIDTH};

/// Fallback edge color for ports without a class
pub const DEFAULT_EDGE_COLOR: &str = "#7f7f7f";

/// Edge color for UDP flows
pub const UDP_EDGE_COLOR: &str = "#00c2ff";

/// Node type assigned when no rule matches
pub const DEFAULT_NODE_TYPE: &str = "app";

/// Node type of placeholder nodes for remote endpoints
pub const EXTERNAL_NODE_TYPE: &str = "external";

/// Well-known service ports with their category and edge color
///
/// The key set doubles as the default well-known service-port set used by
/// the client/server heuristic.
pub const PORT_CLASSES: &[(u16, &str, &str)] = &[
    (80, "web", "#3489eb"),
    (443, "web", "#3489eb"),
    (8080, "web", "#3489eb"),
    (5432, "db", "#29a36a"),
    (3306, "db", "#29a36a"),
    (1433, "db", "#29a36a"),
    (27017, "db", "#29a36a"),
    (6379, "cache", "#b68900"),
    (5672, "mq", "#e84a5f"),
    (9092, "mq", "#e84a5f"),
    (22, "infra", "#888"),
    (25, "infra", "#888"),
    (53, "infra", "#888"),
    (123, "infra", "#888"),
];

/// Node type -> (color, font icon code)
const NODE_STYLES: &[(&str, &str, &str)] = &[
    ("app", "#9aa0a6", ""),
    ("service", "#6aa84f", ""),
    ("database", "#3c78d8", ""),
    ("message_broker", "#e06666", ""),
    ("cache", "#b68900", ""),
    ("load_balancer", "#8e7cc3", ""),
    ("external", "#ff9900", ""),
    ("qt_desktop", "#00b894", ""),
];

/// Node type -> icon file expected inside the icons directory
pub const ICON_FILENAMES: &[(&str, &str)] = &[
    ("app", "app.png"),
    ("service", "service.png"),
    ("database", "database.png"),
    ("message_broker", "mq.png"),
    ("cache", "cache.png"),
    ("load_balancer", "lb.png"),
    ("external", "external.png"),
    ("qt_desktop", "qt_desktop.png"),
];

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct NodeStyle {
    pub color: &'static str,
    pub icon: &'static str,
}

/// Style for a node type; unknown types look like `app`
pub fn node_style(node_type: &str) -> NodeStyle {
    NODE_STYLES
        .iter()
        .find(|(t, _, _)| *t == node_type)
        .or_else(|| NODE_STYLES.iter().find(|(t, _, _)| *t == DEFAULT_NODE_TYPE))
        .map(|&(_, color, icon)| NodeStyle { color, icon })
        .unwrap_or(NodeStyle {
            color: DEFAULT_EDGE_COLOR,
            icon: "",
        })
}

/// Edge color for a service port
pub fn port_color(port: u16) -> &'static str {
    PORT_CLASSES
        .iter()
        .find(|(p, _, _)| *p == port)
        .map_or(DEFAULT_EDGE_COLOR, |&(_, _, color)| color)
}

/// The default well-known service ports
pub fn default_service_ports() -> impl Iterator<Item = u16> {
    PORT_CLASSES.iter().map(|(port, _, _)| *port)
}
