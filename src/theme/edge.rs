// Edge line styles
//
// Dash patterns by connection state, and the muted look of stale edges.

use crate::net::ConnectionState;
use serde::Serialize;

/// Muted color for edges that were not seen in the latest poll
pub const STALE_EDGE_COLOR: &str = "rgba(200,200,200,0.7)";

/// Fixed width for stale edges
pub const STALE_EDGE_WIDTH: f32 = 2.5;

/// vis-network `dashes` option: `false` or a `[dash, gap]` pattern
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(untagged)]
pub enum Dashes {
    Solid(bool),
    Pattern([u8; 2]),
}

impl Dashes {
    pub const SOLID: Dashes = Dashes::Solid(false);
}

/// Half-open and closing states are dashed so they stand out
pub fn dashes_for_state(state: ConnectionState) -> Dashes {
    match state {
        ConnectionState::SynSent => Dashes::Pattern([2, 6]),
        ConnectionState::SynReceived => Dashes::Pattern([6, 6]),
        ConnectionState::TimeWait => Dashes::Pattern([10, 6]),
        ConnectionState::CloseWait => Dashes::Pattern([4, 6]),
        _ => Dashes::SOLID,
    }
}
