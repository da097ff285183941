// Parallel-edge layout hints
//
// Edges sharing the same (from, to) pair fan out with alternating
// curvature so the renderer does not draw them on top of each other.

use super::{GraphEdge, Smooth};
use std::collections::BTreeMap;

/// Curvature step between neighbouring parallel edges
const ROUNDNESS_STEP_PERCENT: u32 = 15;

/// Signed curvature for the i-th edge of a group: 0, +.15, -.15, +.3, -.3, ...
pub fn curvature_offset(index: usize) -> f64 {
    if index == 0 {
        return 0.0;
    }
    let step = index.div_ceil(2) as u32;
    let magnitude = f64::from(step * ROUNDNESS_STEP_PERCENT) / 100.0;
    if index % 2 == 1 {
        magnitude
    } else {
        -magnitude
    }
}

/// Set the `smooth` hint on every edge
pub fn assign_curvature(edges: &mut BTreeMap<String, GraphEdge>) {
    let mut groups: BTreeMap<(String, String), Vec<&mut GraphEdge>> = BTreeMap::new();
    for edge in edges.values_mut() {
        groups
            .entry((edge.from.clone(), edge.to.clone()))
            .or_default()
            .push(edge);
    }

    for group in groups.values_mut() {
        if let [single] = group.as_mut_slice() {
            single.smooth = Smooth::continuous();
            continue;
        }
        group.sort_by(|a, b| a.port.cmp(&b.port).then_with(|| a.id.cmp(&b.id)));
        for (i, edge) in group.iter_mut().enumerate() {
            edge.smooth = Smooth::curved(curvature_offset(i));
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::theme::Dashes;

    fn edge(id: &str, from: &str, to: &str, port: u16) -> GraphEdge {
        GraphEdge {
            id: id.to_string(),
            from: from.to_string(),
            to: to.to_string(),
            label: String::new(),
            title: String::new(),
            color: String::new(),
            protocol: "TCP".to_string(),
            state: "ESTABLISHED".to_string(),
            dashes: Dashes::SOLID,
            width: None,
            stale: false,
            smooth: Smooth::continuous(),
            port,
        }
    }

    #[test]
    fn test_offset_sequence() {
        let offsets: Vec<f64> = (0..7).map(curvature_offset).collect();
        assert_eq!(offsets, vec![0.0, 0.15, -0.15, 0.3, -0.3, 0.45, -0.45]);
    }

    #[test]
    fn test_single_edge_is_continuous() {
        let mut edges = BTreeMap::from([("1->2:80".to_string(), edge("1->2:80", "1", "2", 80))]);
        assign_curvature(&mut edges);
        assert_eq!(edges["1->2:80"].smooth, Smooth::continuous());
    }

    #[test]
    fn test_parallel_edges_alternate_by_port() {
        let mut edges = BTreeMap::new();
        for port in [9092u16, 80, 443] {
            let id = format!("1->2:{port}");
            edges.insert(id.clone(), edge(&id, "1", "2", port));
        }
        // Reverse direction is its own group
        edges.insert("2->1:22".to_string(), edge("2->1:22", "2", "1", 22));
        assign_curvature(&mut edges);

        assert_eq!(edges["1->2:80"].smooth, Smooth::curved(0.0));
        assert_eq!(edges["1->2:443"].smooth, Smooth::curved(0.15));
        assert_eq!(edges["1->2:9092"].smooth, Smooth::curved(-0.15));
        assert_eq!(edges["2->1:22"].smooth, Smooth::continuous());
        assert_eq!(edges["1->2:9092"].smooth.kind, "curvedCCW");
    }
}
