// Live dashboard page
//
// Single static document; the browser polls /api/graph and reconciles
// nodes and edges by id so the layout does not jump between refreshes.

const TEMPLATE: &str = r#"<!doctype html>
<html>
<head>
  <meta charset="utf-8"/>
  <title>{{TITLE}}</title>
  <script src="https://unpkg.com/vis-network/standalone/umd/vis-network.min.js"></script>
  <style>
    body { margin: 0 16px; background: #14181d; color: #e8eaed; font-family: ui-sans-serif, system-ui, Segoe UI, Arial; }
    #graph { height: 90vh; border: 1px solid #2a2f36; border-radius: 12px; }
    #status { font-size: 12px; color: #9aa0a6; }
  </style>
</head>
<body>
  <h2>{{HEADER}}</h2>
  <div id="status"></div>
  <div id="graph"></div>
  <script>
  const REFRESH_MS = 1500;
  const nodes = new vis.DataSet([]);
  const edges = new vis.DataSet([]);
  const network = new vis.Network(document.getElementById('graph'), { nodes, edges }, {
    physics: { stabilization: true, barnesHut: { gravitationalConstant: -20000, centralGravity: 0.18, springLength: 180 } },
    nodes: { shadow: true, font: { color: '#e8eaed' } },
    edges: { arrows: { to: { enabled: true } }, shadow: true, font: { align: 'top' } }
  });
  network.once('stabilized', () => network.storePositions());

  function reconcile(set, incoming) {
    const seen = new Set(incoming.map(item => item.id));
    incoming.forEach(item => set.get(item.id) ? set.update(item) : set.add(item));
    set.getIds().forEach(id => { if (!seen.has(id)) set.remove(id); });
  }

  async function refresh() {
    try {
      const res = await fetch('/api/graph');
      const graph = await res.json();
      graph.nodes.forEach(n => {
        if (n.shape === 'icon') n.icon = { face: 'FontAwesome', code: n.icon, color: n.color };
        if (n.image === null) delete n.image;
      });
      graph.edges.forEach(e => { if (e.stale) e.shadow = true; });
      reconcile(nodes, graph.nodes);
      reconcile(edges, graph.edges);
      document.getElementById('status').textContent =
        `${graph.nodes.length} nodes, ${graph.edges.length} edges`;
    } catch (err) {
      console.error(err);
    }
  }
  setInterval(refresh, REFRESH_MS);
  refresh();
  </script>
</body>
</html>
"#;

/// Render the dashboard; the headline mentions UDP when it is collected
pub fn render(udp_enabled: bool) -> String {
    let (title, header) = if udp_enabled {
        ("Process TCP/UDP Map", "Process ↔ TCP/UDP Map (Live)")
    } else {
        ("Process TCP Map", "Process ↔ TCP Map (Live)")
    };
    TEMPLATE
        .replace("{{TITLE}}", title)
        .replace("{{HEADER}}", header)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_render_tcp_only() {
        let html = render(false);
        assert!(html.contains("<title>Process TCP Map</title>"));
        assert!(html.contains("Process ↔ TCP Map (Live)"));
        assert!(!html.contains("{{"));
    }

    #[test]
    fn test_render_with_udp() {
        let html = render(true);
        assert!(html.contains("<title>Process TCP/UDP Map</title>"));
        assert!(html.contains("TCP/UDP Map (Live)"));
    }
}
