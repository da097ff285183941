// HTTP shell
//
// Thin axum wrapper around the snapshot store:
//   GET  /                  live dashboard page
//   GET  /api/graph         current graph document
//   POST /api/reload_rules  reload classification rules
//   GET  /assets/{file}     icon files from the icons directory

pub mod page;

use crate::app::config::{resolve_path, GraphConfig};
use crate::app::SnapshotStore;
use crate::rules::load_rules;
use crate::topology::Graph;
use axum::body::Bytes;
use axum::extract::{Path as UrlPath, Query, State};
use axum::http::{header, StatusCode};
use axum::response::{Html, IntoResponse, Response};
use axum::routing::{get, post};
use axum::{Json, Router};
use serde::{Deserialize, Serialize};
use std::net::SocketAddr;
use std::path::{Component, Path, PathBuf};
use std::sync::Arc;
use std::time::Instant;
use tokio::net::TcpListener;
use tracing::{debug, error, info, warn};

/// Everything a request handler needs
#[derive(Debug)]
pub struct AppContext {
    pub store: Arc<SnapshotStore>,
    pub graph: GraphConfig,
    /// Rules file used when a reload request names none
    pub rules_path: Option<PathBuf>,
    page: String,
}

impl AppContext {
    pub fn new(store: Arc<SnapshotStore>, graph: GraphConfig, rules_path: Option<PathBuf>) -> Self {
        let page = page::render(graph.udp_enabled);
        Self {
            store,
            graph,
            rules_path,
            page,
        }
    }
}

pub fn router(ctx: Arc<AppContext>) -> Router {
    Router::new()
        .route("/", get(index))
        .route("/api/graph", get(api_graph))
        .route("/api/reload_rules", post(api_reload_rules))
        .route("/assets/{file}", get(assets))
        .with_state(ctx)
}

/// Bind and serve until Ctrl-C
pub async fn serve(addr: SocketAddr, ctx: Arc<AppContext>) -> std::io::Result<()> {
    let listener = TcpListener::bind(addr).await?;
    info!(%addr, "Dashboard ready at http://{addr}/");
    axum::serve(listener, router(ctx))
        .with_graceful_shutdown(shutdown_signal())
        .await
}

async fn shutdown_signal() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        error!(error = %e, "Cannot listen for Ctrl-C; running until killed");
        std::future::pending::<()>().await;
    }
    info!("Shutting down");
}

// ============================================================================
// Handlers
// ============================================================================

async fn index(State(ctx): State<Arc<AppContext>>) -> Html<String> {
    Html(ctx.page.clone())
}

async fn api_graph(State(ctx): State<Arc<AppContext>>) -> Json<Graph> {
    Json(ctx.store.graph(&ctx.graph, Instant::now()))
}

#[derive(Debug, Default, Deserialize)]
struct ReloadRequest {
    #[serde(default)]
    path: Option<String>,
}

#[derive(Debug, Serialize, PartialEq, Eq)]
struct ReloadResponse {
    ok: bool,
    rules: usize,
}

/// The JSON body wins over `?path=`; neither means the start-up file
async fn api_reload_rules(
    State(ctx): State<Arc<AppContext>>,
    Query(query): Query<ReloadRequest>,
    body: Bytes,
) -> Response {
    let from_body = if body.is_empty() {
        None
    } else {
        match serde_json::from_slice::<ReloadRequest>(&body) {
            Ok(req) => req.path,
            Err(e) => {
                debug!(error = %e, "Reload body is not JSON, ignoring it");
                None
            }
        }
    };
    let path = from_body
        .or(query.path)
        .map(|raw| resolve_path(Path::new(&raw)))
        .or_else(|| ctx.rules_path.clone());

    let rules = match tokio::task::spawn_blocking(move || load_rules(path.as_deref())).await {
        Ok(rules) => rules,
        Err(e) => {
            error!(error = %e, "Rule loader task failed");
            return (StatusCode::INTERNAL_SERVER_ERROR, "rule loader failed").into_response();
        }
    };
    let count = ctx.store.set_rules(rules);
    info!(rules = count, "Classification rules reloaded");
    Json(ReloadResponse {
        ok: true,
        rules: count,
    })
    .into_response()
}

/// A bare file name; anything that could leave the directory is refused
fn is_plain_file_name(name: &str) -> bool {
    let mut components = Path::new(name).components();
    matches!(
        (components.next(), components.next()),
        (Some(Component::Normal(_)), None)
    ) && !name.contains(['/', '\\'])
}

async fn assets(State(ctx): State<Arc<AppContext>>, UrlPath(file): UrlPath<String>) -> Response {
    let Some(icons) = ctx.graph.icons.as_ref() else {
        return StatusCode::NOT_FOUND.into_response();
    };
    if !is_plain_file_name(&file) {
        warn!(file = %file, "Rejected asset path");
        return StatusCode::NOT_FOUND.into_response();
    }

    let path = icons.dir.join(&file);
    match tokio::fs::read(&path).await {
        Ok(bytes) => {
            let mime = mime_guess::from_path(&path).first_or_octet_stream();
            ([(header::CONTENT_TYPE, mime.to_string())], bytes).into_response()
        }
        Err(e) => {
            debug!(path = %path.display(), error = %e, "Asset not found");
            StatusCode::NOT_FOUND.into_response()
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::app::config::IconSet;
    use crate::collector::ListenerIndex;
    use crate::net::{ConnectionRecord, ConnectionState, Endpoint, ProcessIdentity};
    use std::collections::HashMap;
    use std::time::Duration;

    fn context(graph: GraphConfig, rules_path: Option<PathBuf>) -> Arc<AppContext> {
        let store = Arc::new(SnapshotStore::new(Duration::from_secs(15), Vec::new()));
        Arc::new(AppContext::new(store, graph, rules_path))
    }

    #[test]
    fn test_plain_file_names() {
        assert!(is_plain_file_name("database.png"));
        assert!(!is_plain_file_name("../secret"));
        assert!(!is_plain_file_name(".."));
        assert!(!is_plain_file_name("a/b.png"));
        assert!(!is_plain_file_name("..\\b.png"));
        assert!(!is_plain_file_name("/etc/passwd"));
        assert!(!is_plain_file_name(""));
    }

    #[tokio::test]
    async fn test_graph_endpoint_reads_store() {
        let ctx = context(GraphConfig::new(), None);
        ctx.store.publish(
            HashMap::from([(100, ProcessIdentity::named(100, "curl"))]),
            vec![ConnectionRecord::new(
                100,
                Endpoint::new("10.0.0.1", 40000),
                Endpoint::new("93.184.216.34", 443),
                ConnectionState::Established,
            )],
            ListenerIndex::new(),
        );

        let Json(graph) = api_graph(State(ctx)).await;
        assert_eq!(graph.nodes.len(), 2);
        assert_eq!(graph.edges.len(), 1);
        assert_eq!(graph.edges[0].to, "93.184.216.34:443");
    }

    #[tokio::test]
    async fn test_reload_uses_body_then_query_then_default() {
        let dir = tempfile::tempdir().unwrap();
        let two = dir.path().join("two.json");
        std::fs::write(&two, r#"[{"match_name": "a"}, {"match_name": "b"}]"#).unwrap();
        let one = dir.path().join("one.yaml");
        std::fs::write(&one, "- match_name: a\n  type: service\n").unwrap();

        let ctx = context(GraphConfig::new(), Some(one.clone()));

        let body = serde_json::to_vec(&serde_json::json!({ "path": two })).unwrap();
        let res = api_reload_rules(
            State(ctx.clone()),
            Query(ReloadRequest {
                path: Some(one.display().to_string()),
            }),
            Bytes::from(body),
        )
        .await;
        assert_eq!(res.status(), StatusCode::OK);
        let bytes = axum::body::to_bytes(res.into_body(), usize::MAX).await.unwrap();
        let reply: serde_json::Value = serde_json::from_slice(&bytes).unwrap();
        assert_eq!(reply, serde_json::json!({ "ok": true, "rules": 2 }));

        let res = api_reload_rules(
            State(ctx.clone()),
            Query(ReloadRequest {
                path: Some(two.display().to_string()),
            }),
            Bytes::new(),
        )
        .await;
        let bytes = axum::body::to_bytes(res.into_body(), usize::MAX).await.unwrap();
        let reply: serde_json::Value = serde_json::from_slice(&bytes).unwrap();
        assert_eq!(reply["rules"], 2);

        let res = api_reload_rules(State(ctx), Query(ReloadRequest::default()), Bytes::new()).await;
        let bytes = axum::body::to_bytes(res.into_body(), usize::MAX).await.unwrap();
        let reply: serde_json::Value = serde_json::from_slice(&bytes).unwrap();
        assert_eq!(reply["rules"], 1);
    }

    #[tokio::test]
    async fn test_reload_missing_file_clears_rules() {
        let ctx = context(GraphConfig::new(), None);
        let res = api_reload_rules(
            State(ctx),
            Query(ReloadRequest {
                path: Some("/definitely/not/here.json".to_string()),
            }),
            Bytes::new(),
        )
        .await;
        let bytes = axum::body::to_bytes(res.into_body(), usize::MAX).await.unwrap();
        let reply: serde_json::Value = serde_json::from_slice(&bytes).unwrap();
        assert_eq!(reply, serde_json::json!({ "ok": true, "rules": 0 }));
    }

    #[tokio::test]
    async fn test_assets() {
        let dir = tempfile::tempdir().unwrap();
        std::fs::write(dir.path().join("database.png"), b"\x89PNG").unwrap();

        let no_icons = context(GraphConfig::new(), None);
        let res = assets(State(no_icons), UrlPath("database.png".to_string())).await;
        assert_eq!(res.status(), StatusCode::NOT_FOUND);

        let graph = GraphConfig {
            icons: IconSet::scan(dir.path()),
            ..GraphConfig::new()
        };
        let ctx = context(graph, None);

        let res = assets(State(ctx.clone()), UrlPath("database.png".to_string())).await;
        assert_eq!(res.status(), StatusCode::OK);
        assert_eq!(res.headers()[header::CONTENT_TYPE], "image/png");

        let res = assets(State(ctx.clone()), UrlPath("missing.png".to_string())).await;
        assert_eq!(res.status(), StatusCode::NOT_FOUND);

        let res = assets(State(ctx), UrlPath("..".to_string())).await;
        assert_eq!(res.status(), StatusCode::NOT_FOUND);
    }

    #[tokio::test]
    async fn test_index_mentions_udp_when_enabled() {
        let graph = GraphConfig {
            udp_enabled: true,
            ..GraphConfig::new()
        };
        let Html(html) = index(State(context(graph, None))).await;
        assert!(html.contains("TCP/UDP"));
    }
}
