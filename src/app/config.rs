// Application configuration types
//
// This module contains:
// - Defaults for polling, edge decay and the HTTP shell
// - GraphConfig: the knobs the topology builder reads
// - IconSet: which per-type icon files exist on disk
// - Settings: the whole runtime configuration built from the command line

use crate::theme::{default_service_ports, ICON_FILENAMES};
use std::collections::{BTreeMap, BTreeSet};
use std::net::IpAddr;
use std::path::{Path, PathBuf};
use std::time::Duration;
use tracing::{info, warn};

// ============================================================================
// Constants
// ============================================================================

/// Seconds between collector polls
pub const DEFAULT_POLL_INTERVAL_SECS: f64 = 1.0;

/// Shortest accepted poll interval
pub const MIN_POLL_INTERVAL: Duration = Duration::from_millis(50);

/// Seconds a vanished edge stays visible as stale
pub const DEFAULT_EDGE_TTL_SECS: f64 = 15.0;

/// HTTP port of the dashboard
pub const DEFAULT_HTTP_PORT: u16 = 8765;

/// Ports below this are privileged
pub const PRIVILEGED_PORT_LIMIT: u16 = 1024;

// ============================================================================
// Graph configuration
// ============================================================================

/// Icon files found in the icons directory, keyed by node type
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct IconSet {
    pub dir: PathBuf,
    files: BTreeMap<String, String>,
}

impl IconSet {
    /// Register every conventional icon file that exists under `dir`
    pub fn scan(dir: &Path) -> Option<Self> {
        if !dir.is_dir() {
            warn!(dir = %dir.display(), "Icons directory not found or not a directory");
            return None;
        }
        let files = ICON_FILENAMES
            .iter()
            .filter(|(_, file)| dir.join(file).is_file())
            .map(|(node_type, file)| (node_type.to_string(), file.to_string()))
            .collect();
        info!(dir = %dir.display(), "Using icons directory");
        Some(Self {
            dir: dir.to_path_buf(),
            files,
        })
    }

    #[cfg(test)]
    pub fn with_files<I, K, V>(dir: impl Into<PathBuf>, files: I) -> Self
    where
        I: IntoIterator<Item = (K, V)>,
        K: Into<String>,
        V: Into<String>,
    {
        Self {
            dir: dir.into(),
            files: files
                .into_iter()
                .map(|(k, v)| (k.into(), v.into()))
                .collect(),
        }
    }

    pub fn file_for(&self, node_type: &str) -> Option<&str> {
        self.files.get(node_type).map(String::as_str)
    }
}

/// Settings that shape the graph document
#[derive(Debug, Clone)]
pub struct GraphConfig {
    /// Only draw pid-to-pid edges; no externals, no listener fallbacks
    pub peer_only: bool,

    /// UDP flows were collected and may show up as edges
    pub udp_enabled: bool,

    /// Well-known service ports: defaults plus user additions
    pub service_ports: BTreeSet<u16>,

    pub icons: Option<IconSet>,
}

impl GraphConfig {
    pub fn new() -> Self {
        Self {
            peer_only: false,
            udp_enabled: false,
            service_ports: default_service_ports().collect(),
            icons: None,
        }
    }

    /// Add extra well-known service ports on top of the defaults
    pub fn with_extra_service_ports(mut self, extra: impl IntoIterator<Item = u16>) -> Self {
        self.service_ports.extend(extra);
        self
    }
}

impl Default for GraphConfig {
    fn default() -> Self {
        Self::new()
    }
}

/// Parse `--svc-ports`: comma-separated, blanks ignored
///
/// One bad item discards the whole list, with a warning.
pub fn parse_service_ports(raw: &str) -> BTreeSet<u16> {
    let parsed: Result<BTreeSet<u16>, _> = raw
        .split(',')
        .map(str::trim)
        .filter(|item| !item.is_empty())
        .map(str::parse::<u16>)
        .collect();
    match parsed {
        Ok(ports) => ports,
        Err(e) => {
            warn!(value = raw, error = %e, "Ignoring invalid service port list");
            BTreeSet::new()
        }
    }
}

/// Resolve a user-supplied path
///
/// Absolute paths are used as is; relative ones are tried against the
/// working directory, then against the directory of the executable.
pub fn resolve_path(raw: &Path) -> PathBuf {
    if raw.is_absolute() {
        return raw.to_path_buf();
    }
    if let Ok(cwd) = std::env::current_dir() {
        let candidate = cwd.join(raw);
        if candidate.exists() {
            return candidate;
        }
    }
    std::env::current_exe()
        .ok()
        .and_then(|exe| exe.parent().map(|dir| dir.join(raw)))
        .unwrap_or_else(|| raw.to_path_buf())
}

// ============================================================================
// Runtime settings
// ============================================================================

/// Everything the binary needs to run
#[derive(Debug, Clone)]
pub struct Settings {
    pub bind: IpAddr,
    pub port: u16,
    pub poll_interval: Duration,
    pub edge_ttl: Duration,
    pub rules_path: Option<PathBuf>,
    pub graph: GraphConfig,
}

/// Seconds from the command line, clamped to something usable
pub fn secs_to_duration(secs: f64, min: Duration) -> Duration {
    if secs.is_finite() && secs > 0.0 {
        Duration::from_secs_f64(secs).max(min)
    } else {
        min
    }
}
