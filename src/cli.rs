// Command line
//
// Every flag also reads a PROCMAP_* environment variable.

use crate::app::config::{
    parse_service_ports, resolve_path, secs_to_duration, GraphConfig, IconSet, Settings,
    DEFAULT_EDGE_TTL_SECS, DEFAULT_HTTP_PORT, DEFAULT_POLL_INTERVAL_SECS, MIN_POLL_INTERVAL,
};
use clap::Parser;
use std::net::{IpAddr, Ipv4Addr};
use std::path::PathBuf;
use std::time::Duration;

#[derive(Parser, Debug)]
#[command(
    name = "procmap",
    version,
    about = "Live process-to-process network map in the browser"
)]
pub struct Cli {
    /// Address the dashboard binds to
    #[arg(long, env = "PROCMAP_BIND", default_value_t = IpAddr::V4(Ipv4Addr::UNSPECIFIED))]
    pub bind: IpAddr,

    /// Dashboard HTTP port
    #[arg(long, env = "PROCMAP_PORT", default_value_t = DEFAULT_HTTP_PORT)]
    pub port: u16,

    /// Seconds between socket polls
    #[arg(long, env = "PROCMAP_INTERVAL", value_name = "SECONDS", default_value_t = DEFAULT_POLL_INTERVAL_SECS)]
    pub interval: f64,

    /// Seconds a vanished edge stays visible as stale
    #[arg(long, env = "PROCMAP_EDGE_TTL", value_name = "SECONDS", default_value_t = DEFAULT_EDGE_TTL_SECS)]
    pub edge_ttl: f64,

    /// Classification rules file (JSON, or YAML by extension)
    #[arg(long, env = "PROCMAP_RULES", value_name = "FILE")]
    pub rules: Option<PathBuf>,

    /// Only draw process-to-process edges
    #[arg(long, visible_alias = "p2p-only", env = "PROCMAP_PEER_ONLY")]
    pub peer_only: bool,

    /// Also collect UDP flows (Linux only)
    #[arg(long, env = "PROCMAP_UDP")]
    pub udp: bool,

    /// Extra well-known service ports, e.g. 3000,5000
    #[arg(long, env = "PROCMAP_SVC_PORTS", value_name = "PORTS")]
    pub svc_ports: Option<String>,

    /// Directory with per-type icon files (app.png, database.png, ...)
    #[arg(long, env = "PROCMAP_ICONS_DIR", value_name = "DIR")]
    pub icons_dir: Option<PathBuf>,
}

impl Cli {
    pub fn into_settings(self) -> Settings {
        let extra_ports = self
            .svc_ports
            .as_deref()
            .map(parse_service_ports)
            .unwrap_or_default();
        let icons = self
            .icons_dir
            .as_deref()
            .map(resolve_path)
            .and_then(|dir| IconSet::scan(&dir));

        let graph = GraphConfig {
            peer_only: self.peer_only,
            udp_enabled: self.udp,
            icons,
            ..GraphConfig::new()
        }
        .with_extra_service_ports(extra_ports);

        Settings {
            bind: self.bind,
            port: self.port,
            poll_interval: secs_to_duration(self.interval, MIN_POLL_INTERVAL),
            edge_ttl: secs_to_duration(self.edge_ttl, Duration::ZERO),
            rules_path: self.rules.as_deref().map(resolve_path),
            graph,
        }
    }
}
