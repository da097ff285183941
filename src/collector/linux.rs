// Linux collector
// Runs `ss` and parses one socket per line; read-only
//
// Expected line shape (numeric, with process column):
//   ESTAB 0 0 10.0.0.1:5000 10.0.0.2:443 users:(("curl",pid=100,fd=5))

use super::{CollectError, Collector, Observation};
use crate::net::{parse_endpoint, ConnectionRecord, ConnectionState};
use crate::process::ProcessEnricher;
use regex::Regex;
use std::process::{Command, Stdio};
use std::sync::LazyLock;
use tracing::{debug, warn};

const SS_BINARY: &str = "ss";
const SS_TCP_ARGS: &[&str] = &["-tanp"];
const SS_UDP_ARGS: &[&str] = &["-uanp"];

// Literal patterns: a build failure is a source bug, caught by the unit tests
static LINE_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"^(?P<state>\S+)\s+\S+\s+\S+\s+(?P<laddr>\S+)\s+(?P<raddr>\S+)\s+.*users:\(\(")
        .unwrap_or_else(|e| unreachable!("ss line pattern: {e}"))
});

static PID_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"pid=(?P<pid>\d+),?\s*fd=\d+")
        .unwrap_or_else(|e| unreachable!("ss pid pattern: {e}"))
});

static NAME_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r#""(?P<name>[^"]+)""#).unwrap_or_else(|e| unreachable!("ss name pattern: {e}"))
});

/// A socket line decoded from `ss`, plus the process name it printed
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SsLine {
    pub record: ConnectionRecord,
    pub name: Option<String>,
}

/// Decode one `ss` line; `None` for headers, unowned sockets and bad addresses
pub fn parse_ss_line(line: &str) -> Option<SsLine> {
    let caps = LINE_RE.captures(line)?;
    let pid: u32 = PID_RE
        .captures(line)?
        .name("pid")?
        .as_str()
        .parse()
        .ok()?;
    if pid == 0 {
        return None;
    }

    let local = match parse_endpoint(&caps["laddr"]) {
        Ok(ep) => ep,
        Err(e) => {
            debug!(error = %e, line, "Skipping ss line with bad local address");
            return None;
        }
    };
    let remote = match parse_endpoint(&caps["raddr"]) {
        Ok(ep) => ep,
        Err(e) => {
            debug!(error = %e, line, "Skipping ss line with bad peer address");
            return None;
        }
    };

    let name = NAME_RE
        .captures(line)
        .and_then(|c| c.name("name"))
        .map(|m| m.as_str().to_string());

    Some(SsLine {
        record: ConnectionRecord::new(pid, local, remote, ConnectionState::from_ss(&caps["state"])),
        name,
    })
}

/// Parse TCP output: LISTEN rows and fully wildcard peers are dropped
pub fn parse_tcp_output(text: &str) -> Vec<SsLine> {
    text.lines()
        .filter_map(parse_ss_line)
        .filter(|l| l.record.state != ConnectionState::Listen)
        .filter(|l| !l.record.remote.is_fully_wildcard())
        .collect()
}

/// Parse UDP output: only sockets with a concrete peer are kept
pub fn parse_udp_output(text: &str) -> Vec<SsLine> {
    text.lines()
        .filter_map(parse_ss_line)
        .filter(|l| !l.record.remote.is_wildcard_host() && l.record.remote.port != 0)
        .map(|mut l| {
            l.record.state = ConnectionState::Udp;
            l
        })
        .collect()
}

fn run_ss(args: &[&str]) -> Result<String, CollectError> {
    let command = format!("{} {}", SS_BINARY, args.join(" "));
    let output = Command::new(SS_BINARY)
        .args(args)
        .stdin(Stdio::null())
        .stderr(Stdio::null())
        .output()
        .map_err(|source| CollectError::Spawn {
            command: command.clone(),
            source,
        })?;
    if !output.status.success() {
        return Err(CollectError::Exit {
            command,
            status: output.status.to_string(),
        });
    }
    Ok(String::from_utf8_lossy(&output.stdout).into_owned())
}

/// `ss`-backed collector with sysinfo enrichment
pub struct SsCollector {
    include_udp: bool,
    enricher: ProcessEnricher,
}

impl SsCollector {
    pub fn new(include_udp: bool) -> Self {
        Self {
            include_udp,
            enricher: ProcessEnricher::new(),
        }
    }

    fn try_collect(&mut self) -> Result<Observation, CollectError> {
        let mut obs = Observation::default();
        for line in parse_tcp_output(&run_ss(SS_TCP_ARGS)?) {
            obs.push(line.record, line.name.as_deref());
        }

        if self.include_udp {
            // UDP is optional; a failure here keeps the TCP half
            match run_ss(SS_UDP_ARGS) {
                Ok(text) => {
                    for line in parse_udp_output(&text) {
                        obs.push(line.record, line.name.as_deref());
                    }
                }
                Err(e) => debug!(error = %e, "UDP enumeration failed"),
            }
        }

        self.enricher.enrich(&mut obs.procs);
        Ok(obs)
    }
}

impl Collector for SsCollector {
    fn name(&self) -> &'static str {
        "linux-ss"
    }

    fn collect(&mut self) -> Observation {
        match self.try_collect() {
            Ok(obs) => obs,
            Err(e) => {
                warn!(error = %e, "Linux collection failed, publishing empty poll");
                Observation::default()
            }
        }
    }
}
