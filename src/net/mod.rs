// Socket observation model
//
// Plain data shared by every collector and by the topology builder:
// endpoints, TCP states, per-socket connection records and the
// identity of the process that owns them.

pub mod addr;

use std::fmt;

pub use addr::parse_endpoint;

/// A (host, port) pair in canonical textual form
///
/// Hosts keep whatever literal the source reported (`127.0.0.1`, `::1`,
/// `*`). Wildcard ports are stored as 0.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct Endpoint {
    pub host: String,
    pub port: u16,
}

impl Endpoint {
    pub fn new(host: impl Into<String>, port: u16) -> Self {
        Self {
            host: host.into(),
            port,
        }
    }

    /// True for `*`, `0.0.0.0` and `::` hosts
    pub fn is_wildcard_host(&self) -> bool {
        matches!(self.host.as_str(), "*" | "0.0.0.0" | "::" | "")
    }

    /// Wildcard host and wildcard port, i.e. not a real peer
    pub fn is_fully_wildcard(&self) -> bool {
        self.is_wildcard_host() && self.port == 0
    }

    pub fn is_ipv6(&self) -> bool {
        self.host.contains(':')
    }
}

impl fmt::Display for Endpoint {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}:{}", self.host, self.port)
    }
}

/// Socket state as reported by the OS, plus the `UDP` pseudo-state
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum ConnectionState {
    Established,
    SynSent,
    SynReceived,
    FinWait1,
    FinWait2,
    TimeWait,
    Closed,
    CloseWait,
    LastAck,
    Listen,
    Closing,
    DeleteTcb,
    Udp,
    Unknown,
}

impl ConnectionState {
    /// Parse the state column of `ss` output (`ESTAB`, `SYN-SENT`, ...)
    pub fn from_ss(token: &str) -> Self {
        match token {
            "ESTAB" => ConnectionState::Established,
            "SYN-SENT" => ConnectionState::SynSent,
            "SYN-RECV" => ConnectionState::SynReceived,
            "FIN-WAIT-1" => ConnectionState::FinWait1,
            "FIN-WAIT-2" => ConnectionState::FinWait2,
            "TIME-WAIT" => ConnectionState::TimeWait,
            "CLOSE-WAIT" => ConnectionState::CloseWait,
            "LAST-ACK" => ConnectionState::LastAck,
            "LISTEN" => ConnectionState::Listen,
            "CLOSING" => ConnectionState::Closing,
            "CLOSED" | "UNCONN" => ConnectionState::Closed,
            _ => ConnectionState::Unknown,
        }
    }

    /// Map the numeric `dwState` of a `MIB_TCPROW_OWNER_PID` row
    pub fn from_mib(code: u32) -> Self {
        match code {
            1 => ConnectionState::Closed,
            2 => ConnectionState::Listen,
            3 => ConnectionState::SynSent,
            4 => ConnectionState::SynReceived,
            5 => ConnectionState::Established,
            6 => ConnectionState::FinWait1,
            7 => ConnectionState::FinWait2,
            8 => ConnectionState::CloseWait,
            9 => ConnectionState::Closing,
            10 => ConnectionState::LastAck,
            11 => ConnectionState::TimeWait,
            12 => ConnectionState::DeleteTcb,
            _ => ConnectionState::Unknown,
        }
    }

    pub fn from_netstat(state: netstat2::TcpState) -> Self {
        use netstat2::TcpState;
        match state {
            TcpState::Closed => ConnectionState::Closed,
            TcpState::Listen => ConnectionState::Listen,
            TcpState::SynSent => ConnectionState::SynSent,
            TcpState::SynReceived => ConnectionState::SynReceived,
            TcpState::Established => ConnectionState::Established,
            TcpState::FinWait1 => ConnectionState::FinWait1,
            TcpState::FinWait2 => ConnectionState::FinWait2,
            TcpState::CloseWait => ConnectionState::CloseWait,
            TcpState::Closing => ConnectionState::Closing,
            TcpState::LastAck => ConnectionState::LastAck,
            TcpState::TimeWait => ConnectionState::TimeWait,
            TcpState::DeleteTcb => ConnectionState::DeleteTcb,
            TcpState::Unknown => ConnectionState::Unknown,
        }
    }

    pub fn as_str(self) -> &'static str {
        match self {
            ConnectionState::Established => "ESTABLISHED",
            ConnectionState::SynSent => "SYN_SENT",
            ConnectionState::SynReceived => "SYN_RECEIVED",
            ConnectionState::FinWait1 => "FIN_WAIT1",
            ConnectionState::FinWait2 => "FIN_WAIT2",
            ConnectionState::TimeWait => "TIME_WAIT",
            ConnectionState::Closed => "CLOSED",
            ConnectionState::CloseWait => "CLOSE_WAIT",
            ConnectionState::LastAck => "LAST_ACK",
            ConnectionState::Listen => "LISTEN",
            ConnectionState::Closing => "CLOSING",
            ConnectionState::DeleteTcb => "DELETE_TCB",
            ConnectionState::Udp => "UDP",
            ConnectionState::Unknown => "UNKNOWN",
        }
    }

    pub fn is_udp(self) -> bool {
        self == ConnectionState::Udp
    }
}

impl fmt::Display for ConnectionState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// One observed socket, seen from the process that owns it
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct ConnectionRecord {
    pub pid: u32,
    pub local: Endpoint,
    pub remote: Endpoint,
    pub state: ConnectionState,
}

impl ConnectionRecord {
    pub fn new(pid: u32, local: Endpoint, remote: Endpoint, state: ConnectionState) -> Self {
        Self {
            pid,
            local,
            remote,
            state,
        }
    }

    pub fn protocol(&self) -> &'static str {
        if self.state.is_udp() {
            "UDP"
        } else {
            "TCP"
        }
    }
}

/// Placeholder used when a process attribute could not be looked up
pub const UNKNOWN_FIELD: &str = "?";

/// Who owns a socket
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ProcessIdentity {
    pub pid: u32,
    pub name: String,
    pub user: String,
    pub command_line: String,
}

impl ProcessIdentity {
    /// Identity with `?` placeholders, filled in later by enrichment
    pub fn placeholder(pid: u32) -> Self {
        Self {
            pid,
            name: UNKNOWN_FIELD.to_string(),
            user: UNKNOWN_FIELD.to_string(),
            command_line: String::new(),
        }
    }

    pub fn named(pid: u32, name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            ..Self::placeholder(pid)
        }
    }

    /// Display name, or `pid N` when the name is empty
    pub fn display_name(&self) -> String {
        if self.name.is_empty() {
            format!("pid {}", self.pid)
        } else {
            self.name.clone()
        }
    }
}
