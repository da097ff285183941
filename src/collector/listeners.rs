// Listener index
//
// (bind address, port) -> owning pid for every LISTEN socket of the poll.
// Used by the topology builder to resolve connections whose peer socket
// was not observed.

use crate::net::{ConnectionState, Endpoint};
use netstat2::{get_sockets_info, AddressFamilyFlags, ProtocolFlags, ProtocolSocketInfo};
use std::collections::HashMap;
use tracing::{debug, warn};

pub const IPV4_ANY: &str = "0.0.0.0";
pub const IPV6_ANY: &str = "::";

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ListenerIndex {
    entries: HashMap<(String, u16), u32>,
}

impl ListenerIndex {
    pub fn new() -> Self {
        Self::default()
    }

    /// Build the index from listening sockets
    ///
    /// Every socket is stored under its bind address. Sockets bound to a
    /// concrete host additionally register a synonym under the matching
    /// wildcard (`0.0.0.0` or `::`), unless a real wildcard listener already
    /// owns that key.
    pub fn from_listening<I>(sockets: I) -> Self
    where
        I: IntoIterator<Item = (Endpoint, u32)>,
    {
        let mut entries = HashMap::new();
        let mut synonyms = Vec::new();

        for (bind, pid) in sockets {
            let wildcard = if bind.is_ipv6() { IPV6_ANY } else { IPV4_ANY };
            if bind.host != wildcard {
                synonyms.push(((wildcard.to_string(), bind.port), pid));
            }
            entries.insert((bind.host, bind.port), pid);
        }
        for (key, pid) in synonyms {
            entries.entry(key).or_insert(pid);
        }

        Self { entries }
    }

    pub fn get(&self, host: &str, port: u16) -> Option<u32> {
        self.entries.get(&(host.to_string(), port)).copied()
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }
}

/// Enumerate LISTEN sockets on this host
///
/// Enumeration failure yields an empty index; the poll carries on.
pub fn build_listeners() -> ListenerIndex {
    let af_flags = AddressFamilyFlags::IPV4 | AddressFamilyFlags::IPV6;
    let sockets = match get_sockets_info(af_flags, ProtocolFlags::TCP) {
        Ok(sockets) => sockets,
        Err(e) => {
            warn!(error = %e, "Cannot enumerate listening sockets");
            return ListenerIndex::new();
        }
    };

    let listening = sockets.into_iter().filter_map(|si| {
        let pid = si.associated_pids.first().copied()?;
        match si.protocol_socket_info {
            ProtocolSocketInfo::Tcp(tcp)
                if ConnectionState::from_netstat(tcp.state) == ConnectionState::Listen =>
            {
                Some((Endpoint::new(tcp.local_addr.to_string(), tcp.local_port), pid))
            }
            _ => None,
        }
    });

    let index = ListenerIndex::from_listening(listening);
    debug!(entries = index.len(), "build_listeners: indexed listening sockets");
    index
}
