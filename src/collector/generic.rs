// Generic collector (macOS, BSD, anything else)
// Enumerates TCP sockets through netstat2

use super::{CollectError, Collector, Observation};
use crate::net::{ConnectionRecord, ConnectionState, Endpoint};
use crate::process::ProcessEnricher;
use netstat2::{get_sockets_info, AddressFamilyFlags, ProtocolFlags, ProtocolSocketInfo, SocketInfo};
use tracing::{info, warn};

pub struct NetstatCollector {
    enricher: ProcessEnricher,
}

impl NetstatCollector {
    pub fn new(include_udp: bool) -> Self {
        if include_udp {
            info!("UDP peers are not exposed by the generic socket table; showing TCP only");
        }
        Self {
            enricher: ProcessEnricher::new(),
        }
    }

    fn try_collect(&mut self) -> Result<Observation, CollectError> {
        let af_flags = AddressFamilyFlags::IPV4 | AddressFamilyFlags::IPV6;
        let sockets = get_sockets_info(af_flags, ProtocolFlags::TCP)
            .map_err(|e| CollectError::SocketTable(e.to_string()))?;

        let mut obs = Observation::default();
        for record in sockets.into_iter().filter_map(to_record) {
            obs.push(record, None);
        }
        self.enricher.enrich(&mut obs.procs);
        Ok(obs)
    }
}

/// Keep sockets with an owner and a real peer
fn to_record(si: SocketInfo) -> Option<ConnectionRecord> {
    let pid = si.associated_pids.first().copied().filter(|pid| *pid != 0)?;
    let ProtocolSocketInfo::Tcp(tcp) = si.protocol_socket_info else {
        return None;
    };
    let state = ConnectionState::from_netstat(tcp.state);
    let remote = Endpoint::new(tcp.remote_addr.to_string(), tcp.remote_port);
    if state == ConnectionState::Listen || remote.is_fully_wildcard() {
        return None;
    }
    let local = Endpoint::new(tcp.local_addr.to_string(), tcp.local_port);
    Some(ConnectionRecord::new(pid, local, remote, state))
}

impl Collector for NetstatCollector {
    fn name(&self) -> &'static str {
        "generic-netstat"
    }

    fn collect(&mut self) -> Observation {
        match self.try_collect() {
            Ok(obs) => obs,
            Err(e) => {
                warn!(error = %e, "Socket enumeration failed, publishing empty poll");
                Observation::default()
            }
        }
    }
}
