// Windows collector
// Reads the owner-pid TCP tables from the IP Helper API
//
// The tables are fetched as raw bytes (size probe, then fetch) and decoded
// field by field below, so the decoding is testable on any OS.
//
// MIB_TCPTABLE_OWNER_PID
//   +0  u32 LE  dwNumEntries
//   +4  rows, 24 bytes each:
//       +0  u32 LE  dwState
//       +4  [u8;4]  dwLocalAddr   (network order)
//       +8  [u8;4]  dwLocalPort   (first two bytes, network order)
//       +12 [u8;4]  dwRemoteAddr  (network order)
//       +16 [u8;4]  dwRemotePort  (first two bytes, network order)
//       +20 u32 LE  dwOwningPid
//
// MIB_TCP6TABLE_OWNER_PID
//   +0  u32 LE  dwNumEntries
//   +4  rows, 56 bytes each:
//       +0  [u8;16] ucLocalAddr
//       +16 u32 LE  dwLocalScopeId
//       +20 [u8;4]  dwLocalPort   (first two bytes, network order)
//       +24 [u8;16] ucRemoteAddr
//       +40 u32 LE  dwRemoteScopeId
//       +44 [u8;4]  dwRemotePort  (first two bytes, network order)
//       +48 u32 LE  dwState
//       +52 u32 LE  dwOwningPid

use super::{CollectError, Collector, Observation};
use crate::net::addr::{ipv4_from_dword_bytes, ipv6_from_bytes, port_from_dword_bytes};
use crate::net::{ConnectionRecord, ConnectionState, Endpoint};
use crate::process::ProcessEnricher;
use tracing::{debug, info, warn};

pub const TCP4_ROW_SIZE: usize = 24;
pub const TCP6_ROW_SIZE: usize = 56;
const TABLE_HEADER_SIZE: usize = 4;

fn take<const N: usize>(buf: &[u8], offset: usize) -> [u8; N] {
    let mut out = [0u8; N];
    out.copy_from_slice(&buf[offset..offset + N]);
    out
}

fn read_u32_le(buf: &[u8], offset: usize) -> u32 {
    u32::from_le_bytes(take::<4>(buf, offset))
}

/// Validate the header and return the row slice
fn table_rows(buf: &[u8], row_size: usize) -> Result<&[u8], CollectError> {
    if buf.len() < TABLE_HEADER_SIZE {
        return Err(CollectError::Truncated {
            needed: TABLE_HEADER_SIZE,
            available: buf.len(),
        });
    }
    let count = read_u32_le(buf, 0) as usize;
    let needed = count
        .checked_mul(row_size)
        .and_then(|n| n.checked_add(TABLE_HEADER_SIZE))
        .ok_or(CollectError::Truncated {
            needed: usize::MAX,
            available: buf.len(),
        })?;
    if buf.len() < needed {
        return Err(CollectError::Truncated {
            needed,
            available: buf.len(),
        });
    }
    Ok(&buf[TABLE_HEADER_SIZE..needed])
}

/// Decode an IPv4 owner-pid table; LISTEN rows and ownerless rows are skipped
pub fn decode_tcp4_table(buf: &[u8]) -> Result<Vec<ConnectionRecord>, CollectError> {
    let rows = table_rows(buf, TCP4_ROW_SIZE)?;
    Ok(rows
        .chunks_exact(TCP4_ROW_SIZE)
        .filter_map(|row| {
            let state = ConnectionState::from_mib(read_u32_le(row, 0));
            if state == ConnectionState::Listen {
                return None;
            }
            let local = Endpoint::new(
                ipv4_from_dword_bytes(take(row, 4)),
                port_from_dword_bytes(take(row, 8)),
            );
            let remote = Endpoint::new(
                ipv4_from_dword_bytes(take(row, 12)),
                port_from_dword_bytes(take(row, 16)),
            );
            let pid = read_u32_le(row, 20);
            if pid == 0 {
                return None;
            }
            Some(ConnectionRecord::new(pid, local, remote, state))
        })
        .collect())
}

/// Decode an IPv6 owner-pid table; LISTEN rows and ownerless rows are skipped
pub fn decode_tcp6_table(buf: &[u8]) -> Result<Vec<ConnectionRecord>, CollectError> {
    let rows = table_rows(buf, TCP6_ROW_SIZE)?;
    Ok(rows
        .chunks_exact(TCP6_ROW_SIZE)
        .filter_map(|row| {
            let state = ConnectionState::from_mib(read_u32_le(row, 48));
            if state == ConnectionState::Listen {
                return None;
            }
            let local = Endpoint::new(ipv6_from_bytes(take(row, 0)), port_from_dword_bytes(take(row, 20)));
            let remote = Endpoint::new(ipv6_from_bytes(take(row, 24)), port_from_dword_bytes(take(row, 44)));
            let pid = read_u32_le(row, 52);
            if pid == 0 {
                return None;
            }
            Some(ConnectionRecord::new(pid, local, remote, state))
        })
        .collect())
}

#[cfg(windows)]
mod ffi {
    use super::CollectError;
    use windows_sys::Win32::Foundation::{ERROR_INSUFFICIENT_BUFFER, NO_ERROR};
    use windows_sys::Win32::NetworkManagement::IpHelper::{
        GetExtendedTcpTable, TCP_TABLE_OWNER_PID_ALL,
    };
    use windows_sys::Win32::Networking::WinSock::{AF_INET, AF_INET6};

    /// Live sockets can appear between probe and fetch; retry a few times
    const FETCH_ATTEMPTS: usize = 3;

    fn fetch_table(family: u32) -> Result<Vec<u8>, CollectError> {
        let mut size: u32 = 0;
        // Size probe: null buffer, the API reports the required size
        unsafe {
            GetExtendedTcpTable(
                std::ptr::null_mut(),
                &mut size,
                0,
                family,
                TCP_TABLE_OWNER_PID_ALL,
                0,
            );
        }

        for _ in 0..FETCH_ATTEMPTS {
            if size == 0 {
                return Ok(Vec::new());
            }
            // u32-backed so the table header is aligned
            let mut backing = vec![0u32; (size as usize).div_ceil(4)];
            let ret = unsafe {
                GetExtendedTcpTable(
                    backing.as_mut_ptr().cast(),
                    &mut size,
                    0,
                    family,
                    TCP_TABLE_OWNER_PID_ALL,
                    0,
                )
            };
            if ret == NO_ERROR {
                let bytes = backing
                    .iter()
                    .flat_map(|word| word.to_ne_bytes())
                    .take(size as usize)
                    .collect();
                return Ok(bytes);
            }
            if ret != ERROR_INSUFFICIENT_BUFFER {
                return Err(CollectError::SocketTable(format!(
                    "GetExtendedTcpTable returned {ret}"
                )));
            }
        }
        Err(CollectError::SocketTable(
            "socket table kept growing between size probe and fetch".to_string(),
        ))
    }

    pub fn fetch_tcp4() -> Result<Vec<u8>, CollectError> {
        fetch_table(AF_INET as u32)
    }

    pub fn fetch_tcp6() -> Result<Vec<u8>, CollectError> {
        fetch_table(AF_INET6 as u32)
    }
}

#[cfg(not(windows))]
mod ffi {
    use super::CollectError;

    pub fn fetch_tcp4() -> Result<Vec<u8>, CollectError> {
        Err(CollectError::Unsupported)
    }

    pub fn fetch_tcp6() -> Result<Vec<u8>, CollectError> {
        Err(CollectError::Unsupported)
    }
}

/// IP Helper table collector with sysinfo enrichment
pub struct TcpTableCollector {
    enricher: ProcessEnricher,
}

impl TcpTableCollector {
    pub fn new(include_udp: bool) -> Self {
        if include_udp {
            info!("UDP peers are not exposed by the owner-pid tables; showing TCP only");
        }
        Self {
            enricher: ProcessEnricher::new(),
        }
    }

    fn try_collect(&mut self) -> Result<Observation, CollectError> {
        let mut records = decode_tcp4_table(&ffi::fetch_tcp4()?)?;
        // An IPv6 failure keeps the IPv4 half
        match ffi::fetch_tcp6().and_then(|buf| decode_tcp6_table(&buf)) {
            Ok(v6) => records.extend(v6),
            Err(e) => debug!(error = %e, "IPv6 table unavailable"),
        }

        let mut obs = Observation::default();
        for record in records {
            obs.push(record, None);
        }
        self.enricher.enrich(&mut obs.procs);
        Ok(obs)
    }
}

impl Collector for TcpTableCollector {
    fn name(&self) -> &'static str {
        "windows-iphlpapi"
    }

    fn collect(&mut self) -> Observation {
        match self.try_collect() {
            Ok(obs) => obs,
            Err(e) => {
                warn!(error = %e, "Windows collection failed, publishing empty poll");
                Observation::default()
            }
        }
    }
}
