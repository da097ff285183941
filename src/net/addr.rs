// Address/port codec
//
// Text form as printed by `ss -n` and the fixed-width binary fields of the
// Windows owner-pid TCP tables.

use super::Endpoint;
use std::net::{Ipv4Addr, Ipv6Addr};
use thiserror::Error;

#[derive(Debug, Error, PartialEq, Eq)]
pub enum AddrError {
    #[error("empty address field")]
    Empty,
    #[error("invalid port `{0}`")]
    BadPort(String),
    #[error("unterminated bracket in `{0}`")]
    Bracket(String),
}

/// Decode an `ss` address column into an [`Endpoint`]
///
/// Accepted forms:
/// * `127.0.0.1:8080`
/// * `[::1]:443` (brackets stripped)
/// * `*:*`, `0.0.0.0:*` (wildcard port becomes 0)
/// * `10.0.0.1%eth0:68` (interface scope dropped)
/// * a bare host with no port separator (port 0)
pub fn parse_endpoint(field: &str) -> Result<Endpoint, AddrError> {
    let field = field.trim();
    if field.is_empty() {
        return Err(AddrError::Empty);
    }

    if let Some(rest) = field.strip_prefix('[') {
        let close = rest
            .find(']')
            .ok_or_else(|| AddrError::Bracket(field.to_string()))?;
        let host = &rest[..close];
        let tail = &rest[close + 1..];
        // `]%scope:port` or `]:port`
        let port = match tail.rsplit_once(':') {
            Some((_, port)) => parse_port(port)?,
            None => 0,
        };
        return Ok(Endpoint::new(strip_scope(host), port));
    }

    match field.rsplit_once(':') {
        Some((host, port)) => Ok(Endpoint::new(strip_scope(host), parse_port(port)?)),
        None => Ok(Endpoint::new(strip_scope(field), 0)),
    }
}

fn parse_port(port: &str) -> Result<u16, AddrError> {
    if port == "*" {
        return Ok(0);
    }
    port.parse::<u16>()
        .map_err(|_| AddrError::BadPort(port.to_string()))
}

fn strip_scope(host: &str) -> &str {
    match host.split_once('%') {
        Some((h, _)) => h,
        None => host,
    }
}

/// IPv4 address stored in a DWORD whose bytes are already in network order
pub fn ipv4_from_dword_bytes(bytes: [u8; 4]) -> String {
    Ipv4Addr::from(bytes).to_string()
}

/// IPv6 address from its 16 raw bytes, in standard presentation form
pub fn ipv6_from_bytes(bytes: [u8; 16]) -> String {
    Ipv6Addr::from(bytes).to_string()
}

/// Port stored in the low 16 bits of a DWORD, in network byte order
///
/// The DWORD's first two bytes in memory hold the big-endian port; the
/// upper half is garbage and ignored.
pub fn port_from_dword_bytes(bytes: [u8; 4]) -> u16 {
    u16::from_be_bytes([bytes[0], bytes[1]])
}
