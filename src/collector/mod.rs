// Platform collectors
//
// One implementation per OS family, picked once at startup. Every variant
// turns platform failures into an empty observation so the poll loop never
// dies on a missing tool or a permission error.

pub mod generic;
pub mod linux;
pub mod listeners;
pub mod windows;

pub use listeners::{build_listeners, ListenerIndex};

use crate::net::{ConnectionRecord, ProcessIdentity};
use std::collections::HashMap;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum CollectError {
    #[error("failed to run `{command}`: {source}")]
    Spawn {
        command: String,
        #[source]
        source: std::io::Error,
    },
    #[error("`{command}` exited with {status}")]
    Exit { command: String, status: String },
    #[error("socket table query failed: {0}")]
    SocketTable(String),
    #[error("socket table truncated: need {needed} bytes, have {available}")]
    Truncated { needed: usize, available: usize },
    #[error("collector not supported on this platform")]
    Unsupported,
}

/// Raw output of a single poll
#[derive(Debug, Clone, Default)]
pub struct Observation {
    pub procs: HashMap<u32, ProcessIdentity>,
    pub conns: Vec<ConnectionRecord>,
}

impl Observation {
    pub fn is_empty(&self) -> bool {
        self.procs.is_empty() && self.conns.is_empty()
    }

    /// Register the owner of a record, keeping the first name seen
    pub fn push(&mut self, record: ConnectionRecord, name: Option<&str>) {
        let pid = record.pid;
        self.procs.entry(pid).or_insert_with(|| match name {
            Some(name) => ProcessIdentity::named(pid, name),
            None => ProcessIdentity::placeholder(pid),
        });
        self.conns.push(record);
    }
}

/// A source of socket observations for one platform
pub trait Collector: Send {
    /// Short name for logs
    fn name(&self) -> &'static str;

    /// Enumerate processes and their non-listening sockets
    ///
    /// Never fails: platform errors produce an empty observation.
    fn collect(&mut self) -> Observation;
}

/// Pick the collector for the running OS
pub fn platform_collector(include_udp: bool) -> Box<dyn Collector> {
    if cfg!(target_os = "linux") {
        Box::new(linux::SsCollector::new(include_udp))
    } else if cfg!(windows) {
        Box::new(windows::TcpTableCollector::new(include_udp))
    } else {
        Box::new(generic::NetstatCollector::new(include_udp))
    }
}
