// Process enrichment
// Read-only lookups of name, owner and command line for the pids a poll saw
//
// Collectors only know pids (and on Linux a short name from `ss`). This
// module fills in the rest through sysinfo. A pid that vanished between
// enumeration and lookup keeps its `?` placeholders.

use crate::net::{ProcessIdentity, UNKNOWN_FIELD};
use std::collections::HashMap;
use sysinfo::{Pid, ProcessRefreshKind, ProcessesToUpdate, System, UpdateKind, Users};
use tracing::debug;

/// Reusable sysinfo handle owned by a collector
pub struct ProcessEnricher {
    system: System,
}

impl ProcessEnricher {
    pub fn new() -> Self {
        Self {
            system: System::new(),
        }
    }

    /// Fill in identity fields for every pid in `procs`
    ///
    /// Names already reported by the collector are kept; everything else is
    /// overwritten only when the lookup succeeds.
    pub fn enrich(&mut self, procs: &mut HashMap<u32, ProcessIdentity>) {
        if procs.is_empty() {
            return;
        }

        let pids: Vec<Pid> = procs.keys().map(|pid| Pid::from_u32(*pid)).collect();
        let refresh = ProcessRefreshKind::nothing()
            .with_user(UpdateKind::Always)
            .with_cmd(UpdateKind::Always)
            .with_exe(UpdateKind::OnlyIfNotSet);
        self.system
            .refresh_processes_specifics(ProcessesToUpdate::Some(&pids), true, refresh);
        let users = Users::new_with_refreshed_list();

        let mut missing = 0usize;
        for (pid, identity) in procs.iter_mut() {
            let Some(process) = self.system.process(Pid::from_u32(*pid)) else {
                missing += 1;
                continue;
            };

            let name = process.name().to_string_lossy().into_owned();
            if needs_name(&identity.name) && !name.is_empty() {
                identity.name = name.clone();
            }

            if let Some(user) = process
                .user_id()
                .and_then(|uid| users.get_user_by_id(uid))
            {
                identity.user = user.name().to_string();
            }

            let argv: Vec<String> = process
                .cmd()
                .iter()
                .map(|arg| arg.to_string_lossy().into_owned())
                .collect();
            identity.command_line = if !argv.is_empty() {
                argv.join(" ")
            } else if let Some(exe) = process.exe() {
                exe.display().to_string()
            } else {
                name
            };
        }

        if missing > 0 {
            debug!(missing, total = procs.len(), "Some processes exited before enrichment");
        }
    }
}

impl Default for ProcessEnricher {
    fn default() -> Self {
        Self::new()
    }
}

fn needs_name(name: &str) -> bool {
    name.is_empty() || name == UNKNOWN_FIELD
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_enrich_empty_is_noop() {
        let mut enricher = ProcessEnricher::new();
        let mut procs = HashMap::new();
        enricher.enrich(&mut procs);
        assert!(procs.is_empty());
    }

    #[test]
    fn test_enrich_keeps_placeholders_for_missing_pid() {
        let mut enricher = ProcessEnricher::new();
        // pid space tops out well below this on every supported OS
        let ghost = u32::MAX - 7;
        let mut procs = HashMap::from([(ghost, ProcessIdentity::placeholder(ghost))]);
        enricher.enrich(&mut procs);
        assert_eq!(procs[&ghost], ProcessIdentity::placeholder(ghost));
    }

    #[test]
    fn test_enrich_own_process() {
        let mut enricher = ProcessEnricher::new();
        let pid = std::process::id();
        let mut procs = HashMap::from([(pid, ProcessIdentity::placeholder(pid))]);
        enricher.enrich(&mut procs);
        // Should not be empty
        assert_ne!(procs[&pid].name, UNKNOWN_FIELD);
        assert!(!procs[&pid].command_line.is_empty());
    }

    #[test]
    fn test_collector_name_is_preserved() {
        let mut enricher = ProcessEnricher::new();
        let pid = std::process::id();
        let mut procs = HashMap::from([(pid, ProcessIdentity::named(pid, "from-ss"))]);
        enricher.enrich(&mut procs);
        assert_eq!(procs[&pid].name, "from-ss");
    }
}
