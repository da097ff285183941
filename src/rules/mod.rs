// Node classification rules
//
// An ordered rule list maps a process to a node type and label. Rules are
// evaluated top to bottom and the first match wins, so when two rules could
// both match a process the one listed first decides.
//
// Pattern mini-language used by `match_name` and `match_cmd`:
//   /expr/    regular expression, case-sensitive, searched anywhere
//   /expr/i   regular expression, case-insensitive (`/I` also accepted)
//   text      plain text: exact equality for names, case-insensitive
//             substring for command lines
//
// Rule files are JSON, or YAML when the extension is `.yaml`/`.yml`. A file
// that is missing or malformed yields an empty rule list.

pub mod pattern;

pub use pattern::Pattern;

use crate::net::ProcessIdentity;
use crate::theme::DEFAULT_NODE_TYPE;
use serde::Deserialize;
use std::fs;
use std::path::{Path, PathBuf};
use thiserror::Error;
use tracing::{info, warn};

#[derive(Debug, Error)]
pub enum RuleError {
    #[error("cannot read rules file {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error("invalid JSON in rules file {path}: {source}")]
    Json {
        path: PathBuf,
        #[source]
        source: serde_json::Error,
    },
    #[error("invalid YAML in rules file {path}: {source}")]
    Yaml {
        path: PathBuf,
        #[source]
        source: serde_yaml::Error,
    },
}

fn default_node_type() -> String {
    DEFAULT_NODE_TYPE.to_string()
}

/// One classification rule; any populated matcher can satisfy it
#[derive(Debug, Clone, Deserialize)]
pub struct ClassificationRule {
    #[serde(default, alias = "match_process_id")]
    pub match_pid: Option<u32>,
    #[serde(default)]
    pub match_name: Option<Pattern>,
    #[serde(default, alias = "match_command")]
    pub match_cmd: Option<Pattern>,
    #[serde(default = "default_node_type", rename = "type", alias = "node_type")]
    pub node_type: String,
    #[serde(default)]
    pub label: Option<String>,
}

impl ClassificationRule {
    /// True when the pid, the name, or the command line matches
    pub fn matches(&self, proc: &ProcessIdentity) -> bool {
        if self.match_pid.is_some_and(|pid| pid == proc.pid) {
            return true;
        }
        if self
            .match_name
            .as_ref()
            .is_some_and(|p| p.matches_name(&proc.name))
        {
            return true;
        }
        if let Some(pattern) = &self.match_cmd {
            let haystack = format!("{} {}", proc.command_line, proc.name);
            if pattern.matches_text(&haystack) {
                return true;
            }
        }
        false
    }
}

/// Node type and label for a process
///
/// First matching rule wins. Without a match the type is `app` and the
/// label is the display name (`pid N` for a nameless process).
pub fn classify(proc: &ProcessIdentity, rules: &[ClassificationRule]) -> (String, String) {
    match rules.iter().find(|rule| rule.matches(proc)) {
        Some(rule) => {
            let label = rule
                .label
                .clone()
                .unwrap_or_else(|| proc.display_name());
            (rule.node_type.clone(), label)
        }
        None => (DEFAULT_NODE_TYPE.to_string(), proc.display_name()),
    }
}

fn is_yaml(path: &Path) -> bool {
    matches!(
        path.extension().and_then(|ext| ext.to_str()),
        Some("yaml" | "yml")
    )
}

/// Parse a rules document; `null` or an empty document means no rules
pub fn parse_rules(text: &str, path: &Path) -> Result<Vec<ClassificationRule>, RuleError> {
    if text.trim().is_empty() {
        return Ok(Vec::new());
    }
    let rules: Option<Vec<ClassificationRule>> = if is_yaml(path) {
        serde_yaml::from_str(text).map_err(|source| RuleError::Yaml {
            path: path.to_path_buf(),
            source,
        })?
    } else {
        serde_json::from_str(text).map_err(|source| RuleError::Json {
            path: path.to_path_buf(),
            source,
        })?
    };
    Ok(rules.unwrap_or_default())
}

pub fn try_load_rules(path: &Path) -> Result<Vec<ClassificationRule>, RuleError> {
    let text = fs::read_to_string(path).map_err(|source| RuleError::Io {
        path: path.to_path_buf(),
        source,
    })?;
    parse_rules(&text, path)
}

/// Load rules, falling back to an empty list with a warning
pub fn load_rules(path: Option<&Path>) -> Vec<ClassificationRule> {
    let Some(path) = path else {
        return Vec::new();
    };
    match try_load_rules(path) {
        Ok(rules) => {
            info!(path = %path.display(), rules = rules.len(), "Loaded classification rules");
            rules
        }
        Err(e) => {
            warn!(error = %e, "Using empty rule list");
            Vec::new()
        }
    }
}
