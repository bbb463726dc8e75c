//! The two configuration switches the graph layer consumes.

use std::path::Path;

use git_commitgraph::CommitGraph;

/// Parse a git-style boolean config value.
///
/// Recognizes `true`/`yes`/`on`, `false`/`no`/`off` (case-insensitive), the
/// empty string (false), and integers (zero = false). Returns `None` for
/// anything else.
pub fn parse_bool(value: &str) -> Option<bool> {
    let v = value.trim();
    if v.is_empty() {
        return Some(false);
    }
    match v.to_ascii_lowercase().as_str() {
        "true" | "yes" | "on" => Some(true),
        "false" | "no" | "off" => Some(false),
        other => other.parse::<i64>().ok().map(|n| n != 0),
    }
}

/// Graph-related switches, both on by default.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct GraphSettings {
    /// Consult the commit-graph when reading commits.
    pub read_graph: bool,
    /// Regenerate the commit-graph during GC.
    pub write_graph: bool,
}

impl Default for GraphSettings {
    fn default() -> Self {
        Self {
            read_graph: true,
            write_graph: true,
        }
    }
}

impl GraphSettings {
    /// Build settings from raw config values; unset or unrecognized values
    /// keep the defaults.
    pub fn from_config(read_graph: Option<&str>, write_graph: Option<&str>) -> Self {
        let defaults = Self::default();
        Self {
            read_graph: read_graph
                .and_then(parse_bool)
                .unwrap_or(defaults.read_graph),
            write_graph: write_graph
                .and_then(parse_bool)
                .unwrap_or(defaults.write_graph),
        }
    }
}

/// Open the commit-graph of an objects directory, honoring the read switch.
///
/// Returns `None` when the switch is off, the file does not exist, or the
/// file fails validation. Callers treat all three the same way: the graph
/// is unavailable and traversal parses raw objects.
pub fn open_graph(objects_dir: impl AsRef<Path>, settings: &GraphSettings) -> Option<CommitGraph> {
    if !settings.read_graph {
        return None;
    }
    let path = git_commitgraph::graph_file_path(objects_dir);
    CommitGraph::open(path).ok()
}
