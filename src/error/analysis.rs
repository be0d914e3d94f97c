use thiserror::Error;

use crate::model::Location;

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum AnalysisError {
    #[error("helper calls unresolved after {passes} passes: {}", .unresolved.join(", "))]
    UnresolvedHelperAfterMaxPasses {
        passes: usize,
        unresolved: Vec<String>,
    },

    #[error("helper identity '{identity}' declared twice: {first} and {second}")]
    HelperCollision {
        identity: String,
        first: Location,
        second: Location,
    },
}

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum TraversalError {
    #[error("test root '{root}' at {location} is missing from the call graph")]
    CallGraphEntryMissing { root: String, location: Location },

    #[error("call chain from '{root}' truncated at depth {depth} (entering {callee})")]
    RecursionDepthExceeded {
        root: String,
        depth: usize,
        callee: String,
    },
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_unresolved_helper_display() {
        let err = AnalysisError::UnresolvedHelperAfterMaxPasses {
            passes: 10,
            unresolved: vec!["a#b#c".to_string(), "d##e".to_string()],
        };
        assert_eq!(
            err.to_string(),
            "helper calls unresolved after 10 passes: a#b#c, d##e"
        );
    }

    #[test]
    fn test_call_graph_entry_missing_display() {
        let err = TraversalError::CallGraphEntryMissing {
            root: "Describe(apps)".to_string(),
            location: Location::new("apps.go", 7),
        };
        assert_eq!(
            err.to_string(),
            "test root 'Describe(apps)' at apps.go:7 is missing from the call graph"
        );
    }
}
