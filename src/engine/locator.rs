use serde::{Deserialize, Serialize};
use std::fmt;

/// Concrete value of the tracked three-field locator type.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct LocatorTriple {
    pub domain: String,
    pub version: String,
    pub kind: String,
}

impl LocatorTriple {
    pub fn new(
        domain: impl Into<String>,
        version: impl Into<String>,
        kind: impl Into<String>,
    ) -> Self {
        Self {
            domain: domain.into(),
            version: version.into(),
            kind: kind.into(),
        }
    }

    /// Whether the domain ends with one of `suffixes`. The empty domain only
    /// matches an empty suffix.
    pub fn domain_matches(&self, suffixes: &[String]) -> bool {
        suffixes.iter().any(|s| {
            if s.is_empty() {
                self.domain.is_empty()
            } else {
                let suffix = format!(".{}", s.trim_start_matches('.'));
                self.domain == *s || self.domain.ends_with(&suffix)
            }
        })
    }
}

impl fmt::Display for LocatorTriple {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}/{}/{}", self.domain, self.version, self.kind)
    }
}

/// Describes the tracked type: where it is declared and its field names in
/// positional order (domain, version, kind).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LocatorType {
    pub module: String,
    pub type_name: String,
    pub fields: [String; 3],
}

impl Default for LocatorType {
    fn default() -> Self {
        Self {
            module: "k8s.io/apimachinery/pkg/runtime/schema".to_string(),
            type_name: "GroupVersionResource".to_string(),
            fields: [
                "Group".to_string(),
                "Version".to_string(),
                "Resource".to_string(),
            ],
        }
    }
}

impl LocatorType {
    pub fn field_position(&self, name: &str) -> Option<usize> {
        self.fields.iter().position(|f| f == name)
    }
}
