//! Test and helper trees built from call expressions.
//!
//! A file yields one Test Tree (framework groups and cases with the API
//! usages and helper calls found in their bodies) and a list of helper
//! records, one per function declaration.

pub mod builder;
pub mod classifier;

pub use builder::{FileTrees, TreeBuilder};
pub use classifier::{CallKind, CallSites, Classifier};

use crate::engine::LocatorTriple;
use crate::error::ResolveError;
use crate::model::{FunctionIdentity, Location};
use serde::Serialize;
use std::fmt;

/// Identity of one API usage leaf.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize)]
#[serde(untagged)]
pub enum ApiUsage {
    Call(FunctionIdentity),
    /// Generic-resource access whose target was resolved from its locator.
    Resource(LocatorTriple),
}

impl ApiUsage {
    pub fn key(&self) -> String {
        match self {
            ApiUsage::Call(id) => id.hash_key(),
            ApiUsage::Resource(triple) => triple.to_string(),
        }
    }
}

impl fmt::Display for ApiUsage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ApiUsage::Call(id) => write!(f, "API {id}"),
            ApiUsage::Resource(triple) => write!(f, "API resource {triple}"),
        }
    }
}

/// A group or case declared through the test framework.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Scope {
    /// Framework function that opened the scope, e.g. `Describe`.
    pub constructor: String,
    pub description: String,
    pub location: Location,
    pub children: Vec<Node>,
}

impl Scope {
    pub fn new(
        constructor: impl Into<String>,
        description: impl Into<String>,
        location: Location,
    ) -> Self {
        Self {
            constructor: constructor.into(),
            description: description.into(),
            location,
            children: Vec::new(),
        }
    }
}

/// Test Tree node. API leaves carry no children.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "node", rename_all = "lowercase")]
pub enum Node {
    Group(Scope),
    Case(Scope),
    Api { usage: ApiUsage },
    Helper { identity: FunctionIdentity },
}

impl Node {
    pub fn api(usage: ApiUsage) -> Self {
        Node::Api { usage }
    }

    pub fn helper(identity: FunctionIdentity) -> Self {
        Node::Helper { identity }
    }

    pub fn scope(&self) -> Option<&Scope> {
        match self {
            Node::Group(scope) | Node::Case(scope) => Some(scope),
            _ => None,
        }
    }

    pub fn children(&self) -> &[Node] {
        self.scope().map(|s| s.children.as_slice()).unwrap_or(&[])
    }
}

/// Synthetic container at the top of a Test Tree.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct Root {
    pub children: Vec<Node>,
}

impl Root {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn push(&mut self, node: Node) {
        self.children.push(node);
    }

    /// Appends the children of another root.
    pub fn append(&mut self, other: Root) {
        self.children.extend(other.children);
    }

    pub fn is_empty(&self) -> bool {
        self.children.is_empty()
    }

    pub fn case_count(&self) -> usize {
        fn count(nodes: &[Node]) -> usize {
            nodes
                .iter()
                .map(|n| match n {
                    Node::Case(scope) => 1 + count(&scope.children),
                    Node::Group(scope) => count(&scope.children),
                    _ => 0,
                })
                .sum()
        }
        count(&self.children)
    }
}

#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize)]
#[serde(tag = "child", rename_all = "lowercase")]
pub enum HelperChild {
    Api { usage: ApiUsage },
    Helper { identity: FunctionIdentity },
}

impl HelperChild {
    pub fn api(usage: ApiUsage) -> Self {
        HelperChild::Api { usage }
    }

    pub fn helper(identity: FunctionIdentity) -> Self {
        HelperChild::Helper { identity }
    }

    pub fn is_helper(&self) -> bool {
        matches!(self, HelperChild::Helper { .. })
    }
}

/// Working record of one helper function: its API leaves and the helpers
/// it calls, until the closure pass substitutes them away.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct HelperRecord {
    pub identity: FunctionIdentity,
    pub location: Location,
    pub children: Vec<HelperChild>,
    /// Build constraint of the declaring file, if any.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub build_constraint: Option<String>,
}

impl HelperRecord {
    pub fn new(identity: FunctionIdentity, location: Location) -> Self {
        Self {
            identity,
            location,
            children: Vec::new(),
            build_constraint: None,
        }
    }

    pub fn with_children(mut self, children: Vec<HelperChild>) -> Self {
        self.children = children;
        self
    }

    pub fn with_build_constraint(mut self, constraint: Option<String>) -> Self {
        self.build_constraint = constraint;
        self
    }

    /// Whether both records come from files built under different
    /// constraints, so at most one of them is compiled at a time.
    pub fn is_build_variant_of(&self, other: &HelperRecord) -> bool {
        match (&self.build_constraint, &other.build_constraint) {
            (Some(a), Some(b)) => a != b,
            _ => false,
        }
    }
}

/// A resolution attempt that failed; only the leaf that needed it is lost.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Serialize)]
pub struct Failure {
    pub location: Location,
    pub message: String,
}

impl From<&ResolveError> for Failure {
    fn from(err: &ResolveError) -> Self {
        Self {
            location: err.location().clone(),
            message: err.to_string(),
        }
    }
}
