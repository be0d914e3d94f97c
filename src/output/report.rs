use serde::Serialize;
use std::collections::BTreeMap;
use tracing::trace;

use crate::helpers::Closures;
use crate::model::Location;
use crate::tree::{ApiUsage, Failure, Node, Root, Scope};

/// API usages of one test case.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct TestUsage {
    /// Enclosing group descriptions followed by the case description.
    pub path: Vec<String>,
    pub location: Location,
    pub api_usages: Vec<String>,
}

#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Serialize)]
pub struct TraversalFinding {
    pub root: String,
    pub location: Location,
    pub api_usage: String,
}

/// Result of walking the call graph from each test root.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct TraversalReport {
    pub findings: Vec<TraversalFinding>,
    pub warnings: Vec<String>,
    pub failed_roots: Vec<String>,
}

#[derive(Debug, Clone, Default, Serialize)]
pub struct Report {
    pub files_analyzed: usize,
    pub helper_count: usize,
    pub total_tests: usize,
    pub tests: Vec<TestUsage>,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub ignored: Vec<String>,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub failures: Vec<Failure>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub traversal: Option<TraversalReport>,
}

/// Turns the merged Test Tree into per-case usage lists, substituting each
/// helper call with its resolved closure.
pub struct ReportAssembler<'h> {
    closures: &'h Closures,
    inherit_group_usages: bool,
}

impl<'h> ReportAssembler<'h> {
    pub fn new(closures: &'h Closures) -> Self {
        Self {
            closures,
            inherit_group_usages: false,
        }
    }

    pub fn with_group_inheritance(mut self, inherit: bool) -> Self {
        self.inherit_group_usages = inherit;
        self
    }

    pub fn assemble(&self, tests: &Root) -> Vec<TestUsage> {
        let mut by_path: BTreeMap<Vec<String>, (Location, BTreeMap<String, ApiUsage>)> =
            BTreeMap::new();
        let mut path = Vec::new();
        self.visit(&tests.children, &mut path, &BTreeMap::new(), &mut by_path);

        by_path
            .into_iter()
            .map(|(path, (location, usages))| TestUsage {
                path,
                location,
                api_usages: usages.into_keys().collect(),
            })
            .collect()
    }

    fn visit(
        &self,
        nodes: &[Node],
        path: &mut Vec<String>,
        inherited: &BTreeMap<String, ApiUsage>,
        out: &mut BTreeMap<Vec<String>, (Location, BTreeMap<String, ApiUsage>)>,
    ) {
        for node in nodes {
            match node {
                Node::Group(scope) => {
                    let mut below = inherited.clone();
                    if self.inherit_group_usages {
                        self.leaves(&scope.children, false, &mut below);
                    }
                    path.push(scope.description.clone());
                    self.visit(&scope.children, path, &below, out);
                    path.pop();
                }
                Node::Case(scope) => {
                    path.push(scope.description.clone());
                    self.case(scope, path, inherited, out);
                    // A case nested in a case still reports on its own.
                    self.visit(&scope.children, path, inherited, out);
                    path.pop();
                }
                Node::Api { .. } | Node::Helper { .. } => {}
            }
        }
    }

    fn case(
        &self,
        scope: &Scope,
        path: &[String],
        inherited: &BTreeMap<String, ApiUsage>,
        out: &mut BTreeMap<Vec<String>, (Location, BTreeMap<String, ApiUsage>)>,
    ) {
        let mut usages = inherited.clone();
        self.leaves(&scope.children, true, &mut usages);
        let (_, existing) = out
            .entry(path.to_vec())
            .or_insert_with(|| (scope.location.clone(), BTreeMap::new()));
        existing.extend(usages);
    }

    /// API leaves of `nodes`, with helper calls expanded. Nested scopes are
    /// only entered when `descend` is set.
    fn leaves(&self, nodes: &[Node], descend: bool, into: &mut BTreeMap<String, ApiUsage>) {
        for node in nodes {
            match node {
                Node::Api { usage } => {
                    into.insert(usage.key(), usage.clone());
                }
                Node::Helper { identity } => match self.closures.get(&identity.hash_key()) {
                    Some(resolved) => {
                        into.extend(resolved.usages.iter().map(|u| (u.key(), u.clone())));
                    }
                    None => trace!(helper = %identity, "no closure for helper"),
                },
                Node::Group(scope) | Node::Case(scope) if descend => {
                    self.leaves(&scope.children, true, into)
                }
                Node::Group(_) | Node::Case(_) => {}
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::engine::LocatorTriple;
    use crate::helpers::ResolvedHelper;
    use crate::model::FunctionIdentity;
    use pretty_assertions::assert_eq;

    fn call(name: &str) -> ApiUsage {
        ApiUsage::Call(FunctionIdentity::function("k8s.io/client-go/dynamic", name))
    }

    fn scope(ctor: &str, desc: &str, line: usize, children: Vec<Node>) -> Scope {
        let mut scope = Scope::new(ctor, desc, Location::new("e2e.go", line));
        scope.children = children;
        scope
    }

    fn closures() -> Closures {
        let helper = FunctionIdentity::function("example.com/e2e/util", "Wait");
        Closures::from([(
            helper.hash_key(),
            ResolvedHelper {
                identity: helper,
                usages: vec![
                    ApiUsage::Resource(LocatorTriple::new("config.openshift.io", "v1", "clusteroperators")),
                    call("Watch"),
                ],
            },
        )])
    }

    fn tree() -> Root {
        let wait = Node::helper(FunctionIdentity::function("example.com/e2e/util", "Wait"));
        let mut root = Root::new();
        root.push(Node::Group(scope(
            "Describe",
            "operators",
            1,
            vec![
                Node::api(call("NewForConfigOrDie")),
                Node::Case(scope("It", "lists", 3, vec![Node::api(call("List")), wait])),
                Node::Group(scope(
                    "Context",
                    "degraded",
                    6,
                    vec![Node::Case(scope("It", "reports", 7, vec![Node::api(call("Get"))]))],
                )),
                Node::Case(scope("It", "lists", 10, vec![Node::api(call("Delete"))])),
            ],
        )));
        root
    }

    #[test]
    fn test_assemble_paths_and_helper_substitution() {
        let closures = closures();
        let tests = ReportAssembler::new(&closures).assemble(&tree());

        assert_eq!(
            tests,
            vec![
                TestUsage {
                    path: vec!["operators".into(), "degraded".into(), "reports".into()],
                    location: Location::new("e2e.go", 7),
                    api_usages: vec!["k8s.io/client-go/dynamic##Get".into()],
                },
                TestUsage {
                    path: vec!["operators".into(), "lists".into()],
                    location: Location::new("e2e.go", 3),
                    api_usages: vec![
                        "config.openshift.io/v1/clusteroperators".into(),
                        "k8s.io/client-go/dynamic##Delete".into(),
                        "k8s.io/client-go/dynamic##List".into(),
                        "k8s.io/client-go/dynamic##Watch".into(),
                    ],
                },
            ]
        );
    }

    #[test]
    fn test_group_inheritance() {
        let closures = closures();
        let tests = ReportAssembler::new(&closures)
            .with_group_inheritance(true)
            .assemble(&tree());

        let reports = tests
            .iter()
            .find(|t| t.path.last().map(String::as_str) == Some("reports"))
            .unwrap();
        assert_eq!(
            reports.api_usages,
            vec![
                "k8s.io/client-go/dynamic##Get".to_string(),
                "k8s.io/client-go/dynamic##NewForConfigOrDie".to_string(),
            ]
        );
    }

    #[test]
    fn test_group_without_cases_reports_nothing() {
        let mut root = Root::new();
        root.push(Node::Group(scope("Describe", "empty", 1, vec![Node::api(call("Get"))])));
        let closures = Closures::new();
        assert!(ReportAssembler::new(&closures).assemble(&root).is_empty());
    }
}
