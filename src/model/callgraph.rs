//! Whole-program call graph built from syntax.
//!
//! Nodes are corpus functions and the function literals passed as bodies to
//! test-framework scope calls. Any other function literal is folded into the
//! function that contains it.

use super::{syntax, FunctionIdentity, Located, Location, SourceFile, TypeOracle};
use rayon::prelude::*;
use serde::Serialize;
use std::collections::BTreeMap;
use std::fmt;
use tracing::debug;

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum SiteKind {
    Normal,
    Deferred,
}

#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize)]
#[serde(tag = "kind", rename_all = "lowercase")]
pub enum GraphNode {
    Function(FunctionIdentity),
    /// Function literal body of a scope call, keyed by where it starts.
    Closure(Location),
}

impl fmt::Display for GraphNode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            GraphNode::Function(id) => write!(f, "{id}"),
            GraphNode::Closure(loc) => write!(f, "func literal at {loc}"),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CallEdge {
    pub callee: FunctionIdentity,
    pub site: SiteKind,
    pub location: Location,
    /// Function literal or named function passed as a scope body.
    pub body: Option<GraphNode>,
    /// Identities recorded at the call site, such as resolved locators.
    pub annotations: Vec<String>,
}

impl CallEdge {
    pub fn new(callee: FunctionIdentity, site: SiteKind, location: Location) -> Self {
        Self {
            callee,
            site,
            location,
            body: None,
            annotations: Vec::new(),
        }
    }

    pub fn with_body(mut self, body: GraphNode) -> Self {
        self.body = Some(body);
        self
    }

    pub fn with_annotations(mut self, annotations: Vec<String>) -> Self {
        self.annotations = annotations;
        self
    }
}

/// A package-level `var _ = <group>(...)` declaration.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TestRoot {
    pub description: String,
    pub location: Location,
    pub entry: GraphNode,
}

/// Call-site knowledge supplied by the classifier.
pub trait CallSiteHooks<'a> {
    /// Whether the callee opens a test-framework group or case.
    fn is_scope_call(&self, callee: &FunctionIdentity) -> bool;

    /// Whether the callee may start a test root.
    fn is_root_call(&self, callee: &FunctionIdentity) -> bool;

    fn describe(&self, call: Located<'a>) -> String;

    fn annotations(&self, call: Located<'a>, callee: &FunctionIdentity) -> Vec<String>;
}

#[derive(Debug, Default)]
pub struct CallGraph {
    edges: BTreeMap<GraphNode, Vec<CallEdge>>,
    roots: Vec<TestRoot>,
}

impl CallGraph {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn build<'a, H>(oracle: &TypeOracle<'a>, hooks: &H) -> Self
    where
        H: CallSiteHooks<'a> + Sync,
    {
        let corpus = oracle.corpus();
        let fragments: Vec<FileGraph> = corpus
            .files()
            .par_iter()
            .map(|file| FileGraph::build(oracle, hooks, file))
            .collect();

        let mut graph = Self::new();
        for fragment in fragments {
            for (node, edges) in fragment.edges {
                graph.edges.entry(node).or_default().extend(edges);
            }
            graph.roots.extend(fragment.roots);
        }
        graph.roots.sort_by(|a, b| a.location.cmp(&b.location));

        debug!(
            nodes = graph.node_count(),
            edges = graph.edge_count(),
            roots = graph.roots.len(),
            "call graph built"
        );
        graph
    }

    pub fn add_node(&mut self, node: GraphNode) {
        self.edges.entry(node).or_default();
    }

    pub fn add_edge(&mut self, from: GraphNode, edge: CallEdge) {
        self.edges.entry(from).or_default().push(edge);
    }

    pub fn add_root(&mut self, root: TestRoot) {
        self.roots.push(root);
    }

    pub fn edges(&self, node: &GraphNode) -> Option<&[CallEdge]> {
        self.edges.get(node).map(Vec::as_slice)
    }

    pub fn contains(&self, node: &GraphNode) -> bool {
        self.edges.contains_key(node)
    }

    /// The graph node of a corpus function, when the graph has one.
    pub fn node_of(&self, function: &FunctionIdentity) -> Option<&GraphNode> {
        self.edges
            .get_key_value(&GraphNode::Function(function.clone()))
            .map(|(node, _)| node)
    }

    pub fn roots(&self) -> &[TestRoot] {
        &self.roots
    }

    pub fn node_count(&self) -> usize {
        self.edges.len()
    }

    pub fn edge_count(&self) -> usize {
        self.edges.values().map(Vec::len).sum()
    }
}

#[derive(Default)]
struct FileGraph {
    edges: Vec<(GraphNode, Vec<CallEdge>)>,
    roots: Vec<TestRoot>,
}

impl FileGraph {
    fn build<'a, H: CallSiteHooks<'a>>(
        oracle: &TypeOracle<'a>,
        hooks: &H,
        file: &'a SourceFile,
    ) -> Self {
        let corpus = oracle.corpus();
        let module = corpus.import_path_of(file);
        let mut builder = Builder {
            oracle,
            hooks,
            out: FileGraph::default(),
        };

        for decl in file.root().named_children() {
            match decl.kind() {
                "function_declaration" | "method_declaration" => {
                    let Some(name) = decl.child("name") else {
                        continue;
                    };
                    let receiver = if decl.kind() == "method_declaration" {
                        match syntax::receiver_type_name(decl.node, &file.source) {
                            Some(r) => r,
                            None => continue,
                        }
                    } else {
                        ""
                    };
                    let node =
                        GraphNode::Function(FunctionIdentity::new(module, receiver, name.text()));
                    let mut edges = Vec::new();
                    if let Some(body) = decl.child("body") {
                        builder.walk(body, SiteKind::Normal, &mut edges);
                    }
                    builder.out.edges.push((node, edges));
                }
                "var_declaration" => builder.package_var(decl),
                _ => {}
            }
        }
        builder.out
    }
}

struct Builder<'o, 'a, H> {
    oracle: &'o TypeOracle<'a>,
    hooks: &'o H,
    out: FileGraph,
}

impl<'a, H: CallSiteHooks<'a>> Builder<'_, 'a, H> {
    fn package_var(&mut self, decl: Located<'a>) {
        for spec in super::value_specs(decl.node) {
            let spec = decl.with(spec);
            let Some(value) = spec.child("value") else {
                continue;
            };
            for item in syntax::expression_items(value.node) {
                let call = spec.with(item);
                if call.kind() != "call_expression" {
                    continue;
                }
                let Some(callee) = self.oracle.callee(call) else {
                    continue;
                };
                if !self.hooks.is_root_call(&callee) {
                    continue;
                }
                let entry = self.scope_body(call);
                self.out.roots.push(TestRoot {
                    description: self.hooks.describe(call),
                    location: call.location(),
                    entry,
                });
            }
        }
    }

    /// Graph node for the body argument of a scope call, building closure
    /// nodes as they are found.
    fn scope_body(&mut self, call: Located<'a>) -> GraphNode {
        let args: Vec<Located<'a>> = syntax::call_arguments(call.node)
            .into_iter()
            .map(|n| call.with(n))
            .collect();

        if let Some(literal) = args.iter().rev().find(|a| a.kind() == "func_literal") {
            let node = GraphNode::Closure(literal.location());
            let mut edges = Vec::new();
            if let Some(body) = literal.child("body") {
                self.walk(body, SiteKind::Normal, &mut edges);
            }
            self.out.edges.push((node.clone(), edges));
            return node;
        }

        if let Some(named) = args.last().and_then(|a| self.function_reference(*a)) {
            return GraphNode::Function(named);
        }
        GraphNode::Closure(call.location())
    }

    fn function_reference(&self, expr: Located<'a>) -> Option<FunctionIdentity> {
        let corpus = self.oracle.corpus();
        match expr.kind() {
            "identifier" => {
                let own = corpus.import_path_of(expr.file);
                corpus
                    .find_function(own, expr.text())
                    .map(|_| FunctionIdentity::function(own, expr.text()))
            }
            "selector_expression" => {
                let path = self.oracle.package_alias(expr.child("operand")?)?;
                let name = expr.child("field")?.text();
                Some(FunctionIdentity::function(path, name))
            }
            _ => None,
        }
    }

    fn walk(&mut self, node: Located<'a>, site: SiteKind, edges: &mut Vec<CallEdge>) {
        match node.kind() {
            "defer_statement" => {
                for child in node.named_children() {
                    self.walk(child, SiteKind::Deferred, edges);
                }
            }
            "call_expression" => self.call(node, site, edges),
            _ => {
                for child in node.named_children() {
                    self.walk(child, site, edges);
                }
            }
        }
    }

    fn call(&mut self, call: Located<'a>, site: SiteKind, edges: &mut Vec<CallEdge>) {
        let Some(callee) = self.oracle.callee(call) else {
            for child in call.named_children() {
                self.walk(child, site, edges);
            }
            return;
        };

        if self.hooks.is_scope_call(&callee) {
            let body = self.scope_body(call);
            edges.push(CallEdge::new(callee, site, call.location()).with_body(body));
            return;
        }

        let annotations = self.hooks.annotations(call, &callee);
        edges.push(CallEdge::new(callee, site, call.location()).with_annotations(annotations));
        for child in call.named_children() {
            self.walk(child, site, edges);
        }
    }
}
