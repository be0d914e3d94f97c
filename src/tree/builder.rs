//! Per-file construction of the Test Tree and the helper records.

use super::{CallKind, Classifier, Failure, HelperChild, HelperRecord, Node, Root, Scope};
use crate::model::{syntax, FunctionIdentity, Located, SourceFile, TypeOracle};
use serde::Serialize;
use tracing::{debug, trace};

/// Everything one source file contributes to the analysis.
#[derive(Debug, Clone, Default, Serialize)]
pub struct FileTrees {
    pub file: String,
    pub tests: Root,
    pub helpers: Vec<HelperRecord>,
    pub ignored: Vec<String>,
    pub failures: Vec<Failure>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Mode {
    Tests,
    /// Scope calls do not open nodes; their bodies belong to the helper.
    Helpers,
}

pub struct TreeBuilder<'c, 'a> {
    classifier: &'c Classifier,
    oracle: &'c TypeOracle<'a>,
    collect_ignored: bool,
}

impl<'c, 'a> TreeBuilder<'c, 'a> {
    pub fn new(classifier: &'c Classifier, oracle: &'c TypeOracle<'a>) -> Self {
        Self {
            classifier,
            oracle,
            collect_ignored: true,
        }
    }

    pub fn with_ignored(mut self, collect: bool) -> Self {
        self.collect_ignored = collect;
        self
    }

    pub fn build(&self, file: &'a SourceFile) -> FileTrees {
        let module = self.oracle.corpus().import_path_of(file);
        let mut out = FileTrees {
            file: file.path.clone(),
            ..FileTrees::default()
        };

        for decl in file.root().named_children() {
            match decl.kind() {
                "function_declaration" | "method_declaration" => {
                    let Some(identity) = declared_identity(module, decl) else {
                        continue;
                    };
                    if !identity.is_method() && is_uncallable(&identity.function) {
                        trace!(function = %identity, "skipping uncallable declaration");
                        continue;
                    }
                    trace!(helper = %identity, "building helper record");
                    let mut nodes = Vec::new();
                    if let Some(body) = decl.child("body") {
                        self.walk(body, Mode::Helpers, false, &mut nodes, &mut out);
                    }
                    let children = nodes.into_iter().filter_map(helper_child).collect();
                    let record = HelperRecord::new(identity, decl.location())
                        .with_children(children)
                        .with_build_constraint(file.build_constraint.clone());
                    out.helpers.push(record);
                }
                "var_declaration" => {
                    let mut nodes = Vec::new();
                    self.walk(decl, Mode::Tests, false, &mut nodes, &mut out);
                    out.tests.children.extend(nodes);
                }
                _ => {}
            }
        }

        debug!(
            file = %out.file,
            cases = out.tests.case_count(),
            helpers = out.helpers.len(),
            failures = out.failures.len(),
            "file trees built"
        );
        out
    }

    fn walk(
        &self,
        node: Located<'a>,
        mode: Mode,
        deferred: bool,
        cursor: &mut Vec<Node>,
        out: &mut FileTrees,
    ) {
        match node.kind() {
            "defer_statement" => {
                for child in node.named_children() {
                    self.walk(child, mode, true, cursor, out);
                }
            }
            "call_expression" => self.call(node, mode, deferred, cursor, out),
            _ => {
                for child in node.named_children() {
                    self.walk(child, mode, deferred, cursor, out);
                }
            }
        }
    }

    fn call(
        &self,
        call: Located<'a>,
        mode: Mode,
        deferred: bool,
        cursor: &mut Vec<Node>,
        out: &mut FileTrees,
    ) {
        let Some(callee) = self.oracle.callee(call) else {
            if self.collect_ignored {
                if let Some(function) = call.child("function") {
                    out.ignored.push(function.snippet());
                }
            }
            self.walk_children(call, mode, deferred, cursor, out);
            return;
        };
        if deferred && self.classifier.is_recover(&callee) {
            return;
        }

        let kind = self.classifier.classify(&callee);
        match kind {
            CallKind::Group | CallKind::Case if mode == Mode::Tests => {
                let mut scope = Scope::new(
                    callee.function.as_str(),
                    self.classifier.describe(self.oracle, call),
                    call.location(),
                );
                self.walk_children(call, mode, false, &mut scope.children, out);
                cursor.push(if kind == CallKind::Group {
                    Node::Group(scope)
                } else {
                    Node::Case(scope)
                });
                return;
            }
            CallKind::Group | CallKind::Case => {}
            CallKind::Api | CallKind::ResourceAccess => {
                match self.classifier.api_usages(self.oracle, call, &callee, kind) {
                    Ok(usages) => cursor.extend(usages.into_iter().map(Node::api)),
                    Err(err) => {
                        debug!(error = %err, "api usage dropped");
                        out.failures.push(Failure::from(&err));
                    }
                }
            }
            CallKind::Helper => cursor.push(Node::helper(callee)),
            CallKind::Ignored => {
                if self.collect_ignored {
                    out.ignored.push(callee.hash_key());
                }
            }
        }
        self.walk_children(call, mode, deferred, cursor, out);
    }

    fn walk_children(
        &self,
        node: Located<'a>,
        mode: Mode,
        deferred: bool,
        cursor: &mut Vec<Node>,
        out: &mut FileTrees,
    ) {
        for child in node.named_children() {
            self.walk(child, mode, deferred, cursor, out);
        }
    }
}

fn declared_identity(module: &str, decl: Located<'_>) -> Option<FunctionIdentity> {
    let name = decl.child("name")?.text();
    let receiver = if decl.kind() == "method_declaration" {
        syntax::receiver_type_name(decl.node, &decl.file.source)?
    } else {
        ""
    };
    Some(FunctionIdentity::new(module, receiver, name))
}

/// `init` and blank functions may be declared many times per package and
/// can never be called by name.
fn is_uncallable(name: &str) -> bool {
    matches!(name, "init" | "_")
}

fn helper_child(node: Node) -> Option<HelperChild> {
    match node {
        Node::Api { usage } => Some(HelperChild::api(usage)),
        Node::Helper { identity } => Some(HelperChild::helper(identity)),
        Node::Group(_) | Node::Case(_) => None,
    }
}
