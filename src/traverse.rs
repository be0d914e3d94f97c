//! Test roots to API usages, straight over the call graph.
//!
//! Each root is walked on its own rayon task. Findings from all tasks land in
//! one mutex-guarded set. Call cycles are cut where they close. A chain
//! deeper than the configured cap is cut off and reported once per node as a
//! warning; a root missing from the graph fails alone.

use crate::error::TraversalError;
use crate::model::{CallEdge, CallGraph, GraphNode, SiteKind, TestRoot};
use crate::output::{TraversalFinding, TraversalReport};
use crate::tree::{CallKind, Classifier};
use rayon::prelude::*;
use std::collections::{BTreeSet, HashMap, HashSet};
use std::sync::{Mutex, PoisonError};
use tracing::{debug, trace, warn};

pub struct CallGraphTraversal<'c> {
    classifier: &'c Classifier,
    max_depth: usize,
}

struct RootWalk<'g> {
    root: &'g TestRoot,
    usages: BTreeSet<String>,
    /// Nodes whose whole subtree has been walked without truncation.
    complete: HashSet<&'g GraphNode>,
    /// Nodes on the current DFS path.
    on_path: HashSet<&'g GraphNode>,
    /// Shallowest depth at which a node was walked without finishing.
    partial: HashMap<&'g GraphNode, usize>,
    /// Nodes already cut off by the depth cap.
    truncated: HashSet<&'g GraphNode>,
    warnings: Vec<TraversalError>,
}

impl<'c> CallGraphTraversal<'c> {
    pub fn new(classifier: &'c Classifier, max_depth: usize) -> Self {
        Self {
            classifier,
            max_depth,
        }
    }

    pub fn run(&self, graph: &CallGraph) -> TraversalReport {
        let findings = Mutex::new(BTreeSet::new());
        let warnings = Mutex::new(Vec::new());
        let failed = Mutex::new(Vec::new());

        graph.roots().par_iter().for_each(|root| {
            if !graph.contains(&root.entry) {
                let err = TraversalError::CallGraphEntryMissing {
                    root: root.description.clone(),
                    location: root.location.clone(),
                };
                warn!(error = %err, "test root skipped");
                failed
                    .lock()
                    .unwrap_or_else(PoisonError::into_inner)
                    .push(err.to_string());
                return;
            }

            let mut walk = RootWalk {
                root,
                usages: BTreeSet::new(),
                complete: HashSet::new(),
                on_path: HashSet::new(),
                partial: HashMap::new(),
                truncated: HashSet::new(),
                warnings: Vec::new(),
            };
            self.visit(graph, &root.entry, 0, &mut walk);
            trace!(root = %root.description, usages = walk.usages.len(), "root walked");

            findings
                .lock()
                .unwrap_or_else(PoisonError::into_inner)
                .extend(walk.usages.into_iter().map(|api_usage| TraversalFinding {
                    root: root.description.clone(),
                    location: root.location.clone(),
                    api_usage,
                }));
            if !walk.warnings.is_empty() {
                warnings
                    .lock()
                    .unwrap_or_else(PoisonError::into_inner)
                    .extend(walk.warnings.iter().map(ToString::to_string));
            }
        });

        let mut report = TraversalReport {
            findings: findings
                .into_inner()
                .unwrap_or_else(PoisonError::into_inner)
                .into_iter()
                .collect(),
            warnings: warnings.into_inner().unwrap_or_else(PoisonError::into_inner),
            failed_roots: failed.into_inner().unwrap_or_else(PoisonError::into_inner),
        };
        report.warnings.sort();
        report.failed_roots.sort();

        debug!(
            roots = graph.roots().len(),
            findings = report.findings.len(),
            truncated = report.warnings.len(),
            failed = report.failed_roots.len(),
            "call graph traversal done"
        );
        report
    }

    /// Returns whether the subtree under `node` was walked in full.
    ///
    /// Re-entering a node already on the path closes a cycle: everything it
    /// reaches is collected by the frame that first entered it, so the cycle
    /// edge is cut without a warning.
    fn visit<'g>(
        &self,
        graph: &'g CallGraph,
        node: &'g GraphNode,
        depth: usize,
        walk: &mut RootWalk<'g>,
    ) -> bool {
        if walk.complete.contains(node) {
            return true;
        }
        if walk.on_path.contains(node) {
            trace!(root = %walk.root.description, node = %node, "call cycle cut");
            return true;
        }
        if walk.partial.get(node).is_some_and(|&seen| seen <= depth) {
            return false;
        }
        if depth >= self.max_depth {
            if walk.truncated.insert(node) {
                let err = TraversalError::RecursionDepthExceeded {
                    root: walk.root.description.clone(),
                    depth,
                    callee: node.to_string(),
                };
                warn!(error = %err, "call chain truncated");
                walk.warnings.push(err);
            }
            return false;
        }
        let Some(edges) = graph.edges(node) else {
            return true;
        };

        walk.on_path.insert(node);
        let mut whole = true;
        for edge in edges {
            if let Some(next) = self.follow(graph, edge, walk) {
                whole &= self.visit(graph, next, depth + 1, walk);
            }
        }
        walk.on_path.remove(node);
        if whole {
            walk.complete.insert(node);
        } else {
            walk.partial.insert(node, depth);
        }
        whole
    }

    /// Records the usages of one edge and returns the node to descend into.
    fn follow<'g>(
        &self,
        graph: &'g CallGraph,
        edge: &'g CallEdge,
        walk: &mut RootWalk<'g>,
    ) -> Option<&'g GraphNode> {
        if edge.site == SiteKind::Deferred && self.classifier.is_recover(&edge.callee) {
            return None;
        }
        match self.classifier.classify(&edge.callee) {
            CallKind::Group | CallKind::Case => {
                edge.body.as_ref().filter(|body| graph.contains(body))
            }
            CallKind::ResourceAccess => {
                walk.usages.extend(edge.annotations.iter().cloned());
                None
            }
            CallKind::Api => {
                walk.usages.insert(edge.callee.hash_key());
                None
            }
            CallKind::Helper => graph.node_of(&edge.callee),
            CallKind::Ignored => None,
        }
    }
}
