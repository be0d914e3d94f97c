//! The batch pipeline: per-file trees in parallel, a merge barrier, helper
//! closures, then the report.

use crate::config::AnalyzerConfig;
use crate::error::Result;
use crate::helpers::{collect_records, Closures, HelperClosureResolver};
use crate::model::{CallGraph, Corpus, CorpusLoader};
use crate::output::{Report, ReportAssembler};
use crate::traverse::CallGraphTraversal;
use crate::tree::{Classifier, FileTrees, Root, TreeBuilder};
use rayon::prelude::*;
use std::collections::BTreeSet;
use std::path::Path;
use tracing::{debug, info};

/// Everything one run produces. The report is derived from the other two.
#[derive(Debug)]
pub struct Analysis {
    pub tests: Root,
    pub closures: Closures,
    pub report: Report,
}

pub struct Analyzer {
    config: AnalyzerConfig,
    callgraph: bool,
}

impl Default for Analyzer {
    fn default() -> Self {
        Self::new(AnalyzerConfig::default())
    }
}

impl Analyzer {
    pub fn new(config: AnalyzerConfig) -> Self {
        Self {
            config,
            callgraph: false,
        }
    }

    /// Also walk the call graph from every test root.
    pub fn with_callgraph(mut self, enabled: bool) -> Self {
        self.callgraph = enabled;
        self
    }

    pub fn config(&self) -> &AnalyzerConfig {
        &self.config
    }

    pub fn analyze_path(&self, root: &Path) -> Result<Analysis> {
        let corpus = CorpusLoader::new().load(root)?;
        self.analyze(&corpus)
    }

    pub fn analyze(&self, corpus: &Corpus) -> Result<Analysis> {
        info!(
            module = corpus.module_path(),
            files = corpus.files().len(),
            packages = corpus.packages().len(),
            "analyzing corpus"
        );

        let classifier = Classifier::new(
            self.config.classifier.clone(),
            corpus,
            self.config.max_resolve_depth,
        );
        let oracle = classifier.oracle(corpus);
        let builder =
            TreeBuilder::new(&classifier, &oracle).with_ignored(self.config.collect_ignored);

        let fragments: Vec<FileTrees> = corpus
            .files()
            .par_iter()
            .map(|file| builder.build(file))
            .collect();

        let mut tests = Root::new();
        let mut helpers = Vec::new();
        let mut ignored = BTreeSet::new();
        let mut failures = Vec::new();
        for fragment in fragments {
            tests.append(fragment.tests);
            helpers.extend(fragment.helpers);
            ignored.extend(fragment.ignored);
            failures.extend(fragment.failures);
        }
        failures.sort();
        debug!(
            cases = tests.case_count(),
            helpers = helpers.len(),
            failures = failures.len(),
            "trees merged"
        );

        let records = collect_records(helpers, self.config.merge_duplicate_helpers)?;
        let helper_count = records.len();
        let closures = HelperClosureResolver::new(self.config.max_passes).resolve(records)?;

        let usages = ReportAssembler::new(&closures)
            .with_group_inheritance(self.config.inherit_group_usages)
            .assemble(&tests);

        let traversal = self.callgraph.then(|| {
            let graph = CallGraph::build(&oracle, &classifier.call_sites(&oracle));
            CallGraphTraversal::new(&classifier, self.config.max_traversal_depth).run(&graph)
        });

        let report = Report {
            files_analyzed: corpus.files().len(),
            helper_count,
            total_tests: usages.len(),
            tests: usages,
            ignored: ignored.into_iter().collect(),
            failures,
            traversal,
        };
        info!(
            tests = report.total_tests,
            helpers = report.helper_count,
            failures = report.failures.len(),
            "analysis complete"
        );

        Ok(Analysis {
            tests,
            closures,
            report,
        })
    }
}
