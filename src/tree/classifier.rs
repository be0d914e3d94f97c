//! Call classification against the configured framework, API surface and
//! corpus namespaces.

use super::ApiUsage;
use crate::config::{has_module_prefix, ClassifierConfig};
use crate::engine::ValueResolver;
use crate::error::ResolveError;
use crate::model::callgraph::CallSiteHooks;
use crate::model::{syntax, Corpus, FunctionIdentity, Located, TypeOracle};
use tracing::debug;

/// Priority-ordered classes of a call site.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CallKind {
    Group,
    Case,
    /// Generic-resource accessor; its target comes from the locator argument.
    ResourceAccess,
    Api,
    Helper,
    Ignored,
}

impl CallKind {
    pub fn is_scope(self) -> bool {
        matches!(self, CallKind::Group | CallKind::Case)
    }

    pub fn is_api(self) -> bool {
        matches!(self, CallKind::Api | CallKind::ResourceAccess)
    }
}

pub struct Classifier {
    config: ClassifierConfig,
    resolver: ValueResolver,
    corpus_prefixes: Vec<String>,
}

impl Classifier {
    pub fn new(config: ClassifierConfig, corpus: &Corpus, max_resolve_depth: usize) -> Self {
        let corpus_prefixes = if config.corpus_module_prefixes.is_empty() {
            vec![corpus.module_path().to_string()]
        } else {
            config.corpus_module_prefixes.clone()
        };
        let resolver = ValueResolver::builder(config.locator.clone())
            .with_max_depth(max_resolve_depth)
            .with_domain_filter(config.domain_suffixes.clone())
            .build();

        Self {
            config,
            resolver,
            corpus_prefixes,
        }
    }

    pub fn config(&self) -> &ClassifierConfig {
        &self.config
    }

    pub fn resolver(&self) -> &ValueResolver {
        &self.resolver
    }

    /// Type oracle that attributes dot-imported framework calls to the
    /// framework modules.
    pub fn oracle<'a>(&self, corpus: &'a Corpus) -> TypeOracle<'a> {
        let names: Vec<&str> = self
            .config
            .group_names
            .iter()
            .chain(&self.config.case_names)
            .map(String::as_str)
            .chain(std::iter::once(self.config.recover_function.as_str()))
            .collect();

        self.config
            .framework_modules
            .iter()
            .fold(TypeOracle::new(corpus), |oracle, module| {
                oracle.with_dot_import_hint(module, names.iter().copied())
            })
    }

    pub fn is_corpus_module(&self, module: &str) -> bool {
        let module = module.strip_suffix("_test").unwrap_or(module);
        self.corpus_prefixes
            .iter()
            .any(|prefix| has_module_prefix(module, prefix))
    }

    pub fn classify(&self, callee: &FunctionIdentity) -> CallKind {
        if !callee.is_method() && self.config.is_framework_module(&callee.module) {
            if self.config.group_names.contains(&callee.function) {
                return CallKind::Group;
            }
            if self.config.case_names.contains(&callee.function) {
                return CallKind::Case;
            }
        }
        if self.config.is_resource_accessor(callee) {
            return CallKind::ResourceAccess;
        }
        if self.config.is_api_module(&callee.module) {
            return CallKind::Api;
        }
        if self.is_corpus_module(&callee.module) {
            return CallKind::Helper;
        }
        CallKind::Ignored
    }

    /// Whether a deferred call to `callee` is the framework's panic recovery.
    pub fn is_recover(&self, callee: &FunctionIdentity) -> bool {
        callee.function == self.config.recover_function
            && self.config.is_framework_module(&callee.module)
    }

    /// API usage leaves for a call already classified as an API call.
    pub fn api_usages<'a>(
        &self,
        oracle: &TypeOracle<'a>,
        call: Located<'a>,
        callee: &FunctionIdentity,
        kind: CallKind,
    ) -> Result<Vec<ApiUsage>, ResolveError> {
        match kind {
            CallKind::ResourceAccess => {
                let args = arguments(call);
                let [locator] = args.as_slice() else {
                    return Err(ResolveError::unsupported(
                        "resource accessor arity",
                        call.snippet(),
                        call.location(),
                    ));
                };
                let triples = self.resolver.resolve(oracle, *locator)?;
                debug!(
                    at = %call.location(),
                    resolved = triples.len(),
                    "resource accessor resolved"
                );
                Ok(triples.into_iter().map(ApiUsage::Resource).collect())
            }
            CallKind::Api => Ok(vec![ApiUsage::Call(callee.clone())]),
            _ => Ok(Vec::new()),
        }
    }

    /// Description of a group or case call: its first argument as a string.
    pub fn describe<'a>(&self, oracle: &TypeOracle<'a>, call: Located<'a>) -> String {
        let Some(first) = arguments(call).into_iter().next() else {
            return String::new();
        };
        self.description_of(oracle, first.strip_parens())
    }

    fn description_of<'a>(&self, oracle: &TypeOracle<'a>, expr: Located<'a>) -> String {
        if syntax::is_string_literal(expr.node) {
            return syntax::string_literal_value(expr.node, &expr.file.source);
        }
        if let Ok(values) = self.resolver.resolve_strings(oracle, expr) {
            if values.len() == 1 {
                if let Some(value) = values.into_iter().next() {
                    return value;
                }
            }
        }
        if expr.kind() == "call_expression" {
            let is_format = oracle
                .callee(expr)
                .is_some_and(|callee| self.config.is_format_function(&callee));
            if let Some(format) = arguments(expr).into_iter().next().filter(|_| is_format) {
                return self.description_of(oracle, format.strip_parens());
            }
        }
        expr.text().to_string()
    }

    pub fn call_sites<'c, 'a>(&'c self, oracle: &'c TypeOracle<'a>) -> CallSites<'c, 'a> {
        CallSites {
            classifier: self,
            oracle,
        }
    }
}

fn arguments(call: Located<'_>) -> Vec<Located<'_>> {
    syntax::call_arguments(call.node)
        .into_iter()
        .map(|n| call.with(n))
        .collect()
}

/// Classifier bound to an oracle, as seen by the call-graph builder.
pub struct CallSites<'c, 'a> {
    classifier: &'c Classifier,
    oracle: &'c TypeOracle<'a>,
}

impl<'a> CallSiteHooks<'a> for CallSites<'_, 'a> {
    fn is_scope_call(&self, callee: &FunctionIdentity) -> bool {
        self.classifier.classify(callee).is_scope()
    }

    fn is_root_call(&self, callee: &FunctionIdentity) -> bool {
        self.classifier.classify(callee) == CallKind::Group
    }

    fn describe(&self, call: Located<'a>) -> String {
        self.classifier.describe(self.oracle, call)
    }

    fn annotations(&self, call: Located<'a>, callee: &FunctionIdentity) -> Vec<String> {
        if self.classifier.classify(callee) != CallKind::ResourceAccess {
            return Vec::new();
        }
        match self
            .classifier
            .api_usages(self.oracle, call, callee, CallKind::ResourceAccess)
        {
            Ok(usages) => usages.iter().map(ApiUsage::key).collect(),
            Err(err) => {
                debug!(error = %err, "resource accessor left unannotated");
                Vec::new()
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::engine::LocatorTriple;
    use crate::model::test_support::{corpus, MODULE};
    use crate::model::Corpus;

    const SOURCE: &str = r#"package e2e

import (
    "fmt"

    g "github.com/onsi/ginkgo/v2"
    "k8s.io/apimachinery/pkg/runtime/schema"
    "k8s.io/client-go/dynamic"
)

const suiteName = "[sig-apps] deployments"

var gvr = schema.GroupVersionResource{Group: "apps.openshift.io", Version: "v1", Resource: "deploymentconfigs"}

var _ = g.Describe(suiteName, func() {
    g.It(fmt.Sprintf("scales %d replicas", 3), func() {
        client := dynamic.NewForConfigOrDie(nil)
        client.Resource(gvr)
    })
})
"#;

    fn classifier(corpus: &Corpus) -> Classifier {
        Classifier::new(ClassifierConfig::default(), corpus, 50)
    }

    fn first_call<'a>(corpus: &'a Corpus, needle: &str) -> Located<'a> {
        let file = &corpus.files()[0];
        let offset = file.source.find(needle).unwrap();
        let mut node = file
            .tree
            .root_node()
            .descendant_for_byte_range(offset, offset)
            .unwrap();
        while node.kind() != "call_expression" {
            node = node.parent().unwrap();
        }
        Located::new(file, node)
    }

    #[test]
    fn test_classify_priorities() {
        let corpus = corpus(&[("e2e/e2e.go", SOURCE)]);
        let classifier = classifier(&corpus);
        let ginkgo = "github.com/onsi/ginkgo/v2";

        assert_eq!(classifier.classify(&FunctionIdentity::function(ginkgo, "Describe")), CallKind::Group);
        assert_eq!(classifier.classify(&FunctionIdentity::function(ginkgo, "FIt")), CallKind::Case);
        assert_eq!(classifier.classify(&FunctionIdentity::function(ginkgo, "By")), CallKind::Ignored);
        assert_eq!(
            classifier.classify(&FunctionIdentity::function("k8s.io/client-go/dynamic", "Resource")),
            CallKind::ResourceAccess
        );
        assert_eq!(
            classifier.classify(&FunctionIdentity::function("k8s.io/client-go/dynamic", "NewForConfigOrDie")),
            CallKind::Api
        );
        assert_eq!(
            classifier.classify(&FunctionIdentity::function(format!("{MODULE}/util"), "Setup")),
            CallKind::Helper
        );
        assert_eq!(
            classifier.classify(&FunctionIdentity::function(format!("{MODULE}/util_test"), "Setup")),
            CallKind::Helper
        );
        assert_eq!(classifier.classify(&FunctionIdentity::function("fmt", "Sprintf")), CallKind::Ignored);
    }

    #[test]
    fn test_describe_resolves_constants_and_format_calls() {
        let corpus = corpus(&[("e2e/e2e.go", SOURCE)]);
        let classifier = classifier(&corpus);
        let oracle = classifier.oracle(&corpus);

        let describe = first_call(&corpus, "g.Describe");
        assert_eq!(classifier.describe(&oracle, describe), "[sig-apps] deployments");

        let it = first_call(&corpus, "g.It");
        assert_eq!(classifier.describe(&oracle, it), "scales %d replicas");
    }

    #[test]
    fn test_resource_accessor_usages() {
        let corpus = corpus(&[("e2e/e2e.go", SOURCE)]);
        let classifier = classifier(&corpus);
        let oracle = classifier.oracle(&corpus);

        let call = first_call(&corpus, "client.Resource");
        let callee = oracle.callee(call).unwrap();
        assert_eq!(classifier.classify(&callee), CallKind::ResourceAccess);

        let usages = classifier
            .api_usages(&oracle, call, &callee, CallKind::ResourceAccess)
            .unwrap();
        assert_eq!(
            usages,
            vec![ApiUsage::Resource(LocatorTriple::new(
                "apps.openshift.io",
                "v1",
                "deploymentconfigs"
            ))]
        );
    }

    #[test]
    fn test_domain_filter_drops_foreign_resources() {
        let corpus = corpus(&[("e2e/e2e.go", SOURCE)]);
        let config = ClassifierConfig {
            domain_suffixes: vec!["config.openshift.io".to_string()],
            ..ClassifierConfig::default()
        };
        let classifier = Classifier::new(config, &corpus, 50);
        let oracle = classifier.oracle(&corpus);

        let call = first_call(&corpus, "client.Resource");
        let callee = oracle.callee(call).unwrap();
        let usages = classifier
            .api_usages(&oracle, call, &callee, CallKind::ResourceAccess)
            .unwrap();
        assert!(usages.is_empty());
    }

    #[test]
    fn test_recover_recognised() {
        let corpus = corpus(&[("e2e/e2e.go", SOURCE)]);
        let classifier = classifier(&corpus);
        assert!(classifier.is_recover(&FunctionIdentity::function(
            "github.com/onsi/ginkgo/v2",
            "GinkgoRecover"
        )));
        assert!(!classifier.is_recover(&FunctionIdentity::function(MODULE, "GinkgoRecover")));
    }
}
