//! Locator value resolution.
//!
//! Recovers the concrete [`LocatorTriple`] values an expression can produce
//! by following bindings, constructor calls, return statements and
//! collection literals through the corpus syntax. Anything outside that
//! grammar is a [`ResolveError`], never a guess.

pub mod context;
pub mod locator;
pub mod strategies;
pub mod strings;

pub use context::ResolveContext;
pub use locator::{LocatorTriple, LocatorType};

use crate::error::ResolveError;
use crate::model::{Located, TypeOracle};
use std::collections::BTreeSet;
use strategies::{
    CallStrategy, CompositeStrategy, IdentifierStrategy, LiteralStrategy, SelectorStrategy,
    UnaryStrategy,
};
use tracing::{debug, trace};

pub const DEFAULT_MAX_DEPTH: usize = 50;

pub type Triples = BTreeSet<LocatorTriple>;

pub trait Strategy: Send + Sync {
    fn name(&self) -> &'static str;
    fn can_handle(&self, expr: &Located<'_>) -> bool;
    fn resolve<'a>(
        &self,
        expr: Located<'a>,
        ctx: &ResolveContext<'_, 'a>,
        depth: usize,
    ) -> Result<Triples, ResolveError>;
}

pub struct ValueResolver {
    strategies: Vec<Box<dyn Strategy>>,
    max_depth: usize,
    locator: LocatorType,
    domain_suffixes: Vec<String>,
}

impl ValueResolver {
    pub fn new(locator: LocatorType) -> Self {
        Self::builder(locator).build()
    }

    /// Returns the default strategy chain. Order matters: cheap shapes first.
    fn default_strategies() -> Vec<Box<dyn Strategy>> {
        vec![
            Box::new(LiteralStrategy::new()),
            Box::new(UnaryStrategy::new()),
            Box::new(CompositeStrategy::new()),
            Box::new(IdentifierStrategy::new()),
            Box::new(SelectorStrategy::new()),
            Box::new(CallStrategy::new()),
        ]
    }

    pub fn builder(locator: LocatorType) -> ResolverBuilder {
        ResolverBuilder::new(locator)
    }

    pub fn locator(&self) -> &LocatorType {
        &self.locator
    }

    pub fn max_depth(&self) -> usize {
        self.max_depth
    }

    /// Resolves an expression denoting a locator, or a collection of them,
    /// to the set of concrete triples it can produce.
    pub fn resolve<'a>(
        &self,
        oracle: &TypeOracle<'a>,
        expr: Located<'a>,
    ) -> Result<Triples, ResolveError> {
        let ctx = ResolveContext::new(self, oracle);
        let mut triples = self.resolve_at(expr, &ctx, 0)?;
        if !self.domain_suffixes.is_empty() {
            triples.retain(|t| t.domain_matches(&self.domain_suffixes));
        }
        Ok(triples)
    }

    /// Resolves a string-valued expression to the values it can take.
    pub fn resolve_strings<'a>(
        &self,
        oracle: &TypeOracle<'a>,
        expr: Located<'a>,
    ) -> Result<BTreeSet<String>, ResolveError> {
        let ctx = ResolveContext::new(self, oracle);
        strings::resolve(expr, &ctx, 0)
    }

    pub(crate) fn resolve_at<'a>(
        &self,
        expr: Located<'a>,
        ctx: &ResolveContext<'_, 'a>,
        depth: usize,
    ) -> Result<Triples, ResolveError> {
        ctx.check_depth(expr, depth)?;

        for strategy in &self.strategies {
            if strategy.can_handle(&expr) {
                trace!(strategy = strategy.name(), at = %expr.location(), depth, "resolving");
                return strategy.resolve(expr, ctx, depth);
            }
        }
        Err(ctx.unsupported(expr, expr.kind()))
    }

    pub fn strategy_names(&self) -> Vec<&'static str> {
        self.strategies.iter().map(|s| s.name()).collect()
    }
}

impl Default for ValueResolver {
    fn default() -> Self {
        Self::new(LocatorType::default())
    }
}

pub struct ResolverBuilder {
    max_depth: usize,
    locator: LocatorType,
    domain_suffixes: Vec<String>,
}

impl ResolverBuilder {
    pub fn new(locator: LocatorType) -> Self {
        Self {
            max_depth: DEFAULT_MAX_DEPTH,
            locator,
            domain_suffixes: Vec::new(),
        }
    }

    pub fn with_max_depth(mut self, depth: usize) -> Self {
        self.max_depth = depth;
        self
    }

    /// Keeps only triples whose domain ends with one of `suffixes`.
    pub fn with_domain_filter(mut self, suffixes: Vec<String>) -> Self {
        self.domain_suffixes = suffixes;
        self
    }

    pub fn build(self) -> ValueResolver {
        let resolver = ValueResolver {
            strategies: ValueResolver::default_strategies(),
            max_depth: self.max_depth,
            locator: self.locator,
            domain_suffixes: self.domain_suffixes,
        };
        debug!(
            strategies = ?resolver.strategy_names(),
            max_depth = resolver.max_depth,
            "value resolver ready"
        );
        resolver
    }
}

#[cfg(test)]
pub(crate) mod test_support {
    use super::*;
    use crate::model::{Corpus, Located};

    pub const SCHEMA_IMPORT: &str = "import \"k8s.io/apimachinery/pkg/runtime/schema\"\n";

    /// Initializer of package-level `name` in the corpus package `pkg`.
    pub fn package_value<'a>(corpus: &'a Corpus, pkg: &str, name: &str) -> Located<'a> {
        let import_path = format!("{}/{pkg}", crate::model::test_support::MODULE);
        let spec = corpus.find_value_spec(&import_path, name).unwrap();
        let value = spec.child("value").unwrap();
        value.named_children().into_iter().next().unwrap()
    }

    pub fn resolve_var(corpus: &Corpus, pkg: &str, name: &str) -> Result<Triples, ResolveError> {
        let oracle = TypeOracle::new(corpus);
        ValueResolver::default().resolve(&oracle, package_value(corpus, pkg, name))
    }

    pub fn triples(items: &[(&str, &str, &str)]) -> Triples {
        items
            .iter()
            .map(|(d, v, k)| LocatorTriple::new(*d, *v, *k))
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::test_support::*;
    use super::*;
    use crate::model::test_support::corpus;

    #[test]
    fn test_resolver_default_chain() {
        let resolver = ValueResolver::default();
        assert_eq!(
            resolver.strategy_names(),
            vec!["literal", "unary", "composite", "identifier", "selector", "call"]
        );
        assert_eq!(resolver.max_depth(), DEFAULT_MAX_DEPTH);
    }

    #[test]
    fn test_unsupported_shape_is_reported() {
        let source = format!("package p\n{SCHEMA_IMPORT}var gvrs []schema.GroupVersionResource\nvar g = gvrs[0]\n");
        let corpus = corpus(&[("p/p.go", source.as_str())]);
        let err = resolve_var(&corpus, "p", "g").unwrap_err();
        match err {
            ResolveError::UnsupportedExpressionShape { shape, snippet, location } => {
                assert_eq!(shape, "index_expression");
                assert_eq!(snippet, "gvrs[0]");
                assert_eq!(location.line, 4);
            }
            other => panic!("unexpected {other:?}"),
        }
    }

    #[test]
    fn test_binding_cycle_is_reported() {
        let source = "package p\nvar a = b\nvar b = a\n";
        let corpus = corpus(&[("p/p.go", source)]);
        let err = resolve_var(&corpus, "p", "a").unwrap_err();
        assert!(
            matches!(err, ResolveError::CyclicBinding { ref name, .. } if name == "b"),
            "{err:?}"
        );
    }

    #[test]
    fn test_depth_cap() {
        let source = format!(
            "package p\n{SCHEMA_IMPORT}func again() schema.GroupVersionResource {{ return again() }}\nvar g = again()\n"
        );
        let corpus = corpus(&[("p/p.go", source.as_str())]);
        let err = resolve_var(&corpus, "p", "g").unwrap_err();
        assert!(matches!(
            err,
            ResolveError::DepthExceeded { max_depth: DEFAULT_MAX_DEPTH, .. }
        ));
    }

    #[test]
    fn test_domain_filter_drops_untracked_domains() {
        let source = format!(
            r#"package p
{SCHEMA_IMPORT}var gvrs = []schema.GroupVersionResource{{
    {{Group: "config.openshift.io", Version: "v1", Resource: "clusterversions"}},
    {{Group: "", Version: "v1", Resource: "pods"}},
}}
"#
        );
        let corpus = corpus(&[("p/p.go", source.as_str())]);
        let oracle = TypeOracle::new(&corpus);
        let resolver = ValueResolver::builder(LocatorType::default())
            .with_domain_filter(vec!["openshift.io".to_string()])
            .build();

        let result = resolver
            .resolve(&oracle, package_value(&corpus, "p", "gvrs"))
            .unwrap();
        assert_eq!(
            result,
            triples(&[("config.openshift.io", "v1", "clusterversions")])
        );
    }
}
