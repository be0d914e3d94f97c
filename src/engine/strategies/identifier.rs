use super::call::resolve_call;
use crate::engine::{ResolveContext, Strategy, Triples};
use crate::error::ResolveError;
use crate::model::{scope, Binding, Located};

/// Follows an identifier to its binding. Chains of identifiers recurse until
/// they reach some other shape, however long they are.
pub struct IdentifierStrategy;

impl Default for IdentifierStrategy {
    fn default() -> Self {
        Self::new()
    }
}

impl IdentifierStrategy {
    pub fn new() -> Self {
        Self
    }
}

impl Strategy for IdentifierStrategy {
    fn name(&self) -> &'static str {
        "identifier"
    }

    fn can_handle(&self, expr: &Located<'_>) -> bool {
        expr.kind() == "identifier"
    }

    fn resolve<'a>(
        &self,
        expr: Located<'a>,
        ctx: &ResolveContext<'_, 'a>,
        depth: usize,
    ) -> Result<Triples, ResolveError> {
        match scope::lookup(ctx.corpus(), expr) {
            Some(binding) => resolve_binding(expr, binding, ctx, depth),
            None => Err(ResolveError::unbound(expr.text(), expr.location())),
        }
    }
}

pub fn resolve_binding<'a>(
    at: Located<'a>,
    binding: Binding<'a>,
    ctx: &ResolveContext<'_, 'a>,
    depth: usize,
) -> Result<Triples, ResolveError> {
    match binding {
        Binding::Value {
            expr,
            result_index: None,
            ..
        } => ctx.follow_binding(at, expr, || ctx.resolve(expr, depth)),
        Binding::Value {
            expr,
            result_index: Some(index),
            ..
        } if expr.kind() == "call_expression" => {
            ctx.follow_binding(at, expr, || resolve_call(expr, Some(index), ctx, depth + 1))
        }
        Binding::Value { .. } => Err(ctx.unsupported(at, "multi-value binding")),
        // A range variable stands for any element of the collection.
        Binding::Range { collection, .. } => {
            ctx.follow_binding(at, collection, || ctx.resolve(collection, depth))
        }
        Binding::Parameter { .. } => Err(ctx.unsupported(at, "parameter")),
        Binding::Declared { .. } => Err(ctx.unsupported(at, "declaration without value")),
    }
}

#[cfg(test)]
mod tests {
    use crate::engine::test_support::*;
    use crate::engine::ValueResolver;
    use crate::model::test_support::corpus;
    use crate::model::{Located, TypeOracle};

    fn chain_source(hops: usize) -> String {
        let mut source = format!(
            "package p\n{SCHEMA_IMPORT}func f() {{\n    v0 := schema.GroupVersionResource{{Group: \"chain.io\", Version: \"v1\", Resource: \"links\"}}\n"
        );
        for i in 1..=hops {
            source.push_str(&format!("    v{i} := v{}\n", i - 1));
        }
        source.push_str(&format!("    use(v{hops})\n}}\n"));
        source
    }

    #[test]
    fn test_identifier_chains_of_any_length() {
        for hops in (1..=8).chain([60, 120]) {
            let source = chain_source(hops);
            let corpus = corpus(&[("p/p.go", source.as_str())]);
            let file = corpus.file(0);
            let needle = format!("use(v{hops})");
            let offset = file.source.find(&needle).unwrap() + 4;
            let node = file
                .tree
                .root_node()
                .descendant_for_byte_range(offset, offset + needle.len() - 5)
                .unwrap();
            let oracle = TypeOracle::new(&corpus);

            let result = ValueResolver::default()
                .resolve(&oracle, Located::new(file, node))
                .unwrap();
            assert_eq!(result, triples(&[("chain.io", "v1", "links")]), "hops = {hops}");
        }
    }

    #[test]
    fn test_range_variable_aliases_collection() {
        let source = format!(
            r#"package p
{SCHEMA_IMPORT}var all = []schema.GroupVersionResource{{
    {{Group: "a.io", Version: "v1", Resource: "as"}},
    {{Group: "b.io", Version: "v1", Resource: "bs"}},
}}

func f() {{
    for _, gvr := range all {{
        use(gvr)
    }}
}}
"#
        );
        let corpus = corpus(&[("p/p.go", source.as_str())]);
        let file = corpus.file(0);
        let offset = file.source.find("use(gvr)").unwrap() + 4;
        let node = file
            .tree
            .root_node()
            .descendant_for_byte_range(offset, offset + 3)
            .unwrap();
        let oracle = TypeOracle::new(&corpus);

        let result = ValueResolver::default()
            .resolve(&oracle, Located::new(file, node))
            .unwrap();
        assert_eq!(result, triples(&[("a.io", "v1", "as"), ("b.io", "v1", "bs")]));
    }

    #[test]
    fn test_parameter_is_unsupported() {
        let source = format!("package p\n{SCHEMA_IMPORT}func f(gvr schema.GroupVersionResource) {{ use(gvr) }}\n");
        let corpus = corpus(&[("p/p.go", source.as_str())]);
        let file = corpus.file(0);
        let offset = file.source.find("use(gvr)").unwrap() + 4;
        let node = file
            .tree
            .root_node()
            .descendant_for_byte_range(offset, offset + 3)
            .unwrap();
        let oracle = TypeOracle::new(&corpus);

        assert!(ValueResolver::default()
            .resolve(&oracle, Located::new(file, node))
            .is_err());
    }
}
