use super::identifier::resolve_binding;
use crate::engine::{ResolveContext, Strategy, Triples};
use crate::error::ResolveError;
use crate::model::{scope, Located};

/// `pkg.Name` where `pkg` is another corpus package.
pub struct SelectorStrategy;

impl Default for SelectorStrategy {
    fn default() -> Self {
        Self::new()
    }
}

impl SelectorStrategy {
    pub fn new() -> Self {
        Self
    }
}

impl Strategy for SelectorStrategy {
    fn name(&self) -> &'static str {
        "selector"
    }

    fn can_handle(&self, expr: &Located<'_>) -> bool {
        expr.kind() == "selector_expression"
    }

    fn resolve<'a>(
        &self,
        expr: Located<'a>,
        ctx: &ResolveContext<'_, 'a>,
        depth: usize,
    ) -> Result<Triples, ResolveError> {
        let (Some(operand), Some(field)) = (expr.child("operand"), expr.child("field")) else {
            return Err(ctx.unsupported(expr, expr.kind()));
        };
        let Some(path) = ctx.oracle().package_alias(operand.strip_parens()) else {
            return Err(ctx.unsupported(expr, "field access"));
        };
        match scope::package_binding(ctx.corpus(), path, field.text()) {
            Some(binding) => resolve_binding(expr, binding, ctx, depth),
            None if ctx.oracle().is_corpus_module(path) => {
                Err(ResolveError::unbound(expr.text(), expr.location()))
            }
            None => Err(ctx.unsupported(expr, "external package value")),
        }
    }
}
