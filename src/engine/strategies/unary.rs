use crate::engine::{ResolveContext, Strategy, Triples};
use crate::error::ResolveError;
use crate::model::Located;

pub struct UnaryStrategy;

impl Default for UnaryStrategy {
    fn default() -> Self {
        Self::new()
    }
}

impl UnaryStrategy {
    pub fn new() -> Self {
        Self
    }
}

impl Strategy for UnaryStrategy {
    fn name(&self) -> &'static str {
        "unary"
    }

    fn can_handle(&self, expr: &Located<'_>) -> bool {
        matches!(expr.kind(), "unary_expression" | "parenthesized_expression")
    }

    fn resolve<'a>(
        &self,
        expr: Located<'a>,
        ctx: &ResolveContext<'_, 'a>,
        depth: usize,
    ) -> Result<Triples, ResolveError> {
        if expr.kind() == "parenthesized_expression" {
            return ctx.resolve(expr.strip_parens(), depth + 1);
        }

        let operator = expr.child("operator").map(|o| o.text()).unwrap_or("");
        match (operator, expr.child("operand")) {
            ("&" | "*", Some(operand)) => ctx.resolve(operand, depth + 1),
            _ => Err(ctx.unsupported(expr, "unary_expression")),
        }
    }
}
