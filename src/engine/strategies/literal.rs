use crate::engine::{ResolveContext, Strategy, Triples};
use crate::error::ResolveError;
use crate::model::Located;

/// `nil` stands for an empty collection.
pub struct LiteralStrategy;

impl Default for LiteralStrategy {
    fn default() -> Self {
        Self::new()
    }
}

impl LiteralStrategy {
    pub fn new() -> Self {
        Self
    }
}

impl Strategy for LiteralStrategy {
    fn name(&self) -> &'static str {
        "literal"
    }

    fn can_handle(&self, expr: &Located<'_>) -> bool {
        expr.kind() == "nil"
    }

    fn resolve<'a>(
        &self,
        _expr: Located<'a>,
        _ctx: &ResolveContext<'_, 'a>,
        _depth: usize,
    ) -> Result<Triples, ResolveError> {
        Ok(Triples::new())
    }
}
