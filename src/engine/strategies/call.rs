use crate::engine::strings::{combine, return_statements};
use crate::engine::{ResolveContext, Strategy, Triples};
use crate::error::ResolveError;
use crate::model::{syntax, Located};
use std::collections::BTreeSet;
use tracing::debug;

/// Triple constructors and functions whose declared result carries locators.
pub struct CallStrategy;

impl Default for CallStrategy {
    fn default() -> Self {
        Self::new()
    }
}

impl CallStrategy {
    pub fn new() -> Self {
        Self
    }
}

impl Strategy for CallStrategy {
    fn name(&self) -> &'static str {
        "call"
    }

    fn can_handle(&self, expr: &Located<'_>) -> bool {
        expr.kind() == "call_expression"
    }

    fn resolve<'a>(
        &self,
        expr: Located<'a>,
        ctx: &ResolveContext<'_, 'a>,
        depth: usize,
    ) -> Result<Triples, ResolveError> {
        resolve_call(expr, None, ctx, depth)
    }
}

/// Resolves the locators a call produces. `index` selects a result position
/// when the call feeds a multi-name binding; otherwise the first position
/// whose declared type carries locators is used.
pub fn resolve_call<'a>(
    call: Located<'a>,
    index: Option<usize>,
    ctx: &ResolveContext<'_, 'a>,
    depth: usize,
) -> Result<Triples, ResolveError> {
    ctx.check_depth(call, depth)?;

    let callee = ctx
        .oracle()
        .callee(call)
        .ok_or_else(|| ctx.unsupported(call, "call"))?;
    let Some(decl) = ctx.corpus().declaration(&callee) else {
        if ctx.oracle().is_corpus_module(&callee.module) {
            return Err(ResolveError::callee_not_found(
                callee.to_string(),
                call.location(),
            ));
        }
        return Err(ctx.unsupported(call, "external call"));
    };

    let results: Vec<Located<'a>> = syntax::result_types(decl.node)
        .into_iter()
        .map(|t| decl.with(t))
        .collect();

    if index.is_none() && is_constructor(decl, &results, ctx) {
        return resolve_constructor(call, ctx, depth);
    }

    let index = match index {
        Some(index) => index,
        None => results
            .iter()
            .position(|t| ctx.tracks(*t))
            .ok_or_else(|| ctx.unsupported(call, "call without locator result"))?,
    };

    let returns = return_statements(decl);
    if returns.is_empty() {
        return Err(ctx.unsupported(decl, "function without return"));
    }

    let mut out = Triples::new();
    for ret in returns {
        let items = ret
            .named_children()
            .into_iter()
            .next()
            .map(|list| list.expression_items())
            .unwrap_or_default();

        if items.len() == results.len() {
            out.extend(ctx.resolve(items[index], depth + 1)?);
        } else if let [single] = items.as_slice() {
            // `return other()` forwarding every result of another call.
            if single.kind() != "call_expression" {
                return Err(ctx.unsupported(ret, "return_statement"));
            }
            out.extend(resolve_call(*single, Some(index), ctx, depth + 1)?);
        } else if items.is_empty() {
            return Err(ctx.unsupported(ret, "bare return"));
        } else {
            return Err(ctx.unsupported(ret, "return_statement"));
        }
    }
    Ok(out)
}

/// `func F(a, b, c string) T` where `T` is the tracked type.
fn is_constructor<'a>(
    decl: Located<'a>,
    results: &[Located<'a>],
    ctx: &ResolveContext<'_, 'a>,
) -> bool {
    let params = syntax::parameter_types(decl.node);
    params.len() == 3
        && params
            .iter()
            .all(|p| syntax::text(*p, &decl.file.source) == "string")
        && results.len() == 1
        && ctx.is_tracked(results[0])
}

fn resolve_constructor<'a>(
    call: Located<'a>,
    ctx: &ResolveContext<'_, 'a>,
    depth: usize,
) -> Result<Triples, ResolveError> {
    let args: Vec<Located<'a>> = syntax::call_arguments(call.node)
        .into_iter()
        .map(|n| call.with(n))
        .collect();
    let [domain, version, kind] = args.as_slice() else {
        return Err(ctx.unsupported(call, "constructor call"));
    };

    let domains = ctx.strings(*domain, depth + 1)?;
    let lenient = |arg: Located<'a>, field: &str| match ctx.strings(arg, depth + 1) {
        Ok(values) => values,
        Err(error) => {
            debug!(field, %error, "constructor argument unresolved, leaving it empty");
            BTreeSet::from([String::new()])
        }
    };
    let versions = lenient(*version, "version");
    let kinds = lenient(*kind, "kind");
    Ok(combine(&domains, &versions, &kinds))
}
