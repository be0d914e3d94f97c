//! String values of locator fields and descriptions.

use super::{LocatorTriple, ResolveContext, Triples};
use crate::error::ResolveError;
use crate::model::{scope, syntax, Binding, Located};
use std::collections::BTreeSet;

pub fn resolve<'a>(
    expr: Located<'a>,
    ctx: &ResolveContext<'_, 'a>,
    depth: usize,
) -> Result<BTreeSet<String>, ResolveError> {
    ctx.check_depth(expr, depth)?;

    match expr.kind() {
        "interpreted_string_literal" | "raw_string_literal" => Ok(BTreeSet::from([
            syntax::string_literal_value(expr.node, &expr.file.source),
        ])),
        "parenthesized_expression" => resolve(expr.strip_parens(), ctx, depth + 1),
        "identifier" => match scope::lookup(ctx.corpus(), expr) {
            Some(binding) => resolve_binding(expr, binding, ctx, depth),
            None => Err(ResolveError::unbound(expr.text(), expr.location())),
        },
        "selector_expression" => {
            let operand = expr
                .child("operand")
                .ok_or_else(|| ctx.unsupported(expr, expr.kind()))?;
            let field = expr
                .child("field")
                .ok_or_else(|| ctx.unsupported(expr, expr.kind()))?;
            let path = ctx
                .oracle()
                .package_alias(operand.strip_parens())
                .ok_or_else(|| ctx.unsupported(expr, "field access"))?;
            match scope::package_binding(ctx.corpus(), path, field.text()) {
                Some(binding) => resolve_binding(expr, binding, ctx, depth),
                None => Err(ctx.unsupported(expr, "external package value")),
            }
        }
        "binary_expression" => {
            let operator = expr.child("operator").map(|o| o.text()).unwrap_or("");
            let (Some(left), Some(right)) = (expr.child("left"), expr.child("right")) else {
                return Err(ctx.unsupported(expr, expr.kind()));
            };
            if operator != "+" {
                return Err(ctx.unsupported(expr, "binary_expression"));
            }
            let left = resolve(left, ctx, depth + 1)?;
            let right = resolve(right, ctx, depth + 1)?;
            Ok(left
                .iter()
                .flat_map(|l| right.iter().map(move |r| format!("{l}{r}")))
                .collect())
        }
        "call_expression" => resolve_call(expr, None, ctx, depth),
        "composite_literal" => {
            let body = expr
                .child("body")
                .ok_or_else(|| ctx.unsupported(expr, expr.kind()))?;
            let mut out = BTreeSet::new();
            for item in body.named_children() {
                let value = item.named_children().into_iter().next().unwrap_or(item);
                out.extend(resolve(value, ctx, depth + 1)?);
            }
            Ok(out)
        }
        other => Err(ctx.unsupported(expr, other)),
    }
}

fn resolve_binding<'a>(
    at: Located<'a>,
    binding: Binding<'a>,
    ctx: &ResolveContext<'_, 'a>,
    depth: usize,
) -> Result<BTreeSet<String>, ResolveError> {
    match binding {
        Binding::Value {
            expr,
            result_index: None,
            ..
        } => ctx.follow_binding(at, expr, || resolve(expr, ctx, depth)),
        Binding::Value {
            expr,
            result_index: Some(index),
            ..
        } if expr.kind() == "call_expression" => {
            ctx.follow_binding(at, expr, || resolve_call(expr, Some(index), ctx, depth + 1))
        }
        Binding::Range { collection, .. } => {
            ctx.follow_binding(at, collection, || resolve(collection, ctx, depth))
        }
        Binding::Value { .. } => Err(ctx.unsupported(at, "multi-value binding")),
        Binding::Parameter { .. } => Err(ctx.unsupported(at, "parameter")),
        Binding::Declared { .. } => Err(ctx.unsupported(at, "declaration without value")),
    }
}

/// Strings returned by a corpus function at result position `index`.
fn resolve_call<'a>(
    call: Located<'a>,
    index: Option<usize>,
    ctx: &ResolveContext<'_, 'a>,
    depth: usize,
) -> Result<BTreeSet<String>, ResolveError> {
    let callee = ctx
        .oracle()
        .callee(call)
        .ok_or_else(|| ctx.unsupported(call, "call"))?;
    let decl = ctx
        .corpus()
        .declaration(&callee)
        .ok_or_else(|| ResolveError::callee_not_found(callee.to_string(), call.location()))?;
    let index = index.unwrap_or(0);

    let mut out = BTreeSet::new();
    for ret in return_statements(decl) {
        let items = ret
            .named_children()
            .into_iter()
            .next()
            .map(|list| list.expression_items())
            .unwrap_or_default();
        let item = items
            .get(index)
            .copied()
            .ok_or_else(|| ctx.unsupported(ret, "return_statement"))?;
        out.extend(resolve(item, ctx, depth + 1)?);
    }
    Ok(out)
}

/// `return` statements of a function body, excluding nested function literals.
pub fn return_statements(decl: Located<'_>) -> Vec<Located<'_>> {
    let mut out = Vec::new();
    if let Some(body) = decl.child("body") {
        collect_returns(body, &mut out);
    }
    out
}

fn collect_returns<'a>(node: Located<'a>, out: &mut Vec<Located<'a>>) {
    for child in node.named_children() {
        match child.kind() {
            "return_statement" => out.push(child),
            "func_literal" => {}
            _ => collect_returns(child, out),
        }
    }
}

pub fn combine(
    domains: &BTreeSet<String>,
    versions: &BTreeSet<String>,
    kinds: &BTreeSet<String>,
) -> Triples {
    let mut out = Triples::new();
    for d in domains {
        for v in versions {
            for k in kinds {
                out.insert(LocatorTriple::new(d.as_str(), v.as_str(), k.as_str()));
            }
        }
    }
    out
}
