use crate::engine::{strings, ResolveContext, Strategy, Triples};
use crate::error::ResolveError;
use crate::model::{Located, Origin};
use std::collections::BTreeSet;

/// Struct, slice, array and map literals.
///
/// Element types may be elided (`[]T{{...}}`), so the declared type of the
/// enclosing literal is carried down into nested `literal_value`s.
pub struct CompositeStrategy;

impl Default for CompositeStrategy {
    fn default() -> Self {
        Self::new()
    }
}

impl CompositeStrategy {
    pub fn new() -> Self {
        Self
    }
}

impl Strategy for CompositeStrategy {
    fn name(&self) -> &'static str {
        "composite"
    }

    fn can_handle(&self, expr: &Located<'_>) -> bool {
        expr.kind() == "composite_literal"
    }

    fn resolve<'a>(
        &self,
        expr: Located<'a>,
        ctx: &ResolveContext<'_, 'a>,
        depth: usize,
    ) -> Result<Triples, ResolveError> {
        let (Some(ty), Some(body)) = (expr.child("type"), expr.child("body")) else {
            return Err(ctx.unsupported(expr, "composite_literal"));
        };
        resolve_typed(ty, body, ctx, depth + 1)
    }
}

/// Resolves the `literal_value` `body` whose type is `ty`.
pub fn resolve_typed<'a>(
    ty: Located<'a>,
    body: Located<'a>,
    ctx: &ResolveContext<'_, 'a>,
    depth: usize,
) -> Result<Triples, ResolveError> {
    ctx.check_depth(body, depth)?;

    match ty.kind() {
        "slice_type" | "array_type" | "implicit_length_array_type" => {
            let element = ty
                .child("element")
                .ok_or_else(|| ctx.unsupported(ty, ty.kind()))?;
            let mut out = Triples::new();
            for item in literal_items(body) {
                let value = match item.kind() {
                    "keyed_element" => keyed_parts(item).map(|(_, v)| v),
                    _ => Some(unwrap_element(item)),
                }
                .ok_or_else(|| ctx.unsupported(item, item.kind()))?;
                out.extend(resolve_element(element, value, ctx, depth)?);
            }
            Ok(out)
        }
        "map_type" => {
            let (Some(key_ty), Some(value_ty)) = (ty.child("key"), ty.child("value")) else {
                return Err(ctx.unsupported(ty, "map_type"));
            };
            let use_key = ctx.tracks(key_ty);
            if !use_key && !ctx.tracks(value_ty) {
                return Err(ctx.unsupported(ty, "map without locator key or value"));
            }

            let mut out = Triples::new();
            for item in literal_items(body) {
                let (key, value) =
                    keyed_parts(item).ok_or_else(|| ctx.unsupported(item, item.kind()))?;
                let (side_ty, side) = if use_key {
                    (key_ty, key)
                } else {
                    (value_ty, value)
                };
                out.extend(resolve_element(side_ty, side, ctx, depth)?);
            }
            Ok(out)
        }
        "pointer_type" | "parenthesized_type" => {
            let inner = ty
                .named_children()
                .into_iter()
                .next()
                .ok_or_else(|| ctx.unsupported(ty, ty.kind()))?;
            resolve_typed(inner, body, ctx, depth + 1)
        }
        _ if ctx.is_tracked(ty) => triple_from_fields(body, ctx, depth),
        _ => match underlying_collection(ty, ctx) {
            Some(underlying) => resolve_typed(underlying, body, ctx, depth + 1),
            None => Err(ctx.unsupported(ty, "composite literal of untracked type")),
        },
    }
}

fn resolve_element<'a>(
    element_ty: Located<'a>,
    value: Located<'a>,
    ctx: &ResolveContext<'_, 'a>,
    depth: usize,
) -> Result<Triples, ResolveError> {
    if value.kind() == "literal_value" {
        resolve_typed(element_ty, value, ctx, depth + 1)
    } else {
        ctx.resolve(value, depth + 1)
    }
}

/// Underlying slice or map type of a named corpus type such as
/// `type Resources []schema.GroupVersionResource`.
fn underlying_collection<'a>(ty: Located<'a>, ctx: &ResolveContext<'_, 'a>) -> Option<Located<'a>> {
    let Origin::Named { module, type_name } = ctx.oracle().type_origin(ty)? else {
        return None;
    };
    let spec = ctx.corpus().find_type_spec(&module, &type_name)?;
    let underlying = spec.child("type")?;
    matches!(
        underlying.kind(),
        "slice_type" | "array_type" | "map_type" | "qualified_type"
    )
    .then_some(underlying)
}

/// Builds triples from a struct literal body, keyed by field name or
/// positional in (domain, version, kind) order.
fn triple_from_fields<'a>(
    body: Located<'a>,
    ctx: &ResolveContext<'_, 'a>,
    depth: usize,
) -> Result<Triples, ResolveError> {
    let items = literal_items(body);
    let mut fields: [BTreeSet<String>; 3] = Default::default();

    if items.iter().all(|i| i.kind() == "keyed_element") {
        for item in items {
            let (key, value) =
                keyed_parts(item).ok_or_else(|| ctx.unsupported(item, item.kind()))?;
            if let Some(position) = ctx.locator().field_position(key.text()) {
                fields[position] = ctx.strings(value, depth + 1)?;
            }
        }
    } else {
        if items.len() != fields.len() {
            return Err(ctx.unsupported(body, "positional literal with missing fields"));
        }
        for (position, item) in items.into_iter().enumerate() {
            fields[position] = ctx.strings(unwrap_element(item), depth + 1)?;
        }
    }

    let [domains, versions, kinds] = fields.map(|f| {
        if f.is_empty() {
            BTreeSet::from([String::new()])
        } else {
            f
        }
    });
    Ok(strings::combine(&domains, &versions, &kinds))
}

fn literal_items(body: Located<'_>) -> Vec<Located<'_>> {
    body.named_children()
        .into_iter()
        .filter(|c| matches!(c.kind(), "literal_element" | "keyed_element"))
        .collect()
}

fn unwrap_element(item: Located<'_>) -> Located<'_> {
    if item.kind() == "literal_element" {
        item.named_children().into_iter().next().unwrap_or(item)
    } else {
        item
    }
}

fn keyed_parts(item: Located<'_>) -> Option<(Located<'_>, Located<'_>)> {
    if item.kind() != "keyed_element" {
        return None;
    }
    let (key, value) = match (item.child("key"), item.child("value")) {
        (Some(key), Some(value)) => (key, value),
        _ => {
            let children = item.named_children();
            (*children.first()?, *children.get(1)?)
        }
    };
    Some((unwrap_element(key), unwrap_element(value)))
}
