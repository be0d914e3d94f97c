use super::{strings, LocatorType, Triples, ValueResolver};
use crate::error::ResolveError;
use crate::model::{Corpus, Located, TypeOracle};
use std::cell::RefCell;
use std::collections::{BTreeSet, HashSet};

/// Shared state for one resolution: the resolver itself, the type oracle
/// over the corpus, and the bindings currently being followed.
pub struct ResolveContext<'r, 'a> {
    resolver: &'r ValueResolver,
    oracle: &'r TypeOracle<'a>,
    following: RefCell<HashSet<(&'a str, usize)>>,
}

impl<'r, 'a> ResolveContext<'r, 'a> {
    pub fn new(resolver: &'r ValueResolver, oracle: &'r TypeOracle<'a>) -> Self {
        Self {
            resolver,
            oracle,
            following: RefCell::new(HashSet::new()),
        }
    }

    /// Runs `follow` over the value `name` is bound to. Binding hops do not
    /// count against the depth cap; reaching a binding that is already being
    /// followed is a [`ResolveError::CyclicBinding`].
    pub fn follow_binding<T>(
        &self,
        name: Located<'a>,
        value: Located<'a>,
        follow: impl FnOnce() -> Result<T, ResolveError>,
    ) -> Result<T, ResolveError> {
        let key = (value.file.path.as_str(), value.node.id());
        let fresh = self.following.borrow_mut().insert(key);
        if !fresh {
            return Err(ResolveError::cyclic(name.text(), name.location()));
        }
        let result = follow();
        self.following.borrow_mut().remove(&key);
        result
    }

    pub fn resolve(&self, expr: Located<'a>, depth: usize) -> Result<Triples, ResolveError> {
        self.resolver.resolve_at(expr, self, depth)
    }

    pub fn strings(
        &self,
        expr: Located<'a>,
        depth: usize,
    ) -> Result<BTreeSet<String>, ResolveError> {
        strings::resolve(expr, self, depth)
    }

    pub fn oracle(&self) -> &'r TypeOracle<'a> {
        self.oracle
    }

    pub fn corpus(&self) -> &'a Corpus {
        self.oracle.corpus()
    }

    pub fn locator(&self) -> &'r LocatorType {
        self.resolver.locator()
    }

    pub fn check_depth(&self, expr: Located<'a>, depth: usize) -> Result<(), ResolveError> {
        if depth >= self.resolver.max_depth() {
            return Err(ResolveError::DepthExceeded {
                max_depth: self.resolver.max_depth(),
                location: expr.location(),
            });
        }
        Ok(())
    }

    pub fn unsupported(&self, expr: Located<'a>, shape: &str) -> ResolveError {
        ResolveError::unsupported(shape, expr.snippet(), expr.location())
    }

    /// Whether `ty` names the tracked locator type.
    pub fn is_tracked(&self, ty: Located<'a>) -> bool {
        let locator = self.locator();
        self.oracle
            .is_named_type(ty, &locator.module, &locator.type_name)
    }

    /// Whether values of `ty` carry locators: the tracked type itself or any
    /// slice, array, pointer or map built from it.
    pub fn tracks(&self, ty: Located<'a>) -> bool {
        match ty.kind() {
            "slice_type" | "array_type" | "implicit_length_array_type" => {
                ty.child("element").is_some_and(|e| self.tracks(e))
            }
            "map_type" => {
                ty.child("key").is_some_and(|k| self.tracks(k))
                    || ty.child("value").is_some_and(|v| self.tracks(v))
            }
            "parenthesized_type" => ty
                .named_children()
                .into_iter()
                .next()
                .is_some_and(|inner| self.tracks(inner)),
            "pointer_type" => ty
                .named_children()
                .into_iter()
                .next()
                .is_some_and(|inner| self.tracks(inner)),
            _ => self.is_tracked(ty),
        }
    }
}
