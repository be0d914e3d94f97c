//! Helper closures by fixed-point substitution.
//!
//! Each pass replaces every helper reference in a record with the current
//! children of the referenced record. Once no record holds a reference, the
//! remaining API leaves are that helper's closure.

use crate::config::DEFAULT_MAX_PASSES;
use crate::error::AnalysisError;
use crate::model::FunctionIdentity;
use crate::tree::{ApiUsage, HelperChild, HelperRecord};
use serde::Serialize;
use std::collections::btree_map::Entry;
use std::collections::{BTreeMap, BTreeSet};
use tracing::{debug, trace, warn};

/// Helper records keyed by identity hash.
pub type HelperMap = BTreeMap<String, HelperRecord>;

/// Resolved closure of one helper.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ResolvedHelper {
    pub identity: FunctionIdentity,
    /// Deduplicated, ordered by usage key.
    pub usages: Vec<ApiUsage>,
}

pub type Closures = BTreeMap<String, ResolvedHelper>;

/// Merges helper records from all files into one map.
///
/// Two records with the same identity are a [`AnalysisError::HelperCollision`]
/// unless `merge_duplicates` is set, in which case their children are
/// concatenated. Variants of one helper declared under different build
/// constraints always merge: the closure covers every platform.
pub fn collect_records<I>(records: I, merge_duplicates: bool) -> Result<HelperMap, AnalysisError>
where
    I: IntoIterator<Item = HelperRecord>,
{
    let mut map = HelperMap::new();
    for record in records {
        match map.entry(record.identity.hash_key()) {
            Entry::Vacant(slot) => {
                slot.insert(record);
            }
            Entry::Occupied(mut slot) if slot.get().is_build_variant_of(&record) => {
                warn!(
                    helper = %record.identity,
                    first = %slot.get().location,
                    second = %record.location,
                    "merging build variants of helper"
                );
                let merged = slot.get_mut();
                merged.children.extend(record.children);
                // the merged record stands for either variant
                merged.build_constraint = merge_constraints(
                    merged.build_constraint.take(),
                    record.build_constraint,
                );
            }
            Entry::Occupied(mut slot) => {
                if !merge_duplicates {
                    return Err(AnalysisError::HelperCollision {
                        identity: slot.key().clone(),
                        first: slot.get().location.clone(),
                        second: record.location,
                    });
                }
                warn!(
                    helper = %record.identity,
                    first = %slot.get().location,
                    second = %record.location,
                    "merging duplicate helper"
                );
                slot.get_mut().children.extend(record.children);
            }
        }
    }
    Ok(map)
}

fn merge_constraints(first: Option<String>, second: Option<String>) -> Option<String> {
    match (first, second) {
        (Some(a), Some(b)) => Some(format!("({a}) || ({b})")),
        _ => None,
    }
}

#[derive(Debug, Clone)]
pub struct HelperClosureResolver {
    max_passes: usize,
}

impl Default for HelperClosureResolver {
    fn default() -> Self {
        Self::new(DEFAULT_MAX_PASSES)
    }
}

impl HelperClosureResolver {
    pub fn new(max_passes: usize) -> Self {
        Self { max_passes }
    }

    pub fn max_passes(&self) -> usize {
        self.max_passes
    }

    pub fn resolve(&self, mut records: HelperMap) -> Result<Closures, AnalysisError> {
        let mut passes = 0;
        while !converged(&records) {
            if passes == self.max_passes {
                let unresolved = records
                    .iter()
                    .filter(|(_, r)| r.children.iter().any(HelperChild::is_helper))
                    .map(|(key, _)| key.clone())
                    .collect();
                return Err(AnalysisError::UnresolvedHelperAfterMaxPasses {
                    passes: self.max_passes,
                    unresolved,
                });
            }
            passes += 1;
            relax(&mut records);
            trace!(pass = passes, "helper relaxation pass done");
        }
        debug!(helpers = records.len(), passes, "helper closures converged");

        Ok(records
            .into_iter()
            .map(|(key, record)| {
                let usages = canonical(record.children.into_iter().filter_map(|c| match c {
                    HelperChild::Api { usage } => Some(usage),
                    HelperChild::Helper { .. } => None,
                }));
                (
                    key,
                    ResolvedHelper {
                        identity: record.identity,
                        usages,
                    },
                )
            })
            .collect())
    }
}

fn converged(records: &HelperMap) -> bool {
    records
        .values()
        .all(|r| !r.children.iter().any(HelperChild::is_helper))
}

/// One substitution pass. Records updated earlier in the pass are seen with
/// their new children by records updated later.
fn relax(records: &mut HelperMap) {
    let keys: Vec<String> = records.keys().cloned().collect();
    for key in keys {
        let Some(record) = records.get(&key) else {
            continue;
        };
        let mut next = BTreeSet::new();
        for child in &record.children {
            match child {
                HelperChild::Helper { identity } if *identity == record.identity => {}
                HelperChild::Helper { identity } => match records.get(&identity.hash_key()) {
                    Some(target) => next.extend(target.children.iter().cloned()),
                    None => trace!(helper = %identity, "reference without a record dropped"),
                },
                api => {
                    next.insert(api.clone());
                }
            }
        }
        if let Some(record) = records.get_mut(&key) {
            record.children = next.into_iter().collect();
        }
    }
}

/// Deduplicates usages by key and orders them by key.
pub fn canonical<I: IntoIterator<Item = ApiUsage>>(usages: I) -> Vec<ApiUsage> {
    let by_key: BTreeMap<String, ApiUsage> = usages.into_iter().map(|u| (u.key(), u)).collect();
    by_key.into_values().collect()
}
