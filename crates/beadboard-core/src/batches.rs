//! Dependency batch projection.
//!
//! Pure derivation from `(issues_with_deps, root_id)` to execution
//! layers: batch 0 holds issues with no unresolved dependency inside
//! the set, batch 1 holds issues whose dependencies are all in batch 0,
//! and so on. Issues caught in a dependency cycle never become ready
//! and are appended as a final batch.
//!
//! Deterministic by construction - ties are broken by issue id - so
//! the store can recompute freely on every refresh.

use std::collections::{HashMap, HashSet};

use im::Vector;
use itertools::Itertools;

use crate::model::{Batch, IssueWithDeps};

/// Compute execution batches for the issues of a selected root.
///
/// The root itself is excluded; dependency edges pointing outside the
/// given set (including to the root) are treated as already satisfied.
/// Same inputs always produce structurally identical output.
#[must_use]
pub fn compute_batches(issues: &Vector<IssueWithDeps>, root_id: &str) -> Vec<Batch> {
    let members: HashMap<&str, &IssueWithDeps> = issues
        .iter()
        .filter(|issue| issue.id() != root_id)
        .map(|issue| (issue.id(), issue))
        .collect();

    // Unresolved in-set dependencies per member
    let mut unresolved: HashMap<&str, HashSet<&str>> = members
        .iter()
        .map(|(id, issue)| {
            let deps: HashSet<&str> = issue
                .depends_on
                .iter()
                .map(String::as_str)
                .filter(|dep| *dep != *id && members.contains_key(dep))
                .collect();
            (*id, deps)
        })
        .collect();

    let mut batches = Vec::new();

    while !unresolved.is_empty() {
        let ready: Vec<&str> = unresolved
            .iter()
            .filter(|(_, deps)| deps.is_empty())
            .map(|(id, _)| *id)
            .sorted()
            .collect();

        if ready.is_empty() {
            // Cycle remainder: nothing can become ready, emit the rest
            // as one final batch in id order
            let rest: Vec<IssueWithDeps> = unresolved
                .keys()
                .sorted()
                .filter_map(|id| members.get(id).map(|issue| (*issue).clone()))
                .collect();
            batches.push(Batch {
                index: batches.len(),
                issues: rest,
            });
            break;
        }

        let layer: Vec<IssueWithDeps> = ready
            .iter()
            .filter_map(|id| members.get(id).map(|issue| (*issue).clone()))
            .collect();

        for id in &ready {
            unresolved.remove(id);
        }
        for deps in unresolved.values_mut() {
            for id in &ready {
                deps.remove(id);
            }
        }

        batches.push(Batch {
            index: batches.len(),
            issues: layer,
        });
    }

    batches
}
