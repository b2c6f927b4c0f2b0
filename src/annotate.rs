//! The annotation passes that prepare a tree for scoring.
//!
//! Annotation attaches three scalars to every node in four sequential
//! passes:
//!
//! 1. initialization seeds leaf probabilities from the motif score table
//!    and every effective length from the node's own branch length,
//! 2. a post-order pass derives each internal node's occurrence
//!    probability from its children,
//! 3. a second post-order pass folds the children's probability-weighted
//!    effective lengths into each internal node, and
//! 4. a pre-order pass pushes complement probabilities from the root down
//!    to every node, leaves included.
//!
//! The order is fixed: the length pass divides by probabilities from the
//! probability pass, and the complement pass reads sibling probabilities.
//! A sibling that is a leaf contributes the raw motif score it was given
//! during initialization.

use std::collections::{HashMap, HashSet};

use itertools::Itertools;

use crate::error::{BblsError, BblsResult};
use crate::tree::MotifTree;

/// True iff the tree's leaf names and the score table's keys are the same
/// set.
pub fn leaves_match_scores(tree: &MotifTree, scores: &HashMap<String, f64>) -> bool {
    let leaves: HashSet<&str> = tree.leaf_names().collect();
    let keys: HashSet<&str> = scores.keys().map(String::as_str).collect();
    leaves == keys
}

/// Check the tree against the score table, reporting every identifier
/// that appears on one side only.
pub fn ensure_match(tree: &MotifTree, scores: &HashMap<String, f64>) -> BblsResult<()> {
    let leaves: HashSet<&str> = tree.leaf_names().collect();
    let keys: HashSet<&str> = scores.keys().map(String::as_str).collect();
    if leaves == keys {
        return Ok(());
    }

    let mut parts = Vec::new();
    let unscored = leaves.difference(&keys).sorted().join(", ");
    if !unscored.is_empty() {
        parts.push(format!("leaves without a score: {unscored}"));
    }
    let unknown = keys.difference(&leaves).sorted().join(", ");
    if !unknown.is_empty() {
        parts.push(format!("scores without a leaf: {unknown}"));
    }
    Err(BblsError::TopologyMismatch(parts.join("; ")))
}

/// Run all four annotation passes on `tree`.
///
/// # Errors
/// Fails with [`BblsError::TopologyMismatch`] before touching the tree
/// when the score table does not cover exactly the tree's leaves.
pub fn annotate(tree: &mut MotifTree, scores: &HashMap<String, f64>) -> BblsResult<()> {
    ensure_match(tree, scores)?;
    initialize(tree, scores);
    occurrence_probabilities(tree);
    effective_lengths(tree);
    complement_probabilities(tree);
    Ok(())
}

/// Seed the annotations: every effective length starts as the node's own
/// branch length, the root's complement probability is fixed at 1, and
/// each leaf's occurrence probability is copied from the score table.
fn initialize(tree: &mut MotifTree, scores: &HashMap<String, f64>) {
    let root = tree.root();
    for id in 0..tree.num_nodes() {
        let branch_length = tree[id].branch_length;
        tree[id].effective_length = Some(branch_length);
        if id == root {
            tree[id].complement_probability = Some(1.0);
        } else if tree[id].is_leaf() {
            let name = tree[id].name.as_deref().expect("leaves are named");
            let score = *scores.get(name).expect("every leaf has a score");
            tree[id].probability = Some(score);
        }
    }
}

/// Post-order: an internal node carries the motif iff at least one child
/// does, so its probability is one minus the chance that no child does.
fn occurrence_probabilities(tree: &mut MotifTree) {
    for id in tree.postorder() {
        if tree[id].is_leaf() {
            continue;
        }
        let none_occurs: f64 = tree[id]
            .children
            .iter()
            .map(|&child| 1.0 - tree.probability_of(child))
            .product();
        tree[id].probability = Some(1.0 - none_occurs);
    }
}

/// Post-order: fold the children's probability-weighted effective lengths
/// into each internal node on top of its own branch length.
fn effective_lengths(tree: &mut MotifTree) {
    for id in tree.postorder() {
        if tree[id].is_leaf() {
            continue;
        }
        let probability = tree.probability_of(id);
        // An impossible occurrence contributes no conserved length, not
        // even its own branch.
        if probability == 0.0 {
            tree[id].effective_length = Some(0.0);
            continue;
        }
        let weighted: f64 = tree[id]
            .children
            .iter()
            .map(|&child| tree.probability_of(child) * tree.effective_length_of(child))
            .sum();
        let length = tree[id].branch_length + weighted / probability;
        tree[id].effective_length = Some(length);
    }
}

/// Pre-order: a node's complement probability is its parent's, discounted
/// by the chance that any sibling subtree already carries the motif. The
/// root's stays fixed at 1.
fn complement_probabilities(tree: &mut MotifTree) {
    let root = tree.root();
    for id in tree.preorder() {
        if id == root {
            tree[id].complement_probability = Some(1.0);
            continue;
        }
        let parent = tree[id].parent.expect("non-root nodes have a parent");
        let siblings_clear: f64 = tree[parent]
            .children
            .iter()
            .filter(|&&sibling| sibling != id)
            .map(|&sibling| 1.0 - tree.probability_of(sibling))
            .product();
        let complement = tree.complement_of(parent) * siblings_clear;
        tree[id].complement_probability = Some(complement);
    }
}
