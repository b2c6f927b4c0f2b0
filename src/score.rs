//! Aggregation of an annotated tree into BBLS and BLS values.
//!
//! The observed score (BBLS) and the all-ones null score (BLS) both come
//! out of the same annotate-then-aggregate pipeline; the null run only
//! differs in the score table it is given. Runs never share a tree, each
//! one annotates its own fresh copy.

use std::collections::HashMap;

use rayon::prelude::*;

use crate::annotate::annotate;
use crate::error::BblsResult;
use crate::tree::MotifTree;

/// Reduce a fully annotated tree to a single branch length score.
///
/// Every internal node contributes its complement probability, times the
/// product of its children's occurrence probabilities, times the sum of
/// its children's effective lengths. The product and the sum accumulate
/// over the same children but combine only at the end. Leaves contribute
/// through their parents only.
///
/// # Panics
/// Panics if the tree has not been annotated.
pub fn score_annotated(tree: &MotifTree) -> f64 {
    let mut total = 0.0;
    for (id, node) in tree.nodes() {
        if node.is_leaf() {
            continue;
        }
        let mut prob_product = 1.0;
        let mut length_sum = 0.0;
        for &child in &node.children {
            prob_product *= tree.probability_of(child);
            length_sum += tree.effective_length_of(child);
        }
        total += tree.complement_of(id) * prob_product * length_sum;
    }
    total
}

/// A score table assigning every leaf the full score of 1.
pub fn unit_scores(tree: &MotifTree) -> HashMap<String, f64> {
    tree.leaf_names().map(|name| (name.to_string(), 1.0)).collect()
}

/// Compute the (BBLS, BLS) pair for one tree and one motif score table.
///
/// # Errors
/// Propagates [`crate::error::BblsError::TopologyMismatch`] when the score
/// table does not cover the tree's leaves.
pub fn compute_scores(
    tree: &MotifTree,
    scores: &HashMap<String, f64>,
) -> BblsResult<(f64, f64)> {
    let mut observed = tree.unannotated_copy();
    annotate(&mut observed, scores)?;
    let bbls = score_annotated(&observed);

    let mut null = tree.unannotated_copy();
    annotate(&mut null, &unit_scores(tree))?;
    let bls = score_annotated(&null);

    Ok((bbls, bls))
}

/// Compute (BBLS, BLS) pairs for many motif sites against one tree.
///
/// The null score does not depend on the per-site tables, so it is
/// computed once and shared; the observed runs are independent and scored
/// in parallel.
pub fn score_sites(
    tree: &MotifTree,
    sites: &[HashMap<String, f64>],
) -> BblsResult<Vec<(f64, f64)>> {
    let mut null = tree.unannotated_copy();
    annotate(&mut null, &unit_scores(tree))?;
    let bls = score_annotated(&null);

    sites
        .par_iter()
        .map(|scores| {
            let mut observed = tree.unannotated_copy();
            annotate(&mut observed, scores)?;
            Ok((score_annotated(&observed), bls))
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    const FIXTURE: &str = "(((aa:1,bb:3)z:10,cc:5)y:100,dd:7)R:0;";

    fn scores_of(pairs: &[(&str, f64)]) -> HashMap<String, f64> {
        pairs.iter().map(|&(n, s)| (n.to_string(), s)).collect()
    }

    fn half_scores() -> HashMap<String, f64> {
        scores_of(&[("aa", 0.5), ("bb", 0.5), ("cc", 0.5), ("dd", 0.5)])
    }

    #[test]
    fn golden_fixture_scores_are_pinned() {
        let tree = MotifTree::from_newick(FIXTURE).unwrap();
        let (bbls, bls) = compute_scores(&tree, &half_scores()).unwrap();
        assert_eq!(bbls, 56.375);
        assert_eq!(bls, 126.0);
    }

    #[test]
    fn null_score_equals_total_branch_length() {
        let tree = MotifTree::from_newick(FIXTURE).unwrap();
        let (_, bls) = compute_scores(&tree, &half_scores()).unwrap();
        assert_eq!(bls, tree.total_branch_length());
    }

    #[test]
    fn all_ones_table_reproduces_the_null_score() {
        // BLS must come from the same code path, not a separate formula.
        let tree = MotifTree::from_newick(FIXTURE).unwrap();
        let (bbls, bls) = compute_scores(&tree, &unit_scores(&tree)).unwrap();
        assert_eq!(bbls, bls);
    }

    #[test]
    fn observed_score_never_exceeds_the_null_score() {
        let tree = MotifTree::from_newick(FIXTURE).unwrap();
        let tables = [
            scores_of(&[("aa", 0.0), ("bb", 0.0), ("cc", 0.0), ("dd", 0.0)]),
            scores_of(&[("aa", 0.1), ("bb", 0.9), ("cc", 0.3), ("dd", 0.7)]),
            scores_of(&[("aa", 1.0), ("bb", 0.2), ("cc", 0.8), ("dd", 0.05)]),
            scores_of(&[("aa", 1.0), ("bb", 1.0), ("cc", 1.0), ("dd", 1.0)]),
        ];
        for table in &tables {
            let (bbls, bls) = compute_scores(&tree, table).unwrap();
            assert!(bbls <= bls, "bbls {bbls} > bls {bls} for {table:?}");
        }
    }

    #[test]
    fn zero_scores_give_zero_observed_score() {
        let tree = MotifTree::from_newick(FIXTURE).unwrap();
        let zeros = scores_of(&[("aa", 0.0), ("bb", 0.0), ("cc", 0.0), ("dd", 0.0)]);
        let (bbls, bls) = compute_scores(&tree, &zeros).unwrap();
        assert_eq!(bbls, 0.0);
        assert_eq!(bls, 126.0);
    }

    #[test]
    fn repeated_runs_are_bit_identical() {
        let tree = MotifTree::from_newick(FIXTURE).unwrap();
        let first = compute_scores(&tree, &half_scores()).unwrap();
        let second = compute_scores(&tree, &half_scores()).unwrap();
        assert_eq!(first, second);

        let fresh = MotifTree::from_newick(FIXTURE).unwrap();
        assert_eq!(compute_scores(&fresh, &half_scores()).unwrap(), first);
    }

    #[test]
    fn single_leaf_under_root_scores() {
        let tree = MotifTree::from_newick("(aa:5)r;").unwrap();
        let (bbls, bls) = compute_scores(&tree, &scores_of(&[("aa", 0.0)])).unwrap();
        assert_eq!(bbls, 0.0);
        assert_eq!(bls, 5.0);
    }

    #[test]
    fn batch_scoring_matches_the_single_site_path() {
        let tree = MotifTree::from_newick(FIXTURE).unwrap();
        let sites = vec![
            half_scores(),
            scores_of(&[("aa", 0.1), ("bb", 0.9), ("cc", 0.3), ("dd", 0.7)]),
            scores_of(&[("aa", 1.0), ("bb", 1.0), ("cc", 1.0), ("dd", 1.0)]),
        ];
        let batch = score_sites(&tree, &sites).unwrap();
        assert_eq!(batch.len(), sites.len());
        for (result, site) in batch.iter().zip(&sites) {
            assert_eq!(*result, compute_scores(&tree, site).unwrap());
        }
    }

    #[test]
    fn batch_scoring_surfaces_bad_sites() {
        let tree = MotifTree::from_newick(FIXTURE).unwrap();
        let sites = vec![half_scores(), scores_of(&[("aa", 0.5)])];
        assert!(score_sites(&tree, &sites).is_err());
    }
}
