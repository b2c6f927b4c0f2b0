//! Python binding layer for motif conservation scoring.
//!
//! Provides Python functions for computing BBLS/BLS score pairs from
//! newick trees and per-leaf motif score tables.

use pyo3::exceptions::PyValueError;
use pyo3::prelude::*;
use std::collections::HashMap;

use crate::error::BblsError;
use crate::io::{ensure_valid_score, load_tree_and_scores};
use crate::score::{compute_scores, score_sites as score_sites_over};
use crate::tree::MotifTree;

fn to_py_err(e: BblsError) -> PyErr {
    PyValueError::new_err(e.to_string())
}

/// Compute the BBLS/BLS score pair for one tree and one score table.
///
/// Args:
///     newick: Rooted tree in newick format with branch lengths on every edge
///     scores: Mapping from leaf identifier to motif probability in [0, 1]
///
/// Returns:
///     A (bbls, bls) tuple of floats.
///
/// Raises:
///     ValueError: If the newick is malformed, a score is out of range, or
///     the tree's leaf set does not match the score table's keys
#[pyfunction]
fn score_site(newick: &str, scores: HashMap<String, f64>) -> PyResult<(f64, f64)> {
    for (identifier, &score) in &scores {
        ensure_valid_score(identifier, score).map_err(to_py_err)?;
    }
    let tree = MotifTree::from_newick(newick).map_err(to_py_err)?;
    compute_scores(&tree, &scores).map_err(to_py_err)
}

/// Compute the BBLS/BLS score pair from files on disk.
///
/// Args:
///     tree_path: Newick tree file (gzip-compressed if it ends in .gz)
///     scores_path: File of `<identifier> <score>` lines (.gz supported);
///         pass the tree path again when one file carries the tree line
///         first and the score table after it
///
/// Returns:
///     A (bbls, bls) tuple of floats.
///
/// Raises:
///     ValueError: If either file is unreadable, malformed, or inconsistent
///     with the other
#[pyfunction]
fn score_files(tree_path: &str, scores_path: &str) -> PyResult<(f64, f64)> {
    let (tree, scores) = load_tree_and_scores(tree_path, scores_path).map_err(to_py_err)?;
    compute_scores(&tree, &scores).map_err(to_py_err)
}

/// Compute BBLS/BLS score pairs for many motif sites against one tree.
///
/// The null score is computed once and shared across sites; the observed
/// runs are independent and scored in parallel.
///
/// Args:
///     newick: Rooted tree in newick format with branch lengths on every edge
///     sites: List of per-site score tables (leaf identifier to probability)
///
/// Returns:
///     A list of (bbls, bls) tuples, one per site, in input order.
///
/// Raises:
///     ValueError: If the tree is malformed or any site fails validation
#[pyfunction]
fn score_sites(newick: &str, sites: Vec<HashMap<String, f64>>) -> PyResult<Vec<(f64, f64)>> {
    for site in &sites {
        for (identifier, &score) in site {
            ensure_valid_score(identifier, score).map_err(to_py_err)?;
        }
    }
    let tree = MotifTree::from_newick(newick).map_err(to_py_err)?;
    score_sites_over(&tree, &sites).map_err(to_py_err)
}

/// Python module definition
#[pymodule]
fn bbls(m: &Bound<'_, PyModule>) -> PyResult<()> {
    m.add_function(wrap_pyfunction!(score_site, m)?)?;
    m.add_function(wrap_pyfunction!(score_files, m)?)?;
    m.add_function(wrap_pyfunction!(score_sites, m)?)?;
    Ok(())
}
