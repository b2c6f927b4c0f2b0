//! Owned, annotatable tree model for motif conservation scoring.
//!
//! # Overview
//! A `MotifTree` is extracted once from a parsed `phylotree` tree and owns
//! everything the scoring passes need: topology, branch lengths, leaf names,
//! and one slot per node for each of the three computed annotations
//! (occurrence probability, complement probability, effective length).
//! The annotations are first-class fields that start out undefined and are
//! filled in by the annotation passes, so no state is ever bolted onto a
//! foreign tree type at runtime.
//!
//! # Layout
//! Nodes live in an arena `Vec<Node>` and reference each other by index.
//! The arena is filled in depth-first pre-order, so index 0 is always the
//! root, and each node's `children` keep the order of the source newick.
//! Traversal orders are produced with explicit stacks, never recursion, so
//! deep trees cannot overflow the call stack.

use crate::error::{BblsError, BblsResult};
use phylotree::tree::Tree as PhyloTree;
use std::fmt::Write;

/// Index of a node in the tree arena.
pub type NodeId = usize;

/// One node of a [`MotifTree`].
///
/// # Fields
/// - `name`: leaf identifier; always present and non-empty for leaves,
///   optional for internal nodes and the root.
/// - `branch_length`: length of the edge to the parent (the root keeps the
///   value from the newick, 0 when none was given; it never denotes an edge
///   to an ancestor).
/// - `parent` / `children`: arena indices; the arena owns every node, the
///   parent link is only a back-reference.
/// - `probability` / `complement_probability` / `effective_length`: the
///   computed annotations, `None` until the annotation passes define them.
#[derive(Debug, Clone)]
pub struct Node {
    pub name: Option<String>,
    pub branch_length: f64,
    pub parent: Option<NodeId>,
    pub children: Vec<NodeId>,
    pub probability: Option<f64>,
    pub complement_probability: Option<f64>,
    pub effective_length: Option<f64>,
}

impl Node {
    fn new(name: Option<String>, branch_length: f64, parent: Option<NodeId>) -> Self {
        Node {
            name,
            branch_length,
            parent,
            children: Vec::new(),
            probability: None,
            complement_probability: None,
            effective_length: None,
        }
    }

    /// A node with no children is a leaf (an observed taxon).
    pub fn is_leaf(&self) -> bool {
        self.children.is_empty()
    }
}

/// A rooted multiway tree with per-node annotation slots.
#[derive(Debug, Clone)]
pub struct MotifTree {
    nodes: Vec<Node>,
    root: NodeId,
}

impl MotifTree {
    /// Parse a newick string and extract an unannotated tree from it.
    ///
    /// # Errors
    /// Fails with [`BblsError::Format`] when the newick is malformed or the
    /// tree violates the input contract (see [`MotifTree::from_phylo`]).
    pub fn from_newick(newick: &str) -> BblsResult<Self> {
        let parsed = PhyloTree::from_newick(newick)
            .map_err(|e| BblsError::Format(format!("invalid newick: {e}")))?;
        Self::from_phylo(&parsed)
    }

    /// Extract an owned tree from a parsed `phylotree` tree.
    ///
    /// # Algorithm
    /// Walks the source tree from its root with an explicit stack, copying
    /// each node into the arena in depth-first pre-order and re-linking
    /// parent/child references as arena indices. Children keep their source
    /// order.
    ///
    /// # Errors
    /// Fails with [`BblsError::Format`] when
    /// - a non-root edge carries no branch length (lengths are required on
    ///   every edge),
    /// - a branch length is negative, or
    /// - a leaf has no name (leaves must carry the identifier used to look
    ///   up its motif score).
    pub fn from_phylo(source: &PhyloTree) -> BblsResult<Self> {
        let source_root = source
            .get_root()
            .map_err(|e| BblsError::Format(format!("tree has no root: {e}")))?;

        let mut nodes: Vec<Node> = Vec::new();
        let mut stack = vec![(source_root, None::<NodeId>)];

        while let Some((source_id, parent)) = stack.pop() {
            let src = source
                .get(&source_id)
                .map_err(|e| BblsError::Format(format!("malformed tree: {e}")))?;

            let name = src.name.clone().filter(|n| !n.is_empty());
            let label = name.as_deref().unwrap_or("an unnamed node");

            let branch_length = match src.parent_edge {
                Some(length) => length,
                // The root has no edge to an ancestor; 0 is its convention.
                None if parent.is_none() => 0.0,
                None => {
                    return Err(BblsError::Format(format!(
                        "missing branch length on the edge above {label}"
                    )));
                }
            };
            if branch_length < 0.0 {
                return Err(BblsError::Format(format!(
                    "negative branch length ({branch_length}) above {label}"
                )));
            }
            if src.children.is_empty() && name.is_none() {
                return Err(BblsError::Format(
                    "tree contains an unnamed leaf".to_string(),
                ));
            }

            let id = nodes.len();
            nodes.push(Node::new(name, branch_length, parent));
            if let Some(parent) = parent {
                nodes[parent].children.push(id);
            }
            // Reversed so the first child is allocated (and visited) first.
            for &child in src.children.iter().rev() {
                stack.push((child, Some(id)));
            }
        }

        Ok(MotifTree { nodes, root: 0 })
    }

    pub fn root(&self) -> NodeId {
        self.root
    }

    pub fn num_nodes(&self) -> usize {
        self.nodes.len()
    }

    pub fn num_leaves(&self) -> usize {
        self.nodes.iter().filter(|n| n.is_leaf()).count()
    }

    /// All nodes with their arena ids, in arena (pre-)order.
    pub fn nodes(&self) -> impl Iterator<Item = (NodeId, &Node)> {
        self.nodes.iter().enumerate()
    }

    /// Names of all leaves, in arena order. Every leaf is named by
    /// construction.
    pub fn leaf_names(&self) -> impl Iterator<Item = &str> {
        self.nodes
            .iter()
            .filter(|n| n.is_leaf())
            .filter_map(|n| n.name.as_deref())
    }

    /// Sum of all branch lengths below the root (the root's own value is
    /// not an edge of the tree).
    pub fn total_branch_length(&self) -> f64 {
        self.nodes
            .iter()
            .enumerate()
            .filter(|&(id, _)| id != self.root)
            .map(|(_, n)| n.branch_length)
            .sum()
    }

    /// Node ids in post-order: every node appears strictly after all of its
    /// children. Uses an explicit stack of `(id, children_expanded)` pairs.
    pub fn postorder(&self) -> Vec<NodeId> {
        let mut order = Vec::with_capacity(self.nodes.len());
        let mut stack = vec![(self.root, false)];
        while let Some((id, expanded)) = stack.pop() {
            let node = &self.nodes[id];
            if expanded || node.is_leaf() {
                order.push(id);
            } else {
                stack.push((id, true));
                for &child in node.children.iter().rev() {
                    stack.push((child, false));
                }
            }
        }
        order
    }

    /// Node ids in pre-order: every node appears strictly before all of its
    /// children.
    pub fn preorder(&self) -> Vec<NodeId> {
        let mut order = Vec::with_capacity(self.nodes.len());
        let mut stack = vec![self.root];
        while let Some(id) = stack.pop() {
            order.push(id);
            for &child in self.nodes[id].children.iter().rev() {
                stack.push(child);
            }
        }
        order
    }

    /// A structurally identical tree (same topology, names, and branch
    /// lengths) with every annotation cleared.
    ///
    /// This is how the null-model (all scores forced to 1) run gets its own
    /// tree: a fresh construction rather than a deep copy of annotated
    /// state, so the two score computations never share mutable data.
    pub fn unannotated_copy(&self) -> Self {
        let nodes = self
            .nodes
            .iter()
            .map(|n| {
                let mut bare = Node::new(n.name.clone(), n.branch_length, n.parent);
                bare.children = n.children.clone();
                bare
            })
            .collect();
        MotifTree {
            nodes,
            root: self.root,
        }
    }

    /// Occurrence probability of a node.
    ///
    /// # Panics
    /// Panics if the probability passes have not defined the value.
    pub fn probability_of(&self, id: NodeId) -> f64 {
        self.nodes[id].probability.expect("probability set")
    }

    /// Complement probability of a node.
    ///
    /// # Panics
    /// Panics if the complement pass has not defined the value.
    pub fn complement_of(&self, id: NodeId) -> f64 {
        self.nodes[id]
            .complement_probability
            .expect("complement probability set")
    }

    /// Effective length of a node.
    ///
    /// # Panics
    /// Panics if initialization has not defined the value.
    pub fn effective_length_of(&self, id: NodeId) -> f64 {
        self.nodes[id].effective_length.expect("effective length set")
    }

    /// Render the annotation state as text, one depth-indented row per node
    /// in pre-order. Undefined annotations show as `-`, unnamed nodes as
    /// `*`. Intended for verbose diagnostics, not for machine parsing.
    pub fn state_table(&self) -> String {
        fn cell(value: Option<f64>) -> String {
            value.map_or_else(|| "-".to_string(), |v| v.to_string())
        }

        let mut out = String::new();
        let mut stack = vec![(self.root, 0usize)];
        while let Some((id, depth)) = stack.pop() {
            let node = &self.nodes[id];
            let name = node.name.as_deref().unwrap_or("*");
            let _ = writeln!(
                out,
                "{:indent$}{name}  P={p} Q={q} L={l}",
                "",
                indent = depth * 2,
                p = cell(node.probability),
                q = cell(node.complement_probability),
                l = cell(node.effective_length),
            );
            for &child in node.children.iter().rev() {
                stack.push((child, depth + 1));
            }
        }
        out
    }
}

impl std::ops::Index<NodeId> for MotifTree {
    type Output = Node;

    fn index(&self, id: NodeId) -> &Node {
        &self.nodes[id]
    }
}

impl std::ops::IndexMut<NodeId> for MotifTree {
    fn index_mut(&mut self, id: NodeId) -> &mut Node {
        &mut self.nodes[id]
    }
}
