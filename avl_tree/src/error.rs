//! Errors reported by [`AvlTree::check_invariants`].
//!
//! Lookups of absent keys are not errors, they return `None`. The only
//! failures the tree can describe are broken structural invariants, which
//! indicate a bug in the tree or a comparator that is not a total order.
//!
//! [`AvlTree::check_invariants`]: crate::AvlTree::check_invariants

use thiserror::Error;

use crate::Handle;

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum InvariantError {
    #[error("root node has a parent")]
    RootHasParent,

    #[error("child {child:?} does not point back to its parent")]
    BrokenParentLink { child: Handle },

    #[error("duplicate record {node:?} is linked into the tree structure")]
    DuplicateInTree { node: Handle },

    #[error("node {node:?} stores height {stored} but its subtrees give {expected}")]
    StaleHeight {
        node: Handle,
        stored: u32,
        expected: u32,
    },

    #[error("node {node:?} has balance factor {balance}")]
    Unbalanced { node: Handle, balance: i64 },

    #[error("node {node:?} is out of order relative to its neighbour")]
    OutOfOrder { node: Handle },

    #[error("node {node:?} in the duplicate chain does not share its canonical key")]
    BrokenChain { node: Handle },

    #[error("`prev` of node {node:?} does not point at the node before it")]
    BrokenListLink { node: Handle },

    #[error("order list diverges from the tree at position {position}")]
    ListMismatch { position: usize },

    #[error("tree reports {len} records but {reachable} are reachable")]
    LenMismatch { len: usize, reachable: usize },
}
