//! A height balanced binary search tree that keeps duplicate keys.
//!
//! [`AvlTree`] stores every record in one arena. Distinct keys form an AVL tree,
//! records with a repeated key hang off their key's node in insertion order, and
//! all records are threaded on a doubly linked list in ascending key order.
//!
//! ```
//! use avl_tree::AvlTree;
//!
//! let mut tree = AvlTree::new();
//! for (k, v) in [(5, "a"), (3, "x"), (5, "b"), (8, "y"), (5, "c")] {
//!     tree.insert(k, v);
//! }
//!
//! assert_eq!(tree.len(), 5);
//! assert_eq!(tree.values().copied().collect::<Vec<_>>(), ["x", "a", "b", "c", "y"]);
//!
//! // deleting by key removes the newest duplicate first
//! assert_eq!(tree.delete(&5), Some((5, "c")));
//! assert_eq!(tree.get(&5), Some((&5, &"a")));
//! assert_eq!(tree.check_invariants(), Ok(()));
//! ```

#![deny(rust_2018_idioms)]
#![forbid(unsafe_code)]

mod arena;
mod compare;
mod error;
mod iter;
mod tracing_helpers;
mod tree;
mod validate;

pub use arena::Handle;
pub use compare::{Comparator, Natural};
pub use error::InvariantError;
pub use iter::{Cursor, Iter, Keys, Values};
pub use tree::AvlTree;
