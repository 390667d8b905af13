use core::cmp::Ordering;

use crate::arena::NodeId;
use crate::compare::Comparator;
use crate::error::InvariantError;
use crate::tree::AvlTree;

impl<K, V, C> AvlTree<K, V, C>
where
    C: Comparator<K>,
{
    /// Verifies the structural invariants of the tree.
    ///
    /// Checks that every node is AVL balanced with an up to date height, that
    /// parent and child links agree, and that the order list holds exactly
    /// the in-order sequence of the tree with each key's duplicate chain
    /// right after its canonical record. Runs in O(n).
    pub fn check_invariants(&self) -> Result<(), InvariantError> {
        let mut expected = Vec::with_capacity(self.len);
        if let Some(root) = self.root {
            if self.nodes[root].parent.is_some() {
                return Err(InvariantError::RootHasParent);
            }
            self.check_subtree(root, &mut expected)?;
        }

        let mut position = 0;
        let mut prev: Option<NodeId> = None;
        let mut cursor = self.root.map(|root| self.nodes.min_of(root));
        while let Some(id) = cursor {
            let node = &self.nodes[id];
            if node.prev != prev {
                return Err(InvariantError::BrokenListLink {
                    node: self.nodes.handle(id),
                });
            }
            if expected.get(position) != Some(&id) {
                return Err(InvariantError::ListMismatch { position });
            }
            if let Some(prev) = prev {
                let ordering = self.cmp.compare(&self.nodes[prev].key, &node.key);
                let in_order = if node.is_duplicate() {
                    ordering == Ordering::Equal
                } else {
                    ordering == Ordering::Less
                };
                if !in_order {
                    return Err(InvariantError::OutOfOrder {
                        node: self.nodes.handle(id),
                    });
                }
            }

            position += 1;
            prev = Some(id);
            cursor = node.next;
        }

        if position != expected.len() {
            return Err(InvariantError::ListMismatch { position });
        }
        if self.len != position || self.nodes.live() != position {
            return Err(InvariantError::LenMismatch {
                len: self.len,
                reachable: position,
            });
        }

        Ok(())
    }

    /// Checks the subtree rooted at `node` and appends its expanded in-order
    /// sequence to `out`. Returns the subtree's height.
    fn check_subtree(&self, node: NodeId, out: &mut Vec<NodeId>) -> Result<u32, InvariantError> {
        let n = &self.nodes[node];
        let handle = self.nodes.handle(node);
        if n.is_duplicate() {
            return Err(InvariantError::DuplicateInTree { node: handle });
        }

        let child_height = |child: Option<NodeId>, out: &mut Vec<NodeId>, side: Ordering| {
            let Some(child) = child else {
                return Ok(0);
            };
            let child_handle = self.nodes.handle(child);
            if self.nodes[child].parent != Some(node) {
                return Err(InvariantError::BrokenParentLink {
                    child: child_handle,
                });
            }
            if self.cmp.compare(&self.nodes[child].key, &n.key) != side {
                return Err(InvariantError::OutOfOrder { node: child_handle });
            }
            self.check_subtree(child, out)
        };

        let left = child_height(n.left, out, Ordering::Less)?;

        out.push(node);
        let tail = self.nodes.chain_tail(node);
        let mut x = node;
        while x != tail {
            match self.nodes[x].next {
                Some(next)
                    if self.nodes[next].is_duplicate()
                        && self.cmp.compare(&self.nodes[next].key, &n.key) == Ordering::Equal
                        // a chain longer than the arena means the links loop
                        && out.len() < self.nodes.live() =>
                {
                    out.push(next);
                    x = next;
                }
                _ => {
                    return Err(InvariantError::BrokenChain {
                        node: self.nodes.handle(x),
                    })
                }
            }
        }

        let right = child_height(n.right, out, Ordering::Greater)?;

        let expected = 1 + left.max(right);
        if n.height != expected {
            return Err(InvariantError::StaleHeight {
                node: handle,
                stored: n.height,
                expected,
            });
        }
        let balance = self.balance_factor(node);
        if !(-1..=1).contains(&balance) {
            return Err(InvariantError::Unbalanced {
                node: handle,
                balance,
            });
        }

        Ok(n.height)
    }
}
