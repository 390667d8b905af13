use core::fmt;
use core::ops::{Index, IndexMut};

/// Index of an occupied slot in the [`Arena`].
///
/// Links between nodes are stored as `Option<NodeId>`, `None` playing the role
/// of the shared "absent" node.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub(crate) struct NodeId(usize);

impl NodeId {
    #[inline]
    pub(crate) fn index(self) -> usize {
        self.0
    }
}

/// A stable name for one record stored in an [`AvlTree`].
///
/// Handles stay valid until the record they name is removed. After that the
/// tree reports them as stale (`None`) even if the underlying storage is
/// reused for another record. Staleness is tracked with a 64-bit counter per
/// slot, so a handle could only be confused with a newer record after 2^64
/// removals from the same slot.
///
/// [`AvlTree`]: crate::AvlTree
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct Handle {
    index: usize,
    generation: u64,
}

/// Whether a node takes part in the tree structure or only in the order list.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum Role {
    /// The single tree node of a distinct key.
    ///
    /// `last_duplicate` is the tail of the key's duplicate chain, `None` if
    /// the chain is empty (the chain tail is then the node itself).
    Canonical { last_duplicate: Option<NodeId> },
    /// Extra record sharing its canonical node's key. Only `next`/`prev` are
    /// meaningful for such a node.
    Duplicate,
}

pub(crate) struct Node<K, V> {
    pub(crate) key: K,
    pub(crate) value: V,
    // 1 + max(child heights), absent children count as 0
    pub(crate) height: u32,
    pub(crate) role: Role,
    pub(crate) parent: Option<NodeId>,
    pub(crate) left: Option<NodeId>,
    pub(crate) right: Option<NodeId>,
    pub(crate) next: Option<NodeId>,
    pub(crate) prev: Option<NodeId>,
}

impl<K, V> Node<K, V> {
    pub(crate) fn new(key: K, value: V) -> Self {
        Self {
            key,
            value,
            height: 1,
            role: Role::Canonical {
                last_duplicate: None,
            },
            parent: None,
            left: None,
            right: None,
            next: None,
            prev: None,
        }
    }

    #[inline]
    pub(crate) fn is_duplicate(&self) -> bool {
        matches!(self.role, Role::Duplicate)
    }
}

impl<K, V> fmt::Debug for Node<K, V>
where
    K: fmt::Debug,
    V: fmt::Debug,
{
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let mut f = f.debug_struct("Node");
        f.field("key", &self.key)
            .field("value", &self.value)
            .field("height", &self.height)
            .field("duplicate", &self.is_duplicate());

        let mut dbg_link = |name: &str, link: &Option<NodeId>| match link {
            Some(id) => {
                f.field(name, &id.index());
            }
            None => {
                f.field(name, &None::<usize>);
            }
        };

        dbg_link("parent", &self.parent);
        dbg_link("left", &self.left);
        dbg_link("right", &self.right);
        dbg_link("prev", &self.prev);
        dbg_link("next", &self.next);

        f.finish()
    }
}

struct Slot<K, V> {
    generation: u64,
    node: Option<Node<K, V>>,
}

/// Owner of every node of a tree.
///
/// Vacated slots are recycled. Each slot carries a generation counter that is
/// bumped on release so that [`Handle`]s to released records can be told apart
/// from handles to whatever record reuses the slot.
pub(crate) struct Arena<K, V> {
    slots: Vec<Slot<K, V>>,
    free: Vec<usize>,
}

impl<K, V> Arena<K, V> {
    pub(crate) fn new() -> Self {
        Self {
            slots: Vec::new(),
            free: Vec::new(),
        }
    }

    /// Number of occupied slots.
    pub(crate) fn live(&self) -> usize {
        self.slots.len() - self.free.len()
    }

    pub(crate) fn alloc(&mut self, node: Node<K, V>) -> NodeId {
        match self.free.pop() {
            Some(index) => {
                let slot = &mut self.slots[index];
                debug_assert!(slot.node.is_none());
                slot.node = Some(node);
                NodeId(index)
            }
            None => {
                self.slots.push(Slot {
                    generation: 0,
                    node: Some(node),
                });
                NodeId(self.slots.len() - 1)
            }
        }
    }

    /// Takes the node out of its slot and retires every handle to it.
    pub(crate) fn release(&mut self, id: NodeId) -> Node<K, V> {
        let slot = &mut self.slots[id.0];
        match slot.node.take() {
            Some(node) => {
                slot.generation = slot.generation.wrapping_add(1);
                self.free.push(id.0);
                node
            }
            None => unreachable!("released vacant slot {}", id.0),
        }
    }

    pub(crate) fn handle(&self, id: NodeId) -> Handle {
        Handle {
            index: id.0,
            generation: self.slots[id.0].generation,
        }
    }

    /// Maps a handle back to its node, `None` if the record is gone.
    pub(crate) fn resolve(&self, handle: Handle) -> Option<NodeId> {
        let slot = self.slots.get(handle.index)?;
        if slot.generation == handle.generation && slot.node.is_some() {
            Some(NodeId(handle.index))
        } else {
            None
        }
    }

    pub(crate) fn min_of(&self, root: NodeId) -> NodeId {
        let mut x = root;
        while let Some(left) = self[x].left {
            x = left;
        }

        x
    }

    pub(crate) fn max_of(&self, root: NodeId) -> NodeId {
        let mut x = root;
        while let Some(right) = self[x].right {
            x = right;
        }

        x
    }

    /// Last node of `canonical`'s duplicate chain, `canonical` itself if the
    /// chain is empty.
    pub(crate) fn chain_tail(&self, canonical: NodeId) -> NodeId {
        match self[canonical].role {
            Role::Canonical {
                last_duplicate: Some(tail),
            } => tail,
            _ => canonical,
        }
    }

    /// Canonical node of the chain `id` belongs to.
    ///
    /// Duplicates sit right after their canonical node in the order list, so
    /// walking back over them finds it.
    pub(crate) fn canonical_of(&self, id: NodeId) -> NodeId {
        let mut x = id;
        while self[x].is_duplicate() {
            match self[x].prev {
                Some(prev) => x = prev,
                None => unreachable!("duplicate {} without canonical node", id.0),
            }
        }

        x
    }

    /// In-order successor using tree links only.
    pub(crate) fn successor_of(&self, node: NodeId) -> Option<NodeId> {
        //       +---------- 34 ---------+
        //       |                       |
        // +---- 2 ----+                 58 ----+
        // |           |                        |
        // 1      +--- 9 ----+              +-- 77 --+
        //        |          |              |        |
        //     +- 6       +- 20 -+      +- 71 -+     82
        //     |          |      |      |      |
        //     5         12 -+   24    67      75
        //                   |
        //                   13
        match self[node].right {
            // 9 -> 12, 2 -> 5, 58 -> 67 ...
            Some(right) => Some(self.min_of(right)),
            None => {
                // 6 -> 9, 1 -> 2, 13 -> 20, 24 -> 34 ...
                // Move up until we leave a left subtree, that parent is the successor.
                let mut node = node;
                let mut node_parent = self[node].parent;
                while let Some(parent) = node_parent {
                    if self[parent].left == Some(node) {
                        break;
                    }
                    node = parent;
                    node_parent = self[node].parent;
                }

                node_parent
            }
        }
    }

    /// In-order predecessor using tree links only.
    pub(crate) fn predecessor_of(&self, node: NodeId) -> Option<NodeId> {
        match self[node].left {
            // 2 -> 1, 9 -> 6, 20 -> 13, 77 -> 75
            Some(left) => Some(self.max_of(left)),
            None => {
                // 12 -> 9, 58 -> 34, 67 -> 58
                let mut node = node;
                let mut node_parent = self[node].parent;
                while let Some(parent) = node_parent {
                    if self[parent].right == Some(node) {
                        break;
                    }
                    node = parent;
                    node_parent = self[node].parent;
                }

                node_parent
            }
        }
    }
}

impl<K, V> Index<NodeId> for Arena<K, V> {
    type Output = Node<K, V>;

    #[inline]
    fn index(&self, id: NodeId) -> &Self::Output {
        match &self.slots[id.0].node {
            Some(node) => node,
            None => unreachable!("dangling link to slot {}", id.0),
        }
    }
}

impl<K, V> IndexMut<NodeId> for Arena<K, V> {
    #[inline]
    fn index_mut(&mut self, id: NodeId) -> &mut Self::Output {
        match &mut self.slots[id.0].node {
            Some(node) => node,
            None => unreachable!("dangling link to slot {}", id.0),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn alloc_reuses_released_slots() {
        let mut arena = Arena::new();
        let a = arena.alloc(Node::new(1, "a"));
        let b = arena.alloc(Node::new(2, "b"));
        assert_eq!(arena.live(), 2);

        let node = arena.release(a);
        assert_eq!((node.key, node.value), (1, "a"));
        assert_eq!(arena.live(), 1);

        let c = arena.alloc(Node::new(3, "c"));
        assert_eq!(c.index(), a.index());
        assert_eq!(arena[c].key, 3);
        assert_eq!(arena[b].key, 2);
        assert_eq!(arena.live(), 2);
    }

    #[test]
    fn stale_handles_do_not_resolve() {
        let mut arena = Arena::new();
        let a = arena.alloc(Node::new(1, ()));
        let handle = arena.handle(a);
        assert_eq!(arena.resolve(handle), Some(a));

        arena.release(a);
        assert_eq!(arena.resolve(handle), None);

        // the slot is reused but the old handle stays dead
        let b = arena.alloc(Node::new(2, ()));
        assert_eq!(b.index(), a.index());
        assert_eq!(arena.resolve(handle), None);
        assert_eq!(arena.resolve(arena.handle(b)), Some(b));
    }

    #[test]
    fn generation_does_not_wrap_at_u32() {
        let mut arena = Arena::new();
        let a = arena.alloc(Node::new(1, ()));
        let first = arena.handle(a);
        arena.release(a);

        // pretend the slot has already been recycled u32::MAX times
        arena.slots[a.index()].generation = u64::from(u32::MAX);
        let b = arena.alloc(Node::new(2, ()));
        arena.release(b);

        let c = arena.alloc(Node::new(3, ()));
        assert_eq!(c.index(), a.index());
        assert_eq!(arena.handle(c).generation, 1 << 32);
        assert_eq!(arena.resolve(first), None);
        assert_eq!(arena.resolve(arena.handle(c)), Some(c));
    }

    #[test]
    fn chain_tail_of_fresh_node_is_itself() {
        let mut arena = Arena::new();
        let a = arena.alloc(Node::new(1, ()));
        assert_eq!(arena.chain_tail(a), a);
        assert_eq!(arena.canonical_of(a), a);
    }
}
