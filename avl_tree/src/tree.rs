use core::borrow::Borrow;
use core::cmp::Ordering;
use core::fmt;

use crate::arena::{Arena, Handle, Node, NodeId, Role};
use crate::compare::{Comparator, Natural};
use crate::iter::{Cursor, Iter, Keys, Values};
use crate::tracing_helpers::{debug_log, trace_log};

/// Where a node hangs off its parent.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum NodePos {
    Root,
    Left(NodeId),
    Right(NodeId),
}

/// A height balanced (AVL) binary search tree with multiset semantics.
///
/// Each distinct key owns one node in the tree structure. Further records with
/// an equal key form a duplicate chain behind that node and never change the
/// shape of the tree. Every record, duplicates included, is also threaded on a
/// doubly linked list in ascending key order, so that stepping to the next or
/// previous record is O(1) regardless of tree depth.
///
/// Within one key, records keep insertion order. Deleting by key removes the
/// most recently inserted duplicate first. Use the [`Handle`] returned by
/// [`insert`](Self::insert) to remove one specific record instead.
pub struct AvlTree<K, V, C = Natural> {
    // INVARIANTS:
    //  * `root` is `None` iff `len == 0`
    //  * walking `next` from the minimum visits exactly `len` nodes, in the
    //    in-order sequence of the tree with duplicate chains expanded
    //  * rotations never touch `next`/`prev`
    pub(crate) nodes: Arena<K, V>,
    pub(crate) root: Option<NodeId>,
    pub(crate) len: usize,
    pub(crate) cmp: C,
}

impl<K, V> AvlTree<K, V> {
    /// Creates an empty tree ordered by `K`'s [`Ord`] implementation.
    pub fn new() -> Self {
        Self::with_comparator(Natural)
    }
}

impl<K, V> Default for AvlTree<K, V> {
    fn default() -> Self {
        Self::new()
    }
}

impl<K, V, C> AvlTree<K, V, C> {
    /// Creates an empty tree ordered by `cmp`.
    pub fn with_comparator(cmp: C) -> Self {
        Self {
            nodes: Arena::new(),
            root: None,
            len: 0,
            cmp,
        }
    }

    #[inline]
    pub fn comparator(&self) -> &C {
        &self.cmp
    }

    /// Number of records, duplicates included.
    #[inline]
    pub fn len(&self) -> usize {
        self.len
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.len == 0
    }

    /// Height of the tree structure, 0 when empty.
    pub fn height(&self) -> u32 {
        self.height_of(self.root)
    }

    /// Record with the smallest key. Of several equal records, the first inserted.
    pub fn min(&self) -> Option<(&K, &V)> {
        self.front().map(|c| c.entry())
    }

    /// Canonical record of the largest key.
    pub fn max(&self) -> Option<(&K, &V)> {
        self.root
            .map(|root| Cursor::new(&self.nodes, self.nodes.max_of(root)).entry())
    }

    /// Cursor at the first record of the order list.
    pub fn front(&self) -> Option<Cursor<'_, K, V>> {
        self.root
            .map(|root| Cursor::new(&self.nodes, self.nodes.min_of(root)))
    }

    /// Cursor at the last record of the order list, the most recently
    /// inserted record of the largest key.
    pub fn back(&self) -> Option<Cursor<'_, K, V>> {
        self.root.map(|root| {
            let max = self.nodes.max_of(root);
            Cursor::new(&self.nodes, self.nodes.chain_tail(max))
        })
    }

    /// Iterates over all records in ascending key order.
    pub fn iter(&self) -> Iter<'_, K, V> {
        match (self.front(), self.back()) {
            (Some(front), Some(back)) => Iter::new(&self.nodes, front.id(), back.id(), self.len),
            _ => Iter::empty(&self.nodes),
        }
    }

    pub fn keys(&self) -> Keys<'_, K, V> {
        Keys::new(self.iter())
    }

    pub fn values(&self) -> Values<'_, K, V> {
        Values::new(self.iter())
    }

    /// Cursor at the record named by `handle`, `None` if it was removed.
    pub fn cursor(&self, handle: Handle) -> Option<Cursor<'_, K, V>> {
        self.nodes
            .resolve(handle)
            .map(|id| Cursor::new(&self.nodes, id))
    }

    pub fn get_by_handle(&self, handle: Handle) -> Option<(&K, &V)> {
        self.cursor(handle).map(|c| c.entry())
    }

    pub fn get_mut_by_handle(&mut self, handle: Handle) -> Option<(&K, &mut V)> {
        let id = self.nodes.resolve(handle)?;
        let node = &mut self.nodes[id];
        Some((&node.key, &mut node.value))
    }

    /// Visits every record following the tree structure: left subtree, node,
    /// node's duplicate chain, right subtree.
    pub fn inorder_for_each<F>(&mut self, mut f: F)
    where
        F: FnMut(&K, &mut V),
    {
        if let Some(root) = self.root {
            let mut f = |node: &mut Node<K, V>| f(&node.key, &mut node.value);
            Self::inorder_for_each_core(&mut self.nodes, root, &mut f)
        }
    }

    fn inorder_for_each_core<F>(nodes: &mut Arena<K, V>, node: NodeId, f: &mut F)
    where
        F: FnMut(&mut Node<K, V>),
    {
        if let Some(l) = nodes[node].left {
            Self::inorder_for_each_core(nodes, l, f);
        }
        f(&mut nodes[node]);
        let tail = nodes.chain_tail(node);
        let mut x = node;
        while x != tail {
            match nodes[x].next {
                Some(next) => {
                    x = next;
                    f(&mut nodes[x]);
                }
                None => break,
            }
        }
        if let Some(r) = nodes[node].right {
            Self::inorder_for_each_core(nodes, r, f);
        }
    }

    /// Removes exactly the record named by `handle`.
    ///
    /// Returns `None` if the record was already removed. Removing the
    /// canonical record of a key that still has duplicates hands its place in
    /// the tree to the next record of the chain, so the tree shape is unchanged.
    pub fn remove(&mut self, handle: Handle) -> Option<(K, V)> {
        let id = self.nodes.resolve(handle)?;
        match self.nodes[id].role {
            Role::Duplicate => {
                let canonical = self.nodes.canonical_of(id);
                self.unlink_duplicate(canonical, id);
            }
            Role::Canonical {
                last_duplicate: Some(tail),
            } => self.promote_duplicate(id, tail),
            Role::Canonical {
                last_duplicate: None,
            } => self.delete_canonical(id),
        }

        self.len -= 1;
        let node = self.nodes.release(id);
        Some((node.key, node.value))
    }

    /// Drops every record. The tree stays usable and handles to the dropped
    /// records become stale.
    pub fn clear(&mut self) {
        debug_log!(records = self.len, "clearing tree");

        // Walk the order list so duplicates are released with everything else.
        let mut cursor = self.root.map(|root| self.nodes.min_of(root));
        self.root = None;
        self.len = 0;
        while let Some(id) = cursor {
            cursor = self.nodes[id].next;
            drop(self.nodes.release(id));
        }
    }

    #[inline]
    fn height_of(&self, link: Option<NodeId>) -> u32 {
        link.map_or(0, |id| self.nodes[id].height)
    }

    #[inline]
    fn update_height(&mut self, node: NodeId) {
        let left = self.height_of(self.nodes[node].left);
        let right = self.height_of(self.nodes[node].right);
        self.nodes[node].height = 1 + left.max(right);
    }

    /// `height(left) - height(right)`
    #[inline]
    pub(crate) fn balance_factor(&self, node: NodeId) -> i64 {
        i64::from(self.height_of(self.nodes[node].left))
            - i64::from(self.height_of(self.nodes[node].right))
    }

    fn pos(&self, node: NodeId) -> NodePos {
        match self.nodes[node].parent {
            Some(parent) if self.nodes[parent].left == Some(node) => NodePos::Left(parent),
            Some(parent) => {
                debug_assert_eq!(self.nodes[parent].right, Some(node));
                NodePos::Right(parent)
            }
            None => NodePos::Root,
        }
    }

    /// Makes whatever held the node at `pos` hold `new` instead.
    fn set_at(&mut self, pos: NodePos, new: Option<NodeId>) {
        match pos {
            NodePos::Root => self.root = new,
            NodePos::Left(parent) => self.nodes[parent].left = new,
            NodePos::Right(parent) => self.nodes[parent].right = new,
        }
    }

    /// Replaces subtree `old` with subtree `new`.
    fn replace_subtree(&mut self, old: NodeId, new: Option<NodeId>) {
        let pos = self.pos(old);
        self.set_at(pos, new);
        if let Some(new) = new {
            self.nodes[new].parent = self.nodes[old].parent;
        }
    }

    pub(crate) fn rotate_left(&mut self, node: NodeId) {
        //    p                       p
        //    |                       |
        // +-node-+               +-right-+
        // |      |      -->      |       |
        // a  +-right-+       +-node-+    c
        //    |       |       |      |
        //    b       c       a      b
        // where a, b, c can be any subtrees
        let Some(right) = self.nodes[node].right else {
            return;
        };
        trace_log!(node = node.index(), pivot = right.index(), "rotate left");

        // attach b to node
        let b = self.nodes[right].left;
        self.nodes[node].right = b;
        if let Some(b) = b {
            self.nodes[b].parent = Some(node);
        }

        // attach right to parent
        let pos = self.pos(node);
        self.set_at(pos, Some(right));
        self.nodes[right].parent = self.nodes[node].parent;

        // attach node to right
        self.nodes[right].left = Some(node);
        self.nodes[node].parent = Some(right);

        // node is now below right, so its height goes first
        self.update_height(node);
        self.update_height(right);
    }

    pub(crate) fn rotate_right(&mut self, node: NodeId) {
        //         p              p
        //         |              |
        //     +-node-+       +-left-+
        //     |      |       |      |
        // +-left-+   c  -->  a  +-node-+
        // |      |              |      |
        // a      b              b      c
        // where a, b, c can be any subtrees
        let Some(left) = self.nodes[node].left else {
            return;
        };
        trace_log!(node = node.index(), pivot = left.index(), "rotate right");

        // attach b to node
        let b = self.nodes[left].right;
        self.nodes[node].left = b;
        if let Some(b) = b {
            self.nodes[b].parent = Some(node);
        }

        // attach left to parent
        let pos = self.pos(node);
        self.set_at(pos, Some(left));
        self.nodes[left].parent = self.nodes[node].parent;

        // attach node to left
        self.nodes[left].right = Some(node);
        self.nodes[node].parent = Some(left);

        self.update_height(node);
        self.update_height(left);
    }

    /// Walks from `from` up to the root recomputing heights and rotating
    /// wherever the balance factor left [-1, 1].
    fn fix_up(&mut self, from: Option<NodeId>) {
        let mut cursor = from;
        while let Some(node) = cursor {
            self.update_height(node);
            let balance = self.balance_factor(node);
            if balance <= -2 {
                if let Some(right) = self.nodes[node].right {
                    if self.balance_factor(right) > 0 {
                        trace_log!(node = node.index(), "rebalance right-left");
                        self.rotate_right(right);
                    } else {
                        trace_log!(node = node.index(), "rebalance right-right");
                    }
                    self.rotate_left(node);
                }
            } else if balance >= 2 {
                if let Some(left) = self.nodes[node].left {
                    if self.balance_factor(left) < 0 {
                        trace_log!(node = node.index(), "rebalance left-right");
                        self.rotate_left(left);
                    } else {
                        trace_log!(node = node.index(), "rebalance left-left");
                    }
                    self.rotate_right(node);
                }
            }

            // After a rotation `node` sits below the subtree's new root, which
            // is therefore the next one to look at.
            cursor = self.nodes[node].parent;
        }
    }

    /// Splices `new` into the order list right after `anchor`.
    fn link_after(&mut self, anchor: NodeId, new: NodeId) {
        let next = self.nodes[anchor].next;
        self.nodes[new].prev = Some(anchor);
        self.nodes[new].next = next;
        if let Some(next) = next {
            self.nodes[next].prev = Some(new);
        }
        self.nodes[anchor].next = Some(new);
    }

    /// Splices `new` into the order list right before `anchor`.
    fn link_before(&mut self, anchor: NodeId, new: NodeId) {
        let prev = self.nodes[anchor].prev;
        self.nodes[new].next = Some(anchor);
        self.nodes[new].prev = prev;
        if let Some(prev) = prev {
            self.nodes[prev].next = Some(new);
        }
        self.nodes[anchor].prev = Some(new);
    }

    /// Links the list neighbours of `node` directly to each other.
    fn unlink(&mut self, node: NodeId) {
        let (prev, next) = (self.nodes[node].prev, self.nodes[node].next);
        if let Some(prev) = prev {
            self.nodes[prev].next = next;
        }
        if let Some(next) = next {
            self.nodes[next].prev = prev;
        }
    }

    /// Takes `dup` out of `canonical`'s chain.
    fn unlink_duplicate(&mut self, canonical: NodeId, dup: NodeId) {
        trace_log!(node = dup.index(), "delete duplicate");
        if self.nodes.chain_tail(canonical) == dup {
            let last_duplicate = match self.nodes[dup].prev {
                Some(prev) if prev != canonical => Some(prev),
                _ => None,
            };
            self.nodes[canonical].role = Role::Canonical { last_duplicate };
        }
        self.unlink(dup);
    }

    /// Takes `node` out of the tree by moving the first record of its
    /// duplicate chain into its structural position.
    fn promote_duplicate(&mut self, node: NodeId, tail: NodeId) {
        let Some(heir) = self.nodes[node].next else {
            unreachable!("canonical node with duplicates has no successor in the list");
        };
        trace_log!(node = node.index(), heir = heir.index(), "promote duplicate");

        self.replace_subtree(node, Some(heir));
        let (left, right, height) = {
            let n = &self.nodes[node];
            (n.left, n.right, n.height)
        };
        for child in [left, right].into_iter().flatten() {
            self.nodes[child].parent = Some(heir);
        }

        let heir_node = &mut self.nodes[heir];
        heir_node.left = left;
        heir_node.right = right;
        heir_node.height = height;
        heir_node.role = Role::Canonical {
            last_duplicate: (tail != heir).then_some(tail),
        };

        self.unlink(node);
    }

    /// Takes a canonical node without duplicates out of the tree and the order
    /// list, then rebalances.
    fn delete_canonical(&mut self, node: NodeId) {
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
        debug_assert_eq!(self.nodes.chain_tail(node), node);

        // Lowest node whose subtree changed, rebalancing starts there.
        let rebalance_from = match (self.nodes[node].left, self.nodes[node].right) {
            (None, v @ Some(_)) | (v @ Some(_), None) | (None, v @ None) => {
                // `node` has no children or only one, replace it with the
                // child or `None`. For example remove 1, 6, 12, 58 from above.
                trace_log!(node = node.index(), "delete node with at most one child");
                let parent = self.nodes[node].parent;
                self.replace_subtree(node, v);
                parent
            }
            (Some(left), Some(right)) => {
                // Replace `node` with its successor, the minimum of the right
                // subtree, which has no left child.
                //  a) `min` is the right child of `node`: `min` moves up and
                //     takes over `node.left` (remove 20, 75, 77 above)
                //  b) otherwise `min` is first replaced by its own right child
                //     and then takes over both subtrees of `node` (remove 9)
                trace_log!(node = node.index(), "delete node with two children");
                let min = self.nodes.min_of(right);
                let lowest = if min != right {
                    // b)
                    let min_parent = self.nodes[min].parent;
                    let min_right = self.nodes[min].right;
                    self.replace_subtree(min, min_right);
                    self.nodes[min].right = Some(right);
                    self.nodes[right].parent = Some(min);
                    min_parent
                } else {
                    Some(min)
                };
                self.replace_subtree(node, Some(min));
                self.nodes[min].left = Some(left);
                self.nodes[left].parent = Some(min);
                lowest
            }
        };

        self.unlink(node);
        self.fix_up(rebalance_from);
    }
}

impl<K, V, C> AvlTree<K, V, C>
where
    C: Comparator<K>,
{
    /// Adds a record. Records with a key already present are appended to that
    /// key's duplicate chain.
    pub fn insert(&mut self, key: K, value: V) -> Handle {
        let new = self.nodes.alloc(Node::new(key, value));
        let Some(mut node) = self.root else {
            self.root = Some(new);
            self.len += 1;
            return self.nodes.handle(new);
        };

        // Move left/right down the tree until we find an empty slot or an equal key
        loop {
            match self.cmp.compare(&self.nodes[new].key, &self.nodes[node].key) {
                Ordering::Less => match self.nodes[node].left {
                    Some(left) => node = left,
                    None => {
                        self.nodes[node].left = Some(new);
                        self.nodes[new].parent = Some(node);
                        self.link_before(node, new);
                        break;
                    }
                },
                Ordering::Greater => match self.nodes[node].right {
                    Some(right) => node = right,
                    None => {
                        self.nodes[node].right = Some(new);
                        self.nodes[new].parent = Some(node);
                        let tail = self.nodes.chain_tail(node);
                        self.link_after(tail, new);
                        break;
                    }
                },
                Ordering::Equal => {
                    // Duplicates never change the shape of the tree.
                    let tail = self.nodes.chain_tail(node);
                    self.nodes[new].role = Role::Duplicate;
                    self.link_after(tail, new);
                    self.nodes[node].role = Role::Canonical {
                        last_duplicate: Some(new),
                    };
                    self.len += 1;
                    return self.nodes.handle(new);
                }
            }
        }

        self.len += 1;
        self.fix_up(Some(node));
        self.nodes.handle(new)
    }

    /// Like [`insert`](Self::insert), converting the inputs into the stored
    /// key and value types first.
    pub fn insert_with<Q, W>(&mut self, key: Q, value: W) -> Handle
    where
        Q: Into<K>,
        W: Into<V>,
    {
        self.insert(key.into(), value.into())
    }
}

impl<K, V, C> AvlTree<K, V, C> {
    pub(crate) fn find<Q>(&self, key: &Q) -> Option<NodeId>
    where
        K: Borrow<Q>,
        C: Comparator<Q>,
        Q: ?Sized,
    {
        let mut x = self.root;
        while let Some(id) = x {
            match self.cmp.compare(key, self.nodes[id].key.borrow()) {
                Ordering::Less => x = self.nodes[id].left,
                Ordering::Equal => return Some(id),
                Ordering::Greater => x = self.nodes[id].right,
            }
        }

        None
    }

    /// Cursor at the canonical (first inserted) record of `key`.
    pub fn search<Q>(&self, key: &Q) -> Option<Cursor<'_, K, V>>
    where
        K: Borrow<Q>,
        C: Comparator<Q>,
        Q: ?Sized,
    {
        self.find(key).map(|id| Cursor::new(&self.nodes, id))
    }

    pub fn get<Q>(&self, key: &Q) -> Option<(&K, &V)>
    where
        K: Borrow<Q>,
        C: Comparator<Q>,
        Q: ?Sized,
    {
        self.search(key).map(|c| c.entry())
    }

    pub fn get_mut<Q>(&mut self, key: &Q) -> Option<(&K, &mut V)>
    where
        K: Borrow<Q>,
        C: Comparator<Q>,
        Q: ?Sized,
    {
        let id = self.find(key)?;
        let node = &mut self.nodes[id];
        Some((&node.key, &mut node.value))
    }

    pub fn contains_key<Q>(&self, key: &Q) -> bool
    where
        K: Borrow<Q>,
        C: Comparator<Q>,
        Q: ?Sized,
    {
        self.find(key).is_some()
    }

    /// All records with `key`, in insertion order.
    pub fn get_all<Q>(&self, key: &Q) -> Iter<'_, K, V>
    where
        K: Borrow<Q>,
        C: Comparator<Q>,
        Q: ?Sized,
    {
        match self.find(key) {
            Some(canonical) => {
                let tail = self.nodes.chain_tail(canonical);
                let count = self.chain_len(canonical);
                Iter::new(&self.nodes, canonical, tail, count)
            }
            None => Iter::empty(&self.nodes),
        }
    }

    /// Number of records with `key`.
    pub fn count<Q>(&self, key: &Q) -> usize
    where
        K: Borrow<Q>,
        C: Comparator<Q>,
        Q: ?Sized,
    {
        self.find(key).map_or(0, |canonical| self.chain_len(canonical))
    }

    fn chain_len(&self, canonical: NodeId) -> usize {
        let tail = self.nodes.chain_tail(canonical);
        let mut count = 1;
        let mut x = canonical;
        while x != tail {
            match self.nodes[x].next {
                Some(next) => {
                    x = next;
                    count += 1;
                }
                None => break,
            }
        }

        count
    }

    /// Canonical record of the smallest key greater than `key`.
    pub fn successor<Q>(&self, key: &Q) -> Option<(&K, &V)>
    where
        K: Borrow<Q>,
        C: Comparator<Q>,
        Q: ?Sized,
    {
        self.search(key)?.successor().map(|c| c.entry())
    }

    /// Canonical record of the largest key smaller than `key`.
    pub fn predecessor<Q>(&self, key: &Q) -> Option<(&K, &V)>
    where
        K: Borrow<Q>,
        C: Comparator<Q>,
        Q: ?Sized,
    {
        self.search(key)?.predecessor().map(|c| c.entry())
    }

    /// Removes one record with `key`: the most recently inserted duplicate if
    /// there are any, the canonical record otherwise.
    pub fn delete<Q>(&mut self, key: &Q) -> Option<(K, V)>
    where
        K: Borrow<Q>,
        C: Comparator<Q>,
        Q: ?Sized,
    {
        let node = self.find(key)?;
        let removed = match self.nodes[node].role {
            Role::Canonical {
                last_duplicate: Some(tail),
            } => {
                self.unlink_duplicate(node, tail);
                tail
            }
            _ => {
                self.delete_canonical(node);
                node
            }
        };

        self.len -= 1;
        let removed = self.nodes.release(removed);
        Some((removed.key, removed.value))
    }
}

impl<K, V, C> fmt::Debug for AvlTree<K, V, C>
where
    K: fmt::Debug,
    V: fmt::Debug,
{
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        struct DebugNodes<'a, K, V> {
            tree: Iter<'a, K, V>,
        }

        impl<K, V> fmt::Debug for DebugNodes<'_, K, V>
        where
            K: fmt::Debug,
            V: fmt::Debug,
        {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                f.debug_list()
                    .entries(self.tree.clone())
                    .finish()
            }
        }

        let mut f = f.debug_struct("AvlTree");
        f.field("len", &self.len);
        match self.root {
            Some(root) => f.field("root", &Some(&self.nodes[root])),
            None => f.field("root", &None::<K>),
        };
        f.field("records", &DebugNodes { tree: self.iter() });
        f.finish()
    }
}

impl<'a, K, V, C> IntoIterator for &'a AvlTree<K, V, C> {
    type Item = (&'a K, &'a V);
    type IntoIter = Iter<'a, K, V>;

    fn into_iter(self) -> Self::IntoIter {
        self.iter()
    }
}

impl<K, V> FromIterator<(K, V)> for AvlTree<K, V>
where
    K: Ord,
{
    fn from_iter<I: IntoIterator<Item = (K, V)>>(iter: I) -> Self {
        let mut tree = Self::new();
        tree.extend(iter);
        tree
    }
}

impl<K, V, C> Extend<(K, V)> for AvlTree<K, V, C>
where
    C: Comparator<K>,
{
    fn extend<I: IntoIterator<Item = (K, V)>>(&mut self, iter: I) {
        for (key, value) in iter {
            self.insert(key, value);
        }
    }
}
