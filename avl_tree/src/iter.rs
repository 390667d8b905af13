use core::fmt;
use core::iter::FusedIterator;

use crate::arena::{Arena, Handle, NodeId};

/// A read-only position on one record of an [`AvlTree`].
///
/// [`next`](Self::next) and [`prev`](Self::prev) step along the order list in
/// O(1), visiting duplicates. [`successor`](Self::successor) and
/// [`predecessor`](Self::predecessor) follow tree links and only stop at the
/// canonical record of each distinct key.
///
/// [`AvlTree`]: crate::AvlTree
pub struct Cursor<'a, K, V> {
    nodes: &'a Arena<K, V>,
    id: NodeId,
}

impl<K, V> Clone for Cursor<'_, K, V> {
    fn clone(&self) -> Self {
        *self
    }
}

impl<K, V> Copy for Cursor<'_, K, V> {}

impl<'a, K, V> Cursor<'a, K, V> {
    pub(crate) fn new(nodes: &'a Arena<K, V>, id: NodeId) -> Self {
        Self { nodes, id }
    }

    #[inline]
    pub(crate) fn id(&self) -> NodeId {
        self.id
    }

    #[inline]
    pub fn key(&self) -> &'a K {
        &self.nodes[self.id].key
    }

    #[inline]
    pub fn value(&self) -> &'a V {
        &self.nodes[self.id].value
    }

    #[inline]
    pub fn entry(&self) -> (&'a K, &'a V) {
        let node = &self.nodes[self.id];
        (&node.key, &node.value)
    }

    pub fn handle(&self) -> Handle {
        self.nodes.handle(self.id)
    }

    /// `true` if this record is not the first inserted one of its key.
    pub fn is_duplicate(&self) -> bool {
        self.nodes[self.id].is_duplicate()
    }

    /// The first inserted record with the same key.
    pub fn canonical(&self) -> Self {
        Self::new(self.nodes, self.nodes.canonical_of(self.id))
    }

    /// Next record in ascending order, duplicates included.
    #[allow(clippy::should_implement_trait)]
    pub fn next(&self) -> Option<Self> {
        self.nodes[self.id].next.map(|id| Self::new(self.nodes, id))
    }

    /// Previous record in ascending order, duplicates included.
    pub fn prev(&self) -> Option<Self> {
        self.nodes[self.id].prev.map(|id| Self::new(self.nodes, id))
    }

    /// Canonical record of the next larger key, found through the tree links.
    pub fn successor(&self) -> Option<Self> {
        let canonical = self.nodes.canonical_of(self.id);
        self.nodes
            .successor_of(canonical)
            .map(|id| Self::new(self.nodes, id))
    }

    /// Canonical record of the next smaller key, found through the tree links.
    pub fn predecessor(&self) -> Option<Self> {
        let canonical = self.nodes.canonical_of(self.id);
        self.nodes
            .predecessor_of(canonical)
            .map(|id| Self::new(self.nodes, id))
    }
}

impl<K, V> fmt::Debug for Cursor<'_, K, V>
where
    K: fmt::Debug,
    V: fmt::Debug,
{
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Cursor")
            .field("key", self.key())
            .field("value", self.value())
            .field("duplicate", &self.is_duplicate())
            .finish()
    }
}

/// Iterator over the records of an [`AvlTree`] in ascending key order.
///
/// [`AvlTree`]: crate::AvlTree
pub struct Iter<'a, K, V> {
    nodes: &'a Arena<K, V>,
    front: Option<NodeId>,
    back: Option<NodeId>,
    // number of records between front and back, both included
    remaining: usize,
}

impl<'a, K, V> Iter<'a, K, V> {
    pub(crate) fn new(nodes: &'a Arena<K, V>, front: NodeId, back: NodeId, len: usize) -> Self {
        Self {
            nodes,
            front: Some(front),
            back: Some(back),
            remaining: len,
        }
    }

    pub(crate) fn empty(nodes: &'a Arena<K, V>) -> Self {
        Self {
            nodes,
            front: None,
            back: None,
            remaining: 0,
        }
    }
}

impl<K, V> Clone for Iter<'_, K, V> {
    fn clone(&self) -> Self {
        Self {
            nodes: self.nodes,
            front: self.front,
            back: self.back,
            remaining: self.remaining,
        }
    }
}

impl<'a, K, V> Iterator for Iter<'a, K, V> {
    type Item = (&'a K, &'a V);

    fn next(&mut self) -> Option<Self::Item> {
        if self.remaining == 0 {
            return None;
        }
        let nodes = self.nodes;
        let node = &nodes[self.front?];
        self.remaining -= 1;
        self.front = node.next;
        Some((&node.key, &node.value))
    }

    fn size_hint(&self) -> (usize, Option<usize>) {
        (self.remaining, Some(self.remaining))
    }
}

impl<K, V> DoubleEndedIterator for Iter<'_, K, V> {
    fn next_back(&mut self) -> Option<Self::Item> {
        if self.remaining == 0 {
            return None;
        }
        let nodes = self.nodes;
        let node = &nodes[self.back?];
        self.remaining -= 1;
        self.back = node.prev;
        Some((&node.key, &node.value))
    }
}

impl<K, V> ExactSizeIterator for Iter<'_, K, V> {}

impl<K, V> FusedIterator for Iter<'_, K, V> {}

/// Iterator over the keys of an [`AvlTree`], duplicates included.
///
/// [`AvlTree`]: crate::AvlTree
pub struct Keys<'a, K, V> {
    inner: Iter<'a, K, V>,
}

impl<'a, K, V> Keys<'a, K, V> {
    pub(crate) fn new(inner: Iter<'a, K, V>) -> Self {
        Self { inner }
    }
}

impl<'a, K, V> Iterator for Keys<'a, K, V> {
    type Item = &'a K;

    fn next(&mut self) -> Option<Self::Item> {
        self.inner.next().map(|(k, _)| k)
    }

    fn size_hint(&self) -> (usize, Option<usize>) {
        self.inner.size_hint()
    }
}

impl<K, V> DoubleEndedIterator for Keys<'_, K, V> {
    fn next_back(&mut self) -> Option<Self::Item> {
        self.inner.next_back().map(|(k, _)| k)
    }
}

impl<K, V> ExactSizeIterator for Keys<'_, K, V> {}

impl<K, V> FusedIterator for Keys<'_, K, V> {}

impl<K, V> Clone for Keys<'_, K, V> {
    fn clone(&self) -> Self {
        Self {
            inner: self.inner.clone(),
        }
    }
}

/// Iterator over the values of an [`AvlTree`] in key order.
///
/// [`AvlTree`]: crate::AvlTree
pub struct Values<'a, K, V> {
    inner: Iter<'a, K, V>,
}

impl<'a, K, V> Values<'a, K, V> {
    pub(crate) fn new(inner: Iter<'a, K, V>) -> Self {
        Self { inner }
    }
}

impl<'a, K, V> Iterator for Values<'a, K, V> {
    type Item = &'a V;

    fn next(&mut self) -> Option<Self::Item> {
        self.inner.next().map(|(_, v)| v)
    }

    fn size_hint(&self) -> (usize, Option<usize>) {
        self.inner.size_hint()
    }
}

impl<K, V> DoubleEndedIterator for Values<'_, K, V> {
    fn next_back(&mut self) -> Option<Self::Item> {
        self.inner.next_back().map(|(_, v)| v)
    }
}

impl<K, V> ExactSizeIterator for Values<'_, K, V> {}

impl<K, V> FusedIterator for Values<'_, K, V> {}

impl<K, V> Clone for Values<'_, K, V> {
    fn clone(&self) -> Self {
        Self {
            inner: self.inner.clone(),
        }
    }
}
