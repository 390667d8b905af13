use core::cmp::Ordering;

/// Three-way comparison used to order the keys of an [`AvlTree`].
///
/// Implementations must define a strict total order that does not change for
/// as long as the tree holds keys. A comparator that breaks this contract
/// leaves the tree in an unspecified (but memory safe) order.
///
/// Any `Fn(&K, &K) -> Ordering` closure is a comparator for `K`.
///
/// [`AvlTree`]: crate::AvlTree
pub trait Comparator<K: ?Sized> {
    fn compare(&self, a: &K, b: &K) -> Ordering;
}

/// Orders keys by their [`Ord`] implementation.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct Natural;

impl<K> Comparator<K> for Natural
where
    K: Ord + ?Sized,
{
    #[inline]
    fn compare(&self, a: &K, b: &K) -> Ordering {
        a.cmp(b)
    }
}

impl<K, F> Comparator<K> for F
where
    K: ?Sized,
    F: Fn(&K, &K) -> Ordering,
{
    #[inline]
    fn compare(&self, a: &K, b: &K) -> Ordering {
        self(a, b)
    }
}
