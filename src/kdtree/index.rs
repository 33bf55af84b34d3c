use crate::kdtree::constants::NO_CHILD;
use crate::points::PointBuffer;
use crate::r#type::IndexableNum;

/// One entry of a tree's node arena.
///
/// `index` addresses the point buffer; `left` and `right` are positions in the same arena. The
/// root, when present, is always at position 0.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct KDNode {
    pub(crate) index: u32,
    pub(crate) left: u32,
    pub(crate) right: u32,
}

impl KDNode {
    #[inline]
    pub(crate) fn new(index: u32) -> Self {
        Self {
            index,
            left: NO_CHILD,
            right: NO_CHILD,
        }
    }

    /// The index of this node's point in the point buffer.
    #[inline]
    pub fn index(&self) -> u32 {
        self.index
    }

    /// Arena position of the left child, if any.
    #[inline]
    pub fn left(&self) -> Option<u32> {
        (self.left != NO_CHILD).then_some(self.left)
    }

    /// Arena position of the right child, if any.
    #[inline]
    pub fn right(&self) -> Option<u32> {
        (self.right != NO_CHILD).then_some(self.right)
    }
}

/// An immutable, balanced KDTree over a borrowed point buffer.
///
/// Usually this will be created via [`KDTreeBuilder`][crate::kdtree::KDTreeBuilder].
#[derive(Debug, Clone, PartialEq)]
pub struct KDTree<'a, N: IndexableNum> {
    pub(crate) points: PointBuffer<'a, N>,
    pub(crate) nodes: Vec<KDNode>,
}

impl<'a, N: IndexableNum> KDTree<'a, N> {
    /// Consume the tree, returning its node arena.
    pub fn into_inner(self) -> Vec<KDNode> {
        self.nodes
    }
}
