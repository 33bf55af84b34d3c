//! Utilities to traverse the KDTree structure.

use std::marker::PhantomData;

use tinyvec::TinyVec;

use crate::kdtree::constants::{DIMENSIONS, NO_CHILD, STACK_CAPACITY};
use crate::kdtree::index::KDNode;
use crate::kdtree::KDTreeIndex;
use crate::r#type::{Coord, IndexableNum};

/// A node in the KDTree.
///
/// This is a cheap, copyable handle: a reference onto the tree plus an arena position and the
/// node's depth.
#[derive(Debug)]
pub struct Node<'a, N: IndexableNum, T: KDTreeIndex<N>> {
    /// The tree that this node is a reference onto
    tree: &'a T,

    /// Position in the tree's node arena
    pos: u32,

    /// Distance from the root, which has depth 0
    depth: u32,

    phantom: PhantomData<N>,
}

impl<N: IndexableNum, T: KDTreeIndex<N>> Clone for Node<'_, N, T> {
    fn clone(&self) -> Self {
        *self
    }
}

impl<N: IndexableNum, T: KDTreeIndex<N>> Copy for Node<'_, N, T> {}

impl<'a, N: IndexableNum, T: KDTreeIndex<N>> Node<'a, N, T> {
    pub(crate) fn new(tree: &'a T, pos: u32, depth: u32) -> Self {
        Self {
            tree,
            pos,
            depth,
            phantom: PhantomData,
        }
    }

    #[inline]
    fn raw(&self) -> KDNode {
        self.tree.nodes()[self.pos as usize]
    }

    #[inline]
    fn child(&self, pos: u32) -> Option<Node<'a, N, T>> {
        (pos != NO_CHILD).then(|| Node::new(self.tree, pos, self.depth + 1))
    }

    /// The index of this node's point in the point buffer.
    #[inline]
    pub fn index(&self) -> u32 {
        self.raw().index
    }

    /// The position of this node in the tree's node arena.
    #[inline]
    pub fn position(&self) -> u32 {
        self.pos
    }

    /// Distance from the root.
    #[inline]
    pub fn depth(&self) -> usize {
        self.depth as usize
    }

    /// The axis that the children of this node are split over.
    /// 0 for x axis, 1 for y axis, 2 for z axis
    #[inline]
    pub fn axis(&self) -> usize {
        self.depth as usize % DIMENSIONS
    }

    /// The `[x, y, z]` coordinates of this node's point.
    #[inline]
    pub fn xyz(&self) -> [N; 3] {
        self.tree.points().xyz(self.index())
    }

    /// The coordinate of this node's point.
    pub fn coord(&self) -> Coord<N> {
        Coord::from(self.xyz())
    }

    /// The child node holding points strictly smaller on [`axis`][Self::axis].
    pub fn left_child(&self) -> Option<Node<'a, N, T>> {
        self.child(self.raw().left)
    }

    /// The child node holding points greater or equal on [`axis`][Self::axis].
    pub fn right_child(&self) -> Option<Node<'a, N, T>> {
        self.child(self.raw().right)
    }

    /// Returns `true` if this is a leaf node without children.
    #[inline]
    pub fn is_leaf(&self) -> bool {
        let raw = self.raw();
        raw.left == NO_CHILD && raw.right == NO_CHILD
    }

    /// Returns `true` if this is an intermediate node with children.
    #[inline]
    pub fn is_parent(&self) -> bool {
        !self.is_leaf()
    }

    /// Visit this node and all of its descendants in pre-order: a node, then its left subtree,
    /// then its right subtree.
    pub fn traverse<F: FnMut(&Node<'a, N, T>)>(&self, mut callback: F) {
        let mut stack: TinyVec<[(u32, u32); STACK_CAPACITY]> = TinyVec::new();
        stack.push((self.pos, self.depth));

        while let Some((pos, depth)) = stack.pop() {
            let node = Node::new(self.tree, pos, depth);
            callback(&node);

            // right is pushed first so that the left subtree is visited first
            let raw = node.raw();
            if raw.right != NO_CHILD {
                stack.push((raw.right, depth + 1));
            }
            if raw.left != NO_CHILD {
                stack.push((raw.left, depth + 1));
            }
        }
    }

    /// The number of nodes in the subtree rooted at this node, including itself.
    pub fn subtree_len(&self) -> usize {
        let mut len = 0;
        self.traverse(|_| len += 1);
        len
    }
}
