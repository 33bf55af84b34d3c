use log::trace;

use crate::error::Result;
use crate::kdtree::constants::{DIMENSIONS, NO_CHILD};
use crate::kdtree::index::KDNode;
use crate::points::PointBuffer;
use crate::r#type::IndexableNum;

/// A KDTree grown one point at a time.
///
/// Each [`insert`][Self::insert] descends from the root, going left when the new point is
/// strictly smaller on the node's axis and right otherwise. No rebalancing happens, so the depth
/// depends on insertion order and can degrade to the number of points.
///
/// Balanced construction lives on [`KDTreeBuilder`][crate::kdtree::KDTreeBuilder], which
/// produces a separate tree type.
#[derive(Debug, Clone, PartialEq)]
pub struct IncrementalKDTree<'a, N: IndexableNum> {
    pub(crate) points: PointBuffer<'a, N>,
    pub(crate) nodes: Vec<KDNode>,
}

impl<'a, N: IndexableNum> IncrementalKDTree<'a, N> {
    /// Create an empty tree over every point in `coords`.
    pub fn new(coords: &'a [N]) -> Result<Self> {
        Ok(Self::from_points(PointBuffer::try_new(coords)?))
    }

    /// Create an empty tree over the first `num_points` points of `coords`.
    pub fn new_with_num_points(coords: &'a [N], num_points: usize) -> Result<Self> {
        Ok(Self::from_points(PointBuffer::try_new_with_num_points(
            coords, num_points,
        )?))
    }

    /// Create an empty tree over an already validated point buffer.
    pub fn from_points(points: PointBuffer<'a, N>) -> Self {
        Self {
            points,
            nodes: vec![],
        }
    }

    /// Insert point `index` of the point buffer.
    ///
    /// Inserting the same index twice stores it twice.
    pub fn insert(&mut self, index: u32) -> Result<()> {
        let point = self.points.get(index as usize)?;
        let new_pos = self.nodes.len() as u32;

        if !self.nodes.is_empty() {
            let mut pos = 0;
            let mut depth = 0;
            loop {
                let axis = depth % DIMENSIONS;
                let node = &mut self.nodes[pos];
                let child = if point[axis] < self.points.coord(node.index, axis) {
                    &mut node.left
                } else {
                    &mut node.right
                };
                if *child == NO_CHILD {
                    *child = new_pos;
                    break;
                }
                pos = *child as usize;
                depth += 1;
            }
            trace!("inserted point {} at depth {}", index, depth + 1);
        }

        self.nodes.push(KDNode::new(index));
        Ok(())
    }

    /// Insert every index yielded by `indices`, stopping at the first error.
    pub fn extend<I: IntoIterator<Item = u32>>(&mut self, indices: I) -> Result<()> {
        for index in indices {
            self.insert(index)?;
        }
        Ok(())
    }

    /// Release every node. The point buffer stays attached.
    pub fn clear(&mut self) {
        self.nodes.clear();
    }
}
