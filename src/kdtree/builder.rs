use std::cmp::Ordering;

use log::{debug, log_enabled, Level};

use crate::error::{CloudIndexError, Result};
use crate::kdtree::constants::{DIMENSIONS, NO_CHILD};
use crate::kdtree::index::{KDNode, KDTree};
use crate::kdtree::KDTreeIndex;
use crate::points::PointBuffer;
use crate::r#type::IndexableNum;

/// A builder to create a balanced [`KDTree`].
///
/// The builder borrows the point buffer and owns the index permutation that gets partially
/// sorted while building. The points themselves are never reordered.
///
/// ```
/// use cloud_index::kdtree::{KDTreeBuilder, KDTreeIndex};
///
/// let coords = [0., 0., 0., 1., 0., 0., 5., 5., 5.];
/// let tree = KDTreeBuilder::<f32>::new(&coords).unwrap().finish();
/// assert_eq!(tree.nearest(4., 4., 4.).unwrap(), 2);
/// ```
#[derive(Debug, Clone)]
pub struct KDTreeBuilder<'a, N: IndexableNum> {
    points: PointBuffer<'a, N>,
    permutation: Vec<u32>,
}

impl<'a, N: IndexableNum> KDTreeBuilder<'a, N> {
    /// Create a new builder over every point in `coords`.
    pub fn new(coords: &'a [N]) -> Result<Self> {
        Ok(Self::from_points(PointBuffer::try_new(coords)?))
    }

    /// Create a new builder over the first `num_points` points of `coords`.
    pub fn new_with_num_points(coords: &'a [N], num_points: usize) -> Result<Self> {
        Ok(Self::from_points(PointBuffer::try_new_with_num_points(
            coords, num_points,
        )?))
    }

    /// Create a new builder over coordinates stored as raw bytes.
    pub fn from_bytes(bytes: &'a [u8]) -> Result<Self> {
        Ok(Self::from_points(PointBuffer::try_from_bytes(bytes)?))
    }

    /// Create a new builder over an already validated point buffer.
    pub fn from_points(points: PointBuffer<'a, N>) -> Self {
        Self {
            points,
            permutation: identity(points.num_items()),
        }
    }

    /// Attach a different point buffer, resetting the permutation to identity.
    ///
    /// On error the previously attached points are kept.
    pub fn attach_points(&mut self, coords: &'a [N], num_points: usize) -> Result<()> {
        self.points = PointBuffer::try_new_with_num_points(coords, num_points)?;
        self.permutation = identity(num_points);
        Ok(())
    }

    /// The attached point buffer.
    pub fn points(&self) -> PointBuffer<'a, N> {
        self.points
    }

    /// The index permutation, in its current partially sorted order.
    pub fn permutation(&self) -> &[u32] {
        &self.permutation
    }

    /// The point at `position` of the permutation.
    pub fn mapped_point(&self, position: usize) -> Result<[N; 3]> {
        let index = self
            .permutation
            .get(position)
            .ok_or_else(|| CloudIndexError::IndexOutOfRange {
                index: position,
                num_items: self.permutation.len(),
            })?;
        Ok(self.points.xyz(*index))
    }

    /// Build a balanced tree over every attached point.
    ///
    /// This can be called repeatedly; each call starts from the permutation left by the previous
    /// one and produces a new, independent tree.
    pub fn build(&mut self) -> KDTree<'a, N> {
        let nodes = build_nodes(&mut self.permutation, self.points);
        let tree = KDTree {
            points: self.points,
            nodes,
        };

        if log_enabled!(Level::Debug) {
            debug!(
                "built kd-tree over {} points ({} nodes, depth {})",
                self.points.num_items(),
                tree.num_nodes(),
                tree.depth()
            );
        }

        tree
    }

    /// Consume this builder, generating a KDTree ready for queries.
    pub fn finish(mut self) -> KDTree<'a, N> {
        self.build()
    }
}

fn identity(num_items: usize) -> Vec<u32> {
    (0..num_items as u32).collect()
}

#[derive(Debug, Clone, Copy)]
enum Side {
    Left,
    Right,
}

/// A pending half-open range `[start, end)` of the permutation at a given depth, to be linked
/// into `parent` on `side`.
#[derive(Debug, Clone, Copy)]
struct Task {
    start: usize,
    end: usize,
    depth: usize,
    parent: u32,
    side: Side,
}

/// kd-sort the permutation and emit one arena node per point. The root is emitted first, so it
/// lands at position 0.
fn build_nodes<N: IndexableNum>(ids: &mut [u32], points: PointBuffer<N>) -> Vec<KDNode> {
    let mut nodes = Vec::with_capacity(ids.len());
    if ids.is_empty() {
        return nodes;
    }

    let mut stack = vec![Task {
        start: 0,
        end: ids.len(),
        depth: 0,
        parent: NO_CHILD,
        side: Side::Left,
    }];

    while let Some(task) = stack.pop() {
        let axis = task.depth % DIMENSIONS;
        let m = task.start + select_median(&mut ids[task.start..task.end], points, axis);

        let pos = nodes.len() as u32;
        nodes.push(KDNode::new(ids[m]));
        if task.parent != NO_CHILD {
            let parent = &mut nodes[task.parent as usize];
            match task.side {
                Side::Left => parent.left = pos,
                Side::Right => parent.right = pos,
            }
        }

        if m + 1 < task.end {
            stack.push(Task {
                start: m + 1,
                end: task.end,
                depth: task.depth + 1,
                parent: pos,
                side: Side::Right,
            });
        }
        if task.start < m {
            stack.push(Task {
                start: task.start,
                end: m,
                depth: task.depth + 1,
                parent: pos,
                side: Side::Left,
            });
        }
    }

    nodes
}

/// Reorder `ids` around its median on `axis` and return the median's position.
///
/// Everything before the returned position is strictly smaller on `axis`, everything after is
/// greater or equal. With duplicate keys the median is moved to the front of its run of equal
/// values, so the position can fall left of the middle.
fn select_median<N: IndexableNum>(ids: &mut [u32], points: PointBuffer<N>, axis: usize) -> usize {
    let k = ids.len() >> 1;
    let (lower, median, _) = ids.select_nth_unstable_by(k, |&a, &b| {
        points
            .coord(a, axis)
            .partial_cmp(&points.coord(b, axis))
            .unwrap_or(Ordering::Equal)
    });
    let t = points.coord(*median, axis);

    // lower holds values <= t; gather the strictly smaller ones at its front
    let mut boundary = 0;
    for i in 0..lower.len() {
        if points.coord(lower[i], axis) < t {
            lower.swap(boundary, i);
            boundary += 1;
        }
    }

    if boundary < k {
        ids.swap(boundary, k);
    }
    boundary
}
