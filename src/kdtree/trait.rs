use geo_traits::CoordTrait;
#[cfg(feature = "rayon")]
use rayon::prelude::*;
use tinyvec::TinyVec;

use crate::error::{CloudIndexError, Result};
use crate::kdtree::constants::{DIMENSIONS, NO_CHILD, STACK_CAPACITY};
use crate::kdtree::index::{KDNode, KDTree};
use crate::kdtree::{IncrementalKDTree, Node};
use crate::points::PointBuffer;
use crate::r#type::{coord_xyz, IndexableNum};
use crate::util::sq_dist3;

/// A trait for searching and accessing data out of a KDTree.
///
/// Every query keeps its state on the call stack, so a tree can be queried from several threads
/// at once.
pub trait KDTreeIndex<N: IndexableNum>: Sized {
    /// The point buffer this tree indexes
    fn points(&self) -> PointBuffer<'_, N>;

    /// The node arena of this tree. The root, if any, is at position 0.
    fn nodes(&self) -> &[KDNode];

    /// The number of points in the attached point buffer
    fn num_items(&self) -> usize {
        self.points().num_items()
    }

    /// The number of nodes in this tree
    fn num_nodes(&self) -> usize {
        self.nodes().len()
    }

    /// Returns `true` if this tree has no nodes.
    fn is_empty(&self) -> bool {
        self.nodes().is_empty()
    }

    /// Bounds-checked access to point `index` of the point buffer.
    fn point(&self, index: usize) -> Result<[N; 3]> {
        self.points().get(index)
    }

    /// Access the root node of the KDTree for manual traversal.
    fn root(&self) -> Option<Node<'_, N, Self>> {
        (!self.is_empty()).then(|| Node::new(self, 0, 0))
    }

    /// The number of levels of this tree. An empty tree has depth 0.
    fn depth(&self) -> usize {
        let mut depth = 0;
        self.traverse(|node| depth = depth.max(node.depth() + 1));
        depth
    }

    /// Visit every node in pre-order: a node, then its left subtree, then its right subtree.
    fn traverse<F: FnMut(&Node<'_, N, Self>)>(&self, callback: F) {
        if let Some(root) = self.root() {
            root.traverse(callback);
        }
    }

    /// Search for the node holding the point closest to the query point.
    ///
    /// Returns `None` only for an empty tree. When several points are equally close, the first
    /// one reached by the depth-first search wins.
    fn nearest_node(&self, qx: N, qy: N, qz: N) -> Option<Node<'_, N, Self>> {
        nearest_search(self, [qx, qy, qz]).map(|(pos, depth, _)| Node::new(self, pos, depth))
    }

    /// Search for the point closest to the query point.
    ///
    /// Returns the index of the point in the point buffer, or
    /// [`CloudIndexError::EmptyStructure`] for an empty tree.
    fn nearest(&self, qx: N, qy: N, qz: N) -> Result<u32> {
        self.nearest_node(qx, qy, qz)
            .map(|node| node.index())
            .ok_or(CloudIndexError::EmptyStructure)
    }

    /// Search for the point closest to the query point, returning its index together with its
    /// squared distance to the query.
    fn nearest_with_distance(&self, qx: N, qy: N, qz: N) -> Result<(u32, N)> {
        let (pos, _, d2) =
            nearest_search(self, [qx, qy, qz]).ok_or(CloudIndexError::EmptyStructure)?;
        Ok((self.nodes()[pos as usize].index, d2))
    }

    /// Search for the point closest to the given coordinate.
    ///
    /// Two-dimensional coordinates are treated as lying on the `z = 0` plane.
    fn nearest_coord(&self, coord: &impl CoordTrait<T = N>) -> Result<u32> {
        let [x, y, z] = coord_xyz(coord);
        self.nearest(x, y, z)
    }

    /// Nearest point for each query in a flat `x, y, z` buffer. Entries are `None` only when the
    /// tree is empty.
    ///
    /// With the `rayon` feature, queries run in parallel.
    fn nearest_batch(&self, queries: &[N]) -> Result<Vec<Option<u32>>>
    where
        Self: Sync,
    {
        if queries.len() % DIMENSIONS != 0 {
            return Err(CloudIndexError::InvalidPointBuffer {
                len: queries.len(),
                num_items: queries.len().div_ceil(DIMENSIONS),
            });
        }

        #[cfg(feature = "rayon")]
        let chunks = queries.par_chunks_exact(DIMENSIONS);
        #[cfg(not(feature = "rayon"))]
        let chunks = queries.chunks_exact(DIMENSIONS);

        Ok(chunks
            .map(|q| self.nearest_node(q[0], q[1], q[2]).map(|node| node.index()))
            .collect())
    }

    /// Search the index for points within a given radius.
    ///
    /// - qx: x value of query point
    /// - qy: y value of query point
    /// - qz: z value of query point
    /// - r: radius, not squared
    ///
    /// A point is included when its distance to the query is at most `r`. Returns indices of
    /// found points, in no particular order.
    fn within(&self, qx: N, qy: N, qz: N, r: N) -> Vec<u32> {
        let nodes = self.nodes();
        let points = self.points();
        let mut result: Vec<u32> = vec![];
        // negated so a NaN radius matches nothing
        if nodes.is_empty() || !(r >= N::zero()) {
            return result;
        }

        let query = [qx, qy, qz];
        let r2 = r * r;

        // Use TinyVec to avoid heap allocations
        let mut stack: TinyVec<[(u32, u32); STACK_CAPACITY]> = TinyVec::new();
        stack.push((0, 0));

        while let Some((pos, depth)) = stack.pop() {
            let node = nodes[pos as usize];
            let p = points.xyz(node.index);
            if sq_dist3(p, query) <= r2 {
                result.push(node.index);
            }

            let axis = depth as usize % DIMENSIONS;
            let diff = query[axis] - p[axis];
            let (near, far) = if query[axis] < p[axis] {
                (node.left, node.right)
            } else {
                (node.right, node.left)
            };

            // the far half can only hold matches if the ball crosses the splitting plane
            if far != NO_CHILD && diff * diff <= r2 {
                stack.push((far, depth + 1));
            }
            if near != NO_CHILD {
                stack.push((near, depth + 1));
            }
        }

        result
    }

    /// Search the index for points within a given radius of a coordinate.
    ///
    /// Two-dimensional coordinates are treated as lying on the `z = 0` plane.
    fn within_coord(&self, coord: &impl CoordTrait<T = N>, r: N) -> Vec<u32> {
        let [x, y, z] = coord_xyz(coord);
        self.within(x, y, z, r)
    }
}

/// Branch-and-bound nearest neighbor search, returning the arena position, depth and squared
/// distance of the best node.
fn nearest_search<N: IndexableNum, T: KDTreeIndex<N>>(
    tree: &T,
    query: [N; 3],
) -> Option<(u32, u32, N)> {
    let nodes = tree.nodes();
    let points = tree.points();
    if nodes.is_empty() {
        return None;
    }

    let mut best = (0, 0);
    let mut best_d2 = N::infinity();

    // Each entry carries the squared distance from the query to the plane separating it from
    // the query's side, checked when popped against the best distance found by then.
    let mut stack: TinyVec<[(u32, u32, N); STACK_CAPACITY]> = TinyVec::new();
    stack.push((0, 0, N::zero()));

    while let Some((pos, depth, plane_d2)) = stack.pop() {
        if plane_d2 >= best_d2 {
            continue;
        }

        let node = nodes[pos as usize];
        let p = points.xyz(node.index);
        let d2 = sq_dist3(p, query);
        if d2 < best_d2 {
            best = (pos, depth);
            best_d2 = d2;
        }

        let axis = depth as usize % DIMENSIONS;
        let diff = query[axis] - p[axis];
        let (near, far) = if query[axis] < p[axis] {
            (node.left, node.right)
        } else {
            (node.right, node.left)
        };

        // pushed first so the near side is searched to completion before it
        if far != NO_CHILD {
            stack.push((far, depth + 1, diff * diff));
        }
        if near != NO_CHILD {
            stack.push((near, depth + 1, N::zero()));
        }
    }

    Some((best.0, best.1, best_d2))
}

impl<N: IndexableNum> KDTreeIndex<N> for KDTree<'_, N> {
    fn points(&self) -> PointBuffer<'_, N> {
        self.points
    }

    fn nodes(&self) -> &[KDNode] {
        &self.nodes
    }
}

impl<N: IndexableNum> KDTreeIndex<N> for IncrementalKDTree<'_, N> {
    fn points(&self) -> PointBuffer<'_, N> {
        self.points
    }

    fn nodes(&self) -> &[KDNode] {
        &self.nodes
    }
}
