use std::fmt;

use log::debug;

use crate::error::{CloudIndexError, Result};
use crate::kdtree::index::{KDNode, KDTree};
use crate::kdtree::{IncrementalKDTree, KDTreeBuilder, KDTreeIndex};
use crate::points::PointBuffer;
use crate::r#type::IndexableNum;

/// The two ways of constructing a tree.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ConstructionPath {
    /// A balanced tree built in one pass over every attached point
    Build,
    /// A tree grown by inserting points one at a time
    Insert,
}

impl fmt::Display for ConstructionPath {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Build => write!(f, "build"),
            Self::Insert => write!(f, "insert"),
        }
    }
}

#[derive(Debug, Clone)]
enum Tree<'a, N: IndexableNum> {
    Empty,
    Built(KDTree<'a, N>),
    Inserted(IncrementalKDTree<'a, N>),
}

/// A single, mutable spatial index over a point buffer.
///
/// This combines [`KDTreeBuilder`] and [`IncrementalKDTree`] behind one value whose tree can be
/// replaced, rebuilt or cleared. Once nodes exist, the index remembers how they were created:
/// calling [`insert`][Self::insert] on a built tree, or [`build`][Self::build] on a tree grown
/// by insertion, fails with [`CloudIndexError::InconsistentConstructionPath`]. Call
/// [`clear`][Self::clear] to switch paths.
///
/// ```
/// use cloud_index::kdtree::{KDTreeIndex, SpatialIndex};
///
/// let coords = [0., 0., 0., 1., 0., 0., 0., 1., 0., 0., 0., 1., 5., 5., 5.];
/// let mut index = SpatialIndex::<f32>::with_points(&coords, 5).unwrap();
/// index.build().unwrap();
///
/// assert_eq!(index.nearest(0.1, 0.1, 0.1).unwrap(), 0);
/// let mut found = index.within(0.1, 0.1, 0.1, 1.5);
/// found.sort();
/// assert_eq!(found, vec![0, 1, 2, 3]);
///
/// assert!(index.insert(4).is_err());
/// ```
#[derive(Debug, Clone)]
pub struct SpatialIndex<'a, N: IndexableNum> {
    builder: KDTreeBuilder<'a, N>,
    tree: Tree<'a, N>,
}

impl<'a, N: IndexableNum> SpatialIndex<'a, N> {
    /// Create an index without any points attached.
    pub fn new() -> Self {
        Self {
            builder: KDTreeBuilder::from_points(PointBuffer::empty()),
            tree: Tree::Empty,
        }
    }

    /// Create an index over the first `num_points` points of `coords`. No tree exists until
    /// [`build`][Self::build] or [`insert`][Self::insert] is called.
    pub fn with_points(coords: &'a [N], num_points: usize) -> Result<Self> {
        Ok(Self {
            builder: KDTreeBuilder::new_with_num_points(coords, num_points)?,
            tree: Tree::Empty,
        })
    }

    /// Attach a new point buffer, resetting the permutation to identity and discarding any
    /// existing tree.
    ///
    /// On error the index is left unchanged.
    pub fn attach_points(&mut self, coords: &'a [N], num_points: usize) -> Result<()> {
        self.builder.attach_points(coords, num_points)?;
        self.tree = Tree::Empty;
        debug!("attached {} points", num_points);
        Ok(())
    }

    /// Build a balanced tree over every attached point, replacing any previously built tree.
    ///
    /// Building with no points attached leaves the index empty.
    pub fn build(&mut self) -> Result<()> {
        self.check_path(ConstructionPath::Build)?;
        self.tree = Tree::Built(self.builder.build());
        Ok(())
    }

    /// Insert point `index` of the attached buffer, without rebalancing.
    pub fn insert(&mut self, index: u32) -> Result<()> {
        self.check_path(ConstructionPath::Insert)?;
        if let Tree::Inserted(tree) = &mut self.tree {
            return tree.insert(index);
        }

        let mut tree = IncrementalKDTree::from_points(self.builder.points());
        tree.insert(index)?;
        self.tree = Tree::Inserted(tree);
        Ok(())
    }

    /// Release every node. The point buffer stays attached, so the index can be built or
    /// inserted into again.
    pub fn clear(&mut self) {
        self.tree = Tree::Empty;
    }

    /// How the current nodes were created, or `None` when there are no nodes.
    pub fn construction_path(&self) -> Option<ConstructionPath> {
        match &self.tree {
            Tree::Built(tree) if !tree.is_empty() => Some(ConstructionPath::Build),
            Tree::Inserted(tree) if !tree.is_empty() => Some(ConstructionPath::Insert),
            _ => None,
        }
    }

    /// The builder holding the attached points and the index permutation.
    pub fn builder(&self) -> &KDTreeBuilder<'a, N> {
        &self.builder
    }

    fn check_path(&self, attempted: ConstructionPath) -> Result<()> {
        match self.construction_path() {
            Some(existing) if existing != attempted => {
                Err(CloudIndexError::InconsistentConstructionPath {
                    attempted,
                    existing,
                })
            }
            _ => Ok(()),
        }
    }
}

impl<N: IndexableNum> Default for SpatialIndex<'_, N> {
    fn default() -> Self {
        Self::new()
    }
}

impl<N: IndexableNum> KDTreeIndex<N> for SpatialIndex<'_, N> {
    fn points(&self) -> PointBuffer<'_, N> {
        self.builder.points()
    }

    fn nodes(&self) -> &[KDNode] {
        match &self.tree {
            Tree::Empty => &[],
            Tree::Built(tree) => tree.nodes(),
            Tree::Inserted(tree) => tree.nodes(),
        }
    }
}
