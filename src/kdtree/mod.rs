//! A 3D K-D Tree over a borrowed point buffer.
//!
//! Build a balanced tree with [`KDTreeBuilder`], grow one point at a time with
//! [`IncrementalKDTree`], or use [`SpatialIndex`] to do either through a single value. All of
//! them are queried through [`KDTreeIndex`].

#![warn(missing_docs)]

mod builder;
pub(crate) mod constants;
mod incremental;
mod index;
mod spatial;
mod r#trait;
mod traversal;

pub use builder::KDTreeBuilder;
pub use incremental::IncrementalKDTree;
pub use index::{KDNode, KDTree};
pub use r#trait::KDTreeIndex;
pub use spatial::{ConstructionPath, SpatialIndex};
pub use traversal::Node;

#[cfg(test)]
mod test;
