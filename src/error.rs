use std::fmt::Debug;
use thiserror::Error;

use crate::kdtree::ConstructionPath;

/// Enum with all errors in this crate.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum CloudIndexError {
    /// A query that must produce a point was issued against a tree without nodes.
    #[error("Query issued against an empty tree.")]
    EmptyStructure,

    /// A point index past the end of the attached point buffer.
    #[error("Point index {index} out of range for {num_items} points.")]
    IndexOutOfRange { index: usize, num_items: usize },

    /// Balanced building and incremental insertion were mixed on one index.
    #[error("Cannot {attempted} into a tree that was constructed by {existing}.")]
    InconsistentConstructionPath {
        attempted: ConstructionPath,
        existing: ConstructionPath,
    },

    /// The coordinate buffer is too short for the requested number of points, or the point
    /// count does not fit in a `u32`.
    #[error("Coordinate buffer of length {len} cannot hold {num_items} points.")]
    InvalidPointBuffer { len: usize, num_items: usize },

    /// A point has a NaN coordinate, which cannot be ordered along an axis.
    #[error("Point {index} has a NaN coordinate.")]
    InvalidCoordinate { index: usize },

    /// Raw bytes could not be viewed as a coordinate slice.
    #[error("Cannot view bytes as coordinates: {0:?}")]
    ByteCast(bytemuck::PodCastError),
}

pub type Result<T> = std::result::Result<T, CloudIndexError>;
