#![doc = include_str!("../README.md")]

mod error;
pub mod kdtree;
mod points;
mod r#type;
pub mod util;

pub use error::CloudIndexError;
pub use points::PointBuffer;
pub use r#type::{Coord, IndexableNum};
