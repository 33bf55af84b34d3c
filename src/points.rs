//! A borrowed buffer of interleaved `x, y, z` coordinates.

use crate::error::{CloudIndexError, Result};
use crate::kdtree::constants::DIMENSIONS;
use crate::r#type::IndexableNum;

/// A validated, borrowed view onto a caller-owned point buffer.
///
/// Point `i` occupies `coords[3 * i..3 * i + 3]`. The buffer is never copied or mutated, and the
/// borrow guarantees it outlives every tree built on top of it.
///
/// Construction checks that the buffer is long enough and that no attached point has a NaN
/// coordinate.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct PointBuffer<'a, N: IndexableNum> {
    coords: &'a [N],
    num_items: usize,
}

impl<'a, N: IndexableNum> PointBuffer<'a, N> {
    /// A buffer without any points.
    pub fn empty() -> Self {
        Self {
            coords: &[],
            num_items: 0,
        }
    }

    /// View every complete `x, y, z` triple of `coords` as a point. Trailing values that don't
    /// form a full point are ignored.
    pub fn try_new(coords: &'a [N]) -> Result<Self> {
        Self::try_new_with_num_points(coords, coords.len() / DIMENSIONS)
    }

    /// View the first `num_items` points of `coords`.
    pub fn try_new_with_num_points(coords: &'a [N], num_items: usize) -> Result<Self> {
        let too_short = num_items
            .checked_mul(DIMENSIONS)
            .map_or(true, |len| len > coords.len());
        if too_short || num_items > u32::MAX as usize {
            return Err(CloudIndexError::InvalidPointBuffer {
                len: coords.len(),
                num_items,
            });
        }

        let coords = &coords[..num_items * DIMENSIONS];
        if let Some(pos) = coords.iter().position(|c| c.is_nan()) {
            return Err(CloudIndexError::InvalidCoordinate {
                index: pos / DIMENSIONS,
            });
        }

        Ok(Self { coords, num_items })
    }

    /// View raw bytes, for example a point cloud read straight from disk, as coordinates.
    ///
    /// The bytes must be aligned for `N` and their length a multiple of its size.
    pub fn try_from_bytes(bytes: &'a [u8]) -> Result<Self> {
        let coords: &[N] = bytemuck::try_cast_slice(bytes).map_err(CloudIndexError::ByteCast)?;
        Self::try_new(coords)
    }

    /// The number of points in this buffer.
    #[inline]
    pub fn num_items(&self) -> usize {
        self.num_items
    }

    /// Returns `true` if the buffer holds no points.
    #[inline]
    pub fn is_empty(&self) -> bool {
        self.num_items == 0
    }

    /// The underlying interleaved coordinates, `3 * num_items` long.
    #[inline]
    pub fn coords(&self) -> &'a [N] {
        self.coords
    }

    /// Bounds-checked access to point `index`.
    pub fn get(&self, index: usize) -> Result<[N; 3]> {
        if index >= self.num_items {
            return Err(CloudIndexError::IndexOutOfRange {
                index,
                num_items: self.num_items,
            });
        }
        Ok(self.xyz(index as u32))
    }

    /// Point `index`, which must already be known to be in range.
    #[inline]
    pub(crate) fn xyz(&self, index: u32) -> [N; 3] {
        let i = index as usize * DIMENSIONS;
        [self.coords[i], self.coords[i + 1], self.coords[i + 2]]
    }

    /// One coordinate of point `index`, which must already be known to be in range.
    #[inline]
    pub(crate) fn coord(&self, index: u32, axis: usize) -> N {
        self.coords[index as usize * DIMENSIONS + axis]
    }
}

impl<N: IndexableNum> Default for PointBuffer<'_, N> {
    fn default() -> Self {
        Self::empty()
    }
}
