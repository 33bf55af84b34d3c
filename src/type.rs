use std::fmt::Debug;

use geo_traits::{CoordTrait, Dimensions};
use num_traits::{Float, Num, NumCast, ToPrimitive};

/// A trait for types that can be used for indexed coordinates.
///
/// This trait is sealed and cannot be implemented for external types. Only floating point
/// coordinates are supported, since the tree orders points with `<` along each axis and compares
/// squared Euclidean distances.
pub trait IndexableNum:
    private::Sealed
    + Num
    + NumCast
    + ToPrimitive
    + Float
    + PartialOrd
    + Default
    + Debug
    + Send
    + Sync
    + bytemuck::Pod
{
    /// The number of bytes per element
    const BYTES_PER_ELEMENT: usize;
}

impl IndexableNum for f32 {
    const BYTES_PER_ELEMENT: usize = 4;
}

impl IndexableNum for f64 {
    const BYTES_PER_ELEMENT: usize = 8;
}

/// A single 3D coordinate.
///
/// Returned by [`Node::coord`][crate::kdtree::Node::coord] and usable anywhere a
/// [`CoordTrait`] query is accepted.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Coord<N: IndexableNum> {
    pub(crate) x: N,
    pub(crate) y: N,
    pub(crate) z: N,
}

impl<N: IndexableNum> Coord<N> {
    /// Create a new coordinate.
    pub fn new(x: N, y: N, z: N) -> Self {
        Self { x, y, z }
    }

    /// The `z` value of this coordinate.
    pub fn z(&self) -> N {
        self.z
    }

    /// The coordinate as an `[x, y, z]` array.
    pub fn to_array(&self) -> [N; 3] {
        [self.x, self.y, self.z]
    }
}

impl<N: IndexableNum> From<[N; 3]> for Coord<N> {
    fn from([x, y, z]: [N; 3]) -> Self {
        Self { x, y, z }
    }
}

impl<N: IndexableNum> CoordTrait for Coord<N> {
    type T = N;

    fn dim(&self) -> Dimensions {
        Dimensions::Xyz
    }

    fn x(&self) -> Self::T {
        self.x
    }

    fn y(&self) -> Self::T {
        self.y
    }

    fn nth_or_panic(&self, n: usize) -> Self::T {
        match n {
            0 => self.x,
            1 => self.y,
            2 => self.z,
            _ => panic!("Invalid index of coord"),
        }
    }
}

/// Read `[x, y, z]` out of any coordinate. Coordinates without a `z` dimension sit on the
/// `z = 0` plane.
pub(crate) fn coord_xyz<N: IndexableNum>(coord: &impl CoordTrait<T = N>) -> [N; 3] {
    let z = match coord.dim() {
        Dimensions::Xyz | Dimensions::Xyzm => coord.nth_or_panic(2),
        Dimensions::Unknown(n) if n >= 3 => coord.nth_or_panic(2),
        _ => N::zero(),
    };
    [coord.x(), coord.y(), z]
}

// https://rust-lang.github.io/api-guidelines/future-proofing.html#sealed-traits-protect-against-downstream-implementations-c-sealed
mod private {
    pub trait Sealed {}

    impl Sealed for f32 {}
    impl Sealed for f64 {}
}
