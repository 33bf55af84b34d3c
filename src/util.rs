//! Distance helpers over `[x, y, z]` points.

use crate::r#type::IndexableNum;

/// Squared Euclidean distance between two points.
#[inline]
pub fn sq_dist3<N: IndexableNum>(a: [N; 3], b: [N; 3]) -> N {
    let dx = a[0] - b[0];
    let dy = a[1] - b[1];
    let dz = a[2] - b[2];
    dx * dx + dy * dy + dz * dz
}

/// Euclidean distance between two points.
#[inline]
pub fn dist3<N: IndexableNum>(a: [N; 3], b: [N; 3]) -> N {
    sq_dist3(a, b).sqrt()
}
