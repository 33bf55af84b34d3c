/// Number of coordinates stored per point.
pub(crate) const DIMENSIONS: usize = 3;

/// Arena position marking an absent child.
pub(crate) const NO_CHILD: u32 = u32::MAX;

/// Inline capacity of query stacks. A balanced tree over `u32::MAX` points is at most 32 levels
/// deep; deeper, incrementally grown trees spill to the heap.
pub(crate) const STACK_CAPACITY: usize = 33;
