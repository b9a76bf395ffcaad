use crate::region::Region;

/// Merge cost between two adjacent regions.
///
/// Implementations must be symmetric in `a` and `b` and return a value
/// `>= 0`; lower means more similar. Non-finite results are treated as
/// "never merge" by the scheduler.
pub trait MergeCost: Send + Sync {
    fn cost(&self, a: &Region, b: &Region, shared_boundary: u32) -> f64;
}

impl<C: MergeCost + ?Sized> MergeCost for &C {
    fn cost(&self, a: &Region, b: &Region, shared_boundary: u32) -> f64 {
        (**self).cost(a, b, shared_boundary)
    }
}
