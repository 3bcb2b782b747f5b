use crate::{DistanceFunction, Primitive};

/// Squared euclidean distance. The square root is skipped, since it does not change which centroid is nearest.
#[derive(Clone, Copy, Debug, Default)]
pub struct EuclideanDistance;

impl<T: Primitive> DistanceFunction<T> for EuclideanDistance {
    #[inline(always)]
    fn distance(&self, a: &[T], b: &[T]) -> T {
        a.iter().cloned()
            .zip(b.iter().cloned())
            .map(|(sp, cp)| sp - cp)         // <sample> - <centroid>
            .map(|v| v * v)                  // <vec_components> ^2
            .sum::<T>()                      // sum(<vec_components>^2)
    }
}
