use num::{NumCast, Zero, Float};
use std::{
    fmt::{Debug, Display, LowerExp}, iter::Sum, ops::{Add, AddAssign, Sub, SubAssign}
};
use rand::distributions::uniform::SampleUniform;

/// Floating point type the numeric stages (standardization, PCA, k-means) are generic over.
pub trait Primitive: Add + AddAssign + Sum + Sub + SubAssign + Zero + Float + NumCast + SampleUniform
                + PartialOrd + Copy + Default + Display + Debug + Sync + Send + LowerExp + 'static
                + for<'a> AddAssign<&'a Self> + for<'a> Sub<&'a Self> {}
impl Primitive for f32 {}
impl Primitive for f64 {}


/// Row-major sample matrix helpers, shared by all numeric stages.
pub(crate) trait RowMajor<T> {
    fn row(&self, dims: usize, idx: usize) -> &[T];
    fn set_nth_from_iter(&mut self, dims: usize, idx: usize, src: impl Iterator<Item = T>);
}
impl<T: Primitive> RowMajor<T> for Vec<T> {
    #[inline(always)]
    fn row(&self, dims: usize, idx: usize) -> &[T] {
        &self[idx * dims..(idx + 1) * dims]
    }
    fn set_nth_from_iter(&mut self, dims: usize, idx: usize, src: impl Iterator<Item = T>) {
        self.iter_mut().skip(dims * idx).take(dims)
            .zip(src)
            .for_each(|(c,s)| *c = s);
    }
}

#[inline(always)]
pub(crate) fn cast<T: Primitive>(v: impl num::ToPrimitive) -> T {
    T::from(v).unwrap_or_else(T::zero)
}
