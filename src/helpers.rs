use std::cmp::Ordering;
use crate::memory::Primitive;

/// Index of the smallest value (first one on ties). NaN compares as equal so it never panics.
pub(crate) fn argmin<T: Primitive>(values: impl Iterator<Item = T>) -> Option<(usize, T)> {
    values.enumerate()
        .min_by(|(_,d0), (_,d1)| d0.partial_cmp(d1).unwrap_or(Ordering::Equal))
}

#[cfg(test)]
macro_rules! assert_approx_eq {
	($left: expr, $right: expr, $tol: expr) => ({
		match ($left, $right, $tol) {
			(left_val , right_val, tol_val) => {
				let delta = (left_val - right_val).abs();
				if !(delta < tol_val) {
					panic!(
						"assertion failed: `(left ≈ right)` \
						(left: `{}`, right: `{}`) \
						with ∆={:1.1e} (allowed ∆={:e})",
						left_val , right_val, delta, tol_val
					)
				}
			}
		}
	});
	($left: expr, $right: expr) => (assert_approx_eq!(($left), ($right), 1e-15))
}
