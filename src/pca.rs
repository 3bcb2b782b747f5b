use crate::memory::*;
use nalgebra::{DMatrix, SymmetricEigen};
use rayon::prelude::*;
use std::cmp::Ordering;

/// Eigenvalues at or below this fraction of the total variance are treated as missing directions.
const EIGENVALUE_CUTOFF: f64 = 1e-12;

/// Principal component analysis via eigen-decomposition of the covariance matrix.
///
/// ## Fields
/// - **mean**: Column means of the fitted samples (subtracted before projecting)
/// - **components**: Principal axes [row-major] = [<component0>,<component1>,...], ordered by descending
///   explained variance. Directions that do not exist in the data are all-zero rows.
/// - **explained_variance**: Eigenvalue belonging to each component
#[derive(Clone, Debug)]
pub struct Pca<T: Primitive> {
    sample_dims: usize,
    n_components: usize,
    mean: Vec<T>,
    components: Vec<T>,
    explained_variance: Vec<T>,
    total_variance: T,
}
impl<T: Primitive> Pca<T> {
    /// Fit the principal axes of a row-major sample matrix.
    ///
    /// Never fails: with less than two samples, or when the data spans fewer than **n_components**
    /// directions, the missing components are zero and project every sample onto `0`.
    ///
    /// The sign of each component is fixed so that its largest loading (by absolute value) is positive.
    pub fn fit(samples: &[T], sample_cnt: usize, sample_dims: usize, n_components: usize) -> Self {
        assert!(samples.len() == sample_cnt * sample_dims);
        let mut pca = Self {
            sample_dims,
            n_components,
            mean: vec![T::zero(); sample_dims],
            components: vec![T::zero(); n_components * sample_dims],
            explained_variance: vec![T::zero(); n_components],
            total_variance: T::zero(),
        };
        if sample_cnt < 2 || sample_dims == 0 {
            if sample_cnt == 1 {
                pca.mean = samples.to_vec();
            }
            return pca;
        }

        let n: T = cast(sample_cnt);
        samples.chunks_exact(sample_dims).for_each(|s| {
            pca.mean.iter_mut().zip(s.iter()).for_each(|(m, v)| *m += v);
        });
        pca.mean.iter_mut().for_each(|m| *m = *m / n);

        // Covariance matrix (sample covariance, n - 1)
        let mut covariance = vec![0.0f64; sample_dims * sample_dims];
        let mut centered = vec![0.0f64; sample_dims];
        samples.chunks_exact(sample_dims).for_each(|s| {
            centered.iter_mut().zip(s.iter().cloned().zip(pca.mean.iter().cloned()))
                .for_each(|(c, (v, m))| *c = (v - m).to_f64().unwrap_or(0.0));
            for i in 0..sample_dims {
                for j in i..sample_dims {
                    covariance[i * sample_dims + j] += centered[i] * centered[j];
                }
            }
        });
        let denom = (sample_cnt - 1) as f64;
        for i in 0..sample_dims {
            for j in i..sample_dims {
                let c = covariance[i * sample_dims + j] / denom;
                covariance[i * sample_dims + j] = c;
                covariance[j * sample_dims + i] = c;
            }
        }

        let eigen = SymmetricEigen::new(DMatrix::from_row_slice(sample_dims, sample_dims, &covariance));
        let eigenvalues: Vec<f64> = eigen.eigenvalues.iter().cloned().collect();
        let total: f64 = (0..sample_dims).map(|d| covariance[d * sample_dims + d]).sum();
        pca.total_variance = cast(total);

        let mut order: Vec<usize> = (0..sample_dims).collect();
        order.sort_by(|&a, &b| eigenvalues[b].partial_cmp(&eigenvalues[a]).unwrap_or(Ordering::Equal));

        let cutoff = EIGENVALUE_CUTOFF * total.max(1.0);
        for (ci, &ei) in order.iter().take(n_components).enumerate() {
            if !(eigenvalues[ei] > cutoff) {
                continue;
            }
            let axis = eigen.eigenvectors.column(ei);
            let pivot = axis.iter().cloned()
                .fold((0.0f64, 0.0f64), |best, v| if v.abs() > best.0 { (v.abs(), v) } else { best }).1;
            let sign = if pivot < 0.0 { -1.0 } else { 1.0 };
            pca.components.set_nth_from_iter(sample_dims, ci, axis.iter().map(|v| cast(v * sign)));
            pca.explained_variance[ci] = cast(eigenvalues[ei]);
        }
        pca
    }

    pub fn n_components(&self) -> usize { self.n_components }

    /// Principal axes [row-major], one row of length `sample_dims` per component.
    pub fn components(&self) -> &[T] { &self.components }

    pub fn explained_variance(&self) -> &[T] { &self.explained_variance }

    /// Share of the total variance explained by each component (all zero for data without variance).
    pub fn explained_variance_ratio(&self) -> Vec<T> {
        self.explained_variance.iter()
            .map(|&v| if self.total_variance > T::zero() { v / self.total_variance } else { T::zero() })
            .collect()
    }

    /// Project a row-major matrix onto the principal axes. Returns [row-major] `n_components` values per sample.
    pub fn transform(&self, samples: &[T]) -> Vec<T> {
        assert!(self.sample_dims > 0 && samples.len() % self.sample_dims == 0);
        let sample_cnt = samples.len() / self.sample_dims;
        let mut projection = vec![T::zero(); sample_cnt * self.n_components];
        if self.n_components == 0 {
            return projection;
        }
        projection.par_chunks_exact_mut(self.n_components)
            .zip(samples.par_chunks_exact(self.sample_dims))
            .for_each(|(p, s)| {
                p.iter_mut().zip(self.components.chunks_exact(self.sample_dims)).for_each(|(p, axis)| {
                    *p = s.iter().cloned().zip(self.mean.iter().cloned()).zip(axis.iter().cloned())
                        .map(|((v, m), a)| (v - m) * a)
                        .sum();
                });
            });
        projection
    }
}



#[cfg(test)]
mod tests {
    use super::*;
    use rand::prelude::*;

    fn dot(a: &[f64], b: &[f64]) -> f64 { a.iter().zip(b).map(|(a, b)| a * b).sum() }

    #[test]
    fn finds_dominant_axes() {
        // Data stretched along x (sd 10), then y (sd 3), z nearly flat (sd 0.1)
        let mut rnd = StdRng::seed_from_u64(42);
        let sample_cnt = 2000;
        let samples: Vec<f64> = (0..sample_cnt)
            .flat_map(|_| vec![rnd.gen_range(-17.3..17.3), rnd.gen_range(-5.2..5.2), rnd.gen_range(-0.17..0.17)])
            .collect();
        let pca = Pca::fit(&samples, sample_cnt, 3, 3);

        let axes: Vec<&[f64]> = pca.components().chunks_exact(3).collect();
        assert!(dot(axes[0], &[1.0, 0.0, 0.0]).abs() > 0.99);
        assert!(dot(axes[1], &[0.0, 1.0, 0.0]).abs() > 0.99);
        assert!(dot(axes[2], &[0.0, 0.0, 1.0]).abs() > 0.99);
        for i in 0..3 {
            assert_approx_eq!(dot(axes[i], axes[i]), 1.0, 1e-9);
            // largest loading is positive
            assert!(axes[i].iter().cloned().fold(f64::MIN, f64::max) > 0.5);
        }
        let ratio = pca.explained_variance_ratio();
        assert!(ratio[0] > ratio[1] && ratio[1] > ratio[2]);
        assert_approx_eq!(ratio.iter().sum::<f64>(), 1.0, 1e-9);
    }

    #[test]
    fn projection_preserves_variance_of_first_component() {
        let mut rnd = StdRng::seed_from_u64(3);
        let sample_cnt = 1000;
        let samples: Vec<f64> = (0..sample_cnt)
            .flat_map(|_| { let t: f64 = rnd.gen_range(-1.0..1.0); vec![t, 2.0 * t, rnd.gen_range(-0.01..0.01)] })
            .collect();
        let pca = Pca::fit(&samples, sample_cnt, 3, 2);
        let projection = pca.transform(&samples);
        assert_eq!(projection.len(), sample_cnt * 2);

        let first: Vec<f64> = projection.iter().step_by(2).cloned().collect();
        let mean = first.iter().sum::<f64>() / sample_cnt as f64;
        let var = first.iter().map(|v| (v - mean) * (v - mean)).sum::<f64>() / (sample_cnt - 1) as f64;
        assert_approx_eq!(mean, 0.0, 1e-9);
        assert_approx_eq!(var, pca.explained_variance()[0], 1e-9);
    }

    #[test]
    fn missing_directions_project_to_zero() {
        // all samples on a line: only one informative direction
        let samples = vec![0.0f64, 0.0, 0.0, 1.0, 1.0, 0.0, 2.0, 2.0, 0.0, 3.0, 3.0, 0.0];
        let pca = Pca::fit(&samples, 4, 3, 3);
        let projection = pca.transform(&samples);
        for p in projection.chunks_exact(3) {
            assert_approx_eq!(p[1], 0.0, 1e-12);
            assert_approx_eq!(p[2], 0.0, 1e-12);
        }
        assert_approx_eq!(projection[0], -1.5 * 2f64.sqrt(), 1e-9);
        assert_approx_eq!(projection[9], 1.5 * 2f64.sqrt(), 1e-9);
    }

    #[test]
    fn degenerate_inputs() {
        let flat = Pca::fit(&[0.0f64; 27], 3, 9, 3);
        assert_eq!(flat.transform(&[0.0f64; 27]), vec![0.0; 9]);
        assert_eq!(flat.explained_variance_ratio(), vec![0.0; 3]);

        let single = Pca::fit(&[1.0f64, 2.0], 1, 2, 3);
        assert_eq!(single.transform(&[1.0, 2.0]), vec![0.0; 3]);

        let empty = Pca::<f64>::fit(&[], 0, 9, 3);
        assert!(empty.transform(&[]).is_empty());

        let more_components_than_dims = Pca::fit(&[0.0f64, 1.0, 2.0, 4.0], 4, 1, 3);
        let projection = more_components_than_dims.transform(&[0.0f64, 1.0, 2.0, 4.0]);
        assert!(projection.chunks_exact(3).all(|p| p[1] == 0.0 && p[2] == 0.0));
    }

    #[test]
    fn works_with_f32() {
        let samples: Vec<f32> = (0..100).flat_map(|i| vec![i as f32, 0.5 * i as f32]).collect();
        let pca = Pca::fit(&samples, 100, 2, 1);
        assert_eq!(pca.transform(&samples).len(), 100);
        assert!(pca.explained_variance_ratio()[0] > 0.999);
    }
}
