use crate::memory::*;

/// Per-column standardization (zero mean, unit population variance).
///
/// Fitted once on a row-major sample matrix; the same statistics can then be applied to any matrix
/// with the same amount of columns. Columns without variance are mapped to zero.
#[derive(Clone, Debug, PartialEq)]
pub struct Standardizer<T: Primitive> {
    means: Vec<T>,
    std_devs: Vec<T>,
}
impl<T: Primitive> Standardizer<T> {
    /// Fit column statistics.
    ///
    /// ## Arguments
    /// - **samples**: Vector of samples [row-major] = [<sample0>,<sample1>,<sample2>,...]
    /// - **sample_cnt**: Amount of samples, contained in the passed **samples** vector
    /// - **sample_dims**: Amount of dimensions each sample from the **sample** vector has
    pub fn fit(samples: &[T], sample_cnt: usize, sample_dims: usize) -> Self {
        assert!(samples.len() == sample_cnt * sample_dims);
        if sample_cnt == 0 {
            return Self { means: vec![T::zero(); sample_dims], std_devs: vec![T::zero(); sample_dims] };
        }
        let n: T = cast(sample_cnt);

        let mut means = vec![T::zero(); sample_dims];
        let mut lows = vec![T::infinity(); sample_dims];
        let mut highs = vec![T::neg_infinity(); sample_dims];
        samples.chunks_exact(sample_dims).for_each(|s| {
            for d in 0..sample_dims {
                means[d] += s[d];
                lows[d] = lows[d].min(s[d]);
                highs[d] = highs[d].max(s[d]);
            }
        });
        means.iter_mut().for_each(|m| *m = *m / n);

        let mut std_devs = vec![T::zero(); sample_dims];
        samples.chunks_exact(sample_dims).for_each(|s| {
            for d in 0..sample_dims {
                let centered = s[d] - means[d];
                std_devs[d] += centered * centered;
            }
        });
        for d in 0..sample_dims {
            // A constant column can still pick up rounding noise from the mean.
            let constant = lows[d] == highs[d]
                || std_devs[d] / n <= T::epsilon() * T::epsilon() * means[d] * means[d];
            std_devs[d] = if constant { T::zero() } else { (std_devs[d] / n).sqrt() };
        }

        Self { means, std_devs }
    }

    pub fn means(&self) -> &[T] { &self.means }
    pub fn std_devs(&self) -> &[T] { &self.std_devs }
    pub fn sample_dims(&self) -> usize { self.means.len() }

    /// Indices of the columns that had no variance during fitting.
    pub fn degenerate_columns(&self) -> Vec<usize> {
        self.std_devs.iter().enumerate().filter(|(_, sd)| sd.is_zero()).map(|(d, _)| d).collect()
    }

    /// Standardize a row-major matrix with the fitted statistics.
    pub fn transform(&self, samples: &[T]) -> Vec<T> {
        let dims = self.sample_dims();
        assert!(dims > 0 && samples.len() % dims == 0);
        samples.chunks_exact(dims)
            .flat_map(|s| s.iter().cloned()
                .zip(self.means.iter().cloned().zip(self.std_devs.iter().cloned()))
                .map(|(v, (mean, sd))| if sd.is_zero() { T::zero() } else { (v - mean) / sd }))
            .collect()
    }

    pub fn fit_transform(samples: &[T], sample_cnt: usize, sample_dims: usize) -> (Self, Vec<T>) {
        let standardizer = Self::fit(samples, sample_cnt, sample_dims);
        let standardized = standardizer.transform(samples);
        (standardizer, standardized)
    }
}
