use crate::{config::DEFAULT_SEED, helpers, memory::*, AbortStrategy};
use std::cell::RefCell;
use rayon::prelude::*;
use rand::prelude::*;

pub type InitDoneCallbackFn<'a, T> = &'a dyn Fn(&KMeansState<T>);
pub type IterationDoneCallbackFn<'a, T> = &'a dyn Fn(&KMeansState<T>, usize, T);

/// Distance measure used to compare samples with centroids.
///
/// Implementations have to be monotonic in the real distance, since centroid selection only
/// compares distances with each other (e.g. squared euclidean distance is fine).
pub trait DistanceFunction<T: Primitive>: Sync {
    fn distance(&self, a: &[T], b: &[T]) -> T;
}

/// This is a structure holding various configuration options for the a k-means calculations, such as
/// the random number generator to use, or a couple of callbacks, that can be set to get status information from
/// a running k-means calculation.
///
/// For a more detailed information about all possible options, have a look at [`KMeansConfigBuilder`].
pub struct KMeansConfig<'a, T: Primitive> {
    /// Callback that is called, when the initialization phase finished
    /// ## Arguments
    /// - **state**: Current [`KMeansState`] after the initialization
    pub(crate) init_done: InitDoneCallbackFn<'a, T>,
    /// Callback that is called after each iteration
    /// ## Arguments
    /// - **state**: Current[`KMeansState`] after the iteration
    /// - **iteration_id**: Number of the current iteration
    /// - **distsum**: New distance sum (**state** contains the distsum from the previous iteration)
    pub(crate) iteration_done: IterationDoneCallbackFn<'a, T>,
    /// Random number generator to use
    pub(crate) rnd: Box<RefCell<dyn RngCore>>,
    /// The abort-strategy to use for the running calculation
    pub(crate) abort_strategy: AbortStrategy<T>,
    /// Amount of independently initialized runs, of which the one with the lowest distsum wins
    pub(crate) runs: usize,
}
impl<'a, T: Primitive> Default for KMeansConfig<'a, T> {
    fn default() -> Self {
        Self {
            init_done: &|_| {},
            iteration_done: &|_,_,_| {},
            rnd: Box::new(RefCell::new(StdRng::seed_from_u64(DEFAULT_SEED))),
            abort_strategy: AbortStrategy::<T>::CentroidShift {
                tolerance: cast(1e-4)
            },
            runs: 1,
        }
    }
}
impl<'a, T: Primitive> KMeansConfig<'a, T> {
    /// Use the [`KMeansConfigBuilder`] to build a [`KMeansConfig`] instance.
    pub fn build() -> KMeansConfigBuilder<'a, T> {
        KMeansConfigBuilder { config: KMeansConfig::default() }
    }
}
impl<'a, T: Primitive> std::fmt::Debug for KMeansConfig<'a, T> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("KMeansConfig").field("runs", &self.runs).finish_non_exhaustive()
    }
}

pub struct KMeansConfigBuilder<'a, T: Primitive> {
    config: KMeansConfig<'a, T>
}
impl<'a, T: Primitive> KMeansConfigBuilder<'a, T> {
    /// Set the callback that should be called after the centroid initialization, before the iteration starts.
    pub fn init_done(mut self, init_done: InitDoneCallbackFn<'a, T>) -> Self {
        self.config.init_done = init_done; self
    }
    /// Set the callback that should be called after each iteration during a running k-means calculation.
    pub fn iteration_done(mut self, iteration_done: IterationDoneCallbackFn<'a, T>) -> Self {
        self.config.iteration_done = iteration_done; self
    }
    /// Set the random number generator that should be used in the k-means calculation.
    /// Use a seeded generator for deterministically repeatable results.
    pub fn random_generator<R: RngCore + 'static>(mut self, rnd: R) -> Self {
        self.config.rnd = Box::new(RefCell::new(rnd)); self
    }
    /// Set the abort-strategy to use during a running k-means calculation. For more information,
    /// see documentation of [`AbortStrategy`].
    /// ## Default
    /// [`AbortStrategy::CentroidShift`] `{ tolerance: 1e-4 }`
    pub fn abort_strategy(mut self, abort_strategy: AbortStrategy<T>) -> Self {
        self.config.abort_strategy = abort_strategy; self
    }
    /// Set the amount of runs. Every run draws a new initialization from the (shared) random
    /// number generator, the run with the lowest distsum is returned. Values below 1 are treated as 1.
    /// ## Default
    /// `1`
    pub fn runs(mut self, runs: usize) -> Self {
        self.config.runs = runs.max(1); self
    }
    /// Return the internally built configuration structure.
    pub fn build(self) -> KMeansConfig<'a, T> { self.config }
}


/// This is the internally used data-structure, storing the current state during calculation, as
/// well as the final result, as returned by the API.
/// All mutations are done in this structure, making [`KMeans`] immutable.
///
/// ## Generics
/// - **T**: Underlying primitive type that was used for the calculation
///
/// ## Fields
/// - **k**: The amount of clusters that were requested when calculating this k-means result
/// - **distsum**: The total sum of (squared) distances from all samples to their respective centroids
/// - **centroids**: Calculated cluster centers [row-major] = [<centroid0>,<centroid1>,<centroid2>,...]
/// - **centroid_frequency**: Amount of samples in each centroid
/// - **assignments**: Vector mapping each sample to its respective nearest cluster
/// - **centroid_distances**: Vector containing each sample's (squared) distance to its centroid
/// - **iterations**: Amount of Lloyd iterations that were run
#[derive(Clone, Debug)]
pub struct KMeansState<T: Primitive> {
    pub k: usize,
    pub distsum: T,
    pub centroids: Vec<T>,
    pub centroid_frequency: Vec<usize>,
    pub assignments: Vec<usize>,
    pub centroid_distances: Vec<T>,
    pub iterations: usize,

    pub(crate) sample_dims: usize
}
impl<T: Primitive> KMeansState<T> {
    pub(crate) fn new(sample_cnt: usize, sample_dims: usize, k: usize) -> Self {
        Self {
            k,
            distsum: T::zero(),
            centroids: vec![T::zero(); sample_dims * k],
            centroid_frequency: vec![0usize;k],
            assignments: vec![0usize;sample_cnt],
            centroid_distances: vec![T::infinity();sample_cnt],
            iterations: 0,
            sample_dims
        }
    }
    pub(crate) fn set_centroid_from_iter(&mut self, idx: usize, src: impl Iterator<Item = T>) {
        self.centroids.set_nth_from_iter(self.sample_dims, idx, src);
    }
    /// Returns the centroid of cluster **idx**.
    pub fn centroid(&self, idx: usize) -> &[T] {
        self.centroids.row(self.sample_dims, idx)
    }
}




/// Entrypoint of the clustering stage.
///
/// Create an instance of this struct, giving the samples you want to operate on. The primitive type
/// of the passed samples array will be the type used internaly for all calculations, as well as the result
/// as stored in the returned [`KMeansState`] structure.
///
/// ## Supported variants
/// - k-Means clustering (Lloyd) [`KMeans::kmeans_lloyd`]
///
/// ## Supported initialization methods
/// - K-Mean++ [`KMeans::init_kmeanplusplus`]
pub struct KMeans<T: Primitive, D: DistanceFunction<T>> {
    pub(crate) sample_cnt: usize,
    pub(crate) sample_dims: usize,
    pub(crate) samples: Vec<T>,
    pub(crate) distance_fn: D,
}
impl<T: Primitive, D: DistanceFunction<T>> KMeans<T, D> {
    /// Create a new instance of the [`KMeans`] structure.
    ///
    /// ## Arguments
    /// - **samples**: Vector of samples [row-major] = [<sample0>,<sample1>,<sample2>,...]
    /// - **sample_cnt**: Amount of samples, contained in the passed **samples** vector
    /// - **sample_dims**: Amount of dimensions each sample from the **sample** vector has
    /// - **distance_fn**: Distance measure between samples and centroids
    pub fn new(samples: Vec<T>, sample_cnt: usize, sample_dims: usize, distance_fn: D) -> Self {
        assert!(samples.len() == sample_cnt * sample_dims);
        assert!(sample_dims > 0);
        Self { sample_cnt, sample_dims, samples, distance_fn }
    }

    #[inline(always)]
    pub(crate) fn sample(&self, idx: usize) -> &[T] {
        self.samples.row(self.sample_dims, idx)
    }

    fn work_packet_size(&self) -> usize {
        // manually calculate work-packet size, because rayon does not do static scheduling (which is more apropriate here)
        (self.sample_cnt / rayon::current_num_threads()).max(1)
    }

    /// Assign every sample to its nearest centroid. Only the first **limit_k** centroids are considered
    /// if given. Equal distances resolve to the lower centroid index.
    pub(crate) fn update_cluster_assignments(&self, state: &mut KMeansState<T>, limit_k: Option<usize>) {
        let centroids = &state.centroids;
        let k = limit_k.unwrap_or(state.k);

        self.samples.par_chunks_exact(self.sample_dims)
            .with_min_len(self.work_packet_size())
            .zip(state.assignments.par_iter_mut())
            .zip(state.centroid_distances.par_iter_mut())
            .for_each(|((s, assignment), centroid_dist)| {
                let nearest = helpers::argmin(
                    centroids.chunks_exact(self.sample_dims).take(k)
                        .map(|c| self.distance_fn.distance(s, c))
                );
                if let Some((best_idx, best_dist)) = nearest {
                    *assignment = best_idx;
                    *centroid_dist = best_dist;
                }
            });
    }

    /// Final assignment against the settled centroids. A sample only leaves its cluster for a strictly
    /// closer centroid, so clusters re-seeded onto coinciding samples keep their members.
    pub(crate) fn settle_cluster_assignments(&self, state: &mut KMeansState<T>) {
        let centroids = &state.centroids;
        let k = state.k;

        self.samples.par_chunks_exact(self.sample_dims)
            .with_min_len(self.work_packet_size())
            .zip(state.assignments.par_iter_mut())
            .zip(state.centroid_distances.par_iter_mut())
            .for_each(|((s, assignment), centroid_dist)| {
                let current = self.distance_fn.distance(s, centroids.row(self.sample_dims, *assignment));
                *centroid_dist = current;
                let nearest = helpers::argmin(
                    centroids.chunks_exact(self.sample_dims).take(k)
                        .map(|c| self.distance_fn.distance(s, c))
                );
                if let Some((best_idx, best_dist)) = nearest {
                    if best_dist < current {
                        *assignment = best_idx;
                        *centroid_dist = best_dist;
                    }
                }
            });
    }

    pub(crate) fn update_cluster_frequencies(&self, assignments: &[usize], centroid_frequency: &mut[usize]) -> usize {
        centroid_frequency.iter_mut().for_each(|v| *v = 0);
        let mut used_centroids_cnt = 0;
        assignments.iter().cloned()
            .for_each(|centroid_id| {
                if centroid_frequency[centroid_id] == 0 {
                    used_centroids_cnt += 1; // Count the amount of centroids with more than 0 samples
                }
                centroid_frequency[centroid_id] += 1;
            });
        used_centroids_cnt
    }



    /// Normal K-Means algorithm implementation (Lloyd, one-phase).
    ///
    /// ## Arguments
    /// - **k**: Amount of clusters to search for. Values above the amount of samples are reduced to it.
    /// - **max_iter**: Limit the maximum amount of iterations. Reaching it is a regular termination.
    /// - **init**: Initialization-Method to use for the initialization of the **k** centroids
    /// - **config**: [`KMeansConfig`] instance, containing several configuration options for the calculation.
    ///
    /// ## Returns
    /// Instance of [`KMeansState`], containing the final state (result). When multiple runs are configured,
    /// the run with the lowest distsum (the earliest one on ties) is returned.
    ///
    /// ## Example
    /// ```rust
    /// use galaxy::*;
    /// use rand::prelude::*;
    ///
    /// let (sample_cnt, sample_dims, k, max_iter) = (2000, 9, 8, 300);
    /// let mut rnd = StdRng::seed_from_u64(42);
    /// let samples: Vec<f64> = (0..sample_cnt * sample_dims).map(|_| rnd.gen()).collect();
    ///
    /// let conf = KMeansConfig::build().random_generator(rnd).build();
    /// let kmean = KMeans::new(samples, sample_cnt, sample_dims, EuclideanDistance);
    /// let result = kmean.kmeans_lloyd(k, max_iter, KMeans::init_kmeanplusplus, &conf);
    ///
    /// assert_eq!(result.assignments.len(), sample_cnt);
    /// assert!(result.assignments.iter().all(|&c| c < k));
    /// ```
    pub fn kmeans_lloyd<'a, F>(&self, k: usize, max_iter: usize, init: F, config: &KMeansConfig<'a, T>) -> KMeansState<T>
                where for<'c> F: Fn(&KMeans<T, D>, &mut KMeansState<T>, &KMeansConfig<'c, T>) {
        let k = k.min(self.sample_cnt);
        (0..config.runs.max(1))
            .map(|_| crate::variants::Lloyd::calculate(self, k, max_iter, &init, config))
            .min_by(|a, b| a.distsum.partial_cmp(&b.distsum).unwrap_or(std::cmp::Ordering::Equal))
            .unwrap_or_else(|| KMeansState::new(self.sample_cnt, self.sample_dims, k))
    }

    /// K-Mean++ initialization method
    ///
    /// ## Description
    /// This initialization method starts by selecting one sample as first centroid.
    /// Proceeding from there, the method iteratively selects one new centroid (per iteration) by calculating
    /// each sample's probability of "being a centroid". This probability is proportional to the sample's
    /// squared distance to its nearest, already chosen centroid.
    ///
    /// ## Note
    /// This method is not meant for direct invocation. Pass a reference to it, to an instance-method of [`KMeans`].
    pub fn init_kmeanplusplus(kmean: &KMeans<T, D>, state: &mut KMeansState<T>, config: &KMeansConfig<'_, T>) {
        crate::inits::kmeanplusplus::calculate(kmean, state, config);
    }
}
