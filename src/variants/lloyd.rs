use crate::{KMeans, KMeansState, KMeansConfig, api::DistanceFunction, memory::*};
use std::cmp::Ordering;

pub(crate) struct Lloyd<T: Primitive> {
	_p: std::marker::PhantomData<T>
}
impl<T: Primitive> Lloyd<T> {
    /// Recalculates the centroids from the current assignments.
    ///
    /// ## Returns
    /// - the new distance sum (sum of all samples' squared distances to their assigned centroid)
    /// - the total squared shift of all centroids
    fn update_centroids<D: DistanceFunction<T>>(data: &KMeans<T, D>, state: &mut KMeansState<T>) -> (T, T) {
        let dims = data.sample_dims;
        // Sum all samples in a cluster together into new_centroids
        // Count non-empty clusters
        let used_centroids_cnt = data.update_cluster_frequencies(&state.assignments, &mut state.centroid_frequency);
        let mut new_centroids = vec![T::zero(); state.centroids.len()];
        data.samples.chunks_exact(dims)
            .zip(state.assignments.iter().cloned())
            .for_each(|(s, centroid_id)| {
                new_centroids.iter_mut().skip(centroid_id * dims).take(dims)
                    .zip(s.iter())
                    .for_each(|(c, s)| *c += s);
            });
        let mut new_distsum: T = state.centroid_distances.iter().cloned().sum();

        // Use used_centroids_cnt variable to check, whether there are empty clusters
        // When there are, assign bad samples to empty clusters
        if used_centroids_cnt != state.k {
            let mut distance_sorted_samples: Vec<usize> = (0..data.sample_cnt).collect();
            distance_sorted_samples.sort_by(
                |&i1, &i2| state.centroid_distances[i1].partial_cmp(&state.centroid_distances[i2]).unwrap_or(Ordering::Equal));

            // Assign empty clusters
            for i in 0..state.k {
                if state.centroid_frequency[i] != 0 {
                    continue;
                }
                // Find the sample with the highest distance to its centroid, that is not alone in its cluster
                let candidate = distance_sorted_samples.iter().rev().cloned()
                    .find(|&sample_id| state.centroid_frequency[state.assignments[sample_id]] > 1);
                let sample_id = match candidate {
                    Some(sample_id) => sample_id,
                    None => break, // only possible with k > sample_cnt
                };
                let prev_centroid_id = state.assignments[sample_id];

                // Re-Assign found sample to centroid without any samples
                state.centroid_frequency[prev_centroid_id] -= 1;
                state.centroid_frequency[i] += 1;
                new_distsum -= state.centroid_distances[sample_id];
                // Centroid is moved into the chosen point -> the points centroid distance is 0
                state.centroid_distances[sample_id] = T::zero();
                // new_centroids is a sum of all points within a centroid here.
                // Subtract chosen sample from its previous centroid
                new_centroids.iter_mut().skip(prev_centroid_id * dims).take(dims)
                    .zip(data.sample(sample_id).iter().cloned())
                    .for_each(|(cv,sv)| { *cv -= sv; });
                // Chosen sample is single point in cluster -> set cluster's sum to chosen point
                new_centroids.iter_mut().skip(i * dims).take(dims)
                    .zip(data.sample(sample_id).iter().cloned())
                    .for_each(|(cv,sv)| { *cv = sv; });
                state.assignments[sample_id] = i;
            }
        }

        // Calculate new centroids from updated cluster_assignments
        let mut shift = T::zero();
        state.centroids.chunks_exact_mut(dims)
            .zip(new_centroids.chunks_exact(dims))
            .zip(state.centroid_frequency.iter().cloned())
            .filter(|(_, cfreq)| *cfreq > 0)
            .for_each(|((c,nc),cfreq)| {
                let cfreq: T = cast(cfreq);
                c.iter_mut().zip(nc.iter().cloned()).for_each(|(c, nc)| {
                    let moved = nc / cfreq;
                    shift += (moved - *c) * (moved - *c);
                    *c = moved;
                });
            });
        (new_distsum, shift)
    }

    pub fn calculate<'a, D, F>(data: &KMeans<T, D>, k: usize, max_iter: usize, init: &F, config: &KMeansConfig<'a, T>) -> KMeansState<T>
                where D: DistanceFunction<T>, for<'c> F: Fn(&KMeans<T, D>, &mut KMeansState<T>, &KMeansConfig<'c, T>) {
        assert!(k <= data.sample_cnt);

        let mut state = KMeansState::new(data.sample_cnt, data.sample_dims, k);
        state.distsum = T::infinity();
        if k == 0 {
            state.distsum = T::zero();
            return state;
        }

        // Initialize clusters and notify subscriber
        init(data, &mut state, config);
        (config.init_done)(&state);
        let mut abort_strategy = config.abort_strategy.create_logic();

        for i in 1..=max_iter {
            data.update_cluster_assignments(&mut state, None);
            let (new_distsum, shift) = Self::update_centroids(data, &mut state);
            state.iterations = i;

            // Notify subscriber about finished iteration
            (config.iteration_done)(&state, i, new_distsum);
            if !abort_strategy.next(new_distsum, shift) {
                break;
            }
            state.distsum = new_distsum;
        }

        // Labels from the last assignment step may be stale after the final centroid update
        data.settle_cluster_assignments(&mut state);
        data.update_cluster_frequencies(&state.assignments, &mut state.centroid_frequency);
        state.distsum = state.centroid_distances.iter().cloned().sum();
        state
    }
}




#[cfg(test)]
mod tests {
    use super::*;
    use crate::{AbortStrategy, EuclideanDistance, helpers::testing::*};
    use rand::prelude::*;

    #[test]
    fn iris_dataset_f64() {
        let samples = vec![1.4f64, 0.2, 1.4, 0.2, 1.3, 0.2, 1.5, 0.2, 1.4, 0.2, 1.7, 0.4, 1.4, 0.3, 1.5, 0.2, 1.4, 0.2, 1.5, 0.1, 1.5, 0.2, 1.6, 0.2, 1.4, 0.1, 1.1, 0.1, 1.2, 0.2, 1.5, 0.4, 1.3, 0.4, 1.4, 0.3, 1.7, 0.3, 1.5, 0.3, 1.7, 0.2, 1.5, 0.4, 1.0, 0.2, 1.7, 0.5, 1.9, 0.2, 1.6, 0.2, 1.6, 0.4, 1.5, 0.2, 1.4, 0.2, 1.6, 0.2, 1.6, 0.2, 1.5, 0.4, 1.5, 0.1, 1.4, 0.2, 1.5, 0.2, 1.2, 0.2, 1.3, 0.2, 1.4, 0.1, 1.3, 0.2, 1.5, 0.2, 1.3, 0.3, 1.3, 0.3, 1.3, 0.2, 1.6, 0.6, 1.9, 0.4, 1.4, 0.3, 1.6, 0.2, 1.4, 0.2, 1.5, 0.2, 1.4, 0.2, 4.7, 1.4, 4.5, 1.5, 4.9, 1.5, 4.0, 1.3, 4.6, 1.5, 4.5, 1.3, 4.7, 1.6, 3.3, 1.0, 4.6, 1.3, 3.9, 1.4, 3.5, 1.0, 4.2, 1.5, 4.0, 1.0, 4.7, 1.4, 3.6, 1.3, 4.4, 1.4, 4.5, 1.5, 4.1, 1.0, 4.5, 1.5, 3.9, 1.1, 4.8, 1.8, 4.0, 1.3, 4.9, 1.5, 4.7, 1.2, 4.3, 1.3, 4.4, 1.4, 4.8, 1.4, 5.0, 1.7, 4.5, 1.5, 3.5, 1.0, 3.8, 1.1, 3.7, 1.0, 3.9, 1.2, 5.1, 1.6, 4.5, 1.5, 4.5, 1.6, 4.7, 1.5, 4.4, 1.3, 4.1, 1.3, 4.0, 1.3, 4.4, 1.2, 4.6, 1.4, 4.0, 1.2, 3.3, 1.0, 4.2, 1.3, 4.2, 1.2, 4.2, 1.3, 4.3, 1.3, 3.0, 1.1, 4.1, 1.3, 6.0, 2.5, 5.1, 1.9, 5.9, 2.1, 5.6, 1.8, 5.8, 2.2, 6.6, 2.1, 4.5, 1.7, 6.3, 1.8, 5.8, 1.8, 6.1, 2.5, 5.1, 2.0, 5.3, 1.9, 5.5, 2.1, 5.0, 2.0, 5.1, 2.4, 5.3, 2.3, 5.5, 1.8, 6.7, 2.2, 6.9, 2.3, 5.0, 1.5, 5.7, 2.3, 4.9, 2.0, 6.7, 2.0, 4.9, 1.8, 5.7, 2.1, 6.0, 1.8, 4.8, 1.8, 4.9, 1.8, 5.6, 2.1, 5.8, 1.6, 6.1, 1.9, 6.4, 2.0, 5.6, 2.2, 5.1, 1.5, 5.6, 1.4, 6.1, 2.3, 5.6, 2.4, 5.5, 1.8, 4.8, 1.8, 5.4, 2.1, 5.6, 2.4, 5.1, 2.3, 5.1, 1.9, 5.9, 2.3, 5.7, 2.5, 5.2, 2.3, 5.0, 1.9, 5.2, 2.0, 5.4, 2.3, 5.1, 1.8];

        let kmean = KMeans::new(samples, 150, 2, EuclideanDistance);
        let rnd = StdRng::seed_from_u64(1);
        let conf = KMeansConfig::build().random_generator(rnd).build();
        let res = kmean.kmeans_lloyd(3, 100, KMeans::init_kmeanplusplus, &conf);

        // The setosa petals (first 50 samples) are separated from everything else
        let setosa = res.assignments[0];
        assert!(res.assignments[..50].iter().all(|&a| a == setosa));
        assert!(res.assignments[50..].iter().all(|&a| a != setosa));
        assert_eq!(res.centroid_frequency[setosa], 50);
        assert_approx_eq!(res.centroid(setosa)[0], 1.462, 1e-9);
        assert_approx_eq!(res.centroid(setosa)[1], 0.246, 1e-9);
        assert_eq!(res.centroid_frequency.iter().sum::<usize>(), 150);
        assert!(res.iterations >= 1);

        let distsum: f64 = res.centroid_distances.iter().sum();
        assert_approx_eq!(res.distsum, distsum, 1e-9);
        assert!(res.distsum < 32.0);
    }

    #[test]
    fn well_separated_blobs() {
        let samples = blobs(&[&[0.0, 0.0, 0.0], &[20.0, 0.0, 0.0], &[0.0, 20.0, 0.0], &[0.0, 0.0, 20.0]], 25, 1.0, 11);
        let should: Vec<usize> = (0..100).map(|i| i / 25).collect();

        let kmean = KMeans::new(samples, 100, 3, EuclideanDistance);
        let conf = KMeansConfig::build().random_generator(StdRng::seed_from_u64(42)).runs(4).build();
        let res = kmean.kmeans_lloyd(4, 300, KMeans::init_kmeanplusplus, &conf);

        assert_same_partition(&should, &res.assignments);
        assert_eq!(res.centroid_frequency, vec![25; 4]);
    }

    #[test]
    fn empty_cluster_handling() {
        let samples = vec![1.0, 0.0, 2.0, 0.0, 3.0, 0.0];
        let initial_centroids = [2.0, 0.0, 1337.0, 0.0];

        let kmean = KMeans::new(samples, 3, 2, EuclideanDistance);
        let conf = KMeansConfig::build().random_generator(StdRng::seed_from_u64(1)).build();

        let res = kmean.kmeans_lloyd(2, 1, |_: &KMeans<f64, EuclideanDistance>, state: &mut KMeansState<f64>, _| {
            state.centroids.copy_from_slice(&initial_centroids);
        }, &conf);
        assert_eq!(res.distsum, 0.5);
        assert_eq!(&res.assignments, &[0,0,1]);
        assert_eq!(&res.centroids, &[1.5, 0.0, 3.0, 0.0]);
        assert_eq!(&res.centroid_frequency, &[2,1]);
        assert_eq!(&res.centroid_distances, &[0.25, 0.25, 0.0]);
    }

    #[test]
    fn identical_samples_become_singletons() {
        let kmean = KMeans::new(vec![0.5f64; 3 * 4], 3, 4, EuclideanDistance);
        let conf = KMeansConfig::build().random_generator(StdRng::seed_from_u64(42)).build();
        let res = kmean.kmeans_lloyd(3, 300, KMeans::init_kmeanplusplus, &conf);

        let mut assignments = res.assignments.clone();
        assignments.sort();
        assert_eq!(assignments, vec![0, 1, 2]);
        assert_eq!(res.centroid_frequency, vec![1, 1, 1]);
        assert_eq!(res.distsum, 0.0);
    }

    #[test]
    fn iteration_limit_is_a_regular_termination() {
        let samples = blobs(&[&[0.0, 0.0], &[5.0, 5.0]], 50, 3.0, 5);
        let kmean = KMeans::new(samples, 100, 2, EuclideanDistance);
        let conf = KMeansConfig::build()
            .random_generator(StdRng::seed_from_u64(42))
            .abort_strategy(AbortStrategy::CentroidShift { tolerance: 0.0 })
            .build();
        let res = kmean.kmeans_lloyd(5, 2, KMeans::init_kmeanplusplus, &conf);
        assert!(res.iterations <= 2);
        assert_eq!(res.assignments.len(), 100);
    }

    #[test]
    fn reproducible_with_same_seed() {
        let samples = blobs(&[&[0.0, 0.0], &[4.0, 4.0], &[8.0, 0.0]], 40, 2.5, 9);
        let kmean = KMeans::new(samples, 120, 2, EuclideanDistance);
        let run = || {
            let conf = KMeansConfig::build().random_generator(StdRng::seed_from_u64(42)).build();
            kmean.kmeans_lloyd(8, 300, KMeans::init_kmeanplusplus, &conf)
        };
        let (a, b) = (run(), run());
        assert_eq!(a.assignments, b.assignments);
        assert_eq!(a.centroids, b.centroids);
        assert_eq!(a.distsum, b.distsum);
    }

    #[test]
    fn callbacks_are_invoked() {
        let inits = std::cell::Cell::new(0);
        let iterations = std::cell::Cell::new(0);
        let on_init = |_: &KMeansState<f64>| inits.set(inits.get() + 1);
        let on_iteration = |_: &KMeansState<f64>, nr: usize, _: f64| iterations.set(nr);

        let kmean = KMeans::new(blobs(&[&[0.0], &[10.0]], 10, 1.0, 3), 20, 1, EuclideanDistance);
        let conf = KMeansConfig::build()
            .random_generator(StdRng::seed_from_u64(42))
            .init_done(&on_init)
            .iteration_done(&on_iteration)
            .build();
        let res = kmean.kmeans_lloyd(2, 50, KMeans::init_kmeanplusplus, &conf);
        assert_eq!(inits.get(), 1);
        assert_eq!(iterations.get(), res.iterations);
    }

    #[test]
    fn labels_follow_final_centroids() {
        let kmean = KMeans::new(vec![0.0f64, 1.0, 2.0, 10.0], 4, 1, EuclideanDistance);
        let conf = KMeansConfig::build().random_generator(StdRng::seed_from_u64(1)).build();

        // stopped after one update: centroid 1 moved from 1.0 to 4.33
        let res = kmean.kmeans_lloyd(2, 1, |_: &KMeans<f64, EuclideanDistance>, state: &mut KMeansState<f64>, _| {
            state.centroids.copy_from_slice(&[0.0, 1.0]);
        }, &conf);
        assert_approx_eq!(res.centroids[1], 13.0 / 3.0, 1e-12);
        assert_eq!(&res.assignments, &[0, 0, 0, 1]);
        assert_eq!(&res.centroid_frequency, &[3, 1]);

        for (s, (&assignment, &dist)) in kmean.samples.iter().zip(res.assignments.iter().zip(res.centroid_distances.iter())) {
            let nearest = res.centroids.iter().map(|c| (s - c) * (s - c)).fold(f64::INFINITY, f64::min);
            assert_approx_eq!(dist, nearest, 1e-12);
            assert_approx_eq!(dist, (s - res.centroid(assignment)[0]).powi(2), 1e-12);
        }
        assert_approx_eq!(res.distsum, 1.0 + 4.0 + (10.0 - 13.0 / 3.0f64).powi(2), 1e-9);
    }

    #[test]
    fn more_clusters_than_samples() {
        let kmean = KMeans::new(vec![0.0f64, 5.0, 9.0], 3, 1, EuclideanDistance);
        let conf = KMeansConfig::build().random_generator(StdRng::seed_from_u64(42)).build();
        let res = kmean.kmeans_lloyd(5, 100, KMeans::init_kmeanplusplus, &conf);

        assert_eq!(res.k, 3);
        let mut assignments = res.assignments.clone();
        assignments.sort();
        assert_eq!(assignments, vec![0, 1, 2]);
        assert_eq!(res.distsum, 0.0);
    }
}
