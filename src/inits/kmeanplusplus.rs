use crate::api::DistanceFunction;
use crate::memory::*;
use crate::{KMeans, KMeansConfig, KMeansState};
use rand::distributions::WeightedIndex;
use rand::prelude::*;
use std::ops::DerefMut;

#[inline(always)]
pub fn calculate<T, D>(kmean: &KMeans<T, D>, state: &mut KMeansState<T>, config: &KMeansConfig<'_, T>)
where
    T: Primitive,
    D: DistanceFunction<T>,
{
    {
        // Randomly select first centroid
        let first_idx = config.rnd.borrow_mut().gen_range(0..kmean.sample_cnt);
        state.set_centroid_from_iter(0, kmean.sample(first_idx).iter().cloned());
    }
    for k in 1..state.k {
        // For each following centroid...
        // Calculate distances & update cluster-assignments
        kmean.update_cluster_assignments(state, Some(k));

        // Use rand's WeightedIndex to randomly draw a centroid, with a probability proportional to
        // each sample's distance to its nearest centroid. WeightedIndex normalizes on its own.
        // All weights are zero when every sample coincides with a chosen centroid -> draw uniformly.
        let mut rnd = config.rnd.borrow_mut();
        let sampled_centroid_id = match WeightedIndex::new(state.centroid_distances.iter().cloned()) {
            Ok(centroid_index) => centroid_index.sample(rnd.deref_mut()),
            Err(_) => rnd.gen_range(0..kmean.sample_cnt),
        };
        state.set_centroid_from_iter(k, kmean.sample(sampled_centroid_id).iter().cloned());
    }
}
