//! Bounded, reproducible working set selection.
//!
//! Large inputs are first stratified by release year (at most `per_group_cap` tracks per year),
//! then, if still too large, uniformly thinned down to exactly `global_cap` tracks.

use crate::record::RawRecord;
use rand::{seq::index, Rng};
use std::collections::BTreeMap;
use tracing::debug;

/// Draw **amount** items uniformly without replacement, in the order they were drawn.
fn draw<T, R: Rng + ?Sized>(items: Vec<T>, amount: usize, rnd: &mut R) -> Vec<T> {
    let mut slots: Vec<Option<T>> = items.into_iter().map(Some).collect();
    index::sample(rnd, slots.len(), amount.min(slots.len())).into_iter()
        .filter_map(|i| slots[i].take())
        .collect()
}

/// Reduce **records** to a working set of at most **global_cap** records.
///
/// Inputs that already fit are returned unchanged. Otherwise the records are grouped by year
/// (ascending), each group is sampled down to **per_group_cap** and the concatenation is sampled down
/// to **global_cap** if necessary. Groups are never topped up, so the result may be smaller than the cap.
/// All draws come from **rnd**.
pub fn sample<R: Rng + ?Sized>(records: Vec<RawRecord>, global_cap: usize, per_group_cap: usize, rnd: &mut R) -> Vec<RawRecord> {
    if records.len() <= global_cap {
        return records;
    }
    let input_cnt = records.len();

    let mut groups: BTreeMap<i32, Vec<RawRecord>> = BTreeMap::new();
    for record in records {
        groups.entry(record.year).or_default().push(record);
    }
    let group_cnt = groups.len();

    let mut stratified = Vec::new();
    for (_, group) in groups {
        let amount = group.len().min(per_group_cap);
        stratified.extend(draw(group, amount, rnd));
    }
    debug!(input_cnt, group_cnt, stratified = stratified.len(), "Stratified by year");

    if stratified.len() > global_cap {
        stratified = draw(stratified, global_cap, rnd);
    }
    stratified
}
