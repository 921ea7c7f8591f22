//! Collection helpers for keyed joins

use std::collections::{HashMap, HashSet};
use std::hash::Hash;

/// Group items by key and add up a numeric value per key
///
/// # Example
/// ```ignore
/// let per_query = sum_by_key(report.records(), |r| r.query_key(), |r| r.count);
/// ```
#[inline]
pub fn sum_by_key<'a, T, K, KF, VF>(items: &'a [T], key_fn: KF, value_fn: VF) -> HashMap<K, u64>
where
    K: Eq + Hash,
    KF: Fn(&'a T) -> K,
    VF: Fn(&'a T) -> u64,
{
    let mut map: HashMap<K, u64> = HashMap::with_capacity(items.len());
    for item in items {
        let total = map.entry(key_fn(item)).or_default();
        *total = total.saturating_add(value_fn(item));
    }
    map
}

/// Keys present in every map; empty when there are no maps
pub fn keys_in_all<K, V>(maps: &[HashMap<K, V>]) -> HashSet<&K>
where
    K: Eq + Hash,
{
    let Some((first, rest)) = maps.split_first() else {
        return HashSet::new();
    };
    first.keys().filter(|k| rest.iter().all(|m| m.contains_key(*k))).collect()
}

/// Remove duplicates, keeping first occurrences in order
///
/// # Example
/// ```ignore
/// let ids = vec![1, 2, 1, 3, 2];
/// let unique = unique_ordered(ids); // [1, 2, 3]
/// ```
#[inline]
pub fn unique_ordered<T: Eq + Hash + Clone>(items: Vec<T>) -> Vec<T> {
    let mut seen = HashSet::new();
    items.into_iter().filter(|item| seen.insert(item.clone())).collect()
}
