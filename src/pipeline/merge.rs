//! Recursive merge of nested ordered maps.
//!
//! Collision policy: when both sides hold a branch (a nested map) under the
//! same key, merge recursively; when they hold a leaf, the later value
//! wins. Keys present on only one side are always kept.

use std::collections::BTreeMap;
use std::collections::btree_map::Entry;

use crate::models::FeedEntry;

/// Merge `other` into `self`, later values winning on leaf collisions.
pub trait DeepMerge {
    fn deep_merge(&mut self, other: Self);
}

impl<K: Ord, V: DeepMerge> DeepMerge for BTreeMap<K, V> {
    fn deep_merge(&mut self, other: Self) {
        for (key, value) in other {
            match self.entry(key) {
                Entry::Occupied(mut slot) => slot.get_mut().deep_merge(value),
                Entry::Vacant(slot) => {
                    slot.insert(value);
                }
            }
        }
    }
}

impl DeepMerge for FeedEntry {
    fn deep_merge(&mut self, other: Self) {
        *self = other;
    }
}
