//! The candidate set: functions bucketed by fingerprint, with bucket
//! collisions resolved by the full comparator.

use rustc_hash::FxHashMap;
use smallvec::SmallVec;
use tessera_ir::{module::FuncRef, Module};

use super::comparator::compare_funcs;

/// A set of distinct function bodies. Hashing uses the cached fingerprint;
/// equality is the full function comparator.
#[derive(Debug, Default)]
pub struct FnSet {
    buckets: FxHashMap<u64, SmallVec<[FuncRef; 2]>>,
    hashes: FxHashMap<FuncRef, u64>,
}

impl FnSet {
    pub fn new() -> Self {
        Self::default()
    }

    /// Probes the set with `func`. When an equivalent entry already exists it
    /// is returned and the set is left unchanged; otherwise `func` is
    /// inserted as a new unique entry.
    pub fn insert_or_find(
        &mut self,
        module: &Module,
        func: FuncRef,
        hash: u64,
    ) -> Option<FuncRef> {
        let bucket = self.buckets.entry(hash).or_default();
        for &candidate in bucket.iter() {
            if compare_funcs(module, candidate, func) {
                return Some(candidate);
            }
        }

        bucket.push(func);
        self.hashes.insert(func, hash);
        None
    }

    /// Removes exactly `func`, by identity. A structurally equivalent entry
    /// that is a different function is never touched.
    pub fn remove(&mut self, func: FuncRef) -> bool {
        let Some(hash) = self.hashes.remove(&func) else {
            return false;
        };

        let bucket = self
            .buckets
            .get_mut(&hash)
            .expect("bucket exists for every cached hash");
        let len_before = bucket.len();
        bucket.retain(|candidate| *candidate != func);
        debug_assert_eq!(bucket.len() + 1, len_before);
        true
    }

    pub fn contains(&self, func: FuncRef) -> bool {
        self.hashes.contains_key(&func)
    }

    pub fn len(&self) -> usize {
        self.hashes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.hashes.is_empty()
    }

    pub fn clear(&mut self) {
        self.buckets.clear();
        self.hashes.clear();
    }
}
