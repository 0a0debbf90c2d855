use std::collections::HashMap;
use std::fmt::Write;

use crate::hash::TableKey;

/// Width of one hash value in a canonical key (16 hex digits of 64 bits).
const SLOT_WIDTH: usize = 16;

/// Encodes a table key as a string, concatenating each hash value as
/// 16 hex digits of its two's complement. Injective over all `i64` keys.
pub fn canonical_key(key: &[i64]) -> String {
    let mut s = String::with_capacity(key.len() * SLOT_WIDTH);
    for &hv in key {
        // Writing into a String never fails.
        let _ = write!(s, "{:016x}", hv as u64);
    }
    s
}

/// Hash table from canonical keys to the buckets of ids.
#[derive(Debug)]
pub struct Table<I> {
    buckets: HashMap<String, Vec<I>>,
}

impl<I> Default for Table<I> {
    fn default() -> Self {
        Self {
            buckets: HashMap::new(),
        }
    }
}

impl<I: PartialEq> Table<I> {
    pub fn insert(&mut self, key: String, id: I) {
        self.buckets.entry(key).or_default().push(id);
    }

    pub fn access(&self, key: &str) -> Option<&[I]> {
        self.buckets.get(key).map(|b| b.as_slice())
    }

    /// Removes all the occurrences of id and drops emptied buckets.
    /// Returns the number of removed entries.
    pub fn remove(&mut self, id: &I) -> usize {
        let mut removed = 0;
        self.buckets.retain(|_, bucket| {
            let mut i = 0;
            while i < bucket.len() {
                if &bucket[i] == id {
                    // The swapped-in tail element is examined next.
                    bucket.swap_remove(i);
                    removed += 1;
                } else {
                    i += 1;
                }
            }
            !bucket.is_empty()
        });
        removed
    }

    pub fn get_size(&self, key: &str) -> usize {
        self.buckets.get(key).map_or(0, |b| b.len())
    }

    pub fn num_buckets(&self) -> usize {
        self.buckets.len()
    }
}

/// Canonical keys of all the tables.
pub fn canonical_keys(keys: &[TableKey]) -> Vec<String> {
    keys.iter().map(|k| canonical_key(k)).collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use rand::prelude::*;

    #[test]
    fn canonical_key_is_fixed_width() {
        assert_eq!(canonical_key(&[]), "");
        assert_eq!(canonical_key(&[0]), "0000000000000000");
        assert_eq!(canonical_key(&[255, 1]), "00000000000000ff0000000000000001");
        assert_eq!(canonical_key(&[-1]), "ffffffffffffffff");
    }

    #[test]
    fn canonical_key_is_injective_with_negatives() {
        // Without fixed width, [1, 11] and [11, 1] or [-1, 0] and [0, -1] could collide.
        let keys: Vec<Vec<i64>> = vec![
            vec![1, 11],
            vec![11, 1],
            vec![-1, 0],
            vec![0, -1],
            vec![i64::MIN, i64::MAX],
            vec![i64::MAX, i64::MIN],
            vec![-16, 15],
        ];
        let encoded: std::collections::HashSet<String> =
            keys.iter().map(|k| canonical_key(k)).collect();
        assert_eq!(encoded.len(), keys.len());
    }

    #[test]
    fn table_works() {
        let mut obj1 = vec![Vec::<u32>::default(); 1 << 6];
        let mut obj2 = Table::<u32>::default();

        let mut rng = StdRng::seed_from_u64(13);
        for i in 0..1000 {
            let idx = rng.gen_range(0..obj1.len());
            obj1[idx].push(i);
            obj2.insert(canonical_key(&[idx as i64 - 32]), i);
        }

        for idx in 0..obj1.len() {
            let org = &obj1[idx];
            let key = canonical_key(&[idx as i64 - 32]);
            match obj2.access(&key) {
                None => assert!(org.is_empty()),
                Some(a) => assert_eq!(&org[..], a),
            }
            assert_eq!(obj2.get_size(&key), org.len());
        }
    }

    #[test]
    fn remove_takes_every_occurrence() {
        let mut table = Table::<&str>::default();
        let key = canonical_key(&[3, -4]);
        // Adjacent duplicates at the tail are the case a naive
        // swap-remove scan skips.
        for id in ["a", "x", "b", "x", "x"] {
            table.insert(key.clone(), id);
        }
        table.insert(canonical_key(&[0, 0]), "x");

        assert_eq!(table.remove(&"x"), 4);
        let mut left = table.access(&key).unwrap().to_vec();
        left.sort();
        assert_eq!(left, vec!["a", "b"]);
        assert_eq!(table.num_buckets(), 1);
    }

    #[test]
    fn remove_drops_empty_buckets() {
        let mut table = Table::<u32>::default();
        table.insert(canonical_key(&[1]), 7);
        table.insert(canonical_key(&[1]), 7);
        assert_eq!(table.remove(&7), 2);
        assert_eq!(table.remove(&7), 0);
        assert_eq!(table.num_buckets(), 0);
        assert!(table.access(&canonical_key(&[1])).is_none());
    }
}
