use std::collections::hash_map::DefaultHasher;
use std::hash::{Hash, Hasher};

/// A deliberately simple Bloom filter: `m` bits packed into `u64` words,
/// `k` independent hash probes per item.
///
/// Strictly local to one Inquirer supervisor batch, never shared across
/// batches or tasks. Collisions only cause missed fetches, never wrong
/// persistence (global dedup is the storage layer's `hash` primary key).
pub struct BloomFilter {
    bits: Vec<u64>,
    m: usize,
    k: usize,
}

impl BloomFilter {
    pub fn new(m: usize, k: usize) -> BloomFilter {
        let words = m.div_ceil(64);
        BloomFilter {
            bits: vec![0u64; words],
            m,
            k,
        }
    }

    fn probe(&self, item: &[u8], seed: u64) -> usize {
        let mut hasher = DefaultHasher::new();
        seed.hash(&mut hasher);
        item.hash(&mut hasher);
        (hasher.finish() as usize) % self.m
    }

    fn get(&self, index: usize) -> bool {
        (self.bits[index / 64] >> (index % 64)) & 1 != 0
    }

    fn set(&mut self, index: usize) {
        self.bits[index / 64] |= 1 << (index % 64);
    }

    /// Returns `true` iff at least one of the `k` bit positions was zero
    /// before this call (the item was definitely new), and unconditionally
    /// sets all `k` positions. Returns `false` if all were already set.
    pub fn add(&mut self, item: &[u8]) -> bool {
        for i in 0..self.k {
            let index = self.probe(item, i as u64);
            if !self.get(index) {
                for j in 0..self.k {
                    let index = self.probe(item, j as u64);
                    self.set(index);
                }
                return true;
            }
        }
        false
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn second_add_of_same_item_is_false() {
        let mut filter = BloomFilter::new(5000, 5);
        assert!(filter.add(b"hello"));
        assert!(!filter.add(b"hello"));
    }

    #[test]
    fn distinct_items_all_register_as_new() {
        let mut filter = BloomFilter::new(5000, 5);
        for i in 0..100u32 {
            assert!(filter.add(&i.to_le_bytes()));
        }
        for i in 0..100u32 {
            assert!(!filter.add(&i.to_le_bytes()));
        }
    }

    #[test]
    fn fresh_filter_forgets_previous_inserts() {
        let mut filter = BloomFilter::new(5000, 5);
        assert!(filter.add(b"x"));
        let mut fresh = BloomFilter::new(5000, 5);
        assert!(fresh.add(b"x"));
    }
}
