//! Interning of object keys.
//!
//! Keys repeat across objects, so the scanner resolves each key against a
//! shared table and hands out the canonical [`Arc<str>`] instead of
//! allocating. The table is safe to share between threads: each bucket has
//! its own lock, and buckets stop growing past a fixed length so hostile
//! input cannot make the table unbounded.
use std::sync::{Arc, PoisonError, RwLock};

/// A concurrent, bounded string interner.
#[derive(Debug)]
pub struct SymbolTable {
    buckets: Box<[RwLock<Vec<Arc<str>>>]>,
    mask: usize,
}

impl SymbolTable {
    pub const DEFAULT_BUCKETS: usize = 4096;
    /// Symbols a single bucket keeps; further keys hashing there are still
    /// returned but not retained.
    pub const MAX_BUCKET_LEN: usize = 8;

    /// Creates a table with `buckets` rounded up to a power of two.
    #[must_use]
    pub fn new(buckets: usize) -> Self {
        let buckets = buckets.max(1).next_power_of_two();
        Self {
            buckets: (0..buckets).map(|_| RwLock::new(Vec::new())).collect(),
            mask: buckets - 1,
        }
    }

    /// The rolling hash `h = 31 * h + c` over the UTF-8 bytes of `text`.
    #[must_use]
    pub fn hash(text: &str) -> u32 {
        text.bytes()
            .fold(0u32, |h, b| h.wrapping_mul(31).wrapping_add(u32::from(b)))
    }

    /// Returns the canonical symbol for `text`, adding it if absent.
    ///
    /// `hash` must be [`SymbolTable::hash`] of `text`.
    pub fn add_symbol(&self, text: &str, hash: u32) -> Arc<str> {
        let bucket = &self.buckets[hash as usize & self.mask];
        if let Some(found) = bucket
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .iter()
            .find(|s| ***s == *text)
        {
            return found.clone();
        }
        let mut symbols = bucket.write().unwrap_or_else(PoisonError::into_inner);
        // Another thread may have added it between the two locks.
        if let Some(found) = symbols.iter().find(|s| ***s == *text) {
            return found.clone();
        }
        let symbol: Arc<str> = Arc::from(text);
        if symbols.len() < Self::MAX_BUCKET_LEN {
            symbols.push(symbol.clone());
        }
        symbol
    }

    /// Interns `text`, computing its hash.
    pub fn intern(&self, text: &str) -> Arc<str> {
        self.add_symbol(text, Self::hash(text))
    }

    /// Number of retained symbols.
    #[must_use]
    pub fn len(&self) -> usize {
        self.buckets
            .iter()
            .map(|b| b.read().unwrap_or_else(PoisonError::into_inner).len())
            .sum()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

impl Default for SymbolTable {
    fn default() -> Self {
        Self::new(Self::DEFAULT_BUCKETS)
    }
}

#[cfg(test)]
mod tests {
    use std::thread;

    use quickcheck_macros::quickcheck;

    use super::*;

    #[quickcheck]
    fn interning_twice_yields_the_same_symbol(text: String) -> bool {
        let table = SymbolTable::new(16);
        let first = table.intern(&text);
        let second = table.intern(&text);
        *first == *text && Arc::ptr_eq(&first, &second)
    }

    #[test]
    fn interned_keys_share_storage() {
        let table = SymbolTable::default();
        let a = table.intern("name");
        let b = table.intern(&String::from("name"));
        assert!(Arc::ptr_eq(&a, &b));
        assert_eq!(table.len(), 1);
    }

    #[test]
    fn hash_matches_rolling_formula() {
        assert_eq!(SymbolTable::hash(""), 0);
        assert_eq!(SymbolTable::hash("a"), 97);
        assert_eq!(SymbolTable::hash("ab"), 97 * 31 + 98);
    }

    #[test]
    fn full_bucket_still_returns_symbols() {
        let table = SymbolTable::new(1);
        let keys: Vec<String> = (0..20).map(|i| format!("k{i}")).collect();
        for key in &keys {
            assert_eq!(&*table.intern(key), key.as_str());
        }
        assert_eq!(table.len(), SymbolTable::MAX_BUCKET_LEN);
    }

    #[test]
    fn concurrent_interning_agrees() {
        let table = Arc::new(SymbolTable::new(16));
        let handles: Vec<_> = (0..8)
            .map(|_| {
                let table = table.clone();
                thread::spawn(move || table.intern("shared"))
            })
            .collect();
        let symbols: Vec<Arc<str>> = handles.into_iter().map(|h| h.join().unwrap()).collect();
        assert!(symbols.windows(2).all(|w| Arc::ptr_eq(&w[0], &w[1])));
    }
}
