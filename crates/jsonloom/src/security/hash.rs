//! Type-name hashing for the deny and accept lists.
//!
//! Names hash with FNV-1a (64 bit) after mapping `$` to `.`, so nested type
//! names spelled either way share one hash. Hashing is incremental: the gate
//! walks a name once and checks the hash of every prefix of at least
//! [`MIN_PREFIX`] bytes, so a denied prefix rejects before the full hash is
//! known.

const FNV_OFFSET: u64 = 0xcbf2_9ce4_8422_2325;
const FNV_PRIME: u64 = 0x0100_0000_01b3;

/// Shortest prefix checked against the lists.
pub(crate) const MIN_PREFIX: usize = 3;

const fn normalize(b: u8) -> u8 {
    if b == b'$' { b'.' } else { b }
}

/// Feeds one byte into a running hash.
#[inline]
pub(crate) const fn step(hash: u64, b: u8) -> u64 {
    (hash ^ normalize(b) as u64).wrapping_mul(FNV_PRIME)
}

/// Hashes a whole name.
pub(crate) const fn hash(name: &str) -> u64 {
    let bytes = name.as_bytes();
    let mut h = FNV_OFFSET;
    let mut i = 0;
    while i < bytes.len() {
        h = step(h, bytes[i]);
        i += 1;
    }
    h
}

/// The hash before any byte.
pub(crate) const fn seed() -> u64 {
    FNV_OFFSET
}

/// Hashes every name and sorts the result, for binary search.
pub(crate) const fn sorted_hashes<const N: usize>(names: [&str; N]) -> [u64; N] {
    let mut out = [0u64; N];
    let mut i = 0;
    while i < N {
        out[i] = hash(names[i]);
        i += 1;
    }
    // Insertion sort; the lists are small and this runs at compile time.
    let mut i = 1;
    while i < N {
        let mut j = i;
        while j > 0 && out[j - 1] > out[j] {
            let tmp = out[j - 1];
            out[j - 1] = out[j];
            out[j] = tmp;
            j -= 1;
        }
        i += 1;
    }
    out
}

/// Calls `visit` with the hash of each prefix of `name` that is at least
/// [`MIN_PREFIX`] bytes long, shortest first, until it returns `Some`.
pub(crate) fn find_prefix<T>(name: &str, mut visit: impl FnMut(u64) -> Option<T>) -> Option<T> {
    let mut h = seed();
    for (i, &b) in name.as_bytes().iter().enumerate() {
        h = step(h, b);
        if i + 1 >= MIN_PREFIX {
            if let Some(found) = visit(h) {
                return Some(found);
            }
        }
    }
    None
}
