//! Content digest helpers.
//!
//! A fingerprint is a fast 64-bit digest of item content. Collisions are
//! expected and handled by the cache's collision chains; the digest only has
//! to be deterministic and well distributed.

/// Digest a byte slice into a 64-bit fingerprint.
#[inline]
#[must_use]
pub fn digest(data: &[u8]) -> u64 {
    xxhash_rust::xxh3::xxh3_64(data)
}

/// Digest with an explicit seed, for callers that need domain separation.
#[inline]
#[must_use]
pub fn digest_with_seed(data: &[u8], seed: u64) -> u64 {
    xxhash_rust::xxh3::xxh3_64_with_seed(data, seed)
}
