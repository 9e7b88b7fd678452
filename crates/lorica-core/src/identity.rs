//! Unique item identifier minting.
//!
//! Every canonical item in a probe run carries a textual stamp that makes it
//! globally referenceable in the output stream. Stamps are minted from a
//! process-global counter so they stay unique even when a process builds
//! several caches over its lifetime. The counter has process lifetime and is
//! never torn down.
//!
//! Format: `"1"` followed by the process id (zero-padded to at least five
//! digits) followed by the counter value in decimal. A process that mints
//! more than 2^32 stamps wraps the counter; behavior past that point is
//! unspecified.

use std::sync::atomic::{AtomicU32, Ordering};

static NEXT_ID: AtomicU32 = AtomicU32::new(0);

/// Mint a fresh process-unique stamp.
///
/// Lock-free: a single atomic fetch-add on the shared counter.
#[must_use]
pub fn mint() -> String {
    let local = NEXT_ID.fetch_add(1, Ordering::Relaxed);
    format!("1{:05}{}", std::process::id(), local)
}
