//! Process-wide version stamps for cacheable state.
//!
//! The registry and the graph take a fresh stamp on every mutation instead of
//! counting their own edits. Two instances therefore share a stamp only when
//! one is an unmodified clone of the other, which lets a resolver cache keyed
//! on stamps serve several registries without mixing up their results.

use std::sync::atomic::{AtomicU64, Ordering};

/// Stamp of a freshly created, empty instance.
pub(crate) const INITIAL: u64 = 0;

static NEXT: AtomicU64 = AtomicU64::new(INITIAL + 1);

/// Take the next unused stamp.
pub(crate) fn next() -> u64 {
    NEXT.fetch_add(1, Ordering::Relaxed)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_stamps_are_unique_and_increasing() {
        let a = next();
        let b = next();
        assert!(a > INITIAL);
        assert!(b > a);
    }
}
