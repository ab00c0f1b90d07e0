//! # Intrusive Reference Counting
//!
//! Every pooled payload embeds a [`RefCount`] and exposes it through the
//! [`RefCounted`] trait. Handles drive the count; the payload itself never
//! touches it.

use std::cell::Cell;

/// An intrusive, single-threaded reference counter.
///
/// The count starts at zero; the defining first handle over a freshly
/// allocated payload takes it to one. No native call ever happens on the
/// increment path.
///
/// # Thread Safety
///
/// NOT thread-safe. The lifetime core runs strictly on the owning thread.
#[derive(Debug, Default)]
pub struct RefCount(Cell<u32>);

impl RefCount {
    /// Creates a counter at zero.
    #[must_use]
    pub const fn new() -> Self {
        Self(Cell::new(0))
    }

    /// Increments the count and returns the new value.
    #[inline]
    pub fn inc(&self) -> u32 {
        let count = self.0.get() + 1;
        self.0.set(count);
        count
    }

    /// Decrements the count and returns the new value.
    ///
    /// Decrementing a zero count is a caller bug: it indicates a handle was
    /// dropped twice over the same payload.
    #[inline]
    pub fn dec(&self) -> u32 {
        let current = self.0.get();
        debug_assert!(current > 0, "refcount underflow: dec() on a zero count");
        let count = current.saturating_sub(1);
        self.0.set(count);
        count
    }

    /// Returns the current count.
    #[inline]
    #[must_use]
    pub fn get(&self) -> u32 {
        self.0.get()
    }
}

/// Implemented by every payload stored in a [`BlockAllocator`].
///
/// [`BlockAllocator`]: super::BlockAllocator
pub trait RefCounted {
    /// Access to the payload's embedded counter.
    fn ref_count(&self) -> &RefCount;
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_starts_at_zero() {
        let refs = RefCount::new();
        assert_eq!(refs.get(), 0);
    }

    #[test]
    fn test_inc_dec_roundtrip() {
        let refs = RefCount::new();
        assert_eq!(refs.inc(), 1);
        assert_eq!(refs.inc(), 2);
        assert_eq!(refs.dec(), 1);
        assert_eq!(refs.dec(), 0);
        assert_eq!(refs.get(), 0);
    }
}
