//! Entity uid generation.

use std::sync::atomic::{AtomicU64, Ordering};

use crate::pick::{EntityUid, UID_MASK};

/// Hands out document uids.
///
/// Uids start at 1 and never exceed 56 bits, so every generated uid survives
/// the pick buffer and none collides with the all-zero background pixel.
#[derive(Debug)]
pub struct UidGenerator {
    next: AtomicU64,
}

impl UidGenerator {
    /// Creates a generator whose first uid is 1.
    #[must_use]
    pub const fn new() -> Self {
        Self {
            next: AtomicU64::new(1),
        }
    }

    /// Creates a generator resuming at `first` (clamped to at least 1),
    /// e.g. after loading a document whose highest uid is `first - 1`.
    #[must_use]
    pub fn starting_at(first: EntityUid) -> Self {
        Self {
            next: AtomicU64::new(first.max(1)),
        }
    }

    /// Returns the next uid, or `None` once the 56-bit space is exhausted.
    pub fn next_uid(&self) -> Option<EntityUid> {
        self.next
            .fetch_update(Ordering::Relaxed, Ordering::Relaxed, |current| {
                (current <= UID_MASK).then_some(current + 1)
            })
            .ok()
    }

    /// Returns the uid the next call will hand out, without consuming it.
    #[must_use]
    pub fn peek(&self) -> EntityUid {
        self.next.load(Ordering::Relaxed)
    }
}

impl Default for UidGenerator {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashSet;
    use std::sync::Arc;

    #[test]
    fn test_generation_never_produces_zero() {
        let generator = UidGenerator::new();
        assert_eq!(generator.next_uid(), Some(1));
        for _ in 0..1000 {
            assert_ne!(generator.next_uid(), Some(0));
        }
        assert_eq!(UidGenerator::starting_at(0).next_uid(), Some(1));
    }

    #[test]
    fn test_exhaustion_at_56_bits() {
        let generator = UidGenerator::starting_at(UID_MASK);
        assert_eq!(generator.next_uid(), Some(UID_MASK));
        assert_eq!(generator.next_uid(), None);
        assert_eq!(generator.next_uid(), None);
    }

    #[test]
    fn test_unique_across_threads() {
        let generator = Arc::new(UidGenerator::new());
        let handles: Vec<_> = (0..4)
            .map(|_| {
                let generator = Arc::clone(&generator);
                std::thread::spawn(move || {
                    (0..250)
                        .filter_map(|_| generator.next_uid())
                        .collect::<Vec<_>>()
                })
            })
            .collect();

        let mut seen = HashSet::new();
        for handle in handles {
            for uid in handle.join().unwrap() {
                assert!(uid >= 1);
                assert!(seen.insert(uid), "uid {uid} handed out twice");
            }
        }
        assert_eq!(seen.len(), 1000);
        assert_eq!(generator.peek(), 1001);
    }
}
