//! Voice slot allocation.

use crate::{Error, Result};

/// Fixed-capacity bitmap of voice slots.
///
/// Slots are handed out lowest-index first. Freeing is idempotent, so a slot
/// that is released twice stays free and never corrupts the bitmap.
#[derive(Debug, Clone)]
pub struct VoiceAllocator {
    slots: Vec<bool>,
}

impl VoiceAllocator {
    /// Create an allocator with `capacity` free slots.
    pub fn new(capacity: usize) -> Self {
        Self {
            slots: vec![false; capacity],
        }
    }

    /// Total number of slots.
    pub fn capacity(&self) -> usize {
        self.slots.len()
    }

    /// Claim the first free slot.
    pub fn allocate(&mut self) -> Result<usize> {
        let index = self
            .slots
            .iter()
            .position(|&used| !used)
            .ok_or(Error::NoVoiceAvailable {
                capacity: self.slots.len(),
            })?;
        self.slots[index] = true;
        Ok(index)
    }

    /// Release `index`. Already-free or out-of-range slots are ignored.
    pub fn free(&mut self, index: usize) {
        if let Some(slot) = self.slots.get_mut(index) {
            *slot = false;
        }
    }

    /// Whether `index` is free. Out-of-range slots report `false`.
    pub fn is_free(&self, index: usize) -> bool {
        self.slots.get(index).is_some_and(|&used| !used)
    }

    /// Number of slots currently free.
    pub fn free_count(&self) -> usize {
        self.slots.iter().filter(|&&used| !used).count()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_allocates_lowest_first() {
        let mut alloc = VoiceAllocator::new(3);
        assert_eq!(alloc.allocate().unwrap(), 0);
        assert_eq!(alloc.allocate().unwrap(), 1);
        alloc.free(0);
        assert_eq!(alloc.allocate().unwrap(), 0);
        assert_eq!(alloc.allocate().unwrap(), 2);
    }

    #[test]
    fn test_exhaustion_is_an_error() {
        let mut alloc = VoiceAllocator::new(2);
        alloc.allocate().unwrap();
        alloc.allocate().unwrap();
        match alloc.allocate() {
            Err(Error::NoVoiceAvailable { capacity }) => assert_eq!(capacity, 2),
            other => panic!("expected NoVoiceAvailable, got {other:?}"),
        }
    }

    #[test]
    fn test_free_is_idempotent() {
        let mut alloc = VoiceAllocator::new(2);
        let slot = alloc.allocate().unwrap();
        alloc.free(slot);
        alloc.free(slot);
        alloc.free(99);
        assert_eq!(alloc.free_count(), 2);
        assert!(alloc.is_free(slot));
        assert!(!alloc.is_free(99));
    }

    #[test]
    fn test_zero_capacity() {
        let mut alloc = VoiceAllocator::new(0);
        assert!(alloc.allocate().is_err());
        assert_eq!(alloc.free_count(), 0);
    }
}
