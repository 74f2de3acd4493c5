//! The 256-slot caches URP keeps per direction for types, OIDs and TIDs.

use crate::error::{Result, UrpError};

pub const CACHE_SIZE: usize = 256;

/// Index meaning "not cached".
pub const NO_INDEX: u16 = 0xFFFF;

/// Sender-side cache: remembers which values the peer already holds.
///
/// Slots are reused round-robin once all 256 are taken.
pub struct OutboundCache<T> {
    slots: Vec<Option<T>>,
    cursor: usize,
}

impl<T: PartialEq + Clone> OutboundCache<T> {
    pub fn new() -> Self {
        Self {
            slots: vec![None; CACHE_SIZE],
            cursor: 0,
        }
    }

    /// Returns the slot for `value` and whether it was just assigned
    /// (and must therefore be sent in full).
    pub fn slot_for(&mut self, value: &T) -> (u16, bool) {
        if let Some(pos) = self.slots.iter().position(|s| s.as_ref() == Some(value)) {
            return (pos as u16, false);
        }
        let pos = self.cursor;
        self.slots[pos] = Some(value.clone());
        self.cursor = (self.cursor + 1) % CACHE_SIZE;
        (pos as u16, true)
    }
}

impl<T: PartialEq + Clone> Default for OutboundCache<T> {
    fn default() -> Self {
        Self::new()
    }
}

/// Receiver-side table filled by the peer's "new value" announcements.
pub struct InboundCache<T> {
    kind: &'static str,
    slots: Vec<Option<T>>,
}

impl<T: Clone> InboundCache<T> {
    pub fn new(kind: &'static str) -> Self {
        Self {
            kind,
            slots: vec![None; CACHE_SIZE],
        }
    }

    /// Stores `value` when the index is a real slot.
    pub fn remember(&mut self, index: u16, value: &T) {
        if let Some(slot) = self.slots.get_mut(index as usize) {
            *slot = Some(value.clone());
        }
    }

    pub fn recall(&self, index: u16) -> Result<T> {
        self.slots
            .get(index as usize)
            .and_then(|s| s.clone())
            .ok_or(UrpError::CacheMiss {
                kind: self.kind,
                index,
            })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_outbound_reuses_slot_for_known_value() {
        let mut cache = OutboundCache::new();
        assert_eq!(cache.slot_for(&"a".to_string()), (0, true));
        assert_eq!(cache.slot_for(&"b".to_string()), (1, true));
        assert_eq!(cache.slot_for(&"a".to_string()), (0, false));
    }

    #[test]
    fn test_outbound_wraps_after_full_cycle() {
        let mut cache = OutboundCache::new();
        for n in 0..CACHE_SIZE {
            cache.slot_for(&n);
        }
        assert_eq!(cache.slot_for(&9999), (0, true));
        // slot 0 no longer holds 0
        assert_eq!(cache.slot_for(&0), (1, true));
    }

    #[test]
    fn test_inbound_ignores_no_index_and_reports_misses() {
        let mut cache = InboundCache::new("oid");
        cache.remember(NO_INDEX, &"x".to_string());
        cache.remember(3, &"y".to_string());
        assert_eq!(cache.recall(3).unwrap(), "y");
        assert!(matches!(
            cache.recall(4),
            Err(UrpError::CacheMiss { kind: "oid", index: 4 })
        ));
    }
}
