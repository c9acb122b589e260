//! Bounded best-k selection for scans.
//!
//! The selector keeps exactly `k` slots sorted by ascending distance. Slots
//! start out empty (sentinel distance +inf), so the last slot's distance is
//! always a valid rejection threshold: most scanned rows fail the single
//! `distance < threshold` comparison and never touch the slot array.

use crate::index::traits::{SearchResult, SearchSlot};
use crate::types::VectorId;

#[derive(Debug, Clone, Copy, PartialEq)]
struct Entry {
    id: Option<VectorId>,
    distance: f32,
}

impl Entry {
    const EMPTY: Entry = Entry {
        id: None,
        distance: f32::INFINITY,
    };
}

/// Fixed-capacity, always-sorted list of the k smallest (distance, id) pairs.
#[derive(Debug, Clone)]
pub struct TopKSelector {
    entries: Vec<Entry>,
}

impl TopKSelector {
    /// Create a selector holding `k` empty slots.
    pub fn new(k: usize) -> Self {
        Self {
            entries: vec![Entry::EMPTY; k],
        }
    }

    /// Capacity k.
    #[inline]
    pub fn capacity(&self) -> usize {
        self.entries.len()
    }

    /// Distance of the worst kept slot; candidates must beat it strictly.
    ///
    /// `+inf` while any slot is empty; `-inf` for a zero-capacity selector.
    #[inline]
    pub fn threshold(&self) -> f32 {
        self.entries
            .last()
            .map(|e| e.distance)
            .unwrap_or(f32::NEG_INFINITY)
    }

    /// Offer a candidate. Returns true if it was kept.
    ///
    /// Rejected when `distance >= threshold` (and for NaN). Otherwise it is
    /// inserted after every kept entry with a distance `<=` its own, so
    /// earlier candidates win ties, and the worst entry falls off the end.
    #[inline]
    pub fn offer(&mut self, distance: f32, id: impl Into<VectorId>) -> bool {
        if !(distance < self.threshold()) {
            return false;
        }

        let at = self.entries.partition_point(|e| e.distance <= distance);
        self.entries.pop();
        self.entries.insert(
            at,
            Entry {
                id: Some(id.into()),
                distance,
            },
        );
        true
    }

    /// Number of slots holding a real candidate.
    pub fn filled(&self) -> usize {
        self.entries.iter().take_while(|e| e.id.is_some()).count()
    }

    /// Finalize into k ascending slots; unfilled positions are `Empty`.
    pub fn into_slots(self) -> Vec<SearchSlot> {
        self.entries
            .into_iter()
            .map(|e| match e.id {
                Some(id) => SearchSlot::Hit(SearchResult { id, distance: e.distance }),
                None => SearchSlot::Empty,
            })
            .collect()
    }
}
