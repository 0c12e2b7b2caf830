//! Fixed-capacity slot table
//!
//! Single source of truth for which devices are currently tracked. A slot
//! is either entirely empty or entirely populated; partial states cannot be
//! represented. The table itself is not synchronized — all access goes
//! through the engine's registry mutex, and no method blocks.

use events::SlotSummary;
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};

/// One occupied table entry.
pub struct SlotEntry<L> {
    /// Open transport connection, shared with the slot's reader thread.
    /// The connection closes when the last clone drops.
    pub link: Arc<L>,
    /// Human-readable identifier captured at attach time.
    pub display_name: String,
    pub vendor_id: u16,
    pub product_id: u16,
    /// Cancellation flag for the slot's reader thread.
    pub stop: Arc<AtomicBool>,
}

/// Fixed-capacity array of device slots.
pub struct SlotTable<L> {
    slots: Vec<Option<SlotEntry<L>>>,
}

impl<L> SlotTable<L> {
    pub fn new(capacity: usize) -> Self {
        let mut slots = Vec::with_capacity(capacity);
        slots.resize_with(capacity, || None);
        Self { slots }
    }

    pub fn capacity(&self) -> usize {
        self.slots.len()
    }

    /// Lowest free slot index, if any.
    pub fn find_free(&self) -> Option<usize> {
        self.slots.iter().position(Option::is_none)
    }

    /// Commit `entry` into a free slot. Returns false, consuming the entry,
    /// when the index is out of range or already occupied.
    pub fn occupy(&mut self, index: usize, entry: SlotEntry<L>) -> bool {
        match self.slots.get_mut(index) {
            Some(slot @ None) => {
                *slot = Some(entry);
                true
            }
            _ => false,
        }
    }

    /// Free a slot and hand its entry back. Idempotent: releasing an
    /// already-free or out-of-range index is a no-op returning `None`, so
    /// racing teardown paths cannot double-free.
    pub fn release(&mut self, index: usize) -> Option<SlotEntry<L>> {
        self.slots.get_mut(index)?.take()
    }

    /// Free a slot only if it still holds `link`. This is the guarded form
    /// both teardown paths use: a reader whose slot was already released
    /// and re-occupied by a new device must not tear down the successor.
    pub fn release_matching(&mut self, index: usize, link: &Arc<L>) -> Option<SlotEntry<L>> {
        let slot = self.slots.get_mut(index)?;
        match slot {
            Some(entry) if Arc::ptr_eq(&entry.link, link) => slot.take(),
            _ => None,
        }
    }

    pub fn is_occupied(&self, index: usize) -> bool {
        self.slots.get(index).is_some_and(Option::is_some)
    }

    pub fn occupied_count(&self) -> usize {
        self.slots.iter().flatten().count()
    }

    /// Whether some occupied slot matches this vendor/product pair.
    pub fn contains(&self, vendor_id: u16, product_id: u16) -> bool {
        self.slots
            .iter()
            .flatten()
            .any(|entry| entry.vendor_id == vendor_id && entry.product_id == product_id)
    }

    /// Owned read-only copy of one occupied slot.
    pub fn summary(&self, index: usize) -> Option<SlotSummary> {
        self.slots.get(index)?.as_ref().map(|entry| SlotSummary {
            slot_index: index,
            display_name: entry.display_name.clone(),
            vendor_id: entry.vendor_id,
            product_id: entry.product_id,
        })
    }

    /// Owned copies of every occupied slot, for iteration outside the lock.
    pub fn snapshot(&self) -> Vec<(usize, Arc<L>, SlotSummary)> {
        self.slots
            .iter()
            .enumerate()
            .filter_map(|(index, slot)| {
                slot.as_ref().map(|entry| {
                    (
                        index,
                        Arc::clone(&entry.link),
                        SlotSummary {
                            slot_index: index,
                            display_name: entry.display_name.clone(),
                            vendor_id: entry.vendor_id,
                            product_id: entry.product_id,
                        },
                    )
                })
            })
            .collect()
    }

    /// Signal every occupied slot's reader to stop.
    pub fn stop_all(&self) {
        for entry in self.slots.iter().flatten() {
            entry.stop.store(true, Ordering::Relaxed);
        }
    }

    /// Empty the table, returning all entries.
    pub fn drain(&mut self) -> Vec<SlotEntry<L>> {
        self.slots.iter_mut().filter_map(Option::take).collect()
    }
}
