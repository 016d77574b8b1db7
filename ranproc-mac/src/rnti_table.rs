//! C-RNTI to UE index map.
//!
//! Fixed-size table indexed by `rnti % capacity`. A slot holding
//! [`DuUeIndex::INVALID`] is unassigned. Two RNTIs that map to the same slot
//! cannot be live at the same time.

use ranproc_common::{DuUeIndex, Rnti};

/// Fixed-capacity C-RNTI lookup table.
#[derive(Debug, Clone)]
pub struct RntiTable {
    slots: Vec<DuUeIndex>,
}

impl RntiTable {
    /// Creates a table with `capacity` unassigned slots.
    ///
    /// A zero capacity is bumped to one slot.
    pub fn new(capacity: usize) -> Self {
        Self {
            slots: vec![DuUeIndex::INVALID; capacity.max(1)],
        }
    }

    /// Number of slots.
    pub fn capacity(&self) -> usize {
        self.slots.len()
    }

    fn slot(&self, rnti: Rnti) -> usize {
        rnti.value() as usize % self.slots.len()
    }

    /// Returns the UE index stored in the slot of `rnti`, if any.
    ///
    /// The caller must confirm the UE actually owns `rnti`: a different RNTI
    /// sharing the slot yields the same index.
    pub fn get(&self, rnti: Rnti) -> Option<DuUeIndex> {
        let ue_index = self.slots[self.slot(rnti)];
        ue_index.is_valid().then_some(ue_index)
    }

    /// Returns true if the slot of `rnti` is assigned.
    pub fn is_occupied(&self, rnti: Rnti) -> bool {
        self.get(rnti).is_some()
    }

    /// Assigns the slot of `rnti` to `ue_index`. Returns false if occupied.
    pub fn insert(&mut self, rnti: Rnti, ue_index: DuUeIndex) -> bool {
        let slot = self.slot(rnti);
        if self.slots[slot].is_valid() {
            return false;
        }
        self.slots[slot] = ue_index;
        true
    }

    /// Clears the slot of `rnti` if it is assigned to `ue_index`.
    pub fn remove(&mut self, rnti: Rnti, ue_index: DuUeIndex) -> bool {
        let slot = self.slot(rnti);
        if self.slots[slot] != ue_index {
            return false;
        }
        self.slots[slot] = DuUeIndex::INVALID;
        true
    }

    /// Number of assigned slots.
    pub fn len(&self) -> usize {
        self.slots.iter().filter(|ue_index| ue_index.is_valid()).count()
    }

    /// Returns true if no slot is assigned.
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}
