//! UE table owned by the MAC control component.
//!
//! Holds one slot per DU UE index (bounded by the configured maximum) and the
//! C-RNTI map. Every mutation happens synchronously under the component lock;
//! procedures never touch the table except through erase-after-stop.

use ranproc_common::{CellIndex, DuUeIndex, Rnti, MAX_NOF_DU_UES};

use crate::error::MacCtrlError;
use crate::rnti_table::RntiTable;
use crate::ue_context::MacUeContext;

/// One live UE: its context, its control loop and bookkeeping flags.
#[derive(Debug)]
pub(crate) struct UeEntry<L> {
    pub ctx: MacUeContext,
    pub ctrl_loop: L,
    /// Distinguishes successive UEs reusing the same index
    pub generation: u64,
    pub removal_pending: bool,
}

#[derive(Debug)]
pub(crate) struct UeRepository<L> {
    entries: Vec<Option<UeEntry<L>>>,
    rnti_table: RntiTable,
    nof_cells: usize,
    next_generation: u64,
}

impl<L> UeRepository<L> {
    /// `max_nof_ues` is capped at [`MAX_NOF_DU_UES`].
    pub fn new(max_nof_ues: usize, nof_cells: usize) -> Self {
        let max_nof_ues = max_nof_ues.min(MAX_NOF_DU_UES);
        let mut entries = Vec::with_capacity(max_nof_ues);
        entries.resize_with(max_nof_ues, || None);
        Self {
            entries,
            rnti_table: RntiTable::new(max_nof_ues),
            nof_cells,
            next_generation: 0,
        }
    }

    pub fn max_nof_ues(&self) -> usize {
        self.entries.len()
    }

    /// Checks that a UE can be added, without modifying the table.
    pub fn check_add(
        &self,
        ue_index: DuUeIndex,
        rnti: Rnti,
        cell_index: CellIndex,
    ) -> Result<(), MacCtrlError> {
        if !rnti.is_valid() {
            return Err(MacCtrlError::InvalidRnti);
        }
        if !ue_index.is_valid() || ue_index.as_usize() >= self.entries.len() {
            return Err(MacCtrlError::UeIndexOutOfRange {
                ue_index,
                max: self.entries.len(),
            });
        }
        if cell_index.0 as usize >= self.nof_cells {
            return Err(MacCtrlError::CellIndexOutOfRange {
                cell_index,
                nof_cells: self.nof_cells,
            });
        }
        if self.contains(ue_index) {
            return Err(MacCtrlError::DuplicateUeIndex(ue_index));
        }
        if let Some(holder) = self.rnti_table.get(rnti) {
            let holder = self.get(holder).map_or(rnti, |entry| entry.ctx.rnti);
            if holder == rnti {
                return Err(MacCtrlError::DuplicateRnti(rnti));
            }
            return Err(MacCtrlError::RntiSlotOccupied { rnti, holder });
        }
        Ok(())
    }

    /// Allocates the UE and installs its C-RNTI. Returns the entry generation.
    pub fn add_ue(
        &mut self,
        ue_index: DuUeIndex,
        rnti: Rnti,
        cell_index: CellIndex,
        ctrl_loop: L,
    ) -> Result<u64, MacCtrlError> {
        self.check_add(ue_index, rnti, cell_index)?;

        let generation = self.next_generation;
        self.next_generation += 1;

        self.rnti_table.insert(rnti, ue_index);
        self.entries[ue_index.as_usize()] = Some(UeEntry {
            ctx: MacUeContext::new(ue_index, rnti, cell_index),
            ctrl_loop,
            generation,
            removal_pending: false,
        });
        Ok(generation)
    }

    /// Removes the UE if it is still the same generation and frees its C-RNTI.
    pub fn erase(&mut self, ue_index: DuUeIndex, generation: u64) -> Option<UeEntry<L>> {
        let slot = self.entries.get_mut(ue_index.as_usize())?;
        if slot.as_ref().map(|entry| entry.generation) != Some(generation) {
            return None;
        }
        let entry = slot.take()?;
        self.rnti_table.remove(entry.ctx.rnti, ue_index);
        Some(entry)
    }

    pub fn contains(&self, ue_index: DuUeIndex) -> bool {
        self.get(ue_index).is_some()
    }

    pub fn get(&self, ue_index: DuUeIndex) -> Option<&UeEntry<L>> {
        self.entries.get(ue_index.as_usize())?.as_ref()
    }

    pub fn get_mut(&mut self, ue_index: DuUeIndex) -> Option<&mut UeEntry<L>> {
        self.entries.get_mut(ue_index.as_usize())?.as_mut()
    }

    /// Looks up a UE by C-RNTI, checking the stored RNTI matches.
    pub fn find_by_rnti(&self, rnti: Rnti) -> Option<&UeEntry<L>> {
        if !rnti.is_valid() {
            return None;
        }
        let ue_index = self.rnti_table.get(rnti)?;
        self.get(ue_index).filter(|entry| entry.ctx.rnti == rnti)
    }

    pub fn nof_ues(&self) -> usize {
        self.entries.iter().filter(|entry| entry.is_some()).count()
    }

    pub fn iter(&self) -> impl Iterator<Item = &UeEntry<L>> {
        self.entries.iter().filter_map(Option::as_ref)
    }
}
