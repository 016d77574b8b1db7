//! Control-plane identifiers: DU and CU-CP UE indexes, C-RNTI, cell index,
//! PDU session ID, DRB ID, logical channel ID and S-NSSAI.
//!
//! All identifiers are thin newtypes so that a UE index can never be passed
//! where an RNTI is expected. Each type documents its valid range; values
//! outside it are representable on purpose (they act as "unassigned" markers
//! in fixed-size tables).

use std::fmt;

use serde::{Deserialize, Serialize};

/// Maximum number of UEs a DU can hold at once.
///
/// Fixed-size tables (RNTI map, UE repository) are never larger than this,
/// and the configured `max_nof_ues` must not exceed it.
pub const MAX_NOF_DU_UES: usize = 1024;

/// Maximum number of cells served by one DU.
pub const MAX_NOF_DU_CELLS: usize = 16;

/// Maximum number of PDU sessions a single UE can hold.
pub const MAX_NOF_PDU_SESSIONS: usize = 15;

/// Maximum number of DRBs per UE (TS 38.331 `maxDRB`).
pub const MAX_NOF_DRBS: u8 = 32;

// ============================================================================
// DU UE index
// ============================================================================

/// Index of a UE inside the DU, densely packed in `0..MAX_NOF_DU_UES`.
#[derive(Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct DuUeIndex(u16);

impl DuUeIndex {
    /// Marker for "no UE"; used as the empty value of the RNTI table.
    pub const INVALID: Self = Self(MAX_NOF_DU_UES as u16);

    /// Creates a UE index from its raw value.
    pub const fn new(value: u16) -> Self {
        Self(value)
    }

    /// Returns the raw value.
    pub const fn value(self) -> u16 {
        self.0
    }

    /// Returns the index as a table offset.
    pub const fn as_usize(self) -> usize {
        self.0 as usize
    }

    /// Returns true if the index lies inside the compile-time bound.
    pub const fn is_valid(self) -> bool {
        (self.0 as usize) < MAX_NOF_DU_UES
    }
}

impl fmt::Debug for DuUeIndex {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.is_valid() {
            write!(f, "DuUeIndex({})", self.0)
        } else {
            write!(f, "DuUeIndex(invalid)")
        }
    }
}

impl fmt::Display for DuUeIndex {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl From<u16> for DuUeIndex {
    fn from(value: u16) -> Self {
        Self(value)
    }
}

impl From<DuUeIndex> for u32 {
    fn from(ue_index: DuUeIndex) -> Self {
        ue_index.0 as u32
    }
}

// ============================================================================
// CU-CP UE index
// ============================================================================

/// Index of a UE inside the CU-CP.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct CuCpUeIndex(pub u32);

impl CuCpUeIndex {
    /// Returns the index as a table offset.
    pub const fn as_usize(self) -> usize {
        self.0 as usize
    }
}

impl fmt::Display for CuCpUeIndex {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl From<CuCpUeIndex> for u32 {
    fn from(ue_index: CuCpUeIndex) -> Self {
        ue_index.0
    }
}

// ============================================================================
// C-RNTI
// ============================================================================

/// Cell Radio Network Temporary Identifier (16-bit).
///
/// RNTI 0 is never assigned to a UE and is used as the invalid value.
#[derive(Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct Rnti(u16);

impl Rnti {
    /// Invalid RNTI.
    pub const INVALID: Self = Self(0);

    /// First C-RNTI value handed out by the simulator and the test fixtures.
    pub const MIN_CRNTI: Self = Self(0x4601);

    /// Creates an RNTI from its raw value.
    pub const fn new(value: u16) -> Self {
        Self(value)
    }

    /// Returns the raw value.
    pub const fn value(self) -> u16 {
        self.0
    }

    /// Returns true unless this is [`Rnti::INVALID`].
    pub const fn is_valid(self) -> bool {
        self.0 != 0
    }
}

impl fmt::Debug for Rnti {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Rnti({:#06x})", self.0)
    }
}

impl fmt::Display for Rnti {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{:#06x}", self.0)
    }
}

impl From<u16> for Rnti {
    fn from(value: u16) -> Self {
        Self(value)
    }
}

// ============================================================================
// Cell index
// ============================================================================

/// Index of a cell served by the DU.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Default, Serialize, Deserialize)]
pub struct CellIndex(pub u8);

impl CellIndex {
    /// Returns true if the index lies inside the compile-time bound.
    pub const fn is_valid(self) -> bool {
        (self.0 as usize) < MAX_NOF_DU_CELLS
    }
}

impl fmt::Display for CellIndex {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

// ============================================================================
// PDU session / DRB / LCID
// ============================================================================

/// PDU Session ID (0-255 on NGAP).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct PduSessionId(pub u8);

impl fmt::Display for PduSessionId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Data Radio Bearer ID (1-32).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct DrbId(pub u8);

impl DrbId {
    /// Lowest DRB ID.
    pub const MIN: Self = Self(1);

    /// Returns true if the ID lies in `1..=MAX_NOF_DRBS`.
    pub const fn is_valid(self) -> bool {
        self.0 >= 1 && self.0 <= MAX_NOF_DRBS
    }
}

impl fmt::Display for DrbId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// MAC logical channel ID.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct Lcid(pub u8);

impl Lcid {
    /// SRB0 logical channel.
    pub const SRB0: Self = Self(0);
    /// SRB1 logical channel.
    pub const SRB1: Self = Self(1);
}

impl fmt::Display for Lcid {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

// ============================================================================
// S-NSSAI
// ============================================================================

/// Slice a PDU session is requested on.
#[derive(Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
pub struct SNssai {
    pub sst: u8,
    /// 24-bit slice differentiator
    pub sd: Option<u32>,
}

impl SNssai {
    const SD_MASK: u32 = 0x00FF_FFFF;

    pub const fn new(sst: u8) -> Self {
        Self { sst, sd: None }
    }

    /// Bits of `sd` above the 24th are dropped.
    pub const fn with_sd(sst: u8, sd: u32) -> Self {
        Self {
            sst,
            sd: Some(sd & Self::SD_MASK),
        }
    }
}

impl fmt::Debug for SNssai {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "SNssai({self})")
    }
}

impl fmt::Display for SNssai {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.sst)?;
        if let Some(sd) = self.sd {
            write!(f, "-{sd:06X}")?;
        }
        Ok(())
    }
}
