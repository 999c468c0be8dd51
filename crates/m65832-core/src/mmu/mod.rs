//! Two-level paging MMU with a TLB front end.
//!
//! Virtual addresses split 10/10/12: bits 31:22 index the level-1 table at
//! `PTBR`, bits 21:12 index the level-2 table named by the level-1 entry, and
//! bits 11:0 pass through. Entries are 64-bit little-endian words read from the
//! raw physical array, never through the tiered memory path.

/// Translation lookaside buffer.
pub mod tlb;

use tracing::trace;

pub use tlb::{
    Tlb, TlbEntry, TLB_ACCESSED, TLB_DIRTY, TLB_ENTRIES, TLB_EXECUTABLE, TLB_GLOBAL, TLB_PRESENT,
    TLB_USER, TLB_WRITABLE,
};

use crate::{AccessKind, MmuFault, PhysicalMemory};

/// `MMUCR` paging enable.
pub const MMUCR_PG: u32 = 0x01;
/// `MMUCR` write-protect enable.
pub const MMUCR_WP: u32 = 0x02;
/// `MMUCR` fault-type field mask.
pub const MMUCR_FTYPE_MASK: u32 = 0x1C;
/// `MMUCR` fault-type field shift.
pub const MMUCR_FTYPE_SHIFT: u32 = 2;

/// Entry is present.
pub const PTE_PRESENT: u64 = 1 << 0;
/// Page is writable.
pub const PTE_WRITABLE: u64 = 1 << 1;
/// Page is user accessible.
pub const PTE_USER: u64 = 1 << 2;
/// Write-through caching.
pub const PTE_PWT: u64 = 1 << 3;
/// Caching disabled.
pub const PTE_PCD: u64 = 1 << 4;
/// Page has been accessed.
pub const PTE_ACCESSED: u64 = 1 << 9;
/// Page has been written.
pub const PTE_DIRTY: u64 = 1 << 10;
/// Translation is shared by every address space.
pub const PTE_GLOBAL: u64 = 1 << 11;
/// Instruction fetch is forbidden.
pub const PTE_NO_EXEC: u64 = 1 << 63;
/// Physical frame bits of an entry.
pub const PTE_PPN_MASK: u64 = 0xFFFF_FFFF_FFFF_F000;

const PAGE_OFFSET_MASK: u32 = 0xFFF;

/// Paging control registers and the TLB.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct Mmu {
    ptbr: u64,
    asid: u8,
    mmucr: u32,
    faultva: u32,
    tlb: Tlb,
    walks: u64,
}

impl Mmu {
    /// Returns `true` when `MMUCR.PG` is set.
    #[must_use]
    pub const fn paging_enabled(&self) -> bool {
        self.mmucr & MMUCR_PG != 0
    }

    /// Page-table base.
    #[must_use]
    pub const fn ptbr(&self) -> u64 {
        self.ptbr
    }

    /// Sets the page-table base.
    pub const fn set_ptbr(&mut self, value: u64) {
        self.ptbr = value;
    }

    /// Current address-space identifier.
    #[must_use]
    pub const fn asid(&self) -> u8 {
        self.asid
    }

    /// Sets the current address-space identifier.
    pub const fn set_asid(&mut self, value: u8) {
        self.asid = value;
    }

    /// MMU control register.
    #[must_use]
    pub const fn mmucr(&self) -> u32 {
        self.mmucr
    }

    /// Writes `MMUCR`; the fault-type field is preserved.
    pub const fn set_mmucr(&mut self, value: u32) {
        self.mmucr = (self.mmucr & MMUCR_FTYPE_MASK) | (value & !MMUCR_FTYPE_MASK);
    }

    /// Virtual address of the most recent fault.
    #[must_use]
    pub const fn faultva(&self) -> u32 {
        self.faultva
    }

    /// Decoded `MMUCR.FTYPE`.
    #[must_use]
    pub const fn fault_type(&self) -> Option<MmuFault> {
        // FTYPE is a 3-bit field
        #[allow(clippy::cast_possible_truncation)]
        let code = ((self.mmucr & MMUCR_FTYPE_MASK) >> MMUCR_FTYPE_SHIFT) as u8;
        MmuFault::from_u8(code)
    }

    /// Read-only view of the TLB.
    #[must_use]
    pub const fn tlb(&self) -> &Tlb {
        &self.tlb
    }

    /// Number of page-table walks performed since reset.
    #[must_use]
    pub const fn walk_count(&self) -> u64 {
        self.walks
    }

    /// Invalidates the TLB entry for the page containing `va`.
    pub fn invalidate_va(&mut self, va: u32) {
        self.tlb.invalidate_vpn(va >> 12);
    }

    /// Invalidates non-global entries of an address space.
    pub fn invalidate_asid(&mut self, asid: u8) {
        self.tlb.invalidate_asid(asid);
    }

    /// Flushes the whole TLB.
    pub fn flush(&mut self) {
        self.tlb.flush();
    }

    /// Returns every register and the TLB to the reset state.
    pub fn reset(&mut self) {
        *self = Self::default();
    }

    /// Latches `FAULTVA` and `MMUCR.FTYPE`.
    #[allow(clippy::cast_lossless)]
    pub const fn record_fault(&mut self, va: u32, fault: MmuFault) {
        self.faultva = va;
        self.mmucr = (self.mmucr & !MMUCR_FTYPE_MASK)
            | ((fault.as_u8() as u32) << MMUCR_FTYPE_SHIFT);
    }

    /// Translates `va`, refilling the TLB on a miss.
    ///
    /// With paging disabled the mapping is the identity.
    ///
    /// # Errors
    ///
    /// Returns the [`MmuFault`] classification after latching it into
    /// `FAULTVA` and `MMUCR.FTYPE`.
    pub fn translate(
        &mut self,
        memory: &PhysicalMemory,
        va: u32,
        access: AccessKind,
        user: bool,
    ) -> Result<u64, MmuFault> {
        if !self.paging_enabled() {
            return Ok(u64::from(va));
        }
        let result = match self.lookup(va, access, user) {
            Some(hit) => hit,
            None => self.walk(memory, va, access, user).map(|(pa, ppn, flags)| {
                let slot = self.tlb.insert(va >> 12, ppn, self.asid, flags);
                trace!(va, pa, slot, "tlb refill");
                pa
            }),
        };
        if let Err(fault) = result {
            trace!(va, ?access, user, %fault, "mmu fault");
            self.record_fault(va, fault);
        }
        result
    }

    /// Translates `va` without refilling the TLB or latching faults.
    #[must_use]
    pub fn probe(
        &self,
        memory: &PhysicalMemory,
        va: u32,
        access: AccessKind,
        user: bool,
    ) -> Option<u64> {
        if !self.paging_enabled() {
            return Some(u64::from(va));
        }
        self.lookup(va, access, user)
            .unwrap_or_else(|| {
                walk_tables(self.ptbr, memory, va, access, user).map(|(pa, _, _)| pa)
            })
            .ok()
    }

    fn lookup(&self, va: u32, access: AccessKind, user: bool) -> Option<Result<u64, MmuFault>> {
        let entry = self.tlb.lookup(va >> 12, self.asid)?;
        let checked = if user && entry.flags & TLB_USER == 0 {
            Err(MmuFault::UserSupervisor)
        } else if access == AccessKind::Write && entry.flags & TLB_WRITABLE == 0 {
            Err(MmuFault::WriteProtect)
        } else if access == AccessKind::Fetch && entry.flags & TLB_EXECUTABLE == 0 {
            Err(MmuFault::NoExecute)
        } else {
            Ok((entry.ppn << 12) | u64::from(va & PAGE_OFFSET_MASK))
        };
        Some(checked)
    }

    fn walk(
        &mut self,
        memory: &PhysicalMemory,
        va: u32,
        access: AccessKind,
        user: bool,
    ) -> Result<(u64, u64, u8), MmuFault> {
        self.walks += 1;
        walk_tables(self.ptbr, memory, va, access, user)
    }
}

/// Walks both table levels; returns `(pa, ppn, tlb_flags)`.
fn walk_tables(
    ptbr: u64,
    memory: &PhysicalMemory,
    va: u32,
    access: AccessKind,
    user: bool,
) -> Result<(u64, u64, u8), MmuFault> {
    let l1_index = u64::from((va >> 22) & 0x3FF);
    let l1 = memory.read_u64(ptbr.wrapping_add(l1_index * 8));
    if l1 & PTE_PRESENT == 0 {
        return Err(MmuFault::L1NotPresent);
    }

    let l2_index = u64::from((va >> 12) & 0x3FF);
    let l2 = memory.read_u64((l1 & PTE_PPN_MASK).wrapping_add(l2_index * 8));
    if l2 & PTE_PRESENT == 0 {
        return Err(MmuFault::NotPresent);
    }
    if user && l2 & PTE_USER == 0 {
        return Err(MmuFault::UserSupervisor);
    }
    if access == AccessKind::Write && l2 & PTE_WRITABLE == 0 {
        return Err(MmuFault::WriteProtect);
    }
    if access == AccessKind::Fetch && l2 & PTE_NO_EXEC != 0 {
        return Err(MmuFault::NoExecute);
    }

    let ppn = (l2 & PTE_PPN_MASK) >> 12;
    let pa = (ppn << 12) | u64::from(va & PAGE_OFFSET_MASK);
    Ok((pa, ppn, tlb_flags(l2)))
}

const fn tlb_flags(pte: u64) -> u8 {
    let mut flags = TLB_PRESENT;
    if pte & PTE_WRITABLE != 0 {
        flags |= TLB_WRITABLE;
    }
    if pte & PTE_USER != 0 {
        flags |= TLB_USER;
    }
    if pte & PTE_NO_EXEC == 0 {
        flags |= TLB_EXECUTABLE;
    }
    if pte & PTE_ACCESSED != 0 {
        flags |= TLB_ACCESSED;
    }
    if pte & PTE_DIRTY != 0 {
        flags |= TLB_DIRTY;
    }
    if pte & PTE_GLOBAL != 0 {
        flags |= TLB_GLOBAL;
    }
    flags
}
