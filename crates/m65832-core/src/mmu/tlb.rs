//! Sixteen-entry, round-robin translation lookaside buffer.

/// Number of TLB entries.
pub const TLB_ENTRIES: usize = 16;

/// Entry maps a present page.
pub const TLB_PRESENT: u8 = 0x01;
/// Entry permits writes.
pub const TLB_WRITABLE: u8 = 0x02;
/// Entry permits user-mode access.
pub const TLB_USER: u8 = 0x04;
/// Entry permits instruction fetch.
pub const TLB_EXECUTABLE: u8 = 0x08;
/// Page has been written.
pub const TLB_DIRTY: u8 = 0x10;
/// Page has been accessed.
pub const TLB_ACCESSED: u8 = 0x20;
/// Entry matches every address space.
pub const TLB_GLOBAL: u8 = 0x40;

/// One cached translation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
#[cfg_attr(feature = "serde", derive(serde::Deserialize, serde::Serialize))]
pub struct TlbEntry {
    /// Virtual page number (`va >> 12`).
    pub vpn: u32,
    /// Physical page number.
    pub ppn: u64,
    /// Address space the entry was filled under.
    pub asid: u8,
    /// `TLB_*` permission bits.
    pub flags: u8,
    /// Entry holds a translation.
    pub valid: bool,
}

impl TlbEntry {
    /// Returns `true` when the entry translates `vpn` in address space `asid`.
    #[must_use]
    pub const fn matches(&self, vpn: u32, asid: u8) -> bool {
        self.valid && self.vpn == vpn && (self.asid == asid || self.flags & TLB_GLOBAL != 0)
    }
}

/// Fixed array of entries plus the next-victim cursor.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct Tlb {
    entries: [TlbEntry; TLB_ENTRIES],
    next_victim: usize,
}

impl Tlb {
    /// Finds the entry translating `vpn` under `asid`.
    #[must_use]
    pub fn lookup(&self, vpn: u32, asid: u8) -> Option<&TlbEntry> {
        self.entries.iter().find(|entry| entry.matches(vpn, asid))
    }

    /// Replaces the entry under the victim cursor and advances it; returns the slot used.
    pub fn insert(&mut self, vpn: u32, ppn: u64, asid: u8, flags: u8) -> usize {
        let slot = self.next_victim;
        self.entries[slot] = TlbEntry {
            vpn,
            ppn,
            asid,
            flags,
            valid: true,
        };
        self.next_victim = (slot + 1) % TLB_ENTRIES;
        slot
    }

    /// Invalidates every entry mapping `vpn`.
    pub fn invalidate_vpn(&mut self, vpn: u32) {
        self.entries
            .iter_mut()
            .filter(|entry| entry.vpn == vpn)
            .for_each(|entry| entry.valid = false);
    }

    /// Invalidates every non-global entry tagged with `asid`.
    pub fn invalidate_asid(&mut self, asid: u8) {
        self.entries
            .iter_mut()
            .filter(|entry| entry.asid == asid && entry.flags & TLB_GLOBAL == 0)
            .for_each(|entry| entry.valid = false);
    }

    /// Invalidates every entry and rewinds the victim cursor.
    pub fn flush(&mut self) {
        self.entries = [TlbEntry::default(); TLB_ENTRIES];
        self.next_victim = 0;
    }

    /// Read-only view of all entries.
    #[must_use]
    pub const fn entries(&self) -> &[TlbEntry; TLB_ENTRIES] {
        &self.entries
    }

    /// Slot the next insertion will replace.
    #[must_use]
    pub const fn next_victim(&self) -> usize {
        self.next_victim
    }
}
