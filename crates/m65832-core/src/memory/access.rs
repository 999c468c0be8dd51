//! Tiered data access, instruction fetch and physical vector reads.
//!
//! Data accesses try, in order: watchpoints, the system-register window,
//! registered MMIO regions, then MMU translation into the custom backend or
//! the flat array. Fetches skip the first three tiers.

#![allow(clippy::cast_possible_truncation)]

use crate::addressing::Operand;
use crate::memory::{is_sysreg, AccessKind};
use crate::{CpuState, TrapKind, Width};

const PAGE_SIZE: u32 = 0x1000;

const fn crosses_page(addr: u32, width: Width) -> bool {
    (addr & (PAGE_SIZE - 1)) + width.bytes() > PAGE_SIZE
}

impl CpuState {
    /// Reads `width` bytes at virtual address `addr` through every tier.
    pub(crate) fn read(&mut self, addr: u32, width: Width) -> u32 {
        if self.points.watch_hit(addr, width, false) {
            self.raise(TrapKind::Watchpoint, addr);
        }
        if is_sysreg(addr) {
            return self.sysreg_read(addr, width);
        }
        if let Some(index) = self.mmio.find(addr) {
            return self.mmio.read(index, addr, width);
        }
        self.read_translated(addr, width)
    }

    /// Writes the low `width` bytes of `value` at virtual address `addr` through every tier.
    pub(crate) fn write(&mut self, addr: u32, value: u32, width: Width) {
        if self.points.watch_hit(addr, width, true) {
            self.raise(TrapKind::Watchpoint, addr);
        }
        self.reservation.invalidate_overlap(Operand::Memory(addr), width);
        if is_sysreg(addr) {
            self.sysreg_write(addr, value, width);
            return;
        }
        if let Some(index) = self.mmio.find(addr) {
            self.mmio.write(index, addr, value, width);
            return;
        }
        self.write_translated(addr, value, width);
    }

    fn read_translated(&mut self, addr: u32, width: Width) -> u32 {
        if width != Width::Byte && self.mmu.paging_enabled() && crosses_page(addr, width) {
            return (0..width.bytes()).rev().fold(0, |acc, i| {
                (acc << 8) | self.read_translated(addr.wrapping_add(i), Width::Byte)
            });
        }
        match self.translate(addr, AccessKind::Read) {
            Some(pa) => self.read_physical(pa, width, AccessKind::Read),
            None => width.mask(),
        }
    }

    fn write_translated(&mut self, addr: u32, value: u32, width: Width) {
        if width != Width::Byte && self.mmu.paging_enabled() && crosses_page(addr, width) {
            for i in 0..width.bytes() {
                self.write_translated(addr.wrapping_add(i), value >> (i * 8), Width::Byte);
            }
            return;
        }
        if let Some(pa) = self.translate(addr, AccessKind::Write) {
            match self.backend.as_mut() {
                Some(backend) => backend.write(pa as u32, value & width.mask(), width),
                None => self.memory.write(pa, value, width),
            }
        }
    }

    fn translate(&mut self, va: u32, kind: AccessKind) -> Option<u64> {
        let user = !self.regs.is_supervisor();
        match self.mmu.translate(&self.memory, va, kind, user) {
            Ok(pa) => Some(pa),
            Err(_) => {
                self.page_fault(va);
                None
            }
        }
    }

    fn page_fault(&mut self, va: u32) {
        self.raise(TrapKind::PageFault, va);
        if self.config.vector_page_faults {
            self.page_fault_pending = true;
        }
    }

    fn read_physical(&mut self, pa: u64, width: Width, kind: AccessKind) -> u32 {
        match self.backend.as_mut() {
            Some(backend) => backend.read(pa as u32, width, kind) & width.mask(),
            None => self.memory.read(pa, width),
        }
    }

    /// Reads a vector from physical memory: MMIO first, then backend or flat array.
    pub(crate) fn read_vector(&mut self, addr: u32, width: Width) -> u32 {
        if let Some(index) = self.mmio.find(addr) {
            return self.mmio.read(index, addr, width);
        }
        self.read_physical(u64::from(addr), width, AccessKind::Read)
    }

    fn fetch_byte_at(&mut self, va: u32) -> u8 {
        let Some(pa) = self.translate(va, AccessKind::Fetch) else {
            self.fetch_faulted = true;
            return 0;
        };
        match self.backend.as_mut() {
            Some(backend) => backend.read(pa as u32, Width::Byte, AccessKind::Fetch) as u8,
            None => self.memory.get(pa).unwrap_or(0),
        }
    }

    /// Fetches the byte at PC and advances PC.
    pub(crate) fn fetch8(&mut self) -> u8 {
        let pc = self.regs.pc;
        self.regs.pc = pc.wrapping_add(1);
        self.fetch_byte_at(pc)
    }

    /// Fetches `bytes` little-endian instruction bytes (1-4) and advances PC.
    pub(crate) fn fetch_bytes(&mut self, bytes: u32) -> u32 {
        (0..bytes).fold(0, |acc, i| acc | (u32::from(self.fetch8()) << (i * 8)))
    }

    pub(crate) fn fetch16(&mut self) -> u32 {
        self.fetch_bytes(2)
    }

    pub(crate) fn fetch24(&mut self) -> u32 {
        self.fetch_bytes(3)
    }

    pub(crate) fn fetch32(&mut self) -> u32 {
        self.fetch_bytes(4)
    }
}

#[cfg(test)]
mod tests {
    use crate::debug::Watchpoint;
    use crate::mmu::{MMUCR_PG, PTE_PRESENT, PTE_USER, PTE_WRITABLE};
    use crate::{AccessKind, CpuConfig, CpuState, MemoryBackend, TrapKind, Width, P_S};

    fn native_core() -> CpuState {
        let mut cpu = CpuState::new(CpuConfig {
            memory_size: 0x4_0000,
            ..CpuConfig::default()
        });
        cpu.reset();
        cpu.enter_native32();
        cpu
    }

    #[test]
    fn flat_reads_and_writes_are_little_endian() {
        let mut cpu = native_core();
        cpu.write(0x200, 0x1122_3344, Width::Long);
        assert_eq!(cpu.read(0x201, Width::Word), 0x2233);
        assert_eq!(cpu.read8(0x200), 0x44);
    }

    #[test]
    fn unmapped_page_reads_all_ones_and_records_fault() {
        let mut cpu = native_core();
        cpu.mmu.set_ptbr(0x1_0000);
        cpu.mmu.set_mmucr(MMUCR_PG);
        assert_eq!(cpu.read(0x0040_0000, Width::Word), 0xFFFF);
        assert_eq!(cpu.last_trap().kind, TrapKind::PageFault);
        assert_eq!(cpu.last_trap().addr, 0x0040_0000);
        assert!(!cpu.page_fault_pending);
    }

    #[test]
    fn page_crossing_word_composes_bytes_from_both_pages() {
        let mut cpu = native_core();
        let ptbr = 0x1_0000u32;
        let l2 = 0x1_1000u32;
        cpu.write32(ptbr, l2 | 1);
        // VA page 0 -> PA 0x2000, VA page 1 -> PA 0x5000.
        let flags = u32::try_from(PTE_PRESENT | PTE_WRITABLE | PTE_USER).expect("low bits");
        cpu.write32(l2, 0x2000 | flags);
        cpu.write32(l2 + 8, 0x5000 | flags);
        cpu.mmu.set_ptbr(u64::from(ptbr));
        cpu.mmu.set_mmucr(MMUCR_PG);

        cpu.write8(0x2FFF, 0xAB);
        cpu.write8(0x5000, 0xCD);
        assert_eq!(cpu.read(0x0FFF, Width::Word), 0xCDAB);
    }

    #[test]
    fn watchpoint_records_trap_but_completes_access() {
        let mut cpu = native_core();
        cpu.add_watchpoint(Watchpoint { addr: 0x300, size: 4, on_read: false, on_write: true })
            .expect("free slot");
        cpu.write(0x302, 0x55, Width::Byte);
        assert_eq!(cpu.read8(0x302), 0x55);
        assert_eq!(cpu.last_trap().kind, TrapKind::Watchpoint);
        assert_eq!(cpu.last_trap().addr, 0x302);
    }

    struct Echo;

    impl MemoryBackend for Echo {
        fn read(&mut self, addr: u32, _width: Width, kind: AccessKind) -> u32 {
            if kind == AccessKind::Fetch {
                0xEA
            } else {
                addr
            }
        }

        fn write(&mut self, _addr: u32, _value: u32, _width: Width) {}
    }

    #[test]
    fn backend_replaces_flat_array_for_data_and_fetch() {
        let mut cpu = native_core();
        cpu.set_memory_backend(Box::new(Echo));
        assert_eq!(cpu.read(0x1234, Width::Word), 0x1234);
        cpu.set_pc(0x10);
        assert_eq!(cpu.fetch8(), 0xEA);
        assert_eq!(cpu.pc(), 0x11);
    }

    #[test]
    fn user_mode_system_register_access_is_refused() {
        let mut cpu = native_core();
        cpu.set_flag(P_S, false);
        assert_eq!(cpu.read(crate::SystemRegister::TimerCnt.address(), Width::Long), 0);
        assert_eq!(cpu.last_trap().kind, TrapKind::Privilege);
    }
}
