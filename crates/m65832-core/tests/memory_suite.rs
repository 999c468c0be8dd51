//! Memory suite: MMU translation and faults, TLB behaviour, MMIO regions,
//! custom backends and data watchpoints.

#![allow(clippy::pedantic, clippy::nursery, clippy::cast_possible_truncation)]

use std::cell::RefCell;
use std::rc::Rc;

use m65832_core::{
    AccessKind, CpuConfig, CpuState, HostError, MemoryBackend, MmioError, MmioHandler, Mmu,
    MmuFault, PhysicalMemory, SystemRegister, TrapKind, Watchpoint, Width, BREAKPOINT_CAPACITY,
    MMUCR_PG, VEC_PAGE_FAULT,
};
use m65832_core::mmu::{PTE_PRESENT, PTE_WRITABLE};
use proptest::prelude::*;
use rstest as _;
#[cfg(feature = "serde")]
use serde as _;
use thiserror as _;
use tracing as _;

const PTBR: u32 = 0x1_0000;
const L2_TABLE: u32 = 0x1_1000;
const SCRATCH: u32 = 0x3_0000;

fn native_core(config: CpuConfig, program: &[u8]) -> CpuState {
    let mut cpu = CpuState::new(config);
    cpu.reset();
    cpu.enter_native32();
    cpu.registers_mut().set_s(0x8000);
    cpu.write_block(0x1000, program);
    cpu.set_pc(0x1000);
    cpu
}

fn large_config() -> CpuConfig {
    CpuConfig {
        memory_size: 0x4_0000,
        ..CpuConfig::default()
    }
}

fn wide_access(opcode: u8, addr: u32) -> Vec<u8> {
    let mut bytes = vec![0x42, opcode];
    bytes.extend(addr.to_le_bytes());
    bytes
}

/// Writes a system register by running `LDA #value; WID STA reg` from scratch memory.
fn store_sysreg(cpu: &mut CpuState, reg: SystemRegister, value: u32) {
    let resume = cpu.pc();
    let mut code = vec![0xA9];
    code.extend(value.to_le_bytes());
    code.extend(wide_access(0x8D, reg.address()));
    cpu.write_block(SCRATCH, &code);
    cpu.set_pc(SCRATCH);
    cpu.step();
    cpu.step();
    cpu.set_pc(resume);
}

/// Identity-maps `pages` (all below 4 MiB) and turns paging on.
fn enable_identity_paging(cpu: &mut CpuState, pages: &[u32]) {
    cpu.write32(PTBR, L2_TABLE | PTE_PRESENT as u32);
    for &page in pages {
        let slot = L2_TABLE + (page >> 12) * 8;
        cpu.write32(slot, page | (PTE_PRESENT | PTE_WRITABLE) as u32);
    }
    store_sysreg(cpu, SystemRegister::PtbrLo, PTBR);
    store_sysreg(cpu, SystemRegister::Mmucr, MMUCR_PG);
}

proptest! {
    #[test]
    fn translation_is_identity_with_paging_disabled(va in any::<u32>()) {
        let cpu = CpuState::default();
        prop_assert_eq!(cpu.virt_to_phys(va), Some(u64::from(va)));
    }
}

#[test]
fn missing_level_one_entry_faults_without_touching_memory() {
    let mut program = vec![0xA9, 0xAA, 0, 0, 0];
    program.extend(wide_access(0x8D, 0x0050_0000));
    let mut cpu = native_core(large_config(), &program);
    enable_identity_paging(&mut cpu, &[0x1000]);
    let before = cpu.memory().as_slice().to_vec();

    cpu.run_cycles(100);

    assert_eq!(cpu.last_trap().kind, TrapKind::PageFault);
    assert_eq!(cpu.last_trap().addr, 0x0050_0000);
    assert_eq!(cpu.mmu().fault_type(), Some(MmuFault::L1NotPresent));
    assert_eq!(cpu.mmu().faultva(), 0x0050_0000);
    assert_eq!(cpu.memory().as_slice(), before.as_slice());
}

#[test]
fn second_access_to_a_page_hits_the_tlb() {
    let mut program = wide_access(0xAD, 0x2004);
    program.extend(wide_access(0xAD, 0x2008));
    let mut cpu = native_core(large_config(), &program);
    cpu.write32(0x2004, 0x1111);
    cpu.write32(0x2008, 0x2222);
    enable_identity_paging(&mut cpu, &[0x1000, 0x2000]);

    cpu.step();
    assert_eq!(cpu.registers().a(), 0x1111);
    let walks = cpu.mmu().walk_count();
    cpu.step();
    assert_eq!(cpu.registers().a(), 0x2222);
    assert_eq!(cpu.mmu().walk_count(), walks);
    assert_eq!(cpu.virt_to_phys(0x2008), Some(0x2008));
}

#[test]
fn seventeenth_page_evicts_the_first_round_robin() {
    let mut memory = PhysicalMemory::new(0x1_0000);
    memory.write(0x1000, 0x2000 | PTE_PRESENT as u32, Width::Long);
    for vpn in 0..17u32 {
        let frame = 0x8000 + vpn * 0x1000;
        memory.write(u64::from(0x2000 + vpn * 8), frame | PTE_PRESENT as u32, Width::Long);
    }
    let mut mmu = Mmu::default();
    mmu.set_ptbr(0x1000);
    mmu.set_mmucr(MMUCR_PG);

    for vpn in 0..17u32 {
        assert!(mmu.translate(&memory, vpn << 12, AccessKind::Read, false).is_ok());
    }
    assert_eq!(mmu.walk_count(), 17);

    assert_eq!(mmu.translate(&memory, 16 << 12, AccessKind::Read, false), Ok(0x1_8000));
    assert_eq!(mmu.walk_count(), 17);
    assert_eq!(mmu.translate(&memory, 0, AccessKind::Read, false), Ok(0x8000));
    assert_eq!(mmu.walk_count(), 18);
}

#[test]
fn translation_query_has_no_side_effects() {
    let mut cpu = native_core(large_config(), &[0xEA]);
    enable_identity_paging(&mut cpu, &[0x1000, 0x5000]);
    let walks = cpu.mmu().walk_count();
    let tlb = cpu.mmu().tlb().clone();
    assert_eq!(cpu.virt_to_phys(0x5123), Some(0x5123));
    assert_eq!(cpu.virt_to_phys(0x0090_0000), None);
    assert_eq!(cpu.mmu().walk_count(), walks);
    assert_eq!(cpu.mmu().tlb(), &tlb);
    assert_eq!(cpu.mmu().fault_type(), None);
}

#[test]
fn vectored_page_fault_enters_handler_with_faulting_pc() {
    let config = CpuConfig {
        vector_page_faults: true,
        ..large_config()
    };
    let mut cpu = native_core(config, &wide_access(0xAD, 0x0050_0000));
    cpu.write32(VEC_PAGE_FAULT, 0x2000);
    enable_identity_paging(&mut cpu, &[0x1000, 0x2000, 0x7000, 0x8000]);

    cpu.step();

    assert_eq!(cpu.pc(), 0x2000);
    assert_eq!(cpu.last_trap().kind, TrapKind::PageFault);
    assert_eq!(cpu.last_trap().addr, 0x0050_0000);
    assert_eq!(cpu.read32(0x7FFD), 0x1000);
}

#[derive(Default)]
struct Device {
    writes: Rc<RefCell<Vec<(u32, u32, Width)>>>,
}

impl MmioHandler for Device {
    fn read(&mut self, _addr: u32, offset: u32, _width: Width) -> Result<u32, MmioError> {
        Ok(0x1234_0000 | offset)
    }

    fn write(&mut self, _addr: u32, offset: u32, value: u32, width: Width) -> Result<(), MmioError> {
        self.writes.borrow_mut().push((offset, value, width));
        Ok(())
    }
}

#[test]
fn mmio_region_serves_reads_and_writes_ahead_of_memory() {
    let mut program = wide_access(0xAD, 0x00C0_0010);
    program.extend(wide_access(0x8D, 0x00C0_0020));
    let mut cpu = native_core(large_config(), &program);
    let device = Device::default();
    let writes = device.writes.clone();
    let index = cpu
        .mmio_mut()
        .register(0x00C0_0000, 0x100, Box::new(device), "device")
        .expect("free slot");
    assert_eq!(cpu.mmio().find(0x00C0_00FF), Some(index));

    cpu.step();
    assert_eq!(cpu.registers().a(), 0x1234_0010);
    cpu.step();
    assert_eq!(writes.borrow().as_slice(), &[(0x20, 0x1234_0010, Width::Long)]);

    cpu.mmio_mut().set_active(index, false).expect("registered");
    assert_eq!(cpu.mmio().find(0x00C0_0010), None);
    assert_eq!(cpu.mmio_mut().unregister_addr(0x00C0_0000), Ok(()));
    assert_eq!(cpu.mmio().count(), 0);
}

struct RecordingRam {
    bytes: Vec<u8>,
    kinds: Rc<RefCell<Vec<AccessKind>>>,
}

impl MemoryBackend for RecordingRam {
    fn read(&mut self, addr: u32, width: Width, kind: AccessKind) -> u32 {
        self.kinds.borrow_mut().push(kind);
        (0..width.bytes()).fold(0, |acc, i| {
            let byte = self.bytes.get((addr + i) as usize).copied().unwrap_or(0xFF);
            acc | (u32::from(byte) << (i * 8))
        })
    }

    fn write(&mut self, addr: u32, value: u32, width: Width) {
        for i in 0..width.bytes() {
            if let Some(byte) = self.bytes.get_mut((addr + i) as usize) {
                *byte = (value >> (i * 8)) as u8;
            }
        }
    }
}

#[test]
fn custom_backend_sees_fetches_and_data_accesses() {
    let mut bytes = vec![0; 0x1_0000];
    bytes[0x1000..0x1003].copy_from_slice(&[0xAD, 0x00, 0x20]);
    bytes[0x2000..0x2004].copy_from_slice(&0xCAFE_F00Du32.to_le_bytes());
    let kinds = Rc::new(RefCell::new(Vec::new()));
    let mut cpu = native_core(large_config(), &[]);
    cpu.set_memory_backend(Box::new(RecordingRam {
        bytes,
        kinds: kinds.clone(),
    }));

    cpu.step();

    assert_eq!(cpu.registers().a(), 0xCAFE_F00D);
    let kinds = kinds.borrow();
    assert_eq!(kinds.first(), Some(&AccessKind::Fetch));
    assert!(kinds.contains(&AccessKind::Read));
    assert!(cpu.clear_memory_backend().is_some());
}

#[test]
fn write_watchpoint_stops_the_run_after_the_store_completes() {
    // LDA #$77; STA $2000; NOP
    let mut cpu = native_core(large_config(), &[0xA9, 0x77, 0, 0, 0, 0x8D, 0x00, 0x20, 0xEA]);
    cpu.add_watchpoint(Watchpoint {
        addr: 0x2002,
        size: 1,
        on_read: false,
        on_write: true,
    })
    .expect("free slot");

    cpu.run_cycles(100);

    assert_eq!(cpu.last_trap().kind, TrapKind::Watchpoint);
    assert_eq!(cpu.last_trap().addr, 0x2000);
    assert_eq!(cpu.read32(0x2000), 0x77);
    assert_eq!(cpu.pc(), 0x1008);
    assert_eq!(cpu.remove_watchpoint(0x2002), Ok(()));
    assert_eq!(cpu.remove_watchpoint(0x2002), Err(HostError::UnknownDebugPoint(0x2002)));
}

#[test]
fn breakpoint_table_is_bounded() {
    let mut cpu = CpuState::default();
    for addr in 0..BREAKPOINT_CAPACITY as u32 {
        cpu.add_breakpoint(addr).expect("free slot");
    }
    assert_eq!(cpu.add_breakpoint(0xFFFF), Err(HostError::BreakpointTableFull));
    cpu.clear_breakpoints();
    assert!(cpu.debug_points().breakpoints().is_empty());
}
