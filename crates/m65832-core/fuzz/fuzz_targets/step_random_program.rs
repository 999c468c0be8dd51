#![no_main]

use libfuzzer_sys::fuzz_target;
use m65832_core::{
    decode, CpuConfig, CpuState, OpcodeSpace, VEC_BRK, VEC_IRQ, VEC_PAGE_FAULT, VEC_SYSCALL,
};

const PROGRAM_BASE: u32 = 0x1000;

fuzz_target!(|data: &[u8]| {
    let Some((&mode, program)) = data.split_first() else {
        return;
    };
    for byte in program.iter().take(4) {
        let _ = decode(OpcodeSpace::Primary, *byte);
        let _ = decode(OpcodeSpace::Extended, *byte);
        let _ = decode(OpcodeSpace::Wide, *byte);
    }

    let mut cpu = CpuState::new(CpuConfig {
        memory_size: 0x2_0000,
        vector_page_faults: mode & 0x02 != 0,
        ..CpuConfig::default()
    });
    cpu.write16(0xFFFC, PROGRAM_BASE as u16);
    cpu.reset();
    if mode & 0x01 != 0 {
        cpu.enter_native32();
        cpu.registers_mut().set_s(0x8000);
        for vector in [VEC_BRK, VEC_IRQ, VEC_PAGE_FAULT, VEC_SYSCALL] {
            cpu.write16(vector, PROGRAM_BASE as u16);
        }
    }
    cpu.write_block(PROGRAM_BASE, program);
    cpu.set_pc(PROGRAM_BASE);
    if mode & 0x04 != 0 {
        cpu.irq(true);
    }

    let _ = cpu.run_cycles(4_096);
    let _ = cpu.virt_to_phys(cpu.pc());
    let _ = cpu.last_trap().kind.name();
});
