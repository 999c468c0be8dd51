//! `$42` (`WID`) prefix: 32-bit operands regardless of the current widths.

use crate::addressing::AddressingMode;
use crate::encoding::WIDE_TABLE;
use crate::{CpuState, Width};

pub(crate) fn prefix(cpu: &mut CpuState, _mode: AddressingMode) -> u32 {
    let opcode = cpu.fetch8();
    cpu.dispatch(&WIDE_TABLE, opcode)
}

fn load_imm32(cpu: &mut CpuState) -> u32 {
    let value = cpu.fetch32();
    cpu.regs.update_nz(value, Width::Long);
    value
}

pub(crate) fn lda_imm32(cpu: &mut CpuState, _mode: AddressingMode) -> u32 {
    cpu.regs.a = load_imm32(cpu);
    0
}

pub(crate) fn ldx_imm32(cpu: &mut CpuState, _mode: AddressingMode) -> u32 {
    cpu.regs.x = load_imm32(cpu);
    0
}

pub(crate) fn ldy_imm32(cpu: &mut CpuState, _mode: AddressingMode) -> u32 {
    cpu.regs.y = load_imm32(cpu);
    0
}
