//! `$02`-prefixed extended opcodes: multiply/divide, atomics, base-register
//! setters, `TRAP`, 64-bit load/store and the direct-page ALU, shifter and
//! extend units.

use super::ops::{stack_pointer, to_accumulator, to_index};
use crate::addressing::AddressingMode;
use crate::alu::{self, ExtendOp, ShiftOp};
use crate::encoding::EXTENDED_TABLE;
use crate::memory::syscall_vector;
use crate::{CpuState, TrapKind, Width, P_R, P_S, P_Z};

/// Fetches the second opcode byte and runs it from the extended table.
pub(crate) fn prefix(cpu: &mut CpuState, _mode: AddressingMode) -> u32 {
    let opcode = cpu.fetch8();
    cpu.dispatch(&EXTENDED_TABLE, opcode)
}

fn operand32(cpu: &mut CpuState, mode: AddressingMode) -> u32 {
    let operand = cpu.resolve(mode, Width::Long);
    cpu.read_operand(operand, Width::Long)
}

fn multiply(cpu: &mut CpuState, mode: AddressingMode, signed: bool) -> u32 {
    let width = cpu.regs.width_m();
    let operand = cpu.resolve(mode, width);
    let rhs = cpu.read_operand(operand, width);
    let product = alu::multiply(cpu.regs.a, rhs, width, signed);
    cpu.regs.a = product.low;
    if let Some(high) = product.high {
        cpu.regs.t = high;
    }
    cpu.regs.update_nz(cpu.regs.a, width);
    0
}

/// Quotient to `A`, remainder to `T`; a zero divisor leaves both untouched.
fn divide(cpu: &mut CpuState, mode: AddressingMode, signed: bool) -> u32 {
    let width = cpu.regs.width_m();
    let operand = cpu.resolve(mode, width);
    let rhs = cpu.read_operand(operand, width);
    if let Some((quotient, remainder)) = alu::divide(cpu.regs.a, rhs, width, signed) {
        cpu.regs.a = quotient;
        cpu.regs.t = remainder;
    }
    cpu.regs.update_nz(cpu.regs.a, width);
    0
}

pub(crate) fn mul(cpu: &mut CpuState, mode: AddressingMode) -> u32 {
    multiply(cpu, mode, true)
}

pub(crate) fn mulu(cpu: &mut CpuState, mode: AddressingMode) -> u32 {
    multiply(cpu, mode, false)
}

pub(crate) fn div(cpu: &mut CpuState, mode: AddressingMode) -> u32 {
    divide(cpu, mode, true)
}

pub(crate) fn divu(cpu: &mut CpuState, mode: AddressingMode) -> u32 {
    divide(cpu, mode, false)
}

/// `CAS`: stores `A` when the operand equals `X`, otherwise loads it into `X`.
/// `Z` reports whether the swap happened. Direct-page operands honour the register window.
pub(crate) fn cas(cpu: &mut CpuState, mode: AddressingMode) -> u32 {
    let width = cpu.regs.width_m();
    let target = cpu.resolve(mode, width);
    let current = cpu.read_operand(target, width);
    let swapped = current == (cpu.regs.x & width.mask());
    if swapped {
        cpu.write_operand(target, cpu.regs.a, width);
    } else {
        cpu.regs.x = current;
    }
    cpu.regs.set_flag(P_Z, swapped);
    0
}

/// `LLI`: loads `A` and reserves the operand for a later `SCI`.
pub(crate) fn lli(cpu: &mut CpuState, mode: AddressingMode) -> u32 {
    let width = cpu.regs.width_m();
    let target = cpu.resolve(mode, width);
    cpu.regs.a = cpu.read_operand(target, width);
    cpu.reservation.reserve(target);
    cpu.regs.update_nz(cpu.regs.a, width);
    0
}

/// `SCI`: stores `A` only while the reservation still covers the operand.
/// The reservation is consumed either way.
pub(crate) fn sci(cpu: &mut CpuState, mode: AddressingMode) -> u32 {
    let width = cpu.regs.width_m();
    let target = cpu.resolve(mode, width);
    let held = cpu.reservation.take(target);
    if held {
        cpu.write_operand(target, cpu.regs.a, width);
    }
    cpu.regs.set_flag(P_Z, held);
    0
}

pub(crate) fn sd(cpu: &mut CpuState, mode: AddressingMode) -> u32 {
    cpu.regs.d = operand32(cpu, mode);
    0
}

pub(crate) fn sb(cpu: &mut CpuState, mode: AddressingMode) -> u32 {
    cpu.regs.b = operand32(cpu, mode);
    0
}

pub(crate) fn enr(cpu: &mut CpuState, _mode: AddressingMode) -> u32 {
    cpu.regs.set_flag(P_R, true);
    0
}

pub(crate) fn dsr(cpu: &mut CpuState, _mode: AddressingMode) -> u32 {
    cpu.regs.set_flag(P_R, false);
    0
}

/// `TRAP #code`: enters the syscall handler for `code`, returning past the operand.
pub(crate) fn trap(cpu: &mut CpuState, _mode: AddressingMode) -> u32 {
    let code = cpu.fetch8();
    cpu.exception_enter(TrapKind::Syscall, syscall_vector(code), cpu.regs.pc);
    cpu.raise(TrapKind::Syscall, u32::from(code));
    0
}

pub(crate) fn repe(cpu: &mut CpuState, _mode: AddressingMode) -> u32 {
    let mask = u16::from(cpu.fetch8()) << 8;
    cpu.regs.set_p(cpu.regs.p & !mask);
    0
}

/// `SEPE`: sets status high-byte bits; setting `S` requires supervisor mode.
pub(crate) fn sepe(cpu: &mut CpuState, _mode: AddressingMode) -> u32 {
    let mask = u16::from(cpu.fetch8()) << 8;
    if mask & P_S != 0 && !cpu.regs.is_supervisor() {
        cpu.privilege_violation(cpu.inst_pc);
        return 0;
    }
    cpu.regs.set_p(cpu.regs.p | mask);
    0
}

pub(crate) fn phd32(cpu: &mut CpuState, _mode: AddressingMode) -> u32 {
    cpu.push32(cpu.regs.d);
    0
}

pub(crate) fn pld32(cpu: &mut CpuState, _mode: AddressingMode) -> u32 {
    cpu.regs.d = cpu.pull32();
    0
}

pub(crate) fn phb32(cpu: &mut CpuState, _mode: AddressingMode) -> u32 {
    cpu.push32(cpu.regs.b);
    0
}

pub(crate) fn plb32(cpu: &mut CpuState, _mode: AddressingMode) -> u32 {
    cpu.regs.b = cpu.pull32();
    0
}

pub(crate) fn phvbr(cpu: &mut CpuState, _mode: AddressingMode) -> u32 {
    cpu.push32(cpu.regs.vbr);
    0
}

pub(crate) fn plvbr(cpu: &mut CpuState, _mode: AddressingMode) -> u32 {
    cpu.regs.vbr = cpu.pull32();
    0
}

pub(crate) fn tta(cpu: &mut CpuState, _mode: AddressingMode) -> u32 {
    let value = cpu.regs.t;
    to_accumulator(&mut cpu.regs, value);
    0
}

pub(crate) fn tat(cpu: &mut CpuState, _mode: AddressingMode) -> u32 {
    cpu.regs.t = cpu.regs.a;
    0
}

/// `LDQ`: 64-bit load, low word to `A` and high word to `T`.
pub(crate) fn ldq(cpu: &mut CpuState, mode: AddressingMode) -> u32 {
    let low = cpu.resolve(mode, Width::Long);
    cpu.regs.a = cpu.read_operand(low, Width::Long);
    cpu.regs.t = cpu.read_operand(low.offset(4), Width::Long);
    cpu.regs.update_nz(cpu.regs.a, Width::Long);
    0
}

pub(crate) fn stq(cpu: &mut CpuState, mode: AddressingMode) -> u32 {
    let low = cpu.resolve(mode, Width::Long);
    cpu.write_operand(low, cpu.regs.a, Width::Long);
    cpu.write_operand(low.offset(4), cpu.regs.t, Width::Long);
    0
}

pub(crate) fn tab(cpu: &mut CpuState, _mode: AddressingMode) -> u32 {
    cpu.regs.b = cpu.regs.a;
    0
}

pub(crate) fn tba(cpu: &mut CpuState, _mode: AddressingMode) -> u32 {
    let value = cpu.regs.b;
    to_accumulator(&mut cpu.regs, value);
    0
}

pub(crate) fn txb(cpu: &mut CpuState, _mode: AddressingMode) -> u32 {
    cpu.regs.b = cpu.regs.x;
    0
}

pub(crate) fn tbx(cpu: &mut CpuState, _mode: AddressingMode) -> u32 {
    let value = cpu.regs.b;
    cpu.regs.x = to_index(&mut cpu.regs, value);
    0
}

pub(crate) fn tyb(cpu: &mut CpuState, _mode: AddressingMode) -> u32 {
    cpu.regs.b = cpu.regs.y;
    0
}

pub(crate) fn tby(cpu: &mut CpuState, _mode: AddressingMode) -> u32 {
    let value = cpu.regs.b;
    cpu.regs.y = to_index(&mut cpu.regs, value);
    0
}

pub(crate) fn tspb(cpu: &mut CpuState, _mode: AddressingMode) -> u32 {
    cpu.regs.b = cpu.regs.s;
    0
}

pub(crate) fn tbsp(cpu: &mut CpuState, _mode: AddressingMode) -> u32 {
    cpu.regs.s = stack_pointer(&cpu.regs, cpu.regs.b);
    0
}

/// `LEA`: loads the computed address into `A` without touching memory.
///
/// Absolute forms add `B` like every other absolute operand, and direct-page
/// forms yield `D + dp` even with the register window enabled.
pub(crate) fn lea(cpu: &mut CpuState, mode: AddressingMode) -> u32 {
    cpu.regs.a = cpu.effective_address(mode);
    cpu.regs.update_nz(cpu.regs.a, Width::Long);
    0
}

/// Source addressing modes of the `$E8` register ALU, by low-nibble code.
const fn reg_alu_source(code: u8) -> Option<AddressingMode> {
    Some(match code {
        0x0 => AddressingMode::DirectIndexedIndirect,
        0x1 => AddressingMode::Direct,
        0x2 => AddressingMode::ImmediateM,
        0x3 => AddressingMode::Accumulator,
        0x4 => AddressingMode::DirectIndirectY,
        0x5 => AddressingMode::DirectX,
        0x6 => AddressingMode::Absolute,
        0x7 => AddressingMode::AbsoluteX,
        0x8 => AddressingMode::AbsoluteY,
        0x9 => AddressingMode::DirectIndirect,
        0xA => AddressingMode::DirectIndirectLong,
        0xB => AddressingMode::DirectIndirectLongY,
        0xC => AddressingMode::StackRelative,
        0xD => AddressingMode::StackRelativeIndirectY,
        _ => return None,
    })
}

/// `$E8 op|mode dest src...`: `dest op= src` on a direct-page location.
///
/// Ops are LD, ADC, SBC, AND, ORA, EOR and CMP; CMP only sets flags.
/// Unknown source modes read as zero and unknown ops do nothing.
pub(crate) fn reg_alu(cpu: &mut CpuState, _mode: AddressingMode) -> u32 {
    let width = cpu.regs.width_m();
    let op_mode = cpu.fetch8();
    let dest_offset = cpu.fetch8();
    let src = match reg_alu_source(op_mode & 0x0F) {
        Some(mode) => {
            let operand = cpu.resolve(mode, width);
            cpu.read_operand(operand, width)
        }
        None => 0,
    };
    let dest = cpu.direct(dest_offset);
    let current = cpu.read_operand(dest, width);
    let regs = &mut cpu.regs;
    let result = match op_mode >> 4 {
        0 => {
            regs.update_nz(src, width);
            src
        }
        1 => alu::adc(regs, current, src, width),
        2 => alu::sbc(regs, current, src, width),
        3 => alu::and(regs, current, src, width),
        4 => alu::ora(regs, current, src, width),
        5 => alu::eor(regs, current, src, width),
        6 => {
            alu::compare(regs, current, src, width);
            return 0;
        }
        _ => return 0,
    };
    cpu.write_operand(dest, result, width);
    0
}

/// Reads the `dest src` direct-page byte pair shared by `$E9` and `$EA`.
fn dest_and_source(cpu: &mut CpuState, width: Width) -> (u8, u32) {
    let dest = cpu.fetch8();
    let src_offset = cpu.fetch8();
    let src = cpu.direct(src_offset);
    (dest, cpu.read_operand(src, width))
}

/// `$E9 op|count dest src`: barrel shift. A count of 31 takes the count from `A`.
pub(crate) fn barrel_shift(cpu: &mut CpuState, _mode: AddressingMode) -> u32 {
    let width = cpu.regs.width_m();
    let op_count = cpu.fetch8();
    let (dest, value) = dest_and_source(cpu, width);
    let mut count = u32::from(op_count & 0x1F);
    if count == 0x1F {
        count = cpu.regs.a & 0x1F;
    }
    let result = if let Some(op) = ShiftOp::from_code(op_count >> 5) {
        alu::shift(&mut cpu.regs, op, value, count, width)
    } else {
        cpu.regs.update_nz(value, width);
        value
    };
    let dest = cpu.direct(dest);
    cpu.write_operand(dest, result, width);
    0
}

/// `$EA subop dest src`: sign/zero extend and bit counts.
pub(crate) fn extend(cpu: &mut CpuState, _mode: AddressingMode) -> u32 {
    let width = cpu.regs.width_m();
    let subop = cpu.fetch8();
    let (dest, value) = dest_and_source(cpu, width);
    let result = ExtendOp::from_code(subop).map_or(value, |op| alu::extend(op, value, width));
    let dest = cpu.direct(dest);
    cpu.write_operand(dest, result, width);
    cpu.regs.update_nz(result, width);
    0
}
