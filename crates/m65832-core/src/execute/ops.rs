//! Primary opcode handlers.
//!
//! Each handler runs after its opcode byte has been fetched and returns the
//! cycles it adds on top of the table cost (taken branches only).

use crate::addressing::AddressingMode;
use crate::alu;
use crate::memory::{VEC_BRK, VEC_IRQ_EMU};
use crate::state::Registers;
use crate::timing::{cycles_for, CycleCostKind};
use crate::{CpuState, RunState, TrapKind, Width, P_C, P_D, P_E, P_I, P_N, P_V, P_Z};

type Binary = fn(&mut Registers, u32, u32, Width) -> u32;
type Unary = fn(&mut Registers, u32, Width) -> u32;

fn load(cpu: &mut CpuState, mode: AddressingMode, width: Width) -> u32 {
    let operand = cpu.resolve(mode, width);
    cpu.read_operand(operand, width)
}

fn store(cpu: &mut CpuState, mode: AddressingMode, value: u32, width: Width) -> u32 {
    let operand = cpu.resolve(mode, width);
    cpu.write_operand(operand, value, width);
    0
}

/// Accumulator-width binary op with the result merged back into `A`.
fn accumulate(cpu: &mut CpuState, mode: AddressingMode, op: Binary) -> u32 {
    let width = cpu.regs.width_m();
    let rhs = load(cpu, mode, width);
    let lhs = cpu.regs.a;
    let result = op(&mut cpu.regs, lhs, rhs, width);
    cpu.regs.a = alu::merge(lhs, result, width);
    0
}

/// Read-modify-write on memory, the register window or the accumulator.
fn modify(cpu: &mut CpuState, mode: AddressingMode, op: Unary) -> u32 {
    let width = cpu.regs.width_m();
    let operand = cpu.resolve(mode, width);
    let value = cpu.read_operand(operand, width);
    let result = op(&mut cpu.regs, value, width);
    cpu.write_operand(operand, result, width);
    0
}

fn compare_with(cpu: &mut CpuState, mode: AddressingMode, lhs: u32, width: Width) -> u32 {
    let rhs = load(cpu, mode, width);
    alu::compare(&mut cpu.regs, lhs, rhs, width);
    0
}

pub(crate) fn lda(cpu: &mut CpuState, mode: AddressingMode) -> u32 {
    let width = cpu.regs.width_m();
    let value = load(cpu, mode, width);
    cpu.regs.a = value;
    cpu.regs.update_nz(value, width);
    0
}

pub(crate) fn ldx(cpu: &mut CpuState, mode: AddressingMode) -> u32 {
    let width = cpu.regs.width_x();
    let value = load(cpu, mode, width);
    cpu.regs.x = value;
    cpu.regs.update_nz(value, width);
    0
}

pub(crate) fn ldy(cpu: &mut CpuState, mode: AddressingMode) -> u32 {
    let width = cpu.regs.width_x();
    let value = load(cpu, mode, width);
    cpu.regs.y = value;
    cpu.regs.update_nz(value, width);
    0
}

pub(crate) fn sta(cpu: &mut CpuState, mode: AddressingMode) -> u32 {
    let a = cpu.regs.a;
    store(cpu, mode, a, cpu.regs.width_m())
}

pub(crate) fn stx(cpu: &mut CpuState, mode: AddressingMode) -> u32 {
    let x = cpu.regs.x;
    store(cpu, mode, x, cpu.regs.width_x())
}

pub(crate) fn sty(cpu: &mut CpuState, mode: AddressingMode) -> u32 {
    let y = cpu.regs.y;
    store(cpu, mode, y, cpu.regs.width_x())
}

pub(crate) fn stz(cpu: &mut CpuState, mode: AddressingMode) -> u32 {
    store(cpu, mode, 0, cpu.regs.width_m())
}

pub(crate) fn adc(cpu: &mut CpuState, mode: AddressingMode) -> u32 {
    accumulate(cpu, mode, alu::adc)
}

pub(crate) fn sbc(cpu: &mut CpuState, mode: AddressingMode) -> u32 {
    accumulate(cpu, mode, alu::sbc)
}

pub(crate) fn and(cpu: &mut CpuState, mode: AddressingMode) -> u32 {
    accumulate(cpu, mode, alu::and)
}

pub(crate) fn ora(cpu: &mut CpuState, mode: AddressingMode) -> u32 {
    accumulate(cpu, mode, alu::ora)
}

pub(crate) fn eor(cpu: &mut CpuState, mode: AddressingMode) -> u32 {
    accumulate(cpu, mode, alu::eor)
}

pub(crate) fn cmp(cpu: &mut CpuState, mode: AddressingMode) -> u32 {
    let a = cpu.regs.a;
    compare_with(cpu, mode, a, cpu.regs.width_m())
}

pub(crate) fn cpx(cpu: &mut CpuState, mode: AddressingMode) -> u32 {
    let x = cpu.regs.x;
    compare_with(cpu, mode, x, cpu.regs.width_x())
}

pub(crate) fn cpy(cpu: &mut CpuState, mode: AddressingMode) -> u32 {
    let y = cpu.regs.y;
    compare_with(cpu, mode, y, cpu.regs.width_x())
}

pub(crate) fn bit(cpu: &mut CpuState, mode: AddressingMode) -> u32 {
    let width = cpu.regs.width_m();
    let value = load(cpu, mode, width);
    let a = cpu.regs.a;
    if mode == AddressingMode::ImmediateM {
        alu::bit_immediate(&mut cpu.regs, a, value, width);
    } else {
        alu::bit(&mut cpu.regs, a, value, width);
    }
    0
}

pub(crate) fn asl(cpu: &mut CpuState, mode: AddressingMode) -> u32 {
    modify(cpu, mode, alu::asl)
}

pub(crate) fn lsr(cpu: &mut CpuState, mode: AddressingMode) -> u32 {
    modify(cpu, mode, alu::lsr)
}

pub(crate) fn rol(cpu: &mut CpuState, mode: AddressingMode) -> u32 {
    modify(cpu, mode, alu::rol)
}

pub(crate) fn ror(cpu: &mut CpuState, mode: AddressingMode) -> u32 {
    modify(cpu, mode, alu::ror)
}

pub(crate) fn inc(cpu: &mut CpuState, mode: AddressingMode) -> u32 {
    modify(cpu, mode, alu::inc)
}

pub(crate) fn dec(cpu: &mut CpuState, mode: AddressingMode) -> u32 {
    modify(cpu, mode, alu::dec)
}

/// `TSB`/`TRB`: `Z` from `A & operand`, then set or clear the bits of `A` in the operand.
fn test_bits(cpu: &mut CpuState, mode: AddressingMode, set: bool) -> u32 {
    let width = cpu.regs.width_m();
    let operand = cpu.resolve(mode, width);
    let value = cpu.read_operand(operand, width);
    let a = cpu.regs.a & width.mask();
    cpu.regs.set_flag(P_Z, a & value == 0);
    let result = if set { value | a } else { value & !a };
    cpu.write_operand(operand, result, width);
    0
}

pub(crate) fn tsb(cpu: &mut CpuState, mode: AddressingMode) -> u32 {
    test_bits(cpu, mode, true)
}

pub(crate) fn trb(cpu: &mut CpuState, mode: AddressingMode) -> u32 {
    test_bits(cpu, mode, false)
}

fn step_index(regs: &mut Registers, value: u32, up: bool) -> u32 {
    let width = regs.width_x();
    let next = if up { value.wrapping_add(1) } else { value.wrapping_sub(1) };
    let result = next & width.mask();
    regs.update_nz(result, width);
    result
}

pub(crate) fn inx(cpu: &mut CpuState, _mode: AddressingMode) -> u32 {
    let value = cpu.regs.x;
    cpu.regs.x = step_index(&mut cpu.regs, value, true);
    0
}

pub(crate) fn iny(cpu: &mut CpuState, _mode: AddressingMode) -> u32 {
    let value = cpu.regs.y;
    cpu.regs.y = step_index(&mut cpu.regs, value, true);
    0
}

pub(crate) fn dex(cpu: &mut CpuState, _mode: AddressingMode) -> u32 {
    let value = cpu.regs.x;
    cpu.regs.x = step_index(&mut cpu.regs, value, false);
    0
}

pub(crate) fn dey(cpu: &mut CpuState, _mode: AddressingMode) -> u32 {
    let value = cpu.regs.y;
    cpu.regs.y = step_index(&mut cpu.regs, value, false);
    0
}

pub(crate) fn to_index(regs: &mut Registers, value: u32) -> u32 {
    let width = regs.width_x();
    let value = value & width.mask();
    regs.update_nz(value, width);
    value
}

pub(crate) fn to_accumulator(regs: &mut Registers, value: u32) {
    let width = regs.width_m();
    regs.a = value & width.mask();
    regs.update_nz(regs.a, width);
}

/// New stack pointer; emulation mode pins it to page 1.
pub(crate) const fn stack_pointer(regs: &Registers, value: u32) -> u32 {
    if regs.is_emulation() {
        0x100 | (value & 0xFF)
    } else {
        value
    }
}

pub(crate) fn tax(cpu: &mut CpuState, _mode: AddressingMode) -> u32 {
    let value = cpu.regs.a;
    cpu.regs.x = to_index(&mut cpu.regs, value);
    0
}

pub(crate) fn tay(cpu: &mut CpuState, _mode: AddressingMode) -> u32 {
    let value = cpu.regs.a;
    cpu.regs.y = to_index(&mut cpu.regs, value);
    0
}

pub(crate) fn tsx(cpu: &mut CpuState, _mode: AddressingMode) -> u32 {
    let value = cpu.regs.s;
    cpu.regs.x = to_index(&mut cpu.regs, value);
    0
}

pub(crate) fn txy(cpu: &mut CpuState, _mode: AddressingMode) -> u32 {
    let value = cpu.regs.x;
    cpu.regs.y = to_index(&mut cpu.regs, value);
    0
}

pub(crate) fn tyx(cpu: &mut CpuState, _mode: AddressingMode) -> u32 {
    let value = cpu.regs.y;
    cpu.regs.x = to_index(&mut cpu.regs, value);
    0
}

pub(crate) fn txa(cpu: &mut CpuState, _mode: AddressingMode) -> u32 {
    let value = cpu.regs.x;
    to_accumulator(&mut cpu.regs, value);
    0
}

pub(crate) fn tya(cpu: &mut CpuState, _mode: AddressingMode) -> u32 {
    let value = cpu.regs.y;
    to_accumulator(&mut cpu.regs, value);
    0
}

pub(crate) fn tdc(cpu: &mut CpuState, _mode: AddressingMode) -> u32 {
    let value = cpu.regs.d;
    to_accumulator(&mut cpu.regs, value);
    0
}

pub(crate) fn tsc(cpu: &mut CpuState, _mode: AddressingMode) -> u32 {
    let value = cpu.regs.s;
    to_accumulator(&mut cpu.regs, value);
    0
}

pub(crate) fn txs(cpu: &mut CpuState, _mode: AddressingMode) -> u32 {
    cpu.regs.s = stack_pointer(&cpu.regs, cpu.regs.x);
    0
}

pub(crate) fn tcs(cpu: &mut CpuState, _mode: AddressingMode) -> u32 {
    cpu.regs.s = stack_pointer(&cpu.regs, cpu.regs.a);
    0
}

pub(crate) fn tcd(cpu: &mut CpuState, _mode: AddressingMode) -> u32 {
    cpu.regs.d = cpu.regs.a;
    cpu.regs.update_nz(cpu.regs.d, Width::Word);
    0
}

pub(crate) fn pha(cpu: &mut CpuState, _mode: AddressingMode) -> u32 {
    cpu.push_width(cpu.regs.a, cpu.regs.width_m());
    0
}

pub(crate) fn phx(cpu: &mut CpuState, _mode: AddressingMode) -> u32 {
    cpu.push_width(cpu.regs.x, cpu.regs.width_x());
    0
}

pub(crate) fn phy(cpu: &mut CpuState, _mode: AddressingMode) -> u32 {
    cpu.push_width(cpu.regs.y, cpu.regs.width_x());
    0
}

pub(crate) fn pla(cpu: &mut CpuState, _mode: AddressingMode) -> u32 {
    let width = cpu.regs.width_m();
    cpu.regs.a = cpu.pull_width(width);
    cpu.regs.update_nz(cpu.regs.a, width);
    0
}

pub(crate) fn plx(cpu: &mut CpuState, _mode: AddressingMode) -> u32 {
    let width = cpu.regs.width_x();
    cpu.regs.x = cpu.pull_width(width);
    cpu.regs.update_nz(cpu.regs.x, width);
    0
}

pub(crate) fn ply(cpu: &mut CpuState, _mode: AddressingMode) -> u32 {
    let width = cpu.regs.width_x();
    cpu.regs.y = cpu.pull_width(width);
    cpu.regs.update_nz(cpu.regs.y, width);
    0
}

/// Pushes the low status byte only.
pub(crate) fn php(cpu: &mut CpuState, _mode: AddressingMode) -> u32 {
    cpu.push8(cpu.regs.p as u8);
    0
}

/// Replaces the low status byte; `E`, `S`, `R` and `K` survive.
pub(crate) fn plp(cpu: &mut CpuState, _mode: AddressingMode) -> u32 {
    let low = u16::from(cpu.pull8());
    cpu.regs.set_p((cpu.regs.p & 0xFF00) | low);
    0
}

pub(crate) fn phd(cpu: &mut CpuState, _mode: AddressingMode) -> u32 {
    cpu.push16(cpu.regs.d);
    0
}

pub(crate) fn pld(cpu: &mut CpuState, _mode: AddressingMode) -> u32 {
    cpu.regs.d = cpu.pull16();
    cpu.regs.update_nz(cpu.regs.d, Width::Word);
    0
}

pub(crate) fn phb(cpu: &mut CpuState, _mode: AddressingMode) -> u32 {
    cpu.push8((cpu.regs.b >> 16) as u8);
    0
}

pub(crate) fn phk(cpu: &mut CpuState, _mode: AddressingMode) -> u32 {
    cpu.push8((cpu.regs.pc >> 16) as u8);
    0
}

pub(crate) fn pea(cpu: &mut CpuState, _mode: AddressingMode) -> u32 {
    let value = cpu.fetch16();
    cpu.push16(value);
    0
}

pub(crate) fn pei(cpu: &mut CpuState, mode: AddressingMode) -> u32 {
    let value = load(cpu, mode, Width::Word);
    cpu.push16(value);
    0
}

pub(crate) fn per(cpu: &mut CpuState, _mode: AddressingMode) -> u32 {
    let target = cpu.branch_target16();
    cpu.push16(target);
    0
}

fn branch_if(cpu: &mut CpuState, taken: bool) -> u32 {
    let target = cpu.branch_target8();
    if !taken {
        return 0;
    }
    cpu.regs.pc = target;
    cycles_for(CycleCostKind::BranchTaken, 1)
}

pub(crate) fn bpl(cpu: &mut CpuState, _mode: AddressingMode) -> u32 {
    branch_if(cpu, !cpu.regs.flag(P_N))
}

pub(crate) fn bmi(cpu: &mut CpuState, _mode: AddressingMode) -> u32 {
    branch_if(cpu, cpu.regs.flag(P_N))
}

pub(crate) fn bvc(cpu: &mut CpuState, _mode: AddressingMode) -> u32 {
    branch_if(cpu, !cpu.regs.flag(P_V))
}

pub(crate) fn bvs(cpu: &mut CpuState, _mode: AddressingMode) -> u32 {
    branch_if(cpu, cpu.regs.flag(P_V))
}

pub(crate) fn bcc(cpu: &mut CpuState, _mode: AddressingMode) -> u32 {
    branch_if(cpu, !cpu.regs.flag(P_C))
}

pub(crate) fn bcs(cpu: &mut CpuState, _mode: AddressingMode) -> u32 {
    branch_if(cpu, cpu.regs.flag(P_C))
}

pub(crate) fn bne(cpu: &mut CpuState, _mode: AddressingMode) -> u32 {
    branch_if(cpu, !cpu.regs.flag(P_Z))
}

pub(crate) fn beq(cpu: &mut CpuState, _mode: AddressingMode) -> u32 {
    branch_if(cpu, cpu.regs.flag(P_Z))
}

pub(crate) fn bra(cpu: &mut CpuState, _mode: AddressingMode) -> u32 {
    cpu.regs.pc = cpu.branch_target8();
    0
}

pub(crate) fn brl(cpu: &mut CpuState, _mode: AddressingMode) -> u32 {
    cpu.regs.pc = cpu.branch_target16();
    0
}

/// 16-bit target read through `(abs)` or `(abs,X)`, relative to `B`.
fn indirect_target(cpu: &mut CpuState, mode: AddressingMode) -> u32 {
    let abs = cpu.fetch16();
    let mut pointer = cpu.regs.b.wrapping_add(abs);
    if mode == AddressingMode::AbsoluteIndexedIndirect {
        pointer = pointer.wrapping_add(cpu.index_x());
    }
    cpu.read(pointer, Width::Word)
}

const fn with_bank(pc: u32, target: u32) -> u32 {
    (pc & 0xFFFF_0000) | (target & 0xFFFF)
}

pub(crate) fn jmp(cpu: &mut CpuState, mode: AddressingMode) -> u32 {
    let target = match mode {
        AddressingMode::Long => cpu.fetch24(),
        AddressingMode::Absolute32 => cpu.fetch32(),
        AddressingMode::AbsoluteIndirect | AddressingMode::AbsoluteIndexedIndirect => {
            let target = indirect_target(cpu, mode);
            with_bank(cpu.regs.pc, target)
        }
        _ => {
            let abs = cpu.fetch16();
            with_bank(cpu.regs.pc, abs)
        }
    };
    cpu.regs.pc = target;
    0
}

/// `JML [abs]`: full 32-bit target.
pub(crate) fn jml(cpu: &mut CpuState, _mode: AddressingMode) -> u32 {
    let abs = cpu.fetch16();
    cpu.regs.pc = cpu.read(cpu.regs.b.wrapping_add(abs), Width::Long);
    0
}

/// `JSR`: pushes the 16-bit address of the last operand byte; the 32-bit
/// form pushes the full return address instead.
pub(crate) fn jsr(cpu: &mut CpuState, mode: AddressingMode) -> u32 {
    if mode == AddressingMode::Absolute32 {
        let target = cpu.fetch32();
        cpu.push32(cpu.regs.pc);
        cpu.regs.pc = target;
        return 0;
    }
    let target = if mode == AddressingMode::AbsoluteIndexedIndirect {
        indirect_target(cpu, mode)
    } else {
        cpu.fetch16()
    };
    cpu.push16(cpu.regs.pc.wrapping_sub(1));
    cpu.regs.pc = with_bank(cpu.regs.pc, target);
    0
}

pub(crate) fn jsl(cpu: &mut CpuState, _mode: AddressingMode) -> u32 {
    let target = cpu.fetch24();
    cpu.push8((cpu.regs.pc >> 16) as u8);
    cpu.push16(cpu.regs.pc.wrapping_sub(1));
    cpu.regs.pc = target;
    0
}

pub(crate) fn rts(cpu: &mut CpuState, _mode: AddressingMode) -> u32 {
    let low = cpu.pull16().wrapping_add(1);
    cpu.regs.pc = with_bank(cpu.regs.pc, low);
    0
}

pub(crate) fn rtl(cpu: &mut CpuState, _mode: AddressingMode) -> u32 {
    let low = cpu.pull16().wrapping_add(1) & 0xFFFF;
    let bank = u32::from(cpu.pull8());
    cpu.regs.pc = (bank << 16) | low;
    0
}

/// `BRK` returns to the byte after the opcode.
pub(crate) fn brk(cpu: &mut CpuState, _mode: AddressingMode) -> u32 {
    let vector = if cpu.regs.is_emulation() { VEC_IRQ_EMU } else { VEC_BRK };
    cpu.exception_enter(TrapKind::Brk, vector, cpu.regs.pc);
    cpu.regs.set_flag(P_D, false);
    cpu.raise(TrapKind::Brk, cpu.inst_pc);
    0
}

pub(crate) fn rti(cpu: &mut CpuState, _mode: AddressingMode) -> u32 {
    cpu.return_from_interrupt();
    0
}

fn set_flag(cpu: &mut CpuState, mask: u16, on: bool) -> u32 {
    cpu.regs.set_flag(mask, on);
    0
}

pub(crate) fn clc(cpu: &mut CpuState, _mode: AddressingMode) -> u32 {
    set_flag(cpu, P_C, false)
}

pub(crate) fn sec(cpu: &mut CpuState, _mode: AddressingMode) -> u32 {
    set_flag(cpu, P_C, true)
}

pub(crate) fn cli(cpu: &mut CpuState, _mode: AddressingMode) -> u32 {
    set_flag(cpu, P_I, false)
}

pub(crate) fn sei(cpu: &mut CpuState, _mode: AddressingMode) -> u32 {
    set_flag(cpu, P_I, true)
}

pub(crate) fn cld(cpu: &mut CpuState, _mode: AddressingMode) -> u32 {
    set_flag(cpu, P_D, false)
}

pub(crate) fn sed(cpu: &mut CpuState, _mode: AddressingMode) -> u32 {
    set_flag(cpu, P_D, true)
}

pub(crate) fn clv(cpu: &mut CpuState, _mode: AddressingMode) -> u32 {
    set_flag(cpu, P_V, false)
}

/// `REP #imm`: clears low status bits. Widths may change in either mode.
pub(crate) fn rep(cpu: &mut CpuState, _mode: AddressingMode) -> u32 {
    let mask = u16::from(cpu.fetch8());
    cpu.regs.set_p(cpu.regs.p & !mask);
    0
}

pub(crate) fn sep(cpu: &mut CpuState, _mode: AddressingMode) -> u32 {
    let mask = u16::from(cpu.fetch8());
    cpu.regs.set_p(cpu.regs.p | mask);
    0
}

/// `XCE`: swaps `C` and `E`. Entering emulation pins `S` to page 1 but
/// leaves the register widths alone.
pub(crate) fn xce(cpu: &mut CpuState, _mode: AddressingMode) -> u32 {
    let carry = cpu.regs.flag(P_C);
    let emulation = cpu.regs.flag(P_E);
    cpu.regs.set_flag(P_C, emulation);
    cpu.regs.set_flag(P_E, carry);
    if carry {
        cpu.regs.s = 0x100 | (cpu.regs.s & 0xFF);
    }
    0
}

pub(crate) fn nop(_cpu: &mut CpuState, _mode: AddressingMode) -> u32 {
    0
}

pub(crate) fn stp(cpu: &mut CpuState, _mode: AddressingMode) -> u32 {
    if cpu.regs.is_supervisor() {
        cpu.run_state = RunState::Stopped;
    } else {
        cpu.privilege_violation(cpu.inst_pc);
    }
    0
}

pub(crate) fn wai(cpu: &mut CpuState, _mode: AddressingMode) -> u32 {
    cpu.run_state = RunState::Waiting;
    0
}

pub(crate) fn xba(cpu: &mut CpuState, _mode: AddressingMode) -> u32 {
    let a = cpu.regs.a;
    cpu.regs.a = ((a & 0xFF) << 8) | ((a >> 8) & 0xFF);
    cpu.regs.update_nz(cpu.regs.a, Width::Byte);
    0
}

/// One byte of a block move; the instruction re-executes until `A` wraps to all ones.
fn block_move(cpu: &mut CpuState, mode: AddressingMode, ascending: bool) -> u32 {
    // bank operands are ignored in the flat model
    cpu.resolve(mode, Width::Word);
    let byte = cpu.read(cpu.regs.x, Width::Byte);
    cpu.write(cpu.regs.y, byte, Width::Byte);
    let index_mask = cpu.regs.width_x().mask();
    let delta = if ascending { 1 } else { u32::MAX };
    cpu.regs.x = cpu.regs.x.wrapping_add(delta) & index_mask;
    cpu.regs.y = cpu.regs.y.wrapping_add(delta) & index_mask;
    cpu.regs.a = cpu.regs.a.wrapping_sub(1);
    let count_mask = cpu.regs.width_m().mask();
    if cpu.regs.a & count_mask != count_mask {
        cpu.regs.pc = cpu.regs.pc.wrapping_sub(3);
    }
    0
}

pub(crate) fn mvn(cpu: &mut CpuState, mode: AddressingMode) -> u32 {
    block_move(cpu, mode, true)
}

pub(crate) fn mvp(cpu: &mut CpuState, mode: AddressingMode) -> u32 {
    block_move(cpu, mode, false)
}
