//! Execution suite: ALU properties, control flow, exception symmetry and run loops.

#![allow(
    clippy::pedantic,
    clippy::nursery,
    clippy::cast_possible_truncation,
    clippy::cast_sign_loss
)]

use m65832_core::{
    alu, CpuConfig, CpuState, Registers, RunState, SystemRegister, TrapKind, Width, P_C, P_I,
    P_K, P_M0, P_N, P_S, P_X0, P_Z, TIMER_AUTORESET, TIMER_ENABLE, TIMER_IRQ_ENABLE, VEC_BRK,
    VEC_IRQ, VEC_IRQ_EMU,
};
use proptest::prelude::*;
use rstest::rstest;
#[cfg(feature = "serde")]
use serde as _;
use thiserror as _;
use tracing as _;

fn native_core(program: &[u8]) -> CpuState {
    let mut cpu = CpuState::new(CpuConfig {
        memory_size: 0x4_0000,
        ..CpuConfig::default()
    });
    cpu.reset();
    cpu.enter_native32();
    cpu.registers_mut().set_s(0x8000);
    cpu.write_block(0x1000, program);
    cpu.set_pc(0x1000);
    cpu
}

fn emulation_core(program: &[u8]) -> CpuState {
    let mut cpu = CpuState::default();
    cpu.write16(0xFFFC, 0x0200);
    cpu.write_block(0x0200, program);
    cpu.reset();
    cpu
}

fn abs32(addr: u32) -> [u8; 4] {
    addr.to_le_bytes()
}

fn width_strategy() -> impl Strategy<Value = Width> {
    prop_oneof![Just(Width::Byte), Just(Width::Word), Just(Width::Long)]
}

proptest! {
    #[test]
    fn logic_results_are_masked_and_flag_the_masked_value(
        lhs in any::<u32>(),
        rhs in any::<u32>(),
        width in width_strategy(),
    ) {
        let mut regs = Registers::default();
        for op in [alu::and, alu::ora, alu::eor, alu::adc] {
            let result = op(&mut regs, lhs, rhs, width);
            prop_assert_eq!(result, result & width.mask());
            prop_assert_eq!(regs.flag(P_Z), result == 0);
            prop_assert_eq!(regs.flag(P_N), result & width.sign() != 0);
        }
    }

    #[test]
    fn binary_sbc_undoes_adc(
        a in prop_oneof![Just(0u32), Just(u32::MAX), Just(u32::MAX / 2), any::<u32>()],
        b in prop_oneof![Just(0u32), Just(u32::MAX), Just(u32::MAX / 2), any::<u32>()],
        width in width_strategy(),
    ) {
        let mut regs = Registers::default();
        regs.set_flag(P_C, false);
        let sum = alu::adc(&mut regs, a, b, width);
        regs.set_flag(P_C, true);
        let back = alu::sbc(&mut regs, sum, b, width);
        prop_assert_eq!(back, a & width.mask());
    }

    #[test]
    fn rotates_match_repeated_single_bit_rotates(
        value in any::<u32>(),
        count in 0u32..31,
        width in width_strategy(),
        carry in any::<bool>(),
    ) {
        let mut wide = Registers::default();
        wide.set_flag(P_C, carry);
        let rotated = alu::shift(&mut wide, alu::ShiftOp::Rol, value, count, width);

        let mut single = Registers::default();
        single.set_flag(P_C, carry);
        let mut stepped = value & width.mask();
        for _ in 0..count {
            stepped = alu::rol(&mut single, stepped, width);
        }
        prop_assert_eq!(rotated, stepped);
        prop_assert_eq!(wide.flag(P_C), single.flag(P_C));
    }
}

#[rstest]
#[case(0x10, 0x1012)]
#[case(0x00, 0x1002)]
#[case(0xFE, 0x1000)]
#[case(0x80, 0x0F82)]
fn relative_branch_lands_after_the_instruction(#[case] offset: u8, #[case] target: u32) {
    let mut cpu = native_core(&[0x80, offset]);
    cpu.step();
    assert_eq!(cpu.pc(), target);
}

#[rstest]
#[case(false, 3)]
#[case(true, 2)]
fn conditional_branch_charges_one_cycle_when_taken(#[case] zero: bool, #[case] cycles: u32) {
    let mut cpu = native_core(&[0xD0, 0x04]);
    cpu.set_flag(P_Z, zero);
    assert_eq!(cpu.step(), cycles);
    assert_eq!(cpu.pc(), if zero { 0x1002 } else { 0x1006 });
}

#[rstest]
#[case(7, 7, 9, true)]
#[case(7, 3, 7, false)]
fn cas_on_direct_page(#[case] memory: u32, #[case] x: u32, #[case] after: u32, #[case] z: bool) {
    let mut cpu = native_core(&[0x02, 0x10, 0x40]);
    cpu.write32(0x40, memory);
    cpu.registers_mut().set_x(x);
    cpu.registers_mut().set_a(9);
    cpu.step();
    assert_eq!(cpu.read32(0x40), after);
    assert_eq!(cpu.registers().x(), 7);
    assert_eq!(cpu.flag(P_Z), z);
}

#[test]
fn brk_then_rti_restores_pc_and_status_in_native_mode() {
    let mut cpu = native_core(&[0x00, 0xEA]);
    cpu.write32(VEC_BRK, 0x2000);
    cpu.write8(0x2000, 0x40);
    cpu.set_flag(P_C | P_I, false);
    let p_before = cpu.registers().p();
    let s_before = cpu.registers().s();

    assert_eq!(cpu.step(), 7);
    assert_eq!(cpu.pc(), 0x2000);
    assert_eq!(cpu.last_trap().kind, TrapKind::Brk);
    assert!(cpu.flag(P_I));
    cpu.step();
    assert_eq!(cpu.pc(), 0x1001);
    assert_eq!(cpu.registers().p(), p_before);
    assert_eq!(cpu.registers().s(), s_before);
}

#[test]
fn brk_then_rti_restores_pc_and_status_in_emulation_mode() {
    let mut cpu = emulation_core(&[0x00]);
    cpu.write16(VEC_IRQ_EMU, 0x0300);
    cpu.write8(0x0300, 0x40);
    let p_before = cpu.registers().p();
    let s_before = cpu.registers().s();

    cpu.step();
    assert_eq!(cpu.pc(), 0x0300);
    cpu.step();
    assert_eq!(cpu.pc(), 0x0201);
    assert_eq!(cpu.registers().p(), p_before);
    assert_eq!(cpu.registers().s(), s_before);
}

#[test]
fn rep_and_sep_move_the_accumulator_width_field() {
    // REP #$40; SEP #$40; SEP #$20
    let mut cpu = native_core(&[0xC2, 0x40, 0xE2, 0x40, 0xE2, 0x20]);
    cpu.registers_mut().set_p(P_S | P_M0 | P_X0);
    assert_eq!(cpu.registers().width_m(), Width::Word);
    assert_eq!(cpu.step(), 3);
    assert_eq!(cpu.registers().width_m(), Width::Byte);
    cpu.step();
    assert_eq!(cpu.registers().width_m(), Width::Word);
    cpu.step();
    assert_eq!(cpu.registers().width_m(), Width::Word);
    assert_eq!(cpu.registers().width_x(), Width::Long);
}

#[test]
fn undefined_opcode_traps_strictly_and_is_a_nop_in_compat_mode() {
    let mut strict = emulation_core(&[0xFF]);
    strict.write16(0xFFF8, 0x0400);
    assert_eq!(strict.step(), 7);
    assert_eq!(strict.last_trap().kind, TrapKind::IllegalOp);
    assert_eq!(strict.pc(), 0x0400);

    let mut compat = emulation_core(&[0xFF]);
    compat.set_flag(P_K, true);
    assert_eq!(compat.step(), 2);
    assert_eq!(compat.pc(), 0x0201);
    assert_eq!(compat.last_trap().kind, TrapKind::None);
}

#[test]
fn run_cycles_continues_through_software_interrupts() {
    let mut cpu = native_core(&[0x00, 0xDB]);
    cpu.write32(VEC_BRK, 0x2000);
    cpu.write8(0x2000, 0x40);
    cpu.run_cycles(1_000);
    assert_eq!(cpu.run_state(), RunState::Stopped);
    assert_eq!(cpu.pc(), 0x1002);
    assert_eq!(cpu.instruction_count(), 3);
}

#[test]
fn run_cycles_stops_on_illegal_opcode() {
    let mut cpu = emulation_core(&[0xEA, 0xFF, 0xEA]);
    cpu.write16(0xFFF8, 0x0400);
    cpu.write_block(0x0400, &[0x80, 0xFE]);
    let used = cpu.run_cycles(1_000);
    assert_eq!(used, 9);
    assert_eq!(cpu.last_trap().kind, TrapKind::IllegalOp);
    assert_eq!(cpu.last_trap().addr, 0x0201);
}

#[test]
fn user_mode_system_register_access_stops_the_run() {
    let mut program = vec![0x42, 0xAD];
    program.extend(abs32(SystemRegister::Mmucr.address()));
    program.push(0xEA);
    let mut cpu = native_core(&program);
    cpu.set_flag(P_S, false);
    cpu.run_cycles(100);
    assert_eq!(cpu.last_trap().kind, TrapKind::Privilege);
    assert_eq!(cpu.last_trap().addr, 0x1000);
    assert_eq!(cpu.run_state(), RunState::Paused);
    assert_eq!(cpu.pc(), 0x1006);
}

#[test]
fn run_counts_instructions_and_stops_on_stp() {
    let mut cpu = native_core(&[0xEA, 0xEA, 0xDB, 0xEA]);
    assert_eq!(cpu.run(2), 2);
    assert_eq!(cpu.pc(), 0x1002);
    assert_eq!(cpu.run(10), 1);
    assert_eq!(cpu.run_state(), RunState::Stopped);
    assert_eq!(cpu.step(), 0);
}

#[test]
fn timer_interrupt_wakes_a_waiting_core() {
    let mut program = vec![0xA9];
    program.extend(1_000u32.to_le_bytes());
    program.extend([0x42, 0x8D]);
    program.extend(abs32(SystemRegister::TimerCmp.address()));
    program.push(0xA9);
    program.extend(u32::from(TIMER_ENABLE | TIMER_AUTORESET | TIMER_IRQ_ENABLE).to_le_bytes());
    program.extend([0x42, 0x8D]);
    program.extend(abs32(SystemRegister::TimerCtrl.address()));
    program.extend([0x58, 0xCB]);
    let mut cpu = native_core(&program);
    cpu.write32(VEC_IRQ, 0x2000);
    cpu.write8(0x2000, 0xDB);

    cpu.run_until_halt();
    assert_eq!(cpu.run_state(), RunState::Waiting);
    assert_eq!(cpu.pc(), 0x1000 + program.len() as u32);

    cpu.run_cycles(2_000);
    assert_eq!(cpu.run_state(), RunState::Stopped);
    assert_eq!(cpu.pc(), 0x2001);
    assert_eq!(cpu.last_trap().kind, TrapKind::Irq);
    assert!(cpu.cycles() >= 1_000);
}
