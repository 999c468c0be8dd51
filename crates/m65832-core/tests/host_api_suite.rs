//! Host API suite: reset, interrupt lines, pause requests, trap naming and
//! physical memory access helpers.

#![allow(clippy::pedantic, clippy::nursery)]

use std::thread;

use m65832_core::{
    CpuConfig, CpuState, RunState, TrapKind, Width, P_E, P_I, P_S, RESET_STACK_POINTER,
    VEC_ABORT_EMU, VEC_IRQ_EMU, VEC_NMI_EMU,
};
use proptest as _;
use rstest::rstest;
#[cfg(feature = "serde")]
use serde as _;
use thiserror as _;
use tracing as _;

fn emulation_core(program: &[u8]) -> CpuState {
    let mut cpu = CpuState::default();
    cpu.write16(0xFFFC, 0x0200);
    cpu.write_block(0x0200, program);
    cpu.reset();
    cpu
}

#[test]
fn reset_loads_the_vector_and_architectural_defaults() {
    let mut cpu = emulation_core(&[0xEA, 0xEA]);
    cpu.step();
    cpu.registers_mut().set_a(0x55);
    cpu.reset();

    assert_eq!(cpu.pc(), 0x0200);
    assert_eq!(cpu.registers().s(), RESET_STACK_POINTER);
    assert_eq!(cpu.registers().a(), 0);
    assert!(cpu.flag(P_E | P_S | P_I));
    assert_eq!(cpu.registers().width_m(), Width::Byte);
    assert_eq!(cpu.run_state(), RunState::Running);
    assert_eq!(cpu.cycles(), 0);
    assert_eq!(cpu.instruction_count(), 0);
    assert_eq!(cpu.last_trap().kind, TrapKind::None);
}

#[test]
fn pending_interrupts_are_taken_abort_first() {
    let mut cpu = emulation_core(&[0xEA]);
    cpu.write16(VEC_ABORT_EMU, 0x0300);
    cpu.write16(VEC_NMI_EMU, 0x0400);
    cpu.write16(VEC_IRQ_EMU, 0x0500);
    cpu.set_flag(P_I, false);
    cpu.irq(true);
    cpu.nmi();
    cpu.abort();

    assert_eq!(cpu.step(), 7);
    assert_eq!(cpu.last_trap().kind, TrapKind::Abort);
    assert_eq!(cpu.pc(), 0x0300);

    cpu.step();
    assert_eq!(cpu.last_trap().kind, TrapKind::Nmi);
    assert_eq!(cpu.pc(), 0x0400);

    // IRQ stays pending behind the I flag set by the entries above
    cpu.write8(0x0400, 0xEA);
    cpu.step();
    assert_eq!(cpu.pc(), 0x0401);
}

#[test]
fn nmi_wakes_a_core_parked_by_wai() {
    let mut cpu = emulation_core(&[0xCB]);
    cpu.write16(VEC_NMI_EMU, 0x0300);
    cpu.step();
    assert_eq!(cpu.run_state(), RunState::Waiting);
    assert_eq!(cpu.step(), 1);

    cpu.nmi();
    assert_eq!(cpu.run_state(), RunState::Running);
    cpu.step();
    assert_eq!(cpu.pc(), 0x0300);
    assert_eq!(cpu.last_trap().kind, TrapKind::Nmi);
}

#[test]
fn pause_request_from_another_thread_stops_run_cycles() {
    let mut cpu = emulation_core(&[0x80, 0xFE]);
    let handle = cpu.pause_handle();
    thread::spawn(move || handle.request())
        .join()
        .expect("pause thread");

    assert_eq!(cpu.run_cycles(1_000), 0);
    assert_eq!(cpu.run_state(), RunState::Paused);
    assert!(!cpu.pause_handle().is_requested());

    cpu.resume();
    assert_eq!(cpu.run_cycles(9), 9);
    assert_eq!(cpu.pc(), 0x0200);
}

#[test]
fn stop_refuses_further_steps_until_resumed() {
    let mut cpu = emulation_core(&[0xEA, 0xEA]);
    cpu.stop();
    assert!(!cpu.is_running());
    assert_eq!(cpu.step(), 0);
    cpu.resume();
    assert_eq!(cpu.step(), 2);
    assert_eq!(cpu.pc(), 0x0201);
}

#[rstest]
#[case(TrapKind::None, "NONE", false)]
#[case(TrapKind::Brk, "BRK", false)]
#[case(TrapKind::Irq, "IRQ", false)]
#[case(TrapKind::PageFault, "PAGE_FAULT", true)]
#[case(TrapKind::Syscall, "SYSCALL", false)]
#[case(TrapKind::IllegalOp, "ILLEGAL_OP", true)]
#[case(TrapKind::Privilege, "PRIVILEGE", true)]
#[case(TrapKind::Watchpoint, "WATCHPOINT", true)]
fn trap_kinds_have_stable_names(#[case] kind: TrapKind, #[case] name: &str, #[case] fatal: bool) {
    assert_eq!(kind.name(), name);
    assert_eq!(kind.is_fatal(), fatal);
}

#[test]
fn physical_helpers_are_little_endian_and_bounded() {
    let mut cpu = CpuState::new(CpuConfig {
        memory_size: 0x1000,
        ..CpuConfig::default()
    });
    cpu.write32(0x10, 0x1122_3344);
    assert_eq!(cpu.read8(0x10), 0x44);
    assert_eq!(cpu.read16(0x12), 0x1122);
    assert_eq!(cpu.peek(0x5000), 0);
    cpu.poke(0x5000, 0xAA);
    assert_eq!(cpu.peek(0x5000), 0);

    assert_eq!(cpu.write_block(0xFFE, &[1, 2, 3, 4]), 2);
    let mut out = [0u8; 4];
    assert_eq!(cpu.read_block(0xFFE, &mut out), 2);
    assert_eq!(&out[..2], &[1, 2]);

    cpu.set_memory_size(0x2000);
    assert_eq!(cpu.memory_size(), 0x2000);
    assert_eq!(cpu.peek(0x10), 0x44);
    assert_eq!(cpu.peek(0x1FFF), 0);
}
