//! Instruction dispatch and the run loops.
//!
//! A step runs in this order:
//! 1. Service the highest-priority pending interrupt, if any
//! 2. Idle one cycle while parked by `WAI`
//! 3. Check software breakpoints against PC
//! 4. Emit the instruction trace event
//! 5. Fetch one opcode and dispatch it through the primary table; an
//!    untranslatable opcode fetch executes nothing
//! 6. Deliver a latched page fault when vectored faults are enabled
//! 7. Tick the timer, feeding its interrupt into the IRQ line
//!
//! Every consumed cycle, including interrupt entry and `WAI` idling, counts
//! toward the cycle total and the timer.

#![allow(
    clippy::cast_possible_truncation,
    clippy::cast_possible_wrap,
    clippy::cast_sign_loss,
    clippy::missing_const_for_fn,
    clippy::unnecessary_wraps
)]

pub(crate) mod extended;
pub(crate) mod ops;
pub(crate) mod wide;

use tracing::debug;

use crate::debug::{TraceEvent, TRACE_BYTES};
use crate::encoding::{Opcode, PRIMARY_TABLE};
use crate::timing::{cycles_for, CycleCostKind};
use crate::{CpuState, RunState, TrapKind, Width, P_K};

impl CpuState {
    /// Executes one instruction, or services one interrupt, and returns the cycles consumed.
    ///
    /// Returns 0 without doing anything once the core is stopped or paused.
    pub fn step(&mut self) -> u32 {
        if !self.run_state.accepts_steps() {
            return 0;
        }
        if let Some(cycles) = self.service_interrupts() {
            self.account(cycles);
            return cycles;
        }
        if self.run_state == RunState::Waiting {
            let cycles = cycles_for(CycleCostKind::WaitIdle, 1);
            self.account(cycles);
            return cycles;
        }

        let pc = self.regs.pc;
        if self.breakpoint_hold {
            self.breakpoint_hold = false;
        } else if self.points.has_breakpoint(pc) {
            self.raise(TrapKind::Breakpoint, pc);
            let stop = self.hooks.as_mut().is_some_and(|hooks| !hooks.on_breakpoint(pc));
            if stop {
                debug!(pc, "breakpoint callback stopped execution");
                self.run_state = RunState::Paused;
                self.breakpoint_hold = true;
                return 0;
            }
        }

        if self.config.tracing_enabled && self.hooks.is_some() {
            let mut bytes = [0u8; TRACE_BYTES];
            for (offset, byte) in (0u32..).zip(bytes.iter_mut()) {
                *byte = self.peek(pc.wrapping_add(offset));
            }
            self.emit(TraceEvent::InstructionStart { pc, bytes });
        }

        self.inst_pc = pc;
        let cycles = self.execute_instruction() + self.deliver_page_fault();
        self.inst_count += 1;
        self.account(cycles);
        self.emit(TraceEvent::InstructionRetired { pc, cycles });
        cycles
    }

    /// Executes up to `count` instructions and returns how many ran.
    ///
    /// Stops early on any trap other than IRQ entry and the software
    /// interrupts (`BRK`, `COP`, `TRAP`), or once the core stops executing.
    pub fn run(&mut self, count: u64) -> u64 {
        let mut executed = 0;
        while executed < count && self.run_state.accepts_steps() {
            if self.poll_pause() {
                break;
            }
            self.clear_trap();
            self.step();
            executed += 1;
            let kind = self.trap.kind;
            if !matches!(kind, TrapKind::None | TrapKind::Irq) && !kind.is_software_interrupt() {
                debug!(trap = kind.name(), addr = self.trap.addr, "run stopped on trap");
                break;
            }
        }
        executed
    }

    /// Steps until `budget` cycles have elapsed or a fatal trap occurs.
    ///
    /// Returns the cycles actually consumed, which may overshoot the budget by
    /// the cost of the final instruction.
    pub fn run_cycles(&mut self, budget: u64) -> u64 {
        let start = self.cycles;
        self.clear_trap();
        while self.cycles - start < budget && self.run_state.accepts_steps() {
            if self.poll_pause() {
                break;
            }
            self.step();
            if self.trap.kind.is_fatal() {
                debug!(trap = self.trap.kind.name(), addr = self.trap.addr, "run_cycles stopped");
                break;
            }
        }
        self.cycles - start
    }

    /// Runs until `WAI`, `STP`, a pause, a fatal trap or the configured cycle limit.
    ///
    /// Returns the cycles consumed.
    pub fn run_until_halt(&mut self) -> u64 {
        let start = self.cycles;
        let limit = self.config.cycle_limit;
        self.clear_trap();
        while self.run_state == RunState::Running {
            if self.poll_pause() {
                break;
            }
            self.step();
            if self.trap.kind.is_fatal() || (limit != 0 && self.cycles >= limit) {
                break;
            }
        }
        self.cycles - start
    }

    fn poll_pause(&mut self) -> bool {
        if !self.pause.take() {
            return false;
        }
        debug!(pc = self.regs.pc, "pause requested");
        self.run_state = RunState::Paused;
        true
    }

    fn account(&mut self, cycles: u32) {
        self.cycles += u64::from(cycles);
        self.timer.tick(cycles);
        if self.timer.irq_asserted() {
            self.irq(true);
        }
    }

    fn execute_instruction(&mut self) -> u32 {
        self.fetch_faulted = false;
        let opcode = self.fetch8();
        if self.fetch_faulted {
            self.regs.pc = self.inst_pc;
            return 0;
        }
        self.dispatch(&PRIMARY_TABLE, opcode)
    }

    /// Runs `opcode` from `table`, falling back to the undefined-opcode rule.
    pub(crate) fn dispatch(&mut self, table: &[Option<Opcode>; 256], opcode: u8) -> u32 {
        match table[usize::from(opcode)] {
            Some(entry) => u32::from(entry.cycles) + (entry.exec)(self, entry.mode),
            None => self.undefined_opcode(opcode),
        }
    }

    /// Undefined encodings are 2-cycle no-ops with a 32-bit accumulator or `K`
    /// set, and vector through `VEC_ILLEGAL_OP` otherwise.
    pub(crate) fn undefined_opcode(&mut self, opcode: u8) -> u32 {
        if self.regs.width_m() == Width::Long || self.regs.flag(P_K) {
            cycles_for(CycleCostKind::CompatNop, 2)
        } else {
            self.illegal_instruction(opcode)
        }
    }
}

#[cfg(test)]
mod tests {
    use crate::debug::{DebugHooks, TraceEvent};
    use crate::{CpuState, RunState, TrapKind, P_I, P_K};

    fn emulation_at(program: &[u8]) -> CpuState {
        let mut cpu = CpuState::default();
        cpu.write16(0xFFFC, 0x0200);
        cpu.write_block(0x0200, program);
        cpu.reset();
        cpu
    }

    #[test]
    fn step_returns_table_cost_and_advances_counters() {
        let mut cpu = emulation_at(&[0xA9, 0x42, 0xEA]);
        assert_eq!(cpu.step(), 2);
        assert_eq!(cpu.registers().a() & 0xFF, 0x42);
        assert_eq!(cpu.step(), 2);
        assert_eq!(cpu.cycles(), 4);
        assert_eq!(cpu.instruction_count(), 2);
    }

    #[test]
    fn undefined_opcode_is_nop_under_compatibility_flag() {
        let mut cpu = emulation_at(&[0xFF, 0xFF]);
        cpu.write16(0xFFF8, 0x0900);
        cpu.set_flag(P_K, true);
        assert_eq!(cpu.step(), 2);
        assert_eq!(cpu.pc(), 0x0201);
        cpu.set_flag(P_K, false);
        assert_eq!(cpu.step(), 7);
        assert_eq!(cpu.last_trap().kind, TrapKind::IllegalOp);
        assert_eq!(cpu.last_trap().addr, 0x0201);
        assert_eq!(cpu.pc(), 0x0900);
    }

    #[test]
    fn wai_idles_one_cycle_until_interrupt() {
        let mut cpu = emulation_at(&[0xCB]);
        cpu.write16(0xFFFE, 0x0300);
        assert_eq!(cpu.step(), 3);
        assert_eq!(cpu.run_state(), RunState::Waiting);
        assert_eq!(cpu.step(), 1);
        cpu.set_flag(P_I, false);
        cpu.irq(true);
        assert_eq!(cpu.step(), 7);
        assert_eq!(cpu.pc(), 0x0300);
    }

    struct Refuse;

    impl DebugHooks for Refuse {
        fn on_breakpoint(&mut self, _pc: u32) -> bool {
            false
        }
    }

    #[test]
    fn refusing_breakpoint_pauses_then_resumes_past_it() {
        let mut cpu = emulation_at(&[0xEA, 0xEA]);
        cpu.add_breakpoint(0x0200).expect("slot");
        cpu.set_debug_hooks(Box::new(Refuse));
        assert_eq!(cpu.step(), 0);
        assert_eq!(cpu.run_state(), RunState::Paused);
        assert_eq!(cpu.last_trap().kind, TrapKind::Breakpoint);
        cpu.resume();
        assert_eq!(cpu.step(), 2);
        assert_eq!(cpu.pc(), 0x0201);
    }

    #[derive(Default)]
    struct Recorder(std::rc::Rc<std::cell::RefCell<Vec<TraceEvent>>>);

    impl DebugHooks for Recorder {
        fn on_event(&mut self, event: TraceEvent) {
            self.0.borrow_mut().push(event);
        }
    }

    #[test]
    fn tracing_reports_start_bytes_and_retired_cycles() {
        let mut cpu = emulation_at(&[0xA9, 0x01]);
        let recorder = Recorder::default();
        let events = recorder.0.clone();
        cpu.set_debug_hooks(Box::new(recorder));
        cpu.set_tracing(true);
        cpu.step();
        let events = events.borrow();
        assert_eq!(events.len(), 2);
        assert!(matches!(events[0], TraceEvent::InstructionStart { pc: 0x0200, bytes } if bytes[..2] == [0xA9, 0x01]));
        assert_eq!(events[1], TraceEvent::InstructionRetired { pc: 0x0200, cycles: 2 });
    }

    #[test]
    fn pause_handle_stops_run_loop_before_next_step() {
        let mut cpu = emulation_at(&[0x80, 0xFE]);
        let handle = cpu.pause_handle();
        handle.request();
        assert_eq!(cpu.run_cycles(100), 0);
        assert_eq!(cpu.run_state(), RunState::Paused);
        assert!(!handle.is_requested());
    }

    #[test]
    fn run_until_halt_honours_cycle_limit() {
        let mut cpu = emulation_at(&[0x80, 0xFE]);
        cpu.config.cycle_limit = 30;
        assert_eq!(cpu.run_until_halt(), 30);
        assert_eq!(cpu.run_state(), RunState::Running);
    }
}
