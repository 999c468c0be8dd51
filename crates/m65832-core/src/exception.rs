//! Stack primitives and the exception entry/exit protocol.
//!
//! Entry always pushes a 32-bit return PC followed by the 16-bit status word,
//! whatever the mode; `RTI` always pulls the same six bytes. That symmetry is
//! what lets a single `RTI` move the core between emulation and native mode.

#![allow(clippy::cast_possible_truncation)]

use tracing::{debug, warn};

use crate::debug::TraceEvent;
use crate::memory::{
    VEC_ABORT, VEC_ABORT_EMU, VEC_ILLEGAL_OP, VEC_IRQ, VEC_IRQ_EMU, VEC_NMI, VEC_NMI_EMU,
    VEC_PAGE_FAULT,
};
use crate::timing::{cycles_for, CycleCostKind};
use crate::{CpuState, RunState, TrapKind, Width, P_I, P_S};

impl CpuState {
    /// Pushes one byte. Emulation mode keeps `S` inside page 1.
    pub(crate) fn push8(&mut self, value: u8) {
        let s = self.regs.s;
        if self.regs.is_emulation() {
            self.write(0x100 | (s & 0xFF), u32::from(value), Width::Byte);
            self.regs.s = 0x100 | (s.wrapping_sub(1) & 0xFF);
        } else {
            self.write(s, u32::from(value), Width::Byte);
            self.regs.s = s.wrapping_sub(1);
        }
    }

    /// Pulls one byte.
    pub(crate) fn pull8(&mut self) -> u8 {
        if self.regs.is_emulation() {
            self.regs.s = 0x100 | (self.regs.s.wrapping_add(1) & 0xFF);
        } else {
            self.regs.s = self.regs.s.wrapping_add(1);
        }
        self.read(self.regs.s, Width::Byte) as u8
    }

    pub(crate) fn push16(&mut self, value: u32) {
        self.push8((value >> 8) as u8);
        self.push8(value as u8);
    }

    pub(crate) fn pull16(&mut self) -> u32 {
        let lo = u32::from(self.pull8());
        lo | (u32::from(self.pull8()) << 8)
    }

    pub(crate) fn push32(&mut self, value: u32) {
        for shift in [24, 16, 8, 0] {
            self.push8((value >> shift) as u8);
        }
    }

    pub(crate) fn pull32(&mut self) -> u32 {
        (0..4).fold(0, |acc, i| acc | (u32::from(self.pull8()) << (i * 8)))
    }

    /// Pushes a value of the given operand width, high byte first.
    pub(crate) fn push_width(&mut self, value: u32, width: Width) {
        for i in (0..width.bytes()).rev() {
            self.push8((value >> (i * 8)) as u8);
        }
    }

    /// Pulls a value of the given operand width.
    pub(crate) fn pull_width(&mut self, width: Width) -> u32 {
        (0..width.bytes()).fold(0, |acc, i| acc | (u32::from(self.pull8()) << (i * 8)))
    }

    /// Pushes the return frame, masks IRQs, enters supervisor mode and loads the vector.
    pub(crate) fn exception_enter(&mut self, trap: TrapKind, vector: u32, return_pc: u32) {
        self.push32(return_pc);
        self.push8((self.regs.p >> 8) as u8);
        self.push8(self.regs.p as u8);
        self.regs.set_flag(P_I | P_S, true);
        self.regs.pc = if self.regs.is_emulation() {
            self.read_vector(vector & 0xFFFF, Width::Word)
        } else {
            self.read_vector(vector, Width::Long)
        };
        debug!(trap = trap.name(), vector, return_pc, target = self.regs.pc, "exception entry");
        self.emit(TraceEvent::ExceptionEntered {
            trap,
            vector,
            return_pc,
        });
    }

    /// `RTI`: pulls the status word, then the 32-bit return PC.
    pub(crate) fn return_from_interrupt(&mut self) {
        let lo = u16::from(self.pull8());
        let hi = u16::from(self.pull8());
        self.regs.set_p(lo | (hi << 8));
        self.regs.pc = self.pull32();
    }

    /// Takes the highest-priority pending interrupt: `ABORT`, then `NMI`, then unmasked `IRQ`.
    ///
    /// Returns the entry cost when one was taken.
    pub(crate) fn service_interrupts(&mut self) -> Option<u32> {
        let emulation = self.regs.is_emulation();
        let (trap, vector) = if self.lines.abort {
            self.lines.abort = false;
            (TrapKind::Abort, if emulation { VEC_ABORT_EMU } else { VEC_ABORT })
        } else if self.lines.nmi {
            self.lines.nmi = false;
            (TrapKind::Nmi, if emulation { VEC_NMI_EMU } else { VEC_NMI })
        } else if self.lines.irq && !self.regs.flag(P_I) {
            self.lines.irq = false;
            (TrapKind::Irq, if emulation { VEC_IRQ_EMU } else { VEC_IRQ })
        } else {
            return None;
        };
        if self.run_state == RunState::Waiting {
            self.run_state = RunState::Running;
        }
        let return_pc = self.regs.pc;
        self.exception_enter(trap, vector, return_pc);
        self.raise(trap, return_pc);
        Some(cycles_for(CycleCostKind::InterruptEntry, 7))
    }

    /// Records a privilege violation at `addr` and pauses the core.
    pub(crate) fn privilege_violation(&mut self, addr: u32) {
        warn!(pc = addr, "privilege violation in user mode");
        self.raise(TrapKind::Privilege, addr);
        self.run_state = RunState::Paused;
    }

    /// Vectors an undefined opcode through `VEC_ILLEGAL_OP`, returning past the opcode byte.
    pub(crate) fn illegal_instruction(&mut self, opcode: u8) -> u32 {
        let pc = self.inst_pc;
        warn!(pc, opcode, "illegal opcode");
        let return_pc = self.regs.pc;
        self.exception_enter(TrapKind::IllegalOp, VEC_ILLEGAL_OP, return_pc);
        self.raise(TrapKind::IllegalOp, pc);
        cycles_for(CycleCostKind::IllegalEntry, 7)
    }

    /// Enters the page-fault handler for a fault latched during the last instruction.
    ///
    /// The frame returns to the faulting instruction so the handler can retry it.
    pub(crate) fn deliver_page_fault(&mut self) -> u32 {
        if !self.page_fault_pending {
            return 0;
        }
        self.page_fault_pending = false;
        let fault = self.trap;
        let return_pc = self.inst_pc;
        self.exception_enter(TrapKind::PageFault, VEC_PAGE_FAULT, return_pc);
        // a fault on the frame push itself is not re-delivered
        self.page_fault_pending = false;
        self.trap = fault;
        cycles_for(CycleCostKind::PageFaultEntry, 7)
    }
}
