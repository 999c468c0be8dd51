//! Instruction execution engine for the M65832 processor.
//!
//! The M65832 extends the 65816 lineage with a 32-bit accumulator width, a
//! direct-page register window, a two-level paging MMU, atomics and a
//! `$02`-prefixed extended instruction set. [`CpuState`] owns one core:
//! registers, physical memory, MMIO registry, MMU, timer and the host debug
//! surface. Drive it with [`CpuState::step`] or one of the run loops and
//! inspect [`CpuState::last_trap`] for the conditions each step raised.

/// Memory subsystem: address map, MMIO registry, physical backing and tiered access.
pub mod memory;
pub use memory::{
    syscall_vector, AccessKind, MemoryBackend, MmioError, MmioHandler, MmioRegion, MmioTable,
    PhysicalMemory, SystemRegister, DEFAULT_MEMORY_BYTES, MMIO_REGION_CAPACITY, SYSREG_BASE,
    SYSREG_SIZE, VEC_ABORT, VEC_ABORT_EMU, VEC_BRK, VEC_COP, VEC_ILLEGAL_OP, VEC_IRQ,
    VEC_IRQ_EMU, VEC_NMI, VEC_NMI_EMU, VEC_PAGE_FAULT, VEC_RESET, VEC_SYSCALL,
};

/// Architectural CPU state model primitives.
pub mod state;
pub use state::{
    Registers, RunState, Width, P_C, P_D, P_DEFINED_MASK, P_E, P_I, P_K, P_M0, P_M1, P_N, P_R,
    P_S, P_V, P_X0, P_X1, P_Z, REGISTER_WINDOW_BYTES, REGISTER_WINDOW_COUNT,
};

/// Trap taxonomy, MMU fault sub-codes and host-API errors.
pub mod fault;
pub use fault::{HostError, MmuFault, TrapKind};

/// Two-level paging MMU and TLB.
pub mod mmu;
pub use mmu::{Mmu, Tlb, TlbEntry, MMUCR_FTYPE_MASK, MMUCR_FTYPE_SHIFT, MMUCR_PG, MMUCR_WP};

/// Cycle-driven system timer.
pub mod timer;
pub use timer::{
    Timer, TIMER_AUTORESET, TIMER_ENABLE, TIMER_IRQ_CLEAR, TIMER_IRQ_ENABLE, TIMER_IRQ_PENDING,
};

/// Width-parameterized ALU primitives.
pub mod alu;

/// Addressing-mode tags and operand resolution.
pub mod addressing;
pub use addressing::{AddressingMode, Operand};

/// Opcode tables for the primary, `WID` and extended spaces.
pub mod encoding;
pub use encoding::{decode, Mnemonic, Opcode, OpcodeSpace};

/// Fixed cycle costs outside the opcode tables.
pub mod timing;
pub use timing::{cycle_cost, CycleCostKind, CYCLE_COST_TABLE};

/// Breakpoints, watchpoints, trace events and pause requests.
pub mod debug;
pub use debug::{
    DebugHooks, DebugPoints, PauseHandle, TraceEvent, Watchpoint, BREAKPOINT_CAPACITY,
    TRACE_BYTES, WATCHPOINT_CAPACITY,
};

/// Host-facing core object and configuration.
pub mod api;
pub use api::{CpuConfig, CpuState, TrapRecord, NATIVE_STACK_POINTER, RESET_STACK_POINTER};

/// Exception entry and exit, stack primitives and interrupt arbitration.
mod exception;

/// Instruction dispatch and run loops.
mod execute;

#[cfg(test)]
use proptest as _;
