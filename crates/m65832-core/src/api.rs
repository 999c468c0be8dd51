//! Host-facing core object: configuration, lifecycle, register access and
//! the registries a host wires peripherals and debuggers through.
//!
//! Execution entry points (`step`, the run loops) live in [`crate::execute`];
//! everything here is plain state plumbing.

use crate::addressing::Operand;
use crate::debug::{DebugHooks, DebugPoints, PauseHandle, TraceEvent, Watchpoint};
use crate::memory::{AccessKind, MemoryBackend, MmioTable, PhysicalMemory, DEFAULT_MEMORY_BYTES};
use crate::{
    HostError, Mmu, Registers, RunState, Timer, TrapKind, Width, P_D, P_E, P_I, P_M0, P_M1, P_S,
    P_X0, P_X1, VEC_RESET,
};

/// Stack pointer loaded on reset (top of page 1).
pub const RESET_STACK_POINTER: u32 = 0x01FF;
/// Stack pointer loaded by [`CpuState::enter_native32`].
pub const NATIVE_STACK_POINTER: u32 = 0xFFFF;

/// Construction-time options for a core instance.
#[derive(Debug, Clone, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Deserialize, serde::Serialize))]
pub struct CpuConfig {
    /// Size of the flat physical backing array in bytes.
    pub memory_size: usize,
    /// Emits [`TraceEvent`]s to installed hooks.
    pub tracing_enabled: bool,
    /// Cycle ceiling for `run_until_halt`; zero means unlimited.
    pub cycle_limit: u64,
    /// Delivers page faults through `VEC_PAGE_FAULT` instead of only recording them.
    pub vector_page_faults: bool,
}

impl Default for CpuConfig {
    fn default() -> Self {
        Self {
            memory_size: DEFAULT_MEMORY_BYTES,
            tracing_enabled: false,
            cycle_limit: 0,
            vector_page_faults: false,
        }
    }
}

/// Last raised condition and the address it refers to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
#[cfg_attr(feature = "serde", derive(serde::Deserialize, serde::Serialize))]
pub struct TrapRecord {
    /// Condition kind.
    pub kind: TrapKind,
    /// Faulting address, program counter or syscall code, depending on the kind.
    pub addr: u32,
}

/// Pending external interrupt inputs, polled once per step.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub(crate) struct InterruptLines {
    pub(crate) irq: bool,
    pub(crate) nmi: bool,
    pub(crate) abort: bool,
}

/// Load-linked reservation on a memory address or a register-window offset.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub(crate) struct Reservation {
    pub(crate) target: Option<Operand>,
}

impl Reservation {
    pub(crate) const fn reserve(&mut self, target: Operand) {
        self.target = Some(target);
    }

    /// Consumes the reservation, returning `true` when it was held on `target`.
    pub(crate) fn take(&mut self, target: Operand) -> bool {
        self.target.take() == Some(target)
    }

    /// Drops the reservation if a `width`-byte write at `target` covers the reserved byte.
    ///
    /// Memory and window reservations are disjoint: a window write never
    /// releases a memory reservation and vice versa.
    pub(crate) fn invalidate_overlap(&mut self, target: Operand, width: Width) {
        let covered = match (self.target, target) {
            (Some(Operand::Memory(held)), Operand::Memory(addr)) => {
                held.wrapping_sub(addr) < width.bytes()
            }
            (Some(Operand::Window(held)), Operand::Window(offset)) => {
                u32::from(held.wrapping_sub(offset)) < width.bytes()
            }
            _ => false,
        };
        if covered {
            self.target = None;
        }
    }
}

/// The complete mutable state of one M65832 core.
pub struct CpuState {
    pub(crate) regs: Registers,
    pub(crate) memory: PhysicalMemory,
    pub(crate) backend: Option<Box<dyn MemoryBackend>>,
    pub(crate) mmio: MmioTable,
    pub(crate) mmu: Mmu,
    pub(crate) timer: Timer,
    pub(crate) reservation: Reservation,
    pub(crate) lines: InterruptLines,
    pub(crate) trap: TrapRecord,
    pub(crate) run_state: RunState,
    pub(crate) points: DebugPoints,
    pub(crate) hooks: Option<Box<dyn DebugHooks>>,
    pub(crate) pause: PauseHandle,
    pub(crate) config: CpuConfig,
    pub(crate) cycles: u64,
    pub(crate) inst_count: u64,
    pub(crate) inst_pc: u32,
    pub(crate) page_fault_pending: bool,
    /// Set when a breakpoint callback stopped the core; the next step executes past it.
    pub(crate) breakpoint_hold: bool,
    /// Set when an instruction fetch failed translation.
    pub(crate) fetch_faulted: bool,
}

impl std::fmt::Debug for CpuState {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("CpuState")
            .field("regs", &self.regs)
            .field("run_state", &self.run_state)
            .field("trap", &self.trap)
            .field("cycles", &self.cycles)
            .field("inst_count", &self.inst_count)
            .finish_non_exhaustive()
    }
}

impl Default for CpuState {
    fn default() -> Self {
        Self::new(CpuConfig::default())
    }
}

impl CpuState {
    /// Creates a core with zeroed registers and memory.
    ///
    /// The core is not reset; call [`Self::reset`] once the reset vector is loaded.
    #[must_use]
    pub fn new(config: CpuConfig) -> Self {
        Self {
            regs: Registers::default(),
            memory: PhysicalMemory::new(config.memory_size),
            backend: None,
            mmio: MmioTable::default(),
            mmu: Mmu::default(),
            timer: Timer::default(),
            reservation: Reservation::default(),
            lines: InterruptLines::default(),
            trap: TrapRecord::default(),
            run_state: RunState::Running,
            points: DebugPoints::default(),
            hooks: None,
            pause: PauseHandle::default(),
            config,
            cycles: 0,
            inst_count: 0,
            inst_pc: 0,
            page_fault_pending: false,
            breakpoint_hold: false,
            fetch_faulted: false,
        }
    }

    /// Construction options.
    #[must_use]
    pub const fn config(&self) -> &CpuConfig {
        &self.config
    }

    /// Applies reset: emulation mode, supervisor, IRQs masked, `S = $01FF`, PC from `$FFFC`.
    ///
    /// Memory, MMIO registrations, debug points and the register window survive reset.
    pub fn reset(&mut self) {
        let window = self.regs.window;
        self.regs = Registers {
            window,
            ..Registers::default()
        };
        self.regs.p = P_E | P_S | P_I | P_D;
        self.regs.s = RESET_STACK_POINTER;
        self.mmu.reset();
        self.timer = Timer::default();
        self.reservation = Reservation::default();
        self.lines = InterruptLines::default();
        self.trap = TrapRecord::default();
        self.run_state = RunState::Running;
        self.page_fault_pending = false;
        self.breakpoint_hold = false;
        self.fetch_faulted = false;
        self.cycles = 0;
        self.inst_count = 0;
        self.regs.pc = self.read_vector(VEC_RESET, Width::Word);
        self.inst_pc = self.regs.pc;
    }

    /// Switches to native mode with 32-bit accumulator and index widths, `D` clear and `S = $FFFF`.
    pub const fn enter_native32(&mut self) {
        self.regs.set_flag(P_E | P_D, false);
        self.regs.p = (self.regs.p & !(P_M0 | P_M1 | P_X0 | P_X1)) | P_M1 | P_X1;
        self.regs.s = NATIVE_STACK_POINTER;
    }

    /// Architectural registers.
    #[must_use]
    pub const fn registers(&self) -> &Registers {
        &self.regs
    }

    /// Mutable architectural registers.
    pub const fn registers_mut(&mut self) -> &mut Registers {
        &mut self.regs
    }

    /// Program counter.
    #[must_use]
    pub const fn pc(&self) -> u32 {
        self.regs.pc
    }

    /// Sets the program counter.
    pub const fn set_pc(&mut self, pc: u32) {
        self.regs.pc = pc;
    }

    /// Returns `true` when every bit of `mask` is set in `P`.
    #[must_use]
    pub const fn flag(&self, mask: u16) -> bool {
        self.regs.flag(mask)
    }

    /// Sets or clears status bits.
    pub const fn set_flag(&mut self, mask: u16, on: bool) {
        self.regs.set_flag(mask, on);
    }

    /// Host-visible run state.
    #[must_use]
    pub const fn run_state(&self) -> RunState {
        self.run_state
    }

    /// Returns `true` while instructions are being executed.
    #[must_use]
    pub const fn is_running(&self) -> bool {
        self.run_state.is_executing()
    }

    /// Parks the core until [`Self::resume`] or reset.
    pub const fn stop(&mut self) {
        self.run_state = RunState::Paused;
    }

    /// Resumes a paused or stopped core.
    pub const fn resume(&mut self) {
        self.run_state = RunState::Running;
    }

    /// Handle through which another thread can request a pause.
    #[must_use]
    pub fn pause_handle(&self) -> PauseHandle {
        self.pause.clone()
    }

    /// Total cycles since reset.
    #[must_use]
    pub const fn cycles(&self) -> u64 {
        self.cycles
    }

    /// Instructions retired since reset.
    #[must_use]
    pub const fn instruction_count(&self) -> u64 {
        self.inst_count
    }

    /// Last raised condition.
    #[must_use]
    pub const fn last_trap(&self) -> TrapRecord {
        self.trap
    }

    /// Clears the trap record.
    pub fn clear_trap(&mut self) {
        self.trap = TrapRecord::default();
    }

    pub(crate) fn raise(&mut self, kind: TrapKind, addr: u32) {
        self.trap = TrapRecord { kind, addr };
    }

    /// Drives the maskable interrupt line; asserting it also wakes a core parked by `WAI`.
    pub fn irq(&mut self, active: bool) {
        self.lines.irq = active;
        if active {
            self.wake();
        }
    }

    /// Latches a non-maskable interrupt and wakes a core parked by `WAI`.
    pub fn nmi(&mut self) {
        self.lines.nmi = true;
        self.wake();
    }

    /// Latches an abort request.
    pub const fn abort(&mut self) {
        self.lines.abort = true;
    }

    pub(crate) fn wake(&mut self) {
        if self.run_state == RunState::Waiting {
            self.run_state = RunState::Running;
        }
    }

    /// MMU registers and TLB.
    #[must_use]
    pub const fn mmu(&self) -> &Mmu {
        &self.mmu
    }

    /// Timer registers.
    #[must_use]
    pub const fn timer(&self) -> &Timer {
        &self.timer
    }

    /// Translates `va` for a supervisor read without touching the TLB or fault registers.
    #[must_use]
    pub fn virt_to_phys(&self, va: u32) -> Option<u64> {
        self.mmu.probe(&self.memory, va, AccessKind::Read, false)
    }

    /// Size of the flat backing array.
    #[must_use]
    pub fn memory_size(&self) -> usize {
        self.memory.len()
    }

    /// Resizes the flat backing array; grown bytes are zero.
    pub fn set_memory_size(&mut self, size: usize) {
        self.memory.resize(size);
        self.config.memory_size = size;
    }

    /// Flat backing array.
    #[must_use]
    pub const fn memory(&self) -> &PhysicalMemory {
        &self.memory
    }

    /// Installs a custom physical backend for translated accesses and fetches.
    pub fn set_memory_backend(&mut self, backend: Box<dyn MemoryBackend>) {
        self.backend = Some(backend);
    }

    /// Removes the custom backend, returning to the flat array.
    pub fn clear_memory_backend(&mut self) -> Option<Box<dyn MemoryBackend>> {
        self.backend.take()
    }

    /// Raw physical byte read; out-of-range addresses read `0xFF`.
    #[must_use]
    pub fn read8(&self, addr: u32) -> u8 {
        self.memory.read8(u64::from(addr))
    }

    /// Raw physical 16-bit little-endian read.
    #[must_use]
    pub fn read16(&self, addr: u32) -> u16 {
        u16::from(self.read8(addr)) | (u16::from(self.read8(addr.wrapping_add(1))) << 8)
    }

    /// Raw physical 32-bit little-endian read.
    #[must_use]
    pub fn read32(&self, addr: u32) -> u32 {
        u32::from(self.read16(addr)) | (u32::from(self.read16(addr.wrapping_add(2))) << 16)
    }

    /// Raw physical byte write; out-of-range writes are dropped.
    pub fn write8(&mut self, addr: u32, value: u8) {
        self.memory.write8(u64::from(addr), value);
    }

    /// Raw physical 16-bit little-endian write.
    pub fn write16(&mut self, addr: u32, value: u16) {
        let [lo, hi] = value.to_le_bytes();
        self.write8(addr, lo);
        self.write8(addr.wrapping_add(1), hi);
    }

    /// Raw physical 32-bit little-endian write.
    pub fn write32(&mut self, addr: u32, value: u32) {
        for (offset, byte) in (0..).zip(value.to_le_bytes()) {
            self.write8(addr.wrapping_add(offset), byte);
        }
    }

    /// Copies `data` into physical memory; returns the bytes copied.
    pub fn write_block(&mut self, addr: u32, data: &[u8]) -> usize {
        self.memory.write_block(addr, data)
    }

    /// Copies physical memory into `out`; returns the bytes copied.
    pub fn read_block(&self, addr: u32, out: &mut [u8]) -> usize {
        self.memory.read_block(addr, out)
    }

    /// Debugger byte read of physical memory; out-of-range addresses read zero.
    #[must_use]
    pub fn peek(&self, addr: u32) -> u8 {
        self.memory.get(u64::from(addr)).unwrap_or(0)
    }

    /// Debugger byte write of physical memory.
    pub fn poke(&mut self, addr: u32, value: u8) {
        self.memory.write8(u64::from(addr), value);
    }

    /// MMIO region registry.
    #[must_use]
    pub const fn mmio(&self) -> &MmioTable {
        &self.mmio
    }

    /// Mutable MMIO region registry.
    pub const fn mmio_mut(&mut self) -> &mut MmioTable {
        &mut self.mmio
    }

    /// Installs debug hooks, replacing any previous set.
    pub fn set_debug_hooks(&mut self, hooks: Box<dyn DebugHooks>) {
        self.hooks = Some(hooks);
    }

    /// Removes and returns the installed debug hooks.
    pub fn take_debug_hooks(&mut self) -> Option<Box<dyn DebugHooks>> {
        self.hooks.take()
    }

    /// Enables or disables trace events.
    pub const fn set_tracing(&mut self, enabled: bool) {
        self.config.tracing_enabled = enabled;
    }

    pub(crate) fn emit(&mut self, event: TraceEvent) {
        if !self.config.tracing_enabled {
            return;
        }
        if let Some(hooks) = self.hooks.as_mut() {
            hooks.on_event(event);
        }
    }

    /// Breakpoint and watchpoint tables.
    #[must_use]
    pub const fn debug_points(&self) -> &DebugPoints {
        &self.points
    }

    /// Adds a program-counter breakpoint.
    ///
    /// # Errors
    ///
    /// Returns [`HostError::BreakpointTableFull`] when 64 breakpoints are set.
    pub fn add_breakpoint(&mut self, addr: u32) -> Result<(), HostError> {
        self.points.add_breakpoint(addr)
    }

    /// Removes a breakpoint.
    ///
    /// # Errors
    ///
    /// Returns [`HostError::UnknownDebugPoint`] when none is set at `addr`.
    pub fn remove_breakpoint(&mut self, addr: u32) -> Result<(), HostError> {
        self.points.remove_breakpoint(addr)
    }

    /// Removes every breakpoint.
    pub fn clear_breakpoints(&mut self) {
        self.points.clear_breakpoints();
    }

    /// Adds a data watchpoint.
    ///
    /// # Errors
    ///
    /// Returns [`HostError::WatchpointTableFull`] when 16 watchpoints are set.
    pub fn add_watchpoint(&mut self, watch: Watchpoint) -> Result<(), HostError> {
        self.points.add_watchpoint(watch)
    }

    /// Removes the watchpoint starting at `addr`.
    ///
    /// # Errors
    ///
    /// Returns [`HostError::UnknownDebugPoint`] when none starts at `addr`.
    pub fn remove_watchpoint(&mut self, addr: u32) -> Result<(), HostError> {
        self.points.remove_watchpoint(addr)
    }

    /// Removes every watchpoint.
    pub fn clear_watchpoints(&mut self) {
        self.points.clear_watchpoints();
    }
}
