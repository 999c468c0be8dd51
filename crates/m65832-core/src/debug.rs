//! Host debugging surface: breakpoints, watchpoints, trace events and pause requests.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use crate::{HostError, TrapKind, Width};

/// Maximum number of program-counter breakpoints.
pub const BREAKPOINT_CAPACITY: usize = 64;
/// Maximum number of data watchpoints.
pub const WATCHPOINT_CAPACITY: usize = 16;
/// Instruction bytes carried by [`TraceEvent::InstructionStart`].
pub const TRACE_BYTES: usize = 8;

/// Trace events emitted while tracing is enabled and hooks are installed.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[cfg_attr(feature = "serde", derive(serde::Deserialize, serde::Serialize))]
pub enum TraceEvent {
    /// Instruction dispatch is about to start.
    InstructionStart {
        /// Program counter of the opcode byte.
        pc: u32,
        /// Raw bytes at `pc`, read from physical memory without side effects.
        bytes: [u8; TRACE_BYTES],
    },
    /// Instruction completed.
    InstructionRetired {
        /// Program counter of the opcode byte.
        pc: u32,
        /// Cycles charged for the instruction.
        cycles: u32,
    },
    /// Exception entry pushed a frame and loaded a vector.
    ExceptionEntered {
        /// Condition that caused the entry.
        trap: TrapKind,
        /// Vector address read.
        vector: u32,
        /// Program counter pushed on the stack.
        return_pc: u32,
    },
}

/// Host callbacks for breakpoints and trace events.
pub trait DebugHooks {
    /// Called when execution reaches a breakpoint; return `false` to pause the core.
    fn on_breakpoint(&mut self, _pc: u32) -> bool {
        true
    }

    /// Receives trace events.
    fn on_event(&mut self, _event: TraceEvent) {}
}

/// Data watchpoint over `size` bytes starting at `addr`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[cfg_attr(feature = "serde", derive(serde::Deserialize, serde::Serialize))]
pub struct Watchpoint {
    /// First watched virtual address.
    pub addr: u32,
    /// Watched byte count.
    pub size: u32,
    /// Fire on reads.
    pub on_read: bool,
    /// Fire on writes.
    pub on_write: bool,
}

impl Watchpoint {
    /// Returns `true` when an access of `width` bytes at `addr` overlaps the watched range.
    #[must_use]
    pub fn overlaps(&self, addr: u32, width: Width) -> bool {
        let start = u64::from(addr);
        let end = start + u64::from(width.bytes());
        let watch_start = u64::from(self.addr);
        let watch_end = watch_start + u64::from(self.size.max(1));
        start < watch_end && watch_start < end
    }
}

/// Fixed-capacity breakpoint and watchpoint tables.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct DebugPoints {
    breakpoints: Vec<u32>,
    watchpoints: Vec<Watchpoint>,
}

impl DebugPoints {
    /// Adds a breakpoint; adding an existing address is a no-op.
    ///
    /// # Errors
    ///
    /// Returns [`HostError::BreakpointTableFull`] at capacity.
    pub fn add_breakpoint(&mut self, addr: u32) -> Result<(), HostError> {
        if self.breakpoints.contains(&addr) {
            return Ok(());
        }
        if self.breakpoints.len() >= BREAKPOINT_CAPACITY {
            return Err(HostError::BreakpointTableFull);
        }
        self.breakpoints.push(addr);
        Ok(())
    }

    /// Removes a breakpoint.
    ///
    /// # Errors
    ///
    /// Returns [`HostError::UnknownDebugPoint`] when no breakpoint is set at `addr`.
    pub fn remove_breakpoint(&mut self, addr: u32) -> Result<(), HostError> {
        let index = self
            .breakpoints
            .iter()
            .position(|bp| *bp == addr)
            .ok_or(HostError::UnknownDebugPoint(addr))?;
        self.breakpoints.swap_remove(index);
        Ok(())
    }

    /// Removes every breakpoint.
    pub fn clear_breakpoints(&mut self) {
        self.breakpoints.clear();
    }

    /// Returns `true` when a breakpoint is set at `addr`.
    #[must_use]
    pub fn has_breakpoint(&self, addr: u32) -> bool {
        self.breakpoints.contains(&addr)
    }

    /// Active breakpoints in no particular order.
    #[must_use]
    pub fn breakpoints(&self) -> &[u32] {
        &self.breakpoints
    }

    /// Adds or replaces the watchpoint at `watch.addr`.
    ///
    /// # Errors
    ///
    /// Returns [`HostError::WatchpointTableFull`] at capacity.
    pub fn add_watchpoint(&mut self, watch: Watchpoint) -> Result<(), HostError> {
        if let Some(existing) = self.watchpoints.iter_mut().find(|w| w.addr == watch.addr) {
            *existing = watch;
            return Ok(());
        }
        if self.watchpoints.len() >= WATCHPOINT_CAPACITY {
            return Err(HostError::WatchpointTableFull);
        }
        self.watchpoints.push(watch);
        Ok(())
    }

    /// Removes the watchpoint starting at `addr`.
    ///
    /// # Errors
    ///
    /// Returns [`HostError::UnknownDebugPoint`] when none starts there.
    pub fn remove_watchpoint(&mut self, addr: u32) -> Result<(), HostError> {
        let index = self
            .watchpoints
            .iter()
            .position(|w| w.addr == addr)
            .ok_or(HostError::UnknownDebugPoint(addr))?;
        self.watchpoints.swap_remove(index);
        Ok(())
    }

    /// Removes every watchpoint.
    pub fn clear_watchpoints(&mut self) {
        self.watchpoints.clear();
    }

    /// Active watchpoints.
    #[must_use]
    pub fn watchpoints(&self) -> &[Watchpoint] {
        &self.watchpoints
    }

    /// Returns `true` when a data access hits a watchpoint.
    #[must_use]
    pub fn watch_hit(&self, addr: u32, width: Width, write: bool) -> bool {
        self.watchpoints.iter().any(|w| {
            (if write { w.on_write } else { w.on_read }) && w.overlaps(addr, width)
        })
    }
}

/// Cloneable, thread-safe pause request observed by the run loops between instructions.
#[derive(Debug, Clone, Default)]
pub struct PauseHandle {
    requested: Arc<AtomicBool>,
}

impl PauseHandle {
    /// Requests that the core pause before its next instruction.
    pub fn request(&self) {
        self.requested.store(true, Ordering::Release);
    }

    /// Withdraws a pending request.
    pub fn clear(&self) {
        self.requested.store(false, Ordering::Release);
    }

    /// Returns `true` while a request is pending.
    #[must_use]
    pub fn is_requested(&self) -> bool {
        self.requested.load(Ordering::Acquire)
    }

    /// Consumes a pending request.
    pub(crate) fn take(&self) -> bool {
        self.requested.swap(false, Ordering::AcqRel)
    }
}
