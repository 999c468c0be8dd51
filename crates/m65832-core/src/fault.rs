use thiserror::Error;

/// Last-trap taxonomy recorded by the engine after every raised condition.
///
/// The record is a single slot, not a queue: each raise overwrites the
/// previous kind and address.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Error)]
#[cfg_attr(feature = "serde", derive(serde::Deserialize, serde::Serialize))]
#[repr(u8)]
pub enum TrapKind {
    /// No condition raised since the record was last cleared.
    #[default]
    #[error("no trap")]
    None = 0x00,
    /// `BRK` software interrupt.
    #[error("software break")]
    Brk = 0x01,
    /// Co-processor software interrupt.
    #[error("co-processor interrupt")]
    Cop = 0x02,
    /// Maskable external interrupt.
    #[error("maskable interrupt")]
    Irq = 0x03,
    /// Non-maskable external interrupt.
    #[error("non-maskable interrupt")]
    Nmi = 0x04,
    /// External abort input.
    #[error("abort")]
    Abort = 0x05,
    /// MMU translation failure; the sub-code lives in `MMUCR.FTYPE`.
    #[error("page fault")]
    PageFault = 0x06,
    /// `TRAP #imm` system call.
    #[error("system call")]
    Syscall = 0x07,
    /// Undefined opcode delivered through the illegal-op vector.
    #[error("illegal opcode")]
    IllegalOp = 0x08,
    /// Supervisor-only resource touched from user mode.
    #[error("privilege violation")]
    Privilege = 0x09,
    /// Software breakpoint matched the program counter.
    #[error("breakpoint")]
    Breakpoint = 0x0A,
    /// Watchpoint matched a data access.
    #[error("watchpoint")]
    Watchpoint = 0x0B,
    /// Misaligned access.
    #[error("alignment fault")]
    Alignment = 0x0C,
}

impl TrapKind {
    /// Converts the trap kind to its stable byte code.
    #[must_use]
    pub const fn as_u8(self) -> u8 {
        self as u8
    }

    /// Converts a stable byte code back into a trap kind.
    #[must_use]
    pub const fn from_u8(code: u8) -> Option<Self> {
        match code {
            0x00 => Some(Self::None),
            0x01 => Some(Self::Brk),
            0x02 => Some(Self::Cop),
            0x03 => Some(Self::Irq),
            0x04 => Some(Self::Nmi),
            0x05 => Some(Self::Abort),
            0x06 => Some(Self::PageFault),
            0x07 => Some(Self::Syscall),
            0x08 => Some(Self::IllegalOp),
            0x09 => Some(Self::Privilege),
            0x0A => Some(Self::Breakpoint),
            0x0B => Some(Self::Watchpoint),
            0x0C => Some(Self::Alignment),
            _ => None,
        }
    }

    /// Canonical upper-case label used by hosts and debuggers.
    #[must_use]
    pub const fn name(self) -> &'static str {
        match self {
            Self::None => "NONE",
            Self::Brk => "BRK",
            Self::Cop => "COP",
            Self::Irq => "IRQ",
            Self::Nmi => "NMI",
            Self::Abort => "ABORT",
            Self::PageFault => "PAGE_FAULT",
            Self::Syscall => "SYSCALL",
            Self::IllegalOp => "ILLEGAL_OP",
            Self::Privilege => "PRIVILEGE",
            Self::Breakpoint => "BREAKPOINT",
            Self::Watchpoint => "WATCHPOINT",
            Self::Alignment => "ALIGNMENT",
        }
    }

    /// Conditions that return control to the host from `run_cycles`.
    #[must_use]
    pub const fn is_fatal(self) -> bool {
        matches!(
            self,
            Self::PageFault
                | Self::IllegalOp
                | Self::Privilege
                | Self::Breakpoint
                | Self::Watchpoint
                | Self::Alignment
        )
    }

    /// Software interrupt mechanisms that continue through their handler.
    #[must_use]
    pub const fn is_software_interrupt(self) -> bool {
        matches!(self, Self::Brk | Self::Cop | Self::Syscall)
    }
}

/// MMU fault-type sub-code stored in the `MMUCR.FTYPE` field.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Error)]
#[cfg_attr(feature = "serde", derive(serde::Deserialize, serde::Serialize))]
#[repr(u8)]
pub enum MmuFault {
    /// Leaf page-table entry is not present.
    #[error("page not present")]
    NotPresent = 0,
    /// Write to a page without the writable permission.
    #[error("write to read-only page")]
    WriteProtect = 1,
    /// User-mode access to a supervisor page.
    #[error("user access to supervisor page")]
    UserSupervisor = 2,
    /// Instruction fetch from a no-execute page.
    #[error("fetch from no-execute page")]
    NoExecute = 3,
    /// First-level table entry is not present.
    #[error("level-1 entry not present")]
    L1NotPresent = 4,
    /// Second-level table is not present.
    #[error("level-2 entry not present")]
    L2NotPresent = 5,
}

impl MmuFault {
    /// Converts the fault to its 3-bit `FTYPE` code.
    #[must_use]
    pub const fn as_u8(self) -> u8 {
        self as u8
    }

    /// Decodes a 3-bit `FTYPE` code.
    #[must_use]
    pub const fn from_u8(code: u8) -> Option<Self> {
        match code {
            0 => Some(Self::NotPresent),
            1 => Some(Self::WriteProtect),
            2 => Some(Self::UserSupervisor),
            3 => Some(Self::NoExecute),
            4 => Some(Self::L1NotPresent),
            5 => Some(Self::L2NotPresent),
            _ => None,
        }
    }
}

/// Host-API failures for the fixed-capacity registries.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Error)]
pub enum HostError {
    /// All MMIO region slots are occupied.
    #[error("mmio region table is full")]
    MmioTableFull,
    /// MMIO regions must span at least one byte.
    #[error("mmio region size must be non-zero")]
    EmptyMmioRegion,
    /// No active MMIO region matches the index or base address.
    #[error("no mmio region registered at {0:#010x}")]
    UnknownMmioRegion(u32),
    /// All breakpoint slots are occupied.
    #[error("breakpoint table is full")]
    BreakpointTableFull,
    /// All watchpoint slots are occupied.
    #[error("watchpoint table is full")]
    WatchpointTableFull,
    /// No breakpoint or watchpoint exists at the address.
    #[error("no debug point registered at {0:#010x}")]
    UnknownDebugPoint(u32),
}
