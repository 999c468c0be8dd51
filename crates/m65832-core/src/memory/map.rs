//! Fixed architectural addresses: the system-register window and the vector table.

/// Base address of the supervisor-only system-register window.
pub const SYSREG_BASE: u32 = 0xFFFF_F000;
/// Size in bytes of the system-register window.
pub const SYSREG_SIZE: u32 = 0x100;

/// Emulation-mode reset vector.
pub const VEC_RESET: u32 = 0xFFFC;
/// Emulation-mode IRQ/BRK vector.
pub const VEC_IRQ_EMU: u32 = 0xFFFE;
/// Emulation-mode NMI vector.
pub const VEC_NMI_EMU: u32 = 0xFFFA;
/// Emulation-mode ABORT vector.
pub const VEC_ABORT_EMU: u32 = 0xFFF8;
/// Native-mode COP vector.
pub const VEC_COP: u32 = 0xFFE4;
/// Native-mode BRK vector.
pub const VEC_BRK: u32 = 0xFFE6;
/// Native-mode ABORT vector.
pub const VEC_ABORT: u32 = 0xFFE8;
/// Native-mode NMI vector.
pub const VEC_NMI: u32 = 0xFFEA;
/// Native-mode IRQ vector.
pub const VEC_IRQ: u32 = 0xFFEE;
/// Native-mode page-fault vector.
pub const VEC_PAGE_FAULT: u32 = 0xFFD0;
/// Base of the `TRAP #imm` system-call vector block (`+ code * 4`).
pub const VEC_SYSCALL: u32 = 0xFFD4;
/// Illegal-opcode vector. Shares its slot with the emulation ABORT vector.
pub const VEC_ILLEGAL_OP: u32 = 0xFFF8;

/// Registers exposed through the system-register window.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[cfg_attr(feature = "serde", derive(serde::Deserialize, serde::Serialize))]
pub enum SystemRegister {
    /// MMU control: paging enable, write protect, fault type.
    Mmucr,
    /// Write-only: invalidate the TLB entry for a virtual address.
    TlbInval,
    /// Current address-space identifier.
    Asid,
    /// Write-only: invalidate TLB entries tagged with an ASID.
    AsidInval,
    /// Read-only: virtual address of the last MMU fault.
    FaultVa,
    /// Low 32 bits of the page-table base.
    PtbrLo,
    /// High 32 bits of the page-table base.
    PtbrHi,
    /// Write-only: flush the whole TLB.
    TlbFlush,
    /// Timer control and status.
    TimerCtrl,
    /// Timer compare value.
    TimerCmp,
    /// Timer counter.
    TimerCnt,
}

impl SystemRegister {
    /// Every system register in window order.
    pub const ALL: [Self; 11] = [
        Self::Mmucr,
        Self::TlbInval,
        Self::Asid,
        Self::AsidInval,
        Self::FaultVa,
        Self::PtbrLo,
        Self::PtbrHi,
        Self::TlbFlush,
        Self::TimerCtrl,
        Self::TimerCmp,
        Self::TimerCnt,
    ];

    /// Byte offset of the register within the window.
    #[must_use]
    pub const fn offset(self) -> u32 {
        match self {
            Self::Mmucr => 0x00,
            Self::TlbInval => 0x04,
            Self::Asid => 0x08,
            Self::AsidInval => 0x0C,
            Self::FaultVa => 0x10,
            Self::PtbrLo => 0x14,
            Self::PtbrHi => 0x18,
            Self::TlbFlush => 0x1C,
            Self::TimerCtrl => 0x40,
            Self::TimerCmp => 0x44,
            Self::TimerCnt => 0x48,
        }
    }

    /// Absolute address of the register.
    #[must_use]
    pub const fn address(self) -> u32 {
        SYSREG_BASE + self.offset()
    }

    /// Decodes the 32-bit register enclosing `addr`, if the window defines one there.
    #[must_use]
    pub const fn decode(addr: u32) -> Option<Self> {
        if !is_sysreg(addr) {
            return None;
        }
        match (addr - SYSREG_BASE) & !3 {
            0x00 => Some(Self::Mmucr),
            0x04 => Some(Self::TlbInval),
            0x08 => Some(Self::Asid),
            0x0C => Some(Self::AsidInval),
            0x10 => Some(Self::FaultVa),
            0x14 => Some(Self::PtbrLo),
            0x18 => Some(Self::PtbrHi),
            0x1C => Some(Self::TlbFlush),
            0x40 => Some(Self::TimerCtrl),
            0x44 => Some(Self::TimerCmp),
            0x48 => Some(Self::TimerCnt),
            _ => None,
        }
    }
}

/// Returns `true` when `addr` lies inside the system-register window.
#[must_use]
pub const fn is_sysreg(addr: u32) -> bool {
    addr >= SYSREG_BASE && addr - SYSREG_BASE < SYSREG_SIZE
}

/// Returns the `TRAP #code` vector address.
#[must_use]
#[allow(clippy::cast_lossless)]
pub const fn syscall_vector(code: u8) -> u32 {
    VEC_SYSCALL + code as u32 * 4
}

const NATIVE_VECTORS: [u32; 7] = [
    VEC_COP,
    VEC_BRK,
    VEC_ABORT,
    VEC_NMI,
    VEC_IRQ,
    VEC_PAGE_FAULT,
    VEC_SYSCALL,
];

const _: () = assert_fixed_layout();

const fn assert_fixed_layout() {
    let mut index = 0;
    while index < NATIVE_VECTORS.len() {
        let vector = NATIVE_VECTORS[index];
        assert!(
            vector >= 0xFF00 && vector <= 0xFFFF,
            "vectors must live in the top page of bank 0"
        );
        let mut other = index + 1;
        while other < NATIVE_VECTORS.len() {
            assert!(NATIVE_VECTORS[other] != vector, "native vectors must be distinct");
            other += 1;
        }
        index += 1;
    }

    let mut reg = 0;
    while reg < SystemRegister::ALL.len() {
        let offset = SystemRegister::ALL[reg].offset();
        assert!(offset % 4 == 0, "system registers are word aligned");
        assert!(offset < SYSREG_SIZE, "system registers fit the window");
        reg += 1;
    }
}
