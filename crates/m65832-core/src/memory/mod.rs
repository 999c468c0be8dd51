//! Memory subsystem: fixed address map, MMIO registry, physical backing and the
//! tiered access path the executor uses.

/// Tiered data access, instruction fetch and vector reads.
mod access;
/// Physical backing store and custom backend contract.
pub mod backend;
/// Fixed system-register window and vector addresses.
pub mod map;
/// MMIO region registry.
pub mod mmio;
/// System-register window read/write semantics.
mod sysreg;

pub use backend::{AccessKind, MemoryBackend, PhysicalMemory, DEFAULT_MEMORY_BYTES};
pub use map::{
    is_sysreg, syscall_vector, SystemRegister, SYSREG_BASE, SYSREG_SIZE, VEC_ABORT,
    VEC_ABORT_EMU, VEC_BRK, VEC_COP, VEC_ILLEGAL_OP, VEC_IRQ, VEC_IRQ_EMU, VEC_NMI, VEC_NMI_EMU,
    VEC_PAGE_FAULT, VEC_RESET, VEC_SYSCALL,
};
pub use mmio::{MmioError, MmioHandler, MmioRegion, MmioTable, MMIO_REGION_CAPACITY};
