//! Architectural CPU state model primitives.

/// Architectural register file, status bits and operand widths.
pub mod registers;
/// Host-observable execution state machine.
pub mod run_state;

pub use registers::{
    Registers, Width, P_C, P_D, P_DEFINED_MASK, P_E, P_I, P_K, P_M0, P_M1, P_N, P_R, P_S, P_V,
    P_X0, P_X1, P_Z, REGISTER_WINDOW_BYTES, REGISTER_WINDOW_COUNT,
};
pub use run_state::RunState;
