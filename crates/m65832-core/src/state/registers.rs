#![allow(clippy::cast_possible_truncation, clippy::cast_lossless)]

/// Number of 32-bit registers in the register window.
pub const REGISTER_WINDOW_COUNT: usize = 64;
/// Size in bytes of the direct-page view onto the register window.
pub const REGISTER_WINDOW_BYTES: u32 = 256;

/// `P` bit for carry/borrow.
pub const P_C: u16 = 1 << 0;
/// `P` bit for zero result.
pub const P_Z: u16 = 1 << 1;
/// `P` bit for IRQ disable.
pub const P_I: u16 = 1 << 2;
/// `P` bit for decimal (BCD) arithmetic.
pub const P_D: u16 = 1 << 3;
/// Low bit of the index-width field.
pub const P_X0: u16 = 1 << 4;
/// High bit of the index-width field.
pub const P_X1: u16 = 1 << 5;
/// Low bit of the accumulator-width field.
pub const P_M0: u16 = 1 << 6;
/// High bit of the accumulator-width field.
pub const P_M1: u16 = 1 << 7;
/// `P` bit for signed overflow.
pub const P_V: u16 = 1 << 8;
/// `P` bit for negative result.
pub const P_N: u16 = 1 << 9;
/// `P` bit for emulation mode.
pub const P_E: u16 = 1 << 10;
/// `P` bit for supervisor mode.
pub const P_S: u16 = 1 << 11;
/// `P` bit enabling the register window for direct-page accesses.
pub const P_R: u16 = 1 << 12;
/// `P` bit enabling the undefined-opcode compatibility shim.
pub const P_K: u16 = 1 << 13;
/// Mask of the 14 architecturally defined `P` bits.
pub const P_DEFINED_MASK: u16 = 0x3FFF;

/// Operand width selected at runtime by a two-bit `P` field.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[cfg_attr(feature = "serde", derive(serde::Deserialize, serde::Serialize))]
pub enum Width {
    /// 8-bit operand (`00`).
    Byte,
    /// 16-bit operand (`01`).
    Word,
    /// 32-bit operand (`10` and `11`).
    Long,
}

impl Width {
    /// Decodes a two-bit width field; `10` and `11` both select 32 bits.
    #[must_use]
    pub const fn from_field(bits: u16) -> Self {
        match bits & 0x3 {
            0 => Self::Byte,
            1 => Self::Word,
            _ => Self::Long,
        }
    }

    /// Decodes a byte count (1, 2 or 4); anything wider clamps to 32 bits.
    #[must_use]
    pub const fn from_bytes(bytes: u32) -> Self {
        match bytes {
            0 | 1 => Self::Byte,
            2 => Self::Word,
            _ => Self::Long,
        }
    }

    /// Operand size in bytes.
    #[must_use]
    pub const fn bytes(self) -> u32 {
        match self {
            Self::Byte => 1,
            Self::Word => 2,
            Self::Long => 4,
        }
    }

    /// Operand size in bits.
    #[must_use]
    pub const fn bits(self) -> u32 {
        self.bytes() * 8
    }

    /// Full-scale mask `(1 << bits) - 1`.
    #[must_use]
    pub const fn mask(self) -> u32 {
        match self {
            Self::Byte => 0xFF,
            Self::Word => 0xFFFF,
            Self::Long => 0xFFFF_FFFF,
        }
    }

    /// Sign bit `1 << (bits - 1)`.
    #[must_use]
    pub const fn sign(self) -> u32 {
        1 << (self.bits() - 1)
    }
}

/// Architectural register file of the M65832 core.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Registers {
    pub(crate) a: u32,
    pub(crate) x: u32,
    pub(crate) y: u32,
    pub(crate) s: u32,
    pub(crate) pc: u32,
    pub(crate) d: u32,
    pub(crate) b: u32,
    pub(crate) vbr: u32,
    pub(crate) t: u32,
    pub(crate) p: u16,
    pub(crate) window: [u32; REGISTER_WINDOW_COUNT],
}

impl Default for Registers {
    fn default() -> Self {
        Self {
            a: 0,
            x: 0,
            y: 0,
            s: 0,
            pc: 0,
            d: 0,
            b: 0,
            vbr: 0,
            t: 0,
            p: 0,
            window: [0; REGISTER_WINDOW_COUNT],
        }
    }
}

impl Registers {
    /// Reads the accumulator (full 32-bit storage).
    #[must_use]
    pub const fn a(&self) -> u32 {
        self.a
    }

    /// Writes the accumulator.
    pub const fn set_a(&mut self, value: u32) {
        self.a = value;
    }

    /// Reads index register `X`.
    #[must_use]
    pub const fn x(&self) -> u32 {
        self.x
    }

    /// Writes index register `X`.
    pub const fn set_x(&mut self, value: u32) {
        self.x = value;
    }

    /// Reads index register `Y`.
    #[must_use]
    pub const fn y(&self) -> u32 {
        self.y
    }

    /// Writes index register `Y`.
    pub const fn set_y(&mut self, value: u32) {
        self.y = value;
    }

    /// Reads the stack pointer.
    #[must_use]
    pub const fn s(&self) -> u32 {
        self.s
    }

    /// Writes the stack pointer.
    pub const fn set_s(&mut self, value: u32) {
        self.s = value;
    }

    /// Reads the program counter.
    #[must_use]
    pub const fn pc(&self) -> u32 {
        self.pc
    }

    /// Writes the program counter.
    pub const fn set_pc(&mut self, value: u32) {
        self.pc = value;
    }

    /// Reads the direct-page base.
    #[must_use]
    pub const fn d(&self) -> u32 {
        self.d
    }

    /// Writes the direct-page base.
    pub const fn set_d(&mut self, value: u32) {
        self.d = value;
    }

    /// Reads the absolute base.
    #[must_use]
    pub const fn b(&self) -> u32 {
        self.b
    }

    /// Writes the absolute base.
    pub const fn set_b(&mut self, value: u32) {
        self.b = value;
    }

    /// Reads the supervisor virtual base.
    #[must_use]
    pub const fn vbr(&self) -> u32 {
        self.vbr
    }

    /// Writes the supervisor virtual base.
    pub const fn set_vbr(&mut self, value: u32) {
        self.vbr = value;
    }

    /// Reads the multiply-high / divide-remainder scratch register.
    #[must_use]
    pub const fn t(&self) -> u32 {
        self.t
    }

    /// Writes the `T` scratch register.
    pub const fn set_t(&mut self, value: u32) {
        self.t = value;
    }

    /// Reads the status word.
    #[must_use]
    pub const fn p(&self) -> u16 {
        self.p
    }

    /// Writes the status word; bits above the defined 14 are discarded.
    pub const fn set_p(&mut self, value: u16) {
        self.p = value & P_DEFINED_MASK;
    }

    /// Returns `true` when every bit of `mask` is set in `P`.
    #[must_use]
    pub const fn flag(&self, mask: u16) -> bool {
        self.p & mask == mask
    }

    /// Sets or clears the `P` bits in `mask`.
    pub const fn set_flag(&mut self, mask: u16, on: bool) {
        if on {
            self.p |= mask;
        } else {
            self.p &= !mask;
        }
    }

    /// Accumulator width from `P.M1:M0`.
    #[must_use]
    pub const fn width_m(&self) -> Width {
        Width::from_field(self.p >> 6)
    }

    /// Index width from `P.X1:X0`.
    #[must_use]
    pub const fn width_x(&self) -> Width {
        Width::from_field(self.p >> 4)
    }

    /// Returns `true` in emulation mode.
    #[must_use]
    pub const fn is_emulation(&self) -> bool {
        self.flag(P_E)
    }

    /// Returns `true` in supervisor mode.
    #[must_use]
    pub const fn is_supervisor(&self) -> bool {
        self.flag(P_S)
    }

    /// Recomputes `Z` and `N` from `value` at the operation's width.
    pub const fn update_nz(&mut self, value: u32, width: Width) {
        let masked = value & width.mask();
        self.set_flag(P_Z, masked == 0);
        self.set_flag(P_N, masked & width.sign() != 0);
    }

    /// Reads window register `R{index}`.
    #[must_use]
    pub const fn window(&self, index: usize) -> u32 {
        self.window[index % REGISTER_WINDOW_COUNT]
    }

    /// Writes window register `R{index}`.
    pub const fn set_window(&mut self, index: usize, value: u32) {
        self.window[index % REGISTER_WINDOW_COUNT] = value;
    }

    /// Reads one byte of the little-endian direct-page view of the window.
    #[must_use]
    pub const fn window_byte(&self, offset: u8) -> u8 {
        let word = self.window[(offset / 4) as usize];
        (word >> ((offset % 4) * 8)) as u8
    }

    /// Writes one byte of the little-endian direct-page view of the window.
    pub const fn set_window_byte(&mut self, offset: u8, value: u8) {
        let index = (offset / 4) as usize;
        let shift = (offset % 4) * 8;
        let word = self.window[index] & !(0xFF << shift);
        self.window[index] = word | ((value as u32) << shift);
    }

    /// Reads `width` bytes of the window view starting at `offset`, wrapping at 256.
    #[must_use]
    pub const fn window_read(&self, offset: u8, width: Width) -> u32 {
        let mut value = 0;
        let mut i = 0;
        while i < width.bytes() {
            let byte = self.window_byte(offset.wrapping_add(i as u8));
            value |= (byte as u32) << (i * 8);
            i += 1;
        }
        value
    }

    /// Writes `width` bytes of the window view starting at `offset`, wrapping at 256.
    pub const fn window_write(&mut self, offset: u8, value: u32, width: Width) {
        let mut i = 0;
        while i < width.bytes() {
            self.set_window_byte(offset.wrapping_add(i as u8), (value >> (i * 8)) as u8);
            i += 1;
        }
    }
}

#[cfg(test)]
mod tests {
    use super::{Registers, Width, P_E, P_M0, P_M1, P_N, P_X0, P_Z};

    #[test]
    fn width_field_decodes_both_32_bit_encodings() {
        assert_eq!(Width::from_field(0b00), Width::Byte);
        assert_eq!(Width::from_field(0b01), Width::Word);
        assert_eq!(Width::from_field(0b10), Width::Long);
        assert_eq!(Width::from_field(0b11), Width::Long);
    }

    #[test]
    fn width_masks_and_signs_match_bit_counts() {
        assert_eq!(Width::Byte.mask(), 0xFF);
        assert_eq!(Width::Word.sign(), 0x8000);
        assert_eq!(Width::Long.sign(), 0x8000_0000);
        assert_eq!(Width::from_bytes(8), Width::Long);
    }

    #[test]
    fn widths_apply_regardless_of_emulation_flag() {
        let mut regs = Registers::default();
        regs.set_p(P_E | P_M0 | P_X0);
        assert_eq!(regs.width_m(), Width::Word);
        assert_eq!(regs.width_x(), Width::Word);
        regs.set_p(P_M1);
        assert_eq!(regs.width_m(), Width::Long);
        assert_eq!(regs.width_x(), Width::Byte);
    }

    #[test]
    fn update_nz_uses_operation_width() {
        let mut regs = Registers::default();
        regs.update_nz(0xFFFF_0000, Width::Word);
        assert!(regs.flag(P_Z));
        assert!(!regs.flag(P_N));
        regs.update_nz(0x0000_0080, Width::Byte);
        assert!(!regs.flag(P_Z));
        assert!(regs.flag(P_N));
    }

    #[test]
    fn window_view_is_little_endian_and_wraps() {
        let mut regs = Registers::default();
        regs.set_window(1, 0x4433_2211);
        assert_eq!(regs.window_byte(4), 0x11);
        assert_eq!(regs.window_read(5, Width::Word), 0x3322);

        regs.window_write(0xFE, 0xAABB_CCDD, Width::Long);
        assert_eq!(regs.window(63) >> 16, 0xCCDD);
        assert_eq!(regs.window(0) & 0xFFFF, 0xAABB);
    }

    #[test]
    fn set_p_discards_undefined_bits() {
        let mut regs = Registers::default();
        regs.set_p(0xFFFF);
        assert_eq!(regs.p(), 0x3FFF);
    }
}
