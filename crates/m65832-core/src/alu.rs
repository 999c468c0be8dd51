//! Width-parameterized arithmetic, logic and shift primitives.
//!
//! Every function masks its operands to the operation width first and
//! reports flags through the status word only; writing the result back to a
//! register or memory is the caller's job.

#![allow(clippy::cast_possible_truncation, clippy::cast_possible_wrap, clippy::cast_sign_loss)]

use crate::state::{Registers, Width, P_C, P_D, P_N, P_V, P_Z};

/// Barrel-shifter operation selected by the top three bits of the `$E9` control byte.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[cfg_attr(feature = "serde", derive(serde::Deserialize, serde::Serialize))]
pub enum ShiftOp {
    /// Logical shift left.
    Shl,
    /// Logical shift right.
    Shr,
    /// Arithmetic shift right.
    Sar,
    /// Rotate left through carry.
    Rol,
    /// Rotate right through carry.
    Ror,
}

impl ShiftOp {
    /// Decodes the 3-bit operation field; codes 5-7 are unassigned.
    #[must_use]
    pub const fn from_code(code: u8) -> Option<Self> {
        match code {
            0 => Some(Self::Shl),
            1 => Some(Self::Shr),
            2 => Some(Self::Sar),
            3 => Some(Self::Rol),
            4 => Some(Self::Ror),
            _ => None,
        }
    }
}

/// Sign/zero-extend and bit-count operation selected by the `$EA` sub-opcode.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[cfg_attr(feature = "serde", derive(serde::Deserialize, serde::Serialize))]
pub enum ExtendOp {
    /// Sign-extend bits 7:0.
    Sext8,
    /// Sign-extend bits 15:0.
    Sext16,
    /// Zero-extend bits 7:0.
    Zext8,
    /// Zero-extend bits 15:0.
    Zext16,
    /// Count leading zeros at the operation width.
    Clz,
    /// Count trailing zeros at the operation width.
    Ctz,
    /// Population count at the operation width.
    Popcnt,
}

impl ExtendOp {
    /// Decodes the sub-opcode byte.
    #[must_use]
    pub const fn from_code(code: u8) -> Option<Self> {
        match code {
            0 => Some(Self::Sext8),
            1 => Some(Self::Sext16),
            2 => Some(Self::Zext8),
            3 => Some(Self::Zext16),
            4 => Some(Self::Clz),
            5 => Some(Self::Ctz),
            6 => Some(Self::Popcnt),
            _ => None,
        }
    }
}

/// Sign-extends the low `width` bits of `value` to 32 bits.
#[must_use]
pub const fn sign_extend(value: u32, width: Width) -> i32 {
    match width {
        Width::Byte => value as u8 as i8 as i32,
        Width::Word => value as u16 as i16 as i32,
        Width::Long => value as i32,
    }
}

/// Merges a `width`-sized result into the low bits of `register`.
#[must_use]
pub const fn merge(register: u32, result: u32, width: Width) -> u32 {
    (register & !width.mask()) | (result & width.mask())
}

/// `lhs + rhs + C`, binary or BCD depending on `P.D`.
///
/// Decimal mode only applies to 8- and 16-bit operations and leaves `V` untouched.
pub fn adc(regs: &mut Registers, lhs: u32, rhs: u32, width: Width) -> u32 {
    let mask = width.mask();
    let (lhs, rhs) = (lhs & mask, rhs & mask);
    let carry = u32::from(regs.flag(P_C));

    let result = if regs.flag(P_D) && width != Width::Long {
        let (value, carry_out) = bcd_add(lhs, rhs, carry, width);
        regs.set_flag(P_C, carry_out);
        value
    } else {
        let wide = u64::from(lhs) + u64::from(rhs) + u64::from(carry);
        let value = (wide as u32) & mask;
        regs.set_flag(P_C, wide > u64::from(mask));
        regs.set_flag(P_V, !(lhs ^ rhs) & (lhs ^ value) & width.sign() != 0);
        value
    };
    regs.update_nz(result, width);
    result
}

/// `lhs - rhs - !C`, binary or BCD depending on `P.D`.
pub fn sbc(regs: &mut Registers, lhs: u32, rhs: u32, width: Width) -> u32 {
    let mask = width.mask();
    let (lhs, rhs) = (lhs & mask, rhs & mask);
    let borrow = u32::from(!regs.flag(P_C));

    let result = if regs.flag(P_D) && width != Width::Long {
        let (value, carry_out) = bcd_sub(lhs, rhs, borrow, width);
        regs.set_flag(P_C, carry_out);
        value
    } else {
        let value = lhs.wrapping_sub(rhs).wrapping_sub(borrow) & mask;
        regs.set_flag(P_C, u64::from(lhs) >= u64::from(rhs) + u64::from(borrow));
        regs.set_flag(P_V, (lhs ^ rhs) & (lhs ^ value) & width.sign() != 0);
        value
    };
    regs.update_nz(result, width);
    result
}

fn bcd_add(lhs: u32, rhs: u32, carry: u32, width: Width) -> (u32, bool) {
    let mut carry = carry;
    let mut result = 0;
    for nibble in 0..width.bytes() * 2 {
        let shift = nibble * 4;
        let mut digit = ((lhs >> shift) & 0xF) + ((rhs >> shift) & 0xF) + carry;
        if digit > 9 {
            digit += 6;
        }
        carry = u32::from(digit > 0xF);
        result |= (digit & 0xF) << shift;
    }
    (result, carry != 0)
}

fn bcd_sub(lhs: u32, rhs: u32, borrow: u32, width: Width) -> (u32, bool) {
    let mut borrow = borrow as i32;
    let mut result = 0;
    for nibble in 0..width.bytes() * 2 {
        let shift = nibble * 4;
        let mut digit = ((lhs >> shift) & 0xF) as i32 - ((rhs >> shift) & 0xF) as i32 - borrow;
        if digit < 0 {
            digit -= 6;
        }
        borrow = i32::from(digit < 0);
        result |= ((digit & 0xF) as u32) << shift;
    }
    (result, borrow == 0)
}

/// Subtracts for flags only: `C` = no borrow, `N`/`Z` from the masked difference.
pub fn compare(regs: &mut Registers, lhs: u32, rhs: u32, width: Width) {
    let mask = width.mask();
    let (lhs, rhs) = (lhs & mask, rhs & mask);
    regs.set_flag(P_C, lhs >= rhs);
    regs.update_nz(lhs.wrapping_sub(rhs) & mask, width);
}

/// Bitwise AND.
pub fn and(regs: &mut Registers, lhs: u32, rhs: u32, width: Width) -> u32 {
    let result = lhs & rhs & width.mask();
    regs.update_nz(result, width);
    result
}

/// Bitwise OR.
pub fn ora(regs: &mut Registers, lhs: u32, rhs: u32, width: Width) -> u32 {
    let result = (lhs | rhs) & width.mask();
    regs.update_nz(result, width);
    result
}

/// Bitwise exclusive OR.
pub fn eor(regs: &mut Registers, lhs: u32, rhs: u32, width: Width) -> u32 {
    let result = (lhs ^ rhs) & width.mask();
    regs.update_nz(result, width);
    result
}

/// `BIT` against memory: `Z` from `acc & value`, `N`/`V` from the operand's top two bits.
pub fn bit(regs: &mut Registers, acc: u32, value: u32, width: Width) {
    let value = value & width.mask();
    regs.set_flag(P_Z, acc & value == 0);
    regs.set_flag(P_N, value & width.sign() != 0);
    regs.set_flag(P_V, value & (width.sign() >> 1) != 0);
}

/// `BIT #imm`: only `Z` is affected.
pub fn bit_immediate(regs: &mut Registers, acc: u32, value: u32, width: Width) {
    regs.set_flag(P_Z, acc & value & width.mask() == 0);
}

/// Shift left one bit; the old sign bit lands in `C`.
pub fn asl(regs: &mut Registers, value: u32, width: Width) -> u32 {
    regs.set_flag(P_C, value & width.sign() != 0);
    let result = (value << 1) & width.mask();
    regs.update_nz(result, width);
    result
}

/// Logical shift right one bit; bit 0 lands in `C`.
pub fn lsr(regs: &mut Registers, value: u32, width: Width) -> u32 {
    let value = value & width.mask();
    regs.set_flag(P_C, value & 1 != 0);
    let result = value >> 1;
    regs.update_nz(result, width);
    result
}

/// Rotate left one bit through `C`.
pub fn rol(regs: &mut Registers, value: u32, width: Width) -> u32 {
    let carry_in = u32::from(regs.flag(P_C));
    regs.set_flag(P_C, value & width.sign() != 0);
    let result = ((value << 1) | carry_in) & width.mask();
    regs.update_nz(result, width);
    result
}

/// Rotate right one bit through `C`.
pub fn ror(regs: &mut Registers, value: u32, width: Width) -> u32 {
    let value = value & width.mask();
    let carry_in = if regs.flag(P_C) { width.sign() } else { 0 };
    regs.set_flag(P_C, value & 1 != 0);
    let result = (value >> 1) | carry_in;
    regs.update_nz(result, width);
    result
}

/// Increment with wraparound at the operation width.
pub fn inc(regs: &mut Registers, value: u32, width: Width) -> u32 {
    let result = value.wrapping_add(1) & width.mask();
    regs.update_nz(result, width);
    result
}

/// Decrement with wraparound at the operation width.
pub fn dec(regs: &mut Registers, value: u32, width: Width) -> u32 {
    let result = value.wrapping_sub(1) & width.mask();
    regs.update_nz(result, width);
    result
}

/// Multi-bit barrel shift or rotate of `value` by `count` (0-31).
///
/// Logical and arithmetic shifts by zero clear `C`.
/// Rotates step one bit at a time through `C`, so counts at or above the
/// operand width match the equivalent sequence of single-bit rotates.
pub fn shift(regs: &mut Registers, op: ShiftOp, value: u32, count: u32, width: Width) -> u32 {
    let mask = width.mask();
    let bits = width.bits();
    let value = value & mask;

    let result = match op {
        ShiftOp::Shl => {
            let carry = count > 0 && count <= bits && (value >> (bits - count)) & 1 != 0;
            regs.set_flag(P_C, carry);
            value.checked_shl(count).unwrap_or(0) & mask
        }
        ShiftOp::Shr => {
            let carry = count > 0 && value.checked_shr(count - 1).unwrap_or(0) & 1 != 0;
            regs.set_flag(P_C, carry);
            value.checked_shr(count).unwrap_or(0)
        }
        ShiftOp::Sar => {
            let signed = sign_extend(value, width);
            let carry = count > 0 && (signed >> (count - 1).min(31)) & 1 != 0;
            regs.set_flag(P_C, carry);
            ((signed >> count.min(31)) as u32) & mask
        }
        ShiftOp::Rol => {
            let mut carry = u32::from(regs.flag(P_C));
            let mut acc = value;
            for _ in 0..count {
                let out = (acc >> (bits - 1)) & 1;
                acc = ((acc << 1) | carry) & mask;
                carry = out;
            }
            regs.set_flag(P_C, carry != 0);
            acc
        }
        ShiftOp::Ror => {
            let mut carry = u32::from(regs.flag(P_C));
            let mut acc = value;
            for _ in 0..count {
                let out = acc & 1;
                acc = ((acc >> 1) | (carry << (bits - 1))) & mask;
                carry = out;
            }
            regs.set_flag(P_C, carry != 0);
            acc
        }
    };
    regs.update_nz(result, width);
    result
}

/// Applies an extend or bit-count operation to a `width`-sized operand.
#[must_use]
pub const fn extend(op: ExtendOp, value: u32, width: Width) -> u32 {
    let masked = value & width.mask();
    match op {
        ExtendOp::Sext8 => value as u8 as i8 as i32 as u32,
        ExtendOp::Sext16 => value as u16 as i16 as i32 as u32,
        ExtendOp::Zext8 => value & 0xFF,
        ExtendOp::Zext16 => value & 0xFFFF,
        ExtendOp::Clz => {
            if masked == 0 {
                width.bits()
            } else {
                masked.leading_zeros() - (32 - width.bits())
            }
        }
        ExtendOp::Ctz => {
            if masked == 0 {
                width.bits()
            } else {
                masked.trailing_zeros()
            }
        }
        ExtendOp::Popcnt => masked.count_ones(),
    }
}

/// Product of a multiply: the low word for `A` and, at 32 bits, the high word for `T`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Product {
    /// Value for the accumulator.
    pub low: u32,
    /// High half for `T`; only produced by 32-bit multiplies.
    pub high: Option<u32>,
}

/// Multiplies two `width`-sized operands.
///
/// 8- and 16-bit products fit 32 bits and are returned whole; 32-bit products
/// split into `low`/`high`.
#[must_use]
pub const fn multiply(lhs: u32, rhs: u32, width: Width, signed: bool) -> Product {
    let mask = width.mask();
    match width {
        Width::Long => {
            let wide = if signed {
                (lhs as i32 as i64).wrapping_mul(rhs as i32 as i64) as u64
            } else {
                (lhs as u64) * (rhs as u64)
            };
            Product {
                low: wide as u32,
                high: Some((wide >> 32) as u32),
            }
        }
        Width::Byte | Width::Word => {
            let full = if signed {
                let product = sign_extend(lhs & mask, width) * sign_extend(rhs & mask, width);
                product as u32 & (mask << width.bits() | mask)
            } else {
                (lhs & mask) * (rhs & mask)
            };
            Product {
                low: full,
                high: None,
            }
        }
    }
}

/// Divides two `width`-sized operands; `None` on a zero divisor.
///
/// Returns `(quotient, remainder)`, both masked to the operation width.
#[must_use]
pub const fn divide(lhs: u32, rhs: u32, width: Width, signed: bool) -> Option<(u32, u32)> {
    let mask = width.mask();
    if rhs & mask == 0 {
        return None;
    }
    if signed {
        let dividend = sign_extend(lhs, width);
        let divisor = sign_extend(rhs, width);
        Some((
            dividend.wrapping_div(divisor) as u32 & mask,
            dividend.wrapping_rem(divisor) as u32 & mask,
        ))
    } else {
        let (dividend, divisor) = (lhs & mask, rhs & mask);
        Some((dividend / divisor, dividend % divisor))
    }
}
