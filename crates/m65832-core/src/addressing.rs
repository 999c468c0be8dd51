//! Addressing-mode resolution.
//!
//! Resolving a mode consumes its operand bytes from the instruction stream and
//! yields an [`Operand`]: a memory address, a register-window offset (direct
//! page with `P.R` set), an already-fetched immediate, or the accumulator.

#![allow(
    clippy::cast_lossless,
    clippy::cast_possible_truncation,
    clippy::cast_possible_wrap,
    clippy::cast_sign_loss
)]

use crate::alu::merge;
use crate::{CpuState, Width};

/// Operand addressing forms of the primary, `WID` and extended opcode spaces.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[cfg_attr(feature = "serde", derive(serde::Deserialize, serde::Serialize))]
pub enum AddressingMode {
    /// No operand.
    Implied,
    /// Accumulator operand.
    Accumulator,
    /// Immediate sized by the accumulator width.
    ImmediateM,
    /// Immediate sized by the index width.
    ImmediateX,
    /// One-byte immediate.
    Immediate8,
    /// Two-byte immediate.
    Immediate16,
    /// Four-byte immediate.
    Immediate32,
    /// `dp`
    Direct,
    /// `dp,X`
    DirectX,
    /// `dp,Y`
    DirectY,
    /// `abs` relative to `B`.
    Absolute,
    /// `abs,X`
    AbsoluteX,
    /// `abs,Y`
    AbsoluteY,
    /// 24-bit `long`.
    Long,
    /// `long,X`
    LongX,
    /// `(dp)`
    DirectIndirect,
    /// `(dp,X)`
    DirectIndexedIndirect,
    /// `(dp),Y`
    DirectIndirectY,
    /// `[dp]`
    DirectIndirectLong,
    /// `[dp],Y`
    DirectIndirectLongY,
    /// `sr,S`
    StackRelative,
    /// `(sr,S),Y`
    StackRelativeIndirectY,
    /// 8-bit branch displacement.
    Relative8,
    /// 16-bit branch displacement.
    Relative16,
    /// Destination and source bank bytes of a block move.
    BlockMove,
    /// `(abs)` jump.
    AbsoluteIndirect,
    /// `(abs,X)` jump.
    AbsoluteIndexedIndirect,
    /// `[abs]` jump.
    AbsoluteIndirectLong,
    /// 32-bit absolute (`WID` prefix).
    Absolute32,
    /// 32-bit absolute, X-indexed (`WID` prefix).
    Absolute32X,
    /// 32-bit absolute, Y-indexed (`WID` prefix).
    Absolute32Y,
    /// Reserved operand bytes that are skipped without decoding.
    Skip(u8),
}

impl AddressingMode {
    /// Number of operand bytes that follow the opcode for the given widths.
    #[must_use]
    pub const fn operand_bytes(self, width_m: Width, width_x: Width) -> u32 {
        match self {
            Self::Implied | Self::Accumulator => 0,
            Self::ImmediateM => width_m.bytes(),
            Self::ImmediateX => width_x.bytes(),
            Self::Immediate8
            | Self::Direct
            | Self::DirectX
            | Self::DirectY
            | Self::DirectIndirect
            | Self::DirectIndexedIndirect
            | Self::DirectIndirectY
            | Self::DirectIndirectLong
            | Self::DirectIndirectLongY
            | Self::StackRelative
            | Self::StackRelativeIndirectY
            | Self::Relative8 => 1,
            Self::Immediate16
            | Self::Absolute
            | Self::AbsoluteX
            | Self::AbsoluteY
            | Self::Relative16
            | Self::BlockMove
            | Self::AbsoluteIndirect
            | Self::AbsoluteIndexedIndirect
            | Self::AbsoluteIndirectLong => 2,
            Self::Long | Self::LongX => 3,
            Self::Immediate32 | Self::Absolute32 | Self::Absolute32X | Self::Absolute32Y => 4,
            Self::Skip(bytes) => bytes as u32,
        }
    }
}

/// Resolved location of an instruction operand.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Operand {
    /// Virtual address accessed through the tiered memory path.
    Memory(u32),
    /// Byte offset into the register window.
    Window(u8),
    /// Value already fetched from the instruction stream.
    Immediate(u32),
    /// The accumulator.
    Accumulator,
}

impl Operand {
    /// The operand `bytes` further on, for multi-word accesses.
    #[must_use]
    pub const fn offset(self, bytes: u32) -> Self {
        match self {
            Self::Memory(addr) => Self::Memory(addr.wrapping_add(bytes)),
            Self::Window(offset) => Self::Window(offset.wrapping_add(bytes as u8)),
            other => other,
        }
    }
}

impl CpuState {
    pub(crate) fn index_x(&self) -> u32 {
        self.regs.x & self.regs.width_x().mask()
    }

    pub(crate) fn index_y(&self) -> u32 {
        self.regs.y & self.regs.width_x().mask()
    }

    /// Direct-page operand at `offset`; the register window when `P.R` is set.
    pub(crate) fn direct(&self, offset: u8) -> Operand {
        if self.regs.flag(crate::P_R) {
            Operand::Window(offset)
        } else {
            Operand::Memory(self.regs.d.wrapping_add(u32::from(offset)))
        }
    }

    fn direct_indexed(&self, offset: u8, index: u32) -> Operand {
        if self.regs.flag(crate::P_R) {
            Operand::Window(offset.wrapping_add(index as u8))
        } else {
            Operand::Memory(self.regs.d.wrapping_add(u32::from(offset)).wrapping_add(index))
        }
    }

    /// Pointer width for `(dp)`-style indirection: 16 bits in emulation mode
    /// or with an 8/16-bit accumulator, otherwise 32 bits.
    fn pointer_width(&self) -> Width {
        if self.regs.is_emulation() || self.regs.width_m() != Width::Long {
            Width::Word
        } else {
            Width::Long
        }
    }

    /// Consumes the operand bytes of `mode` and returns its location.
    ///
    /// `width` sizes the `ImmediateM`/`ImmediateX` forms. Control-flow modes
    /// resolve to their raw operand bytes as an immediate.
    pub(crate) fn resolve(&mut self, mode: AddressingMode, width: Width) -> Operand {
        match mode {
            AddressingMode::Implied | AddressingMode::Accumulator => Operand::Accumulator,
            AddressingMode::ImmediateM | AddressingMode::ImmediateX => {
                Operand::Immediate(self.fetch_bytes(width.bytes()))
            }
            AddressingMode::Immediate8 | AddressingMode::Relative8 => {
                Operand::Immediate(u32::from(self.fetch8()))
            }
            AddressingMode::Immediate16
            | AddressingMode::Relative16
            | AddressingMode::BlockMove
            | AddressingMode::AbsoluteIndirect
            | AddressingMode::AbsoluteIndexedIndirect
            | AddressingMode::AbsoluteIndirectLong => Operand::Immediate(self.fetch16()),
            AddressingMode::Immediate32 => Operand::Immediate(self.fetch32()),
            AddressingMode::Skip(bytes) => {
                for _ in 0..bytes {
                    self.fetch8();
                }
                Operand::Immediate(0)
            }
            AddressingMode::Direct => {
                let offset = self.fetch8();
                self.direct(offset)
            }
            AddressingMode::DirectX => {
                let offset = self.fetch8();
                self.direct_indexed(offset, self.index_x())
            }
            AddressingMode::DirectY => {
                let offset = self.fetch8();
                self.direct_indexed(offset, self.index_y())
            }
            AddressingMode::Absolute => {
                let abs = self.fetch16();
                Operand::Memory(self.regs.b.wrapping_add(abs))
            }
            AddressingMode::AbsoluteX => {
                let abs = self.fetch16();
                Operand::Memory(self.regs.b.wrapping_add(abs).wrapping_add(self.index_x()))
            }
            AddressingMode::AbsoluteY => {
                let abs = self.fetch16();
                Operand::Memory(self.regs.b.wrapping_add(abs).wrapping_add(self.index_y()))
            }
            AddressingMode::Long => Operand::Memory(self.fetch24()),
            AddressingMode::LongX => {
                let long = self.fetch24();
                Operand::Memory(long.wrapping_add(self.index_x()))
            }
            AddressingMode::DirectIndirect => {
                let offset = self.fetch8();
                let pointer = self.direct(offset);
                Operand::Memory(self.read_operand(pointer, self.pointer_width()))
            }
            AddressingMode::DirectIndexedIndirect => {
                let offset = self.fetch8();
                let pointer = self.direct_indexed(offset, self.index_x());
                Operand::Memory(self.read_operand(pointer, self.pointer_width()))
            }
            AddressingMode::DirectIndirectY => {
                let offset = self.fetch8();
                let pointer = self.direct(offset);
                let base = self.read_operand(pointer, self.pointer_width());
                Operand::Memory(base.wrapping_add(self.index_y()))
            }
            AddressingMode::DirectIndirectLong => {
                let offset = self.fetch8();
                let pointer = self.direct(offset);
                Operand::Memory(self.read_operand(pointer, Width::Long))
            }
            AddressingMode::DirectIndirectLongY => {
                let offset = self.fetch8();
                let pointer = self.direct(offset);
                let base = self.read_operand(pointer, Width::Long);
                Operand::Memory(base.wrapping_add(self.index_y()))
            }
            AddressingMode::StackRelative => {
                let offset = u32::from(self.fetch8());
                Operand::Memory(self.regs.s.wrapping_add(offset))
            }
            AddressingMode::StackRelativeIndirectY => {
                let offset = u32::from(self.fetch8());
                let pointer = self.regs.s.wrapping_add(offset);
                let base = self.read(pointer, self.pointer_width());
                Operand::Memory(base.wrapping_add(self.index_y()))
            }
            AddressingMode::Absolute32 => Operand::Memory(self.fetch32()),
            AddressingMode::Absolute32X => {
                let abs = self.fetch32();
                Operand::Memory(abs.wrapping_add(self.index_x()))
            }
            AddressingMode::Absolute32Y => {
                let abs = self.fetch32();
                Operand::Memory(abs.wrapping_add(self.index_y()))
            }
        }
    }

    /// Effective address of a direct-page or absolute mode, ignoring the register window.
    pub(crate) fn effective_address(&mut self, mode: AddressingMode) -> u32 {
        match mode {
            AddressingMode::Direct => {
                let offset = u32::from(self.fetch8());
                self.regs.d.wrapping_add(offset)
            }
            AddressingMode::DirectX => {
                let offset = u32::from(self.fetch8());
                self.regs.d.wrapping_add(offset).wrapping_add(self.index_x())
            }
            AddressingMode::AbsoluteX => {
                let abs = self.fetch16();
                self.regs.b.wrapping_add(abs).wrapping_add(self.index_x())
            }
            AddressingMode::Absolute => {
                let abs = self.fetch16();
                self.regs.b.wrapping_add(abs)
            }
            other => match self.resolve(other, Width::Long) {
                Operand::Memory(addr) | Operand::Immediate(addr) => addr,
                Operand::Window(offset) => self.regs.d.wrapping_add(u32::from(offset)),
                Operand::Accumulator => self.regs.a,
            },
        }
    }

    /// Reads `width` bytes from an operand.
    pub(crate) fn read_operand(&mut self, operand: Operand, width: Width) -> u32 {
        match operand {
            Operand::Memory(addr) => self.read(addr, width),
            Operand::Window(offset) => self.regs.window_read(offset, width),
            Operand::Immediate(value) => value & width.mask(),
            Operand::Accumulator => self.regs.a & width.mask(),
        }
    }

    /// Writes `width` bytes to an operand; the accumulator keeps its high bits.
    pub(crate) fn write_operand(&mut self, operand: Operand, value: u32, width: Width) {
        match operand {
            Operand::Memory(addr) => self.write(addr, value, width),
            Operand::Window(offset) => {
                self.reservation.invalidate_overlap(operand, width);
                self.regs.window_write(offset, value, width);
            }
            Operand::Accumulator => self.regs.a = merge(self.regs.a, value, width),
            Operand::Immediate(_) => {}
        }
    }

    /// Target of an 8-bit relative branch: the PC after the operand plus the signed offset.
    pub(crate) fn branch_target8(&mut self) -> u32 {
        let offset = i32::from(self.fetch8() as i8);
        self.regs.pc.wrapping_add_signed(offset)
    }

    /// Target of a 16-bit relative branch.
    pub(crate) fn branch_target16(&mut self) -> u32 {
        let offset = i32::from(self.fetch16() as u16 as i16);
        self.regs.pc.wrapping_add_signed(offset)
    }
}
