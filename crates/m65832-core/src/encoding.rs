//! Deterministic opcode tables for the primary, `WID` (`$42`) and extended
//! (`$02`) opcode spaces.
//!
//! Each table is a dense 256-entry array built at compile time from a sparse
//! encoding list, so dispatch is a single index. Cycle counts are the full
//! cost of the instruction; handlers only add conditional extras.

use crate::addressing::AddressingMode;
use crate::execute::{extended, ops, wide};
use crate::CpuState;

use AddressingMode as M;
use Mnemonic as N;

/// Instruction handler: executes after the opcode byte, returns extra cycles.
pub(crate) type Handler = fn(&mut CpuState, AddressingMode) -> u32;

/// Instruction mnemonics across all three opcode spaces.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[cfg_attr(feature = "serde", derive(serde::Deserialize, serde::Serialize))]
#[allow(missing_docs)]
pub enum Mnemonic {
    Adc,
    And,
    Asl,
    Bcc,
    Bcs,
    Beq,
    Bit,
    Bmi,
    Bne,
    Bpl,
    Bra,
    Brk,
    Brl,
    Bvc,
    Bvs,
    Clc,
    Cld,
    Cli,
    Clv,
    Cmp,
    Cpx,
    Cpy,
    Dec,
    Dex,
    Dey,
    Eor,
    Inc,
    Inx,
    Iny,
    Jml,
    Jmp,
    Jsl,
    Jsr,
    Lda,
    Ldx,
    Ldy,
    Lsr,
    Mvn,
    Mvp,
    Nop,
    Ora,
    Pea,
    Pei,
    Per,
    Pha,
    Phb,
    Phd,
    Phk,
    Php,
    Phx,
    Phy,
    Pla,
    Pld,
    Plp,
    Plx,
    Ply,
    Rep,
    Rol,
    Ror,
    Rti,
    Rtl,
    Rts,
    Sbc,
    Sec,
    Sed,
    Sei,
    Sep,
    Sta,
    Stp,
    Stx,
    Sty,
    Stz,
    Tax,
    Tay,
    Tcd,
    Tcs,
    Tdc,
    Trb,
    Tsb,
    Tsc,
    Tsx,
    Txa,
    Txs,
    Txy,
    Tya,
    Tyx,
    Wai,
    Xba,
    Xce,
    /// `$02` extended-opcode prefix.
    Ext,
    /// `$42` 32-bit operand prefix.
    Wid,
    Mul,
    Mulu,
    Div,
    Divu,
    Cas,
    Lli,
    Sci,
    Sd,
    Sb,
    Enr,
    Dsr,
    Trap,
    Fence,
    Fencer,
    Fencew,
    Repe,
    Sepe,
    Phd32,
    Pld32,
    Phb32,
    Plb32,
    Phvbr,
    Plvbr,
    Tta,
    Tat,
    Ldq,
    Stq,
    Tab,
    Tba,
    Txb,
    Tbx,
    Tyb,
    Tby,
    Tspb,
    Tbsp,
    Lea,
    /// Register-targeted ALU (`$02 $E8`).
    RegAlu,
    /// Barrel shifter (`$02 $E9`).
    Shift,
    /// Sign/zero extension and bit counting (`$02 $EA`).
    Extend,
    /// Reserved floating-point encoding, executed as a no-op.
    Fpu,
}

/// One decoded table entry.
#[derive(Clone, Copy)]
pub struct Opcode {
    /// Instruction mnemonic.
    pub mnemonic: Mnemonic,
    /// Operand addressing form.
    pub mode: AddressingMode,
    /// Base cycle cost.
    pub cycles: u8,
    pub(crate) exec: Handler,
}

impl std::fmt::Debug for Opcode {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Opcode")
            .field("mnemonic", &self.mnemonic)
            .field("mode", &self.mode)
            .field("cycles", &self.cycles)
            .finish_non_exhaustive()
    }
}

/// Selects one of the three opcode tables.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum OpcodeSpace {
    /// Unprefixed opcodes.
    Primary,
    /// Opcodes following the `$02` prefix.
    Extended,
    /// Opcodes following the `$42` prefix.
    Wide,
}

const fn op(mnemonic: Mnemonic, mode: AddressingMode, cycles: u8, exec: Handler) -> Opcode {
    Opcode {
        mnemonic,
        mode,
        cycles,
        exec,
    }
}

/// Offsets, modes and costs shared by the ORA/AND/EOR/ADC/CMP/SBC groups.
const ALU_GROUP_MODES: [(u8, AddressingMode, u8); 13] = [
    (0x01, M::DirectIndexedIndirect, 6),
    (0x03, M::StackRelative, 4),
    (0x05, M::Direct, 3),
    (0x07, M::DirectIndirectLong, 6),
    (0x09, M::ImmediateM, 2),
    (0x0D, M::Absolute, 4),
    (0x11, M::DirectIndirectY, 5),
    (0x12, M::DirectIndirect, 5),
    (0x13, M::StackRelativeIndirectY, 7),
    (0x15, M::DirectX, 4),
    (0x17, M::DirectIndirectLongY, 6),
    (0x19, M::AbsoluteY, 4),
    (0x1D, M::AbsoluteX, 4),
];

const ALU_GROUPS: [(u8, Mnemonic, Handler); 6] = [
    (0x00, N::Ora, ops::ora),
    (0x20, N::And, ops::and),
    (0x40, N::Eor, ops::eor),
    (0x60, N::Adc, ops::adc),
    (0xC0, N::Cmp, ops::cmp),
    (0xE0, N::Sbc, ops::sbc),
];

/// Read-modify-write groups: accumulator, `dp`, `dp,X`, `abs`, `abs,X`.
const RMW_GROUPS: [(u8, u8, u8, u8, u8, Mnemonic, Handler); 6] = [
    (0x0A, 0x06, 0x16, 0x0E, 0x1E, N::Asl, ops::asl),
    (0x4A, 0x46, 0x56, 0x4E, 0x5E, N::Lsr, ops::lsr),
    (0x2A, 0x26, 0x36, 0x2E, 0x3E, N::Rol, ops::rol),
    (0x6A, 0x66, 0x76, 0x6E, 0x7E, N::Ror, ops::ror),
    (0x1A, 0xE6, 0xF6, 0xEE, 0xFE, N::Inc, ops::inc),
    (0x3A, 0xC6, 0xD6, 0xCE, 0xDE, N::Dec, ops::dec),
];

/// Primary opcodes outside the ALU and read-modify-write groups.
const PRIMARY_ENCODINGS: &[(u8, Opcode)] = &[
    (0xA9, op(N::Lda, M::ImmediateM, 2, ops::lda)),
    (0xA5, op(N::Lda, M::Direct, 3, ops::lda)),
    (0xB5, op(N::Lda, M::DirectX, 4, ops::lda)),
    (0xAD, op(N::Lda, M::Absolute, 4, ops::lda)),
    (0xBD, op(N::Lda, M::AbsoluteX, 4, ops::lda)),
    (0xB9, op(N::Lda, M::AbsoluteY, 4, ops::lda)),
    (0xA1, op(N::Lda, M::DirectIndexedIndirect, 6, ops::lda)),
    (0xB1, op(N::Lda, M::DirectIndirectY, 5, ops::lda)),
    (0xB2, op(N::Lda, M::DirectIndirect, 5, ops::lda)),
    (0xA7, op(N::Lda, M::DirectIndirectLong, 6, ops::lda)),
    (0xB7, op(N::Lda, M::DirectIndirectLongY, 6, ops::lda)),
    (0xA3, op(N::Lda, M::StackRelative, 4, ops::lda)),
    (0xB3, op(N::Lda, M::DirectIndirectLongY, 6, ops::lda)),
    (0xAB, op(N::Lda, M::Long, 5, ops::lda)),
    (0xAF, op(N::Lda, M::StackRelativeIndirectY, 7, ops::lda)),
    (0xBF, op(N::Lda, M::LongX, 5, ops::lda)),
    (0xA2, op(N::Ldx, M::ImmediateX, 2, ops::ldx)),
    (0xA6, op(N::Ldx, M::Direct, 3, ops::ldx)),
    (0xB6, op(N::Ldx, M::DirectY, 4, ops::ldx)),
    (0xAE, op(N::Ldx, M::Absolute, 4, ops::ldx)),
    (0xBE, op(N::Ldx, M::AbsoluteY, 4, ops::ldx)),
    (0xA0, op(N::Ldy, M::ImmediateX, 2, ops::ldy)),
    (0xA4, op(N::Ldy, M::Direct, 3, ops::ldy)),
    (0xB4, op(N::Ldy, M::DirectX, 4, ops::ldy)),
    (0xAC, op(N::Ldy, M::Absolute, 4, ops::ldy)),
    (0xBC, op(N::Ldy, M::AbsoluteX, 4, ops::ldy)),
    (0x85, op(N::Sta, M::Direct, 3, ops::sta)),
    (0x95, op(N::Sta, M::DirectX, 4, ops::sta)),
    (0x8D, op(N::Sta, M::Absolute, 4, ops::sta)),
    (0x9D, op(N::Sta, M::AbsoluteX, 5, ops::sta)),
    (0x99, op(N::Sta, M::AbsoluteY, 5, ops::sta)),
    (0x81, op(N::Sta, M::DirectIndexedIndirect, 6, ops::sta)),
    (0x91, op(N::Sta, M::DirectIndirectY, 6, ops::sta)),
    (0x92, op(N::Sta, M::DirectIndirect, 5, ops::sta)),
    (0x87, op(N::Sta, M::DirectIndirectLong, 6, ops::sta)),
    (0x97, op(N::Sta, M::DirectIndirectLongY, 6, ops::sta)),
    (0x83, op(N::Sta, M::StackRelative, 4, ops::sta)),
    (0x93, op(N::Sta, M::DirectIndirectLongY, 6, ops::sta)),
    (0x8F, op(N::Sta, M::Long, 5, ops::sta)),
    (0x9F, op(N::Sta, M::LongX, 5, ops::sta)),
    (0x86, op(N::Stx, M::Direct, 3, ops::stx)),
    (0x96, op(N::Stx, M::DirectY, 4, ops::stx)),
    (0x8E, op(N::Stx, M::Absolute, 4, ops::stx)),
    (0x84, op(N::Sty, M::Direct, 3, ops::sty)),
    (0x94, op(N::Sty, M::DirectX, 4, ops::sty)),
    (0x8C, op(N::Sty, M::Absolute, 4, ops::sty)),
    (0x64, op(N::Stz, M::Direct, 3, ops::stz)),
    (0x74, op(N::Stz, M::DirectX, 4, ops::stz)),
    (0x9C, op(N::Stz, M::Absolute, 4, ops::stz)),
    (0x9E, op(N::Stz, M::AbsoluteX, 5, ops::stz)),
    (0xE0, op(N::Cpx, M::ImmediateX, 2, ops::cpx)),
    (0xE4, op(N::Cpx, M::Direct, 3, ops::cpx)),
    (0xEC, op(N::Cpx, M::Absolute, 4, ops::cpx)),
    (0xC0, op(N::Cpy, M::ImmediateX, 2, ops::cpy)),
    (0xC4, op(N::Cpy, M::Direct, 3, ops::cpy)),
    (0xCC, op(N::Cpy, M::Absolute, 4, ops::cpy)),
    (0x89, op(N::Bit, M::ImmediateM, 2, ops::bit)),
    (0x24, op(N::Bit, M::Direct, 3, ops::bit)),
    (0x34, op(N::Bit, M::DirectX, 4, ops::bit)),
    (0x2C, op(N::Bit, M::Absolute, 4, ops::bit)),
    (0x3C, op(N::Bit, M::AbsoluteX, 4, ops::bit)),
    (0x04, op(N::Tsb, M::Direct, 5, ops::tsb)),
    (0x0C, op(N::Tsb, M::Absolute, 6, ops::tsb)),
    (0x14, op(N::Trb, M::Direct, 5, ops::trb)),
    (0x1C, op(N::Trb, M::Absolute, 6, ops::trb)),
    (0xE8, op(N::Inx, M::Implied, 2, ops::inx)),
    (0xC8, op(N::Iny, M::Implied, 2, ops::iny)),
    (0xCA, op(N::Dex, M::Implied, 2, ops::dex)),
    (0x88, op(N::Dey, M::Implied, 2, ops::dey)),
    (0xAA, op(N::Tax, M::Implied, 2, ops::tax)),
    (0xA8, op(N::Tay, M::Implied, 2, ops::tay)),
    (0x8A, op(N::Txa, M::Implied, 2, ops::txa)),
    (0x98, op(N::Tya, M::Implied, 2, ops::tya)),
    (0xBA, op(N::Tsx, M::Implied, 2, ops::tsx)),
    (0x9A, op(N::Txs, M::Implied, 2, ops::txs)),
    (0x9B, op(N::Txy, M::Implied, 2, ops::txy)),
    (0xBB, op(N::Tyx, M::Implied, 2, ops::tyx)),
    (0x5B, op(N::Tcd, M::Implied, 2, ops::tcd)),
    (0x7B, op(N::Tdc, M::Implied, 2, ops::tdc)),
    (0x1B, op(N::Tcs, M::Implied, 2, ops::tcs)),
    (0x3B, op(N::Tsc, M::Implied, 2, ops::tsc)),
    (0x48, op(N::Pha, M::Implied, 3, ops::pha)),
    (0xDA, op(N::Phx, M::Implied, 3, ops::phx)),
    (0x5A, op(N::Phy, M::Implied, 3, ops::phy)),
    (0x68, op(N::Pla, M::Implied, 4, ops::pla)),
    (0xFA, op(N::Plx, M::Implied, 4, ops::plx)),
    (0x7A, op(N::Ply, M::Implied, 4, ops::ply)),
    (0x08, op(N::Php, M::Implied, 3, ops::php)),
    (0x28, op(N::Plp, M::Implied, 4, ops::plp)),
    (0x0B, op(N::Phd, M::Implied, 4, ops::phd)),
    (0x2B, op(N::Pld, M::Implied, 5, ops::pld)),
    (0x8B, op(N::Phb, M::Implied, 3, ops::phb)),
    (0x4B, op(N::Phk, M::Implied, 3, ops::phk)),
    (0xF4, op(N::Pea, M::Immediate16, 5, ops::pea)),
    (0xD4, op(N::Pei, M::Direct, 6, ops::pei)),
    (0x62, op(N::Per, M::Relative16, 6, ops::per)),
    (0x10, op(N::Bpl, M::Relative8, 2, ops::bpl)),
    (0x30, op(N::Bmi, M::Relative8, 2, ops::bmi)),
    (0x50, op(N::Bvc, M::Relative8, 2, ops::bvc)),
    (0x70, op(N::Bvs, M::Relative8, 2, ops::bvs)),
    (0x90, op(N::Bcc, M::Relative8, 2, ops::bcc)),
    (0xB0, op(N::Bcs, M::Relative8, 2, ops::bcs)),
    (0xD0, op(N::Bne, M::Relative8, 2, ops::bne)),
    (0xF0, op(N::Beq, M::Relative8, 2, ops::beq)),
    (0x80, op(N::Bra, M::Relative8, 3, ops::bra)),
    (0x82, op(N::Brl, M::Relative16, 4, ops::brl)),
    (0x4C, op(N::Jmp, M::Absolute, 3, ops::jmp)),
    (0x5C, op(N::Jmp, M::Long, 4, ops::jmp)),
    (0x6C, op(N::Jmp, M::AbsoluteIndirect, 5, ops::jmp)),
    (0x7C, op(N::Jmp, M::AbsoluteIndexedIndirect, 6, ops::jmp)),
    (0xDC, op(N::Jml, M::AbsoluteIndirectLong, 6, ops::jml)),
    (0x20, op(N::Jsr, M::Absolute, 6, ops::jsr)),
    (0xFC, op(N::Jsr, M::AbsoluteIndexedIndirect, 8, ops::jsr)),
    (0x22, op(N::Jsl, M::Long, 8, ops::jsl)),
    (0x60, op(N::Rts, M::Implied, 6, ops::rts)),
    (0x6B, op(N::Rtl, M::Implied, 6, ops::rtl)),
    (0x00, op(N::Brk, M::Implied, 7, ops::brk)),
    (0x40, op(N::Rti, M::Implied, 6, ops::rti)),
    (0x18, op(N::Clc, M::Implied, 2, ops::clc)),
    (0x38, op(N::Sec, M::Implied, 2, ops::sec)),
    (0x58, op(N::Cli, M::Implied, 2, ops::cli)),
    (0x78, op(N::Sei, M::Implied, 2, ops::sei)),
    (0xD8, op(N::Cld, M::Implied, 2, ops::cld)),
    (0xF8, op(N::Sed, M::Implied, 2, ops::sed)),
    (0xB8, op(N::Clv, M::Implied, 2, ops::clv)),
    (0xC2, op(N::Rep, M::Immediate8, 3, ops::rep)),
    (0xE2, op(N::Sep, M::Immediate8, 3, ops::sep)),
    (0xFB, op(N::Xce, M::Implied, 2, ops::xce)),
    (0xEA, op(N::Nop, M::Implied, 2, ops::nop)),
    (0xDB, op(N::Stp, M::Implied, 3, ops::stp)),
    (0xCB, op(N::Wai, M::Implied, 3, ops::wai)),
    (0xEB, op(N::Xba, M::Implied, 3, ops::xba)),
    (0x44, op(N::Mvn, M::BlockMove, 7, ops::mvn)),
    (0x54, op(N::Mvp, M::BlockMove, 7, ops::mvp)),
    (0x02, op(N::Ext, M::Implied, 0, extended::prefix)),
    (0x42, op(N::Wid, M::Implied, 0, wide::prefix)),
];

const WIDE_ENCODINGS: &[(u8, Opcode)] = &[
    (0xA9, op(N::Lda, M::Immediate32, 3, wide::lda_imm32)),
    (0xA2, op(N::Ldx, M::Immediate32, 3, wide::ldx_imm32)),
    (0xA0, op(N::Ldy, M::Immediate32, 3, wide::ldy_imm32)),
    (0xAD, op(N::Lda, M::Absolute32, 5, ops::lda)),
    (0xBD, op(N::Lda, M::Absolute32X, 5, ops::lda)),
    (0xB9, op(N::Lda, M::Absolute32Y, 5, ops::lda)),
    (0x8D, op(N::Sta, M::Absolute32, 5, ops::sta)),
    (0x9D, op(N::Sta, M::Absolute32X, 5, ops::sta)),
    (0x99, op(N::Sta, M::Absolute32Y, 5, ops::sta)),
    (0x4C, op(N::Jmp, M::Absolute32, 4, ops::jmp)),
    (0x20, op(N::Jsr, M::Absolute32, 8, ops::jsr)),
];

const EXTENDED_ENCODINGS: &[(u8, Opcode)] = &[
    (0x00, op(N::Mul, M::Direct, 8, extended::mul)),
    (0x01, op(N::Mulu, M::Direct, 8, extended::mulu)),
    (0x02, op(N::Mul, M::Absolute, 8, extended::mul)),
    (0x03, op(N::Mulu, M::Absolute, 8, extended::mulu)),
    (0x04, op(N::Div, M::Direct, 16, extended::div)),
    (0x05, op(N::Divu, M::Direct, 16, extended::divu)),
    (0x06, op(N::Div, M::Absolute, 16, extended::div)),
    (0x07, op(N::Divu, M::Absolute, 16, extended::divu)),
    (0x10, op(N::Cas, M::Direct, 8, extended::cas)),
    (0x11, op(N::Cas, M::Absolute, 9, extended::cas)),
    (0x12, op(N::Lli, M::Direct, 4, extended::lli)),
    (0x13, op(N::Lli, M::Absolute, 5, extended::lli)),
    (0x14, op(N::Sci, M::Direct, 5, extended::sci)),
    (0x15, op(N::Sci, M::Absolute, 6, extended::sci)),
    (0x20, op(N::Sd, M::Immediate32, 4, extended::sd)),
    (0x21, op(N::Sd, M::Direct, 5, extended::sd)),
    (0x22, op(N::Sb, M::Immediate32, 4, extended::sb)),
    (0x23, op(N::Sb, M::Direct, 5, extended::sb)),
    (0x24, op(N::Sd, M::Immediate32, 4, extended::sd)),
    (0x25, op(N::Sd, M::Direct, 5, extended::sd)),
    (0x30, op(N::Enr, M::Implied, 2, extended::enr)),
    (0x31, op(N::Dsr, M::Implied, 2, extended::dsr)),
    (0x40, op(N::Trap, M::Immediate8, 8, extended::trap)),
    (0x50, op(N::Fence, M::Implied, 2, ops::nop)),
    (0x51, op(N::Fencer, M::Implied, 2, ops::nop)),
    (0x52, op(N::Fencew, M::Implied, 2, ops::nop)),
    (0x60, op(N::Repe, M::Immediate8, 3, extended::repe)),
    (0x61, op(N::Sepe, M::Immediate8, 3, extended::sepe)),
    (0x70, op(N::Phd32, M::Implied, 4, extended::phd32)),
    (0x71, op(N::Pld32, M::Implied, 5, extended::pld32)),
    (0x72, op(N::Phb32, M::Implied, 4, extended::phb32)),
    (0x73, op(N::Plb32, M::Implied, 5, extended::plb32)),
    (0x74, op(N::Phvbr, M::Implied, 4, extended::phvbr)),
    (0x75, op(N::Plvbr, M::Implied, 5, extended::plvbr)),
    (0x86, op(N::Tta, M::Implied, 2, extended::tta)),
    (0x87, op(N::Tat, M::Implied, 2, extended::tat)),
    (0x88, op(N::Ldq, M::Direct, 6, extended::ldq)),
    (0x89, op(N::Ldq, M::Absolute, 7, extended::ldq)),
    (0x8A, op(N::Stq, M::Direct, 6, extended::stq)),
    (0x8B, op(N::Stq, M::Absolute, 7, extended::stq)),
    (0x91, op(N::Tab, M::Implied, 2, extended::tab)),
    (0x92, op(N::Tba, M::Implied, 2, extended::tba)),
    (0x93, op(N::Txb, M::Implied, 2, extended::txb)),
    (0x94, op(N::Tbx, M::Implied, 2, extended::tbx)),
    (0x95, op(N::Tyb, M::Implied, 2, extended::tyb)),
    (0x96, op(N::Tby, M::Implied, 2, extended::tby)),
    (0xA4, op(N::Tspb, M::Implied, 2, extended::tspb)),
    (0xA5, op(N::Tbsp, M::Implied, 2, extended::tbsp)),
    (0xA0, op(N::Lea, M::Direct, 3, extended::lea)),
    (0xA1, op(N::Lea, M::DirectX, 3, extended::lea)),
    (0xA2, op(N::Lea, M::Absolute, 4, extended::lea)),
    (0xA3, op(N::Lea, M::AbsoluteX, 4, extended::lea)),
    (0xE8, op(N::RegAlu, M::Implied, 5, extended::reg_alu)),
    (0xE9, op(N::Shift, M::Implied, 3, extended::barrel_shift)),
    (0xEA, op(N::Extend, M::Implied, 3, extended::extend)),
    (0xB0, op(N::Fpu, M::Skip(2), 2, ops::nop)),
    (0xB1, op(N::Fpu, M::Skip(3), 2, ops::nop)),
    (0xB2, op(N::Fpu, M::Skip(2), 2, ops::nop)),
    (0xB3, op(N::Fpu, M::Skip(3), 2, ops::nop)),
    (0xB4, op(N::Fpu, M::Skip(1), 2, ops::nop)),
    (0xB5, op(N::Fpu, M::Skip(1), 2, ops::nop)),
    (0xB6, op(N::Fpu, M::Skip(5), 2, ops::nop)),
    (0xB7, op(N::Fpu, M::Skip(5), 2, ops::nop)),
    (0xBA, op(N::Fpu, M::Skip(1), 2, ops::nop)),
    (0xBB, op(N::Fpu, M::Skip(1), 2, ops::nop)),
];

/// Register-to-register FPU encodings, each followed by one register byte.
const FPU_REGISTER_RANGES: [(u8, u8); 3] = [(0xC0, 0xCA), (0xD0, 0xDA), (0xE0, 0xE5)];

const fn place(
    mut table: [Option<Opcode>; 256],
    entries: &[(u8, Opcode)],
) -> [Option<Opcode>; 256] {
    let mut i = 0;
    while i < entries.len() {
        let (code, opcode) = entries[i];
        table[code as usize] = Some(opcode);
        i += 1;
    }
    table
}

const fn build_primary() -> [Option<Opcode>; 256] {
    let mut table = [None; 256];
    let mut g = 0;
    while g < ALU_GROUPS.len() {
        let (base, mnemonic, exec) = ALU_GROUPS[g];
        let mut m = 0;
        while m < ALU_GROUP_MODES.len() {
            let (offset, mode, cycles) = ALU_GROUP_MODES[m];
            table[(base + offset) as usize] = Some(op(mnemonic, mode, cycles, exec));
            m += 1;
        }
        g += 1;
    }
    let mut r = 0;
    while r < RMW_GROUPS.len() {
        let (acc, dp, dpx, abs, absx, mnemonic, exec) = RMW_GROUPS[r];
        table[acc as usize] = Some(op(mnemonic, M::Accumulator, 2, exec));
        table[dp as usize] = Some(op(mnemonic, M::Direct, 5, exec));
        table[dpx as usize] = Some(op(mnemonic, M::DirectX, 6, exec));
        table[abs as usize] = Some(op(mnemonic, M::Absolute, 6, exec));
        table[absx as usize] = Some(op(mnemonic, M::AbsoluteX, 7, exec));
        r += 1;
    }
    place(table, PRIMARY_ENCODINGS)
}

const fn build_extended() -> [Option<Opcode>; 256] {
    let mut table = [None; 256];
    let mut r = 0;
    while r < FPU_REGISTER_RANGES.len() {
        let (first, last) = FPU_REGISTER_RANGES[r];
        let mut code = first;
        while code <= last {
            table[code as usize] = Some(op(N::Fpu, M::Skip(1), 2, ops::nop));
            code += 1;
        }
        r += 1;
    }
    place(table, EXTENDED_ENCODINGS)
}

/// Unprefixed opcode table.
pub static PRIMARY_TABLE: [Option<Opcode>; 256] = build_primary();
/// `$02`-prefixed opcode table.
pub static EXTENDED_TABLE: [Option<Opcode>; 256] = build_extended();
/// `$42`-prefixed opcode table.
pub static WIDE_TABLE: [Option<Opcode>; 256] = place([None; 256], WIDE_ENCODINGS);

/// Looks up `opcode` in one opcode space; `None` is an undefined encoding.
#[must_use]
pub fn decode(space: OpcodeSpace, opcode: u8) -> Option<Opcode> {
    let table = match space {
        OpcodeSpace::Primary => &PRIMARY_TABLE,
        OpcodeSpace::Extended => &EXTENDED_TABLE,
        OpcodeSpace::Wide => &WIDE_TABLE,
    };
    table[usize::from(opcode)]
}
