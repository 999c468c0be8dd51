//! System-register window accesses.
//!
//! Aligned 32-bit accesses hit a register directly; narrower or misaligned
//! accesses compose byte by byte into the enclosing register, so a byte write
//! is a read-modify-write of that register.

#![allow(clippy::cast_possible_truncation)]

use crate::memory::SystemRegister;
use crate::{CpuState, Width};

impl CpuState {
    pub(crate) fn sysreg_read(&mut self, addr: u32, width: Width) -> u32 {
        if !self.regs.is_supervisor() {
            self.privilege_violation(self.inst_pc);
            return 0;
        }
        if width == Width::Long && addr & 3 == 0 {
            return self.sysreg_load(SystemRegister::decode(addr));
        }
        (0..width.bytes()).fold(0, |acc, i| {
            let byte_addr = addr.wrapping_add(i);
            let word = self.sysreg_load(SystemRegister::decode(byte_addr));
            acc | (((word >> ((byte_addr & 3) * 8)) & 0xFF) << (i * 8))
        })
    }

    pub(crate) fn sysreg_write(&mut self, addr: u32, value: u32, width: Width) {
        if !self.regs.is_supervisor() {
            self.privilege_violation(self.inst_pc);
            return;
        }
        if width == Width::Long && addr & 3 == 0 {
            if let Some(reg) = SystemRegister::decode(addr) {
                self.sysreg_store(reg, value);
            }
            return;
        }
        for i in 0..width.bytes() {
            let byte_addr = addr.wrapping_add(i);
            let Some(reg) = SystemRegister::decode(byte_addr) else {
                continue;
            };
            let shift = (byte_addr & 3) * 8;
            let current = self.sysreg_load(Some(reg));
            let byte = (value >> (i * 8)) & 0xFF;
            self.sysreg_store(reg, (current & !(0xFF << shift)) | (byte << shift));
        }
    }

    fn sysreg_load(&self, reg: Option<SystemRegister>) -> u32 {
        match reg {
            Some(SystemRegister::Mmucr) => self.mmu.mmucr(),
            Some(SystemRegister::Asid) => u32::from(self.mmu.asid()),
            Some(SystemRegister::FaultVa) => self.mmu.faultva(),
            Some(SystemRegister::PtbrLo) => self.mmu.ptbr() as u32,
            Some(SystemRegister::PtbrHi) => (self.mmu.ptbr() >> 32) as u32,
            Some(SystemRegister::TimerCtrl) => u32::from(self.timer.ctrl()),
            Some(SystemRegister::TimerCmp) => self.timer.compare(),
            Some(SystemRegister::TimerCnt) => self.timer.count(),
            Some(SystemRegister::TlbInval | SystemRegister::AsidInval | SystemRegister::TlbFlush)
            | None => 0,
        }
    }

    fn sysreg_store(&mut self, reg: SystemRegister, value: u32) {
        match reg {
            SystemRegister::Mmucr => self.mmu.set_mmucr(value),
            SystemRegister::TlbInval => self.mmu.invalidate_va(value),
            SystemRegister::Asid => self.mmu.set_asid(value as u8),
            SystemRegister::AsidInval => self.mmu.invalidate_asid(value as u8),
            SystemRegister::FaultVa => {}
            SystemRegister::PtbrLo => {
                let ptbr = self.mmu.ptbr();
                self.mmu.set_ptbr((ptbr & 0xFFFF_FFFF_0000_0000) | u64::from(value));
            }
            SystemRegister::PtbrHi => {
                let ptbr = self.mmu.ptbr();
                self.mmu.set_ptbr((ptbr & 0xFFFF_FFFF) | (u64::from(value) << 32));
            }
            SystemRegister::TlbFlush => self.mmu.flush(),
            SystemRegister::TimerCtrl => self.timer.write_ctrl(value as u8),
            SystemRegister::TimerCmp => self.timer.set_compare(value),
            SystemRegister::TimerCnt => self.timer.set_count(value),
        }
    }
}

#[cfg(test)]
mod tests {
    use crate::memory::SystemRegister;
    use crate::mmu::{MMUCR_FTYPE_MASK, MMUCR_PG};
    use crate::timer::{TIMER_ENABLE, TIMER_IRQ_PENDING};
    use crate::{CpuState, MmuFault, RunState, TrapKind, Width, P_S};

    fn supervisor_core() -> CpuState {
        let mut cpu = CpuState::default();
        cpu.reset();
        cpu
    }

    #[test]
    fn ptbr_halves_compose_a_64_bit_base() {
        let mut cpu = supervisor_core();
        cpu.write(SystemRegister::PtbrLo.address(), 0x0002_0000, Width::Long);
        cpu.write(SystemRegister::PtbrHi.address(), 0x1, Width::Long);
        assert_eq!(cpu.mmu().ptbr(), 0x1_0002_0000);
        assert_eq!(cpu.read(SystemRegister::PtbrHi.address(), Width::Long), 1);
    }

    #[test]
    fn byte_writes_modify_one_lane_of_the_register() {
        let mut cpu = supervisor_core();
        cpu.write(SystemRegister::TimerCmp.address(), 0x1122_3344, Width::Long);
        cpu.write(SystemRegister::TimerCmp.address() + 2, 0xAA, Width::Byte);
        assert_eq!(cpu.timer().compare(), 0x11AA_3344);
        assert_eq!(cpu.read(SystemRegister::TimerCmp.address() + 1, Width::Word), 0xAA33);
    }

    #[test]
    fn mmucr_fault_type_is_read_only() {
        let mut cpu = supervisor_core();
        cpu.mmu.record_fault(0x1234, MmuFault::WriteProtect);
        cpu.write(SystemRegister::Mmucr.address(), MMUCR_PG | MMUCR_FTYPE_MASK, Width::Long);
        assert_eq!(cpu.mmu().fault_type(), Some(MmuFault::WriteProtect));
        assert!(cpu.mmu().paging_enabled());
        cpu.write(SystemRegister::FaultVa.address(), 0, Width::Long);
        assert_eq!(cpu.read(SystemRegister::FaultVa.address(), Width::Long), 0x1234);
    }

    #[test]
    fn timer_pending_bit_is_visible_but_not_writable() {
        let mut cpu = supervisor_core();
        let ctrl = u32::from(TIMER_ENABLE | TIMER_IRQ_PENDING);
        cpu.write(SystemRegister::TimerCtrl.address(), ctrl, Width::Byte);
        assert_eq!(
            cpu.read(SystemRegister::TimerCtrl.address(), Width::Byte),
            u32::from(TIMER_ENABLE)
        );
    }

    #[test]
    fn user_mode_write_pauses_without_side_effects() {
        let mut cpu = supervisor_core();
        cpu.set_flag(P_S, false);
        cpu.write(SystemRegister::Mmucr.address(), MMUCR_PG, Width::Long);
        assert!(!cpu.mmu().paging_enabled());
        assert_eq!(cpu.last_trap().kind, TrapKind::Privilege);
        assert_eq!(cpu.run_state(), RunState::Paused);
    }

    #[test]
    fn undefined_window_offsets_read_zero() {
        let mut cpu = supervisor_core();
        assert_eq!(cpu.read(crate::SYSREG_BASE + 0x80, Width::Long), 0);
    }
}
