//! Cycle-driven system timer feeding the IRQ line.

/// Counter advances with retired cycles.
pub const TIMER_ENABLE: u8 = 0x01;
/// Counter returns to zero on compare match.
pub const TIMER_AUTORESET: u8 = 0x02;
/// Compare match raises the IRQ line.
pub const TIMER_IRQ_ENABLE: u8 = 0x04;
/// Write-one-to-clear for the pending flag.
pub const TIMER_IRQ_CLEAR: u8 = 0x08;
/// Read-only latched compare-match flag.
pub const TIMER_IRQ_PENDING: u8 = 0x80;

/// Control, compare and count registers plus the latched IRQ output.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
#[cfg_attr(feature = "serde", derive(serde::Deserialize, serde::Serialize))]
pub struct Timer {
    ctrl: u8,
    cmp: u32,
    cnt: u32,
    irq: bool,
}

impl Timer {
    /// Control register.
    #[must_use]
    pub const fn ctrl(&self) -> u8 {
        self.ctrl
    }

    /// Writes the control register.
    ///
    /// `IRQ_CLEAR` acknowledges a pending match; `PENDING` cannot be set by
    /// software and neither bit is stored.
    pub const fn write_ctrl(&mut self, value: u8) {
        if value & TIMER_IRQ_CLEAR != 0 {
            self.ctrl &= !TIMER_IRQ_PENDING;
            self.irq = false;
        }
        self.ctrl =
            (self.ctrl & TIMER_IRQ_PENDING) | (value & !(TIMER_IRQ_CLEAR | TIMER_IRQ_PENDING));
    }

    /// Compare register.
    #[must_use]
    pub const fn compare(&self) -> u32 {
        self.cmp
    }

    /// Writes the compare register.
    pub const fn set_compare(&mut self, value: u32) {
        self.cmp = value;
    }

    /// Counter register.
    #[must_use]
    pub const fn count(&self) -> u32 {
        self.cnt
    }

    /// Writes the counter register.
    pub const fn set_count(&mut self, value: u32) {
        self.cnt = value;
    }

    /// Returns `true` while the timer drives the IRQ line.
    #[must_use]
    pub const fn irq_asserted(&self) -> bool {
        self.irq
    }

    /// Advances the counter by `cycles` and evaluates the compare match.
    pub const fn tick(&mut self, cycles: u32) {
        if self.ctrl & TIMER_ENABLE == 0 {
            return;
        }
        self.cnt = self.cnt.wrapping_add(cycles);
        if self.cnt >= self.cmp {
            if self.ctrl & TIMER_IRQ_ENABLE != 0 {
                self.ctrl |= TIMER_IRQ_PENDING;
                self.irq = true;
            }
            if self.ctrl & TIMER_AUTORESET != 0 {
                self.cnt = 0;
            }
        }
    }
}
