/// Host-observable execution state of the core.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
#[cfg_attr(feature = "serde", derive(serde::Deserialize, serde::Serialize))]
pub enum RunState {
    /// Fetching and executing instructions.
    #[default]
    Running,
    /// Parked by `WAI` until an interrupt is taken.
    Waiting,
    /// Parked by `STP`; only reset leaves this state.
    Stopped,
    /// Paused by the host, a breakpoint hook or a privilege violation.
    Paused,
}

impl RunState {
    /// Returns `true` when `step` makes progress (running or waiting).
    #[must_use]
    pub const fn accepts_steps(self) -> bool {
        matches!(self, Self::Running | Self::Waiting)
    }

    /// Returns `true` only while instructions are being executed.
    #[must_use]
    pub const fn is_executing(self) -> bool {
        matches!(self, Self::Running)
    }
}

#[cfg(test)]
mod tests {
    use super::RunState;

    #[test]
    fn run_state_default_is_running() {
        assert_eq!(RunState::default(), RunState::Running);
    }

    #[test]
    fn waiting_accepts_steps_but_is_not_executing() {
        assert!(RunState::Waiting.accepts_steps());
        assert!(!RunState::Waiting.is_executing());
        assert!(!RunState::Stopped.accepts_steps());
        assert!(!RunState::Paused.accepts_steps());
        assert!(RunState::Running.is_executing());
    }
}
