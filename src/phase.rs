//! Session loop state machine.

/// Where the session loop is in its read, dispatch, adopt cycle.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum LoopPhase {
    /// Shell created, loop not yet opened.
    #[default]
    Created,
    /// Between cycles.
    Idle,
    /// Waiting for a line or cancellation.
    AwaitingInput,
    /// Running a command.
    Dispatching,
    /// Loop finished; the closed signal has been marked.
    Closed,
}

impl LoopPhase {
    /// Check if transition to target phase is valid.
    ///
    /// Valid transitions:
    /// - Created -> Idle
    /// - Idle -> AwaitingInput
    /// - AwaitingInput -> Dispatching
    /// - AwaitingInput -> Closed
    /// - Dispatching -> Idle
    pub fn can_transition_to(&self, target: LoopPhase) -> bool {
        use LoopPhase::*;
        matches!(
            (*self, target),
            (Created, Idle)
                | (Idle, AwaitingInput)
                | (AwaitingInput, Dispatching)
                | (AwaitingInput, Closed)
                | (Dispatching, Idle)
        )
    }

    /// Attempt to transition to a new phase.
    ///
    /// Returns `Ok(())` if the transition is valid, or an error otherwise.
    pub fn transition_to(&mut self, target: LoopPhase) -> crate::Result<()> {
        if self.can_transition_to(target) {
            *self = target;
            Ok(())
        } else {
            Err(crate::error::ShellError::InvalidPhaseTransition {
                from: *self,
                to: target,
            })
        }
    }

    /// Check if this is the terminal phase.
    pub fn is_terminal(&self) -> bool {
        matches!(self, LoopPhase::Closed)
    }
}
