//! State machine trait for lifecycle enums.
//!
//! Gives lifecycle enums (such as the client session state) one way to
//! validate transitions.

use super::ValidationError;

/// Trait for status enums that represent state machines.
///
/// # Example
///
/// ```ignore
/// impl StateMachine for SessionState {
///     fn can_transition_to(&self, target: &Self) -> bool {
///         matches!((self, target), (Disconnected, Connecting) | (Connecting, Open) /* ... */)
///     }
///
///     fn valid_transitions(&self) -> Vec<Self> { /* ... */ }
/// }
///
/// let next = state.transition_to(SessionState::Open)?;
/// ```
pub trait StateMachine: Sized + Copy + PartialEq + std::fmt::Debug {
    /// Returns true if transition from self to target is valid.
    fn can_transition_to(&self, target: &Self) -> bool;

    /// Returns all valid target states from current state.
    fn valid_transitions(&self) -> Vec<Self>;

    /// Performs transition with validation, returning error if invalid.
    fn transition_to(&self, target: Self) -> Result<Self, ValidationError> {
        if self.can_transition_to(&target) {
            Ok(target)
        } else {
            Err(ValidationError::invalid_format(
                "state_transition",
                format!("Cannot transition from {:?} to {:?}", self, target),
            ))
        }
    }

    /// Checks if current state is terminal (no valid outgoing transitions).
    fn is_terminal(&self) -> bool {
        self.valid_transitions().is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[derive(Debug, Clone, Copy, PartialEq, Eq)]
    enum Door {
        Closed,
        Open,
        Locked,
        Removed,
    }

    impl StateMachine for Door {
        fn can_transition_to(&self, target: &Self) -> bool {
            self.valid_transitions().contains(target)
        }

        fn valid_transitions(&self) -> Vec<Self> {
            use Door::*;
            match self {
                Closed => vec![Open, Locked, Removed],
                Open => vec![Closed],
                Locked => vec![Closed],
                Removed => vec![],
            }
        }
    }

    #[test]
    fn transition_to_succeeds_for_valid_transition() {
        assert_eq!(Door::Closed.transition_to(Door::Open), Ok(Door::Open));
    }

    #[test]
    fn transition_to_fails_for_invalid_transition() {
        assert!(Door::Open.transition_to(Door::Locked).is_err());
    }

    #[test]
    fn is_terminal_only_for_states_without_exits() {
        assert!(Door::Removed.is_terminal());
        assert!(!Door::Locked.is_terminal());
    }
}
