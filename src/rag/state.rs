//! Per-turn pipeline state machine
//!
//! One machine runs per user turn:
//! - Safety: retrieval and generation are unreachable from `Rejected`
//! - Liveness: every accepted turn ends in `Done` or `Rejected`
//! - Determinism: unique next state per event

use serde::{Deserialize, Serialize};

use crate::errors::{ChatError, Result};

/// Turn pipeline states
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum TurnState {
    /// Waiting for the next utterance
    AwaitingInput,
    /// Guardrail classification in flight
    Validating,
    /// Knowledge-base retrieval in flight
    Retrieving,
    /// Building context and references
    Assembling,
    /// Answer generation in flight
    Generating,
    /// Composing the final assistant message
    Formatting,
    /// Answer delivered (terminal)
    Done,
    /// Question refused by the guardrail (terminal)
    Rejected,
}

/// Events that trigger state transitions
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum TurnEvent {
    /// Non-empty utterance submitted
    Submitted,
    /// Classifier allowed the question
    Approved,
    /// Classifier refused the question or failed
    Refused,
    /// Retrieval finished, with or without hits
    Retrieved,
    /// Context assembled and worth generating from
    ContextReady,
    /// Nothing to ground on and no references to show
    NoContext,
    /// Generator returned, successfully or not
    Generated,
    /// Final message composed
    Formatted,
}

impl TurnState {
    /// Check if this is a terminal state
    pub fn is_terminal(&self) -> bool {
        matches!(self, TurnState::Done | TurnState::Rejected)
    }

    /// Attempt state transition with validation
    ///
    /// Valid transitions:
    /// 1. AwaitingInput -> Validating  (on: Submitted)
    /// 2. Validating    -> Rejected    (on: Refused)
    /// 3. Validating    -> Retrieving  (on: Approved)
    /// 4. Retrieving    -> Assembling  (on: Retrieved)
    /// 5. Assembling    -> Generating  (on: ContextReady)
    /// 6. Assembling    -> Formatting  (on: NoContext)
    /// 7. Generating    -> Formatting  (on: Generated)
    /// 8. Formatting    -> Done        (on: Formatted)
    /// 9. Done, Rejected               (terminal self-loops)
    pub fn transition(&self, event: TurnEvent) -> Result<TurnState> {
        use TurnEvent::*;
        use TurnState::*;

        let next_state = match (self, event) {
            (AwaitingInput, Submitted) => Validating,

            (Validating, Refused) => Rejected,
            (Validating, Approved) => Retrieving,

            (Retrieving, Retrieved) => Assembling,

            (Assembling, ContextReady) => Generating,
            (Assembling, NoContext) => Formatting,

            (Generating, Generated) => Formatting,

            (Formatting, Formatted) => Done,

            // Terminal states (self-loops)
            (Done, _) => Done,
            (Rejected, _) => Rejected,

            (from, event) => {
                return Err(ChatError::InvalidTransition {
                    from: format!("{:?}", from),
                    event: format!("{:?}", event),
                });
            }
        };

        Ok(next_state)
    }

    /// Get all valid events from this state
    pub fn valid_events(&self) -> Vec<TurnEvent> {
        use TurnEvent::*;
        use TurnState::*;

        match self {
            AwaitingInput => vec![Submitted],
            Validating => vec![Approved, Refused],
            Retrieving => vec![Retrieved],
            Assembling => vec![ContextReady, NoContext],
            Generating => vec![Generated],
            Formatting => vec![Formatted],
            Done | Rejected => vec![],
        }
    }

    /// Human-readable state name
    pub fn display_name(&self) -> &'static str {
        match self {
            TurnState::AwaitingInput => "Awaiting input",
            TurnState::Validating => "Checking question",
            TurnState::Retrieving => "Searching knowledge base",
            TurnState::Assembling => "Assembling context",
            TurnState::Generating => "Generating answer",
            TurnState::Formatting => "Formatting",
            TurnState::Done => "Done",
            TurnState::Rejected => "Rejected",
        }
    }
}

/// Records every state a turn passes through
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TurnMachine {
    current: TurnState,
    trace: Vec<TurnState>,
}

impl TurnMachine {
    pub fn new() -> Self {
        Self {
            current: TurnState::AwaitingInput,
            trace: vec![TurnState::AwaitingInput],
        }
    }

    /// Apply an event and remember the resulting state
    pub fn advance(&mut self, event: TurnEvent) -> Result<TurnState> {
        let next = self.current.transition(event)?;
        tracing::trace!(from = ?self.current, to = next.display_name(), "turn transition");
        self.current = next;
        self.trace.push(next);
        Ok(next)
    }

    pub fn current(&self) -> TurnState {
        self.current
    }

    pub fn trace(&self) -> &[TurnState] {
        &self.trace
    }

    pub fn into_trace(self) -> Vec<TurnState> {
        self.trace
    }
}

impl Default for TurnMachine {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_valid_transitions() {
        assert_eq!(
            TurnState::AwaitingInput.transition(TurnEvent::Submitted).unwrap(),
            TurnState::Validating
        );
        assert_eq!(
            TurnState::Validating.transition(TurnEvent::Refused).unwrap(),
            TurnState::Rejected
        );
        assert_eq!(
            TurnState::Validating.transition(TurnEvent::Approved).unwrap(),
            TurnState::Retrieving
        );
        assert_eq!(
            TurnState::Retrieving.transition(TurnEvent::Retrieved).unwrap(),
            TurnState::Assembling
        );
        assert_eq!(
            TurnState::Assembling.transition(TurnEvent::ContextReady).unwrap(),
            TurnState::Generating
        );
        assert_eq!(
            TurnState::Assembling.transition(TurnEvent::NoContext).unwrap(),
            TurnState::Formatting
        );
        assert_eq!(
            TurnState::Generating.transition(TurnEvent::Generated).unwrap(),
            TurnState::Formatting
        );
        assert_eq!(
            TurnState::Formatting.transition(TurnEvent::Formatted).unwrap(),
            TurnState::Done
        );
    }

    #[test]
    fn test_terminal_states() {
        assert!(TurnState::Done.is_terminal());
        assert!(TurnState::Rejected.is_terminal());
        assert!(!TurnState::AwaitingInput.is_terminal());
        assert!(!TurnState::Generating.is_terminal());
    }

    #[test]
    fn test_rejected_cannot_reach_retrieval() {
        for event in [TurnEvent::Approved, TurnEvent::Retrieved, TurnEvent::ContextReady] {
            assert_eq!(
                TurnState::Rejected.transition(event).unwrap(),
                TurnState::Rejected
            );
        }
    }

    #[test]
    fn test_invalid_transitions() {
        assert!(TurnState::AwaitingInput.transition(TurnEvent::Approved).is_err());
        assert!(TurnState::Retrieving.transition(TurnEvent::Generated).is_err());
        assert!(TurnState::Generating.transition(TurnEvent::NoContext).is_err());
    }

    #[test]
    fn test_valid_events_agree_with_transition() {
        for state in [
            TurnState::AwaitingInput,
            TurnState::Validating,
            TurnState::Retrieving,
            TurnState::Assembling,
            TurnState::Generating,
            TurnState::Formatting,
        ] {
            for event in state.valid_events() {
                assert!(state.transition(event).is_ok(), "{:?} on {:?}", state, event);
            }
        }
    }

    #[test]
    fn test_machine_trace() {
        let mut machine = TurnMachine::new();
        machine.advance(TurnEvent::Submitted).unwrap();
        machine.advance(TurnEvent::Refused).unwrap();

        assert_eq!(machine.current(), TurnState::Rejected);
        assert_eq!(
            machine.trace(),
            &[TurnState::AwaitingInput, TurnState::Validating, TurnState::Rejected]
        );
    }
}
