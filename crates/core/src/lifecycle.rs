//! Task lifecycle state machine.
//!
//! This module lives in `core` (zero internal deps) so it can be used by
//! both the pipeline and the repository layer. The status IDs match the
//! `task_statuses` seed data in the db crate (1-based SMALLINT).

// ---------------------------------------------------------------------------
// State machine
// ---------------------------------------------------------------------------

/// Task status IDs matching `task_statuses` seed data.
///
/// Intentionally kept as raw SMALLINT values here; the `db` crate owns
/// the typed `TaskStatus` enum with the same discriminants.
pub mod state_machine {
    /// Returns the set of valid target status IDs reachable from `from_status`.
    ///
    /// Terminal states (Succeeded=3, Failed=4, Cancelled=5) return an
    /// empty slice because tasks are immutable once terminal; a retry is
    /// a fresh task row, never an in-place transition.
    pub fn valid_transitions(from_status: i16) -> &'static [i16] {
        match from_status {
            // Pending -> Running, Cancelled
            1 => &[2, 5],
            // Running -> Succeeded, Failed, Cancelled
            2 => &[3, 4, 5],
            // Terminal states: Succeeded, Failed, Cancelled
            3 | 4 | 5 => &[],
            // Unknown status: no transitions allowed
            _ => &[],
        }
    }

    /// Check whether a transition from `from` to `to` is valid.
    pub fn can_transition(from: i16, to: i16) -> bool {
        valid_transitions(from).contains(&to)
    }

    /// Validate a state transition, returning an error message for invalid ones.
    ///
    /// A rejected transition is a programming error in the orchestrator
    /// (e.g. double-start), so callers report it rather than retry it.
    pub fn validate_transition(from: i16, to: i16) -> Result<(), String> {
        if can_transition(from, to) {
            Ok(())
        } else {
            let from_name = status_name(from);
            let to_name = status_name(to);
            Err(format!(
                "Invalid task transition: {from_name} ({from}) -> {to_name} ({to})"
            ))
        }
    }

    /// Whether a status ID is terminal (no outgoing transitions).
    pub fn is_terminal(status: i16) -> bool {
        matches!(status, 3 | 4 | 5)
    }

    /// Human-readable name for a status ID (for error messages).
    fn status_name(id: i16) -> &'static str {
        match id {
            1 => "Pending",
            2 => "Running",
            3 => "Succeeded",
            4 => "Failed",
            5 => "Cancelled",
            _ => "Unknown",
        }
    }
}

#[cfg(test)]
mod tests {
    use super::state_machine::*;

    // -----------------------------------------------------------------------
    // Valid transitions
    // -----------------------------------------------------------------------

    #[test]
    fn pending_to_running() {
        assert!(can_transition(1, 2));
    }

    #[test]
    fn pending_to_cancelled() {
        assert!(can_transition(1, 5));
    }

    #[test]
    fn running_to_succeeded() {
        assert!(can_transition(2, 3));
    }

    #[test]
    fn running_to_failed() {
        assert!(can_transition(2, 4));
    }

    #[test]
    fn running_to_cancelled() {
        assert!(can_transition(2, 5));
    }

    // -----------------------------------------------------------------------
    // Terminal states have no outgoing transitions
    // -----------------------------------------------------------------------

    #[test]
    fn succeeded_has_no_transitions() {
        assert!(valid_transitions(3).is_empty());
    }

    #[test]
    fn failed_has_no_transitions() {
        assert!(valid_transitions(4).is_empty());
    }

    #[test]
    fn cancelled_has_no_transitions() {
        assert!(valid_transitions(5).is_empty());
    }

    // -----------------------------------------------------------------------
    // Invalid transitions
    // -----------------------------------------------------------------------

    #[test]
    fn pending_to_succeeded_invalid() {
        assert!(!can_transition(1, 3));
    }

    #[test]
    fn pending_to_failed_invalid() {
        assert!(!can_transition(1, 4));
    }

    #[test]
    fn running_to_running_invalid() {
        // Double-start is a programming error, not a retryable condition.
        assert!(!can_transition(2, 2));
    }

    #[test]
    fn failed_to_pending_invalid() {
        // Retries create a fresh task; a failed row never goes back.
        assert!(!can_transition(4, 1));
    }

    #[test]
    fn cancelled_to_running_invalid() {
        assert!(!can_transition(5, 2));
    }

    // -----------------------------------------------------------------------
    // Helpers
    // -----------------------------------------------------------------------

    #[test]
    fn terminal_detection() {
        assert!(!is_terminal(1));
        assert!(!is_terminal(2));
        assert!(is_terminal(3));
        assert!(is_terminal(4));
        assert!(is_terminal(5));
    }

    #[test]
    fn validate_transition_ok() {
        assert!(validate_transition(1, 2).is_ok());
    }

    #[test]
    fn validate_transition_err_is_descriptive() {
        let err = validate_transition(3, 2).unwrap_err();
        assert!(err.contains("Succeeded"));
        assert!(err.contains("Running"));
    }

    #[test]
    fn unknown_status_has_no_transitions() {
        assert!(valid_transitions(99).is_empty());
    }
}
