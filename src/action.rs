//! Confirmation flow for per-record edit and delete actions.
//!
//! Each record moves through `Idle -> ConfirmPending -> InFlight -> Idle`.
//! Records that are not tracked are idle. A record in flight cannot be
//! re-requested, confirmed again or cancelled until its call settles;
//! different records are tracked independently.

use std::collections::HashMap;

use crate::error::ControllerError;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ActionKind {
    Edit,
    Delete,
}

impl ActionKind {
    pub fn verb(self) -> &'static str {
        match self {
            ActionKind::Edit => "update",
            ActionKind::Delete => "delete",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ActionPhase {
    Idle,
    ConfirmPending(ActionKind),
    InFlight(ActionKind),
}

#[derive(Debug, Default)]
pub struct ActionTracker {
    phases: HashMap<String, ActionPhase>,
}

impl ActionTracker {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn phase(&self, id: &str) -> ActionPhase {
        self.phases.get(id).copied().unwrap_or(ActionPhase::Idle)
    }

    /// Whether the edit/delete controls for `id` should be enabled.
    pub fn is_enabled(&self, id: &str) -> bool {
        !matches!(self.phase(id), ActionPhase::InFlight(_))
    }

    /// Idle (or awaiting a different confirmation) -> ConfirmPending.
    pub fn request(&mut self, id: &str, kind: ActionKind) -> Result<(), ControllerError> {
        if let ActionPhase::InFlight(_) = self.phase(id) {
            return Err(ControllerError::ActionInFlight { id: id.to_string() });
        }
        self.phases
            .insert(id.to_string(), ActionPhase::ConfirmPending(kind));
        Ok(())
    }

    /// ConfirmPending(kind) -> InFlight(kind).
    pub fn confirm(&mut self, id: &str, kind: ActionKind) -> Result<(), ControllerError> {
        match self.phase(id) {
            ActionPhase::ConfirmPending(pending) if pending == kind => {
                self.phases.insert(id.to_string(), ActionPhase::InFlight(kind));
                Ok(())
            }
            ActionPhase::InFlight(_) => Err(ControllerError::ActionInFlight { id: id.to_string() }),
            _ => Err(ControllerError::NoPendingAction { id: id.to_string() }),
        }
    }

    /// ConfirmPending -> Idle. Returns false when there was nothing to cancel
    /// or the action is already in flight.
    pub fn cancel(&mut self, id: &str) -> bool {
        match self.phase(id) {
            ActionPhase::ConfirmPending(_) => {
                self.phases.remove(id);
                true
            }
            _ => false,
        }
    }

    /// InFlight -> Idle, whatever the outcome.
    pub fn settle(&mut self, id: &str) {
        if let Some(ActionPhase::InFlight(_)) = self.phases.get(id) {
            self.phases.remove(id);
        }
    }

    /// Ids with an action awaiting confirmation or in flight.
    pub fn active(&self) -> impl Iterator<Item = (&str, ActionPhase)> {
        self.phases.iter().map(|(id, phase)| (id.as_str(), *phase))
    }
}

#[cfg(test)]
mod tests {
    use super::ActionPhase::{ConfirmPending, Idle, InFlight};
    use super::*;

    #[test]
    fn full_cycle() {
        let mut tracker = ActionTracker::new();
        assert_eq!(tracker.phase("d1"), Idle);

        tracker.request("d1", ActionKind::Delete).unwrap();
        assert_eq!(tracker.phase("d1"), ConfirmPending(ActionKind::Delete));

        tracker.confirm("d1", ActionKind::Delete).unwrap();
        assert_eq!(tracker.phase("d1"), InFlight(ActionKind::Delete));
        assert!(!tracker.is_enabled("d1"));

        tracker.settle("d1");
        assert_eq!(tracker.phase("d1"), Idle);
        assert!(tracker.is_enabled("d1"));
    }

    #[test]
    fn cancel_discards_pending_only() {
        let mut tracker = ActionTracker::new();
        tracker.request("d1", ActionKind::Edit).unwrap();
        assert!(tracker.cancel("d1"));
        assert_eq!(tracker.phase("d1"), Idle);
        assert!(!tracker.cancel("d1"));

        tracker.request("d1", ActionKind::Edit).unwrap();
        tracker.confirm("d1", ActionKind::Edit).unwrap();
        assert!(!tracker.cancel("d1"));
        assert_eq!(tracker.phase("d1"), InFlight(ActionKind::Edit));
    }

    #[test]
    fn in_flight_blocks_same_record_only() {
        let mut tracker = ActionTracker::new();
        tracker.request("d1", ActionKind::Delete).unwrap();
        tracker.confirm("d1", ActionKind::Delete).unwrap();

        assert!(matches!(
            tracker.request("d1", ActionKind::Edit),
            Err(ControllerError::ActionInFlight { .. })
        ));
        assert!(matches!(
            tracker.confirm("d1", ActionKind::Delete),
            Err(ControllerError::ActionInFlight { .. })
        ));

        tracker.request("d2", ActionKind::Delete).unwrap();
        tracker.confirm("d2", ActionKind::Delete).unwrap();
        assert_eq!(tracker.active().count(), 2);
    }

    #[test]
    fn confirm_requires_matching_request() {
        let mut tracker = ActionTracker::new();
        assert!(matches!(
            tracker.confirm("d1", ActionKind::Delete),
            Err(ControllerError::NoPendingAction { .. })
        ));
        tracker.request("d1", ActionKind::Edit).unwrap();
        assert!(tracker.confirm("d1", ActionKind::Delete).is_err());
        assert_eq!(tracker.phase("d1"), ConfirmPending(ActionKind::Edit));
    }
}
