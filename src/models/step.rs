use serde::{Deserialize, Serialize};
use std::fmt;
use uuid::Uuid;

/// Opaque identifier, unique per step instantiation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct StepId(Uuid);

impl StepId {
    pub fn new() -> Self {
        Self(Uuid::new_v4())
    }
}

impl Default for StepId {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Display for StepId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum StepStatus {
    Waiting,
    Pending,
    Submitted,
    Confirmed,
    Rejected,
    /// Finished without an on-chain write (pre-check already satisfied).
    Done,
}

impl StepStatus {
    fn rank(self) -> u8 {
        match self {
            StepStatus::Waiting => 0,
            StepStatus::Pending => 1,
            StepStatus::Submitted => 2,
            StepStatus::Confirmed => 3,
            StepStatus::Rejected | StepStatus::Done => 4,
        }
    }

    pub fn is_terminal(self) -> bool {
        matches!(
            self,
            StepStatus::Confirmed | StepStatus::Rejected | StepStatus::Done
        )
    }

    /// Terminal and not rejected: the next step may start.
    pub fn is_success(self) -> bool {
        matches!(self, StepStatus::Confirmed | StepStatus::Done)
    }

    /// Whether `self -> next` respects the step lifecycle. Re-applying the
    /// current status is allowed so patches can carry it alongside other
    /// fields.
    pub fn can_transition_to(self, next: StepStatus) -> bool {
        if self == next {
            return true;
        }
        if self.is_terminal() {
            return false;
        }
        match next {
            StepStatus::Rejected => true,
            StepStatus::Done => matches!(self, StepStatus::Waiting | StepStatus::Pending),
            _ => next.rank() > self.rank(),
        }
    }
}

impl fmt::Display for StepStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            StepStatus::Waiting => "WAITING",
            StepStatus::Pending => "PENDING",
            StepStatus::Submitted => "SUBMITTED",
            StepStatus::Confirmed => "CONFIRMED",
            StepStatus::Rejected => "REJECTED",
            StepStatus::Done => "DONE",
        };
        f.write_str(s)
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TransactionStep {
    pub id: StepId,
    pub description: String,
    pub status: StepStatus,
    pub tx_hash: Option<String>,
    pub error: Option<String>,
}

impl TransactionStep {
    pub fn new(description: impl Into<String>) -> Self {
        Self {
            id: StepId::new(),
            description: description.into(),
            status: StepStatus::Waiting,
            tx_hash: None,
            error: None,
        }
    }

    /// Apply `patch`, refusing a status change that breaks the lifecycle.
    /// Returns false when the status part of the patch was refused; the
    /// remaining fields are still applied.
    pub fn apply(&mut self, patch: &StepPatch) -> bool {
        if let Some(description) = &patch.description {
            self.description = description.clone();
        }
        if let Some(hash) = &patch.tx_hash {
            self.tx_hash = Some(hash.clone());
        }
        let mut accepted = true;
        if let Some(status) = patch.status {
            if self.status.can_transition_to(status) {
                self.status = status;
            } else {
                accepted = false;
            }
        }
        if let Some(error) = &patch.error {
            if self.status == StepStatus::Rejected {
                self.error = Some(error.clone());
            }
        }
        accepted
    }
}

/// Partial update for a step; `None` fields are left untouched.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct StepPatch {
    pub description: Option<String>,
    pub status: Option<StepStatus>,
    pub tx_hash: Option<String>,
    pub error: Option<String>,
}

impl StepPatch {
    pub fn status(status: StepStatus) -> Self {
        Self {
            status: Some(status),
            ..Default::default()
        }
    }

    pub fn description(description: impl Into<String>) -> Self {
        Self {
            description: Some(description.into()),
            ..Default::default()
        }
    }

    pub fn with_description(mut self, description: impl Into<String>) -> Self {
        self.description = Some(description.into());
        self
    }

    pub fn with_tx_hash(mut self, hash: impl Into<String>) -> Self {
        self.tx_hash = Some(hash.into());
        self
    }

    pub fn rejected(message: impl Into<String>) -> Self {
        Self {
            status: Some(StepStatus::Rejected),
            error: Some(message.into()),
            ..Default::default()
        }
    }
}

/// The user action currently shown in the transaction queue.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct TransactionBatch {
    pub title: String,
    pub purpose: String,
    pub steps: Vec<TransactionStep>,
}

impl TransactionBatch {
    pub fn step(&self, id: StepId) -> Option<&TransactionStep> {
        self.steps.iter().find(|s| s.id == id)
    }

    pub fn is_success(&self) -> bool {
        !self.steps.is_empty() && self.steps.iter().all(|s| s.status.is_success())
    }

    pub fn has_failed(&self) -> bool {
        self.steps.iter().any(|s| s.status == StepStatus::Rejected)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use StepStatus::*;

    #[test]
    fn test_forward_transitions() {
        assert!(Waiting.can_transition_to(Pending));
        assert!(Pending.can_transition_to(Submitted));
        assert!(Submitted.can_transition_to(Confirmed));
        assert!(Waiting.can_transition_to(Confirmed));
        assert!(!Submitted.can_transition_to(Pending));
        assert!(!Pending.can_transition_to(Waiting));
    }

    #[test]
    fn test_terminal_states_are_final() {
        for terminal in [Confirmed, Rejected, Done] {
            for next in [Waiting, Pending, Submitted, Confirmed, Rejected, Done] {
                assert_eq!(terminal.can_transition_to(next), terminal == next);
            }
        }
    }

    #[test]
    fn test_rejected_and_done_sources() {
        assert!(Waiting.can_transition_to(Rejected));
        assert!(Pending.can_transition_to(Rejected));
        assert!(Submitted.can_transition_to(Rejected));
        assert!(Waiting.can_transition_to(Done));
        assert!(Pending.can_transition_to(Done));
        assert!(!Submitted.can_transition_to(Done));
    }

    #[test]
    fn test_apply_refuses_backwards_status_but_keeps_description() {
        let mut step = TransactionStep::new("Swap");
        assert!(step.apply(&StepPatch::status(Confirmed)));
        let accepted = step.apply(&StepPatch::status(Pending).with_description("Swapped"));
        assert!(!accepted);
        assert_eq!(step.status, Confirmed);
        assert_eq!(step.description, "Swapped");
    }

    #[test]
    fn test_error_only_recorded_on_rejection() {
        let mut step = TransactionStep::new("Approve");
        step.apply(&StepPatch {
            error: Some("ignored".into()),
            ..Default::default()
        });
        assert_eq!(step.error, None);
        step.apply(&StepPatch::rejected("user denied"));
        assert_eq!(step.status, Rejected);
        assert_eq!(step.error.as_deref(), Some("user denied"));
    }

    #[test]
    fn test_batch_success_view() {
        let mut batch = TransactionBatch {
            title: "Swap".into(),
            purpose: "Swap A for B".into(),
            steps: vec![TransactionStep::new("a"), TransactionStep::new("b")],
        };
        assert!(!batch.is_success());
        batch.steps[0].status = Done;
        batch.steps[1].status = Confirmed;
        assert!(batch.is_success());
        assert!(!batch.has_failed());
        assert!(!TransactionBatch::default().is_success());
    }
}
