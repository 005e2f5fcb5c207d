//! Aggregated batch result.

use indexmap::IndexMap;
use serde::Serialize;

use crate::driver::{OutcomeStatus, SessionOutcome};

/// Outcome of every device in a batch, in input order.
#[derive(Debug, Clone, Default, Serialize)]
#[serde(transparent)]
pub struct BatchResult {
    outcomes: IndexMap<String, SessionOutcome>,
}

impl BatchResult {
    pub(crate) fn new(outcomes: IndexMap<String, SessionOutcome>) -> Self {
        Self { outcomes }
    }

    /// Outcome for one device.
    pub fn get(&self, device: &str) -> Option<&SessionOutcome> {
        self.outcomes.get(device)
    }

    pub fn iter(&self) -> impl Iterator<Item = &SessionOutcome> {
        self.outcomes.values()
    }

    pub fn len(&self) -> usize {
        self.outcomes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.outcomes.is_empty()
    }

    pub fn succeeded(&self) -> impl Iterator<Item = &SessionOutcome> {
        self.with_status(OutcomeStatus::Success)
    }

    pub fn failed(&self) -> impl Iterator<Item = &SessionOutcome> {
        self.with_status(OutcomeStatus::Failed)
    }

    pub fn cancelled(&self) -> impl Iterator<Item = &SessionOutcome> {
        self.with_status(OutcomeStatus::Cancelled)
    }

    /// Whether every device succeeded.
    pub fn all_succeeded(&self) -> bool {
        self.iter().all(SessionOutcome::is_success)
    }

    fn with_status(&self, status: OutcomeStatus) -> impl Iterator<Item = &SessionOutcome> {
        self.iter().filter(move |outcome| outcome.status == status)
    }
}

impl FromIterator<SessionOutcome> for BatchResult {
    fn from_iter<I: IntoIterator<Item = SessionOutcome>>(outcomes: I) -> Self {
        Self::new(
            outcomes
                .into_iter()
                .map(|outcome| (outcome.device.clone(), outcome))
                .collect(),
        )
    }
}

impl<'a> IntoIterator for &'a BatchResult {
    type Item = &'a SessionOutcome;
    type IntoIter = indexmap::map::Values<'a, String, SessionOutcome>;

    fn into_iter(self) -> Self::IntoIter {
        self.outcomes.values()
    }
}

#[cfg(test)]
mod tests {
    use std::time::Duration;

    use super::*;
    use crate::error::{Error, TransportError};

    fn batch() -> BatchResult {
        let refused: Error = TransportError::Disconnected.into();
        [
            SessionOutcome::failed("SW2", &refused, Duration::ZERO),
            SessionOutcome::cancelled("SW1"),
        ]
        .into_iter()
        .collect()
    }

    #[test]
    fn test_counts() {
        let result = batch();
        assert_eq!(result.len(), 2);
        assert_eq!(result.failed().count(), 1);
        assert_eq!(result.cancelled().count(), 1);
        assert_eq!(result.succeeded().count(), 0);
        assert!(!result.all_succeeded());
        assert!(BatchResult::default().all_succeeded());
    }

    #[test]
    fn test_serializes_as_ordered_map() {
        let json = serde_json::to_string(&batch()).unwrap();
        let sw2 = json.find("\"SW2\"").unwrap();
        let sw1 = json.find("\"SW1\"").unwrap();
        assert!(sw2 < sw1);

        let value: serde_json::Value = serde_json::from_str(&json).unwrap();
        assert_eq!(value["SW2"]["status"], "Failed");
        assert_eq!(value["SW2"]["failure_kind"], "Session");
    }
}
