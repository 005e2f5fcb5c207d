//! Per-device outcome and transcript types.

use std::time::Duration;

use serde::{Serialize, Serializer};

use crate::error::{Error, FailureKind};
use crate::script::ExecutionMode;

/// Interaction driver states.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum DriverState {
    Connected,
    /// Juniper root login.
    Authenticating,
    Executing,
    Committing,
    /// Terminal, success.
    Disconnected,
    /// Terminal, failure.
    Aborted,
    /// Terminal, stopped by cancellation.
    Cancelled,
}

impl DriverState {
    pub fn is_terminal(self) -> bool {
        matches!(self, Self::Disconnected | Self::Aborted | Self::Cancelled)
    }
}

/// One request/response pair.
#[derive(Debug, Clone, Serialize)]
pub struct Exchange {
    /// What was sent (redacted form for secrets).
    pub request: String,

    /// Raw device output.
    pub response: String,

    /// Prompt observed after the response.
    pub prompt: String,

    /// How the response was read.
    pub mode: ExecutionMode,

    /// Driver state when the request was sent.
    pub state: DriverState,

    #[serde(rename = "elapsed_ms", serialize_with = "as_millis")]
    pub elapsed: Duration,

    /// Platform failure pattern found in the response.
    pub failure: Option<String>,
}

/// Final status of one device.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum OutcomeStatus {
    Success,
    Failed,
    Cancelled,
}

/// Result of driving one device.
#[derive(Debug, Clone, Serialize)]
pub struct SessionOutcome {
    pub device: String,
    pub status: OutcomeStatus,
    pub transcript: Vec<Exchange>,
    pub error: Option<String>,
    pub failure_kind: Option<FailureKind>,
    pub final_state: DriverState,
    pub warnings: Vec<String>,
    #[serde(rename = "elapsed_ms", serialize_with = "as_millis")]
    pub elapsed: Duration,
}

impl SessionOutcome {
    /// Outcome for a device that failed before (or without) a session.
    pub fn failed(device: impl Into<String>, error: &Error, elapsed: Duration) -> Self {
        let cancelled = error.is_cancelled();
        Self {
            device: device.into(),
            status: if cancelled {
                OutcomeStatus::Cancelled
            } else {
                OutcomeStatus::Failed
            },
            transcript: Vec::new(),
            error: Some(error.to_string()),
            failure_kind: Some(error.kind()),
            final_state: if cancelled {
                DriverState::Cancelled
            } else {
                DriverState::Aborted
            },
            warnings: Vec::new(),
            elapsed,
        }
    }

    /// Outcome for a device that never started.
    pub fn cancelled(device: impl Into<String>) -> Self {
        Self {
            device: device.into(),
            status: OutcomeStatus::Cancelled,
            transcript: Vec::new(),
            error: Some("cancelled before start".to_string()),
            failure_kind: Some(FailureKind::Cancelled),
            final_state: DriverState::Cancelled,
            warnings: Vec::new(),
            elapsed: Duration::ZERO,
        }
    }

    pub fn is_success(&self) -> bool {
        self.status == OutcomeStatus::Success
    }
}

fn as_millis<S: Serializer>(duration: &Duration, serializer: S) -> Result<S::Ok, S::Error> {
    serializer.serialize_u64(u64::try_from(duration.as_millis()).unwrap_or(u64::MAX))
}
