//! Error types for switchboot.

use std::io;
use std::time::Duration;

use serde::Serialize;
use thiserror::Error;

/// Main error type for switchboot operations.
#[derive(Error, Debug)]
pub enum Error {
    /// Transport-level errors (TCP, SSH, authentication)
    #[error("Transport error: {0}")]
    Transport(#[from] TransportError),

    /// Channel operation errors
    #[error("Channel error: {0}")]
    Channel(#[from] ChannelError),

    /// Interaction driver errors
    #[error("Driver error: {0}")]
    Driver(#[from] DriverError),

    /// Unsupported device family or role
    #[error("Platform error: {0}")]
    Platform(#[from] PlatformError),

    /// Malformed or missing descriptor fields
    #[error("Validation error: {0}")]
    Validation(#[from] ValidationError),

    /// Credential resolution errors
    #[error("Credential error: {0}")]
    Credential(#[from] CredentialError),

    /// Device catalog errors
    #[error("Catalog error: {0}")]
    Catalog(#[from] CatalogError),
}

/// Transport layer errors (connection setup, authentication).
#[derive(Error, Debug)]
pub enum TransportError {
    /// Failed to connect to host
    #[error("Connection failed to {host}:{port}: {source}")]
    ConnectionFailed {
        host: String,
        port: u16,
        #[source]
        source: io::Error,
    },

    /// SSH handshake or protocol error
    #[error("SSH error: {0}")]
    Ssh(#[from] russh::Error),

    /// Authentication failed
    #[error("Authentication failed for user '{user}'")]
    AuthenticationFailed { user: String },

    /// SSH key error
    #[error("SSH key error: {0}")]
    Key(String),

    /// Host key not present in known_hosts (strict verification)
    #[error("Host key for {host}:{port} is not in known_hosts")]
    HostKeyUnknown { host: String, port: u16 },

    /// Host key differs from the one recorded in known_hosts
    #[error("Host key for {host}:{port} changed (known_hosts line {line})")]
    HostKeyChanged { host: String, port: u16, line: usize },

    /// known_hosts could not be read or written
    #[error("known_hosts error: {0}")]
    KnownHosts(String),

    /// Connection was closed unexpectedly
    #[error("Connection disconnected")]
    Disconnected,

    /// Operation timed out
    #[error("Operation timed out after {0:?}")]
    Timeout(Duration),

    /// I/O error
    #[error("I/O error: {0}")]
    Io(#[from] io::Error),
}

/// Channel layer errors (pattern matching, reads and writes).
#[derive(Error, Debug)]
pub enum ChannelError {
    /// Pattern matching timed out
    #[error("Pattern not found within {0:?}")]
    PatternTimeout(Duration),

    /// Peer closed the stream
    #[error("Channel closed")]
    Closed,

    /// Invalid regex pattern
    #[error("Invalid regex pattern: {0}")]
    InvalidPattern(#[from] regex::Error),
}

/// Interaction driver errors.
#[derive(Error, Debug)]
pub enum DriverError {
    /// Device rejected the login
    #[error("Authentication rejected by device: {detail}")]
    AuthenticationRejected { detail: String },

    /// No expected phrase or prompt followed a timing-sensitive step
    #[error("Unexpected prompt after '{command}': {tail:?}")]
    UnexpectedPrompt { command: String, tail: String },

    /// Device output matched a platform failure pattern (strict mode)
    #[error("Command '{command}' failed: {message}")]
    CommandFailed { command: String, message: String },

    /// Device forced a password change and the policy forbids skipping it
    #[error("Device requested a password change after '{command}'")]
    PasswordRotationRequired { command: String },

    /// Cancellation was requested
    #[error("Cancelled")]
    Cancelled,

    /// Per-device deadline exceeded
    #[error("Device deadline of {0:?} exceeded")]
    DeadlineExceeded(Duration),

    /// Worker terminated abnormally
    #[error("Worker failed: {message}")]
    Worker { message: String },
}

/// Device family / role support errors.
#[derive(Error, Debug)]
pub enum PlatformError {
    /// Family string does not name a supported device family
    #[error("Unsupported device type: '{family}'")]
    UnsupportedDevice { family: String },

    /// No command template exists for this family and role
    #[error("No command template for {family} {role}")]
    UnsupportedRole { family: String, role: String },
}

/// Descriptor validation errors.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ValidationError {
    /// Required field is absent or empty
    #[error("missing required field '{field}'")]
    MissingField { field: &'static str },

    /// Field is present but malformed
    #[error("invalid value for '{field}': {reason}")]
    InvalidField { field: &'static str, reason: String },
}

/// Credential resolution errors.
#[derive(Error, Debug)]
pub enum CredentialError {
    /// Confirmation did not match after the allowed attempts
    #[error("Secret confirmation did not match after {attempts} attempts")]
    Mismatch { attempts: u32 },

    /// The prompt collaborator could not supply input
    #[error("Credential prompt failed: {0}")]
    Prompt(String),
}

/// Device catalog errors.
#[derive(Error, Debug)]
pub enum CatalogError {
    /// Catalog file could not be read
    #[error("Failed to read catalog: {0}")]
    Io(#[from] io::Error),

    /// Catalog is not valid YAML of the expected shape
    #[error("Failed to parse catalog: {0}")]
    Yaml(#[from] serde_yaml::Error),

    /// A device entry is not a mapping of attributes
    #[error("Catalog entry '{name}' is malformed: {source}")]
    InvalidEntry {
        name: String,
        #[source]
        source: serde_yaml::Error,
    },
}

/// Failure classification carried in outcomes and reports.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum FailureKind {
    Validation,
    UnsupportedDevice,
    UnsupportedRole,
    CredentialMismatch,
    Session,
    UnexpectedPrompt,
    Cancelled,
    Internal,
}

impl Error {
    /// Classify this error for reporting.
    pub fn kind(&self) -> FailureKind {
        match self {
            Error::Transport(_) | Error::Channel(_) => FailureKind::Session,
            Error::Validation(_) | Error::Catalog(_) => FailureKind::Validation,
            Error::Platform(PlatformError::UnsupportedDevice { .. }) => {
                FailureKind::UnsupportedDevice
            }
            Error::Platform(PlatformError::UnsupportedRole { .. }) => FailureKind::UnsupportedRole,
            Error::Credential(_) => FailureKind::CredentialMismatch,
            Error::Driver(err) => match err {
                DriverError::AuthenticationRejected { .. }
                | DriverError::CommandFailed { .. }
                | DriverError::PasswordRotationRequired { .. }
                | DriverError::DeadlineExceeded(_) => FailureKind::Session,
                DriverError::UnexpectedPrompt { .. } => FailureKind::UnexpectedPrompt,
                DriverError::Cancelled => FailureKind::Cancelled,
                DriverError::Worker { .. } => FailureKind::Internal,
            },
        }
    }

    /// Whether this error represents a cancellation rather than a failure.
    pub fn is_cancelled(&self) -> bool {
        matches!(self, Error::Driver(DriverError::Cancelled))
    }
}

/// Result type alias using switchboot's Error.
pub type Result<T> = std::result::Result<T, Error>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_kind_classification() {
        let err: Error = ValidationError::MissingField { field: "host" }.into();
        assert_eq!(err.kind(), FailureKind::Validation);

        let err: Error = PlatformError::UnsupportedRole {
            family: "juniper".into(),
            role: "other".into(),
        }
        .into();
        assert_eq!(err.kind(), FailureKind::UnsupportedRole);

        let err: Error = ChannelError::Closed.into();
        assert_eq!(err.kind(), FailureKind::Session);

        let err: Error = DriverError::Cancelled.into();
        assert!(err.is_cancelled());
        assert_eq!(err.kind(), FailureKind::Cancelled);
    }

    #[test]
    fn test_validation_message_names_field() {
        let err = ValidationError::InvalidField {
            field: "port",
            reason: "not a number".into(),
        };
        assert_eq!(err.to_string(), "invalid value for 'port': not a number");
    }
}
