//! Builder for fleet orchestrators.

use std::sync::Arc;
use std::time::Duration;

use super::FleetOrchestrator;
use crate::credentials::DEFAULT_ATTEMPTS;
use crate::driver::DriverSettings;
use crate::session::Connector;
use crate::transport::TransportConnector;

/// Default number of devices driven at once.
pub const DEFAULT_CONCURRENCY: usize = 10;

/// Builder for constructing a [`FleetOrchestrator`].
///
/// # Example
///
/// ```rust
/// use std::time::Duration;
/// use switchboot::driver::DriverSettings;
/// use switchboot::fleet::FleetBuilder;
///
/// let fleet = FleetBuilder::new()
///     .concurrency(4)
///     .deadline(Duration::from_secs(1800))
///     .driver_settings(DriverSettings::default().strict(true))
///     .build();
/// assert_eq!(fleet.concurrency(), 4);
/// ```
pub struct FleetBuilder<C> {
    connector: C,
    concurrency: usize,
    deadline: Option<Duration>,
    credential_attempts: u32,
    settings: DriverSettings,
}

impl FleetBuilder<TransportConnector> {
    /// Create a builder using the Telnet/SSH connector with default settings.
    pub fn new() -> Self {
        Self::with_connector(TransportConnector::default())
    }
}

impl Default for FleetBuilder<TransportConnector> {
    fn default() -> Self {
        Self::new()
    }
}

impl<C: Connector> FleetBuilder<C> {
    /// Create a builder over a custom connector.
    pub fn with_connector(connector: C) -> Self {
        Self {
            connector,
            concurrency: DEFAULT_CONCURRENCY,
            deadline: None,
            credential_attempts: DEFAULT_ATTEMPTS,
            settings: DriverSettings::default(),
        }
    }

    /// Replace the connector.
    pub fn connector<D: Connector>(self, connector: D) -> FleetBuilder<D> {
        FleetBuilder {
            connector,
            concurrency: self.concurrency,
            deadline: self.deadline,
            credential_attempts: self.credential_attempts,
            settings: self.settings,
        }
    }

    /// Maximum number of devices driven at once (default: 10).
    pub fn concurrency(mut self, workers: usize) -> Self {
        self.concurrency = workers.max(1);
        self
    }

    /// Time limit for the whole batch; reaching it cancels outstanding work.
    pub fn deadline(mut self, deadline: Duration) -> Self {
        self.deadline = Some(deadline);
        self
    }

    /// Entry/confirmation rounds allowed per secret (default: 3).
    pub fn credential_attempts(mut self, attempts: u32) -> Self {
        self.credential_attempts = attempts.max(1);
        self
    }

    pub fn driver_settings(mut self, settings: DriverSettings) -> Self {
        self.settings = settings;
        self
    }

    pub fn build(self) -> FleetOrchestrator<C> {
        FleetOrchestrator {
            connector: Arc::new(self.connector),
            concurrency: self.concurrency,
            deadline: self.deadline,
            credential_attempts: self.credential_attempts,
            settings: self.settings,
        }
    }
}
