//! Session capability consumed by the interaction driver.
//!
//! A [`Session`] is an interactive line-mode channel to exactly one device.
//! The driver only ever talks to this trait, so Telnet and SSH are
//! interchangeable, and tests can substitute a scripted double.

use std::future::Future;
use std::sync::Arc;
use std::time::Duration;

use crate::credentials::Credentials;
use crate::device::DeviceDescriptor;
use crate::error::Result;

/// Interactive channel to one device.
pub trait Session: Send {
    /// Send a line and wait for the device's standard prompt.
    fn send(&mut self, text: &str) -> impl Future<Output = Result<String>> + Send;

    /// Send a line and collect output until the device has been quiet for `delay`.
    ///
    /// No prompt is awaited; used for commands that may not return one.
    fn send_with_timing(
        &mut self,
        text: &str,
        delay: Duration,
    ) -> impl Future<Output = Result<String>> + Send;

    /// Last prompt observed on the session.
    fn current_prompt(&self) -> &str;

    /// Release the session.
    fn disconnect(&mut self) -> impl Future<Output = Result<()>> + Send;
}

/// Opens sessions for the fleet orchestrator.
pub trait Connector: Send + Sync + 'static {
    /// Session type produced by this connector.
    type Session: Session + 'static;

    /// Open a session to a device.
    fn connect(
        &self,
        device: &DeviceDescriptor,
        credentials: &Credentials,
    ) -> impl Future<Output = Result<Self::Session>> + Send;
}

impl<C: Connector> Connector for Arc<C> {
    type Session = C::Session;

    fn connect(
        &self,
        device: &DeviceDescriptor,
        credentials: &Credentials,
    ) -> impl Future<Output = Result<Self::Session>> + Send {
        (**self).connect(device, credentials)
    }
}
