//! Transport layer: Telnet and SSH sessions to devices.
//!
//! Console servers and factory-fresh switches are reached over Telnet;
//! configured devices over SSH (wrapping russh). Both end up as a
//! [`LineChannel`](crate::channel::LineChannel) behind the
//! [`Session`](crate::session::Session) trait.

pub mod config;
mod connector;
mod ssh;
mod telnet;

pub use config::{AuthMethod, HostKeyVerification, SshConfig};
pub use connector::{DeviceSession, TransportConnector};
pub use ssh::SshSession;
pub use telnet::TelnetSession;
