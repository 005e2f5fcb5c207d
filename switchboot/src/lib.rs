//! # Switchboot
//!
//! Concurrent bring-up and maintenance of factory-fresh switches over
//! Telnet consoles and SSH.
//!
//! Switchboot takes a catalog of devices, builds a vendor-specific command
//! script for each one, and drives those scripts over interactive sessions,
//! answering the dialogs switches open along the way (reload confirmations,
//! setup wizards, password prompts).
//!
//! ## Features
//!
//! - Cisco IOS (Layer 2 and Layer 3) and Juniper JunOS bring-up templates
//! - Telnet console sessions with option negotiation, SSH sessions via russh
//! - Data-driven reaction table for interactive prompts
//! - Bounded worker pool with per-device failure isolation, cancellation and deadlines
//! - Full request/response transcripts with secrets redacted
//!
//! ## Quick Start
//!
//! ```rust,no_run
//! use switchboot::{CancelToken, Catalog, CredentialPolicy, FleetBuilder, ScriptParams};
//! # use switchboot::credentials::SecretPrompt;
//! # async fn example(prompt: impl SecretPrompt) -> Result<(), switchboot::Error> {
//! let catalog = Catalog::load("devices.yaml")?;
//! let fleet = FleetBuilder::new().concurrency(4).build();
//!
//! let result = fleet
//!     .run_entries(
//!         &catalog.entries(),
//!         &CredentialPolicy::Universal { username: "netops".into() },
//!         prompt,
//!         &ScriptParams::default(),
//!         &CancelToken::new(),
//!     )
//!     .await?;
//!
//! for outcome in &result {
//!     println!("{}: {:?}", outcome.device, outcome.status);
//! }
//! # Ok(())
//! # }
//! ```

pub mod cancel;
pub mod channel;
pub mod credentials;
pub mod device;
pub mod driver;
pub mod error;
pub mod fleet;
pub mod platform;
pub mod script;
pub mod session;
pub mod transport;

#[cfg(test)]
mod testing;

// Re-export main types for convenience
pub use cancel::CancelToken;
pub use credentials::{CredentialPolicy, CredentialResolver, Credentials};
pub use device::{Catalog, DeviceDescriptor, DeviceFamily, DeviceRole, TransportKind};
pub use driver::{DriverSettings, InteractionDriver, OutcomeStatus, SessionOutcome};
pub use error::{Error, FailureKind, Result};
pub use fleet::{BatchResult, FleetBuilder, FleetOrchestrator};
pub use platform::PlatformDefinition;
pub use script::{CommandScript, CommandStep, ExecutionMode, ScriptParams, Task};
pub use session::{Connector, Session};
pub use transport::{SshConfig, TransportConnector};
