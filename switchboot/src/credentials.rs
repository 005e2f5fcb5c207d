//! Credential resolution.
//!
//! Credentials are resolved once per batch ([`CredentialPolicy::Universal`])
//! or once per device ([`CredentialPolicy::PerDevice`]) and never mutated
//! afterwards. Every secret must be confirmed by re-entry; the resolver gives
//! up after a bounded number of attempts.

use std::future::Future;
use std::sync::Arc;

use log::warn;
use secrecy::{ExposeSecret, SecretString};

use crate::device::{DeviceDescriptor, DeviceFamily};
use crate::error::{CredentialError, Result, ValidationError};

/// Default number of entry/confirmation rounds before giving up.
pub const DEFAULT_ATTEMPTS: u32 = 3;

/// Identity and secrets applied to one device.
#[derive(Debug, Clone)]
pub struct Credentials {
    /// Local user to create, and SSH login name.
    pub username: String,

    /// User and enable secret.
    pub secret: SecretString,

    /// Root password to set on Juniper devices; falls back to `secret`.
    pub root_password: Option<SecretString>,
}

impl Credentials {
    pub fn new(username: impl Into<String>, secret: SecretString) -> Self {
        Self {
            username: username.into(),
            secret,
            root_password: None,
        }
    }

    /// Set a distinct root password.
    pub fn with_root_password(mut self, root_password: SecretString) -> Self {
        self.root_password = Some(root_password);
        self
    }

    /// Root password to configure.
    pub fn root_secret(&self) -> &SecretString {
        self.root_password.as_ref().unwrap_or(&self.secret)
    }
}

/// How credentials are chosen for the devices of a batch.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CredentialPolicy {
    /// One identity for every device, resolved before dispatch.
    Universal { username: String },

    /// Username from each descriptor, secret solicited per device.
    PerDevice,
}

/// Interactive source of secrets (a terminal, an environment variable, a test script).
pub trait SecretPrompt: Send + Sync {
    /// Ask for one secret.
    fn read_secret(
        &self,
        prompt: &str,
    ) -> impl Future<Output = std::result::Result<SecretString, CredentialError>> + Send;
}

impl<P: SecretPrompt> SecretPrompt for &P {
    fn read_secret(
        &self,
        prompt: &str,
    ) -> impl Future<Output = std::result::Result<SecretString, CredentialError>> + Send {
        (**self).read_secret(prompt)
    }
}

impl<P: SecretPrompt> SecretPrompt for Arc<P> {
    fn read_secret(
        &self,
        prompt: &str,
    ) -> impl Future<Output = std::result::Result<SecretString, CredentialError>> + Send {
        (**self).read_secret(prompt)
    }
}

/// Resolves [`Credentials`] through a [`SecretPrompt`].
#[derive(Debug)]
pub struct CredentialResolver<P> {
    prompt: P,
    max_attempts: u32,
}

impl<P: SecretPrompt> CredentialResolver<P> {
    pub fn new(prompt: P) -> Self {
        Self {
            prompt,
            max_attempts: DEFAULT_ATTEMPTS,
        }
    }

    /// Set how many entry/confirmation rounds are allowed.
    pub fn max_attempts(mut self, attempts: u32) -> Self {
        self.max_attempts = attempts.max(1);
        self
    }

    /// Resolve the batch-wide identity.
    pub async fn resolve_universal(
        &self,
        username: &str,
    ) -> std::result::Result<Credentials, CredentialError> {
        let secret = self.confirmed(&format!("Secret for {username}")).await?;
        Ok(Credentials::new(username, secret))
    }

    /// Resolve credentials for one device under a policy.
    pub async fn resolve(
        &self,
        policy: &CredentialPolicy,
        device: &DeviceDescriptor,
    ) -> Result<Credentials> {
        match policy {
            CredentialPolicy::Universal { username } => Ok(self.resolve_universal(username).await?),
            CredentialPolicy::PerDevice => {
                let username = device
                    .username
                    .as_deref()
                    .ok_or(ValidationError::MissingField { field: "username" })?;
                let secret = self
                    .confirmed(&format!("{}: secret for {username}", device.name))
                    .await?;
                let mut credentials = Credentials::new(username, secret);
                if device.family == DeviceFamily::JuniperJunos {
                    let root = self
                        .confirmed(&format!("{}: new root password", device.name))
                        .await?;
                    credentials = credentials.with_root_password(root);
                }
                Ok(credentials)
            }
        }
    }

    async fn confirmed(&self, label: &str) -> std::result::Result<SecretString, CredentialError> {
        for attempt in 1..=self.max_attempts {
            let first = self.prompt.read_secret(&format!("{label}: ")).await?;
            let again = self.prompt.read_secret(&format!("Confirm {label}: ")).await?;
            if first.expose_secret() == again.expose_secret() {
                return Ok(first);
            }
            warn!(
                "{label}: confirmation did not match (attempt {attempt} of {})",
                self.max_attempts
            );
        }
        Err(CredentialError::Mismatch {
            attempts: self.max_attempts,
        })
    }
}
