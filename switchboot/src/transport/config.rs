//! SSH connection configuration.

use std::path::PathBuf;
use std::time::Duration;

use secrecy::SecretString;

/// Host key verification mode, analogous to OpenSSH's `StrictHostKeyChecking`.
#[derive(Debug, Clone, Default)]
pub enum HostKeyVerification {
    /// Reject unknown and changed keys. Connection fails if the host
    /// is not already in known_hosts.
    Strict,

    /// Accept and auto-learn unknown keys, but reject changed keys.
    /// This is the default and matches common SSH client behavior.
    #[default]
    AcceptNew,

    /// Accept all keys without checking. For testing and lab use only.
    Disabled,
}

/// SSH settings shared by every session of a batch.
#[derive(Debug, Clone)]
pub struct SshConfig {
    /// Host key verification mode.
    pub host_key_verification: HostKeyVerification,

    /// Path to known_hosts file (OpenSSH default when unset).
    pub known_hosts_path: Option<PathBuf>,

    /// Private key to authenticate with instead of the resolved secret.
    pub private_key: Option<PathBuf>,

    /// Passphrase for an encrypted private key.
    pub key_passphrase: Option<SecretString>,

    /// Terminal width for PTY.
    pub terminal_width: u32,

    /// Terminal height for PTY.
    pub terminal_height: u32,

    /// Drop the connection after this long without traffic.
    pub inactivity_timeout: Option<Duration>,
}

impl Default for SshConfig {
    fn default() -> Self {
        Self {
            host_key_verification: HostKeyVerification::default(),
            known_hosts_path: None,
            private_key: None,
            key_passphrase: None,
            terminal_width: 511,
            terminal_height: 24,
            inactivity_timeout: Some(Duration::from_secs(600)),
        }
    }
}

impl SshConfig {
    /// Authentication method for a session, given the resolved secret.
    pub fn auth_method(&self, secret: &SecretString) -> AuthMethod {
        match &self.private_key {
            Some(path) => AuthMethod::PrivateKey {
                path: path.clone(),
                passphrase: self.key_passphrase.clone(),
            },
            None => AuthMethod::Password(secret.clone()),
        }
    }
}

/// Authentication method for SSH connections.
#[derive(Debug, Clone)]
pub enum AuthMethod {
    /// Password authentication.
    Password(SecretString),

    /// Private key authentication.
    PrivateKey {
        /// Path to the private key file.
        path: PathBuf,
        /// Optional passphrase for encrypted keys.
        passphrase: Option<SecretString>,
    },
}
