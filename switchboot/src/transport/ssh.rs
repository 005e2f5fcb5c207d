//! SSH session implementation using russh.

use std::path::PathBuf;
use std::pin::Pin;
use std::sync::{Arc, Mutex};
use std::time::Duration;

use log::{debug, warn};
use russh::ChannelStream;
use russh::client::{self, Handle, Msg};
use russh::keys::{PrivateKeyWithHashAlg, PublicKey, load_secret_key};
use secrecy::ExposeSecret;

use super::config::{AuthMethod, HostKeyVerification, SshConfig};
use crate::channel::{ChannelConfig, LineChannel};
use crate::device::DeviceDescriptor;
use crate::error::{Result, TransportError};
use crate::session::Session;

type ShellStream = Pin<Box<ChannelStream<Msg>>>;

/// Interactive shell over SSH.
pub struct SshSession {
    /// Line channel over the PTY shell.
    channel: LineChannel<ShellStream>,

    /// The russh session handle.
    handle: Handle<SshHandler>,
}

impl SshSession {
    /// Connect, authenticate, open a PTY shell and wait for the first prompt.
    pub async fn connect(
        device: &DeviceDescriptor,
        username: &str,
        auth: &AuthMethod,
        config: &SshConfig,
        channel_config: ChannelConfig,
        connect_timeout: Duration,
    ) -> Result<Self> {
        let (host, port) = (device.host.as_str(), device.port);
        let ssh_config = Arc::new(client::Config {
            inactivity_timeout: config.inactivity_timeout,
            ..Default::default()
        });

        let host_key_error: Arc<Mutex<Option<TransportError>>> = Arc::new(Mutex::new(None));

        let handler = SshHandler {
            host: host.to_string(),
            port,
            host_key_verification: config.host_key_verification.clone(),
            known_hosts_path: config.known_hosts_path.clone(),
            host_key_error: host_key_error.clone(),
        };

        let mut handle = tokio::time::timeout(
            connect_timeout,
            client::connect(ssh_config, (host, port), handler),
        )
        .await
        .map_err(|_| TransportError::Timeout(connect_timeout))?
        .map_err(|e| {
            // check_server_key leaves a detailed error behind when it rejects a key
            match host_key_error.lock().ok().and_then(|mut slot| slot.take()) {
                Some(hk_err) => hk_err,
                None => TransportError::Ssh(e),
            }
        })?;

        authenticate(&mut handle, username, auth).await?;
        debug!("authenticated to {host}:{port} as {username}");

        let channel = handle
            .channel_open_session()
            .await
            .map_err(TransportError::Ssh)?;
        channel
            .request_pty(
                true,
                "xterm",
                config.terminal_width,
                config.terminal_height,
                0,
                0,
                &[],
            )
            .await
            .map_err(TransportError::Ssh)?;
        channel
            .request_shell(true)
            .await
            .map_err(TransportError::Ssh)?;

        let stream: ShellStream = Box::pin(channel.into_stream());
        let platform = device.family.platform();
        let mut channel =
            LineChannel::new(stream, platform.prompt_pattern().clone(), channel_config)
                .with_dialog_pattern(platform.dialog_pattern().clone());
        channel.read_until_prompt().await?;

        Ok(Self { channel, handle })
    }
}

/// Authenticate with the server.
async fn authenticate(
    handle: &mut Handle<SshHandler>,
    username: &str,
    auth: &AuthMethod,
) -> Result<()> {
    let success = match auth {
        AuthMethod::Password(password) => handle
            .authenticate_password(username, password.expose_secret())
            .await
            .map_err(TransportError::Ssh)?
            .success(),
        AuthMethod::PrivateKey { path, passphrase } => {
            let key = load_secret_key(path, passphrase.as_ref().map(|p| p.expose_secret()))
                .map_err(|e| TransportError::Key(e.to_string()))?;

            // Get the best RSA hash algorithm supported by the server
            let hash_alg = handle
                .best_supported_rsa_hash()
                .await
                .map_err(TransportError::Ssh)?
                .flatten();

            handle
                .authenticate_publickey(
                    username,
                    PrivateKeyWithHashAlg::new(Arc::new(key), hash_alg),
                )
                .await
                .map_err(TransportError::Ssh)?
                .success()
        }
    };

    if !success {
        return Err(TransportError::AuthenticationFailed {
            user: username.to_string(),
        }
        .into());
    }

    Ok(())
}

impl Session for SshSession {
    async fn send(&mut self, text: &str) -> Result<String> {
        self.channel.send(text).await
    }

    async fn send_with_timing(&mut self, text: &str, delay: Duration) -> Result<String> {
        self.channel.send_with_timing(text, delay).await
    }

    fn current_prompt(&self) -> &str {
        self.channel.prompt()
    }

    async fn disconnect(&mut self) -> Result<()> {
        if let Err(e) = self.channel.shutdown().await {
            debug!("shell shutdown: {e}");
        }
        self.handle
            .disconnect(russh::Disconnect::ByApplication, "", "en")
            .await
            .map_err(TransportError::Ssh)?;
        Ok(())
    }
}

/// SSH client handler for russh.
struct SshHandler {
    host: String,
    port: u16,
    host_key_verification: HostKeyVerification,
    known_hosts_path: Option<PathBuf>,
    host_key_error: Arc<Mutex<Option<TransportError>>>,
}

impl SshHandler {
    /// Check the host key against known_hosts.
    ///
    /// Returns `Ok(true)` if matched, `Ok(false)` if host not found,
    /// `Err(TransportError::HostKeyChanged)` if key changed.
    fn check_known_hosts(&self, pubkey: &PublicKey) -> std::result::Result<bool, TransportError> {
        let result = match &self.known_hosts_path {
            Some(path) => russh::keys::check_known_hosts_path(&self.host, self.port, pubkey, path),
            None => russh::keys::check_known_hosts(&self.host, self.port, pubkey),
        };

        match result {
            Ok(matched) => Ok(matched),
            Err(russh::keys::Error::KeyChanged { line }) => Err(TransportError::HostKeyChanged {
                host: self.host.clone(),
                port: self.port,
                line,
            }),
            Err(e) => Err(TransportError::KnownHosts(e.to_string())),
        }
    }

    /// Save a new host key to known_hosts.
    fn learn_host_key(&self, pubkey: &PublicKey) -> std::result::Result<(), TransportError> {
        let result = match &self.known_hosts_path {
            Some(path) => {
                russh::keys::known_hosts::learn_known_hosts_path(&self.host, self.port, pubkey, path)
            }
            None => russh::keys::known_hosts::learn_known_hosts(&self.host, self.port, pubkey),
        };

        result.map_err(|e| TransportError::KnownHosts(e.to_string()))
    }

    fn reject(&self, error: TransportError) -> bool {
        warn!("rejecting host key for {}:{}: {error}", self.host, self.port);
        if let Ok(mut slot) = self.host_key_error.lock() {
            *slot = Some(error);
        }
        false
    }
}

impl client::Handler for SshHandler {
    type Error = russh::Error;

    async fn check_server_key(
        &mut self,
        server_public_key: &PublicKey,
    ) -> std::result::Result<bool, Self::Error> {
        let accepted = match self.host_key_verification {
            HostKeyVerification::Disabled => true,

            HostKeyVerification::AcceptNew => match self.check_known_hosts(server_public_key) {
                Ok(true) => true,
                Ok(false) => {
                    if let Err(e) = self.learn_host_key(server_public_key) {
                        warn!("Failed to save host key: {}", e);
                    }
                    true
                }
                Err(e) => self.reject(e),
            },

            HostKeyVerification::Strict => match self.check_known_hosts(server_public_key) {
                Ok(true) => true,
                Ok(false) => self.reject(TransportError::HostKeyUnknown {
                    host: self.host.clone(),
                    port: self.port,
                }),
                Err(e) => self.reject(e),
            },
        };
        Ok(accepted)
    }
}
