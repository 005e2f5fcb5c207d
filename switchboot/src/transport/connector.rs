//! Transport-selecting connector.

use std::time::Duration;

use log::info;

use super::config::SshConfig;
use super::ssh::SshSession;
use super::telnet::{self, TelnetSession};
use crate::channel::ChannelConfig;
use crate::credentials::Credentials;
use crate::device::{DeviceDescriptor, TransportKind};
use crate::error::Result;
use crate::session::{Connector, Session};

/// Session over whichever transport the descriptor names.
pub enum DeviceSession {
    Telnet(TelnetSession),
    Ssh(SshSession),
}

impl Session for DeviceSession {
    async fn send(&mut self, text: &str) -> Result<String> {
        match self {
            Self::Telnet(session) => session.send(text).await,
            Self::Ssh(session) => session.send(text).await,
        }
    }

    async fn send_with_timing(&mut self, text: &str, delay: Duration) -> Result<String> {
        match self {
            Self::Telnet(session) => session.send_with_timing(text, delay).await,
            Self::Ssh(session) => session.send_with_timing(text, delay).await,
        }
    }

    fn current_prompt(&self) -> &str {
        match self {
            Self::Telnet(session) => session.current_prompt(),
            Self::Ssh(session) => session.current_prompt(),
        }
    }

    async fn disconnect(&mut self) -> Result<()> {
        match self {
            Self::Telnet(session) => session.disconnect().await,
            Self::Ssh(session) => session.disconnect().await,
        }
    }
}

/// Opens Telnet or SSH sessions per device.
#[derive(Debug, Clone)]
pub struct TransportConnector {
    ssh: SshConfig,
    channel: ChannelConfig,
    connect_timeout: Duration,
}

impl TransportConnector {
    pub fn new() -> Self {
        Self {
            ssh: SshConfig::default(),
            channel: ChannelConfig::default(),
            connect_timeout: Duration::from_secs(15),
        }
    }

    /// Set the SSH settings.
    pub fn ssh_config(mut self, config: SshConfig) -> Self {
        self.ssh = config;
        self
    }

    /// Set the channel settings.
    pub fn channel_config(mut self, config: ChannelConfig) -> Self {
        self.channel = config;
        self
    }

    /// Set the TCP/SSH connect timeout.
    pub fn connect_timeout(mut self, timeout: Duration) -> Self {
        self.connect_timeout = timeout;
        self
    }
}

impl Default for TransportConnector {
    fn default() -> Self {
        Self::new()
    }
}

impl Connector for TransportConnector {
    type Session = DeviceSession;

    async fn connect(
        &self,
        device: &DeviceDescriptor,
        credentials: &Credentials,
    ) -> Result<DeviceSession> {
        info!(
            "{}: connecting to {}:{} over {:?}",
            device.name, device.host, device.port, device.transport
        );
        match device.transport {
            TransportKind::Telnet => {
                let session =
                    telnet::connect(device, self.channel.clone(), self.connect_timeout).await?;
                Ok(DeviceSession::Telnet(session))
            }
            TransportKind::Ssh => {
                let auth = self.ssh.auth_method(&credentials.secret);
                let session = SshSession::connect(
                    device,
                    &credentials.username,
                    &auth,
                    &self.ssh,
                    self.channel.clone(),
                    self.connect_timeout,
                )
                .await?;
                Ok(DeviceSession::Ssh(session))
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::device::{DEFAULT_UPLINK, DeviceFamily, DeviceRole};
    use crate::error::{Error, TransportError};
    use secrecy::SecretString;
    use tokio::io::{AsyncReadExt, AsyncWriteExt};
    use tokio::net::TcpListener;

    fn device(port: u16) -> DeviceDescriptor {
        DeviceDescriptor {
            name: "SW1".into(),
            family: DeviceFamily::CiscoIos,
            role: DeviceRole::L2Switch,
            host: "127.0.0.1".into(),
            port,
            transport: TransportKind::Telnet,
            hostname_target: None,
            mgt_ip: None,
            mgt_mask: None,
            domain_name: None,
            username: None,
            uplink: DEFAULT_UPLINK.into(),
            default_root_password: None,
        }
    }

    fn credentials() -> Credentials {
        Credentials::new("netops", SecretString::from("s3cret".to_string()))
    }

    #[tokio::test]
    async fn test_telnet_session_against_local_listener() {
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let port = listener.local_addr().unwrap().port();

        let device_side = tokio::spawn(async move {
            let (mut socket, _) = listener.accept().await.unwrap();
            let mut line = [0u8; 32];
            let n = socket.read(&mut line).await.unwrap();
            assert_eq!(&line[..n], b"enable\r\n");
            socket.write_all(b"enable\r\nSW1#").await.unwrap();
            // wait for the client to hang up
            let _ = socket.read(&mut line).await;
        });

        let connector = TransportConnector::new();
        let mut session = connector.connect(&device(port), &credentials()).await.unwrap();
        assert!(matches!(session, DeviceSession::Telnet(_)));

        let output = session.send("enable").await.unwrap();
        assert!(output.contains("SW1#"));
        assert_eq!(session.current_prompt(), "SW1#");

        session.disconnect().await.unwrap();
        device_side.await.unwrap();
    }

    #[tokio::test]
    async fn test_refused_connection() {
        // bind then drop to find a port nobody listens on
        let port = {
            let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
            listener.local_addr().unwrap().port()
        };

        let result = TransportConnector::new()
            .connect(&device(port), &credentials())
            .await;
        match result {
            Err(Error::Transport(TransportError::ConnectionFailed { port: p, .. })) => {
                assert_eq!(p, port)
            }
            Err(other) => panic!("unexpected error: {other}"),
            Ok(_) => panic!("connection should have been refused"),
        }
    }
}
