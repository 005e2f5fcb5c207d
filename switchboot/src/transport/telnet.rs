//! Telnet session over a plain TCP stream.

use std::time::Duration;

use log::debug;
use tokio::net::TcpStream;

use crate::channel::{ChannelConfig, LineChannel};
use crate::device::DeviceDescriptor;
use crate::error::{Result, TransportError};

/// Line channel over a Telnet TCP connection.
pub type TelnetSession = LineChannel<TcpStream>;

/// Open a Telnet session to a device (or the console server port in front of it).
///
/// No prompt is awaited: a console line attached to a factory-fresh device
/// stays silent until it receives input.
pub async fn connect(
    device: &DeviceDescriptor,
    channel_config: ChannelConfig,
    connect_timeout: Duration,
) -> Result<TelnetSession> {
    let stream = tokio::time::timeout(
        connect_timeout,
        TcpStream::connect((device.host.as_str(), device.port)),
    )
    .await
    .map_err(|_| TransportError::Timeout(connect_timeout))?
    .map_err(|source| TransportError::ConnectionFailed {
        host: device.host.clone(),
        port: device.port,
        source,
    })?;
    stream.set_nodelay(true).map_err(TransportError::Io)?;
    debug!("telnet connected to {}:{}", device.host, device.port);

    let platform = device.family.platform();
    Ok(
        LineChannel::telnet(stream, platform.prompt_pattern().clone(), channel_config)
            .with_dialog_pattern(platform.dialog_pattern().clone()),
    )
}
