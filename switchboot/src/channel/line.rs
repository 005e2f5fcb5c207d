//! Line-mode channel for interactive device sessions.

use std::time::Duration;

use regex::bytes::Regex;
use tokio::io::{AsyncRead, AsyncReadExt, AsyncWrite, AsyncWriteExt};
use tokio::time::Instant;

use super::buffer::PatternBuffer;
use super::telnet::{self, TelnetFilter};
use crate::error::{ChannelError, Result, TransportError};
use crate::session::Session;

/// Configuration for channel behavior.
#[derive(Debug, Clone)]
pub struct ChannelConfig {
    /// Upper bound for any single read operation.
    pub timeout: Duration,

    /// Search depth for pattern matching.
    pub search_depth: usize,
}

impl Default for ChannelConfig {
    fn default() -> Self {
        Self {
            timeout: Duration::from_secs(30),
            search_depth: 1000,
        }
    }
}

/// Interactive line channel over any byte stream.
///
/// Wraps a raw stream (a TCP socket for Telnet, an SSH shell channel) and
/// provides prompt-aware and quiet-period reads. Telnet channels filter
/// option negotiation out of the stream and answer it inline.
pub struct LineChannel<T> {
    io: T,
    config: ChannelConfig,
    buffer: PatternBuffer,
    telnet: Option<TelnetFilter>,
    prompt_pattern: Regex,
    dialog_pattern: Option<Regex>,
    prompt: String,
    line_ending: &'static str,
}

impl<T> LineChannel<T>
where
    T: AsyncRead + AsyncWrite + Unpin + Send,
{
    /// Create a channel for a clean byte stream (SSH). Lines end with LF.
    pub fn new(io: T, prompt_pattern: Regex, config: ChannelConfig) -> Self {
        Self {
            io,
            buffer: PatternBuffer::new(config.search_depth),
            config,
            telnet: None,
            prompt_pattern,
            dialog_pattern: None,
            prompt: String::new(),
            line_ending: "\n",
        }
    }

    /// Create a channel for a Telnet stream. Lines end with CRLF.
    pub fn telnet(io: T, prompt_pattern: Regex, config: ChannelConfig) -> Self {
        Self {
            telnet: Some(TelnetFilter::new()),
            line_ending: "\r\n",
            ..Self::new(io, prompt_pattern, config)
        }
    }

    /// Also end prompt reads when the output tail matches `pattern`.
    ///
    /// A device waiting on a question (`[confirm]`, `New password:`) never
    /// shows its standard prompt until the question is answered.
    pub fn with_dialog_pattern(mut self, pattern: Regex) -> Self {
        self.dialog_pattern = Some(pattern);
        self
    }

    /// Last prompt observed on this channel.
    pub fn prompt(&self) -> &str {
        &self.prompt
    }

    /// Get the configuration.
    pub fn config(&self) -> &ChannelConfig {
        &self.config
    }

    /// Send one line of input.
    ///
    /// Anything still buffered from before the write is discarded so the
    /// next read only sees the response to this line.
    pub async fn write_line(&mut self, text: &str) -> Result<()> {
        if !self.buffer.is_empty() {
            log::trace!("discarding {} unread bytes", self.buffer.len());
            self.buffer.clear();
        }

        let line = format!("{text}{}", self.line_ending);
        if self.telnet.is_some() {
            let escaped = telnet::escape(line.as_bytes());
            self.write_raw(&escaped).await
        } else {
            self.write_raw(line.as_bytes()).await
        }
    }

    async fn write_raw(&mut self, bytes: &[u8]) -> Result<()> {
        self.io
            .write_all(bytes)
            .await
            .map_err(TransportError::Io)?;
        self.io.flush().await.map_err(TransportError::Io)?;
        Ok(())
    }

    /// Read one chunk, waiting at most `wait`. Returns false if nothing arrived.
    async fn read_chunk(&mut self, wait: Duration) -> Result<bool> {
        let mut chunk = [0u8; 4096];
        let n = match tokio::time::timeout(wait, self.io.read(&mut chunk)).await {
            Err(_) => return Ok(false),
            Ok(read) => read.map_err(TransportError::Io)?,
        };
        if n == 0 {
            return Err(ChannelError::Closed.into());
        }
        log::trace!("read {n} bytes");

        match self.telnet.as_mut() {
            Some(filter) => {
                let filtered = filter.feed(&chunk[..n]);
                if !filtered.reply.is_empty() {
                    self.write_raw(&filtered.reply).await?;
                }
                self.buffer.extend(&filtered.data);
            }
            None => self.buffer.extend(&chunk[..n]),
        }
        Ok(true)
    }

    /// Read until the prompt pattern, or the dialog pattern, appears at the
    /// tail of the output.
    pub async fn read_until_prompt(&mut self) -> Result<String> {
        let deadline = Instant::now() + self.config.timeout;
        while !self.at_prompt_or_dialog() {
            let remaining = deadline.saturating_duration_since(Instant::now());
            if remaining.is_zero() {
                log::debug!("prompt not seen in {} buffered bytes", self.buffer.len());
                return Err(ChannelError::PatternTimeout(self.config.timeout).into());
            }
            self.read_chunk(remaining).await?;
        }
        Ok(self.take_output())
    }

    fn at_prompt_or_dialog(&self) -> bool {
        self.buffer.tail_contains(&self.prompt_pattern)
            || self
                .dialog_pattern
                .as_ref()
                .is_some_and(|dialog| self.buffer.tail_contains(dialog))
    }

    /// Read until no bytes arrive for `quiet`, capped by the channel timeout.
    pub async fn read_until_quiet(&mut self, quiet: Duration) -> Result<String> {
        let deadline = Instant::now() + self.config.timeout;
        loop {
            let remaining = deadline.saturating_duration_since(Instant::now());
            if remaining.is_zero() || !self.read_chunk(quiet.min(remaining)).await? {
                break;
            }
        }
        Ok(self.take_output())
    }

    /// Drain the buffer, remembering the last prompt in it.
    fn take_output(&mut self) -> String {
        let data = self.buffer.take();
        if let Some(m) = self.prompt_pattern.find_iter(&data).last() {
            self.prompt = String::from_utf8_lossy(m.as_bytes()).trim().to_string();
        }
        String::from_utf8_lossy(&data).into_owned()
    }

    /// Shut down the write half of the stream.
    pub async fn shutdown(&mut self) -> Result<()> {
        self.io.shutdown().await.map_err(TransportError::Io)?;
        Ok(())
    }
}

impl<T> Session for LineChannel<T>
where
    T: AsyncRead + AsyncWrite + Unpin + Send,
{
    async fn send(&mut self, text: &str) -> Result<String> {
        self.write_line(text).await?;
        self.read_until_prompt().await
    }

    async fn send_with_timing(&mut self, text: &str, delay: Duration) -> Result<String> {
        self.write_line(text).await?;
        self.read_until_quiet(delay).await
    }

    fn current_prompt(&self) -> &str {
        self.prompt()
    }

    async fn disconnect(&mut self) -> Result<()> {
        self.shutdown().await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::channel::telnet::{DO, IAC, WILL, WONT};
    use crate::error::Error;
    use tokio::io::duplex;
    use tokio_test::io::Builder;

    fn prompt() -> Regex {
        Regex::new(r"(?m)^\w+[>#]\s?$").unwrap()
    }

    #[tokio::test]
    async fn test_telnet_negotiation_then_prompt() {
        let mock = Builder::new()
            .read(&[IAC, DO, 24])
            .write(&[IAC, WONT, 24])
            .read(&[IAC, WILL, 1])
            .write(&[IAC, DO, 1])
            .read(b"\r\nSwitch>")
            .build();

        let mut channel = LineChannel::telnet(mock, prompt(), ChannelConfig::default());
        let output = channel.read_until_prompt().await.unwrap();
        assert_eq!(output, "\nSwitch>");
        assert_eq!(channel.prompt(), "Switch>");
    }

    #[tokio::test]
    async fn test_send_uses_crlf_over_telnet() {
        let mock = Builder::new()
            .write(b"enable\r\n")
            .read(b"enable\r\nSwitch#")
            .build();

        let mut channel = LineChannel::telnet(mock, prompt(), ChannelConfig::default());
        let output = channel.send("enable").await.unwrap();
        assert!(output.starts_with("enable\n"));
        assert_eq!(channel.current_prompt(), "Switch#");
    }

    #[tokio::test]
    async fn test_send_uses_lf_over_ssh() {
        let mock = Builder::new()
            .write(b"show clock\n")
            .read(b"show clock\r\n*12:00:00 UTC\r\n\x1b[1mSwitch#\x1b[0m ")
            .build();

        let mut channel = LineChannel::new(mock, prompt(), ChannelConfig::default());
        let output = channel.send("show clock").await.unwrap();
        assert_eq!(output, "show clock\n*12:00:00 UTC\nSwitch# ");
    }

    #[tokio::test]
    async fn test_peer_close_is_reported() {
        let mock = Builder::new().read(b"Connection closed by foreign host.").build();

        let mut channel = LineChannel::new(mock, prompt(), ChannelConfig::default());
        let err = channel.read_until_prompt().await.unwrap_err();
        assert!(matches!(err, Error::Channel(ChannelError::Closed)));
    }

    #[tokio::test(start_paused = true)]
    async fn test_prompt_timeout() {
        let (client, mut device) = duplex(1024);
        device.write_all(b"Proceed with reload? [confirm]").await.unwrap();

        let config = ChannelConfig {
            timeout: Duration::from_secs(5),
            ..Default::default()
        };
        let mut channel = LineChannel::new(client, prompt(), config);
        let err = channel.read_until_prompt().await.unwrap_err();
        assert!(matches!(
            err,
            Error::Channel(ChannelError::PatternTimeout(t)) if t == Duration::from_secs(5)
        ));
    }

    #[tokio::test(start_paused = true)]
    async fn test_prompt_read_stops_at_dialog() {
        let mock = Builder::new()
            .write(b"set system services ssh\n")
            .read(b"set system services ssh\r\nNew password:")
            .build();
        let dialog = Regex::new(r"(?i)new password:\s*$").unwrap();

        let mut channel =
            LineChannel::new(mock, prompt(), ChannelConfig::default()).with_dialog_pattern(dialog);
        let output = channel.send("set system services ssh").await.unwrap();
        assert!(output.ends_with("New password:"));
        assert_eq!(channel.prompt(), "");
    }

    #[tokio::test(start_paused = true)]
    async fn test_read_until_quiet_returns_without_prompt() {
        let (client, mut device) = duplex(1024);
        let mut channel = LineChannel::new(client, prompt(), ChannelConfig::default());

        let started = Instant::now();
        let writer = tokio::spawn(async move {
            let mut line = [0u8; 64];
            let n = device.read(&mut line).await.unwrap();
            assert_eq!(&line[..n], b"crypto key generate rsa modulus 2048\n");
            device.write_all(b"% Generating 2048 bit RSA keys ...").await.unwrap();
            tokio::time::sleep(Duration::from_millis(500)).await;
            device.write_all(b"[OK]\r\n").await.unwrap();
            device
        });

        let output = channel
            .send_with_timing("crypto key generate rsa modulus 2048", Duration::from_secs(2))
            .await
            .unwrap();
        assert_eq!(output, "% Generating 2048 bit RSA keys ...[OK]\n");
        assert!(started.elapsed() >= Duration::from_millis(2500));
        drop(writer.await.unwrap());
    }
}
