//! Scripted test doubles for sessions, connectors and secret prompts.

use std::collections::{HashMap, HashSet, VecDeque};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use secrecy::{ExposeSecret, SecretString};
use tokio::time::Instant;

use crate::credentials::{Credentials, SecretPrompt};
use crate::device::DeviceDescriptor;
use crate::error::{ChannelError, CredentialError, Result, TransportError};
use crate::session::{Connector, Session};

/// One line the double received.
#[derive(Debug, Clone)]
pub(crate) struct Sent {
    pub text: String,
    pub timed: bool,
    pub at: Instant,
}

/// Shared view of what a [`ScriptedSession`] saw.
#[derive(Debug, Clone, Default)]
pub(crate) struct SessionLog {
    sent: Arc<Mutex<Vec<Sent>>>,
    disconnects: Arc<AtomicUsize>,
}

impl SessionLog {
    pub fn sent(&self) -> Vec<Sent> {
        self.sent.lock().unwrap().clone()
    }

    pub fn texts(&self) -> Vec<String> {
        self.sent().into_iter().map(|s| s.text).collect()
    }

    pub fn disconnects(&self) -> usize {
        self.disconnects.load(Ordering::SeqCst)
    }
}

/// Session answering from a table of canned responses.
///
/// Each sent line pops the next queued response for that exact text; the
/// last queued response repeats. Unknown lines echo back followed by the
/// prompt.
pub(crate) struct ScriptedSession {
    prompt: String,
    responses: HashMap<String, VecDeque<String>>,
    fail_on: HashSet<String>,
    delay: Duration,
    log: SessionLog,
    on_disconnect: Option<Arc<AtomicUsize>>,
}

impl ScriptedSession {
    pub fn new(prompt: &str) -> Self {
        Self {
            prompt: prompt.to_string(),
            responses: HashMap::new(),
            fail_on: HashSet::new(),
            delay: Duration::ZERO,
            log: SessionLog::default(),
            on_disconnect: None,
        }
    }

    /// Queue a response for a line.
    pub fn on(mut self, text: &str, response: &str) -> Self {
        self.responses
            .entry(text.to_string())
            .or_default()
            .push_back(response.to_string());
        self
    }

    /// Drop the connection when this line is sent.
    pub fn fail_on(mut self, text: &str) -> Self {
        self.fail_on.insert(text.to_string());
        self
    }

    /// Simulated device latency per line.
    pub fn delay(mut self, delay: Duration) -> Self {
        self.delay = delay;
        self
    }

    pub fn log(&self) -> SessionLog {
        self.log.clone()
    }

    fn respond(&mut self, text: &str, timed: bool) -> Result<String> {
        self.log.sent.lock().unwrap().push(Sent {
            text: text.to_string(),
            timed,
            at: Instant::now(),
        });
        if self.fail_on.contains(text) {
            return Err(ChannelError::Closed.into());
        }
        let response = match self.responses.get_mut(text) {
            Some(queue) if queue.len() > 1 => queue.pop_front().unwrap_or_default(),
            Some(queue) => queue.front().cloned().unwrap_or_default(),
            None => format!("{text}\n{}", self.prompt),
        };
        Ok(response)
    }
}

impl Session for ScriptedSession {
    async fn send(&mut self, text: &str) -> Result<String> {
        tokio::time::sleep(self.delay).await;
        self.respond(text, false)
    }

    async fn send_with_timing(&mut self, text: &str, delay: Duration) -> Result<String> {
        tokio::time::sleep(self.delay + delay).await;
        self.respond(text, true)
    }

    fn current_prompt(&self) -> &str {
        &self.prompt
    }

    async fn disconnect(&mut self) -> Result<()> {
        self.log.disconnects.fetch_add(1, Ordering::SeqCst);
        if let Some(active) = &self.on_disconnect {
            active.fetch_sub(1, Ordering::SeqCst);
        }
        Ok(())
    }
}

/// Connector handing out [`ScriptedSession`]s.
#[derive(Default)]
pub(crate) struct MockConnector {
    refuse: HashSet<String>,
    panic_on: HashSet<String>,
    fail_on: HashMap<String, String>,
    delay: Duration,
    logs: Mutex<HashMap<String, SessionLog>>,
    credentials: Mutex<Vec<(String, String, String)>>,
    active: Arc<AtomicUsize>,
    peak: AtomicUsize,
}

impl MockConnector {
    pub fn new() -> Self {
        Self::default()
    }

    /// Refuse connections to a device.
    pub fn refuse(mut self, device: &str) -> Self {
        self.refuse.insert(device.to_string());
        self
    }

    /// Panic while connecting to a device.
    pub fn panic_on(mut self, device: &str) -> Self {
        self.panic_on.insert(device.to_string());
        self
    }

    /// Drop the device's session when `text` is sent.
    pub fn fail_on(mut self, device: &str, text: &str) -> Self {
        self.fail_on.insert(device.to_string(), text.to_string());
        self
    }

    /// Per-line latency of every session.
    pub fn delay(mut self, delay: Duration) -> Self {
        self.delay = delay;
        self
    }

    pub fn log(&self, device: &str) -> Option<SessionLog> {
        self.logs.lock().unwrap().get(device).cloned()
    }

    /// `(device, username, secret)` for every connection made.
    pub fn credentials_seen(&self) -> Vec<(String, String, String)> {
        self.credentials.lock().unwrap().clone()
    }

    /// Most sessions open at the same time.
    pub fn peak(&self) -> usize {
        self.peak.load(Ordering::SeqCst)
    }
}

impl Connector for MockConnector {
    type Session = ScriptedSession;

    async fn connect(
        &self,
        device: &DeviceDescriptor,
        credentials: &Credentials,
    ) -> Result<ScriptedSession> {
        self.credentials.lock().unwrap().push((
            device.name.clone(),
            credentials.username.clone(),
            credentials.secret.expose_secret().to_string(),
        ));
        if self.panic_on.contains(&device.name) {
            panic!("simulated connector bug for {}", device.name);
        }
        if self.refuse.contains(&device.name) {
            return Err(TransportError::ConnectionFailed {
                host: device.host.clone(),
                port: device.port,
                source: std::io::Error::from(std::io::ErrorKind::ConnectionRefused),
            }
            .into());
        }

        let now = self.active.fetch_add(1, Ordering::SeqCst) + 1;
        self.peak.fetch_max(now, Ordering::SeqCst);

        let mut session = ScriptedSession::new(&format!("{}#", device.hostname()))
            .delay(self.delay);
        if let Some(text) = self.fail_on.get(&device.name) {
            session = session.fail_on(text);
        }
        session.on_disconnect = Some(self.active.clone());
        self.logs
            .lock()
            .unwrap()
            .insert(device.name.clone(), session.log());
        Ok(session)
    }
}

/// Secret prompt answering from a fixed list.
#[derive(Debug, Default)]
pub(crate) struct ScriptedPrompt {
    answers: Mutex<VecDeque<String>>,
    asked: Mutex<Vec<String>>,
}

impl ScriptedPrompt {
    pub fn new(answers: &[&str]) -> Self {
        Self {
            answers: Mutex::new(answers.iter().map(|a| a.to_string()).collect()),
            asked: Mutex::new(Vec::new()),
        }
    }

    /// Prompts shown so far.
    pub fn asked(&self) -> Vec<String> {
        self.asked.lock().unwrap().clone()
    }
}

impl SecretPrompt for ScriptedPrompt {
    async fn read_secret(&self, prompt: &str) -> std::result::Result<SecretString, CredentialError> {
        self.asked.lock().unwrap().push(prompt.to_string());
        self.answers
            .lock()
            .unwrap()
            .pop_front()
            .map(SecretString::from)
            .ok_or_else(|| CredentialError::Prompt("no more scripted input".to_string()))
    }
}
