//! Interaction driver.
//!
//! [`InteractionDriver`] pushes a [`CommandScript`] through a [`Session`],
//! one step at a time, reading each response the way the step's
//! [`ExecutionMode`] asks for:
//!
//! - `Immediate`: send and wait for the standard prompt.
//! - `TimingSensitive`: send and collect output until the device goes quiet,
//!   then answer any dialog the output opened from the step's own reactions
//!   or the driver's reaction table.
//! - `InteractiveReload`: confirm the reload, wait out the recovery window,
//!   then probe with a blank line and decline the setup dialog.
//!
//! Juniper sessions first log in as root. The session is always
//! disconnected before [`InteractionDriver::run`] returns.
//!
//! Devices echo typed input, so every secret the driver sends is masked out
//! of device output before it is recorded, logged or quoted in an error.

mod outcome;
mod settings;

pub use outcome::{DriverState, Exchange, OutcomeStatus, SessionOutcome};
pub use settings::{DriverSettings, PasswordRotationPolicy, default_reactions};

use log::{debug, info, warn};
use secrecy::{ExposeSecret, SecretString};
use tokio::time::Instant;

use crate::cancel::CancelToken;
use crate::device::{DeviceDescriptor, DeviceFamily};
use crate::error::{DriverError, Error, Result};
use crate::platform::PlatformDefinition;
use crate::script::{CommandScript, CommandStep, ExecutionMode, REDACTED, Reply};
use crate::session::Session;

/// Phrase a device uses when forcing a password change.
const ROTATION_PHRASE: &str = "new password";

/// How much device output error messages quote.
const TAIL_CHARS: usize = 120;

/// Per-device command/response state machine.
pub struct InteractionDriver<S> {
    session: S,
    device: String,
    family: DeviceFamily,
    platform: &'static PlatformDefinition,
    root_password: Option<SecretString>,
    secrets: Vec<SecretString>,
    settings: DriverSettings,
    state: DriverState,
    transcript: Vec<Exchange>,
    warnings: Vec<String>,
    started: Instant,
}

impl<S: Session> InteractionDriver<S> {
    /// Create a driver over an open session.
    pub fn new(session: S, device: &DeviceDescriptor, settings: DriverSettings) -> Self {
        Self {
            session,
            device: device.name.clone(),
            family: device.family,
            platform: device.family.platform(),
            root_password: device.default_root_password.clone(),
            secrets: device.default_root_password.iter().cloned().collect(),
            settings,
            state: DriverState::Connected,
            transcript: Vec::new(),
            warnings: Vec::new(),
            started: Instant::now(),
        }
    }

    /// Current state.
    pub fn state(&self) -> DriverState {
        self.state
    }

    /// Run a script to completion, then disconnect.
    pub async fn run(mut self, script: &CommandScript, cancel: &CancelToken) -> SessionOutcome {
        self.secrets.extend(script.secrets().cloned());
        let result = self.drive(script, cancel).await;

        if let Err(e) = self.session.disconnect().await {
            warn!("{}: disconnect failed: {e}", self.device);
            self.warnings.push(format!("disconnect failed: {e}"));
        }

        self.finish(result)
    }

    async fn drive(&mut self, script: &CommandScript, cancel: &CancelToken) -> Result<()> {
        if self.family == DeviceFamily::JuniperJunos {
            self.checkpoint(cancel)?;
            self.transition(DriverState::Authenticating);
            self.authenticate().await?;
        }

        self.transition(DriverState::Executing);
        for step in script.body() {
            self.checkpoint(cancel)?;
            self.execute(step, cancel).await?;
        }

        if let Some(commit) = script.commit() {
            self.checkpoint(cancel)?;
            self.transition(DriverState::Committing);
            info!("{}: committing with '{}'", self.device, commit.display());
            self.execute(commit, cancel).await?;
        }

        Ok(())
    }

    fn finish(mut self, result: Result<()>) -> SessionOutcome {
        let (status, error, failure_kind) = match result {
            Ok(()) => {
                self.transition(DriverState::Disconnected);
                (OutcomeStatus::Success, None, None)
            }
            Err(e) if e.is_cancelled() => {
                self.transition(DriverState::Cancelled);
                (OutcomeStatus::Cancelled, Some(e.to_string()), Some(e.kind()))
            }
            Err(e) => {
                warn!("{}: aborted: {e}", self.device);
                self.transition(DriverState::Aborted);
                (OutcomeStatus::Failed, Some(e.to_string()), Some(e.kind()))
            }
        };

        SessionOutcome {
            device: self.device,
            status,
            transcript: self.transcript,
            error,
            failure_kind,
            final_state: self.state,
            warnings: self.warnings,
            elapsed: self.started.elapsed(),
        }
    }

    fn transition(&mut self, next: DriverState) {
        debug!("{}: {:?} -> {:?}", self.device, self.state, next);
        self.state = next;
    }

    /// Step-boundary check for cancellation and the per-device deadline.
    fn checkpoint(&self, cancel: &CancelToken) -> Result<()> {
        if cancel.is_cancelled() {
            return Err(DriverError::Cancelled.into());
        }
        if let Some(limit) = self.settings.deadline
            && self.started.elapsed() >= limit
        {
            return Err(DriverError::DeadlineExceeded(limit).into());
        }
        Ok(())
    }

    /// Log in as root on a Juniper console and enter the operational CLI.
    async fn authenticate(&mut self) -> Result<()> {
        let output = self.timed("root", "root").await?;
        check_login(&output)?;

        let lower = output.to_lowercase();
        let asks_password = lower.contains("password:");
        if asks_password || lower.contains("root@") {
            match self.root_password.clone() {
                Some(password) => {
                    let output = self.timed(password.expose_secret(), REDACTED).await?;
                    check_login(&output)?;
                    tokio::time::sleep(self.settings.auth_settle).await;
                }
                None if asks_password => {
                    return Err(DriverError::AuthenticationRejected {
                        detail: "device asked for a root password but none is recorded"
                            .to_string(),
                    }
                    .into());
                }
                None => debug!("{}: no default root password recorded", self.device),
            }
        }

        self.timed("cli", "cli").await?;
        Ok(())
    }

    async fn execute(&mut self, step: &CommandStep, cancel: &CancelToken) -> Result<()> {
        debug!("{}: [{:?}] {}", self.device, step.mode(), step.display());

        let last = match step.mode() {
            ExecutionMode::Immediate => {
                let started = Instant::now();
                let output = self.send(step.text(), ExecutionMode::Immediate).await?;
                self.record_command(step, &output, started)?;
                output
            }
            ExecutionMode::TimingSensitive => {
                let started = Instant::now();
                let output = self.send(step.text(), ExecutionMode::TimingSensitive).await?;
                self.record_command(step, &output, started)?;
                let last = self.react(step, output).await?;
                if self.settings.strict && !self.platform.prompt_seen(&last) {
                    return Err(unexpected(step, &last));
                }
                last
            }
            ExecutionMode::InteractiveReload => self.reload(step, cancel).await?,
        };

        if self.family == DeviceFamily::JuniperJunos {
            self.check_rotation(step, &last).await?;
        }
        Ok(())
    }

    /// Confirm a reload, wait for the device to come back, and probe it.
    async fn reload(&mut self, step: &CommandStep, cancel: &CancelToken) -> Result<String> {
        let started = Instant::now();
        let output = self.send(step.text(), ExecutionMode::TimingSensitive).await?;
        self.record_command(step, &output, started)?;
        self.react(step, output).await?;

        info!(
            "{}: reloading, waiting {:?} for recovery",
            self.device, self.settings.reload_window
        );
        tokio::select! {
            _ = tokio::time::sleep(self.settings.reload_window) => {}
            _ = cancel.cancelled() => return Err(DriverError::Cancelled.into()),
        }

        let probe = self.timed("", Reply::Enter.display()).await?;
        let recognised =
            self.reaction_for(step, &probe).is_some() || self.platform.prompt_seen(&probe);
        let last = self.react(step, probe).await?;

        if !recognised {
            if self.settings.strict {
                return Err(unexpected(step, &last));
            }
            warn!(
                "{}: no known prompt after reload, proceeding",
                self.device
            );
            self.warnings
                .push("no known prompt after reload window; proceeded anyway".to_string());
        }
        Ok(last)
    }

    /// Answer dialogs opened by `output`, returning the last output seen.
    async fn react(&mut self, step: &CommandStep, mut output: String) -> Result<String> {
        for _ in 0..self.settings.max_reactions {
            let Some(reply) = self.reaction_for(step, &output) else {
                break;
            };
            debug!("{}: answering with {}", self.device, reply.display());
            output = self.timed(reply.text(), reply.display()).await?;
        }
        Ok(output)
    }

    /// Step-local reactions first, then the driver table.
    fn reaction_for(&self, step: &CommandStep, output: &str) -> Option<Reply> {
        step.reactions()
            .iter()
            .chain(self.settings.reactions.iter())
            .find(|reaction| reaction.matches(output))
            .map(|reaction| reaction.reply().clone())
    }

    /// Handle a forced password change the step did not answer itself.
    async fn check_rotation(&mut self, step: &CommandStep, last: &str) -> Result<()> {
        if !last.to_lowercase().contains(ROTATION_PHRASE) {
            return Ok(());
        }

        match self.settings.password_rotation {
            PasswordRotationPolicy::Fail => Err(DriverError::PasswordRotationRequired {
                command: step.display().to_string(),
            }
            .into()),
            PasswordRotationPolicy::Skip => {
                warn!(
                    "{}: skipped a password change requested after '{}'",
                    self.device,
                    step.display()
                );
                self.warnings.push(format!(
                    "password change requested after '{}' was skipped",
                    step.display()
                ));
                for _ in 0..2 {
                    self.timed("", Reply::Enter.display()).await?;
                }
                Ok(())
            }
        }
    }

    /// Send one line and return its output with secrets masked.
    async fn send(&mut self, text: &str, mode: ExecutionMode) -> Result<String> {
        let output = match mode {
            ExecutionMode::Immediate => self.session.send(text).await?,
            ExecutionMode::TimingSensitive | ExecutionMode::InteractiveReload => {
                self.session
                    .send_with_timing(text, self.settings.settle_delay)
                    .await?
            }
        };
        Ok(self.scrub(output))
    }

    fn scrub(&self, output: String) -> String {
        self.secrets
            .iter()
            .map(|secret| secret.expose_secret())
            .filter(|secret| !secret.is_empty())
            .fold(output, |text, secret| {
                if text.contains(secret) {
                    text.replace(secret, REDACTED)
                } else {
                    text
                }
            })
    }

    /// Send with a settle delay and record the exchange.
    async fn timed(&mut self, text: &str, display: &str) -> Result<String> {
        let started = Instant::now();
        let output = self.send(text, ExecutionMode::TimingSensitive).await?;
        self.record(display, &output, ExecutionMode::TimingSensitive, started, None);
        Ok(output)
    }

    /// Record a scripted command, checking its output for failure patterns.
    fn record_command(&mut self, step: &CommandStep, output: &str, started: Instant) -> Result<()> {
        let failure = self.platform.detect_failure(output).map(str::to_string);
        self.record(step.display(), output, step.mode(), started, failure.clone());

        if let Some(message) = failure {
            if self.settings.strict {
                return Err(DriverError::CommandFailed {
                    command: step.display().to_string(),
                    message,
                }
                .into());
            }
            warn!("{}: '{}' reported '{message}'", self.device, step.display());
            self.warnings
                .push(format!("'{}' reported '{message}'", step.display()));
        }
        Ok(())
    }

    fn record(
        &mut self,
        request: &str,
        response: &str,
        mode: ExecutionMode,
        started: Instant,
        failure: Option<String>,
    ) {
        log::trace!("{}: {request:?} -> {response:?}", self.device);
        self.transcript.push(Exchange {
            request: request.to_string(),
            response: response.to_string(),
            prompt: self.session.current_prompt().to_string(),
            mode,
            state: self.state,
            elapsed: started.elapsed(),
            failure,
        });
    }
}

fn check_login(output: &str) -> Result<()> {
    if output.to_lowercase().contains("login incorrect") {
        return Err(DriverError::AuthenticationRejected {
            detail: tail(output),
        }
        .into());
    }
    Ok(())
}

fn unexpected(step: &CommandStep, output: &str) -> Error {
    DriverError::UnexpectedPrompt {
        command: step.display().to_string(),
        tail: tail(output),
    }
    .into()
}

fn tail(output: &str) -> String {
    let trimmed = output.trim();
    let skip = trimmed.chars().count().saturating_sub(TAIL_CHARS);
    trimmed.chars().skip(skip).collect()
}
